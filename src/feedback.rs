//! Answer feedback shared by every mini-game.
//!
//! A [`FeedbackFlow`] is created for each attempt. It plays the cue, waits,
//! speaks praise or "try again", and only then reports back. While a flow is
//! running the mounted game must not accept another answer.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::games::Attempt;
use crate::speech::{Cue, LanguageTag, Speaker, Utterance};

/// Pause between the cue and the spoken message
pub const CUE_DELAY_MS: u64 = 1300;
/// Pause after praise before the game reports completion
pub const SETTLE_DELAY_MS: u64 = 500;

pub const RUSSIAN_PRAISES: [&str; 10] = [
    "Молодец!",
    "Отлично!",
    "Правильно!",
    "Супер!",
    "Ты умница!",
    "Здорово!",
    "Верно!",
    "Ты справилась!",
    "Замечательно!",
    "Так держать!",
];

pub const ENGLISH_PRAISES: [&str; 10] = [
    "Great job!",
    "Excellent!",
    "Correct!",
    "Super!",
    "You're smart!",
    "Wonderful!",
    "Right!",
    "You did it!",
    "Fantastic!",
    "Keep it up!",
];

pub fn try_again(lang: LanguageTag) -> &'static str {
    match lang {
        LanguageTag::Russian => "Попробуй ещё раз!",
        LanguageTag::English => "Try again!",
    }
}

/// Result of a single question, alive only while feedback is shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub feedback_text: String,
}

impl AnswerOutcome {
    pub fn new<R: Rng + ?Sized>(correct: bool, lang: LanguageTag, rng: &mut R) -> Self {
        let feedback_text = if correct {
            let praises = match lang {
                LanguageTag::Russian => &RUSSIAN_PRAISES,
                LanguageTag::English => &ENGLISH_PRAISES,
            };
            praises.choose(rng).copied().unwrap_or(praises[0])
        } else {
            try_again(lang)
        };

        Self {
            correct,
            feedback_text: feedback_text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackDone {
    /// The question was answered; the session may advance
    Completed,
    /// Same question stays mounted
    Retry,
}

#[derive(Debug)]
enum Phase {
    Cue { until_ms: u64 },
    Speaking,
    Settle { until_ms: u64 },
    Done,
}

#[derive(Debug)]
pub struct FeedbackFlow {
    outcome: AnswerOutcome,
    lang: LanguageTag,
    phase: Phase,
    utterance: Utterance,
}

impl FeedbackFlow {
    /// Plays the cue and the chosen option's speech right away
    pub fn begin(
        attempt: &Attempt,
        outcome: AnswerOutcome,
        lang: LanguageTag,
        speaker: &mut dyn Speaker,
        now_ms: u64,
    ) -> Self {
        speaker.cue(if outcome.correct {
            Cue::Success
        } else {
            Cue::Failure
        });

        let utterance = match &attempt.spoken {
            Some(text) => speak_or_skip(speaker, text, lang),
            None => Utterance::Finished,
        };

        Self {
            outcome,
            lang,
            phase: Phase::Cue {
                until_ms: now_ms + CUE_DELAY_MS,
            },
            utterance,
        }
    }

    pub fn outcome(&self) -> &AnswerOutcome {
        &self.outcome
    }

    /// Input stays blocked until the flow has reported
    pub fn is_blocking(&self) -> bool {
        !matches!(self.phase, Phase::Done)
    }

    /// Advances the flow. Yields [`FeedbackDone`] exactly once.
    pub fn poll(&mut self, speaker: &mut dyn Speaker, now_ms: u64) -> Option<FeedbackDone> {
        loop {
            match self.phase {
                Phase::Cue { until_ms } => {
                    if now_ms < until_ms || !self.utterance.is_finished() {
                        return None;
                    }
                    self.utterance = speak_or_skip(speaker, &self.outcome.feedback_text, self.lang);
                    self.phase = Phase::Speaking;
                }
                Phase::Speaking => {
                    if !self.utterance.is_finished() {
                        return None;
                    }
                    if !self.outcome.correct {
                        self.phase = Phase::Done;
                        return Some(FeedbackDone::Retry);
                    }
                    self.phase = Phase::Settle {
                        until_ms: now_ms + SETTLE_DELAY_MS,
                    };
                }
                Phase::Settle { until_ms } => {
                    if now_ms < until_ms {
                        return None;
                    }
                    self.phase = Phase::Done;
                    return Some(FeedbackDone::Completed);
                }
                Phase::Done => return None,
            }
        }
    }

    /// Stops any running speech; the flow never reports afterwards
    pub fn cancel(&mut self) {
        self.utterance.cancel();
        self.phase = Phase::Done;
    }
}

fn speak_or_skip(speaker: &mut dyn Speaker, text: &str, lang: LanguageTag) -> Utterance {
    match speaker.speak(text, lang) {
        Ok(utterance) => utterance,
        Err(err) => {
            tracing::warn!("speech failed, continuing silently: {err}");
            Utterance::Finished
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::{RecordingSpeaker, SpeechRecord};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn attempt(correct: bool) -> Attempt {
        Attempt {
            correct,
            spoken: Some("три, three".into()),
        }
    }

    fn outcome(correct: bool) -> AnswerOutcome {
        AnswerOutcome::new(correct, LanguageTag::Russian, &mut StdRng::seed_from_u64(3))
    }

    #[test]
    fn outcome_texts() {
        let ok = outcome(true);
        assert!(RUSSIAN_PRAISES.contains(&ok.feedback_text.as_str()));

        let en = AnswerOutcome::new(true, LanguageTag::English, &mut StdRng::seed_from_u64(3));
        assert!(ENGLISH_PRAISES.contains(&en.feedback_text.as_str()));

        assert_eq!(outcome(false).feedback_text, "Попробуй ещё раз!");
    }

    #[test]
    fn correct_answer_completes_once_after_delays() {
        let mut speaker = RecordingSpeaker::new();
        let log = speaker.log();
        let mut flow = FeedbackFlow::begin(
            &attempt(true),
            outcome(true),
            LanguageTag::Russian,
            &mut speaker,
            0,
        );

        assert_eq!(flow.poll(&mut speaker, 1000), None);
        assert!(flow.is_blocking());

        // praise spoken, settle starts
        assert_eq!(flow.poll(&mut speaker, CUE_DELAY_MS), None);
        assert_eq!(
            flow.poll(&mut speaker, CUE_DELAY_MS + SETTLE_DELAY_MS),
            Some(FeedbackDone::Completed)
        );
        assert!(!flow.is_blocking());
        assert_eq!(flow.poll(&mut speaker, 10_000), None);

        let log = log.borrow();
        assert_eq!(log[0], SpeechRecord::Cue(Cue::Success));
        assert_eq!(
            log[1],
            SpeechRecord::Spoken {
                text: "три, three".into(),
                lang: LanguageTag::Russian
            }
        );
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn wrong_answer_retries_without_settle() {
        let mut speaker = RecordingSpeaker::new();
        let log = speaker.log();
        let mut flow = FeedbackFlow::begin(
            &attempt(false),
            outcome(false),
            LanguageTag::Russian,
            &mut speaker,
            0,
        );

        assert_eq!(flow.poll(&mut speaker, CUE_DELAY_MS), Some(FeedbackDone::Retry));
        assert_eq!(log.borrow()[0], SpeechRecord::Cue(Cue::Failure));
        assert!(log.borrow().contains(&SpeechRecord::Spoken {
            text: "Попробуй ещё раз!".into(),
            lang: LanguageTag::Russian
        }));
    }

    #[test]
    fn speech_failure_does_not_block_completion() {
        let mut speaker = RecordingSpeaker::failing();
        let mut flow = FeedbackFlow::begin(
            &attempt(true),
            outcome(true),
            LanguageTag::Russian,
            &mut speaker,
            0,
        );

        assert_eq!(flow.poll(&mut speaker, CUE_DELAY_MS), None);
        assert_eq!(
            flow.poll(&mut speaker, CUE_DELAY_MS + SETTLE_DELAY_MS),
            Some(FeedbackDone::Completed)
        );
    }

    #[test]
    fn cancelled_flow_never_reports() {
        let mut speaker = RecordingSpeaker::new();
        let mut flow = FeedbackFlow::begin(
            &attempt(true),
            outcome(true),
            LanguageTag::Russian,
            &mut speaker,
            0,
        );
        flow.cancel();
        assert_eq!(flow.poll(&mut speaker, 60_000), None);
    }
}
