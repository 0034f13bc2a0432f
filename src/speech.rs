use std::cell::RefCell;
use std::io::{self, Write};
use std::process::{Child, Command, Stdio};
use std::rc::Rc;

use thiserror::Error;

pub const DEFAULT_SPEECH_COMMAND: &str = "espeak-ng";

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech program {program:?} could not be started: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("speech is unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum LanguageTag {
    #[default]
    #[strum(serialize = "ru-RU")]
    Russian,
    #[strum(serialize = "en-US")]
    English,
}

impl LanguageTag {
    /// espeak voice name for the tag
    pub fn voice(&self) -> &'static str {
        match self {
            LanguageTag::Russian => "ru",
            LanguageTag::English => "en-us",
        }
    }
}

/// Short fixed tones played before praise or "try again"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Success,
    Failure,
}

/// Completion signal of one `speak` request
#[derive(Debug, Default)]
pub enum Utterance {
    #[default]
    Finished,
    Running(Child),
}

impl Utterance {
    pub fn is_finished(&mut self) -> bool {
        match self {
            Utterance::Finished => true,
            Utterance::Running(child) => match child.try_wait() {
                Ok(Some(_)) => true,
                Ok(None) => false,
                Err(err) => {
                    tracing::warn!("lost track of speech process: {err}");
                    true
                }
            },
        }
    }

    pub fn cancel(&mut self) {
        if let Utterance::Running(child) = self {
            let _ = child.kill();
            let _ = child.wait();
        }
        *self = Utterance::Finished;
    }
}

pub trait Speaker {
    fn speak(&mut self, text: &str, lang: LanguageTag) -> Result<Utterance, SpeechError>;
    fn cue(&mut self, cue: Cue);
}

/// Speaks through an external text-to-speech program (`espeak-ng -v <voice> <text>`)
#[derive(Debug)]
pub struct CommandSpeaker {
    program: String,
    degraded: bool,
}

impl CommandSpeaker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            degraded: false,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn spawn(&self, text: &str, lang: LanguageTag) -> Result<Child, SpeechError> {
        Command::new(&self.program)
            .arg("-v")
            .arg(lang.voice())
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&mut self, text: &str, lang: LanguageTag) -> Result<Utterance, SpeechError> {
        if self.degraded {
            return Ok(Utterance::Finished);
        }

        match self.spawn(text, lang) {
            Ok(child) => Ok(Utterance::Running(child)),
            Err(first) => {
                tracing::warn!("{first}; retrying once");
                match self.spawn(text, lang) {
                    Ok(child) => Ok(Utterance::Running(child)),
                    Err(second) => {
                        tracing::warn!("{second}; continuing without speech");
                        self.degraded = true;
                        Err(second)
                    }
                }
            }
        }
    }

    fn cue(&mut self, cue: Cue) {
        ring_bell(cue);
    }
}

/// No speech at all; cues ring the terminal bell
#[derive(Debug, Default)]
pub struct SilentSpeaker {
    pub bell: bool,
}

impl Speaker for SilentSpeaker {
    fn speak(&mut self, text: &str, lang: LanguageTag) -> Result<Utterance, SpeechError> {
        tracing::debug!("speech disabled, skipping [{lang}] {text}");
        Ok(Utterance::Finished)
    }

    fn cue(&mut self, cue: Cue) {
        if self.bell {
            ring_bell(cue);
        }
    }
}

fn ring_bell(cue: Cue) {
    let rings: &[u8] = match cue {
        Cue::Success => b"\x07",
        Cue::Failure => b"\x07\x07",
    };
    let mut out = io::stdout();
    if out.write_all(rings).and_then(|_| out.flush()).is_err() {
        tracing::debug!("terminal bell unavailable");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechRecord {
    Spoken { text: String, lang: LanguageTag },
    Cue(Cue),
}

pub type SpeechLog = Rc<RefCell<Vec<SpeechRecord>>>;

/// Test double that records every request
#[derive(Debug, Default)]
pub struct RecordingSpeaker {
    log: SpeechLog,
    failing: bool,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `speak` call fails
    pub fn failing() -> Self {
        Self {
            log: SpeechLog::default(),
            failing: true,
        }
    }

    pub fn log(&self) -> SpeechLog {
        Rc::clone(&self.log)
    }
}

impl Speaker for RecordingSpeaker {
    fn speak(&mut self, text: &str, lang: LanguageTag) -> Result<Utterance, SpeechError> {
        self.log.borrow_mut().push(SpeechRecord::Spoken {
            text: text.to_string(),
            lang,
        });
        if self.failing {
            return Err(SpeechError::Unavailable);
        }
        Ok(Utterance::Finished)
    }

    fn cue(&mut self, cue: Cue) {
        self.log.borrow_mut().push(SpeechRecord::Cue(cue));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn language_tags() {
        assert_eq!(LanguageTag::Russian.to_string(), "ru-RU");
        assert_eq!(LanguageTag::English.to_string(), "en-US");
        assert_eq!(LanguageTag::English.voice(), "en-us");
    }

    #[test]
    fn missing_program_degrades_after_retry() {
        let mut speaker = CommandSpeaker::new("quizbreak-no-such-tts-program");

        let first = speaker.speak("Привет", LanguageTag::Russian);
        assert_matches!(first, Err(SpeechError::Spawn { .. }));
        assert!(speaker.is_degraded());

        let mut second = speaker.speak("Привет", LanguageTag::Russian).unwrap();
        assert!(second.is_finished());
    }

    #[test]
    fn recording_speaker_logs_requests() {
        let mut speaker = RecordingSpeaker::new();
        let log = speaker.log();

        speaker.cue(Cue::Success);
        speaker.speak("Молодец!", LanguageTag::Russian).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                SpeechRecord::Cue(Cue::Success),
                SpeechRecord::Spoken {
                    text: "Молодец!".into(),
                    lang: LanguageTag::Russian
                },
            ]
        );
    }

    #[test]
    fn failing_speaker_still_records() {
        let mut speaker = RecordingSpeaker::failing();
        let log = speaker.log();
        assert_matches!(
            speaker.speak("Try again!", LanguageTag::English),
            Err(SpeechError::Unavailable)
        );
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn finished_utterance_cancel_is_noop() {
        let mut utterance = Utterance::default();
        utterance.cancel();
        assert!(utterance.is_finished());
    }
}
