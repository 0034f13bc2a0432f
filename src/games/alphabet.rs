use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::RngCore;

use super::content::{Content, Letter};
use super::{
    distinct_options, index_of, Attempt, ChoiceQuestion, GameKind, GameOption, GameView, MiniGame,
};

const OPTION_COUNT: usize = 3;

/// Find the shown letter among three
pub struct AlphabetGame {
    content: Arc<Content>,
    letter: Option<Letter>,
    question: ChoiceQuestion,
}

impl AlphabetGame {
    pub fn new(content: Arc<Content>) -> Self {
        Self::with_rng(content, &mut rand::thread_rng())
    }

    pub fn with_rng(content: Arc<Content>, rng: &mut dyn RngCore) -> Self {
        let mut game = Self {
            content,
            letter: None,
            question: ChoiceQuestion {
                prompt: String::new(),
                picture: String::new(),
                accent: None,
                options: Vec::new(),
                correct: 0,
                spoken: Vec::new(),
            },
        };
        game.next_question(rng);
        game
    }

    pub fn next_question(&mut self, rng: &mut dyn RngCore) {
        let letters = &self.content.letters;
        let Some(letter) = letters.choose(rng).cloned() else {
            return;
        };

        let options = distinct_options(letters, &letter, OPTION_COUNT, |l| l.letter.clone(), rng);
        let correct = index_of(&options, &letter, |l| l.letter.clone());

        self.question = ChoiceQuestion {
            prompt: "Find this letter".to_string(),
            picture: letter.letter.clone(),
            accent: Some(letter.color),
            options: options
                .iter()
                .map(|l| GameOption::text(l.letter.clone()))
                .collect(),
            correct,
            spoken: options.iter().map(|l| l.word.spoken()).collect(),
        };
        self.letter = Some(letter);
    }

    pub fn letter(&self) -> Option<&Letter> {
        self.letter.as_ref()
    }
}

impl MiniGame for AlphabetGame {
    fn kind(&self) -> GameKind {
        GameKind::Alphabet
    }

    fn view(&self) -> GameView {
        self.question.view()
    }

    fn choose(&mut self, row: usize, index: usize) -> Option<Attempt> {
        self.question.check(row, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn three_unique_letters_including_target() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut game = AlphabetGame::with_rng(Arc::new(Content::load().unwrap()), &mut rng);

        for _ in 0..100 {
            let view = game.view();
            let target = game.letter().unwrap().letter.clone();
            let labels: Vec<String> = view.rows[0].iter().map(|o| o.label.clone()).collect();

            assert_eq!(view.picture, target);
            assert_eq!(labels.len(), OPTION_COUNT);
            assert_eq!(labels.iter().unique().count(), OPTION_COUNT);
            assert_eq!(labels[game.question.correct], target);
            game.next_question(&mut rng);
        }
    }

    #[test]
    fn correct_choice_speaks_sample_word() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut game = AlphabetGame::with_rng(Arc::new(Content::load().unwrap()), &mut rng);
        let letter = game.letter().unwrap().clone();

        let attempt = game.choose(0, game.question.correct).unwrap();
        assert!(attempt.correct);
        assert_eq!(attempt.spoken, Some(letter.word.spoken()));
    }
}
