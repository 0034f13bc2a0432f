use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::RngCore;

use super::content::{Content, WordPair};
use super::{
    distinct_options, index_of, Attempt, ChoiceQuestion, GameKind, GameOption, GameView, MiniGame,
};

const OPTION_COUNT: usize = 4;

/// Pick the Russian family word for the English one shown
pub struct WordMatchingGame {
    content: Arc<Content>,
    word: Option<WordPair>,
    question: ChoiceQuestion,
}

impl WordMatchingGame {
    pub fn new(content: Arc<Content>) -> Self {
        Self::with_rng(content, &mut rand::thread_rng())
    }

    pub fn with_rng(content: Arc<Content>, rng: &mut dyn RngCore) -> Self {
        let mut game = Self {
            content,
            word: None,
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
        let words = &self.content.family_words;
        let Some(word) = words.choose(rng).cloned() else {
            return;
        };

        let options = distinct_options(words, &word, OPTION_COUNT, |w| w.ru.clone(), rng);
        let correct = index_of(&options, &word, |w| w.ru.clone());

        self.question = ChoiceQuestion {
            prompt: "Which word is it?".to_string(),
            picture: word.en.clone(),
            accent: None,
            options: options
                .iter()
                .map(|w| GameOption::text(w.ru.clone()))
                .collect(),
            correct,
            spoken: options.iter().map(WordPair::spoken).collect(),
        };
        self.word = Some(word);
    }

    pub fn word(&self) -> Option<&WordPair> {
        self.word.as_ref()
    }
}

impl MiniGame for WordMatchingGame {
    fn kind(&self) -> GameKind {
        GameKind::WordMatching
    }

    fn view(&self) -> GameView {
        self.question.view()
    }

    fn choose(&mut self, row: usize, index: usize) -> Option<Attempt> {
        self.question.check(row, index)
    }

    fn prompt_speech(&self) -> Option<String> {
        self.word.as_ref().map(WordPair::spoken)
    }
}
