use std::sync::Arc;

use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::RngCore;

use super::content::Content;
use super::{Attempt, GameKind, GameOption, GameView, MiniGame};

const FIRST: usize = 0;
const SECOND: usize = 1;

/// Split a two-syllable word after its second character
pub fn split_syllables(word: &str) -> (String, String) {
    let first: String = word.chars().take(2).collect();
    let second: String = word.chars().skip(2).collect();
    (first, second)
}

/// Build the target word from one first and one second syllable
pub struct SyllableGame {
    content: Arc<Content>,
    target: String,
    rows: [Vec<String>; 2],
    selected: [Option<usize>; 2],
}

impl SyllableGame {
    pub fn new(content: Arc<Content>) -> Self {
        Self::with_rng(content, &mut rand::thread_rng())
    }

    pub fn with_rng(content: Arc<Content>, rng: &mut dyn RngCore) -> Self {
        let mut game = Self {
            content,
            target: String::new(),
            rows: [Vec::new(), Vec::new()],
            selected: [None, None],
        };
        game.next_question(rng);
        game
    }

    pub fn next_question(&mut self, rng: &mut dyn RngCore) {
        let words = &self.content.syllable_words;
        let Some(target) = words.choose(rng).cloned() else {
            return;
        };

        let (mut firsts, mut seconds): (Vec<String>, Vec<String>) =
            words.iter().map(|w| split_syllables(w)).unzip();
        firsts = firsts.into_iter().unique().collect();
        seconds = seconds.into_iter().unique().collect();
        firsts.shuffle(rng);
        seconds.shuffle(rng);

        self.target = target;
        self.rows = [firsts, seconds];
        self.selected = [None, None];
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn selected_word(&self) -> Option<String> {
        match self.selected {
            [Some(first), Some(second)] => Some(format!(
                "{}{}",
                self.rows[FIRST][first], self.rows[SECOND][second]
            )),
            _ => None,
        }
    }
}

impl MiniGame for SyllableGame {
    fn kind(&self) -> GameKind {
        GameKind::SyllableMatching
    }

    fn view(&self) -> GameView {
        GameView {
            prompt: "Build the word".to_string(),
            picture: self.target.clone(),
            accent: None,
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(GameOption::text).collect())
                .collect(),
            selected: self.selected.to_vec(),
        }
    }

    fn choose(&mut self, row: usize, index: usize) -> Option<Attempt> {
        if row > SECOND || index >= self.rows[row].len() {
            return None;
        }

        self.selected[row] = match self.selected[row] {
            Some(current) if current == index => None,
            _ => Some(index),
        };

        let word = self.selected_word()?;
        let correct = word == self.target;
        if !correct {
            self.selected = [None, None];
        }
        Some(Attempt {
            correct,
            spoken: Some(word),
        })
    }

    fn prompt_speech(&self) -> Option<String> {
        Some(self.target.clone())
    }

    /// The first syllable on its own
    fn selection_speech(&self) -> Option<String> {
        match self.selected {
            [Some(first), None] => self.rows[FIRST].get(first).cloned(),
            _ => None,
        }
    }
}
