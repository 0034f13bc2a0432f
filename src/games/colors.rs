use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::RngCore;

use super::content::{Content, NamedColor};
use super::{
    distinct_options, index_of, Attempt, ChoiceQuestion, GameKind, GameOption, GameView, MiniGame,
};

const OPTION_COUNT: usize = 3;
const GHOST: &str = "👻";
const SWATCH: &str = "●●●";

/// Match the ghost's color
pub struct GhostColorGame {
    content: Arc<Content>,
    color: Option<NamedColor>,
    question: ChoiceQuestion,
}

impl GhostColorGame {
    pub fn new(content: Arc<Content>) -> Self {
        Self::with_rng(content, &mut rand::thread_rng())
    }

    pub fn with_rng(content: Arc<Content>, rng: &mut dyn RngCore) -> Self {
        let mut game = Self {
            content,
            color: None,
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
        let palette = &self.content.colors;
        let Some(color) = palette.choose(rng).cloned() else {
            return;
        };

        let options = distinct_options(palette, &color, OPTION_COUNT, |c| c.color, rng);
        let correct = index_of(&options, &color, |c| c.color);

        self.question = ChoiceQuestion {
            prompt: "What color is the ghost?".to_string(),
            picture: GHOST.to_string(),
            accent: Some(color.color),
            options: options
                .iter()
                .map(|c| GameOption::colored(SWATCH, c.color))
                .collect(),
            correct,
            spoken: options.iter().map(|c| c.name.spoken()).collect(),
        };
        self.color = Some(color);
    }

    pub fn color(&self) -> Option<&NamedColor> {
        self.color.as_ref()
    }
}

impl MiniGame for GhostColorGame {
    fn kind(&self) -> GameKind {
        GameKind::ColorGhost
    }

    fn view(&self) -> GameView {
        self.question.view()
    }

    fn choose(&mut self, row: usize, index: usize) -> Option<Attempt> {
        self.question.check(row, index)
    }
}
