use std::sync::Arc;

use rand::{Rng, RngCore};

use super::content::{Content, CountName};
use super::{
    distinct_options, index_of, Attempt, ChoiceQuestion, GameKind, GameOption, GameView, MiniGame,
};

const OPTION_COUNT: usize = 3;
const ICE_CREAM: &str = "🍦";
const CAKE: &str = "🎂";

/// Count the desserts: ice creams and cakes alternate between questions
pub struct NumbersGame {
    content: Arc<Content>,
    ice_cream: bool,
    count: u8,
    question: ChoiceQuestion,
}

impl NumbersGame {
    pub fn new(content: Arc<Content>) -> Self {
        Self::with_rng(content, &mut rand::thread_rng())
    }

    pub fn with_rng(content: Arc<Content>, rng: &mut dyn RngCore) -> Self {
        let mut game = Self {
            content,
            // flipped by next_question, so the first question shows ice cream
            ice_cream: false,
            count: 0,
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
        let numbers = &self.content.numbers;
        let count = rng.gen_range(numbers.min..=numbers.max);
        self.ice_cream = !self.ice_cream;
        self.count = count;

        let pool: Vec<u8> = (numbers.min..=numbers.max).collect();
        let counts = distinct_options(&pool, &count, OPTION_COUNT, |n| *n, rng);
        let correct = index_of(&counts, &count, |n| *n);

        let (symbol, noun) = if self.ice_cream {
            (ICE_CREAM, "ice creams")
        } else {
            (CAKE, "cakes")
        };

        self.question = ChoiceQuestion {
            prompt: format!("How many {noun}?"),
            picture: vec![symbol; count as usize].join(" "),
            accent: None,
            options: counts
                .iter()
                .map(|n| GameOption::text(n.to_string()))
                .collect(),
            correct,
            spoken: counts.iter().map(|n| self.spoken_count(*n)).collect(),
        };
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn is_ice_cream(&self) -> bool {
        self.ice_cream
    }

    fn spoken_count(&self, count: u8) -> String {
        let names: &[CountName] = if self.ice_cream {
            &self.content.numbers.ice_cream
        } else {
            &self.content.numbers.cake
        };
        names
            .iter()
            .find(|name| name.count == count)
            .map(|name| format!("{}, {}", name.ru, name.en))
            .unwrap_or_else(|| count.to_string())
    }
}

impl MiniGame for NumbersGame {
    fn kind(&self) -> GameKind {
        GameKind::Numbers
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

    fn game(seed: u64) -> (NumbersGame, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let content = Arc::new(Content::load().unwrap());
        (NumbersGame::with_rng(content, &mut rng), rng)
    }

    #[test]
    fn options_are_unique_and_contain_the_count() {
        let (mut game, mut rng) = game(3);
        for _ in 0..100 {
            let view = game.view();
            let labels: Vec<&str> = view.rows[0].iter().map(|o| o.label.as_str()).collect();
            assert_eq!(labels.len(), OPTION_COUNT);
            assert_eq!(labels.iter().unique().count(), OPTION_COUNT);
            assert!(labels.contains(&game.count().to_string().as_str()));
            assert!((3..=6).contains(&game.count()));
            game.next_question(&mut rng);
        }
    }

    #[test]
    fn picture_matches_count() {
        let (game, _) = game(11);
        let symbols = game.view().picture.split(' ').count();
        assert_eq!(symbols, game.count() as usize);
    }

    #[test]
    fn dessert_alternates() {
        let (mut game, mut rng) = game(5);
        assert!(game.is_ice_cream());
        game.next_question(&mut rng);
        assert!(!game.is_ice_cream());
        assert!(game.view().prompt.contains("cakes"));
    }

    #[test]
    fn wrong_answer_keeps_question() {
        let (mut game, _) = game(9);
        let before = game.view();
        let wrong = (game.question.correct + 1) % OPTION_COUNT;

        let attempt = game.choose(0, wrong).unwrap();
        assert!(!attempt.correct);
        assert_eq!(game.view(), before);

        let attempt = game.choose(0, game.question.correct).unwrap();
        assert!(attempt.correct);
        assert!(attempt.spoken.unwrap().contains(", "));
    }

    #[test]
    fn out_of_range_choice_is_ignored() {
        let (mut game, _) = game(1);
        assert_eq!(game.choose(0, 7), None);
        assert_eq!(game.choose(1, 0), None);
    }
}
