//! Mini-game instances and the kind registry.
//!
//! Every mini-game owns its question generation and answer checking. The
//! session layer only ever sees [`GameKind`] tags and the [`Attempt`]s a
//! mounted game hands back, so adding a game is one `register` call.

pub mod alphabet;
pub mod colors;
pub mod content;
pub mod numbers;
pub mod syllables;
pub mod words;

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use content::{Content, ContentError, Rgb};

/// Identifies a mini-game implementation
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GameKind {
    Numbers,
    Alphabet,
    ColorGhost,
    WordMatching,
    SyllableMatching,
}

impl GameKind {
    pub const ALL: [GameKind; 5] = [
        GameKind::Numbers,
        GameKind::Alphabet,
        GameKind::ColorGhost,
        GameKind::WordMatching,
        GameKind::SyllableMatching,
    ];

    /// Key used in the persisted `selectedGames` map
    pub fn settings_key(&self) -> &'static str {
        match self {
            GameKind::Numbers => "numbersGame",
            GameKind::Alphabet => "alphabetGame",
            GameKind::ColorGhost => "ghostGame",
            GameKind::WordMatching => "wordMatchingGame",
            GameKind::SyllableMatching => "syllableMatchingGame",
        }
    }

    pub fn from_settings_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.settings_key() == key)
    }

    pub fn title(&self) -> &'static str {
        match self {
            GameKind::Numbers => "Counting desserts",
            GameKind::Alphabet => "Alphabet",
            GameKind::ColorGhost => "Ghost colors",
            GameKind::WordMatching => "Family words",
            GameKind::SyllableMatching => "Syllables",
        }
    }
}

/// One selectable answer as shown to the player
#[derive(Debug, Clone, PartialEq)]
pub struct GameOption {
    pub label: String,
    pub color: Option<Rgb>,
}

impl GameOption {
    pub fn text(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: None,
        }
    }

    pub fn colored(label: impl Into<String>, color: Rgb) -> Self {
        Self {
            label: label.into(),
            color: Some(color),
        }
    }
}

/// Render model for the mounted mini-game
#[derive(Debug, Clone, PartialEq)]
pub struct GameView {
    pub prompt: String,
    pub picture: String,
    pub accent: Option<Rgb>,
    pub rows: Vec<Vec<GameOption>>,
    /// Selected index per row (only the syllable game keeps selections)
    pub selected: Vec<Option<usize>>,
}

/// The result of a single answer, before any feedback is presented
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub correct: bool,
    /// Spoken when the option is picked ("<ru>, <en>")
    pub spoken: Option<String>,
}

pub trait MiniGame {
    fn kind(&self) -> GameKind;

    fn view(&self) -> GameView;

    /// Pick option `index` of row `row`. Returns `None` while the game still
    /// waits for more input or the position does not exist.
    fn choose(&mut self, row: usize, index: usize) -> Option<Attempt>;

    /// Text announced when the question is first shown
    fn prompt_speech(&self) -> Option<String> {
        None
    }

    /// Text announced after a `choose` that still waits for more input
    fn selection_speech(&self) -> Option<String> {
        None
    }
}

/// A single-row multiple choice question shared by the choice games
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChoiceQuestion {
    pub prompt: String,
    pub picture: String,
    pub accent: Option<Rgb>,
    pub options: Vec<GameOption>,
    pub correct: usize,
    pub spoken: Vec<String>,
}

impl ChoiceQuestion {
    pub fn view(&self) -> GameView {
        GameView {
            prompt: self.prompt.clone(),
            picture: self.picture.clone(),
            accent: self.accent,
            rows: vec![self.options.clone()],
            selected: vec![None],
        }
    }

    pub fn check(&self, row: usize, index: usize) -> Option<Attempt> {
        if row != 0 || index >= self.options.len() {
            return None;
        }
        Some(Attempt {
            correct: index == self.correct,
            spoken: self.spoken.get(index).cloned(),
        })
    }
}

/// Draws `count` shuffled options from `pool`: the correct one plus
/// distractors that are unique by `key` and never equal to the correct one.
/// Returns fewer options when the pool has too few distinct entries.
pub(crate) fn distinct_options<T, K, F, R>(
    pool: &[T],
    correct: &T,
    count: usize,
    key: F,
    rng: &mut R,
) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
    R: Rng + ?Sized,
{
    let correct_key = key(correct);
    let distractors: Vec<&T> = pool
        .iter()
        .filter(|item| key(*item) != correct_key)
        .unique_by(|item| key(*item))
        .collect();

    let mut options: Vec<T> = distractors
        .choose_multiple(rng, count.saturating_sub(1))
        .map(|item| (*item).clone())
        .collect();
    options.push(correct.clone());
    options.shuffle(rng);
    options
}

/// Position of the entry matching `correct` by `key`
pub(crate) fn index_of<T, K, F>(options: &[T], correct: &T, key: F) -> usize
where
    K: Eq,
    F: Fn(&T) -> K,
{
    let wanted = key(correct);
    options
        .iter()
        .position(|option| key(option) == wanted)
        .unwrap_or(0)
}

type Factory = Box<dyn Fn() -> Box<dyn MiniGame>>;

/// Maps each [`GameKind`] to a constructor for its mini-game
#[derive(Default)]
pub struct GameRegistry {
    factories: BTreeMap<GameKind, Factory>,
}

impl GameRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All five games over the embedded content
    pub fn standard() -> Result<Self, ContentError> {
        let content = Arc::new(Content::load()?);
        let mut registry = Self::empty();

        let c = Arc::clone(&content);
        registry.register(GameKind::Numbers, move || {
            Box::new(numbers::NumbersGame::new(Arc::clone(&c)))
        });
        let c = Arc::clone(&content);
        registry.register(GameKind::Alphabet, move || {
            Box::new(alphabet::AlphabetGame::new(Arc::clone(&c)))
        });
        let c = Arc::clone(&content);
        registry.register(GameKind::ColorGhost, move || {
            Box::new(colors::GhostColorGame::new(Arc::clone(&c)))
        });
        let c = Arc::clone(&content);
        registry.register(GameKind::WordMatching, move || {
            Box::new(words::WordMatchingGame::new(Arc::clone(&c)))
        });
        let c = Arc::clone(&content);
        registry.register(GameKind::SyllableMatching, move || {
            Box::new(syllables::SyllableGame::new(Arc::clone(&c)))
        });

        Ok(registry)
    }

    pub fn register<F>(&mut self, kind: GameKind, factory: F)
    where
        F: Fn() -> Box<dyn MiniGame> + 'static,
    {
        self.factories.insert(kind, Box::new(factory));
    }

    /// Registered kinds in declaration order
    pub fn kinds(&self) -> Vec<GameKind> {
        self.factories.keys().copied().collect()
    }

    pub fn create(&self, kind: GameKind) -> Option<Box<dyn MiniGame>> {
        self.factories.get(&kind).map(|factory| factory())
    }
}

impl fmt::Debug for GameRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
