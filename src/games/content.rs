use include_dir::{include_dir, Dir};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

static CONTENT_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/content");

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content file not found: {0}")]
    Missing(String),
    #[error("content file {0} is not valid utf-8")]
    Encoding(String),
    #[error("unable to deserialize {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("content file {file} has no entries for {what}")]
    Empty { file: String, what: &'static str },
    #[error("invalid color {0:?}, expected #RRGGBB")]
    Color(String),
}

/// 24-bit color parsed from `#RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn parse(hex: &str) -> Result<Self, ContentError> {
        let digits = hex
            .strip_prefix('#')
            .filter(|d| d.len() == 6 && d.is_ascii())
            .ok_or_else(|| ContentError::Color(hex.to_string()))?;
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| ContentError::Color(hex.to_string()))
        };
        Ok(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

/// A word with its Russian and English spelling
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WordPair {
    pub ru: String,
    pub en: String,
}

impl WordPair {
    /// "<ru>, <en>" as spoken by the games
    pub fn spoken(&self) -> String {
        format!("{}, {}", self.ru, self.en)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Letter {
    pub letter: String,
    pub color: Rgb,
    pub word: WordPair,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedColor {
    pub color: Rgb,
    pub name: WordPair,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CountName {
    pub count: u8,
    pub ru: String,
    pub en: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberNames {
    pub min: u8,
    pub max: u8,
    pub ice_cream: Vec<CountName>,
    pub cake: Vec<CountName>,
}

/// Everything the mini-games draw their questions from
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub letters: Vec<Letter>,
    pub colors: Vec<NamedColor>,
    pub family_words: Vec<WordPair>,
    pub syllable_words: Vec<String>,
    pub numbers: NumberNames,
}

#[derive(Deserialize)]
struct RawLetter {
    letter: String,
    color: String,
    word: WordPair,
}

#[derive(Deserialize)]
struct AlphabetFile {
    letters: Vec<RawLetter>,
}

#[derive(Deserialize)]
struct RawColor {
    color: String,
    ru: String,
    en: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColorsFile {
    ghost_colors: Vec<RawColor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WordsFile {
    family_words: Vec<WordPair>,
    syllable_words: Vec<String>,
}

impl Content {
    pub fn load() -> Result<Self, ContentError> {
        let alphabet: AlphabetFile = read_json("alphabet.json")?;
        let colors: ColorsFile = read_json("colors.json")?;
        let words: WordsFile = read_json("words.json")?;
        let numbers: NumberNames = read_json("numbers.json")?;

        let letters = alphabet
            .letters
            .into_iter()
            .map(|raw| {
                Ok(Letter {
                    color: Rgb::parse(&raw.color)?,
                    letter: raw.letter,
                    word: raw.word,
                })
            })
            .collect::<Result<Vec<_>, ContentError>>()?;

        let colors = colors
            .ghost_colors
            .into_iter()
            .map(|raw| {
                Ok(NamedColor {
                    color: Rgb::parse(&raw.color)?,
                    name: WordPair {
                        ru: raw.ru,
                        en: raw.en,
                    },
                })
            })
            .collect::<Result<Vec<_>, ContentError>>()?;

        let content = Self {
            letters,
            colors,
            family_words: words.family_words,
            syllable_words: words.syllable_words,
            numbers,
        };
        content.validate()?;
        Ok(content)
    }

    fn validate(&self) -> Result<(), ContentError> {
        let empty = |file: &str, what| ContentError::Empty {
            file: file.to_string(),
            what,
        };
        if self.letters.is_empty() {
            return Err(empty("alphabet.json", "letters"));
        }
        if self.colors.is_empty() {
            return Err(empty("colors.json", "ghostColors"));
        }
        if self.family_words.is_empty() {
            return Err(empty("words.json", "familyWords"));
        }
        if self.syllable_words.is_empty() {
            return Err(empty("words.json", "syllableWords"));
        }
        if self.numbers.min > self.numbers.max {
            return Err(empty("numbers.json", "count range"));
        }
        Ok(())
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(file_name: &str) -> Result<T, ContentError> {
    let file = CONTENT_DIR
        .get_file(file_name)
        .ok_or_else(|| ContentError::Missing(file_name.to_string()))?;
    let text = file
        .contents_utf8()
        .ok_or_else(|| ContentError::Encoding(file_name.to_string()))?;
    serde_json::from_str(text).map_err(|source| ContentError::Parse {
        file: file_name.to_string(),
        source,
    })
}
