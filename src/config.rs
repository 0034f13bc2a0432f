use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::app_dirs::AppDirs;
use crate::games::GameKind;
use crate::session::{
    SessionConfig, DEFAULT_FREQUENCY_SECONDS, DEFAULT_GAME_COUNT, MAX_GAME_COUNT,
    MIN_FREQUENCY_SECONDS,
};
use crate::speech::DEFAULT_SPEECH_COMMAND;

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("unable to write preferences: {0}")]
    Io(#[from] io::Error),
    #[error("unable to serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// User settings kept between runs
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub num_exercises: usize,
    pub frequency_seconds: u32,
    pub selected_games: BTreeMap<GameKind, bool>,
    pub current_video_id: Option<String>,
    /// Resume position of the current video
    pub current_video_time: f64,
    pub speech_command: String,
    pub speech_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            num_exercises: DEFAULT_GAME_COUNT,
            frequency_seconds: DEFAULT_FREQUENCY_SECONDS,
            selected_games: GameKind::ALL.into_iter().map(|kind| (kind, true)).collect(),
            current_video_id: None,
            current_video_time: 0.0,
            speech_command: DEFAULT_SPEECH_COMMAND.to_string(),
            speech_enabled: true,
        }
    }
}

/// On-disk shape, `selectedGames` keyed by the persisted game names
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredPreferences<'a> {
    num_exercises: usize,
    frequency_seconds: u32,
    selected_games: BTreeMap<&'static str, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_video_id: Option<&'a str>,
    current_video_time: f64,
    speech_command: &'a str,
    speech_enabled: bool,
}

impl Preferences {
    /// Reads every field on its own; missing or mistyped fields keep their
    /// default and unknown fields are ignored. A legacy `frequency` in
    /// minutes is used when `frequencySeconds` is absent.
    pub fn from_value(value: &Value) -> Self {
        let mut prefs = Self::default();

        if let Some(count) = value.get("numExercises").and_then(Value::as_u64) {
            prefs.num_exercises = (count as usize).clamp(1, MAX_GAME_COUNT);
        }

        let seconds = value
            .get("frequencySeconds")
            .and_then(Value::as_f64)
            .or_else(|| {
                value
                    .get("frequency")
                    .and_then(Value::as_f64)
                    .map(|minutes| minutes * 60.0)
            });
        if let Some(seconds) = seconds.filter(|s| s.is_finite() && *s >= 0.0) {
            prefs.frequency_seconds = (seconds.round() as u32).max(MIN_FREQUENCY_SECONDS);
        }

        if let Some(games) = value.get("selectedGames").and_then(Value::as_object) {
            for (key, enabled) in games {
                match (GameKind::from_settings_key(key), enabled.as_bool()) {
                    (Some(kind), Some(enabled)) => {
                        prefs.selected_games.insert(kind, enabled);
                    }
                    _ => tracing::debug!("ignoring selectedGames entry {key}"),
                }
            }
        }

        if let Some(id) = value.get("currentVideoId").and_then(Value::as_str) {
            if !id.is_empty() {
                prefs.current_video_id = Some(id.to_string());
            }
        }

        if let Some(time) = value.get("currentVideoTime").and_then(Value::as_f64) {
            if time.is_finite() && time >= 0.0 {
                prefs.current_video_time = time;
            }
        }

        if let Some(command) = value.get("speechCommand").and_then(Value::as_str) {
            if !command.trim().is_empty() {
                prefs.speech_command = command.to_string();
            }
        }

        if let Some(enabled) = value.get("speechEnabled").and_then(Value::as_bool) {
            prefs.speech_enabled = enabled;
        }

        prefs
    }

    pub fn to_json(&self) -> Result<Vec<u8>, PrefsError> {
        let stored = StoredPreferences {
            num_exercises: self.num_exercises,
            frequency_seconds: self.frequency_seconds,
            selected_games: self
                .selected_games
                .iter()
                .map(|(kind, enabled)| (kind.settings_key(), *enabled))
                .collect(),
            current_video_id: self.current_video_id.as_deref(),
            current_video_time: self.current_video_time,
            speech_command: &self.speech_command,
            speech_enabled: self.speech_enabled,
        };
        Ok(serde_json::to_vec_pretty(&stored)?)
    }

    pub fn enabled_games(&self) -> HashSet<GameKind> {
        self.selected_games
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.num_exercises, self.frequency_seconds, self.enabled_games())
    }

    pub fn apply_session_config(&mut self, config: &SessionConfig) {
        self.num_exercises = config.game_count;
        self.frequency_seconds = config.frequency_seconds;
        for kind in GameKind::ALL {
            self.selected_games.insert(kind, config.enabled.contains(&kind));
        }
    }
}

pub trait PreferencesStore {
    fn load(&self) -> Preferences;
    fn save(&self, prefs: &Preferences) -> Result<(), PrefsError>;
}

#[derive(Debug, Clone)]
pub struct FilePreferencesStore {
    path: PathBuf,
}

impl FilePreferencesStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FilePreferencesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferencesStore for FilePreferencesStore {
    fn load(&self) -> Preferences {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("unable to read {}: {err}", self.path.display());
                }
                return Preferences::default();
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Preferences::from_value(&value),
            Err(err) => {
                tracing::warn!(
                    "ignoring unreadable preferences {}: {err}",
                    self.path.display()
                );
                Preferences::default()
            }
        }
    }

    fn save(&self, prefs: &Preferences) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, prefs.to_json()?)?;
        Ok(())
    }
}
