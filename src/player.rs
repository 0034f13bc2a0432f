//! The video player seen by the rest of the app.
//!
//! A terminal can not embed a web player, so [`TimelinePlayer`] keeps a
//! playback clock for the loaded video instead. Anything that can report a
//! position and take play/pause/seek commands can implement [`VideoPlayer`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::games::content::{read_json, ContentError};

/// Duration assumed for ids that are not in the catalog
pub const UNKNOWN_DURATION_SECONDS: f64 = 600.0;
const VIDEO_ID_LEN: usize = 11;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayerError {
    #[error("fullscreen request was denied")]
    FullscreenDenied,
    #[error("not a video url or id: {0:?}")]
    InvalidReference(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum PlayerState {
    #[default]
    Unstarted,
    Playing,
    Paused,
    Ended,
}

pub trait VideoPlayer {
    fn is_ready(&self) -> bool;

    /// Playback position in seconds
    fn current_time(&self) -> f64;

    fn state(&self) -> PlayerState;

    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, seconds: f64);

    fn load_video(&mut self, video: &Video);

    fn is_fullscreen(&self) -> bool;

    fn exit_fullscreen(&mut self);

    fn request_fullscreen(&mut self) -> Result<(), PlayerError>;

    /// Advance any internal clock to `now_ms`
    fn update(&mut self, _now_ms: u64) {}
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub duration_seconds: f64,
}

impl Video {
    pub fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: id.to_string(),
            duration_seconds: UNKNOWN_DURATION_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    videos: Vec<Video>,
}

impl Catalog {
    pub fn load() -> Result<Self, ContentError> {
        let catalog: Catalog = read_json("catalog.json")?;
        if catalog.videos.is_empty() {
            return Err(ContentError::Empty {
                file: "catalog.json".to_string(),
                what: "videos",
            });
        }
        Ok(catalog)
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn default_video(&self) -> Video {
        self.videos
            .first()
            .cloned()
            .unwrap_or_else(|| Video::unknown(""))
    }

    pub fn get(&self, id: &str) -> Option<&Video> {
        self.videos.iter().find(|video| video.id == id)
    }

    /// Catalog entry for `id`, or a placeholder with the default duration
    pub fn resolve(&self, id: &str) -> Video {
        self.get(id).cloned().unwrap_or_else(|| Video::unknown(id))
    }

    /// The entry after `id`, wrapping around; the first entry for unknown ids
    pub fn next_after(&self, id: &str) -> Video {
        match self.videos.iter().position(|video| video.id == id) {
            Some(idx) => self.videos[(idx + 1) % self.videos.len()].clone(),
            None => self.default_video(),
        }
    }
}

/// Marker followed by the candidate id, which runs up to `#`, `&` or `?`.
/// `\w` stays ascii so `/u/<char>/` channel links only take `[A-Za-z0-9_]`.
static VIDEO_URL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/(?-u:\w)/|embed/|watch\?v=|&v=)([^#&?]*).*").ok()
});

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Accepts youtu.be, /v/, /u/x/, /embed/, watch?v= and &v= urls or a bare id
pub fn extract_video_id(input: &str) -> Result<String, PlayerError> {
    let input = input.trim();
    if is_video_id(input) {
        return Ok(input.to_string());
    }

    VIDEO_URL
        .as_ref()
        .and_then(|re| re.captures(input))
        .and_then(|caps| caps.get(2))
        .map(|id| id.as_str())
        .filter(|id| id.len() == VIDEO_ID_LEN)
        .map(str::to_string)
        .ok_or_else(|| PlayerError::InvalidReference(input.to_string()))
}

/// Plays a video as a position advancing with wall time
#[derive(Debug, Default)]
pub struct TimelinePlayer {
    video: Option<Video>,
    state: PlayerState,
    position: f64,
    clock_ms: Option<u64>,
    fullscreen: bool,
    denials: u32,
}

impl TimelinePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next `count` fullscreen requests
    pub fn deny_fullscreen(&mut self, count: u32) {
        self.denials = count;
    }

    pub fn video(&self) -> Option<&Video> {
        self.video.as_ref()
    }

    fn duration(&self) -> f64 {
        self.video
            .as_ref()
            .map(|video| video.duration_seconds)
            .unwrap_or(0.0)
    }
}

impl VideoPlayer for TimelinePlayer {
    fn is_ready(&self) -> bool {
        self.video.is_some()
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn state(&self) -> PlayerState {
        self.state
    }

    fn play(&mut self) {
        if !self.is_ready() {
            return;
        }
        if self.state == PlayerState::Ended {
            self.position = 0.0;
        }
        self.state = PlayerState::Playing;
    }

    fn pause(&mut self) {
        if self.state == PlayerState::Playing {
            self.state = PlayerState::Paused;
        }
    }

    fn seek(&mut self, seconds: f64) {
        if !self.is_ready() {
            return;
        }
        self.position = seconds.clamp(0.0, self.duration());
        if self.state == PlayerState::Ended && self.position < self.duration() {
            self.state = PlayerState::Paused;
        }
    }

    fn load_video(&mut self, video: &Video) {
        tracing::info!("loading video {} ({})", video.id, video.title);
        self.video = Some(video.clone());
        self.position = 0.0;
        self.state = PlayerState::Unstarted;
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    fn exit_fullscreen(&mut self) {
        self.fullscreen = false;
    }

    fn request_fullscreen(&mut self) -> Result<(), PlayerError> {
        if self.denials > 0 {
            self.denials -= 1;
            return Err(PlayerError::FullscreenDenied);
        }
        self.fullscreen = true;
        Ok(())
    }

    fn update(&mut self, now_ms: u64) {
        let previous = self.clock_ms.replace(now_ms);
        if self.state != PlayerState::Playing {
            return;
        }
        if let Some(previous) = previous {
            let elapsed = now_ms.saturating_sub(previous) as f64 / 1000.0;
            self.position = (self.position + elapsed).min(self.duration());
            if self.position >= self.duration() {
                self.state = PlayerState::Ended;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Play,
    Pause,
    Seek(f64),
    Load(String),
    ExitFullscreen,
    RequestFullscreen,
}

/// Player whose position is set directly; records every command
#[derive(Debug)]
pub struct ScriptedPlayer {
    pub ready: bool,
    pub position: f64,
    pub state: PlayerState,
    pub fullscreen: bool,
    pub fullscreen_denials: u32,
    pub calls: Vec<PlayerCall>,
}

impl Default for ScriptedPlayer {
    fn default() -> Self {
        Self {
            ready: true,
            position: 0.0,
            state: PlayerState::Playing,
            fullscreen: false,
            fullscreen_denials: 0,
            calls: Vec::new(),
        }
    }
}

impl ScriptedPlayer {
    pub fn count(&self, call: &PlayerCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl VideoPlayer for ScriptedPlayer {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn state(&self) -> PlayerState {
        self.state
    }

    fn play(&mut self) {
        self.calls.push(PlayerCall::Play);
        self.state = PlayerState::Playing;
    }

    fn pause(&mut self) {
        self.calls.push(PlayerCall::Pause);
        self.state = PlayerState::Paused;
    }

    fn seek(&mut self, seconds: f64) {
        self.calls.push(PlayerCall::Seek(seconds));
        self.position = seconds;
    }

    fn load_video(&mut self, video: &Video) {
        self.calls.push(PlayerCall::Load(video.id.clone()));
        self.position = 0.0;
        self.state = PlayerState::Unstarted;
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    fn exit_fullscreen(&mut self) {
        self.calls.push(PlayerCall::ExitFullscreen);
        self.fullscreen = false;
    }

    fn request_fullscreen(&mut self) -> Result<(), PlayerError> {
        self.calls.push(PlayerCall::RequestFullscreen);
        if self.fullscreen_denials > 0 {
            self.fullscreen_denials -= 1;
            return Err(PlayerError::FullscreenDenied);
        }
        self.fullscreen = true;
        Ok(())
    }
}
