use std::collections::BTreeMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{Preferences, PreferencesStore};
use crate::feedback::{AnswerOutcome, FeedbackDone, FeedbackFlow};
use crate::games::{GameKind, GameRegistry, GameView, MiniGame};
use crate::history::HistoryDb;
use crate::monitor::PlaybackMonitor;
use crate::player::{Catalog, PlayerState, Video, VideoPlayer};
use crate::session::{
    CompletionOutcome, SessionConfig, SessionController, SessionEvent, SessionSummary,
    StartOutcome, TriggerSource, MAX_GAME_COUNT, MIN_FREQUENCY_SECONDS,
};
use crate::speech::{LanguageTag, Speaker, Utterance};

pub const SEEK_STEP_SECONDS: f64 = 10.0;
/// Settings change the break interval a minute at a time
pub const FREQUENCY_STEP_SECONDS: u32 = 60;
pub const MAX_FREQUENCY_SECONDS: u32 = 120 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Watching,
    Exercise,
    Settings,
}

/// Editable copy of the session settings
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsForm {
    pub game_count: usize,
    pub frequency_seconds: u32,
    pub games: BTreeMap<GameKind, bool>,
    pub cursor: usize,
}

impl SettingsForm {
    /// count, frequency, then one row per game
    pub const FIXED_ROWS: usize = 2;

    fn from_config(config: &SessionConfig) -> Self {
        Self {
            game_count: config.game_count,
            frequency_seconds: config.frequency_seconds,
            games: GameKind::ALL
                .into_iter()
                .map(|kind| (kind, config.enabled.contains(&kind)))
                .collect(),
            cursor: 0,
        }
    }

    pub fn rows(&self) -> usize {
        Self::FIXED_ROWS + self.games.len()
    }

    fn game_at_cursor(&self) -> Option<GameKind> {
        self.cursor
            .checked_sub(Self::FIXED_ROWS)
            .and_then(|idx| self.games.keys().nth(idx).copied())
    }

    fn adjust(&mut self, delta: i64) {
        match self.cursor {
            0 => {
                self.game_count =
                    (self.game_count as i64 + delta).clamp(1, MAX_GAME_COUNT as i64) as usize;
            }
            1 => {
                let step = delta * FREQUENCY_STEP_SECONDS as i64;
                let seconds = self.frequency_seconds as i64 + step;
                let (min, max) = (MIN_FREQUENCY_SECONDS as i64, MAX_FREQUENCY_SECONDS as i64);
                self.frequency_seconds = seconds.clamp(min, max) as u32;
            }
            _ => self.toggle(),
        }
    }

    fn toggle(&mut self) {
        if let Some(kind) = self.game_at_cursor() {
            if let Some(enabled) = self.games.get_mut(&kind) {
                *enabled = !*enabled;
            }
        }
    }

    fn to_config(&self) -> SessionConfig {
        SessionConfig::new(
            self.game_count,
            self.frequency_seconds,
            self.games
                .iter()
                .filter(|(_, enabled)| **enabled)
                .map(|(kind, _)| *kind)
                .collect(),
        )
    }
}

/// The mini-game currently on screen and its answer state
pub struct MountedGame {
    game: Box<dyn MiniGame>,
    pub row: usize,
    pub column: usize,
    feedback: Option<FeedbackFlow>,
    prompt: Utterance,
    pub last_outcome: Option<AnswerOutcome>,
}

impl MountedGame {
    pub fn kind(&self) -> GameKind {
        self.game.kind()
    }

    pub fn view(&self) -> GameView {
        self.game.view()
    }

    fn accepts_input(&mut self) -> bool {
        let feedback_running = self
            .feedback
            .as_ref()
            .map(FeedbackFlow::is_blocking)
            .unwrap_or(false);
        !feedback_running && self.prompt.is_finished()
    }

    fn stop(&mut self) {
        if let Some(flow) = self.feedback.as_mut() {
            flow.cancel();
        }
        self.prompt.cancel();
    }
}

/// Collaborators the app is built from
pub struct AppParts {
    pub player: Box<dyn VideoPlayer>,
    pub speaker: Box<dyn Speaker>,
    pub registry: GameRegistry,
    pub catalog: Catalog,
    pub store: Box<dyn PreferencesStore>,
    pub history: Option<HistoryDb>,
    pub prefs: Preferences,
}

pub struct App {
    player: Box<dyn VideoPlayer>,
    speaker: Box<dyn Speaker>,
    registry: GameRegistry,
    catalog: Catalog,
    store: Box<dyn PreferencesStore>,
    history: Option<HistoryDb>,
    prefs: Preferences,
    controller: SessionController,
    monitor: PlaybackMonitor,
    lang: LanguageTag,
    state: AppState,
    mounted: Option<MountedGame>,
    settings: Option<SettingsForm>,
    status: Option<String>,
    last_summary: Option<SessionSummary>,
    should_quit: bool,
    rng: StdRng,
}

impl App {
    pub fn new(parts: AppParts) -> Self {
        Self::with_rng(parts, StdRng::from_entropy())
    }

    pub fn with_rng(parts: AppParts, mut rng: StdRng) -> Self {
        let AppParts {
            mut player,
            speaker,
            registry,
            catalog,
            store,
            history,
            prefs,
        } = parts;

        let video = match &prefs.current_video_id {
            Some(id) => catalog.resolve(id),
            None => catalog.default_video(),
        };
        player.load_video(&video);
        if prefs.current_video_time > 0.0 {
            player.seek(prefs.current_video_time);
        }
        player.play();

        let config = prefs.session_config();
        let monitor = PlaybackMonitor::new(config.frequency_seconds, player.current_time());
        let controller = SessionController::with_rng(
            config,
            registry.kinds(),
            StdRng::seed_from_u64(rng.gen()),
        );

        let mut prefs = prefs;
        prefs.current_video_id = Some(video.id.clone());

        Self {
            player,
            speaker,
            registry,
            catalog,
            store,
            history,
            prefs,
            controller,
            monitor,
            lang: LanguageTag::default(),
            state: AppState::Watching,
            mounted: None,
            settings: None,
            status: None,
            last_summary: None,
            should_quit: false,
            rng,
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn player(&self) -> &dyn VideoPlayer {
        self.player.as_ref()
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn monitor(&self) -> &PlaybackMonitor {
        &self.monitor
    }

    pub fn mounted(&self) -> Option<&MountedGame> {
        self.mounted.as_ref()
    }

    pub fn settings(&self) -> Option<&SettingsForm> {
        self.settings.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn current_video(&self) -> Video {
        let id = self.prefs.current_video_id.as_deref().unwrap_or_default();
        self.catalog.resolve(id)
    }

    /// TUI chrome is hidden while the player is fullscreen
    pub fn is_fullscreen(&self) -> bool {
        self.player.is_fullscreen()
    }

    pub fn on_tick(&mut self, now_ms: u64) {
        self.player.update(now_ms);
        self.poll_feedback(now_ms);

        for event in self.controller.poll(self.player.as_mut(), now_ms) {
            match event {
                SessionEvent::Ended(summary) => self.session_ended(summary),
                SessionEvent::FullscreenRestored => tracing::debug!("fullscreen restored"),
                SessionEvent::FullscreenAbandoned => {
                    self.status = Some("Press f to go back to fullscreen".to_string());
                }
            }
        }

        if self
            .monitor
            .on_tick(now_ms, self.player.as_ref(), self.controller.is_active())
            .is_some()
        {
            self.start_session(TriggerSource::Automatic, now_ms);
        }
    }

    pub fn on_key(&mut self, key: KeyEvent, now_ms: u64) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit(now_ms);
            return;
        }

        match self.state {
            AppState::Watching => self.on_watching_key(key, now_ms),
            AppState::Exercise => self.on_exercise_key(key, now_ms),
            AppState::Settings => self.on_settings_key(key),
        }
    }

    /// Starts an exercise session right away
    pub fn start_session(&mut self, trigger: TriggerSource, now_ms: u64) {
        match self.controller.start(trigger, self.player.as_mut(), now_ms) {
            Ok(StartOutcome::Started) => {
                self.status = None;
                self.settings = None;
                self.mount_current();
            }
            Ok(StartOutcome::AlreadyActive) => {}
            Ok(StartOutcome::PlayerUnavailable) => {
                self.status = Some("The video is still loading".to_string());
            }
            Err(err) => {
                tracing::warn!("unable to start exercises: {err}");
                self.status = Some(err.to_string());
            }
        }
    }

    /// Abandons the running session, if any
    pub fn close_session(&mut self, now_ms: u64) {
        if let Some(summary) = self.controller.close(self.player.as_mut(), now_ms) {
            self.session_ended(summary);
        }
    }

    pub fn quit(&mut self, now_ms: u64) {
        self.close_session(now_ms);
        self.controller.teardown();
        if let Some(mut mounted) = self.mounted.take() {
            mounted.stop();
        }

        self.prefs.current_video_time = self.player.current_time();
        if let Err(err) = self.store.save(&self.prefs) {
            tracing::warn!("unable to save preferences: {err}");
        }
        self.should_quit = true;
    }

    fn on_watching_key(&mut self, key: KeyEvent, now_ms: u64) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.quit(now_ms),
            KeyCode::Char(' ') => {
                if self.player.state() == PlayerState::Playing {
                    self.player.pause();
                } else {
                    self.player.play();
                }
            }
            KeyCode::Char('x') => self.start_session(TriggerSource::Manual, now_ms),
            KeyCode::Char('f') => self.toggle_fullscreen(),
            KeyCode::Left => {
                let target = (self.player.current_time() - SEEK_STEP_SECONDS).max(0.0);
                self.player.seek(target);
            }
            KeyCode::Right => {
                let target = self.player.current_time() + SEEK_STEP_SECONDS;
                self.player.seek(target);
            }
            KeyCode::Char('s') => {
                self.settings = Some(SettingsForm::from_config(self.controller.config()));
                self.state = AppState::Settings;
            }
            KeyCode::Char('n') => {
                let current = self.current_video();
                let next = self.catalog.next_after(&current.id);
                self.load_video(&next);
            }
            _ => {}
        }
    }

    fn on_exercise_key(&mut self, key: KeyEvent, now_ms: u64) {
        if key.code == KeyCode::Esc {
            self.close_session(now_ms);
            return;
        }

        let finishing = self
            .controller
            .active()
            .map(|session| session.finishing)
            .unwrap_or(true);
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        if finishing || !mounted.accepts_input() {
            return;
        }

        let rows = mounted.game.view().rows;
        let row_len = |row: usize| rows.get(row).map(Vec::len).unwrap_or(0);

        let choice = match key.code {
            KeyCode::Left => {
                mounted.column = mounted.column.saturating_sub(1);
                None
            }
            KeyCode::Right => {
                if mounted.column + 1 < row_len(mounted.row) {
                    mounted.column += 1;
                }
                None
            }
            KeyCode::Up => {
                mounted.row = mounted.row.saturating_sub(1);
                mounted.column = mounted.column.min(row_len(mounted.row).saturating_sub(1));
                None
            }
            KeyCode::Down => {
                if mounted.row + 1 < rows.len() {
                    mounted.row += 1;
                }
                mounted.column = mounted.column.min(row_len(mounted.row).saturating_sub(1));
                None
            }
            KeyCode::Enter => Some((mounted.row, mounted.column)),
            KeyCode::Char(c) => c
                .to_digit(10)
                .filter(|d| *d >= 1)
                .map(|d| (mounted.row, d as usize - 1)),
            _ => None,
        };

        if let Some((row, index)) = choice {
            self.answer(row, index, now_ms);
        }
    }

    fn on_settings_key(&mut self, key: KeyEvent) {
        let Some(form) = self.settings.as_mut() else {
            self.state = AppState::Watching;
            return;
        };

        match key.code {
            KeyCode::Esc => {
                self.settings = None;
                self.state = AppState::Watching;
            }
            KeyCode::Up => form.cursor = form.cursor.saturating_sub(1),
            KeyCode::Down => form.cursor = (form.cursor + 1).min(form.rows() - 1),
            KeyCode::Left => form.adjust(-1),
            KeyCode::Right => form.adjust(1),
            KeyCode::Char(' ') => form.toggle(),
            KeyCode::Enter => {
                let config = form.to_config();
                self.apply_settings(config);
                self.settings = None;
                self.state = AppState::Watching;
            }
            _ => {}
        }
    }

    /// Stores new session settings and applies them to the next session
    pub fn apply_settings(&mut self, config: SessionConfig) {
        self.prefs.apply_session_config(&config);
        self.monitor.set_frequency(config.frequency_seconds);
        self.controller.set_config(config);

        match self.store.save(&self.prefs) {
            Ok(()) => self.status = Some("Settings saved".to_string()),
            Err(err) => {
                tracing::warn!("unable to save preferences: {err}");
                self.status = Some(format!("Settings not saved: {err}"));
            }
        }
    }

    pub fn load_video(&mut self, video: &Video) {
        if self.controller.is_active() {
            return;
        }
        self.player.load_video(video);
        self.player.play();
        self.monitor.reset(self.player.current_time());
        self.prefs.current_video_id = Some(video.id.clone());
        self.prefs.current_video_time = 0.0;
    }

    fn toggle_fullscreen(&mut self) {
        if self.player.is_fullscreen() {
            self.player.exit_fullscreen();
        } else if let Err(err) = self.player.request_fullscreen() {
            tracing::warn!("fullscreen request failed: {err}");
            self.status = Some(err.to_string());
        }
    }

    fn answer(&mut self, row: usize, index: usize, now_ms: u64) {
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        let rows = mounted.game.view().rows.len();

        match mounted.game.choose(row, index) {
            Some(attempt) => {
                let outcome = AnswerOutcome::new(attempt.correct, self.lang, &mut self.rng);
                mounted.feedback = Some(FeedbackFlow::begin(
                    &attempt,
                    outcome.clone(),
                    self.lang,
                    self.speaker.as_mut(),
                    now_ms,
                ));
                mounted.last_outcome = Some(outcome);
                mounted.row = 0;
            }
            None => {
                if let Some(text) = mounted.game.selection_speech() {
                    mounted.prompt.cancel();
                    mounted.prompt = speak_or_finish(self.speaker.as_mut(), &text, self.lang);
                }
                if row + 1 < rows && index < mounted.game.view().rows[row].len() {
                    mounted.row = row + 1;
                    mounted.column = 0;
                }
            }
        }
    }

    fn poll_feedback(&mut self, now_ms: u64) {
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        let Some(flow) = mounted.feedback.as_mut() else {
            return;
        };

        match flow.poll(self.speaker.as_mut(), now_ms) {
            Some(FeedbackDone::Completed) => {
                mounted.feedback = None;
                match self.controller.complete_current(now_ms) {
                    CompletionOutcome::Advanced(_) => self.mount_current(),
                    CompletionOutcome::Finishing | CompletionOutcome::Ignored => {}
                }
            }
            Some(FeedbackDone::Retry) => {
                mounted.feedback = None;
                mounted.last_outcome = None;
            }
            None => {}
        }
    }

    fn mount_current(&mut self) {
        if let Some(mut previous) = self.mounted.take() {
            previous.stop();
        }

        let Some(kind) = self.controller.current_kind() else {
            return;
        };
        let Some(game) = self.registry.create(kind) else {
            tracing::error!("no game registered for {kind}");
            return;
        };

        let prompt = match game.prompt_speech() {
            Some(text) => speak_or_finish(self.speaker.as_mut(), &text, self.lang),
            None => Utterance::Finished,
        };

        self.mounted = Some(MountedGame {
            game,
            row: 0,
            column: 0,
            feedback: None,
            prompt,
            last_outcome: None,
        });
        self.state = AppState::Exercise;
    }

    fn session_ended(&mut self, summary: SessionSummary) {
        if let Some(mut mounted) = self.mounted.take() {
            mounted.stop();
        }
        if self.state == AppState::Exercise {
            self.state = AppState::Watching;
        }

        if let Some(history) = &self.history {
            if let Err(err) = history.record(&summary) {
                tracing::warn!("unable to record session: {err}");
            }
        }
        self.last_summary = Some(summary);
    }
}

fn speak_or_finish(speaker: &mut dyn Speaker, text: &str, lang: LanguageTag) -> Utterance {
    speaker.speak(text, lang).unwrap_or_else(|err| {
        tracing::warn!("prompt speech failed: {err}");
        Utterance::Finished
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilePreferencesStore;
    use crate::player::ScriptedPlayer;
    use crate::speech::{RecordingSpeaker, SpeechRecord};
    use assert_matches::assert_matches;
    use crossterm::event::KeyEventKind;
    use tempfile::tempdir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with(prefs: Preferences, store_dir: &std::path::Path) -> App {
        app_with_speaker(prefs, store_dir, RecordingSpeaker::new())
    }

    fn app_with_speaker(
        prefs: Preferences,
        store_dir: &std::path::Path,
        speaker: RecordingSpeaker,
    ) -> App {
        App::with_rng(
            AppParts {
                player: Box::new(ScriptedPlayer::default()),
                speaker: Box::new(speaker),
                registry: GameRegistry::standard().unwrap(),
                catalog: Catalog::load().unwrap(),
                store: Box::new(FilePreferencesStore::with_path(store_dir.join("prefs.json"))),
                history: Some(HistoryDb::in_memory().unwrap()),
                prefs,
            },
            StdRng::seed_from_u64(1),
        )
    }

    #[test]
    fn manual_start_mounts_first_game() {
        let dir = tempdir().unwrap();
        let mut app = app_with(Preferences::default(), dir.path());

        app.on_key(key(KeyCode::Char('x')), 0);

        assert_eq!(app.state(), AppState::Exercise);
        assert_eq!(app.player().state(), PlayerState::Paused);
        let kind = app.controller().current_kind().unwrap();
        assert_eq!(app.mounted().unwrap().kind(), kind);
    }

    #[test]
    fn escape_abandons_session() {
        let dir = tempdir().unwrap();
        let mut app = app_with(Preferences::default(), dir.path());

        app.on_key(key(KeyCode::Char('x')), 0);
        app.on_key(key(KeyCode::Esc), 100);

        assert_eq!(app.state(), AppState::Watching);
        assert!(app.mounted().is_none());
        assert_eq!(app.player().state(), PlayerState::Playing);
        assert_eq!(
            app.last_summary().unwrap().outcome,
            crate::session::SessionOutcome::Abandoned
        );
    }

    #[test]
    fn settings_save_and_apply() {
        let dir = tempdir().unwrap();
        let mut app = app_with(Preferences::default(), dir.path());

        app.on_key(key(KeyCode::Char('s')), 0);
        assert_eq!(app.state(), AppState::Settings);
        app.on_key(key(KeyCode::Right), 0);
        app.on_key(key(KeyCode::Down), 0);
        app.on_key(key(KeyCode::Right), 0);
        app.on_key(key(KeyCode::Down), 0);
        app.on_key(key(KeyCode::Char(' ')), 0);
        app.on_key(key(KeyCode::Enter), 0);

        assert_eq!(app.state(), AppState::Watching);
        assert_eq!(app.controller().config().game_count, 4);
        assert_eq!(app.controller().config().frequency_seconds, 120);
        assert!(!app.controller().config().enabled.contains(&GameKind::Numbers));
        assert_eq!(app.monitor().frequency_seconds(), 120);

        let saved = FilePreferencesStore::with_path(dir.path().join("prefs.json")).load();
        assert_eq!(saved.num_exercises, 4);
        assert!(!saved.selected_games[&GameKind::Numbers]);
    }

    #[test]
    fn settings_keep_frequency_that_is_not_whole_minutes() {
        let dir = tempdir().unwrap();
        let prefs = Preferences {
            frequency_seconds: 90,
            ..Default::default()
        };
        let mut app = app_with(prefs, dir.path());

        // only the game count changes
        app.on_key(key(KeyCode::Char('s')), 0);
        app.on_key(key(KeyCode::Right), 0);
        app.on_key(key(KeyCode::Enter), 0);

        assert_eq!(app.controller().config().frequency_seconds, 90);
        let saved = FilePreferencesStore::with_path(dir.path().join("prefs.json")).load();
        assert_eq!(saved.frequency_seconds, 90);

        app.on_key(key(KeyCode::Char('s')), 0);
        app.on_key(key(KeyCode::Down), 0);
        app.on_key(key(KeyCode::Right), 0);
        assert_eq!(app.settings().unwrap().frequency_seconds, 150);
        app.on_key(key(KeyCode::Left), 0);
        app.on_key(key(KeyCode::Left), 0);
        app.on_key(key(KeyCode::Enter), 0);

        assert_eq!(app.controller().config().frequency_seconds, MIN_FREQUENCY_SECONDS);
    }

    #[test]
    fn lone_first_syllable_is_spoken() {
        let dir = tempdir().unwrap();
        let prefs = Preferences {
            selected_games: GameKind::ALL
                .into_iter()
                .map(|kind| (kind, kind == GameKind::SyllableMatching))
                .collect(),
            ..Default::default()
        };
        let speaker = RecordingSpeaker::new();
        let log = speaker.log();
        let mut app = app_with_speaker(prefs, dir.path(), speaker);

        app.on_key(key(KeyCode::Char('x')), 0);
        let mounted = app.mounted().unwrap();
        assert_eq!(mounted.kind(), GameKind::SyllableMatching);
        let first = mounted.view().rows[0][0].label.clone();

        app.on_key(key(KeyCode::Enter), 0);

        assert_eq!(app.mounted().unwrap().row, 1);
        assert_matches!(
            log.borrow().last(),
            Some(SpeechRecord::Spoken { text, .. }) if *text == first
        );
    }

    #[test]
    fn quit_persists_video_position() {
        let dir = tempdir().unwrap();
        let prefs = Preferences {
            current_video_id: Some("e_04ZrNroTo".into()),
            current_video_time: 33.0,
            ..Default::default()
        };
        let mut app = app_with(prefs, dir.path());
        assert_eq!(app.current_video().title, "Wheels on the Bus");

        let mut press = key(KeyCode::Char('q'));
        press.kind = KeyEventKind::Press;
        app.on_key(press, 0);

        assert!(app.should_quit());
        let saved = FilePreferencesStore::with_path(dir.path().join("prefs.json")).load();
        assert_eq!(saved.current_video_id.as_deref(), Some("e_04ZrNroTo"));
        assert_eq!(saved.current_video_time, 33.0);
    }

    #[test]
    fn next_video_resets_monitor() {
        let dir = tempdir().unwrap();
        let mut app = app_with(Preferences::default(), dir.path());
        let first = app.current_video();

        app.on_key(key(KeyCode::Char('n')), 0);

        assert_ne!(app.current_video().id, first.id);
        assert_eq!(app.monitor().watch().last_trigger_position_seconds, 0.0);
        assert_eq!(app.player().state(), PlayerState::Playing);
    }
}
