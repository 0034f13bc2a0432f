//! Exercise session state machine.
//!
//! `Idle -> Active -> Idle`. Every delayed step (the grace period after the
//! last game, fullscreen restore retries) is a cancelable timer owned by the
//! controller and fired from [`SessionController::poll`].

use std::collections::HashSet;

use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::games::GameKind;
use crate::player::VideoPlayer;
use crate::selector::GameSelector;
use crate::timers::{TimerHandle, TimerQueue};

pub const MAX_GAME_COUNT: usize = 20;
pub const MIN_FREQUENCY_SECONDS: u32 = 60;
pub const DEFAULT_GAME_COUNT: usize = 3;
pub const DEFAULT_FREQUENCY_SECONDS: u32 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no mini-games are registered")]
    NoGamesAvailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub game_count: usize,
    pub frequency_seconds: u32,
    /// Empty means every registered game
    pub enabled: HashSet<GameKind>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            game_count: DEFAULT_GAME_COUNT,
            frequency_seconds: DEFAULT_FREQUENCY_SECONDS,
            enabled: GameKind::ALL.into_iter().collect(),
        }
    }
}

impl SessionConfig {
    pub fn new(game_count: usize, frequency_seconds: u32, enabled: HashSet<GameKind>) -> Self {
        Self {
            game_count: game_count.clamp(1, MAX_GAME_COUNT),
            frequency_seconds: frequency_seconds.max(MIN_FREQUENCY_SECONDS),
            enabled,
        }
    }

    /// Enabled kinds in declaration order
    pub fn enabled_kinds(&self) -> Vec<GameKind> {
        GameKind::ALL
            .into_iter()
            .filter(|kind| self.enabled.contains(kind))
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionTimings {
    /// Delay between the last completion and the session end
    pub grace_delay_ms: u64,
    /// Delay before the first fullscreen restore attempt
    pub fullscreen_delay_ms: u64,
    pub fullscreen_retry_ms: u64,
    pub fullscreen_attempts: u32,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            grace_delay_ms: 500,
            fullscreen_delay_ms: 100,
            fullscreen_retry_ms: 500,
            fullscreen_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TriggerSource {
    Automatic,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionOutcome {
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub trigger: TriggerSource,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub sequence: Vec<GameKind>,
    pub completed: usize,
    pub outcome: SessionOutcome,
}

impl SessionSummary {
    pub fn game_count(&self) -> usize {
        self.sequence.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub trigger: TriggerSource,
    pub started_at: DateTime<Local>,
    pub sequence: Vec<GameKind>,
    pub current_index: usize,
    pub completed_count: usize,
    /// Last game done, waiting out the grace delay
    pub finishing: bool,
    was_fullscreen: bool,
}

impl ActiveSession {
    pub fn current_kind(&self) -> Option<GameKind> {
        self.sequence.get(self.current_index).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Active(ActiveSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyActive,
    /// Player not initialized yet; the trigger is dropped
    PlayerUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Next game at this index is now mounted
    Advanced(usize),
    /// All games done, session ends after the grace delay
    Finishing,
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Ended(SessionSummary),
    FullscreenRestored,
    FullscreenAbandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionTimer {
    SessionEnd,
    FullscreenRetry { attempt: u32 },
}

pub struct SessionController {
    config: SessionConfig,
    timings: SessionTimings,
    registered: Vec<GameKind>,
    selector: GameSelector,
    state: SessionState,
    timers: TimerQueue<SessionTimer>,
    end_timer: Option<TimerHandle>,
    rng: StdRng,
}

impl SessionController {
    pub fn new(config: SessionConfig, registered: Vec<GameKind>) -> Self {
        Self::with_rng(config, registered, StdRng::from_entropy())
    }

    pub fn with_rng(config: SessionConfig, registered: Vec<GameKind>, rng: StdRng) -> Self {
        Self {
            config,
            timings: SessionTimings::default(),
            registered,
            selector: GameSelector::new(),
            state: SessionState::Idle,
            timers: TimerQueue::new(),
            end_timer: None,
            rng,
        }
    }

    pub fn with_timings(mut self, timings: SessionTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Takes effect from the next session on
    pub fn set_config(&mut self, config: SessionConfig) {
        self.config = config;
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        match &self.state {
            SessionState::Active(session) => Some(session),
            SessionState::Idle => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active().is_some()
    }

    pub fn current_kind(&self) -> Option<GameKind> {
        self.active().and_then(ActiveSession::current_kind)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn start(
        &mut self,
        trigger: TriggerSource,
        player: &mut dyn VideoPlayer,
        now_ms: u64,
    ) -> Result<StartOutcome, SessionError> {
        if self.is_active() {
            tracing::debug!("{trigger} trigger ignored, a session is already running");
            return Ok(StartOutcome::AlreadyActive);
        }
        if !player.is_ready() {
            tracing::debug!("{trigger} trigger dropped, player not ready");
            return Ok(StartOutcome::PlayerUnavailable);
        }

        let enabled: Vec<GameKind> = self
            .config
            .enabled_kinds()
            .into_iter()
            .filter(|kind| self.registered.contains(kind))
            .collect();
        let sequence = self.selector.select(
            &enabled,
            &self.registered,
            self.config.game_count.max(1),
            &mut self.rng,
        )?;

        self.timers
            .cancel_where(|timer| matches!(timer, SessionTimer::FullscreenRetry { .. }));

        player.pause();
        let was_fullscreen = player.is_fullscreen();
        if was_fullscreen {
            player.exit_fullscreen();
        }

        tracing::info!(
            "{trigger} session started at {now_ms}ms: {}",
            sequence.iter().map(|kind| kind.to_string()).collect::<Vec<_>>().join(", ")
        );
        self.state = SessionState::Active(ActiveSession {
            trigger,
            started_at: Local::now(),
            sequence,
            current_index: 0,
            completed_count: 0,
            finishing: false,
            was_fullscreen,
        });
        Ok(StartOutcome::Started)
    }

    /// Completion signal of the mounted game
    pub fn complete_current(&mut self, now_ms: u64) -> CompletionOutcome {
        let SessionState::Active(session) = &mut self.state else {
            return CompletionOutcome::Ignored;
        };
        if session.finishing {
            return CompletionOutcome::Ignored;
        }

        session.completed_count += 1;
        let count = session.sequence.len();
        if session.completed_count >= count {
            session.finishing = true;
            self.end_timer = Some(
                self.timers
                    .schedule(SessionTimer::SessionEnd, now_ms + self.timings.grace_delay_ms),
            );
            return CompletionOutcome::Finishing;
        }

        session.current_index = session.completed_count.min(count - 1);
        CompletionOutcome::Advanced(session.current_index)
    }

    /// User closed the dialog
    pub fn close(&mut self, player: &mut dyn VideoPlayer, now_ms: u64) -> Option<SessionSummary> {
        if let Some(handle) = self.end_timer.take() {
            self.timers.cancel(handle);
        }
        self.finish(player, now_ms)
    }

    /// Fires due timers
    pub fn poll(&mut self, player: &mut dyn VideoPlayer, now_ms: u64) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        for timer in self.timers.pop_due(now_ms) {
            match timer {
                SessionTimer::SessionEnd => {
                    self.end_timer = None;
                    if let Some(summary) = self.finish(player, now_ms) {
                        events.push(SessionEvent::Ended(summary));
                    }
                }
                SessionTimer::FullscreenRetry { attempt } => {
                    match player.request_fullscreen() {
                        Ok(()) => events.push(SessionEvent::FullscreenRestored),
                        Err(err) if attempt + 1 < self.timings.fullscreen_attempts => {
                            tracing::debug!("fullscreen attempt {} failed: {err}", attempt + 1);
                            self.timers.schedule(
                                SessionTimer::FullscreenRetry {
                                    attempt: attempt + 1,
                                },
                                now_ms + self.timings.fullscreen_retry_ms,
                            );
                        }
                        Err(err) => {
                            tracing::warn!("giving up on restoring fullscreen: {err}");
                            events.push(SessionEvent::FullscreenAbandoned);
                        }
                    }
                }
            }
        }

        events
    }

    pub fn teardown(&mut self) {
        let cancelled = self.timers.cancel_all();
        self.end_timer = None;
        if cancelled > 0 {
            tracing::debug!("cancelled {cancelled} session timers");
        }
    }

    fn finish(&mut self, player: &mut dyn VideoPlayer, now_ms: u64) -> Option<SessionSummary> {
        let SessionState::Active(session) = std::mem::replace(&mut self.state, SessionState::Idle)
        else {
            return None;
        };

        player.play();
        if session.was_fullscreen {
            self.timers.schedule(
                SessionTimer::FullscreenRetry { attempt: 0 },
                now_ms + self.timings.fullscreen_delay_ms,
            );
        }

        let outcome = if session.completed_count >= session.sequence.len() {
            SessionOutcome::Completed
        } else {
            SessionOutcome::Abandoned
        };
        tracing::info!(
            "session {outcome} with {}/{} games",
            session.completed_count,
            session.sequence.len()
        );

        Some(SessionSummary {
            trigger: session.trigger,
            started_at: session.started_at,
            ended_at: Local::now(),
            sequence: session.sequence,
            completed: session.completed_count,
            outcome,
        })
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("pending_timers", &self.timers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{PlayerCall, PlayerState, ScriptedPlayer};
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn controller(count: usize, enabled: &[GameKind]) -> SessionController {
        SessionController::with_rng(
            SessionConfig::new(count, 60, enabled.iter().copied().collect()),
            GameKind::ALL.to_vec(),
            StdRng::seed_from_u64(11),
        )
    }

    fn ended(events: &[SessionEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Ended(_)))
            .count()
    }

    #[test]
    fn config_clamps() {
        let config = SessionConfig::new(0, 10, HashSet::new());
        assert_eq!(config.game_count, 1);
        assert_eq!(config.frequency_seconds, MIN_FREQUENCY_SECONDS);
        assert_eq!(SessionConfig::new(99, 600, HashSet::new()).game_count, MAX_GAME_COUNT);
    }

    #[test]
    fn numbers_only_end_to_end() {
        let mut controller = controller(3, &[GameKind::Numbers]);
        let mut player = ScriptedPlayer::default();

        assert_eq!(
            controller.start(TriggerSource::Automatic, &mut player, 0),
            Ok(StartOutcome::Started)
        );
        assert_eq!(player.state, PlayerState::Paused);
        assert_eq!(
            controller.active().unwrap().sequence,
            vec![GameKind::Numbers; 3]
        );

        assert_eq!(controller.complete_current(1_000), CompletionOutcome::Advanced(1));
        assert_eq!(controller.complete_current(2_000), CompletionOutcome::Advanced(2));
        assert_eq!(controller.complete_current(3_500), CompletionOutcome::Finishing);
        assert_eq!(controller.complete_current(3_600), CompletionOutcome::Ignored);
        assert!(controller.poll(&mut player, 3_900).is_empty());
        assert_eq!(player.count(&PlayerCall::Play), 0);

        let events = controller.poll(&mut player, 4_000);
        assert_eq!(ended(&events), 1);
        assert_matches!(
            &events[0],
            SessionEvent::Ended(s) if s.outcome == SessionOutcome::Completed && s.completed == 3
        );
        assert!(!controller.is_active());
        assert_eq!(player.count(&PlayerCall::Play), 1);

        assert_eq!(controller.complete_current(4_100), CompletionOutcome::Ignored);
        assert!(controller.poll(&mut player, 10_000).is_empty());
        assert_eq!(player.count(&PlayerCall::Play), 1);
    }

    #[test]
    fn second_trigger_is_ignored() {
        let mut controller = controller(2, &GameKind::ALL);
        let mut player = ScriptedPlayer::default();

        controller.start(TriggerSource::Manual, &mut player, 0).unwrap();
        let sequence = controller.active().unwrap().sequence.clone();
        assert_eq!(
            controller.start(TriggerSource::Automatic, &mut player, 10),
            Ok(StartOutcome::AlreadyActive)
        );
        assert_eq!(controller.active().unwrap().sequence, sequence);
        assert_eq!(player.count(&PlayerCall::Pause), 1);
    }

    #[test]
    fn unready_player_drops_trigger() {
        let mut controller = controller(2, &GameKind::ALL);
        let mut player = ScriptedPlayer {
            ready: false,
            ..Default::default()
        };

        assert_eq!(
            controller.start(TriggerSource::Automatic, &mut player, 0),
            Ok(StartOutcome::PlayerUnavailable)
        );
        assert!(!controller.is_active());
        assert!(player.calls.is_empty());
    }

    #[test]
    fn empty_registry_is_a_configuration_error() {
        let mut controller = SessionController::with_rng(
            SessionConfig::new(3, 60, HashSet::new()),
            Vec::new(),
            StdRng::seed_from_u64(1),
        );
        let mut player = ScriptedPlayer::default();

        assert_eq!(
            controller.start(TriggerSource::Manual, &mut player, 0),
            Err(SessionError::NoGamesAvailable)
        );
        assert!(!controller.is_active());
        assert!(player.calls.is_empty());
    }

    #[test]
    fn close_abandons_and_cancels_end_timer() {
        let mut controller = controller(2, &GameKind::ALL);
        let mut player = ScriptedPlayer::default();

        controller.start(TriggerSource::Manual, &mut player, 0).unwrap();
        controller.complete_current(100);
        let summary = controller.close(&mut player, 200).unwrap();
        assert_eq!(summary.outcome, SessionOutcome::Abandoned);
        assert_eq!(summary.completed, 1);
        assert_eq!(player.count(&PlayerCall::Play), 1);

        assert!(controller.close(&mut player, 300).is_none());
        assert_eq!(controller.pending_timers(), 0);
    }

    #[test]
    fn close_during_grace_counts_as_completed() {
        let mut controller = controller(1, &GameKind::ALL);
        let mut player = ScriptedPlayer::default();

        controller.start(TriggerSource::Manual, &mut player, 0).unwrap();
        assert_eq!(controller.complete_current(100), CompletionOutcome::Finishing);
        let summary = controller.close(&mut player, 200).unwrap();
        assert_eq!(summary.outcome, SessionOutcome::Completed);

        assert!(controller.poll(&mut player, 5_000).is_empty());
        assert_eq!(player.count(&PlayerCall::Play), 1);
    }

    #[test]
    fn fullscreen_restored_after_retries() {
        let mut controller = controller(1, &GameKind::ALL);
        let mut player = ScriptedPlayer {
            fullscreen: true,
            fullscreen_denials: 2,
            ..Default::default()
        };

        controller.start(TriggerSource::Manual, &mut player, 0).unwrap();
        assert!(!player.fullscreen);
        controller.close(&mut player, 1_000);

        assert!(controller.poll(&mut player, 1_100).is_empty());
        assert!(controller.poll(&mut player, 1_600).is_empty());
        assert_eq!(
            controller.poll(&mut player, 2_100),
            vec![SessionEvent::FullscreenRestored]
        );
        assert!(player.fullscreen);
        assert_eq!(player.count(&PlayerCall::RequestFullscreen), 3);
        assert_eq!(controller.pending_timers(), 0);
    }

    #[test]
    fn fullscreen_restore_gives_up() {
        let mut controller = controller(1, &GameKind::ALL);
        let mut player = ScriptedPlayer {
            fullscreen: true,
            fullscreen_denials: u32::MAX,
            ..Default::default()
        };

        controller.start(TriggerSource::Manual, &mut player, 0).unwrap();
        controller.close(&mut player, 0);

        let events: Vec<_> = (0..20)
            .flat_map(|step| controller.poll(&mut player, step * 500))
            .collect();
        assert_eq!(events, vec![SessionEvent::FullscreenAbandoned]);
        assert_eq!(
            player.count(&PlayerCall::RequestFullscreen),
            SessionTimings::default().fullscreen_attempts as usize
        );
        assert_eq!(controller.pending_timers(), 0);
    }

    #[test]
    fn new_session_cancels_stale_fullscreen_retry() {
        let mut controller = controller(1, &GameKind::ALL);
        let mut player = ScriptedPlayer {
            fullscreen: true,
            ..Default::default()
        };

        controller.start(TriggerSource::Manual, &mut player, 0).unwrap();
        controller.close(&mut player, 0);
        controller.start(TriggerSource::Manual, &mut player, 50).unwrap();

        assert!(controller.poll(&mut player, 10_000).is_empty());
        assert_eq!(player.count(&PlayerCall::RequestFullscreen), 0);
    }

    #[test]
    fn teardown_cancels_everything() {
        let mut controller = controller(1, &GameKind::ALL);
        let mut player = ScriptedPlayer {
            fullscreen: true,
            ..Default::default()
        };

        controller.start(TriggerSource::Manual, &mut player, 0).unwrap();
        controller.complete_current(10);
        controller.teardown();

        assert_eq!(controller.pending_timers(), 0);
        assert!(controller.poll(&mut player, 60_000).is_empty());
    }

    #[test]
    fn last_kind_carries_across_sessions() {
        let mut controller = controller(3, &[GameKind::Numbers, GameKind::Alphabet]);
        let mut player = ScriptedPlayer::default();

        for round in 0..10u64 {
            controller.start(TriggerSource::Manual, &mut player, round * 1000).unwrap();
            let sequence = controller.active().unwrap().sequence.clone();
            let summary = controller.close(&mut player, round * 1000 + 1).unwrap();
            assert_eq!(summary.sequence, sequence);
            if round > 0 {
                assert!(sequence.windows(2).all(|pair| pair[0] != pair[1]));
            }
        }
    }

    proptest! {
        #[test]
        fn completes_exactly_once(
            count in 1usize..=MAX_GAME_COUNT,
            extra in 0usize..5,
            gaps in proptest::collection::vec(0u64..2_000, 25),
        ) {
            let mut controller = controller(count, &GameKind::ALL);
            let mut player = ScriptedPlayer::default();
            controller.start(TriggerSource::Automatic, &mut player, 0).unwrap();

            let mut now = 0;
            let mut ends = 0;
            for gap in gaps.iter().take(count + extra) {
                now += gap;
                ends += ended(&controller.poll(&mut player, now));
                controller.complete_current(now);
                if let Some(session) = controller.active() {
                    prop_assert!(session.current_index < count);
                }
            }
            ends += ended(&controller.poll(&mut player, now + 1_000));

            prop_assert_eq!(ends, 1);
            prop_assert!(!controller.is_active());
            prop_assert_eq!(player.count(&PlayerCall::Play), 1);
        }

        #[test]
        fn rapid_completions_never_overrun(
            count in 1usize..=MAX_GAME_COUNT,
            signals in 1usize..60
        ) {
            let mut controller = controller(count, &GameKind::ALL);
            let mut player = ScriptedPlayer::default();
            controller.start(TriggerSource::Manual, &mut player, 0).unwrap();

            for _ in 0..signals {
                controller.complete_current(0);
                let session = controller.active().unwrap();
                prop_assert!(session.current_index < count);
                prop_assert!(session.completed_count <= count);
            }
        }
    }
}
