use crate::player::{PlayerState, VideoPlayer};

/// Minimum spacing between two position polls
pub const POLL_INTERVAL_MS: u64 = 1000;

/// Where on the timeline the last session was triggered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackWatch {
    pub last_trigger_position_seconds: f64,
    /// True while the video plays and no session is open
    pub is_monitoring: bool,
}

impl PlaybackWatch {
    pub fn new(baseline_seconds: f64) -> Self {
        Self {
            last_trigger_position_seconds: baseline_seconds,
            is_monitoring: false,
        }
    }

    /// Absolute distance from the last trigger, so seeking in either
    /// direction counts. Moves the baseline when it fires.
    pub fn check(&mut self, position_seconds: f64, frequency_seconds: u32) -> Option<f64> {
        let distance = (position_seconds - self.last_trigger_position_seconds).abs();
        if distance >= f64::from(frequency_seconds) {
            self.last_trigger_position_seconds = position_seconds;
            Some(position_seconds)
        } else {
            None
        }
    }
}

/// Decides when watched time calls for an exercise session
#[derive(Debug)]
pub struct PlaybackMonitor {
    watch: PlaybackWatch,
    frequency_seconds: u32,
    last_poll_ms: Option<u64>,
}

impl PlaybackMonitor {
    pub fn new(frequency_seconds: u32, baseline_seconds: f64) -> Self {
        Self {
            watch: PlaybackWatch::new(baseline_seconds),
            frequency_seconds,
            last_poll_ms: None,
        }
    }

    pub fn watch(&self) -> &PlaybackWatch {
        &self.watch
    }

    pub fn frequency_seconds(&self) -> u32 {
        self.frequency_seconds
    }

    pub fn set_frequency(&mut self, frequency_seconds: u32) {
        self.frequency_seconds = frequency_seconds;
    }

    /// Start over for a freshly loaded video
    pub fn reset(&mut self, baseline_seconds: f64) {
        self.watch = PlaybackWatch::new(baseline_seconds);
        self.last_poll_ms = None;
    }

    /// Seconds until the next trigger at the current position
    pub fn remaining_seconds(&self, position_seconds: f64) -> f64 {
        let distance = (position_seconds - self.watch.last_trigger_position_seconds).abs();
        (f64::from(self.frequency_seconds) - distance).max(0.0)
    }

    /// Returns the trigger position when a session should start. Inert
    /// while paused, while the player is not ready or while a session is
    /// already running.
    pub fn on_tick(
        &mut self,
        now_ms: u64,
        player: &dyn VideoPlayer,
        session_active: bool,
    ) -> Option<f64> {
        self.watch.is_monitoring =
            player.is_ready() && player.state() == PlayerState::Playing && !session_active;
        if !self.watch.is_monitoring {
            return None;
        }

        if let Some(last) = self.last_poll_ms {
            if now_ms.saturating_sub(last) < POLL_INTERVAL_MS {
                return None;
            }
        }
        self.last_poll_ms = Some(now_ms);

        let trigger = self
            .watch
            .check(player.current_time(), self.frequency_seconds);
        if let Some(position) = trigger {
            tracing::info!("exercise break due at {position:.1}s");
        }
        trigger
    }
}
