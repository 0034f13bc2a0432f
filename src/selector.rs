use itertools::Itertools;
use rand::Rng;

use crate::games::GameKind;
use crate::session::SessionError;

/// Builds game sequences without repeating a kind back to back.
///
/// `last_kind` outlives a single call so the first game of a session also
/// differs from the last game of the previous one.
#[derive(Debug, Default, Clone)]
pub struct GameSelector {
    last_kind: Option<GameKind>,
}

impl GameSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_kind(&self) -> Option<GameKind> {
        self.last_kind
    }

    /// Draws `count` kinds from `enabled`, or from `registered` when nothing
    /// is enabled. Each kind is used once before the pool refills; a refill
    /// leaves out the kind picked just before it. A single kind pool simply
    /// repeats.
    pub fn select<R: Rng + ?Sized>(
        &mut self,
        enabled: &[GameKind],
        registered: &[GameKind],
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<GameKind>, SessionError> {
        let source = if enabled.is_empty() {
            tracing::info!("no games enabled, using every registered game");
            registered
        } else {
            enabled
        };
        let pool: Vec<GameKind> = source.iter().copied().unique().collect();
        if pool.is_empty() {
            return Err(SessionError::NoGamesAvailable);
        }

        let mut available: Vec<usize> = Vec::with_capacity(pool.len());
        let mut sequence = Vec::with_capacity(count);

        for _ in 0..count {
            if available.is_empty() {
                available.extend(0..pool.len());
                if pool.len() > 1 {
                    if let Some(last) = self.last_kind {
                        available.retain(|&idx| pool[idx] != last);
                    }
                }
            }

            let idx = available.swap_remove(rng.gen_range(0..available.len()));
            sequence.push(pool[idx]);
            self.last_kind = Some(pool[idx]);
        }

        Ok(sequence)
    }
}
