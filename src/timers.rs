/// Opaque id of a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Pending<K> {
    handle: TimerHandle,
    due_ms: u64,
    kind: K,
}

/// One-shot timers fired by polling with the current time
#[derive(Debug)]
pub struct TimerQueue<K> {
    next_id: u64,
    pending: Vec<Pending<K>>,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }
}

impl<K> TimerQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, kind: K, due_ms: u64) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            handle,
            due_ms,
            kind,
        });
        handle
    }

    /// Returns false when the timer already fired or was cancelled
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.handle != handle);
        self.pending.len() != before
    }

    pub fn cancel_where<F: Fn(&K) -> bool>(&mut self, predicate: F) -> usize {
        let before = self.pending.len();
        self.pending.retain(|p| !predicate(&p.kind));
        before - self.pending.len()
    }

    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        cancelled
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Removes and returns every timer due at `now_ms`, earliest first
    pub fn pop_due(&mut self, now_ms: u64) -> Vec<K> {
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.due_ms <= now_ms);
        self.pending = rest;
        due.sort_by_key(|p| (p.due_ms, p.handle.0));
        due.into_iter().map(|p| p.kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Kind {
        A,
        B,
    }

    #[test]
    fn fires_in_due_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(Kind::B, 200);
        timers.schedule(Kind::A, 100);

        assert!(timers.pop_due(50).is_empty());
        assert_eq!(timers.pop_due(250), vec![Kind::A, Kind::B]);
        assert!(timers.is_empty());
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut timers = TimerQueue::new();
        let a = timers.schedule(Kind::A, 100);
        timers.schedule(Kind::B, 100);

        assert!(timers.cancel(a));
        assert!(!timers.cancel(a));
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.pop_due(100), vec![Kind::B]);
    }

    #[test]
    fn cancel_by_kind() {
        let mut timers = TimerQueue::new();
        timers.schedule(Kind::A, 1);
        timers.schedule(Kind::A, 2);
        timers.schedule(Kind::B, 3);

        assert_eq!(timers.cancel_where(|k| *k == Kind::A), 2);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.cancel_all(), 1);
        assert!(timers.pop_due(u64::MAX).is_empty());
    }
}
