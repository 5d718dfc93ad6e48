//! Deterministic debounce window driven by caller-supplied instants.

use std::time::{Duration, Instant};

/// Holds the latest value of a burst until the burst has been quiet for `delay`.
///
/// Each [`schedule`](Debouncer::schedule) replaces the pending value and re-arms
/// the deadline, so at most one value is released per burst. Reading a due
/// value does not clear it; the owner calls [`take`](Debouncer::take) once the
/// value has been handled, so a failed write leaves it pending.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&mut self, now: Instant, value: T) {
        self.pending = Some((now + self.delay, value));
    }

    /// The pending value if its deadline has passed.
    pub fn due(&self, now: Instant) -> Option<&T> {
        match &self.pending {
            Some((deadline, value)) if now >= *deadline => Some(value),
            _ => None,
        }
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(_, value)| value)
    }

    /// Clear the pending value regardless of the deadline.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_releases_only_last_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(1000));
        for i in 0..10u64 {
            debouncer.schedule(start + Duration::from_millis(i * 100), i);
            assert_eq!(debouncer.due(start + Duration::from_millis(i * 100 + 50)), None);
        }
        assert_eq!(debouncer.due(start + Duration::from_millis(1800)), None);
        assert_eq!(debouncer.due(start + Duration::from_millis(1900)), Some(&9));
        assert_eq!(debouncer.take(), Some(9));
        assert_eq!(debouncer.due(start + Duration::from_millis(5000)), None);
    }

    #[test]
    fn due_value_stays_pending_until_taken() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_secs(1));
        debouncer.schedule(start, "a");
        let later = start + Duration::from_secs(2);
        assert_eq!(debouncer.due(later), Some(&"a"));
        assert_eq!(debouncer.due(later), Some(&"a"));
        assert_eq!(debouncer.deadline(), Some(start + Duration::from_secs(1)));
        assert_eq!(debouncer.pending(), Some(&"a"));
    }

    #[test]
    fn take_flushes_early() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_secs(1));
        debouncer.schedule(start, "a");
        assert!(debouncer.is_pending());
        assert_eq!(debouncer.take(), Some("a"));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.deadline(), None);
    }
}
