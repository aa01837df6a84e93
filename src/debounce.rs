use std::time::{Duration, Instant};

/// A value that only takes effect after a quiet period.
///
/// `set` stages a value and restarts the timer; `settle` releases it once
/// `delay` has elapsed since the last `set`. Time is supplied by the caller.
#[derive(Clone, Debug)]
pub struct Debounced<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debounced<T> {
    /// Debouncer with quiet period `delay`.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Stage `value` at `now`, replacing anything staged before.
    pub fn set(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Returns `true` while a value is staged.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Instant at which the staged value becomes due.
    pub fn due_at(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.delay)
    }

    /// Release the staged value if its quiet period has elapsed at `now`.
    ///
    /// Returns the value with the instant it was staged.
    pub fn settle(&mut self, now: Instant) -> Option<(T, Instant)> {
        let due = self.due_at()?;
        if now < due {
            return None;
        }
        self.pending.take()
    }

    /// Drop any staged value.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_settles_only_after_quiet_period() {
        let start = Instant::now();
        let mut debounced = Debounced::new(Duration::from_millis(300));
        debounced.set("a", start);
        assert_eq!(debounced.settle(start + Duration::from_millis(299)), None);
        debounced.set("ab", start + Duration::from_millis(200));
        assert_eq!(debounced.settle(start + Duration::from_millis(400)), None);
        assert_eq!(
            debounced.settle(start + Duration::from_millis(500)),
            Some(("ab", start + Duration::from_millis(200)))
        );
        assert!(!debounced.is_pending());
        assert_eq!(debounced.settle(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn zero_delay_settles_immediately() {
        let now = Instant::now();
        let mut debounced = Debounced::new(Duration::ZERO);
        debounced.set(1, now);
        assert_eq!(debounced.settle(now), Some((1, now)));
    }

    #[test]
    fn cancel_discards_staged_value() {
        let now = Instant::now();
        let mut debounced = Debounced::new(Duration::from_millis(10));
        debounced.set(1, now);
        debounced.cancel();
        assert_eq!(debounced.settle(now + Duration::from_secs(1)), None);
    }
}
