//! Trailing-edge debounce timer.
//!
//! A burst of [`Debouncer::schedule`] calls keeps only the latest value and
//! pushes the deadline out each time; [`Debouncer::take_due`] hands the value
//! back once the burst has been quiet for the configured delay.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

impl<T> Debouncer<T> {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Schedules `value` to fire at `now + delay`, cancelling anything pending.
    ///
    /// Returns the value that was cancelled, if any.
    pub fn schedule(&mut self, value: T, now: Instant) -> Option<T> {
        let previous = self.pending.replace(Pending {
            value,
            deadline: now + self.delay,
        });
        previous.map(|pending| pending.value)
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|pending| pending.value)
    }

    /// Takes the pending value if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|pending| now >= pending.deadline);
        if due {
            self.cancel()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(250);

    #[test]
    fn nothing_fires_before_the_deadline() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule(1, start);

        assert_eq!(debouncer.take_due(start + Duration::from_millis(249)), None);
        assert_eq!(debouncer.take_due(start + DELAY), Some(1));
        assert_eq!(debouncer.cancel(), None);
    }

    #[test]
    fn burst_keeps_only_the_last_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);

        let mut cancelled = Vec::new();
        for step in 0..10_u64 {
            let at = start + Duration::from_millis(step * 50);
            cancelled.extend(debouncer.schedule(step, at));
            assert_eq!(debouncer.take_due(at), None);
        }

        assert_eq!(cancelled, (0..9).collect::<Vec<_>>());
        let last_event = start + Duration::from_millis(450);
        assert_eq!(debouncer.take_due(last_event + DELAY - Duration::from_millis(1)), None);
        assert_eq!(debouncer.take_due(last_event + DELAY), Some(9));
        assert_eq!(debouncer.take_due(last_event + DELAY * 4), None);
    }

    #[test]
    fn cancel_drops_the_pending_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule("resize", start);
        assert_eq!(debouncer.cancel(), Some("resize"));
        assert_eq!(debouncer.take_due(start + DELAY), None);
    }
}
