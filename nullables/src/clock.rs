//! Nullable clock: deterministic time for testing.

use dao_types::Timestamp;
use std::cell::Cell;

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to, and never goes backwards.
#[derive(Debug)]
pub struct NullClock {
    current: Cell<u64>,
}

impl NullClock {
    pub fn new(initial_secs: u64) -> Self {
        Self {
            current: Cell::new(initial_secs),
        }
    }

    /// Get the current time.
    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.current.get())
    }

    /// Advance time by a number of seconds and return the new time.
    pub fn advance(&self, secs: u64) -> Timestamp {
        self.current.set(self.current.get().saturating_add(secs));
        self.now()
    }

    /// Jump to `at` if it lies in the future; otherwise stay put.
    pub fn advance_to(&self, at: Timestamp) -> Timestamp {
        if at.as_secs() > self.current.get() {
            self.current.set(at.as_secs());
        }
        self.now()
    }

    /// Jump one second past `deadline` if it has not been reached yet.
    pub fn pass(&self, deadline: Timestamp) -> Timestamp {
        self.advance_to(Timestamp::new(deadline.as_secs().saturating_add(1)))
    }
}

impl Default for NullClock {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_moves_forward() {
        let clock = NullClock::new(100);
        assert_eq!(clock.advance(50), Timestamp::new(150));
        assert_eq!(clock.now(), Timestamp::new(150));
    }

    #[test]
    fn test_advance_to_never_goes_back() {
        let clock = NullClock::new(100);
        assert_eq!(clock.advance_to(Timestamp::new(40)), Timestamp::new(100));
        assert_eq!(clock.advance_to(Timestamp::new(400)), Timestamp::new(400));
    }

    #[test]
    fn test_pass_lands_after_deadline() {
        let clock = NullClock::default();
        let deadline = Timestamp::new(86_400);
        assert_eq!(clock.pass(deadline), Timestamp::new(86_401));
        assert!(deadline.is_reached(clock.now()));
    }

    #[test]
    fn test_advance_saturates() {
        let clock = NullClock::new(u64::MAX - 1);
        assert_eq!(clock.advance(10), Timestamp::new(u64::MAX));
    }
}
