//! Statistics of reported entities.

use std::ops::AddAssign;

use crate::report::State;

/// Execution statistics.
///
/// Counts [`Step`]s, or scenarios in scenario-level mode. Superseded attempts
/// of retried scenarios are counted in [`Stats::retried`] only.
///
/// [`Step`]: crate::event::Step
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    /// Number of passed entities.
    pub passed: usize,

    /// Number of skipped entities.
    pub skipped: usize,

    /// Number of pending entities.
    pub pending: usize,

    /// Number of failed entities.
    pub failed: usize,

    /// Number of superseded scenario attempts.
    pub retried: usize,
}

impl Stats {
    /// Creates a new [`Stats`] instance with all counts set to zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { passed: 0, skipped: 0, pending: 0, failed: 0, retried: 0 }
    }

    /// Returns total number of entities these [`Stats`] have been collected
    /// for.
    #[must_use]
    pub const fn total(&self) -> usize {
        // Retried attempts are not included, as their final attempts are
        // already counted.
        self.passed + self.skipped + self.pending + self.failed
    }

    /// Increments the count of the given [`State`] by one.
    pub fn record(&mut self, state: State) {
        match state {
            State::Pass => self.passed += 1,
            State::Skip => self.skipped += 1,
            State::Pending => self.pending += 1,
            State::Fail => self.failed += 1,
        }
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, rhs: Self) {
        self.passed += rhs.passed;
        self.skipped += rhs.skipped;
        self.pending += rhs.pending;
        self.failed += rhs.failed;
        self.retried += rhs.retried;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_sums() {
        let mut a = Stats::new();
        a.record(State::Pass);
        a.record(State::Fail);
        let mut b = Stats { retried: 1, ..Stats::new() };
        b.record(State::Pending);

        a += b;

        assert_eq!(a.total(), 3);
        assert_eq!(a.retried, 1);
        assert_eq!(a.pending, 1);
    }
}
