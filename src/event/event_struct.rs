//! Core [`Event`] struct and implementations.

use std::time::SystemTime;

use derive_more::with_trait::{AsRef, Debug, Deref, DerefMut};

/// Arbitrary event, paired with the time it has happened at.
///
/// Unlike a wall clock reading, [`Event::at`] is taken from the engine
/// timestamp of the envelope the event was derived from, so durations stay
/// meaningful when a message stream is replayed.
#[derive(AsRef, Clone, Copy, Debug, Deref, DerefMut, PartialEq)]
pub struct Event<T: ?Sized> {
    /// [`SystemTime`] when this [`Event`] has happened.
    pub at: SystemTime,

    /// Actual value of this [`Event`].
    #[as_ref]
    #[deref]
    #[deref_mut]
    pub value: T,
}

impl<T> Event<T> {
    /// Creates a new [`Event`] out of the given `value`, happened right now.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::stamped(value, SystemTime::now())
    }

    /// Creates a new [`Event`] out of the given `value`, happened `at` the
    /// given time.
    #[must_use]
    pub const fn stamped(value: T, at: SystemTime) -> Self {
        Self { at, value }
    }

    /// Unwraps the inner [`Event::value`] loosing all the attached metadata.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Maps the inner [`Event::value`] with the given function.
    #[must_use]
    pub fn map<V>(self, f: impl FnOnce(T) -> V) -> Event<V> {
        Event { at: self.at, value: f(self.value) }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn keeps_time_when_mapped() {
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(7);

        let ev = Event::stamped(2, at).map(|v| v * 21);

        assert_eq!(ev.at, at);
        assert_eq!(*ev, 42);
        assert_eq!(ev.into_inner(), 42);
    }
}
