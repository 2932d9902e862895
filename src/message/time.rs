//! Protocol representations of points in time and durations.

use std::time::{self, SystemTime, UNIX_EPOCH};

use serde::Deserialize;

/// Point in time, as seconds and nanoseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct Timestamp {
    /// Whole seconds since the Unix epoch.
    #[serde(default)]
    pub seconds: i64,

    /// Nanoseconds on top of [`Timestamp::seconds`].
    #[serde(default)]
    pub nanos: u32,
}

impl Timestamp {
    /// Converts this [`Timestamp`] into a [`SystemTime`].
    #[must_use]
    pub fn to_system_time(self) -> SystemTime {
        let secs = time::Duration::from_secs(self.seconds.unsigned_abs());
        let nanos = time::Duration::from_nanos(u64::from(self.nanos));
        let base = if self.seconds >= 0 {
            UNIX_EPOCH + secs
        } else {
            UNIX_EPOCH - secs
        };
        base + nanos
    }
}

impl From<Timestamp> for SystemTime {
    fn from(ts: Timestamp) -> Self {
        ts.to_system_time()
    }
}

/// Elapsed time, as seconds and nanoseconds.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct Duration {
    /// Whole seconds.
    #[serde(default)]
    pub seconds: u64,

    /// Nanoseconds on top of [`Duration::seconds`].
    #[serde(default)]
    pub nanos: u32,
}

impl From<Duration> for time::Duration {
    fn from(d: Duration) -> Self {
        Self::from_secs(d.seconds) + Self::from_nanos(u64::from(d.nanos))
    }
}
