//! The frozen clock.

use chrono::{DateTime, Utc};

/// Qualified name of the clock dependency type. A constructor parameter of
/// this type is wired with the `Environment(Time)` strategy by discovery.
pub const CLOCK_TYPE_NAME: &str = "covenant.Clock";

/// A clock whose instant is captured once and never moves.
///
/// `(seed, frozen clock)` is the complete source of randomness for a run;
/// the core never reads ambient time after the freeze.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrozenClock {
    now: DateTime<Utc>,
}

impl FrozenClock {
    /// Captures the current system instant.
    pub fn freeze() -> Self {
        Self { now: Utc::now() }
    }

    /// A clock frozen at the given instant, for deterministic tests.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Milliseconds since the Unix epoch at the frozen instant.
    pub fn epoch_millis(&self) -> i64 {
        self.now.timestamp_millis()
    }
}
