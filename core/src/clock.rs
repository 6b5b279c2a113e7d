//! Time source and deadline arithmetic.
//!
//! Every engine entry point takes `now` explicitly; the [`Clock`] trait is how
//! the command layer obtains it. [`TimeRemaining`] is the single place where
//! "how long until this deadline" is computed, shared by admission control and
//! countdown displays.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```
/// use eventgate_core::clock::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let _now = clock.now();
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Time left until a deadline, broken down for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TimeRemaining {
    /// The deadline has not passed yet. All zeros means "right now".
    Remaining {
        /// Whole days
        days: i64,
        /// Hours within the day
        hours: i64,
        /// Minutes within the hour
        minutes: i64,
        /// Seconds within the minute
        seconds: i64,
    },
    /// `now` is strictly after the deadline
    Elapsed,
}

impl TimeRemaining {
    /// Computes the time left until `deadline` as seen at `now`.
    ///
    /// The boundary is inclusive: `deadline == now` is still `Remaining`.
    #[must_use]
    pub fn until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now > deadline {
            return Self::Elapsed;
        }
        let left = deadline - now;
        Self::from_duration(left)
    }

    fn from_duration(left: Duration) -> Self {
        let total = left.num_seconds();
        Self::Remaining {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
        }
    }

    /// Whether the deadline has passed
    #[must_use]
    pub const fn is_elapsed(&self) -> bool {
        matches!(self, Self::Elapsed)
    }

    /// Total whole seconds left (zero once elapsed)
    #[must_use]
    pub const fn total_seconds(&self) -> i64 {
        match self {
            Self::Remaining {
                days,
                hours,
                minutes,
                seconds,
            } => *days * 86_400 + *hours * 3_600 + *minutes * 60 + *seconds,
            Self::Elapsed => 0,
        }
    }
}
