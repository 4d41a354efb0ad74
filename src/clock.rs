//! Time source abstraction
//!
//! The health monitor and the decision cache read wall-clock time through
//! `Clock` so tests can substitute a manually advanced clock.

use chrono::{DateTime, Utc};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-utils"))]
mod manual {
    use std::sync::Mutex;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::Clock;

    /// Clock that only moves when told to
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }

        pub fn set(&self, to: DateTime<Utc>) {
            *self.now.lock().unwrap() = to;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}
