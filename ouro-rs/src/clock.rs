//! Injected time source.
//!
//! `now`, `today`, `yesterday` and `tomorrow` read the [`Clock`] carried by
//! the runtime environment, so tests can pin the current time.

use chrono::Local;

use crate::script::time::{Precision, Time};

pub trait Clock {
    fn now(&self) -> Time;

    fn today(&self) -> Time {
        self.now().to_date()
    }
}

/// Local wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Time {
        Time::from_naive(Local::now().naive_local(), Precision::Clock)
    }
}

/// Always answers the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Time);

impl Clock for FixedClock {
    fn now(&self) -> Time {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_today_drops_clock() {
        let c = FixedClock(Time::clock(5, 3, 2022, 14, 30, 12));
        let today = c.today();
        assert_eq!(today.precision, Precision::Date);
        assert!(today.equals_exactly(&Time::date(5, 3, 2022)));
    }

    #[test]
    fn system_clock_is_valid() {
        assert!(SystemClock.now().is_valid());
    }
}
