//! Concrete [`fpx_core::clock::Clock`] backed by the system clock.

use chrono::{Datelike, Local, Timelike};
use fpx_core::clock::{Clock, DateRecord};

pub struct ChronoClock;

impl Clock for ChronoClock {
    fn now(&self) -> DateRecord {
        let now = Local::now();
        DateRecord {
            year: now.year(),
            month: now.month(),
            day: now.day(),
            hour: now.hour(),
            minute: now.minute(),
            second: now.second(),
            weekday: now.weekday().num_days_from_monday(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_produces_a_plausible_year() {
        let record = ChronoClock.now();
        assert!(record.year >= 2024);
        assert!((1..=12).contains(&record.month));
    }
}
