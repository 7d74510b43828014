//! Calendar points.
//!
//! A [`Time`] carries one of four precisions:
//!
//! | Precision | Literal | Fields in use |
//! |-----------|---------|---------------|
//! | `YearMonth` | `june 2020` | year, month |
//! | `Date` | `12 june 2020` | + day |
//! | `ShortClock` | `12 june 2020, 14:30` | + hour, minute |
//! | `Clock` | `12 june 2020, 14:30:45` | + second |
//!
//! Two times compare on the fields of the coarser precision, so
//! `june 2020 = 12 june 2020` holds.  Calendar math goes through `chrono`.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Error, Result};
use crate::script::period::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precision {
    YearMonth,
    Date,
    ShortClock,
    Clock,
}

#[derive(Debug, Clone, Copy)]
pub struct Time {
    pub year: i64,
    pub month: i64,
    pub day: i64,
    pub hour: i64,
    pub minute: i64,
    pub second: i64,
    pub precision: Precision,
}

pub const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

pub const WEEKDAYS: [&str; 7] = [
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
];

// Bounds that keep every chrono conversion in range.
const MAX_YEAR: i64 = 200_000;
const MAX_SHIFT_DAYS: i64 = 70_000_000;

pub fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(month: i64, year: i64) -> i64 {
    match month {
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Lowercase month name for 1..=12, empty otherwise.
pub fn month_name(month: i64) -> &'static str {
    if (1..=12).contains(&month) {
        MONTHS[(month - 1) as usize]
    } else {
        ""
    }
}

/// Lowercase weekday name for 1..=7 (monday = 1), empty otherwise.
pub fn weekday_name(day: i64) -> &'static str {
    if (1..=7).contains(&day) {
        WEEKDAYS[(day - 1) as usize]
    } else {
        ""
    }
}

fn capitalized(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn out_of_range() -> Error {
    Error::runtime("time value is out of range")
}

impl Default for Time {
    fn default() -> Self {
        Time { year: 0, month: 0, day: 0, hour: 0, minute: 0, second: 0, precision: Precision::Date }
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let month = capitalized(month_name(self.month));
        match self.precision {
            Precision::YearMonth => write!(f, "{month} {}", self.year),
            Precision::Date => write!(f, "{} {month} {}", self.day, self.year),
            Precision::ShortClock => write!(
                f,
                "{} {month} {}, {:02}:{:02}",
                self.day, self.year, self.hour, self.minute
            ),
            Precision::Clock => write!(
                f,
                "{} {month} {}, {:02}:{:02}:{:02}",
                self.day, self.year, self.hour, self.minute, self.second
            ),
        }
    }
}

impl Time {
    pub fn year_month(month: i64, year: i64) -> Self {
        Time { year, month, day: 1, precision: Precision::YearMonth, ..Time::default() }
    }

    pub fn date(day: i64, month: i64, year: i64) -> Self {
        Time { year, month, day, precision: Precision::Date, ..Time::default() }
    }

    pub fn short_clock(day: i64, month: i64, year: i64, hour: i64, minute: i64) -> Self {
        Time { year, month, day, hour, minute, second: 0, precision: Precision::ShortClock }
    }

    pub fn clock(day: i64, month: i64, year: i64, hour: i64, minute: i64, second: i64) -> Self {
        Time { year, month, day, hour, minute, second, precision: Precision::Clock }
    }

    pub fn from_naive(dt: NaiveDateTime, precision: Precision) -> Self {
        let mut t = Time {
            year: dt.year() as i64,
            month: dt.month() as i64,
            day: dt.day() as i64,
            hour: dt.hour() as i64,
            minute: dt.minute() as i64,
            second: dt.second() as i64,
            precision,
        };
        t.strip_below(precision);
        t
    }

    /// The zero time used for out-of-range list elements and missing metadata.
    pub fn is_empty(&self) -> bool {
        self.year == 0 && self.month == 0
    }

    /// `true` when every field in use lies in its calendar range.
    pub fn is_valid(&self) -> bool {
        if !(1..=12).contains(&self.month) || self.year.abs() > MAX_YEAR {
            return false;
        }
        if self.precision >= Precision::Date
            && !(1..=days_in_month(self.month, self.year)).contains(&self.day)
        {
            return false;
        }
        (0..24).contains(&self.hour) && (0..60).contains(&self.minute) && (0..60).contains(&self.second)
    }

    fn strip_below(&mut self, precision: Precision) {
        if precision < Precision::Clock {
            self.second = 0;
        }
        if precision < Precision::ShortClock {
            self.hour = 0;
            self.minute = 0;
        }
        if precision < Precision::Date {
            self.day = 1;
        }
    }

    /// Clamped conversion; never fails for values built through this module.
    pub fn to_naive(&self) -> NaiveDateTime {
        let year = self.year.clamp(-MAX_YEAR, MAX_YEAR);
        let month = self.month.clamp(1, 12);
        let day = self.day.clamp(1, days_in_month(month, year));
        NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
            .and_then(|d| {
                d.and_hms_opt(
                    self.hour.clamp(0, 23) as u32,
                    self.minute.clamp(0, 59) as u32,
                    self.second.clamp(0, 59) as u32,
                )
            })
            .unwrap_or(NaiveDateTime::MIN)
    }

    /// ISO weekday, monday = 1.
    pub fn weekday(&self) -> i64 {
        self.to_naive().weekday().number_from_monday() as i64
    }

    /// Same calendar day with the clock removed.
    pub fn to_date(&self) -> Time {
        let mut t = *self;
        if t.precision > Precision::Date {
            t.precision = Precision::Date;
        }
        t.strip_below(t.precision);
        t
    }

    /// Field-by-field identity, including precision.
    pub fn equals_exactly(&self, other: &Time) -> bool {
        self.year == other.year
            && self.month == other.month
            && self.day == other.day
            && self.hour == other.hour
            && self.minute == other.minute
            && self.second == other.second
            && self.precision == other.precision
    }

    pub fn compare(&self, other: &Time) -> Ordering {
        let level = self.precision.min(other.precision);
        let ord = (self.year, self.month).cmp(&(other.year, other.month));
        if ord != Ordering::Equal || level == Precision::YearMonth {
            return ord;
        }
        let ord = self.day.cmp(&other.day);
        if ord != Ordering::Equal || level == Precision::Date {
            return ord;
        }
        let ord = (self.hour, self.minute).cmp(&(other.hour, other.minute));
        if ord != Ordering::Equal || level == Precision::ShortClock {
            return ord;
        }
        self.second.cmp(&other.second)
    }

    // ── Arithmetic ────────────────────────────────────────────────────────────

    pub fn add_months(&self, months: i64) -> Result<Time> {
        let total = (self.year * 12 + self.month - 1)
            .checked_add(months)
            .ok_or_else(out_of_range)?;
        let mut t = *self;
        t.year = total.div_euclid(12);
        t.month = total.rem_euclid(12) + 1;
        if t.year.abs() > MAX_YEAR {
            return Err(out_of_range());
        }
        if t.precision >= Precision::Date {
            t.day = t.day.min(days_in_month(t.month, t.year));
        }
        Ok(t)
    }

    pub fn add_years(&self, years: i64) -> Result<Time> {
        self.add_months(years.checked_mul(12).ok_or_else(out_of_range)?)
    }

    pub fn add_days(&self, days: i64) -> Result<Time> {
        if days.abs() > MAX_SHIFT_DAYS {
            return Err(out_of_range());
        }
        let precision = self.precision.max(Precision::Date);
        let dt = self
            .to_naive()
            .checked_add_signed(Duration::days(days))
            .ok_or_else(out_of_range)?;
        Ok(Time::from_naive(dt, precision))
    }

    /// Shift by a number of seconds.  Promotes the precision to at least
    /// `minimum` because the clock becomes significant.
    fn add_clock_seconds(&self, seconds: i64, minimum: Precision) -> Result<Time> {
        if seconds.abs() > MAX_SHIFT_DAYS * 86_400 {
            return Err(out_of_range());
        }
        let precision = self.precision.max(minimum);
        let dt = self
            .to_naive()
            .checked_add_signed(Duration::seconds(seconds))
            .ok_or_else(out_of_range)?;
        Ok(Time::from_naive(dt, precision))
    }

    pub fn add_hours(&self, hours: i64) -> Result<Time> {
        let s = hours.checked_mul(3600).ok_or_else(out_of_range)?;
        self.add_clock_seconds(s, Precision::ShortClock)
    }

    pub fn add_minutes(&self, minutes: i64) -> Result<Time> {
        let s = minutes.checked_mul(60).ok_or_else(out_of_range)?;
        self.add_clock_seconds(s, Precision::ShortClock)
    }

    pub fn add_seconds(&self, seconds: i64) -> Result<Time> {
        self.add_clock_seconds(seconds, Precision::Clock)
    }

    /// `time + period`.  Calendar parts first, then days, then the clock.
    pub fn shift(&self, p: &Period) -> Result<Time> {
        let mut t = *self;
        let months = p.total_years() * 12 + p.total_months();
        if months != 0 {
            t = t.add_months(months)?;
        }
        let days = p.weeks * 7 + p.days;
        if days != 0 {
            t = t.add_days(days)?;
        }
        if p.hours != 0 {
            t = t.add_hours(p.hours)?;
        }
        if p.minutes != 0 {
            t = t.add_minutes(p.minutes)?;
        }
        if p.seconds != 0 {
            t = t.add_seconds(p.seconds)?;
        }
        Ok(t)
    }

    /// `time - period`.
    pub fn unshift(&self, p: &Period) -> Result<Time> {
        self.shift(&p.negated())
    }

    /// Value of a `time.member` access.
    pub fn member(&self, name: &str) -> Option<i64> {
        Some(match name {
            "year" => self.year,
            "month" => self.month,
            "day" => self.day,
            "weekday" => self.weekday(),
            "hour" => self.hour,
            "minute" => self.minute,
            "second" => self.second,
            _ => return None,
        })
    }
}

pub const TIME_MEMBERS: [&str; 7] = ["year", "month", "day", "weekday", "hour", "minute", "second"];

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::period::PeriodUnit;

    #[test]
    fn display_per_precision() {
        assert_eq!(Time::year_month(6, 2020).to_string(), "June 2020");
        assert_eq!(Time::date(12, 6, 2020).to_string(), "12 June 2020");
        assert_eq!(Time::short_clock(12, 6, 2020, 9, 5).to_string(), "12 June 2020, 09:05");
        assert_eq!(Time::clock(1, 1, 2021, 23, 59, 7).to_string(), "1 January 2021, 23:59:07");
    }

    #[test]
    fn compare_on_coarser_precision() {
        assert_eq!(Time::year_month(6, 2020), Time::date(12, 6, 2020));
        assert!(Time::date(12, 6, 2020) < Time::date(13, 6, 2020));
        assert_eq!(Time::date(12, 6, 2020), Time::clock(12, 6, 2020, 10, 0, 0));
        assert!(Time::clock(12, 6, 2020, 10, 0, 1) > Time::clock(12, 6, 2020, 10, 0, 0));
    }

    #[test]
    fn leap_years() {
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert_eq!(days_in_month(2, 2024), 29);
        assert_eq!(days_in_month(2, 2023), 28);
    }

    #[test]
    fn month_shift_clamps_day() {
        let t = Time::date(31, 1, 2023).add_months(1).unwrap();
        assert!(t.equals_exactly(&Time::date(28, 2, 2023)));
        let t = Time::date(15, 1, 2023).add_months(-2).unwrap();
        assert!(t.equals_exactly(&Time::date(15, 11, 2022)));
    }

    #[test]
    fn adding_hours_promotes_precision() {
        let t = Time::date(31, 12, 2020).add_hours(25).unwrap();
        assert!(t.equals_exactly(&Time::short_clock(1, 1, 2021, 1, 0)));
        let t = t.add_seconds(5).unwrap();
        assert_eq!(t.precision, Precision::Clock);
    }

    #[test]
    fn shift_by_period() {
        let t = Time::date(10, 3, 2021);
        let t2 = t.shift(&Period::unit(3, PeriodUnit::Days)).unwrap();
        assert!(t2.equals_exactly(&Time::date(13, 3, 2021)));
        let t3 = t.unshift(&Period::unit(1, PeriodUnit::Years)).unwrap();
        assert!(t3.equals_exactly(&Time::date(10, 3, 2020)));
    }

    #[test]
    fn weekday_monday_first() {
        // 1 January 2024 was a Monday.
        assert_eq!(Time::date(1, 1, 2024).weekday(), 1);
        assert_eq!(Time::date(7, 1, 2024).weekday(), 7);
    }

    #[test]
    fn validity() {
        assert!(Time::date(29, 2, 2024).is_valid());
        assert!(!Time::date(29, 2, 2023).is_valid());
        assert!(!Time::short_clock(1, 1, 2023, 24, 0).is_valid());
    }

    #[test]
    fn huge_shift_is_error() {
        assert!(Time::date(1, 1, 2000).add_days(i64::MAX / 2).is_err());
    }
}
