//! Calendar durations.
//!
//! A [`Period`] is held in one of three representations:
//!
//! | Kind | Produced by | Fields in use |
//! |------|-------------|---------------|
//! | `Unit(u)` | `3 days`, `1 month` | exactly the field of `u` |
//! | `Difference` | `time - time` | `years_sec`, `months_sec` with their real day counts `years_ad` / `months_ad`, then days and clock |
//! | `Mingled` | mixed arithmetic | any field |
//!
//! Ordering is total and never fails, but months and years have no fixed
//! length.  The conventions are:
//!
//! * unit vs unit: years and months compare through `1 year = 12 months`;
//!   every other pair goes through seconds with `1 year = 365 days` and
//!   `1 month = 30 days`;
//! * difference vs a years or months unit: whole calendar months first, then
//!   the sign of the remainder;
//! * difference vs any other unit, and difference vs difference: exact seconds
//!   using the real day counts;
//! * anything involving a mingled period: seconds, with the nominal 365 / 30
//!   day lengths for plain years and months.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};
use crate::script::time::{Precision, Time};

const DAY: i128 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodUnit {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl PeriodUnit {
    /// Nominal length in seconds.
    pub fn seconds(self) -> i128 {
        match self {
            PeriodUnit::Years => 365 * DAY,
            PeriodUnit::Months => 30 * DAY,
            PeriodUnit::Weeks => 7 * DAY,
            PeriodUnit::Days => DAY,
            PeriodUnit::Hours => 3600,
            PeriodUnit::Minutes => 60,
            PeriodUnit::Seconds => 1,
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            PeriodUnit::Years => "year",
            PeriodUnit::Months => "month",
            PeriodUnit::Weeks => "week",
            PeriodUnit::Days => "day",
            PeriodUnit::Hours => "hour",
            PeriodUnit::Minutes => "minute",
            PeriodUnit::Seconds => "second",
        }
    }

    /// Resolve a unit word.  The flag is `true` for the singular spelling.
    pub fn from_word(word: &str) -> Option<(PeriodUnit, bool)> {
        const ALL: [PeriodUnit; 7] = [
            PeriodUnit::Years,
            PeriodUnit::Months,
            PeriodUnit::Weeks,
            PeriodUnit::Days,
            PeriodUnit::Hours,
            PeriodUnit::Minutes,
            PeriodUnit::Seconds,
        ];
        for u in ALL {
            let s = u.singular();
            if word == s {
                return Some((u, true));
            }
            if word.len() == s.len() + 1 && word.starts_with(s) && word.ends_with('s') {
                return Some((u, false));
            }
        }
        None
    }

    /// Upper bound (exclusive) of a magnitude that still reads naturally in
    /// this unit alone.
    fn natural_limit(self) -> Option<i64> {
        match self {
            PeriodUnit::Months => Some(12),
            PeriodUnit::Hours => Some(24),
            PeriodUnit::Minutes | PeriodUnit::Seconds => Some(60),
            PeriodUnit::Years | PeriodUnit::Weeks | PeriodUnit::Days => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    Unit(PeriodUnit),
    Difference,
    Mingled,
}

#[derive(Debug, Clone, Copy)]
pub struct Period {
    pub years: i64,
    pub months: i64,
    pub weeks: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    /// Whole calendar years of a time difference.
    pub years_sec: i64,
    /// Whole calendar months of a time difference, after `years_sec`.
    pub months_sec: i64,
    /// Real number of days covered by `years_sec`.
    pub years_ad: i64,
    /// Real number of days covered by `months_sec`.
    pub months_ad: i64,
    pub kind: PeriodKind,
}

impl Default for Period {
    fn default() -> Self {
        Period::unit(0, PeriodUnit::Seconds)
    }
}

impl PartialEq for Period {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            (self.total_years(), "year"),
            (self.total_months(), "month"),
            (self.weeks, "week"),
            (self.days, "day"),
            (self.hours, "hour"),
            (self.minutes, "minute"),
            (self.seconds, "second"),
        ];
        let mut first = true;
        for (v, name) in parts {
            if v == 0 {
                continue;
            }
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            if v.abs() == 1 {
                write!(f, "{v} {name}")?;
            } else {
                write!(f, "{v} {name}s")?;
            }
        }
        if first {
            f.write_str("no period")?;
        }
        Ok(())
    }
}

fn too_big() -> Error {
    Error::runtime("number is too big to be computed")
}

fn sign_of(v: i128) -> Ordering {
    v.cmp(&0)
}

impl Period {
    pub fn unit(value: i64, unit: PeriodUnit) -> Self {
        let mut p = Period {
            years: 0,
            months: 0,
            weeks: 0,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
            years_sec: 0,
            months_sec: 0,
            years_ad: 0,
            months_ad: 0,
            kind: PeriodKind::Unit(unit),
        };
        *p.field_mut(unit) = value;
        p
    }

    fn field_mut(&mut self, unit: PeriodUnit) -> &mut i64 {
        match unit {
            PeriodUnit::Years => &mut self.years,
            PeriodUnit::Months => &mut self.months,
            PeriodUnit::Weeks => &mut self.weeks,
            PeriodUnit::Days => &mut self.days,
            PeriodUnit::Hours => &mut self.hours,
            PeriodUnit::Minutes => &mut self.minutes,
            PeriodUnit::Seconds => &mut self.seconds,
        }
    }

    fn field(&self, unit: PeriodUnit) -> i64 {
        match unit {
            PeriodUnit::Years => self.years,
            PeriodUnit::Months => self.months,
            PeriodUnit::Weeks => self.weeks,
            PeriodUnit::Days => self.days,
            PeriodUnit::Hours => self.hours,
            PeriodUnit::Minutes => self.minutes,
            PeriodUnit::Seconds => self.seconds,
        }
    }

    pub fn total_years(&self) -> i64 {
        self.years + self.years_sec
    }

    pub fn total_months(&self) -> i64 {
        self.months + self.months_sec
    }

    pub fn is_zero(&self) -> bool {
        self.fields().iter().all(|v| *v == 0)
    }

    fn fields(&self) -> [i64; 11] {
        [
            self.years,
            self.months,
            self.weeks,
            self.days,
            self.hours,
            self.minutes,
            self.seconds,
            self.years_sec,
            self.months_sec,
            self.years_ad,
            self.months_ad,
        ]
    }

    fn from_fields(f: [i64; 11], kind: PeriodKind) -> Self {
        Period {
            years: f[0],
            months: f[1],
            weeks: f[2],
            days: f[3],
            hours: f[4],
            minutes: f[5],
            seconds: f[6],
            years_sec: f[7],
            months_sec: f[8],
            years_ad: f[9],
            months_ad: f[10],
            kind,
        }
    }

    /// Reference length in seconds under the nominal conventions.
    pub fn nominal_seconds(&self) -> i128 {
        self.seconds as i128
            + 60 * self.minutes as i128
            + 3600 * self.hours as i128
            + DAY * (self.days as i128 + 7 * self.weeks as i128)
            + DAY * (self.years_ad as i128 + self.months_ad as i128)
            + PeriodUnit::Years.seconds() * self.years as i128
            + PeriodUnit::Months.seconds() * self.months as i128
    }

    pub fn negated(&self) -> Period {
        let f = self.fields().map(|v| -v);
        Period::from_fields(f, self.kind)
    }

    /// Sign-uniform and every field inside its calendar range.
    fn is_normal_difference(&self) -> bool {
        let f = [
            self.years_sec,
            self.months_sec,
            self.days,
            self.hours,
            self.minutes,
            self.seconds,
        ];
        let all_pos = f.iter().all(|v| *v >= 0);
        let all_neg = f.iter().all(|v| *v <= 0);
        if !all_pos && !all_neg {
            return false;
        }
        self.years == 0
            && self.months == 0
            && self.weeks == 0
            && self.months_sec.abs() < 12
            && self.days.abs() < 31
            && self.hours.abs() < 24
            && self.minutes.abs() < 60
            && self.seconds.abs() < 60
    }

    fn settle_kind(&mut self, hint: PeriodKind) {
        self.kind = match hint {
            PeriodKind::Unit(u) => match u.natural_limit() {
                Some(limit) if self.field(u).abs() >= limit => PeriodKind::Mingled,
                _ => PeriodKind::Unit(u),
            },
            PeriodKind::Difference => {
                if self.is_normal_difference() {
                    PeriodKind::Difference
                } else {
                    PeriodKind::Mingled
                }
            }
            PeriodKind::Mingled => PeriodKind::Mingled,
        };
    }

    // ── Arithmetic ────────────────────────────────────────────────────────────

    pub fn plus(&self, other: &Period) -> Result<Period> {
        if other.is_zero() {
            return Ok(*self);
        }
        if self.is_zero() {
            return Ok(*other);
        }
        let a = self.fields();
        let b = other.fields();
        let mut f = [0i64; 11];
        for i in 0..11 {
            f[i] = a[i].checked_add(b[i]).ok_or_else(too_big)?;
        }
        let hint = match (self.kind, other.kind) {
            (PeriodKind::Unit(x), PeriodKind::Unit(y)) if x == y => PeriodKind::Unit(x),
            (PeriodKind::Difference, PeriodKind::Difference) => PeriodKind::Difference,
            _ => PeriodKind::Mingled,
        };
        let mut p = Period::from_fields(f, hint);
        p.settle_kind(hint);
        Ok(p)
    }

    pub fn minus(&self, other: &Period) -> Result<Period> {
        self.plus(&other.negated())
    }

    pub fn times(&self, n: i64) -> Result<Period> {
        let mut f = self.fields();
        for v in f.iter_mut() {
            *v = v.checked_mul(n).ok_or_else(too_big)?;
        }
        let mut p = Period::from_fields(f, self.kind);
        p.settle_kind(self.kind);
        Ok(p)
    }

    pub fn divided(&self, n: i64) -> Result<Period> {
        if n == 0 {
            return Err(Error::runtime("division by zero"));
        }
        let mut f = self.fields();
        for v in f.iter_mut() {
            *v = v.checked_div(n).ok_or_else(too_big)?;
        }
        let mut p = Period::from_fields(f, self.kind);
        p.settle_kind(self.kind);
        Ok(p)
    }

    // ── Time difference ───────────────────────────────────────────────────────

    /// `a - b` as a calendar-anchored difference.
    pub fn between(a: &Time, b: &Time) -> Period {
        let na = a.to_naive();
        let nb = b.to_naive();
        if na < nb {
            return Period::between(b, a).negated();
        }

        let earlier = Time { precision: Precision::Clock, ..*b };
        let later = Time { precision: Precision::Clock, ..*a };
        let mut months = (later.year - earlier.year) * 12 + (later.month - earlier.month);
        let later_rest = (later.day, later.hour, later.minute, later.second);
        let earlier_rest = (earlier.day, earlier.hour, earlier.minute, earlier.second);
        if later_rest < earlier_rest {
            months -= 1;
        }
        if months < 0 {
            months = 0;
        }

        let years_sec = months / 12;
        let months_sec = months % 12;
        let year_anchor = earlier.add_months(years_sec * 12).unwrap_or(earlier);
        let anchor = earlier.add_months(months).unwrap_or(earlier);

        let years_ad = (year_anchor.to_naive() - earlier.to_naive()).num_days();
        let months_ad = (anchor.to_naive() - year_anchor.to_naive()).num_days();
        let rest = (later.to_naive() - anchor.to_naive()).num_seconds().max(0);

        Period {
            years: 0,
            months: 0,
            weeks: 0,
            days: rest / 86_400,
            hours: rest % 86_400 / 3600,
            minutes: rest % 3600 / 60,
            seconds: rest % 60,
            years_sec,
            months_sec,
            years_ad,
            months_ad,
            kind: PeriodKind::Difference,
        }
    }

    // ── Comparison ────────────────────────────────────────────────────────────

    pub fn compare(&self, other: &Period) -> Ordering {
        match (self.kind, other.kind) {
            (PeriodKind::Unit(a), PeriodKind::Unit(b)) => {
                units_cmp(self.field(a), a, other.field(b), b)
            }
            (PeriodKind::Difference, PeriodKind::Unit(u)) => diff_unit_cmp(self, other.field(u), u),
            (PeriodKind::Unit(u), PeriodKind::Difference) => {
                diff_unit_cmp(other, self.field(u), u).reverse()
            }
            _ => self.nominal_seconds().cmp(&other.nominal_seconds()),
        }
    }

    /// Value of a `period.member` access.
    pub fn member(&self, name: &str) -> Option<i64> {
        Some(match name {
            "years" => self.total_years(),
            "months" => self.total_months(),
            "weeks" => self.weeks,
            "days" => self.days,
            "hours" => self.hours,
            "minutes" => self.minutes,
            "seconds" => self.seconds,
            _ => return None,
        })
    }
}

pub const PERIOD_MEMBERS: [&str; 7] = ["years", "months", "weeks", "days", "hours", "minutes", "seconds"];

fn months_in(unit: PeriodUnit) -> i128 {
    if unit == PeriodUnit::Years {
        12
    } else {
        1
    }
}

fn units_cmp(a: i64, ua: PeriodUnit, b: i64, ub: PeriodUnit) -> Ordering {
    let calendar = |u| matches!(u, PeriodUnit::Years | PeriodUnit::Months);
    if calendar(ua) && calendar(ub) {
        (a as i128 * months_in(ua)).cmp(&(b as i128 * months_in(ub)))
    } else {
        (a as i128 * ua.seconds()).cmp(&(b as i128 * ub.seconds()))
    }
}

fn diff_unit_cmp(d: &Period, n: i64, u: PeriodUnit) -> Ordering {
    match u {
        PeriodUnit::Years | PeriodUnit::Months => {
            let dm = 12 * d.total_years() as i128 + d.total_months() as i128;
            match dm.cmp(&(n as i128 * months_in(u))) {
                Ordering::Equal => {
                    let rest = DAY * (d.days as i128 + 7 * d.weeks as i128)
                        + 3600 * d.hours as i128
                        + 60 * d.minutes as i128
                        + d.seconds as i128;
                    sign_of(rest)
                }
                o => o,
            }
        }
        _ => d.nominal_seconds().cmp(&(n as i128 * u.seconds())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: i64, u: PeriodUnit) -> Period {
        Period::unit(n, u)
    }

    #[test]
    fn display() {
        assert_eq!(p(1, PeriodUnit::Years).to_string(), "1 year");
        assert_eq!(p(-1, PeriodUnit::Days).to_string(), "-1 day");
        assert_eq!(p(3, PeriodUnit::Hours).to_string(), "3 hours");
        assert_eq!(Period::default().to_string(), "no period");
        let m = p(1, PeriodUnit::Months).plus(&p(2, PeriodUnit::Days)).unwrap();
        assert_eq!(m.to_string(), "1 month 2 days");
    }

    #[test]
    fn unit_words() {
        assert_eq!(PeriodUnit::from_word("days"), Some((PeriodUnit::Days, false)));
        assert_eq!(PeriodUnit::from_word("month"), Some((PeriodUnit::Months, true)));
        assert_eq!(PeriodUnit::from_word("dayss"), None);
        assert_eq!(PeriodUnit::from_word("size"), None);
    }

    #[test]
    fn same_unit_addition_stays_unit() {
        let r = p(2, PeriodUnit::Days).plus(&p(3, PeriodUnit::Days)).unwrap();
        assert_eq!(r.kind, PeriodKind::Unit(PeriodUnit::Days));
        assert_eq!(r.days, 5);
    }

    #[test]
    fn mixed_units_become_mingled() {
        let r = p(2, PeriodUnit::Days).plus(&p(3, PeriodUnit::Hours)).unwrap();
        assert_eq!(r.kind, PeriodKind::Mingled);
    }

    #[test]
    fn out_of_range_magnitude_becomes_mingled() {
        let r = p(6, PeriodUnit::Months).plus(&p(7, PeriodUnit::Months)).unwrap();
        assert_eq!(r.kind, PeriodKind::Mingled);
        assert_eq!(r.total_months(), 13);
    }

    #[test]
    fn unit_comparisons() {
        assert_eq!(p(12, PeriodUnit::Months), p(1, PeriodUnit::Years));
        assert_eq!(p(24, PeriodUnit::Hours), p(1, PeriodUnit::Days));
        assert_eq!(p(14, PeriodUnit::Days), p(2, PeriodUnit::Weeks));
        assert!(p(1, PeriodUnit::Years) > p(364, PeriodUnit::Days));
        assert!(p(59, PeriodUnit::Seconds) < p(1, PeriodUnit::Minutes));
    }

    #[test]
    fn difference_is_calendar_anchored() {
        let d = Period::between(&Time::date(1, 3, 2024), &Time::date(1, 2, 2024));
        assert_eq!(d.kind, PeriodKind::Difference);
        assert_eq!(d, p(1, PeriodUnit::Months));
        // February 2024 has 29 days.
        assert_eq!(d, p(29, PeriodUnit::Days));
        assert!(d < p(30, PeriodUnit::Days));
    }

    #[test]
    fn difference_across_years() {
        let d = Period::between(&Time::date(15, 6, 2021), &Time::date(10, 3, 2020));
        assert_eq!(d.years_sec, 1);
        assert_eq!(d.months_sec, 3);
        assert_eq!(d.days, 5);
        assert!(d > p(1, PeriodUnit::Years));
        assert!(d < p(2, PeriodUnit::Years));
        assert!(d > p(15, PeriodUnit::Months));
    }

    #[test]
    fn negative_difference() {
        let d = Period::between(&Time::date(1, 1, 2020), &Time::date(3, 1, 2020));
        assert_eq!(d, p(-2, PeriodUnit::Days));
        assert!(d < Period::default());
    }

    #[test]
    fn difference_with_clock() {
        let d = Period::between(
            &Time::clock(2, 1, 2020, 1, 30, 0),
            &Time::clock(1, 1, 2020, 23, 0, 0),
        );
        assert_eq!(d.hours, 2);
        assert_eq!(d.minutes, 30);
        assert_eq!(d, p(150, PeriodUnit::Minutes));
    }

    #[test]
    fn representation_independent_equality() {
        let unit = p(90, PeriodUnit::Minutes);
        let mingled = p(1, PeriodUnit::Hours).plus(&p(30, PeriodUnit::Minutes)).unwrap();
        let diff = Period::between(&Time::short_clock(1, 1, 2020, 11, 30), &Time::short_clock(1, 1, 2020, 10, 0));
        assert_eq!(unit, mingled);
        assert_eq!(unit, diff);
        assert_eq!(mingled, diff);
    }

    #[test]
    fn multiply_and_divide() {
        let r = p(3, PeriodUnit::Days).times(4).unwrap();
        assert_eq!(r.days, 12);
        let r = p(10, PeriodUnit::Hours).divided(2).unwrap();
        assert_eq!(r.hours, 5);
        assert_eq!(p(1, PeriodUnit::Days).divided(0).unwrap_err().message(), "division by zero");
    }

    #[test]
    fn members() {
        let d = Period::between(&Time::date(15, 6, 2021), &Time::date(10, 3, 2020));
        assert_eq!(d.member("years"), Some(1));
        assert_eq!(d.member("months"), Some(3));
        assert_eq!(d.member("days"), Some(5));
        assert_eq!(d.member("year"), None);
    }
}
