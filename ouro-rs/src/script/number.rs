//! Numeric values.
//!
//! A [`Number`] is either an integer or a double.  Arithmetic stays in the
//! integer domain until an operand is a double or an integer division has a
//! remainder; overflow and undefined results are runtime errors, never NaN.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Double(f64),
}

impl Default for Number {
    fn default() -> Self {
        Number::Int(0)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{n}"),
            Number::Double(x) => {
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{}", *x as i64)
                } else {
                    write!(f, "{x}")
                }
            }
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number::Int(n)
    }
}

impl From<f64> for Number {
    fn from(x: f64) -> Self {
        Number::Double(x)
    }
}

impl From<usize> for Number {
    fn from(n: usize) -> Self {
        Number::Int(n as i64)
    }
}

fn too_big() -> Error {
    Error::runtime("number is too big to be computed")
}

fn checked_double(x: f64) -> Result<Number> {
    if x.is_finite() {
        Ok(Number::Double(x))
    } else {
        Err(too_big())
    }
}

impl Number {
    pub fn is_double(&self) -> bool {
        matches!(self, Number::Double(_))
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int(n) => *n == 0,
            Number::Double(x) => *x == 0.0,
        }
    }

    /// Truncating conversion to an integer.
    pub fn to_int(&self) -> i64 {
        match self {
            Number::Int(n) => *n,
            Number::Double(x) => *x as i64,
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Int(n) => *n as f64,
            Number::Double(x) => *x,
        }
    }

    /// Total numeric order.  Mixed integer/double comparisons go through `f64`.
    pub fn compare(&self, other: &Number) -> Ordering {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(b),
            _ => self
                .to_f64()
                .partial_cmp(&other.to_f64())
                .unwrap_or(Ordering::Equal),
        }
    }

    // ── Arithmetic ────────────────────────────────────────────────────────────

    pub fn add(self, rhs: Number) -> Result<Number> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_add(b).map(Number::Int).ok_or_else(too_big),
            _ => checked_double(self.to_f64() + rhs.to_f64()),
        }
    }

    pub fn sub(self, rhs: Number) -> Result<Number> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_sub(b).map(Number::Int).ok_or_else(too_big),
            _ => checked_double(self.to_f64() - rhs.to_f64()),
        }
    }

    pub fn mul(self, rhs: Number) -> Result<Number> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_mul(b).map(Number::Int).ok_or_else(too_big),
            _ => checked_double(self.to_f64() * rhs.to_f64()),
        }
    }

    /// Integer division stays integral only when there is no remainder.
    pub fn div(self, rhs: Number) -> Result<Number> {
        if rhs.is_zero() {
            return Err(Error::runtime("division by zero"));
        }
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => {
                if a.checked_rem(b) == Some(0) {
                    a.checked_div(b).map(Number::Int).ok_or_else(too_big)
                } else {
                    checked_double(a as f64 / b as f64)
                }
            }
            _ => checked_double(self.to_f64() / rhs.to_f64()),
        }
    }

    pub fn rem(self, rhs: Number) -> Result<Number> {
        if rhs.is_zero() {
            return Err(Error::runtime("modulo by zero"));
        }
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_rem(b).map(Number::Int).ok_or_else(too_big),
            _ => checked_double(self.to_f64() % rhs.to_f64()),
        }
    }

    pub fn neg(self) -> Result<Number> {
        match self {
            Number::Int(n) => n.checked_neg().map(Number::Int).ok_or_else(too_big),
            Number::Double(x) => Ok(Number::Double(-x)),
        }
    }

    pub fn power(self, exp: Number) -> Result<Number> {
        if let (Number::Int(a), Number::Int(b)) = (self, exp) {
            if b >= 0 {
                return u32::try_from(b)
                    .ok()
                    .and_then(|b| a.checked_pow(b))
                    .map(Number::Int)
                    .ok_or_else(|| Error::runtime("result of exponentiation cannot be expressed"));
            }
        }
        let base = self.to_f64();
        if base == 0.0 && exp.to_f64() < 0.0 {
            return Err(Error::runtime("zero cannot be raised to a negative power"));
        }
        let v = base.powf(exp.to_f64());
        if v.is_finite() {
            Ok(Number::Double(v))
        } else {
            Err(Error::runtime("result of exponentiation cannot be expressed"))
        }
    }

    pub fn sqrt(self) -> Result<Number> {
        let x = self.to_f64();
        if x < 0.0 {
            return Err(Error::runtime("square root of a negative number"));
        }
        let r = x.sqrt();
        if r.fract() == 0.0 && r.abs() < 9.0e15 {
            Ok(Number::Int(r as i64))
        } else {
            Ok(Number::Double(r))
        }
    }

    pub fn abs(self) -> Result<Number> {
        match self {
            Number::Int(n) => n.checked_abs().map(Number::Int).ok_or_else(too_big),
            Number::Double(x) => Ok(Number::Double(x.abs())),
        }
    }

    /// Apply a rounding function, keeping integers untouched.
    pub fn round_with(self, f: fn(f64) -> f64) -> Number {
        match self {
            Number::Int(n) => Number::Int(n),
            Number::Double(x) => {
                let r = f(x);
                if r.abs() < 9.0e15 {
                    Number::Int(r as i64)
                } else {
                    Number::Double(r)
                }
            }
        }
    }

    pub fn sign(self) -> Number {
        match self {
            Number::Int(n) => Number::Int(n.signum()),
            Number::Double(x) if x == 0.0 => Number::Int(0),
            Number::Double(x) => Number::Int(if x > 0.0 { 1 } else { -1 }),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_int_and_double() {
        assert_eq!(Number::Int(42).to_string(), "42");
        assert_eq!(Number::Double(2.5).to_string(), "2.5");
        assert_eq!(Number::Double(3.0).to_string(), "3");
    }

    #[test]
    fn integer_arithmetic() {
        let a = Number::Int(10);
        let b = Number::Int(4);
        assert_eq!(a.add(b).unwrap(), Number::Int(14));
        assert_eq!(a.sub(b).unwrap(), Number::Int(6));
        assert_eq!(a.mul(b).unwrap(), Number::Int(40));
        assert_eq!(a.rem(b).unwrap(), Number::Int(2));
    }

    #[test]
    fn division_promotes_only_with_remainder() {
        assert!(matches!(Number::Int(8).div(Number::Int(4)).unwrap(), Number::Int(2)));
        assert!(matches!(Number::Int(7).div(Number::Int(2)).unwrap(), Number::Double(x) if x == 3.5));
    }

    #[test]
    fn division_and_modulo_by_zero() {
        let e = Number::Int(1).div(Number::Int(0)).unwrap_err();
        assert_eq!(e.message(), "division by zero");
        let e = Number::Double(1.5).rem(Number::Double(0.0)).unwrap_err();
        assert_eq!(e.message(), "modulo by zero");
    }

    #[test]
    fn overflow_is_an_error() {
        assert!(Number::Int(i64::MAX).add(Number::Int(1)).is_err());
        assert!(Number::Int(i64::MIN).neg().is_err());
        assert!(Number::Int(i64::MAX).mul(Number::Int(2)).is_err());
    }

    #[test]
    fn mixed_comparison() {
        assert_eq!(Number::Int(2), Number::Double(2.0));
        assert!(Number::Int(2) < Number::Double(2.5));
    }

    #[test]
    fn sqrt_of_negative() {
        assert!(Number::Int(-4).sqrt().is_err());
        assert_eq!(Number::Int(16).sqrt().unwrap(), Number::Int(4));
    }

    #[test]
    fn power_cases() {
        assert!(matches!(Number::Int(2).power(Number::Int(10)).unwrap(), Number::Int(1024)));
        assert!(Number::Int(10).power(Number::Int(40)).is_err());
        assert!(Number::Int(0).power(Number::Int(-1)).is_err());
        assert_eq!(Number::Int(4).power(Number::Double(0.5)).unwrap(), Number::Int(2));
    }

    #[test]
    fn rounding() {
        assert_eq!(Number::Double(2.5).round_with(f64::floor), Number::Int(2));
        assert_eq!(Number::Double(-2.5).round_with(f64::ceil), Number::Int(-2));
        assert_eq!(Number::Double(-3.7).sign(), Number::Int(-1));
    }
}
