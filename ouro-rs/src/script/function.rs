//! Built-in function bodies and the diagnostics of function calls.
//!
//! The parser decides the kind and arity of a call; the bodies here are the
//! plain functions its generator nodes run.
//!
//! | Kind | Functions |
//! |------|-----------|
//! | bool | `islower` `isupper` `isnumber` `isletter` `isdigit` `isbinary` `ishex` `contains` `startswith` `endswith` `exists` `isfile` `isdirectory` `hidden` `readonly` `empty` `any` `exist` |
//! | number | `absolute` `ceil` `floor` `round` `sign` `sqrt` `truncate` `length` `number` `power` `frombinary` `fromhex` `count` `countinside` `sum` `average` `median` `min` `max` `size` |
//! | string | `lower` `upper` `capitalize` `reverse` `trim` `after` `before` `left` `right` `substring` `repeat` `fill` `replace` `concatenate` `join` `string` `digits` `letters` `roman` `binary` `hex` `monthname` `weekdayname` `first` `last` `extension` `name` `parent` |
//! | time | `date` `time` `christmas` `easter` `newyear` `first` `last` `creation` `modification` |
//! | list | `characters` `words` `split` `numbers` |

use std::path::Path;

use crate::env::Env;
use crate::error::{Error, Result};
use crate::os;
use crate::script::number::Number;
use crate::script::time::{month_name, weekday_name, Time};

/// Every function name the language knows.
pub const NAMES: &[&str] = &[
    // bool
    "islower", "isupper", "isnumber", "isletter", "isdigit", "isbinary", "ishex",
    "contains", "startswith", "endswith", "exists", "isfile", "isdirectory", "hidden",
    "readonly", "empty", "any", "exist",
    // number
    "absolute", "ceil", "floor", "round", "sign", "sqrt", "truncate", "length", "number",
    "power", "frombinary", "fromhex", "count", "countinside", "sum", "average", "median",
    "min", "max", "size",
    // string
    "lower", "upper", "capitalize", "reverse", "trim", "after", "before", "left", "right",
    "substring", "repeat", "fill", "replace", "concatenate", "join", "string", "digits",
    "letters", "roman", "binary", "hex", "monthname", "weekdayname", "first", "last",
    "extension", "name", "parent",
    // time
    "date", "time", "christmas", "easter", "newyear", "creation", "modification",
    // list
    "characters", "words", "split", "numbers",
];

pub fn exists(name: &str) -> bool {
    NAMES.contains(&name)
}

// ── Diagnostics ──────────────────────────────────────────────────────────────

/// `1` → "first", `12` → "12th", `22` → "22nd".
pub fn ordinal(n: usize) -> String {
    match n {
        1 => "first".to_string(),
        2 => "second".to_string(),
        3 => "third".to_string(),
        4 => "fourth".to_string(),
        5 => "fifth".to_string(),
        11..=19 => format!("{n}th"),
        _ => match n % 10 {
            1 => format!("{n}st"),
            2 => format!("{n}nd"),
            3 => format!("{n}rd"),
            _ => format!("{n}th"),
        },
    }
}

pub fn arg_count_error(name: &str, count: usize, line: usize) -> Error {
    let plural = if count == 1 { "" } else { "s" };
    Error::syntax(format!("function '{name}' cannot be called with {count} argument{plural}"), line)
}

pub fn arg_type_error(position: usize, type_name: &str, name: &str, line: usize) -> Error {
    Error::syntax(
        format!("{} argument of function '{name}' cannot be resolved to a {type_name}", ordinal(position)),
        line,
    )
}

pub fn unknown_function(name: &str, line: usize) -> Error {
    Error::syntax(format!("function with name '{name}' does not exist"), line)
}

pub fn in_comma_ambiguity(keyword: &str, name: &str, line: usize) -> Error {
    Error::syntax(
        format!(
            "the right side of the operator '{keyword}' used inside a function '{name}' should be embraced by brackets. \
             Comma is a function argument separator and causes ambiguity here"
        ),
        line,
    )
}

// ── Bool ─────────────────────────────────────────────────────────────────────

pub fn is_lower(s: String) -> Result<bool> {
    Ok(s.chars().any(char::is_alphabetic) && !s.chars().any(char::is_uppercase))
}

pub fn is_upper(s: String) -> Result<bool> {
    Ok(s.chars().any(char::is_alphabetic) && !s.chars().any(char::is_lowercase))
}

/// Optional minus, digits, at most one inner dot.
pub fn is_number(s: String) -> Result<bool> {
    Ok(looks_numeric(&s))
}

fn looks_numeric(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    if body.is_empty() || body.starts_with('.') || body.ends_with('.') {
        return false;
    }
    let mut dots = 0;
    for c in body.chars() {
        match c {
            '.' => dots += 1,
            c if c.is_ascii_digit() => {}
            _ => return false,
        }
    }
    dots <= 1
}

pub fn is_letter(s: String) -> Result<bool> {
    let mut chars = s.chars();
    Ok(matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic()))
}

pub fn is_digit(s: String) -> Result<bool> {
    let mut chars = s.chars();
    Ok(matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_digit()))
}

pub fn is_binary(s: String) -> Result<bool> {
    Ok(!s.is_empty() && s.chars().all(|c| c == '0' || c == '1'))
}

pub fn is_hex(s: String) -> Result<bool> {
    Ok(!s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit()))
}

pub fn contains(s: String, part: String) -> Result<bool> {
    Ok(s.contains(&part))
}

pub fn starts_with(s: String, part: String) -> Result<bool> {
    Ok(s.starts_with(&part))
}

pub fn ends_with(s: String, part: String) -> Result<bool> {
    Ok(s.ends_with(&part))
}

// ── Paths ────────────────────────────────────────────────────────────────────
//
// Path functions receive the path already joined with the current location.

pub fn path_exists(path: String, env: &Env) -> Result<bool> {
    Ok(!path.is_empty() && env.fs.metadata(Path::new(&path)).is_some())
}

pub fn path_is_file(path: String, env: &Env) -> Result<bool> {
    Ok(env.fs.metadata(Path::new(&path)).is_some_and(|m| !m.is_dir))
}

pub fn path_is_directory(path: String, env: &Env) -> Result<bool> {
    Ok(env.fs.metadata(Path::new(&path)).is_some_and(|m| m.is_dir))
}

pub fn path_hidden(path: String, env: &Env) -> Result<bool> {
    Ok(env.fs.metadata(Path::new(&path)).is_some_and(|m| m.hidden))
}

pub fn path_readonly(path: String, env: &Env) -> Result<bool> {
    Ok(env.fs.metadata(Path::new(&path)).is_some_and(|m| m.readonly))
}

pub fn path_empty(path: String, env: &Env) -> Result<bool> {
    Ok(match env.fs.metadata(Path::new(&path)) {
        Some(m) if m.is_dir => env.fs.is_empty_dir(Path::new(&path)),
        Some(m) => m.size == 0,
        None => false,
    })
}

/// Bytes of a file, or of a whole directory tree.  `0` when missing.
pub fn path_size(path: String, env: &Env) -> Result<Number> {
    let size = match env.fs.metadata(Path::new(&path)) {
        Some(m) if m.is_dir => env.fs.dir_size(Path::new(&path)),
        Some(m) => m.size,
        None => 0,
    };
    Ok(Number::Int(size as i64))
}

pub fn path_creation(path: String, env: &Env) -> Result<Time> {
    Ok(env.fs.metadata(Path::new(&path)).and_then(|m| m.creation).unwrap_or_default())
}

pub fn path_modification(path: String, env: &Env) -> Result<Time> {
    Ok(env.fs.metadata(Path::new(&path)).and_then(|m| m.modification).unwrap_or_default())
}

pub fn path_extension(path: String) -> Result<String> {
    Ok(os::extension(&path))
}

pub fn path_name(path: String) -> Result<String> {
    Ok(os::name(&path))
}

pub fn path_parent(path: String) -> Result<String> {
    Ok(os::parent(&path))
}

// ── Number ───────────────────────────────────────────────────────────────────

pub fn absolute(n: Number) -> Result<Number> {
    n.abs()
}

pub fn ceil(n: Number) -> Result<Number> {
    Ok(n.round_with(f64::ceil))
}

pub fn floor(n: Number) -> Result<Number> {
    Ok(n.round_with(f64::floor))
}

pub fn round(n: Number) -> Result<Number> {
    Ok(n.round_with(f64::round))
}

pub fn truncate(n: Number) -> Result<Number> {
    Ok(n.round_with(f64::trunc))
}

pub fn sign(n: Number) -> Result<Number> {
    Ok(n.sign())
}

pub fn sqrt(n: Number) -> Result<Number> {
    n.sqrt()
}

pub fn power(base: Number, exp: Number) -> Result<Number> {
    base.power(exp)
}

pub fn length(s: String) -> Result<Number> {
    Ok(Number::from(s.chars().count()))
}

/// Text to number.  Anything that is not a number gives `0`.
pub fn to_number(s: String) -> Result<Number> {
    if !looks_numeric(&s) {
        return Ok(Number::Int(0));
    }
    if s.contains('.') {
        return Ok(Number::Double(s.parse().unwrap_or(0.0)));
    }
    s.parse::<i64>()
        .map(Number::Int)
        .map_err(|_| Error::runtime(format!("number '{s}' is too big to be stored in memory")))
}

pub fn from_binary(s: String) -> Result<Number> {
    from_radix(s, 2)
}

pub fn from_hex(s: String) -> Result<Number> {
    from_radix(s, 16)
}

/// Invalid digits give `0`, overflow is an error.
fn from_radix(s: String, radix: u32) -> Result<Number> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.as_str()),
    };
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return Ok(Number::Int(0));
    }
    let v = i64::from_str_radix(body, radix)
        .map_err(|_| Error::runtime(format!("number '{s}' is too big to be stored in memory")))?;
    Ok(Number::Int(if negative { -v } else { v }))
}

pub fn sum(values: Vec<Number>) -> Result<Number> {
    values.into_iter().try_fold(Number::Int(0), Number::add)
}

pub fn average(values: Vec<Number>) -> Result<Number> {
    if values.is_empty() {
        return Ok(Number::Int(0));
    }
    let len = values.len();
    sum(values)?.div(Number::from(len))
}

pub fn median(mut values: Vec<Number>) -> Result<Number> {
    if values.is_empty() {
        return Ok(Number::Int(0));
    }
    values.sort_by(Number::compare);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Ok(values[mid])
    } else {
        values[mid - 1].add(values[mid])?.div(Number::Int(2))
    }
}

pub fn min(values: Vec<Number>) -> Result<Number> {
    Ok(values.into_iter().min_by(Number::compare).unwrap_or_default())
}

pub fn max(values: Vec<Number>) -> Result<Number> {
    Ok(values.into_iter().max_by(Number::compare).unwrap_or_default())
}

// ── String ───────────────────────────────────────────────────────────────────

pub fn lower(s: String) -> Result<String> {
    Ok(s.to_lowercase())
}

pub fn upper(s: String) -> Result<String> {
    Ok(s.to_uppercase())
}

/// First letter of every word upper case, the rest lower case.
pub fn capitalize(s: String) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut prev_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_letter = true;
        } else {
            out.push(c);
            prev_letter = false;
        }
    }
    Ok(out)
}

pub fn reverse(s: String) -> Result<String> {
    Ok(s.chars().rev().collect())
}

pub fn trim(s: String) -> Result<String> {
    Ok(s.trim().to_string())
}

/// Text after the first occurrence of `part`; empty when absent.
pub fn after(s: String, part: String) -> Result<String> {
    if part.is_empty() {
        return Ok(String::new());
    }
    Ok(s.find(&part).map(|i| s[i + part.len()..].to_string()).unwrap_or_default())
}

/// Text before the first occurrence of `part`; empty when absent.
pub fn before(s: String, part: String) -> Result<String> {
    if part.is_empty() {
        return Ok(String::new());
    }
    Ok(s.find(&part).map(|i| s[..i].to_string()).unwrap_or_default())
}

pub fn left(s: String, n: Number) -> Result<String> {
    let n = n.to_int();
    if n <= 0 {
        return Ok(String::new());
    }
    Ok(s.chars().take(n as usize).collect())
}

pub fn right(s: String, n: Number) -> Result<String> {
    let n = n.to_int();
    if n <= 0 {
        return Ok(String::new());
    }
    let len = s.chars().count();
    Ok(s.chars().skip(len.saturating_sub(n as usize)).collect())
}

/// 0-based start; a negative start counts from the end.
pub fn substring_from(s: String, start: Number) -> Result<String> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let start = start.to_int();
    let from = if start < 0 { (len + start).max(0) } else { start.min(len) };
    Ok(chars[from as usize..].iter().collect())
}

pub fn substring(s: String, start: Number, count: Number) -> Result<String> {
    let count = count.to_int();
    if count <= 0 {
        return Ok(String::new());
    }
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let start = start.to_int();
    let (from, count) = if start < 0 {
        let from = len + start;
        if from < 0 { (0, (count + from).max(0)) } else { (from, count) }
    } else {
        (start.min(len), count)
    };
    let to = (from + count).min(len);
    Ok(chars[from as usize..to as usize].iter().collect())
}

pub fn repeat(s: String, n: Number) -> Result<String> {
    let n = n.to_int();
    if n <= 0 {
        return Ok(String::new());
    }
    let bytes = (s.len() as u64).saturating_mul(n as u64);
    if bytes > u32::MAX as u64 {
        return Err(Error::runtime("string is too long to be stored in memory"));
    }
    Ok(s.repeat(n as usize))
}

/// `fill(7, 3)` → "007".
pub fn fill(n: Number, width: Number) -> Result<String> {
    let text = n.to_string();
    let width = width.to_int();
    let len = text.chars().count() as i64;
    if width <= len {
        return Ok(text);
    }
    let pad = "0".repeat((width - len) as usize);
    Ok(match text.strip_prefix('-') {
        Some(digits) => format!("-{pad}{digits}"),
        None => format!("{pad}{text}"),
    })
}

pub fn replace(s: String, from: String, to: String) -> Result<String> {
    if from.is_empty() {
        return Ok(s);
    }
    Ok(s.replace(&from, &to))
}

pub fn concatenate(parts: Vec<String>) -> Result<String> {
    Ok(parts.concat())
}

pub fn join(list: Vec<String>, separator: String) -> Result<String> {
    Ok(list.join(&separator))
}

pub fn digits(s: String) -> Result<String> {
    Ok(s.chars().filter(char::is_ascii_digit).collect())
}

pub fn letters(s: String) -> Result<String> {
    Ok(s.chars().filter(|c| c.is_alphabetic()).collect())
}

const ROMAN: [(i64, &str); 13] = [
    (1000, "M"), (900, "CM"), (500, "D"), (400, "CD"), (100, "C"), (90, "XC"),
    (50, "L"), (40, "XL"), (10, "X"), (9, "IX"), (5, "V"), (4, "IV"), (1, "I"),
];

/// Roman numeral.  `0` is "N"; magnitudes from 4000 up print as digits.
pub fn roman(n: Number) -> Result<String> {
    let mut v = n.to_int();
    if v == 0 {
        return Ok("N".to_string());
    }
    if v.abs() >= 4000 {
        return Ok(v.to_string());
    }
    let mut out = String::new();
    if v < 0 {
        out.push('-');
        v = -v;
    }
    for (value, text) in ROMAN {
        while v >= value {
            out.push_str(text);
            v -= value;
        }
    }
    Ok(out)
}

pub fn binary(n: Number) -> Result<String> {
    let v = n.to_int();
    Ok(if v < 0 { format!("-{:b}", v.unsigned_abs()) } else { format!("{v:b}") })
}

pub fn hex(n: Number) -> Result<String> {
    let v = n.to_int();
    Ok(if v < 0 { format!("-{:x}", v.unsigned_abs()) } else { format!("{v:x}") })
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Empty for numbers outside 1..=12.
pub fn monthname(n: Number) -> Result<String> {
    Ok(capitalized(month_name(n.to_int())))
}

/// Empty for numbers outside 1..=7.
pub fn weekdayname(n: Number) -> Result<String> {
    Ok(capitalized(weekday_name(n.to_int())))
}

pub fn first_of<T: Clone + Default>(list: Vec<T>) -> Result<T> {
    Ok(list.first().cloned().unwrap_or_default())
}

pub fn last_of<T: Clone + Default>(list: Vec<T>) -> Result<T> {
    Ok(list.last().cloned().unwrap_or_default())
}

// ── Time ─────────────────────────────────────────────────────────────────────

fn checked(t: Time) -> Result<Time> {
    if t.is_valid() {
        Ok(t)
    } else {
        Err(Error::runtime(format!("date {}.{}.{} does not exist", t.day, t.month, t.year)))
    }
}

pub fn date(d: Number, m: Number, y: Number) -> Result<Time> {
    checked(Time::date(d.to_int(), m.to_int(), y.to_int()))
}

/// `time(m, y)`, `time(d, m, y)`, `time(d, m, y, h, min)` or
/// `time(d, m, y, h, min, s)`.
pub fn time(args: Vec<Number>) -> Result<Time> {
    let v: Vec<i64> = args.iter().map(Number::to_int).collect();
    checked(match v.as_slice() {
        [m, y] => Time::year_month(*m, *y),
        [d, m, y] => Time::date(*d, *m, *y),
        [d, m, y, h, min] => Time::short_clock(*d, *m, *y, *h, *min),
        [d, m, y, h, min, s] => Time::clock(*d, *m, *y, *h, *min, *s),
        _ => return Err(Error::runtime("time cannot be built from these values")),
    })
}

pub fn christmas(year: Number) -> Result<Time> {
    checked(Time::date(25, 12, year.to_int()))
}

pub fn newyear(year: Number) -> Result<Time> {
    checked(Time::date(1, 1, year.to_int()))
}

/// Western Easter Sunday (anonymous Gregorian algorithm).
pub fn easter(year: Number) -> Result<Time> {
    let y = year.to_int();
    let a = y.rem_euclid(19);
    let b = y.div_euclid(100);
    let c = y.rem_euclid(100);
    let d = b.div_euclid(4);
    let e = b.rem_euclid(4);
    let f = (b + 8).div_euclid(25);
    let g = (b - f + 1).div_euclid(3);
    let h = (19 * a + b - d - g + 15).rem_euclid(30);
    let i = c.div_euclid(4);
    let k = c.rem_euclid(4);
    let l = (32 + 2 * e + 2 * i - h - k).rem_euclid(7);
    let m = (a + 11 * h + 22 * l).div_euclid(451);
    let month = (h + l - 7 * m + 114).div_euclid(31);
    let day = (h + l - 7 * m + 114).rem_euclid(31) + 1;
    checked(Time::date(day, month, y))
}

// ── Lists ────────────────────────────────────────────────────────────────────

pub fn characters(s: String) -> Result<Vec<String>> {
    Ok(s.chars().map(String::from).collect())
}

pub fn words(s: String) -> Result<Vec<String>> {
    Ok(s.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).map(String::from).collect())
}

pub fn split(s: String, separator: String) -> Result<Vec<String>> {
    if separator.is_empty() {
        return Ok(vec![s]);
    }
    Ok(s.split(separator.as_str()).map(String::from).collect())
}

/// Every number written in the text, in order.  Digits run into one number;
/// a dot between digits makes it a double.
pub fn numbers(s: String) -> Result<Vec<Number>> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if !chars[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
            i += 1;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
        let text: String = chars[start..i].iter().collect();
        out.push(to_number(text)?);
    }
    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> String {
        v.to_string()
    }

    fn n(v: i64) -> Number {
        Number::Int(v)
    }

    #[test]
    fn ordinals() {
        assert_eq!(ordinal(2), "second");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(21), "21st");
        assert_eq!(ordinal(33), "33rd");
    }

    #[test]
    fn diagnostics() {
        assert_eq!(arg_count_error("lower", 2, 1).message(), "function 'lower' cannot be called with 2 arguments");
        assert_eq!(arg_count_error("date", 1, 1).message(), "function 'date' cannot be called with 1 argument");
        assert_eq!(
            arg_type_error(2, "string", "after", 1).message(),
            "second argument of function 'after' cannot be resolved to a string"
        );
        assert_eq!(unknown_function("foo", 3).line(), Some(3));
        assert!(exists("countinside"));
        assert!(!exists("foo"));
    }

    #[test]
    fn text_predicates() {
        assert!(is_lower(s("abc1")).unwrap());
        assert!(!is_lower(s("aBc")).unwrap());
        assert!(is_number(s("-12.5")).unwrap());
        assert!(!is_number(s("1.2.3")).unwrap());
        assert!(!is_number(s("12.")).unwrap());
        assert!(is_binary(s("1010")).unwrap());
        assert!(is_hex(s("ff0A")).unwrap());
        assert!(is_letter(s("q")).unwrap());
        assert!(!is_digit(s("12")).unwrap());
    }

    #[test]
    fn numbers_from_text() {
        assert_eq!(to_number(s("42")).unwrap(), n(42));
        assert_eq!(to_number(s("2.5")).unwrap(), Number::Double(2.5));
        assert_eq!(to_number(s("x")).unwrap(), n(0));
        assert!(to_number(s("99999999999999999999")).is_err());
        assert_eq!(from_binary(s("-101")).unwrap(), n(-5));
        assert_eq!(from_hex(s("ff")).unwrap(), n(255));
        assert_eq!(from_hex(s("fg")).unwrap(), n(0));
        assert_eq!(numbers(s("a1b22.5c3")).unwrap(), vec![n(1), Number::Double(22.5), n(3)]);
    }

    #[test]
    fn aggregates() {
        assert_eq!(sum(vec![n(1), n(2), n(3)]).unwrap(), n(6));
        assert_eq!(average(vec![n(1), n(2)]).unwrap(), Number::Double(1.5));
        assert_eq!(median(vec![n(9), n(1), n(5)]).unwrap(), n(5));
        assert_eq!(median(vec![n(4), n(1), n(3), n(2)]).unwrap(), Number::Double(2.5));
        assert_eq!(min(vec![n(4), n(-1)]).unwrap(), n(-1));
        assert_eq!(max(Vec::new()).unwrap(), n(0));
    }

    #[test]
    fn string_slicing() {
        assert_eq!(after(s("key=value"), s("=")).unwrap(), "value");
        assert_eq!(before(s("key=value"), s("=")).unwrap(), "key");
        assert_eq!(after(s("abc"), s("x")).unwrap(), "");
        assert_eq!(left(s("abcdef"), n(2)).unwrap(), "ab");
        assert_eq!(right(s("abcdef"), n(2)).unwrap(), "ef");
        assert_eq!(right(s("ab"), n(5)).unwrap(), "ab");
        assert_eq!(substring_from(s("abcdef"), n(4)).unwrap(), "ef");
        assert_eq!(substring_from(s("abcdef"), n(-2)).unwrap(), "ef");
        assert_eq!(substring(s("abcdef"), n(1), n(3)).unwrap(), "bcd");
        assert_eq!(substring(s("abcdef"), n(-3), n(2)).unwrap(), "de");
        assert_eq!(substring(s("abc"), n(-5), n(3)).unwrap(), "a");
        assert_eq!(substring(s("abc"), n(1), n(0)).unwrap(), "");
    }

    #[test]
    fn string_building() {
        assert_eq!(capitalize(s("hello wORLD")).unwrap(), "Hello World");
        assert_eq!(reverse(s("abc")).unwrap(), "cba");
        assert_eq!(repeat(s("ab"), n(3)).unwrap(), "ababab");
        assert_eq!(fill(n(7), n(3)).unwrap(), "007");
        assert_eq!(fill(n(-7), n(3)).unwrap(), "-07");
        assert_eq!(fill(n(1234), n(2)).unwrap(), "1234");
        assert_eq!(replace(s("a-b-c"), s("-"), s("+")).unwrap(), "a+b+c");
        assert_eq!(digits(s("a1b2")).unwrap(), "12");
        assert_eq!(letters(s("a1b2")).unwrap(), "ab");
    }

    #[test]
    fn number_formats() {
        assert_eq!(roman(n(1994)).unwrap(), "MCMXCIV");
        assert_eq!(roman(n(0)).unwrap(), "N");
        assert_eq!(roman(n(-4)).unwrap(), "-IV");
        assert_eq!(roman(n(5000)).unwrap(), "5000");
        assert_eq!(binary(n(5)).unwrap(), "101");
        assert_eq!(hex(n(-255)).unwrap(), "-ff");
        assert_eq!(monthname(n(3)).unwrap(), "March");
        assert_eq!(weekdayname(n(7)).unwrap(), "Sunday");
    }

    #[test]
    fn holidays() {
        assert!(easter(n(2024)).unwrap().equals_exactly(&Time::date(31, 3, 2024)));
        assert!(easter(n(2025)).unwrap().equals_exactly(&Time::date(20, 4, 2025)));
        assert!(christmas(n(2020)).unwrap().equals_exactly(&Time::date(25, 12, 2020)));
        assert!(date(n(30), n(2), n(2021)).is_err());
    }

    #[test]
    fn time_builder() {
        assert!(time(vec![n(6), n(2020)]).unwrap().equals_exactly(&Time::year_month(6, 2020)));
        let t = time(vec![n(1), n(2), n(2020), n(13), n(5)]).unwrap();
        assert!(t.equals_exactly(&Time::short_clock(1, 2, 2020, 13, 5)));
    }

    #[test]
    fn list_builders() {
        assert_eq!(characters(s("ab")).unwrap(), vec!["a", "b"]);
        assert_eq!(words(s("one, two  three")).unwrap(), vec!["one", "two", "three"]);
        assert_eq!(split(s("a;b;;c"), s(";")).unwrap(), vec!["a", "b", "", "c"]);
    }
}
