//! Time expressions.
//!
//! | Form | Example |
//! |------|---------|
//! | literal | `june 2020`, `12 june 2020`, `12 june 2020, 14:30:45` |
//! | global | `now`, `today`, `yesterday`, `tomorrow` |
//! | member | `modification.date` |
//! | arithmetic | `today - 3 days`, `2 weeks + t` |

use crate::error::{Error, Result};
use crate::script::generator::{constant, env_value, func1, func2, GenPtr};
use crate::script::number::Number;
use crate::script::parse::{split_additive, unwrap_brackets, Parser};
use crate::script::period::Period;
use crate::script::time::Time;
use crate::token::{NumberMode, Token, TokenKind, Tokens};
use crate::var::Variable;

fn global(name: &str) -> Option<GenPtr<Time>> {
    let f: fn(&crate::env::Env) -> Result<Time> = match name {
        "now" => |env| Ok(env.clock.now()),
        "today" => |env| Ok(env.clock.today()),
        "yesterday" => |env| env.clock.today().add_days(-1),
        "tomorrow" => |env| env.clock.today().add_days(1),
        _ => return None,
    };
    Some(env_value(f))
}

fn integer(t: &Token) -> Option<i64> {
    match t.kind {
        TokenKind::Number(Number::Int(n), NumberMode::Normal) => Some(n),
        _ => None,
    }
}

fn month(t: &Token) -> Option<i64> {
    match t.kind {
        TokenKind::Number(Number::Int(n), NumberMode::Month) => Some(n),
        _ => None,
    }
}

fn clock(t: &Token) -> Option<(i64, i64, Option<i64>)> {
    match t.kind {
        TokenKind::Clock(h, m, s) => Some((h, m, s)),
        _ => None,
    }
}

/// Recognise a time literal.  `Ok(None)` when the shape does not match,
/// `Err` when it matches but names a moment that does not exist.
pub(crate) fn time_literal(t: Tokens<'_>) -> Result<Option<Time>> {
    let time = match t.len() {
        2 => match (month(t.at(0)), integer(t.at(1))) {
            (Some(m), Some(y)) => Time::year_month(m, y),
            _ => return Ok(None),
        },
        3 => match (integer(t.at(0)), month(t.at(1)), integer(t.at(2))) {
            (Some(d), Some(m), Some(y)) => Time::date(d, m, y),
            _ => return Ok(None),
        },
        4 | 5 => {
            if t.len() == 5 && !t.at(3).is_symbol(',') {
                return Ok(None);
            }
            match (integer(t.at(0)), month(t.at(1)), integer(t.at(2)), clock(t.last())) {
                (Some(d), Some(m), Some(y), Some((h, min, None))) => Time::short_clock(d, m, y, h, min),
                (Some(d), Some(m), Some(y), Some((h, min, Some(s)))) => Time::clock(d, m, y, h, min, s),
                _ => return Ok(None),
            }
        }
        _ => return Ok(None),
    };
    if !time.is_valid() {
        return Err(Error::syntax(format!("time '{}' does not exist", t.origin()), t.line()));
    }
    Ok(Some(time))
}

impl Parser {
    pub(crate) fn parse_time(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Time>>> {
        let t = unwrap_brackets(t);
        if t.is_empty() {
            return Ok(None);
        }
        match self.time_unfolded(t)? {
            Some(g) => Ok(Some(self.fold(g, t.line())?)),
            None => Ok(None),
        }
    }

    fn time_unfolded(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Time>>> {
        if t.len() == 1 {
            return self.time_token(t.first());
        }
        if t.contains_symbol('?') {
            if let Some(g) = self.parse_ternary(t, Parser::parse_time)? {
                return Ok(Some(g));
            }
            return self.parse_binary(t, Parser::parse_time);
        }
        if t.contains_filter_keyword() {
            return Ok(None);
        }
        if let Some(time) = time_literal(t)? {
            return Ok(Some(constant(time)));
        }
        if t.contains_symbol(',') {
            return Ok(None);
        }
        if t.is_possible_function() {
            return self.time_function(t);
        }
        if t.is_possible_list_element() {
            return self.time_element(t);
        }
        self.time_arithmetic(t)
    }

    fn time_token(&mut self, tok: &Token) -> Result<Option<GenPtr<Time>>> {
        match &tok.kind {
            TokenKind::Word(w) => self.time_variable(w, tok.line),
            TokenKind::TwoWords(name, member) if member == "date" => {
                match self.time_variable(name, tok.line)? {
                    Some(g) => Ok(Some(func1(g, |t: Time| Ok(t.to_date())))),
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    /// A time variable or one of the clock globals.  A user variable
    /// shadows a global of the same name.
    pub(crate) fn time_variable(&mut self, name: &str, line: usize) -> Result<Option<GenPtr<Time>>> {
        if !self.ctx.has_variable(name) {
            if let Some(g) = global(name) {
                return Ok(Some(g));
            }
        }
        self.ctx.typed(name, line, Variable::as_time)
    }

    fn time_element(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Time>>> {
        let tok = t.first();
        let Some(name) = tok.word() else {
            return Ok(None);
        };
        let Some(list) = self.ctx.typed(name, tok.line, Variable::as_timelist)? else {
            return Ok(None);
        };
        let index = self.element_index(t)?;
        Ok(Some(Box::new(super::ListElement::new(list, index))))
    }

    /// `[period +]* time [± period]*`.
    fn time_arithmetic(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Time>>> {
        let Some(terms) = split_additive(t) else {
            return Ok(None);
        };
        let mut acc: Option<GenPtr<Time>> = None;
        let mut leading: Vec<GenPtr<Period>> = Vec::new();
        for term in terms {
            match acc.take() {
                None => {
                    if let Some(time) = self.attempt(|p| p.parse_time(term.tokens))? {
                        if term.minus {
                            return Ok(None);
                        }
                        let mut shifted = time;
                        for period in leading.drain(..) {
                            shifted = func2(shifted, period, |t: Time, p: Period| t.shift(&p));
                        }
                        acc = Some(shifted);
                    } else if let Some(period) = self.attempt(|p| p.parse_period(term.tokens))? {
                        if term.minus {
                            return Ok(None);
                        }
                        leading.push(period);
                    } else {
                        return Ok(None);
                    }
                }
                Some(time) => {
                    let Some(period) = self.attempt(|p| p.parse_period(term.tokens))? else {
                        return Ok(None);
                    };
                    acc = Some(if term.minus {
                        func2(time, period, |t: Time, p: Period| t.unshift(&p))
                    } else {
                        func2(time, period, |t: Time, p: Period| t.shift(&p))
                    });
                }
            }
        }
        Ok(acc)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::script::parse::tests::{error_of, eval, kind_of, parser};
    use crate::script::value::{Kind, Value};

    fn literal(src: &str) -> Option<Time> {
        let toks = tokenize(src).unwrap();
        time_literal(Tokens::new(&toks)).unwrap()
    }

    #[test]
    fn literals() {
        assert_eq!(literal("june 2020").unwrap().to_string(), "June 2020");
        assert_eq!(literal("12 june 2020").unwrap().to_string(), "12 June 2020");
        assert_eq!(literal("12 june 2020, 14:30").unwrap().to_string(), "12 June 2020, 14:30");
        assert_eq!(literal("12 june 2020 14:30:05").unwrap().to_string(), "12 June 2020, 14:30:05");
        assert!(literal("12 2020").is_none());
        assert!(literal("june june").is_none());
    }

    #[test]
    fn impossible_literal() {
        let mut p = parser();
        assert_eq!(error_of(&mut p, "30 february 2021"), "time '30 february 2021' does not exist");
        assert_eq!(error_of(&mut p, "1 may 2021, 25:00"), "time '1 may 2021 , 25:00' does not exist");
    }

    #[test]
    fn globals_read_the_clock() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "now"), "15 June 2024, 10:30:00");
        assert_eq!(eval(&mut p, "today"), "15 June 2024");
        assert_eq!(eval(&mut p, "yesterday"), "14 June 2024");
        assert_eq!(eval(&mut p, "tomorrow"), "16 June 2024");
        assert_eq!(eval(&mut p, "now.date"), "15 June 2024");
    }

    #[test]
    fn shifting_by_periods() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "today - 15 days"), "31 May 2024");
        assert_eq!(eval(&mut p, "1 month + 31 january 2023"), "28 February 2023");
        assert_eq!(eval(&mut p, "today + 1 year - 2 months"), "15 April 2025");
        assert_eq!(kind_of(&mut p, "today - yesterday"), Kind::Period);
    }

    #[test]
    fn time_list_element() {
        let mut p = parser();
        p.ctx.declare(
            "ts",
            Variable::from_value(Value::TimeList(vec![Time::date(1, 1, 2020), Time::date(2, 2, 2022)])),
        );
        assert_eq!(eval(&mut p, "ts[1]"), "2 February 2022");
        assert_eq!(eval(&mut p, "ts[5]"), "");
    }
}
