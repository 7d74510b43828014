//! Period expressions: `3 days`, `-1 hour`, `2 weeks + 3 days`,
//! `now - creation`, `3 * 2 days`.

use crate::error::{Error, Result};
use crate::script::generator::{func1, func2, GenPtr};
use crate::script::number::Number;
use crate::script::parse::{split_additive, unwrap_brackets, Parser};
use crate::script::period::{Period, PeriodUnit};
use crate::script::time::Time;
use crate::token::{Token, TokenKind, Tokens};
use crate::var::Variable;

fn unit_builder(unit: PeriodUnit) -> fn(Number) -> Result<Period> {
    match unit {
        PeriodUnit::Years => |n| Ok(Period::unit(n.to_int(), PeriodUnit::Years)),
        PeriodUnit::Months => |n| Ok(Period::unit(n.to_int(), PeriodUnit::Months)),
        PeriodUnit::Weeks => |n| Ok(Period::unit(n.to_int(), PeriodUnit::Weeks)),
        PeriodUnit::Days => |n| Ok(Period::unit(n.to_int(), PeriodUnit::Days)),
        PeriodUnit::Hours => |n| Ok(Period::unit(n.to_int(), PeriodUnit::Hours)),
        PeriodUnit::Minutes => |n| Ok(Period::unit(n.to_int(), PeriodUnit::Minutes)),
        PeriodUnit::Seconds => |n| Ok(Period::unit(n.to_int(), PeriodUnit::Seconds)),
    }
}

/// Operand of a period chain.
enum Operand {
    Period(GenPtr<Period>),
    Time(GenPtr<Time>),
}

impl Parser {
    pub(crate) fn parse_period(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Period>>> {
        let t = unwrap_brackets(t);
        if t.is_empty() {
            return Ok(None);
        }
        match self.period_unfolded(t)? {
            Some(g) => Ok(Some(self.fold(g, t.line())?)),
            None => Ok(None),
        }
    }

    fn period_unfolded(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Period>>> {
        if t.len() == 1 {
            return self.period_token(t.first());
        }
        if t.contains_symbol('?') {
            if let Some(g) = self.parse_ternary(t, Parser::parse_period)? {
                return Ok(Some(g));
            }
            return self.parse_binary(t, Parser::parse_period);
        }
        if t.contains_filter_keyword() || t.contains_symbol(',') || t.is_possible_function() {
            return Ok(None);
        }
        if let Some(g) = self.period_literal(t)? {
            return Ok(Some(g));
        }
        if let Some(terms) = split_additive(t) {
            return self.period_chain(terms);
        }
        if t.first().is_symbol('-') {
            return Ok(self
                .attempt(|p| p.parse_period(t.trim_left()))?
                .map(|g| func1(g, |p: Period| Ok(p.negated()))));
        }
        self.period_product(t)
    }

    fn period_token(&mut self, tok: &Token) -> Result<Option<GenPtr<Period>>> {
        match &tok.kind {
            TokenKind::Word(w) => self.ctx.typed(w, tok.line, Variable::as_period),
            _ => Ok(None),
        }
    }

    /// `n unit`, where `n` is any numeric expression.
    fn period_literal(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Period>>> {
        let last = t.last();
        let Some((unit, singular)) = last.word().and_then(PeriodUnit::from_word) else {
            return Ok(None);
        };
        let amount = t.trim_right();
        let Some(n) = self.attempt(|p| p.parse_number(amount))? else {
            return Ok(None);
        };
        if singular && !(amount.len() == 1 && amount.first().is_one()) {
            return Err(Error::syntax(
                format!("missing letter 's' at the end of the word '{}'", last.origin),
                last.line,
            ));
        }
        Ok(Some(func1(n, unit_builder(unit))))
    }

    /// `a + b - c` where each operand is a period, or two times subtracted.
    fn period_chain(&mut self, terms: Vec<super::Term<'_>>) -> Result<Option<GenPtr<Period>>> {
        let mut operands = Vec::with_capacity(terms.len());
        for term in &terms {
            if let Some(g) = self.attempt(|p| p.parse_period(term.tokens))? {
                operands.push((term.minus, Operand::Period(g)));
            } else if let Some(g) = self.attempt(|p| p.parse_time(term.tokens))? {
                operands.push((term.minus, Operand::Time(g)));
            } else {
                return Ok(None);
            }
        }

        let mut acc: Option<GenPtr<Period>> = None;
        let mut iter = operands.into_iter();
        while let Some((minus, operand)) = iter.next() {
            let period = match operand {
                Operand::Period(g) => g,
                Operand::Time(later) => match iter.next() {
                    Some((true, Operand::Time(earlier))) => {
                        func2(later, earlier, |a: Time, b: Time| Ok(Period::between(&a, &b)))
                    }
                    _ => return Ok(None),
                },
            };
            acc = Some(match acc {
                None if minus => func1(period, |p: Period| Ok(p.negated())),
                None => period,
                Some(a) if minus => func2(a, period, |a: Period, b: Period| a.minus(&b)),
                Some(a) => func2(a, period, |a: Period, b: Period| a.plus(&b)),
            });
        }
        Ok(acc)
    }

    /// `period * n`, `n * period`, `period / n`.
    fn period_product(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Period>>> {
        let Some(i) = t.rfind_top(|tok| matches!(tok.symbol(), Some('*' | '/'))) else {
            return Ok(None);
        };
        let (left, right) = (t.slice(0, i), t.slice(i + 1, t.len()));
        if left.is_empty() || right.is_empty() {
            return Ok(None);
        }
        let divide = t.at(i).is_symbol('/');
        if let Some(p) = self.attempt(|p| p.parse_period(left))? {
            if let Some(n) = self.attempt(|p| p.parse_number(right))? {
                return Ok(Some(if divide {
                    func2(p, n, |p: Period, n: Number| p.divided(n.to_int()))
                } else {
                    func2(p, n, |p: Period, n: Number| p.times(n.to_int()))
                }));
            }
            return Ok(None);
        }
        if divide {
            return Ok(None);
        }
        let Some(n) = self.attempt(|p| p.parse_number(left))? else {
            return Ok(None);
        };
        let Some(p) = self.attempt(|p| p.parse_period(right))? else {
            return Ok(None);
        };
        Ok(Some(func2(n, p, |n: Number, p: Period| p.times(n.to_int()))))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse::tests::{error_of, eval, kind_of, parser};
    use crate::script::value::{Kind, Value};

    #[test]
    fn literals_and_singular_rule() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "3 days"), "3 days");
        assert_eq!(eval(&mut p, "1 day"), "1 day");
        assert_eq!(eval(&mut p, "(1 + 1) weeks"), "2 weeks");
        assert_eq!(error_of(&mut p, "2 day"), "missing letter 's' at the end of the word 'day'");
    }

    #[test]
    fn chains_and_negation() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "-3 hours"), "-3 hours");
        assert_eq!(kind_of(&mut p, "2 weeks + 3 days"), Kind::Period);
        assert_eq!(eval(&mut p, "2 days + 3 days"), "5 days");
        assert_eq!(eval(&mut p, "2 days - 3 days"), "-1 day");
    }

    #[test]
    fn products() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "3 * 2 days"), "6 days");
        assert_eq!(eval(&mut p, "(4 hours) * 2"), "8 hours");
        assert_eq!(eval(&mut p, "(4 hours) / 2"), "2 hours");
        p.ctx.declare("z", Variable::from_value(Value::Number(Number::Int(0))));
        let mut typed = p.expression("(4 hours) / z").unwrap();
        assert_eq!(typed.evaluate(&p.env.clone()).unwrap_err().message(), "division by zero");
    }

    #[test]
    fn time_difference() {
        let mut p = parser();
        p.ctx.declare("a", Variable::from_value(Value::Time(Time::date(10, 6, 2024))));
        p.ctx.declare("b", Variable::from_value(Value::Time(Time::date(1, 6, 2024))));
        assert_eq!(kind_of(&mut p, "a - b"), Kind::Period);
        let mut diff = p.expression("a - b").unwrap();
        let mut nine = p.expression("9 days").unwrap();
        let env = p.env.clone();
        assert_eq!(diff.evaluate(&env).unwrap(), nine.evaluate(&env).unwrap());
        assert_eq!(kind_of(&mut p, "a - b + 1 day"), Kind::Period);
    }
}
