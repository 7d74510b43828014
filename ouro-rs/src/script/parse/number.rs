//! Numeric expressions.
//!
//! An expression is first flattened into [`ExpElement`]s, one per operand or
//! operator.  A `-` at the start or right after another operator becomes
//! the unary marker `~`.  Reduction then runs in three passes: unary minus,
//! `* / %`, `+ -`.  Two constant operands are combined on the spot, so a
//! constant divisor of zero is caught at parse time.

use tracing::trace;

use crate::error::{Error, Result};
use crate::script::generator::{constant, func1, func2, GenPtr};
use crate::script::number::Number;
use crate::script::parse::{unwrap_brackets, Parser};
use crate::script::period::{Period, PERIOD_MEMBERS};
use crate::script::time::{Time, TIME_MEMBERS};
use crate::token::{BracketsInfo, Token, TokenKind, Tokens};
use crate::var::Variable;

const UNARY_MINUS: char = '~';

/// Element of a flattened infix expression.
pub(crate) enum ExpElement<T> {
    Operator(char),
    Constant(T),
    Generator(GenPtr<T>),
}

impl<T: Clone + 'static> ExpElement<T> {
    fn into_generator(self) -> GenPtr<T> {
        match self {
            ExpElement::Generator(g) => g,
            ExpElement::Constant(v) => constant(v),
            ExpElement::Operator(_) => unreachable!("operators are consumed by reduction"),
        }
    }

    fn operator(&self) -> Option<char> {
        match self {
            ExpElement::Operator(c) => Some(*c),
            _ => None,
        }
    }
}

fn is_operator(t: &Token) -> bool {
    matches!(t.symbol(), Some('+' | '-' | '*' | '/' | '%'))
}

fn operation(op: char) -> fn(Number, Number) -> Result<Number> {
    match op {
        '+' => Number::add,
        '-' => Number::sub,
        '*' => Number::mul,
        '/' => Number::div,
        _ => Number::rem,
    }
}

fn time_member(name: &str) -> Option<fn(Time) -> Result<Number>> {
    let f: fn(Time) -> Result<Number> = match name {
        "year" => |t| Ok(Number::Int(t.year)),
        "month" => |t| Ok(Number::Int(t.month)),
        "day" => |t| Ok(Number::Int(t.day)),
        "weekday" => |t| Ok(Number::Int(t.weekday())),
        "hour" => |t| Ok(Number::Int(t.hour)),
        "minute" => |t| Ok(Number::Int(t.minute)),
        "second" => |t| Ok(Number::Int(t.second)),
        _ => return None,
    };
    Some(f)
}

fn period_member(name: &str) -> Option<fn(Period) -> Result<Number>> {
    let f: fn(Period) -> Result<Number> = match name {
        "years" => |p| Ok(Number::Int(p.total_years())),
        "months" => |p| Ok(Number::Int(p.total_months())),
        "weeks" => |p| Ok(Number::Int(p.weeks)),
        "days" => |p| Ok(Number::Int(p.days)),
        "hours" => |p| Ok(Number::Int(p.hours)),
        "minutes" => |p| Ok(Number::Int(p.minutes)),
        "seconds" => |p| Ok(Number::Int(p.seconds)),
        _ => return None,
    };
    Some(f)
}

impl Parser {
    pub(crate) fn parse_number(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Number>>> {
        let t = unwrap_brackets(t);
        if t.is_empty() {
            return Ok(None);
        }
        match self.number_unfolded(t)? {
            Some(g) => Ok(Some(self.fold(g, t.line())?)),
            None => Ok(None),
        }
    }

    fn number_unfolded(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Number>>> {
        if t.len() == 1 {
            return self.number_token(t.first());
        }
        if t.contains_symbol('?') {
            if let Some(g) = self.parse_ternary(t, Parser::parse_number)? {
                return Ok(Some(g));
            }
            return self.parse_binary(t, Parser::parse_number);
        }
        if t.contains_filter_keyword() || t.contains_symbol(',') {
            return Ok(None);
        }
        if t.is_possible_function() {
            return self.number_function(t);
        }
        if t.is_possible_list_element() {
            return self.number_element(t);
        }
        if t.find_top(is_operator).is_some() {
            return self.number_expression(t);
        }
        Ok(None)
    }

    fn number_token(&mut self, tok: &Token) -> Result<Option<GenPtr<Number>>> {
        match &tok.kind {
            TokenKind::Number(n, _) => Ok(Some(constant(*n))),
            TokenKind::Word(w) => self.ctx.typed(w, tok.line, Variable::as_number),
            TokenKind::TwoWords(a, b) => self.number_member(a, b, tok),
            _ => Ok(None),
        }
    }

    /// `t.year`, `p.days`.
    fn number_member(&mut self, name: &str, member: &str, tok: &Token) -> Result<Option<GenPtr<Number>>> {
        if let Some(t) = self.time_variable(name, tok.line)? {
            if member == "date" {
                return Ok(None);
            }
            return match time_member(member) {
                Some(f) => Ok(Some(func1(t, f))),
                None => Err(Error::syntax(
                    format!(
                        "'{}' is not a time variable member. Valid members are: {}",
                        tok.origin,
                        TIME_MEMBERS.join(", ")
                    ),
                    tok.line,
                )),
            };
        }
        if let Some(p) = self.ctx.typed(name, tok.line, Variable::as_period)? {
            return match period_member(member) {
                Some(f) => Ok(Some(func1(p, f))),
                None => Err(Error::syntax(
                    format!(
                        "'{}' is not a period variable member. Valid members are: {}",
                        tok.origin,
                        PERIOD_MEMBERS.join(", ")
                    ),
                    tok.line,
                )),
            };
        }
        Ok(None)
    }

    /// `list[index]` over a number list.
    fn number_element(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Number>>> {
        let tok = t.first();
        let Some(name) = tok.word() else {
            return Ok(None);
        };
        let Some(list) = self.ctx.typed(name, tok.line, Variable::as_numlist)? else {
            return Ok(None);
        };
        let index = self.element_index(t)?;
        Ok(Some(Box::new(super::ListElement::new(list, index))))
    }

    /// Index expression of `name[index]`.
    pub(crate) fn element_index(&mut self, t: Tokens<'_>) -> Result<GenPtr<Number>> {
        let inner = t.slice(2, t.len() - 1);
        if inner.is_empty() {
            return Err(Error::syntax(format!("empty brackets after '{}'", t.first().origin), t.line()));
        }
        match self.parse_number(inner)? {
            Some(g) => Ok(g),
            None => Err(Error::syntax(
                format!("content of square brackets after '{}' cannot be resolved to a number", t.first().origin),
                t.line(),
            )),
        }
    }

    // ── Infix expressions ────────────────────────────────────────────────────

    fn number_expression(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Number>>> {
        let mut elements: Vec<ExpElement<Number>> = Vec::new();
        let mut bi = BracketsInfo::default();
        let mut from = 0;
        for (i, tok) in t.iter().enumerate() {
            if bi.is_bracket_free() && is_operator(tok) {
                if i > from {
                    match self.number_operand(t.slice(from, i))? {
                        Some(e) => elements.push(e),
                        None => return Ok(None),
                    }
                }
                let mut op = tok.symbol().unwrap_or('+');
                let after_operand = matches!(elements.last(), Some(e) if e.operator().is_none());
                if op == '-' && !after_operand {
                    op = UNARY_MINUS;
                }
                elements.push(ExpElement::Operator(op));
                from = i + 1;
            } else {
                bi.refresh(tok);
            }
        }
        if from < t.len() {
            match self.number_operand(t.slice(from, t.len()))? {
                Some(e) => elements.push(e),
                None => return Ok(None),
            }
        }

        if !is_computable(&elements) {
            return Err(Error::syntax("syntax of a numerical expression is not valid", t.line()));
        }
        trace!(elements = elements.len(), "numeric expression");
        self.reduce(elements, t.line()).map(Some)
    }

    fn number_operand(&mut self, t: Tokens<'_>) -> Result<Option<ExpElement<Number>>> {
        let Some(mut g) = self.parse_number(t)? else {
            return Ok(None);
        };
        if self.fold_constants && g.is_constant() {
            return Ok(Some(ExpElement::Constant(g.value(&self.env)?)));
        }
        Ok(Some(ExpElement::Generator(g)))
    }

    fn reduce(&self, elements: Vec<ExpElement<Number>>, line: usize) -> Result<GenPtr<Number>> {
        let elements = self.reduce_unary(elements, line)?;
        let elements = self.reduce_pass(elements, &['*', '/', '%'], line)?;
        let mut elements = self.reduce_pass(elements, &['+', '-'], line)?;
        match elements.pop() {
            Some(e) if elements.is_empty() => Ok(e.into_generator()),
            _ => Err(Error::syntax("syntax of a numerical expression is not valid", line)),
        }
    }

    /// Fold every `~` into the operand that follows it.
    fn reduce_unary(&self, elements: Vec<ExpElement<Number>>, line: usize) -> Result<Vec<ExpElement<Number>>> {
        let mut out: Vec<ExpElement<Number>> = Vec::with_capacity(elements.len());
        for e in elements.into_iter().rev() {
            if e.operator() == Some(UNARY_MINUS) {
                let operand = out.pop();
                let negated = match operand {
                    Some(ExpElement::Constant(n)) => ExpElement::Constant(n.neg().map_err(|e| e.at_line(line))?),
                    Some(ExpElement::Generator(g)) => ExpElement::Generator(func1(g, Number::neg)),
                    _ => return Err(Error::syntax("syntax of a numerical expression is not valid", line)),
                };
                out.push(negated);
            } else {
                out.push(e);
            }
        }
        out.reverse();
        Ok(out)
    }

    fn reduce_pass(
        &self,
        elements: Vec<ExpElement<Number>>,
        ops: &[char],
        line: usize,
    ) -> Result<Vec<ExpElement<Number>>> {
        let mut out: Vec<ExpElement<Number>> = Vec::with_capacity(elements.len());
        let mut pending: Option<char> = None;
        for e in elements {
            match e.operator() {
                Some(op) if ops.contains(&op) => pending = Some(op),
                Some(_) => out.push(e),
                None => match pending.take() {
                    Some(op) => {
                        let left = out.pop();
                        let combined = match left {
                            Some(left) => combine(left, op, e, line)?,
                            None => return Err(Error::syntax("syntax of a numerical expression is not valid", line)),
                        };
                        out.push(combined);
                    }
                    None => out.push(e),
                },
            }
        }
        Ok(out)
    }
}

/// Operands and binary operators alternate, with optional unary markers
/// before operands.
fn is_computable(elements: &[ExpElement<Number>]) -> bool {
    let mut expect_operand = true;
    for e in elements {
        match e.operator() {
            Some(UNARY_MINUS) if expect_operand => {}
            Some(_) if expect_operand => return false,
            Some(_) => expect_operand = true,
            None if expect_operand => expect_operand = false,
            None => return false,
        }
    }
    !expect_operand
}

fn combine(
    left: ExpElement<Number>,
    op: char,
    right: ExpElement<Number>,
    line: usize,
) -> Result<ExpElement<Number>> {
    if let ExpElement::Constant(r) = &right {
        if r.is_zero() {
            match op {
                '/' => return Err(Error::syntax("inevitable division by zero", line)),
                '%' => return Err(Error::syntax("inevitable modulo by zero", line)),
                _ => {}
            }
        }
    }
    let f = operation(op);
    Ok(match (left, right) {
        (ExpElement::Constant(a), ExpElement::Constant(b)) => {
            ExpElement::Constant(f(a, b).map_err(|e| e.at_line(line))?)
        }
        (a, b) => ExpElement::Generator(func2(a.into_generator(), b.into_generator(), f)),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse::tests::{error_of, eval, parser};
    use crate::script::value::Value;

    #[test]
    fn precedence_and_associativity() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "2 + 3 * 4"), "14");
        assert_eq!(eval(&mut p, "(2 + 3) * 4"), "20");
        assert_eq!(eval(&mut p, "10 - 4 - 3"), "3");
        assert_eq!(eval(&mut p, "100 / 10 / 5"), "2");
        assert_eq!(eval(&mut p, "7 % 4 * 2"), "6");
        assert_eq!(eval(&mut p, "7 / 2"), "3.5");
    }

    #[test]
    fn unary_minus() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "-3"), "-3");
        assert_eq!(eval(&mut p, "2 * -3"), "-6");
        assert_eq!(eval(&mut p, "- -4"), "4");
        assert_eq!(eval(&mut p, "5 - -2"), "7");
        assert_eq!(eval(&mut p, "-(1 + 2) * 2"), "-6");
    }

    #[test]
    fn variables_stay_lazy() {
        let mut p = parser();
        p.ctx.declare("x", Variable::from_value(Value::Number(Number::Int(4))));
        let mut g = p.parse_number(crate::token::Tokens::new(&crate::lexer::tokenize("x * 2 + 1").unwrap()))
            .unwrap()
            .unwrap();
        assert!(!g.is_constant());
        let env = p.env.clone();
        assert_eq!(g.value(&env).unwrap(), Number::Int(9));
        if let Some(Variable::Number(v)) = p.ctx.variable("x") {
            *v.borrow_mut() = Number::Int(10);
        }
        assert_eq!(g.value(&env).unwrap(), Number::Int(21));
    }

    #[test]
    fn constant_zero_divisor_is_a_syntax_error() {
        let mut p = parser();
        assert_eq!(error_of(&mut p, "5 / (2 - 2)"), "inevitable division by zero");
        assert_eq!(error_of(&mut p, "5 % 0"), "inevitable modulo by zero");
        let e = p.expression("5 / 0").unwrap_err();
        assert!(e.is_syntax());
    }

    #[test]
    fn runtime_zero_divisor() {
        let mut p = parser();
        p.ctx.declare("z", Variable::from_value(Value::Number(Number::Int(0))));
        let mut typed = p.expression("1 / z").unwrap();
        let e = typed.evaluate(&p.env.clone()).unwrap_err();
        assert!(e.is_runtime());
        assert_eq!(e.message(), "division by zero");
    }

    #[test]
    fn malformed_expressions() {
        let mut p = parser();
        assert_eq!(error_of(&mut p, "2 * * 3"), "syntax of a numerical expression is not valid");
        assert_eq!(error_of(&mut p, "2 +"), "syntax of a numerical expression is not valid");
        assert_eq!(error_of(&mut p, "* 2"), "syntax of a numerical expression is not valid");
    }

    #[test]
    fn members() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "now.year"), "2024");
        p.ctx.declare("t", Variable::from_value(Value::Time(Time::date(3, 2, 2021))));
        assert_eq!(eval(&mut p, "t.month + t.day"), "5");
        assert_eq!(
            error_of(&mut p, "t.days"),
            "'t.days' is not a time variable member. Valid members are: year, month, day, weekday, hour, minute, second"
        );
        p.ctx.declare("p", Variable::from_value(Value::Period(Period::unit(36, crate::script::period::PeriodUnit::Hours))));
        assert_eq!(eval(&mut p, "p.hours"), "36");
    }

    #[test]
    fn overflow_is_reported_with_line() {
        let mut p = parser();
        let e = p.expression("\n9223372036854775807 + 1").unwrap_err();
        assert_eq!(e.message(), "number is too big to be computed");
        assert_eq!(e.line(), Some(2));
    }

    #[test]
    fn unfolded_tree_gives_same_values() {
        let mut p = parser().without_folding();
        let mut typed = p.expression("2 + 3 * -4").unwrap();
        assert_eq!(typed.evaluate(&p.env.clone()).unwrap().to_string(), "-10");
    }
}
