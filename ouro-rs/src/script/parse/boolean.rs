//! Conditions.
//!
//! Forms are tried in this order:
//!
//! | Step | Form |
//! |------|------|
//! | 1 | `true`, `false`, a bool variable |
//! | 2 | `cond ? a : b`, `cond ? a` |
//! | 3 | a bool function |
//! | 4 | `and`, `or`, `xor`, `not` chains |
//! | 5 | comparisons `= != < <= > >=` |
//! | 6 | `in`, `not in` |
//! | 7 | `like`, `not like` |
//!
//! `and`, `or` and `xor` share one precedence level and fold left to right;
//! `not` binds to the operand right after it.  A window with a top-level
//! filter keyword can only be an `in` whose right side is filtered.

use tracing::trace;

use crate::env::Env;
use crate::error::{Error, Result};
use crate::pattern::pattern_is_valid;
use crate::script::compare::{
    CmpOp, Comparison, DefinitionComparison, InDefinition, InList, Like, LikeConst, ListComparison,
};
use crate::script::definition::{DefPtr, ListDefinition};
use crate::script::generator::{constant, func1, GenPtr, Generator};
use crate::script::number::Number;
use crate::script::parse::{unwrap_brackets, Parser};
use crate::script::period::Period;
use crate::script::time::Time;
use crate::token::{Keyword, Token, TokenKind, Tokens};
use crate::var::Variable;

const INVALID_LOGIC: &str = "syntax of a boolean expression is not valid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogicOp {
    And,
    Or,
    Xor,
}

/// `a and b`, `a or b`, `a xor b`.  `and` and `or` short-circuit.
struct Logic {
    left: GenPtr<bool>,
    right: GenPtr<bool>,
    op: LogicOp,
}

impl Generator<bool> for Logic {
    fn value(&mut self, env: &Env) -> Result<bool> {
        let a = self.left.value(env)?;
        Ok(match self.op {
            LogicOp::And => a && self.right.value(env)?,
            LogicOp::Or => a || self.right.value(env)?,
            LogicOp::Xor => a != self.right.value(env)?,
        })
    }

    fn is_constant(&self) -> bool {
        self.left.is_constant() && self.right.is_constant()
    }
}

enum LogicItem<'a> {
    Operand(Tokens<'a>),
    Binary(LogicOp),
    Not,
}

fn negate(g: GenPtr<bool>) -> GenPtr<bool> {
    func1(g, |b: bool| Ok(!b))
}

/// `not` that negates `in` or `like` belongs to that operator.
fn is_logic_not(t: Tokens<'_>, i: usize) -> bool {
    t.at(i).is_keyword(Keyword::Not)
        && !(i + 1 < t.len() && t.at(i + 1).keyword().is_some_and(Keyword::is_negatable))
}

fn binary_logic(tok: &Token) -> Option<LogicOp> {
    match tok.keyword()? {
        Keyword::And => Some(LogicOp::And),
        Keyword::Or => Some(LogicOp::Or),
        Keyword::Xor => Some(LogicOp::Xor),
        _ => None,
    }
}

/// Split at top-level logic keywords.  `None` when there are none.
fn logic_items(t: Tokens<'_>) -> Option<Vec<LogicItem<'_>>> {
    let mut items = Vec::new();
    let mut bi = crate::token::BracketsInfo::default();
    let mut from = 0;
    let mut found = false;
    for (i, tok) in t.iter().enumerate() {
        if bi.is_bracket_free() {
            let item = match binary_logic(tok) {
                Some(op) => Some(LogicItem::Binary(op)),
                None if is_logic_not(t, i) => Some(LogicItem::Not),
                None => None,
            };
            if let Some(item) = item {
                if i > from {
                    items.push(LogicItem::Operand(t.slice(from, i)));
                }
                items.push(item);
                from = i + 1;
                found = true;
                continue;
            }
        }
        bi.refresh(tok);
    }
    if !found {
        return None;
    }
    if from < t.len() {
        items.push(LogicItem::Operand(t.slice(from, t.len())));
    }
    Some(items)
}

/// `[not]* operand (op [not]* operand)*`.
fn is_valid_logic(items: &[LogicItem<'_>]) -> bool {
    let mut expect_operand = true;
    for item in items {
        match item {
            LogicItem::Not if expect_operand => {}
            LogicItem::Operand(_) if expect_operand => expect_operand = false,
            LogicItem::Binary(_) if !expect_operand => expect_operand = true,
            _ => return false,
        }
    }
    !expect_operand
}

/// The comparison operator at `i`, and how many tokens it spans.
fn comparison_at(t: Tokens<'_>, i: usize) -> Result<(CmpOp, usize)> {
    let first = t.at(i).symbol().unwrap_or('=');
    let next = if i + 1 < t.len() { t.at(i + 1).symbol() } else { None };
    let pair = match (first, next) {
        ('<' | '>' | '!', Some('=')) => CmpOp::from_symbols(first, Some('=')).map(|op| (op, 2)),
        _ => CmpOp::from_symbols(first, None).map(|op| (op, 1)),
    };
    pair.ok_or_else(|| {
        Error::syntax(
            "expected = after exclamation mark. For a simple negation, use keyword 'not' instead",
            t.at(i).line,
        )
    })
}

fn side_error(op: &str, left_empty: bool, right_empty: bool, line: usize) -> Option<Error> {
    let msg = match (left_empty, right_empty) {
        (true, true) => format!("both sides of {op} comparison are empty"),
        (true, false) => format!("left side of {op} comparison is empty"),
        (false, true) => format!("right side of {op} comparison is empty"),
        (false, false) => return None,
    };
    Some(Error::syntax(msg, line))
}

fn same_number(a: &Number, b: &Number) -> bool {
    a.compare(b).is_eq()
}

fn same_time(a: &Time, b: &Time) -> bool {
    a.compare(b).is_eq()
}

fn same_string(a: &String, b: &String) -> bool {
    a == b
}

impl Parser {
    pub(crate) fn parse_bool(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<bool>>> {
        let t = unwrap_brackets(t);
        if t.is_empty() {
            return Ok(None);
        }
        match self.bool_unfolded(t)? {
            Some(g) => Ok(Some(self.fold(g, t.line())?)),
            None => Ok(None),
        }
    }

    fn bool_unfolded(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<bool>>> {
        if t.len() == 1 {
            let tok = t.first();
            return match &tok.kind {
                TokenKind::Keyword(Keyword::True) => Ok(Some(constant(true))),
                TokenKind::Keyword(Keyword::False) => Ok(Some(constant(false))),
                TokenKind::Word(w) => self.ctx.typed(w, tok.line, Variable::as_bool),
                _ => Ok(None),
            };
        }
        if t.contains_symbol('?') {
            if let Some(g) = self.parse_ternary(t, Parser::parse_bool)? {
                return Ok(Some(g));
            }
            return self.parse_binary(t, Parser::parse_bool);
        }
        if t.contains_filter_keyword() {
            return match t.find_top(|tok| tok.is_keyword(Keyword::In)) {
                Some(i) => self.parse_in(t, i),
                None => Ok(None),
            };
        }
        if t.is_possible_function() {
            return self.bool_function(t);
        }
        if let Some(items) = logic_items(t) {
            return self.logic_expression(t, items);
        }
        if let Some(i) = t.find_top(|tok| matches!(tok.symbol(), Some('<' | '>' | '!' | '='))) {
            return self.parse_comparison(t, i);
        }
        if let Some(i) = t.find_top(|tok| tok.is_keyword(Keyword::In)) {
            return self.parse_in(t, i);
        }
        if let Some(i) = t.find_top(|tok| tok.is_keyword(Keyword::Like)) {
            return self.parse_like(t, i);
        }
        Ok(None)
    }

    fn logic_expression(&mut self, t: Tokens<'_>, items: Vec<LogicItem<'_>>) -> Result<Option<GenPtr<bool>>> {
        if !is_valid_logic(&items) {
            return Err(Error::syntax(INVALID_LOGIC, t.line()));
        }
        trace!(items = items.len(), "logic expression");
        let mut acc: Option<GenPtr<bool>> = None;
        let mut pending: Option<LogicOp> = None;
        let mut negations = 0;
        for item in items {
            match item {
                LogicItem::Not => negations += 1,
                LogicItem::Binary(op) => pending = Some(op),
                LogicItem::Operand(tokens) => {
                    let Some(mut g) = self.attempt(|p| p.parse_bool(tokens))? else {
                        return Ok(None);
                    };
                    for _ in 0..negations {
                        g = negate(g);
                    }
                    negations = 0;
                    acc = Some(match (acc, pending.take()) {
                        (Some(left), Some(op)) => Box::new(Logic { left, right: g, op }),
                        _ => g,
                    });
                }
            }
        }
        Ok(acc)
    }

    // ── Comparisons ──────────────────────────────────────────────────────────

    fn parse_comparison(&mut self, t: Tokens<'_>, i: usize) -> Result<Option<GenPtr<bool>>> {
        let (op, width) = comparison_at(t, i)?;
        let left = t.slice(0, i);
        let right = t.slice(i + width, t.len());
        if let Some(e) = side_error(op.symbol(), left.is_empty(), right.is_empty(), t.line()) {
            return Err(e);
        }

        if let Some(g) = self.compare_as(left, right, op, Parser::parse_bool, |a: &bool, b: &bool| a.cmp(b))? {
            return Ok(Some(g));
        }
        if let Some(g) = self.compare_as(left, right, op, Parser::parse_number, Number::compare)? {
            return Ok(Some(g));
        }
        if let Some(g) = self.compare_as(left, right, op, Parser::parse_period, Period::compare)? {
            return Ok(Some(g));
        }
        if let Some(g) = self.compare_as(left, right, op, Parser::parse_time, Time::compare)? {
            return Ok(Some(g));
        }
        self.time_comparison_hint(left, right, op)?;
        if let Some(g) = self.compare_as(left, right, op, Parser::parse_string, String::cmp)? {
            return Ok(Some(g));
        }
        self.compare_collections(left, right, op)
    }

    fn compare_as<T: 'static>(
        &mut self,
        left: Tokens<'_>,
        right: Tokens<'_>,
        op: CmpOp,
        parse: fn(&mut Self, Tokens<'_>) -> Result<Option<GenPtr<T>>>,
        cmp: fn(&T, &T) -> std::cmp::Ordering,
    ) -> Result<Option<GenPtr<bool>>> {
        self.attempt(|p| {
            let Some(l) = parse(p, left)? else {
                return Ok(None);
            };
            let Some(r) = parse(p, right)? else {
                return Ok(None);
            };
            Ok(Some(Box::new(Comparison::new(l, r, op, cmp)) as GenPtr<bool>))
        })
    }

    fn compare_lists<T: 'static>(
        &mut self,
        left: Tokens<'_>,
        right: Tokens<'_>,
        op: CmpOp,
        parse: fn(&mut Self, Tokens<'_>) -> Result<Option<GenPtr<Vec<T>>>>,
        eq: fn(&T, &T) -> bool,
    ) -> Result<Option<GenPtr<bool>>> {
        self.attempt(|p| {
            let Some(l) = parse(p, left)? else {
                return Ok(None);
            };
            let Some(r) = parse(p, right)? else {
                return Ok(None);
            };
            Ok(Some(Box::new(ListComparison::new(l, r, op, eq)) as GenPtr<bool>))
        })
    }

    /// A definition, or a string list wrapped as one.
    fn definition_side(&mut self, t: Tokens<'_>) -> Result<Option<(DefPtr, bool)>> {
        if let Some(d) = self.attempt(|p| p.parse_definition(t))? {
            return Ok(Some((d, true)));
        }
        if let Some(l) = self.attempt(|p| p.parse_list(t))? {
            return Ok(Some((Box::new(ListDefinition::new(l)), false)));
        }
        Ok(None)
    }

    fn compare_collections(&mut self, left: Tokens<'_>, right: Tokens<'_>, op: CmpOp) -> Result<Option<GenPtr<bool>>> {
        let defs = self.attempt(|p| {
            let Some((l, l_def)) = p.definition_side(left)? else {
                return Ok(None);
            };
            let Some((r, r_def)) = p.definition_side(right)? else {
                return Ok(None);
            };
            if !l_def && !r_def {
                return Ok(None);
            }
            Ok(Some(Box::new(DefinitionComparison::new(l, r, op)) as GenPtr<bool>))
        })?;
        if defs.is_some() {
            return Ok(defs);
        }
        if let Some(g) = self.compare_lists(left, right, op, Parser::parse_numlist, same_number)? {
            return Ok(Some(g));
        }
        if let Some(g) = self.compare_lists(left, right, op, Parser::parse_timelist, same_time)? {
            return Ok(Some(g));
        }
        self.compare_lists(left, right, op, Parser::parse_list, same_string)
    }

    /// `v = june` where `v` is a time: explain what was probably meant.
    fn time_comparison_hint(&mut self, left: Tokens<'_>, right: Tokens<'_>, op: CmpOp) -> Result<()> {
        let (var_side, num_side) = if left.len() == 1 { (left, right) } else { (right, left) };
        if var_side.len() != 1 || num_side.len() != 1 {
            return Ok(());
        }
        let var_tok = var_side.first();
        let Some(name) = var_tok.word() else {
            return Ok(());
        };
        if self.attempt(|p| p.parse_time(var_side))?.is_none() {
            return Ok(());
        }
        let num_tok = num_side.first();
        let TokenKind::Number(n, mode) = &num_tok.kind else {
            return Ok(());
        };
        let sym = op.symbol();
        let member = match mode {
            crate::token::NumberMode::Month => "month",
            crate::token::NumberMode::WeekDay => "weekday",
            _ => match n {
                Number::Int(y) if (1950..=2100).contains(y) => "year",
                _ => {
                    return Err(Error::syntax(
                        format!("time variable '{name}' cannot be compared with a number"),
                        var_tok.line,
                    ))
                }
            },
        };
        Err(Error::syntax(
            format!(
                "instead of '{name} {sym} {}', write '{name}.{member} {sym} {}'",
                num_tok.origin, num_tok.origin
            ),
            var_tok.line,
        ))
    }

    // ── Membership and patterns ──────────────────────────────────────────────

    /// Left side of `in` or `like`, and whether it ends with `not`.
    fn negatable_left<'a>(&self, t: Tokens<'a>, i: usize, keyword: &str) -> Result<(Tokens<'a>, bool)> {
        let mut left = t.slice(0, i);
        let negated = !left.is_empty() && left.last().is_keyword(Keyword::Not);
        if negated {
            left = left.trim_right();
        }
        if left.is_empty() {
            return Err(Error::syntax(format!("left side of operator '{keyword}' is empty"), t.line()));
        }
        if i + 1 >= t.len() {
            return Err(Error::syntax(format!("right side of operator '{keyword}' is empty"), t.line()));
        }
        Ok((left, negated))
    }

    fn parse_in(&mut self, t: Tokens<'_>, i: usize) -> Result<Option<GenPtr<bool>>> {
        let (left, negated) = self.negatable_left(t, i, &t.at(i).origin)?;
        let right = t.slice(i + 1, t.len());
        let g = self.attempt(|p| p.membership(left, right))?;
        Ok(g.map(|g| if negated { negate(g) } else { g }))
    }

    fn membership(&mut self, left: Tokens<'_>, right: Tokens<'_>) -> Result<Option<GenPtr<bool>>> {
        if let Some(v) = self.attempt(|p| p.parse_number(left))? {
            if let Some(l) = self.attempt(|p| p.parse_numlist(right))? {
                return Ok(Some(Box::new(InList::new(v, l, same_number))));
            }
            if let Some(r) = self.attempt(|p| p.parse_number(right))? {
                return Ok(Some(Box::new(Comparison::new(v, r, CmpOp::Equals, Number::compare))));
            }
        }
        if let Some(v) = self.attempt(|p| p.parse_time(left))? {
            if let Some(l) = self.attempt(|p| p.parse_timelist(right))? {
                return Ok(Some(Box::new(InList::new(v, l, same_time))));
            }
            if let Some(r) = self.attempt(|p| p.parse_time(right))? {
                return Ok(Some(Box::new(Comparison::new(v, r, CmpOp::Equals, Time::compare))));
            }
        }
        let Some(v) = self.attempt(|p| p.parse_string(left))? else {
            return Ok(None);
        };
        if let Some(d) = self.attempt(|p| p.parse_definition(right))? {
            return Ok(Some(Box::new(InDefinition::new(v, d))));
        }
        if let Some(l) = self.attempt(|p| p.parse_list(right))? {
            return Ok(Some(Box::new(InList::new(v, l, same_string))));
        }
        if let Some(r) = self.attempt(|p| p.parse_string(right))? {
            return Ok(Some(Box::new(Comparison::new(v, r, CmpOp::Equals, String::cmp))));
        }
        Ok(None)
    }

    fn parse_like(&mut self, t: Tokens<'_>, i: usize) -> Result<Option<GenPtr<bool>>> {
        let (left, negated) = self.negatable_left(t, i, &t.at(i).origin)?;
        let right = t.slice(i + 1, t.len());
        let Some(value) = self.attempt(|p| p.parse_string(left))? else {
            return Ok(None);
        };
        let g: GenPtr<bool> = match &right.first().kind {
            TokenKind::Quotation(pattern) | TokenKind::Pattern(pattern) if right.len() == 1 => {
                if !pattern_is_valid(pattern) {
                    return Err(Error::syntax(
                        format!("pattern '{pattern}' is not valid for the 'like' operator"),
                        right.line(),
                    ));
                }
                Box::new(LikeConst::new(value, pattern))
            }
            _ => match self.attempt(|p| p.parse_string(right))? {
                Some(pattern) => Box::new(Like::new(value, pattern)),
                None => return Ok(None),
            },
        };
        Ok(Some(if negated { negate(g) } else { g }))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse::tests::{error_of, eval, kind_of, parser};
    use crate::script::value::{Kind, Value};

    #[test]
    fn logic_folds_left_to_right() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "true or false and false"), "0");
        assert_eq!(eval(&mut p, "true or (false and false)"), "1");
        assert_eq!(eval(&mut p, "not false and true"), "1");
        assert_eq!(eval(&mut p, "not not true xor true"), "0");
        assert_eq!(eval(&mut p, "1 < 2 and 'a' = 'a'"), "1");
    }

    #[test]
    fn malformed_logic() {
        let mut p = parser();
        assert_eq!(error_of(&mut p, "true and"), INVALID_LOGIC);
        assert_eq!(error_of(&mut p, "and true"), INVALID_LOGIC);
        assert_eq!(error_of(&mut p, "true not false"), INVALID_LOGIC);
        assert_eq!(error_of(&mut p, "true or or false"), INVALID_LOGIC);
    }

    #[test]
    fn comparisons_of_each_kind() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "2 <= 2"), "1");
        assert_eq!(eval(&mut p, "3 days > 2 days"), "1");
        assert_eq!(eval(&mut p, "1 june 2020 < 2 june 2020"), "1");
        assert_eq!(eval(&mut p, "june 2020 = 15 june 2020"), "1");
        assert_eq!(eval(&mut p, "'abc' != 'abd'"), "1");
        assert_eq!(eval(&mut p, "(1, 2) = (1, 2)"), "1");
        assert_eq!(eval(&mut p, "(1, 2, 3) > (4, 5)"), "1");
    }

    #[test]
    fn comparison_diagnostics() {
        let mut p = parser();
        assert_eq!(error_of(&mut p, "= 3"), "left side of = comparison is empty");
        assert_eq!(error_of(&mut p, "3 >="), "right side of >= comparison is empty");
        assert_eq!(
            error_of(&mut p, "3 ! 4"),
            "expected = after exclamation mark. For a simple negation, use keyword 'not' instead"
        );
        p.ctx.declare("v", Variable::from_value(Value::Time(Time::date(1, 6, 2020))));
        assert_eq!(error_of(&mut p, "v = june"), "instead of 'v = june', write 'v.month = june'");
        assert_eq!(error_of(&mut p, "v = 2020"), "instead of 'v = 2020', write 'v.year = 2020'");
        assert_eq!(error_of(&mut p, "v = 7"), "time variable 'v' cannot be compared with a number");
    }

    #[test]
    fn membership() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "2 in (1, 2, 3)"), "1");
        assert_eq!(eval(&mut p, "2 not in (1, 2, 3)"), "0");
        assert_eq!(eval(&mut p, "'b' in ('a', 'b')"), "1");
        assert_eq!(eval(&mut p, "5 in 5"), "1");
        assert_eq!(error_of(&mut p, "in (1, 2)"), "left side of operator 'in' is empty");
        assert_eq!(error_of(&mut p, "1 in"), "right side of operator 'in' is empty");
    }

    #[test]
    fn like_patterns() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "'uro' like 'u%'"), "1");
        assert_eq!(eval(&mut p, "'ta[21]' like 'ta[[]##]%'"), "1");
        assert_eq!(eval(&mut p, "'abc' not like '_b_'"), "0");
        p.ctx.declare("pat", Variable::from_value(Value::Str("%c".into())));
        assert_eq!(eval(&mut p, "'abc' like pat"), "1");
        assert_eq!(kind_of(&mut p, "'x' like pat or false"), Kind::Bool);
    }
}
