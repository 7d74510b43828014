//! Typed expression parser.
//!
//! The grammar is ambiguous across kinds: a bare word may be a string
//! variable, a number variable or a file attribute, and `a, b` may be a list
//! or a chain of definitions.  The parser therefore tries one kind after
//! another against the same token window and keeps the first success.  Each
//! kind parser answers `Ok(None)` for "not my kind" and `Err` only when the
//! window can be nothing else.
//!
//! | Module | Builds |
//! |--------|--------|
//! | [`boolean`] | conditions: logic, comparisons, `in`, `like` |
//! | [`number`] | numeric expressions with `* / %` above `+ -` |
//! | [`time`] | time literals, `now`, members, time ± period |
//! | [`period`] | period literals and chains, time differences |
//! | [`string`] | literals, concatenation, casts |
//! | [`list`] | string, number and time lists, list filters |
//! | [`definition`] | file sources, asterisk patterns, chains, filters |
//! | [`func`] | function calls of every kind |
//!
//! A failed attempt restores the attribute masks it touched, so only the
//! attributes of the accepted parse are ever loaded.

mod boolean;
mod definition;
mod func;
mod list;
mod number;
mod period;
mod string;
mod time;

use std::rc::Rc;

use tracing::debug;

use crate::env::Env;
use crate::error::{Error, Result};
use crate::lexer::tokenize;
use crate::os;
use crate::script::context::{Context, FileContext};
use crate::script::definition::{collect, DefPtr};
use crate::script::generator::{self, func2, ternary, GenPtr, VarRef};
use crate::script::number::Number;
use crate::script::period::Period;
use crate::script::time::Time;
use crate::script::value::{Kind, Value};
use crate::token::{Keyword, Tokens};
use crate::var::Var;

pub use list::ListElement;

/// An expression of a statically known kind.
pub enum Typed {
    Bool(GenPtr<bool>),
    Number(GenPtr<Number>),
    Time(GenPtr<Time>),
    Period(GenPtr<Period>),
    Str(GenPtr<String>),
    Definition(DefPtr),
    List(GenPtr<Vec<String>>),
    NumList(GenPtr<Vec<Number>>),
    TimeList(GenPtr<Vec<Time>>),
}

impl Typed {
    pub fn kind(&self) -> Kind {
        match self {
            Typed::Bool(_) => Kind::Bool,
            Typed::Number(_) => Kind::Number,
            Typed::Time(_) => Kind::Time,
            Typed::Period(_) => Kind::Period,
            Typed::Str(_) => Kind::String,
            Typed::Definition(_) => Kind::Definition,
            Typed::List(_) => Kind::List,
            Typed::NumList(_) => Kind::NumList,
            Typed::TimeList(_) => Kind::TimeList,
        }
    }

    /// Evaluate once.  A definition is materialised into a list.
    pub fn evaluate(&mut self, env: &Env) -> Result<Value> {
        Ok(match self {
            Typed::Bool(g) => Value::Bool(g.value(env)?),
            Typed::Number(g) => Value::Number(g.value(env)?),
            Typed::Time(g) => Value::Time(g.value(env)?),
            Typed::Period(g) => Value::Period(g.value(env)?),
            Typed::Str(g) => Value::Str(g.value(env)?),
            Typed::Definition(d) => Value::List(collect(d.as_mut(), env)?),
            Typed::List(g) => Value::List(g.value(env)?),
            Typed::NumList(g) => Value::NumList(g.value(env)?),
            Typed::TimeList(g) => Value::TimeList(g.value(env)?),
        })
    }
}

impl std::fmt::Debug for Typed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Typed({})", self.kind())
    }
}

// ── Parser ───────────────────────────────────────────────────────────────────

pub struct Parser {
    pub ctx: Context,
    pub env: Env,
    fold_constants: bool,
}

impl Parser {
    pub fn new(ctx: Context, env: Env) -> Self {
        Parser { ctx, env, fold_constants: true }
    }

    /// Keep constant subtrees unevaluated.  Only useful to compare folded
    /// and unfolded trees.
    pub fn without_folding(mut self) -> Self {
        self.fold_constants = false;
        self
    }

    /// Parse a standalone expression of any kind.
    pub fn expression(&mut self, src: &str) -> Result<Typed> {
        let tokens = tokenize(src)?;
        let t = Tokens::new(&tokens);
        if t.is_empty() {
            return Err(Error::syntax("expression is empty", 1));
        }
        match self.parse_typed(t)? {
            Some(typed) => Ok(typed),
            None => Err(unresolved(t)),
        }
    }

    /// Try every kind in priority order.
    pub fn parse_typed(&mut self, t: Tokens<'_>) -> Result<Option<Typed>> {
        let t = unwrap_brackets(t);
        let typed = if let Some(g) = self.attempt(|p| p.parse_bool(t))? {
            Typed::Bool(g)
        } else if let Some(g) = self.attempt(|p| p.parse_number(t))? {
            Typed::Number(g)
        } else if let Some(g) = self.attempt(|p| p.parse_time(t))? {
            Typed::Time(g)
        } else if let Some(g) = self.attempt(|p| p.parse_period(t))? {
            Typed::Period(g)
        } else if let Some(g) = self.attempt(|p| p.parse_strict_string(t))? {
            Typed::Str(g)
        } else if let Some(d) = self.attempt(|p| p.parse_definition(t))? {
            Typed::Definition(d)
        } else if let Some(g) = self.attempt(|p| p.parse_numlist(t))? {
            Typed::NumList(g)
        } else if let Some(g) = self.attempt(|p| p.parse_timelist(t))? {
            Typed::TimeList(g)
        } else if let Some(g) = self.attempt(|p| p.parse_list(t))? {
            Typed::List(g)
        } else if let Some(g) = self.attempt(|p| p.parse_string(t))? {
            Typed::Str(g)
        } else {
            if t.is_possible_function() {
                return Err(self.function_failure(t));
            }
            return Ok(None);
        };
        debug!(kind = %typed.kind(), line = t.line(), "expression resolved");
        Ok(Some(typed))
    }

    /// Parse `t` as exactly `kind`, with the casts that kind allows.
    pub fn parse_as(&mut self, t: Tokens<'_>, kind: Kind) -> Result<Option<Typed>> {
        Ok(match kind {
            Kind::Bool => self.attempt(|p| p.parse_bool(t))?.map(Typed::Bool),
            Kind::Number => self.attempt(|p| p.parse_number(t))?.map(Typed::Number),
            Kind::Time => self.attempt(|p| p.parse_time(t))?.map(Typed::Time),
            Kind::Period => self.attempt(|p| p.parse_period(t))?.map(Typed::Period),
            Kind::String => self.attempt(|p| p.parse_string(t))?.map(Typed::Str),
            Kind::Definition => self.attempt(|p| p.parse_definition(t))?.map(Typed::Definition),
            Kind::List => self.attempt(|p| p.parse_list(t))?.map(Typed::List),
            Kind::NumList => self.attempt(|p| p.parse_numlist(t))?.map(Typed::NumList),
            Kind::TimeList => self.attempt(|p| p.parse_timelist(t))?.map(Typed::TimeList),
        })
    }

    /// Run one parse attempt.  When it yields nothing, attribute bits it set
    /// are cleared again.
    pub(crate) fn attempt<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<Option<R>>,
    ) -> Result<Option<R>> {
        let masks = self.ctx.masks();
        let result = f(self)?;
        if result.is_none() {
            self.ctx.restore_masks(&masks);
        }
        Ok(result)
    }

    /// Collapse a constant tree.  Evaluation errors surface here, at parse
    /// time, with the line of the expression.
    pub(crate) fn fold<T: Clone + 'static>(&self, gen: GenPtr<T>, line: usize) -> Result<GenPtr<T>> {
        if !self.fold_constants {
            return Ok(gen);
        }
        generator::fold(gen, &self.env).map_err(|e| e.at_line(line))
    }

    pub(crate) fn with_file<R>(
        &mut self,
        file: Rc<FileContext>,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        self.ctx.push_file(file);
        let result = f(self);
        self.ctx.pop_file();
        result
    }

    pub(crate) fn with_location<R>(
        &mut self,
        location: Var<String>,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        self.ctx.push_location(location);
        let result = f(self);
        self.ctx.pop_location();
        result
    }

    /// A path argument joined with the current location at run time.
    pub(crate) fn located(&self, path: GenPtr<String>) -> GenPtr<String> {
        let location: GenPtr<String> = Box::new(VarRef(self.ctx.location()));
        func2(location, path, |l: String, p: String| Ok(os::join(&l, &p)))
    }

    /// `cond ? left : right` for any kind, given a parser for the branches.
    pub(crate) fn parse_ternary<T: 'static>(
        &mut self,
        t: Tokens<'_>,
        branch: fn(&mut Self, Tokens<'_>) -> Result<Option<GenPtr<T>>>,
    ) -> Result<Option<GenPtr<T>>> {
        let Some((cond, left, right)) = t.divide_for_ternary() else {
            return Ok(None);
        };
        if cond.is_empty() || left.is_empty() || right.is_empty() {
            return Ok(None);
        }
        let Some(c) = self.attempt(|p| p.parse_bool(cond))? else {
            return Ok(None);
        };
        let Some(l) = self.attempt(|p| branch(p, left))? else {
            return Ok(None);
        };
        let Some(r) = self.attempt(|p| branch(p, right))? else {
            return Ok(None);
        };
        Ok(Some(ternary(c, l, r)))
    }

    /// `cond ? value`: the value, or the empty value of its kind.
    pub(crate) fn parse_binary<T: Clone + Default + 'static>(
        &mut self,
        t: Tokens<'_>,
        branch: fn(&mut Self, Tokens<'_>) -> Result<Option<GenPtr<T>>>,
    ) -> Result<Option<GenPtr<T>>> {
        if t.divide_for_ternary().is_some() {
            return Ok(None);
        }
        let Some((cond, value)) = t.divide_by_symbol('?') else {
            return Ok(None);
        };
        if cond.is_empty() || value.is_empty() {
            return Ok(None);
        }
        let Some(c) = self.attempt(|p| p.parse_bool(cond))? else {
            return Ok(None);
        };
        let Some(v) = self.attempt(|p| branch(p, value))? else {
            return Ok(None);
        };
        Ok(Some(ternary(c, v, generator::constant(T::default()))))
    }

    /// A possible function call no kind accepted.
    fn function_failure(&self, t: Tokens<'_>) -> Error {
        let word = t.first();
        let name = word.word().unwrap_or_default();
        if crate::script::function::exists(name) {
            Error::syntax(format!("function '{}' cannot be resolved here", word.origin), word.line)
        } else {
            crate::script::function::unknown_function(&word.origin, word.line)
        }
    }
}

// ── Token helpers ────────────────────────────────────────────────────────────

/// Drop redundant outer brackets: `((a + b))` → `a + b`.
pub(crate) fn unwrap_brackets(mut t: Tokens<'_>) -> Tokens<'_> {
    while t.len() > 2 && t.is_bracketed() {
        t = t.trim_both();
    }
    t
}

/// Operand of an additive chain.
pub(crate) struct Term<'a> {
    pub minus: bool,
    pub tokens: Tokens<'a>,
}

/// Split at top-level binary `+` and `-`.  A sign at the start of the window
/// or right after another operator belongs to its operand.  `None` when
/// there is no binary `+` or `-`, or an operand would be empty.
pub(crate) fn split_additive(t: Tokens<'_>) -> Option<Vec<Term<'_>>> {
    let mut bi = crate::token::BracketsInfo::default();
    let mut terms = Vec::new();
    let mut from = 0;
    let mut minus = false;
    let mut prev_operator = true;
    for (i, tok) in t.iter().enumerate() {
        if bi.is_bracket_free() {
            if let Some(c @ ('+' | '-')) = tok.symbol() {
                if !prev_operator {
                    terms.push(Term { minus, tokens: t.slice(from, i) });
                    minus = c == '-';
                    from = i + 1;
                    prev_operator = true;
                    continue;
                }
            }
        }
        bi.refresh(tok);
        prev_operator = matches!(tok.symbol(), Some('+' | '-' | '*' | '/' | '%'));
    }
    if terms.is_empty() || from >= t.len() {
        return None;
    }
    terms.push(Term { minus, tokens: t.slice(from, t.len()) });
    Some(terms)
}

/// Whether the window contains a top-level `in` or `like` whose right side
/// is not bracketed.  Inside a function argument the comma after it is
/// ambiguous.
pub(crate) fn check_comma_ambiguity(name: &str, line: usize, arg: Tokens<'_>) -> Result<()> {
    let Some(i) = arg.rfind_top(|t| t.is_keyword(Keyword::In) || t.is_keyword(Keyword::Like)) else {
        return Ok(());
    };
    let right = arg.slice(i + 1, arg.len());
    if !right.is_empty() && right.first().is_symbol('(') {
        return Ok(());
    }
    Err(crate::script::function::in_comma_ambiguity(&arg.at(i).origin, name, line))
}

pub(crate) fn unresolved(t: Tokens<'_>) -> Error {
    if t.len() == 1 {
        if let Some(w) = t.first().word() {
            return Error::syntax(format!("variable '{w}' does not exist"), t.line());
        }
    }
    Error::syntax(format!("expression '{}' cannot be resolved to any data type", t.origin()), t.line())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
