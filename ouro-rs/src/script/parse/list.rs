//! String, number and time lists.
//!
//! All three list kinds share one grammar: a variable, a function, a comma
//! literal (sublists are flattened into it), a filtered list or a ternary.
//! A string list also accepts any definition, which is materialised on
//! evaluation.  In a time list a lone clock right after a date completes
//! that date: `1 june 2020, 14:00, 2 june 2020` has two elements.

use std::rc::Rc;

use crate::env::Env;
use crate::error::{Error, Result};
use crate::script::context::FileContext;
use crate::script::definition::Materialized;
use crate::script::filter::{Element, ListFilter, ListOp, ListWhere};
use crate::script::generator::{GenPtr, Generator};
use crate::script::number::Number;
use crate::script::order::ListOrder;
use crate::script::parse::{unwrap_brackets, Parser};
use crate::script::time::Time;
use crate::token::{Keyword, TokenKind, Tokens};
use crate::var::{var, Variable};

/// `list[index]`.  An index outside the list yields the empty value.
pub struct ListElement<T> {
    list: GenPtr<Vec<T>>,
    index: GenPtr<Number>,
}

impl<T> ListElement<T> {
    pub fn new(list: GenPtr<Vec<T>>, index: GenPtr<Number>) -> Self {
        ListElement { list, index }
    }
}

impl<T: Clone + Default> Generator<T> for ListElement<T> {
    fn value(&mut self, env: &Env) -> Result<T> {
        let list = self.list.value(env)?;
        let index = self.index.value(env)?.to_int();
        if index < 0 {
            return Ok(T::default());
        }
        Ok(list.into_iter().nth(index as usize).unwrap_or_default())
    }

    fn is_constant(&self) -> bool {
        self.list.is_constant() && self.index.is_constant()
    }
}

enum Part<T> {
    One(GenPtr<T>),
    Many(GenPtr<Vec<T>>),
}

/// `a, b, c` with sublists spliced in.
struct ListLiteral<T> {
    parts: Vec<Part<T>>,
}

impl<T: Clone> Generator<Vec<T>> for ListLiteral<T> {
    fn value(&mut self, env: &Env) -> Result<Vec<T>> {
        let mut out = Vec::with_capacity(self.parts.len());
        for part in &mut self.parts {
            match part {
                Part::One(g) => out.push(g.value(env)?),
                Part::Many(g) => out.extend(g.value(env)?),
            }
        }
        Ok(out)
    }

    fn is_constant(&self) -> bool {
        self.parts.iter().all(|p| match p {
            Part::One(g) => g.is_constant(),
            Part::Many(g) => g.is_constant(),
        })
    }
}

/// Element types of the three list kinds.
trait ListItem: Element + Default {
    const JOINS_CLOCK: bool = false;

    fn pick(v: &Variable) -> Option<GenPtr<Vec<Self>>>;

    /// Fresh `this` cell for filters over this element type.
    fn this_variable() -> Variable;

    fn single(p: &mut Parser, t: Tokens<'_>) -> Result<Option<GenPtr<Self>>>;

    fn list(p: &mut Parser, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<Self>>>>;

    fn function(p: &mut Parser, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<Self>>>>;

    fn definition(_p: &mut Parser, _t: Tokens<'_>) -> Result<Option<GenPtr<Vec<Self>>>> {
        Ok(None)
    }
}

impl ListItem for String {
    fn pick(v: &Variable) -> Option<GenPtr<Vec<String>>> {
        v.as_list()
    }

    fn this_variable() -> Variable {
        Variable::Str(var(String::new()))
    }

    fn single(p: &mut Parser, t: Tokens<'_>) -> Result<Option<GenPtr<String>>> {
        p.parse_string(t)
    }

    fn list(p: &mut Parser, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<String>>>> {
        p.parse_list(t)
    }

    fn function(p: &mut Parser, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<String>>>> {
        p.list_function(t)
    }

    fn definition(p: &mut Parser, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<String>>>> {
        Ok(p.parse_definition(t)?.map(|d| Box::new(Materialized(d)) as GenPtr<Vec<String>>))
    }
}

impl ListItem for Number {
    fn pick(v: &Variable) -> Option<GenPtr<Vec<Number>>> {
        v.as_numlist()
    }

    fn this_variable() -> Variable {
        Variable::Number(var(Number::default()))
    }

    fn single(p: &mut Parser, t: Tokens<'_>) -> Result<Option<GenPtr<Number>>> {
        p.parse_number(t)
    }

    fn list(p: &mut Parser, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<Number>>>> {
        p.parse_numlist(t)
    }

    fn function(p: &mut Parser, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<Number>>>> {
        p.numlist_function(t)
    }
}

impl ListItem for Time {
    const JOINS_CLOCK: bool = true;

    fn pick(v: &Variable) -> Option<GenPtr<Vec<Time>>> {
        v.as_timelist()
    }

    fn this_variable() -> Variable {
        Variable::Time(var(Time::default()))
    }

    fn single(p: &mut Parser, t: Tokens<'_>) -> Result<Option<GenPtr<Time>>> {
        p.parse_time(t)
    }

    fn list(p: &mut Parser, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<Time>>>> {
        p.parse_timelist(t)
    }

    fn function(_p: &mut Parser, _t: Tokens<'_>) -> Result<Option<GenPtr<Vec<Time>>>> {
        Ok(None)
    }
}

/// "tokens after keyword 'x' cannot be resolved to a y".
pub(crate) fn filter_error(keyword: &str, what: &str, line: usize) -> Error {
    Error::syntax(format!("tokens after keyword '{keyword}' cannot be resolved to a {what}"), line)
}

pub(crate) fn list_op(kw: Keyword) -> Option<ListOp> {
    match kw {
        Keyword::Limit => Some(ListOp::Limit),
        Keyword::Skip => Some(ListOp::Skip),
        Keyword::Every => Some(ListOp::Every),
        Keyword::Final => Some(ListOp::Final),
        _ => None,
    }
}

impl Parser {
    pub(crate) fn parse_list(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<String>>>> {
        self.list_of(t)
    }

    pub(crate) fn parse_numlist(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<Number>>>> {
        self.list_of(t)
    }

    pub(crate) fn parse_timelist(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<Time>>>> {
        self.list_of(t)
    }

    fn list_of<T: ListItem>(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<T>>>> {
        let t = unwrap_brackets(t);
        if t.is_empty() {
            return Ok(None);
        }
        match self.list_unfolded::<T>(t)? {
            Some(g) => Ok(Some(self.fold(g, t.line())?)),
            None => Ok(None),
        }
    }

    fn list_unfolded<T: ListItem>(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<T>>>> {
        if t.len() == 1 {
            let tok = t.first();
            if let TokenKind::Word(w) = &tok.kind {
                if let Some(g) = self.ctx.typed(w, tok.line, T::pick)? {
                    return Ok(Some(g));
                }
            }
            return self.attempt(|p| T::definition(p, t));
        }
        if let Some(g) = self.attempt(|p| T::definition(p, t))? {
            return Ok(Some(g));
        }
        if t.contains_symbol('?') {
            if let Some(g) = self.parse_ternary(t, Parser::list_of::<T>)? {
                return Ok(Some(g));
            }
            return self.parse_binary(t, Parser::list_of::<T>);
        }
        if t.contains_filter_keyword() {
            return self.list_filter(t);
        }
        if t.contains_symbol(',') {
            return self.list_literal(t);
        }
        if t.is_possible_function() {
            return T::function(self, t);
        }
        Ok(None)
    }

    fn list_literal<T: ListItem>(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<T>>>> {
        let ranges = t.split_ranges_by_symbol(',')?;
        let mut parts: Vec<Part<T>> = Vec::with_capacity(ranges.len());
        let mut prev_start = 0;
        for (start, end) in ranges {
            let part = t.slice(start, end);
            let lone_clock = part.len() == 1 && matches!(part.first().kind, TokenKind::Clock(..));
            if T::JOINS_CLOCK && lone_clock && !parts.is_empty() {
                let joined = t.slice(prev_start, end);
                let Some(g) = self.attempt(|p| T::single(p, joined))? else {
                    return Ok(None);
                };
                parts.pop();
                parts.push(Part::One(g));
                continue;
            }
            prev_start = start;
            if let Some(g) = self.attempt(|p| T::single(p, part))? {
                parts.push(Part::One(g));
            } else if let Some(g) = self.attempt(|p| T::list(p, part))? {
                parts.push(Part::Many(g));
            } else {
                return Ok(None);
            }
        }
        Ok(Some(Box::new(ListLiteral { parts })))
    }

    /// `list where ...`, `list limit n`, `list order by ...` and so on.
    fn list_filter<T: ListItem>(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<Vec<T>>>> {
        let stages = t.split_by_filter_keywords()?;
        let Some((source, filters)) = stages.split_first() else {
            return Ok(None);
        };
        let Some(mut base) = self.attempt(|p| T::list(p, *source))? else {
            return Ok(None);
        };
        for stage in filters {
            let head = stage.first();
            let rest = stage.trim_left();
            let Some(kw) = head.keyword() else {
                return Ok(None);
            };
            base = match kw {
                Keyword::Where => {
                    let ctx = Rc::new(FileContext::new(Some(T::this_variable()), self.ctx.location()));
                    let cond = self.with_file(ctx.clone(), |p| p.parse_bool(rest))?;
                    let Some(cond) = cond else {
                        return Err(filter_error(&head.origin, "logical condition", head.line));
                    };
                    Box::new(ListWhere::new(base, cond, ctx))
                }
                Keyword::Order => {
                    let ctx = Rc::new(FileContext::new(Some(T::this_variable()), self.ctx.location()));
                    let keys = self.order_keys(head, rest, ctx.clone())?;
                    Box::new(ListOrder::new(base, keys, ctx))
                }
                _ => {
                    let Some(op) = list_op(kw) else {
                        return Ok(None);
                    };
                    let Some(n) = self.parse_number(rest)? else {
                        return Err(filter_error(&head.origin, "number", head.line));
                    };
                    Box::new(ListFilter::new(base, n, op))
                }
            };
        }
        Ok(Some(base))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::generator::constant;
    use crate::script::parse::tests::{error_of, eval, kind_of, parser};
    use crate::script::value::{Kind, Value};

    #[test]
    fn element_out_of_range_is_empty() {
        let env = Env::system();
        let list = || constant(vec![Number::Int(4), Number::Int(5)]);
        let mut e = ListElement::new(list(), constant(Number::Int(1)));
        assert_eq!(e.value(&env).unwrap(), Number::Int(5));
        let mut e = ListElement::new(list(), constant(Number::Int(2)));
        assert_eq!(e.value(&env).unwrap(), Number::Int(0));
        let mut e = ListElement::new(list(), constant(Number::Int(-1)));
        assert_eq!(e.value(&env).unwrap(), Number::Int(0));
    }

    #[test]
    fn literals_flatten_sublists() {
        let mut p = parser();
        p.ctx.declare("xs", Variable::from_value(Value::NumList(vec![Number::Int(2), Number::Int(3)])));
        assert_eq!(kind_of(&mut p, "1, xs, 4"), Kind::NumList);
        assert_eq!(eval(&mut p, "1, xs, 4"), "1, 2, 3, 4");
        assert_eq!(eval(&mut p, "xs[0] + xs[1]"), "5");
        assert_eq!(eval(&mut p, "'a', 'b' + 'c'"), "a, bc");
    }

    #[test]
    fn clock_completes_the_previous_date() {
        let mut p = parser();
        assert_eq!(kind_of(&mut p, "1 june 2020, 14:00, 2 june 2020"), Kind::TimeList);
        assert_eq!(eval(&mut p, "1 june 2020, 14:00, 2 june 2020"), "1 June 2020, 14:00, 2 June 2020");
    }

    #[test]
    fn filters_over_number_lists() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "(5, 3, 8, 1) where this > 2"), "5, 3, 8");
        assert_eq!(eval(&mut p, "(5, 3, 8, 1) order by this desc limit 2"), "8, 5");
        assert_eq!(eval(&mut p, "(5, 3, 8, 1) skip 1 every 2"), "3, 1");
        assert_eq!(eval(&mut p, "(5, 3, 8, 1) final 3 where index = 0"), "3");
        assert_eq!(
            error_of(&mut p, "(5, 3) where 'x'"),
            "tokens after keyword 'where' cannot be resolved to a logical condition"
        );
    }

    #[test]
    fn string_list_filters_see_file_attributes() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "('b.txt', 'a.md', 'c.txt') where extension = 'txt' order asc"), "b.txt, c.txt");
    }
}
