//! Definitions: file sources, asterisk patterns, chains and filters.
//!
//! A `where` or `order by` right after a source that already loads a file
//! context reuses it, so `files where size > 0` fetches metadata once per
//! element.  Anywhere else the filter gets a context of its own.

use std::rc::Rc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::script::context::FileContext;
use crate::script::definition::{
    AsteriskDefinition, Chain, ChainPart, DefPtr, DefinitionTernary, ListDefinition, OsDefinition, OsKind,
};
use crate::script::filter::{Every, Final, Limit, ListOp, Skip, Where};
use crate::script::generator::{constant, VarRef};
use crate::script::order::{DefinitionOrder, OrderBy, OrderKey};
use crate::script::parse::list::{filter_error, list_op};
use crate::script::parse::{unwrap_brackets, Parser};
use crate::token::{Keyword, Token, TokenKind, Tokens};
use crate::var::Variable;

/// Sort by the element itself.
fn this_key(ctx: &FileContext, descending: bool) -> Option<OrderBy> {
    let key = match ctx.this.as_ref()? {
        Variable::Str(c) => OrderKey::Str(Box::new(VarRef(c.clone()))),
        Variable::Number(c) => OrderKey::Number(Box::new(VarRef(c.clone()))),
        Variable::Time(c) => OrderKey::Time(Box::new(VarRef(c.clone()))),
        _ => return None,
    };
    Some(OrderBy { key, descending })
}

fn direction(tok: &Token) -> Option<bool> {
    match tok.keyword()? {
        Keyword::Asc => Some(false),
        Keyword::Desc => Some(true),
        _ => None,
    }
}

impl Parser {
    pub(crate) fn parse_definition(&mut self, t: Tokens<'_>) -> Result<Option<DefPtr>> {
        let t = unwrap_brackets(t);
        if t.is_empty() {
            return Ok(None);
        }
        let def = self.definition_unfolded(t)?;
        if def.is_some() {
            debug!(line = t.line(), "definition resolved");
        }
        Ok(def)
    }

    fn definition_unfolded(&mut self, t: Tokens<'_>) -> Result<Option<DefPtr>> {
        if t.len() == 1 {
            return Ok(self.definition_source(t.first()));
        }
        if t.contains_symbol('?') {
            return self.definition_ternary(t);
        }
        if t.contains_filter_keyword() {
            return self.definition_filter(t);
        }
        if t.contains_symbol(',') {
            return self.definition_chain(t);
        }
        Ok(None)
    }

    fn definition_source(&mut self, tok: &Token) -> Option<DefPtr> {
        match &tok.kind {
            TokenKind::Word(w) if !self.ctx.has_variable(w) => {
                let (kind, recursive) = OsKind::from_word(w)?;
                let ctx = FileContext::for_paths(self.ctx.location());
                Some(Box::new(OsDefinition::new(kind, recursive, ctx)))
            }
            TokenKind::Pattern(p) => {
                let ctx = FileContext::for_paths(self.ctx.location());
                Some(Box::new(AsteriskDefinition::new(p, ctx)))
            }
            _ => None,
        }
    }

    fn definition_ternary(&mut self, t: Tokens<'_>) -> Result<Option<DefPtr>> {
        if let Some((cond, left, right)) = t.divide_for_ternary() {
            let Some(c) = self.attempt(|p| p.parse_bool(cond))? else {
                return Ok(None);
            };
            let Some(l) = self.attempt(|p| p.parse_definition(left))? else {
                return Ok(None);
            };
            let Some(r) = self.attempt(|p| p.parse_definition(right))? else {
                return Ok(None);
            };
            return Ok(Some(Box::new(DefinitionTernary::new(c, l, r))));
        }
        let Some((cond, value)) = t.divide_by_symbol('?') else {
            return Ok(None);
        };
        let Some(c) = self.attempt(|p| p.parse_bool(cond))? else {
            return Ok(None);
        };
        let Some(v) = self.attempt(|p| p.parse_definition(value))? else {
            return Ok(None);
        };
        let nothing = Box::new(ListDefinition::new(constant(Vec::new())));
        Ok(Some(Box::new(DefinitionTernary::new(c, v, nothing))))
    }

    /// `a, b, c` where at least one part is a definition.
    fn definition_chain(&mut self, t: Tokens<'_>) -> Result<Option<DefPtr>> {
        let mut parts = Vec::new();
        let mut any_definition = false;
        for part in t.split_by_symbol(',')? {
            if let Some(d) = self.attempt(|p| p.parse_definition(part))? {
                any_definition = true;
                parts.push(ChainPart::Definition(d));
            } else if let Some(l) = self.attempt(|p| p.parse_list(part))? {
                parts.push(ChainPart::List(l));
            } else if let Some(s) = self.attempt(|p| p.parse_string(part))? {
                parts.push(ChainPart::Str(s));
            } else {
                return Ok(None);
            }
        }
        if !any_definition {
            return Ok(None);
        }
        Ok(Some(Box::new(Chain::new(parts))))
    }

    fn definition_filter(&mut self, t: Tokens<'_>) -> Result<Option<DefPtr>> {
        let stages = t.split_by_filter_keywords()?;
        let Some((source, filters)) = stages.split_first() else {
            return Ok(None);
        };
        let Some(mut base) = self.attempt(|p| p.parse_definition(*source))? else {
            return Ok(None);
        };
        for stage in filters {
            let head = stage.first();
            let rest = stage.trim_left();
            let Some(kw) = head.keyword() else {
                return Ok(None);
            };
            let (ctx, own) = match base.file_context() {
                Some(ctx) => (ctx, false),
                None => (FileContext::for_paths(self.ctx.location()), true),
            };
            base = match kw {
                Keyword::Where => {
                    let Some(cond) = self.with_file(ctx.clone(), |p| p.parse_bool(rest))? else {
                        return Err(filter_error(&head.origin, "logical condition", head.line));
                    };
                    Box::new(Where::new(base, cond, ctx, own))
                }
                Keyword::Order => {
                    let keys = self.order_keys(head, rest, ctx.clone())?;
                    Box::new(DefinitionOrder::new(base, keys, ctx, own))
                }
                _ => {
                    let Some(op) = list_op(kw) else {
                        return Ok(None);
                    };
                    let Some(n) = self.parse_number(rest)? else {
                        return Err(filter_error(&head.origin, "number", head.line));
                    };
                    match op {
                        ListOp::Limit => Box::new(Limit::new(base, n)),
                        ListOp::Skip => Box::new(Skip::new(base, n)),
                        ListOp::Every => Box::new(Every::new(base, n)),
                        ListOp::Final => Box::new(Final::new(base, n)),
                    }
                }
            };
        }
        Ok(Some(base))
    }

    /// Keys after `order`: `by k [asc|desc], ...`, or just a direction to
    /// sort by the element itself.
    pub(crate) fn order_keys(&mut self, head: &Token, rest: Tokens<'_>, ctx: Rc<FileContext>) -> Result<Vec<OrderBy>> {
        let plain = match rest.len() {
            0 => Some(false),
            1 => direction(rest.first()),
            _ => None,
        };
        if let Some(descending) = plain {
            return this_key(&ctx, descending)
                .map(|k| vec![k])
                .ok_or_else(|| Error::syntax("elements of this collection cannot be ordered", head.line));
        }
        if !rest.first().is_keyword(Keyword::By) {
            return Err(Error::syntax(
                format!("keyword '{}' should be followed by keyword 'by'", head.origin),
                head.line,
            ));
        }
        let list = rest.trim_left();
        if list.is_empty() {
            return Err(filter_error("order by", "list of order keys", head.line));
        }
        let mut keys = Vec::new();
        for part in list.split_by_symbol(',')? {
            let (expr, descending) = match direction(part.last()) {
                Some(d) => (part.trim_right(), d),
                None => (part, false),
            };
            if expr.is_empty() {
                return Err(Error::syntax("order key is empty", part.line()));
            }
            let key = self.with_file(ctx.clone(), |p| p.order_key(expr))?;
            let Some(key) = key else {
                return Err(Error::syntax(
                    format!("order key '{}' cannot be resolved to any data type", expr.origin()),
                    expr.line(),
                ));
            };
            keys.push(OrderBy { key, descending });
        }
        Ok(keys)
    }

    fn order_key(&mut self, t: Tokens<'_>) -> Result<Option<OrderKey>> {
        if let Some(g) = self.attempt(|p| p.parse_bool(t))? {
            return Ok(Some(OrderKey::Bool(g)));
        }
        if let Some(g) = self.attempt(|p| p.parse_number(t))? {
            return Ok(Some(OrderKey::Number(g)));
        }
        if let Some(g) = self.attempt(|p| p.parse_time(t))? {
            return Ok(Some(OrderKey::Time(g)));
        }
        if let Some(g) = self.attempt(|p| p.parse_period(t))? {
            return Ok(Some(OrderKey::Period(g)));
        }
        Ok(self.attempt(|p| p.parse_string(t))?.map(OrderKey::Str))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::MemFs;
    use crate::script::parse::tests::{error_of, eval, kind_of, parser_with};
    use crate::script::time::Time;
    use crate::script::value::Kind;

    fn tree() -> MemFs {
        let stamp = Time::date(1, 1, 2024);
        let mut fs = MemFs::new();
        fs.add_file("/w/b.txt", 30, stamp);
        fs.add_file("/w/a.txt", 10, stamp);
        fs.add_file("/w/c.md", 20, stamp);
        fs.add_file("/w/sub/d.txt", 5, stamp);
        fs
    }

    #[test]
    fn sources() {
        let mut p = parser_with(tree());
        assert_eq!(eval(&mut p, "files"), "a.txt, b.txt, c.md");
        assert_eq!(eval(&mut p, "directories"), "sub");
        assert_eq!(eval(&mut p, "'*.txt'"), "a.txt, b.txt");
        assert_eq!(kind_of(&mut p, "'**/*.txt'"), Kind::Definition);
    }

    #[test]
    fn filters_reuse_the_source_context() {
        let mut p = parser_with(tree());
        assert_eq!(eval(&mut p, "files where size > 15"), "b.txt, c.md");
        assert_eq!(eval(&mut p, "files order by size desc"), "b.txt, c.md, a.txt");
        assert_eq!(eval(&mut p, "files order by extension, name desc"), "c.md, b.txt, a.txt");
        assert_eq!(eval(&mut p, "files skip 1 limit 1"), "b.txt");
        assert_eq!(eval(&mut p, "files final 2 where index = 0"), "b.txt");
        assert_eq!(eval(&mut p, "files order desc"), "c.md, b.txt, a.txt");
    }

    #[test]
    fn chains_and_ternaries() {
        let mut p = parser_with(tree());
        assert_eq!(kind_of(&mut p, "directories, 'x.txt'"), Kind::Definition);
        assert_eq!(eval(&mut p, "directories, 'x.txt'"), "sub, x.txt");
        assert_eq!(eval(&mut p, "1 > 2 ? files : directories"), "sub");
        assert_eq!(eval(&mut p, "1 > 2 ? files"), "");
    }

    #[test]
    fn filter_diagnostics() {
        let mut p = parser_with(tree());
        assert_eq!(error_of(&mut p, "files limit 'x'"), "tokens after keyword 'limit' cannot be resolved to a number");
        assert_eq!(error_of(&mut p, "files order size"), "keyword 'order' should be followed by keyword 'by'");
        assert_eq!(error_of(&mut p, "files where"), "expression cannot end with a filter keyword 'where'");
    }
}
