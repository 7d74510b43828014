//! String expressions.
//!
//! The strict form only accepts what is a string by itself: a quotation, a
//! string variable, a string function, an element of a string or string
//! list, or a `+` concatenation with at least one strict part.  The loose
//! form, used wherever the expected kind is already known to be a string,
//! also converts numbers, times, periods and conditions.

use tracing::trace;

use crate::error::Result;
use crate::script::function::concatenate;
use crate::script::generator::{cast, constant, func2, func_n, GenPtr};
use crate::script::number::Number;
use crate::script::parse::{unwrap_brackets, Parser};
use crate::script::period::Period;
use crate::script::time::Time;
use crate::token::{TokenKind, Tokens};
use crate::var::Variable;

fn char_at(s: String, index: Number) -> Result<String> {
    let i = index.to_int();
    if i < 0 {
        return Ok(String::new());
    }
    Ok(s.chars().nth(i as usize).map(String::from).unwrap_or_default())
}

impl Parser {
    pub(crate) fn parse_strict_string(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<String>>> {
        self.string_of(t, true)
    }

    pub(crate) fn parse_string(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<String>>> {
        self.string_of(t, false)
    }

    fn string_of(&mut self, t: Tokens<'_>, strict: bool) -> Result<Option<GenPtr<String>>> {
        let t = unwrap_brackets(t);
        if t.is_empty() {
            return Ok(None);
        }
        match self.string_unfolded(t, strict)? {
            Some(g) => Ok(Some(self.fold(g, t.line())?)),
            None => Ok(None),
        }
    }

    fn string_unfolded(&mut self, t: Tokens<'_>, strict: bool) -> Result<Option<GenPtr<String>>> {
        if t.len() == 1 {
            let tok = t.first();
            match &tok.kind {
                TokenKind::Quotation(s) => return Ok(Some(constant(s.clone()))),
                TokenKind::Pattern(s) if !strict => return Ok(Some(constant(s.clone()))),
                TokenKind::Word(w) => {
                    if let Some(g) = self.ctx.typed(w, tok.line, Variable::as_string)? {
                        return Ok(Some(g));
                    }
                }
                _ => {}
            }
            return if strict { Ok(None) } else { self.string_cast(t) };
        }
        if t.contains_symbol('?') {
            let branch = if strict { Parser::parse_strict_string } else { Parser::parse_string };
            if let Some(g) = self.parse_ternary(t, branch)? {
                return Ok(Some(g));
            }
            if let Some(g) = self.parse_binary(t, branch)? {
                return Ok(Some(g));
            }
            return if strict { Ok(None) } else { self.string_cast(t) };
        }
        if t.contains_filter_keyword() || t.contains_symbol(',') {
            return Ok(None);
        }
        if t.is_possible_function() {
            if let Some(g) = self.string_function(t)? {
                return Ok(Some(g));
            }
        } else if t.is_possible_list_element() {
            if let Some(g) = self.string_element(t)? {
                return Ok(Some(g));
            }
        } else if t.contains_symbol('+') {
            if let Some(g) = self.concatenation(t)? {
                return Ok(Some(g));
            }
        }
        if strict {
            Ok(None)
        } else {
            self.string_cast(t)
        }
    }

    /// `name[index]` over a string list, or one character of a string.
    fn string_element(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<String>>> {
        let tok = t.first();
        let Some(name) = tok.word() else {
            return Ok(None);
        };
        if let Some(list) = self.ctx.typed(name, tok.line, Variable::as_list)? {
            let index = self.element_index(t)?;
            return Ok(Some(Box::new(super::ListElement::new(list, index))));
        }
        if let Some(s) = self.ctx.typed(name, tok.line, Variable::as_string)? {
            let index = self.element_index(t)?;
            return Ok(Some(func2(s, index, char_at)));
        }
        Ok(None)
    }

    /// `a + b + c` where at least one operand is a string.  Neighbouring
    /// operands that are not strings are grouped and converted together, so
    /// `'x' + 1 + 2` gives `x3`.
    fn concatenation(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<String>>> {
        let ranges = t.split_ranges_by_symbol('+')?;
        let mut parts: Vec<GenPtr<String>> = Vec::with_capacity(ranges.len());
        let mut any_strict = false;
        let mut run: Option<(usize, usize)> = None;
        for (start, end) in ranges {
            let part = t.slice(start, end);
            match self.attempt(|p| p.parse_strict_string(part))? {
                Some(g) => {
                    if let Some((a, b)) = run.take() {
                        match self.string_run(t.slice(a, b))? {
                            Some(r) => parts.push(r),
                            None => return Ok(None),
                        }
                    }
                    any_strict = true;
                    parts.push(g);
                }
                None => {
                    run = Some(match run {
                        Some((a, _)) => (a, end),
                        None => (start, end),
                    });
                }
            }
        }
        if !any_strict {
            return Ok(None);
        }
        if let Some((a, b)) = run {
            match self.string_run(t.slice(a, b))? {
                Some(r) => parts.push(r),
                None => return Ok(None),
            }
        }
        trace!(parts = parts.len(), "string concatenation");
        Ok(Some(func_n(parts, concatenate)))
    }

    /// A run of non-string operands inside a concatenation.
    fn string_run(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<String>>> {
        if let Some(g) = self.string_cast(t)? {
            return Ok(Some(g));
        }
        let mut parts: Vec<GenPtr<String>> = Vec::new();
        for part in t.split_by_symbol('+')? {
            match self.attempt(|p| p.parse_string(part))? {
                Some(g) => parts.push(g),
                None => return Ok(None),
            }
        }
        Ok(Some(func_n(parts, concatenate)))
    }

    /// A value of another kind, formatted.
    fn string_cast(&mut self, t: Tokens<'_>) -> Result<Option<GenPtr<String>>> {
        if let Some(g) = self.attempt(|p| p.parse_number(t))? {
            return Ok(Some(cast(g, |n: Number| Ok(n.to_string()))));
        }
        if let Some(g) = self.attempt(|p| p.parse_time(t))? {
            return Ok(Some(cast(g, |v: Time| Ok(v.to_string()))));
        }
        if let Some(g) = self.attempt(|p| p.parse_period(t))? {
            return Ok(Some(cast(g, |v: Period| Ok(v.to_string()))));
        }
        if let Some(g) = self.attempt(|p| p.parse_bool(t))? {
            return Ok(Some(cast(g, |b: bool| Ok(if b { "1" } else { "0" }.to_string()))));
        }
        Ok(None)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use crate::lexer::tokenize;
    use crate::script::parse::tests::{eval, kind_of, parser};
    use crate::script::value::{Kind, Value};
    use crate::token::Tokens;
    use crate::var::Variable;

    #[test]
    fn concatenation_groups_other_kinds() {
        let mut p = parser();
        assert_eq!(eval(&mut p, "'x' + 1 + 2"), "x3");
        assert_eq!(eval(&mut p, "1 + 2 + 'x'"), "3x");
        assert_eq!(eval(&mut p, "'a' + 2 * 3 + 'b'"), "a6b");
        assert_eq!(eval(&mut p, "'on ' + 1 june 2020"), "on 1 June 2020");
        assert_eq!(eval(&mut p, "'in ' + 3 days"), "in 3 days");
    }

    #[test]
    fn element_of_string_and_list() {
        let mut p = parser();
        p.ctx.declare("s", Variable::from_value(Value::Str("hello".into())));
        p.ctx.declare("l", Variable::from_value(Value::List(vec!["x".into(), "y".into()])));
        assert_eq!(eval(&mut p, "s[1]"), "e");
        assert_eq!(eval(&mut p, "s[10]"), "");
        assert_eq!(eval(&mut p, "l[1] + s[0]"), "yh");
    }

    #[test]
    fn strict_rejects_other_kinds() {
        let mut p = parser();
        let toks = tokenize("1 + 2").unwrap();
        assert!(p.parse_strict_string(Tokens::new(&toks)).unwrap().is_none());
        assert!(p.parse_string(Tokens::new(&toks)).unwrap().is_some());
        let toks = tokenize("'*.txt'").unwrap();
        assert!(p.parse_strict_string(Tokens::new(&toks)).unwrap().is_none());
        assert!(p.parse_string(Tokens::new(&toks)).unwrap().is_some());
    }

    #[test]
    fn ternary_of_strings() {
        let mut p = parser();
        assert_eq!(kind_of(&mut p, "2 > 1 ? 'a' : 'b' + 'c'"), Kind::String);
        assert_eq!(eval(&mut p, "2 > 1 ? 'a'"), "a");
        assert_eq!(eval(&mut p, "2 < 1 ? 'a'"), "");
    }
}
