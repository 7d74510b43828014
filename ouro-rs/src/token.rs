//! Tokens and bracket-aware token slices.
//!
//! The parser never re-tokenizes.  It works on [`Tokens`], a borrowed window
//! into the lexer output, and every search for a top-level operator, comma or
//! keyword goes through [`BracketsInfo`] so that anything nested inside `( )`
//! or `[ ]` is ignored.

use std::fmt;

use crate::error::{Error, Result};
use crate::script::number::Number;

// ── Keywords ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // logic
    True,
    False,
    And,
    Or,
    Xor,
    Not,
    // expression elements
    In,
    Like,
    // command structures
    If,
    Else,
    Inside,
    Times,
    While,
    // filters
    Every,
    Final,
    Limit,
    Order,
    Skip,
    Where,
    // rest
    As,
    By,
    To,
    With,
    Asc,
    Desc,
    // one-word commands
    Print,
    Break,
    Continue,
    Exit,
    Error,
}

impl Keyword {
    const ALL: [Keyword; 30] = [
        Keyword::True,
        Keyword::False,
        Keyword::And,
        Keyword::Or,
        Keyword::Xor,
        Keyword::Not,
        Keyword::In,
        Keyword::Like,
        Keyword::If,
        Keyword::Else,
        Keyword::Inside,
        Keyword::Times,
        Keyword::While,
        Keyword::Every,
        Keyword::Final,
        Keyword::Limit,
        Keyword::Order,
        Keyword::Skip,
        Keyword::Where,
        Keyword::As,
        Keyword::By,
        Keyword::To,
        Keyword::With,
        Keyword::Asc,
        Keyword::Desc,
        Keyword::Print,
        Keyword::Break,
        Keyword::Continue,
        Keyword::Exit,
        Keyword::Error,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Xor => "xor",
            Keyword::Not => "not",
            Keyword::In => "in",
            Keyword::Like => "like",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::Inside => "inside",
            Keyword::Times => "times",
            Keyword::While => "while",
            Keyword::Every => "every",
            Keyword::Final => "final",
            Keyword::Limit => "limit",
            Keyword::Order => "order",
            Keyword::Skip => "skip",
            Keyword::Where => "where",
            Keyword::As => "as",
            Keyword::By => "by",
            Keyword::To => "to",
            Keyword::With => "with",
            Keyword::Asc => "asc",
            Keyword::Desc => "desc",
            Keyword::Print => "print",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Exit => "exit",
            Keyword::Error => "error",
        }
    }

    /// Lookup by lowercase word.
    pub fn from_word(word: &str) -> Option<Keyword> {
        Keyword::ALL.iter().copied().find(|k| k.name() == word)
    }

    pub fn is_filter(self) -> bool {
        matches!(
            self,
            Keyword::Every
                | Keyword::Final
                | Keyword::Limit
                | Keyword::Order
                | Keyword::Skip
                | Keyword::Where
        )
    }

    pub fn is_logic(self) -> bool {
        matches!(self, Keyword::And | Keyword::Or | Keyword::Xor | Keyword::Not)
    }

    /// Keywords that may follow `not`: `not in`, `not like`.
    pub fn is_negatable(self) -> bool {
        matches!(self, Keyword::In | Keyword::Like)
    }

    /// Keywords that can never appear inside an expression.
    pub fn is_expression_forbidden(self) -> bool {
        matches!(
            self,
            Keyword::If
                | Keyword::Else
                | Keyword::Inside
                | Keyword::Times
                | Keyword::While
                | Keyword::Print
                | Keyword::Break
                | Keyword::Continue
                | Keyword::Exit
                | Keyword::Error
                | Keyword::As
                | Keyword::To
                | Keyword::With
        )
    }
}

// ── Token ─────────────────────────────────────────────────────────────────────

/// How a number literal was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberMode {
    Normal,
    /// `12mb`, 1024-based.
    Size,
    /// `april` = 4.
    Month,
    /// `monday` = 1.
    WeekDay,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Symbol(char),
    Number(Number, NumberMode),
    /// Lowercased identifier.
    Word(String),
    Keyword(Keyword),
    Quotation(String),
    /// A quotation containing `*`.
    Pattern(String),
    /// `var.member`, both lowercased.
    TwoWords(String, String),
    /// `hh:mm` or `hh:mm:ss`.
    Clock(i64, i64, Option<i64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based source line.
    pub line: usize,
    /// The token as written in the source.
    pub origin: String,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.origin)
    }
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, origin: impl Into<String>) -> Self {
        Token { kind, line, origin: origin.into() }
    }

    pub fn is_symbol(&self, ch: char) -> bool {
        matches!(self.kind, TokenKind::Symbol(c) if c == ch)
    }

    pub fn symbol(&self) -> Option<char> {
        match self.kind {
            TokenKind::Symbol(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        matches!(self.kind, TokenKind::Keyword(k) if k == kw)
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(k) => Some(k),
            _ => None,
        }
    }

    pub fn is_filter_keyword(&self) -> bool {
        self.keyword().is_some_and(Keyword::is_filter)
    }

    pub fn word(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Word(w) => Some(w),
            _ => None,
        }
    }

    pub fn is_word(&self, w: &str) -> bool {
        self.word() == Some(w)
    }

    pub fn is_month(&self) -> bool {
        matches!(self.kind, TokenKind::Number(_, NumberMode::Month))
    }

    pub fn is_weekday(&self) -> bool {
        matches!(self.kind, TokenKind::Number(_, NumberMode::WeekDay))
    }

    /// A plain integer literal `1`.
    pub fn is_one(&self) -> bool {
        matches!(self.kind, TokenKind::Number(Number::Int(1), NumberMode::Normal))
    }
}

// ── Bracket tracking ──────────────────────────────────────────────────────────

/// Nesting levels of round and square brackets seen so far.
#[derive(Debug, Default, Clone, Copy)]
pub struct BracketsInfo {
    round: i32,
    square: i32,
}

impl BracketsInfo {
    pub fn refresh(&mut self, t: &Token) {
        match t.symbol() {
            Some('(') => self.round += 1,
            Some(')') => self.round -= 1,
            Some('[') => self.square += 1,
            Some(']') => self.square -= 1,
            _ => {}
        }
    }

    pub fn is_bracket_free(&self) -> bool {
        self.round == 0 && self.square == 0
    }
}

// ── Token slices ──────────────────────────────────────────────────────────────

/// A window into the token list.
#[derive(Debug, Clone, Copy)]
pub struct Tokens<'a> {
    list: &'a [Token],
    /// Line reported for errors on an empty window.
    line: usize,
}

impl<'a> Tokens<'a> {
    pub fn new(list: &'a [Token]) -> Self {
        let line = list.first().map(|t| t.line).unwrap_or(1);
        Tokens { list, line }
    }

    fn sub(&self, start: usize, end: usize) -> Tokens<'a> {
        let list = &self.list[start..end];
        let line = list.first().map(|t| t.line).unwrap_or_else(|| {
            self.list.get(start.saturating_sub(1)).map(|t| t.line).unwrap_or(self.line)
        });
        Tokens { list, line }
    }

    /// The window `[start, end)` relative to this one.
    pub fn slice(&self, start: usize, end: usize) -> Tokens<'a> {
        self.sub(start, end)
    }

    pub fn as_slice(&self) -> &'a [Token] {
        self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Line of the first token.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn first(&self) -> &'a Token {
        &self.list[0]
    }

    pub fn second(&self) -> &'a Token {
        &self.list[1]
    }

    pub fn penultimate(&self) -> &'a Token {
        &self.list[self.list.len() - 2]
    }

    pub fn last(&self) -> &'a Token {
        &self.list[self.list.len() - 1]
    }

    pub fn at(&self, i: usize) -> &'a Token {
        &self.list[i]
    }

    pub fn iter(&self) -> std::slice::Iter<'a, Token> {
        self.list.iter()
    }

    pub fn trim_left(&self) -> Tokens<'a> {
        if self.is_empty() { *self } else { self.sub(1, self.len()) }
    }

    pub fn trim_right(&self) -> Tokens<'a> {
        if self.is_empty() { *self } else { self.sub(0, self.len() - 1) }
    }

    pub fn trim_both(&self) -> Tokens<'a> {
        if self.len() < 2 { *self } else { self.sub(1, self.len() - 1) }
    }

    /// `name(args)` → `args`.
    pub fn trim_function(&self) -> Tokens<'a> {
        if self.len() < 3 { *self } else { self.sub(2, self.len() - 1) }
    }

    /// Source text of the window, tokens joined by single spaces.
    pub fn origin(&self) -> String {
        self.list.iter().map(|t| t.origin.as_str()).collect::<Vec<_>>().join(" ")
    }

    // ── Top-level searches ────────────────────────────────────────────────────

    /// Index of the first top-level token satisfying `pred`.
    pub fn find_top(&self, pred: impl Fn(&Token) -> bool) -> Option<usize> {
        let mut bi = BracketsInfo::default();
        for (i, t) in self.list.iter().enumerate() {
            if bi.is_bracket_free() && pred(t) {
                return Some(i);
            }
            bi.refresh(t);
        }
        None
    }

    /// Index of the last top-level token satisfying `pred`.
    pub fn rfind_top(&self, pred: impl Fn(&Token) -> bool) -> Option<usize> {
        let mut bi = BracketsInfo::default();
        let mut found = None;
        for (i, t) in self.list.iter().enumerate() {
            if bi.is_bracket_free() && pred(t) {
                found = Some(i);
            }
            bi.refresh(t);
        }
        found
    }

    pub fn contains_symbol(&self, ch: char) -> bool {
        self.find_top(|t| t.is_symbol(ch)).is_some()
    }

    pub fn contains_comparison_symbol(&self) -> bool {
        self.find_top(|t| matches!(t.symbol(), Some('<' | '>' | '!' | '='))).is_some()
    }

    pub fn contains_keyword(&self, kw: Keyword) -> bool {
        self.find_top(|t| t.is_keyword(kw)).is_some()
    }

    pub fn contains_filter_keyword(&self) -> bool {
        self.find_top(Token::is_filter_keyword).is_some()
    }

    pub fn count_symbols(&self, ch: char) -> usize {
        let mut bi = BracketsInfo::default();
        let mut n = 0;
        for t in self.list {
            if bi.is_bracket_free() && t.is_symbol(ch) {
                n += 1;
            }
            bi.refresh(t);
        }
        n
    }

    /// `(a) (b)` has independent brackets; `((a) (b))` does not.
    pub fn has_independent_brackets(&self) -> bool {
        let mut lvl = 0;
        let end = self.len().saturating_sub(1);
        for (i, t) in self.list.iter().enumerate() {
            match t.symbol() {
                Some('(') => lvl += 1,
                Some(')') => {
                    lvl -= 1;
                    if lvl == 0 && i != end {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    /// `[a] [b]` has independent square brackets; `[[a] [b]]` does not.
    pub fn has_independent_square_brackets(&self) -> bool {
        let mut closed_once = false;
        let mut lvl = 0;
        for t in self.list {
            match t.symbol() {
                Some('[') => {
                    lvl += 1;
                    if closed_once && lvl == 1 {
                        return true;
                    }
                }
                Some(']') => {
                    lvl -= 1;
                    if lvl == 0 {
                        closed_once = true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    /// Whole window wrapped in one pair of round brackets.
    pub fn is_bracketed(&self) -> bool {
        self.len() >= 2
            && self.first().is_symbol('(')
            && self.last().is_symbol(')')
            && !self.has_independent_brackets()
    }

    /// `name(...)` with a single bracket group.
    pub fn is_possible_function(&self) -> bool {
        self.len() >= 3
            && self.first().word().is_some()
            && self.second().is_symbol('(')
            && self.last().is_symbol(')')
            && !self.has_independent_brackets()
    }

    /// `name[...]` with a single square bracket group.
    pub fn is_possible_list_element(&self) -> bool {
        self.len() >= 4
            && self.first().word().is_some()
            && self.second().is_symbol('[')
            && self.last().is_symbol(']')
            && !self.has_independent_square_brackets()
    }

    // ── Splitting ─────────────────────────────────────────────────────────────

    /// Split around the first top-level occurrence of `ch`.
    pub fn divide_by_symbol(&self, ch: char) -> Option<(Tokens<'a>, Tokens<'a>)> {
        let i = self.find_top(|t| t.is_symbol(ch))?;
        Some((self.sub(0, i), self.sub(i + 1, self.len())))
    }

    /// Split around the first top-level occurrence of `kw`.
    pub fn divide_by_keyword(&self, kw: Keyword) -> Option<(Tokens<'a>, Tokens<'a>)> {
        let i = self.find_top(|t| t.is_keyword(kw))?;
        Some((self.sub(0, i), self.sub(i + 1, self.len())))
    }

    /// Split on every top-level `ch`.  Empty parts are errors.
    pub fn split_by_symbol(&self, ch: char) -> Result<Vec<Tokens<'a>>> {
        Ok(self
            .split_ranges_by_symbol(ch)?
            .into_iter()
            .map(|(start, end)| self.sub(start, end))
            .collect())
    }

    /// Like [`split_by_symbol`](Self::split_by_symbol), as `[start, end)`
    /// ranges relative to this window.
    pub fn split_ranges_by_symbol(&self, ch: char) -> Result<Vec<(usize, usize)>> {
        let mut result = Vec::new();
        let mut bi = BracketsInfo::default();
        let mut from = 0;
        for (i, t) in self.list.iter().enumerate() {
            if bi.is_bracket_free() && t.is_symbol(ch) {
                if i == from {
                    let msg = if result.is_empty() {
                        format!("expression cannot start with a {ch} symbol")
                    } else {
                        format!("adjacent {ch} symbols")
                    };
                    return Err(Error::syntax(msg, t.line));
                }
                result.push((from, i));
                from = i + 1;
            } else {
                bi.refresh(t);
            }
        }
        if from == self.len() {
            if !self.is_empty() {
                return Err(Error::syntax(
                    format!("expression cannot end with a {ch} symbol"),
                    self.last().line,
                ));
            }
        } else {
            result.push((from, self.len()));
        }
        Ok(result)
    }

    /// Split into the source part and filter parts.  Each filter part starts
    /// with its keyword.
    pub fn split_by_filter_keywords(&self) -> Result<Vec<Tokens<'a>>> {
        let mut result = Vec::new();
        let mut bi = BracketsInfo::default();
        let mut from = 0;
        for (i, t) in self.list.iter().enumerate() {
            if bi.is_bracket_free() && t.is_filter_keyword() && i > 0 {
                if i == from + 1 && from > 0 {
                    let prev = &self.list[i - 1];
                    return Err(Error::syntax(
                        format!("adjacent filter keywords '{}' and '{}'", prev.origin, t.origin),
                        t.line,
                    ));
                }
                result.push(self.sub(from, i));
                from = i;
            } else {
                bi.refresh(t);
            }
        }
        if !self.is_empty() && from == self.len() - 1 && self.last().is_filter_keyword() {
            return Err(Error::syntax(
                format!("expression cannot end with a filter keyword '{}'", self.last().origin),
                self.last().line,
            ));
        }
        result.push(self.sub(from, self.len()));
        Ok(result)
    }

    /// `cond ? left : right`.  The `:` is the first top-level colon after the
    /// first top-level `?`.
    pub fn divide_for_ternary(&self) -> Option<(Tokens<'a>, Tokens<'a>, Tokens<'a>)> {
        let q = self.find_top(|t| t.is_symbol('?'))?;
        let rest = self.sub(q + 1, self.len());
        let c = rest.find_top(|t| t.is_symbol(':'))? + q + 1;
        Some((self.sub(0, q), self.sub(q + 1, c), self.sub(c + 1, self.len())))
    }

    /// Arguments of `name(args)`, split on top-level commas.
    pub fn function_args(&self) -> Result<Vec<Tokens<'a>>> {
        let inner = self.trim_function();
        if inner.is_empty() {
            return Ok(Vec::new());
        }
        inner.split_by_symbol(',')
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn top_level_search_ignores_brackets() {
        let toks = tokenize("a + (b + c) * [d]").unwrap();
        let t = Tokens::new(&toks);
        assert_eq!(t.count_symbols('+'), 1);
        let inner = tokenize("(b + c)").unwrap();
        assert!(!Tokens::new(&inner).trim_both().is_empty());
        assert!(!Tokens::new(&inner).contains_symbol('+'));
    }

    #[test]
    fn split_by_comma() {
        let toks = tokenize("1, f(2, 3), 4").unwrap();
        let parts = Tokens::new(&toks).split_by_symbol(',').unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].len(), 6);
    }

    #[test]
    fn split_errors() {
        let toks = tokenize(", 1").unwrap();
        let e = Tokens::new(&toks).split_by_symbol(',').unwrap_err();
        assert_eq!(e.message(), "expression cannot start with a , symbol");
        let toks = tokenize("1 , , 2").unwrap();
        let e = Tokens::new(&toks).split_by_symbol(',').unwrap_err();
        assert_eq!(e.message(), "adjacent , symbols");
        let toks = tokenize("1,").unwrap();
        let e = Tokens::new(&toks).split_by_symbol(',').unwrap_err();
        assert_eq!(e.message(), "expression cannot end with a , symbol");
    }

    #[test]
    fn filter_split() {
        let toks = tokenize("files where size > 0 limit 3").unwrap();
        let parts = Tokens::new(&toks).split_by_filter_keywords().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 1);
        assert!(parts[1].first().is_keyword(Keyword::Where));
        assert!(parts[2].first().is_keyword(Keyword::Limit));
    }

    #[test]
    fn filter_split_errors() {
        let toks = tokenize("files where limit 3").unwrap();
        let e = Tokens::new(&toks).split_by_filter_keywords().unwrap_err();
        assert_eq!(e.message(), "adjacent filter keywords 'where' and 'limit'");
        let toks = tokenize("files limit").unwrap();
        let e = Tokens::new(&toks).split_by_filter_keywords().unwrap_err();
        assert_eq!(e.message(), "expression cannot end with a filter keyword 'limit'");
    }

    #[test]
    fn ternary_division() {
        let toks = tokenize("a ? (b ? 1 : 2) : 3").unwrap();
        let (c, l, r) = Tokens::new(&toks).divide_for_ternary().unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(l.len(), 7);
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn function_shape() {
        let toks = tokenize("lower(name)").unwrap();
        assert!(Tokens::new(&toks).is_possible_function());
        let toks = tokenize("f(a) + g(b)").unwrap();
        assert!(!Tokens::new(&toks).is_possible_function());
        let toks = tokenize("f()").unwrap();
        assert!(Tokens::new(&toks).function_args().unwrap().is_empty());
    }

    #[test]
    fn independent_square_brackets() {
        let toks = tokenize("a[1] + b[2]").unwrap();
        assert!(Tokens::new(&toks).has_independent_square_brackets());
        let toks = tokenize("a[b[2]]").unwrap();
        assert!(!Tokens::new(&toks).has_independent_square_brackets());
        assert!(Tokens::new(&toks).is_possible_list_element());
    }
}
