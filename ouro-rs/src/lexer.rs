//! Source text → tokens.
//!
//! | Input | Token |
//! |-------|-------|
//! | `12`, `2.5` | [`TokenKind::Number`] (`Normal`) |
//! | `12mb` | `Number` (`Size`, 1024-based) |
//! | `june`, `monday` | `Number` (`Month` / `WeekDay`) |
//! | `14:30`, `9:05:01` | [`TokenKind::Clock`] |
//! | `'text'`, `"text"`, `` `text` `` | [`TokenKind::Quotation`], or [`TokenKind::Pattern`] when it holds `*` |
//! | `creation.year` | [`TokenKind::TwoWords`] |
//! | `where`, `and`, … | [`TokenKind::Keyword`] |
//! | other identifiers | [`TokenKind::Word`], lowercased |
//!
//! `//` starts a line comment, `/* … */` a block comment.

use crate::error::{Error, Result};
use crate::script::number::Number;
use crate::script::time::{MONTHS, WEEKDAYS};
use crate::token::{Keyword, NumberMode, Token, TokenKind};

const SYMBOLS: &str = "+-*/%()[]{},;=<>!?:&|";

const SIZE_SUFFIXES: [(&str, u32); 5] = [("kb", 1), ("mb", 2), ("gb", 3), ("tb", 4), ("pb", 5)];

struct Lexer<'a> {
    src: &'a [char],
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a [char]) -> Self {
        Lexer { src, pos: 0, line: 1 }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if let Some(c) = ch {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
            }
        }
        ch
    }

    fn text(&self, from: usize) -> String {
        self.src[from..self.pos].iter().collect()
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.advance();
                }
                (Some('/'), Some('/')) => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    let line = self.line;
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            None => return Err(Error::syntax("block comment is not closed", line)),
                            Some('*') if self.peek() == Some('/') => {
                                self.advance();
                                break;
                            }
                            _ => {}
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn two_digits_at(&self, offset: usize) -> bool {
        self.peek_at(offset).is_some_and(|c| c.is_ascii_digit())
            && self.peek_at(offset + 1).is_some_and(|c| c.is_ascii_digit())
            && !self.peek_at(offset + 2).is_some_and(|c| c.is_ascii_digit())
    }

    fn read_number(&mut self) -> Result<Token> {
        let line = self.line;
        let start = self.pos;
        self.read_digits();
        let int_len = self.pos - start;

        // hh:mm[:ss]
        if int_len <= 2 && self.peek() == Some(':') && self.two_digits_at(1) {
            let hour: i64 = self.text(start).parse().unwrap_or(0);
            self.advance();
            let m_start = self.pos;
            self.read_digits();
            let minute: i64 = self.text(m_start).parse().unwrap_or(0);
            let mut second = None;
            if self.peek() == Some(':') && self.two_digits_at(1) {
                self.advance();
                let s_start = self.pos;
                self.read_digits();
                second = Some(self.text(s_start).parse().unwrap_or(0));
            }
            return Ok(Token::new(TokenKind::Clock(hour, minute, second), line, self.text(start)));
        }

        let mut is_double = false;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_double = true;
            self.advance();
            self.read_digits();
        }
        let literal = self.text(start);

        // size suffix: 12mb, 1.5gb
        for (suffix, power) in SIZE_SUFFIXES {
            let mut chars = suffix.chars();
            let (a, b) = (chars.next(), chars.next());
            let matches_suffix = self.peek().map(|c| c.to_ascii_lowercase()) == a
                && self.peek_at(1).map(|c| c.to_ascii_lowercase()) == b
                && !self.peek_at(2).is_some_and(|c| c.is_alphanumeric() || c == '_');
            if matches_suffix {
                self.advance();
                self.advance();
                let factor = 1024i64.pow(power);
                let n = if is_double {
                    let x: f64 = literal.parse().unwrap_or(0.0);
                    Number::Int((x * factor as f64) as i64)
                } else {
                    let v: i64 = literal.parse().map_err(|_| too_large(&literal, line))?;
                    Number::Int(v.checked_mul(factor).ok_or_else(|| too_large(&literal, line))?)
                };
                return Ok(Token::new(TokenKind::Number(n, NumberMode::Size), line, self.text(start)));
            }
        }

        let n = if is_double {
            Number::Double(literal.parse().unwrap_or(0.0))
        } else {
            Number::Int(literal.parse().map_err(|_| too_large(&literal, line))?)
        };
        Ok(Token::new(TokenKind::Number(n, NumberMode::Normal), line, literal))
    }

    fn read_word(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        self.text(start)
    }

    fn read_identifier(&mut self) -> Token {
        let line = self.line;
        let start = self.pos;
        let first = self.read_word();
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_alphabetic()) {
            self.advance();
            let second = self.read_word();
            return Token::new(
                TokenKind::TwoWords(first.to_lowercase(), second.to_lowercase()),
                line,
                self.text(start),
            );
        }
        let lower = first.to_lowercase();
        if let Some(kw) = Keyword::from_word(&lower) {
            return Token::new(TokenKind::Keyword(kw), line, first);
        }
        if let Some(i) = MONTHS.iter().position(|m| *m == lower) {
            return Token::new(TokenKind::Number(Number::Int(i as i64 + 1), NumberMode::Month), line, first);
        }
        if let Some(i) = WEEKDAYS.iter().position(|d| *d == lower) {
            return Token::new(TokenKind::Number(Number::Int(i as i64 + 1), NumberMode::WeekDay), line, first);
        }
        Token::new(TokenKind::Word(lower), line, first)
    }

    fn read_quotation(&mut self, quote: char) -> Result<Token> {
        let line = self.line;
        let start = self.pos;
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(Error::syntax("string literal is not closed", line)),
                Some(c) if c == quote => break,
                Some(c) => value.push(c),
            }
        }
        let kind = if value.contains('*') {
            TokenKind::Pattern(value)
        } else {
            TokenKind::Quotation(value)
        };
        Ok(Token::new(kind, line, self.text(start)))
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let Some(ch) = self.peek() else { break };
            let token = match ch {
                '0'..='9' => self.read_number()?,
                '\'' | '"' | '`' => self.read_quotation(ch)?,
                c if c.is_alphabetic() || c == '_' => self.read_identifier(),
                c if SYMBOLS.contains(c) => {
                    let line = self.line;
                    self.advance();
                    Token::new(TokenKind::Symbol(c), line, c.to_string())
                }
                c => {
                    return Err(Error::syntax(format!("symbol '{c}' is not allowed"), self.line));
                }
            };
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn too_large(literal: &str, line: usize) -> Error {
    Error::runtime(format!("number '{literal}' is too big to be stored in memory")).at_line(line)
}

/// Tokenize a whole script.
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    Lexer::new(&chars).tokenize()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
