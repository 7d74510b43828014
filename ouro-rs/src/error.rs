//! Error types shared by the lexer, parser and runtime.
//!
//! | Kind | Raised | Exit status |
//! |------|--------|-------------|
//! | [`Error::Syntax`] | while parsing, aborts the whole script | 2 |
//! | [`Error::Runtime`] | while evaluating, aborts the running command sequence | 3 |
//! | [`Error::Config`] / [`Error::Io`] | around script loading | 1 |

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("syntax error at line {line}: {message}")]
    Syntax { message: String, line: usize },

    #[error("runtime error{}: {message}", line_suffix(.line))]
    Runtime { message: String, line: Option<usize> },

    #[error("config error at line {line}: {message}")]
    Config { message: String, line: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(l) => format!(" at line {l}"),
        None => String::new(),
    }
}

impl Error {
    pub fn syntax(message: impl Into<String>, line: usize) -> Self {
        Error::Syntax { message: message.into(), line }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime { message: message.into(), line: None }
    }

    /// Attach a source line to a runtime error that does not carry one yet.
    pub fn at_line(self, at: usize) -> Self {
        match self {
            Error::Runtime { message, line: None } => Error::Runtime { message, line: Some(at) },
            other => other,
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Syntax { .. })
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, Error::Runtime { .. })
    }

    /// The bare message, without the kind and line prefix.
    pub fn message(&self) -> String {
        match self {
            Error::Syntax { message, .. }
            | Error::Runtime { message, .. }
            | Error::Config { message, .. } => message.clone(),
            Error::Io(e) => e.to_string(),
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Syntax { line, .. } | Error::Config { line, .. } => Some(*line),
            Error::Runtime { line, .. } => *line,
            Error::Io(_) => None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Syntax { .. } => 2,
            Error::Runtime { .. } => 3,
            Error::Config { .. } | Error::Io(_) => 1,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_display_has_line() {
        let e = Error::syntax("adjacent + symbols", 4);
        assert_eq!(e.to_string(), "syntax error at line 4: adjacent + symbols");
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn runtime_line_attached_once() {
        let e = Error::runtime("division by zero").at_line(7).at_line(9);
        assert_eq!(e.line(), Some(7));
        assert_eq!(e.to_string(), "runtime error at line 7: division by zero");
    }

    #[test]
    fn runtime_without_line() {
        let e = Error::runtime("modulo by zero");
        assert_eq!(e.to_string(), "runtime error: modulo by zero");
        assert!(e.is_runtime());
        assert_eq!(e.exit_code(), 3);
    }
}
