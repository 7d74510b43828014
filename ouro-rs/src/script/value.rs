//! Runtime values of the scripting language.
//!
//! Every expression has one static [`Kind`]; the parser decides it and builds
//! a generator of the matching Rust type.  [`Value`] is the dynamically typed
//! form used where the kind is only known at run time: variable assignment,
//! `print`, and the CLI.

use std::fmt;

use crate::script::number::Number;
use crate::script::period::Period;
use crate::script::time::Time;

/// Static kind of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Number,
    Time,
    Period,
    String,
    Definition,
    List,
    NumList,
    TimeList,
}

impl Kind {
    /// Name used in diagnostics ("cannot be resolved to a {name}").
    pub fn name(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Number => "number",
            Kind::Time => "time",
            Kind::Period => "period",
            Kind::String => "string",
            Kind::Definition => "definition",
            Kind::List => "list",
            Kind::NumList => "numeric list",
            Kind::TimeList => "time list",
        }
    }

    pub fn is_collection(self) -> bool {
        matches!(self, Kind::Definition | Kind::List | Kind::NumList | Kind::TimeList)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value of any kind.  Definitions never appear here; they are
/// materialised into [`Value::List`] first.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(Number),
    Time(Time),
    Period(Period),
    Str(String),
    List(Vec<String>),
    NumList(Vec<Number>),
    TimeList(Vec<Time>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Str(String::new())
    }
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => f.write_str(if *b { "1" } else { "0" }),
            Value::Number(n) => write!(f, "{n}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::Period(p) => write!(f, "{p}"),
            Value::Str(s) => f.write_str(s),
            Value::List(l) => join(f, l),
            Value::NumList(l) => join(f, l),
            Value::TimeList(l) => join(f, l),
        }
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::Time(_) => Kind::Time,
            Value::Period(_) => Kind::Period,
            Value::Str(_) => Kind::String,
            Value::List(_) => Kind::List,
            Value::NumList(_) => Kind::NumList,
            Value::TimeList(_) => Kind::TimeList,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_comma_joined() {
        let v = Value::List(vec!["a.txt".into(), "b.txt".into()]);
        assert_eq!(v.to_string(), "a.txt, b.txt");
        let v = Value::NumList(vec![Number::Int(1), Number::Double(2.5)]);
        assert_eq!(v.to_string(), "1, 2.5");
        assert_eq!(Value::List(Vec::new()).to_string(), "");
    }

    #[test]
    fn display_bool() {
        assert_eq!(Value::Bool(true).to_string(), "1");
        assert_eq!(Value::Bool(false).to_string(), "0");
        assert_eq!(Value::Bool(false).kind(), Kind::Bool);
    }

    #[test]
    fn kind_names() {
        assert_eq!(Kind::NumList.name(), "numeric list");
        assert!(Kind::Definition.is_collection());
        assert!(!Kind::Period.is_collection());
    }
}
