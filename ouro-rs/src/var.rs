//! Typed variable cells and variable scopes.
//!
//! A variable is a shared, mutable cell of one value kind.  The parser
//! resolves every name to its cell once; the generators built from it read
//! the cell on every evaluation, and assignments write it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::script::generator::{GenPtr, VarRef};
use crate::script::number::Number;
use crate::script::period::Period;
use crate::script::time::Time;
use crate::script::value::{Kind, Value};

/// Shared mutable cell.
pub type Var<T> = Rc<RefCell<T>>;

pub fn var<T>(value: T) -> Var<T> {
    Rc::new(RefCell::new(value))
}

/// A variable cell of any kind.
#[derive(Debug, Clone)]
pub enum Variable {
    Bool(Var<bool>),
    Number(Var<Number>),
    Time(Var<Time>),
    Period(Var<Period>),
    Str(Var<String>),
    List(Var<Vec<String>>),
    NumList(Var<Vec<Number>>),
    TimeList(Var<Vec<Time>>),
}

impl Variable {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Bool(v) => Variable::Bool(var(v)),
            Value::Number(v) => Variable::Number(var(v)),
            Value::Time(v) => Variable::Time(var(v)),
            Value::Period(v) => Variable::Period(var(v)),
            Value::Str(v) => Variable::Str(var(v)),
            Value::List(v) => Variable::List(var(v)),
            Value::NumList(v) => Variable::NumList(var(v)),
            Value::TimeList(v) => Variable::TimeList(var(v)),
        }
    }

    /// A fresh cell holding the empty value of `kind`.
    pub fn empty(kind: Kind) -> Self {
        match kind {
            Kind::Bool => Variable::Bool(var(false)),
            Kind::Number => Variable::Number(var(Number::default())),
            Kind::Time => Variable::Time(var(Time::default())),
            Kind::Period => Variable::Period(var(Period::default())),
            Kind::String => Variable::Str(var(String::new())),
            Kind::List | Kind::Definition => Variable::List(var(Vec::new())),
            Kind::NumList => Variable::NumList(var(Vec::new())),
            Kind::TimeList => Variable::TimeList(var(Vec::new())),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Variable::Bool(_) => Kind::Bool,
            Variable::Number(_) => Kind::Number,
            Variable::Time(_) => Kind::Time,
            Variable::Period(_) => Kind::Period,
            Variable::Str(_) => Kind::String,
            Variable::List(_) => Kind::List,
            Variable::NumList(_) => Kind::NumList,
            Variable::TimeList(_) => Kind::TimeList,
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Variable::Bool(v) => Value::Bool(*v.borrow()),
            Variable::Number(v) => Value::Number(*v.borrow()),
            Variable::Time(v) => Value::Time(*v.borrow()),
            Variable::Period(v) => Value::Period(*v.borrow()),
            Variable::Str(v) => Value::Str(v.borrow().clone()),
            Variable::List(v) => Value::List(v.borrow().clone()),
            Variable::NumList(v) => Value::NumList(v.borrow().clone()),
            Variable::TimeList(v) => Value::TimeList(v.borrow().clone()),
        }
    }

    pub fn as_bool(&self) -> Option<GenPtr<bool>> {
        match self {
            Variable::Bool(c) => Some(Box::new(VarRef(c.clone()))),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<GenPtr<Number>> {
        match self {
            Variable::Number(c) => Some(Box::new(VarRef(c.clone()))),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<GenPtr<Time>> {
        match self {
            Variable::Time(c) => Some(Box::new(VarRef(c.clone()))),
            _ => None,
        }
    }

    pub fn as_period(&self) -> Option<GenPtr<Period>> {
        match self {
            Variable::Period(c) => Some(Box::new(VarRef(c.clone()))),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<GenPtr<String>> {
        match self {
            Variable::Str(c) => Some(Box::new(VarRef(c.clone()))),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<GenPtr<Vec<String>>> {
        match self {
            Variable::List(c) => Some(Box::new(VarRef(c.clone()))),
            _ => None,
        }
    }

    pub fn as_numlist(&self) -> Option<GenPtr<Vec<Number>>> {
        match self {
            Variable::NumList(c) => Some(Box::new(VarRef(c.clone()))),
            _ => None,
        }
    }

    pub fn as_timelist(&self) -> Option<GenPtr<Vec<Time>>> {
        match self {
            Variable::TimeList(c) => Some(Box::new(VarRef(c.clone()))),
            _ => None,
        }
    }

    /// Store `value` if its kind matches.  Returns `false` otherwise.
    pub fn set(&self, value: Value) -> bool {
        match (self, value) {
            (Variable::Bool(c), Value::Bool(v)) => *c.borrow_mut() = v,
            (Variable::Number(c), Value::Number(v)) => *c.borrow_mut() = v,
            (Variable::Time(c), Value::Time(v)) => *c.borrow_mut() = v,
            (Variable::Period(c), Value::Period(v)) => *c.borrow_mut() = v,
            (Variable::Str(c), Value::Str(v)) => *c.borrow_mut() = v,
            (Variable::List(c), Value::List(v)) => *c.borrow_mut() = v,
            (Variable::NumList(c), Value::NumList(v)) => *c.borrow_mut() = v,
            (Variable::TimeList(c), Value::TimeList(v)) => *c.borrow_mut() = v,
            _ => return false,
        }
        true
    }
}

/// One scope of named variables.  Names are stored lowercased.
#[derive(Debug, Default, Clone)]
pub struct VarStore {
    vars: HashMap<String, Variable>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a variable.
    pub fn insert(&mut self, name: impl Into<String>, variable: Variable) {
        self.vars.insert(name.into(), variable);
    }

    /// Insert a string constant.
    pub fn set_str(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.insert(name, Variable::Str(var(value.into())));
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    /// Remove a variable.  Returns `true` if it existed.
    pub fn unset(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut s = VarStore::new();
        s.set_str("greeting", "hello");
        assert_eq!(s.get("greeting").map(Variable::value), Some(Value::Str("hello".into())));
        assert!(s.contains("greeting"));
        assert!(s.get("missing").is_none());
    }

    #[test]
    fn cells_are_shared() {
        let v = Variable::from_value(Value::Number(Number::Int(5)));
        let alias = v.clone();
        assert!(v.set(Value::Number(Number::Int(7))));
        assert_eq!(alias.value(), Value::Number(Number::Int(7)));
    }

    #[test]
    fn set_rejects_other_kind() {
        let v = Variable::empty(Kind::Bool);
        assert!(!v.set(Value::Str("x".into())));
        assert_eq!(v.value(), Value::Bool(false));
    }

    #[test]
    fn unset() {
        let mut s = VarStore::new();
        s.set_str("x", "1");
        assert!(s.unset("x"));
        assert!(!s.unset("x"));
        assert!(s.is_empty());
    }
}
