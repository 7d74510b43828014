//! Comparison, membership and pattern nodes.
//!
//! | Operands | `=` `!=` | `<` `<=` `>` `>=` |
//! |----------|----------|-------------------|
//! | scalars | value equality | value order |
//! | collections | element-wise | element count |
//!
//! Collection loops poll the cancellation token; a cancelled comparison is
//! `false`.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::env::Env;
use crate::error::Result;
use crate::pattern::LikeMatcher;
use crate::script::definition::{self, DefPtr};
use crate::script::generator::{GenPtr, Generator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Equals,
    NotEquals,
    Smaller,
    SmallerOrEquals,
    Bigger,
    BiggerOrEquals,
}

impl CmpOp {
    /// `=`, `!=`, `<`, `<=`, `>`, `>=`.
    pub fn from_symbols(first: char, second: Option<char>) -> Option<CmpOp> {
        Some(match (first, second) {
            ('=', None) => CmpOp::Equals,
            ('!', Some('=')) => CmpOp::NotEquals,
            ('<', None) => CmpOp::Smaller,
            ('<', Some('=')) => CmpOp::SmallerOrEquals,
            ('>', None) => CmpOp::Bigger,
            ('>', Some('=')) => CmpOp::BiggerOrEquals,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Equals => "=",
            CmpOp::NotEquals => "!=",
            CmpOp::Smaller => "<",
            CmpOp::SmallerOrEquals => "<=",
            CmpOp::Bigger => ">",
            CmpOp::BiggerOrEquals => ">=",
        }
    }

    pub fn is_equality(self) -> bool {
        matches!(self, CmpOp::Equals | CmpOp::NotEquals)
    }

    pub fn test(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Equals => ord == Ordering::Equal,
            CmpOp::NotEquals => ord != Ordering::Equal,
            CmpOp::Smaller => ord == Ordering::Less,
            CmpOp::SmallerOrEquals => ord != Ordering::Greater,
            CmpOp::Bigger => ord == Ordering::Greater,
            CmpOp::BiggerOrEquals => ord != Ordering::Less,
        }
    }
}

// ── Scalars ──────────────────────────────────────────────────────────────────

pub struct Comparison<T> {
    left: GenPtr<T>,
    right: GenPtr<T>,
    op: CmpOp,
    cmp: fn(&T, &T) -> Ordering,
}

impl<T> Comparison<T> {
    pub fn new(left: GenPtr<T>, right: GenPtr<T>, op: CmpOp, cmp: fn(&T, &T) -> Ordering) -> Self {
        Comparison { left, right, op, cmp }
    }
}

impl<T> Generator<bool> for Comparison<T> {
    fn value(&mut self, env: &Env) -> Result<bool> {
        let a = self.left.value(env)?;
        let b = self.right.value(env)?;
        Ok(self.op.test((self.cmp)(&a, &b)))
    }

    fn is_constant(&self) -> bool {
        self.left.is_constant() && self.right.is_constant()
    }
}

// ── Collections ──────────────────────────────────────────────────────────────

pub struct ListComparison<T> {
    left: GenPtr<Vec<T>>,
    right: GenPtr<Vec<T>>,
    op: CmpOp,
    eq: fn(&T, &T) -> bool,
}

impl<T> ListComparison<T> {
    pub fn new(left: GenPtr<Vec<T>>, right: GenPtr<Vec<T>>, op: CmpOp, eq: fn(&T, &T) -> bool) -> Self {
        ListComparison { left, right, op, eq }
    }
}

impl<T> Generator<bool> for ListComparison<T> {
    fn value(&mut self, env: &Env) -> Result<bool> {
        let a = self.left.value(env)?;
        let b = self.right.value(env)?;
        if !self.op.is_equality() {
            return Ok(self.op.test(a.len().cmp(&b.len())));
        }
        let mut same = a.len() == b.len();
        if same {
            for (x, y) in a.iter().zip(&b) {
                if !env.is_running() {
                    return Ok(false);
                }
                if !(self.eq)(x, y) {
                    same = false;
                    break;
                }
            }
        }
        Ok(same == (self.op == CmpOp::Equals))
    }

    fn is_constant(&self) -> bool {
        self.left.is_constant() && self.right.is_constant()
    }
}

/// Two definitions, compared lazily.  Equality stops at the first
/// difference.
pub struct DefinitionComparison {
    left: DefPtr,
    right: DefPtr,
    op: CmpOp,
}

impl DefinitionComparison {
    pub fn new(left: DefPtr, right: DefPtr, op: CmpOp) -> Self {
        DefinitionComparison { left, right, op }
    }

    fn same_elements(&mut self, env: &Env) -> Result<bool> {
        loop {
            let a = self.left.has_next(env)?;
            let b = self.right.has_next(env)?;
            match (a, b) {
                (false, false) => return Ok(true),
                (true, true) if self.left.value() == self.right.value() => continue,
                _ => return Ok(false),
            }
        }
    }
}

impl Generator<bool> for DefinitionComparison {
    fn value(&mut self, env: &Env) -> Result<bool> {
        if !self.op.is_equality() {
            let a = definition::count(self.left.as_mut(), env)?;
            let b = definition::count(self.right.as_mut(), env)?;
            return Ok(env.is_running() && self.op.test(a.cmp(&b)));
        }
        let same = self.same_elements(env);
        self.left.reset();
        self.right.reset();
        let same = same?;
        Ok(env.is_running() && same == (self.op == CmpOp::Equals))
    }
}

// ── Membership ───────────────────────────────────────────────────────────────

/// `x in list`.
pub struct InList<T> {
    value: GenPtr<T>,
    list: GenPtr<Vec<T>>,
    eq: fn(&T, &T) -> bool,
}

impl<T> InList<T> {
    pub fn new(value: GenPtr<T>, list: GenPtr<Vec<T>>, eq: fn(&T, &T) -> bool) -> Self {
        InList { value, list, eq }
    }
}

impl<T> Generator<bool> for InList<T> {
    fn value(&mut self, env: &Env) -> Result<bool> {
        let v = self.value.value(env)?;
        let list = self.list.value(env)?;
        for item in &list {
            if !env.is_running() {
                return Ok(false);
            }
            if (self.eq)(&v, item) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn is_constant(&self) -> bool {
        self.value.is_constant() && self.list.is_constant()
    }
}

/// `x in definition`.  Stops at the first match.
pub struct InDefinition {
    value: GenPtr<String>,
    def: DefPtr,
}

impl InDefinition {
    pub fn new(value: GenPtr<String>, def: DefPtr) -> Self {
        InDefinition { value, def }
    }

    fn contains(&mut self, v: &str, env: &Env) -> Result<bool> {
        while self.def.has_next(env)? {
            if self.def.value() == v {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl Generator<bool> for InDefinition {
    fn value(&mut self, env: &Env) -> Result<bool> {
        let v = self.value.value(env)?;
        let found = self.contains(&v, env);
        self.def.reset();
        found
    }
}

// ── Patterns ─────────────────────────────────────────────────────────────────

/// `x like 'pattern'` with the matcher chosen once.
pub struct LikeConst {
    value: GenPtr<String>,
    matcher: LikeMatcher,
}

impl LikeConst {
    pub fn new(value: GenPtr<String>, pattern: &str) -> Self {
        LikeConst { value, matcher: LikeMatcher::compile(pattern) }
    }
}

impl Generator<bool> for LikeConst {
    fn value(&mut self, env: &Env) -> Result<bool> {
        Ok(self.matcher.is_match(&self.value.value(env)?))
    }

    fn is_constant(&self) -> bool {
        self.value.is_constant()
    }
}

/// `x like expr`.  The matcher is rebuilt only when the pattern changes.
pub struct Like {
    value: GenPtr<String>,
    pattern: GenPtr<String>,
    cache: Option<(u64, LikeMatcher)>,
}

impl Like {
    pub fn new(value: GenPtr<String>, pattern: GenPtr<String>) -> Self {
        Like { value, pattern, cache: None }
    }
}

fn hash_of(s: &str) -> u64 {
    let mut h = DefaultHasher::new();
    s.hash(&mut h);
    h.finish()
}

impl Generator<bool> for Like {
    fn value(&mut self, env: &Env) -> Result<bool> {
        let value = self.value.value(env)?;
        let pattern = self.pattern.value(env)?;
        let hash = hash_of(&pattern);
        if self.cache.as_ref().map(|(h, _)| *h) != Some(hash) {
            self.cache = Some((hash, LikeMatcher::compile(&pattern)));
        }
        Ok(self.cache.as_ref().is_some_and(|(_, m)| m.is_match(&value)))
    }

    fn is_constant(&self) -> bool {
        self.value.is_constant() && self.pattern.is_constant()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::definition::ListDefinition;
    use crate::script::generator::{constant, VarRef};
    use crate::script::number::Number;
    use crate::var::var;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn def(v: &[&str]) -> DefPtr {
        Box::new(ListDefinition::new(constant(strings(v))))
    }

    #[test]
    fn scalar_ops() {
        let env = Env::system();
        let mut c = Comparison::new(constant(Number::Int(2)), constant(Number::Double(2.0)), CmpOp::Equals, Number::compare);
        assert!(c.value(&env).unwrap());
        let mut c = Comparison::new(constant(Number::Int(2)), constant(Number::Int(3)), CmpOp::BiggerOrEquals, Number::compare);
        assert!(!c.value(&env).unwrap());
    }

    #[test]
    fn lists_equal_elementwise_and_order_by_count() {
        let env = Env::system();
        let eq = |a: &String, b: &String| a == b;
        let mut c = ListComparison::new(constant(strings(&["a", "b"])), constant(strings(&["a", "b"])), CmpOp::Equals, eq);
        assert!(c.value(&env).unwrap());
        let mut c = ListComparison::new(constant(strings(&["a", "b"])), constant(strings(&["b", "a"])), CmpOp::NotEquals, eq);
        assert!(c.value(&env).unwrap());
        let mut c = ListComparison::new(constant(strings(&["z"])), constant(strings(&["a", "b"])), CmpOp::Smaller, eq);
        assert!(c.value(&env).unwrap());
    }

    #[test]
    fn definitions_compare_lazily_and_restart() {
        let env = Env::system();
        let mut c = DefinitionComparison::new(def(&["a", "b", "c"]), def(&["a", "x", "c"]), CmpOp::Equals);
        assert!(!c.value(&env).unwrap());
        assert!(!c.value(&env).unwrap());
        let mut c = DefinitionComparison::new(def(&["a", "b"]), def(&["a", "b"]), CmpOp::Equals);
        assert!(c.value(&env).unwrap());
        assert!(c.value(&env).unwrap());
        let mut c = DefinitionComparison::new(def(&["a", "b"]), def(&["a"]), CmpOp::Bigger);
        assert!(c.value(&env).unwrap());
        assert!(c.value(&env).unwrap());
    }

    #[test]
    fn membership() {
        let env = Env::system();
        let mut i = InDefinition::new(constant("b".to_string()), def(&["a", "b", "c"]));
        assert!(i.value(&env).unwrap());
        assert!(i.value(&env).unwrap());
        let mut i = InDefinition::new(constant("q".to_string()), def(&["a", "b"]));
        assert!(!i.value(&env).unwrap());
        assert!(!i.value(&env).unwrap());
        let mut i = InList::new(constant(Number::Int(4)), constant(vec![Number::Int(1)]), |a, b| a == b);
        assert!(!i.value(&env).unwrap());
    }

    #[test]
    fn like_cache_follows_pattern() {
        let env = Env::system();
        let pattern = var("a%".to_string());
        let mut l = Like::new(constant("abc".to_string()), Box::new(VarRef(pattern.clone())));
        assert!(l.value(&env).unwrap());
        *pattern.borrow_mut() = "%z".to_string();
        assert!(!l.value(&env).unwrap());
        *pattern.borrow_mut() = "%c".to_string();
        assert!(l.value(&env).unwrap());
    }
}
