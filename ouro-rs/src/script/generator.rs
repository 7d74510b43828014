//! Lazy value producers.
//!
//! The parser turns every expression into a tree of [`Generator`]s of one
//! static result type.  Evaluating the root walks the tree; nothing is
//! computed ahead of time except constant subtrees, which [`fold`] collapses
//! into a single [`Constant`].
//!
//! | Node | Produces |
//! |------|----------|
//! | [`Constant`] | a fixed value |
//! | [`VarRef`] | the current content of a variable cell |
//! | [`Func1`], [`Func2`], [`Func3`], [`FuncN`] | a pure function of evaluated arguments |
//! | [`EnvFunc`] | a function that also reads the environment (clock, file system) |
//! | [`Ternary`] | `cond ? a : b` |
//! | [`Cast`] | one kind converted to another |

use std::fmt;

use crate::env::Env;
use crate::error::Result;
use crate::var::Var;

pub trait Generator<T> {
    fn value(&mut self, env: &Env) -> Result<T>;

    /// Whether every evaluation yields the same value without reading any
    /// variable, the clock or the file system.
    fn is_constant(&self) -> bool {
        false
    }
}

pub type GenPtr<T> = Box<dyn Generator<T>>;

impl<T> fmt::Debug for dyn Generator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Generator(constant: {})", self.is_constant())
    }
}

// ── Leaves ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Constant<T>(pub T);

impl<T: Clone> Generator<T> for Constant<T> {
    fn value(&mut self, _env: &Env) -> Result<T> {
        Ok(self.0.clone())
    }

    fn is_constant(&self) -> bool {
        true
    }
}

pub fn constant<T: Clone + 'static>(value: T) -> GenPtr<T> {
    Box::new(Constant(value))
}

#[derive(Debug, Clone)]
pub struct VarRef<T>(pub Var<T>);

impl<T: Clone> Generator<T> for VarRef<T> {
    fn value(&mut self, _env: &Env) -> Result<T> {
        Ok(self.0.borrow().clone())
    }
}

// ── Functions ────────────────────────────────────────────────────────────────

pub struct Func1<A, T> {
    pub arg: GenPtr<A>,
    pub f: fn(A) -> Result<T>,
}

impl<A, T> Generator<T> for Func1<A, T> {
    fn value(&mut self, env: &Env) -> Result<T> {
        (self.f)(self.arg.value(env)?)
    }

    fn is_constant(&self) -> bool {
        self.arg.is_constant()
    }
}

pub fn func1<A: 'static, T: 'static>(arg: GenPtr<A>, f: fn(A) -> Result<T>) -> GenPtr<T> {
    Box::new(Func1 { arg, f })
}

pub struct Func2<A, B, T> {
    pub a: GenPtr<A>,
    pub b: GenPtr<B>,
    pub f: fn(A, B) -> Result<T>,
}

impl<A, B, T> Generator<T> for Func2<A, B, T> {
    fn value(&mut self, env: &Env) -> Result<T> {
        let a = self.a.value(env)?;
        let b = self.b.value(env)?;
        (self.f)(a, b)
    }

    fn is_constant(&self) -> bool {
        self.a.is_constant() && self.b.is_constant()
    }
}

pub fn func2<A: 'static, B: 'static, T: 'static>(
    a: GenPtr<A>,
    b: GenPtr<B>,
    f: fn(A, B) -> Result<T>,
) -> GenPtr<T> {
    Box::new(Func2 { a, b, f })
}

pub struct Func3<A, B, C, T> {
    pub a: GenPtr<A>,
    pub b: GenPtr<B>,
    pub c: GenPtr<C>,
    pub f: fn(A, B, C) -> Result<T>,
}

impl<A, B, C, T> Generator<T> for Func3<A, B, C, T> {
    fn value(&mut self, env: &Env) -> Result<T> {
        let a = self.a.value(env)?;
        let b = self.b.value(env)?;
        let c = self.c.value(env)?;
        (self.f)(a, b, c)
    }

    fn is_constant(&self) -> bool {
        self.a.is_constant() && self.b.is_constant() && self.c.is_constant()
    }
}

pub fn func3<A: 'static, B: 'static, C: 'static, T: 'static>(
    a: GenPtr<A>,
    b: GenPtr<B>,
    c: GenPtr<C>,
    f: fn(A, B, C) -> Result<T>,
) -> GenPtr<T> {
    Box::new(Func3 { a, b, c, f })
}

/// Variadic function over arguments of one kind.
pub struct FuncN<A, T> {
    pub args: Vec<GenPtr<A>>,
    pub f: fn(Vec<A>) -> Result<T>,
}

impl<A, T> Generator<T> for FuncN<A, T> {
    fn value(&mut self, env: &Env) -> Result<T> {
        let mut values = Vec::with_capacity(self.args.len());
        for arg in &mut self.args {
            values.push(arg.value(env)?);
        }
        (self.f)(values)
    }

    fn is_constant(&self) -> bool {
        self.args.iter().all(|a| a.is_constant())
    }
}

pub fn func_n<A: 'static, T: 'static>(args: Vec<GenPtr<A>>, f: fn(Vec<A>) -> Result<T>) -> GenPtr<T> {
    Box::new(FuncN { args, f })
}

/// Function of one argument and the environment.  Never constant.
pub struct EnvFunc<A, T> {
    pub arg: GenPtr<A>,
    pub f: fn(A, &Env) -> Result<T>,
}

impl<A, T> Generator<T> for EnvFunc<A, T> {
    fn value(&mut self, env: &Env) -> Result<T> {
        let a = self.arg.value(env)?;
        (self.f)(a, env)
    }
}

pub fn env_func<A: 'static, T: 'static>(arg: GenPtr<A>, f: fn(A, &Env) -> Result<T>) -> GenPtr<T> {
    Box::new(EnvFunc { arg, f })
}

/// Reads the environment only (`now`, `today`).
pub struct EnvValue<T> {
    pub f: fn(&Env) -> Result<T>,
}

impl<T> Generator<T> for EnvValue<T> {
    fn value(&mut self, env: &Env) -> Result<T> {
        (self.f)(env)
    }
}

pub fn env_value<T: 'static>(f: fn(&Env) -> Result<T>) -> GenPtr<T> {
    Box::new(EnvValue { f })
}

// ── Control ──────────────────────────────────────────────────────────────────

pub struct Ternary<T> {
    pub cond: GenPtr<bool>,
    pub left: GenPtr<T>,
    pub right: GenPtr<T>,
}

impl<T> Generator<T> for Ternary<T> {
    fn value(&mut self, env: &Env) -> Result<T> {
        if self.cond.value(env)? {
            self.left.value(env)
        } else {
            self.right.value(env)
        }
    }

    fn is_constant(&self) -> bool {
        self.cond.is_constant() && self.left.is_constant() && self.right.is_constant()
    }
}

pub fn ternary<T: 'static>(cond: GenPtr<bool>, left: GenPtr<T>, right: GenPtr<T>) -> GenPtr<T> {
    Box::new(Ternary { cond, left, right })
}

/// Kind conversion.  Same as [`Func1`] but named for readability at call
/// sites.
pub fn cast<A: 'static, T: 'static>(arg: GenPtr<A>, f: fn(A) -> Result<T>) -> GenPtr<T> {
    func1(arg, f)
}

// ── Folding ──────────────────────────────────────────────────────────────────

/// Replace a constant tree by its value.
pub fn fold<T: Clone + 'static>(mut gen: GenPtr<T>, env: &Env) -> Result<GenPtr<T>> {
    if !gen.is_constant() {
        return Ok(gen);
    }
    let value = gen.value(env)?;
    tracing::trace!("constant subtree folded");
    Ok(constant(value))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::number::Number;
    use crate::var::var;

    fn add(a: Number, b: Number) -> Result<Number> {
        a.add(b)
    }

    #[test]
    fn constants_propagate() {
        let env = Env::system();
        let g = func2(constant(Number::Int(2)), constant(Number::Int(3)), add);
        assert!(g.is_constant());
        let mut folded = fold(g, &env).unwrap();
        assert!(folded.is_constant());
        assert_eq!(folded.value(&env).unwrap(), Number::Int(5));
    }

    #[test]
    fn variables_are_not_constant() {
        let env = Env::system();
        let cell = var(Number::Int(1));
        let g = func2(Box::new(VarRef(cell.clone())), constant(Number::Int(3)), add);
        let mut g = fold(g, &env).unwrap();
        assert!(!g.is_constant());
        assert_eq!(g.value(&env).unwrap(), Number::Int(4));
        *cell.borrow_mut() = Number::Int(10);
        assert_eq!(g.value(&env).unwrap(), Number::Int(13));
    }

    #[test]
    fn ternary_picks_branch() {
        let env = Env::system();
        let flag = var(true);
        let mut g = ternary(Box::new(VarRef(flag.clone())), constant("a".to_string()), constant("b".to_string()));
        assert_eq!(g.value(&env).unwrap(), "a");
        *flag.borrow_mut() = false;
        assert_eq!(g.value(&env).unwrap(), "b");
    }

    #[test]
    fn errors_surface_from_functions() {
        let env = Env::system();
        let mut g = func2(constant(Number::Int(1)), constant(Number::Int(0)), |a: Number, b| a.div(b));
        assert!(g.value(&env).unwrap_err().is_runtime());
    }
}
