//! `where`, `limit`, `skip`, `every` and `final`.
//!
//! Each filter exists twice: as a lazy [`Definition`] stage and as a
//! [`Generator`] over an already evaluated list (`List*` types).  The count
//! argument is evaluated when a pass starts; a count below one yields no
//! elements for `limit` and `every`, and skips nothing for `skip`.

use std::collections::VecDeque;
use std::rc::Rc;

use tracing::debug;

use crate::env::Env;
use crate::error::Result;
use crate::script::context::FileContext;
use crate::script::definition::{DefPtr, Definition};
use crate::script::generator::{GenPtr, Generator};
use crate::script::number::Number;
use crate::script::time::Time;
use crate::script::value::Value;

/// Types a list filter can iterate.
pub trait Element: Clone + 'static {
    /// Make `self` the current element of `ctx`.
    fn load_into(&self, ctx: &FileContext, env: &Env);
}

impl Element for String {
    fn load_into(&self, ctx: &FileContext, env: &Env) {
        ctx.load(self, env);
    }
}

impl Element for Number {
    fn load_into(&self, ctx: &FileContext, _env: &Env) {
        ctx.set_this(Value::Number(*self));
    }
}

impl Element for Time {
    fn load_into(&self, ctx: &FileContext, _env: &Env) {
        ctx.set_this(Value::Time(*self));
    }
}

fn count(n: &mut GenPtr<Number>, env: &Env) -> Result<i64> {
    Ok(n.value(env)?.to_int())
}

// ── Where ────────────────────────────────────────────────────────────────────

/// Make `position` the index of the element `base` just produced.
fn publish(base: &dyn Definition, position: &mut usize) {
    if let Some(ctx) = base.file_context() {
        ctx.set_index(*position);
    }
    *position += 1;
}

pub struct Where {
    base: DefPtr,
    cond: GenPtr<bool>,
    ctx: Rc<FileContext>,
    /// `false` when `ctx` is the base's own context, already loaded.
    own: bool,
    /// Elements pulled from the base; the index seen by the condition.
    seen: usize,
    /// Elements passed on; the index seen after the filter.
    passed: usize,
    value: String,
}

impl Where {
    pub fn new(base: DefPtr, cond: GenPtr<bool>, ctx: Rc<FileContext>, own: bool) -> Self {
        Where { base, cond, ctx, own, seen: 0, passed: 0, value: String::new() }
    }
}

impl Definition for Where {
    fn has_next(&mut self, env: &Env) -> Result<bool> {
        while self.base.has_next(env)? {
            if !env.is_running() {
                self.reset();
                return Ok(false);
            }
            let value = self.base.value();
            if self.own {
                self.ctx.set_index(self.seen);
                self.ctx.load(&value, env);
            }
            self.seen += 1;
            if self.cond.value(env)? {
                self.ctx.set_index(self.passed);
                self.passed += 1;
                self.value = value;
                return Ok(true);
            }
        }
        if !env.is_running() {
            self.reset();
        }
        Ok(false)
    }

    fn value(&self) -> String {
        self.value.clone()
    }

    fn reset(&mut self) {
        self.base.reset();
        self.seen = 0;
        self.passed = 0;
    }

    fn file_context(&self) -> Option<Rc<FileContext>> {
        Some(self.ctx.clone())
    }
}

// ── Limit ────────────────────────────────────────────────────────────────────

pub struct Limit {
    base: DefPtr,
    n: GenPtr<Number>,
    limit: Option<i64>,
    taken: usize,
    exhausted: bool,
}

impl Limit {
    pub fn new(base: DefPtr, n: GenPtr<Number>) -> Self {
        Limit { base, n, limit: None, taken: 0, exhausted: false }
    }

    fn end(&mut self, env: &Env) -> Result<bool> {
        if env.is_running() {
            self.exhausted = true;
        } else {
            self.reset();
        }
        Ok(false)
    }
}

impl Definition for Limit {
    fn has_next(&mut self, env: &Env) -> Result<bool> {
        if !env.is_running() || self.exhausted {
            return self.end(env);
        }
        let limit = match self.limit {
            Some(l) => l,
            None => {
                let l = count(&mut self.n, env)?;
                self.limit = Some(l);
                l
            }
        };
        if self.taken as i64 >= limit {
            // the rest of the base is never pulled
            self.base.reset();
            return self.end(env);
        }
        if self.base.has_next(env)? {
            publish(self.base.as_ref(), &mut self.taken);
            Ok(true)
        } else {
            self.end(env)
        }
    }

    fn value(&self) -> String {
        self.base.value()
    }

    fn reset(&mut self) {
        self.base.reset();
        self.limit = None;
        self.taken = 0;
        self.exhausted = false;
    }

    fn file_context(&self) -> Option<Rc<FileContext>> {
        self.base.file_context()
    }
}

// ── Skip ─────────────────────────────────────────────────────────────────────

pub struct Skip {
    base: DefPtr,
    n: GenPtr<Number>,
    started: bool,
    position: usize,
}

impl Skip {
    pub fn new(base: DefPtr, n: GenPtr<Number>) -> Self {
        Skip { base, n, started: false, position: 0 }
    }

    fn end(&mut self, env: &Env) -> Result<bool> {
        if !env.is_running() {
            self.reset();
        }
        Ok(false)
    }
}

impl Definition for Skip {
    fn has_next(&mut self, env: &Env) -> Result<bool> {
        if !env.is_running() {
            return self.end(env);
        }
        if !self.started {
            self.started = true;
            let skip = count(&mut self.n, env)?;
            for _ in 0..skip.max(0) {
                if !self.base.has_next(env)? {
                    return self.end(env);
                }
            }
        }
        if self.base.has_next(env)? {
            publish(self.base.as_ref(), &mut self.position);
            Ok(true)
        } else {
            self.end(env)
        }
    }

    fn value(&self) -> String {
        self.base.value()
    }

    fn reset(&mut self) {
        self.base.reset();
        self.started = false;
        self.position = 0;
    }

    fn file_context(&self) -> Option<Rc<FileContext>> {
        self.base.file_context()
    }
}

// ── Every ────────────────────────────────────────────────────────────────────

pub struct Every {
    base: DefPtr,
    n: GenPtr<Number>,
    step: Option<i64>,
    position: usize,
}

impl Every {
    pub fn new(base: DefPtr, n: GenPtr<Number>) -> Self {
        Every { base, n, step: None, position: 0 }
    }

    fn end(&mut self, env: &Env) -> Result<bool> {
        if !env.is_running() {
            self.reset();
        }
        Ok(false)
    }
}

impl Definition for Every {
    fn has_next(&mut self, env: &Env) -> Result<bool> {
        if !env.is_running() {
            return self.end(env);
        }
        let step = match self.step {
            Some(s) => {
                for _ in 1..s {
                    if !self.base.has_next(env)? {
                        return self.end(env);
                    }
                }
                s
            }
            None => {
                let s = count(&mut self.n, env)?;
                self.step = Some(s);
                s
            }
        };
        if step < 1 {
            return Ok(false);
        }
        if self.base.has_next(env)? {
            publish(self.base.as_ref(), &mut self.position);
            Ok(true)
        } else {
            self.end(env)
        }
    }

    fn value(&self) -> String {
        self.base.value()
    }

    fn reset(&mut self) {
        self.base.reset();
        self.step = None;
        self.position = 0;
    }

    fn file_context(&self) -> Option<Rc<FileContext>> {
        self.base.file_context()
    }
}

// ── Final ────────────────────────────────────────────────────────────────────

/// Keeps only the last `n` elements in memory.  The base is drained on the
/// first pull.
pub struct Final {
    base: DefPtr,
    n: GenPtr<Number>,
    window: Option<VecDeque<String>>,
    value: String,
}

impl Final {
    pub fn new(base: DefPtr, n: GenPtr<Number>) -> Self {
        Final { base, n, window: None, value: String::new() }
    }
}

impl Definition for Final {
    fn has_next(&mut self, env: &Env) -> Result<bool> {
        if !env.is_running() {
            self.reset();
            return Ok(false);
        }
        if self.window.is_none() {
            let n = count(&mut self.n, env)?.max(0) as usize;
            let mut window = VecDeque::with_capacity(n.min(1024));
            while self.base.has_next(env)? {
                if n == 0 {
                    continue;
                }
                if window.len() == n {
                    window.pop_front();
                }
                window.push_back(self.base.value());
            }
            if !env.is_running() {
                debug!("final window cancelled");
                self.reset();
                return Ok(false);
            }
            self.window = Some(window);
        }
        match self.window.as_mut().and_then(VecDeque::pop_front) {
            Some(v) => {
                self.value = v;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn value(&self) -> String {
        self.value.clone()
    }

    fn reset(&mut self) {
        self.base.reset();
        self.window = None;
    }
}

// ── List filters ─────────────────────────────────────────────────────────────

pub struct ListWhere<T> {
    base: GenPtr<Vec<T>>,
    cond: GenPtr<bool>,
    ctx: Rc<FileContext>,
}

impl<T: Element> ListWhere<T> {
    pub fn new(base: GenPtr<Vec<T>>, cond: GenPtr<bool>, ctx: Rc<FileContext>) -> Self {
        ListWhere { base, cond, ctx }
    }
}

impl<T: Element> Generator<Vec<T>> for ListWhere<T> {
    fn value(&mut self, env: &Env) -> Result<Vec<T>> {
        let mut out = Vec::new();
        for (i, e) in self.base.value(env)?.into_iter().enumerate() {
            if !env.is_running() {
                return Ok(Vec::new());
            }
            self.ctx.set_index(i);
            e.load_into(&self.ctx, env);
            if self.cond.value(env)? {
                out.push(e);
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOp {
    Limit,
    Skip,
    Every,
    Final,
}

/// `limit`, `skip`, `every` or `final` over a list.
pub struct ListFilter<T> {
    base: GenPtr<Vec<T>>,
    n: GenPtr<Number>,
    op: ListOp,
}

impl<T: Element> ListFilter<T> {
    pub fn new(base: GenPtr<Vec<T>>, n: GenPtr<Number>, op: ListOp) -> Self {
        ListFilter { base, n, op }
    }
}

impl<T: Element> Generator<Vec<T>> for ListFilter<T> {
    fn value(&mut self, env: &Env) -> Result<Vec<T>> {
        let items = self.base.value(env)?;
        let n = count(&mut self.n, env)?;
        let len = items.len();
        Ok(match self.op {
            ListOp::Limit => items.into_iter().take(n.max(0) as usize).collect(),
            ListOp::Skip => items.into_iter().skip(n.max(0) as usize).collect(),
            ListOp::Every if n < 1 => Vec::new(),
            ListOp::Every => items.into_iter().step_by(n as usize).collect(),
            ListOp::Final => items.into_iter().skip(len.saturating_sub(n.max(0) as usize)).collect(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::definition::{collect, ListDefinition};
    use crate::script::generator::{constant, func1, VarRef};
    use crate::var::{var, Variable};

    fn letters() -> DefPtr {
        let v: Vec<String> = ["a", "b", "c", "d", "e", "f", "g"].iter().map(|s| s.to_string()).collect();
        Box::new(ListDefinition::new(constant(v)))
    }

    fn n(v: i64) -> GenPtr<Number> {
        constant(Number::Int(v))
    }

    fn run(mut d: impl Definition) -> Vec<String> {
        let env = Env::system();
        let first = collect(&mut d, &env).unwrap();
        assert_eq!(collect(&mut d, &env).unwrap(), first, "second pass differs");
        first
    }

    #[test]
    fn limit_skip_every_final() {
        assert_eq!(run(Limit::new(letters(), n(3))), vec!["a", "b", "c"]);
        assert_eq!(run(Limit::new(letters(), n(0))), Vec::<String>::new());
        assert_eq!(run(Skip::new(letters(), n(5))), vec!["f", "g"]);
        assert_eq!(run(Skip::new(letters(), n(50))), Vec::<String>::new());
        assert_eq!(run(Every::new(letters(), n(3))), vec!["a", "d", "g"]);
        assert_eq!(run(Every::new(letters(), n(0))), Vec::<String>::new());
        assert_eq!(run(Final::new(letters(), n(2))), vec!["f", "g"]);
        assert_eq!(run(Final::new(letters(), n(0))), Vec::<String>::new());
    }

    #[test]
    fn where_uses_this() {
        let ctx = Rc::new(FileContext::new(Some(Variable::Str(var(String::new()))), var(String::new())));
        let Some(Variable::Str(this)) = ctx.this.clone() else { unreachable!() };
        let cond = func1(Box::new(VarRef(this)), |s: String| Ok(s.as_str() > "c"));
        let w = Where::new(letters(), cond, ctx, true);
        assert_eq!(run(w), vec!["d", "e", "f", "g"]);
    }

    #[test]
    fn list_filters() {
        let env = Env::system();
        let nums: Vec<Number> = (1..=6).map(Number::Int).collect();
        let mut f = ListFilter::new(constant(nums.clone()), n(2), ListOp::Every);
        assert_eq!(f.value(&env).unwrap(), vec![Number::Int(1), Number::Int(3), Number::Int(5)]);
        let mut f = ListFilter::new(constant(nums.clone()), n(2), ListOp::Final);
        assert_eq!(f.value(&env).unwrap(), vec![Number::Int(5), Number::Int(6)]);

        let ctx = Rc::new(FileContext::new(Some(Variable::Number(var(Number::Int(0)))), var(String::new())));
        let Some(Variable::Number(this)) = ctx.this.clone() else { unreachable!() };
        let cond = func1(Box::new(VarRef(this)), |x: Number| Ok(x.to_int() % 2 == 0));
        let mut w = ListWhere::new(constant(nums), cond, ctx);
        assert_eq!(w.value(&env).unwrap(), vec![Number::Int(2), Number::Int(4), Number::Int(6)]);
    }

    #[test]
    fn limit_stops_early_and_resets_base() {
        let env = Env::system();
        let mut l = Limit::new(letters(), n(2));
        assert!(l.has_next(&env).unwrap());
        assert!(l.has_next(&env).unwrap());
        assert!(!l.has_next(&env).unwrap());
        assert!(!l.has_next(&env).unwrap());
        l.reset();
        assert_eq!(collect(&mut l, &env).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn exhausted_filters_stay_exhausted() {
        let env = Env::system();
        let stages: Vec<DefPtr> = vec![
            Box::new(Limit::new(letters(), n(3))),
            Box::new(Skip::new(letters(), n(2))),
            Box::new(Every::new(letters(), n(2))),
            Box::new(Final::new(letters(), n(2))),
        ];
        for mut d in stages {
            while d.has_next(&env).unwrap() {}
            assert!(!d.has_next(&env).unwrap());
            d.reset();
            assert!(d.has_next(&env).unwrap());
        }
    }

    /// A source that loads a context the way file sources do.
    fn indexed_letters() -> (DefPtr, Rc<FileContext>) {
        let ctx = FileContext::for_paths(var(String::new()));
        let base = Box::new(ListDefinition::new(constant(letters_vec())));
        (Box::new(Where::new(base, constant(true), ctx.clone(), true)), ctx)
    }

    fn indices(mut d: DefPtr, ctx: &FileContext) -> Vec<i64> {
        let env = Env::system();
        let mut out = Vec::new();
        while d.has_next(&env).unwrap() {
            out.push(ctx.index.borrow().to_int());
        }
        out
    }

    #[test]
    fn filters_publish_their_own_positions() {
        let (base, ctx) = indexed_letters();
        assert_eq!(indices(Box::new(Skip::new(base, n(2))), &ctx), vec![0, 1, 2]);
        let (base, ctx) = indexed_letters();
        assert_eq!(indices(Box::new(Every::new(base, n(2))), &ctx), vec![0, 1, 2]);
        let (base, ctx) = indexed_letters();
        assert_eq!(indices(Box::new(Limit::new(base, n(2))), &ctx), vec![0, 1]);

        let Some(Variable::Str(this)) = ctx.this.clone() else { unreachable!() };
        let base = Box::new(ListDefinition::new(constant(letters_vec())));
        let odd = func1(Box::new(VarRef(this)), |s: String| Ok(s == "b" || s == "d"));
        let w = Where::new(base, odd, ctx.clone(), true);
        assert_eq!(indices(Box::new(w), &ctx), vec![0, 1]);
    }

    fn letters_vec() -> Vec<String> {
        ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cancelled_filters_reset() {
        let env = Env::system();
        let mut l = Limit::new(letters(), n(5));
        assert!(l.has_next(&env).unwrap());
        env.cancel.cancel();
        assert!(!l.has_next(&env).unwrap());
        env.cancel.reset();
        assert_eq!(collect(&mut l, &env).unwrap().len(), 5);
    }
}
