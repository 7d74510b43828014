//! `order by`.
//!
//! Elements are materialised together with their key values, then sorted
//! stably: the first declared key decides, later keys break ties, and
//! elements equal on every key keep their source order.

use std::cmp::Ordering;
use std::rc::Rc;

use tracing::debug;

use crate::env::Env;
use crate::error::Result;
use crate::script::context::FileContext;
use crate::script::definition::{DefPtr, Definition};
use crate::script::filter::Element;
use crate::script::generator::{GenPtr, Generator};
use crate::script::number::Number;
use crate::script::period::Period;
use crate::script::time::Time;

/// One `order by` key, typed by its expression.
pub enum OrderKey {
    Bool(GenPtr<bool>),
    Number(GenPtr<Number>),
    Time(GenPtr<Time>),
    Period(GenPtr<Period>),
    Str(GenPtr<String>),
}

pub struct OrderBy {
    pub key: OrderKey,
    pub descending: bool,
}

#[derive(Debug, Clone)]
enum KeyValue {
    Bool(bool),
    Number(Number),
    Time(Time),
    Period(Period),
    Str(String),
}

impl KeyValue {
    fn compare(&self, other: &KeyValue) -> Ordering {
        match (self, other) {
            (KeyValue::Bool(a), KeyValue::Bool(b)) => a.cmp(b),
            (KeyValue::Number(a), KeyValue::Number(b)) => a.compare(b),
            (KeyValue::Time(a), KeyValue::Time(b)) => a.compare(b),
            (KeyValue::Period(a), KeyValue::Period(b)) => a.compare(b),
            (KeyValue::Str(a), KeyValue::Str(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

fn eval_keys(keys: &mut [OrderBy], env: &Env) -> Result<Vec<KeyValue>> {
    let mut out = Vec::with_capacity(keys.len());
    for k in keys.iter_mut() {
        out.push(match &mut k.key {
            OrderKey::Bool(g) => KeyValue::Bool(g.value(env)?),
            OrderKey::Number(g) => KeyValue::Number(g.value(env)?),
            OrderKey::Time(g) => KeyValue::Time(g.value(env)?),
            OrderKey::Period(g) => KeyValue::Period(g.value(env)?),
            OrderKey::Str(g) => KeyValue::Str(g.value(env)?),
        });
    }
    Ok(out)
}

/// Sort by `keys` in declaration order.  `sort_by` is stable, so items equal
/// on every key keep the order they were pulled in.
fn sort_keyed<T>(items: &mut [(T, Vec<KeyValue>)], keys: &[OrderBy]) {
    items.sort_by(|(_, a), (_, b)| {
        for (i, k) in keys.iter().enumerate() {
            let ord = a[i].compare(&b[i]);
            let ord = if k.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

// ── Definitions ──────────────────────────────────────────────────────────────

pub struct DefinitionOrder {
    base: DefPtr,
    keys: Vec<OrderBy>,
    ctx: Rc<FileContext>,
    own: bool,
    sorted: Option<std::vec::IntoIter<String>>,
    value: String,
}

impl DefinitionOrder {
    pub fn new(base: DefPtr, keys: Vec<OrderBy>, ctx: Rc<FileContext>, own: bool) -> Self {
        DefinitionOrder { base, keys, ctx, own, sorted: None, value: String::new() }
    }

    fn materialize(&mut self, env: &Env) -> Result<Option<Vec<String>>> {
        let mut items = Vec::new();
        let mut index = 0;
        while self.base.has_next(env)? {
            let value = self.base.value();
            if self.own {
                self.ctx.set_index(index);
                self.ctx.load(&value, env);
            }
            index += 1;
            let keys = eval_keys(&mut self.keys, env)?;
            items.push((value, keys));
        }
        if !env.is_running() {
            return Ok(None);
        }
        sort_keyed(&mut items, &self.keys);
        Ok(Some(items.into_iter().map(|(v, _)| v).collect()))
    }
}

impl Definition for DefinitionOrder {
    fn has_next(&mut self, env: &Env) -> Result<bool> {
        if !env.is_running() {
            self.reset();
            return Ok(false);
        }
        if self.sorted.is_none() {
            match self.materialize(env)? {
                Some(items) => self.sorted = Some(items.into_iter()),
                None => {
                    debug!("order by cancelled");
                    self.reset();
                    return Ok(false);
                }
            }
        }
        match self.sorted.as_mut().and_then(Iterator::next) {
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
        self.sorted = None;
    }
}

// ── Lists ────────────────────────────────────────────────────────────────────

pub struct ListOrder<T> {
    base: GenPtr<Vec<T>>,
    keys: Vec<OrderBy>,
    ctx: Rc<FileContext>,
}

impl<T: Element> ListOrder<T> {
    pub fn new(base: GenPtr<Vec<T>>, keys: Vec<OrderBy>, ctx: Rc<FileContext>) -> Self {
        ListOrder { base, keys, ctx }
    }
}

impl<T: Element> Generator<Vec<T>> for ListOrder<T> {
    fn value(&mut self, env: &Env) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for (i, e) in self.base.value(env)?.into_iter().enumerate() {
            if !env.is_running() {
                return Ok(Vec::new());
            }
            self.ctx.set_index(i);
            e.load_into(&self.ctx, env);
            let keys = eval_keys(&mut self.keys, env)?;
            items.push((e, keys));
        }
        sort_keyed(&mut items, &self.keys);
        Ok(items.into_iter().map(|(e, _)| e).collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::definition::{collect, ListDefinition};
    use crate::script::generator::{constant, func1, VarRef};
    use crate::var::{var, Variable};

    fn words() -> Vec<String> {
        ["pear", "fig", "apple", "kiwi", "plum"].iter().map(|s| s.to_string()).collect()
    }

    fn string_ctx() -> (Rc<FileContext>, crate::var::Var<String>) {
        let this = var(String::new());
        let ctx = Rc::new(FileContext::new(Some(Variable::Str(this.clone())), var(String::new())));
        (ctx, this)
    }

    #[test]
    fn first_key_wins_then_source_order() {
        let env = Env::system();
        let (ctx, this) = string_ctx();
        let by_len = OrderBy {
            key: OrderKey::Number(func1(Box::new(VarRef(this)), |s: String| Ok(Number::from(s.len())))),
            descending: false,
        };
        let base = Box::new(ListDefinition::new(constant(words())));
        let mut d = DefinitionOrder::new(base, vec![by_len], ctx, true);
        assert_eq!(collect(&mut d, &env).unwrap(), vec!["fig", "pear", "kiwi", "plum", "apple"]);
        assert_eq!(collect(&mut d, &env).unwrap().len(), 5);
    }

    #[test]
    fn descending_second_key() {
        let env = Env::system();
        let (ctx, this) = string_ctx();
        let keys = vec![
            OrderBy {
                key: OrderKey::Number(func1(Box::new(VarRef(this.clone())), |s: String| {
                    Ok(Number::from(s.len()))
                })),
                descending: false,
            },
            OrderBy { key: OrderKey::Str(Box::new(VarRef(this))), descending: true },
        ];
        let mut l = ListOrder::new(constant(words()), keys, ctx);
        assert_eq!(l.value(&env).unwrap(), vec!["fig", "plum", "pear", "kiwi", "apple"]);
    }

    #[test]
    fn cancelled_order_yields_nothing() {
        let env = Env::system();
        let (ctx, this) = string_ctx();
        let keys = vec![OrderBy { key: OrderKey::Str(Box::new(VarRef(this))), descending: false }];
        let base = Box::new(ListDefinition::new(constant(words())));
        let mut d = DefinitionOrder::new(base, keys, ctx, true);
        env.cancel.cancel();
        assert!(!d.has_next(&env).unwrap());
        env.cancel.reset();
        assert_eq!(collect(&mut d, &env).unwrap()[0], "apple");
    }

    #[test]
    fn sorted_output_stays_exhausted() {
        let env = Env::system();
        let (ctx, this) = string_ctx();
        let keys = vec![OrderBy { key: OrderKey::Str(Box::new(VarRef(this))), descending: false }];
        let base = Box::new(ListDefinition::new(constant(words())));
        let mut d = DefinitionOrder::new(base, keys, ctx, true);
        while d.has_next(&env).unwrap() {}
        assert!(!d.has_next(&env).unwrap());
        d.reset();
        assert!(d.has_next(&env).unwrap());
        assert_eq!(d.value(), "apple");
    }

    #[test]
    fn ties_keep_source_order() {
        let env = Env::system();
        let (ctx, this) = string_ctx();
        let by_first = OrderBy {
            key: OrderKey::Str(func1(Box::new(VarRef(this)), |s: String| Ok(s[..1].to_string()))),
            descending: false,
        };
        let input: Vec<String> = ["pear", "plum", "apple", "peach"].iter().map(|s| s.to_string()).collect();
        let mut d = DefinitionOrder::new(Box::new(ListDefinition::new(constant(input))), vec![by_first], ctx, true);
        assert_eq!(collect(&mut d, &env).unwrap(), vec!["apple", "pear", "plum", "peach"]);
    }
}
