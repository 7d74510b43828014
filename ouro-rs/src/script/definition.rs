//! Definitions: restartable lazy sequences of strings.
//!
//! A [`Definition`] is pulled with [`has_next`](Definition::has_next) and
//! read with [`value`](Definition::value).  Once `has_next` returns `false`
//! it keeps returning `false` until [`reset`](Definition::reset) is called;
//! every reset cascades down to the sources and restarts the element index
//! at zero.  Whoever drives a definition resets it when done with it, early
//! or not ([`collect`] and [`count`] do).
//!
//! Every `has_next` polls the cancellation token.  A cancelled definition
//! resets and reports exhaustion.
//!
//! | Type | Elements |
//! |------|----------|
//! | [`OsDefinition`] | `files`, `directories`, `all` and their `recursive` forms |
//! | [`AsteriskDefinition`] | paths matching `'*.txt'`, `'src/**/*.rs'` |
//! | [`ListDefinition`] | a string list, evaluated on first pull |
//! | [`Chain`] | `a, b, c`: each part in turn |
//! | [`DefinitionTernary`] | `cond ? a : b` |

use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::env::Env;
use crate::error::Result;
use crate::os::{self, DirEntry};
use crate::pattern::LikeMatcher;
use crate::script::context::FileContext;
use crate::script::generator::{GenPtr, Generator};

pub trait Definition {
    fn has_next(&mut self, env: &Env) -> Result<bool>;

    /// The current element.  Only meaningful after `has_next` returned `true`.
    fn value(&self) -> String;

    fn reset(&mut self);

    /// The file context this definition keeps loaded with its current
    /// element, if any.
    fn file_context(&self) -> Option<Rc<FileContext>> {
        None
    }
}

pub type DefPtr = Box<dyn Definition>;

/// Pull every element.  The definition is left reset.
pub fn collect(def: &mut dyn Definition, env: &Env) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let pulled = drain(def, env, |v| out.push(v));
    def.reset();
    pulled.map(|()| out)
}

/// Number of elements.  The definition is left reset.
pub fn count(def: &mut dyn Definition, env: &Env) -> Result<usize> {
    let mut n = 0;
    let pulled = drain(def, env, |_| n += 1);
    def.reset();
    pulled.map(|()| n)
}

fn drain(def: &mut dyn Definition, env: &Env, mut f: impl FnMut(String)) -> Result<()> {
    while def.has_next(env)? {
        f(def.value());
    }
    Ok(())
}

/// A definition used where a list is expected.
pub struct Materialized(pub DefPtr);

impl Generator<Vec<String>> for Materialized {
    fn value(&mut self, env: &Env) -> Result<Vec<String>> {
        collect(self.0.as_mut(), env)
    }
}

/// Whether enumeration leaves this entry out.
fn is_omitted(entry: &DirEntry, env: &Env) -> bool {
    if env.noomit {
        return false;
    }
    if entry.is_dir {
        entry.name == ".git"
    } else {
        os::extension(&entry.name) == "ouro"
    }
}

fn child(rel: &str, name: &str) -> String {
    if rel.is_empty() {
        name.to_string()
    } else {
        os::join(rel, name)
    }
}

fn list_dir(location: &str, rel: &str, env: &Env) -> Vec<DirEntry> {
    let dir = os::join(location, rel);
    match env.fs.read_dir(Path::new(&dir)) {
        Ok(entries) => entries,
        Err(e) => {
            trace!(dir = %dir, error = %e, "directory not readable");
            Vec::new()
        }
    }
}

// ── File system sources ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Files,
    Directories,
    All,
}

impl OsKind {
    /// `files`, `recursivedirectories`, …
    pub fn from_word(word: &str) -> Option<(OsKind, bool)> {
        let (recursive, base) = match word.strip_prefix("recursive") {
            Some(rest) => (true, rest),
            None => (false, word),
        };
        let kind = match base {
            "files" => OsKind::Files,
            "directories" => OsKind::Directories,
            "all" => OsKind::All,
            _ => return None,
        };
        Some((kind, recursive))
    }

    fn wants(self, is_dir: bool) -> bool {
        match self {
            OsKind::Files => !is_dir,
            OsKind::Directories => is_dir,
            OsKind::All => true,
        }
    }
}

struct Frame {
    rel: String,
    entries: Vec<DirEntry>,
    pos: usize,
    depth: usize,
}

/// Entries of the current location.  Elements are paths relative to it.
pub struct OsDefinition {
    kind: OsKind,
    recursive: bool,
    ctx: Rc<FileContext>,
    stack: Vec<Frame>,
    started: bool,
    exhausted: bool,
    index: usize,
    value: String,
}

impl OsDefinition {
    pub fn new(kind: OsKind, recursive: bool, ctx: Rc<FileContext>) -> Self {
        OsDefinition {
            kind,
            recursive,
            ctx,
            stack: Vec::new(),
            started: false,
            exhausted: false,
            index: 0,
            value: String::new(),
        }
    }
}

impl Definition for OsDefinition {
    fn has_next(&mut self, env: &Env) -> Result<bool> {
        if !env.is_running() {
            debug!("definition cancelled");
            self.reset();
            return Ok(false);
        }
        if self.exhausted {
            return Ok(false);
        }
        let location = self.ctx.location.borrow().clone();
        if !self.started {
            self.started = true;
            let entries = list_dir(&location, "", env);
            self.stack.push(Frame { rel: String::new(), entries, pos: 0, depth: 0 });
        }
        loop {
            let Some(frame) = self.stack.last_mut() else {
                self.exhausted = true;
                return Ok(false);
            };
            let Some(entry) = frame.entries.get(frame.pos).cloned() else {
                self.stack.pop();
                continue;
            };
            frame.pos += 1;
            if is_omitted(&entry, env) {
                continue;
            }
            let rel = child(&frame.rel, &entry.name);
            let depth = frame.depth;
            if entry.is_dir && self.recursive {
                let entries = list_dir(&location, &rel, env);
                self.stack.push(Frame { rel: rel.clone(), entries, pos: 0, depth: depth + 1 });
            }
            if self.kind.wants(entry.is_dir) {
                self.ctx.set_index(self.index);
                self.ctx.set_depth(depth);
                self.ctx.load_entry(&rel, Some(entry.is_dir), env);
                self.index += 1;
                self.value = rel;
                return Ok(true);
            }
        }
    }

    fn value(&self) -> String {
        self.value.clone()
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.started = false;
        self.exhausted = false;
        self.index = 0;
    }

    fn file_context(&self) -> Option<Rc<FileContext>> {
        Some(self.ctx.clone())
    }
}

// ── Asterisk patterns ────────────────────────────────────────────────────────

#[derive(Debug)]
enum Segment {
    Literal(String),
    Wild(LikeMatcher),
    /// `**`: zero or more directories.
    Recursive,
}

/// Paths matching a pattern with `*` wildcards, one matcher per segment.
pub struct AsteriskDefinition {
    root: String,
    segments: Vec<Segment>,
    ctx: Rc<FileContext>,
    tasks: Vec<(String, usize)>,
    found: VecDeque<(String, bool)>,
    started: bool,
    exhausted: bool,
    index: usize,
    value: String,
}

impl AsteriskDefinition {
    pub fn new(pattern: &str, ctx: Rc<FileContext>) -> Self {
        let root = if pattern.starts_with('/') { "/".to_string() } else { String::new() };
        let segments = pattern
            .split(['/', '\\'])
            .filter(|s| !s.is_empty() && *s != ".")
            .map(|s| match s {
                "**" => Segment::Recursive,
                s if s.contains('*') => Segment::Wild(LikeMatcher::wildcard(s)),
                s => Segment::Literal(s.to_string()),
            })
            .collect();
        AsteriskDefinition {
            root,
            segments,
            ctx,
            tasks: Vec::new(),
            found: VecDeque::new(),
            started: false,
            exhausted: false,
            index: 0,
            value: String::new(),
        }
    }

    fn path(&self, rel: &str, name: &str) -> String {
        if rel.is_empty() {
            format!("{}{name}", self.root)
        } else {
            os::join(rel, name)
        }
    }

    fn expand(&mut self, rel: String, seg: usize, env: &Env) {
        let location = self.ctx.location.borrow().clone();
        let last = seg + 1 == self.segments.len();
        let dir = if rel.is_empty() { self.root.clone() } else { rel.clone() };
        let mut deeper = Vec::new();
        match &self.segments[seg] {
            Segment::Literal(name) => {
                let entries = list_dir(&location, &dir, env);
                if let Some(e) = entries.iter().find(|e| &e.name == name) {
                    let path = self.path(&rel, name);
                    if last {
                        self.found.push_back((path, e.is_dir));
                    } else if e.is_dir {
                        deeper.push((path, seg + 1));
                    }
                }
            }
            Segment::Wild(matcher) => {
                for e in list_dir(&location, &dir, env) {
                    if is_omitted(&e, env) || !matcher.is_match(&e.name) {
                        continue;
                    }
                    let path = self.path(&rel, &e.name);
                    if last {
                        self.found.push_back((path, e.is_dir));
                    } else if e.is_dir {
                        deeper.push((path, seg + 1));
                    }
                }
            }
            Segment::Recursive => {
                if !last {
                    deeper.push((rel.clone(), seg + 1));
                }
                for e in list_dir(&location, &dir, env) {
                    if is_omitted(&e, env) {
                        continue;
                    }
                    let path = self.path(&rel, &e.name);
                    if last {
                        self.found.push_back((path.clone(), e.is_dir));
                    }
                    if e.is_dir {
                        deeper.push((path, seg));
                    }
                }
            }
        }
        self.tasks.extend(deeper.into_iter().rev());
    }
}

impl Definition for AsteriskDefinition {
    fn has_next(&mut self, env: &Env) -> Result<bool> {
        if !env.is_running() {
            debug!("definition cancelled");
            self.reset();
            return Ok(false);
        }
        if self.exhausted {
            return Ok(false);
        }
        if !self.started {
            self.started = true;
            if !self.segments.is_empty() {
                self.tasks.push((String::new(), 0));
            }
        }
        loop {
            if let Some((path, is_dir)) = self.found.pop_front() {
                self.ctx.set_index(self.index);
                self.ctx.load_entry(&path, Some(is_dir), env);
                self.index += 1;
                self.value = path;
                return Ok(true);
            }
            let Some((rel, seg)) = self.tasks.pop() else {
                self.exhausted = true;
                return Ok(false);
            };
            self.expand(rel, seg, env);
        }
    }

    fn value(&self) -> String {
        self.value.clone()
    }

    fn reset(&mut self) {
        self.tasks.clear();
        self.found.clear();
        self.started = false;
        self.exhausted = false;
        self.index = 0;
    }

    fn file_context(&self) -> Option<Rc<FileContext>> {
        Some(self.ctx.clone())
    }
}

// ── Lists as definitions ─────────────────────────────────────────────────────

pub struct ListDefinition {
    list: GenPtr<Vec<String>>,
    values: Option<Vec<String>>,
    pos: usize,
}

impl ListDefinition {
    pub fn new(list: GenPtr<Vec<String>>) -> Self {
        ListDefinition { list, values: None, pos: 0 }
    }
}

impl Definition for ListDefinition {
    fn has_next(&mut self, env: &Env) -> Result<bool> {
        if !env.is_running() {
            debug!("definition cancelled");
            self.reset();
            return Ok(false);
        }
        if self.values.is_none() {
            self.values = Some(self.list.value(env)?);
            self.pos = 0;
        } else {
            self.pos += 1;
        }
        let len = self.values.as_ref().map_or(0, Vec::len);
        if self.pos < len {
            Ok(true)
        } else {
            self.pos = len;
            Ok(false)
        }
    }

    fn value(&self) -> String {
        self.values.as_ref().and_then(|v| v.get(self.pos)).cloned().unwrap_or_default()
    }

    fn reset(&mut self) {
        self.values = None;
        self.pos = 0;
    }
}

// ── Chains ───────────────────────────────────────────────────────────────────

pub enum ChainPart {
    Definition(DefPtr),
    List(GenPtr<Vec<String>>),
    Str(GenPtr<String>),
}

/// `a, b, c` where at least one part is a definition.
pub struct Chain {
    parts: Vec<ChainPart>,
    current: usize,
    pending: VecDeque<String>,
    loaded: bool,
    value: String,
}

impl Chain {
    pub fn new(parts: Vec<ChainPart>) -> Self {
        Chain { parts, current: 0, pending: VecDeque::new(), loaded: false, value: String::new() }
    }
}

impl Definition for Chain {
    fn has_next(&mut self, env: &Env) -> Result<bool> {
        if !env.is_running() {
            debug!("definition cancelled");
            self.reset();
            return Ok(false);
        }
        while self.current < self.parts.len() {
            match &mut self.parts[self.current] {
                ChainPart::Definition(d) => {
                    if d.has_next(env)? {
                        self.value = d.value();
                        return Ok(true);
                    }
                }
                ChainPart::List(l) => {
                    if !self.loaded {
                        self.pending = l.value(env)?.into();
                        self.loaded = true;
                    }
                    if let Some(v) = self.pending.pop_front() {
                        self.value = v;
                        return Ok(true);
                    }
                }
                ChainPart::Str(s) => {
                    if !self.loaded {
                        self.loaded = true;
                        self.value = s.value(env)?;
                        return Ok(true);
                    }
                }
            }
            self.current += 1;
            self.loaded = false;
        }
        Ok(false)
    }

    fn value(&self) -> String {
        self.value.clone()
    }

    fn reset(&mut self) {
        for part in &mut self.parts {
            if let ChainPart::Definition(d) = part {
                d.reset();
            }
        }
        self.current = 0;
        self.pending.clear();
        self.loaded = false;
    }
}

// ── Ternary ──────────────────────────────────────────────────────────────────

pub struct DefinitionTernary {
    cond: GenPtr<bool>,
    left: DefPtr,
    right: DefPtr,
    chosen: Option<bool>,
}

impl DefinitionTernary {
    pub fn new(cond: GenPtr<bool>, left: DefPtr, right: DefPtr) -> Self {
        DefinitionTernary { cond, left, right, chosen: None }
    }
}

impl Definition for DefinitionTernary {
    fn has_next(&mut self, env: &Env) -> Result<bool> {
        if !env.is_running() {
            debug!("definition cancelled");
            self.reset();
            return Ok(false);
        }
        let left = match self.chosen {
            Some(c) => c,
            None => {
                let c = self.cond.value(env)?;
                self.chosen = Some(c);
                c
            }
        };
        if left {
            self.left.has_next(env)
        } else {
            self.right.has_next(env)
        }
    }

    fn value(&self) -> String {
        match self.chosen {
            Some(false) => self.right.value(),
            _ => self.left.value(),
        }
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.chosen = None;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::os::MemFs;
    use crate::script::generator::constant;
    use crate::script::time::Time;
    use crate::var::var;

    fn tree() -> Env {
        let stamp = Time::date(1, 1, 2020);
        let mut fs = MemFs::new();
        fs.add_file("/w/a.txt", 1, stamp);
        fs.add_file("/w/b.rs", 2, stamp);
        fs.add_file("/w/script.ouro", 2, stamp);
        fs.add_file("/w/sub/c.txt", 3, stamp);
        fs.add_file("/w/sub/deep/d.txt", 4, stamp);
        fs.add_file("/w/.git/config", 4, stamp);
        Env::new(Rc::new(FixedClock(stamp)), Rc::new(fs))
    }

    fn ctx() -> Rc<FileContext> {
        FileContext::for_paths(var("/w".to_string()))
    }

    #[test]
    fn files_are_relative_and_omit_scripts() {
        let env = tree();
        let mut d = OsDefinition::new(OsKind::Files, false, ctx());
        assert_eq!(collect(&mut d, &env).unwrap(), vec!["a.txt", "b.rs"]);
    }

    #[test]
    fn recursive_all_is_preorder() {
        let env = tree();
        let mut d = OsDefinition::new(OsKind::All, true, ctx());
        assert_eq!(
            collect(&mut d, &env).unwrap(),
            vec!["a.txt", "b.rs", "sub", "sub/c.txt", "sub/deep", "sub/deep/d.txt"]
        );
    }

    #[test]
    fn noomit_includes_git_and_scripts() {
        let env = tree().with_noomit(true);
        let mut d = OsDefinition::new(OsKind::Directories, false, ctx());
        assert_eq!(collect(&mut d, &env).unwrap(), vec![".git", "sub"]);
    }

    #[test]
    fn restartable_after_exhaustion_and_reset() {
        let env = tree();
        let mut d = OsDefinition::new(OsKind::Files, true, ctx());
        let first = collect(&mut d, &env).unwrap();
        assert_eq!(collect(&mut d, &env).unwrap(), first);
        assert!(d.has_next(&env).unwrap());
        d.reset();
        assert_eq!(collect(&mut d, &env).unwrap(), first);
    }

    #[test]
    fn exhaustion_sticks_until_reset() {
        let env = tree();
        let fc = ctx();
        let sources: Vec<DefPtr> = vec![
            Box::new(OsDefinition::new(OsKind::Files, true, fc.clone())),
            Box::new(AsteriskDefinition::new("**/*.txt", fc.clone())),
            Box::new(ListDefinition::new(constant(vec!["x".to_string()]))),
            Box::new(Chain::new(vec![
                ChainPart::Str(constant("x".to_string())),
                ChainPart::Definition(Box::new(OsDefinition::new(OsKind::Files, false, fc.clone()))),
            ])),
            Box::new(DefinitionTernary::new(
                constant(true),
                Box::new(OsDefinition::new(OsKind::Files, false, fc.clone())),
                Box::new(ListDefinition::new(constant(Vec::new()))),
            )),
        ];
        for mut d in sources {
            let mut n = 0;
            while d.has_next(&env).unwrap() {
                n += 1;
            }
            assert!(n > 0);
            assert!(!d.has_next(&env).unwrap());
            assert!(!d.has_next(&env).unwrap());
            d.reset();
            assert!(d.has_next(&env).unwrap());
            d.reset();
        }
    }

    #[test]
    fn index_restarts_after_reset() {
        let env = tree();
        let fc = ctx();
        let mut d = OsDefinition::new(OsKind::Files, false, fc.clone());
        while d.has_next(&env).unwrap() {}
        assert_eq!(*fc.index.borrow(), crate::script::number::Number::Int(1));
        d.reset();
        assert!(d.has_next(&env).unwrap());
        assert_eq!(*fc.index.borrow(), crate::script::number::Number::Int(0));
        d.reset();
        assert_eq!(count(&mut d, &env).unwrap(), 2);
    }

    #[test]
    fn asterisk_patterns() {
        let env = tree();
        let mut d = AsteriskDefinition::new("*.txt", ctx());
        assert_eq!(collect(&mut d, &env).unwrap(), vec!["a.txt"]);
        let mut d = AsteriskDefinition::new("**/*.txt", ctx());
        assert_eq!(collect(&mut d, &env).unwrap(), vec!["a.txt", "sub/c.txt", "sub/deep/d.txt"]);
        let mut d = AsteriskDefinition::new("s*/*", ctx());
        assert_eq!(collect(&mut d, &env).unwrap(), vec!["sub/c.txt", "sub/deep"]);
    }

    #[test]
    fn chain_visits_parts_in_order() {
        let env = tree();
        let parts = vec![
            ChainPart::Str(constant("x".to_string())),
            ChainPart::Definition(Box::new(OsDefinition::new(OsKind::Files, false, ctx()))),
            ChainPart::List(constant(vec!["y".to_string(), "z".to_string()])),
        ];
        let mut c = Chain::new(parts);
        assert_eq!(collect(&mut c, &env).unwrap(), vec!["x", "a.txt", "b.rs", "y", "z"]);
        assert_eq!(collect(&mut c, &env).unwrap().len(), 5);
    }

    #[test]
    fn cancellation_resets() {
        let env = tree();
        let mut d = OsDefinition::new(OsKind::Files, true, ctx());
        assert!(d.has_next(&env).unwrap());
        env.cancel.cancel();
        assert!(!d.has_next(&env).unwrap());
        env.cancel.reset();
        assert_eq!(collect(&mut d, &env).unwrap().len(), 4);
    }
}
