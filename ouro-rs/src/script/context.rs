//! Name resolution at parse time and per-element attribute loading.
//!
//! The parser keeps a [`Context`]: the global constants, the user variables,
//! a stack of file contexts (one per enclosing `where`, `order by` or loop
//! over a collection) and a stack of locations (one per `inside`).
//!
//! Name lookup order:
//!
//! | Step | Names |
//! |------|-------|
//! | 1 | `this`, `index` of the innermost file context; `location` |
//! | 2 | user variables |
//! | 3 | global constants |
//! | 4 | file attributes of the innermost file context |
//!
//! Resolving an attribute sets its bit in the file context's [`AttrMask`],
//! but only once the caller has accepted the attribute's kind.  The loader
//! then fills exactly the masked fields for each element.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use tracing::trace;

use crate::attr::{AttrMask, Attribute};
use crate::env::Env;
use crate::error::{Error, Result};
use crate::os;
use crate::script::generator::GenPtr;
use crate::script::number::Number;
use crate::script::period::Period;
use crate::script::time::Time;
use crate::script::value::Value;
use crate::var::{var, Var, VarStore, Variable};

// ── File context ─────────────────────────────────────────────────────────────

/// Cells describing the current element of a collection.
#[derive(Debug)]
pub struct FileContext {
    /// `None` inside `n times` loops, which only have an index.
    pub this: Option<Variable>,
    pub index: Var<Number>,
    pub location: Var<String>,
    mask: Cell<AttrMask>,
    depth: Var<Number>,
    access: Var<Time>,
    change: Var<Time>,
    creation: Var<Time>,
    modification: Var<Time>,
    archive: Var<bool>,
    compressed: Var<bool>,
    empty: Var<bool>,
    encrypted: Var<bool>,
    exists: Var<bool>,
    hidden: Var<bool>,
    is_directory: Var<bool>,
    is_file: Var<bool>,
    readonly: Var<bool>,
    size: Var<Number>,
    lifetime: Var<Period>,
    drive: Var<String>,
    extension: Var<String>,
    fullname: Var<String>,
    name: Var<String>,
    parent: Var<String>,
    path: Var<String>,
}

impl FileContext {
    pub fn new(this: Option<Variable>, location: Var<String>) -> Self {
        FileContext {
            this,
            index: var(Number::Int(0)),
            location,
            mask: Cell::new(AttrMask::NONE),
            depth: var(Number::Int(0)),
            access: var(Time::default()),
            change: var(Time::default()),
            creation: var(Time::default()),
            modification: var(Time::default()),
            archive: var(false),
            compressed: var(false),
            empty: var(false),
            encrypted: var(false),
            exists: var(false),
            hidden: var(false),
            is_directory: var(false),
            is_file: var(false),
            readonly: var(false),
            size: var(Number::Int(0)),
            lifetime: var(Period::default()),
            drive: var(String::new()),
            extension: var(String::new()),
            fullname: var(String::new()),
            name: var(String::new()),
            parent: var(String::new()),
            path: var(String::new()),
        }
    }

    /// Context whose elements are paths.
    pub fn for_paths(location: Var<String>) -> Rc<Self> {
        Rc::new(FileContext::new(Some(Variable::Str(var(String::new()))), location))
    }

    /// `true` when elements are strings, so file attributes apply.
    pub fn has_attributes(&self) -> bool {
        matches!(self.this, Some(Variable::Str(_)))
    }

    pub fn mask(&self) -> AttrMask {
        self.mask.get()
    }

    pub fn set_mask(&self, mask: AttrMask) {
        self.mask.set(mask);
    }

    pub fn require(&self, bits: AttrMask) {
        self.mask.set(self.mask.get() | bits);
    }

    pub fn attribute(&self, a: Attribute) -> Variable {
        match a {
            Attribute::Access => Variable::Time(self.access.clone()),
            Attribute::Change => Variable::Time(self.change.clone()),
            Attribute::Creation => Variable::Time(self.creation.clone()),
            Attribute::Modification => Variable::Time(self.modification.clone()),
            Attribute::Archive => Variable::Bool(self.archive.clone()),
            Attribute::Compressed => Variable::Bool(self.compressed.clone()),
            Attribute::Empty => Variable::Bool(self.empty.clone()),
            Attribute::Encrypted => Variable::Bool(self.encrypted.clone()),
            Attribute::Exists => Variable::Bool(self.exists.clone()),
            Attribute::Hidden => Variable::Bool(self.hidden.clone()),
            Attribute::IsDirectory => Variable::Bool(self.is_directory.clone()),
            Attribute::IsFile => Variable::Bool(self.is_file.clone()),
            Attribute::Readonly => Variable::Bool(self.readonly.clone()),
            Attribute::Depth => Variable::Number(self.depth.clone()),
            Attribute::Size => Variable::Number(self.size.clone()),
            Attribute::Lifetime => Variable::Period(self.lifetime.clone()),
            Attribute::Drive => Variable::Str(self.drive.clone()),
            Attribute::Extension => Variable::Str(self.extension.clone()),
            Attribute::Fullname => Variable::Str(self.fullname.clone()),
            Attribute::Name => Variable::Str(self.name.clone()),
            Attribute::Parent => Variable::Str(self.parent.clone()),
            Attribute::Path => Variable::Str(self.path.clone()),
        }
    }

    pub fn set_index(&self, index: usize) {
        *self.index.borrow_mut() = Number::from(index);
    }

    pub fn set_depth(&self, depth: usize) {
        *self.depth.borrow_mut() = Number::from(depth);
    }

    /// Store a non-path element.
    pub fn set_this(&self, value: Value) {
        if let Some(this) = &self.this {
            this.set(value);
        }
    }

    /// Store a path element and fill the masked attributes.
    pub fn load(&self, value: &str, env: &Env) {
        self.load_entry(value, None, env);
    }

    /// Like [`load`](Self::load), for enumerated entries whose kind is
    /// already known.  `exists`, `isdirectory` and `isfile` then cost no
    /// metadata call.
    pub fn load_entry(&self, value: &str, is_dir: Option<bool>, env: &Env) {
        if let Some(Variable::Str(this)) = &self.this {
            this.borrow_mut().clear();
            this.borrow_mut().push_str(value);
        }
        let mask = self.mask.get();
        if mask.is_empty() {
            return;
        }

        let path = os::join(&self.location.borrow(), value);
        let by_kind = AttrMask::IS_DIRECTORY | AttrMask::IS_FILE | AttrMask::EXISTS;
        let needs_metadata = mask.intersects(AttrMask::NEEDS_METADATA & !by_kind)
            || (is_dir.is_none() && mask.intersects(by_kind));
        let meta = if needs_metadata {
            trace!(path = %path, ?mask, "loading attributes");
            env.fs.metadata(Path::new(&path))
        } else {
            None
        };
        let is_dir = if needs_metadata { meta.as_ref().map(|m| m.is_dir) } else { is_dir };

        if mask.intersects(by_kind) {
            *self.exists.borrow_mut() = is_dir.is_some();
            *self.is_directory.borrow_mut() = is_dir == Some(true);
            *self.is_file.borrow_mut() = is_dir == Some(false);
        }
        if mask.contains(AttrMask::SIZE) {
            let size = match (&meta, is_dir) {
                (Some(_), Some(true)) => env.fs.dir_size(Path::new(&path)),
                (Some(m), _) => m.size,
                (None, _) => 0,
            };
            *self.size.borrow_mut() = Number::Int(size as i64);
        }
        if mask.contains(AttrMask::EMPTY) {
            *self.empty.borrow_mut() = match (&meta, is_dir) {
                (Some(_), Some(true)) => env.fs.is_empty_dir(Path::new(&path)),
                (Some(m), _) => m.size == 0,
                (None, _) => false,
            };
        }

        let stamp = |t: Option<Time>| t.unwrap_or_default();
        if mask.contains(AttrMask::ACCESS) {
            *self.access.borrow_mut() = stamp(meta.as_ref().and_then(|m| m.access));
        }
        if mask.contains(AttrMask::CHANGE) {
            *self.change.borrow_mut() = stamp(meta.as_ref().and_then(|m| m.change));
        }
        if mask.contains(AttrMask::CREATION) {
            *self.creation.borrow_mut() = stamp(meta.as_ref().and_then(|m| m.creation));
        }
        if mask.contains(AttrMask::MODIFICATION) {
            *self.modification.borrow_mut() = stamp(meta.as_ref().and_then(|m| m.modification));
        }
        if mask.contains(AttrMask::LIFETIME) {
            *self.lifetime.borrow_mut() = match meta.as_ref().and_then(|m| m.creation) {
                Some(created) => Period::between(&env.clock.now(), &created),
                None => Period::default(),
            };
        }

        let flag = |f: fn(&os::Metadata) -> bool| meta.as_ref().is_some_and(f);
        if mask.contains(AttrMask::ARCHIVE) {
            *self.archive.borrow_mut() = flag(|m| m.archive);
        }
        if mask.contains(AttrMask::COMPRESSED) {
            *self.compressed.borrow_mut() = flag(|m| m.compressed);
        }
        if mask.contains(AttrMask::ENCRYPTED) {
            *self.encrypted.borrow_mut() = flag(|m| m.encrypted);
        }
        if mask.contains(AttrMask::HIDDEN) {
            *self.hidden.borrow_mut() = flag(|m| m.hidden);
        }
        if mask.contains(AttrMask::READONLY) {
            *self.readonly.borrow_mut() = flag(|m| m.readonly);
        }

        if mask.contains(AttrMask::PATH) {
            *self.path.borrow_mut() = path.clone();
        }
        if mask.contains(AttrMask::FULLNAME) {
            *self.fullname.borrow_mut() = os::fullname(&path);
        }
        if mask.contains(AttrMask::NAME) {
            *self.name.borrow_mut() = os::name(&path);
        }
        if mask.contains(AttrMask::EXTENSION) {
            *self.extension.borrow_mut() = os::extension(&path);
        }
        if mask.contains(AttrMask::PARENT) {
            *self.parent.borrow_mut() = os::parent(&path);
        }
        if mask.contains(AttrMask::DRIVE) {
            *self.drive.borrow_mut() = os::drive(&path);
        }
    }
}

// ── Parse-time context ───────────────────────────────────────────────────────

/// What a name resolved to.
enum Resolved {
    Plain(Variable),
    Attribute(Rc<FileContext>, Attribute),
}

#[derive(Debug)]
pub struct Context {
    globals: VarStore,
    /// User variables, innermost block last.
    variables: Vec<VarStore>,
    files: Vec<Rc<FileContext>>,
    /// `index` of every open loop, file contexts included.
    indices: Vec<Var<Number>>,
    locations: Vec<Var<String>>,
}

impl Context {
    pub fn new(location: &str, arguments: Vec<String>) -> Self {
        let mut globals = VarStore::new();
        globals.insert(
            "alphabet",
            Variable::List(var(('a'..='z').map(String::from).collect())),
        );
        globals.set_str("ascii", (' '..='~').collect::<String>());
        globals.insert("arguments", Variable::List(var(arguments)));
        globals.set_str("root", location);
        Context {
            globals,
            variables: vec![VarStore::new()],
            files: Vec::new(),
            indices: Vec::new(),
            locations: vec![var(location.to_string())],
        }
    }

    /// Add a constant visible to scripts, e.g. from the config file.
    pub fn add_global(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_lowercase(), Variable::from_value(value));
    }

    pub fn location(&self) -> Var<String> {
        match self.locations.last() {
            Some(l) => l.clone(),
            None => var(String::new()),
        }
    }

    pub fn file(&self) -> Option<&Rc<FileContext>> {
        self.files.last()
    }

    /// Make `ctx` the innermost file context until the matching
    /// [`pop_file`](Self::pop_file).
    pub fn push_file(&mut self, ctx: Rc<FileContext>) {
        self.indices.push(ctx.index.clone());
        self.files.push(ctx);
    }

    pub fn pop_file(&mut self) {
        self.indices.pop();
        self.files.pop();
    }

    /// Make `index` the innermost loop index for a loop without elements.
    pub fn push_index(&mut self, index: Var<Number>) {
        self.indices.push(index);
    }

    pub fn pop_index(&mut self) {
        self.indices.pop();
    }

    pub fn push_location(&mut self, location: Var<String>) {
        self.locations.push(location);
    }

    pub fn pop_location(&mut self) {
        self.locations.pop();
    }

    // ── Variables ────────────────────────────────────────────────────────────

    /// Open a block.  Variables declared until the matching
    /// [`pop_scope`](Self::pop_scope) are visible only inside it.
    pub fn push_scope(&mut self) {
        self.variables.push(VarStore::new());
    }

    /// Close the innermost block.  The outermost scope is never dropped.
    pub fn pop_scope(&mut self) {
        if self.variables.len() > 1 {
            self.variables.pop();
        }
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    /// Innermost variable called `name`.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn declare(&mut self, name: &str, variable: Variable) {
        if let Some(scope) = self.variables.last_mut() {
            scope.insert(name, variable);
        }
    }

    /// Names that can never be assigned.
    pub fn is_reserved(&self, name: &str) -> bool {
        matches!(name, "this" | "index" | "location" | "now" | "today" | "yesterday" | "tomorrow")
            || self.globals.contains(name)
            || Attribute::from_name(name).is_some()
    }

    fn resolve(&self, name: &str, line: usize) -> Result<Option<Resolved>> {
        match name {
            "this" => {
                return Ok(self
                    .files
                    .iter()
                    .rev()
                    .find_map(|f| f.this.clone())
                    .map(Resolved::Plain));
            }
            "index" => {
                if let Some(i) = self.indices.last() {
                    return Ok(Some(Resolved::Plain(Variable::Number(i.clone()))));
                }
            }
            "location" => return Ok(Some(Resolved::Plain(Variable::Str(self.location())))),
            _ => {}
        }
        if let Some(v) = self.variable(name) {
            return Ok(Some(Resolved::Plain(v.clone())));
        }
        if let Some(v) = self.globals.get(name) {
            return Ok(Some(Resolved::Plain(v.clone())));
        }
        if let Some(a) = Attribute::from_name(name) {
            return match self.files.last() {
                Some(f) if f.has_attributes() => Ok(Some(Resolved::Attribute(f.clone(), a))),
                _ => Err(Error::syntax(format!("the value of variable '{name}' is undefined here"), line)),
            };
        }
        Ok(None)
    }

    /// Resolve `name` and convert it with `pick`.  An attribute's bit is set
    /// only when `pick` accepts it.
    pub fn typed<T>(
        &self,
        name: &str,
        line: usize,
        pick: fn(&Variable) -> Option<GenPtr<T>>,
    ) -> Result<Option<GenPtr<T>>> {
        match self.resolve(name, line)? {
            None => Ok(None),
            Some(Resolved::Plain(v)) => Ok(pick(&v)),
            Some(Resolved::Attribute(ctx, a)) => {
                let gen = pick(&ctx.attribute(a));
                if gen.is_some() {
                    ctx.require(a.bit());
                }
                Ok(gen)
            }
        }
    }

    /// Whether `name` resolves to anything, without touching any mask.
    pub fn knows(&self, name: &str) -> bool {
        matches!(self.resolve(name, 0), Ok(Some(_)))
    }

    // ── Mask snapshots ───────────────────────────────────────────────────────

    /// Masks of every open file context, for undoing a failed parse attempt.
    pub fn masks(&self) -> Vec<AttrMask> {
        self.files.iter().map(|f| f.mask()).collect()
    }

    pub fn restore_masks(&self, masks: &[AttrMask]) {
        for (f, m) in self.files.iter().zip(masks) {
            f.set_mask(*m);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::os::MemFs;
    use crate::script::generator::Generator;
    use crate::script::value::Kind;

    fn env_with(fs: MemFs) -> (Env, Rc<MemFs>) {
        let fs = Rc::new(fs);
        let env = Env::new(Rc::new(FixedClock(Time::date(1, 1, 2024))), fs.clone());
        (env, fs)
    }

    #[test]
    fn block_variables_disappear_with_the_block() {
        let mut ctx = Context::new("/w", Vec::new());
        ctx.declare("outer", Variable::empty(Kind::Number));
        ctx.push_scope();
        ctx.declare("inner", Variable::empty(Kind::String));
        ctx.push_scope();
        assert!(ctx.has_variable("outer"));
        assert!(ctx.has_variable("inner"));
        ctx.pop_scope();
        ctx.pop_scope();
        assert!(ctx.has_variable("outer"));
        assert!(!ctx.has_variable("inner"));
        ctx.pop_scope();
        assert!(ctx.has_variable("outer"));
    }

    #[test]
    fn index_follows_the_innermost_loop() {
        let mut ctx = Context::new("/w", Vec::new());
        assert!(!ctx.knows("index"));
        let files = FileContext::for_paths(var("/w".to_string()));
        files.set_index(4);
        ctx.push_file(files);
        let counter = var(Number::Int(7));
        ctx.push_index(counter);
        let read = |ctx: &Context| {
            let mut g = ctx.typed("index", 1, Variable::as_number).unwrap().unwrap();
            g.value(&Env::system()).unwrap()
        };
        assert_eq!(read(&ctx), Number::Int(7));
        ctx.pop_index();
        assert_eq!(read(&ctx), Number::Int(4));
        ctx.pop_file();
        assert!(!ctx.knows("index"));
    }

    #[test]
    fn inner_declaration_shadows_until_popped() {
        let mut ctx = Context::new("/w", Vec::new());
        ctx.declare("x", Variable::empty(Kind::Number));
        ctx.push_scope();
        ctx.declare("x", Variable::empty(Kind::String));
        assert_eq!(ctx.variable("x").map(Variable::kind), Some(Kind::String));
        ctx.pop_scope();
        assert_eq!(ctx.variable("x").map(Variable::kind), Some(Kind::Number));
    }

    #[test]
    fn attribute_outside_file_context_is_an_error() {
        let ctx = Context::new("/w", Vec::new());
        let e = ctx.typed("size", 3, Variable::as_number).unwrap_err();
        assert_eq!(e.message(), "the value of variable 'size' is undefined here");
        assert_eq!(e.line(), Some(3));
    }

    #[test]
    fn mask_set_only_on_accepted_kind() {
        let mut ctx = Context::new("/w", Vec::new());
        let fc = FileContext::for_paths(ctx.location());
        ctx.push_file(fc.clone());
        assert!(ctx.typed("size", 1, Variable::as_time).unwrap().is_none());
        assert!(fc.mask().is_empty());
        assert!(ctx.typed("size", 1, Variable::as_number).unwrap().is_some());
        ctx.pop_file();
        assert_eq!(fc.mask(), AttrMask::SIZE);
    }

    #[test]
    fn user_variables_shadow_globals() {
        let mut ctx = Context::new("/w", Vec::new());
        ctx.declare("root", Variable::from_value(Value::Str("mine".into())));
        let mut g = ctx.typed("root", 1, Variable::as_string).unwrap().unwrap();
        let env = Env::system();
        assert_eq!(g.value(&env).unwrap(), "mine");
    }

    #[test]
    fn loader_skips_metadata_for_path_fields() {
        let mut fs = MemFs::new();
        fs.add_file("/w/a.txt", 10, Time::date(1, 1, 2020));
        let (env, fs) = env_with(fs);
        let fc = FileContext::for_paths(var("/w".to_string()));
        fc.require(AttrMask::NAME | AttrMask::EXTENSION);
        fc.load("a.txt", &env);
        assert_eq!(fs.metadata_calls(), 0);
        assert_eq!(*fc.name.borrow(), "a");
        assert_eq!(*fc.extension.borrow(), "txt");

        fc.require(AttrMask::SIZE | AttrMask::MODIFICATION);
        fc.load("a.txt", &env);
        assert_eq!(fs.metadata_calls(), 1);
        assert_eq!(*fc.size.borrow(), Number::Int(10));
    }

    #[test]
    fn known_kind_answers_exists_without_metadata() {
        let mut fs = MemFs::new();
        fs.add_dir("/w/sub", Time::date(1, 1, 2020));
        let (env, fs) = env_with(fs);
        let fc = FileContext::for_paths(var("/w".to_string()));
        fc.require(AttrMask::IS_DIRECTORY | AttrMask::EXISTS);
        fc.load_entry("sub", Some(true), &env);
        assert_eq!(fs.metadata_calls(), 0);
        assert!(*fc.is_directory.borrow());
        fc.load("missing", &env);
        assert_eq!(fs.metadata_calls(), 1);
        assert!(!*fc.exists.borrow());
    }
}
