//! Runtime environment passed to every evaluation call.
//!
//! An [`Env`] bundles the collaborators that sit outside the language core:
//! the time source, the file system, the cancellation token and the sink for
//! `print`.  It is cheap to clone; clones share everything.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cancel::CancelToken;
use crate::clock::{Clock, SystemClock};
use crate::os::{FileSystem, RealFs};

/// Destination of `print` output.
pub trait Printer {
    fn print(&self, line: &str);
}

#[derive(Debug, Default)]
pub struct StdoutPrinter;

impl Printer for StdoutPrinter {
    fn print(&self, line: &str) {
        println!("{line}");
    }
}

/// Collects printed lines in memory.
#[derive(Debug, Default)]
pub struct BufferPrinter {
    lines: RefCell<Vec<String>>,
}

impl BufferPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl Printer for BufferPrinter {
    fn print(&self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}

#[derive(Clone)]
pub struct Env {
    pub clock: Rc<dyn Clock>,
    pub fs: Rc<dyn FileSystem>,
    pub cancel: CancelToken,
    pub printer: Rc<dyn Printer>,
    /// Enumerate `.git` directories and script files too.
    pub noomit: bool,
}

impl Env {
    pub fn new(clock: Rc<dyn Clock>, fs: Rc<dyn FileSystem>) -> Self {
        Env {
            clock,
            fs,
            cancel: CancelToken::new(),
            printer: Rc::new(StdoutPrinter),
            noomit: false,
        }
    }

    /// System clock, real file system, stdout.
    pub fn system() -> Self {
        Env::new(Rc::new(SystemClock), Rc::new(RealFs))
    }

    pub fn with_printer(mut self, printer: Rc<dyn Printer>) -> Self {
        self.printer = printer;
        self
    }

    pub fn with_noomit(mut self, noomit: bool) -> Self {
        self.noomit = noomit;
        self
    }

    pub fn is_running(&self) -> bool {
        self.cancel.is_running()
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("cancel", &self.cancel)
            .field("noomit", &self.noomit)
            .finish_non_exhaustive()
    }
}
