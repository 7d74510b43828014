//! ouro: a file automation scripting language.
//!
//! Scripts are compiled once into trees of typed, lazily evaluated
//! generators and then run against an injected clock and file system.
//!
//! | Module | Role |
//! |--------|------|
//! | [`lexer`], [`token`] | source text to tokens, bracket-aware token windows |
//! | [`script`] | values, generators, definitions, the typed parser and commands |
//! | [`pattern`] | LIKE pattern classification and matching |
//! | [`attr`], [`var`] | file attributes and variable cells |
//! | [`os`], [`clock`], [`cancel`], [`env`] | the runtime boundary |
//! | [`config`], [`cli`], [`logging`] | the `ouro` binary's plumbing |
//!
//! ```rust
//! use std::rc::Rc;
//! use ouro::clock::FixedClock;
//! use ouro::env::{BufferPrinter, Env};
//! use ouro::os::MemFs;
//! use ouro::script::{Context, Script, Time};
//!
//! let printer = Rc::new(BufferPrinter::new());
//! let env = Env::new(Rc::new(FixedClock(Time::date(1, 1, 2024))), Rc::new(MemFs::new()))
//!     .with_printer(printer.clone());
//! let mut script = Script::parse("x = 6; print x * 7", Context::new("/", Vec::new()), env).unwrap();
//! assert_eq!(script.run().unwrap(), 0);
//! assert_eq!(printer.lines(), vec!["42"]);
//! ```

pub mod attr;
pub mod cancel;
pub mod cli;
pub mod clock;
pub mod config;
pub mod env;
pub mod error;
pub mod lexer;
pub mod logging;
pub mod os;
pub mod pattern;
pub mod script;
pub mod token;
pub mod var;

pub use error::{Error, Result};
