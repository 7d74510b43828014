//! The language core.
//!
//! | Module | Role |
//! |--------|------|
//! | [`value`], [`number`], [`time`], [`period`] | value kinds and their arithmetic |
//! | [`generator`] | lazy typed value producers and constant folding |
//! | [`definition`], [`filter`], [`order`] | lazy path sequences and their filters |
//! | [`compare`] | comparisons, `in` and `like` |
//! | [`function`] | the built-in function catalog |
//! | [`context`] | variable scopes and the iteration context stack |
//! | [`parse`] | the typed expression parser |
//! | [`command`] | statements and the script runner |

pub mod command;
pub mod compare;
pub mod context;
pub mod definition;
pub mod filter;
pub mod function;
pub mod generator;
pub mod number;
pub mod order;
pub mod parse;
pub mod period;
pub mod time;
pub mod value;

pub use command::Script;
pub use context::Context;
pub use number::Number;
pub use parse::{Parser, Typed};
pub use period::Period;
pub use time::Time;
pub use value::{Kind, Value};
