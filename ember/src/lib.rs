//! Ember Interpreter Library
//!
//! Tree-walking evaluator for Ember, a small dynamic object-oriented
//! scripting language with open classes, closures and string interpolation.

pub mod ast;
pub mod config;
pub mod error;
pub mod interp;
pub mod parser;

pub use config::InterpConfig;
pub use error::{Error, Result};
pub use interp::{Interpreter, Value};
