//! Tree-walking interpreter
//!
//! Evaluates an AST directly against a chain of scope frames. Classes live
//! in an arena and are reopenable at any time; methods, whether written in
//! the language or natively, share one per-class table.

mod class;
mod env;
mod error;
mod eval;
mod interpolate;
pub mod natives;
mod value;

pub use class::{Ancestors, Class, ClassId, ClassTable, Method, MethodBody, NativeFn};
pub use env::{ActiveMethod, Context, FrameCore, FrameKind, NameKind, Scope};
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::{CoreClasses, Flow, Interpreter, Output};
pub use interpolate::{segments, Segment};
pub use value::{Closure, Interner, Object, ObjectRef, Payload, Symbol, Value};
