//! Abstract Syntax Tree definitions
//!
//! The tree is produced by an external parser and consumed by the
//! interpreter as-is; every node is serde-serializable so a tree can be
//! handed over as JSON.

mod node;

pub use node::*;
