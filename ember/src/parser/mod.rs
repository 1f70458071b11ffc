//! Parser boundary
//!
//! The interpreter does not own a surface grammar. Anything that turns
//! source text into `Nodes` can be plugged in through `SourceParser`; the
//! built-in `JsonParser` reads a tree that was serialized as JSON.

use crate::ast::Nodes;
use crate::error::{Error, Result};

/// Turns source text into a statement sequence
pub trait SourceParser {
    fn parse(&self, source: &str) -> Result<Nodes>;
}

/// Reads an AST serialized as a JSON array of nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl SourceParser for JsonParser {
    fn parse(&self, source: &str) -> Result<Nodes> {
        serde_json::from_str(source)
            .map_err(|e| Error::parse_error(format!("line {}, column {}: {e}", e.line(), e.column())))
    }
}

impl<F> SourceParser for F
where
    F: Fn(&str) -> Result<Nodes>,
{
    fn parse(&self, source: &str) -> Result<Nodes> {
        self(source)
    }
}

/// Parse with the built-in JSON parser
pub fn parse(source: &str) -> Result<Nodes> {
    JsonParser.parse(source)
}
