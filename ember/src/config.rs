//! Interpreter configuration
//!
//! Every field has a default, so a TOML file only lists what it changes:
//!
//! ```toml
//! max_depth = 5000
//! stack_grow_size = 8388608
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default limit on nested method activations
pub const MAX_RECURSION_DEPTH: usize = 100_000;
/// Remaining stack below which evaluation switches to a fresh segment
pub const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each stack segment allocated by `stacker`
pub const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Limits and stack sizing for one interpreter
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterpConfig {
    /// Nested method activations allowed before `StackOverflowError`
    pub max_depth: usize,
    pub stack_red_zone: usize,
    pub stack_grow_size: usize,
}

impl Default for InterpConfig {
    fn default() -> Self {
        InterpConfig {
            max_depth: MAX_RECURSION_DEPTH,
            stack_red_zone: STACK_RED_ZONE,
            stack_grow_size: STACK_GROW_SIZE,
        }
    }
}

impl InterpConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_stack_red_zone(mut self, bytes: usize) -> Self {
        self.stack_red_zone = bytes;
        self
    }

    pub fn with_stack_grow_size(mut self, bytes: usize) -> Self {
        self.stack_grow_size = bytes;
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::config_error(e.to_string()))
    }

    /// Read a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io_error(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
