//! Runtime errors for the interpreter

use std::fmt;

/// Runtime error during evaluation
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Extending a parent class name that does not resolve to a class
    UndefinedClass,
    /// No method with the name on the receiver's class chain
    NoMethod,
    /// A native method got an unusable argument shape
    ArgumentError,
    /// A value was used where another kind was required
    TypeError,
    /// Method activations nested deeper than the configured limit
    StackOverflow,
    /// IO error
    IoError,
}

impl RuntimeError {
    pub fn undefined_class(name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::UndefinedClass,
            message: format!("cannot extend undefined class \"{name}\""),
        }
    }

    pub fn no_method(class_name: &str, method: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::NoMethod,
            message: format!("undefined method `{method}` for {class_name}"),
        }
    }

    pub fn argument_error(msg: impl Into<String>) -> Self {
        RuntimeError {
            kind: ErrorKind::ArgumentError,
            message: msg.into(),
        }
    }

    pub fn arity_mismatch(method: &str, expected: usize, got: usize) -> Self {
        RuntimeError {
            kind: ErrorKind::ArgumentError,
            message: format!("{method} expects {expected} argument(s), got {got}"),
        }
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::TypeError,
            message: format!("type error: expected {expected}, got {got}"),
        }
    }

    pub fn stack_overflow(limit: usize) -> Self {
        RuntimeError {
            kind: ErrorKind::StackOverflow,
            message: format!("stack overflow: more than {limit} nested calls"),
        }
    }

    pub fn io_error(msg: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::IoError,
            message: format!("IO error: {msg}"),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UndefinedClass => "UndefinedClassError",
            ErrorKind::NoMethod => "NoMethodError",
            ErrorKind::ArgumentError => "ArgumentError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::StackOverflow => "StackOverflowError",
            ErrorKind::IoError => "IOError",
        };
        f.write_str(name)
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;
