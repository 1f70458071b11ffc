//! Runtime values for the interpreter

use super::class::ClassId;
use super::env::Context;
use crate::ast::Nodes;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Shared, independently mutable object instance
pub type ObjectRef = Rc<RefCell<Object>>;

/// Runtime value
///
/// Every value has a runtime class: objects carry theirs, classes are
/// instances of `Class`, and `Nil` belongs to the nil class.
#[derive(Clone, Default)]
pub enum Value {
    /// The null singleton
    #[default]
    Nil,
    /// Object instance, possibly boxing a native payload
    Object(ObjectRef),
    /// A class used as a value
    Class(ClassId),
}

/// Object instance
#[derive(Debug)]
pub struct Object {
    /// Runtime class
    pub class: ClassId,
    /// Instance variables, keyed without the `@` sigil
    pub ivars: HashMap<String, Value>,
    pub payload: Payload,
}

/// Native datum boxed inside an object
#[derive(Debug, Clone)]
pub enum Payload {
    /// Plain object, compared by identity
    None,
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Symbol(Symbol),
    Bool(bool),
    Lambda(Rc<Closure>),
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Payload::Int(a), Payload::Int(b)) => a == b,
            (Payload::Float(a), Payload::Float(b)) => a == b,
            (Payload::Str(a), Payload::Str(b)) => a == b,
            (Payload::Symbol(a), Payload::Symbol(b)) => a == b,
            (Payload::Bool(a), Payload::Bool(b)) => a == b,
            (Payload::Lambda(a), Payload::Lambda(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Lambda body together with the frame it was created in
pub struct Closure {
    pub params: Vec<String>,
    pub body: Rc<Nodes>,
    pub context: Context,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("statements", &self.body.len())
            .finish_non_exhaustive()
    }
}

impl Value {
    /// Box a native payload into a fresh instance of `class`
    pub fn new_with_value(class: ClassId, payload: Payload) -> Self {
        Value::Object(Rc::new(RefCell::new(Object {
            class,
            ivars: HashMap::new(),
            payload,
        })))
    }

    /// Plain instance of `class` with no payload
    pub fn instance_of(class: ClassId) -> Self {
        Self::new_with_value(class, Payload::None)
    }

    /// Only `nil` and `false` are falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Object(obj) => !matches!(obj.borrow().payload, Payload::Bool(false)),
            Value::Class(_) => true,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Copy of the boxed payload (`Payload::None` for non-objects)
    pub fn payload(&self) -> Payload {
        match self {
            Value::Object(obj) => obj.borrow().payload.clone(),
            _ => Payload::None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.payload() {
            Payload::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Numeric payload widened to f64
    pub fn as_float(&self) -> Option<f64> {
        match self.payload() {
            Payload::Float(f) => Some(f),
            Payload::Int(n) => Some(n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<Rc<str>> {
        match self.payload() {
            Payload::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.payload() {
            Payload::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<Symbol> {
        match self.payload() {
            Payload::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_closure(&self) -> Option<Rc<Closure>> {
        match self.payload() {
            Payload::Lambda(c) => Some(c),
            _ => None,
        }
    }

    /// Read an instance variable of an object (`None` for nil and classes)
    pub fn ivar(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(obj) => obj.borrow().ivars.get(key).cloned(),
            _ => None,
        }
    }

    /// Write an instance variable; returns false when the value has no
    /// per-object store
    pub fn set_ivar(&self, key: &str, value: Value) -> bool {
        match self {
            Value::Object(obj) => {
                obj.borrow_mut().ivars.insert(key.to_string(), value);
                true
            }
            _ => false,
        }
    }

    /// Identity comparison, ignoring payloads
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Boxed values compare by payload; plain objects by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.same(other) {
            return true;
        }
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                !matches!(a.payload, Payload::None) && a.payload == b.payload
            }
            _ => false,
        }
    }
}

// Objects may reference themselves through ivars, so only the header is shown.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Class(id) => write!(f, "Class({id:?})"),
            Value::Object(obj) => match obj.try_borrow() {
                Ok(obj) => write!(f, "Object({:?}, {:?})", obj.class, obj.payload),
                Err(_) => write!(f, "Object(<borrowed>)"),
            },
        }
    }
}

/// Interned symbol handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

/// Symbol table mapping names to stable handles
#[derive(Debug, Default)]
pub struct Interner {
    names: Vec<Rc<str>>,
    ids: HashMap<Rc<str>, Symbol>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name, returning the existing handle when already present
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(sym) = self.ids.get(name) {
            return *sym;
        }
        let sym = Symbol(self.names.len() as u32);
        let name: Rc<str> = Rc::from(name);
        self.names.push(Rc::clone(&name));
        self.ids.insert(name, sym);
        sym
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.names[sym.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(n: u32) -> ClassId {
        ClassId::from_raw(n)
    }

    #[test]
    fn test_value_truthy() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::new_with_value(class(0), Payload::Bool(false)).is_truthy());
        assert!(Value::new_with_value(class(0), Payload::Bool(true)).is_truthy());
        assert!(Value::new_with_value(class(0), Payload::Int(0)).is_truthy());
        assert!(Value::new_with_value(class(0), Payload::Str(Rc::from(""))).is_truthy());
        assert!(Value::instance_of(class(0)).is_truthy());
        assert!(Value::Class(class(3)).is_truthy());
    }

    #[test]
    fn test_boxed_values_compare_by_payload() {
        let a = Value::new_with_value(class(1), Payload::Int(7));
        let b = Value::new_with_value(class(1), Payload::Int(7));
        assert_eq!(a, b);
        assert!(!a.same(&b));
        assert_ne!(a, Value::new_with_value(class(1), Payload::Int(8)));
        // no implicit numeric coercion
        assert_ne!(a, Value::new_with_value(class(2), Payload::Float(7.0)));
    }

    #[test]
    fn test_plain_objects_compare_by_identity() {
        let a = Value::instance_of(class(0));
        let b = Value::instance_of(class(0));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_classes_compare_by_id() {
        assert_eq!(Value::Class(class(4)), Value::Class(class(4)));
        assert_ne!(Value::Class(class(4)), Value::Class(class(5)));
        assert_ne!(Value::Class(class(4)), Value::Nil);
    }

    #[test]
    fn test_ivars_are_per_instance() {
        let a = Value::instance_of(class(0));
        let b = Value::instance_of(class(0));
        assert!(a.set_ivar("name", Value::new_with_value(class(1), Payload::Int(1))));
        assert_eq!(a.ivar("name").and_then(|v| v.as_int()), Some(1));
        assert!(b.ivar("name").is_none());
        assert!(!Value::Nil.set_ivar("name", Value::Nil));
    }

    #[test]
    fn test_as_float_widens_ints() {
        let n = Value::new_with_value(class(1), Payload::Int(2));
        assert_eq!(n.as_float(), Some(2.0));
        assert_eq!(n.as_int(), Some(2));
        assert_eq!(Value::Nil.as_int(), None);
    }

    #[test]
    fn test_debug_does_not_recurse_into_ivars() {
        let a = Value::instance_of(class(0));
        a.set_ivar("me", a.clone());
        let shown = format!("{a:?}");
        assert!(shown.starts_with("Object("));
    }

    #[test]
    fn test_interner_reuses_handles() {
        let mut interner = Interner::new();
        let a = interner.intern("red");
        let b = interner.intern("green");
        assert_eq!(interner.intern("red"), a);
        assert_ne!(a, b);
        assert_eq!(interner.resolve(b), "green");
        assert_eq!(interner.len(), 2);
    }
}
