//! Class records, method tables and method resolution
//!
//! Classes live in an arena (`ClassTable`) and are addressed by `ClassId`.
//! Values, frames and other classes refer to a class only through its id, so
//! reopening a class never invalidates anything that already points at it.

use super::env::Context;
use super::error::InterpResult;
use super::eval::Interpreter;
use super::value::Value;
use crate::ast::Nodes;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// Stable handle of a class in the `ClassTable`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub fn from_raw(raw: u32) -> Self {
        ClassId(raw)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Natively implemented method: `(interpreter, receiver, arguments, context)`
pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &Value, Vec<Value>, &Context) -> InterpResult<Value>>;

/// What runs when a method is invoked
#[derive(Clone)]
pub enum MethodBody {
    /// Method written in the language
    User { params: Vec<String>, body: Rc<Nodes> },
    Native(NativeFn),
}

/// Method record; never mutated once built, redefinition replaces the entry
#[derive(Clone)]
pub struct Method {
    pub name: String,
    pub body: MethodBody,
}

impl Method {
    pub fn user(name: impl Into<String>, params: Vec<String>, body: Nodes) -> Self {
        Method {
            name: name.into(),
            body: MethodBody::User {
                params,
                body: Rc::new(body),
            },
        }
    }

    pub fn native(name: impl Into<String>, f: NativeFn) -> Self {
        Method {
            name: name.into(),
            body: MethodBody::Native(f),
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            MethodBody::User { params, .. } => write!(f, "Method({}({}))", self.name, params.join(", ")),
            MethodBody::Native(_) => write!(f, "Method({} <native>)", self.name),
        }
    }
}

/// Language-level class
#[derive(Debug)]
pub struct Class {
    pub name: String,
    /// Single-inheritance parent; only the root class has none
    pub parent: Option<ClassId>,
    /// Instance methods
    pub methods: BTreeMap<String, Rc<Method>>,
    /// Methods invoked on the class value itself (`Symbol.new`)
    pub class_methods: BTreeMap<String, Rc<Method>>,
    /// `@@name` store, keyed without the sigil
    pub class_vars: HashMap<String, Value>,
    /// `@name` store of the class value itself
    pub ivars: HashMap<String, Value>,
    /// Class-body frame the class's body is evaluated in
    pub context: Context,
}

impl Class {
    pub fn new(name: impl Into<String>, parent: Option<ClassId>, context: Context) -> Self {
        Class {
            name: name.into(),
            parent,
            methods: BTreeMap::new(),
            class_methods: BTreeMap::new(),
            class_vars: HashMap::new(),
            ivars: HashMap::new(),
            context,
        }
    }
}

/// Arena of every class created during evaluation
#[derive(Debug, Default)]
pub struct ClassTable {
    classes: Vec<Class>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next inserted class will receive
    pub fn next_id(&self) -> ClassId {
        ClassId(self.classes.len() as u32)
    }

    pub fn insert(&mut self, class: Class) -> ClassId {
        let id = self.next_id();
        self.classes.push(class);
        id
    }

    /// Ids are only handed out by `insert`, so lookups cannot miss.
    pub fn get(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    pub fn get_mut(&mut self, id: ClassId) -> &mut Class {
        &mut self.classes[id.index()]
    }

    pub fn name(&self, id: ClassId) -> &str {
        &self.get(id).name
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// The class itself followed by its parent chain
    pub fn ancestors(&self, id: ClassId) -> Ancestors<'_> {
        Ancestors {
            table: self,
            next: Some(id),
        }
    }

    /// Register (or overwrite) an instance method
    pub fn define_method(&mut self, class: ClassId, method: Method) {
        let name = method.name.clone();
        self.get_mut(class).methods.insert(name, Rc::new(method));
    }

    /// Register (or overwrite) a method on the class value
    pub fn define_class_method(&mut self, class: ClassId, method: Method) {
        let name = method.name.clone();
        self.get_mut(class).class_methods.insert(name, Rc::new(method));
    }

    /// First instance method named `name` on the class or its ancestors,
    /// together with the class that defines it
    pub fn find_method(&self, class: ClassId, name: &str) -> Option<(ClassId, Rc<Method>)> {
        self.ancestors(class)
            .find_map(|c| self.get(c).methods.get(name).map(|m| (c, Rc::clone(m))))
    }

    /// Class-side counterpart of `find_method`
    pub fn find_class_method(&self, class: ClassId, name: &str) -> Option<(ClassId, Rc<Method>)> {
        self.ancestors(class)
            .find_map(|c| self.get(c).class_methods.get(name).map(|m| (c, Rc::clone(m))))
    }
}

/// Iterator over a class and its ancestors, nearest first
pub struct Ancestors<'a> {
    table: &'a ClassTable,
    next: Option<ClassId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ClassId;

    fn next(&mut self) -> Option<ClassId> {
        let current = self.next?;
        self.next = self.table.get(current).parent;
        Some(current)
    }
}
