//! Scope chain: frames resolving names by their lexical shape
//!
//! A name's leading characters pick the store it lives in (constant, local,
//! global, class variable, instance variable). Reads look in the current
//! frame's store and then ask the parent frame, except for `@name` and
//! `@@name`, which only ever read the current self and the current class.
//! Writes always land in the current frame's store. The four frame kinds
//! differ only in where some of those stores physically live, which is
//! expressed by overriding `Scope`.

use super::class::{ClassId, ClassTable};
use super::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

type Store = RefCell<HashMap<String, Value>>;

/// Which store a name lives in, decided by its leading characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// `Name`
    Constant,
    /// `name`, `_name`
    Local,
    /// `$name`
    Global,
    /// `@@name`
    ClassVar,
    /// `@name`
    InstanceVar,
    /// Anything else; reads miss and writes are dropped
    Unknown,
}

impl NameKind {
    pub fn of(name: &str) -> NameKind {
        let bytes = name.as_bytes();
        match bytes.first() {
            Some(c) if c.is_ascii_uppercase() => NameKind::Constant,
            Some(c) if c.is_ascii_lowercase() || *c == b'_' => NameKind::Local,
            Some(b'$') => NameKind::Global,
            Some(b'@') if bytes.get(1) == Some(&b'@') => NameKind::ClassVar,
            Some(b'@') => NameKind::InstanceVar,
            _ => NameKind::Unknown,
        }
    }

    /// Whether a miss in one frame is retried in the enclosing frames.
    /// `@name` belongs to the current self and `@@name` to the current class,
    /// so neither is looked up anywhere else.
    pub fn delegates(self) -> bool {
        !matches!(self, NameKind::InstanceVar | NameKind::ClassVar)
    }

    /// Key inside the store, with the sigil stripped
    pub fn key(self, name: &str) -> &str {
        match self {
            NameKind::Global | NameKind::InstanceVar => &name[1..],
            NameKind::ClassVar => &name[2..],
            _ => name,
        }
    }
}

/// Frame kind, for callers that need to tell frames apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Namespace,
    ClassBody,
    Instance,
    Method,
}

/// State every frame kind carries
#[derive(Debug)]
pub struct FrameCore {
    current_self: Value,
    current_class: ClassId,
    locals: Store,
    constants: Store,
    /// Created by the root namespace and shared by every frame below it
    globals: Rc<Store>,
    parent: Option<Context>,
}

impl FrameCore {
    fn new(current_self: Value, current_class: ClassId, globals: Rc<Store>, parent: Option<Context>) -> Self {
        FrameCore {
            current_self,
            current_class,
            locals: RefCell::new(HashMap::new()),
            constants: RefCell::new(HashMap::new()),
            globals,
            parent,
        }
    }

    fn read(&self, kind: NameKind, key: &str, owner: &Value, classes: &ClassTable) -> Option<Value> {
        match kind {
            NameKind::Constant => self.constants.borrow().get(key).cloned(),
            NameKind::Local => self.locals.borrow().get(key).cloned(),
            NameKind::Global => self.globals.borrow().get(key).cloned(),
            NameKind::ClassVar => classes.get(self.current_class).class_vars.get(key).cloned(),
            NameKind::InstanceVar => match owner {
                Value::Class(id) => classes.get(*id).ivars.get(key).cloned(),
                other => other.ivar(key),
            },
            NameKind::Unknown => None,
        }
    }

    fn write(&self, kind: NameKind, key: &str, value: Value, owner: &Value, classes: &mut ClassTable) {
        match kind {
            NameKind::Constant => {
                self.constants.borrow_mut().insert(key.to_string(), value);
            }
            NameKind::Local => {
                self.locals.borrow_mut().insert(key.to_string(), value);
            }
            NameKind::Global => {
                self.globals.borrow_mut().insert(key.to_string(), value);
            }
            NameKind::ClassVar => {
                classes.get_mut(self.current_class).class_vars.insert(key.to_string(), value);
            }
            NameKind::InstanceVar => match owner {
                Value::Class(id) => {
                    classes.get_mut(*id).ivars.insert(key.to_string(), value);
                }
                other => {
                    if !other.set_ivar(key, value) {
                        tracing::trace!(key, "dropping instance variable write on nil self");
                    }
                }
            },
            NameKind::Unknown => tracing::trace!(key, "dropping write to unrecognized name"),
        }
    }
}

/// Name resolution policy of a frame
///
/// `core` is the only required method; the defaults implement the plain
/// "own store, then parent" delegation and each frame kind overrides the
/// parts it resolves differently.
pub trait Scope {
    fn core(&self) -> &FrameCore;

    /// Value whose `@name` store this frame reads and writes
    fn ivar_owner(&self) -> Value {
        self.core().current_self.clone()
    }

    /// Read `name` from this frame's own store, without delegating
    fn lookup_own(&self, name: &str, classes: &ClassTable) -> Option<Value> {
        let kind = NameKind::of(name);
        self.core().read(kind, kind.key(name), &self.ivar_owner(), classes)
    }

    /// Read `name`, asking the parent chain when this frame misses
    fn lookup(&self, name: &str, classes: &ClassTable) -> Option<Value> {
        let own = self.lookup_own(name, classes);
        if own.is_some() || !NameKind::of(name).delegates() {
            return own;
        }
        self.core().parent.as_ref().and_then(|p| p.lookup(name, classes))
    }

    /// Write `name` into this frame's own store
    fn assign(&self, name: &str, value: Value, classes: &mut ClassTable) {
        let kind = NameKind::of(name);
        self.core().write(kind, kind.key(name), value, &self.ivar_owner(), classes);
    }
}

/// Root of a chain, or a nested module-like namespace
#[derive(Debug)]
pub struct NamespaceFrame {
    core: FrameCore,
    namespaces: RefCell<HashMap<String, Context>>,
}

impl Scope for NamespaceFrame {
    fn core(&self) -> &FrameCore {
        &self.core
    }
}

/// Frame a class body is evaluated in; `self` is the class
#[derive(Debug)]
pub struct ClassFrame {
    core: FrameCore,
}

impl Scope for ClassFrame {
    fn core(&self) -> &FrameCore {
        &self.core
    }

    // `@name` in a class body belongs to whoever encloses the definition.
    fn ivar_owner(&self) -> Value {
        match &self.core.parent {
            Some(parent) => parent.ivar_owner(),
            None => self.core.current_self.clone(),
        }
    }
}

/// `self` is an instance; misses consult the namespace before the parent
#[derive(Debug)]
pub struct InstanceFrame {
    core: FrameCore,
    namespace: Context,
}

impl Scope for InstanceFrame {
    fn core(&self) -> &FrameCore {
        &self.core
    }

    fn lookup(&self, name: &str, classes: &ClassTable) -> Option<Value> {
        let own = self.lookup_own(name, classes);
        if own.is_some() || !NameKind::of(name).delegates() {
            return own;
        }
        self.namespace
            .lookup(name, classes)
            .or_else(|| self.core.parent.as_ref().and_then(|p| p.lookup(name, classes)))
    }
}

/// One method activation, or a lambda call capturing its defining frame
#[derive(Debug)]
pub struct MethodFrame {
    core: FrameCore,
    name: String,
    args: Vec<Value>,
    closure: Option<Context>,
}

impl MethodFrame {
    fn closure_binding(&self, key: &str) -> Option<Value> {
        self.closure.as_ref().and_then(|c| c.local_binding(key))
    }
}

impl Scope for MethodFrame {
    fn core(&self) -> &FrameCore {
        &self.core
    }

    // Own locals (parameters included) come first, then the captured frame.
    fn lookup_own(&self, name: &str, classes: &ClassTable) -> Option<Value> {
        let kind = NameKind::of(name);
        let own = self.core.read(kind, kind.key(name), &self.ivar_owner(), classes);
        match kind {
            NameKind::Local => own.or_else(|| self.closure_binding(name)),
            _ => own,
        }
    }

    fn assign(&self, name: &str, value: Value, classes: &mut ClassTable) {
        let kind = NameKind::of(name);
        if kind == NameKind::Local && !self.core.locals.borrow().contains_key(name) {
            if let Some(closure) = &self.closure {
                if closure.local_binding(name).is_some() {
                    closure.assign_local(name, value);
                    return;
                }
            }
        }
        self.core.write(kind, kind.key(name), value, &self.ivar_owner(), classes);
    }
}

#[derive(Debug)]
enum Frame {
    Namespace(NamespaceFrame),
    ClassBody(ClassFrame),
    Instance(InstanceFrame),
    Method(MethodFrame),
}

impl Frame {
    fn scope(&self) -> &dyn Scope {
        match self {
            Frame::Namespace(f) => f,
            Frame::ClassBody(f) => f,
            Frame::Instance(f) => f,
            Frame::Method(f) => f,
        }
    }
}

/// The method activation a frame belongs to
#[derive(Debug, Clone)]
pub struct ActiveMethod {
    pub name: String,
    pub args: Vec<Value>,
    /// Class that defines the running method
    pub class: ClassId,
    pub receiver: Value,
    /// The activation frame, holding the parameters' current values
    pub frame: Context,
}

/// Shared handle to a frame; cloning shares the frame
#[derive(Clone)]
pub struct Context(Rc<Frame>);

impl Scope for Context {
    fn core(&self) -> &FrameCore {
        self.0.scope().core()
    }

    fn ivar_owner(&self) -> Value {
        self.0.scope().ivar_owner()
    }

    fn lookup_own(&self, name: &str, classes: &ClassTable) -> Option<Value> {
        self.0.scope().lookup_own(name, classes)
    }

    fn lookup(&self, name: &str, classes: &ClassTable) -> Option<Value> {
        self.0.scope().lookup(name, classes)
    }

    fn assign(&self, name: &str, value: Value, classes: &mut ClassTable) {
        self.0.scope().assign(name, value, classes);
    }
}

impl Context {
    /// Root namespace; owns the global-variable table
    pub fn root(main: Value, object: ClassId) -> Context {
        let core = FrameCore::new(main, object, Rc::new(RefCell::new(HashMap::new())), None);
        Context::namespace_with(core)
    }

    fn namespace_with(core: FrameCore) -> Context {
        Context(Rc::new(Frame::Namespace(NamespaceFrame {
            core,
            namespaces: RefCell::new(HashMap::new()),
        })))
    }

    /// Nested namespace below this frame, sharing the root's globals
    pub fn new_namespace(&self, main: Value, class: ClassId) -> Context {
        let core = FrameCore::new(main, class, Rc::clone(&self.core().globals), Some(self.clone()));
        Context::namespace_with(core)
    }

    /// Body frame for `class`
    pub fn new_class_frame(&self, class: ClassId) -> Context {
        let core = FrameCore::new(Value::Class(class), class, Rc::clone(&self.core().globals), Some(self.clone()));
        Context(Rc::new(Frame::ClassBody(ClassFrame { core })))
    }

    /// Frame whose `self` is `receiver`, resolving misses through `namespace`
    pub fn new_instance_frame(&self, receiver: Value, namespace: Context) -> Context {
        let core = FrameCore::new(
            receiver,
            self.current_class(),
            Rc::clone(&self.core().globals),
            Some(self.clone()),
        );
        Context(Rc::new(Frame::Instance(InstanceFrame { core, namespace })))
    }

    /// Activation frame for a method (or, with `closure`, a lambda call)
    pub fn new_method_frame(&self, name: &str, args: Vec<Value>, closure: Option<Context>) -> Context {
        let core = FrameCore::new(
            self.current_self(),
            self.current_class(),
            Rc::clone(&self.core().globals),
            Some(self.clone()),
        );
        Context(Rc::new(Frame::Method(MethodFrame {
            core,
            name: name.to_string(),
            args,
            closure,
        })))
    }

    pub fn kind(&self) -> FrameKind {
        match &*self.0 {
            Frame::Namespace(_) => FrameKind::Namespace,
            Frame::ClassBody(_) => FrameKind::ClassBody,
            Frame::Instance(_) => FrameKind::Instance,
            Frame::Method(_) => FrameKind::Method,
        }
    }

    pub fn current_self(&self) -> Value {
        self.core().current_self.clone()
    }

    pub fn current_class(&self) -> ClassId {
        self.core().current_class
    }

    pub fn parent(&self) -> Option<&Context> {
        self.core().parent.as_ref()
    }

    /// Read a name; absent names are `nil`
    pub fn get(&self, name: &str, classes: &ClassTable) -> Value {
        self.lookup(name, classes).unwrap_or(Value::Nil)
    }

    /// Write a name into this frame's store for its shape
    pub fn set(&self, name: &str, value: Value, classes: &mut ClassTable) {
        self.assign(name, value, classes);
    }

    /// Bind a local in this frame directly, bypassing any captured frame
    pub fn define_local(&self, name: &str, value: Value) {
        self.core().locals.borrow_mut().insert(name.to_string(), value);
    }

    /// Constant bound in this frame itself (parents are not consulted)
    pub fn own_constant(&self, name: &str) -> Option<Value> {
        self.core().constants.borrow().get(name).cloned()
    }

    /// Define-once constant binding: a name already bound in this frame
    /// keeps its value. Returns whether the binding was made.
    pub fn define_constant(&self, name: &str, value: Value) -> bool {
        let mut constants = self.core().constants.borrow_mut();
        if constants.contains_key(name) {
            return false;
        }
        constants.insert(name.to_string(), value);
        true
    }

    /// Global variable by name, with or without the `$`
    pub fn global(&self, name: &str) -> Option<Value> {
        let key = name.strip_prefix('$').unwrap_or(name);
        self.core().globals.borrow().get(key).cloned()
    }

    /// Local binding visible to a closure capturing this frame
    fn local_binding(&self, key: &str) -> Option<Value> {
        let own = self.core().locals.borrow().get(key).cloned();
        match &*self.0 {
            Frame::Method(method) => own.or_else(|| method.closure_binding(key)),
            _ => own,
        }
    }

    /// Rebind a local in whichever frame of the closure chain owns it
    fn assign_local(&self, key: &str, value: Value) {
        if let Frame::Method(method) = &*self.0 {
            let owned_here = self.core().locals.borrow().contains_key(key);
            if let (false, Some(closure)) = (owned_here, &method.closure) {
                if closure.local_binding(key).is_some() {
                    closure.assign_local(key, value);
                    return;
                }
            }
        }
        self.define_local(key, value);
    }

    /// Nearest namespace frame governing this frame
    pub fn namespace_context(&self) -> Context {
        match &*self.0 {
            Frame::Namespace(_) => self.clone(),
            Frame::Instance(f) => f.namespace.clone(),
            Frame::ClassBody(_) | Frame::Method(_) => match self.parent() {
                Some(parent) => parent.namespace_context(),
                None => self.clone(),
            },
        }
    }

    /// Register `namespace` under `name` in the governing namespace
    pub fn register_namespace(&self, name: &str, namespace: Context) {
        let ns = self.namespace_context();
        if let Frame::Namespace(frame) = &*ns.0 {
            frame.namespaces.borrow_mut().insert(name.to_string(), namespace);
        }
    }

    /// Namespace registered under `name` in the governing namespace only
    pub fn registered_namespace(&self, name: &str) -> Option<Context> {
        match &*self.namespace_context().0 {
            Frame::Namespace(frame) => frame.namespaces.borrow().get(name).cloned(),
            _ => None,
        }
    }

    /// Find a registered namespace, searching outward from this frame
    pub fn find_namespace(&self, name: &str) -> Option<Context> {
        let ns = self.namespace_context();
        if let Frame::Namespace(frame) = &*ns.0 {
            if let Some(found) = frame.namespaces.borrow().get(name) {
                return Some(found.clone());
            }
        }
        ns.parent().and_then(|p| p.find_namespace(name))
    }

    /// The method activation this frame runs in; lambda frames are looked
    /// through to the method that created them
    pub fn active_method(&self) -> Option<ActiveMethod> {
        match &*self.0 {
            Frame::Method(m) if m.closure.is_none() => Some(ActiveMethod {
                name: m.name.clone(),
                args: m.args.clone(),
                class: m.core.current_class,
                receiver: m.core.current_self.clone(),
                frame: self.clone(),
            }),
            _ => self.parent().and_then(Context::active_method),
        }
    }

    pub fn ptr_eq(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn depth(&self) -> usize {
        self.parent().map_or(0, |p| p.depth() + 1)
    }
}

// Frames point at namespaces that point back at them, so only a summary
// is printed.
impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("kind", &self.kind())
            .field("depth", &self.depth())
            .field("current_class", &self.current_class())
            .finish_non_exhaustive()
    }
}
