//! Tree-walking evaluator
//!
//! Every node evaluates to a `Flow`: either a plain value or one of the two
//! control signals (`return`, `next`). Signals travel back up the Rust call
//! stack as ordinary return values, so evaluating the same AST twice, or
//! recursively, never shares any control state.

use super::class::{Class, ClassId, ClassTable, Method, MethodBody, NativeFn};
use super::env::{ActiveMethod, Context, Scope};
use super::error::{InterpResult, RuntimeError};
use super::interpolate::interpolate;
use super::natives;
use super::value::{Closure, Interner, Payload, Symbol, Value};
use crate::ast::{Node, Nodes};
use crate::config::InterpConfig;
use crate::parser::{JsonParser, SourceParser};
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

/// Result of evaluating a node
#[derive(Debug, Clone)]
pub enum Flow {
    /// Evaluation completed with a value
    Normal(Value),
    /// A `return` is unwinding to the enclosing method or lambda
    Return(Value),
    /// A `next` is unwinding to the enclosing loop
    Skip,
}

impl Flow {
    /// Collapse the signal; a pending skip carries no value
    pub fn into_value(self) -> Value {
        match self {
            Flow::Normal(v) | Flow::Return(v) => v,
            Flow::Skip => Value::Nil,
        }
    }

    pub fn is_signal(&self) -> bool {
        !matches!(self, Flow::Normal(_))
    }
}

/// Built-in classes created before any evaluation
#[derive(Debug, Clone, Copy)]
pub struct CoreClasses {
    pub object: ClassId,
    pub class: ClassId,
    pub string: ClassId,
    pub integer: ClassId,
    pub float: ClassId,
    pub symbol: ClassId,
    pub boolean: ClassId,
    pub nil: ClassId,
    pub lambda: ClassId,
}

/// Where `print` and `println` write
#[derive(Debug, Default)]
pub enum Output {
    #[default]
    Stdout,
    /// Collected in memory, read back with `Interpreter::take_output`
    Buffer(String),
}

/// The interpreter
pub struct Interpreter {
    classes: ClassTable,
    core: CoreClasses,
    /// Root namespace frame
    root: Context,
    true_value: Value,
    false_value: Value,
    symbols: Interner,
    config: InterpConfig,
    /// Current method nesting depth
    depth: usize,
    output: Output,
    parser: Box<dyn SourceParser>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Create a new interpreter with the native library installed
    pub fn new() -> Self {
        Self::with_config(InterpConfig::default())
    }

    pub fn with_config(config: InterpConfig) -> Self {
        let mut classes = ClassTable::new();
        let object = classes.next_id();
        let root = Context::root(Value::instance_of(object), object);
        let object = classes.insert(Class::new("Object", None, root.new_class_frame(object)));

        let mut core_class = |name: &str| {
            let id = classes.next_id();
            classes.insert(Class::new(name, Some(object), root.new_class_frame(id)))
        };
        let core = CoreClasses {
            object,
            class: core_class("Class"),
            string: core_class("String"),
            integer: core_class("Integer"),
            float: core_class("Float"),
            symbol: core_class("Symbol"),
            boolean: core_class("Boolean"),
            nil: core_class("Nil"),
            lambda: core_class("Lambda"),
        };
        for index in 0..classes.len() {
            let id = ClassId::from_raw(index as u32);
            root.define_constant(classes.name(id), Value::Class(id));
        }

        let mut interp = Interpreter {
            true_value: Value::new_with_value(core.boolean, Payload::Bool(true)),
            false_value: Value::new_with_value(core.boolean, Payload::Bool(false)),
            classes,
            core,
            root,
            symbols: Interner::new(),
            config,
            depth: 0,
            output: Output::Stdout,
            parser: Box::new(JsonParser),
        };
        natives::bootstrap(&mut interp);
        interp
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    /// Parser used by `eval_source` and `load`
    pub fn with_parser(mut self, parser: impl SourceParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    pub fn config(&self) -> &InterpConfig {
        &self.config
    }

    pub fn root(&self) -> &Context {
        &self.root
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub fn core(&self) -> CoreClasses {
        self.core
    }

    // ---- host entry points ----

    /// Evaluate a program against the root namespace
    pub fn evaluate(&mut self, nodes: &Nodes) -> InterpResult<Value> {
        let root = self.root.clone();
        self.eval_in(nodes, &root)
    }

    /// Evaluate a statement sequence in `ctx`
    pub fn eval_in(&mut self, nodes: &Nodes, ctx: &Context) -> InterpResult<Value> {
        Ok(self.eval_nodes(nodes, ctx)?.into_value())
    }

    /// Parse `source` with the configured parser, then evaluate it
    pub fn eval_source(&mut self, source: &str) -> crate::Result<Value> {
        let nodes = self.parser.parse(source)?;
        Ok(self.evaluate(&nodes)?)
    }

    /// Read and evaluate a file; a missing file is not an error
    pub fn load(&mut self, path: &Path) -> crate::Result<Option<Value>> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "load target does not exist, skipping");
            return Ok(None);
        }
        let source = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::io_error(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), bytes = source.len(), "loading file");
        self.eval_source(&source).map(Some)
    }

    // ---- output ----

    pub fn write_output(&mut self, text: &str) -> InterpResult<()> {
        match &mut self.output {
            Output::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(text.as_bytes())
                    .and_then(|()| stdout.flush())
                    .map_err(|e| RuntimeError::io_error(&e.to_string()))
            }
            Output::Buffer(buf) => {
                buf.push_str(text);
                Ok(())
            }
        }
    }

    /// Drain buffered output (always empty when writing to stdout)
    pub fn take_output(&mut self) -> String {
        match &mut self.output {
            Output::Stdout => String::new(),
            Output::Buffer(buf) => std::mem::take(buf),
        }
    }

    // ---- value construction ----

    pub fn boolean(&self, b: bool) -> Value {
        if b {
            self.true_value.clone()
        } else {
            self.false_value.clone()
        }
    }

    pub fn integer(&self, n: i64) -> Value {
        Value::new_with_value(self.core.integer, Payload::Int(n))
    }

    pub fn float(&self, f: f64) -> Value {
        Value::new_with_value(self.core.float, Payload::Float(f))
    }

    pub fn string(&self, s: &str) -> Value {
        Value::new_with_value(self.core.string, Payload::Str(Rc::from(s)))
    }

    pub fn symbol(&mut self, name: &str) -> Value {
        let sym = self.symbols.intern(name);
        Value::new_with_value(self.core.symbol, Payload::Symbol(sym))
    }

    pub fn symbol_name(&self, sym: Symbol) -> &str {
        self.symbols.resolve(sym)
    }

    // ---- classes ----

    /// Runtime class governing `value`'s dispatch
    pub fn class_of(&self, value: &Value) -> ClassId {
        match value {
            Value::Nil => self.core.nil,
            Value::Object(obj) => obj.borrow().class,
            Value::Class(_) => self.core.class,
        }
    }

    pub fn class_name_of(&self, value: &Value) -> String {
        self.classes.name(self.class_of(value)).to_string()
    }

    /// Class bound to `name` in the root namespace
    pub fn class_named(&self, name: &str) -> Option<ClassId> {
        match self.root.get(name, &self.classes) {
            Value::Class(id) => Some(id),
            _ => None,
        }
    }

    /// Register a native instance method on `class`
    ///
    /// The `&Context` a native receives is the caller's frame, or the root
    /// namespace when the call comes from the host through `call`.
    pub fn define_native<F>(&mut self, class: ClassId, name: &str, f: F)
    where
        F: Fn(&mut Interpreter, &Value, Vec<Value>, &Context) -> InterpResult<Value> + 'static,
    {
        let f: NativeFn = Rc::new(f);
        self.classes.define_method(class, Method::native(name, f));
    }

    /// Register a native method on the class value itself
    pub fn define_class_native<F>(&mut self, class: ClassId, name: &str, f: F)
    where
        F: Fn(&mut Interpreter, &Value, Vec<Value>, &Context) -> InterpResult<Value> + 'static,
    {
        let f: NativeFn = Rc::new(f);
        self.classes.define_class_method(class, Method::native(name, f));
    }

    /// `@key` of an object, or of a class used as a value
    pub fn instance_var(&self, receiver: &Value, key: &str) -> Value {
        match receiver {
            Value::Class(id) => self.classes.get(*id).ivars.get(key).cloned().unwrap_or_default(),
            other => other.ivar(key).unwrap_or_default(),
        }
    }

    pub fn set_instance_var(&mut self, receiver: &Value, key: &str, value: Value) {
        match receiver {
            Value::Class(id) => {
                self.classes.get_mut(*id).ivars.insert(key.to_string(), value);
            }
            other => {
                other.set_ivar(key, value);
            }
        }
    }

    // ---- dispatch ----

    /// Method `name` as seen by `receiver`, with the class that defines it
    ///
    /// Class values search their class-side tables first, then fall back to
    /// the instance methods of `Class`.
    pub fn find_method(&self, receiver: &Value, name: &str) -> Option<(ClassId, Rc<Method>)> {
        if let Value::Class(id) = receiver {
            if let Some(found) = self.classes.find_class_method(*id, name) {
                return Some(found);
            }
        }
        self.classes.find_method(self.class_of(receiver), name)
    }

    pub fn responds_to(&self, receiver: &Value, name: &str) -> bool {
        self.find_method(receiver, name).is_some()
    }

    /// Dispatch `method` on `receiver` from the root namespace
    pub fn call(&mut self, receiver: &Value, method: &str, args: Vec<Value>) -> InterpResult<Value> {
        let root = self.root.clone();
        self.call_in(receiver, method, args, &root)
    }

    /// Dispatch `method` on `receiver` on behalf of code running in `caller`
    #[tracing::instrument(level = "debug", skip(self, receiver, args, caller), fields(argc = args.len()))]
    pub fn call_in(&mut self, receiver: &Value, method: &str, args: Vec<Value>, caller: &Context) -> InterpResult<Value> {
        let Some((owner, found)) = self.find_method(receiver, method) else {
            let class_name = self.class_name_of(receiver);
            tracing::debug!(class = %class_name, "no such method");
            return Err(RuntimeError::no_method(&class_name, method));
        };
        self.invoke(receiver, owner, &found, args, caller)
    }

    /// `to_string` of a value, which must produce text
    pub fn stringify(&mut self, value: &Value) -> InterpResult<String> {
        let shown = self.call(value, "to_string", vec![])?;
        match shown.as_str() {
            Some(s) => Ok(s.to_string()),
            None => Err(RuntimeError::type_error("String from to_string", &self.class_name_of(&shown))),
        }
    }

    /// Run a method already resolved to `owner`
    fn invoke(
        &mut self,
        receiver: &Value,
        owner: ClassId,
        method: &Method,
        args: Vec<Value>,
        caller: &Context,
    ) -> InterpResult<Value> {
        self.nested(|this| match &method.body {
            MethodBody::Native(f) => (**f)(this, receiver, args, caller),
            MethodBody::User { params, body } => {
                let class_ctx = this.classes.get(owner).context.clone();
                let namespace = class_ctx.namespace_context();
                let frame = class_ctx
                    .new_instance_frame(receiver.clone(), namespace)
                    .new_method_frame(&method.name, args.clone(), None);
                bind_params(&frame, params, args);
                Ok(this.eval_nodes(body, &frame)?.into_value())
            }
        })
    }

    /// Call a lambda with `args`
    pub fn call_lambda(&mut self, closure: &Closure, args: Vec<Value>) -> InterpResult<Value> {
        self.nested(|this| {
            let captured = &closure.context;
            let frame = captured.new_method_frame("lambda", args.clone(), Some(captured.clone()));
            bind_params(&frame, &closure.params, args);
            Ok(this.eval_nodes(&closure.body, &frame)?.into_value())
        })
    }

    /// Run `f` one activation deeper, on a grown stack if needed
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> InterpResult<T>) -> InterpResult<T> {
        if self.depth >= self.config.max_depth {
            return Err(RuntimeError::stack_overflow(self.config.max_depth));
        }
        self.depth += 1;
        let (red_zone, grow) = (self.config.stack_red_zone, self.config.stack_grow_size);
        let result = stacker::maybe_grow(red_zone, grow, || f(self));
        self.depth -= 1;
        result
    }

    // ---- evaluation ----

    /// Evaluate a statement sequence, stopping at the first signal
    pub fn eval_nodes(&mut self, nodes: &Nodes, ctx: &Context) -> InterpResult<Flow> {
        let mut last = Value::Nil;
        for node in nodes {
            match self.eval(node, ctx)? {
                Flow::Normal(v) => last = v,
                signal => return Ok(signal),
            }
        }
        Ok(Flow::Normal(last))
    }

    /// Evaluate a node with automatic stack growth for deep recursion
    pub fn eval(&mut self, node: &Node, ctx: &Context) -> InterpResult<Flow> {
        let (red_zone, grow) = (self.config.stack_red_zone, self.config.stack_grow_size);
        stacker::maybe_grow(red_zone, grow, || self.eval_inner(node, ctx))
    }

    /// Evaluate a node in expression position
    fn eval_value(&mut self, node: &Node, ctx: &Context) -> InterpResult<Value> {
        Ok(self.eval(node, ctx)?.into_value())
    }

    fn eval_inner(&mut self, node: &Node, ctx: &Context) -> InterpResult<Flow> {
        let value = match node {
            Node::Integer(n) => self.integer(*n),
            Node::Float(f) => self.float(*f),
            Node::Str(text) => {
                let text = interpolate(self, text, ctx)?;
                self.string(&text)
            }
            Node::Symbol(name) => self.symbol(name),
            Node::True => self.boolean(true),
            Node::False => self.boolean(false),
            Node::Nil => Value::Nil,
            Node::SelfRef => ctx.current_self(),

            Node::GetLocal(name) => {
                let value = ctx.get(name, &self.classes);
                let receiver = ctx.current_self();
                if value.is_nil() && self.responds_to(&receiver, name) {
                    self.call_in(&receiver, name, vec![], ctx)?
                } else {
                    value
                }
            }
            Node::GetConstant(name)
            | Node::GetGlobal(name)
            | Node::GetClassVar(name)
            | Node::GetInstanceVar(name) => ctx.get(name, &self.classes),

            Node::SetLocal { name, value }
            | Node::SetGlobal { name, value }
            | Node::SetClassVar { name, value }
            | Node::SetInstanceVar { name, value } => {
                let value = self.eval_value(value, ctx)?;
                ctx.set(name, value.clone(), &mut self.classes);
                value
            }
            Node::SetConstant { name, value } => match ctx.own_constant(name) {
                Some(existing) => existing,
                None => {
                    let value = self.eval_value(value, ctx)?;
                    ctx.define_constant(name, value.clone());
                    value
                }
            },

            Node::Call {
                receiver,
                method,
                arguments,
            } => {
                let receiver = match receiver {
                    Some(r) => self.eval_value(r, ctx)?,
                    None => ctx.current_self(),
                };
                let args = self.eval_args(arguments, ctx)?;
                self.call_in(&receiver, method, args, ctx)?
            }
            Node::Super { arguments } => self.eval_super(arguments.as_deref(), ctx)?,

            Node::Class { name, parent, body } => {
                let id = self.define_class(name, parent.as_deref(), ctx)?;
                let class_ctx = self.classes.get(id).context.clone();
                self.eval_nodes(body, &class_ctx)?;
                Value::Class(id)
            }
            Node::Property { names } => {
                let class = ctx.current_class();
                for name in names {
                    self.define_property(class, name);
                }
                Value::Nil
            }
            Node::DefMethod { name, params, body } => {
                let class = ctx.current_class();
                tracing::debug!(class = self.classes.name(class), method = %name, "defining method");
                self.classes
                    .define_method(class, Method::user(name.as_str(), params.clone(), body.clone()));
                Value::Nil
            }
            Node::Lambda { params, body } => {
                let closure = Closure {
                    params: params.clone(),
                    body: Rc::new(body.clone()),
                    context: ctx.clone(),
                };
                Value::new_with_value(self.core.lambda, Payload::Lambda(Rc::new(closure)))
            }

            Node::If {
                condition,
                body,
                else_branch,
            } => {
                if self.eval_value(condition, ctx)?.is_truthy() {
                    return self.eval_nodes(body, ctx);
                }
                match else_branch {
                    Some(branch) => return self.eval(branch, ctx),
                    None => Value::Nil,
                }
            }
            Node::While { condition, body } => {
                let mut last = Value::Nil;
                while self.eval_value(condition, ctx)?.is_truthy() {
                    match self.eval_nodes(body, ctx)? {
                        Flow::Normal(v) => last = v,
                        Flow::Skip => continue,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                last
            }
            Node::Block(nodes) => return self.eval_nodes(nodes, ctx),
            Node::Return(value) => {
                let value = match value {
                    Some(v) => self.eval_value(v, ctx)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }
            Node::Next => return Ok(Flow::Skip),

            Node::And(lhs, rhs) => {
                let left = self.eval_value(lhs, ctx)?;
                if left.is_truthy() { self.eval_value(rhs, ctx)? } else { left }
            }
            Node::Or(lhs, rhs) => {
                let left = self.eval_value(lhs, ctx)?;
                if left.is_truthy() { left } else { self.eval_value(rhs, ctx)? }
            }
            Node::Not(operand) => {
                let v = self.eval_value(operand, ctx)?;
                self.boolean(!v.is_truthy())
            }

            Node::Namespace { name, body } => {
                let ns = match ctx.registered_namespace(name) {
                    Some(ns) => ns,
                    None => {
                        let ns = ctx.new_namespace(Value::instance_of(self.core.object), self.core.object);
                        ctx.register_namespace(name, ns.clone());
                        ns
                    }
                };
                self.eval_in(body, &ns)?
            }
            Node::NamespaceGet { namespace, name } => match ctx.find_namespace(namespace) {
                Some(ns) => ns.get(name, &self.classes),
                None => {
                    tracing::trace!(namespace = %namespace, "reading from unknown namespace");
                    Value::Nil
                }
            },
        };
        Ok(Flow::Normal(value))
    }

    fn eval_args(&mut self, arguments: &[Node], ctx: &Context) -> InterpResult<Vec<Value>> {
        arguments.iter().map(|arg| self.eval_value(arg, ctx)).collect()
    }

    /// `super`: the running method's name, looked up above its owner
    fn eval_super(&mut self, arguments: Option<&[Node]>, ctx: &Context) -> InterpResult<Value> {
        let Some(active) = ctx.active_method() else {
            let class_name = self.class_name_of(&ctx.current_self());
            return Err(RuntimeError::no_method(&class_name, "super"));
        };
        let args = match arguments {
            Some(nodes) => self.eval_args(nodes, ctx)?,
            None => self.forwarded_args(&active),
        };
        let parent = self.classes.get(active.class).parent;
        match parent.and_then(|p| self.classes.find_method(p, &active.name)) {
            Some((owner, method)) => self.invoke(&active.receiver, owner, &method, args, ctx),
            None => {
                let class_name = self.classes.name(parent.unwrap_or(active.class)).to_string();
                Err(RuntimeError::no_method(&class_name, &active.name))
            }
        }
    }

    /// Arguments a bare `super` passes on: the parameters' current values,
    /// then any extra arguments the running method was called with
    fn forwarded_args(&self, active: &ActiveMethod) -> Vec<Value> {
        let params = match self.classes.find_method(active.class, &active.name) {
            Some((_, method)) => match &method.body {
                MethodBody::User { params, .. } => params.clone(),
                MethodBody::Native(_) => Vec::new(),
            },
            None => Vec::new(),
        };
        let mut args: Vec<Value> = params
            .iter()
            .map(|p| active.frame.lookup_own(p, &self.classes).unwrap_or_default())
            .collect();
        args.extend(active.args.iter().skip(params.len()).cloned());
        args
    }

    /// Create class `name`, or return the class already bound to it
    fn define_class(&mut self, name: &str, parent: Option<&str>, ctx: &Context) -> InterpResult<ClassId> {
        match ctx.get(name, &self.classes) {
            Value::Class(id) => {
                tracing::debug!(class = %name, "reopening class");
                return Ok(id);
            }
            Value::Nil => {}
            other => return Err(RuntimeError::type_error("class", &self.class_name_of(&other))),
        }
        let parent = match parent {
            Some(parent_name) => match ctx.get(parent_name, &self.classes) {
                Value::Class(id) => id,
                _ => return Err(RuntimeError::undefined_class(parent_name)),
            },
            None => self.core.object,
        };
        let id = self.classes.next_id();
        let frame = ctx.new_class_frame(id);
        self.classes.insert(Class::new(name, Some(parent), frame));
        ctx.set(name, Value::Class(id), &mut self.classes);
        tracing::debug!(class = %name, parent = self.classes.name(parent), "created class");
        Ok(id)
    }

    /// Reader `name` and writer `name=` over the `@name` instance variable
    fn define_property(&mut self, class: ClassId, name: &str) {
        tracing::debug!(class = self.classes.name(class), property = %name, "synthesizing accessors");
        let key = name.to_string();
        self.define_native(class, name, move |interp, receiver, args, _| {
            natives::expect_args(&key, &args, 0)?;
            Ok(interp.instance_var(receiver, &key))
        });
        let key = name.to_string();
        self.define_native(class, &format!("{name}="), move |interp, receiver, args, _| {
            let [value] = natives::take_args::<1>(&format!("{key}="), args)?;
            interp.set_instance_var(receiver, &key, value.clone());
            Ok(value)
        });
    }
}

/// Bind parameters as locals; missing arguments are nil, extras are dropped
fn bind_params(frame: &Context, params: &[String], args: Vec<Value>) {
    let mut args = args.into_iter();
    for param in params {
        frame.define_local(param, args.next().unwrap_or_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::error::ErrorKind;

    fn run(nodes: Vec<Node>) -> (Interpreter, Value) {
        let mut interp = Interpreter::new().with_output(Output::Buffer(String::new()));
        let value = interp.evaluate(&Nodes::new(nodes)).unwrap();
        (interp, value)
    }

    fn run_err(nodes: Vec<Node>) -> RuntimeError {
        let mut interp = Interpreter::new();
        interp.evaluate(&Nodes::new(nodes)).unwrap_err()
    }

    #[test]
    fn test_core_classes_are_bound() {
        let interp = Interpreter::new();
        for name in ["Object", "Class", "String", "Integer", "Float", "Symbol", "Boolean", "Nil", "Lambda"] {
            assert!(interp.class_named(name).is_some(), "{name}");
        }
        let core = interp.core();
        assert_eq!(interp.classes().get(core.integer).parent, Some(core.object));
        assert_eq!(interp.classes().get(core.object).parent, None);
    }

    #[test]
    fn test_literals() {
        let (_, v) = run(vec![Node::int(42)]);
        assert_eq!(v.as_int(), Some(42));
        let (interp, v) = run(vec![Node::True]);
        assert_eq!(interp.class_name_of(&v), "Boolean");
        let (_, v) = run(vec![]);
        assert!(v.is_nil());
    }

    #[test]
    fn test_sequence_value_is_last_statement() {
        let (_, v) = run(vec![Node::int(1), Node::int(2), Node::int(3)]);
        assert_eq!(v.as_int(), Some(3));
    }

    #[test]
    fn test_return_stops_sequence() {
        let (_, v) = run(vec![Node::ret(Node::int(1)), Node::int(2)]);
        assert_eq!(v.as_int(), Some(1));
    }

    #[test]
    fn test_if_forwards_return_signal() {
        let mut interp = Interpreter::new();
        let nodes = Nodes::new(vec![Node::If {
            condition: Box::new(Node::True),
            body: vec![Node::ret(Node::int(7))].into(),
            else_branch: None,
        }]);
        let root = interp.root().clone();
        let flow = interp.eval_nodes(&nodes, &root).unwrap();
        assert!(matches!(flow, Flow::Return(ref v) if v.as_int() == Some(7)));
    }

    #[test]
    fn test_if_forwards_skip_signal() {
        let mut interp = Interpreter::new();
        let nodes = Nodes::new(vec![
            Node::If {
                condition: Box::new(Node::True),
                body: vec![Node::Next].into(),
                else_branch: None,
            },
            Node::int(99),
        ]);
        let root = interp.root().clone();
        let flow = interp.eval_nodes(&nodes, &root).unwrap();
        assert!(matches!(flow, Flow::Skip));
        assert!(flow.is_signal());
        assert!(flow.into_value().is_nil());
    }

    #[test]
    fn test_elsif_chain() {
        let (_, v) = run(vec![Node::If {
            condition: Box::new(Node::False),
            body: vec![Node::int(1)].into(),
            else_branch: Some(Box::new(Node::If {
                condition: Box::new(Node::Nil),
                body: vec![Node::int(2)].into(),
                else_branch: Some(Box::new(Node::Block(vec![Node::int(3)].into()))),
            })),
        }]);
        assert_eq!(v.as_int(), Some(3));
    }

    #[test]
    fn test_and_or_yield_deciding_operand() {
        let (_, v) = run(vec![Node::And(Box::new(Node::int(1)), Box::new(Node::int(2)))]);
        assert_eq!(v.as_int(), Some(2));
        let (_, v) = run(vec![Node::And(Box::new(Node::Nil), Box::new(Node::int(2)))]);
        assert!(v.is_nil());
        let (_, v) = run(vec![Node::Or(Box::new(Node::False), Box::new(Node::int(5)))]);
        assert_eq!(v.as_int(), Some(5));
        let (_, v) = run(vec![Node::Not(Box::new(Node::int(0)))]);
        assert_eq!(v.as_bool(), Some(false));
    }

    #[test]
    fn test_short_circuit_skips_rhs() {
        let (interp, _) = run(vec![Node::Or(
            Box::new(Node::True),
            Box::new(Node::set_local("touched", Node::True)),
        )]);
        assert!(interp.root().get("touched", interp.classes()).is_nil());
    }

    #[test]
    fn test_no_method_names_class_and_method() {
        let err = run_err(vec![Node::call(Node::int(1), "frobnicate", vec![])]);
        assert_eq!(err.kind, ErrorKind::NoMethod);
        assert!(err.message.contains("Integer"));
        assert!(err.message.contains("frobnicate"));
    }

    #[test]
    fn test_reopen_non_class_is_type_error() {
        let err = run_err(vec![
            Node::set_constant("Thing", Node::int(1)),
            Node::class("Thing", None, vec![]),
        ]);
        assert_eq!(err.kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_class_value_dispatches_class_side_first() {
        let mut interp = Interpreter::new();
        let symbol = interp.core().symbol;
        let made = interp.call(&Value::Class(symbol), "new", vec![]).unwrap();
        assert_eq!(interp.class_name_of(&made), "Symbol");
        let name = interp.call(&Value::Class(symbol), "name", vec![]).unwrap();
        assert_eq!(name.as_str().as_deref(), Some("Symbol"));
    }

    #[test]
    fn test_define_native_hook() {
        let mut interp = Interpreter::new();
        let integer = interp.core().integer;
        interp.define_native(integer, "double", |interp, receiver, _, _| {
            Ok(interp.integer(receiver.as_int().unwrap_or(0) * 2))
        });
        let n = interp.integer(21);
        let v = interp.call(&n, "double", vec![]).unwrap();
        assert_eq!(v.as_int(), Some(42));
    }

    #[test]
    fn test_native_receives_caller_frame() {
        let mut interp = Interpreter::new();
        let object = interp.core().object;
        interp.define_native(object, "peek_x", |interp, _, _, ctx| Ok(ctx.get("x", interp.classes())));
        let nodes = Nodes::new(vec![
            Node::def(
                "run_peek",
                &[],
                vec![Node::set_local("x", Node::int(7)), Node::send("peek_x", vec![])],
            ),
            Node::set_local("x", Node::int(1)),
            Node::send("run_peek", vec![]),
        ]);
        let v = interp.evaluate(&nodes).unwrap();
        assert_eq!(v.as_int(), Some(7));

        let main = interp.root().current_self();
        let from_host = interp.call(&main, "peek_x", vec![]).unwrap();
        assert_eq!(from_host.as_int(), Some(1));
    }

    #[test]
    fn test_stack_overflow_is_reported() {
        let mut interp = Interpreter::with_config(InterpConfig::default().with_max_depth(50));
        let nodes = Nodes::new(vec![
            Node::def("forever", &[], vec![Node::send("forever", vec![])]),
            Node::send("forever", vec![]),
        ]);
        let err = interp.evaluate(&nodes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StackOverflow);
        assert!(err.message.contains("50"));
    }

    #[test]
    fn test_depth_is_restored_after_error() {
        let mut interp = Interpreter::with_config(InterpConfig::default().with_max_depth(10));
        let nodes = Nodes::new(vec![
            Node::def("forever", &[], vec![Node::send("forever", vec![])]),
            Node::send("forever", vec![]),
        ]);
        assert!(interp.evaluate(&nodes).is_err());
        assert_eq!(interp.depth, 0);
    }

    #[test]
    fn test_take_output_drains_buffer() {
        let (mut interp, _) = run(vec![Node::send("println", vec![Node::str("hi")])]);
        assert_eq!(interp.take_output(), "hi\n");
        assert_eq!(interp.take_output(), "");
    }
}
