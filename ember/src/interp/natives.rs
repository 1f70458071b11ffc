//! Native method library
//!
//! Installed into the core classes before any evaluation, through the same
//! `define_native` hook embedders use. Every method checks its argument
//! count and reports a mismatch as an `ArgumentError`.

use super::class::ClassId;
use super::env::Context;
use super::error::{InterpResult, RuntimeError};
use super::eval::Interpreter;
use super::value::{Payload, Value};

/// Signature shared by every native method
type Native = fn(&mut Interpreter, &Value, Vec<Value>, &Context) -> InterpResult<Value>;

/// Register the whole library
pub fn bootstrap(interp: &mut Interpreter) {
    let core = interp.core();
    register(interp, core.class, &[
        ("new", class_new),
        ("name", class_name),
        ("superclass", class_superclass),
    ]);
    register(interp, core.object, &[
        ("to_string", object_to_string),
        ("inspect", object_inspect),
        ("class", object_class),
        ("is", object_is),
        ("==", object_eq),
        ("!=", object_ne),
        ("responds_to", object_responds_to),
        ("nil?", object_is_nil),
        ("print", object_print),
        ("println", object_println),
    ]);

    for class in [core.integer, core.float] {
        for op in ["+", "-", "*", "/", "%"] {
            interp.define_native(class, op, move |interp, receiver, args, _| arithmetic(interp, op, receiver, args));
        }
        for op in ["<", ">", "<=", ">=", "=="] {
            interp.define_native(class, op, move |interp, receiver, args, _| compare(interp, op, receiver, args));
        }
        register(interp, class, &[
            ("to_string", number_to_string),
            ("to_int", number_to_int),
            ("to_float", number_to_float),
        ]);
    }

    register(interp, core.string, &[
        ("+", string_concat),
        ("length", string_length),
        ("upcase", string_upcase),
        ("downcase", string_downcase),
        ("to_string", string_to_string),
        ("to_symbol", string_to_symbol),
    ]);

    interp.define_class_native(core.symbol, "new", symbol_new);
    register(interp, core.symbol, &[("is", symbol_is), ("to_string", symbol_to_string)]);

    register(interp, core.boolean, &[("to_string", boolean_to_string), ("not", boolean_not)]);
    register(interp, core.nil, &[("to_string", nil_to_string)]);
    register(interp, core.lambda, &[("call", lambda_call)]);
}

fn register(interp: &mut Interpreter, class: ClassId, methods: &[(&str, Native)]) {
    for &(name, f) in methods {
        interp.define_native(class, name, f);
    }
}

/// Fail unless exactly `expected` arguments were passed
pub fn expect_args(method: &str, args: &[Value], expected: usize) -> InterpResult<()> {
    if args.len() != expected {
        return Err(RuntimeError::arity_mismatch(method, expected, args.len()));
    }
    Ok(())
}

/// Take ownership of exactly `N` arguments
pub fn take_args<const N: usize>(method: &str, args: Vec<Value>) -> InterpResult<[Value; N]> {
    <[Value; N]>::try_from(args).map_err(|args| RuntimeError::arity_mismatch(method, N, args.len()))
}

fn class_id(interp: &Interpreter, receiver: &Value) -> InterpResult<ClassId> {
    match receiver {
        Value::Class(id) => Ok(*id),
        other => Err(RuntimeError::type_error("Class", &interp.class_name_of(other))),
    }
}

/// Text payload of an argument
fn text_arg(interp: &Interpreter, value: &Value) -> InterpResult<String> {
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| RuntimeError::type_error("String", &interp.class_name_of(value)))
}

/// Debug rendering: quoted text, `:symbol`, `nil`, otherwise `to_string`
pub fn inspect(interp: &mut Interpreter, value: &Value) -> InterpResult<String> {
    match value.payload() {
        Payload::Str(s) => Ok(format!("{s:?}")),
        Payload::Symbol(sym) => Ok(format!(":{}", interp.symbol_name(sym))),
        _ if value.is_nil() => Ok("nil".to_string()),
        _ => interp.stringify(value),
    }
}

// ---- Class ----

// Allocates, then runs `init` when the class has one.
fn class_new(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, ctx: &Context) -> InterpResult<Value> {
    let class = class_id(interp, receiver)?;
    let instance = Value::instance_of(class);
    if interp.responds_to(&instance, "init") {
        interp.call_in(&instance, "init", args, ctx)?;
    } else {
        expect_args("new", &args, 0)?;
    }
    Ok(instance)
}

fn class_name(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("name", &args, 0)?;
    let class = class_id(interp, receiver)?;
    let name = interp.classes().name(class).to_string();
    Ok(interp.string(&name))
}

fn class_superclass(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("superclass", &args, 0)?;
    let class = class_id(interp, receiver)?;
    Ok(interp.classes().get(class).parent.map(Value::Class).unwrap_or_default())
}

// ---- Object ----

fn object_to_string(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("to_string", &args, 0)?;
    let shown = match receiver {
        Value::Class(id) => interp.classes().name(*id).to_string(),
        other => format!("<{}>", interp.class_name_of(other)),
    };
    Ok(interp.string(&shown))
}

fn object_inspect(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("inspect", &args, 0)?;
    let shown = inspect(interp, receiver)?;
    Ok(interp.string(&shown))
}

fn object_class(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("class", &args, 0)?;
    Ok(Value::Class(interp.class_of(receiver)))
}

fn object_is(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    Ok(interp.boolean(args.first().is_some_and(|other| receiver == other)))
}

fn object_eq(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    let [other] = take_args::<1>("==", args)?;
    Ok(interp.boolean(*receiver == other))
}

// Dispatches `==` so overrides on the receiver are honored.
fn object_ne(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("!=", &args, 1)?;
    let equal = interp.call(receiver, "==", args)?;
    Ok(interp.boolean(!equal.is_truthy()))
}

fn object_responds_to(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    let [name] = take_args::<1>("responds_to", args)?;
    let name = match name.as_symbol() {
        Some(sym) => interp.symbol_name(sym).to_string(),
        None => text_arg(interp, &name)?,
    };
    Ok(interp.boolean(interp.responds_to(receiver, &name)))
}

fn object_is_nil(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("nil?", &args, 0)?;
    Ok(interp.boolean(receiver.is_nil()))
}

/// Text written by `print`: the single argument, or the receiver itself
fn printed(interp: &mut Interpreter, method: &str, receiver: &Value, args: Vec<Value>) -> InterpResult<String> {
    match args.len() {
        0 => interp.stringify(receiver),
        1 => interp.stringify(&args[0]),
        n => Err(RuntimeError::arity_mismatch(method, 1, n)),
    }
}

fn object_print(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    let text = printed(interp, "print", receiver, args)?;
    interp.write_output(&text)?;
    Ok(Value::Nil)
}

fn object_println(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    let mut text = printed(interp, "println", receiver, args)?;
    text.push('\n');
    interp.write_output(&text)?;
    Ok(Value::Nil)
}

// ---- Integer / Float ----

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value.payload() {
            Payload::Int(n) => Some(Num::Int(n)),
            Payload::Float(f) => Some(Num::Float(f)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }
}

fn number_operands(interp: &Interpreter, op: &str, receiver: &Value, args: &[Value]) -> InterpResult<(Num, Num)> {
    expect_args(op, args, 1)?;
    let lhs = Num::of(receiver).ok_or_else(|| RuntimeError::type_error("number", &interp.class_name_of(receiver)))?;
    let rhs = Num::of(&args[0]).ok_or_else(|| RuntimeError::type_error("number", &interp.class_name_of(&args[0])))?;
    Ok((lhs, rhs))
}

/// `+ - * / %`; mixed operands promote to float
fn arithmetic(interp: &mut Interpreter, op: &str, receiver: &Value, args: Vec<Value>) -> InterpResult<Value> {
    match number_operands(interp, op, receiver, &args)? {
        (Num::Int(a), Num::Int(b)) => {
            let n = match op {
                "+" => a.wrapping_add(b),
                "-" => a.wrapping_sub(b),
                "*" => a.wrapping_mul(b),
                "/" | "%" if b == 0 => return Err(RuntimeError::argument_error("divided by 0")),
                "/" => a.wrapping_div(b),
                _ => a.wrapping_rem(b),
            };
            Ok(interp.integer(n))
        }
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            let f = match op {
                "+" => a + b,
                "-" => a - b,
                "*" => a * b,
                "/" => a / b,
                _ => a % b,
            };
            Ok(interp.float(f))
        }
    }
}

/// `< > <= >= ==`; `==` against a non-number is false rather than an error
fn compare(interp: &mut Interpreter, op: &str, receiver: &Value, args: Vec<Value>) -> InterpResult<Value> {
    if op == "==" && args.len() == 1 && Num::of(&args[0]).is_none() {
        return Ok(interp.boolean(false));
    }
    let result = match number_operands(interp, op, receiver, &args)? {
        (Num::Int(a), Num::Int(b)) => match op {
            "<" => a < b,
            ">" => a > b,
            "<=" => a <= b,
            ">=" => a >= b,
            _ => a == b,
        },
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            match op {
                "<" => a < b,
                ">" => a > b,
                "<=" => a <= b,
                ">=" => a >= b,
                _ => a == b,
            }
        }
    };
    Ok(interp.boolean(result))
}

fn number_to_string(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("to_string", &args, 0)?;
    let shown = match Num::of(receiver) {
        Some(Num::Int(n)) => n.to_string(),
        Some(Num::Float(f)) => format!("{f:?}"),
        None => return Err(RuntimeError::type_error("number", &interp.class_name_of(receiver))),
    };
    Ok(interp.string(&shown))
}

fn number_to_int(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("to_int", &args, 0)?;
    match Num::of(receiver) {
        Some(Num::Int(n)) => Ok(interp.integer(n)),
        Some(Num::Float(f)) => Ok(interp.integer(f.trunc() as i64)),
        None => Err(RuntimeError::type_error("number", &interp.class_name_of(receiver))),
    }
}

fn number_to_float(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("to_float", &args, 0)?;
    match Num::of(receiver) {
        Some(n) => Ok(interp.float(n.as_f64())),
        None => Err(RuntimeError::type_error("number", &interp.class_name_of(receiver))),
    }
}

// ---- String ----

fn string_concat(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    let [other] = take_args::<1>("+", args)?;
    let mut text = text_arg(interp, receiver)?;
    text.push_str(&interp.stringify(&other)?);
    Ok(interp.string(&text))
}

fn string_length(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("length", &args, 0)?;
    let text = text_arg(interp, receiver)?;
    Ok(interp.integer(text.chars().count() as i64))
}

fn string_upcase(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("upcase", &args, 0)?;
    let text = text_arg(interp, receiver)?;
    Ok(interp.string(&text.to_uppercase()))
}

fn string_downcase(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("downcase", &args, 0)?;
    let text = text_arg(interp, receiver)?;
    Ok(interp.string(&text.to_lowercase()))
}

fn string_to_string(_: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("to_string", &args, 0)?;
    Ok(receiver.clone())
}

fn string_to_symbol(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("to_symbol", &args, 0)?;
    let text = text_arg(interp, receiver)?;
    Ok(interp.symbol(&text))
}

// ---- Symbol ----

/// `Symbol.new(x)` interns `x.to_string`; with no argument it is `:nil`
fn symbol_new(interp: &mut Interpreter, _: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    let name = match args.as_slice() {
        [] => "nil".to_string(),
        [value] => interp.stringify(value)?,
        _ => return Err(RuntimeError::arity_mismatch("new", 1, args.len())),
    };
    Ok(interp.symbol(&name))
}

fn symbol_is(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    let same = match (receiver.as_symbol(), args.first().and_then(Value::as_symbol)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    Ok(interp.boolean(same))
}

fn symbol_to_string(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("to_string", &args, 0)?;
    let sym = receiver
        .as_symbol()
        .ok_or_else(|| RuntimeError::type_error("Symbol", &interp.class_name_of(receiver)))?;
    let name = interp.symbol_name(sym).to_string();
    Ok(interp.string(&name))
}

// ---- Boolean / Nil ----

fn boolean_to_string(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("to_string", &args, 0)?;
    let shown = if receiver.is_truthy() { "true" } else { "false" };
    Ok(interp.string(shown))
}

fn boolean_not(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("not", &args, 0)?;
    Ok(interp.boolean(!receiver.is_truthy()))
}

fn nil_to_string(interp: &mut Interpreter, _: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    expect_args("to_string", &args, 0)?;
    Ok(interp.string(""))
}

// ---- Lambda ----

fn lambda_call(interp: &mut Interpreter, receiver: &Value, args: Vec<Value>, _: &Context) -> InterpResult<Value> {
    let closure = receiver
        .as_closure()
        .ok_or_else(|| RuntimeError::type_error("Lambda", &interp.class_name_of(receiver)))?;
    interp.call_lambda(&closure, args)
}
