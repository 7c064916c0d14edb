//! Native functions installed in the global scope.
//!
//! Each entry declares its parameters the same way a user function would, so
//! arity and type checks happen in the regular call path before the behavior
//! runs. Behaviors read their arguments back from the call context by name.

use std::rc::Rc;

use tracing::trace;

use crate::ast::Param;
use crate::interpreter::{At, Interpreter};
use crate::runtime::context::Context;
use crate::runtime::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::symbol_table::SymbolTable;
use crate::runtime::value::{NativeBehavior, NativeFunction, Value};
use crate::token::Span;

type NativeResult = Result<Value, RuntimeError>;

struct ParamSpec {
    name: &'static str,
    type_name: Option<&'static str>,
    optional: bool,
    rest: bool,
}

const fn required(name: &'static str, type_name: Option<&'static str>) -> ParamSpec {
    ParamSpec {
        name,
        type_name,
        optional: false,
        rest: false,
    }
}

const fn optional(name: &'static str, type_name: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        type_name: Some(type_name),
        optional: true,
        rest: false,
    }
}

const fn rest(name: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        type_name: Some("list"),
        optional: false,
        rest: true,
    }
}

const LIST: Option<&str> = Some("list");
const DICT: Option<&str> = Some("dict");
const NUMBER: Option<&str> = Some("number");
const STRING: Option<&str> = Some("string");

const BUILTINS: &[(&str, &[ParamSpec], NativeBehavior)] = &[
    ("print", &[rest("values")], print),
    ("len", &[required("value", None)], len),
    ("append", &[required("list", LIST), required("value", None)], append),
    ("pop", &[required("list", LIST), optional("index", "number")], pop),
    (
        "insert",
        &[required("list", LIST), required("index", NUMBER), required("value", None)],
        insert,
    ),
    ("keys", &[required("dict", DICT)], keys),
    ("values", &[required("dict", DICT)], values),
    ("str", &[required("value", None)], to_str),
    ("num", &[required("value", None)], to_num),
    ("round", &[required("value", NUMBER), optional("digits", "number")], round),
    ("floor", &[required("value", NUMBER)], floor),
    ("abs", &[required("value", NUMBER)], abs),
    ("error", &[required("message", STRING)], error),
];

fn to_param(spec: &ParamSpec) -> Param {
    let mut param = Param::required(spec.name, Span::default());
    param.type_name = spec.type_name.map(str::to_string);
    param.is_optional = spec.optional;
    param.is_rest = spec.rest;
    param
}

/// Installs every native function into `symbols`.
pub fn register(symbols: &SymbolTable) {
    for (name, params, behavior) in BUILTINS {
        let native = NativeFunction {
            name: *name,
            params: params.iter().map(to_param).collect(),
            behavior: *behavior,
        };
        // Fresh global tables hold no constants, so defining cannot fail.
        let _ = symbols.set(name, Value::Native(Rc::new(native)));
    }
    trace!(count = BUILTINS.len(), "registered builtins");
}

fn arg(context: &Rc<Context>, name: &str) -> Value {
    context.symbols.get(name).unwrap_or(Value::None)
}

fn number_arg(context: &Rc<Context>, name: &str) -> Option<f64> {
    match arg(context, name) {
        Value::Number(value) => Some(value),
        _ => None,
    }
}

fn invalid(message: String, span: Span, context: &Rc<Context>) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::InvalidArgument { message }, span, context)
}

fn list_index(value: f64, len: usize, allow_end: bool) -> Result<usize, RuntimeErrorKind> {
    if value.fract() != 0.0 || !value.is_finite() {
        return Err(RuntimeErrorKind::InvalidIndex {
            got: value.to_string(),
        });
    }
    let index = value as i64;
    let resolved = if index < 0 { len as i64 + index } else { index };
    let limit = if allow_end { len as i64 } else { len as i64 - 1 };
    if resolved < 0 || resolved > limit {
        return Err(RuntimeErrorKind::IndexOutOfRange { index, len });
    }
    Ok(resolved as usize)
}

fn print(interpreter: &mut Interpreter, context: &Rc<Context>, span: Span) -> NativeResult {
    let values = match arg(context, "values") {
        Value::List(values) => values.borrow().clone(),
        _ => Vec::new(),
    };
    let mut parts = Vec::with_capacity(values.len());
    for value in &values {
        parts.push(interpreter.stringify(value, span, context)?);
    }
    interpreter.emit(parts.join(" "));
    Ok(Value::None)
}

fn len(_: &mut Interpreter, context: &Rc<Context>, span: Span) -> NativeResult {
    let len = match arg(context, "value") {
        Value::String(text) => text.chars().count(),
        Value::List(values) => values.borrow().len(),
        Value::Dict(dict) => dict.borrow().len(),
        other => {
            return Err(invalid(
                format!("len() is not defined for {}", other.type_name()),
                span,
                context,
            ));
        }
    };
    Ok(Value::Number(len as f64))
}

fn append(_: &mut Interpreter, context: &Rc<Context>, _: Span) -> NativeResult {
    let list = arg(context, "list");
    if let Value::List(values) = &list {
        values.borrow_mut().push(arg(context, "value"));
    }
    Ok(list)
}

fn pop(_: &mut Interpreter, context: &Rc<Context>, span: Span) -> NativeResult {
    let Value::List(values) = arg(context, "list") else {
        return Ok(Value::None);
    };
    let mut values = values.borrow_mut();
    let index = number_arg(context, "index").unwrap_or(-1.0);
    let index = list_index(index, values.len(), false).at(span, context)?;
    Ok(values.remove(index))
}

fn insert(_: &mut Interpreter, context: &Rc<Context>, span: Span) -> NativeResult {
    let list = arg(context, "list");
    if let Value::List(values) = &list {
        let index = number_arg(context, "index").unwrap_or_default();
        let mut values = values.borrow_mut();
        let index = list_index(index, values.len(), true).at(span, context)?;
        values.insert(index, arg(context, "value"));
    }
    Ok(list)
}

fn keys(_: &mut Interpreter, context: &Rc<Context>, _: Span) -> NativeResult {
    let keys = match arg(context, "dict") {
        Value::Dict(dict) => dict.borrow().keys().map(Value::string).collect(),
        _ => Vec::new(),
    };
    Ok(Value::list(keys))
}

fn values(_: &mut Interpreter, context: &Rc<Context>, _: Span) -> NativeResult {
    let values = match arg(context, "dict") {
        Value::Dict(dict) => dict.borrow().values().cloned().collect(),
        _ => Vec::new(),
    };
    Ok(Value::list(values))
}

fn to_str(interpreter: &mut Interpreter, context: &Rc<Context>, span: Span) -> NativeResult {
    let value = arg(context, "value");
    Ok(Value::String(interpreter.stringify(&value, span, context)?))
}

fn to_num(_: &mut Interpreter, context: &Rc<Context>, span: Span) -> NativeResult {
    match arg(context, "value") {
        Value::Number(value) => Ok(Value::Number(value)),
        Value::Boolean(value) => Ok(Value::Number(if value { 1.0 } else { 0.0 })),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| {
                invalid(format!("Cannot convert \"{text}\" to a number"), span, context)
            }),
        other => Err(invalid(
            format!("Cannot convert {} to a number", other.type_name()),
            span,
            context,
        )),
    }
}

fn round(_: &mut Interpreter, context: &Rc<Context>, _: Span) -> NativeResult {
    let value = number_arg(context, "value").unwrap_or_default();
    let digits = number_arg(context, "digits").unwrap_or_default().trunc();
    let factor = 10f64.powf(digits);
    Ok(Value::Number((value * factor).round() / factor))
}

fn floor(_: &mut Interpreter, context: &Rc<Context>, _: Span) -> NativeResult {
    Ok(Value::Number(number_arg(context, "value").unwrap_or_default().floor()))
}

fn abs(_: &mut Interpreter, context: &Rc<Context>, _: Span) -> NativeResult {
    Ok(Value::Number(number_arg(context, "value").unwrap_or_default().abs()))
}

fn error(_: &mut Interpreter, context: &Rc<Context>, span: Span) -> NativeResult {
    let message = match arg(context, "message") {
        Value::String(message) => message,
        other => other.to_string(),
    };
    Err(RuntimeErrorKind::Raised { message }).at(span, context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_is_registered() {
        let symbols = SymbolTable::new(None);
        register(&symbols);
        for (name, _, _) in BUILTINS {
            assert!(
                matches!(symbols.get(name), Some(Value::Native(_))),
                "missing builtin {name}"
            );
        }
    }

    #[test]
    fn list_index_allows_the_end_only_for_insertion() {
        assert_eq!(list_index(-1.0, 3, false), Ok(2));
        assert_eq!(list_index(3.0, 3, true), Ok(3));
        assert!(list_index(3.0, 3, false).is_err());
        assert!(list_index(0.5, 3, false).is_err());
    }
}
