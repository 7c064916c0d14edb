//! Runtime values.
//!
//! Lists and dictionaries are shared and mutable (`Rc<RefCell<..>>`), so an
//! element write through one alias is visible through every other. Functions,
//! classes and instances compare by identity.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::{FunctionDef, Param};
use crate::interpreter::Interpreter;
use crate::runtime::class::{Class, Instance};
use crate::runtime::context::Context;
use crate::runtime::dict::Dict;
use crate::runtime::error::RuntimeError;
use crate::token::Span;

/// Longest list, in elements, or string, in bytes, a program may build.
pub const MAX_LENGTH: usize = 1 << 24;

/// Nesting depth past which collections are no longer expanded when printed.
pub const MAX_DISPLAY_DEPTH: usize = 32;

#[derive(Clone)]
pub enum Value {
    None,
    Number(f64),
    String(String),
    Boolean(bool),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<Dict>>),
    Function(Rc<Function>),
    Native(Rc<NativeFunction>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
}

/// A user function closed over the context it was defined in.
pub struct Function {
    pub def: Rc<FunctionDef>,
    pub closure: Rc<Context>,
    /// Receiver bound as `self` when called as a method.
    pub receiver: Option<Rc<Instance>>,
    /// Class declaring the method, `None` for plain functions.
    pub owner: Option<Rc<Class>>,
}

impl Function {
    pub fn name(&self) -> &str {
        self.def.name.as_deref().unwrap_or("<anonymous>")
    }
}

/// Body of a native function. Arguments are already bound by name in the
/// context it receives.
pub type NativeBehavior = fn(&mut Interpreter, &Rc<Context>, Span) -> Result<Value, RuntimeError>;

pub struct NativeFunction {
    pub name: &'static str,
    pub params: Vec<Param>,
    pub behavior: NativeBehavior,
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    pub fn list(values: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(values)))
    }

    pub fn dict(dict: Dict) -> Self {
        Value::Dict(Rc::new(RefCell::new(dict)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Function(_) | Value::Native(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }

    /// Result of `typeof`: the class name for instances.
    pub fn type_of(&self) -> String {
        match self {
            Value::Instance(instance) => instance.class.name.clone(),
            other => other.type_name().to_string(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Boolean(value) => *value,
            Value::Number(value) => *value != 0.0,
            Value::String(value) => !value.is_empty(),
            Value::List(values) => !values.borrow().is_empty(),
            Value::Dict(dict) => !dict.borrow().is_empty(),
            Value::Function(_)
            | Value::Native(_)
            | Value::Class(_)
            | Value::Instance(_) => true,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Whether the value satisfies a declared parameter type.
    pub fn matches_type(&self, type_name: &str) -> bool {
        match type_name {
            "any" => true,
            "number" | "string" | "boolean" | "list" | "dict" | "function" | "class" | "none" => {
                self.type_name() == type_name
            }
            class_name => match self {
                Value::Instance(instance) => instance.class.is_or_inherits(class_name),
                _ => false,
            },
        }
    }

    /// Quoted form used for elements nested in lists and dictionaries.
    fn write_element(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<*const ()>) -> fmt::Result {
        match self {
            Value::String(value) => write!(f, "{value:?}"),
            other => other.write_nested(f, open),
        }
    }

    /// `open` holds the collections currently being written; meeting one of
    /// them again prints `[...]` or `{...}` instead of recursing.
    fn write_nested(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<*const ()>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Number(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "{value}"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::List(values) => {
                let ptr = Rc::as_ptr(values).cast::<()>();
                if open.contains(&ptr) || open.len() >= MAX_DISPLAY_DEPTH {
                    return write!(f, "[...]");
                }
                open.push(ptr);
                write!(f, "[")?;
                for (i, value) in values.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    value.write_element(f, open)?;
                }
                open.pop();
                write!(f, "]")
            }
            Value::Dict(dict) => {
                let ptr = Rc::as_ptr(dict).cast::<()>();
                if open.contains(&ptr) || open.len() >= MAX_DISPLAY_DEPTH {
                    return write!(f, "{{...}}");
                }
                open.push(ptr);
                write!(f, "{{")?;
                for (i, (key, value)) in dict.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key:?}: ")?;
                    value.write_element(f, open)?;
                }
                open.pop();
                write!(f, "}}")
            }
            Value::Function(function) => write!(f, "<function {}>", function.name()),
            Value::Native(native) => write!(f, "<native function {}>", native.name),
            Value::Class(class) => write!(f, "<class {}>", class.name),
            Value::Instance(instance) => write!(f, "<{} instance>", instance.class.name),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_nested(f, &mut Vec::new())
    }
}

// Values can reach themselves, so Debug reuses the cycle-aware Display form
// for collections and never descends into closures or instances.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Number(value) => write!(f, "Number({value})"),
            Value::String(value) => write!(f, "String({value:?})"),
            Value::Boolean(value) => write!(f, "Boolean({value})"),
            Value::List(_) => write!(f, "List({self})"),
            Value::Dict(_) => write!(f, "Dict({self})"),
            other => write!(f, "{other}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        equals(self, other, &mut Vec::new())
    }
}

/// Structural equality for lists and dictionaries. A pair of collections
/// already under comparison further up counts as equal, so self-referential
/// values terminate.
fn equals(left: &Value, right: &Value, pending: &mut Vec<(*const (), *const ())>) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            let pair = (Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>());
            if Rc::ptr_eq(a, b) || pending.contains(&pair) {
                return true;
            }
            let (a, b) = (a.borrow(), b.borrow());
            if a.len() != b.len() {
                return false;
            }
            pending.push(pair);
            let same = a.iter().zip(b.iter()).all(|(x, y)| equals(x, y, pending));
            pending.pop();
            same
        }
        (Value::Dict(a), Value::Dict(b)) => {
            let pair = (Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>());
            if Rc::ptr_eq(a, b) || pending.contains(&pair) {
                return true;
            }
            let (a, b) = (a.borrow(), b.borrow());
            if a.len() != b.len() {
                return false;
            }
            pending.push(pair);
            let same = a
                .iter()
                .all(|(key, x)| b.get(key).is_some_and(|y| equals(x, y, pending)));
            pending.pop();
            same
        }
        (Value::Function(a), Value::Function(b)) => {
            Rc::ptr_eq(&a.def, &b.def)
                && Rc::ptr_eq(&a.closure, &b.closure)
                && match (&a.receiver, &b.receiver) {
                    (Some(x), Some(y)) => Rc::ptr_eq(x, y),
                    (None, None) => true,
                    _ => false,
                }
        }
        (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
        (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_numbers_without_trailing_zero() {
        assert_eq!(Value::Number(7.0).to_string(), "7");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.25).to_string(), "-0.25");
    }

    #[test]
    fn formats_nested_collections_with_quoted_strings() {
        let mut dict = Dict::new();
        dict.insert("name", Value::string("rex"));
        dict.insert("tags", Value::list(vec![Value::Number(1.0), Value::None]));
        assert_eq!(
            Value::dict(dict).to_string(),
            r#"{"name": "rex", "tags": [1, none]}"#
        );
        assert_eq!(Value::string("plain").to_string(), "plain");
    }

    #[test]
    fn truthiness_of_empty_values() {
        for falsy in [
            Value::None,
            Value::Boolean(false),
            Value::Number(0.0),
            Value::string(""),
            Value::list(Vec::new()),
            Value::dict(Dict::new()),
        ] {
            assert!(!falsy.is_truthy(), "{falsy:?} should be falsy");
        }
        assert!(Value::list(vec![Value::None]).is_truthy());
        assert!(Value::string("0").is_truthy());
    }

    #[test]
    fn lists_share_storage_between_aliases() {
        let list = Value::list(vec![Value::Number(1.0)]);
        let alias = list.clone();
        if let Value::List(values) = &alias {
            values.borrow_mut().push(Value::Number(2.0));
        }
        assert_eq!(list.to_string(), "[1, 2]");
        assert_eq!(list, alias);
    }

    #[test]
    fn self_referential_lists_print_and_compare() {
        let cyclic = || {
            let list = Value::list(vec![Value::Number(1.0)]);
            if let Value::List(values) = &list {
                values.borrow_mut().push(list.clone());
            }
            list
        };
        let (a, b) = (cyclic(), cyclic());
        assert_eq!(a.to_string(), "[1, [...]]");
        assert_eq!(a, b);
        for list in [a, b] {
            if let Value::List(values) = list {
                values.borrow_mut().clear();
            }
        }
    }
}
