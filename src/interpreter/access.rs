//! Indexing, slicing, deletion and member access.

use std::rc::Rc;

use crate::ast::{Index, Node, NodeKind, Visibility};
use crate::runtime::class::{Class, Instance, MethodKind, is_accessible};
use crate::runtime::context::Context;
use crate::runtime::error::{RuntimeError, RuntimeErrorKind, checked_length};
use crate::runtime::result::RuntimeResult;
use crate::runtime::value::Value;
use crate::token::Span;

use super::{At, Interpreter};

type Evaluation = Result<RuntimeResult, RuntimeError>;

fn integer(value: &Value) -> Result<i64, RuntimeErrorKind> {
    match value {
        Value::Number(number) if number.fract() == 0.0 && number.is_finite() => Ok(*number as i64),
        other => Err(RuntimeErrorKind::InvalidIndex {
            got: match other {
                Value::Number(number) => number.to_string(),
                other => other.type_name().to_string(),
            },
        }),
    }
}

/// Negative indices count from the end.
fn resolve(index: i64, len: usize) -> i64 {
    if index < 0 { len as i64 + index } else { index }
}

fn element_index(key: &Value, len: usize) -> Result<usize, RuntimeErrorKind> {
    let index = integer(key)?;
    let resolved = resolve(index, len);
    if resolved < 0 || resolved >= len as i64 {
        return Err(RuntimeErrorKind::IndexOutOfRange { index, len });
    }
    Ok(resolved as usize)
}

fn not_indexable(target: &Value, key: &Value) -> RuntimeErrorKind {
    RuntimeErrorKind::NotIndexable {
        type_name: target.type_name().to_string(),
        index_type: key.type_name().to_string(),
    }
}

pub(super) fn read_index(target: &Value, key: &Value) -> Result<Value, RuntimeErrorKind> {
    match (target, key) {
        (Value::List(values), Value::Number(_)) => {
            let values = values.borrow();
            let index = element_index(key, values.len())?;
            Ok(values[index].clone())
        }
        (Value::String(text), Value::Number(_)) => {
            let chars: Vec<char> = text.chars().collect();
            let index = element_index(key, chars.len())?;
            Ok(Value::String(chars[index].to_string()))
        }
        (Value::Dict(dict), Value::String(name)) => dict
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeErrorKind::KeyNotFound { key: name.clone() }),
        _ => Err(not_indexable(target, key)),
    }
}

fn slice_bounds(
    start: Option<&Value>,
    end: Option<&Value>,
    len: usize,
) -> Result<(usize, usize), RuntimeErrorKind> {
    let start = match start {
        Some(value) => resolve(integer(value)?, len),
        None => 0,
    };
    let end = match end {
        Some(value) => resolve(integer(value)?, len),
        None => len as i64,
    };
    if start < 0 || end > len as i64 || start > end {
        return Err(RuntimeErrorKind::IllegalSliceBounds { start, end, len });
    }
    Ok((start as usize, end as usize))
}

/// `target[start:end]`. Omitted bounds default to `0` and the length;
/// negative bounds are resolved against the length before slicing.
pub(super) fn slice(
    target: &Value,
    start: Option<&Value>,
    end: Option<&Value>,
) -> Result<Value, RuntimeErrorKind> {
    match target {
        Value::List(values) => {
            let values = values.borrow();
            let (start, end) = slice_bounds(start, end, values.len())?;
            Ok(Value::list(values[start..end].to_vec()))
        }
        Value::String(text) => {
            let chars: Vec<char> = text.chars().collect();
            let (start, end) = slice_bounds(start, end, chars.len())?;
            Ok(Value::String(chars[start..end].iter().collect()))
        }
        other => Err(not_indexable(other, start.or(end).unwrap_or(&Value::None))),
    }
}

/// Writes `value` at `key`, or appends when `key` is `None` (the push
/// marker). Lists grow with `none` when written past their end.
pub(super) fn write_index(
    target: &Value,
    key: Option<&Value>,
    value: Value,
) -> Result<(), RuntimeErrorKind> {
    match (target, key) {
        (Value::List(values), None) => {
            let mut values = values.borrow_mut();
            checked_length("list", values.len().checked_add(1))?;
            values.push(value);
            Ok(())
        }
        (Value::List(values), Some(key @ Value::Number(_))) => {
            let mut values = values.borrow_mut();
            let index = integer(key)?;
            let resolved = resolve(index, values.len());
            if resolved < 0 {
                return Err(RuntimeErrorKind::IndexOutOfRange {
                    index,
                    len: values.len(),
                });
            }
            let resolved = resolved as usize;
            if resolved >= values.len() {
                let len = checked_length("list", resolved.checked_add(1))?;
                let additional = len - values.len();
                values
                    .try_reserve_exact(additional)
                    .map_err(|_| RuntimeErrorKind::too_large("list"))?;
                values.resize(len, Value::None);
            }
            values[resolved] = value;
            Ok(())
        }
        (Value::Dict(dict), Some(Value::String(name))) => {
            dict.borrow_mut().insert(name.as_str(), value);
            Ok(())
        }
        (Value::String(_), _) => Err(RuntimeErrorKind::InvalidArgument {
            message: "Strings are immutable".to_string(),
        }),
        (target, key) => Err(not_indexable(target, key.unwrap_or(&Value::None))),
    }
}

fn remove_index(target: &Value, key: &Value) -> Result<Value, RuntimeErrorKind> {
    match (target, key) {
        (Value::List(values), Value::Number(_)) => {
            let mut values = values.borrow_mut();
            let index = element_index(key, values.len())?;
            Ok(values.remove(index))
        }
        (Value::Dict(dict), Value::String(name)) => dict
            .borrow_mut()
            .remove(name)
            .ok_or_else(|| RuntimeErrorKind::KeyNotFound { key: name.clone() }),
        _ => Err(not_indexable(target, key)),
    }
}

impl Interpreter {
    pub(super) fn index_access(
        &mut self,
        target: &Node,
        index: &Index,
        optional: bool,
        span: Span,
        context: &Rc<Context>,
    ) -> Evaluation {
        let target = propagate!(self.evaluate(target, context)?);
        if optional && target.is_none() {
            return Ok(RuntimeResult::none());
        }
        let value = match index {
            Index::Single(key) => {
                let key = propagate!(self.evaluate(key, context)?);
                read_index(&target, &key).at(span, context)?
            }
            Index::Slice { start, end } => {
                let start = match start {
                    Some(node) => Some(propagate!(self.evaluate(node, context)?)),
                    None => None,
                };
                let end = match end {
                    Some(node) => Some(propagate!(self.evaluate(node, context)?)),
                    None => None,
                };
                slice(&target, start.as_ref(), end.as_ref()).at(span, context)?
            }
            Index::Push => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::InvalidIndex {
                        got: "[]".to_string(),
                    },
                    span,
                    context,
                ));
            }
        };
        Ok(RuntimeResult::Value(value))
    }

    pub(super) fn index_assign(
        &mut self,
        target: &Node,
        index: &Index,
        value: &Node,
        span: Span,
        context: &Rc<Context>,
    ) -> Evaluation {
        let target = propagate!(self.evaluate(target, context)?);
        let key = match index {
            Index::Single(key) => Some(propagate!(self.evaluate(key, context)?)),
            Index::Push => None,
            Index::Slice { .. } => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::InvalidIndex {
                        got: "a slice".to_string(),
                    },
                    span,
                    context,
                ));
            }
        };
        let value = propagate!(self.evaluate(value, context)?);
        write_index(&target, key.as_ref(), value.clone()).at(span, context)?;
        Ok(RuntimeResult::Value(value))
    }

    pub(super) fn delete(
        &mut self,
        target: &Node,
        span: Span,
        context: &Rc<Context>,
    ) -> Evaluation {
        match &target.kind {
            NodeKind::VarAccess(name) => {
                context.symbols.remove(name).at(span, context)?;
            }
            NodeKind::IndexAccess {
                target,
                index: Index::Single(key),
                ..
            } => {
                let target = propagate!(self.evaluate(target, context)?);
                let key = propagate!(self.evaluate(key, context)?);
                remove_index(&target, &key).at(span, context)?;
            }
            _ => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::InvalidArgument {
                        message: "Only variables and indexed elements can be deleted".to_string(),
                    },
                    span,
                    context,
                ));
            }
        }
        Ok(RuntimeResult::none())
    }

    pub(super) fn check_access(
        &self,
        visibility: Visibility,
        owner: &Rc<Class>,
        member: &str,
        span: Span,
        context: &Rc<Context>,
    ) -> Result<(), RuntimeError> {
        if is_accessible(visibility, owner, context.class_scope.as_ref()) {
            return Ok(());
        }
        Err(RuntimeError::new(
            RuntimeErrorKind::Visibility {
                member: member.to_string(),
                visibility: visibility.as_str().to_string(),
                owner: owner.name.clone(),
            },
            span,
            context,
        ))
    }

    pub(super) fn get_property(
        &mut self,
        target: &Value,
        name: &str,
        span: Span,
        context: &Rc<Context>,
    ) -> Result<Value, RuntimeError> {
        match target {
            Value::Instance(instance) => self.instance_property(instance, name, span, context),
            Value::Dict(dict) => dict
                .borrow()
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeErrorKind::KeyNotFound {
                    key: name.to_string(),
                })
                .at(span, context),
            Value::Class(class) => Err(RuntimeErrorKind::UnknownMember {
                class: class.name.clone(),
                member: name.to_string(),
            })
            .at(span, context),
            other => Err(RuntimeErrorKind::NoProperties {
                member: name.to_string(),
                type_name: other.type_name().to_string(),
            })
            .at(span, context),
        }
    }

    fn instance_property(
        &mut self,
        instance: &Rc<Instance>,
        name: &str,
        span: Span,
        context: &Rc<Context>,
    ) -> Result<Value, RuntimeError> {
        if let Some(member) = instance.member(name) {
            self.check_access(member.visibility, &member.owner, name, span, context)?;
            return Ok(member.value);
        }
        let class = &instance.class;
        if let Some(method) = class.find(MethodKind::Method, name, false) {
            self.check_access(method.flags.visibility, &method.owner, name, span, context)?;
            return Ok(Value::Function(self.bind(method, Some(Rc::clone(instance)))));
        }
        if let Some(getter) = class.find(MethodKind::Getter, name, false) {
            self.check_access(getter.flags.visibility, &getter.owner, name, span, context)?;
            let getter = self.bind(getter, Some(Rc::clone(instance)));
            return self.call_function(&getter, Vec::new(), span, context);
        }
        Err(RuntimeErrorKind::UnknownMember {
            class: class.name.clone(),
            member: name.to_string(),
        })
        .at(span, context)
    }

    pub(super) fn set_property(
        &mut self,
        target: &Value,
        name: &str,
        value: Value,
        span: Span,
        context: &Rc<Context>,
    ) -> Result<(), RuntimeError> {
        match target {
            Value::Instance(instance) => {
                if let Some(member) = instance.member(name) {
                    self.check_access(member.visibility, &member.owner, name, span, context)?;
                    if let Some(slot) = instance.members.borrow_mut().get_mut(name) {
                        slot.value = value;
                    }
                    return Ok(());
                }
                if let Some(setter) = instance.class.find(MethodKind::Setter, name, false) {
                    self.check_access(setter.flags.visibility, &setter.owner, name, span, context)?;
                    let setter = self.bind(setter, Some(Rc::clone(instance)));
                    self.call_function(&setter, vec![value], span, context)?;
                    return Ok(());
                }
                Err(RuntimeErrorKind::UnknownMember {
                    class: instance.class.name.clone(),
                    member: name.to_string(),
                })
                .at(span, context)
            }
            Value::Dict(dict) => {
                dict.borrow_mut().insert(name, value);
                Ok(())
            }
            other => Err(RuntimeErrorKind::NoProperties {
                member: name.to_string(),
                type_name: other.type_name().to_string(),
            })
            .at(span, context),
        }
    }

    fn static_target(
        target: &Value,
        span: Span,
        context: &Rc<Context>,
    ) -> Result<Rc<Class>, RuntimeError> {
        match target {
            Value::Class(class) => Ok(Rc::clone(class)),
            Value::Instance(instance) => Ok(Rc::clone(&instance.class)),
            other => Err(RuntimeErrorKind::NotAClass {
                name: other.type_name().to_string(),
            })
            .at(span, context),
        }
    }

    pub(super) fn get_static(
        &mut self,
        target: &Value,
        name: &str,
        span: Span,
        context: &Rc<Context>,
    ) -> Result<Value, RuntimeError> {
        let class = Self::static_target(target, span, context)?;
        let member = class
            .find_static(name)
            .ok_or_else(|| RuntimeErrorKind::UnknownMember {
                class: class.name.clone(),
                member: name.to_string(),
            })
            .at(span, context)?;
        self.check_access(member.visibility, &member.owner, name, span, context)?;
        Ok(member.value)
    }

    pub(super) fn set_static(
        &mut self,
        target: &Value,
        name: &str,
        value: Value,
        span: Span,
        context: &Rc<Context>,
    ) -> Result<(), RuntimeError> {
        let class = Self::static_target(target, span, context)?;
        let member = class
            .find_static(name)
            .ok_or_else(|| RuntimeErrorKind::UnknownMember {
                class: class.name.clone(),
                member: name.to_string(),
            })
            .at(span, context)?;
        self.check_access(member.visibility, &member.owner, name, span, context)?;
        if let Some(slot) = member.owner.statics.borrow_mut().get_mut(name) {
            slot.value = value;
        }
        Ok(())
    }
}
