//! Node dispatch: one rule per node kind.

use std::rc::Rc;

use crate::ast::{BinaryOp, Branch, Node, NodeKind, TemplatePart};
use crate::runtime::context::Context;
use crate::runtime::dict::Dict;
use crate::runtime::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::result::RuntimeResult;
use crate::runtime::value::{Function, Value};

use super::ops::{binary_op, concatenate, concatenates, unary_op};
use super::{At, Interpreter};

type Evaluation = Result<RuntimeResult, RuntimeError>;

impl Interpreter {
    pub fn evaluate(&mut self, node: &Node, context: &Rc<Context>) -> Evaluation {
        let span = node.span;
        let value = match &node.kind {
            NodeKind::Number(value) => Value::Number(*value),
            NodeKind::String(value) => Value::String(value.clone()),
            NodeKind::Boolean(value) => Value::Boolean(*value),
            NodeKind::None => Value::None,
            NodeKind::Template(parts) => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(chunk) => text.push_str(chunk),
                        TemplatePart::Expr(expr) => {
                            let value = propagate!(self.evaluate(expr, context)?);
                            text.push_str(&self.stringify(&value, expr.span, context)?);
                        }
                    }
                }
                Value::String(text)
            }
            NodeKind::List(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(propagate!(self.evaluate(element, context)?));
                }
                Value::list(values)
            }
            NodeKind::Dict(entries) => {
                let mut dict = Dict::new();
                for (key, value) in entries {
                    dict.insert(key.as_str(), propagate!(self.evaluate(value, context)?));
                }
                Value::dict(dict)
            }

            NodeKind::VarDeclare { name, value } => {
                let value = propagate!(self.evaluate(value, context)?);
                context.symbols.set(name, value.clone()).at(span, context)?;
                value
            }
            NodeKind::ConstDeclare { name, value } => {
                let value = propagate!(self.evaluate(value, context)?);
                context
                    .symbols
                    .define_constant(name, value.clone())
                    .at(span, context)?;
                value
            }
            NodeKind::VarAccess(name) => context
                .symbols
                .get(name)
                .ok_or_else(|| RuntimeErrorKind::UndefinedVariable { name: name.clone() })
                .at(span, context)?,
            NodeKind::VarModify { name, value } => {
                let value = propagate!(self.evaluate(value, context)?);
                context.symbols.modify(name, value.clone()).at(span, context)?;
                value
            }
            NodeKind::Delete(target) => return self.delete(target, span, context),
            NodeKind::IndexAccess {
                target,
                index,
                optional,
            } => return self.index_access(target, index, *optional, span, context),
            NodeKind::IndexAssign {
                target,
                index,
                value,
            } => return self.index_assign(target, index, value, span, context),
            NodeKind::Property {
                target,
                name,
                optional,
            } => {
                let target = propagate!(self.evaluate(target, context)?);
                if *optional && target.is_none() {
                    return Ok(RuntimeResult::none());
                }
                self.get_property(&target, name, span, context)?
            }
            NodeKind::PropertyAssign {
                target,
                name,
                value,
            } => {
                let target = propagate!(self.evaluate(target, context)?);
                let value = propagate!(self.evaluate(value, context)?);
                self.set_property(&target, name, value.clone(), span, context)?;
                value
            }
            NodeKind::StaticProperty {
                target,
                name,
                optional,
            } => {
                let target = propagate!(self.evaluate(target, context)?);
                if *optional && target.is_none() {
                    return Ok(RuntimeResult::none());
                }
                self.get_static(&target, name, span, context)?
            }
            NodeKind::StaticPropertyAssign {
                target,
                name,
                value,
            } => {
                let target = propagate!(self.evaluate(target, context)?);
                let value = propagate!(self.evaluate(value, context)?);
                self.set_static(&target, name, value.clone(), span, context)?;
                value
            }

            NodeKind::Binary { op, left, right } => {
                let left = propagate!(self.evaluate(left, context)?);
                match op {
                    BinaryOp::And if !left.is_truthy() => left,
                    BinaryOp::Or if left.is_truthy() => left,
                    BinaryOp::Nullish if !left.is_none() => left,
                    BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => {
                        propagate!(self.evaluate(right, context)?)
                    }
                    BinaryOp::Add => {
                        let right = propagate!(self.evaluate(right, context)?);
                        if concatenates(&left, &right) {
                            let left = self.stringify(&left, span, context)?;
                            let right = self.stringify(&right, span, context)?;
                            concatenate(&left, &right).at(span, context)?
                        } else {
                            binary_op(*op, &left, &right).at(span, context)?
                        }
                    }
                    _ => {
                        let right = propagate!(self.evaluate(right, context)?);
                        binary_op(*op, &left, &right).at(span, context)?
                    }
                }
            }
            NodeKind::Unary { op, operand } => {
                let operand = propagate!(self.evaluate(operand, context)?);
                unary_op(*op, &operand).at(span, context)?
            }

            NodeKind::If {
                branches,
                else_body,
                else_discard,
            } => return self.eval_if(branches, else_body.as_deref(), *else_discard, context),
            NodeKind::For {
                var,
                start,
                end,
                step,
                body,
                discard,
            } => {
                return self.eval_for(
                    var,
                    start.as_deref(),
                    end,
                    step.as_deref(),
                    body,
                    *discard,
                    span,
                    context,
                );
            }
            NodeKind::Foreach {
                iterable,
                key,
                value,
                body,
                discard,
            } => {
                return self.eval_foreach(
                    iterable,
                    key.as_deref(),
                    value,
                    body,
                    *discard,
                    span,
                    context,
                );
            }
            NodeKind::While {
                condition,
                body,
                discard,
            } => return self.eval_while(condition, body, *discard, span, context),
            NodeKind::Switch { cases, default } => {
                for (condition, body) in cases {
                    if propagate!(self.evaluate(condition, context)?).is_truthy() {
                        propagate!(self.evaluate(body, context)?);
                        return Ok(RuntimeResult::none());
                    }
                }
                if let Some(body) = default {
                    propagate!(self.evaluate(body, context)?);
                }
                Value::None
            }
            NodeKind::Block(statements) => {
                let mut last = Value::None;
                for statement in statements {
                    last = propagate!(self.evaluate(statement, context)?);
                }
                last
            }

            NodeKind::FuncDef(def) => {
                let function = Value::Function(Rc::new(Function {
                    def: Rc::clone(def),
                    closure: Rc::clone(context),
                    receiver: None,
                    owner: None,
                }));
                if let Some(name) = &def.name {
                    context.symbols.set(name, function.clone()).at(span, context)?;
                }
                function
            }
            NodeKind::Call {
                callee,
                args,
                optional,
            } => {
                let callee = propagate!(self.evaluate(callee, context)?);
                if *optional && callee.is_none() {
                    return Ok(RuntimeResult::none());
                }
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(propagate!(self.evaluate(arg, context)?));
                }
                self.call_value(&callee, values, span, context)?
            }
            NodeKind::Return(value) => {
                let value = match value {
                    Some(value) => propagate!(self.evaluate(value, context)?),
                    None => Value::None,
                };
                return Ok(RuntimeResult::Return(value));
            }
            NodeKind::Continue => return Ok(RuntimeResult::Continue),
            NodeKind::Break => return Ok(RuntimeResult::Break),
            NodeKind::Pass => Value::None,

            NodeKind::ClassDef(def) => self.define_class(def, span, context)?,
            NodeKind::New { class, args } => return self.instantiate(class, args, span, context),
            NodeKind::SuperCall(args) => return self.super_call(args, span, context),
            NodeKind::SuperProperty(name) => self.super_property(name, span, context)?,
            NodeKind::Enum { name, members } => {
                let dict: Dict = members
                    .iter()
                    .enumerate()
                    .map(|(index, member)| (member.clone(), Value::Number(index as f64)))
                    .collect();
                let value = Value::dict(dict);
                context
                    .symbols
                    .define_constant(name, value.clone())
                    .at(span, context)?;
                value
            }
        };
        Ok(RuntimeResult::Value(value))
    }

    fn eval_if(
        &mut self,
        branches: &[Branch],
        else_body: Option<&Node>,
        else_discard: bool,
        context: &Rc<Context>,
    ) -> Evaluation {
        for branch in branches {
            if propagate!(self.evaluate(&branch.condition, context)?).is_truthy() {
                return self.branch_result(&branch.body, branch.discard, context);
            }
        }
        match else_body {
            Some(body) => self.branch_result(body, else_discard, context),
            None => Ok(RuntimeResult::none()),
        }
    }

    fn branch_result(&mut self, body: &Node, discard: bool, context: &Rc<Context>) -> Evaluation {
        let value = propagate!(self.evaluate(body, context)?);
        Ok(RuntimeResult::Value(if discard { Value::None } else { value }))
    }
}
