//! `for`, `foreach` and `while`. Each iteration runs in its own scope so
//! closures created in the body capture that iteration's bindings.

use std::rc::Rc;

use crate::ast::Node;
use crate::runtime::context::Context;
use crate::runtime::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::result::RuntimeResult;
use crate::runtime::value::Value;
use crate::token::Span;

use super::{At, Interpreter};

type Evaluation = Result<RuntimeResult, RuntimeError>;

/// What the loop does after one body evaluation.
enum Flow {
    Next,
    Stop,
}

/// Values gathered by an inline loop body.
struct Collected {
    values: Vec<Value>,
    discard: bool,
}

impl Collected {
    fn new(discard: bool) -> Self {
        Self {
            values: Vec::new(),
            discard,
        }
    }

    /// Records one iteration's outcome. `Err` carries a `return` upward.
    fn record(&mut self, result: RuntimeResult) -> Result<Flow, RuntimeResult> {
        match result {
            RuntimeResult::Value(value) => {
                if !self.discard {
                    self.values.push(value);
                }
                Ok(Flow::Next)
            }
            RuntimeResult::Continue => Ok(Flow::Next),
            RuntimeResult::Break => Ok(Flow::Stop),
            signal @ RuntimeResult::Return(_) => Err(signal),
        }
    }

    fn finish(self) -> Evaluation {
        Ok(RuntimeResult::Value(if self.discard {
            Value::None
        } else {
            Value::list(self.values)
        }))
    }
}

impl Interpreter {
    fn number_bound(
        &mut self,
        node: &Node,
        what: &str,
        context: &Rc<Context>,
    ) -> Result<Result<f64, RuntimeResult>, RuntimeError> {
        match self.evaluate(node, context)? {
            RuntimeResult::Value(Value::Number(value)) => Ok(Ok(value)),
            RuntimeResult::Value(other) => Err(RuntimeErrorKind::InvalidArgument {
                message: format!("For loop {what} must be a number, got {}", other.type_name()),
            })
            .at(node.span, context),
            signal => Ok(Err(signal)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn eval_for(
        &mut self,
        var: &str,
        start: Option<&Node>,
        end: &Node,
        step: Option<&Node>,
        body: &Node,
        discard: bool,
        span: Span,
        context: &Rc<Context>,
    ) -> Evaluation {
        let start = match start {
            Some(node) => match self.number_bound(node, "start", context)? {
                Ok(value) => value,
                Err(signal) => return Ok(signal),
            },
            None => 0.0,
        };
        let end = match self.number_bound(end, "end", context)? {
            Ok(value) => value,
            Err(signal) => return Ok(signal),
        };
        let step = match step {
            Some(node) => match self.number_bound(node, "step", context)? {
                Ok(value) if value == 0.0 => {
                    return Err(RuntimeErrorKind::ZeroStep).at(node.span, context);
                }
                Ok(value) => value,
                Err(signal) => return Ok(signal),
            },
            None if start < end => 1.0,
            None => -1.0,
        };

        let mut collected = Collected::new(discard);
        let mut current = start;
        while (step > 0.0 && current < end) || (step < 0.0 && current > end) {
            let scope = Context::scope(context, "<for>", span.start);
            scope.symbols.set(var, Value::Number(current)).at(span, context)?;
            match collected.record(self.evaluate(body, &scope)?) {
                Ok(Flow::Next) => {}
                Ok(Flow::Stop) => break,
                Err(signal) => return Ok(signal),
            }
            current += step;
        }
        collected.finish()
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn eval_foreach(
        &mut self,
        iterable: &Node,
        key: Option<&str>,
        value: &str,
        body: &Node,
        discard: bool,
        span: Span,
        context: &Rc<Context>,
    ) -> Evaluation {
        let iterable = propagate!(self.evaluate(iterable, context)?);
        // Snapshot so the body may mutate the collection it walks.
        let items: Vec<(Value, Value)> = match &iterable {
            Value::List(values) => values
                .borrow()
                .iter()
                .enumerate()
                .map(|(index, value)| (Value::Number(index as f64), value.clone()))
                .collect(),
            Value::Dict(dict) => dict
                .borrow()
                .iter()
                .map(|(name, value)| (Value::string(name), value.clone()))
                .collect(),
            Value::String(text) => text
                .chars()
                .enumerate()
                .map(|(index, ch)| (Value::Number(index as f64), Value::String(ch.to_string())))
                .collect(),
            other => {
                return Err(RuntimeErrorKind::NotIterable {
                    type_name: other.type_name().to_string(),
                })
                .at(span, context);
            }
        };
        let keys_only = key.is_none() && matches!(iterable, Value::Dict(_));

        let mut collected = Collected::new(discard);
        for (item_key, item_value) in items {
            let scope = Context::scope(context, "<foreach>", span.start);
            match key {
                Some(key) => {
                    scope.symbols.set(key, item_key).at(span, context)?;
                    scope.symbols.set(value, item_value).at(span, context)?;
                }
                None if keys_only => scope.symbols.set(value, item_key).at(span, context)?,
                None => scope.symbols.set(value, item_value).at(span, context)?,
            }
            match collected.record(self.evaluate(body, &scope)?) {
                Ok(Flow::Next) => {}
                Ok(Flow::Stop) => break,
                Err(signal) => return Ok(signal),
            }
        }
        collected.finish()
    }

    pub(super) fn eval_while(
        &mut self,
        condition: &Node,
        body: &Node,
        discard: bool,
        span: Span,
        context: &Rc<Context>,
    ) -> Evaluation {
        let mut collected = Collected::new(discard);
        while propagate!(self.evaluate(condition, context)?).is_truthy() {
            let scope = Context::scope(context, "<while>", span.start);
            match collected.record(self.evaluate(body, &scope)?) {
                Ok(Flow::Next) => {}
                Ok(Flow::Stop) => break,
                Err(signal) => return Ok(signal),
            }
        }
        collected.finish()
    }
}
