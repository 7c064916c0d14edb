//! Tree-walking evaluator.
//!
//! Every evaluation step returns a [`RuntimeResult`]; callers check it right
//! after each sub-evaluation and hand `Return`/`Break`/`Continue` upward
//! untouched. Genuine failures travel separately as [`RuntimeError`].

use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::Program;
use crate::builtins;
use crate::config::Config;
use crate::runtime::context::Context;
use crate::runtime::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::result::RuntimeResult;
use crate::runtime::symbol_table::SymbolTable;
use crate::runtime::value::{MAX_DISPLAY_DEPTH, Value};
use crate::token::Span;

/// Unwraps a produced value or returns the control signal to the caller.
macro_rules! propagate {
    ($result:expr) => {
        match $result {
            $crate::runtime::result::RuntimeResult::Value(value) => value,
            signal => return Ok(signal),
        }
    };
}

mod access;
mod call;
mod class;
mod eval;
mod loops;
mod ops;
#[cfg(test)]
mod tests;

/// Attaches a span and the active context to a bare error kind.
pub(crate) trait At<T> {
    fn at(self, span: Span, context: &Rc<Context>) -> Result<T, RuntimeError>;
}

impl<T> At<T> for Result<T, RuntimeErrorKind> {
    fn at(self, span: Span, context: &Rc<Context>) -> Result<T, RuntimeError> {
        self.map_err(|kind| RuntimeError::new(kind, span, context))
    }
}

pub struct Interpreter {
    config: Config,
    global: Rc<Context>,
    output: Vec<String>,
    depth: usize,
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        let symbols = Rc::new(SymbolTable::new(None));
        builtins::register(&symbols);
        Self {
            config,
            global: Context::root("<program>", symbols),
            output: Vec::new(),
            depth: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Evaluates the top-level statements in the global context and returns
    /// the value of each.
    pub fn run(&mut self, program: &Program) -> Result<Vec<Value>, RuntimeError> {
        let global = Rc::clone(&self.global);
        let mut values = Vec::with_capacity(program.statements.len());
        for statement in &program.statements {
            trace!(span = ?statement.span, "evaluating top-level statement");
            values.push(self.value_of(statement, &global)?);
        }
        debug!(statements = values.len(), "program finished");
        Ok(values)
    }

    /// Lines written by `print` since the last call.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    pub(crate) fn emit(&mut self, line: String) {
        self.output.push(line);
    }

    /// Evaluates a node where no control signal may escape.
    pub(crate) fn value_of(
        &mut self,
        node: &crate::ast::Node,
        context: &Rc<Context>,
    ) -> Result<Value, RuntimeError> {
        let kind = match self.evaluate(node, context)? {
            RuntimeResult::Value(value) => return Ok(value),
            RuntimeResult::Return(_) => RuntimeErrorKind::ReturnOutsideFunction,
            RuntimeResult::Break => RuntimeErrorKind::LoopControlOutsideLoop { keyword: "break" },
            RuntimeResult::Continue => {
                RuntimeErrorKind::LoopControlOutsideLoop { keyword: "continue" }
            }
        };
        Err(RuntimeError::new(kind, node.span, context))
    }

    /// Text form used by `print`, `str` and template strings. Instances
    /// defining `__repr` are rendered through it.
    pub(crate) fn stringify(
        &mut self,
        value: &Value,
        span: Span,
        context: &Rc<Context>,
    ) -> Result<String, RuntimeError> {
        self.stringify_nested(value, span, context, &mut Vec::new())
    }

    /// `open` holds the collections and instances being rendered further up;
    /// a value that contains itself is shown as `[...]`, `{...}` or `...`.
    fn stringify_nested(
        &mut self,
        value: &Value,
        span: Span,
        context: &Rc<Context>,
        open: &mut Vec<*const ()>,
    ) -> Result<String, RuntimeError> {
        let nested = !open.is_empty();
        match value {
            Value::String(text) if nested => Ok(format!("{text:?}")),
            Value::Instance(instance) => match self.repr_method(instance) {
                Some(repr) => {
                    let ptr = Rc::as_ptr(instance).cast::<()>();
                    if open.contains(&ptr) || open.len() >= MAX_DISPLAY_DEPTH {
                        return Ok("...".to_string());
                    }
                    match self.call_function(&repr, Vec::new(), span, context)? {
                        Value::String(text) => Ok(text),
                        other => {
                            open.push(ptr);
                            let text = self.stringify_nested(&other, span, context, open)?;
                            open.pop();
                            Ok(text)
                        }
                    }
                }
                None => Ok(value.to_string()),
            },
            Value::List(values) => {
                let ptr = Rc::as_ptr(values).cast::<()>();
                if open.contains(&ptr) || open.len() >= MAX_DISPLAY_DEPTH {
                    return Ok("[...]".to_string());
                }
                let values = values.borrow().clone();
                open.push(ptr);
                let mut parts = Vec::with_capacity(values.len());
                for value in &values {
                    parts.push(self.stringify_nested(value, span, context, open)?);
                }
                open.pop();
                Ok(format!("[{}]", parts.join(", ")))
            }
            Value::Dict(dict) => {
                let ptr = Rc::as_ptr(dict).cast::<()>();
                if open.contains(&ptr) || open.len() >= MAX_DISPLAY_DEPTH {
                    return Ok("{...}".to_string());
                }
                let entries: Vec<(String, Value)> = dict
                    .borrow()
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.clone()))
                    .collect();
                open.push(ptr);
                let mut parts = Vec::with_capacity(entries.len());
                for (key, value) in &entries {
                    let value = self.stringify_nested(value, span, context, open)?;
                    parts.push(format!("{key:?}: {value}"));
                }
                open.pop();
                Ok(format!("{{{}}}", parts.join(", ")))
            }
            other => Ok(other.to_string()),
        }
    }
}
