//! Calling user and native functions.
//!
//! Both kinds go through the same argument binding: arity check, rest
//! collection, lazy defaults, declared type checks. Natives then run a host
//! behaviour instead of an AST body.

use std::rc::Rc;

use tracing::trace;

use crate::ast::Param;
use crate::runtime::context::Context;
use crate::runtime::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::result::RuntimeResult;
use crate::runtime::symbol_table::SymbolTable;
use crate::runtime::value::{Function, NativeFunction, Value};
use crate::token::Span;

use super::{At, Interpreter};

fn expected_arity(params: &[Param]) -> (usize, Option<usize>) {
    let required = params
        .iter()
        .filter(|param| !param.is_optional && !param.is_rest)
        .count();
    let maximum = if params.iter().any(|param| param.is_rest) {
        None
    } else {
        Some(params.len())
    };
    (required, maximum)
}

fn describe_arity(required: usize, maximum: Option<usize>) -> String {
    match maximum {
        None => format!("at least {required}"),
        Some(maximum) if maximum == required => required.to_string(),
        Some(maximum) => format!("{required} to {maximum}"),
    }
}

impl Interpreter {
    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        span: Span,
        context: &Rc<Context>,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(function) => self.call_function(function, args, span, context),
            Value::Native(native) => self.call_native(native, args, span, context),
            Value::Class(class) => Err(RuntimeErrorKind::NotCallable {
                type_name: format!("class {}", class.name),
            })
            .at(span, context),
            other => Err(RuntimeErrorKind::NotCallable {
                type_name: other.type_name().to_string(),
            })
            .at(span, context),
        }
    }

    pub(super) fn enter(&mut self, span: Span, context: &Rc<Context>) -> Result<(), RuntimeError> {
        let limit = self.config.max_call_depth;
        if self.depth >= limit {
            return Err(RuntimeError::new(
                RuntimeErrorKind::RecursionLimit { limit },
                span,
                context,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn call_function(
        &mut self,
        function: &Rc<Function>,
        args: Vec<Value>,
        span: Span,
        caller: &Rc<Context>,
    ) -> Result<Value, RuntimeError> {
        self.enter(span, caller)?;
        let result = self.invoke(function, args, span, caller);
        self.depth -= 1;
        result
    }

    fn invoke(
        &mut self,
        function: &Rc<Function>,
        args: Vec<Value>,
        span: Span,
        caller: &Rc<Context>,
    ) -> Result<Value, RuntimeError> {
        trace!(function = function.name(), depth = self.depth, "call");
        let class_scope = function
            .owner
            .clone()
            .or_else(|| function.closure.class_scope.clone());
        let context = Context::child(
            caller,
            function.name(),
            span.start,
            SymbolTable::child(&function.closure.symbols),
            class_scope,
        );
        if let Some(receiver) = &function.receiver {
            context
                .symbols
                .set("self", Value::Instance(Rc::clone(receiver)))
                .at(span, caller)?;
        }
        self.bind_arguments(function.name(), &function.def.params, args, span, caller, &context)?;

        let body = &function.def.body;
        match self.evaluate(body, &context)? {
            RuntimeResult::Value(value) if function.def.auto_return => Ok(value),
            RuntimeResult::Value(_) => Ok(Value::None),
            RuntimeResult::Return(value) => Ok(value),
            RuntimeResult::Break => Err(RuntimeError::new(
                RuntimeErrorKind::LoopControlOutsideLoop { keyword: "break" },
                body.span,
                &context,
            )),
            RuntimeResult::Continue => Err(RuntimeError::new(
                RuntimeErrorKind::LoopControlOutsideLoop { keyword: "continue" },
                body.span,
                &context,
            )),
        }
    }

    fn call_native(
        &mut self,
        native: &Rc<NativeFunction>,
        args: Vec<Value>,
        span: Span,
        caller: &Rc<Context>,
    ) -> Result<Value, RuntimeError> {
        self.enter(span, caller)?;
        let context = Context::child(
            caller,
            native.name,
            span.start,
            Rc::new(SymbolTable::new(None)),
            None,
        );
        let result = self
            .bind_arguments(native.name, &native.params, args, span, caller, &context)
            .and_then(|()| (native.behavior)(self, &context, span));
        self.depth -= 1;
        result
    }

    /// Binds call arguments to parameter names in `context`. Defaults are
    /// evaluated there too, so they can read `self` and earlier parameters.
    fn bind_arguments(
        &mut self,
        name: &str,
        params: &[Param],
        args: Vec<Value>,
        span: Span,
        caller: &Rc<Context>,
        context: &Rc<Context>,
    ) -> Result<(), RuntimeError> {
        let (required, maximum) = expected_arity(params);
        if args.len() < required || maximum.is_some_and(|maximum| args.len() > maximum) {
            return Err(RuntimeErrorKind::ArityMismatch {
                name: name.to_string(),
                expected: describe_arity(required, maximum),
                found: args.len(),
            })
            .at(span, caller);
        }

        let mut args = args.into_iter();
        for param in params {
            let value = if param.is_rest {
                Value::list(args.by_ref().collect())
            } else if let Some(arg) = args.next() {
                arg
            } else if let Some(default) = &param.default {
                self.value_of(default, context)?
            } else {
                Value::None
            };

            if let Some(type_name) = &param.type_name {
                let missing_optional = param.is_optional && value.is_none();
                if !missing_optional && !value.matches_type(type_name) {
                    return Err(RuntimeErrorKind::ArgumentType {
                        function: name.to_string(),
                        param: param.name.clone(),
                        expected: type_name.clone(),
                        got: value.type_of(),
                    })
                    .at(span, caller);
                }
            }
            context.symbols.set(&param.name, value).at(span, caller)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str) -> Param {
        Param::required(name, Span::default())
    }

    #[test]
    fn describes_arity_ranges() {
        let mut optional = param("b");
        optional.is_optional = true;
        let mut rest = param("rest");
        rest.is_rest = true;

        assert_eq!(expected_arity(&[param("a")]), (1, Some(1)));
        assert_eq!(expected_arity(&[param("a"), optional.clone()]), (1, Some(2)));
        assert_eq!(expected_arity(&[param("a"), rest]), (1, None));
        assert_eq!(describe_arity(1, Some(2)), "1 to 2");
        assert_eq!(describe_arity(2, None), "at least 2");
        assert_eq!(describe_arity(0, Some(0)), "0");
    }
}
