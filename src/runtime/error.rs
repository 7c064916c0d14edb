use std::rc::Rc;

use thiserror::Error;

use crate::runtime::context::Context;
use crate::runtime::value::MAX_LENGTH;
use crate::token::{Position, Span};

/// Failures raised while evaluating a program.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeErrorKind {
    #[error("Illegal operation: {left} {operator} {right}")]
    IllegalOperation {
        operator: String,
        left: String,
        right: String,
    },
    #[error("Illegal operation: {operator}{operand}")]
    IllegalUnaryOperation { operator: String, operand: String },
    #[error("Division by Zero")]
    DivisionByZero,
    #[error("'{name}' is not defined")]
    UndefinedVariable { name: String },
    #[error("Cannot reassign constant '{name}'")]
    ConstantReassignment { name: String },
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("Index must be an integer, got {got}")]
    InvalidIndex { got: String },
    #[error("Illegal binary selector bounds [{start}:{end}] for length {len}")]
    IllegalSliceBounds { start: i64, end: i64, len: usize },
    #[error("Key '{key}' not found in dictionary")]
    KeyNotFound { key: String },
    #[error("Cannot index {type_name} with {index_type}")]
    NotIndexable {
        type_name: String,
        index_type: String,
    },
    #[error("'{type_name}' is not callable")]
    NotCallable { type_name: String },
    #[error("{name}() expected {expected} argument(s), got {found}")]
    ArityMismatch {
        name: String,
        expected: String,
        found: usize,
    },
    #[error("Argument '{param}' of {function}() expects {expected}, got {got}")]
    ArgumentType {
        function: String,
        param: String,
        expected: String,
        got: String,
    },
    #[error("{message}")]
    InvalidArgument { message: String },
    #[error("'{class}' has no member '{member}'")]
    UnknownMember { class: String, member: String },
    #[error("Cannot read property '{member}' of {type_name}")]
    NoProperties { member: String, type_name: String },
    #[error("'{member}' is {visibility} in class '{owner}'")]
    Visibility {
        member: String,
        visibility: String,
        owner: String,
    },
    #[error("'{name}' is not a class")]
    NotAClass { name: String },
    #[error("{message}")]
    InvalidClass { message: String },
    #[error("{message}")]
    InvalidSuper { message: String },
    #[error("Maximum call depth of {limit} exceeded")]
    RecursionLimit { limit: usize },
    #[error("For loop step cannot be zero")]
    ZeroStep,
    #[error("Cannot iterate over {type_name}")]
    NotIterable { type_name: String },
    #[error("Return outside of function")]
    ReturnOutsideFunction,
    #[error("'{keyword}' outside of a loop")]
    LoopControlOutsideLoop { keyword: &'static str },
    #[error("{type_name} would exceed the maximum length of {limit}")]
    TooLarge { type_name: &'static str, limit: usize },
    #[error("{message}")]
    Raised { message: String },
}

impl RuntimeErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeErrorKind::ArgumentType { .. } => "Type Error",
            RuntimeErrorKind::RecursionLimit { .. } => "Recursion Error",
            _ => "Runtime Error",
        }
    }

    pub fn illegal(operator: &str, left: &str, right: &str) -> Self {
        RuntimeErrorKind::IllegalOperation {
            operator: operator.to_string(),
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    pub fn too_large(type_name: &'static str) -> Self {
        RuntimeErrorKind::TooLarge {
            type_name,
            limit: MAX_LENGTH,
        }
    }
}

/// Checks a computed length against [`MAX_LENGTH`]. `None` stands for a length
/// computation that overflowed.
pub fn checked_length(
    type_name: &'static str,
    len: Option<usize>,
) -> Result<usize, RuntimeErrorKind> {
    len.filter(|&len| len <= MAX_LENGTH)
        .ok_or_else(|| RuntimeErrorKind::too_large(type_name))
}

/// One line of a traceback.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub display_name: String,
    pub position: Position,
}

/// A runtime failure with the span it was raised at and a snapshot of the
/// frames active at that moment, outermost first.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub span: Span,
    pub traceback: Vec<Frame>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, span: Span, context: &Rc<Context>) -> Self {
        Self {
            kind,
            span,
            traceback: context.frames(span.start),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}
