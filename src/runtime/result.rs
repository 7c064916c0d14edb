use crate::runtime::value::Value;

/// Control-flow carrier returned by every evaluation step.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeResult {
    Value(Value),
    Return(Value),
    Break,
    Continue,
}

impl RuntimeResult {
    pub fn none() -> Self {
        RuntimeResult::Value(Value::None)
    }
}
