//! Operator semantics by operand kind. Any pairing not listed is an
//! "Illegal operation"; nothing is coerced silently except the string
//! conversion done by `+` when one side is a string.

use crate::ast::{BinaryOp, UnaryOp};
use crate::runtime::error::{RuntimeErrorKind, checked_length};
use crate::runtime::value::Value;

type OpResult = Result<Value, RuntimeErrorKind>;

fn illegal(op: BinaryOp, left: &Value, right: &Value) -> RuntimeErrorKind {
    RuntimeErrorKind::illegal(op.symbol(), left.type_name(), right.type_name())
}

/// Truncation to a signed 32-bit integer, wrapping like two's complement.
fn to_int32(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    (value.trunc() as i64) as i32
}

fn to_index(value: f64, len: usize) -> Result<usize, RuntimeErrorKind> {
    if value.fract() != 0.0 || !value.is_finite() {
        return Err(RuntimeErrorKind::InvalidIndex {
            got: value.to_string(),
        });
    }
    let index = value as i64;
    let resolved = if index < 0 { len as i64 + index } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return Err(RuntimeErrorKind::IndexOutOfRange { index, len });
    }
    Ok(resolved as usize)
}

fn repeat_count(value: f64) -> Result<usize, RuntimeErrorKind> {
    if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
        return Err(RuntimeErrorKind::InvalidArgument {
            message: format!("Repeat count must be a non-negative integer, got {value}"),
        });
    }
    Ok(value as usize)
}

pub fn binary_op(op: BinaryOp, left: &Value, right: &Value) -> OpResult {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => subtract(left, right),
        BinaryOp::Mul => multiply(left, right),
        BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow => arithmetic(op, left, right),
        BinaryOp::Shl
        | BinaryOp::Shr
        | BinaryOp::UShr
        | BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor => bitwise(op, left, right),
        BinaryOp::Equal => Ok(Value::Boolean(left == right)),
        BinaryOp::NotEqual => Ok(Value::Boolean(left != right)),
        BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEqual | BinaryOp::GreaterEqual => {
            compare(op, left, right)
        }
        BinaryOp::And => Ok(if left.is_truthy() { right.clone() } else { left.clone() }),
        BinaryOp::Or => Ok(if left.is_truthy() { left.clone() } else { right.clone() }),
        BinaryOp::Nullish => Ok(if left.is_none() { right.clone() } else { left.clone() }),
        BinaryOp::Instanceof => match (left, right) {
            (Value::Instance(instance), Value::Class(class)) => {
                Ok(Value::Boolean(instance.class.inherits_from(class)))
            }
            (_, Value::Class(_)) => Ok(Value::Boolean(false)),
            _ => Err(illegal(op, left, right)),
        },
    }
}

fn add(left: &Value, right: &Value) -> OpResult {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(a), other) => concatenate(a, &other.to_string()),
        (Value::List(values), other) => {
            let values = values.borrow();
            checked_length("list", values.len().checked_add(1))?;
            let mut values = values.clone();
            values.push(other.clone());
            Ok(Value::list(values))
        }
        (Value::Dict(a), Value::Dict(b)) => Ok(Value::dict(a.borrow().merged(&b.borrow()))),
        (other, Value::String(b)) => concatenate(&other.to_string(), b),
        _ => Err(illegal(BinaryOp::Add, left, right)),
    }
}

/// Whether `left + right` joins text rather than adding numbers, appending
/// to a list or merging dictionaries.
pub fn concatenates(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(_), _) => true,
        (Value::List(_), _) => false,
        (_, Value::String(_)) => true,
        _ => false,
    }
}

pub fn concatenate(left: &str, right: &str) -> OpResult {
    let len = checked_length("string", left.len().checked_add(right.len()))?;
    let mut text = String::with_capacity(len);
    text.push_str(left);
    text.push_str(right);
    Ok(Value::String(text))
}

fn subtract(left: &Value, right: &Value) -> OpResult {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
        (Value::List(values), Value::Number(index)) => {
            let mut values = values.borrow().clone();
            let index = to_index(*index, values.len())?;
            values.remove(index);
            Ok(Value::list(values))
        }
        (Value::Dict(dict), Value::String(key)) => {
            let mut dict = dict.borrow().clone();
            dict.remove(key)
                .ok_or_else(|| RuntimeErrorKind::KeyNotFound { key: key.clone() })?;
            Ok(Value::dict(dict))
        }
        _ => Err(illegal(BinaryOp::Sub, left, right)),
    }
}

fn multiply(left: &Value, right: &Value) -> OpResult {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
        (Value::String(text), Value::Number(count)) => {
            let count = repeat_count(*count)?;
            checked_length("string", text.len().checked_mul(count))?;
            Ok(Value::String(text.repeat(count)))
        }
        (Value::List(a), Value::List(b)) => {
            let mut values = a.borrow().clone();
            // `b` may alias `a`; clone before extending.
            let tail = b.borrow().clone();
            checked_length("list", values.len().checked_add(tail.len()))?;
            values.extend(tail);
            Ok(Value::list(values))
        }
        (Value::List(values), Value::Number(count)) => {
            let count = repeat_count(*count)?;
            let values = values.borrow();
            if values.is_empty() {
                return Ok(Value::list(Vec::new()));
            }
            let len = checked_length("list", values.len().checked_mul(count))?;
            let mut repeated = Vec::new();
            repeated
                .try_reserve_exact(len)
                .map_err(|_| RuntimeErrorKind::too_large("list"))?;
            for _ in 0..count {
                repeated.extend(values.iter().cloned());
            }
            Ok(Value::list(repeated))
        }
        _ => Err(illegal(BinaryOp::Mul, left, right)),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> OpResult {
    let (Value::Number(a), Value::Number(b)) = (left, right) else {
        return Err(illegal(op, left, right));
    };
    let value = match op {
        BinaryOp::Div | BinaryOp::Mod if *b == 0.0 => {
            return Err(RuntimeErrorKind::DivisionByZero);
        }
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => a.powf(*b),
    };
    Ok(Value::Number(value))
}

fn bitwise(op: BinaryOp, left: &Value, right: &Value) -> OpResult {
    let (Value::Number(a), Value::Number(b)) = (left, right) else {
        return Err(illegal(op, left, right));
    };
    let (a, b) = (to_int32(*a), to_int32(*b));
    let shift = (b as u32) & 31;
    let value = match op {
        BinaryOp::Shl => f64::from(a.wrapping_shl(shift)),
        BinaryOp::Shr => f64::from(a >> shift),
        BinaryOp::UShr => f64::from((a as u32) >> shift),
        BinaryOp::BitAnd => f64::from(a & b),
        BinaryOp::BitOr => f64::from(a | b),
        _ => f64::from(a ^ b),
    };
    Ok(Value::Number(value))
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> OpResult {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => return Err(illegal(op, left, right)),
    };
    let Some(ordering) = ordering else {
        // NaN compares false against everything.
        return Ok(Value::Boolean(false));
    };
    let result = match op {
        BinaryOp::Less => ordering.is_lt(),
        BinaryOp::Greater => ordering.is_gt(),
        BinaryOp::LessEqual => ordering.is_le(),
        _ => ordering.is_ge(),
    };
    Ok(Value::Boolean(result))
}

pub fn unary_op(op: UnaryOp, operand: &Value) -> OpResult {
    let illegal = || RuntimeErrorKind::IllegalUnaryOperation {
        operator: match op {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "not ",
            UnaryOp::Typeof => "typeof ",
        }
        .to_string(),
        operand: operand.type_name().to_string(),
    };
    match (op, operand) {
        (UnaryOp::Plus, Value::Number(value)) => Ok(Value::Number(*value)),
        (UnaryOp::Minus, Value::Number(value)) => Ok(Value::Number(-value)),
        (UnaryOp::BitNot, Value::Number(value)) => Ok(Value::Number(f64::from(!to_int32(*value)))),
        (UnaryOp::Not, value) => Ok(Value::Boolean(!value.is_truthy())),
        (UnaryOp::Typeof, value) => Ok(Value::String(value.type_of())),
        _ => Err(illegal()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(value: f64) -> Value {
        Value::Number(value)
    }

    #[test]
    fn division_and_modulo_by_zero_fail() {
        for op in [BinaryOp::Div, BinaryOp::Mod] {
            let error = binary_op(op, &num(10.0), &num(0.0)).expect_err("expected failure");
            assert_eq!(error, RuntimeErrorKind::DivisionByZero);
            assert_eq!(error.to_string(), "Division by Zero");
        }
    }

    #[test]
    fn bitwise_uses_int32_truncation() {
        assert_eq!(binary_op(BinaryOp::BitAnd, &num(6.7), &num(3.0)), Ok(num(2.0)));
        assert_eq!(binary_op(BinaryOp::Shl, &num(1.0), &num(33.0)), Ok(num(2.0)));
        assert_eq!(binary_op(BinaryOp::Shr, &num(-8.0), &num(1.0)), Ok(num(-4.0)));
        assert_eq!(
            binary_op(BinaryOp::UShr, &num(-1.0), &num(28.0)),
            Ok(num(15.0))
        );
        assert_eq!(unary_op(UnaryOp::BitNot, &num(5.0)), Ok(num(-6.0)));
    }

    #[test]
    fn plus_concatenates_strings_and_appends_to_lists() {
        assert_eq!(
            binary_op(BinaryOp::Add, &Value::string("n="), &num(4.0)),
            Ok(Value::string("n=4"))
        );
        let list = Value::list(vec![num(1.0)]);
        let appended = binary_op(BinaryOp::Add, &list, &num(2.0)).expect("add failed");
        assert_eq!(appended.to_string(), "[1, 2]");
        assert_eq!(list.to_string(), "[1]");
    }

    #[test]
    fn unsupported_pairs_are_illegal() {
        let error = binary_op(BinaryOp::Sub, &Value::string("a"), &num(1.0))
            .expect_err("expected failure");
        assert_eq!(error.to_string(), "Illegal operation: string - number");
        assert!(binary_op(BinaryOp::Less, &num(1.0), &Value::string("2")).is_err());
        assert!(unary_op(UnaryOp::Minus, &Value::string("x")).is_err());
    }

    #[test]
    fn comparisons_and_equality() {
        assert_eq!(binary_op(BinaryOp::LessEqual, &num(2.0), &num(2.0)), Ok(Value::Boolean(true)));
        assert_eq!(
            binary_op(BinaryOp::Greater, &Value::string("b"), &Value::string("a")),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            binary_op(BinaryOp::Equal, &num(1.0), &Value::string("1")),
            Ok(Value::Boolean(false))
        );
    }

    #[test]
    fn repetition_past_the_length_limit_fails() {
        let pair = Value::list(vec![num(1.0), num(2.0)]);
        assert!(matches!(
            binary_op(BinaryOp::Mul, &pair, &num(1e19)),
            Err(RuntimeErrorKind::TooLarge { type_name: "list", .. })
        ));
        assert!(matches!(
            binary_op(BinaryOp::Mul, &Value::string("ab"), &num(1e18)),
            Err(RuntimeErrorKind::TooLarge { type_name: "string", .. })
        ));
        assert_eq!(
            binary_op(BinaryOp::Mul, &Value::string("ab"), &num(3.0)),
            Ok(Value::string("ababab"))
        );
        assert_eq!(
            binary_op(BinaryOp::Mul, &Value::list(Vec::new()), &num(1e19)),
            Ok(Value::list(Vec::new()))
        );
    }
}
