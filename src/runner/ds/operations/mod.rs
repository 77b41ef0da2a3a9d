//! Operator dispatch over value kinds.
//!
//! `a OP b` first asks the left operand (`forward`); when that yields
//! `undefined` the right operand gets a chance through its reflected form
//! (`reflected`). Kinds only answer for operand combinations they understand,
//! which is how `1 + 0.5` reaches the float and `2000 < year` reaches the
//! search name.

pub mod arithmetic;
pub mod test_and_comparison;
pub mod type_conversion;

use std::cmp::Ordering;

use crate::runner::ds::value::{Kind, Value};
use crate::runner::plugin::search;
use crate::runner::vm::bytecode::{BinaryOp, UnaryOp};

use self::test_and_comparison::{eq, float_reflected_ordering, gt, lt};
use self::type_conversion::to_boolean;

pub fn binary_op(op: BinaryOp, a: &Value, b: &Value) -> Value {
    let result = forward(op, a, b);
    if result.is_undefined() {
        reflected(op, b, a)
    } else {
        result
    }
}

pub fn unary_op(op: UnaryOp, v: &Value) -> Value {
    match op {
        UnaryOp::LogicalNot => Value::boolean(!to_boolean(v)),
        UnaryOp::Plus => arithmetic::positive(v),
        UnaryOp::Minus => arithmetic::negate(v),
    }
}

/// `other` if `v` is truthy, else `v`.
pub fn land(v: &Value, other: &Value) -> Value {
    if to_boolean(v) {
        other.clone()
    } else {
        v.clone()
    }
}

/// `v` if `v` is truthy, else `other`.
pub fn lor(v: &Value, other: &Value) -> Value {
    if to_boolean(v) {
        v.clone()
    } else {
        other.clone()
    }
}

/// Negation that keeps `undefined` so the reflected side can still answer.
fn lnot_defined(v: Value) -> Value {
    if v.is_undefined() {
        v
    } else {
        Value::boolean(!to_boolean(&v))
    }
}

fn forward(op: BinaryOp, a: &Value, b: &Value) -> Value {
    match a.kind() {
        Some(Kind::SearchName(_)) | Some(Kind::SearchQuery(_)) => {
            return search::forward(op, a, b)
        }
        _ => {}
    }
    match op {
        BinaryOp::Add => arithmetic::add(a, b),
        BinaryOp::Sub => arithmetic::sub(a, b),
        BinaryOp::Mul => arithmetic::mul(a, b),
        BinaryOp::Div => arithmetic::div(a, b),
        BinaryOp::LogicalAnd => land(a, b),
        BinaryOp::LogicalOr => lor(a, b),
        BinaryOp::GreaterThan => gt(a, b),
        BinaryOp::LessThan => lt(a, b),
        BinaryOp::GreaterEqual => lor(&gt(a, b), &eq(a, b)),
        BinaryOp::LessEqual => lor(&lt(a, b), &eq(a, b)),
        BinaryOp::Equal => eq(a, b),
        BinaryOp::NotEqual => lnot_defined(eq(a, b)),
    }
}

/// `left OP right`, answered by `right`.
fn reflected(op: BinaryOp, right: &Value, left: &Value) -> Value {
    match right.kind() {
        Some(Kind::SearchName(_)) | Some(Kind::SearchQuery(_)) => search::reflected(op, right, left),
        Some(Kind::Float(_)) => match op {
            BinaryOp::Add => arithmetic::radd(right, left),
            BinaryOp::Sub => arithmetic::rsub(right, left),
            BinaryOp::Mul => arithmetic::rmul(right, left),
            BinaryOp::Div => arithmetic::rdiv(right, left),
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => Value::Undefined,
            _ => match float_reflected_ordering(right, left) {
                Some(order) => Value::boolean(compare_matches(op, order)),
                None => Value::Undefined,
            },
        },
        _ => match op {
            BinaryOp::Add => arithmetic::radd(right, left),
            BinaryOp::Sub => arithmetic::rsub(right, left),
            BinaryOp::Mul => arithmetic::rmul(right, left),
            BinaryOp::Div => arithmetic::rdiv(right, left),
            _ => Value::Undefined,
        },
    }
}

/// Whether `order` (left compared to right) satisfies the comparison `op`.
pub fn compare_matches(op: BinaryOp, order: Ordering) -> bool {
    match op {
        BinaryOp::GreaterThan => order == Ordering::Greater,
        BinaryOp::GreaterEqual => order != Ordering::Less,
        BinaryOp::LessThan => order == Ordering::Less,
        BinaryOp::LessEqual => order != Ordering::Greater,
        BinaryOp::Equal => order == Ordering::Equal,
        BinaryOp::NotEqual => order != Ordering::Equal,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflected_fallback() {
        let sum = binary_op(BinaryOp::Add, &Value::int(1), &Value::float(0.5));
        assert_eq!(sum.as_float(), Some(1.5));
        let cmp = binary_op(BinaryOp::GreaterEqual, &Value::int(3), &Value::float(2.5));
        assert_eq!(cmp, Value::TRUE);
        let cmp = binary_op(BinaryOp::NotEqual, &Value::int(1), &Value::float(1.0));
        assert_eq!(cmp, Value::FALSE);
        let repeated = binary_op(BinaryOp::Mul, &Value::int(3), &Value::string("ab"));
        assert_eq!(repeated.as_str(), Some("ababab"));
    }

    #[test]
    fn test_unsupported_is_undefined() {
        assert!(binary_op(BinaryOp::Sub, &Value::string("a"), &Value::int(1)).is_undefined());
        assert!(binary_op(BinaryOp::Add, &Value::Undefined, &Value::int(1)).is_undefined());
    }

    #[test]
    fn test_derived_comparisons() {
        assert_eq!(binary_op(BinaryOp::LessEqual, &Value::int(2), &Value::int(2)), Value::TRUE);
        assert_eq!(binary_op(BinaryOp::NotEqual, &Value::string("a"), &Value::string("b")), Value::TRUE);
    }

    #[test]
    fn test_logical_value_semantics() {
        let r = binary_op(BinaryOp::LogicalOr, &Value::int(0), &Value::string("x"));
        assert_eq!(r.as_str(), Some("x"));
        let r = binary_op(BinaryOp::LogicalAnd, &Value::int(2), &Value::int(3));
        assert_eq!(r.as_int(), Some(3));
    }
}
