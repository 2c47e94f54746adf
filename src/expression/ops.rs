// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Arithmetic and comparison over plain values.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::errors::EvalError;
use crate::expression::ast::BinaryOp;
use crate::expression::value::type_name;
use crate::expression::MAX_SEQUENCE_LEN;

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Num::Int(i)),
                None => n.as_f64().map(Num::Float),
            },
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

pub fn float_value(value: f64) -> Result<Value, EvalError> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| EvalError::type_error(format!("float result {} is not representable", value)))
}

pub fn as_f64(value: &Value) -> Option<f64> {
    Num::of(value).map(Num::as_f64)
}

pub fn as_i64(value: &Value) -> Option<i64> {
    match Num::of(value)? {
        Num::Int(i) => Some(i),
        Num::Float(_) => None,
    }
}

fn unsupported(symbol: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        symbol,
        type_name(left),
        type_name(right)
    ))
}

fn symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::FloorDiv => "//",
        BinaryOp::Mod => "%",
    }
}

pub fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    if let (Some(a), Some(b)) = (Num::of(&left), Num::of(&right)) {
        return numeric(op, a, b);
    }
    match (op, left, right) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        (BinaryOp::Add, Value::Array(mut a), Value::Array(b)) => {
            a.extend(b);
            Ok(Value::Array(a))
        }
        (BinaryOp::Mul, Value::String(s), n) | (BinaryOp::Mul, n, Value::String(s))
            if as_i64(&n).is_some() =>
        {
            let times = repeat_count(&n);
            repeated_len("str", s.len(), times)?;
            Ok(Value::String(s.repeat(times)))
        }
        (BinaryOp::Mul, Value::Array(items), n) | (BinaryOp::Mul, n, Value::Array(items))
            if as_i64(&n).is_some() =>
        {
            let times = repeat_count(&n);
            let mut result = Vec::with_capacity(repeated_len("list", items.len(), times)?);
            for _ in 0..times {
                result.extend(items.iter().cloned());
            }
            Ok(Value::Array(result))
        }
        (op, left, right) => Err(unsupported(symbol(op), &left, &right)),
    }
}

fn repeat_count(n: &Value) -> usize {
    usize::try_from(as_i64(n).unwrap_or(0).max(0)).unwrap_or(usize::MAX)
}

fn repeated_len(kind: &str, len: usize, times: usize) -> Result<usize, EvalError> {
    len.checked_mul(times)
        .filter(|total| *total <= MAX_SEQUENCE_LEN)
        .ok_or_else(|| {
            EvalError::type_error(format!(
                "{} repetition exceeds the maximum length of {}",
                kind, MAX_SEQUENCE_LEN
            ))
        })
}

fn numeric(op: BinaryOp, a: Num, b: Num) -> Result<Value, EvalError> {
    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        let exact = match op {
            BinaryOp::Add => x.checked_add(y),
            BinaryOp::Sub => x.checked_sub(y),
            BinaryOp::Mul => x.checked_mul(y),
            BinaryOp::FloorDiv => {
                if y == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                x.checked_div(y).map(|q| if x % y != 0 && ((x < 0) != (y < 0)) { q - 1 } else { q })
            }
            BinaryOp::Mod => {
                if y == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                x.checked_rem(y).map(|r| if r != 0 && ((r < 0) != (y < 0)) { r + y } else { r })
            }
            BinaryOp::Div => None,
        };
        if let Some(result) = exact {
            return Ok(Value::from(result));
        }
    }
    let (x, y) = (a.as_f64(), b.as_f64());
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => {
            if y == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            x / y
        }
        BinaryOp::FloorDiv => {
            if y == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            (x / y).floor()
        }
        BinaryOp::Mod => {
            if y == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            let r = x % y;
            if r != 0.0 && ((r < 0.0) != (y < 0.0)) {
                r + y
            } else {
                r
            }
        }
    };
    float_value(result)
}

pub fn negate(value: Value) -> Result<Value, EvalError> {
    match Num::of(&value) {
        Some(Num::Int(i)) => match i.checked_neg() {
            Some(n) => Ok(Value::from(n)),
            None => float_value(-(i as f64)),
        },
        Some(Num::Float(f)) => float_value(-f),
        None => Err(EvalError::type_error(format!(
            "bad operand type for unary -: '{}'",
            type_name(&value)
        ))),
    }
}

pub fn positive(value: Value) -> Result<Value, EvalError> {
    match Num::of(&value) {
        Some(Num::Int(i)) => Ok(Value::from(i)),
        Some(Num::Float(f)) => float_value(f),
        None => Err(EvalError::type_error(format!(
            "bad operand type for unary +: '{}'",
            type_name(&value)
        ))),
    }
}

/// Equality with `1 == 1.0` and `True == 1`.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).map(|y| values_equal(x, y)).unwrap_or(false))
        }
        _ => match (Num::of(left), Num::of(right)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => a == b,
            (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
            _ => left == right,
        },
    }
}

/// Identity test for `is`: exact for None and booleans, equality otherwise.
pub fn values_identical(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Null, _) | (_, Value::Null) | (Value::Bool(_), _) | (_, Value::Bool(_)) => false,
        _ => values_equal(left, right),
    }
}

pub fn compare(left: &Value, right: &Value) -> Result<Ordering, EvalError> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b) {
                let ordering = compare(x, y)?;
                if ordering != Ordering::Equal {
                    return Ok(ordering);
                }
            }
            Ok(a.len().cmp(&b.len()))
        }
        _ => match (Num::of(left), Num::of(right)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => Ok(a.cmp(&b)),
            (Some(a), Some(b)) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .ok_or_else(|| EvalError::type_error("cannot order NaN")),
            _ => Err(EvalError::type_error(format!(
                "'<' not supported between instances of '{}' and '{}'",
                type_name(left),
                type_name(right)
            ))),
        },
    }
}

/// Membership for `in`.
pub fn contains(container: &Value, item: &Value) -> Result<bool, EvalError> {
    match container {
        Value::String(haystack) => match item {
            Value::String(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(EvalError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                type_name(other)
            ))),
        },
        Value::Array(items) => Ok(items.iter().any(|x| values_equal(x, item))),
        Value::Object(map) => match item {
            Value::String(key) => Ok(map.contains_key(key)),
            _ => Ok(false),
        },
        other => Err(EvalError::type_error(format!(
            "argument of type '{}' is not iterable",
            type_name(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arithmetic() {
        struct TestCase {
            op: BinaryOp,
            left: Value,
            right: Value,
            expected: Value,
        }

        let cases = vec![
            TestCase { op: BinaryOp::Add, left: json!(1), right: json!(2), expected: json!(3) },
            TestCase { op: BinaryOp::Add, left: json!(1), right: json!(0.5), expected: json!(1.5) },
            TestCase { op: BinaryOp::Add, left: json!("a"), right: json!("b"), expected: json!("ab") },
            TestCase { op: BinaryOp::Add, left: json!([1]), right: json!([2]), expected: json!([1, 2]) },
            TestCase { op: BinaryOp::Div, left: json!(7), right: json!(2), expected: json!(3.5) },
            TestCase { op: BinaryOp::FloorDiv, left: json!(-7), right: json!(2), expected: json!(-4) },
            TestCase { op: BinaryOp::Mod, left: json!(-7), right: json!(3), expected: json!(2) },
            TestCase { op: BinaryOp::Mul, left: json!("ab"), right: json!(2), expected: json!("abab") },
            TestCase { op: BinaryOp::Mul, left: json!(3), right: json!([0]), expected: json!([0, 0, 0]) },
            TestCase { op: BinaryOp::Mul, left: json!("ab"), right: json!(-1), expected: json!("") },
            TestCase { op: BinaryOp::Sub, left: json!(true), right: json!(1), expected: json!(0) },
        ];

        for case in cases {
            let result = binary(case.op, case.left.clone(), case.right.clone()).unwrap();
            assert!(
                values_equal(&result, &case.expected),
                "{} {:?} {} gave {}",
                case.left,
                case.op,
                case.right,
                result
            );
        }
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(binary(BinaryOp::Div, json!(1), json!(0)), Err(EvalError::DivisionByZero)));
        assert!(matches!(binary(BinaryOp::Mod, json!(1), json!(0)), Err(EvalError::DivisionByZero)));
    }

    #[test]
    fn test_repetition_is_bounded() {
        struct TestCase {
            left: Value,
            right: Value,
        }

        let cases = vec![
            TestCase { left: json!("x"), right: json!(100_000_000_000_000_000i64) },
            TestCase { left: json!(i64::MAX), right: json!("ab") },
            TestCase { left: json!([1, 2]), right: json!(i64::MAX) },
            TestCase { left: json!("x"), right: json!(MAX_SEQUENCE_LEN as i64 + 1) },
        ];

        for case in cases {
            let result = binary(BinaryOp::Mul, case.left.clone(), case.right.clone());
            assert!(
                matches!(result, Err(EvalError::Type(ref message)) if message.contains("maximum length")),
                "{} * {} gave {:?}",
                case.left,
                case.right,
                result
            );
        }

        let at_limit = binary(BinaryOp::Mul, json!("x"), json!(MAX_SEQUENCE_LEN as i64)).unwrap();
        assert_eq!(at_limit.as_str().map(str::len), Some(MAX_SEQUENCE_LEN));
    }

    #[test]
    fn test_mixed_type_addition_fails() {
        let err = binary(BinaryOp::Add, json!("a"), json!(1)).unwrap_err();
        assert!(err.to_string().contains("'str' and 'int'"));
    }

    #[test]
    fn test_numeric_equality_and_identity() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!({"a": [1]}), &json!({"a": [1.0]})));
        assert!(values_identical(&json!(null), &json!(null)));
        assert!(!values_identical(&json!(0), &json!(false)));
    }

    #[test]
    fn test_membership() {
        assert!(contains(&json!("hello"), &json!("ell")).unwrap());
        assert!(contains(&json!([1, 2]), &json!(2.0)).unwrap());
        assert!(contains(&json!({"k": 1}), &json!("k")).unwrap());
        assert!(contains(&json!(3), &json!(1)).is_err());
    }
}
