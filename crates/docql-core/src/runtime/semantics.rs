//! Operator semantics
//!
//! Query operators never fail on mismatched operands. Where the operands do
//! not fit the operator the result is undefined, and undefined propagates
//! through the three-valued logic until WHERE drops the row.

use crate::compiler::SortKey;
use crate::plan::{ArithmeticOp, CompareOp, UnaryArithmeticOp};
use crate::value::Value;
use std::cmp::Ordering;

/// Helper library a compiled plan calls for operators, sorting and output
/// cleanup
pub trait OperatorSemantics: Send + Sync {
    /// `a AND b`
    fn and(&self, a: &Value, b: &Value) -> Value;

    /// `a OR b`
    fn or(&self, a: &Value, b: &Value) -> Value;

    /// `NOT a`
    fn not(&self, a: &Value) -> Value;

    /// `a = b`
    fn equal(&self, a: &Value, b: &Value) -> Value;

    /// `a != b`
    fn not_equal(&self, a: &Value, b: &Value) -> Value {
        self.not(&self.equal(a, b))
    }

    /// `a > b`, `a < b`, `a >= b`, `a <= b`
    fn compare(&self, op: CompareOp, a: &Value, b: &Value) -> Value;

    /// Binary arithmetic and bitwise operators
    fn calculate(&self, op: ArithmeticOp, a: &Value, b: &Value) -> Value;

    /// Unary `-`, `+`, `~`
    fn calculate_unary(&self, op: UnaryArithmeticOp, a: &Value) -> Value;

    /// `a || b`
    fn concat(&self, a: &Value, b: &Value) -> Value;

    /// Stable multi-key sort of `rows`
    fn sort(&self, rows: Vec<Value>, keys: &[SortKey]) -> Vec<Value>;

    /// Remove undefined object properties, recursively
    fn strip_undefined(&self, value: Value) -> Value;
}

/// Standard three-valued operator rules
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardSemantics;

impl OperatorSemantics for StandardSemantics {
    fn and(&self, a: &Value, b: &Value) -> Value {
        match (a, b) {
            (Value::Bool(false), _) | (_, Value::Bool(false)) => Value::Bool(false),
            (Value::Bool(true), Value::Bool(true)) => Value::Bool(true),
            _ => Value::Undefined,
        }
    }

    fn or(&self, a: &Value, b: &Value) -> Value {
        match (a, b) {
            (Value::Bool(true), _) | (_, Value::Bool(true)) => Value::Bool(true),
            (Value::Bool(false), Value::Bool(false)) => Value::Bool(false),
            _ => Value::Undefined,
        }
    }

    fn not(&self, a: &Value) -> Value {
        match a {
            Value::Bool(b) => Value::Bool(!b),
            _ => Value::Undefined,
        }
    }

    fn equal(&self, a: &Value, b: &Value) -> Value {
        if a.is_undefined() || b.is_undefined() {
            return Value::Undefined;
        }
        if a.type_rank() != b.type_rank() {
            return Value::Bool(false);
        }
        Value::Bool(a == b)
    }

    fn compare(&self, op: CompareOp, a: &Value, b: &Value) -> Value {
        let ordering = match (a, b) {
            (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            _ => return Value::Undefined,
        };
        let Some(ordering) = ordering else {
            return Value::Bool(false);
        };
        Value::Bool(match op {
            CompareOp::Greater => ordering == Ordering::Greater,
            CompareOp::Less => ordering == Ordering::Less,
            CompareOp::GreaterOrEqual => ordering != Ordering::Less,
            CompareOp::LessOrEqual => ordering != Ordering::Greater,
        })
    }

    fn calculate(&self, op: ArithmeticOp, a: &Value, b: &Value) -> Value {
        let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
            return Value::Undefined;
        };
        let result = match op {
            ArithmeticOp::Add => x + y,
            ArithmeticOp::Subtract => x - y,
            ArithmeticOp::Multiply => x * y,
            ArithmeticOp::Divide => x / y,
            ArithmeticOp::Modulo => x % y,
            ArithmeticOp::BitOr => (to_int32(x) | to_int32(y)) as f64,
            ArithmeticOp::BitAnd => (to_int32(x) & to_int32(y)) as f64,
            ArithmeticOp::BitXor => (to_int32(x) ^ to_int32(y)) as f64,
            ArithmeticOp::ShiftLeft => to_int32(x).wrapping_shl(shift_count(y)) as f64,
            ArithmeticOp::ShiftRight => to_int32(x).wrapping_shr(shift_count(y)) as f64,
            ArithmeticOp::ShiftRightZeroFill => (to_uint32(x) >> shift_count(y)) as f64,
        };
        Value::Number(result)
    }

    fn calculate_unary(&self, op: UnaryArithmeticOp, a: &Value) -> Value {
        let Some(x) = a.as_f64() else {
            return Value::Undefined;
        };
        Value::Number(match op {
            UnaryArithmeticOp::Minus => -x,
            UnaryArithmeticOp::Plus => x,
            UnaryArithmeticOp::BitNot => !to_int32(x) as f64,
        })
    }

    fn concat(&self, a: &Value, b: &Value) -> Value {
        match (a, b) {
            (Value::String(x), Value::String(y)) => Value::String(format!("{x}{y}")),
            _ => Value::Undefined,
        }
    }

    fn sort(&self, mut rows: Vec<Value>, keys: &[SortKey]) -> Vec<Value> {
        if keys.is_empty() {
            return rows;
        }
        rows.sort_by(|a, b| {
            for key in keys {
                let ordering = a
                    .lookup_path(&key.path)
                    .sort_cmp(&b.lookup_path(&key.path));
                let ordering = if key.descending {
                    ordering.reverse()
                } else {
                    ordering
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        rows
    }

    fn strip_undefined(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k, self.strip_undefined(v)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.strip_undefined(item))
                    .collect(),
            ),
            other => other,
        }
    }
}

/// 32-bit signed integer conversion used by the bitwise operators
fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

fn shift_count(n: f64) -> u32 {
    to_uint32(n) & 31
}
