//! Built-in scalar functions
//!
//! Names are case-insensitive. A call whose arguments have the wrong types
//! returns undefined instead of failing, matching the operator semantics.

use super::FunctionTable;
use crate::Result;
use crate::plan::FunctionKind;
use crate::value::Value;

/// Mathematical functions
const MATH: &[&str] = &[
    "ABS", "ACOS", "ASIN", "ATAN", "ATN2", "CEILING", "COS", "COT", "DEGREES", "EXP", "FLOOR",
    "LOG", "LOG10", "PI", "POWER", "RADIANS", "ROUND", "SIGN", "SIN", "SQRT", "SQUARE", "TAN",
    "TRUNC",
];

/// Type-checking functions
const TYPE_CHECKS: &[&str] = &[
    "IS_ARRAY",
    "IS_BOOL",
    "IS_DEFINED",
    "IS_NULL",
    "IS_NUMBER",
    "IS_OBJECT",
    "IS_PRIMITIVE",
    "IS_STRING",
];

/// String functions
const STRINGS: &[&str] = &[
    "CONCAT",
    "CONTAINS",
    "ENDSWITH",
    "INDEX_OF",
    "LEFT",
    "LENGTH",
    "LOWER",
    "LTRIM",
    "REPLACE",
    "REPLICATE",
    "REVERSE",
    "RIGHT",
    "RTRIM",
    "STARTSWITH",
    "SUBSTRING",
    "ToString",
    "TRIM",
    "UPPER",
];

/// Array functions
const ARRAYS: &[&str] = &["ARRAY_CONCAT", "ARRAY_CONTAINS", "ARRAY_LENGTH", "ARRAY_SLICE"];

/// Upper bound on `REPLICATE` output length
const MAX_REPLICATE_LENGTH: usize = 10_000;

/// The query language's built-in scalar function library
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFunctions;

impl FunctionTable for BuiltinFunctions {
    fn kind(&self) -> FunctionKind {
        FunctionKind::Builtin
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let upper = name.to_ascii_uppercase();
        let result = math(&upper, args)
            .or_else(|| type_check(&upper, args))
            .or_else(|| string(&upper, args))
            .or_else(|| array(&upper, args));
        result.ok_or_else(|| self.unknown(name))
    }

    fn contains(&self, name: &str) -> bool {
        [MATH, TYPE_CHECKS, STRINGS, ARRAYS]
            .iter()
            .flat_map(|group| group.iter())
            .any(|known| known.eq_ignore_ascii_case(name))
    }

    fn names(&self) -> Vec<String> {
        [MATH, TYPE_CHECKS, STRINGS, ARRAYS]
            .iter()
            .flat_map(|group| group.iter())
            .map(|name| name.to_string())
            .collect()
    }
}

fn arg(args: &[Value], index: usize) -> &Value {
    const UNDEFINED: &Value = &Value::Undefined;
    args.get(index).unwrap_or(UNDEFINED)
}

fn number(args: &[Value], index: usize) -> Option<f64> {
    arg(args, index).as_f64()
}

fn text(args: &[Value], index: usize) -> Option<&str> {
    arg(args, index).as_str()
}

/// Integer argument for lengths and offsets
fn integer(args: &[Value], index: usize) -> Option<i64> {
    number(args, index)
        .filter(|n| n.is_finite())
        .map(|n| n.trunc() as i64)
}

fn unary(args: &[Value], f: impl Fn(f64) -> f64) -> Value {
    number(args, 0).map(f).map(Value::Number).unwrap_or_default()
}

fn binary(args: &[Value], f: impl Fn(f64, f64) -> f64) -> Value {
    match (number(args, 0), number(args, 1)) {
        (Some(a), Some(b)) => Value::Number(f(a, b)),
        _ => Value::Undefined,
    }
}

fn math(name: &str, args: &[Value]) -> Option<Value> {
    let value = match name {
        "ABS" => unary(args, f64::abs),
        "ACOS" => unary(args, f64::acos),
        "ASIN" => unary(args, f64::asin),
        "ATAN" => unary(args, f64::atan),
        "ATN2" => binary(args, |x, y| y.atan2(x)),
        "CEILING" => unary(args, f64::ceil),
        "COS" => unary(args, f64::cos),
        "COT" => unary(args, |x| 1.0 / x.tan()),
        "DEGREES" => unary(args, f64::to_degrees),
        "EXP" => unary(args, f64::exp),
        "FLOOR" => unary(args, f64::floor),
        "LOG" => match args.len() {
            1 => unary(args, f64::ln),
            _ => binary(args, |x, base| x.log(base)),
        },
        "LOG10" => unary(args, f64::log10),
        "PI" => Value::Number(std::f64::consts::PI),
        "POWER" => binary(args, f64::powf),
        "RADIANS" => unary(args, f64::to_radians),
        "ROUND" => unary(args, f64::round),
        "SIGN" => unary(args, |x| if x == 0.0 || x.is_nan() { x } else { x.signum() }),
        "SIN" => unary(args, f64::sin),
        "SQRT" => unary(args, f64::sqrt),
        "SQUARE" => unary(args, |x| x * x),
        "TAN" => unary(args, f64::tan),
        "TRUNC" => unary(args, f64::trunc),
        _ => return None,
    };
    Some(value)
}

fn type_check(name: &str, args: &[Value]) -> Option<Value> {
    let value = arg(args, 0);
    let result = match name {
        "IS_ARRAY" => matches!(value, Value::Array(_)),
        "IS_BOOL" => matches!(value, Value::Bool(_)),
        "IS_DEFINED" => !value.is_undefined(),
        "IS_NULL" => matches!(value, Value::Null),
        "IS_NUMBER" => matches!(value, Value::Number(_)),
        "IS_OBJECT" => matches!(value, Value::Object(_)),
        "IS_PRIMITIVE" => matches!(
            value,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
        ),
        "IS_STRING" => matches!(value, Value::String(_)),
        _ => return None,
    };
    Some(Value::Bool(result))
}

fn string(name: &str, args: &[Value]) -> Option<Value> {
    let value = match name {
        "CONCAT" => args
            .iter()
            .map(Value::as_str)
            .collect::<Option<String>>()
            .map(Value::String)
            .unwrap_or_default(),
        "CONTAINS" => predicate(args, |s, t| s.contains(t)),
        "ENDSWITH" => predicate(args, |s, t| s.ends_with(t)),
        "STARTSWITH" => predicate(args, |s, t| s.starts_with(t)),
        "INDEX_OF" => match (text(args, 0), text(args, 1)) {
            (Some(s), Some(t)) => Value::from(
                s.find(t)
                    .map(|byte| s[..byte].chars().count() as i64)
                    .unwrap_or(-1),
            ),
            _ => Value::Undefined,
        },
        "LEFT" => match (text(args, 0), integer(args, 1)) {
            (Some(s), Some(n)) if n >= 0 => Value::String(s.chars().take(n as usize).collect()),
            _ => Value::Undefined,
        },
        "RIGHT" => match (text(args, 0), integer(args, 1)) {
            (Some(s), Some(n)) if n >= 0 => {
                let len = s.chars().count();
                Value::String(s.chars().skip(len.saturating_sub(n as usize)).collect())
            }
            _ => Value::Undefined,
        },
        "LENGTH" => text(args, 0)
            .map(|s| Value::from(s.chars().count()))
            .unwrap_or_default(),
        "LOWER" => map_text(args, str::to_lowercase),
        "UPPER" => map_text(args, str::to_uppercase),
        "LTRIM" => map_text(args, |s| s.trim_start().to_string()),
        "RTRIM" => map_text(args, |s| s.trim_end().to_string()),
        "TRIM" => map_text(args, |s| s.trim().to_string()),
        "REVERSE" => map_text(args, |s| s.chars().rev().collect()),
        "REPLACE" => match (text(args, 0), text(args, 1), text(args, 2)) {
            (Some(s), Some(from), Some(to)) if !from.is_empty() => {
                Value::String(s.replace(from, to))
            }
            (Some(s), Some(_), Some(_)) => Value::from(s),
            _ => Value::Undefined,
        },
        "REPLICATE" => match (text(args, 0), integer(args, 1)) {
            (Some(s), Some(n))
                if n >= 0 && s.len().saturating_mul(n as usize) <= MAX_REPLICATE_LENGTH =>
            {
                Value::String(s.repeat(n as usize))
            }
            _ => Value::Undefined,
        },
        "SUBSTRING" => match (text(args, 0), integer(args, 1), integer(args, 2)) {
            (Some(s), Some(start), Some(length)) => Value::String(
                s.chars()
                    .skip(start.max(0) as usize)
                    .take(length.max(0) as usize)
                    .collect(),
            ),
            _ => Value::Undefined,
        },
        "TOSTRING" => match arg(args, 0) {
            Value::Undefined => Value::Undefined,
            Value::String(s) => Value::from(s.as_str()),
            other => other
                .to_json()
                .map(|json| Value::String(json.to_string()))
                .unwrap_or_default(),
        },
        _ => return None,
    };
    Some(value)
}

fn predicate(args: &[Value], f: impl Fn(&str, &str) -> bool) -> Value {
    match (text(args, 0), text(args, 1)) {
        (Some(s), Some(t)) => Value::Bool(f(s, t)),
        _ => Value::Undefined,
    }
}

fn map_text(args: &[Value], f: impl Fn(&str) -> String) -> Value {
    text(args, 0).map(|s| Value::String(f(s))).unwrap_or_default()
}

fn array(name: &str, args: &[Value]) -> Option<Value> {
    let value = match name {
        "ARRAY_CONCAT" => {
            let mut out = Vec::new();
            for value in args {
                match value {
                    Value::Array(items) => out.extend(items.iter().cloned()),
                    _ => return Some(Value::Undefined),
                }
            }
            Value::Array(out)
        }
        "ARRAY_CONTAINS" => match arg(args, 0) {
            Value::Array(items) => {
                let needle = arg(args, 1);
                let partial = matches!(arg(args, 2), Value::Bool(true));
                Value::Bool(items.iter().any(|item| {
                    item == needle || (partial && partially_matches(item, needle))
                }))
            }
            _ => Value::Undefined,
        },
        "ARRAY_LENGTH" => arg(args, 0)
            .as_array()
            .map(|items| Value::from(items.len()))
            .unwrap_or_default(),
        "ARRAY_SLICE" => match (arg(args, 0).as_array(), integer(args, 1)) {
            (Some(items), Some(start)) => {
                let len = items.len() as i64;
                let start = if start < 0 { (len + start).max(0) } else { start.min(len) };
                let end = match arg(args, 2) {
                    Value::Undefined => len,
                    _ => match integer(args, 2) {
                        Some(count) => start.saturating_add(count.max(0)).min(len),
                        None => return Some(Value::Undefined),
                    },
                };
                Value::Array(items[start as usize..end as usize].to_vec())
            }
            _ => Value::Undefined,
        },
        _ => return None,
    };
    Some(value)
}

/// Every property of `needle` is present in `item` with the same value
fn partially_matches(item: &Value, needle: &Value) -> bool {
    match (item, needle) {
        (Value::Object(item), Value::Object(needle)) => needle
            .iter()
            .all(|(key, value)| item.get(key) == Some(value)),
        _ => false,
    }
}
