//! Aggregate functions
//!
//! Each aggregate receives one materialized array per argument: the
//! argument evaluated against every cached row. Undefined entries (rows
//! where the argument is absent) are skipped.

use super::FunctionTable;
use crate::Result;
use crate::compiler::AGGREGATE_FUNCTIONS;
use crate::plan::FunctionKind;
use crate::value::Value;

/// `AVG`, `COUNT`, `MAX`, `MIN` and `SUM`
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateFunctions;

impl AggregateFunctions {
    fn column(args: &[Value]) -> Vec<&Value> {
        args.first()
            .and_then(Value::as_array)
            .unwrap_or_default()
            .iter()
            .filter(|value| !value.is_undefined())
            .collect()
    }
}

impl FunctionTable for AggregateFunctions {
    fn kind(&self) -> FunctionKind {
        FunctionKind::Aggregate
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let values = Self::column(args);
        let result = match name.to_ascii_uppercase().as_str() {
            "COUNT" => Value::from(values.len()),
            "SUM" => sum(&values).map(Value::Number).unwrap_or_default(),
            "AVG" => match sum(&values) {
                Some(total) if !values.is_empty() => Value::Number(total / values.len() as f64),
                _ => Value::Undefined,
            },
            "MIN" => values
                .iter()
                .min_by(|a, b| a.sort_cmp(b))
                .map(|value| (*value).clone())
                .unwrap_or_default(),
            "MAX" => values
                .iter()
                .max_by(|a, b| a.sort_cmp(b))
                .map(|value| (*value).clone())
                .unwrap_or_default(),
            _ => return Err(self.unknown(name)),
        };
        Ok(result)
    }

    fn contains(&self, name: &str) -> bool {
        AGGREGATE_FUNCTIONS
            .iter()
            .any(|aggregate| aggregate.eq_ignore_ascii_case(name))
    }

    fn names(&self) -> Vec<String> {
        AGGREGATE_FUNCTIONS.iter().map(|name| name.to_string()).collect()
    }
}

/// Sum of a numeric column; `None` when any entry is not a number
fn sum(values: &[&Value]) -> Option<f64> {
    values.iter().map(|value| value.as_f64()).sum()
}
