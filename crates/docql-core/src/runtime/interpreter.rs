//! Tree-walking evaluator for plan expressions

use super::{CacheSlot, RuntimeTables};
use crate::compiler::SortKey;
use crate::plan::{Expr, Helper, Key, Lambda, NativeOp, RowPattern, Table};
use crate::value::{Object, Value};
use crate::{Error, Result};
use std::cmp::Ordering;

type Scope = Vec<(String, Value)>;

pub(crate) struct Interpreter<'r, 'a> {
    tables: &'r RuntimeTables<'a>,
    cache: &'r mut CacheSlot,
    scopes: Vec<Scope>,
}

impl<'r, 'a> Interpreter<'r, 'a> {
    pub(crate) fn new(tables: &'r RuntimeTables<'a>, cache: &'r mut CacheSlot) -> Self {
        Self {
            tables,
            cache,
            scopes: Vec::new(),
        }
    }

    pub(crate) fn eval(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => self.lookup(name),
            Expr::Table(Table::Collection) => Ok(Value::Array(self.tables.collection.to_vec())),
            Expr::Table(Table::Cache) => Ok(self.cache.get().cloned().unwrap_or_default()),
            Expr::Parameter(name) => Ok(self.tables.parameters.get(name)),
            Expr::Member { object, key } => {
                let object = self.eval(object)?;
                match key {
                    Key::Name(name) => Ok(member(&object, &Value::from(name.as_str()))),
                    Key::Computed(key) => {
                        let key = self.eval(key)?;
                        Ok(member(&object, &key))
                    }
                }
            }
            Expr::Helper { helper, arguments } => {
                let arguments = self.eval_all(arguments)?;
                self.call_helper(*helper, arguments)
            }
            Expr::Function {
                kind,
                name,
                arguments,
            } => {
                let arguments = self.eval_all(arguments)?;
                self.tables.functions(*kind).call(name, &arguments)
            }
            Expr::Native { op, left, right } => self.eval_native(*op, left, right),
            Expr::IsDefined(operand) => Ok(Value::Bool(!self.eval(operand)?.is_undefined())),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Expr::Array(elements) => Ok(Value::Array(self.eval_all(elements)?)),
            Expr::Object(properties) => {
                let mut object = Object::with_capacity(properties.len());
                for (key, value) in properties {
                    let value = self.eval(value)?;
                    object.insert(key.clone(), value);
                }
                Ok(Value::Object(object))
            }
            Expr::Sequence(expressions) => {
                let mut last = Value::Undefined;
                for expression in expressions {
                    last = self.eval(expression)?;
                }
                Ok(last)
            }
            Expr::AssignCache(operand) => {
                let value = self.eval(operand)?;
                self.cache.set(value.clone());
                Ok(value)
            }
            Expr::Filter { source, lambda } => {
                let mut kept = Vec::new();
                for row in self.rows(source)? {
                    if self.apply(lambda, row.clone())?.is_truthy() {
                        kept.push(row);
                    }
                }
                Ok(Value::Array(kept))
            }
            Expr::Map { source, lambda } => {
                let rows = self.rows(source)?;
                let mut mapped = Vec::with_capacity(rows.len());
                for row in rows {
                    mapped.push(self.apply(lambda, row)?);
                }
                Ok(Value::Array(mapped))
            }
            Expr::FlatMap { source, lambda } => {
                let mut out = Vec::new();
                for row in self.rows(source)? {
                    match self.apply(lambda, row)? {
                        Value::Array(items) => out.extend(items),
                        other => out.push(other),
                    }
                }
                Ok(Value::Array(out))
            }
            Expr::Slice { source, count } => {
                let mut rows = self.rows(source)?;
                let end = match self.eval(count)? {
                    Value::Undefined => rows.len(),
                    Value::Number(n) => slice_end(n, rows.len()),
                    other => {
                        return Err(Error::execution(format!(
                            "TOP expects a number, got {}",
                            other.type_name()
                        )));
                    }
                };
                rows.truncate(end);
                Ok(Value::Array(rows))
            }
            Expr::Includes { list, value } => {
                let list = self.eval(list)?;
                let value = self.eval(value)?;
                let found = list
                    .as_array()
                    .is_some_and(|items| items.iter().any(|item| same_value_zero(item, &value)));
                Ok(Value::Bool(found))
            }
        }
    }

    fn eval_all(&mut self, expressions: &[Expr]) -> Result<Vec<Value>> {
        expressions.iter().map(|expr| self.eval(expr)).collect()
    }

    fn lookup(&self, name: &str) -> Result<Value> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| Error::execution(format!("unbound variable '{name}'")))
    }

    /// Rows of a collection operation's source; anything but an array is empty
    fn rows(&mut self, source: &Expr) -> Result<Vec<Value>> {
        match self.eval(source)? {
            Value::Array(rows) => Ok(rows),
            _ => Ok(Vec::new()),
        }
    }

    /// Evaluate a lambda body with `row` bound by its pattern
    fn apply(&mut self, lambda: &Lambda, row: Value) -> Result<Value> {
        let scope = match &lambda.pattern {
            RowPattern::None => Vec::new(),
            RowPattern::Row(name) => vec![(name.clone(), row)],
            RowPattern::Record(names) => names
                .iter()
                .map(|name| (name.clone(), row.get(name)))
                .collect(),
        };
        self.scopes.push(scope);
        let result = self.eval(&lambda.body);
        self.scopes.pop();
        result
    }

    fn eval_native(&mut self, op: NativeOp, left: &Expr, right: &Expr) -> Result<Value> {
        let left = self.eval(left)?;
        let result = match op {
            NativeOp::And if left.is_truthy() => return self.eval(right),
            NativeOp::Or if !left.is_truthy() => return self.eval(right),
            NativeOp::And | NativeOp::Or => return Ok(left),
            NativeOp::StrictEq => strict_equals(&left, &self.eval(right)?),
            NativeOp::GreaterOrEqual => matches!(
                native_cmp(&left, &self.eval(right)?),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            NativeOp::LessOrEqual => matches!(
                native_cmp(&left, &self.eval(right)?),
                Some(Ordering::Less | Ordering::Equal)
            ),
        };
        Ok(Value::Bool(result))
    }

    fn call_helper(&self, helper: Helper, mut args: Vec<Value>) -> Result<Value> {
        let semantics = self.tables.helpers;
        // missing operands read as undefined
        if helper != Helper::Sort && args.len() < 2 {
            args.resize(2, Value::Undefined);
        }

        let value = match helper {
            Helper::And => semantics.and(&args[0], &args[1]),
            Helper::Or => semantics.or(&args[0], &args[1]),
            Helper::Not => semantics.not(&args[0]),
            Helper::Equal => semantics.equal(&args[0], &args[1]),
            Helper::NotEqual => semantics.not_equal(&args[0], &args[1]),
            Helper::Compare(op) => semantics.compare(op, &args[0], &args[1]),
            Helper::Calculate(op) => semantics.calculate(op, &args[0], &args[1]),
            Helper::CalculateUnary(op) => semantics.calculate_unary(op, &args[0]),
            Helper::Concat => semantics.concat(&args[0], &args[1]),
            Helper::StripUndefined => semantics.strip_undefined(std::mem::take(&mut args[0])),
            Helper::Sort => {
                let mut args = args.into_iter();
                let rows = match args.next() {
                    Some(Value::Array(rows)) => rows,
                    _ => Vec::new(),
                };
                let keys = args
                    .map(|key| {
                        SortKey::from_value(&key)
                            .ok_or_else(|| Error::execution(format!("malformed sort key {key}")))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Value::Array(semantics.sort(rows, &keys))
            }
        };
        Ok(value)
    }
}

/// Property or index access; anything that cannot be indexed by `key`
/// yields undefined
fn member(object: &Value, key: &Value) -> Value {
    match (object, key) {
        (Value::Object(map), Value::String(name)) => map.get(name).cloned().unwrap_or_default(),
        (Value::Object(_), Value::Number(_)) => object.get(&key.to_string()),
        (Value::Array(items), Value::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => {
            items.get(*n as usize).cloned().unwrap_or_default()
        }
        (Value::Array(items), Value::String(index)) => index
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i).cloned())
            .unwrap_or_default(),
        _ => Value::Undefined,
    }
}

/// `===` on primitives; two containers are never the same instance
fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        _ => false,
    }
}

/// Array membership test: like `===` but NaN matches NaN and containers
/// compare by content
fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        _ => a == b,
    }
}

/// Plain relational ordering: two strings compare lexically, any other
/// pair compares as numbers. `None` when either side is not a number.
fn native_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => coerce_number(a).partial_cmp(&coerce_number(b)),
    }
}

/// Numeric reading of a primitive, NaN when it has none
fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(flag) => f64::from(u8::from(*flag)),
        Value::Number(n) => *n,
        Value::String(text) => parse_numeric(text.trim()),
        Value::Undefined | Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

fn parse_numeric(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let radix = match text.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&text[2..], radix).map_or(f64::NAN, |n| n as f64);
    }
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if unsigned == "Infinity" {
        return if text.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY };
    }
    // f64's parser also takes "inf" and "nan" spellings
    if unsigned.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return f64::NAN;
    }
    text.parse().unwrap_or(f64::NAN)
}

/// End index of a TOP slice; negative counts are taken from the end
fn slice_end(count: f64, len: usize) -> usize {
    if count.is_nan() {
        return 0;
    }
    let count = count.trunc();
    if count < 0.0 {
        len.saturating_sub((-count).min(len as f64) as usize)
    } else {
        count.min(len as f64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::CompareOp;
    use crate::runtime::{AggregateFunctions, BuiltinFunctions, Parameters, StandardSemantics, UdfRegistry};
    use serde_json::json;

    fn eval_with(collection: &[Value], params: &Parameters, expr: &Expr) -> Result<Value> {
        let udfs = UdfRegistry::new();
        let tables = RuntimeTables {
            aggregates: &AggregateFunctions,
            builtins: &BuiltinFunctions,
            collection,
            helpers: &StandardSemantics,
            udfs: &udfs,
            parameters: params,
        };
        let mut cache = CacheSlot::new();
        Interpreter::new(&tables, &mut cache).eval(expr)
    }

    fn eval(expr: &Expr) -> Result<Value> {
        eval_with(&[], &Parameters::new(), expr)
    }

    fn var(name: &str) -> Expr {
        Expr::Variable(name.to_string())
    }

    #[test]
    fn test_member_access_on_non_container_is_undefined() {
        assert_eq!(member(&Value::from(1i64), &Value::from("a")), Value::Undefined);
        assert_eq!(member(&Value::Null, &Value::from("a")), Value::Undefined);
        let items = Value::from(json!([10, 20]));
        assert_eq!(member(&items, &Value::from(1i64)), Value::from(20i64));
        assert_eq!(member(&items, &Value::from(1.5)), Value::Undefined);
    }

    #[test]
    fn test_unbound_variable_is_an_error() {
        let err = eval(&var("c")).unwrap_err();
        assert!(matches!(err, Error::Execution(msg) if msg.contains("'c'")));
    }

    #[test]
    fn test_record_pattern_binds_missing_as_undefined() {
        let collection = vec![Value::from(json!({ "f": 1 }))];
        let expr = Expr::Map {
            source: Box::new(Expr::Table(Table::Collection)),
            lambda: Lambda::new(
                RowPattern::Record(vec!["f".to_string(), "c".to_string()]),
                Expr::IsDefined(Box::new(var("c"))),
            ),
        };
        assert_eq!(
            eval_with(&collection, &Parameters::new(), &expr).unwrap(),
            Value::from(json!([false]))
        );
    }

    #[test]
    fn test_native_comparison_coerces_to_numbers() {
        let ge = |left: Value, right: Value| {
            eval(&Expr::native(
                NativeOp::GreaterOrEqual,
                Expr::Literal(left),
                Expr::Literal(right),
            ))
            .unwrap()
        };
        assert_eq!(ge(Value::from("3"), Value::from(1i64)), Value::Bool(true));
        assert_eq!(ge(Value::from(" 0x10 "), Value::from(16i64)), Value::Bool(true));
        assert_eq!(ge(Value::Null, Value::from(0i64)), Value::Bool(true));
        assert_eq!(ge(Value::Bool(true), Value::from(1i64)), Value::Bool(true));
        assert_eq!(ge(Value::from(""), Value::from(0i64)), Value::Bool(true));
        assert_eq!(ge(Value::from("-Infinity"), Value::from(0i64)), Value::Bool(false));

        // no numeric reading compares false both ways
        assert_eq!(ge(Value::Undefined, Value::from(1i64)), Value::Bool(false));
        assert_eq!(ge(Value::from("abc"), Value::from(0i64)), Value::Bool(false));
        assert_eq!(ge(Value::from("inf"), Value::from(0i64)), Value::Bool(false));
        assert_eq!(ge(Value::Number(f64::NAN), Value::Number(f64::NAN)), Value::Bool(false));
        assert_eq!(ge(Value::from(json!({})), Value::from(0i64)), Value::Bool(false));

        let le = Expr::native(NativeOp::LessOrEqual, Expr::literal("10"), Expr::literal("9"));
        assert_eq!(eval(&le).unwrap(), Value::Bool(true));
        let le = Expr::native(NativeOp::LessOrEqual, Expr::Literal(Value::Null), Expr::literal(5i64));
        assert_eq!(eval(&le).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_native_logical_operators_return_operands() {
        let or = Expr::native(
            NativeOp::Or,
            Expr::Literal(Value::Undefined),
            Expr::Array(vec![]),
        );
        assert_eq!(eval(&or).unwrap(), Value::Array(vec![]));

        let and = Expr::native(NativeOp::And, Expr::literal(0i64), var("unbound"));
        assert_eq!(eval(&and).unwrap(), Value::from(0i64));
    }

    #[test]
    fn test_slice_counts() {
        assert_eq!(slice_end(2.0, 5), 2);
        assert_eq!(slice_end(9.0, 5), 5);
        assert_eq!(slice_end(-1.0, 5), 4);
        assert_eq!(slice_end(-9.0, 5), 0);
        assert_eq!(slice_end(f64::NAN, 5), 0);

        let bad = Expr::Slice {
            source: Box::new(Expr::Array(vec![])),
            count: Box::new(Expr::literal("2")),
        };
        assert!(eval(&bad).is_err());
    }

    #[test]
    fn test_includes_matches_nan_and_containers() {
        let expr = Expr::Includes {
            list: Box::new(Expr::Array(vec![
                Expr::literal(f64::NAN),
                Expr::literal(Value::from(json!({ "a": 1 }))),
            ])),
            value: Box::new(Expr::literal(f64::NAN)),
        };
        assert_eq!(eval(&expr).unwrap(), Value::Bool(true));

        let expr = Expr::Includes {
            list: Box::new(Expr::literal(Value::from(json!([{ "a": 1 }])))),
            value: Box::new(Expr::literal(Value::from(json!({ "a": 1 })))),
        };
        assert_eq!(eval(&expr).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_parameters_and_helpers() {
        let params = Parameters::new().with("@min", 3i64);
        let expr = Expr::helper(
            Helper::Compare(CompareOp::Greater),
            vec![Expr::literal(5i64), Expr::Parameter("min".to_string())],
        );
        assert_eq!(eval_with(&[], &params, &expr).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_malformed_sort_key_is_an_error() {
        let expr = Expr::helper(
            Helper::Sort,
            vec![Expr::Array(vec![]), Expr::literal("f.age")],
        );
        assert!(eval(&expr).is_err());
    }

    #[test]
    fn test_cache_assignment() {
        let expr = Expr::Sequence(vec![
            Expr::AssignCache(Box::new(Expr::literal(Value::from(json!([1, 2]))))),
            Expr::Table(Table::Cache),
        ]);
        assert_eq!(eval(&expr).unwrap(), Value::from(json!([1, 2])));
    }
}
