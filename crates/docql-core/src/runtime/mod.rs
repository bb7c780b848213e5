//! Reference runtime for compiled plans
//!
//! A [`CompiledQuery`] reads nothing but the seven tables handed to it:
//!
//! | Table | Type |
//! |---|---|
//! | aggregate functions | [`FunctionTable`] ([`AggregateFunctions`]) |
//! | built-in functions | [`FunctionTable`] ([`BuiltinFunctions`]) |
//! | document collection | `&[Value]` |
//! | operator helpers | [`OperatorSemantics`] ([`StandardSemantics`]) |
//! | user-defined functions | [`FunctionTable`] ([`UdfRegistry`]) |
//! | parameters | [`Parameters`] |
//! | intermediate cache | [`CacheSlot`] |
//!
//! The first six are read-only and may be shared between executions; the
//! cache slot belongs to one execution.

pub mod aggregate;
pub mod builtin;
mod interpreter;
pub mod semantics;
pub mod udf;

pub use aggregate::AggregateFunctions;
pub use builtin::BuiltinFunctions;
pub use semantics::{OperatorSemantics, StandardSemantics};
pub use udf::{ClosureUdf, UdfFunction, UdfRegistry, UdfSignature};

use crate::plan::{Expr, FunctionKind};
use crate::value::Value;
use crate::{Error, Result};
use indexmap::IndexMap;
use interpreter::Interpreter;
use serde_json::Value as JsonValue;
use std::fmt;
use tracing::debug;

/// A named function library the plan dispatches calls to
pub trait FunctionTable: Send + Sync {
    /// Table the plan routes to this library
    fn kind(&self) -> FunctionKind;

    /// Call `name` (case-insensitive); unknown names fail with
    /// [`Error::UnknownFunction`]
    fn call(&self, name: &str, args: &[Value]) -> Result<Value>;

    /// Whether `name` (case-insensitive) exists
    fn contains(&self, name: &str) -> bool;

    /// Function names, in listing order
    fn names(&self) -> Vec<String>;

    /// Error for a name this table does not know
    fn unknown(&self, name: &str) -> Error {
        Error::UnknownFunction {
            kind: self.kind(),
            name: name.to_string(),
        }
    }
}

/// Query parameters, keyed by name without the `@` sigil
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: IndexMap<String, Value>,
}

impl Parameters {
    /// Empty parameter bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter; `name` may carry the `@` sigil
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(strip_sigil(name).to_string(), value.into())
    }

    /// Builder form of [`Parameters::insert`]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Parameter value; undefined when not set
    pub fn get(&self, name: &str) -> Value {
        self.values
            .get(strip_sigil(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Build from a JSON object (`{"@limit": 2, "state": "WA"}`)
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        let JsonValue::Object(map) = json else {
            return Err(Error::execution(format!(
                "parameters must be a JSON object, got {json}"
            )));
        };
        Ok(map
            .iter()
            .map(|(name, value)| (name.as_str(), Value::from(value)))
            .collect())
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no parameter is set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parameters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<'a, V: Into<Value>> FromIterator<(&'a str, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (&'a str, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

fn strip_sigil(name: &str) -> &str {
    name.strip_prefix('@').unwrap_or(name)
}

/// Intermediate result slot written by aggregate projections
#[derive(Debug, Default)]
pub struct CacheSlot {
    value: Option<Value>,
}

impl CacheSlot {
    /// Empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value, if a plan assigned one
    pub fn get(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Replace the cached value
    pub fn set(&mut self, value: Value) {
        self.value = Some(value);
    }

    /// Empty the slot, returning what it held
    pub fn take(&mut self) -> Option<Value> {
        self.value.take()
    }
}

/// The read-only runtime tables of one execution
#[derive(Clone, Copy)]
pub struct RuntimeTables<'a> {
    /// Aggregate functions
    pub aggregates: &'a dyn FunctionTable,
    /// Built-in scalar functions
    pub builtins: &'a dyn FunctionTable,
    /// Document collection
    pub collection: &'a [Value],
    /// Operator semantics
    pub helpers: &'a dyn OperatorSemantics,
    /// User-defined functions
    pub udfs: &'a dyn FunctionTable,
    /// Query parameters
    pub parameters: &'a Parameters,
}

impl<'a> RuntimeTables<'a> {
    /// Function table a call of `kind` dispatches to
    pub fn functions(&self, kind: FunctionKind) -> &'a dyn FunctionTable {
        match kind {
            FunctionKind::Aggregate => self.aggregates,
            FunctionKind::Builtin => self.builtins,
            FunctionKind::Udf => self.udfs,
        }
    }
}

impl fmt::Debug for RuntimeTables<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeTables")
            .field("collection", &self.collection.len())
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// A compiled query: the plan body, executable against any set of tables
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    body: Expr,
}

impl CompiledQuery {
    /// Wrap a compiled plan body
    pub fn new(body: Expr) -> Self {
        Self { body }
    }

    /// Plan body
    pub fn body(&self) -> &Expr {
        &self.body
    }

    /// Evaluate with an explicit cache slot.
    ///
    /// Rows that are undefined after stripping are left out of the result.
    pub fn run(&self, tables: &RuntimeTables<'_>, cache: &mut CacheSlot) -> Result<Vec<JsonValue>> {
        let result = Interpreter::new(tables, cache).eval(&self.body)?;
        let rows = match result {
            Value::Array(rows) => rows,
            Value::Undefined => Vec::new(),
            other => {
                return Err(Error::execution(format!(
                    "query produced a {} instead of a row sequence",
                    other.type_name()
                )));
            }
        };
        let total = rows.len();
        let output: Vec<JsonValue> = rows.iter().filter_map(Value::to_json).collect();
        debug!(rows = output.len(), omitted = total - output.len(), "query executed");
        Ok(output)
    }

    /// Evaluate with a fresh cache slot
    pub fn execute(&self, tables: &RuntimeTables<'_>) -> Result<Vec<JsonValue>> {
        self.run(tables, &mut CacheSlot::new())
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body)
    }
}
