//! User-Defined Functions (UDF)
//!
//! This module provides:
//! - UDF registration and lookup (names are case-insensitive)
//! - Invocation from compiled plans through [`FunctionTable`]
//! - Optional arity checking from the declared signature

use super::FunctionTable;
use crate::plan::FunctionKind;
use crate::value::Value;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// UDF function signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdfSignature {
    /// Function name as registered
    pub name: String,
    /// Number of arguments; `None` accepts any number
    pub arity: Option<usize>,
    /// Description (optional)
    pub description: Option<String>,
}

impl UdfSignature {
    /// Signature accepting any number of arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arity: None,
            description: None,
        }
    }

    /// Require exactly `arity` arguments
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Trait for UDF implementations
pub trait UdfFunction: Send + Sync {
    /// Get the function signature
    fn signature(&self) -> &UdfSignature;

    /// Execute the UDF with given arguments
    fn execute(&self, args: &[Value]) -> Result<Value>;
}

/// UDF backed by a closure
pub struct ClosureUdf {
    signature: UdfSignature,
    function: Box<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>,
}

impl ClosureUdf {
    /// Create a new closure UDF
    pub fn new<F>(signature: UdfSignature, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            signature,
            function: Box::new(function),
        }
    }
}

impl UdfFunction for ClosureUdf {
    fn signature(&self) -> &UdfSignature {
        &self.signature
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        (self.function)(args)
    }
}

/// UDF registry; clones share the same registrations
#[derive(Clone, Default)]
pub struct UdfRegistry {
    /// Registered UDFs, keyed by upper-cased name
    udfs: Arc<RwLock<HashMap<String, Arc<dyn UdfFunction>>>>,
}

impl UdfRegistry {
    /// Create a new UDF registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a UDF
    pub fn register(&self, udf: Arc<dyn UdfFunction>) -> Result<()> {
        let name = udf.signature().name.clone();
        let mut udfs = self.udfs.write();

        let key = name.to_uppercase();
        if udfs.contains_key(&key) {
            return Err(Error::udf(format!("UDF '{}' already registered", name)));
        }

        debug!(udf = %name, "registered UDF");
        udfs.insert(key, udf);
        Ok(())
    }

    /// Register a closure under `name`
    pub fn register_fn<F>(&self, name: &str, function: F) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(Arc::new(ClosureUdf::new(UdfSignature::new(name), function)))
    }

    /// Get a UDF by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn UdfFunction>> {
        let udfs = self.udfs.read();
        udfs.get(&name.to_uppercase()).cloned()
    }

    /// List all registered UDF names, sorted
    pub fn list(&self) -> Vec<String> {
        let udfs = self.udfs.read();
        let mut names: Vec<String> = udfs
            .values()
            .map(|udf| udf.signature().name.clone())
            .collect();
        names.sort();
        names
    }

    /// Unregister a UDF
    pub fn unregister(&self, name: &str) -> Result<()> {
        let mut udfs = self.udfs.write();
        udfs.remove(&name.to_uppercase())
            .ok_or_else(|| Error::udf(format!("UDF '{}' not found", name)))?;
        Ok(())
    }
}

impl std::fmt::Debug for UdfRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdfRegistry")
            .field("udfs", &self.list())
            .finish()
    }
}

impl FunctionTable for UdfRegistry {
    fn kind(&self) -> FunctionKind {
        FunctionKind::Udf
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let udf = self.get(name).ok_or_else(|| self.unknown(name))?;
        match udf.signature().arity {
            Some(arity) if arity != args.len() => {
                return Err(Error::udf(format!(
                    "UDF '{}' expects {} argument(s), got {}",
                    udf.signature().name,
                    arity,
                    args.len()
                )));
            }
            _ => {}
        }
        udf.execute(args)
    }

    fn contains(&self, name: &str) -> bool {
        let udfs = self.udfs.read();
        udfs.contains_key(&name.to_uppercase())
    }

    fn names(&self) -> Vec<String> {
        self.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udf_registry() {
        let registry = UdfRegistry::new();

        let udf = ClosureUdf::new(UdfSignature::new("answer"), |_args| Ok(Value::from(42i64)));
        registry.register(Arc::new(udf)).unwrap();

        assert!(registry.contains("ANSWER"));
        assert_eq!(registry.list(), vec!["answer"]);

        let result = registry.call("Answer", &[]).unwrap();
        assert_eq!(result, Value::from(42i64));
    }

    #[test]
    fn test_udf_with_arity() {
        let registry = UdfRegistry::new();

        let signature = UdfSignature::new("add")
            .with_arity(2)
            .with_description("Add two numbers");
        let udf = ClosureUdf::new(signature, |args| {
            let a = args[0]
                .as_f64()
                .ok_or_else(|| Error::udf("Invalid argument"))?;
            let b = args[1]
                .as_f64()
                .ok_or_else(|| Error::udf("Invalid argument"))?;
            Ok(Value::Number(a + b))
        });
        registry.register(Arc::new(udf)).unwrap();

        let result = registry
            .call("add", &[Value::from(10i64), Value::from(20i64)])
            .unwrap();
        assert_eq!(result, Value::from(30i64));

        let err = registry.call("add", &[Value::from(1i64)]).unwrap_err();
        assert!(matches!(err, Error::Udf(_)));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = UdfRegistry::new();
        registry.register_fn("f", |_| Ok(Value::Null)).unwrap();
        assert!(matches!(
            registry.register_fn("F", |_| Ok(Value::Null)),
            Err(Error::Udf(_))
        ));
    }

    #[test]
    fn test_unknown_and_unregister() {
        let registry = UdfRegistry::new();
        registry.register_fn("f", |_| Ok(Value::Null)).unwrap();
        registry.unregister("f").unwrap();
        assert!(registry.unregister("f").is_err());
        assert!(matches!(
            registry.call("f", &[]),
            Err(Error::UnknownFunction {
                kind: FunctionKind::Udf,
                ..
            })
        ));
    }

    #[test]
    fn test_clones_share_registrations() {
        let registry = UdfRegistry::new();
        let shared = registry.clone();
        registry.register_fn("f", |_| Ok(Value::Null)).unwrap();
        assert!(shared.contains("f"));
    }
}
