//! Query engine facade
//!
//! Bundles the standard runtime tables so callers can go from a grammar
//! tree and a document collection to result rows in one call.

use crate::ast::Node;
use crate::compiler::compile_query;
use crate::plan::FunctionKind;
use crate::runtime::{
    AggregateFunctions, BuiltinFunctions, CacheSlot, CompiledQuery, FunctionTable, Parameters,
    RuntimeTables, StandardSemantics, UdfRegistry,
};
use crate::value::Value;
use crate::Result;
use serde_json::Value as JsonValue;
use tracing::debug;

/// Compiles and runs queries against in-memory collections
#[derive(Debug, Clone, Default)]
pub struct Engine {
    aggregates: AggregateFunctions,
    builtins: BuiltinFunctions,
    semantics: StandardSemantics,
    udfs: UdfRegistry,
}

impl Engine {
    /// Engine with the standard function tables and no UDFs
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine sharing an existing UDF registry
    pub fn with_udfs(udfs: UdfRegistry) -> Self {
        Self {
            udfs,
            ..Self::default()
        }
    }

    /// UDF registry used by this engine
    pub fn udfs(&self) -> &UdfRegistry {
        &self.udfs
    }

    /// Function names of one table, in listing order
    pub fn function_names(&self, kind: FunctionKind) -> Vec<String> {
        match kind {
            FunctionKind::Aggregate => self.aggregates.names(),
            FunctionKind::Builtin => self.builtins.names(),
            FunctionKind::Udf => self.udfs.names(),
        }
    }

    /// Compile a grammar tree
    pub fn compile(&self, node: &Node) -> Result<CompiledQuery> {
        compile_query(node)
    }

    /// Runtime tables over `collection` and `parameters`
    pub fn tables<'a>(&'a self, collection: &'a [Value], parameters: &'a Parameters) -> RuntimeTables<'a> {
        RuntimeTables {
            aggregates: &self.aggregates,
            builtins: &self.builtins,
            collection,
            helpers: &self.semantics,
            udfs: &self.udfs,
            parameters,
        }
    }

    /// Run a compiled query with its own cache slot
    pub fn execute(
        &self,
        query: &CompiledQuery,
        collection: &[Value],
        parameters: &Parameters,
    ) -> Result<Vec<JsonValue>> {
        let tables = self.tables(collection, parameters);
        query.run(&tables, &mut CacheSlot::new())
    }

    /// Compile and run in one step
    pub fn query(
        &self,
        node: &Node,
        documents: &[JsonValue],
        parameters: &Parameters,
    ) -> Result<Vec<JsonValue>> {
        let query = self.compile(node)?;
        let collection: Vec<Value> = documents.iter().map(Value::from).collect();
        debug!(documents = collection.len(), parameters = parameters.len(), "running query");
        self.execute(&query, &collection, parameters)
    }
}
