//! Grammar-tree builders shared by the integration tests
//!
//! The builders produce the JSON the upstream parser emits, so every test
//! also goes through `Node::from_json`.

#![allow(dead_code)]

use docql_core::{Engine, Node, Parameters, Result};
use serde_json::{Value, json};

pub fn ident(name: &str) -> Value {
    json!({ "type": "identifier", "name": name })
}

pub fn num(value: f64) -> Value {
    json!({ "type": "number_constant", "value": value })
}

pub fn string(value: &str) -> Value {
    json!({ "type": "string_constant", "value": value })
}

pub fn null() -> Value {
    json!({ "type": "null_constant" })
}

pub fn param(name: &str) -> Value {
    json!({ "type": "parameter_name", "name": name })
}

/// `object.property`
pub fn member(object: Value, property: &str) -> Value {
    json!({
        "type": "scalar_member_expression",
        "object": object,
        "property": ident(property),
        "computed": false
    })
}

/// `a.b.c` from a dotted path
pub fn path(dotted: &str) -> Value {
    let mut parts = dotted.split('.');
    let root = ident(parts.next().unwrap_or_default());
    parts.fold(root, member)
}

/// `object.property` in a FROM/JOIN position
pub fn collection_member(object: Value, property: &str) -> Value {
    json!({
        "type": "collection_member_expression",
        "object": object,
        "property": ident(property),
        "computed": false
    })
}

/// Dotted path in a FROM/JOIN position
pub fn collection_path(dotted: &str) -> Value {
    let mut parts = dotted.split('.');
    let root = ident(parts.next().unwrap_or_default());
    let rest: Vec<&str> = parts.collect();
    if rest.is_empty() {
        return json!({ "type": "collection_expression", "expression": root });
    }
    rest.into_iter().fold(root, collection_member)
}

pub fn binary(left: Value, operator: &str, right: Value) -> Value {
    json!({
        "type": "scalar_binary_expression",
        "left": left,
        "operator": operator,
        "right": right
    })
}

pub fn unary(operator: &str, argument: Value) -> Value {
    json!({
        "type": "scalar_unary_expression",
        "operator": operator,
        "argument": argument
    })
}

pub fn between(value: Value, begin: Value, end: Value) -> Value {
    json!({
        "type": "scalar_between_expression",
        "value": value,
        "begin": begin,
        "end": end
    })
}

pub fn call(name: &str, arguments: Vec<Value>) -> Value {
    json!({
        "type": "scalar_function_expression",
        "name": ident(name),
        "arguments": arguments,
        "udf": false
    })
}

pub fn udf_call(name: &str, arguments: Vec<Value>) -> Value {
    json!({
        "type": "scalar_function_expression",
        "name": ident(name),
        "arguments": arguments,
        "udf": true
    })
}

/// `FROM expression [AS alias]`
pub fn source(expression: Value, alias: Option<&str>) -> Value {
    let mut node = json!({ "type": "from_source", "expression": expression });
    if let Some(alias) = alias {
        node["alias"] = ident(alias);
    }
    node
}

/// `JOIN alias IN expression`
pub fn iterate(alias: &str, expression: Value) -> Value {
    json!({
        "type": "from_source",
        "expression": expression,
        "alias": ident(alias),
        "iteration": true
    })
}

pub fn from(source: Value, joins: Vec<Value>) -> Value {
    json!({ "type": "from_specification", "source": source, "joins": joins })
}

pub fn select_star() -> Value {
    json!({ "type": "select_specification", "*": true })
}

pub fn select_value(value: Value) -> Value {
    json!({ "type": "select_specification", "*": false, "value": value })
}

/// `SELECT a, b AS x`; `None` leaves the column unaliased
pub fn select_list(columns: Vec<(Value, Option<&str>)>) -> Value {
    let properties: Vec<Value> = columns
        .into_iter()
        .map(|(property, alias)| match alias {
            Some(alias) => json!({ "property": property, "alias": ident(alias) }),
            None => json!({ "property": property }),
        })
        .collect();
    json!({
        "type": "select_specification",
        "*": false,
        "properties": { "type": "object_property_list", "properties": properties }
    })
}

pub fn order_by(keys: Vec<(Value, &str)>) -> Value {
    let expressions: Vec<Value> = keys
        .into_iter()
        .map(|(expression, order)| {
            json!({ "type": "sort_expression", "expression": expression, "order": order })
        })
        .collect();
    json!({ "type": "sort_specification", "expressions": expressions })
}

/// Clauses of a `select_query`; unset clauses are omitted
#[derive(Default)]
pub struct Query {
    pub select: Option<Value>,
    pub from: Option<Value>,
    pub filter: Option<Value>,
    pub order_by: Option<Value>,
    pub top: Option<Value>,
}

impl Query {
    pub fn select(select: Value) -> Self {
        Self {
            select: Some(select),
            ..Self::default()
        }
    }

    pub fn from(mut self, from: Value) -> Self {
        self.from = Some(from);
        self
    }

    pub fn filter(mut self, condition: Value) -> Self {
        self.filter = Some(json!({ "type": "filter_condition", "condition": condition }));
        self
    }

    pub fn order_by(mut self, spec: Value) -> Self {
        self.order_by = Some(spec);
        self
    }

    pub fn top(mut self, value: Value) -> Self {
        self.top = Some(json!({ "type": "top_specification", "value": value }));
        self
    }

    pub fn to_json(&self) -> Value {
        let mut node = json!({ "type": "select_query", "select": self.select });
        if let Some(from) = &self.from {
            node["from"] = from.clone();
        }
        if let Some(filter) = &self.filter {
            node["where"] = filter.clone();
        }
        if let Some(order_by) = &self.order_by {
            node["orderBy"] = order_by.clone();
        }
        if let Some(top) = &self.top {
            node["top"] = top.clone();
        }
        node
    }

    pub fn node(&self) -> Node {
        Node::from_json(self.to_json()).expect("test query should decode")
    }

    pub fn run(&self, documents: &[Value]) -> Result<Vec<Value>> {
        self.run_with(&Engine::new(), documents, &Parameters::new())
    }

    pub fn run_with(
        &self,
        engine: &Engine,
        documents: &[Value],
        parameters: &Parameters,
    ) -> Result<Vec<Value>> {
        init_tracing();
        engine.query(&self.node(), documents, parameters)
    }
}

/// Route compiler and runtime logs to the test output; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The Families sample collection
pub fn families() -> Vec<Value> {
    vec![
        json!({
            "id": "AndersenFamily",
            "lastName": "Andersen",
            "address": { "state": "WA", "city": "Seattle" },
            "children": [
                { "firstName": "Henriette", "grade": 5, "pets": [{ "givenName": "Fluffy" }] }
            ],
            "creationDate": 1431620472,
            "isRegistered": true
        }),
        json!({
            "id": "WakefieldFamily",
            "address": { "state": "NY", "city": "New York" },
            "children": [
                {
                    "familyName": "Merriam",
                    "givenName": "Jesse",
                    "grade": 1,
                    "pets": [{ "givenName": "Goofy" }, { "givenName": "Shadow" }]
                },
                { "familyName": "Miller", "givenName": "Lisa", "grade": 8 }
            ],
            "creationDate": 1431620462,
            "isRegistered": false
        }),
    ]
}
