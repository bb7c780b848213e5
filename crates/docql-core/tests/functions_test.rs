//! Function tables and query parameters through full queries

mod common;

use approx::assert_relative_eq;
use common::*;
use docql_core::runtime::{ClosureUdf, FunctionTable, UdfRegistry, UdfSignature};
use docql_core::{Engine, Error, Parameters, Result, Value};
use serde_json::json;
use std::sync::Arc;

fn prices() -> Vec<serde_json::Value> {
    vec![
        json!({ "name": "tea", "price": 2.5, "tags": ["hot", "leaf"] }),
        json!({ "name": "coffee", "price": 3.25, "tags": ["hot"] }),
        json!({ "name": "juice", "price": 4.0 }),
    ]
}

fn over_prices(select: serde_json::Value) -> Query {
    Query::select(select).from(from(source(collection_path("p"), None), vec![]))
}

#[test]
fn test_avg_over_fractional_prices() -> Result<()> {
    let rows = over_prices(select_value(call("AVG", vec![path("p.price")]))).run(&prices())?;
    assert_eq!(rows.len(), 1);
    let avg = rows[0].as_f64().expect("AVG should produce a number");
    assert_relative_eq!(avg, 3.25, epsilon = 1e-9);
    Ok(())
}

#[test]
fn test_avg_of_nothing_is_omitted() -> Result<()> {
    // the single aggregate row is undefined and dropped from the output
    let rows = over_prices(select_value(call("AVG", vec![path("p.price")]))).run(&[])?;
    assert!(rows.is_empty());
    Ok(())
}

#[test]
fn test_parameters_in_where_and_top() -> Result<()> {
    let params = Parameters::new().with("@min", 3i64).with("@n", 1i64);
    let query = over_prices(select_value(path("p.name")))
        .filter(binary(path("p.price"), ">=", param("@min")))
        .top(param("@n"));

    let rows = query.run_with(&Engine::new(), &prices(), &params)?;
    assert_eq!(rows, vec![json!("coffee")]);
    Ok(())
}

#[test]
fn test_parameters_from_json() -> Result<()> {
    let params = Parameters::from_json(&json!({ "@tag": "hot" }))?;
    let contains = call("ARRAY_CONTAINS", vec![path("p.tags"), param("@tag")]);
    let rows = over_prices(select_value(path("p.name")))
        .filter(contains)
        .run_with(&Engine::new(), &prices(), &params)?;
    assert_eq!(rows, vec![json!("tea"), json!("coffee")]);

    assert!(Parameters::from_json(&json!(["not", "an", "object"])).is_err());
    Ok(())
}

#[test]
fn test_missing_parameter_is_undefined() -> Result<()> {
    let rows = over_prices(select_list(vec![
        (path("p.name"), None),
        (param("@missing"), Some("extra")),
    ]))
    .run(&prices()[..1])?;
    assert_eq!(rows, vec![json!({ "name": "tea" })]);
    Ok(())
}

#[test]
fn test_udf_call() -> Result<()> {
    let udfs = UdfRegistry::new();
    udfs.register_fn("withTax", |args| {
        let price = args.first().and_then(Value::as_f64).unwrap_or(0.0);
        Ok(Value::from(price * 2.0))
    })?;
    let engine = Engine::with_udfs(udfs);

    let rows = over_prices(select_value(udf_call("withTax", vec![path("p.price")])))
        .run_with(&engine, &prices(), &Parameters::new())?;
    assert_eq!(rows, vec![json!(5), json!(6.5), json!(8)]);
    Ok(())
}

#[test]
fn test_udf_registry_is_shared_with_engine() -> Result<()> {
    let udfs = UdfRegistry::new();
    let engine = Engine::with_udfs(udfs.clone());

    // registered after the engine was built
    udfs.register(Arc::new(ClosureUdf::new(
        UdfSignature::new("label").with_arity(1),
        |args| {
            let name = args[0].as_str().unwrap_or_default();
            Ok(Value::from(format!("#{name}")))
        },
    )))?;
    assert!(engine.udfs().contains("LABEL"));

    let rows = over_prices(select_value(udf_call("label", vec![path("p.name")])))
        .top(num(1.0))
        .run_with(&engine, &prices(), &Parameters::new())?;
    assert_eq!(rows, vec![json!("#tea")]);

    let wrong_arity = over_prices(select_value(udf_call("label", vec![])))
        .run_with(&engine, &prices(), &Parameters::new())
        .unwrap_err();
    assert!(matches!(wrong_arity, Error::Udf(_)));
    Ok(())
}

#[test]
fn test_unknown_udf_is_an_error() {
    let err = over_prices(select_value(udf_call("nope", vec![])))
        .run(&prices())
        .unwrap_err();
    assert!(matches!(err, Error::UnknownFunction { ref name, .. } if name == "nope"));
}

#[test]
fn test_udf_does_not_shadow_builtin() -> Result<()> {
    let udfs = UdfRegistry::new();
    udfs.register_fn("UPPER", |_| Ok(Value::from("shadowed")))?;
    let engine = Engine::with_udfs(udfs);
    let params = Parameters::new();

    let builtin = over_prices(select_value(call("UPPER", vec![path("p.name")])))
        .top(num(1.0))
        .run_with(&engine, &prices(), &params)?;
    assert_eq!(builtin, vec![json!("TEA")]);

    let udf = over_prices(select_value(udf_call("UPPER", vec![path("p.name")])))
        .top(num(1.0))
        .run_with(&engine, &prices(), &params)?;
    assert_eq!(udf, vec![json!("shadowed")]);
    Ok(())
}

#[test]
fn test_builtin_library_through_queries() -> Result<()> {
    let rows = Query::select(select_list(vec![
        (call("ABS", vec![num(-4.0)]), Some("abs")),
        (call("CONCAT", vec![string("a"), string("b"), string("c")]), Some("concat")),
        (call("IS_NUMBER", vec![num(1.0)]), Some("isNumber")),
        (call("ARRAY_LENGTH", vec![path("p.tags")]), Some("tags")),
    ]))
    .from(from(source(collection_path("p"), None), vec![]))
    .top(num(1.0))
    .run(&prices())?;
    assert_eq!(
        rows,
        vec![json!({ "abs": 4, "concat": "abc", "isNumber": true, "tags": 2 })]
    );
    Ok(())
}
