//! CLI integration tests against the built `docql` binary

use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn docql(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_docql"))
        .arg("--config")
        .arg(dir.join("config.toml"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute docql")
}

/// `SELECT f.id FROM Families f WHERE f.isRegistered = @registered`
fn write_fixture(dir: &Path) {
    let ast = json!({
        "type": "select_query",
        "select": {
            "type": "select_specification",
            "properties": {
                "type": "object_property_list",
                "properties": [{
                    "property": {
                        "type": "scalar_member_expression",
                        "object": { "type": "identifier", "name": "f" },
                        "property": { "type": "identifier", "name": "id" },
                        "computed": false
                    }
                }]
            }
        },
        "from": {
            "type": "from_specification",
            "source": {
                "type": "from_source",
                "expression": {
                    "type": "collection_expression",
                    "expression": { "type": "identifier", "name": "Families" }
                },
                "alias": { "type": "identifier", "name": "f" }
            }
        },
        "where": {
            "type": "filter_condition",
            "condition": {
                "type": "scalar_binary_expression",
                "operator": "=",
                "left": {
                    "type": "scalar_member_expression",
                    "object": { "type": "identifier", "name": "f" },
                    "property": { "type": "identifier", "name": "isRegistered" },
                    "computed": false
                },
                "right": { "type": "parameter_name", "name": "@registered" }
            }
        }
    });
    let docs = json!([
        { "id": "AndersenFamily", "isRegistered": true },
        { "id": "WakefieldFamily", "isRegistered": false }
    ]);
    fs::write(dir.join("query.json"), ast.to_string()).unwrap();
    fs::write(dir.join("docs.json"), docs.to_string()).unwrap();
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "docql failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    let output = docql(dir.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("docql"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("explain"));
}

#[test]
fn test_run_with_parameter() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path());
    let query = dir.path().join("query.json");
    let docs = dir.path().join("docs.json");

    let output = docql(
        dir.path(),
        &[
            "run",
            "--ast",
            query.to_str().unwrap(),
            "--docs",
            docs.to_str().unwrap(),
            "--param",
            "registered=false",
        ],
    );
    assert_eq!(stdout_json(&output), json!([{ "id": "WakefieldFamily" }]));
}

#[test]
fn test_run_uses_configured_documents() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path());
    let docs = dir.path().join("docs.json");
    fs::write(
        dir.path().join("config.toml"),
        format!("documents = {:?}\n", docs.to_str().unwrap()),
    )
    .unwrap();

    let query = dir.path().join("query.json");
    let output = docql(
        dir.path(),
        &[
            "run",
            "--ast",
            query.to_str().unwrap(),
            "--params",
            r#"{"@registered": true}"#,
        ],
    );
    assert_eq!(stdout_json(&output), json!([{ "id": "AndersenFamily" }]));
}

#[test]
fn test_run_reports_unsupported_nodes() {
    let dir = TempDir::new().unwrap();
    let query = dir.path().join("query.json");
    fs::write(
        &query,
        json!({
            "type": "select_query",
            "select": {
                "type": "select_specification",
                "value": { "type": "scalar_subquery_expression" }
            }
        })
        .to_string(),
    )
    .unwrap();

    let output = docql(dir.path(), &["run", "--ast", query.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("scalar_subquery_expression"));
}

#[test]
fn test_explain_prints_plan() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path());
    let query = dir.path().join("query.json");

    let output = docql(dir.path(), &["explain", "--ast", query.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("$collection"));
    assert!(stdout.contains(".filter("));
}

#[test]
fn test_functions_json_listing() {
    let dir = TempDir::new().unwrap();
    let output = docql(dir.path(), &["functions", "--json"]);
    let listing = stdout_json(&output);
    assert_eq!(listing["aggregate"], json!(["AVG", "COUNT", "MAX", "MIN", "SUM"]));
    assert!(listing["built-in"].as_array().is_some_and(|names| !names.is_empty()));
}

#[test]
fn test_config_init_and_path() {
    let dir = TempDir::new().unwrap();

    let output = docql(dir.path(), &["config", "init"]);
    assert!(output.status.success());
    assert!(dir.path().join("config.toml").exists());

    let output = docql(dir.path(), &["config", "path"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("config.toml"));
    assert!(stdout.contains("File exists"));
}
