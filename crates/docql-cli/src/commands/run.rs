use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use docql_core::{Engine, Node, Parameters};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{OutputContext, read_json};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Grammar tree of the query (JSON)
    #[arg(long)]
    pub ast: PathBuf,

    /// Document collection (JSON array); defaults to the configured file
    #[arg(long)]
    pub docs: Option<PathBuf>,

    /// Query parameter as `name=<json>`, repeatable
    #[arg(short, long, value_name = "NAME=JSON")]
    pub param: Vec<String>,

    /// All parameters as one JSON object
    #[arg(long, value_name = "JSON")]
    pub params: Option<String>,
}

pub fn execute(args: RunArgs, cfg: &Config, output: &OutputContext) -> Result<()> {
    let rows = run_query(&args, cfg)?;
    if output.verbose {
        info!(rows = rows.len(), "query finished");
    }
    output.print_rows(&rows)
}

/// Compile and execute the query described by `args`
pub fn run_query(args: &RunArgs, cfg: &Config) -> Result<Vec<Value>> {
    let node = load_ast(&args.ast)?;
    let documents = match args.docs.as_deref().or(cfg.documents.as_deref()) {
        Some(path) => load_documents(path)?,
        None => Vec::new(),
    };
    let parameters = parse_parameters(args.params.as_deref(), &args.param)?;
    debug!(
        documents = documents.len(),
        parameters = parameters.len(),
        "executing query"
    );

    Engine::new()
        .query(&node, &documents, &parameters)
        .context("query failed")
}

pub fn load_ast(path: &Path) -> Result<Node> {
    let json = read_json(path)?;
    Node::from_json(json).with_context(|| format!("decoding grammar tree {}", path.display()))
}

/// A JSON array of documents; a single object is a one-document collection
pub fn load_documents(path: &Path) -> Result<Vec<Value>> {
    match read_json(path)? {
        Value::Array(items) => Ok(items),
        object @ Value::Object(_) => Ok(vec![object]),
        other => bail!(
            "{} must hold a JSON array of documents, found {}",
            path.display(),
            kind_of(&other)
        ),
    }
}

/// Merge `--params` and `--param name=json` flags; individual flags win
pub fn parse_parameters(json: Option<&str>, pairs: &[String]) -> Result<Parameters> {
    let mut parameters = match json {
        Some(text) => {
            let value: Value = serde_json::from_str(text).context("parsing --params")?;
            Parameters::from_json(&value)?
        }
        None => Parameters::new(),
    };

    for pair in pairs {
        let (name, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("parameter '{pair}' is not NAME=JSON"))?;
        // bare words are taken as strings
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
        parameters.insert(name.trim(), value);
    }
    Ok(parameters)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
