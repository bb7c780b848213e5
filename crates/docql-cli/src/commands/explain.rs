use anyhow::{Context, Result};
use clap::Args;
use docql_core::compile_query;
use std::path::PathBuf;

use super::OutputContext;
use super::run::load_ast;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Grammar tree of the query (JSON)
    #[arg(long)]
    pub ast: PathBuf,
}

pub fn execute(args: ExplainArgs, output: &OutputContext) -> Result<()> {
    let plan = explain(&args)?;
    if output.verbose {
        output.print_info(&format!("plan for {}", args.ast.display()));
    }
    println!("{plan}");
    Ok(())
}

/// Rendered plan of the query in `args.ast`
pub fn explain(args: &ExplainArgs) -> Result<String> {
    let node = load_ast(&args.ast)?;
    let query = compile_query(&node).context("compilation failed")?;
    Ok(query.to_string())
}
