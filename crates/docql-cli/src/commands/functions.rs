use anyhow::Result;
use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};
use docql_core::Engine;
use docql_core::error::FunctionKind;
use serde_json::json;

use super::OutputContext;

#[derive(Args, Debug)]
pub struct FunctionsArgs {
    /// Only list names starting with this prefix (case-insensitive)
    pub prefix: Option<String>,

    /// Print as a JSON object keyed by function kind
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: FunctionsArgs, output: &OutputContext) -> Result<()> {
    let listing = list(&Engine::new(), args.prefix.as_deref());

    if args.json {
        let object: serde_json::Map<String, serde_json::Value> = listing
            .iter()
            .map(|(kind, names)| (kind.to_string(), json!(names)))
            .collect();
        return output.print_json(&object);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Kind", "Name"]);
    for (kind, names) in &listing {
        for name in names {
            table.add_row(vec![kind.to_string(), name.clone()]);
        }
    }
    println!("{table}");
    Ok(())
}

/// Aggregate and built-in function names, filtered by `prefix`
pub fn list(engine: &Engine, prefix: Option<&str>) -> Vec<(FunctionKind, Vec<String>)> {
    let prefix = prefix.map(str::to_ascii_uppercase);
    [FunctionKind::Aggregate, FunctionKind::Builtin]
        .into_iter()
        .map(|kind| {
            let names = engine
                .function_names(kind)
                .into_iter()
                .filter(|name| match &prefix {
                    Some(prefix) => name.to_ascii_uppercase().starts_with(prefix.as_str()),
                    None => true,
                })
                .collect();
            (kind, names)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filters_by_prefix() {
        let listing = list(&Engine::new(), Some("array_"));
        let builtins = &listing[1].1;
        assert!(!builtins.is_empty());
        assert!(builtins.iter().all(|name| name.starts_with("ARRAY_")));
        assert!(listing[0].1.is_empty());
    }

    #[test]
    fn test_list_everything() {
        let listing = list(&Engine::new(), None);
        assert_eq!(listing[0].1, vec!["AVG", "COUNT", "MAX", "MIN", "SUM"]);
        assert!(listing[1].1.contains(&"UPPER".to_string()));
    }
}
