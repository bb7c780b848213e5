//! docql CLI - compile and run document queries from the command line

pub mod commands;
pub mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use commands::{OutputContext, config as config_cmd, explain, functions, run};
use config::Config;

/// Command-line interface for the docql query compiler
#[derive(Parser, Debug)]
#[command(name = "docql")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, env = "DOCQL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Debug output
    #[arg(long)]
    pub debug: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Print result rows as a table
    #[arg(long, conflicts_with = "csv")]
    pub table: bool,

    /// Print result rows as CSV
    #[arg(long)]
    pub csv: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile and execute a query against a document collection
    Run(run::RunArgs),
    /// Print the compiled plan of a query
    Explain(explain::ExplainArgs),
    /// List aggregate and built-in functions
    Functions(functions::FunctionsArgs),
    /// Configuration management
    Config(config_cmd::ConfigArgs),
}

impl Cli {
    /// Output settings, with command-line flags over file values
    pub fn output(&self, cfg: &Config) -> OutputContext {
        OutputContext {
            table: self.table,
            csv: self.csv,
            pretty: self.pretty || cfg.pretty,
            verbose: self.verbose || self.debug,
        }
    }

    /// Default tracing filter when `RUST_LOG` is not set
    pub fn log_filter(&self, cfg: &Config) -> String {
        if self.debug {
            "docql=debug,docql_core=debug,docql_cli=debug".to_string()
        } else if self.verbose {
            "docql_core=info,docql_cli=info".to_string()
        } else {
            cfg.log_level.clone().unwrap_or_else(|| "warn".to_string())
        }
    }
}

/// Install the stderr subscriber
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Run a parsed command line
pub fn dispatch(cli: Cli) -> Result<()> {
    let cfg = Config::load(cli.config.as_deref())?;
    init_tracing(&cli.log_filter(&cfg));
    let output = cli.output(&cfg);

    match cli.command {
        Commands::Run(args) => run::execute(args, &cfg, &output),
        Commands::Explain(args) => explain::execute(args, &output),
        Commands::Functions(args) => functions::execute(args, &output),
        Commands::Config(args) => config_cmd::execute(args, &cfg, cli.config.as_deref(), &output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from(["docql", "--debug", "functions"]).unwrap();
        let cfg = Config {
            log_level: Some("error".to_string()),
            pretty: true,
            ..Config::default()
        };

        assert!(cli.log_filter(&cfg).contains("docql_core=debug"));
        let output = cli.output(&cfg);
        assert!(output.pretty);
        assert!(output.verbose);
    }

    #[test]
    fn test_config_log_level_used_by_default() {
        let cli = Cli::try_parse_from(["docql", "functions"]).unwrap();
        let cfg = Config {
            log_level: Some("error".to_string()),
            ..Config::default()
        };
        assert_eq!(cli.log_filter(&cfg), "error");
        assert_eq!(cli.log_filter(&Config::default()), "warn");
    }

    #[test]
    fn test_table_conflicts_with_csv() {
        assert!(Cli::try_parse_from(["docql", "--table", "--csv", "functions"]).is_err());
    }
}
