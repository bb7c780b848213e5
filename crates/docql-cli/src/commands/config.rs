use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use super::OutputContext;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
    /// Show configuration file path
    Path,
}

/// `path` is the `--config` override, if any
pub fn execute(
    args: ConfigArgs,
    cfg: &Config,
    path: Option<&Path>,
    output: &OutputContext,
) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path);

    match args.command {
        ConfigCommands::Show => show_config(cfg, output),
        ConfigCommands::Init { force } => init_config(&path, force, output).map(|_| ()),
        ConfigCommands::Path => show_path(&path, output),
    }
}

fn show_config(cfg: &Config, output: &OutputContext) -> Result<()> {
    if output.pretty {
        return output.print_json(cfg);
    }

    println!("Current Configuration");
    println!("=====================");
    println!(
        "Documents: {}",
        cfg.documents
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!("Pretty:    {}", cfg.pretty);
    println!(
        "Log level: {}",
        cfg.log_level.as_deref().unwrap_or("(not set)")
    );
    Ok(())
}

/// Write a starter file; returns false when one exists and `force` is unset
pub fn init_config(path: &Path, force: bool, output: &OutputContext) -> Result<bool> {
    if path.exists() && !force {
        output.print_error(&format!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            path.display()
        ));
        return Ok(false);
    }

    let starter = Config {
        documents: Some(PathBuf::from("documents.json")),
        pretty: true,
        log_level: Some("warn".to_string()),
    };
    starter.save(Some(path))?;
    output.print_success(&format!("Configuration file created at {}", path.display()));
    Ok(true)
}

fn show_path(path: &Path, output: &OutputContext) -> Result<()> {
    println!("{}", path.display());
    if path.exists() {
        output.print_info("File exists");
    } else {
        output.print_info("File does not exist");
    }
    Ok(())
}
