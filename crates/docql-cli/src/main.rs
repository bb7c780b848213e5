use clap::Parser;
use colored::Colorize;
use docql_cli::{Cli, dispatch};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "✗".red(), err);
            ExitCode::FAILURE
        }
    }
}
