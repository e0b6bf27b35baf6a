mod commands;
mod config;
mod script;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{apply, format, ApplyArgs, FormatArgs};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Richedit CLI - replay formatting sessions against markup files
#[derive(Parser, Debug)]
#[command(name = "richedit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to richedit.config.json in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log editor internals to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a script of editing steps against a markup file
    Apply(ApplyArgs),

    /// Load and re-serialize a markup file
    Format(FormatArgs),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| {
            let cwd = cwd.display().to_string();
            let config = cli.config.as_deref();
            match cli.command {
                Command::Apply(args) => apply(args, &cwd, config),
                Command::Format(args) => format(args, &cwd, config),
            }
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
