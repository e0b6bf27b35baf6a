use crate::config;
use anyhow::{Context, Result};
use clap::Args;
use richedit_editor::Editor;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct FormatArgs {
    /// Markup file to normalize
    pub input: PathBuf,

    /// Rewrite the file instead of printing to stdout
    #[arg(short, long)]
    pub write: bool,
}

pub fn format(args: FormatArgs, cwd: &str, config_path: Option<&Path>) -> Result<()> {
    let config = config::load(cwd, config_path)?;
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("Cannot read {}", args.input.display()))?;

    let editor = Editor::new(&source, config)
        .with_context(|| format!("Cannot load {}", args.input.display()))?;
    let normalized = editor.value();

    if args.write {
        fs::write(&args.input, &normalized)?;
        tracing::debug!("[Format] rewrote {}", args.input.display());
    } else {
        println!("{}", normalized);
    }
    Ok(())
}
