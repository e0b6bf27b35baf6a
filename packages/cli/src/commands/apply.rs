use crate::config;
use crate::script::{self, StepReport};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use richedit_editor::Editor;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Markup file to edit
    pub input: PathBuf,

    /// JSON array of editing steps
    #[arg(short, long)]
    pub script: PathBuf,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn apply(args: ApplyArgs, cwd: &str, config_path: Option<&Path>) -> Result<()> {
    let config = config::load(cwd, config_path)?;
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("Cannot read {}", args.input.display()))?;
    let steps = fs::read_to_string(&args.script)
        .with_context(|| format!("Cannot read {}", args.script.display()))?;
    let steps = script::parse(&steps).with_context(|| format!("Invalid script {}", args.script.display()))?;

    let mut editor = Editor::new(&source, config)
        .with_context(|| format!("Cannot load {}", args.input.display()))?;
    editor.on_change(|markup: &str| tracing::trace!("[Apply] changed: {}", markup));

    eprintln!("{}", format!("✏️  Replaying {} steps...", steps.len()).bright_blue().bold());

    let mut applied = 0;
    for (index, step) in steps.iter().enumerate() {
        let report = script::run_step(&mut editor, step).with_context(|| format!("Step {} ({})", index + 1, step))?;
        match report {
            StepReport::Applied => {
                applied += 1;
                eprintln!("  {} {}", "✓".green(), step);
            }
            StepReport::NoOp => eprintln!("  {} {}", "·".dimmed(), step.to_string().dimmed()),
            StepReport::Done => tracing::debug!("[Apply] {}", step),
        }
    }

    let result = editor.value();
    match &args.output {
        Some(path) => {
            fs::write(path, &result).with_context(|| format!("Cannot write {}", path.display()))?;
            eprintln!("  {} {}", "→".bright_blue(), path.display());
        }
        None => println!("{}", result),
    }

    eprintln!();
    eprintln!(
        "{} {} steps applied, {} change notifications",
        "✅".green(),
        applied,
        editor.notifications()
    );
    Ok(())
}
