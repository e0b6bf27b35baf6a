use anyhow::Context;
use richedit_editor::EditorConfig;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "richedit.config.json";

/// Load editor settings.
///
/// An explicit path must exist. Otherwise `richedit.config.json` in `cwd`
/// is used when present, and defaults when not.
pub fn load(cwd: &str, explicit: Option<&Path>) -> anyhow::Result<EditorConfig> {
    let config_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);
            if !path.exists() {
                return Ok(EditorConfig::default());
            }
            path
        }
    };

    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Cannot read config {}", config_path.display()))?;
    let config = parse(&content).with_context(|| format!("Invalid config {}", config_path.display()))?;
    Ok(config)
}

fn parse(content: &str) -> anyhow::Result<EditorConfig> {
    let config: EditorConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}
