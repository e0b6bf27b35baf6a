//! Scripted editing sessions.
//!
//! A script is a JSON array of steps replayed against one [`Editor`], the
//! way a user would drive the toolbar:
//!
//! ```json
//! [
//!   { "op": "focus" },
//!   { "op": "select", "start": 6, "end": 11 },
//!   { "op": "tick" },
//!   { "op": "blur" },
//!   { "op": "run", "command": { "type": "fontSize", "value": 24 } }
//! ]
//! ```

use anyhow::{anyhow, Result};
use richedit_editor::{Command, CommandOutcome, Editor};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    /// Select plain-text offsets `[start, end)`
    Select { start: usize, end: usize },
    Caret { at: usize },
    Focus,
    Blur,
    /// Let deferred work run
    Tick,
    Run { command: Command },
    Type { text: String },
    Paste { content: String },
    FontSizeInput { value: String },
    CommitFontSize,
    /// `null` cancels the dialog
    Link { url: Option<String> },
    SetValue { markup: String },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Select { start, end } => write!(f, "select {}..{}", start, end),
            Step::Caret { at } => write!(f, "caret {}", at),
            Step::Focus => f.write_str("focus"),
            Step::Blur => f.write_str("blur"),
            Step::Tick => f.write_str("tick"),
            Step::Run { command } => write!(f, "run {}", command),
            Step::Type { text } => write!(f, "type {:?}", text),
            Step::Paste { .. } => f.write_str("paste"),
            Step::FontSizeInput { value } => write!(f, "font size input {:?}", value),
            Step::CommitFontSize => f.write_str("commit font size"),
            Step::Link { url: Some(url) } => write!(f, "link {}", url),
            Step::Link { url: None } => f.write_str("link (cancelled)"),
            Step::SetValue { .. } => f.write_str("set value"),
        }
    }
}

/// What one step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepReport {
    Applied,
    NoOp,
    /// Selection and focus steps
    Done,
}

impl From<CommandOutcome> for StepReport {
    fn from(outcome: CommandOutcome) -> Self {
        match outcome {
            CommandOutcome::Applied => StepReport::Applied,
            CommandOutcome::NoOp => StepReport::NoOp,
        }
    }
}

pub fn parse(source: &str) -> Result<Vec<Step>> {
    let steps: Vec<Step> = serde_json::from_str(source)?;
    Ok(steps)
}

/// Replay one step.
///
/// Offsets that fall outside the document and markup that fails to parse
/// are script errors; command outcomes are not.
pub fn run_step(editor: &mut Editor, step: &Step) -> Result<StepReport> {
    let report = match step {
        Step::Select { start, end } => {
            if !editor.select_text(*start, *end) {
                return Err(anyhow!("selection {}..{} is outside the document", start, end));
            }
            StepReport::Done
        }
        Step::Caret { at } => {
            if !editor.place_caret(*at) {
                return Err(anyhow!("caret {} is outside the document", at));
            }
            StepReport::Done
        }
        Step::Focus => {
            editor.focus();
            StepReport::Done
        }
        Step::Blur => {
            editor.blur();
            StepReport::Done
        }
        Step::Tick => {
            editor.run_pending_tasks();
            StepReport::Done
        }
        Step::Run { command } => editor.execute(command.clone()).into(),
        Step::Type { text } => editor.insert_text(text).into(),
        Step::Paste { content } => editor.paste(content).into(),
        Step::FontSizeInput { value } => {
            editor.font_size_input(value);
            StepReport::Done
        }
        Step::CommitFontSize => editor.commit_font_size().into(),
        Step::Link { url } => editor.submit_link_dialog(url.as_deref()).into(),
        Step::SetValue { markup } => {
            if editor.set_value(markup)? {
                StepReport::Applied
            } else {
                StepReport::NoOp
            }
        }
    };
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use richedit_editor::EditorConfig;

    fn replay(markup: &str, script: &str) -> Editor {
        let mut editor = Editor::new(markup, EditorConfig::default()).unwrap();
        for step in parse(script).unwrap() {
            run_step(&mut editor, &step).unwrap();
        }
        editor
    }

    #[test]
    fn test_parse_steps() {
        let steps = parse(
            r#"[
                { "op": "select", "start": 1, "end": 4 },
                { "op": "run", "command": { "type": "bold" } },
                { "op": "run", "command": { "type": "list", "value": ["ordered", "upper-roman"] } },
                { "op": "fontSizeInput", "value": "18" },
                { "op": "commitFontSize" },
                { "op": "link", "url": null }
            ]"#,
        )
        .unwrap();

        assert_eq!(steps[0], Step::Select { start: 1, end: 4 });
        assert_eq!(steps[1], Step::Run { command: Command::Bold });
        assert_eq!(
            steps[2],
            Step::Run {
                command: Command::List(
                    richedit_editor::ListKind::Ordered,
                    richedit_editor::BulletStyle::UpperRoman
                )
            }
        );
        assert_eq!(steps[3], Step::FontSizeInput { value: "18".into() });
        assert_eq!(steps[4], Step::CommitFontSize);
        assert_eq!(steps[5], Step::Link { url: None });
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        assert!(parse(r#"[{ "op": "explode" }]"#).is_err());
    }

    #[test]
    fn test_replay_font_size() {
        let editor = replay(
            "<p>Hello world</p>",
            r#"[
                { "op": "focus" },
                { "op": "select", "start": 6, "end": 11 },
                { "op": "tick" },
                { "op": "blur" },
                { "op": "run", "command": { "type": "fontSize", "value": 24 } }
            ]"#,
        );
        assert_eq!(
            editor.value(),
            r#"<p>Hello <span style="font-size:24px">world</span></p>"#
        );
        assert_eq!(editor.notifications(), 1);
    }

    #[test]
    fn test_replay_font_size_box() {
        let editor = replay(
            "<p>Hello world</p>",
            r#"[
                { "op": "focus" },
                { "op": "select", "start": 0, "end": 5 },
                { "op": "tick" },
                { "op": "blur" },
                { "op": "fontSizeInput", "value": "abc" },
                { "op": "commitFontSize" },
                { "op": "fontSizeInput", "value": "30" },
                { "op": "commitFontSize" }
            ]"#,
        );
        assert_eq!(
            editor.value(),
            r#"<p><span style="font-size:30px">Hello</span> world</p>"#
        );
        assert_eq!(editor.committed_font_size(), 30);
    }

    #[test]
    fn test_out_of_range_selection_is_an_error() {
        let mut editor = Editor::new("<p>Hi</p>", EditorConfig::default()).unwrap();
        assert!(run_step(&mut editor, &Step::Select { start: 0, end: 10 }).is_err());
        assert!(run_step(&mut editor, &Step::Caret { at: 3 }).is_err());
    }

    #[test]
    fn test_step_reports() {
        let mut editor = Editor::new("<p>Hi</p>", EditorConfig::default()).unwrap();
        assert_eq!(run_step(&mut editor, &Step::Focus).unwrap(), StepReport::Done);
        assert_eq!(
            run_step(&mut editor, &Step::Run { command: Command::Bold }).unwrap(),
            StepReport::NoOp
        );
        assert_eq!(
            run_step(&mut editor, &Step::SetValue { markup: "<p>Hi</p>".into() }).unwrap(),
            StepReport::NoOp
        );
        assert_eq!(
            run_step(&mut editor, &Step::SetValue { markup: "<p>Bye</p>".into() }).unwrap(),
            StepReport::Applied
        );
    }
}
