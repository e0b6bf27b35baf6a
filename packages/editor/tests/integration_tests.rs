//! Integration tests for the editor facade
//!
//! Each test drives the editor the way a host would: report a selection,
//! let the deferred capture run, move focus to the toolbar, then issue a
//! command.

use richedit_editor::markup::{self, Node};
use richedit_editor::{
    Alignment, BulletStyle, Command, CommandOutcome, DocumentTree, Editor, EditorConfig, ListKind,
};
use std::cell::RefCell;
use std::rc::Rc;

fn editor(markup: &str) -> Editor {
    Editor::new(markup, EditorConfig::default()).unwrap()
}

/// Select plain-text offsets, let the capture run, then click away
fn select_then_blur(editor: &mut Editor, start: usize, end: usize) {
    editor.focus();
    assert!(editor.select_text(start, end));
    editor.run_pending_tasks();
    editor.blur();
}

/// The document reloads to the same bytes and its lists hold only items
fn assert_stable(editor: &Editor) {
    let value = editor.value();
    let reloaded = DocumentTree::parse(&value).unwrap().serialize();
    assert_eq!(reloaded, value, "document changed on reload");

    let tree = editor.tree();
    for id in tree.descendants(tree.root()) {
        if tree.element(id).is_some_and(|e| e.is_tag(&["ul", "ol"])) {
            for &child in tree.children(id) {
                assert_eq!(tree.tag(child), Some("li"), "non-item child of a list in {}", value);
            }
        }
    }
}

fn record_changes(editor: &mut Editor) -> Rc<RefCell<Vec<String>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    editor.on_change(move |markup: &str| sink.borrow_mut().push(markup.to_string()));
    seen
}

#[test]
fn test_font_size_on_saved_selection() {
    let mut editor = editor("<p>Hello world</p>");
    let changes = record_changes(&mut editor);
    select_then_blur(&mut editor, 6, 11);

    assert_eq!(editor.execute(Command::FontSize(24)), CommandOutcome::Applied);
    assert_eq!(
        editor.value(),
        r#"<p>Hello <span style="font-size:24px">world</span></p>"#
    );
    assert_eq!(editor.saved_selection(), None);
    assert!(editor.is_focused());
    assert_eq!(*changes.borrow(), vec![editor.value()]);
    assert_stable(&editor);
}

#[test]
fn test_font_size_splits_into_at_most_three_fragments() {
    let original = "abcdefgh";
    for (start, end) in [(0, 3), (2, 5), (5, 8), (0, 8), (3, 4)] {
        let mut editor = editor(&format!("<p>{}</p>", original));
        select_then_blur(&mut editor, start, end);
        assert!(editor.execute(Command::FontSize(12)).is_applied());

        let nodes = markup::parse(&editor.value()).unwrap();
        let Node::Element(p) = &nodes[0] else {
            panic!("expected a paragraph, got {:?}", nodes[0]);
        };
        assert!(p.children.len() <= 3, "{} fragments for {:?}", p.children.len(), (start, end));

        let joined: String = p.children.iter().map(Node::to_plain_text).collect();
        assert_eq!(joined, original);

        let wrapped: Vec<_> = p
            .children
            .iter()
            .filter_map(|child| match child {
                Node::Element(span) if span.style.get("font-size") == Some("12px") => Some(span),
                _ => None,
            })
            .collect();
        assert_eq!(wrapped.len(), 1);
        assert_eq!(
            wrapped[0].children,
            vec![Node::text(&original[start..end])],
            "wrong middle fragment for {:?}",
            (start, end)
        );
    }
}

#[test]
fn test_font_size_across_paragraphs_keeps_text() {
    let mut editor = editor("<p>abc</p><p>def</p>");
    select_then_blur(&mut editor, 1, 5);

    assert!(editor.execute(Command::FontSize(20)).is_applied());
    assert_eq!(editor.tree().plain_text(), "abcdef");
    assert_eq!(
        editor.value(),
        r#"<p>a</p><span style="font-size:20px"><p>bc</p><p>de</p></span><p>f</p>"#
    );
    assert_stable(&editor);
}

#[test]
fn test_round_trip_is_stable() {
    let documents = [
        "<p>Hello world</p>",
        r#"<p>Hello <span style="font-size:24px">world</span></p>"#,
        r#"<ol type="1" style="list-style-type:decimal"><li>a</li><li><b>b</b></li></ol>"#,
        "<div><p>nested <i>markup</i> &amp; entities&nbsp;here</p></div><br>tail",
        "<ul>\n  <li>spaced</li>\n</ul>",
        r#"<p><a href="https://example.com?a=1&amp;b=2">link</a></p>"#,
    ];
    for source in documents {
        let once = DocumentTree::parse(source).unwrap().serialize();
        let twice = DocumentTree::parse(&once).unwrap().serialize();
        assert_eq!(once, twice, "unstable round trip for {}", source);
    }
}

#[test]
fn test_unordered_list_converts_to_ordered() {
    let mut editor = editor(r#"<ul type="disc" style="list-style-type:disc"><li>a</li><li>b</li><li>c</li></ul>"#);
    editor.focus();
    editor.place_caret(1);

    let outcome = editor.execute(Command::List(ListKind::Ordered, BulletStyle::Decimal));
    assert_eq!(outcome, CommandOutcome::Applied);
    assert_eq!(
        editor.value(),
        r#"<ol type="1" style="list-style-type:decimal"><li>a</li><li>b</li><li>c</li></ol>"#
    );
    assert_stable(&editor);
}

#[test]
fn test_bullet_style_change_keeps_items() {
    let source = r#"<ol><li>one <b>1</b></li><li>two</li></ol>"#;
    let mut editor = editor(source);
    editor.focus();
    editor.place_caret(2);

    assert!(editor.execute(Command::List(ListKind::Ordered, BulletStyle::UpperRoman)).is_applied());
    assert_eq!(
        editor.value(),
        r#"<ol type="I" style="list-style-type:upper-roman"><li>one <b>1</b></li><li>two</li></ol>"#
    );
}

#[test]
fn test_rejected_font_sizes_never_mutate() {
    let mut editor = editor("<p>Hello world</p>");
    let changes = record_changes(&mut editor);
    select_then_blur(&mut editor, 0, 5);
    let before = editor.value();

    for input in ["", "abc", "0", "500"] {
        editor.font_size_input(input);
        assert_eq!(editor.commit_font_size(), CommandOutcome::NoOp, "input {:?}", input);
        assert_eq!(editor.value(), before);
        assert_eq!(editor.displayed_font_size(), "16");
    }
    assert_eq!(editor.execute(Command::FontSize(0)), CommandOutcome::NoOp);
    assert_eq!(editor.displayed_font_size(), "16");
    assert!(changes.borrow().is_empty());

    // The selection survives the rejected attempts
    assert!(editor.saved_selection().is_some());
}

#[test]
fn test_committed_font_size_applies_to_saved_selection() {
    let mut editor = editor("<p>Hello world</p>");
    select_then_blur(&mut editor, 0, 5);

    editor.font_size_input("18");
    assert_eq!(editor.commit_font_size(), CommandOutcome::Applied);
    assert_eq!(editor.committed_font_size(), 18);
    assert_eq!(
        editor.value(),
        r#"<p><span style="font-size:18px">Hello</span> world</p>"#
    );
}

#[test]
fn test_committed_font_size_without_selection_only_updates_default() {
    let mut editor = editor("<p>Hello world</p>");
    editor.font_size_input(" 32 ");
    assert_eq!(editor.commit_font_size(), CommandOutcome::NoOp);
    assert_eq!(editor.displayed_font_size(), "32");
    assert_eq!(editor.committed_font_size(), 32);
    assert_eq!(editor.value(), "<p>Hello world</p>");

    editor.font_size_input("999");
    editor.commit_font_size();
    assert_eq!(editor.displayed_font_size(), "32");
}

#[test]
fn test_collapsed_link_inserts_url_anchor() {
    let mut editor = editor("<p>Visit </p>");
    editor.focus();
    editor.place_caret(6);

    assert!(editor.submit_link_dialog(Some("example.com")).is_applied());
    let value = editor.value();
    assert_eq!(value.matches("<a ").count(), 1);
    assert_eq!(
        value,
        r#"<p>Visit <a href="https://example.com">https://example.com</a></p>"#
    );

    // The caret sits after the anchor
    assert!(editor.insert_text("!").is_applied());
    assert_eq!(
        editor.value(),
        r#"<p>Visit <a href="https://example.com">https://example.com</a>!</p>"#
    );
    assert_stable(&editor);
}

#[test]
fn test_link_at_caret_inside_word_links_the_word() {
    let mut editor = editor("<p>Hello world</p>");
    editor.focus();
    editor.place_caret(2);

    assert!(editor.submit_link_dialog(Some("example.com")).is_applied());
    assert_eq!(
        editor.value(),
        r#"<p><a href="https://example.com">Hello</a> world</p>"#
    );
    assert_eq!(editor.selected_text().as_deref(), Some("Hello"));
    assert_stable(&editor);
}

#[test]
fn test_cancelled_link_dialog_leaves_document() {
    let mut editor = editor("<p>Visit</p>");
    select_then_blur(&mut editor, 0, 5);
    assert_eq!(editor.submit_link_dialog(None), CommandOutcome::NoOp);
    assert_eq!(editor.value(), "<p>Visit</p>");
    assert!(editor.is_focused());
}

#[test]
fn test_font_family_expands_caret_to_word() {
    let mut editor = editor("Hello world");
    editor.focus();
    editor.place_caret(2);

    assert!(editor.execute(Command::FontFamily("Georgia".into())).is_applied());
    assert_eq!(
        editor.value(),
        r#"<span style="font-family:Georgia">Hello</span> world"#
    );
    assert_eq!(editor.selected_text().as_deref(), Some("Hello"));
}

#[test]
fn test_saved_range_rejected_after_set_value() {
    let mut editor = editor("<p>Hello world</p>");
    let changes = record_changes(&mut editor);
    select_then_blur(&mut editor, 0, 5);
    assert!(editor.saved_selection().is_some());

    assert!(editor.set_value("<p>Hello world!</p>").unwrap());
    assert_eq!(editor.saved_selection(), None);
    assert_eq!(editor.execute(Command::Bold), CommandOutcome::NoOp);
    assert_eq!(editor.value(), "<p>Hello world!</p>");
    assert!(changes.borrow().is_empty());
}

#[test]
fn test_identical_set_value_is_ignored() {
    let mut editor = editor("<p>Hello world</p>");
    select_then_blur(&mut editor, 0, 5);
    let generation = editor.tree().generation();

    assert!(!editor.set_value("<p>Hello world</p>").unwrap());
    assert_eq!(editor.tree().generation(), generation);
    assert!(editor.saved_selection().is_some());
}

#[test]
fn test_set_value_rejects_broken_markup() {
    let mut editor = editor("<p>Hello</p>");
    assert!(editor.set_value(r#"<a href="x"#).is_err());
    assert_eq!(editor.value(), "<p>Hello</p>");
}

#[test]
fn test_selection_capture_waits_for_next_turn() {
    let mut editor = editor("<p>Hello world</p>");
    editor.focus();
    editor.select_text(0, 5);
    editor.blur();

    // The toolbar click lands before the capture ran
    assert_eq!(editor.execute(Command::Underline), CommandOutcome::NoOp);

    editor.blur();
    assert_eq!(editor.run_pending_tasks(), 1);
    assert_eq!(editor.execute(Command::Underline), CommandOutcome::Applied);
    assert_eq!(editor.value(), "<p><u>Hello</u> world</p>");
}

#[test]
fn test_collapsed_selection_clears_saved_range() {
    let mut editor = editor("<p>Hello world</p>");
    select_then_blur(&mut editor, 0, 5);

    editor.focus();
    editor.place_caret(3);
    editor.run_pending_tasks();
    assert_eq!(editor.saved_selection(), None);
}

#[test]
fn test_paste_discards_formatting() {
    let mut editor = editor("<p>ab</p>");
    editor.focus();
    editor.place_caret(1);

    assert!(editor.paste("<b>X</b><i>Y</i>").is_applied());
    assert_eq!(editor.value(), "<p>aXYb</p>");
}

#[test]
fn test_paste_over_selection_across_blocks() -> anyhow::Result<()> {
    let mut editor = Editor::new("<p>one</p><p>two</p>", EditorConfig::default())?;
    editor.focus();
    editor.select_text(1, 5);

    assert!(editor.paste("<span style=\"color:red\">--</span>").is_applied());
    assert_eq!(editor.value(), "<p>o--</p><p>o</p>");
    Ok(())
}

#[test]
fn test_every_change_is_announced() {
    let mut editor = editor("<p>Hello world</p>");
    let changes = record_changes(&mut editor);
    select_then_blur(&mut editor, 6, 11);

    editor.execute(Command::Bold);
    editor.execute(Command::TextColor("red".into()));
    editor.execute(Command::Undo);

    let changes = changes.borrow();
    assert_eq!(changes.len(), 3);
    assert_eq!(changes[0], "<p>Hello <b>world</b></p>");
    assert_eq!(changes[1], r#"<p>Hello <b><span style="color:red">world</span></b></p>"#);
    assert_eq!(changes[2], changes[0]);
    assert_eq!(editor.notifications(), 3);
}

#[test]
fn test_config_validation() {
    let config = EditorConfig {
        default_font_size: 201,
        ..EditorConfig::default()
    };
    assert!(Editor::new("<p>x</p>", config).is_err());

    let config: EditorConfig = serde_json::from_str(r#"{"surfaceTag":"p","historyDepth":3}"#).unwrap();
    let editor = Editor::new("x", config).unwrap();
    assert_eq!(editor.config().history_depth, 3);
    assert_eq!(editor.tree().tag(editor.tree().root()), Some("p"));
}

#[test]
fn test_commands_across_list_items_reload_unchanged() {
    let commands = [
        Command::FontSize(20),
        Command::FontFamily("Arial".into()),
        Command::TextColor("red".into()),
        Command::Highlight("yellow".into()),
        Command::Bold,
        Command::Link("example.com".into()),
    ];
    for list in ["ul", "ol"] {
        for command in &commands {
            let mut editor = editor(&format!("<{0}><li>ab</li><li>cd</li></{0}>", list));
            select_then_blur(&mut editor, 1, 3);

            assert!(editor.execute(command.clone()).is_applied(), "{} on <{}>", command, list);
            assert_eq!(editor.tree().plain_text(), "abcd");
            assert_eq!(editor.tree().children(editor.tree().root()).len(), 1);
            assert_stable(&editor);
        }
    }
}

#[test]
fn test_font_size_across_list_items() {
    let mut editor = editor("<ul><li>ab</li><li>cd</li></ul>");
    select_then_blur(&mut editor, 1, 3);

    assert!(editor.execute(Command::FontSize(20)).is_applied());
    assert_eq!(
        editor.value(),
        r#"<ul><li>a<span style="font-size:20px">b</span></li><li><span style="font-size:20px">c</span>d</li></ul>"#
    );
}

#[test]
fn test_documents_produced_by_commands_reload_unchanged() {
    let mut editor = editor("<p>Hello world</p><p>second line</p>");
    let steps = [
        (0, 5, Command::Bold),
        (6, 11, Command::FontSize(18)),
        (3, 14, Command::FontFamily("Georgia".into())),
        (0, 2, Command::Align(Alignment::Center)),
        (12, 15, Command::FormatBlock("h2".into())),
        (12, 14, Command::List(ListKind::Unordered, BulletStyle::Square)),
        (2, 2, Command::Link("example.com".into())),
        (4, 20, Command::TextColor("#333".into())),
        (1, 21, Command::FontSize(9)),
    ];
    for (start, end, command) in steps {
        select_then_blur(&mut editor, start, end);
        editor.execute(command.clone());
        assert_eq!(editor.tree().plain_text(), "Hello worldsecond line", "text lost by {}", command);
        assert_stable(&editor);
    }
}

#[test]
fn test_style_values_cannot_smuggle_declarations() {
    let mut editor = editor("<p>Hello world</p>");
    for command in [
        Command::TextColor("red;x".into()),
        Command::FontFamily("Georgia;color:red".into()),
        Command::Highlight("a:b".into()),
    ] {
        select_then_blur(&mut editor, 0, 5);
        assert_eq!(editor.execute(command), CommandOutcome::NoOp);
    }
    assert_eq!(editor.value(), "<p>Hello world</p>");

    select_then_blur(&mut editor, 0, 5);
    assert!(editor.execute(Command::FontFamily("'Times New Roman', serif".into())).is_applied());
    assert_stable(&editor);
}
