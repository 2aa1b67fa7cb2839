use mdbase_editor_core::{
    BlockFormat, DocumentStats, EditOrigin, EditorCommand, Focus, InlineFormat, RichSelection,
    Selection, Snippet, SyncConfig, SyncEngine, SyncOutcome, ViewState, execute_command,
};
use mdbase_markdown::NodePath;

fn settled(markdown: &str) -> SyncEngine {
    let mut engine = SyncEngine::new(SyncConfig::default(), ViewState::default());
    let outcome = engine.replace_source_text(markdown);
    engine.settle(outcome.ticket().unwrap());
    engine
}

#[test]
fn source_keystroke_propagates_exactly_once() {
    let mut engine = settled("hello");
    engine.source_mut().set_caret(5);
    engine.source_mut().insert_at_selection("!");

    let first = engine.on_source_changed();
    assert!(first.propagated());
    // A host that fires the editor handler on every repaint gets suppressed.
    let revision = engine.source().revision();
    assert_eq!(engine.on_editor_changed(), SyncOutcome::Suppressed);
    assert_eq!(engine.source().revision(), revision);
    assert_eq!(engine.source().text(), "hello!");
}

#[test]
fn editor_keystroke_does_not_bounce_back() {
    let mut engine = settled("hello");
    let leaf = NodePath::from(vec![0, 0]);
    engine.editor_mut().text_slot_mut(&leaf).unwrap().push_str(" world");

    let outcome = engine.on_editor_changed();
    assert!(outcome.propagated());
    assert_eq!(engine.source().text(), "hello world");
    assert_eq!(engine.origin(), EditOrigin::Wysiwyg);

    // Re-parsing the rewritten source yields the same markup, so the editor
    // is left alone and nothing travels back.
    let before = engine.editor().clone();
    assert!(matches!(engine.on_source_changed(), SyncOutcome::Unchanged(_)));
    assert_eq!(engine.editor(), &before);
}

#[test]
fn latest_edit_wins_over_stale_settle() {
    let mut engine = settled("a");
    let old = engine.replace_source_text("a b").ticket().unwrap();
    let new = engine.replace_source_text("a b c").ticket().unwrap();

    assert!(!engine.settle(old));
    assert_eq!(engine.origin(), EditOrigin::Source);
    assert_eq!(engine.on_editor_changed(), SyncOutcome::Suppressed);

    assert!(engine.settle(new));
    assert!(matches!(engine.on_editor_changed(), SyncOutcome::Unchanged(_)));
}

#[test]
fn bold_twice_in_source_is_identity() {
    let original = "åäö and more";
    let mut engine = settled(original);
    engine.source_mut().set_selection(Selection::new(0, 3));
    let bold = EditorCommand::ToggleInline(InlineFormat::Bold);

    execute_command(&mut engine, &mut Focus::Source, &bold);
    assert_eq!(engine.source().text(), "**åäö** and more");
    execute_command(&mut engine, &mut Focus::Source, &bold);
    assert_eq!(engine.source().text(), original);
    assert_eq!(engine.source().selected_text(), "åäö");
}

#[test]
fn stats_follow_the_editor() {
    let engine = settled("one two three");
    assert_eq!(
        engine.stats(),
        DocumentStats {
            words: 3,
            reading_minutes: 1
        }
    );
}

#[test]
fn editor_commands_build_the_source() {
    let mut engine = settled("Notes");
    let mut focus = Focus::Editor(RichSelection::caret(NodePath::from(vec![0]), 0));

    execute_command(
        &mut engine,
        &mut focus,
        &EditorCommand::ToggleBlock(BlockFormat::Heading(1)),
    );
    let settle = engine.pending_settle().unwrap();
    engine.settle(settle);
    execute_command(
        &mut engine,
        &mut focus,
        &EditorCommand::Insert(Snippet::TaskList),
    );

    insta::assert_snapshot!(engine.source().text(), @r"
    # Notes

    - [ ] Task 1
    - [ ] Task 2
    ");
}

#[test]
fn block_command_on_removed_block_is_ignored() {
    let mut engine = settled("one\n\ntwo\n\nthree");
    let mut focus = Focus::Editor(RichSelection::caret(NodePath::from(vec![2]), 0));
    let outcome = engine.replace_source_text("one");
    engine.settle(outcome.ticket().unwrap());
    let before = engine.editor().clone();

    for format in [BlockFormat::BlockQuote, BlockFormat::BulletList] {
        let applied = execute_command(&mut engine, &mut focus, &EditorCommand::ToggleBlock(format));
        assert!(!applied);
    }
    assert_eq!(engine.editor(), &before);
    assert_eq!(engine.source().text(), "one");
}
