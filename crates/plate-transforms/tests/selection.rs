use std::sync::Arc;

use plate_transforms::{
    transform_and_preserve_text_selection, ChildConstraint, Document, Mark, MarkSpec, Node,
    NodeSpec, Schema, Selection, Transform, DOC, PARAGRAPH,
};
use pretty_assertions::assert_eq;

fn transform(children: Vec<Node>, selection: Selection) -> Transform {
    Transform::new(Arc::new(Schema::rich_text()), Document::new(children)).with_selection(selection)
}

fn embolden_first_word(tr: Transform) -> Transform {
    tr.add_mark(1, 6, Mark::new("strong")).unwrap()
}

#[test]
fn range_survives_a_mark_rewrite() {
    let tr = transform(vec![Node::paragraph("hello world")], Selection::text(7, 12));
    let tr = transform_and_preserve_text_selection(tr, embolden_first_word);

    assert_eq!(tr.selection(), Some(&Selection::text(7, 12)));
    assert!(tr.doc().range_has_mark(1, 6, "strong"));
    assert!(!tr.doc().range_has_mark(0, tr.doc().content_size(), "text_selection"));
}

#[test]
fn reversed_range_stays_reversed() {
    let tr = transform(vec![Node::paragraph("hello world")], Selection::text(12, 7));
    let tr = transform_and_preserve_text_selection(tr, embolden_first_word);
    assert_eq!(tr.selection(), Some(&Selection::text(12, 7)));
}

#[test]
fn cursor_inside_text_comes_back_with_the_document_intact() {
    let original = Document::new(vec![Node::paragraph("hello")]);
    let tr = transform(original.children.clone(), Selection::cursor(3));
    let tr = transform_and_preserve_text_selection(tr, |tr| tr);

    assert_eq!(tr.selection(), Some(&Selection::cursor(3)));
    assert_eq!(tr.doc(), &original);
}

#[test]
fn cursor_follows_its_text_when_content_is_inserted_before_it() {
    let tr = transform(vec![Node::paragraph("hello")], Selection::cursor(3));
    let tr = transform_and_preserve_text_selection(tr, |tr| {
        tr.insert(0, vec![Node::paragraph("new")]).unwrap()
    });

    assert_eq!(tr.doc().children[1], Node::paragraph("hello"));
    assert_eq!(tr.selection(), Some(&Selection::cursor(8)));
}

#[test]
fn placeholder_in_an_empty_paragraph_is_removed() {
    let original = Document::new(vec![Node::paragraph("a"), Node::paragraph("")]);
    let tr = transform(original.children.clone(), Selection::cursor(4));

    let mut seen = None;
    let tr = transform_and_preserve_text_selection(tr, |tr| {
        seen = Some(tr.doc().text_between(4, 5));
        tr
    });

    assert_eq!(seen.as_deref(), Some("\u{200b}"));
    assert_eq!(tr.doc(), &original);
    assert_eq!(tr.selection(), Some(&Selection::cursor(4)));
}

#[test]
fn rewrite_sees_the_widened_selection_unless_dry_run() {
    let mut seen = None;
    let tr = transform(vec![Node::paragraph("hello")], Selection::cursor(3));
    transform_and_preserve_text_selection(tr.clone(), |tr| {
        seen = tr.selection().cloned();
        tr
    });
    assert_eq!(seen, Some(Selection::text(2, 3)));

    let dry = tr.set_meta("dryrun", true);
    let result = transform_and_preserve_text_selection(dry.clone(), |tr| {
        seen = tr.selection().cloned();
        tr
    });
    assert_eq!(seen, Some(Selection::cursor(3)));
    assert_eq!(result, dry);
}

#[test]
fn isolated_cursor_or_missing_marker_leaves_transform_unchanged() {
    let mut called = false;
    let isolated = transform(vec![Node::paragraph("a")], Selection::cursor(3));
    let result = transform_and_preserve_text_selection(isolated.clone(), |tr| {
        called = true;
        tr
    });
    assert_eq!(result, isolated);
    assert!(!called);

    let schema = Schema::new(
        vec![
            NodeSpec::block(DOC, ChildConstraint::BlockOnly),
            NodeSpec::block(PARAGRAPH, ChildConstraint::InlineOnly),
        ],
        Vec::<MarkSpec>::new(),
    )
    .unwrap();
    let bare = Transform::new(
        Arc::new(schema),
        Document::new(vec![Node::paragraph("hello")]),
    )
    .with_selection(Selection::cursor(3));
    let result = transform_and_preserve_text_selection(bare.clone(), |tr| {
        called = true;
        tr
    });
    assert_eq!(result, bare);
    assert!(!called);
}
