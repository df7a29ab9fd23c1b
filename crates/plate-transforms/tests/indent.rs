use std::sync::Arc;

use plate_transforms::{
    clear_marks, set_list_node_indent, set_node_indent_markup, update_indent_level,
    update_indent_level_with_override, Attrs, Document, Node, NoStyles, Schema, Selection,
    Transform,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn attrs(value: Value) -> Attrs {
    serde_json::from_value(value).unwrap()
}

fn item(text: &str) -> Node {
    Node::list_item(vec![Node::paragraph(text)])
}

fn list(kind: &str, attrs_value: Value, texts: &[&str]) -> Node {
    Node::list(kind, attrs(attrs_value), texts.iter().map(|t| item(t)).collect())
}

fn transform(children: Vec<Node>, selection: Selection) -> Transform {
    Transform::new(Arc::new(Schema::rich_text()), Document::new(children)).with_selection(selection)
}

fn indents(doc: &Document) -> Vec<u64> {
    doc.children.iter().map(Node::indent).collect()
}

#[test]
fn indenting_one_item_splits_the_list_in_three() {
    let tr = transform(
        vec![list(
            "ordered_list",
            json!({"indent": 0, "start": 1}),
            &["A", "B", "C", "D"],
        )],
        Selection::cursor(9),
    );
    let tr = update_indent_level(tr, 1);

    assert_eq!(
        tr.doc().children,
        vec![
            list("ordered_list", json!({"indent": 0, "start": 1}), &["A"]),
            list("ordered_list", json!({"indent": 1, "start": 1}), &["B"]),
            list(
                "ordered_list",
                json!({"indent": 0, "start": 1, "counter_reset": "none"}),
                &["C", "D"]
            ),
        ]
    );
    assert_eq!(tr.selection(), Some(&Selection::cursor(11)));
    assert!(!tr.doc().range_has_mark(0, tr.doc().content_size(), "text_selection"));
}

#[test]
fn indenting_middle_items_keeps_item_order() {
    let original = list(
        "ordered_list",
        json!({"indent": 0}),
        &["1", "2", "3", "4", "5"],
    );
    let tr = transform(vec![original.clone()], Selection::text(8, 14));
    let tr = update_indent_level(tr, 1);

    let doc = tr.doc();
    assert_eq!(doc.children.len(), 3);
    assert_eq!(indents(doc), vec![0, 1, 0]);
    let sizes: Vec<usize> = doc.children.iter().map(|n| n.children().len()).collect();
    assert_eq!(sizes, vec![1, 2, 2]);

    let items: Vec<Node> = doc
        .children
        .iter()
        .flat_map(|n| n.children().iter().cloned())
        .collect();
    assert_eq!(items, original.children().to_vec());

    let selection = tr.selection().expect("selection");
    assert_eq!(doc.text_between(selection.from(), selection.to()), "23");
}

#[test]
fn whole_list_in_selection_is_indented_in_place() {
    let tr = transform(
        vec![
            Node::paragraph("a"),
            list("ordered_list", json!({"indent": 0}), &["x", "y"]),
            Node::paragraph("b"),
        ],
        Selection::text(1, 17),
    );
    let tr = update_indent_level(tr, 1);

    assert_eq!(indents(tr.doc()), vec![1, 1, 1]);
    assert_eq!(tr.doc().children[1].children().len(), 2);
    assert_eq!(tr.selection(), Some(&Selection::text(1, 17)));
}

#[test]
fn text_blocks_are_indented_directly() {
    let tr = transform(
        vec![
            Node::paragraph("a"),
            Node::heading(1, "b"),
            Node::element("blockquote", Attrs::default(), vec![Node::text("c")]),
        ],
        Selection::text(1, 8),
    );
    let tr = update_indent_level(tr, 2);
    assert_eq!(indents(tr.doc()), vec![2, 2, 2]);
    assert_eq!(tr.doc().children[1].attr_u64("level"), Some(1));

    let tr = update_indent_level(tr, -1);
    assert_eq!(indents(tr.doc()), vec![1, 1, 1]);
}

#[test]
fn indent_is_clamped_for_every_delta() {
    for start in 0..=7i64 {
        for delta in -9..=9i64 {
            let tr = transform(
                vec![Node::element(
                    "paragraph",
                    attrs(json!({"indent": start})),
                    vec![Node::text("a")],
                )],
                Selection::cursor(1),
            );
            let result = update_indent_level(tr.clone(), delta);
            let indent = result.doc().children[0].indent();
            assert_eq!(indent as i64, (start + delta).clamp(0, 7));
            if indent as i64 == start {
                assert_eq!(result, tr);
            }
        }
    }

    for (start, delta, expected) in [(1, i64::MAX, 7), (1, i64::MIN, 0), (7, i64::MAX, 7)] {
        let tr = transform(
            vec![Node::element(
                "paragraph",
                attrs(json!({"indent": start})),
                vec![Node::text("a")],
            )],
            Selection::cursor(1),
        );
        let result = update_indent_level(tr, delta);
        assert_eq!(result.doc().children[0].indent(), expected);
    }
}

#[test]
fn extreme_deltas_clamp_list_splits() {
    let tr = transform(
        vec![list(
            "ordered_list",
            json!({"indent": 2}),
            &["A", "B", "C"],
        )],
        Selection::cursor(9),
    );
    let tr = update_indent_level(tr, i64::MIN);
    assert_eq!(indents(tr.doc()), vec![2, 0, 2]);
}

#[test]
fn unchanged_indent_records_no_edit() {
    let tr = transform(vec![Node::paragraph("a")], Selection::cursor(1));
    assert_eq!(set_node_indent_markup(tr.clone(), 0, 0), tr);
    assert_eq!(set_node_indent_markup(tr.clone(), 0, -3), tr);
    assert_eq!(set_node_indent_markup(tr.clone(), 42, 1), tr);

    let indented = set_node_indent_markup(tr, 0, 3);
    assert_eq!(indented.doc().children[0].indent(), 3);
    assert_eq!(indented.steps().len(), 1);
}

#[test]
fn list_indent_on_a_non_list_is_refused() {
    let tr = transform(vec![Node::paragraph("a")], Selection::cursor(1));
    assert_eq!(set_list_node_indent(tr.clone(), 0, 1), tr);
}

#[test]
fn override_flags_record_the_prior_indent_and_clear_restores_it() {
    let tr = transform(vec![Node::paragraph("a")], Selection::cursor(1));
    let tr = update_indent_level_with_override(tr, 1);
    assert_eq!(
        tr.doc().children[0].attrs(),
        Some(&attrs(json!({
            "indent": 1,
            "overridden_indent": true,
            "overridden_indent_value": 0
        })))
    );

    let tr = update_indent_level_with_override(tr, 1);
    assert_eq!(tr.doc().children[0].attr_u64("overridden_indent_value"), Some(0));

    let tr = tr.set_selection(Selection::text(1, 2)).unwrap();
    let tr = clear_marks(tr, &NoStyles);
    assert_eq!(
        tr.doc().children[0].attrs(),
        Some(&attrs(json!({"indent": 0})))
    );
}
