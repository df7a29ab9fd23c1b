use std::sync::Arc;

use plate_transforms::{
    ChildConstraint, Document, Mark, MarkSpec, Node, NodeSpec, Schema, Selection, Step,
    Transform, TransformError, Visit,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn list_doc() -> Document {
    Document::new(vec![Node::list(
        "ordered_list",
        Default::default(),
        vec![Node::list_item(vec![Node::paragraph("ab")])],
    )])
}

#[test]
fn sizes_follow_token_positions() {
    let doc = Document::new(vec![Node::paragraph("ab"), Node::paragraph("")]);
    assert_eq!(doc.content_size(), 6);
    assert_eq!(doc.children[0].size(), 4);
    assert_eq!(list_doc().content_size(), 8);

    let Some(Node::Element(first)) = doc.node_at(0) else {
        panic!("expected paragraph at 0");
    };
    assert_eq!(first.kind, "paragraph");
    assert_eq!(doc.node_at(1).map(|n| n.text_content()), Some("ab".to_string()));
    assert_eq!(doc.node_at(2).map(|n| n.text_content()), Some("ab".to_string()));
    assert!(doc.node_at(3).is_none());
    assert_eq!(doc.node_at(4).map(|n| n.kind().to_string()), Some("paragraph".to_string()));
    assert!(doc.node_at(99).is_none());
}

#[test]
fn nodes_between_honours_visit_result() {
    let doc = Document::new(vec![
        Node::paragraph("ab"),
        Node::paragraph("cd"),
        Node::paragraph("ef"),
    ]);

    let mut seen = Vec::new();
    doc.nodes_between(2, 6, |node, pos, _, _| {
        seen.push((node.kind().to_string(), pos));
        Visit::Continue
    });
    assert_eq!(
        seen,
        vec![
            ("paragraph".to_string(), 0),
            ("text".to_string(), 1),
            ("paragraph".to_string(), 4),
            ("text".to_string(), 5),
        ]
    );

    let mut blocks = Vec::new();
    doc.descendants(|node, pos, parent, index| {
        assert!(parent.is_none());
        blocks.push((pos, index));
        Visit::SkipChildren
    });
    assert_eq!(blocks, vec![(0, 0), (4, 1), (8, 2)]);

    let mut count = 0;
    doc.descendants(|_, _, _, _| {
        count += 1;
        Visit::Stop
    });
    assert_eq!(count, 1);
}

#[test]
fn resolve_reports_ancestors() {
    let doc = list_doc();
    let resolved = doc.resolve(4).expect("position inside text");
    assert_eq!(resolved.depth(), 3);
    assert_eq!(resolved.parent_kind(), "paragraph");
    assert_eq!(resolved.kind(1), "ordered_list");
    assert_eq!(resolved.kind(0), "doc");
    assert_eq!(resolved.before(1), Some(0));
    assert_eq!(resolved.before(3), Some(2));
    assert_eq!(resolved.start(3), Some(3));
    assert_eq!(resolved.start(0), Some(0));
    assert_eq!(resolved.before(0), None);
    assert_eq!(resolved.before(4), None);
    assert_eq!(resolved.start(4), None);
    assert_eq!(resolved.text_offset(), 1);

    let (depth, item) = resolved
        .find_ancestor(|el| el.kind == "list_item")
        .expect("inside a list item");
    assert_eq!(depth, 2);
    assert_eq!(item.children.len(), 1);

    assert!(doc.resolve(9).is_none());
}

#[test]
fn marks_at_follows_the_text_before_the_cursor() {
    let doc = Document::new(vec![Node::element(
        "paragraph",
        Default::default(),
        vec![
            Node::styled_text("ab", [Mark::new("strong")].into_iter().collect()),
            Node::text("cd"),
        ],
    )]);
    assert!(doc.marks_at(2).contains_kind("strong"));
    assert!(doc.marks_at(3).contains_kind("strong"));
    assert!(!doc.marks_at(4).contains_kind("strong"));
    assert!(doc.range_has_mark(1, 5, "strong"));
    assert!(!doc.range_has_mark(3, 5, "strong"));
    assert_eq!(doc.text_between(2, 4), "bc");
}

#[test]
fn insert_maps_selection_and_skips_no_op_steps() {
    let schema = Arc::new(Schema::rich_text());
    let doc = Document::new(vec![Node::paragraph("hello")]);
    let tr = Transform::new(schema, doc).with_selection(Selection::cursor(3));

    let tr = tr.insert(1, vec![Node::text(">> ")]).unwrap();
    assert_eq!(tr.selection(), Some(&Selection::cursor(6)));
    assert_eq!(tr.doc().children[0].text_content(), ">> hello");
    assert_eq!(tr.steps().len(), 1);

    let unchanged = tr.clone().remove_mark_kind(1, 9, "strong").unwrap();
    assert_eq!(unchanged, tr);

    let tr = tr.delete(1, 4).unwrap();
    assert_eq!(tr.selection(), Some(&Selection::cursor(3)));
    assert_eq!(tr.doc(), tr.doc_before());
    assert!(tr.doc_changed());
}

#[test]
fn primitive_edits_report_structural_errors() {
    let schema = Arc::new(Schema::rich_text());
    let tr = Transform::new(schema, list_doc());

    assert_eq!(
        tr.clone().delete(2, 20).unwrap_err(),
        TransformError::PositionOutOfRange { pos: 20, size: 8 }
    );
    assert_eq!(
        tr.clone().delete(0, 4).unwrap_err(),
        TransformError::UnsupportedRange { from: 0, to: 4 }
    );
    assert_eq!(
        tr.clone()
            .set_node_markup(3, "paragraph", Default::default(), Default::default())
            .unwrap_err(),
        TransformError::NoNodeAt(3)
    );
    assert_eq!(
        tr.clone()
            .set_node_markup(0, "poem", Default::default(), Default::default())
            .unwrap_err(),
        TransformError::UnknownNodeKind("poem".to_string())
    );
    assert_eq!(
        tr.add_mark(3, 5, Mark::new("sparkle")).unwrap_err(),
        TransformError::UnknownMarkKind("sparkle".to_string())
    );
}

#[test]
fn steps_and_documents_deserialize_from_json() {
    let doc: Document = serde_json::from_value(json!({
        "children": [
            {"node": "element", "kind": "heading", "attrs": {"level": 2}, "children": [
                {"node": "text", "text": "Hi", "marks": [{"kind": "em"}]}
            ]}
        ]
    }))
    .unwrap();
    assert_eq!(doc.children[0].attr_u64("level"), Some(2));
    assert!(doc.marks_at(2).contains_kind("em"));

    let step: Step = serde_json::from_value(json!({
        "step": "add_mark", "from": 1, "to": 3, "mark": {"kind": "strong"}
    }))
    .unwrap();
    let next = step.apply(&doc, &Schema::rich_text()).unwrap();
    assert!(next.range_has_mark(1, 3, "strong"));
}

#[test]
fn schema_rejects_duplicate_registrations() {
    let err = Schema::new(
        vec![
            NodeSpec::block("doc", ChildConstraint::BlockOnly),
            NodeSpec::block("doc", ChildConstraint::BlockOnly),
        ],
        Vec::<MarkSpec>::new(),
    )
    .unwrap_err();
    assert!(err.contains("Duplicate"));

    let schema = Schema::rich_text().with_indent_bounds(1, 3);
    assert_eq!(schema.indent_bounds().clamp(-4), 1);
    assert_eq!(schema.indent_bounds().clamp(9), 3);
    assert!(schema.is_list_kind("bullet_list"));
    assert!(schema.is_ordered_list_kind("ordered_list"));
    assert!(schema.is_text_block("blockquote"));
    assert!(!schema.is_text_block("list_item"));
}
