use plate_transforms::{find_nodes_with_same_mark, Attrs, Document, Mark, Node};
use serde_json::json;

fn color(value: &str) -> Mark {
    let attrs: Attrs = serde_json::from_value(json!({ "color": value })).unwrap();
    Mark::with_attrs("text_color", attrs)
}

fn paragraph(children: Vec<Node>) -> Document {
    Document::new(vec![Node::element("paragraph", Attrs::default(), children)])
}

#[test]
fn span_extends_to_the_whole_marked_run() {
    let doc = paragraph(vec![
        Node::text("ab"),
        Node::styled_text("cde", [color("red")].into_iter().collect()),
        Node::text("f"),
    ]);

    let span = find_nodes_with_same_mark(&doc, 4, 4, "text_color").expect("marked run");
    assert_eq!(span.mark, &color("red"));
    assert_eq!(span.from.pos, 3);
    assert_eq!(span.to.pos, 5);
    assert_eq!(span.from.node.text_content(), "cde");
    assert_eq!(span.to.node.text_content(), "cde");
}

#[test]
fn span_stops_where_the_mark_instance_changes() {
    let doc = paragraph(vec![
        Node::styled_text("cde", [color("red")].into_iter().collect()),
        Node::styled_text("gh", [color("blue")].into_iter().collect()),
    ]);

    let span = find_nodes_with_same_mark(&doc, 2, 2, "text_color").expect("marked run");
    assert_eq!(span.mark, &color("red"));
    assert_eq!((span.from.pos, span.to.pos), (1, 3));

    let span = find_nodes_with_same_mark(&doc, 5, 5, "text_color").expect("marked run");
    assert_eq!(span.mark, &color("blue"));
    assert_eq!((span.from.pos, span.to.pos), (4, 5));
    assert_eq!(span.from.node.text_content(), "gh");
}

#[test]
fn mixed_or_missing_marks_find_nothing() {
    let doc = paragraph(vec![
        Node::text("ab"),
        Node::styled_text("cde", [color("red")].into_iter().collect()),
        Node::styled_text("gh", [color("blue")].into_iter().collect()),
    ]);

    assert!(find_nodes_with_same_mark(&doc, 2, 2, "text_color").is_none());
    assert!(find_nodes_with_same_mark(&doc, 4, 7, "text_color").is_none());
    assert!(find_nodes_with_same_mark(&doc, 4, 4, "strong").is_none());
    assert!(find_nodes_with_same_mark(&doc, 0, 0, "text_color").is_none());
    assert!(find_nodes_with_same_mark(&doc, 5, 4, "text_color").is_none());
}
