use crate::core::{Document, Mark, Node};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanEnd<'a> {
    pub node: &'a Node,
    pub pos: usize,
}

/// The widest run around a range that carries one identical mark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkSpan<'a> {
    pub mark: &'a Mark,
    pub from: SpanEnd<'a>,
    pub to: SpanEnd<'a>,
}

fn mark_at<'a>(doc: &'a Document, pos: usize, kind: &str) -> Option<(&'a Node, &'a Mark)> {
    let node = doc.node_at(pos)?;
    let mark = node.marks().find(kind)?;
    Some((node, mark))
}

pub fn find_nodes_with_same_mark<'a>(
    doc: &'a Document,
    from: usize,
    to: usize,
    kind: &str,
) -> Option<MarkSpan<'a>> {
    if from > to {
        return None;
    }

    let (first_node, mark) = mark_at(doc, from, kind)?;
    let mut start = SpanEnd {
        node: first_node,
        pos: from,
    };
    let mut end = start;
    for pos in from + 1..=to {
        let (node, found) = mark_at(doc, pos, kind)?;
        if found != mark {
            return None;
        }
        end = SpanEnd { node, pos };
    }

    let mut pos = from;
    while pos > 1 {
        match mark_at(doc, pos - 1, kind) {
            Some((node, found)) if found == mark => {
                pos -= 1;
                start = SpanEnd { node, pos };
            }
            _ => break,
        }
    }

    let size = doc.content_size();
    let mut pos = to;
    while pos + 1 < size {
        match mark_at(doc, pos + 1, kind) {
            Some((node, found)) if found == mark => {
                pos += 1;
                end = SpanEnd { node, pos };
            }
            _ => break,
        }
    }

    Some(MarkSpan {
        mark,
        from: start,
        to: end,
    })
}
