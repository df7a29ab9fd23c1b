use log::debug;
use serde_json::Value;

use crate::core::{Attrs, Document, Mark, Node, Visit};
use crate::error::{or_unchanged, TransformError};
use crate::schema::{ATTR_MARK_ID, MARK_TEXT_SELECTION, PARAGRAPH};
use crate::transform::{Selection, Transform};

pub const PLACEHOLDER_TEXT: &str = "\u{200b}";

/// Where a collapsed cursor sits relative to its neighbours, and so which
/// way the temporary selection is widened to carry the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorContext {
    EmptyBlock,
    AfterText,
    SameTypeLeft,
    SameTypeRight,
    RightOnly,
    LeftOnly,
    Isolated,
}

#[derive(Debug, Clone, Copy, Default)]
struct Widening {
    left: usize,
    right: usize,
    placeholder: bool,
}

fn classify_cursor(doc: &Document, pos: usize) -> CursorContext {
    let prev = pos.checked_sub(1).and_then(|p| doc.node_at(p));
    let Some(current) = doc.node_at(pos) else {
        return match prev {
            Some(Node::Element(el)) if el.kind == PARAGRAPH && el.children.is_empty() => {
                CursorContext::EmptyBlock
            }
            Some(Node::Text(_)) => CursorContext::AfterText,
            _ => CursorContext::Isolated,
        };
    };
    let next = doc.node_at(pos + 1);
    match (prev, next) {
        (Some(prev), _) if prev.kind() == current.kind() => CursorContext::SameTypeLeft,
        (_, Some(next)) if next.kind() == current.kind() => CursorContext::SameTypeRight,
        (_, Some(_)) => CursorContext::RightOnly,
        (_, None) if current.is_text() => CursorContext::RightOnly,
        (Some(_), None) => CursorContext::LeftOnly,
        (None, None) => CursorContext::Isolated,
    }
}

pub fn transform_and_preserve_text_selection<F>(tr: Transform, rewrite: F) -> Transform
where
    F: FnOnce(Transform) -> Transform,
{
    or_unchanged("transform_and_preserve_text_selection", tr, |tr| {
        try_preserve_text_selection(tr, |tr| Ok(rewrite(tr)))
    })
}

fn find_marker(doc: &Document, marker: &Mark) -> Option<(usize, usize)> {
    let mut span: Option<(usize, usize)> = None;
    doc.descendants(|node, pos, _, _| {
        if matches!(node, Node::Element(_)) {
            return Visit::Continue;
        }
        if node.marks().iter().any(|m| m == marker) {
            let end = pos + node.size();
            span = Some(span.map_or((pos, end), |(from, _)| (from, end)));
        }
        Visit::Continue
    });
    span
}

pub(crate) fn try_preserve_text_selection<F>(
    tr: Transform,
    rewrite: F,
) -> Result<Transform, TransformError>
where
    F: FnOnce(Transform) -> Result<Transform, TransformError>,
{
    if tr.is_dry_run() {
        return rewrite(tr);
    }
    if !tr.schema().has_mark(MARK_TEXT_SELECTION) {
        return Ok(tr);
    }
    let Some(selection) = tr.selection().cloned() else {
        return Ok(tr);
    };
    let (mut from, mut to) = (selection.from(), selection.to());
    let reversed = matches!(selection, Selection::Text { anchor, head } if anchor > head);

    let mut tr = tr;
    let mut widen = Widening::default();
    if from == to {
        let context = classify_cursor(tr.doc(), from);
        debug!("preserve selection: cursor at {from} is {context:?}");
        match context {
            CursorContext::EmptyBlock => {
                tr = tr.insert(from, vec![Node::text(PLACEHOLDER_TEXT)])?;
                to = from + 1;
                widen.right = 1;
                widen.placeholder = true;
            }
            CursorContext::AfterText | CursorContext::SameTypeLeft | CursorContext::LeftOnly => {
                from -= 1;
                widen.left = 1;
            }
            CursorContext::SameTypeRight | CursorContext::RightOnly => {
                to += 1;
                widen.right = 1;
            }
            CursorContext::Isolated => return Ok(tr),
        }
    }

    let token = tr.issue_token();
    let mut attrs = Attrs::default();
    attrs.insert(ATTR_MARK_ID.to_string(), Value::from(token));
    let marker = Mark::with_attrs(MARK_TEXT_SELECTION, attrs);
    tr = tr
        .set_selection(Selection::text(from, to))?
        .add_mark(from, to, marker.clone())?;

    let mut tr = rewrite(tr)?;

    let Some((mark_from, mark_to)) = find_marker(tr.doc(), &marker) else {
        debug!("preserve selection: marker {token} lost during rewrite");
        return Ok(tr);
    };
    tr = tr.remove_mark(mark_from, mark_to, &marker)?;

    let from = mark_from + widen.left;
    let mut to = mark_to.saturating_sub(widen.right).max(from);
    if widen.placeholder && tr.doc().text_between(mark_from, mark_from + 1) == PLACEHOLDER_TEXT {
        tr = tr.delete(mark_from, mark_from + 1)?;
        to = from;
    }
    debug!("preserve selection: restored {from}..{to}");
    let selection = if reversed {
        Selection::text(to, from)
    } else {
        Selection::text(from, to)
    };
    tr.set_selection(selection)
}
