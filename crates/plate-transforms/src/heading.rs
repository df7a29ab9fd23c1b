use log::debug;
use serde_json::Value;

use crate::consolidate::try_consolidate_list_nodes;
use crate::core::{Node, Visit};
use crate::error::{or_unchanged, TransformError};
use crate::list::{unwrap_list_range, Remap};
use crate::marks::try_clear_marks;
use crate::schema::{ATTR_LEVEL, BLOCKQUOTE, HEADING, LIST_ITEM, PARAGRAPH};
use crate::style::StyleLookup;
use crate::transform::{Selection, Transform};

pub fn toggle_heading(tr: Transform, level: u8, styles: &dyn StyleLookup) -> Transform {
    or_unchanged("toggle_heading", tr, |tr| try_toggle_heading(tr, level, styles))
}

/// Sets the block at `pos` to a heading of `level`, or back to a paragraph
/// when `level` is `None`.
pub fn set_heading_node(
    tr: Transform,
    pos: usize,
    level: Option<u8>,
    styles: &dyn StyleLookup,
) -> Transform {
    or_unchanged("set_heading_node", tr, |tr| {
        try_set_heading_node(tr, pos, level, styles)
    })
}

fn as_heading(node: Node, level: u8) -> Node {
    match node {
        Node::Element(mut el) if el.kind == PARAGRAPH => {
            el.kind = HEADING.to_string();
            el.attrs.insert(ATTR_LEVEL.to_string(), Value::from(level));
            Node::Element(el)
        }
        other => other,
    }
}

fn try_toggle_heading(
    tr: Transform,
    level: u8,
    styles: &dyn StyleLookup,
) -> Result<Transform, TransformError> {
    let schema = tr.schema();
    if ![HEADING, PARAGRAPH, LIST_ITEM, BLOCKQUOTE]
        .iter()
        .all(|kind| schema.has_node(kind))
    {
        return Ok(tr);
    }
    let Some(selection) = tr.selection() else {
        return Ok(tr);
    };

    let mut demote: Option<bool> = None;
    let mut positions: Vec<usize> = Vec::new();
    tr.doc()
        .nodes_between(selection.from(), selection.to(), |node, pos, parent, _| {
            let Node::Element(el) = node else {
                return Visit::Continue;
            };
            if demote.is_none() {
                let current = el.attrs.get(ATTR_LEVEL).and_then(|v| v.as_u64());
                demote = Some(el.kind == HEADING && current == Some(u64::from(level)));
            }
            if parent.is_some_and(|p| p.kind == LIST_ITEM) {
                return Visit::SkipChildren;
            }
            if schema.is_list_kind(&el.kind)
                || el.kind == PARAGRAPH
                || el.kind == HEADING
                || el.kind == BLOCKQUOTE
            {
                positions.push(pos);
                return Visit::SkipChildren;
            }
            Visit::Continue
        });

    let target = if demote.unwrap_or(false) {
        None
    } else {
        Some(level)
    };
    debug!(
        "toggle_heading: {} block(s) to {target:?}",
        positions.len()
    );
    let mut tr = tr;
    for pos in positions.into_iter().rev() {
        tr = try_set_heading_node(tr, pos, target, styles)?;
    }
    try_consolidate_list_nodes(tr)
}

fn try_set_heading_node(
    tr: Transform,
    pos: usize,
    level: Option<u8>,
    styles: &dyn StyleLookup,
) -> Result<Transform, TransformError> {
    let doc = tr.doc();
    let Some(Node::Element(el)) = doc.node_at(pos).cloned() else {
        return Err(TransformError::NoNodeAt(pos));
    };
    if doc.resolve(pos).is_some_and(|r| r.parent_kind() == LIST_ITEM) {
        return Ok(tr);
    }
    let end = pos + el.content_size() + 2;

    if tr.schema().is_list_kind(&el.kind) {
        let Some(level) = level else {
            return Ok(tr);
        };
        let (from, to) = tr
            .selection()
            .map(|sel| (sel.from(), sel.to()))
            .unwrap_or((pos, end));
        let remap: Remap<'_> = &move |node: Node| as_heading(node, level);
        return unwrap_list_range(tr, pos, from, to, Some(remap));
    }

    if el.kind == HEADING {
        let mut attrs = el.attrs;
        let kind = match level {
            Some(level) => {
                attrs.insert(ATTR_LEVEL.to_string(), Value::from(level));
                HEADING
            }
            None => {
                attrs.remove(ATTR_LEVEL);
                PARAGRAPH
            }
        };
        return tr.set_node_markup(pos, kind, attrs, el.marks);
    }

    let Some(level) = level else {
        return Ok(tr);
    };
    if el.kind != PARAGRAPH && el.kind != BLOCKQUOTE {
        return Ok(tr);
    }

    let saved = tr.selection().cloned();
    let mut tr = tr.set_selection(Selection::text(pos + 1, end - 1))?;
    tr = try_clear_marks(tr, styles)?;
    if let Some(selection) = saved {
        tr = tr.set_selection(selection)?;
    }
    // Clearing can reset an indent override.
    let Some(Node::Element(cleared)) = tr.doc().node_at(pos).cloned() else {
        return Err(TransformError::NoNodeAt(pos));
    };
    let mut attrs = cleared.attrs;
    attrs.insert(ATTR_LEVEL.to_string(), Value::from(level));
    tr.set_node_markup(pos, HEADING, attrs, cleared.marks)
}
