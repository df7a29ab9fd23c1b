use log::debug;
use serde_json::Value;

use crate::consolidate::try_consolidate_list_nodes;
use crate::core::{Document, ElementNode, Node, Visit};
use crate::error::{or_unchanged, TransformError};
use crate::preserve::try_preserve_text_selection;
use crate::schema::{
    Schema, ATTR_INDENT, ATTR_OVERRIDDEN_INDENT, ATTR_OVERRIDDEN_INDENT_VALUE, BLOCKQUOTE, HEADING,
    PARAGRAPH,
};
use crate::transform::Transform;

pub fn update_indent_level(tr: Transform, delta: i64) -> Transform {
    or_unchanged("update_indent_level", tr, |tr| try_update_indent_level(tr, delta))
}

/// Like `update_indent_level`, but flags the block under the selection head
/// as an indent override when its indent changed.
pub fn update_indent_level_with_override(tr: Transform, delta: i64) -> Transform {
    or_unchanged("update_indent_level_with_override", tr, |tr| {
        let Some(head) = tr.selection().map(|sel| sel.head()) else {
            return Ok(tr);
        };
        let before = head_block(tr.doc(), head).map(|(_, el)| indent_of(el));
        let tr = try_update_indent_level(tr, delta)?;
        let Some(before) = before else {
            return Ok(tr);
        };
        let head = tr.selection().map(|sel| sel.head()).unwrap_or(head);
        let Some((pos, el)) = head_block(tr.doc(), head).map(|(pos, el)| (pos, el.clone())) else {
            return Ok(tr);
        };
        if indent_of(&el) == before {
            return Ok(tr);
        }
        let mut attrs = el.attrs;
        let already = attrs
            .get(ATTR_OVERRIDDEN_INDENT)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        attrs.insert(ATTR_OVERRIDDEN_INDENT.to_string(), Value::Bool(true));
        if !already {
            attrs.insert(ATTR_OVERRIDDEN_INDENT_VALUE.to_string(), Value::from(before));
        }
        tr.set_node_markup(pos, &el.kind, attrs, el.marks)
    })
}

pub fn set_list_node_indent(tr: Transform, pos: usize, delta: i64) -> Transform {
    or_unchanged("set_list_node_indent", tr, |tr| {
        let Some(selection) = tr.selection() else {
            return Ok(tr);
        };
        let (from, to) = (selection.from(), selection.to());
        try_set_list_node_indent(tr, pos, delta, from, to)
    })
}

pub fn set_node_indent_markup(tr: Transform, pos: usize, delta: i64) -> Transform {
    or_unchanged("set_node_indent_markup", tr, |tr| {
        try_set_node_indent_markup(tr, pos, delta)
    })
}

fn indent_of(el: &ElementNode) -> u64 {
    el.attrs.get(ATTR_INDENT).and_then(|v| v.as_u64()).unwrap_or(0)
}

fn is_indentable(kind: &str) -> bool {
    kind == PARAGRAPH || kind == HEADING || kind == BLOCKQUOTE
}

fn head_block(doc: &Document, head: usize) -> Option<(usize, &ElementNode)> {
    let resolved = doc.resolve(head)?;
    let (depth, el) = resolved.find_ancestor(|el| is_indentable(&el.kind))?;
    Some((resolved.before(depth)?, el))
}

fn collect_lists(doc: &Document, schema: &Schema, from: usize, to: usize) -> Vec<usize> {
    let mut lists = Vec::new();
    doc.nodes_between(from, to, |node, pos, _, _| match node {
        Node::Element(el) if schema.is_list_kind(&el.kind) => {
            lists.push(pos);
            Visit::SkipChildren
        }
        Node::Element(el) if is_indentable(&el.kind) => Visit::SkipChildren,
        _ => Visit::Continue,
    });
    lists
}

pub(crate) fn try_update_indent_level(
    tr: Transform,
    delta: i64,
) -> Result<Transform, TransformError> {
    let Some(selection) = tr.selection() else {
        return Ok(tr);
    };
    let (from, to) = (selection.from(), selection.to());

    let mut blocks: Vec<usize> = Vec::new();
    tr.doc().nodes_between(from, to, |node, pos, _, _| match node {
        Node::Element(el) if is_indentable(&el.kind) => {
            blocks.push(pos);
            Visit::SkipChildren
        }
        Node::Element(el) if tr.schema().is_list_kind(&el.kind) => Visit::SkipChildren,
        _ => Visit::Continue,
    });
    let has_lists = !collect_lists(tr.doc(), tr.schema(), from, to).is_empty();

    let mut tr = tr;
    for pos in blocks {
        tr = try_set_node_indent_markup(tr, pos, delta)?;
    }
    if !has_lists {
        return Ok(tr);
    }

    let tr = try_preserve_text_selection(tr, |tr| {
        // The selection may have been widened, so positions are collected again.
        let Some(selection) = tr.selection() else {
            return Ok(tr);
        };
        let (from, to) = (selection.from(), selection.to());
        let lists = collect_lists(tr.doc(), tr.schema(), from, to);
        debug!("update_indent_level: {} list(s), delta {delta}", lists.len());
        let mut tr = tr;
        for pos in lists.into_iter().rev() {
            tr = try_set_list_node_indent(tr, pos, delta, from, to)?;
        }
        Ok(tr)
    })?;
    try_consolidate_list_nodes(tr)
}

pub(crate) fn try_set_list_node_indent(
    tr: Transform,
    pos: usize,
    delta: i64,
    from: usize,
    to: usize,
) -> Result<Transform, TransformError> {
    let list = match tr.doc().node_at(pos) {
        Some(Node::Element(el)) if tr.schema().is_list_kind(&el.kind) => el.clone(),
        Some(_) => return Err(TransformError::NotAList(pos)),
        None => return Err(TransformError::NoNodeAt(pos)),
    };
    let end = pos + list.content_size() + 2;
    if from <= pos && end <= to {
        return try_set_node_indent_markup(tr, pos, delta);
    }

    let mut before: Vec<Node> = Vec::new();
    let mut selected: Vec<Node> = Vec::new();
    let mut after: Vec<Node> = Vec::new();
    let mut item_pos = pos + 1;
    for item in &list.children {
        let item_end = item_pos + item.size();
        if item_end <= from {
            before.push(item.clone());
        } else if item_pos >= to && item_pos > from {
            after.push(item.clone());
        } else {
            selected.push(item.clone());
        }
        item_pos = item_end;
    }
    if selected.is_empty() {
        return Ok(tr);
    }
    if before.is_empty() && after.is_empty() {
        return try_set_node_indent_markup(tr, pos, delta);
    }

    let current = indent_of(&list);
    let indent = tr.schema().indent_bounds().clamp((current as i64).saturating_add(delta));
    if indent == current {
        return Ok(tr);
    }
    debug!(
        "splitting {} at {pos}: {} before, {} selected, {} after",
        list.kind,
        before.len(),
        selected.len(),
        after.len()
    );

    let mut attrs = list.attrs.clone();
    attrs.insert(ATTR_INDENT.to_string(), Value::from(indent));
    let mut nodes: Vec<Node> = Vec::new();
    if !before.is_empty() {
        nodes.push(Node::list(list.kind.clone(), list.attrs.clone(), before));
    }
    nodes.push(Node::list(list.kind.clone(), attrs, selected));
    if !after.is_empty() {
        nodes.push(Node::list(list.kind.clone(), list.attrs.clone(), after));
    }
    tr.delete(pos, end)?.insert(pos, nodes)
}

pub(crate) fn try_set_node_indent_markup(
    tr: Transform,
    pos: usize,
    delta: i64,
) -> Result<Transform, TransformError> {
    let Some(Node::Element(el)) = tr.doc().node_at(pos) else {
        return Ok(tr);
    };
    let current = indent_of(el);
    let indent = tr.schema().indent_bounds().clamp((current as i64).saturating_add(delta));
    if indent == current {
        return Ok(tr);
    }
    let (kind, mut attrs, marks) = (el.kind.clone(), el.attrs.clone(), el.marks.clone());
    attrs.insert(ATTR_INDENT.to_string(), Value::from(indent));
    tr.set_node_markup(pos, &kind, attrs, marks)
}
