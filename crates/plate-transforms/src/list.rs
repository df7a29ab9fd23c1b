use log::debug;
use serde_json::Value;

use crate::consolidate::try_consolidate_list_nodes;
use crate::core::{Attrs, ElementNode, Node, Visit};
use crate::error::{or_unchanged, TransformError};
use crate::schema::{
    ATTR_INDENT, ATTR_LEVEL, ATTR_LIST_STYLE_TYPE, ATTR_START, HEADING, LIST_ITEM, PARAGRAPH,
    TABLE, TOKEN_ATTR,
};
use crate::transform::Transform;

/// Rewrites a block lifted out of a list before it is reinserted.
pub type Remap<'a> = &'a dyn Fn(Node) -> Node;

pub fn toggle_list(tr: Transform, list_kind: &str, list_style_type: Option<&str>) -> Transform {
    or_unchanged("toggle_list", tr, |tr| {
        try_toggle_list(tr, list_kind, list_style_type)
    })
}

pub fn wrap_nodes_with_list(
    tr: Transform,
    list_kind: &str,
    list_style_type: Option<&str>,
) -> Transform {
    or_unchanged("wrap_nodes_with_list", tr, |tr| {
        let Some(selection) = tr.selection() else {
            return Ok(tr);
        };
        let (from, to) = (selection.from(), selection.to());
        let tr = wrap_range(tr, list_kind, list_style_type, from, to)?;
        try_consolidate_list_nodes(tr)
    })
}

pub fn unwrap_nodes_from_list(tr: Transform, list_pos: usize, remap: Option<Remap<'_>>) -> Transform {
    or_unchanged("unwrap_nodes_from_list", tr, |tr| {
        let Some(selection) = tr.selection() else {
            return Ok(tr);
        };
        let (from, to) = (selection.from(), selection.to());
        let tr = unwrap_list_range(tr, list_pos, from, to, remap)?;
        try_consolidate_list_nodes(tr)
    })
}

/// Wraps the blocks starting at `positions` (adjacent siblings, in document
/// order) into one list of `list_kind`.
pub fn wrap_items_with_list_internal(
    tr: Transform,
    list_kind: &str,
    list_style_type: Option<&str>,
    positions: &[usize],
) -> Transform {
    or_unchanged("wrap_items_with_list_internal", tr, |tr| {
        wrap_items(tr, list_kind, list_style_type, positions)
    })
}

fn try_toggle_list(
    tr: Transform,
    list_kind: &str,
    list_style_type: Option<&str>,
) -> Result<Transform, TransformError> {
    if !tr.schema().is_list_kind(list_kind) {
        return Err(TransformError::UnknownNodeKind(list_kind.to_string()));
    }
    let Some(selection) = tr.selection() else {
        return Ok(tr);
    };
    let (mut from, mut to) = (selection.from(), selection.to());
    let size = tr.doc().content_size();
    if from == 0 && to != 0 {
        // Keep the range off the root boundaries.
        from = 1.min(size);
        if to >= size {
            to = size.saturating_sub(1).max(from);
        }
    }

    let Some(resolved) = tr.doc().resolve(from) else {
        return Ok(tr);
    };
    if resolved.find_ancestor(|el| el.kind == list_kind).is_some() {
        let mut lists: Vec<usize> = Vec::new();
        tr.doc().nodes_between(from, to, |node, pos, _, _| {
            if node.kind() == list_kind {
                lists.push(pos);
                return Visit::SkipChildren;
            }
            Visit::Continue
        });
        debug!("toggle_list: unwrapping {} {list_kind} node(s)", lists.len());
        let mut tr = tr;
        for pos in lists.into_iter().rev() {
            tr = unwrap_list_range(tr, pos, from, to, None)?;
        }
        return try_consolidate_list_nodes(tr);
    }

    if resolved
        .find_ancestor(|el| el.kind == PARAGRAPH || el.kind == HEADING)
        .is_some()
    {
        let tr = wrap_range(tr, list_kind, list_style_type, from, to)?;
        return try_consolidate_list_nodes(tr);
    }
    Ok(tr)
}

fn style_attrs(mut attrs: Attrs, list_style_type: Option<&str>) -> Attrs {
    if let Some(style) = list_style_type {
        attrs.insert(
            ATTR_LIST_STYLE_TYPE.to_string(),
            Value::String(style.to_string()),
        );
    }
    attrs
}

fn fresh_list_attrs(indent: u64, list_style_type: Option<&str>) -> Attrs {
    let mut attrs = Attrs::default();
    attrs.insert(ATTR_INDENT.to_string(), Value::from(indent));
    attrs.insert(ATTR_START.to_string(), Value::from(1u64));
    style_attrs(attrs, list_style_type)
}

pub(crate) fn wrap_range(
    tr: Transform,
    list_kind: &str,
    list_style_type: Option<&str>,
    from: usize,
    to: usize,
) -> Result<Transform, TransformError> {
    let schema = tr.schema();
    let mut runs: Vec<Vec<usize>> = Vec::new();
    let mut run: Vec<usize> = Vec::new();
    let mut run_end: Option<usize> = None;
    let mut retype: Vec<(usize, ElementNode)> = Vec::new();

    tr.doc().nodes_between(from, to, |node, pos, _, _| {
        if let Node::Element(el) = node {
            if el.kind == PARAGRAPH || el.kind == HEADING {
                if run_end != Some(pos) && !run.is_empty() {
                    runs.push(std::mem::take(&mut run));
                }
                run.push(pos);
                run_end = Some(pos + node.size());
                return Visit::SkipChildren;
            }
        }
        if !run.is_empty() {
            runs.push(std::mem::take(&mut run));
        }
        run_end = None;
        match node {
            Node::Element(el) if schema.is_list_kind(&el.kind) => {
                if el.kind != list_kind {
                    retype.push((pos, el.clone()));
                }
                Visit::SkipChildren
            }
            Node::Element(el) if el.kind == TABLE => Visit::SkipChildren,
            _ => Visit::Continue,
        }
    });
    if !run.is_empty() {
        runs.push(run);
    }

    let mut tr = tr;
    for (pos, el) in retype {
        let attrs = style_attrs(el.attrs, list_style_type);
        tr = tr.set_node_markup(pos, list_kind, attrs, el.marks)?;
    }
    debug!("wrap_nodes_with_list: {} run(s) into {list_kind}", runs.len());
    for run in runs.iter().rev() {
        tr = wrap_items(tr, list_kind, list_style_type, run)?;
    }
    Ok(tr)
}

fn has_token(node: &Node, token: u64) -> bool {
    node.attr(TOKEN_ATTR).and_then(|v| v.as_u64()) == Some(token)
}

fn wrap_items(
    tr: Transform,
    list_kind: &str,
    list_style_type: Option<&str>,
    positions: &[usize],
) -> Result<Transform, TransformError> {
    if positions.is_empty() {
        return Ok(tr);
    }
    let mut tr = tr;
    let token = tr.issue_token();
    for &pos in positions {
        let Some(Node::Element(el)) = tr.doc().node_at(pos).cloned() else {
            return Err(TransformError::NoNodeAt(pos));
        };
        let mut attrs = el.attrs;
        attrs.remove(ATTR_LEVEL);
        attrs.insert(TOKEN_ATTR.to_string(), Value::from(token));
        tr = tr.set_node_markup(pos, PARAGRAPH, attrs, el.marks)?;
    }

    let mut range: Option<(usize, usize)> = None;
    let mut items: Vec<Node> = Vec::new();
    tr.doc().descendants(|node, pos, _, _| {
        if !has_token(node, token) {
            return Visit::Continue;
        }
        let end = pos + node.size();
        range = Some(range.map_or((pos, end), |(from, _)| (from, end)));
        let mut block = node.clone();
        if let Node::Element(el) = &mut block {
            el.attrs.remove(TOKEN_ATTR);
        }
        items.push(Node::list_item(vec![block]));
        Visit::SkipChildren
    });
    let Some((from, to)) = range else {
        return Ok(tr);
    };

    let (prev, next) = {
        let doc = tr.doc();
        let prev = doc
            .resolve(from)
            .and_then(|r| r.node_before().cloned())
            .filter(|n| n.kind() == list_kind);
        let next = doc
            .resolve(to)
            .and_then(|r| r.node_after().cloned())
            .filter(|n| n.kind() == list_kind);
        (prev, next)
    };

    tr = tr.delete(from, to)?;
    match (prev, next) {
        (Some(prev), next) if prev.indent() == 0 => {
            if let Some(next) = next.filter(|n| n.children().is_empty()) {
                tr = tr.delete(from, from + next.size())?;
            }
            tr.insert(from - 1, items)
        }
        (_, Some(next)) if next.indent() == 0 => tr.insert(from + 1, items),
        _ => {
            let list = Node::list(list_kind, fresh_list_attrs(0, list_style_type), items);
            tr.insert(from, vec![list])
        }
    }
}

/// Groups lifted blocks back into list items, one item per original item.
fn regroup(list: &ElementNode, bucket: Vec<(usize, Node)>) -> Vec<Node> {
    let mut items: Vec<Node> = Vec::new();
    let mut current: Option<usize> = None;
    for (index, block) in bucket {
        if current == Some(index) {
            if let Some(Node::Element(item)) = items.last_mut() {
                item.children.push(block);
                continue;
            }
        }
        let attrs = list.children[index].attrs().cloned().unwrap_or_default();
        items.push(Node::element(LIST_ITEM, attrs, vec![block]));
        current = Some(index);
    }
    items
}

pub(crate) fn unwrap_list_range(
    tr: Transform,
    list_pos: usize,
    from: usize,
    to: usize,
    remap: Option<Remap<'_>>,
) -> Result<Transform, TransformError> {
    let list = match tr.doc().node_at(list_pos) {
        Some(Node::Element(el)) if tr.schema().is_list_kind(&el.kind) => el.clone(),
        Some(_) => return Err(TransformError::NotAList(list_pos)),
        None => return Err(TransformError::NoNodeAt(list_pos)),
    };

    let mut before: Vec<(usize, Node)> = Vec::new();
    let mut selected: Vec<Node> = Vec::new();
    let mut after: Vec<(usize, Node)> = Vec::new();
    let mut item_pos = list_pos + 1;
    for (index, item) in list.children.iter().enumerate() {
        let mut pos = item_pos + 1;
        for block in item.children() {
            let end = pos + block.size();
            if end <= from {
                before.push((index, block.clone()));
            } else if pos >= to && pos > from {
                after.push((index, block.clone()));
            } else {
                selected.push(block.clone());
            }
            pos = end;
        }
        item_pos += item.size();
    }
    if selected.is_empty() {
        return Ok(tr);
    }
    debug!(
        "unwrap {} at {list_pos}: {} before, {} selected, {} after",
        list.kind,
        before.len(),
        selected.len(),
        after.len()
    );

    let mut nodes: Vec<Node> = Vec::new();
    if !before.is_empty() {
        nodes.push(Node::list(
            list.kind.clone(),
            list.attrs.clone(),
            regroup(&list, before),
        ));
    }
    nodes.extend(selected.into_iter().map(|block| match remap {
        Some(remap) => remap(block),
        None => block,
    }));
    if !after.is_empty() {
        let style = list.attrs.get(ATTR_LIST_STYLE_TYPE).and_then(|v| v.as_str());
        let indent = list.attrs.get(ATTR_INDENT).and_then(|v| v.as_u64()).unwrap_or(0);
        nodes.push(Node::list(
            list.kind.clone(),
            fresh_list_attrs(indent, style),
            regroup(&list, after),
        ));
    }

    let list_end = list_pos + list.content_size() + 2;
    tr.delete(list_pos, list_end)?.insert(list_pos, nodes)
}
