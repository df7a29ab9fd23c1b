use std::collections::BTreeSet;

use log::debug;
use serde_json::Value;

use crate::core::{Document, ElementNode, Node, Visit};
use crate::error::{or_unchanged, TransformError};
use crate::schema::{
    Schema, ATTR_COUNTER_RESET, ATTR_FOLLOWING, ATTR_INDENT, ATTR_NAME, ATTR_START,
};
use crate::transform::Transform;

const COUNTER_LINKED: &str = "none";

struct Joint {
    delete_from: usize,
    delete_to: usize,
    insert_at: usize,
    content: Vec<Node>,
}

pub fn consolidate_list_nodes(tr: Transform) -> Transform {
    or_unchanged("consolidate_list_nodes", tr, try_consolidate_list_nodes)
}

pub fn link_ordered_list_counters(tr: Transform) -> Transform {
    or_unchanged("link_ordered_list_counters", tr, try_link_ordered_list_counters)
}

pub(crate) fn try_consolidate_list_nodes(tr: Transform) -> Result<Transform, TransformError> {
    if tr.is_dry_run() {
        return Ok(tr);
    }
    let mut tr = tr;
    let mut index = 0usize;
    while let Some(joint) = find_joint(tr.doc(), tr.schema(), index) {
        debug!(
            "merging list at {} into the list ending at {}",
            joint.delete_from,
            joint.insert_at + 1
        );
        tr = tr.delete(joint.delete_from, joint.delete_to)?;
        tr = tr.insert(joint.insert_at, joint.content)?;
        index = joint.delete_from;
    }
    try_link_ordered_list_counters(tr)
}

/// Lists are joinable when they share kind and indent.
pub fn is_joinable(schema: &Schema, a: &ElementNode, b: &ElementNode) -> bool {
    a.kind == b.kind && schema.is_list_kind(&a.kind) && indent_of(a) == indent_of(b)
}

fn indent_of(el: &ElementNode) -> u64 {
    el.attrs.get(ATTR_INDENT).and_then(|v| v.as_u64()).unwrap_or(0)
}

fn find_joint(doc: &Document, schema: &Schema, from: usize) -> Option<Joint> {
    let mut prev: Option<(&ElementNode, usize)> = None;
    let mut joint = None;
    doc.nodes_between(from, doc.content_size(), |node, pos, _, _| {
        let el = match node {
            Node::Element(el) if schema.is_list_kind(&el.kind) => el,
            _ => {
                prev = None;
                return Visit::Continue;
            }
        };
        if let Some((before, end)) = prev {
            if end == pos && is_joinable(schema, before, el) {
                joint = Some(Joint {
                    delete_from: pos,
                    delete_to: pos + node.size(),
                    insert_at: pos - 1,
                    content: el.children.clone(),
                });
                return Visit::Stop;
            }
        }
        prev = Some((el, pos + node.size()));
        Visit::SkipChildren
    });
    joint
}

fn try_link_ordered_list_counters(tr: Transform) -> Result<Transform, TransformError> {
    let schema = tr.schema();
    let mut names: BTreeSet<String> = BTreeSet::new();
    let mut island: Vec<(&str, u64)> = Vec::new();
    let mut island_end: Option<usize> = None;
    let mut updates: Vec<(usize, ElementNode, bool)> = Vec::new();

    tr.doc().descendants(|node, pos, _, _| {
        let el = match node {
            Node::Element(el) if schema.is_list_kind(&el.kind) => el,
            _ => {
                island.clear();
                island_end = None;
                return Visit::Continue;
            }
        };
        if island_end != Some(pos) {
            island.clear();
        }
        let indent = indent_of(el);

        if schema.is_ordered_list_kind(&el.kind) {
            let linked = if island.is_empty() {
                el.attrs
                    .get(ATTR_FOLLOWING)
                    .and_then(|v| v.as_str())
                    .is_some_and(|following| names.contains(following))
            } else if el.attrs.get(ATTR_START).and_then(|v| v.as_u64()).unwrap_or(1) == 1 {
                let mut linked = false;
                for &(kind, prev_indent) in island.iter().rev() {
                    if prev_indent < indent {
                        break;
                    }
                    if prev_indent == indent {
                        linked = kind == el.kind;
                        break;
                    }
                }
                linked
            } else {
                false
            };
            updates.push((pos, el.clone(), linked));
        }

        if let Some(name) = el.attrs.get(ATTR_NAME).and_then(|v| v.as_str()) {
            names.insert(name.to_string());
        }
        island.push((&el.kind, indent));
        island_end = Some(pos + node.size());
        Visit::SkipChildren
    });

    let mut tr = tr;
    for (pos, el, linked) in updates {
        let current = el.attrs.get(ATTR_COUNTER_RESET).and_then(|v| v.as_str());
        let wanted = linked.then_some(COUNTER_LINKED);
        if current == wanted {
            continue;
        }
        let mut attrs = el.attrs;
        match wanted {
            Some(value) => {
                attrs.insert(ATTR_COUNTER_RESET.to_string(), Value::String(value.to_string()));
            }
            None => {
                attrs.remove(ATTR_COUNTER_RESET);
            }
        }
        tr = tr.set_node_markup(pos, &el.kind, attrs, el.marks)?;
    }
    Ok(tr)
}
