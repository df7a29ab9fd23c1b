use std::collections::HashMap;

use log::debug;
use serde_json::Value;

use crate::core::{Attrs, Document, ElementNode, Mark, Node, Visit};
use crate::error::{or_unchanged, TransformError};
use crate::schema::{
    Schema, ATTR_INDENT, ATTR_LEVEL, ATTR_OVERRIDDEN_INDENT, ATTR_OVERRIDDEN_INDENT_VALUE,
    ATTR_STYLE_NAME, DOC, HEADING, MARK_EM, MARK_FONT_SIZE, MARK_FONT_TYPE, MARK_OVERRIDE,
    MARK_STRIKE, MARK_STRONG, MARK_SUB, MARK_SUPER, MARK_TEXT_COLOR, MARK_TEXT_HIGHLIGHT,
    MARK_UNDERLINE, PARAGRAPH,
};
use crate::style::{Style, StyleLookup, NORMAL_STYLE};
use crate::transform::{SelectionRange, Transform};

/// Inline formatting that clearing reverts to the paragraph style.
pub const FORMAT_MARK_KINDS: &[&str] = &[
    MARK_EM,
    MARK_FONT_SIZE,
    MARK_FONT_TYPE,
    MARK_STRIKE,
    MARK_STRONG,
    MARK_TEXT_COLOR,
    MARK_TEXT_HIGHLIGHT,
    MARK_UNDERLINE,
    MARK_SUPER,
    MARK_SUB,
];

pub fn apply_mark(
    tr: Transform,
    kind: &str,
    attrs: Option<Attrs>,
    is_custom_style_applied: bool,
) -> Transform {
    or_unchanged("apply_mark", tr, |tr| {
        try_apply_mark(tr, kind, attrs, is_custom_style_applied)
    })
}

pub fn clear_marks(tr: Transform, styles: &dyn StyleLookup) -> Transform {
    or_unchanged("clear_marks", tr, |tr| try_clear_marks(tr, styles))
}

pub fn clear_heading(tr: Transform) -> Transform {
    or_unchanged("clear_heading", tr, try_clear_heading)
}

pub fn toggle_custom_style(tr: Transform, style_name: &str, styles: &dyn StyleLookup) -> Transform {
    or_unchanged("toggle_custom_style", tr, |tr| {
        try_toggle_custom_style(tr, style_name, styles)
    })
}

/// Whether `mark` already carries the value `style` defines for its kind.
pub fn compare_marks(mark: &Mark, style: Option<&Style>) -> bool {
    style.is_some_and(|style| style.styles.matches(mark))
}

fn mark_applies(doc: &Document, schema: &Schema, ranges: &[SelectionRange], kind: &str) -> bool {
    ranges.iter().any(|range| {
        let Some(from) = doc.resolve(range.from) else {
            return false;
        };
        let mut can = from.depth() == 0 && schema.allows_mark(DOC, kind);
        if !can {
            doc.nodes_between(range.from, range.to, |node, _, _, _| {
                if let Node::Element(el) = node {
                    if schema.is_text_block(&el.kind) && schema.allows_mark(&el.kind, kind) {
                        can = true;
                        return Visit::Stop;
                    }
                }
                Visit::Continue
            });
        }
        can
    })
}

pub(crate) fn try_apply_mark(
    tr: Transform,
    kind: &str,
    attrs: Option<Attrs>,
    is_custom_style_applied: bool,
) -> Result<Transform, TransformError> {
    if kind.is_empty() || !tr.schema().has_mark(kind) {
        return Ok(tr);
    }
    let Some(selection) = tr.selection().cloned() else {
        return Ok(tr);
    };
    let cursor = selection.cursor_pos();
    let ranges = selection.ranges();
    if (selection.is_empty() && cursor.is_none())
        || !mark_applies(tr.doc(), tr.schema(), &ranges, kind)
    {
        return Ok(tr);
    }

    if cursor.is_some() {
        let tr = tr.remove_stored_mark(kind);
        return Ok(match attrs {
            Some(attrs) => tr.add_stored_mark(Mark::with_attrs(kind, attrs)),
            None => tr,
        });
    }

    let has = ranges
        .iter()
        .any(|r| tr.doc().range_has_mark(r.from, r.to, kind));

    let mut tr = tr;
    for range in &ranges {
        if has && !is_custom_style_applied {
            tr = tr.remove_mark_kind(range.from, range.to, kind)?;
        }
        if let Some(attrs) = &attrs {
            tr = tr.add_mark(range.from, range.to, Mark::with_attrs(kind, attrs.clone()))?;
        }
    }
    Ok(tr)
}

struct Removal {
    from: usize,
    to: usize,
    kind: String,
    restore: Option<Mark>,
}

fn style_name(attrs: &Attrs) -> Option<&str> {
    attrs.get(ATTR_STYLE_NAME).and_then(|v| v.as_str())
}

// Multi-paragraph selections are only cleared when every paragraph is plain.
fn crosses_styled_paragraphs(doc: &Document, from: usize, to: usize) -> bool {
    let mut count = 0usize;
    let mut styled = false;
    doc.nodes_between(from, to, |node, _, _, _| {
        let Node::Element(el) = node else {
            return Visit::Continue;
        };
        if el.kind != PARAGRAPH {
            return Visit::Continue;
        }
        count += 1;
        if style_name(&el.attrs).is_some_and(|name| name != NORMAL_STYLE) {
            styled = true;
        }
        Visit::SkipChildren
    });
    count > 1 && styled
}

pub(crate) fn try_clear_marks(
    tr: Transform,
    styles: &dyn StyleLookup,
) -> Result<Transform, TransformError> {
    let Some(selection) = tr.selection() else {
        return Ok(tr);
    };
    if selection.is_empty() {
        return Ok(tr);
    }
    let (from, to) = (selection.from(), selection.to());
    if crosses_styled_paragraphs(tr.doc(), from, to) {
        debug!("clear_marks: selection {from}..{to} crosses styled paragraphs, skipping");
        return Ok(tr);
    }

    let mut cache: HashMap<String, Option<Style>> = HashMap::new();
    let mut lookup = |name: Option<&str>| -> Option<Style> {
        let name = name?;
        cache
            .entry(name.to_string())
            .or_insert_with(|| styles.style_by_name(name))
            .clone()
    };

    let mut removals: Vec<Removal> = Vec::new();
    let mut indent_resets: Vec<(usize, ElementNode, Option<Style>)> = Vec::new();
    {
        let schema = tr.schema();
        tr.doc().nodes_between(from, to, |node, pos, parent, _| {
            if let Node::Element(el) = node {
                let overridden = el
                    .attrs
                    .get(ATTR_OVERRIDDEN_INDENT)
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                if overridden {
                    indent_resets.push((pos, el.clone(), lookup(style_name(&el.attrs))));
                }
                return Visit::Continue;
            }
            if node.marks().is_empty() {
                return Visit::Continue;
            }

            let style = lookup(parent.and_then(|p| style_name(&p.attrs)));
            let span = (from.max(pos), to.min(pos + node.size()));
            let restore = |kind: &str| style.as_ref().and_then(|s| s.styles.mark_for(kind));
            for mark in node.marks() {
                if mark.kind == MARK_OVERRIDE {
                    removals.push(Removal {
                        from: span.0,
                        to: span.1,
                        kind: MARK_OVERRIDE.to_string(),
                        restore: None,
                    });
                    for key in mark.attrs.keys().filter(|key| schema.has_mark(key)) {
                        removals.push(Removal {
                            from: span.0,
                            to: span.1,
                            kind: key.clone(),
                            restore: restore(key),
                        });
                    }
                    continue;
                }
                if !FORMAT_MARK_KINDS.contains(&mark.kind.as_str()) {
                    continue;
                }
                if mark.is_overridden() && !compare_marks(mark, style.as_ref()) {
                    removals.push(Removal {
                        from: span.0,
                        to: span.1,
                        kind: mark.kind.clone(),
                        restore: restore(&mark.kind),
                    });
                }
            }
            Visit::Continue
        });
    }

    if removals.is_empty() && indent_resets.is_empty() {
        return Ok(tr);
    }
    debug!(
        "clear_marks: {} mark removals, {} indent resets",
        removals.len(),
        indent_resets.len()
    );

    let mut tr = tr;
    for removal in &removals {
        tr = tr.remove_mark_kind(removal.from, removal.to, &removal.kind)?;
    }
    for removal in removals {
        if let Some(mark) = removal.restore {
            tr = tr.add_mark(removal.from, removal.to, mark)?;
        }
    }
    for (pos, el, style) in indent_resets {
        let indent = style
            .and_then(|s| s.styles.indent)
            .or_else(|| el.attrs.get(ATTR_OVERRIDDEN_INDENT_VALUE).and_then(|v| v.as_u64()))
            .unwrap_or(0);
        let mut attrs = el.attrs.clone();
        attrs.remove(ATTR_OVERRIDDEN_INDENT);
        attrs.remove(ATTR_OVERRIDDEN_INDENT_VALUE);
        attrs.insert(ATTR_INDENT.to_string(), Value::from(indent));
        tr = tr.set_node_markup(pos, &el.kind, attrs, el.marks.clone())?;
    }
    Ok(tr)
}

fn try_clear_heading(tr: Transform) -> Result<Transform, TransformError> {
    let Some(selection) = tr.selection() else {
        return Ok(tr);
    };
    if selection.is_empty() || !tr.schema().has_node(PARAGRAPH) {
        return Ok(tr);
    }
    let mut headings: Vec<(usize, ElementNode)> = Vec::new();
    tr.doc()
        .nodes_between(selection.from(), selection.to(), |node, pos, _, _| {
            if let Node::Element(el) = node {
                if el.kind == HEADING {
                    headings.push((pos, el.clone()));
                }
            }
            Visit::Continue
        });

    let mut tr = tr;
    for (pos, el) in headings {
        let mut attrs = el.attrs;
        attrs.remove(ATTR_LEVEL);
        tr = tr.set_node_markup(pos, PARAGRAPH, attrs, el.marks)?;
    }
    Ok(tr)
}

fn try_toggle_custom_style(
    tr: Transform,
    name: &str,
    styles: &dyn StyleLookup,
) -> Result<Transform, TransformError> {
    let Some(style) = styles.style_by_name(name) else {
        return Ok(tr);
    };
    let Some(selection) = tr.selection() else {
        return Ok(tr);
    };

    let mut blocks: Vec<(usize, ElementNode)> = Vec::new();
    tr.doc()
        .nodes_between(selection.from(), selection.to(), |node, pos, _, _| match node {
            Node::Element(el) if tr.schema().is_text_block(&el.kind) => {
                blocks.push((pos, el.clone()));
                Visit::SkipChildren
            }
            _ => Visit::Continue,
        });

    let mut tr = tr;
    for (pos, el) in blocks {
        let mut attrs = el.attrs;
        attrs.insert(ATTR_STYLE_NAME.to_string(), Value::String(name.to_string()));
        if let Some(indent) = style.styles.indent {
            attrs.insert(ATTR_INDENT.to_string(), Value::from(indent));
            attrs.remove(ATTR_OVERRIDDEN_INDENT);
            attrs.remove(ATTR_OVERRIDDEN_INDENT_VALUE);
        }
        tr = tr.set_node_markup(pos, &el.kind, attrs, el.marks)?;
    }

    for kind in FORMAT_MARK_KINDS {
        if let Some(mark) = style.styles.mark_for(kind) {
            tr = try_apply_mark(tr, kind, Some(mark.attrs), true)?;
        }
    }
    Ok(tr)
}
