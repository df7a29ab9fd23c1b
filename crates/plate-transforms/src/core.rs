use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{ATTR_INDENT, ATTR_LEVEL, HEADING, LIST_ITEM, PARAGRAPH};

pub type Attrs = BTreeMap<String, serde_json::Value>;
pub type ElementKind = String;

pub const TEXT_KIND: &str = "text";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub kind: String,
    #[serde(default)]
    pub attrs: Attrs,
}

impl Mark {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Attrs::default(),
        }
    }

    pub fn with_attrs(kind: impl Into<String>, attrs: Attrs) -> Self {
        Self {
            kind: kind.into(),
            attrs,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn is_overridden(&self) -> bool {
        self.attrs
            .get(crate::schema::ATTR_OVERRIDDEN)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// Marks attached to an inline node. `add` keeps at most one mark per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Marks(Vec<Mark>);

impl Marks {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mark> {
        self.0.iter()
    }

    pub fn find(&self, kind: &str) -> Option<&Mark> {
        self.0.iter().find(|m| m.kind == kind)
    }

    pub fn contains_kind(&self, kind: &str) -> bool {
        self.find(kind).is_some()
    }

    pub fn add(&mut self, mark: Mark) {
        match self.0.iter_mut().find(|m| m.kind == mark.kind) {
            Some(existing) => *existing = mark,
            None => self.0.push(mark),
        }
    }

    pub fn remove_kind(&mut self, kind: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|m| m.kind != kind);
        before != self.0.len()
    }

    pub fn remove(&mut self, mark: &Mark) -> bool {
        let before = self.0.len();
        self.0.retain(|m| m != mark);
        before != self.0.len()
    }
}

impl FromIterator<Mark> for Marks {
    fn from_iter<I: IntoIterator<Item = Mark>>(iter: I) -> Self {
        let mut marks = Marks::new();
        for mark in iter {
            marks.add(mark);
        }
        marks
    }
}

impl<'a> IntoIterator for &'a Marks {
    type Item = &'a Mark;
    type IntoIter = std::slice::Iter<'a, Mark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Void(VoidNode),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks: Marks::default(),
        })
    }

    pub fn styled_text(text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks,
        })
    }

    pub fn element(kind: impl Into<String>, attrs: Attrs, children: Vec<Node>) -> Self {
        Node::Element(ElementNode {
            kind: kind.into(),
            attrs,
            children,
            marks: Marks::default(),
        })
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        let text = text.into();
        let children = if text.is_empty() {
            Vec::new()
        } else {
            vec![Node::text(text)]
        };
        Node::element(PARAGRAPH, Attrs::default(), children)
    }

    pub fn heading(level: u64, text: impl Into<String>) -> Self {
        let mut attrs = Attrs::default();
        attrs.insert(ATTR_LEVEL.to_string(), Value::from(level));
        let text = text.into();
        let children = if text.is_empty() {
            Vec::new()
        } else {
            vec![Node::text(text)]
        };
        Node::element(HEADING, attrs, children)
    }

    pub fn list_item(children: Vec<Node>) -> Self {
        Node::element(LIST_ITEM, Attrs::default(), children)
    }

    pub fn list(kind: impl Into<String>, attrs: Attrs, items: Vec<Node>) -> Self {
        Node::element(kind, attrs, items)
    }

    pub fn kind(&self) -> &str {
        match self {
            Node::Element(el) => &el.kind,
            Node::Void(v) => &v.kind,
            Node::Text(_) => TEXT_KIND,
        }
    }

    pub fn attrs(&self) -> Option<&Attrs> {
        match self {
            Node::Element(el) => Some(&el.attrs),
            Node::Void(v) => Some(&v.attrs),
            Node::Text(_) => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs().and_then(|attrs| attrs.get(key))
    }

    pub fn attr_u64(&self, key: &str) -> Option<u64> {
        self.attr(key).and_then(|v| v.as_u64())
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attr(key).and_then(|v| v.as_str())
    }

    pub fn indent(&self) -> u64 {
        self.attr_u64(ATTR_INDENT).unwrap_or(0)
    }

    pub fn marks(&self) -> &Marks {
        match self {
            Node::Element(el) => &el.marks,
            Node::Text(t) => &t.marks,
            Node::Void(v) => &v.marks,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            Node::Text(_) | Node::Void(_) => &[],
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Node::Element(el) => el.content_size() + 2,
            Node::Text(t) => t.len(),
            Node::Void(_) => 1,
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.text.clone(),
            Node::Element(el) => el.children.iter().map(Node::text_content).collect(),
            Node::Void(_) => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Marks::is_empty")]
    pub marks: Marks,
}

impl ElementNode {
    pub fn content_size(&self) -> usize {
        content_size(&self.children)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Marks::is_empty")]
    pub marks: Marks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

impl TextNode {
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Result of a `nodes_between` visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    SkipChildren,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn content_size(&self) -> usize {
        content_size(&self.children)
    }

    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let mut children: &[Node] = &self.children;
        let mut pos = pos;
        loop {
            let (index, offset) = find_index(children, pos)?;
            let node = children.get(index)?;
            if offset == pos || node.is_text() {
                return Some(node);
            }
            match node {
                Node::Element(el) => {
                    children = &el.children;
                    pos -= offset + 1;
                }
                Node::Text(_) | Node::Void(_) => return None,
            }
        }
    }

    pub fn nodes_between<'a, F>(&'a self, from: usize, to: usize, mut visit: F)
    where
        F: FnMut(&'a Node, usize, Option<&'a ElementNode>, usize) -> Visit,
    {
        walk_between(&self.children, None, from, to, 0, &mut visit);
    }

    pub fn descendants<'a, F>(&'a self, visit: F)
    where
        F: FnMut(&'a Node, usize, Option<&'a ElementNode>, usize) -> Visit,
    {
        self.nodes_between(0, self.content_size(), visit);
    }

    pub fn resolve(&self, pos: usize) -> Option<ResolvedPos<'_>> {
        if pos > self.content_size() {
            return None;
        }

        let mut levels: Vec<Level<'_>> = Vec::new();
        let mut node: Option<&ElementNode> = None;
        let mut children: &[Node] = &self.children;
        let mut start = 0usize;
        let mut parent_offset = pos;

        loop {
            let (index, offset) = find_index(children, parent_offset)?;
            let rem = parent_offset - offset;
            levels.push(Level {
                node,
                children,
                index,
                child_pos: start + offset,
            });
            if rem == 0 {
                break;
            }
            match children.get(index) {
                Some(Node::Element(el)) => {
                    node = Some(el);
                    children = &el.children;
                    parent_offset = rem - 1;
                    start += offset + 1;
                }
                _ => break,
            }
        }

        Some(ResolvedPos {
            pos,
            levels,
            parent_offset,
        })
    }

    pub fn range_has_mark(&self, from: usize, to: usize, kind: &str) -> bool {
        let mut found = false;
        if to > from {
            self.nodes_between(from, to, |node, _, _, _| {
                if node.marks().contains_kind(kind) {
                    found = true;
                    return Visit::Stop;
                }
                Visit::Continue
            });
        }
        found
    }

    pub fn marks_at(&self, pos: usize) -> Marks {
        let Some(resolved) = self.resolve(pos) else {
            return Marks::default();
        };
        if resolved.text_offset() > 0 {
            return resolved
                .node_after()
                .map(|n| n.marks().clone())
                .unwrap_or_default();
        }
        resolved
            .node_before()
            .or_else(|| resolved.node_after())
            .filter(|n| !matches!(n, Node::Element(_)))
            .map(|n| n.marks().clone())
            .unwrap_or_default()
    }

    pub fn text_between(&self, from: usize, to: usize) -> String {
        let mut out = String::new();
        self.nodes_between(from, to, |node, pos, _, _| {
            if let Node::Text(t) = node {
                let start = from.saturating_sub(pos);
                let end = (to - pos).min(t.len());
                out.extend(t.text.chars().skip(start).take(end.saturating_sub(start)));
            }
            Visit::Continue
        });
        out
    }
}

pub(crate) fn content_size(children: &[Node]) -> usize {
    children.iter().map(Node::size).sum()
}

fn find_index(children: &[Node], pos: usize) -> Option<(usize, usize)> {
    if pos == 0 {
        return Some((0, 0));
    }
    let size = content_size(children);
    if pos == size {
        return Some((children.len(), pos));
    }
    if pos > size {
        return None;
    }
    let mut cur = 0usize;
    for (ix, child) in children.iter().enumerate() {
        let end = cur + child.size();
        if end >= pos {
            if end == pos {
                return Some((ix + 1, end));
            }
            return Some((ix, cur));
        }
        cur = end;
    }
    None
}

fn walk_between<'a, F>(
    children: &'a [Node],
    parent: Option<&'a ElementNode>,
    from: usize,
    to: usize,
    node_start: usize,
    visit: &mut F,
) -> bool
where
    F: FnMut(&'a Node, usize, Option<&'a ElementNode>, usize) -> Visit,
{
    let mut pos = 0usize;
    for (index, child) in children.iter().enumerate() {
        if pos >= to {
            break;
        }
        let end = pos + child.size();
        if end > from {
            match visit(child, node_start + pos, parent, index) {
                Visit::Stop => return false,
                Visit::SkipChildren => {}
                Visit::Continue => {
                    if let Node::Element(el) = child {
                        let inner = el.content_size();
                        if inner > 0 {
                            let start = pos + 1;
                            let keep_going = walk_between(
                                &el.children,
                                Some(el),
                                from.saturating_sub(start),
                                inner.min(to - start),
                                node_start + start,
                                visit,
                            );
                            if !keep_going {
                                return false;
                            }
                        }
                    }
                }
            }
        }
        pos = end;
    }
    true
}

struct Level<'a> {
    node: Option<&'a ElementNode>,
    children: &'a [Node],
    index: usize,
    child_pos: usize,
}

/// A position resolved against the tree. Depth 0 is the document root.
pub struct ResolvedPos<'a> {
    pub pos: usize,
    levels: Vec<Level<'a>>,
    pub parent_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn node(&self, depth: usize) -> Option<&'a ElementNode> {
        self.levels.get(depth).and_then(|level| level.node)
    }

    pub fn parent(&self) -> Option<&'a ElementNode> {
        self.node(self.depth())
    }

    pub fn kind(&self, depth: usize) -> &'a str {
        self.node(depth)
            .map(|el| el.kind.as_str())
            .unwrap_or(crate::schema::DOC)
    }

    pub fn parent_kind(&self) -> &'a str {
        self.kind(self.depth())
    }

    pub fn index(&self, depth: usize) -> usize {
        self.levels.get(depth).map(|level| level.index).unwrap_or(0)
    }

    pub fn start(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            return Some(0);
        }
        self.before(depth).map(|pos| pos + 1)
    }

    pub fn before(&self, depth: usize) -> Option<usize> {
        if depth == 0 || depth > self.depth() {
            return None;
        }
        self.levels.get(depth - 1).map(|level| level.child_pos)
    }

    pub fn siblings(&self) -> &'a [Node] {
        self.levels[self.depth()].children
    }

    pub fn text_offset(&self) -> usize {
        let level = &self.levels[self.depth()];
        self.pos - level.child_pos
    }

    pub fn node_after(&self) -> Option<&'a Node> {
        let level = &self.levels[self.depth()];
        level.children.get(level.index)
    }

    pub fn node_before(&self) -> Option<&'a Node> {
        let level = &self.levels[self.depth()];
        if self.text_offset() > 0 {
            return level.children.get(level.index);
        }
        level
            .index
            .checked_sub(1)
            .and_then(|ix| level.children.get(ix))
    }

    pub fn find_ancestor(&self, pred: impl Fn(&ElementNode) -> bool) -> Option<(usize, &'a ElementNode)> {
        (1..=self.depth())
            .rev()
            .filter_map(|depth| self.node(depth).map(|el| (depth, el)))
            .find(|(_, el)| pred(el))
    }
}
