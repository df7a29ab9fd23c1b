use serde::{Deserialize, Serialize};

use crate::core::{content_size, Attrs, Document, ElementNode, Mark, Marks, Node, TextNode};
use crate::error::TransformError;
use crate::schema::{Schema, DOC};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Replace {
        from: usize,
        to: usize,
        #[serde(default)]
        nodes: Vec<Node>,
    },
    AddMark {
        from: usize,
        to: usize,
        mark: Mark,
    },
    RemoveMark {
        from: usize,
        to: usize,
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<Attrs>,
    },
    SetNodeMarkup {
        pos: usize,
        kind: String,
        #[serde(default)]
        attrs: Attrs,
        #[serde(default)]
        marks: Marks,
    },
}

impl Step {
    pub fn map(&self) -> StepMap {
        match self {
            Step::Replace { from, to, nodes } => StepMap {
                pos: *from,
                old_size: to - from,
                new_size: content_size(nodes),
            },
            Step::AddMark { .. } | Step::RemoveMark { .. } | Step::SetNodeMarkup { .. } => {
                StepMap::identity()
            }
        }
    }

    pub fn apply(&self, doc: &Document, schema: &Schema) -> Result<Document, TransformError> {
        let size = doc.content_size();
        match self {
            Step::Replace { from, to, nodes } => {
                check_range(*from, *to, size)?;
                let children = replace_children(&doc.children, *from, *to, nodes, 0)?;
                Ok(Document { children })
            }
            Step::AddMark { from, to, mark } => {
                check_range(*from, *to, size)?;
                let edit = |parent: &str, marks: &mut Marks| {
                    if schema.allows_mark(parent, &mark.kind) {
                        marks.add(mark.clone());
                    }
                };
                Ok(Document {
                    children: rewrite_marks(&doc.children, DOC, *from, *to, &edit),
                })
            }
            Step::RemoveMark {
                from,
                to,
                kind,
                attrs,
            } => {
                check_range(*from, *to, size)?;
                let edit = |_: &str, marks: &mut Marks| match attrs {
                    Some(attrs) => {
                        marks.remove(&Mark::with_attrs(kind.clone(), attrs.clone()));
                    }
                    None => {
                        marks.remove_kind(kind);
                    }
                };
                Ok(Document {
                    children: rewrite_marks(&doc.children, DOC, *from, *to, &edit),
                })
            }
            Step::SetNodeMarkup {
                pos,
                kind,
                attrs,
                marks,
            } => {
                let children = set_markup(&doc.children, *pos, kind, attrs, marks)
                    .ok_or(TransformError::NoNodeAt(*pos))?;
                Ok(Document { children })
            }
        }
    }
}

/// Position map of a single step: `old_size` positions at `pos` became `new_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    pos: usize,
    old_size: usize,
    new_size: usize,
}

impl StepMap {
    pub fn identity() -> Self {
        Self {
            pos: 0,
            old_size: 0,
            new_size: 0,
        }
    }

    pub fn map(&self, pos: usize) -> usize {
        if self.old_size == 0 && self.new_size == 0 {
            return pos;
        }
        let end = self.pos + self.old_size;
        if pos < self.pos || (pos == self.pos && self.old_size > 0) {
            return pos;
        }
        if pos > end {
            return pos - self.old_size + self.new_size;
        }
        self.pos + self.new_size
    }
}

fn check_range(from: usize, to: usize, size: usize) -> Result<(), TransformError> {
    if from > to || to > size {
        return Err(TransformError::PositionOutOfRange {
            pos: from.max(to),
            size,
        });
    }
    Ok(())
}

fn char_split(text: &str, at: usize) -> (String, String) {
    let ix = text
        .char_indices()
        .nth(at)
        .map(|(ix, _)| ix)
        .unwrap_or(text.len());
    (text[..ix].to_string(), text[ix..].to_string())
}

fn join_texts(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let Node::Text(t) = &node {
            if t.is_empty() {
                continue;
            }
            if let Some(Node::Text(prev)) = out.last_mut() {
                if prev.marks == t.marks {
                    prev.text.push_str(&t.text);
                    continue;
                }
            }
        }
        out.push(node);
    }
    out
}

fn replace_children(
    children: &[Node],
    from: usize,
    to: usize,
    nodes: &[Node],
    base: usize,
) -> Result<Vec<Node>, TransformError> {
    let mut cur = 0usize;
    for (ix, child) in children.iter().enumerate() {
        let end = cur + child.size();
        if let Node::Element(el) = child {
            if cur < from && to < end {
                let inner =
                    replace_children(&el.children, from - cur - 1, to - cur - 1, nodes, base + cur + 1)?;
                let mut out = children.to_vec();
                out[ix] = Node::Element(ElementNode {
                    children: inner,
                    ..el.clone()
                });
                return Ok(out);
            }
        }
        if cur >= to {
            break;
        }
        cur = end;
    }

    let mut before: Vec<Node> = Vec::new();
    let mut after: Vec<Node> = Vec::new();
    let mut cur = 0usize;
    for child in children {
        let end = cur + child.size();
        if end <= from {
            before.push(child.clone());
        } else if cur >= to {
            after.push(child.clone());
        } else if let Node::Text(t) = child {
            if from > cur {
                let (left, _) = char_split(&t.text, from - cur);
                before.push(Node::Text(TextNode {
                    text: left,
                    marks: t.marks.clone(),
                }));
            }
            if to < end {
                let (_, right) = char_split(&t.text, to - cur);
                after.push(Node::Text(TextNode {
                    text: right,
                    marks: t.marks.clone(),
                }));
            }
        } else if from > cur || to < end {
            return Err(TransformError::UnsupportedRange {
                from: base + from,
                to: base + to,
            });
        }
        cur = end;
    }

    let mut out = before;
    out.extend(nodes.iter().cloned());
    out.extend(after);
    Ok(join_texts(out))
}

fn rewrite_marks(
    children: &[Node],
    parent_kind: &str,
    from: usize,
    to: usize,
    edit: &dyn Fn(&str, &mut Marks),
) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(children.len());
    let mut cur = 0usize;
    for child in children {
        let end = cur + child.size();
        if end <= from || cur >= to {
            out.push(child.clone());
            cur = end;
            continue;
        }
        match child {
            Node::Text(t) => {
                let len = t.len();
                let a = from.saturating_sub(cur).min(len);
                let b = (to - cur).min(len);
                let (head, rest) = char_split(&t.text, a);
                let (middle, tail) = char_split(&rest, b - a);
                let mut marks = t.marks.clone();
                edit(parent_kind, &mut marks);
                for (text, marks) in [(head, t.marks.clone()), (middle, marks), (tail, t.marks.clone())] {
                    out.push(Node::Text(TextNode { text, marks }));
                }
            }
            Node::Void(v) => {
                let mut v = v.clone();
                edit(parent_kind, &mut v.marks);
                out.push(Node::Void(v));
            }
            Node::Element(el) => {
                let inner = rewrite_marks(
                    &el.children,
                    &el.kind,
                    from.saturating_sub(cur + 1),
                    to.saturating_sub(cur + 1),
                    edit,
                );
                out.push(Node::Element(ElementNode {
                    children: inner,
                    ..el.clone()
                }));
            }
        }
        cur = end;
    }
    join_texts(out)
}

fn set_markup(
    children: &[Node],
    pos: usize,
    kind: &str,
    attrs: &Attrs,
    marks: &Marks,
) -> Option<Vec<Node>> {
    let mut cur = 0usize;
    for (ix, child) in children.iter().enumerate() {
        let end = cur + child.size();
        if cur == pos {
            let next = match child {
                Node::Element(el) => Node::Element(ElementNode {
                    kind: kind.to_string(),
                    attrs: attrs.clone(),
                    children: el.children.clone(),
                    marks: marks.clone(),
                }),
                Node::Void(_) => Node::Void(crate::core::VoidNode {
                    kind: kind.to_string(),
                    attrs: attrs.clone(),
                    marks: marks.clone(),
                }),
                Node::Text(_) => return None,
            };
            let mut out = children.to_vec();
            out[ix] = next;
            return Some(out);
        }
        if cur < pos && pos < end {
            let Node::Element(el) = child else {
                return None;
            };
            let inner = set_markup(&el.children, pos - cur - 1, kind, attrs, marks)?;
            let mut out = children.to_vec();
            out[ix] = Node::Element(ElementNode {
                children: inner,
                ..el.clone()
            });
            return Some(out);
        }
        cur = end;
    }
    None
}
