use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Attrs, Document, Mark, Marks, Node};
use crate::error::TransformError;
use crate::ops::{Step, StepMap};
use crate::schema::Schema;

pub const META_DRY_RUN: &str = "dryrun";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub from: usize,
    pub to: usize,
}

impl SelectionRange {
    pub fn new(from: usize, to: usize) -> Self {
        Self {
            from: from.min(to),
            to: from.max(to),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Selection {
    Text { anchor: usize, head: usize },
    Cells { ranges: Vec<SelectionRange> },
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Selection::Text {
            anchor: pos,
            head: pos,
        }
    }

    pub fn text(anchor: usize, head: usize) -> Self {
        Selection::Text { anchor, head }
    }

    pub fn from(&self) -> usize {
        match self {
            Selection::Text { anchor, head } => (*anchor).min(*head),
            Selection::Cells { ranges } => ranges.iter().map(|r| r.from).min().unwrap_or(0),
        }
    }

    pub fn to(&self) -> usize {
        match self {
            Selection::Text { anchor, head } => (*anchor).max(*head),
            Selection::Cells { ranges } => ranges.iter().map(|r| r.to).max().unwrap_or(0),
        }
    }

    pub fn head(&self) -> usize {
        match self {
            Selection::Text { head, .. } => *head,
            Selection::Cells { .. } => self.to(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges().iter().all(|r| r.from == r.to)
    }

    /// The collapsed text cursor, if this selection is one.
    pub fn cursor_pos(&self) -> Option<usize> {
        match self {
            Selection::Text { anchor, head } if anchor == head => Some(*head),
            _ => None,
        }
    }

    pub fn ranges(&self) -> Vec<SelectionRange> {
        match self {
            Selection::Text { anchor, head } => vec![SelectionRange::new(*anchor, *head)],
            Selection::Cells { ranges } => ranges.clone(),
        }
    }

    fn map(&self, map: &StepMap, size: usize) -> Self {
        match self {
            Selection::Text { anchor, head } => Selection::Text {
                anchor: map.map(*anchor).min(size),
                head: map.map(*head).min(size),
            },
            Selection::Cells { ranges } => Selection::Cells {
                ranges: ranges
                    .iter()
                    .map(|r| SelectionRange::new(map.map(r.from).min(size), map.map(r.to).min(size)))
                    .collect(),
            },
        }
    }
}

/// An edit log over a base document. Every edit consumes the transform and
/// returns the extended one.
#[derive(Debug, Clone)]
pub struct Transform {
    schema: Arc<Schema>,
    doc_before: Document,
    doc: Document,
    steps: Vec<Step>,
    selection: Option<Selection>,
    stored_marks: Option<Marks>,
    meta: BTreeMap<String, Value>,
    next_token: u64,
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            && self.doc_before == other.doc_before
            && self.doc == other.doc
            && self.steps == other.steps
            && self.selection == other.selection
            && self.stored_marks == other.stored_marks
            && self.meta == other.meta
    }
}

impl Transform {
    pub fn new(schema: Arc<Schema>, doc: Document) -> Self {
        Self {
            schema,
            doc_before: doc.clone(),
            doc,
            steps: Vec::new(),
            selection: None,
            stored_marks: None,
            meta: BTreeMap::new(),
            next_token: 1,
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        let size = self.doc.content_size();
        self.selection = Some(selection.map(&StepMap::identity(), size));
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn doc_before(&self) -> &Document {
        &self.doc_before
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn stored_marks(&self) -> Option<&Marks> {
        self.stored_marks.as_ref()
    }

    pub fn get_meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    pub fn set_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.get_meta(META_DRY_RUN)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn issue_token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        token
    }

    pub fn set_selection(mut self, selection: Selection) -> Result<Self, TransformError> {
        let size = self.doc.content_size();
        if let Some(r) = selection.ranges().iter().find(|r| r.to > size) {
            return Err(TransformError::PositionOutOfRange { pos: r.to, size });
        }
        self.selection = Some(selection);
        Ok(self)
    }

    pub fn set_node_markup(
        self,
        pos: usize,
        kind: &str,
        attrs: Attrs,
        marks: Marks,
    ) -> Result<Self, TransformError> {
        if !self.schema.has_node(kind) {
            return Err(TransformError::UnknownNodeKind(kind.to_string()));
        }
        self.step(Step::SetNodeMarkup {
            pos,
            kind: kind.to_string(),
            attrs,
            marks,
        })
    }

    pub fn add_mark(self, from: usize, to: usize, mark: Mark) -> Result<Self, TransformError> {
        if !self.schema.has_mark(&mark.kind) {
            return Err(TransformError::UnknownMarkKind(mark.kind));
        }
        self.step(Step::AddMark { from, to, mark })
    }

    pub fn remove_mark(self, from: usize, to: usize, mark: &Mark) -> Result<Self, TransformError> {
        self.step(Step::RemoveMark {
            from,
            to,
            kind: mark.kind.clone(),
            attrs: Some(mark.attrs.clone()),
        })
    }

    pub fn remove_mark_kind(self, from: usize, to: usize, kind: &str) -> Result<Self, TransformError> {
        self.step(Step::RemoveMark {
            from,
            to,
            kind: kind.to_string(),
            attrs: None,
        })
    }

    pub fn add_stored_mark(mut self, mark: Mark) -> Self {
        let mut marks = self.current_stored_marks();
        marks.add(mark);
        self.stored_marks = Some(marks);
        self
    }

    pub fn remove_stored_mark(mut self, kind: &str) -> Self {
        let mut marks = self.current_stored_marks();
        marks.remove_kind(kind);
        self.stored_marks = Some(marks);
        self
    }

    pub fn delete(self, from: usize, to: usize) -> Result<Self, TransformError> {
        self.step(Step::Replace {
            from,
            to,
            nodes: Vec::new(),
        })
    }

    pub fn insert(self, pos: usize, nodes: Vec<Node>) -> Result<Self, TransformError> {
        self.step(Step::Replace {
            from: pos,
            to: pos,
            nodes,
        })
    }

    pub fn step(mut self, step: Step) -> Result<Self, TransformError> {
        let doc = step.apply(&self.doc, &self.schema)?;
        if doc == self.doc {
            return Ok(self);
        }
        let map = step.map();
        let size = doc.content_size();
        self.doc = doc;
        self.selection = self.selection.map(|sel| sel.map(&map, size));
        self.stored_marks = None;
        self.steps.push(step);
        Ok(self)
    }

    fn current_stored_marks(&self) -> Marks {
        if let Some(marks) = &self.stored_marks {
            return marks.clone();
        }
        self.selection
            .as_ref()
            .map(|sel| self.doc.marks_at(sel.head()))
            .unwrap_or_default()
    }
}
