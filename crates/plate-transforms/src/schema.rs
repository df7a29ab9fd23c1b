use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const DOC: &str = "doc";
pub const PARAGRAPH: &str = "paragraph";
pub const HEADING: &str = "heading";
pub const BLOCKQUOTE: &str = "blockquote";
pub const BULLET_LIST: &str = "bullet_list";
pub const ORDERED_LIST: &str = "ordered_list";
pub const LIST_ITEM: &str = "list_item";
pub const TABLE: &str = "table";
pub const TABLE_ROW: &str = "table_row";
pub const TABLE_CELL: &str = "table_cell";
pub const HARD_BREAK: &str = "hard_break";
pub const IMAGE: &str = "image";

pub const MARK_STRONG: &str = "strong";
pub const MARK_EM: &str = "em";
pub const MARK_UNDERLINE: &str = "underline";
pub const MARK_STRIKE: &str = "strike";
pub const MARK_SUPER: &str = "superscript";
pub const MARK_SUB: &str = "subscript";
pub const MARK_TEXT_COLOR: &str = "text_color";
pub const MARK_TEXT_HIGHLIGHT: &str = "text_highlight";
pub const MARK_FONT_SIZE: &str = "font_size";
pub const MARK_FONT_TYPE: &str = "font_type";
pub const MARK_LINK: &str = "link";
pub const MARK_OVERRIDE: &str = "override";
pub const MARK_TEXT_SELECTION: &str = "text_selection";

pub const ATTR_INDENT: &str = "indent";
pub const ATTR_LEVEL: &str = "level";
pub const ATTR_START: &str = "start";
pub const ATTR_NAME: &str = "name";
pub const ATTR_FOLLOWING: &str = "following";
pub const ATTR_COUNTER_RESET: &str = "counter_reset";
pub const ATTR_LIST_STYLE_TYPE: &str = "list_style_type";
pub const ATTR_STYLE_NAME: &str = "style_name";
pub const ATTR_OVERRIDDEN: &str = "overridden";
pub const ATTR_OVERRIDDEN_INDENT: &str = "overridden_indent";
pub const ATTR_OVERRIDDEN_INDENT_VALUE: &str = "overridden_indent_value";
pub const ATTR_COLOR: &str = "color";
pub const ATTR_HIGHLIGHT_COLOR: &str = "highlight_color";
pub const ATTR_PT: &str = "pt";
pub const ATTR_FONT_NAME: &str = "name";
pub const ATTR_MARK_ID: &str = "id";

/// Ephemeral correlation attribute. Never survives a public entry point.
pub const TOKEN_ATTR: &str = "__token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    None,
    BlockOnly,
    InlineOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkRule {
    All,
    None,
    Only(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub is_void: bool,
    pub children: ChildConstraint,
    pub marks: MarkRule,
}

impl NodeSpec {
    pub fn block(kind: impl Into<String>, children: ChildConstraint) -> Self {
        let marks = match children {
            ChildConstraint::InlineOnly => MarkRule::All,
            ChildConstraint::BlockOnly | ChildConstraint::None => MarkRule::None,
        };
        Self {
            kind: kind.into(),
            role: NodeRole::Block,
            is_void: false,
            children,
            marks,
        }
    }

    pub fn inline_void(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            role: NodeRole::Inline,
            is_void: true,
            children: ChildConstraint::None,
            marks: MarkRule::None,
        }
    }

    pub fn marks(mut self, marks: MarkRule) -> Self {
        self.marks = marks;
        self
    }

    pub fn allows_mark(&self, kind: &str) -> bool {
        match &self.marks {
            MarkRule::All => true,
            MarkRule::None => false,
            MarkRule::Only(kinds) => kinds.iter().any(|k| k == kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSpec {
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndentBounds {
    pub min: u64,
    pub max: u64,
}

impl Default for IndentBounds {
    fn default() -> Self {
        Self { min: 0, max: 7 }
    }
}

impl IndentBounds {
    pub fn clamp(&self, value: i64) -> u64 {
        value.clamp(self.min as i64, self.max as i64) as u64
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    node_specs: HashMap<String, NodeSpec>,
    mark_specs: HashMap<String, MarkSpec>,
    indent: IndentBounds,
    bullet_list: String,
    ordered_list: String,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            node_specs: HashMap::new(),
            mark_specs: HashMap::new(),
            indent: IndentBounds::default(),
            bullet_list: BULLET_LIST.to_string(),
            ordered_list: ORDERED_LIST.to_string(),
        }
    }
}

impl Schema {
    pub fn new(
        nodes: impl IntoIterator<Item = NodeSpec>,
        marks: impl IntoIterator<Item = MarkSpec>,
    ) -> Result<Self, String> {
        let mut schema = Self::default();
        for spec in nodes {
            schema.register_node(spec)?;
        }
        for spec in marks {
            schema.register_mark(spec)?;
        }
        Ok(schema)
    }

    pub fn rich_text() -> Self {
        let nodes = vec![
            NodeSpec::block(DOC, ChildConstraint::BlockOnly),
            NodeSpec::block(PARAGRAPH, ChildConstraint::InlineOnly),
            NodeSpec::block(HEADING, ChildConstraint::InlineOnly),
            NodeSpec::block(BLOCKQUOTE, ChildConstraint::InlineOnly),
            NodeSpec::block(BULLET_LIST, ChildConstraint::BlockOnly),
            NodeSpec::block(ORDERED_LIST, ChildConstraint::BlockOnly),
            NodeSpec::block(LIST_ITEM, ChildConstraint::BlockOnly),
            NodeSpec::block(TABLE, ChildConstraint::BlockOnly),
            NodeSpec::block(TABLE_ROW, ChildConstraint::BlockOnly),
            NodeSpec::block(TABLE_CELL, ChildConstraint::BlockOnly),
            NodeSpec::inline_void(HARD_BREAK),
            NodeSpec::inline_void(IMAGE).marks(MarkRule::All),
        ];
        let marks = [
            MARK_STRONG,
            MARK_EM,
            MARK_UNDERLINE,
            MARK_STRIKE,
            MARK_SUPER,
            MARK_SUB,
            MARK_TEXT_COLOR,
            MARK_TEXT_HIGHLIGHT,
            MARK_FONT_SIZE,
            MARK_FONT_TYPE,
            MARK_LINK,
            MARK_OVERRIDE,
            MARK_TEXT_SELECTION,
        ]
        .into_iter()
        .map(|kind| MarkSpec {
            kind: kind.to_string(),
        });
        Self::new(nodes, marks).expect("rich-text schema must be valid")
    }

    pub fn with_indent_bounds(mut self, min: u64, max: u64) -> Self {
        self.indent = IndentBounds {
            min: min.min(max),
            max,
        };
        self
    }

    pub fn with_list_kinds(mut self, bullet: impl Into<String>, ordered: impl Into<String>) -> Self {
        self.bullet_list = bullet.into();
        self.ordered_list = ordered.into();
        self
    }

    pub fn register_node(&mut self, spec: NodeSpec) -> Result<(), String> {
        if self.node_specs.contains_key(&spec.kind) {
            return Err(format!("Duplicate node spec kind: {}", spec.kind));
        }
        self.node_specs.insert(spec.kind.clone(), spec);
        Ok(())
    }

    pub fn register_mark(&mut self, spec: MarkSpec) -> Result<(), String> {
        if self.mark_specs.contains_key(&spec.kind) {
            return Err(format!("Duplicate mark spec kind: {}", spec.kind));
        }
        self.mark_specs.insert(spec.kind.clone(), spec);
        Ok(())
    }

    pub fn node_spec(&self, kind: &str) -> Option<&NodeSpec> {
        self.node_specs.get(kind)
    }

    pub fn has_node(&self, kind: &str) -> bool {
        self.node_specs.contains_key(kind)
    }

    pub fn has_mark(&self, kind: &str) -> bool {
        self.mark_specs.contains_key(kind)
    }

    pub fn allows_mark(&self, parent: &str, mark: &str) -> bool {
        self.has_mark(mark)
            && self
                .node_spec(parent)
                .is_some_and(|spec| spec.allows_mark(mark))
    }

    pub fn is_text_block(&self, kind: &str) -> bool {
        self.node_spec(kind)
            .is_some_and(|spec| spec.children == ChildConstraint::InlineOnly)
    }

    pub fn indent_bounds(&self) -> IndentBounds {
        self.indent
    }

    pub fn bullet_list_kind(&self) -> &str {
        &self.bullet_list
    }

    pub fn ordered_list_kind(&self) -> &str {
        &self.ordered_list
    }

    pub fn is_list_kind(&self, kind: &str) -> bool {
        kind == self.bullet_list || kind == self.ordered_list
    }

    pub fn is_ordered_list_kind(&self, kind: &str) -> bool {
        kind == self.ordered_list
    }
}
