use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Attrs, Mark};
use crate::schema::{
    ATTR_COLOR, ATTR_FONT_NAME, ATTR_HIGHLIGHT_COLOR, ATTR_PT, MARK_EM, MARK_FONT_SIZE,
    MARK_FONT_TYPE, MARK_STRIKE, MARK_STRONG, MARK_SUB, MARK_SUPER, MARK_TEXT_COLOR,
    MARK_TEXT_HIGHLIGHT, MARK_UNDERLINE,
};

pub const NORMAL_STYLE: &str = "Normal";

/// Read-only access to the host's named paragraph styles.
pub trait StyleLookup {
    fn style_by_name(&self, name: &str) -> Option<Style>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub name: String,
    #[serde(default)]
    pub styles: StyleProps,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strong: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub em: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superscript: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscript: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_highlight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indent: Option<u64>,
}

impl StyleProps {
    fn flag(&self, kind: &str) -> Option<bool> {
        match kind {
            MARK_STRONG => self.strong,
            MARK_EM => self.em,
            MARK_UNDERLINE => self.underline,
            MARK_STRIKE => self.strike,
            MARK_SUPER => self.superscript,
            MARK_SUB => self.subscript,
            _ => None,
        }
    }

    fn value(&self, kind: &str) -> Option<(&'static str, Value)> {
        match kind {
            MARK_TEXT_COLOR => self.color.clone().map(|c| (ATTR_COLOR, Value::String(c))),
            MARK_TEXT_HIGHLIGHT => self
                .text_highlight
                .clone()
                .map(|c| (ATTR_HIGHLIGHT_COLOR, Value::String(c))),
            MARK_FONT_SIZE => self.font_size.map(|pt| (ATTR_PT, Value::from(pt))),
            MARK_FONT_TYPE => self
                .font_name
                .clone()
                .map(|name| (ATTR_FONT_NAME, Value::String(name))),
            _ => None,
        }
    }

    /// The mark this style puts on its text for `kind`, if any.
    pub fn mark_for(&self, kind: &str) -> Option<Mark> {
        if let Some(flag) = self.flag(kind) {
            return flag.then(|| Mark::new(kind));
        }
        let (key, value) = self.value(kind)?;
        let mut attrs = Attrs::default();
        attrs.insert(key.to_string(), value);
        Some(Mark::with_attrs(kind, attrs))
    }

    pub fn matches(&self, mark: &Mark) -> bool {
        if let Some(flag) = self.flag(&mark.kind) {
            return flag;
        }
        match self.value(&mark.kind) {
            Some((key, value)) => mark.attr(key) == Some(&value),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoStyles;

impl StyleLookup for NoStyles {
    fn style_by_name(&self, _name: &str) -> Option<Style> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct StyleMap {
    styles: HashMap<String, Style>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.styles.insert(style.name.clone(), style);
        self
    }
}

impl StyleLookup for StyleMap {
    fn style_by_name(&self, name: &str) -> Option<Style> {
        self.styles.get(name).cloned()
    }
}
