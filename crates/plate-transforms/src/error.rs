use log::warn;
use thiserror::Error;

use crate::transform::Transform;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("position {pos} is outside the document (content size {size})")]
    PositionOutOfRange { pos: usize, size: usize },
    #[error("no node starts at position {0}")]
    NoNodeAt(usize),
    #[error("node at position {0} cannot hold content")]
    NotAContainer(usize),
    #[error("range {from}..{to} cuts through an element node")]
    UnsupportedRange { from: usize, to: usize },
    #[error("node at position {0} is not a list")]
    NotAList(usize),
    #[error("unknown node kind: {0}")]
    UnknownNodeKind(String),
    #[error("unknown mark kind: {0}")]
    UnknownMarkKind(String),
}

/// Runs `run` and falls back to the untouched input when it fails.
pub(crate) fn or_unchanged<F>(op: &str, tr: Transform, run: F) -> Transform
where
    F: FnOnce(Transform) -> Result<Transform, TransformError>,
{
    let fallback = tr.clone();
    match run(tr) {
        Ok(tr) => tr,
        Err(err) => {
            warn!("{op}: {err}; leaving the transform unchanged");
            fallback
        }
    }
}
