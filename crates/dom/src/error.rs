//! Error types for DOM operations
//!
//! Simple, flat error hierarchy. No over-engineering.

use crate::path::Path;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomError>;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(u32),

    #[error("Invalid node type: expected {expected}, got {actual}")]
    InvalidNodeType { expected: String, actual: String },

    #[error("Cannot insert node {child} under {parent}: would create a cycle")]
    CycleDetected { parent: u32, child: u32 },

    #[error("Markup parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("Maximum nesting depth exceeded: {current} > {max}")]
    MaxDepthExceeded { current: usize, max: usize },

    #[error("No node at path {0}")]
    StalePath(Path),

    #[error("Patch {index} rejected: {source}")]
    PatchRejected {
        index: usize,
        #[source]
        source: Box<DomError>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
