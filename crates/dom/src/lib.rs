//! DOM tree with tracked, replayable edits
//!
//! Edits made to a local tree are recorded as addressable patches so that a
//! remote peer holding an independent copy of the same tree can replay them
//! in order and converge to the same structure.
//!
//! ## Core Design
//!
//! ```text
//! NodeMut::insert_child ──► DomArena (index links) ──► PatchRecord { path, op }
//!                                                            │
//!                                             Changelog::flush_with (JSON)
//!                                                            │
//! remote: decode_batch ──► Path::resolve ──► PatchRecord::apply (no recording)
//! ```
//!
//! - Nodes live in one arena and link to each other by `u32` index.
//! - A node is addressed across processes by its [`Path`]: sibling indices
//!   from its local root, recomputed on demand.
//! - Inserted subtrees travel as markup and are re-parsed on arrival.

pub mod arena;
pub mod document;
pub mod error;
pub mod handle;
pub mod parser;
pub mod patch;
pub mod path;
pub mod serializer;
pub mod types;
pub mod utils;

pub use arena::DomArena;
pub use document::Document;
pub use error::{DomError, Result};
pub use handle::{NodeMut, NodeRef};
pub use parser::{DomParser, ParserConfig};
pub use patch::{decode_batch, Changelog, PatchOp, PatchRecord};
pub use path::Path;
pub use serializer::MarkupSerializer;
pub use types::*;
