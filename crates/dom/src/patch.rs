//! Patch records and the changelog
//!
//! Every mutation made through a [`crate::handle::NodeMut`] appends one
//! [`PatchRecord`]: the positional path of the edited node plus exactly one
//! [`PatchOp`]. The changelog buffers them until the driver flushes the
//! batch to the remote peer, which replays each record with
//! [`PatchRecord::apply`] against its own copy of the tree.
//!
//! ## Wire format
//!
//! ```text
//! [
//!   {"path":[0,1,2],"removeChild":{"index":0}},
//!   {"path":[0,1,2],"insertChild":{"index":0,"markup":"1"}},
//!   {"path":[0,1],"setAttribute":{"key":"class","value":"on"}},
//!   {"path":[0,1],"removeAttribute":{"key":"hidden"}}
//! ]
//! ```

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::parser::DomParser;
use crate::path::Path;
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// One primitive edit. Exactly one variant per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatchOp {
    SetAttribute { key: String, value: String },
    RemoveAttribute { key: String },
    /// `markup` is the inserted subtree rendered at the time of the insert
    InsertChild { index: i64, markup: String },
    RemoveChild { index: i64 },
}

impl PatchOp {
    pub fn kind(&self) -> &'static str {
        match self {
            PatchOp::SetAttribute { .. } => "setAttribute",
            PatchOp::RemoveAttribute { .. } => "removeAttribute",
            PatchOp::InsertChild { .. } => "insertChild",
            PatchOp::RemoveChild { .. } => "removeChild",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRecord {
    pub path: Path,
    #[serde(flatten)]
    pub op: PatchOp,
}

impl PatchRecord {
    pub fn new(path: Path, op: PatchOp) -> Self {
        Self { path, op }
    }

    /// Replay this edit on a tree rooted at `root`, without recording it.
    ///
    /// A path that no longer resolves is [`DomError::StalePath`]; what to do
    /// about it (drop, resync, abort) is the caller's call. An out-of-range
    /// `removeChild` stays a silent no-op, as on the authoring side.
    pub fn apply(&self, arena: &mut DomArena, root: NodeId, parser: &DomParser) -> Result<()> {
        let target = self.path.resolve(arena, root).ok_or_else(|| {
            tracing::warn!(path = %self.path, op = self.op.kind(), "stale patch path");
            DomError::StalePath(self.path.clone())
        })?;

        match &self.op {
            PatchOp::SetAttribute { key, value } => {
                arena.get_mut(target)?.set_attr(key, value);
            }
            PatchOp::RemoveAttribute { key } => {
                arena.get_mut(target)?.remove_attr(key);
            }
            PatchOp::InsertChild { index, markup } => {
                let subtree = parser.parse_fragment(arena, markup)?;
                arena.insert_child(target, subtree, *index)?;
            }
            PatchOp::RemoveChild { index } => {
                arena.remove_child(target, *index)?;
            }
        }

        tracing::trace!(path = %self.path, op = self.op.kind(), "applied patch");
        Ok(())
    }
}

/// Decode a flushed batch
pub fn decode_batch(text: &str) -> Result<Vec<PatchRecord>> {
    Ok(serde_json::from_str(text)?)
}

/// Records applied locally but not yet delivered to the remote peer
#[derive(Debug, Clone, Default)]
pub struct Changelog {
    buffer: Vec<PatchRecord>,
}

impl Changelog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: PatchRecord) {
        tracing::debug!(
            path = %record.path,
            op = record.op.kind(),
            pending = self.buffer.len() + 1,
            "patch recorded"
        );
        self.buffer.push(record);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn records(&self) -> &[PatchRecord] {
        &self.buffer
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatchRecord> {
        self.buffer.iter()
    }

    /// Serialize the pending records as one JSON array
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.buffer)?)
    }

    /// Encode the batch and hand it to `send`. The buffer is cleared only if
    /// both encoding and `send` succeed, so a failed flush can be retried.
    /// Returns the number of records flushed.
    pub fn flush_with<F, E>(&mut self, send: F) -> std::result::Result<usize, E>
    where
        F: FnOnce(String) -> std::result::Result<(), E>,
        E: From<DomError>,
    {
        let batch = self.encode()?;
        send(batch)?;
        Ok(self.commit_flush())
    }

    /// [`Changelog::flush_with`] for an async `send`, e.g. a websocket sink.
    /// Same contract: the buffer survives a failed send.
    pub async fn flush_async<F, Fut, E>(&mut self, send: F) -> std::result::Result<usize, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = std::result::Result<(), E>>,
        E: From<DomError>,
    {
        let batch = self.encode()?;
        send(batch).await?;
        Ok(self.commit_flush())
    }

    fn commit_flush(&mut self) -> usize {
        let flushed = self.buffer.len();
        self.buffer.clear();
        tracing::debug!(records = flushed, "changelog flushed");
        flushed
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Take every pending record, leaving the changelog empty
    pub fn drain(&mut self) -> Vec<PatchRecord> {
        std::mem::take(&mut self.buffer)
    }
}

impl<'a> IntoIterator for &'a Changelog {
    type Item = &'a PatchRecord;
    type IntoIter = std::slice::Iter<'a, PatchRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.buffer.iter()
    }
}
