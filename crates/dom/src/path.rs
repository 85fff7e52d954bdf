//! Positional paths
//!
//! A path is the list of sibling indices to descend from a node's local
//! root (the nearest ancestor without a parent) down to the node. The
//! root's own position is not part of the path, so the root itself has the
//! empty path.
//!
//! Paths are what crosses the wire instead of node ids: a peer holding a
//! structurally identical tree resolves the same indices to the same node.
//! They are recomputed on every call; any insert or remove under an
//! ancestor invalidates paths derived before it.

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(SmallVec<[u32; 8]>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    /// Walk parent links upward, counting preceding siblings at each level.
    pub fn derive(arena: &DomArena, node_id: NodeId) -> Result<Self> {
        let mut indices = SmallVec::<[u32; 8]>::new();
        let mut current = node_id;

        while let Some(parent) = arena.get(current)?.parent {
            indices.push(arena.sibling_index(current)? as u32);
            current = parent;
        }

        indices.reverse();
        Ok(Self(indices))
    }

    /// Descend from `root`. `None` means the path is stale for this tree.
    pub fn resolve(&self, arena: &DomArena, root: NodeId) -> Option<NodeId> {
        if !arena.contains(root) {
            return None;
        }
        self.0.iter().try_fold(root, |current, &index| {
            arena.nth_child(current, index as usize)
        })
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u32>> for Path {
    fn from(indices: Vec<u32>) -> Self {
        Self(SmallVec::from_vec(indices))
    }
}

impl From<&[u32]> for Path {
    fn from(indices: &[u32]) -> Self {
        Self(SmallVec::from_slice(indices))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}
