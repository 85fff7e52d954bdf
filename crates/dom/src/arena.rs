//! Arena-based DOM tree storage
//!
//! "Bad programmers worry about the code. Good programmers worry about
//! data structures and their relationships."
//!
//! Every link (parent, first/last child, prev/next sibling) is a `NodeId`
//! into one `Vec<DomNode>`. Relinking is index assignment, so there is no
//! dangling reference to worry about, and [`DomArena::insert_child`] refuses
//! any move that would make a node its own ancestor.
//!
//! ## Memory Layout
//!
//! ```text
//! Arena: Vec<DomNode>
//!        [Node0][Node1][Node2]...
//!         ↑ 4-byte index, not 8-byte pointer
//! ```
//!
//! Nodes are never freed. A removed subtree stays in the arena as a
//! detached local root, so ids handed out earlier stay valid.

use crate::error::{DomError, Result};
use crate::types::{DomNode, NodeId, NodeType};

/// Arena allocator for DOM nodes
#[derive(Debug, Clone)]
pub struct DomArena {
    nodes: Vec<DomNode>,
}

impl DomArena {
    /// Create a new empty arena
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create arena with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Add a detached node to the arena, returns its ID
    pub fn add_node(&mut self, mut node: DomNode) -> NodeId {
        let node_id = self.nodes.len() as NodeId;
        node.parent = None;
        node.first_child = None;
        node.last_child = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        self.nodes.push(node);
        node_id
    }

    /// Get node by ID (immutable)
    pub fn get(&self, node_id: NodeId) -> Result<&DomNode> {
        self.nodes
            .get(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Get node by ID (mutable)
    pub fn get_mut(&mut self, node_id: NodeId) -> Result<&mut DomNode> {
        self.nodes
            .get_mut(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        (node_id as usize) < self.nodes.len()
    }

    /// Total number of nodes, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Lazy iterator over the children of a node, in document order.
    /// An unknown id yields nothing.
    pub fn children(&self, node_id: NodeId) -> Children<'_> {
        Children {
            arena: self,
            next: self.nodes.get(node_id as usize).and_then(|n| n.first_child),
        }
    }

    pub fn child_count(&self, node_id: NodeId) -> usize {
        self.children(node_id).count()
    }

    /// The child at `index` in document order
    pub fn nth_child(&self, node_id: NodeId, index: usize) -> Option<NodeId> {
        self.children(node_id).nth(index)
    }

    /// Get parent of a node
    pub fn parent(&self, node_id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.get(node_id)?.parent)
    }

    /// Number of preceding siblings
    pub fn sibling_index(&self, node_id: NodeId) -> Result<usize> {
        let mut index = 0;
        let mut cursor = self.get(node_id)?.prev_sibling;
        while let Some(prev) = cursor {
            index += 1;
            cursor = self.get(prev)?.prev_sibling;
        }
        Ok(index)
    }

    /// Nearest ancestor-or-self without a parent
    pub fn local_root(&self, node_id: NodeId) -> Result<NodeId> {
        let mut current = node_id;
        while let Some(parent) = self.get(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    /// True if `ancestor` is a strict ancestor of `node_id`
    pub fn is_ancestor(&self, ancestor: NodeId, node_id: NodeId) -> Result<bool> {
        let mut cursor = self.get(node_id)?.parent;
        while let Some(parent) = cursor {
            if parent == ancestor {
                return Ok(true);
            }
            cursor = self.get(parent)?.parent;
        }
        Ok(false)
    }

    /// Traverse tree depth-first (iterative, no recursion)
    ///
    /// Children are pushed last-to-first by walking `prev_sibling`, so they
    /// pop in document order without collecting them first.
    pub fn traverse_df<F>(&self, start_id: NodeId, mut visit: F) -> Result<()>
    where
        F: FnMut(NodeId, &DomNode) -> Result<()>,
    {
        let mut stack = vec![start_id];

        while let Some(node_id) = stack.pop() {
            let node = self.get(node_id)?;
            visit(node_id, node)?;

            let mut cursor = node.last_child;
            while let Some(child_id) = cursor {
                stack.push(child_id);
                cursor = self.get(child_id)?.prev_sibling;
            }
        }

        Ok(())
    }

    /// Unlink a node from its parent and siblings.
    ///
    /// Afterwards the former neighbours point at each other, the parent's
    /// first/last pointers skip the node, and the node itself has no parent
    /// and no sibling links. Its own children are untouched.
    pub fn detach(&mut self, node_id: NodeId) -> Result<()> {
        let (parent, prev, next) = {
            let node = self.get(node_id)?;
            (node.parent, node.prev_sibling, node.next_sibling)
        };

        match prev {
            Some(prev_id) => self.get_mut(prev_id)?.next_sibling = next,
            None => {
                if let Some(parent_id) = parent {
                    self.get_mut(parent_id)?.first_child = next;
                }
            }
        }
        match next {
            Some(next_id) => self.get_mut(next_id)?.prev_sibling = prev,
            None => {
                if let Some(parent_id) = parent {
                    self.get_mut(parent_id)?.last_child = prev;
                }
            }
        }

        let node = self.get_mut(node_id)?;
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        Ok(())
    }

    /// Link a detached `child` under `parent`, before `reference` or at the end.
    fn link_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        match reference {
            Some(ref_id) => {
                let prev = self.get(ref_id)?.prev_sibling;
                {
                    let node = self.get_mut(child)?;
                    node.prev_sibling = prev;
                    node.next_sibling = Some(ref_id);
                }
                self.get_mut(ref_id)?.prev_sibling = Some(child);
                match prev {
                    Some(prev_id) => self.get_mut(prev_id)?.next_sibling = Some(child),
                    None => self.get_mut(parent)?.first_child = Some(child),
                }
            }
            None => {
                let last = self.get(parent)?.last_child;
                {
                    let node = self.get_mut(child)?;
                    node.prev_sibling = last;
                    node.next_sibling = None;
                }
                match last {
                    Some(last_id) => self.get_mut(last_id)?.next_sibling = Some(child),
                    None => self.get_mut(parent)?.first_child = Some(child),
                }
                self.get_mut(parent)?.last_child = Some(child);
            }
        }
        self.get_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_child(parent, child, i64::MAX).map(|_| ())
    }

    /// Insert `child` under `parent` at `index`.
    ///
    /// `index <= 0` prepends, `index >= child_count` appends, anything else
    /// goes immediately before the current child at that position. The child
    /// is detached from wherever it was first. Returns the index it landed at.
    pub fn insert_child(&mut self, parent: NodeId, child: NodeId, index: i64) -> Result<usize> {
        let parent_type = self.get(parent)?.node_type;
        let child_type = self.get(child)?.node_type;

        if !matches!(
            parent_type,
            NodeType::Element | NodeType::Document | NodeType::DocumentFragment
        ) {
            return Err(DomError::InvalidNodeType {
                expected: "element, document or fragment parent".to_string(),
                actual: parent_type.name().to_string(),
            });
        }
        if matches!(child_type, NodeType::Document | NodeType::DocumentFragment) {
            return Err(DomError::InvalidNodeType {
                expected: "insertable child".to_string(),
                actual: child_type.name().to_string(),
            });
        }
        if child == parent || self.is_ancestor(child, parent)? {
            return Err(DomError::CycleDetected { parent, child });
        }

        self.detach(child)?;

        let count = self.child_count(parent);
        let effective = if index <= 0 {
            0
        } else {
            usize::try_from(index).unwrap_or(usize::MAX).min(count)
        };
        let reference = self.nth_child(parent, effective);
        self.link_before(parent, child, reference)?;
        Ok(effective)
    }

    /// Remove the child at `index`. Negative or out-of-range is a no-op and
    /// returns `None`; otherwise returns the now-detached child.
    pub fn remove_child(&mut self, parent: NodeId, index: i64) -> Result<Option<NodeId>> {
        self.get(parent)?;
        let Ok(index) = usize::try_from(index) else {
            return Ok(None);
        };
        let Some(child) = self.nth_child(parent, index) else {
            return Ok(None);
        };
        self.detach(child)?;
        Ok(Some(child))
    }

    /// Verify the link invariant over the subtree rooted at `root`: every
    /// child points back at its parent, prev/next agree, and the parent's
    /// first/last pointers match the ends of the sibling chain.
    pub fn check_links(&self, root: NodeId) -> Result<bool> {
        let mut ok = true;
        self.traverse_df(root, |node_id, node| {
            let mut prev: Option<NodeId> = None;
            let mut cursor = node.first_child;
            while let Some(child_id) = cursor {
                let child = self.get(child_id)?;
                if child.parent != Some(node_id) || child.prev_sibling != prev {
                    ok = false;
                }
                prev = Some(child_id);
                cursor = child.next_sibling;
            }
            if node.last_child != prev {
                ok = false;
            }
            Ok(())
        })?;
        Ok(ok)
    }

    /// Compare two subtrees (possibly in different arenas) by kind, name,
    /// data, attribute sequence and child order. Node ids are irrelevant.
    pub fn same_structure(&self, a: NodeId, other: &DomArena, b: NodeId) -> Result<bool> {
        let mut stack = vec![(a, b)];

        while let Some((left_id, right_id)) = stack.pop() {
            let left = self.get(left_id)?;
            let right = other.get(right_id)?;
            if !left.same_content(right) {
                return Ok(false);
            }

            let mut left_children = self.children(left_id);
            let mut right_children = other.children(right_id);
            loop {
                match (left_children.next(), right_children.next()) {
                    (Some(l), Some(r)) => stack.push((l, r)),
                    (None, None) => break,
                    _ => return Ok(false),
                }
            }
        }

        Ok(true)
    }
}

impl Default for DomArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy child iterator following `next_sibling` links
#[derive(Debug, Clone)]
pub struct Children<'a> {
    arena: &'a DomArena,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.arena.get(current).ok().and_then(|n| n.next_sibling);
        Some(current)
    }
}
