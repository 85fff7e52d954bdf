//! Tracked document - one tree plus the changelog of its unsent edits
//!
//! A `Document` is the unit a session owns: the arena, the root the paths
//! are relative to, and the pending patch records. It is not `Sync`-shared
//! by design; one task drives all edits and flushes for a given document.

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::handle::{NodeMut, NodeRef};
use crate::parser::DomParser;
use crate::patch::{Changelog, PatchRecord};
use crate::serializer::MarkupSerializer;
use crate::types::{DomNode, NodeId};

#[derive(Debug, Clone)]
pub struct Document {
    arena: DomArena,
    root: NodeId,
    changelog: Changelog,
    parser: DomParser,
}

impl Document {
    /// Parse a full document with the default parser
    pub fn parse(markup: &str) -> Result<Self> {
        Self::parse_with(markup, DomParser::new())
    }

    pub fn parse_with(markup: &str, parser: DomParser) -> Result<Self> {
        let (arena, root) = parser.parse_document(markup)?;
        Ok(Self {
            arena,
            root,
            changelog: Changelog::new(),
            parser,
        })
    }

    /// Track an existing tree. `root` must be a node without a parent.
    pub fn from_arena(arena: DomArena, root: NodeId) -> Result<Self> {
        if arena.get(root)?.parent.is_some() {
            return Err(DomError::InvalidNodeType {
                expected: "parentless root".to_string(),
                actual: "attached node".to_string(),
            });
        }
        Ok(Self {
            arena,
            root,
            changelog: Changelog::new(),
            parser: DomParser::new(),
        })
    }

    pub fn arena(&self) -> &DomArena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut DomArena {
        &mut self.arena
    }

    pub fn parser(&self) -> &DomParser {
        &self.parser
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> NodeRef<'_> {
        // The root id is checked on construction and arena slots are never freed
        NodeRef::new(self, self.root).unwrap_or_else(|_| unreachable!("document root vanished"))
    }

    /// Shortcut for `root().body()`
    pub fn body(&self) -> NodeRef<'_> {
        self.root().body()
    }

    /// True if `id` hangs under the document root, i.e. edits to it are
    /// visible to a peer replaying this document's changelog
    pub fn is_tracked(&self, id: NodeId) -> Result<bool> {
        Ok(self.arena.local_root(id)? == self.root)
    }

    pub fn node(&self, id: NodeId) -> Result<NodeRef<'_>> {
        NodeRef::new(self, id)
    }

    /// Mutable, recording handle for `id`
    pub fn edit(&mut self, id: NodeId) -> Result<NodeMut<'_>> {
        NodeMut::new(self, id)
    }

    /// Parse a single-node fragment into this document's arena, detached,
    /// ready to be passed to [`NodeMut::insert_child`].
    pub fn parse_fragment(&mut self, markup: &str) -> Result<NodeId> {
        self.parser.parse_fragment(&mut self.arena, markup)
    }

    /// New detached text node
    pub fn create_text(&mut self, data: &str) -> NodeId {
        self.arena.add_node(DomNode::text(data))
    }

    /// New detached, empty element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.arena.add_node(DomNode::element(tag))
    }

    pub fn render(&self) -> Result<String> {
        self.render_node(self.root)
    }

    pub fn render_node(&self, id: NodeId) -> Result<String> {
        MarkupSerializer::new().render(&self.arena, id)
    }

    pub fn changelog(&self) -> &Changelog {
        &self.changelog
    }

    pub fn changelog_mut(&mut self) -> &mut Changelog {
        &mut self.changelog
    }

    /// Pending records, leaving the changelog empty
    pub fn take_changes(&mut self) -> Vec<PatchRecord> {
        self.changelog.drain()
    }

    /// Replay one remote record. Nothing is recorded.
    pub fn apply(&mut self, record: &PatchRecord) -> Result<()> {
        record.apply(&mut self.arena, self.root, &self.parser)
    }

    /// Replay records in order, stopping at the first that fails.
    ///
    /// Records before the failing one stay applied; the caller decides
    /// whether to resync or drop the session.
    pub fn apply_batch(&mut self, records: &[PatchRecord]) -> Result<()> {
        for (index, record) in records.iter().enumerate() {
            self.apply(record).map_err(|source| DomError::PatchRejected {
                index,
                source: Box::new(source),
            })?;
        }
        tracing::debug!(records = records.len(), "applied batch");
        Ok(())
    }

    /// Same shape and content as `other`, ignoring node ids
    pub fn same_structure(&self, other: &Document) -> Result<bool> {
        self.arena
            .same_structure(self.root, &other.arena, other.root)
    }
}
