//! Node handles
//!
//! [`NodeRef`] is a copyable read cursor; [`NodeMut`] is the only way to
//! edit a tracked document. Both borrow the owning [`Document`], which is
//! where the changelog lives, so there is no shared mutable log threaded
//! through every handle: holding a `NodeMut` *is* holding the log.

use crate::document::Document;
use crate::error::Result;
use crate::patch::{PatchOp, PatchRecord};
use crate::path::Path;
use crate::types::{DomNode, NodeId, NodeType};
use crate::utils;

/// Read-only view of one node
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
    node: &'a DomNode,
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(doc: &'a Document, id: NodeId) -> Result<Self> {
        let node = doc.arena().get(id)?;
        Ok(Self { doc, id, node })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node(&self) -> &'a DomNode {
        self.node
    }

    pub fn node_type(&self) -> NodeType {
        self.node.node_type
    }

    pub fn tag_name(&self) -> Option<&'a str> {
        self.node.tag_name()
    }

    pub fn attr(&self, key: &str) -> Option<&'a str> {
        self.node.attr(key)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node
            .parent
            .and_then(|parent| NodeRef::new(self.doc, parent).ok())
    }

    /// Children in document order. Lazy, and every call starts over.
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let doc = self.doc;
        doc.arena()
            .children(self.id)
            .filter_map(move |child| NodeRef::new(doc, child).ok())
    }

    pub fn child_count(&self) -> usize {
        self.doc.arena().child_count(self.id)
    }

    /// For a document node, its `<body>`; for anything else, itself.
    ///
    /// The body is looked up among the children of the document's first
    /// element (the `<html>` element). If there is none the document handle
    /// itself comes back, so callers must tolerate a no-op result.
    pub fn body(self) -> NodeRef<'a> {
        if self.node_type() != NodeType::Document {
            return self;
        }
        self.children()
            .find(|child| child.node.is_element())
            .and_then(|html| html.children().find(|c| c.tag_name() == Some("body")))
            .unwrap_or(self)
    }

    /// First direct child whose `id` attribute equals `id`.
    ///
    /// Only direct children are searched, not the whole subtree.
    pub fn by_id(&self, id: &str) -> Option<NodeRef<'a>> {
        self.children().find(|child| child.attr("id") == Some(id))
    }

    /// Positional path from this node's local root
    pub fn path(&self) -> Result<Path> {
        Path::derive(self.doc.arena(), self.id)
    }

    pub fn text_content(&self) -> Result<String> {
        utils::get_text_content(self.doc.arena(), self.id)
    }

    pub fn render(&self) -> Result<String> {
        self.doc.render_node(self.id)
    }
}

/// Mutable handle; each edit also appends a patch record to the
/// document's changelog.
#[derive(Debug)]
pub struct NodeMut<'a> {
    doc: &'a mut Document,
    id: NodeId,
}

impl<'a> NodeMut<'a> {
    pub(crate) fn new(doc: &'a mut Document, id: NodeId) -> Result<Self> {
        doc.arena().get(id)?;
        Ok(Self { doc, id })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn view(&self) -> Result<NodeRef<'_>> {
        NodeRef::new(self.doc, self.id)
    }

    /// Record for an edit of `target`, addressed in the tree as it is now.
    /// Edits outside the document tree are not recorded: a detached
    /// subtree reaches the peer as markup once it is inserted.
    fn record_for(&self, target: NodeId, op: PatchOp) -> Result<Option<PatchRecord>> {
        if !self.doc.is_tracked(target)? {
            tracing::trace!(node = target, kind = op.kind(), "edit outside document");
            return Ok(None);
        }
        let path = Path::derive(self.doc.arena(), target)?;
        Ok(Some(PatchRecord::new(path, op)))
    }

    fn record(&mut self, op: PatchOp) -> Result<()> {
        if let Some(record) = self.record_for(self.id, op)? {
            self.doc.changelog_mut().push(record);
        }
        Ok(())
    }

    /// Overwrite in place if `key` exists, otherwise append
    pub fn set_attribute(&mut self, key: &str, value: &str) -> Result<()> {
        self.doc.arena_mut().get_mut(self.id)?.set_attr(key, value);
        self.record(PatchOp::SetAttribute {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Remove the first `key` pair. Absent key: no edit, no record, `false`.
    pub fn remove_attribute(&mut self, key: &str) -> Result<bool> {
        if !self.doc.arena_mut().get_mut(self.id)?.remove_attr(key) {
            return Ok(false);
        }
        self.record(PatchOp::RemoveAttribute {
            key: key.to_string(),
        })?;
        Ok(true)
    }

    /// Insert `subtree` at `index` (`<= 0` prepends, past the end appends).
    ///
    /// An attached subtree is moved: its removal from the old parent is
    /// recorded first. The insert record carries the index the subtree
    /// actually landed at and its markup as of now. Returns that index.
    pub fn insert_child(&mut self, subtree: NodeId, index: i64) -> Result<usize> {
        let markup = self.doc.render_node(subtree)?;
        // Addressed before the move, which can shift the old parent's path
        let removal = match self.doc.arena().parent(subtree)? {
            Some(parent) => {
                let old_index = self.doc.arena().sibling_index(subtree)? as i64;
                self.record_for(parent, PatchOp::RemoveChild { index: old_index })?
            }
            None => None,
        };

        let landed = self.doc.arena_mut().insert_child(self.id, subtree, index)?;

        if let Some(removal) = removal {
            self.doc.changelog_mut().push(removal);
        }
        tracing::trace!(
            markup = %utils::cap_text_length(&markup, 80),
            index = landed,
            "insert child"
        );
        self.record(PatchOp::InsertChild {
            index: landed as i64,
            markup,
        })?;
        Ok(landed)
    }

    /// Remove the child at `index`. Negative or out of range: no edit, no
    /// record, `None`. Otherwise returns the detached child.
    pub fn remove_child(&mut self, index: i64) -> Result<Option<NodeId>> {
        let removed = self.doc.arena_mut().remove_child(self.id, index)?;
        if removed.is_some() {
            self.record(PatchOp::RemoveChild { index })?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use crate::document::Document;
    use crate::error::DomError;
    use crate::patch::PatchOp;

    const PAGE: &str = "<!DOCTYPE html><html><head></head><body>\
        <h1 id=\"title\">Counter</h1>\
        <div id=\"counter\" class=\"big\">0</div>\
        <section><p id=\"nested\">deep</p></section>\
        </body></html>";

    fn counter_id(doc: &Document) -> u32 {
        doc.root().body().by_id("counter").unwrap().id()
    }

    #[test]
    fn test_body_lookup() {
        let doc = Document::parse(PAGE).unwrap();
        let body = doc.root().body();
        assert_eq!(body.tag_name(), Some("body"));
        // Already not a document: unchanged
        assert_eq!(body.body().id(), body.id());
    }

    #[test]
    fn test_body_missing_falls_back_to_self() {
        let mut doc = Document::parse("<p>x</p>").unwrap();
        let html = doc.root().children().find(|c| c.tag_name() == Some("html")).unwrap().id();
        let mut edit = doc.edit(html).unwrap();
        edit.remove_child(1).unwrap();

        let root = doc.root();
        assert_eq!(root.body().id(), root.id());
    }

    #[test]
    fn test_by_id_is_shallow() {
        let doc = Document::parse(PAGE).unwrap();
        let body = doc.root().body();

        assert_eq!(body.by_id("title").unwrap().tag_name(), Some("h1"));
        assert!(body.by_id("nested").is_none());
        assert!(body.by_id("missing").is_none());
    }

    #[test]
    fn test_children_restartable() {
        let doc = Document::parse(PAGE).unwrap();
        let body = doc.root().body();
        let first: Vec<_> = body.children().map(|c| c.id()).collect();
        let second: Vec<_> = body.children().map(|c| c.id()).collect();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_counter_scenario() {
        let mut doc = Document::parse(PAGE).unwrap();
        let counter = counter_id(&doc);
        let path = doc.node(counter).unwrap().path().unwrap();
        let one = doc.parse_fragment("1").unwrap();

        let mut node = doc.edit(counter).unwrap();
        node.remove_child(0).unwrap();
        node.insert_child(one, 0).unwrap();

        let records = doc.changelog().records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, path);
        assert_eq!(records[0].op, PatchOp::RemoveChild { index: 0 });
        assert_eq!(records[1].path, path);
        assert_eq!(
            records[1].op,
            PatchOp::InsertChild {
                index: 0,
                markup: "1".to_string()
            }
        );

        let counter = doc.node(counter).unwrap();
        assert_eq!(counter.child_count(), 1);
        assert_eq!(counter.children().next().unwrap().render().unwrap(), "1");
    }

    #[test]
    fn test_set_attribute_idempotent() {
        let mut doc = Document::parse(PAGE).unwrap();
        let counter = counter_id(&doc);

        doc.edit(counter).unwrap().set_attribute("class", "huge").unwrap();
        let once = doc.node(counter).unwrap().node().attributes.clone();
        doc.edit(counter).unwrap().set_attribute("class", "huge").unwrap();
        let twice = doc.node(counter).unwrap().node().attributes.clone();

        assert_eq!(once, twice);
        assert_eq!(once[1].key, "class");
        assert_eq!(doc.changelog().len(), 2);
    }

    #[test]
    fn test_remove_absent_attribute_records_nothing() {
        let mut doc = Document::parse(PAGE).unwrap();
        let counter = counter_id(&doc);
        let before = doc.node(counter).unwrap().node().attributes.clone();

        let removed = doc.edit(counter).unwrap().remove_attribute("hidden").unwrap();

        assert!(!removed);
        assert_eq!(doc.node(counter).unwrap().node().attributes, before);
        assert!(doc.changelog().is_empty());
    }

    #[test]
    fn test_remove_child_out_of_range_records_nothing() {
        let mut doc = Document::parse(PAGE).unwrap();
        let counter = counter_id(&doc);
        let before = doc.render().unwrap();

        let mut node = doc.edit(counter).unwrap();
        assert_eq!(node.remove_child(1).unwrap(), None);
        assert_eq!(node.remove_child(-1).unwrap(), None);

        assert_eq!(doc.render().unwrap(), before);
        assert!(doc.changelog().is_empty());
    }

    #[test]
    fn test_insert_then_remove_restores_children() {
        let mut doc = Document::parse(PAGE).unwrap();
        let body = doc.root().body().id();
        let before: Vec<String> = doc
            .node(body)
            .unwrap()
            .children()
            .map(|c| c.render().unwrap())
            .collect();

        for index in [-3, 0, 1, 2, 3] {
            let item = doc.parse_fragment("<aside>x</aside>").unwrap();
            let mut node = doc.edit(body).unwrap();
            let landed = node.insert_child(item, index).unwrap();
            node.remove_child(landed as i64).unwrap();

            let after: Vec<String> = doc
                .node(body)
                .unwrap()
                .children()
                .map(|c| c.render().unwrap())
                .collect();
            assert_eq!(after, before, "index {index}");
        }
    }

    #[test]
    fn test_insert_records_clamped_index() {
        let mut doc = Document::parse(PAGE).unwrap();
        let body = doc.root().body().id();
        let item = doc.parse_fragment("<footer></footer>").unwrap();

        doc.edit(body).unwrap().insert_child(item, 42).unwrap();

        assert_eq!(
            doc.changelog().records()[0].op,
            PatchOp::InsertChild {
                index: 3,
                markup: "<footer></footer>".to_string()
            }
        );
    }

    #[test]
    fn test_insert_ancestor_fails_without_record() {
        let mut doc = Document::parse(PAGE).unwrap();
        let body = doc.root().body().id();
        let counter = counter_id(&doc);

        let err = doc.edit(counter).unwrap().insert_child(body, 0).unwrap_err();
        assert!(matches!(err, DomError::CycleDetected { .. }));
        assert!(doc.changelog().is_empty());
    }

    #[test]
    fn test_insert_unknown_node_changes_nothing() {
        let mut doc = Document::parse(PAGE).unwrap();
        let body = doc.root().body().id();
        let before = doc.render().unwrap();

        let err = doc.edit(body).unwrap().insert_child(9999, 0).unwrap_err();
        assert!(matches!(err, DomError::NodeNotFound(9999)));
        assert_eq!(doc.render().unwrap(), before);
        assert!(doc.changelog().is_empty());
    }

    #[test]
    fn test_detached_edits_are_not_recorded() {
        let mut doc = Document::parse(PAGE).unwrap();
        let body = doc.root().body().id();
        let div = doc.create_element("div");

        doc.edit(div).unwrap().set_attribute("class", "x").unwrap();
        assert!(doc.changelog().is_empty());

        doc.edit(body).unwrap().insert_child(div, 0).unwrap();
        let records = doc.changelog().records();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].op,
            PatchOp::InsertChild {
                index: 0,
                markup: "<div class=\"x\"></div>".to_string()
            }
        );
    }

    #[test]
    fn test_removed_subtree_edits_are_not_recorded() {
        let mut doc = Document::parse(PAGE).unwrap();
        let body = doc.root().body().id();

        let section = doc.edit(body).unwrap().remove_child(2).unwrap().unwrap();
        doc.edit(section).unwrap().remove_child(0).unwrap();
        assert_eq!(doc.changelog().len(), 1);
    }

    #[test]
    fn test_move_records_removal_first() {
        let mut doc = Document::parse(PAGE).unwrap();
        let body = doc.root().body().id();
        let body_path = doc.node(body).unwrap().path().unwrap();
        let section = doc.node(body).unwrap().children().nth(2).unwrap().id();
        let section_path = doc.node(section).unwrap().path().unwrap();
        let nested = doc.node(section).unwrap().children().next().unwrap().id();

        // Moving to the front shifts the section, whose path is taken first
        let landed = doc.edit(body).unwrap().insert_child(nested, 0).unwrap();
        assert_eq!(landed, 0);

        let records = doc.changelog().records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, section_path);
        assert_eq!(records[0].op, PatchOp::RemoveChild { index: 0 });
        assert_eq!(records[1].path, body_path);
        assert_eq!(
            records[1].op,
            PatchOp::InsertChild {
                index: 0,
                markup: "<p id=\"nested\">deep</p>".to_string()
            }
        );
    }

    #[test]
    fn test_changelog_counts_and_clears() {
        let mut doc = Document::parse(PAGE).unwrap();
        let counter = counter_id(&doc);

        {
            let mut node = doc.edit(counter).unwrap();
            node.set_attribute("data-a", "1").unwrap();
            node.set_attribute("data-b", "2").unwrap();
            node.remove_attribute("data-a").unwrap();
            node.remove_child(0).unwrap();
        }

        let kinds: Vec<_> = doc.changelog().iter().map(|r| r.op.kind()).collect();
        assert_eq!(
            kinds,
            vec!["setAttribute", "setAttribute", "removeAttribute", "removeChild"]
        );

        let flushed: Result<usize, DomError> = doc.changelog_mut().flush_with(|_| Ok(()));
        assert_eq!(flushed.unwrap(), 4);
        assert!(doc.changelog().is_empty());
    }
}
