//! Copyable handles into a [`PatchRoot`] and the tree navigation used to
//! move a cursor through it.
//!
//! A [`NodeId`] is a path of positions (header, hunk, line), so siblings
//! and parents are found by index arithmetic and never by comparing
//! content: two hunks with identical text are still distinct nodes.

use super::{Header, Hunk, HunkLine, PatchRoot};

/// Position of a header, hunk or changed line within a [`PatchRoot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Header(usize),
    Hunk(usize, usize),
    Line(usize, usize, usize),
}

/// A node borrowed from the tree.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Header(&'a Header),
    Hunk(&'a Hunk),
    Line(&'a HunkLine),
}

impl NodeId {
    /// Index of the header this node belongs to.
    pub fn header(self) -> usize {
        match self {
            NodeId::Header(h) | NodeId::Hunk(h, _) | NodeId::Line(h, _, _) => h,
        }
    }

    pub fn parent(self) -> Option<NodeId> {
        match self {
            NodeId::Header(_) => None,
            NodeId::Hunk(h, _) => Some(NodeId::Header(h)),
            NodeId::Line(h, k, _) => Some(NodeId::Hunk(h, k)),
        }
    }

    /// Position among siblings.
    fn index(self) -> usize {
        match self {
            NodeId::Header(i) | NodeId::Hunk(_, i) | NodeId::Line(_, _, i) => i,
        }
    }

    fn with_index(self, index: usize) -> NodeId {
        match self {
            NodeId::Header(_) => NodeId::Header(index),
            NodeId::Hunk(h, _) => NodeId::Hunk(h, index),
            NodeId::Line(h, k, _) => NodeId::Line(h, k, index),
        }
    }
}

impl PatchRoot {
    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        match id {
            NodeId::Header(h) => self.headers.get(h).map(Node::Header),
            NodeId::Hunk(h, k) => self.hunk(h, k).map(Node::Hunk),
            NodeId::Line(h, k, l) => self.hunk(h, k)?.lines.get(l).map(Node::Line),
        }
    }

    pub(crate) fn hunk(&self, header: usize, hunk: usize) -> Option<&Hunk> {
        self.headers.get(header)?.hunks.get(hunk)
    }

    pub(crate) fn hunk_mut(&mut self, header: usize, hunk: usize) -> Option<&mut Hunk> {
        self.headers.get_mut(header)?.hunks.get_mut(hunk)
    }

    /// Number of children of `parent`; `None` stands for the root.
    fn child_count(&self, parent: Option<NodeId>) -> usize {
        match parent {
            None => self.headers.len(),
            Some(NodeId::Header(h)) => self.headers.get(h).map_or(0, |header| header.hunks.len()),
            Some(NodeId::Hunk(h, k)) => self.hunk(h, k).map_or(0, |hunk| hunk.lines.len()),
            Some(NodeId::Line(..)) => 0,
        }
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        let child = match id {
            NodeId::Header(h) => NodeId::Hunk(h, 0),
            NodeId::Hunk(h, k) => NodeId::Line(h, k, 0),
            NodeId::Line(..) => return None,
        };
        (self.child_count(Some(id)) > 0).then_some(child)
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        let last = self.child_count(Some(id)).checked_sub(1)?;
        match id {
            NodeId::Header(h) => Some(NodeId::Hunk(h, last)),
            NodeId::Hunk(h, k) => Some(NodeId::Line(h, k, last)),
            NodeId::Line(..) => None,
        }
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let next = id.index() + 1;
        (next < self.child_count(id.parent())).then(|| id.with_index(next))
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        id.index().checked_sub(1).map(|prev| id.with_index(prev))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        id.parent()
    }

    /// Whether the children of `id` are hidden. Lines are never folded.
    pub fn is_folded(&self, id: NodeId) -> bool {
        match self.node(id) {
            Some(Node::Header(header)) => header.folded,
            Some(Node::Hunk(hunk)) => hunk.folded,
            Some(Node::Line(_)) | None => false,
        }
    }

    /// The next node in document order.
    ///
    /// With `skip_folded`, the children of a folded node are skipped: the
    /// result is its next sibling, else its parent's next sibling.
    pub fn next_item(&self, id: NodeId, skip_folded: bool) -> Option<NodeId> {
        if skip_folded && self.is_folded(id) {
            return self
                .next_sibling(id)
                .or_else(|| id.parent().and_then(|parent| self.next_sibling(parent)));
        }

        if let Some(child) = self.first_child(id) {
            return Some(child);
        }
        let mut current = id;
        loop {
            if let Some(sibling) = self.next_sibling(current) {
                return Some(sibling);
            }
            current = current.parent()?;
        }
    }

    /// The node shown just before `id`: the deepest visible last descendant
    /// of the previous sibling, else the parent.
    pub fn prev_item(&self, id: NodeId) -> Option<NodeId> {
        let Some(mut current) = self.prev_sibling(id) else {
            return id.parent();
        };
        while !self.is_folded(current) {
            match self.last_child(current) {
                Some(child) => current = child,
                None => break,
            }
        }
        Some(current)
    }

    /// First node of the document.
    pub fn first_item(&self) -> Option<NodeId> {
        (!self.headers.is_empty()).then_some(NodeId::Header(0))
    }

    /// Last visible node of the document.
    pub fn last_item(&self) -> Option<NodeId> {
        let mut current = NodeId::Header(self.headers.len().checked_sub(1)?);
        while !self.is_folded(current) {
            match self.last_child(current) {
                Some(child) => current = child,
                None => break,
            }
        }
        Some(current)
    }
}
