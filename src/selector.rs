//! The surface a front end drives: a patch tree, a cursor and the
//! operations bound to keys.

use log::debug;

use crate::patch::{Node, NodeId, PatchRoot};

/// Cursor movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Previous visible node
    Up,
    /// Next visible node, skipping the children of folded nodes
    Down,
    /// Next node in document order, descending into folded nodes too
    DownIntoFolded,
    /// Previous sibling, else the parent
    UpSibling,
    /// Next sibling, else the parent's next sibling
    DownSibling,
    /// Unfold and move to the first child
    Right,
    /// Fold, or move to the parent when already folded
    Left,
    /// Fold a header, or move to the header of a hunk or line
    LeftToHeader,
    First,
    Last,
}

/// Interactive selection state over a parsed patch.
#[derive(Debug, Clone)]
pub struct Selector {
    root: PatchRoot,
    cursor: Option<NodeId>,
    last_toggle_all_applied: bool,
}

impl Selector {
    /// Start with the cursor on the first header.
    pub fn new(root: PatchRoot) -> Self {
        let cursor = root.first_item();
        Self {
            root,
            cursor,
            last_toggle_all_applied: true,
        }
    }

    pub fn root(&self) -> &PatchRoot {
        &self.root
    }

    pub fn into_root(self) -> PatchRoot {
        self.root
    }

    /// `None` only for an empty patch.
    pub fn cursor(&self) -> Option<NodeId> {
        self.cursor
    }

    /// Move the cursor and return its new position. Moving past either end
    /// of the tree leaves it where it is.
    pub fn navigate(&mut self, direction: Direction) -> Option<NodeId> {
        let current = self.cursor?;
        let root = &self.root;
        let next = match direction {
            Direction::Up => root.prev_item(current),
            Direction::Down => root.next_item(current, true),
            Direction::DownIntoFolded => root.next_item(current, false),
            Direction::UpSibling => root.prev_sibling(current).or_else(|| root.parent(current)),
            Direction::DownSibling => root
                .next_sibling(current)
                .or_else(|| root.parent(current).and_then(|parent| root.next_sibling(parent))),
            Direction::Right => {
                let child = root.first_child(current);
                if root.is_folded(current) {
                    self.root.toggle_folded(current, false);
                }
                child
            }
            Direction::Left => {
                if !matches!(current, NodeId::Line(..)) && !root.is_folded(current) {
                    self.root.toggle_folded(current, false);
                    return self.cursor;
                }
                root.parent(current)
            }
            Direction::LeftToHeader => {
                if matches!(current, NodeId::Header(_)) && !root.is_folded(current) {
                    self.root.toggle_folded(current, false);
                    return self.cursor;
                }
                Some(NodeId::Header(current.header()))
            }
            Direction::First => root.first_item(),
            Direction::Last => root.last_item(),
        };
        if let Some(next) = next {
            debug!("cursor {direction:?}: {current:?} -> {next:?}");
            self.cursor = Some(next);
        }
        self.cursor
    }

    pub fn toggle_applied(&mut self, id: NodeId) {
        self.root.toggle_applied(id);
    }

    /// Select or deselect `id`, leaving it alone if it already has that
    /// state.
    pub fn set_applied(&mut self, id: NodeId, applied: bool) {
        if self.root.is_applied(id) != applied {
            self.root.toggle_applied(id);
        }
    }

    /// Toggle folding; when the fold moves to the parent of the cursor's
    /// node, the cursor follows it.
    pub fn toggle_folded(&mut self, id: NodeId, fold_parent: bool) -> NodeId {
        let target = self.root.toggle_folded(id, fold_parent);
        if self.cursor == Some(id) {
            self.cursor = Some(target);
        }
        target
    }

    /// Alternate between deselecting and selecting every file.
    pub fn toggle_all(&mut self) {
        let applied = !self.last_toggle_all_applied;
        for h in 0..self.root.headers.len() {
            if self.root.headers[h].applied != applied {
                self.root.toggle_applied(NodeId::Header(h));
            }
        }
        self.last_toggle_all_applied = applied;
    }

    /// Raw bytes of a single node: a header's preamble, a hunk as it
    /// would be written, or a line's text.
    pub fn serialize(&self, id: NodeId) -> Vec<u8> {
        let mut out = Vec::new();
        match self.root.node(id) {
            Some(Node::Header(header)) => header.write_into(&mut out),
            Some(Node::Hunk(hunk)) => hunk.write_into(&mut out),
            Some(Node::Line(line)) => out.extend_from_slice(&line.text),
            None => {}
        }
        out
    }

    pub fn filter(&self) -> PatchRoot {
        self.root.filter()
    }

    /// `[x]` applied, `[~]` partially applied, `[ ]` not applied.
    pub fn status_marker(&self, id: NodeId) -> &'static str {
        status_marker(&self.root, id)
    }
}

pub fn status_marker(root: &PatchRoot, id: NodeId) -> &'static str {
    if root.is_partial(id) {
        "[~]"
    } else if root.is_applied(id) {
        "[x]"
    } else {
        "[ ]"
    }
}
