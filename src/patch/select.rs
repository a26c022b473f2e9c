//! Tri-state selection and folding of patch nodes.
//!
//! Toggling a node updates its descendants and then recomputes each
//! ancestor from its children: a hunk or header is applied when any child
//! is, and partial when it is applied but not every child is fully applied.

use log::trace;

use super::{LineOp, Node, NodeId, PatchRoot};

impl PatchRoot {
    pub fn is_applied(&self, id: NodeId) -> bool {
        match self.node(id) {
            Some(Node::Header(header)) => header.applied,
            Some(Node::Hunk(hunk)) => hunk.applied,
            Some(Node::Line(line)) => line.applied,
            None => false,
        }
    }

    /// Lines are never partial.
    pub fn is_partial(&self, id: NodeId) -> bool {
        match self.node(id) {
            Some(Node::Header(header)) => header.partial,
            Some(Node::Hunk(hunk)) => hunk.partial,
            Some(Node::Line(_)) | None => false,
        }
    }

    /// Flip whether `id` is part of the selection and propagate the change
    /// to its descendants and ancestors.
    ///
    /// Toggling a no-newline marker toggles the line it annotates.
    pub fn toggle_applied(&mut self, id: NodeId) {
        trace!("toggle applied: {id:?}");
        match id {
            NodeId::Header(h) => self.toggle_header(h),
            NodeId::Hunk(h, k) => {
                let Some(hunk) = self.hunk_mut(h, k) else {
                    return;
                };
                hunk.applied = !hunk.applied;
                hunk.partial = false;
                let applied = hunk.applied;
                for line in &mut hunk.lines {
                    line.applied = applied;
                }
                self.refresh_header(h);
            }
            NodeId::Line(h, k, l) => {
                let Some(hunk) = self.hunk_mut(h, k) else {
                    return;
                };
                if l >= hunk.lines.len() {
                    return;
                }
                let head = hunk.lines[..=l]
                    .iter()
                    .rposition(|line| line.op != LineOp::NoNewline)
                    .unwrap_or(l);
                let applied = !hunk.lines[head].applied;
                hunk.lines[head].applied = applied;
                for marker in hunk.lines[head + 1..]
                    .iter_mut()
                    .take_while(|line| line.op == LineOp::NoNewline)
                {
                    marker.applied = applied;
                }
                self.refresh_hunk(h, k);
                self.refresh_header(h);
            }
        }
    }

    fn toggle_header(&mut self, h: usize) {
        let Some(header) = self.headers.get_mut(h) else {
            return;
        };
        header.applied = !header.applied;
        header.partial = false;
        let applied = header.applied;
        for hunk in &mut header.hunks {
            hunk.applied = applied;
            hunk.partial = false;
            for line in &mut hunk.lines {
                line.applied = applied;
            }
        }
    }

    /// Recompute a hunk's state from its changed lines.
    fn refresh_hunk(&mut self, h: usize, k: usize) {
        let Some(hunk) = self.hunk_mut(h, k) else {
            return;
        };
        let mut lines = hunk.lines.iter().filter(|line| line.op != LineOp::NoNewline);
        let any = lines.clone().any(|line| line.applied);
        let all = lines.all(|line| line.applied);
        hunk.applied = any;
        hunk.partial = any && !all;
    }

    /// Recompute a header's state from its hunks.
    ///
    /// A special header keeps its applied flag when no hunk is applied.
    fn refresh_header(&mut self, h: usize) {
        let Some(header) = self.headers.get_mut(h) else {
            return;
        };
        let any = header.hunks.iter().any(|hunk| hunk.applied);
        if !any {
            if !header.is_special() {
                header.applied = false;
                header.partial = false;
            }
            return;
        }
        let all = header.hunks.iter().all(|hunk| hunk.applied);
        let some_partial = header.hunks.iter().any(|hunk| hunk.partial);
        header.applied = true;
        header.partial = some_partial || !all;
    }

    /// Flip the folded flag of a header or hunk.
    ///
    /// With `fold_parent`, or on the first unfold of a header, the fold
    /// applies to the parent of a hunk or line instead, and the hunks of a
    /// header are set to the header's new state. Returns the node whose
    /// flag changed, so a cursor on a hidden child can move to it. Lines
    /// cannot be folded; toggling one without `fold_parent` is a no-op.
    pub fn toggle_folded(&mut self, id: NodeId, fold_parent: bool) -> NodeId {
        let never_unfolded = match id {
            NodeId::Header(h) => self.headers.get(h).is_some_and(|header| header.never_unfolded),
            _ => false,
        };

        let mut target = id;
        if fold_parent || never_unfolded {
            match id {
                NodeId::Header(h) => {
                    if let Some(header) = self.headers.get_mut(h) {
                        header.never_unfolded = false;
                    }
                }
                _ => target = id.parent().unwrap_or(id),
            }
            if let NodeId::Header(h) = target
                && let Some(header) = self.headers.get_mut(h)
            {
                let folded = !header.folded;
                for hunk in &mut header.hunks {
                    hunk.folded = folded;
                }
            }
        }

        match target {
            NodeId::Header(h) => {
                if let Some(header) = self.headers.get_mut(h) {
                    header.folded = !header.folded;
                }
            }
            NodeId::Hunk(h, k) => {
                if let Some(hunk) = self.hunk_mut(h, k) {
                    hunk.folded = !hunk.folded;
                }
            }
            NodeId::Line(..) => {}
        }
        trace!("toggle folded: {id:?} -> {target:?}");
        target
    }
}
