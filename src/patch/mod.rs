//! Patch document model: a parsed unified diff as a tree of
//! headers → hunks → changed lines, with selection state attached.

use error_set::error_set;

pub mod filter;
pub mod header;
pub mod hunk;
pub mod node;
pub mod parser;
pub mod scan;
pub mod select;

pub use header::{ChangeType, Header};
pub use hunk::{Hunk, HunkLine, HunkRange, LineOp};
pub use node::{Node, NodeId};
pub use parser::{State, parse_patch};
pub use scan::{Event, EventKind, Range, Scanner};

error_set! {
    /// Fatal errors raised while turning diff bytes into a [`PatchRoot`]
    PatchError := LexError || ParseError

    /// A line matched none of the recognised patch line shapes
    LexError := {
        #[display("unknown patch content: {line}")]
        UnknownContent { line: String },
        #[display("failed to read patch: {message}")]
        Read { message: String },
    }

    /// An event arrived in a state with no defined transition
    ParseError := {
        #[display("unhandled transition: {state} -> {event}")]
        UnhandledTransition { state: State, event: EventKind },
    }
}

/// All file headers of a patch, in the order they appear in the diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchRoot {
    pub headers: Vec<Header>,
}

impl PatchRoot {
    pub fn new(headers: Vec<Header>) -> Self {
        Self { headers }
    }

    /// Parse a complete patch from raw diff bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use git_crecord::patch::PatchRoot;
    ///
    /// let raw = b"diff --git a/f b/f\n--- a/f\n+++ b/f\n@@ -1 +1 @@\n-old\n+new\n";
    /// let patch = PatchRoot::parse(&raw[..]).unwrap();
    /// assert_eq!(patch.headers.len(), 1);
    /// assert_eq!(patch.headers[0].hunks.len(), 1);
    /// ```
    pub fn parse<R: std::io::BufRead>(reader: R) -> Result<Self, PatchError> {
        parse_patch(reader)
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterate every hunk of every header in document order.
    pub fn hunks(&self) -> impl Iterator<Item = &Hunk> {
        self.headers.iter().flat_map(|header| header.hunks.iter())
    }

    /// Serialize every header followed by its hunks.
    ///
    /// Hunks are written from their current selection state, so this is
    /// normally called on the result of [`PatchRoot::filter`].
    pub fn write_into(&self, out: &mut Vec<u8>) {
        for header in &self.headers {
            header.write_into(out);
            for hunk in &header.hunks {
                hunk.write_into(out);
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_into(&mut out);
        out
    }
}
