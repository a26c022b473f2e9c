//! Parsing for `FILE[:SEL]` selection references.
//!
//! These name files, hunks and changed lines of a patch so a selection can
//! be made without a terminal front end, e.g. `--skip src/lib.rs:2`.
//!
//! # Syntax
//!
//! `FILE` alone names every change to a file. `FILE:SEL` narrows it, where
//! `SEL` is a comma-separated list of:
//! - `N` - hunk N of the file
//! - `N..M` - hunks N through M (inclusive)
//! - `N.L` - changed line L of hunk N
//!
//! Hunks and lines are numbered from 1, in the order `list` prints them.
//!
//! # Examples
//!
//! ```
//! use git_crecord::refs::{parse_file_refs, ChunkRef};
//! use std::num::NonZeroU32;
//!
//! let nz = |n| NonZeroU32::new(n).unwrap();
//!
//! let refs = parse_file_refs("flake.nix").unwrap();
//! assert_eq!(refs.file, "flake.nix");
//! assert!(refs.refs.is_empty());
//!
//! let refs = parse_file_refs("flake.nix:2,4..5,1.3").unwrap();
//! assert_eq!(refs.refs, vec![
//!     ChunkRef::Hunk(nz(2)),
//!     ChunkRef::HunkRange(nz(4), nz(5)),
//!     ChunkRef::Line(nz(1), nz(3)),
//! ]);
//! ```

use error_set::error_set;
use std::num::NonZeroU32;

use crate::patch::{NodeId, PatchRoot};

error_set! {
    /// Errors from parsing or resolving selection references
    RefError := {
        /// File name portion before the colon is empty or whitespace
        #[display("Invalid reference '{input}': file name cannot be empty")]
        EmptyFileName { input: String },
        /// A colon with nothing after it
        #[display("Invalid reference '{input}': no hunks given after ':'")]
        EmptyRefs { input: String },
        /// Hunk or line number could not be parsed as a valid non-zero u32
        #[display("Invalid number '{value}'")]
        InvalidNumber { value: String },
        /// Range has start greater than end
        #[display("Invalid range {start}..{end}: start must be <= end")]
        InvalidRange { start: u32, end: u32 },
        /// No file in the patch has this name
        #[display("No changes to '{file}' in the patch")]
        UnknownFile { file: String },
        #[display("'{file}' has no hunk {hunk}")]
        UnknownHunk { file: String, hunk: u32 },
        #[display("Hunk {hunk} of '{file}' has no line {line}")]
        UnknownLine { file: String, hunk: u32, line: u32 },
    }
}

/// A reference to part of one file's changes.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkRef {
    Hunk(NonZeroU32),
    /// Hunk range (inclusive start and end)
    HunkRange(NonZeroU32, NonZeroU32),
    /// Changed line of a hunk: (hunk, line)
    Line(NonZeroU32, NonZeroU32),
}

/// Parsed form of a `FILE[:SEL]` string.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRefs {
    pub file: String,
    /// Empty when the whole file is meant
    pub refs: Vec<ChunkRef>,
}

/// Parse a `FILE[:SEL]` string into structured data.
///
/// # Errors
///
/// Returns [`RefError`] if:
/// - File name is empty or whitespace
/// - A colon is present with no references after it
/// - Hunk or line numbers are invalid
pub fn parse_file_refs(input: &str) -> Result<FileRefs, RefError> {
    let (file, refs) = match input.split_once(':') {
        Some((file, refs)) => (file, Some(refs)),
        None => (input, None),
    };

    let file = file.trim();
    if file.is_empty() {
        return Err(RefError::EmptyFileName {
            input: input.to_string(),
        });
    }

    let refs = match refs {
        Some(refs) => parse_chunk_refs(input, refs)?,
        None => Vec::new(),
    };
    Ok(FileRefs {
        file: file.to_string(),
        refs,
    })
}

/// Parse the part after the colon: "2", "1..3", "2,1.4"
fn parse_chunk_refs(input: &str, refs: &str) -> Result<Vec<ChunkRef>, RefError> {
    let refs: Vec<ChunkRef> = refs
        .split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(parse_single_ref)
        .collect::<Result<Vec<_>, _>>()?;

    if refs.is_empty() {
        return Err(RefError::EmptyRefs {
            input: input.to_string(),
        });
    }

    Ok(refs)
}

fn parse_single_ref(input: &str) -> Result<ChunkRef, RefError> {
    if let Some((start, end)) = input.split_once("..") {
        let start = parse_number(start)?;
        let end = parse_number(end)?;
        if start > end {
            return Err(RefError::InvalidRange {
                start: start.get(),
                end: end.get(),
            });
        }
        Ok(ChunkRef::HunkRange(start, end))
    } else if let Some((hunk, line)) = input.split_once('.') {
        Ok(ChunkRef::Line(parse_number(hunk)?, parse_number(line)?))
    } else {
        Ok(ChunkRef::Hunk(parse_number(input)?))
    }
}

fn parse_number(input: &str) -> Result<NonZeroU32, RefError> {
    input
        .parse::<NonZeroU32>()
        .map_err(|_| RefError::InvalidNumber {
            value: input.to_string(),
        })
}

impl FileRefs {
    /// Find the nodes these references name in `root`.
    ///
    /// The file is matched against each header's display name.
    pub fn resolve(&self, root: &PatchRoot) -> Result<Vec<NodeId>, RefError> {
        let h = root
            .headers
            .iter()
            .position(|header| header.filename() == self.file)
            .ok_or_else(|| RefError::UnknownFile {
                file: self.file.clone(),
            })?;
        if self.refs.is_empty() {
            return Ok(vec![NodeId::Header(h)]);
        }

        let hunk_count = root.headers[h].hunks.len();
        let hunk_index = |hunk: NonZeroU32| {
            let k = hunk.get() as usize - 1;
            if k < hunk_count {
                Ok(k)
            } else {
                Err(RefError::UnknownHunk {
                    file: self.file.clone(),
                    hunk: hunk.get(),
                })
            }
        };

        let mut nodes = Vec::new();
        for chunk in &self.refs {
            match *chunk {
                ChunkRef::Hunk(hunk) => nodes.push(NodeId::Hunk(h, hunk_index(hunk)?)),
                ChunkRef::HunkRange(start, end) => {
                    let (start, end) = (hunk_index(start)?, hunk_index(end)?);
                    nodes.extend((start..=end).map(|k| NodeId::Hunk(h, k)));
                }
                ChunkRef::Line(hunk, line) => {
                    let k = hunk_index(hunk)?;
                    let l = line.get() as usize - 1;
                    if l >= root.headers[h].hunks[k].lines.len() {
                        return Err(RefError::UnknownLine {
                            file: self.file.clone(),
                            hunk: hunk.get(),
                            line: line.get(),
                        });
                    }
                    nodes.push(NodeId::Line(h, k, l));
                }
            }
        }
        Ok(nodes)
    }
}
