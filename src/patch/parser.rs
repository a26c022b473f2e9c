//! State machine assembling scanner events into a [`PatchRoot`].
//!
//! The state is named after the last event consumed. The transition table
//! is total: every `(state, event)` pair maps to an action, and the pairs
//! with no meaning map to [`Action::Invalid`], which surfaces as a
//! [`ParseError::UnhandledTransition`].

use std::fmt;
use std::io::BufRead;
use std::mem;

use log::debug;

use super::scan::{Event, EventKind, Range, Scanner};
use super::{Header, Hunk, ParseError, PatchError, PatchRoot};
use crate::text::escape_bytes;

/// Parser state, named after the last event consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing consumed yet
    Start,
    File,
    Context,
    Hunk,
    Range,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Start => "start",
            State::File => "file",
            State::Context => "context",
            State::Hunk => "hunk",
            State::Range => "range",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    NewFile,
    AddRange,
    AddHunk,
    AddContext,
    Invalid,
}

fn transition(state: State, event: EventKind) -> Action {
    use EventKind as E;
    match (state, event) {
        (State::Start, E::File) => Action::NewFile,
        (State::Start, E::Range | E::Context | E::Hunk) => Action::Invalid,

        (State::File, E::File) => Action::NewFile,
        (State::File, E::Range) => Action::AddRange,
        (State::File, E::Hunk) => Action::AddHunk,
        (State::File, E::Context) => Action::AddContext,

        (State::Context, E::File) => Action::NewFile,
        (State::Context, E::Range) => Action::AddRange,
        (State::Context, E::Hunk) => Action::AddHunk,
        (State::Context, E::Context) => Action::Invalid,

        (State::Hunk, E::File) => Action::NewFile,
        (State::Hunk, E::Range) => Action::AddRange,
        (State::Hunk, E::Context) => Action::AddContext,
        (State::Hunk, E::Hunk) => Action::Invalid,

        (State::Range, E::Context) => Action::AddContext,
        (State::Range, E::Hunk) => Action::AddHunk,
        (State::Range, E::File | E::Range) => Action::Invalid,
    }
}

/// Running position and buffered lines of the hunk being assembled.
#[derive(Default)]
struct Builder {
    headers: Vec<Header>,
    from_line: u32,
    to_line: u32,
    proc: Vec<u8>,
    context: Vec<Vec<u8>>,
    before: Vec<Vec<u8>>,
    changed: Vec<Vec<u8>>,
}

impl Builder {
    fn new_file(&mut self, preamble: Vec<Vec<u8>>) {
        self.flush();
        debug!(
            "file header: {}",
            escape_bytes(preamble.first().map(Vec::as_slice).unwrap_or_default()).trim_end()
        );
        self.headers.push(Header::new(preamble));
        self.from_line = 0;
        self.to_line = 0;
        self.proc.clear();
        self.context.clear();
    }

    /// An empty side of a range names the line before the hunk; the
    /// builder tracks the line the hunk starts at, so step past it.
    fn add_range(&mut self, range: Range) {
        self.flush();
        self.context.clear();
        self.from_line = range.from_start + u32::from(range.from_len == 0);
        self.to_line = range.to_start + u32::from(range.to_len == 0);
        self.proc = range.proc;
    }

    fn add_hunk(&mut self, lines: Vec<Vec<u8>>) {
        self.changed = lines;
        self.before = mem::take(&mut self.context);
    }

    fn add_context(&mut self, lines: Vec<Vec<u8>>) {
        self.context = lines;
        if !self.changed.is_empty() {
            let after = mem::take(&mut self.context);
            self.finish_hunk(after);
        }
    }

    /// Finalize a pending hunk with no trailing context.
    fn flush(&mut self) {
        if !self.changed.is_empty() {
            self.finish_hunk(Vec::new());
        }
    }

    fn finish_hunk(&mut self, after: Vec<Vec<u8>>) {
        let hunk = Hunk::new(
            self.from_line,
            self.to_line,
            mem::take(&mut self.proc),
            mem::take(&mut self.before),
            mem::take(&mut self.changed),
            after,
        );
        let context = (hunk.before.len() + hunk.after.len()) as u32;
        self.from_line += context + hunk.original_removed();
        self.to_line += context + hunk.original_added();
        debug!(
            "hunk -{} +{}: {} added, {} removed",
            hunk.from_line,
            hunk.to_line,
            hunk.original_added(),
            hunk.original_removed()
        );

        // A header always precedes a hunk: the table rejects hunks in `Start`.
        if let Some(header) = self.headers.last_mut() {
            header.hunks.push(hunk);
        }
    }
}

/// Parse a unified diff into a tree of headers and hunks.
///
/// Fails on the first line the scanner cannot classify and on the first
/// event that arrives out of sequence.
pub fn parse_patch<R: BufRead>(reader: R) -> Result<PatchRoot, PatchError> {
    let mut builder = Builder::default();
    let mut state = State::Start;

    for event in Scanner::new(reader) {
        let event = event?;
        let kind = event.kind();
        let action = transition(state, kind);
        match (action, event) {
            (Action::NewFile, Event::File(lines)) => builder.new_file(lines),
            (Action::AddRange, Event::Range(range)) => builder.add_range(range),
            (Action::AddHunk, Event::Hunk(lines)) => builder.add_hunk(lines),
            (Action::AddContext, Event::Context(lines)) => builder.add_context(lines),
            _ => return Err(ParseError::UnhandledTransition { state, event: kind }.into()),
        }
        state = match kind {
            EventKind::File => State::File,
            EventKind::Range => State::Range,
            EventKind::Context => State::Context,
            EventKind::Hunk => State::Hunk,
        };
    }

    builder.flush();
    Ok(PatchRoot::new(builder.headers))
}
