//! Lexer turning raw diff bytes into a flat stream of patch events.
//!
//! The scanner is binary-safe: lines are kept as raw bytes (including their
//! trailing newline) and never decoded. A single line of pushback lets the
//! scanner read one line ahead when deciding where an event ends.

use std::fmt;
use std::io::BufRead;

use nom::bytes::complete::{tag, take_till};
use nom::character::complete::{digit1, multispace0};
use nom::combinator::{map, map_opt, opt};
use nom::sequence::preceded;
use nom::{IResult, Parser};

use super::LexError;
use crate::text::escape_bytes;

/// Line numbers and function context of an `@@ -F,FL +T,TL @@ PROC` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    pub from_start: u32,
    pub from_len: u32,
    pub to_start: u32,
    pub to_len: u32,
    pub proc: Vec<u8>,
}

/// A group of lines recognised by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `diff --git` line plus everything up to and including `+++`
    File(Vec<Vec<u8>>),
    /// A parsed `@@` line
    Range(Range),
    /// Unchanged lines (and any `\` markers that follow them)
    Context(Vec<Vec<u8>>),
    /// Added/removed lines (and any `\` markers among them)
    Hunk(Vec<Vec<u8>>),
}

/// Discriminant of an [`Event`], used by the parser's transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    File,
    Range,
    Context,
    Hunk,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::File(_) => EventKind::File,
            Event::Range(_) => EventKind::Range,
            Event::Context(_) => EventKind::Context,
            Event::Hunk(_) => EventKind::Hunk,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::File => "file",
            EventKind::Range => "range",
            EventKind::Context => "context",
            EventKind::Hunk => "hunk",
        })
    }
}

/// Iterator over the [`Event`]s of a patch.
///
/// Stops after the first error.
pub struct Scanner<R> {
    reader: R,
    pushed: Option<Vec<u8>>,
    failed: bool,
}

impl<R: BufRead> Scanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pushed: None,
            failed: false,
        }
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>, LexError> {
        if let Some(line) = self.pushed.take() {
            return Ok(Some(line));
        }

        let mut line = Vec::new();
        let read = self
            .reader
            .read_until(b'\n', &mut line)
            .map_err(|e| LexError::Read {
                message: e.to_string(),
            })?;
        Ok((read > 0).then_some(line))
    }

    fn push_back(&mut self, line: Vec<u8>) {
        debug_assert!(self.pushed.is_none(), "only one line of pushback");
        self.pushed = Some(line);
    }

    /// Collect `first` and every following line matching `keep`.
    fn scan_while<F>(&mut self, first: Vec<u8>, keep: F) -> Result<Vec<Vec<u8>>, LexError>
    where
        F: Fn(&[u8]) -> bool,
    {
        let mut lines = vec![first];
        while let Some(line) = self.read_line()? {
            if keep(&line) {
                lines.push(line);
            } else {
                self.push_back(line);
                break;
            }
        }
        Ok(lines)
    }

    fn scan_event(&mut self, line: Vec<u8>) -> Result<Event, LexError> {
        if line.starts_with(b"diff --git a/") || line.starts_with(b"diff --git \"a/") {
            let mut header = self.scan_while(line, is_header_line)?;
            if let Some(from_file) = self.read_line()? {
                if from_file.starts_with(b"---") {
                    header.push(from_file);
                    if let Some(to_file) = self.read_line()? {
                        header.push(to_file);
                    }
                } else {
                    self.push_back(from_file);
                }
            }
            return Ok(Event::File(header));
        }

        match line.first() {
            Some(b' ') => Ok(Event::Context(
                self.scan_while(line, |l| matches!(l.first(), Some(b' ' | b'\\')))?,
            )),
            Some(b'+' | b'-') => Ok(Event::Hunk(
                self.scan_while(line, |l| matches!(l.first(), Some(b'+' | b'-' | b'\\')))?,
            )),
            _ => match range_line(&line) {
                Ok((_, range)) => Ok(Event::Range(range)),
                Err(_) => Err(LexError::UnknownContent {
                    line: escape_bytes(&line),
                }),
            },
        }
    }
}

impl<R: BufRead> Iterator for Scanner<R> {
    type Item = Result<Event, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let event = match self.read_line() {
            Ok(Some(line)) => self.scan_event(line),
            Ok(None) => return None,
            Err(e) => Err(e),
        };
        self.failed = event.is_err();
        Some(event)
    }
}

/// Lines belonging to a file header: anything whose first word is not
/// `---` or `diff` (blank lines included, for binary patch payloads).
fn is_header_line(line: &[u8]) -> bool {
    let first_word = line
        .split(|b| b.is_ascii_whitespace())
        .find(|word| !word.is_empty());
    !matches!(first_word, Some(b"---" | b"diff"))
}

fn number(input: &[u8]) -> IResult<&[u8], u32> {
    map_opt(digit1, |digits: &[u8]| {
        digits.iter().try_fold(0u32, |acc, digit| {
            acc.checked_mul(10)?.checked_add(u32::from(digit - b'0'))
        })
    })
    .parse(input)
}

/// Parse `@@ -F(,FL)? +T(,TL)? @@ PROC`; omitted lengths default to 1.
fn range_line(input: &[u8]) -> IResult<&[u8], Range> {
    map(
        (
            preceded(tag("@@ -"), number),
            opt(preceded(tag(","), number)),
            preceded(tag(" +"), number),
            opt(preceded(tag(","), number)),
            preceded((tag(" @@"), multispace0), take_till(|b| b == b'\n')),
        ),
        |(from_start, from_len, to_start, to_len, proc): (u32, Option<u32>, u32, Option<u32>, &[u8])| Range {
            from_start,
            from_len: from_len.unwrap_or(1),
            to_start,
            to_len: to_len.unwrap_or(1),
            proc: proc.to_vec(),
        },
    )
    .parse(input)
}
