use std::fmt;

use crate::text::escape_bytes;

/// Kind of a changed line, from its leading marker byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOp {
    /// `+`
    Add,
    /// `-`
    Remove,
    /// `\ No newline at end of file`
    NoNewline,
}

impl LineOp {
    pub fn marker(self) -> u8 {
        match self {
            LineOp::Add => b'+',
            LineOp::Remove => b'-',
            LineOp::NoNewline => b'\\',
        }
    }
}

/// One added or removed line (or a no-newline marker) inside a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkLine {
    /// Raw line including its leading marker and trailing newline
    pub text: Vec<u8>,
    pub op: LineOp,
    pub applied: bool,
}

impl HunkLine {
    pub fn new(text: Vec<u8>) -> Self {
        let op = match text.first() {
            Some(b'+') => LineOp::Add,
            Some(b'-') => LineOp::Remove,
            _ => LineOp::NoNewline,
        };
        Self {
            text,
            op,
            applied: true,
        }
    }

    /// The line without its marker byte.
    pub fn content(&self) -> &[u8] {
        self.text.get(1..).unwrap_or_default()
    }
}

/// Starting lines and lengths of a hunk as they appear in its `@@` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkRange {
    pub from_line: u32,
    pub from_len: u32,
    pub to_line: u32,
    pub to_len: u32,
}

impl fmt::Display for HunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@@ -{},{} +{},{} @@",
            self.from_line, self.from_len, self.to_line, self.to_len
        )
    }
}

/// One contiguous changed region of a file.
///
/// Counts are recomputed from the `applied` flags of the changed lines; the
/// parse-time counts are kept separately because deselected removals are
/// written back as context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based start in the old file, as parsed
    pub from_line: u32,
    /// 1-based start in the new file, as parsed (shifted by the filter)
    pub to_line: u32,
    /// Function context copied after the closing `@@`
    pub proc: Vec<u8>,
    /// Context lines preceding the changed lines
    pub before: Vec<Vec<u8>>,
    pub lines: Vec<HunkLine>,
    /// Context lines following the changed lines
    pub after: Vec<Vec<u8>>,
    pub applied: bool,
    pub partial: bool,
    pub folded: bool,
    original_added: u32,
    original_removed: u32,
}

impl Hunk {
    pub fn new(
        from_line: u32,
        to_line: u32,
        proc: Vec<u8>,
        before: Vec<Vec<u8>>,
        lines: Vec<Vec<u8>>,
        after: Vec<Vec<u8>>,
    ) -> Self {
        let lines: Vec<HunkLine> = lines.into_iter().map(HunkLine::new).collect();
        let original_added = count(&lines, LineOp::Add, false);
        let original_removed = count(&lines, LineOp::Remove, false);
        Self {
            from_line,
            to_line,
            proc,
            before,
            lines,
            after,
            applied: true,
            partial: false,
            folded: true,
            original_added,
            original_removed,
        }
    }

    /// Number of applied `+` lines.
    pub fn added(&self) -> u32 {
        count(&self.lines, LineOp::Add, true)
    }

    /// Number of applied `-` lines.
    pub fn removed(&self) -> u32 {
        count(&self.lines, LineOp::Remove, true)
    }

    /// Number of `+` lines at parse time.
    pub fn original_added(&self) -> u32 {
        self.original_added
    }

    /// Number of `-` lines at parse time.
    pub fn original_removed(&self) -> u32 {
        self.original_removed
    }

    /// Compute the `@@` line numbers for the current selection.
    ///
    /// Deselected removals become context, so they count towards both
    /// lengths. A trailing `\ No newline at end of file` in the after-context
    /// is not a line of either file. An empty side is anchored to the line
    /// preceding the hunk, as the unified format requires.
    pub fn range(&self) -> HunkRange {
        let added = self.added();
        let removed = self.removed();
        let removed_as_context = self.original_removed - removed;

        let mut context = (self.before.len() + self.after.len()) as u32 + removed_as_context;
        if self.after.last().is_some_and(|line| line.starts_with(b"\\")) {
            context -= 1;
        }

        let from_len = context + removed;
        let to_len = context + added;

        let mut from_line = self.from_line;
        let mut to_line = self.to_line;
        if from_len == 0 && from_line > 0 {
            from_line -= 1;
        }
        if to_len == 0 && to_line > 0 {
            to_line -= 1;
        }

        HunkRange {
            from_line,
            from_len,
            to_line,
            to_len,
        }
    }

    /// Append the hunk as unified diff, reflecting only applied changes.
    ///
    /// Applied lines are written as-is, a deselected addition is dropped and
    /// a deselected removal is written as a context line. Within a block of
    /// removals followed by additions, the n-th removal pairs with the n-th
    /// addition, so a removal turned into context is placed before the
    /// addition it pairs with. A no-newline marker is written iff the line
    /// it annotates is.
    pub fn write_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.range().to_string().as_bytes());
        if !self.proc.is_empty() {
            out.push(b' ');
            out.extend_from_slice(&self.proc);
        }
        out.push(b'\n');

        for line in &self.before {
            out.extend_from_slice(line);
        }

        let mut rest = self.lines.as_slice();
        while !rest.is_empty() {
            let (removals, after_removals) = take_units(rest, |op| op != LineOp::Add);
            let (additions, after_additions) = take_units(after_removals, |op| op == LineOp::Add);
            write_block(&removals, &additions, out);
            rest = after_additions;
        }

        for line in &self.after {
            out.extend_from_slice(line);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_into(&mut out);
        out
    }

    /// Change in file length this hunk introduces when written as selected,
    /// minus the change it introduced at parse time.
    pub(crate) fn offset_shift(&self) -> i64 {
        let written = if self.applied {
            i64::from(self.added()) - i64::from(self.removed())
        } else {
            0
        };
        written - (i64::from(self.original_added) - i64::from(self.original_removed))
    }
}

/// Split off the leading changed lines whose op satisfies `take`, grouping
/// each with the no-newline markers that follow it.
fn take_units<F>(lines: &[HunkLine], take: F) -> (Vec<&[HunkLine]>, &[HunkLine])
where
    F: Fn(LineOp) -> bool,
{
    let mut units = Vec::new();
    let mut rest = lines;
    while let Some(first) = rest.first()
        && take(first.op)
    {
        let len = 1 + rest[1..]
            .iter()
            .take_while(|line| line.op == LineOp::NoNewline)
            .count();
        let (unit, tail) = rest.split_at(len);
        units.push(unit);
        rest = tail;
    }
    (units, rest)
}

fn write_block(removals: &[&[HunkLine]], additions: &[&[HunkLine]], out: &mut Vec<u8>) {
    let mut next_removal = 0;
    let mut next_addition = 0;
    for (i, unit) in removals.iter().enumerate() {
        let head = &unit[0];
        if head.applied || head.op != LineOp::Remove {
            continue;
        }
        for removal in &removals[next_removal..i] {
            write_unit(removal, out);
        }
        let paired = i.min(additions.len()).max(next_addition);
        for addition in &additions[next_addition..paired] {
            write_unit(addition, out);
        }
        write_unit(unit, out);
        next_removal = i + 1;
        next_addition = paired;
    }
    for unit in removals[next_removal..].iter().chain(&additions[next_addition..]) {
        write_unit(unit, out);
    }
}

/// Write a changed line and its markers according to its selection.
fn write_unit(unit: &[HunkLine], out: &mut Vec<u8>) {
    let head = &unit[0];
    match head.op {
        LineOp::Add if !head.applied => return,
        LineOp::Remove if !head.applied => {
            out.push(b' ');
            out.extend_from_slice(head.content());
        }
        _ => out.extend_from_slice(&head.text),
    }
    for marker in &unit[1..] {
        out.extend_from_slice(&marker.text);
    }
}

fn count(lines: &[HunkLine], op: LineOp, applied_only: bool) -> u32 {
    lines
        .iter()
        .filter(|line| line.op == op && (line.applied || !applied_only))
        .count() as u32
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&escape_bytes(&self.to_bytes()))
    }
}
