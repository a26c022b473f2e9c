use std::fmt;

use super::Hunk;
use crate::text::{closing_quote, escape_bytes, unquote_path};

/// One-letter status of a file change, as `git status --short` shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Modified,
    Added,
    Deleted,
    Copied,
    Renamed,
}

impl ChangeType {
    pub fn as_char(self) -> char {
        match self {
            ChangeType::Modified => 'M',
            ChangeType::Added => 'A',
            ChangeType::Deleted => 'D',
            ChangeType::Copied => 'C',
            ChangeType::Renamed => 'R',
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// The metadata block and hunks of one file's change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Raw header lines, from `diff --git` up to and including `+++`
    pub preamble: Vec<Vec<u8>>,
    pub hunks: Vec<Hunk>,
    pub applied: bool,
    pub partial: bool,
    pub folded: bool,
    pub(crate) never_unfolded: bool,
}

const SPECIAL_PREFIXES: [&[u8]; 4] = [b"new ", b"deleted ", b"copy ", b"rename "];

impl Header {
    pub fn new(preamble: Vec<Vec<u8>>) -> Self {
        Self {
            preamble,
            hunks: Vec::new(),
            applied: true,
            partial: false,
            folded: true,
            never_unfolded: true,
        }
    }

    pub fn is_binary(&self) -> bool {
        self.preamble
            .iter()
            .any(|line| line.starts_with(b"GIT binary patch"))
    }

    /// An all-or-nothing change (binary, creation, deletion, copy or
    /// rename) that cannot be split into hunks.
    pub fn is_special(&self) -> bool {
        self.is_binary()
            || self.preamble.iter().any(|line| {
                SPECIAL_PREFIXES
                    .iter()
                    .any(|prefix| line.starts_with(prefix))
            })
    }

    pub fn change_type(&self) -> ChangeType {
        self.preamble
            .iter()
            .fold(ChangeType::Modified, |change, line| {
                if line.starts_with(b"new file") {
                    ChangeType::Added
                } else if line.starts_with(b"deleted file") {
                    ChangeType::Deleted
                } else if line.starts_with(b"copy from") {
                    ChangeType::Copied
                } else if line.starts_with(b"rename from") {
                    ChangeType::Renamed
                } else {
                    change
                }
            })
    }

    /// Old and new path from the `diff --git` line, unquoted and without
    /// their `a/` / `b/` prefixes.
    ///
    /// The old path is `None` for an added file, the new path is `None` for
    /// a deleted one.
    pub fn files(&self) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
        let Some((from, to)) = self.preamble.first().and_then(|line| split_diff_line(line)) else {
            return (None, None);
        };

        let from = strip_prefix(unquote_path(from), b"a/");
        let to = strip_prefix(unquote_path(to), b"b/");
        match self.change_type() {
            ChangeType::Added => (None, Some(to)),
            ChangeType::Deleted => (Some(from), None),
            _ => (Some(from), Some(to)),
        }
    }

    /// Display name of the file: the new path, else the old one.
    pub fn filename(&self) -> String {
        match self.files() {
            (_, Some(path)) | (Some(path), None) => escape_bytes(&path),
            (None, None) => String::new(),
        }
    }

    /// Human-readable description of the change.
    ///
    /// The preamble is echoed up to the `---` line, which is replaced by a
    /// hunk and line count. Creations, deletions and binary payloads end the
    /// description early with a note instead.
    pub fn summary(&self) -> String {
        let mut text = String::new();
        for line in &self.preamble {
            if line.starts_with(b"GIT binary patch") {
                text.push_str("this modifies a binary file (all or nothing)\n");
                break;
            }
            if line.starts_with(b"new file ") || line.starts_with(b"deleted file ") {
                text.push_str(&escape_bytes(line));
                if self.is_binary() {
                    text.push_str("this is a binary file\n");
                }
                break;
            }
            if line.starts_with(b"---") {
                let changed: u32 = self
                    .hunks
                    .iter()
                    .map(|hunk| hunk.original_added().max(hunk.original_removed()))
                    .sum();
                text.push_str(&format!(
                    "{} hunks, {} lines changed\n",
                    self.hunks.len(),
                    changed
                ));
                break;
            }
            text.push_str(&escape_bytes(line));
        }
        text
    }

    /// Append the raw preamble lines.
    pub fn write_into(&self, out: &mut Vec<u8>) {
        for line in &self.preamble {
            out.extend_from_slice(line);
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Split `diff --git A B` into its two (possibly quoted) path tokens.
fn split_diff_line(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let paths = line.strip_prefix(b"diff --git ")?;
    let paths = paths.strip_suffix(b"\n").unwrap_or(paths);

    if paths.starts_with(b"\"") {
        let end = closing_quote(paths)?;
        let to = paths.get(end + 1..)?.strip_prefix(b" ")?;
        return Some((&paths[..=end], to));
    }

    let split = [&b" b/"[..], &b" \"b/"[..]]
        .iter()
        .filter_map(|needle| {
            paths
                .windows(needle.len())
                .rposition(|window| window == *needle)
        })
        .max()?;
    Some((&paths[..split], &paths[split + 1..]))
}

fn strip_prefix(path: Vec<u8>, prefix: &[u8]) -> Vec<u8> {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.to_vec(),
        None => path,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn header(text: &str) -> Header {
        Header::new(
            text.split_inclusive('\n')
                .map(|l| l.as_bytes().to_vec())
                .collect(),
        )
    }

    fn path(text: &str) -> Option<Vec<u8>> {
        Some(text.as_bytes().to_vec())
    }

    #[test]
    fn modified_file() {
        let h = header("diff --git a/src/lib.rs b/src/lib.rs\nindex 1111111..2222222 100644\n--- a/src/lib.rs\n+++ b/src/lib.rs\n");
        assert_eq!(h.change_type(), ChangeType::Modified);
        assert!(!h.is_special());
        assert!(!h.is_binary());
        assert_eq!(h.files(), (path("src/lib.rs"), path("src/lib.rs")));
        assert_eq!(h.filename(), "src/lib.rs");
    }

    #[test]
    fn added_file_has_no_old_path() {
        let h = header("diff --git a/new.txt b/new.txt\nnew file mode 100644\nindex 0000000..e69de29\n");
        assert_eq!(h.change_type(), ChangeType::Added);
        assert!(h.is_special());
        assert_eq!(h.files(), (None, path("new.txt")));
    }

    #[test]
    fn deleted_file_has_no_new_path() {
        let h = header("diff --git a/old.txt b/old.txt\ndeleted file mode 100644\n");
        assert_eq!(h.change_type(), ChangeType::Deleted);
        assert_eq!(h.files(), (path("old.txt"), None));
        assert_eq!(h.filename(), "old.txt");
    }

    #[test]
    fn renamed_file() {
        let h = header("diff --git a/before b/after\nsimilarity index 100%\nrename from before\nrename to after\n");
        assert_eq!(h.change_type(), ChangeType::Renamed);
        assert!(h.is_special());
        assert_eq!(h.files(), (path("before"), path("after")));
    }

    #[test]
    fn copied_file() {
        let h = header("diff --git a/src b/dst\nsimilarity index 100%\ncopy from src\ncopy to dst\n");
        assert_eq!(h.change_type(), ChangeType::Copied);
        assert_eq!(h.change_type().to_string(), "C");
    }

    #[test]
    fn quoted_paths_are_unquoted() {
        let h = header("diff --git \"a/\\321\\216 x\" \"b/\\321\\216 x\"\n");
        assert_eq!(h.files(), (path("ю x"), path("ю x")));
    }

    #[test]
    fn paths_with_spaces_split_at_last_prefix() {
        let h = header("diff --git a/with space b/with space\n");
        assert_eq!(h.files(), (path("with space"), path("with space")));
    }

    #[test]
    fn non_utf8_filename_is_escaped() {
        let h = header("diff --git \"a/\\315\\316\" \"b/\\315\\316\"\n");
        assert_eq!(h.filename(), "<CD><CE>");
    }

    #[test]
    fn binary_header() {
        let h = header("diff --git a/logo.png b/logo.png\nindex 1111111..2222222 100644\nGIT binary patch\nliteral 5\n");
        assert!(h.is_binary());
        assert!(h.is_special());
        insta::assert_snapshot!(h.summary(), @r"
        diff --git a/logo.png b/logo.png
        index 1111111..2222222 100644
        this modifies a binary file (all or nothing)
        ");
    }

    #[test]
    fn summary_counts_hunks_and_lines() {
        let mut h = header("diff --git a/f b/f\nindex 1111111..2222222 100644\n--- a/f\n+++ b/f\n");
        h.hunks.push(Hunk::new(
            1,
            1,
            Vec::new(),
            Vec::new(),
            vec![b"-a\n".to_vec(), b"+b\n".to_vec(), b"+c\n".to_vec()],
            Vec::new(),
        ));
        h.hunks.push(Hunk::new(10, 11, Vec::new(), Vec::new(), vec![b"-d\n".to_vec()], Vec::new()));
        insta::assert_snapshot!(h.to_string(), @r"
        diff --git a/f b/f
        index 1111111..2222222 100644
        2 hunks, 3 lines changed
        ");
    }

    #[test]
    fn summary_of_new_file_stops_at_mode_line() {
        let h = header("diff --git a/n b/n\nnew file mode 100644\nindex 0000000..1111111\n--- /dev/null\n+++ b/n\n");
        insta::assert_snapshot!(h.summary(), @r"
        diff --git a/n b/n
        new file mode 100644
        ");
    }

    #[test]
    fn preamble_is_written_verbatim() {
        let h = header("diff --git a/f b/f\n--- a/f\n+++ b/f\n");
        let mut out = Vec::new();
        h.write_into(&mut out);
        assert_eq!(out, b"diff --git a/f b/f\n--- a/f\n+++ b/f\n".to_vec());
    }
}
