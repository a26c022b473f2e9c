use error_set::error_set;
use std::process::Command;

pub mod patch;
pub mod refs;
pub mod selector;
pub mod text;

pub use patch::{LexError, ParseError, PatchError, PatchRoot};
pub use refs::RefError;
pub use selector::{Direction, Selector};

use patch::NodeId;
use refs::FileRefs;
use text::escape_bytes;

error_set! {
    /// Top-level error for git-crecord operations
    CrecordError := {
        #[display("No changes to record")]
        NoChanges,
        PatchError(PatchError),
        RefError(RefError),
    } || GitCommandError

    /// Errors from git command execution
    GitCommandError := {
        #[display("Failed to run git diff: {message}")]
        DiffFailed { message: String },
        #[display("git diff failed: {stderr}")]
        DiffExitError { stderr: String },
        #[display("Failed to spawn git apply: {message}")]
        ApplySpawnFailed { message: String },
        #[display("Failed to get stdin handle for git apply")]
        ApplyStdinFailed,
        #[display("Failed to write patch to git apply: {message}")]
        ApplyWriteFailed { message: String },
        #[display("Failed to wait for git apply: {message}")]
        ApplyWaitFailed { message: String },
        #[display("git apply failed: {stderr}")]
        ApplyExitError { stderr: String },
    }
}

/// Knobs for reading and staging changes.
#[derive(Debug, Clone, Default)]
pub struct RecordOptions {
    /// Only check that the patch applies, leaving the index alone
    pub check: bool,
    /// Limit the diff to these paths (all changes if empty)
    pub paths: Vec<String>,
}

/// Reads unstaged changes from git and stages selected parts of them.
pub struct Recorder<'a> {
    repo_path: &'a str,
    options: RecordOptions,
}

impl<'a> Recorder<'a> {
    /// Create a new Recorder for the given repository path
    pub fn new(repo_path: &'a str, options: RecordOptions) -> Self {
        Self { repo_path, options }
    }

    /// Parse the working tree's changes against the index.
    ///
    /// # Examples
    /// ```no_run
    /// # use git_crecord::{Recorder, RecordOptions};
    /// let recorder = Recorder::new(".", RecordOptions::default());
    /// let patch = recorder.load().unwrap();
    /// for header in &patch.headers {
    ///     println!("{}", header.filename());
    /// }
    /// ```
    pub fn load(&self) -> Result<PatchRoot, CrecordError> {
        let raw = self.raw_diff()?;
        if raw.is_empty() {
            return Err(CrecordError::NoChanges);
        }
        Ok(PatchRoot::parse(raw.as_slice())?)
    }

    /// Apply the selected part of `patch` to the index.
    ///
    /// Nothing is run when the selection is empty.
    pub fn stage(&self, patch: &PatchRoot) -> Result<(), CrecordError> {
        let filtered = patch.filter();
        if filtered.is_empty() {
            return Err(CrecordError::NoChanges);
        }
        Ok(self.apply_patch(&filtered.to_bytes())?)
    }

    /// Get raw git diff output of unstaged changes
    fn raw_diff(&self) -> Result<Vec<u8>, GitCommandError> {
        let mut args = vec![
            "-C",
            self.repo_path,
            "-c",
            "core.quotePath=false",
            "-c",
            "diff.mnemonicPrefix=false",
            "-c",
            "diff.noprefix=false",
            "diff",
            "--binary",
            "--no-color",
            "--no-ext-diff",
        ];

        if !self.options.paths.is_empty() {
            args.push("--");
            args.extend(self.options.paths.iter().map(|s| s.as_str()));
        }

        log::info!("running git {}", args.join(" "));
        let output =
            Command::new("git")
                .args(&args)
                .output()
                .map_err(|e| GitCommandError::DiffFailed {
                    message: e.to_string(),
                })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitCommandError::DiffExitError {
                stderr: stderr.into_owned(),
            });
        }

        Ok(output.stdout)
    }

    /// Apply a patch to the git index
    fn apply_patch(&self, patch: &[u8]) -> Result<(), GitCommandError> {
        use std::io::Write;

        let mut args = vec![
            "-C",
            self.repo_path,
            "apply",
            "--cached",
            "--whitespace=nowarn",
        ];
        if self.options.check {
            args.push("--check");
        }
        args.push("-");

        log::info!("running git {} ({} bytes)", args.join(" "), patch.len());
        let mut child = Command::new("git")
            .args(&args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| GitCommandError::ApplySpawnFailed {
                message: e.to_string(),
            })?;

        child
            .stdin
            .take()
            .ok_or(GitCommandError::ApplyStdinFailed)?
            .write_all(patch)
            .map_err(|e| GitCommandError::ApplyWriteFailed {
                message: e.to_string(),
            })?;

        let output = child
            .wait_with_output()
            .map_err(|e| GitCommandError::ApplyWaitFailed {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitCommandError::ApplyExitError {
                stderr: stderr.into_owned(),
            });
        }

        Ok(())
    }
}

/// Build a selection from `FILE[:SEL]` references.
///
/// With any `only` reference, everything is deselected first and the
/// referenced parts are selected; every `skip` reference is then
/// deselected.
pub fn select_refs(root: PatchRoot, only: &[FileRefs], skip: &[FileRefs]) -> Result<Selector, RefError> {
    let mut selector = Selector::new(root);
    if !only.is_empty() {
        selector.toggle_all();
        for refs in only {
            for id in refs.resolve(selector.root())? {
                selector.set_applied(id, true);
            }
        }
    }
    for refs in skip {
        for id in refs.resolve(selector.root())? {
            selector.set_applied(id, false);
        }
    }
    Ok(selector)
}

/// Render the patch tree with selection markers and the numbers that
/// `FILE:SEL` references use.
///
/// ```
/// use git_crecord::{PatchRoot, format_listing};
///
/// let raw = b"diff --git a/f b/f\n--- a/f\n+++ b/f\n@@ -1 +1 @@\n-old\n+new\n";
/// let patch = PatchRoot::parse(&raw[..]).unwrap();
/// assert_eq!(
///     format_listing(&patch),
///     "[x] M f\n    [x] 1 @@ -1,1 +1,1 @@\n        [x] 1.1 -old\n        [x] 1.2 +new\n"
/// );
/// ```
pub fn format_listing(root: &PatchRoot) -> String {
    let mut output = String::new();
    for (h, header) in root.headers.iter().enumerate() {
        output.push_str(&format!(
            "{} {} {}\n",
            selector::status_marker(root, NodeId::Header(h)),
            header.change_type(),
            header.filename()
        ));
        if header.is_binary() {
            output.push_str("    binary file (all or nothing)\n");
        }

        for (k, hunk) in header.hunks.iter().enumerate() {
            output.push_str(&format!(
                "    {} {} {}",
                selector::status_marker(root, NodeId::Hunk(h, k)),
                k + 1,
                hunk.range()
            ));
            if !hunk.proc.is_empty() {
                output.push(' ');
                output.push_str(&escape_bytes(&hunk.proc));
            }
            output.push('\n');

            for (l, line) in hunk.lines.iter().enumerate() {
                output.push_str(&format!(
                    "        {} {}.{} {}\n",
                    selector::status_marker(root, NodeId::Line(h, k, l)),
                    k + 1,
                    l + 1,
                    escape_bytes(&line.text).trim_end_matches('\n')
                ));
            }
        }
    }
    output
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use refs::parse_file_refs;

    const PATCH: &[u8] = b"diff --git a/src/main.rs b/src/main.rs
index 1111111..2222222 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,3 +1,3 @@ fn main()
 a
-b
+B
 c
@@ -10,2 +10,3 @@
 j
+k
 l
diff --git a/logo.png b/logo.png
index 3333333..4444444 100644
GIT binary patch
literal 1
IcmZo*00001

";

    fn refs(inputs: &[&str]) -> Vec<FileRefs> {
        inputs.iter().map(|input| parse_file_refs(input).unwrap()).collect()
    }

    #[test]
    fn listing_shows_state_and_numbers() {
        let mut patch = PatchRoot::parse(PATCH).unwrap();
        patch.toggle_applied(NodeId::Line(0, 0, 1));
        insta::assert_snapshot!(format_listing(&patch), @r"
        [~] M src/main.rs
            [~] 1 @@ -1,3 +1,2 @@ fn main()
                [x] 1.1 -b
                [ ] 1.2 +B
            [x] 2 @@ -10,2 +10,3 @@
                [x] 2.1 +k
        [x] M logo.png
            binary file (all or nothing)
        ");
    }

    #[test]
    fn only_refs_start_from_empty_selection() {
        let patch = PatchRoot::parse(PATCH).unwrap();
        let selector = select_refs(patch, &refs(&["src/main.rs:2"]), &[]).unwrap();
        let filtered = selector.filter();
        assert_eq!(filtered.headers.len(), 1);
        assert_eq!(filtered.headers[0].hunks.len(), 1);
        assert_eq!(filtered.headers[0].hunks[0].to_line, 10);
    }

    #[test]
    fn skip_refs_deselect() {
        let patch = PatchRoot::parse(PATCH).unwrap();
        let selector = select_refs(patch, &[], &refs(&["logo.png", "src/main.rs:1.2"])).unwrap();
        let filtered = selector.filter();
        assert_eq!(filtered.headers.len(), 1);
        assert_eq!(
            filtered.headers[0].hunks[0].to_string(),
            "@@ -1,3 +1,2 @@ fn main()\n a\n-b\n c\n"
        );
        assert_eq!(filtered.headers[0].hunks[1].to_line, 9);
    }

    #[test]
    fn unknown_ref_is_an_error() {
        let patch = PatchRoot::parse(PATCH).unwrap();
        let result = select_refs(patch, &refs(&["nope.rs"]), &[]);
        assert!(matches!(result, Err(RefError::UnknownFile { .. })));
    }
}
