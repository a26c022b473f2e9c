use git_crecord::patch::NodeId;
use git_crecord::refs::parse_file_refs;
use git_crecord::{CrecordError, PatchRoot, RecordOptions, Recorder, format_listing, select_refs};
use git2::{Repository, Signature};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Test fixture for a git repository
struct Fixture {
    dir: TempDir,
    repo: Repository,
}

impl Fixture {
    /// Create a new empty repo with deterministic config
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let repo = Repository::init(dir.path()).expect("Failed to init repo");

        // Deterministic config
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
        config.set_bool("core.autocrlf", false).unwrap();

        Self { dir, repo }
    }

    fn path(&self) -> &str {
        self.dir.path().to_str().unwrap()
    }

    fn recorder(&self) -> Recorder<'_> {
        Recorder::new(self.path(), RecordOptions::default())
    }

    /// Write a file to the repo
    fn write_file(&self, name: &str, content: &[u8]) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Write, stage and commit a file
    fn commit_file(&self, name: &str, content: &[u8]) {
        self.write_file(name, content);
        let mut index = self.repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();

        let sig = Signature::new(
            "Test User",
            "test@example.com",
            &git2::Time::new(1234567890, 0),
        )
        .unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let parents = match self.repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => Vec::new(),
        };
        let parents: Vec<&git2::Commit> = parents.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, "commit", &tree, &parents)
            .unwrap();
    }

    /// Content of a file in the index, `None` if it is not staged
    fn staged(&self, name: &str) -> Option<Vec<u8>> {
        let mut index = self.repo.index().unwrap();
        index.read(true).unwrap();
        let entry = index.get_path(Path::new(name), 0)?;
        Some(self.repo.find_blob(entry.id).unwrap().content().to_vec())
    }
}

fn numbered(count: usize) -> String {
    (1..=count).map(|i| format!("line {i}\n")).collect()
}

/// 20 lines with line 2 and line 18 changed: two separate hunks.
fn two_hunk_fixture() -> Fixture {
    let fixture = Fixture::new();
    fixture.commit_file("notes.txt", numbered(20).as_bytes());
    let modified = numbered(20)
        .replace("line 2\n", "line two\n")
        .replace("line 18\n", "line 18\nline 18.5\n");
    fixture.write_file("notes.txt", modified.as_bytes());
    fixture
}

#[test]
fn stage_everything() {
    let fixture = two_hunk_fixture();
    let recorder = fixture.recorder();
    let patch = recorder.load().unwrap();
    assert_eq!(patch.headers.len(), 1);
    assert_eq!(patch.headers[0].hunks.len(), 2);

    recorder.stage(&patch).unwrap();
    assert_eq!(
        fixture.staged("notes.txt").unwrap(),
        fs::read(fixture.dir.path().join("notes.txt")).unwrap()
    );
}

#[test]
fn skipping_first_hunk_stages_second() {
    let fixture = two_hunk_fixture();
    let recorder = fixture.recorder();
    let mut patch = recorder.load().unwrap();
    patch.toggle_applied(NodeId::Hunk(0, 0));

    recorder.stage(&patch).unwrap();
    let expected = numbered(20).replace("line 18\n", "line 18\nline 18.5\n");
    assert_eq!(String::from_utf8(fixture.staged("notes.txt").unwrap()).unwrap(), expected);
}

#[test]
fn skipping_second_hunk_stages_first() {
    let fixture = two_hunk_fixture();
    let recorder = fixture.recorder();
    let patch = recorder.load().unwrap();
    let skip = vec![parse_file_refs("notes.txt:2").unwrap()];
    let selector = select_refs(patch, &[], &skip).unwrap();

    recorder.stage(selector.root()).unwrap();
    let expected = numbered(20).replace("line 2\n", "line two\n");
    assert_eq!(String::from_utf8(fixture.staged("notes.txt").unwrap()).unwrap(), expected);
}

#[test]
fn deselected_removal_stays_in_index() {
    let fixture = two_hunk_fixture();
    let recorder = fixture.recorder();
    let mut patch = recorder.load().unwrap();
    // Hunk 1 is "-line 2" then "+line two": keep the old line, add the new one.
    patch.toggle_applied(NodeId::Line(0, 0, 0));
    patch.toggle_applied(NodeId::Hunk(0, 1));

    recorder.stage(&patch).unwrap();
    let expected = numbered(20).replace("line 2\n", "line 2\nline two\n");
    assert_eq!(String::from_utf8(fixture.staged("notes.txt").unwrap()).unwrap(), expected);
}

#[test]
fn only_one_line_of_a_hunk() {
    let fixture = Fixture::new();
    fixture.commit_file("list.txt", numbered(5).as_bytes());
    fixture.write_file("list.txt", (numbered(5) + "six\nseven\neight\n").as_bytes());

    let recorder = fixture.recorder();
    let patch = recorder.load().unwrap();
    insta::assert_snapshot!(format_listing(&patch), @r"
    [x] M list.txt
        [x] 1 @@ -3,3 +3,6 @@ line 2
            [x] 1.1 +six
            [x] 1.2 +seven
            [x] 1.3 +eight
    ");

    let only = vec![parse_file_refs("list.txt:1.2").unwrap()];
    let selector = select_refs(patch, &only, &[]).unwrap();
    recorder.stage(selector.root()).unwrap();
    assert_eq!(
        String::from_utf8(fixture.staged("list.txt").unwrap()).unwrap(),
        numbered(5) + "seven\n"
    );
}

#[test]
fn deleted_file_is_staged_whole() {
    let fixture = Fixture::new();
    fixture.commit_file("keep.txt", b"keep\n");
    fixture.commit_file("gone.txt", b"bye\n");
    fs::remove_file(fixture.dir.path().join("gone.txt")).unwrap();

    let recorder = fixture.recorder();
    let patch = recorder.load().unwrap();
    assert!(patch.headers[0].is_special());
    recorder.stage(&patch).unwrap();
    assert_eq!(fixture.staged("gone.txt"), None);
    assert_eq!(fixture.staged("keep.txt"), Some(b"keep\n".to_vec()));
}

#[test]
fn only_a_deleted_file_stages_the_deletion() {
    let fixture = Fixture::new();
    fixture.commit_file("keep.txt", b"keep\n");
    fixture.commit_file("gone.txt", b"bye\n");
    fs::remove_file(fixture.dir.path().join("gone.txt")).unwrap();
    fixture.write_file("keep.txt", b"kept\n");

    let recorder = fixture.recorder();
    let patch = recorder.load().unwrap();
    let only = vec![parse_file_refs("gone.txt").unwrap()];
    let selector = select_refs(patch, &only, &[]).unwrap();
    let filtered = selector.filter();
    assert_eq!(filtered.headers.len(), 1);
    assert_eq!(filtered.headers[0].hunks.len(), 1);

    recorder.stage(selector.root()).unwrap();
    assert_eq!(fixture.staged("gone.txt"), None);
    assert_eq!(fixture.staged("keep.txt"), Some(b"keep\n".to_vec()));
}

#[test]
fn non_utf8_content_survives_staging() {
    let fixture = Fixture::new();
    fixture.commit_file("cp1251.txt", b"first\n");
    let content = b"first\n\xCD\xCE\xCD-\xD3\xD2\xD4-8 \xF2\xE5\xF1\xF2\n".to_vec();
    fixture.write_file("cp1251.txt", &content);

    let recorder = fixture.recorder();
    recorder.stage(&recorder.load().unwrap()).unwrap();
    assert_eq!(fixture.staged("cp1251.txt"), Some(content));
}

#[test]
fn check_leaves_index_untouched() {
    let fixture = two_hunk_fixture();
    let recorder = Recorder::new(
        fixture.path(),
        RecordOptions {
            check: true,
            paths: Vec::new(),
        },
    );
    recorder.stage(&recorder.load().unwrap()).unwrap();
    assert_eq!(fixture.staged("notes.txt"), Some(numbered(20).into_bytes()));
}

#[test]
fn paths_limit_the_diff() {
    let fixture = Fixture::new();
    fixture.commit_file("a.txt", b"a\n");
    fixture.commit_file("b.txt", b"b\n");
    fixture.write_file("a.txt", b"A\n");
    fixture.write_file("b.txt", b"B\n");

    let recorder = Recorder::new(
        fixture.path(),
        RecordOptions {
            check: false,
            paths: vec!["b.txt".to_string()],
        },
    );
    let patch = recorder.load().unwrap();
    let names: Vec<String> = patch.headers.iter().map(|header| header.filename()).collect();
    assert_eq!(names, vec!["b.txt"]);
}

#[test]
fn clean_tree_has_no_changes() {
    let fixture = Fixture::new();
    fixture.commit_file("a.txt", b"a\n");
    assert!(matches!(fixture.recorder().load(), Err(CrecordError::NoChanges)));
}

#[test]
fn empty_selection_is_not_applied() {
    let fixture = two_hunk_fixture();
    let recorder = fixture.recorder();
    let mut patch = recorder.load().unwrap();
    patch.toggle_applied(NodeId::Header(0));
    assert!(matches!(recorder.stage(&patch), Err(CrecordError::NoChanges)));
    assert_eq!(fixture.staged("notes.txt"), Some(numbered(20).into_bytes()));
}

#[test]
fn malformed_patch_stages_nothing() {
    let fixture = two_hunk_fixture();
    let result = PatchRoot::parse(
        &b"diff --git a/notes.txt b/notes.txt\n--- a/notes.txt\n+++ b/notes.txt\n???\n"[..],
    );
    assert!(result.is_err());
    assert_eq!(fixture.staged("notes.txt"), Some(numbered(20).into_bytes()));
}

#[test]
fn outside_a_repository_is_a_git_error() {
    let dir = TempDir::new().unwrap();
    let recorder = Recorder::new(dir.path().to_str().unwrap(), RecordOptions::default());
    assert!(matches!(recorder.load(), Err(CrecordError::DiffExitError { .. })));
}
