//! Patch synthesis: model output → one aggregated unified diff.
//!
//! For each proposed change, in parse order:
//! 1. skip paths that are not in the snapshot or not on disk
//! 2. write the new content to the shadow file `<path>.new`
//! 3. diff original against shadow
//! 4. rewrite the header so both sides name the real path
//! 5. remove the shadow file, whatever happened in 2–4
//! 6. append the fragment
//!
//! Malformed or absent file blocks never fail synthesis; they only make the
//! patch smaller. Differ failures other than "files differ" are fatal.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::differ::TextDiffer;
use super::parser::{ProposedChange, parse_file_blocks};
use crate::errors::FixError;
use crate::repo::CodebaseSnapshot;

/// Suffix of the transient file holding proposed content.
pub const SHADOW_SUFFIX: &str = ".new";

/// Diff text for exactly one file, header already pointing at the real path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffFragment {
    pub path: String,
    pub text: String,
}

/// Fragments in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedPatch {
    fragments: Vec<DiffFragment>,
}

impl AggregatedPatch {
    pub fn from_fragments(fragments: Vec<DiffFragment>) -> Self {
        Self { fragments }
    }

    pub fn fragments(&self) -> &[DiffFragment] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Patch file body: fragments joined by a newline.
    pub fn render(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn push(&mut self, fragment: DiffFragment) {
        self.fragments.push(fragment);
    }
}

/// Patch plus the omissions that shaped it.
#[derive(Debug, Clone, Default)]
pub struct SynthesisReport {
    pub patch: AggregatedPatch,
    /// Proposed paths that are not files of the snapshot.
    pub skipped_unknown: Vec<String>,
    /// Proposed content equal to the original (modulo end-of-line whitespace).
    pub unchanged: Vec<String>,
    /// Paths proposed more than once.
    pub duplicates: Vec<String>,
    /// Path of a block cut off at end of output, if any.
    pub unterminated: Option<String>,
}

/// Transient `<path>.new` file, removed on drop.
struct ShadowFile {
    path: PathBuf,
}

impl ShadowFile {
    /// Create `path` exclusively and write `content` to it. An existing file
    /// at `path` belongs to the user and is an error, never overwritten.
    fn create(path: PathBuf, content: &str) -> Result<Self, FixError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| FixError::io(&path, e))?;
        // From here on the file is ours; the guard removes a partial write too.
        let shadow = Self { path };
        file.write_all(content.as_bytes())
            .map_err(|e| FixError::io(&shadow.path, e))?;
        Ok(shadow)
    }
}

impl Drop for ShadowFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed shadow file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove shadow file"),
        }
    }
}

/// Turns model output into an [`AggregatedPatch`] using a [`TextDiffer`].
pub struct PatchSynthesizer<'a> {
    differ: &'a dyn TextDiffer,
}

impl<'a> PatchSynthesizer<'a> {
    pub fn new(differ: &'a dyn TextDiffer) -> Self {
        Self { differ }
    }

    /// Synthesize a patch for `completion` against the files in `snapshot`,
    /// which were loaded from `repo_root`.
    pub fn synthesize(
        &self,
        completion: &str,
        snapshot: &CodebaseSnapshot,
        repo_root: &Path,
    ) -> Result<SynthesisReport, FixError> {
        let parsed = parse_file_blocks(completion);
        info!(blocks = parsed.changes.len(), "parsed file blocks from completion");

        let mut report = SynthesisReport {
            duplicates: parsed.duplicates,
            unterminated: parsed.unterminated,
            ..Default::default()
        };

        for change in &parsed.changes {
            match self.diff_change(change, snapshot, repo_root)? {
                ChangeOutcome::Fragment(fragment) => {
                    info!(path = %fragment.path, "generated diff");
                    report.patch.push(fragment);
                }
                ChangeOutcome::Unknown => {
                    warn!(path = %change.path, "skipping unknown file");
                    report.skipped_unknown.push(change.path.clone());
                }
                ChangeOutcome::Unchanged => {
                    debug!(path = %change.path, "proposed content matches original");
                    report.unchanged.push(change.path.clone());
                }
            }
        }

        Ok(report)
    }

    fn diff_change(
        &self,
        change: &ProposedChange,
        snapshot: &CodebaseSnapshot,
        repo_root: &Path,
    ) -> Result<ChangeOutcome, FixError> {
        let Some(original) = snapshot.get(&change.path) else {
            return Ok(ChangeOutcome::Unknown);
        };
        if !repo_root.join(&change.path).is_file() {
            return Ok(ChangeOutcome::Unknown);
        }
        if original.content == change.new_content {
            return Ok(ChangeOutcome::Unchanged);
        }

        let shadow_rel = format!("{}{}", change.path, SHADOW_SUFFIX);
        let shadow = ShadowFile::create(repo_root.join(&shadow_rel), &change.new_content)?;
        let diff = self.differ.diff(repo_root, &change.path, &shadow_rel);
        drop(shadow);

        match diff? {
            Some(text) if !text.trim().is_empty() => Ok(ChangeOutcome::Fragment(DiffFragment {
                path: change.path.clone(),
                text: rewrite_header(&text, &change.path),
            })),
            _ => Ok(ChangeOutcome::Unchanged),
        }
    }
}

enum ChangeOutcome {
    Fragment(DiffFragment),
    Unknown,
    Unchanged,
}

/// Rebuild the file-identity lines of a diff so both sides name `path`.
///
/// The `diff --git`, `---` and `+++` lines are regenerated from `path` in
/// git's own notation rather than patched textually, so quoted names
/// can't keep the shadow suffix. Mode-change lines caused by the shadow's
/// permissions are dropped. Everything from the first hunk on is kept
/// verbatim.
pub fn rewrite_header(diff: &str, path: &str) -> String {
    let old_name = quote_path("a/", path);
    let new_name = quote_path("b/", path);
    // git ends ---/+++ names containing a space with a tab.
    let tab = if path.contains(' ') { "\t" } else { "" };

    let mut out = String::with_capacity(diff.len());
    let mut in_header = true;
    for line in diff.split_inclusive('\n') {
        if in_header && line.starts_with("@@") {
            in_header = false;
        }
        if !in_header {
            out.push_str(line);
        } else if line.starts_with("diff --git ") {
            out.push_str(&format!("diff --git {} {}\n", old_name, new_name));
        } else if line.starts_with("--- ") {
            out.push_str(&format!("--- {}{}\n", old_name, tab));
        } else if line.starts_with("+++ ") {
            out.push_str(&format!("+++ {}{}\n", new_name, tab));
        } else if line.starts_with("old mode ") || line.starts_with("new mode ") {
            continue;
        } else {
            out.push_str(line);
        }
    }
    out
}

/// `prefix` + `path`, C-quoted the way git quotes names with
/// `core.quotePath=false`: only `"`, `\` and control characters force quoting.
fn quote_path(prefix: &str, path: &str) -> String {
    let needs_quoting = path
        .chars()
        .any(|c| c == '"' || c == '\\' || c.is_ascii_control());
    if !needs_quoting {
        return format!("{}{}", prefix, path);
    }

    let mut quoted = String::with_capacity(path.len() + prefix.len() + 2);
    quoted.push('"');
    quoted.push_str(prefix);
    for c in path.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\x07' => quoted.push_str("\\a"),
            '\x08' => quoted.push_str("\\b"),
            '\t' => quoted.push_str("\\t"),
            '\n' => quoted.push_str("\\n"),
            '\x0b' => quoted.push_str("\\v"),
            '\x0c' => quoted.push_str("\\f"),
            '\r' => quoted.push_str("\\r"),
            c if c.is_ascii_control() => quoted.push_str(&format!("\\{:03o}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DiffToolError;
    use crate::patch::differ::BuiltinDiffer;
    use crate::repo::SourceFile;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Repo {
        dir: TempDir,
        snapshot: CodebaseSnapshot,
    }

    fn repo(files: &[(&str, &str)]) -> Repo {
        let dir = TempDir::new().unwrap();
        let mut sources = Vec::new();
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(&full, content).unwrap();
            sources.push(SourceFile {
                path: path.to_string(),
                content: content.to_string(),
            });
        }
        Repo {
            dir,
            snapshot: CodebaseSnapshot::new(sources),
        }
    }

    fn shadow_files(root: &Path) -> Vec<PathBuf> {
        walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().ends_with(SHADOW_SUFFIX))
            .map(|e| e.path().to_path_buf())
            .collect()
    }

    fn synthesize(repo: &Repo, completion: &str) -> SynthesisReport {
        PatchSynthesizer::new(&BuiltinDiffer)
            .synthesize(completion, &repo.snapshot, repo.dir.path())
            .unwrap()
    }

    #[test]
    fn test_single_changed_file_yields_one_fragment() {
        let repo = repo(&[("src/app.js", "let a = 1;\n"), ("README.md", "# hi\n")]);
        let report = synthesize(&repo, "Fix:\nFile: src/app.js\n```js\nlet a = 2;\n```\n");

        assert_eq!(report.patch.len(), 1);
        let fragment = &report.patch.fragments()[0];
        assert_eq!(fragment.path, "src/app.js");
        assert!(fragment.text.starts_with("diff --git a/src/app.js b/src/app.js\n"));
        assert!(fragment.text.contains("--- a/src/app.js\n+++ b/src/app.js\n"));
        assert!(fragment.text.contains("-let a = 1;\n+let a = 2;\n"));
        assert!(shadow_files(repo.dir.path()).is_empty());
    }

    #[test]
    fn test_no_blocks_yields_empty_patch() {
        let repo = repo(&[("a.js", "x\n")]);
        for completion in ["", "I cannot fix this.", "```js\nx\n```", "File: a.js\n```js\nunterminated"] {
            let report = synthesize(&repo, completion);
            assert!(report.patch.is_empty(), "expected empty patch for {:?}", completion);
            assert_eq!(report.patch.render(), "");
        }
    }

    #[test]
    fn test_unknown_path_is_skipped_others_kept() {
        let repo = repo(&[("a.js", "a\n")]);
        let report = synthesize(
            &repo,
            "File: missing.js\n```js\nnew\n```\nFile: a.js\n```js\nA\n```\n",
        );
        assert_eq!(report.skipped_unknown, vec!["missing.js".to_string()]);
        assert_eq!(report.patch.len(), 1);
        assert_eq!(report.patch.fragments()[0].path, "a.js");
        assert!(!repo.dir.path().join("missing.js").exists());
        assert!(!repo.dir.path().join("missing.js.new").exists());
    }

    #[test]
    fn test_path_outside_snapshot_is_skipped_even_if_on_disk() {
        let repo = repo(&[("a.js", "a\n")]);
        fs::create_dir_all(repo.dir.path().join(".git")).unwrap();
        fs::write(repo.dir.path().join(".git/config.txt"), "x\n").unwrap();
        let report = synthesize(&repo, "File: .git/config.txt\n```\ny\n```\nFile: ../a.js\n```\nz\n```\n");
        assert!(report.patch.is_empty());
        assert_eq!(report.skipped_unknown.len(), 2);
    }

    #[test]
    fn test_identical_content_yields_no_fragment() {
        let repo = repo(&[("a.js", "same\n"), ("b.js", "old\n")]);
        let report = synthesize(
            &repo,
            "File: a.js\n```js\nsame\n```\nFile: b.js\n```js\nnew\n```\n",
        );
        assert_eq!(report.patch.len(), 1);
        assert_eq!(report.patch.fragments()[0].path, "b.js");
        assert_eq!(report.unchanged, vec!["a.js".to_string()]);
    }

    #[test]
    fn test_trailing_whitespace_only_change_yields_no_fragment() {
        let repo = repo(&[("a.js", "x\ny\n")]);
        let report = synthesize(&repo, "File: a.js\n```js\nx   \ny\n```\n");
        assert!(report.patch.is_empty());
        assert_eq!(report.unchanged, vec!["a.js".to_string()]);
        assert!(shadow_files(repo.dir.path()).is_empty());
    }

    #[test]
    fn test_duplicate_path_uses_last_content() {
        let repo = repo(&[("a.js", "orig\n")]);
        let report = synthesize(
            &repo,
            "File: a.js\n```js\nfirst\n```\nFile: a.js\n```js\nsecond\n```\n",
        );
        assert_eq!(report.patch.len(), 1);
        let text = &report.patch.fragments()[0].text;
        assert!(text.contains("+second\n"));
        assert!(!text.contains("first"));
        assert_eq!(report.duplicates, vec!["a.js".to_string()]);
    }

    #[test]
    fn test_fragments_follow_parse_order() {
        let repo = repo(&[("a.js", "a\n"), ("b.js", "b\n"), ("c.js", "c\n")]);
        let report = synthesize(
            &repo,
            "File: c.js\n```\nC\n```\nFile: a.js\n```\nA\n```\nFile: b.js\n```\nB\n```\n",
        );
        let order: Vec<_> = report.patch.fragments().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(order, vec!["c.js", "a.js", "b.js"]);
    }

    #[test]
    fn test_render_joins_fragments_with_newline() {
        let repo = repo(&[("a.js", "a\n"), ("b.js", "b\n")]);
        let report = synthesize(&repo, "File: a.js\n```\nA\n```\nFile: b.js\n```\nB\n```\n");
        let rendered = report.patch.render();
        let fragments = report.patch.fragments();
        assert_eq!(rendered, format!("{}\n{}", fragments[0].text, fragments[1].text));
    }

    #[test]
    fn test_synthesis_is_idempotent() {
        let repo = repo(&[("a.js", "a\nb\n"), ("b.md", "# b\n")]);
        let completion = "File: a.js\n```js\na\nB\n```\nFile: b.md\n```md\n# B\n```\n";
        let first = synthesize(&repo, completion).patch.render();
        let second = synthesize(&repo, completion).patch.render();
        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(repo.dir.path().join("a.js")).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_no_fragment_header_names_shadow_path() {
        let repo = repo(&[("src/x.new.js", "1\n"), ("y.txt", "2\n")]);
        let report = synthesize(
            &repo,
            "File: src/x.new.js\n```\none\n```\nFile: y.txt\n```\ntwo\n```\n",
        );
        assert_eq!(report.patch.len(), 2);
        for fragment in report.patch.fragments() {
            for line in fragment.text.lines().take_while(|l| !l.starts_with("@@")) {
                assert!(!line.trim_end().ends_with(SHADOW_SUFFIX), "shadow path in {:?}", line);
            }
        }
    }

    struct FailingDiffer {
        seen_shadow: Mutex<Option<bool>>,
    }

    impl TextDiffer for FailingDiffer {
        fn diff(
            &self,
            repo_root: &Path,
            _original: &str,
            shadow: &str,
        ) -> Result<Option<String>, DiffToolError> {
            *self.seen_shadow.lock().unwrap() = Some(repo_root.join(shadow).exists());
            Err(DiffToolError::Spawn {
                program: "git".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "git not found"),
            })
        }
    }

    #[test]
    fn test_differ_failure_is_fatal_and_shadow_is_cleaned() {
        let repo = repo(&[("a.js", "a\n")]);
        let differ = FailingDiffer {
            seen_shadow: Mutex::new(None),
        };
        let err = PatchSynthesizer::new(&differ)
            .synthesize("File: a.js\n```\nb\n```\n", &repo.snapshot, repo.dir.path())
            .unwrap_err();

        assert!(matches!(err, FixError::DiffTool(DiffToolError::Spawn { .. })));
        assert_eq!(*differ.seen_shadow.lock().unwrap(), Some(true));
        assert!(shadow_files(repo.dir.path()).is_empty());
    }

    struct RecordingDiffer {
        calls: Mutex<Vec<String>>,
    }

    impl TextDiffer for RecordingDiffer {
        fn diff(
            &self,
            repo_root: &Path,
            original: &str,
            shadow: &str,
        ) -> Result<Option<String>, DiffToolError> {
            let content = fs::read_to_string(repo_root.join(shadow)).unwrap();
            self.calls.lock().unwrap().push(format!("{}={}", original, content));
            Ok(Some(format!(
                "diff --git a/{o} b/{s}\nold mode 100755\nnew mode 100644\nindex 1..2\n--- a/{o}\n+++ b/{s}\n@@ -1 +1 @@\n-x\n+{s}\n",
                o = original,
                s = shadow
            )))
        }
    }

    #[test]
    fn test_shadow_receives_verbatim_content_and_header_is_rewritten() {
        let repo = repo(&[("dir/a.js", "x\n")]);
        let differ = RecordingDiffer {
            calls: Mutex::new(Vec::new()),
        };
        let report = PatchSynthesizer::new(&differ)
            .synthesize("File: dir/a.js\n```\n  new\r\n\n```\n", &repo.snapshot, repo.dir.path())
            .unwrap();

        assert_eq!(*differ.calls.lock().unwrap(), vec!["dir/a.js=  new\r\n\n".to_string()]);
        assert_eq!(
            report.patch.fragments()[0].text,
            "diff --git a/dir/a.js b/dir/a.js\nindex 1..2\n--- a/dir/a.js\n+++ b/dir/a.js\n@@ -1 +1 @@\n-x\n+dir/a.js.new\n"
        );
        assert!(shadow_files(repo.dir.path()).is_empty());
    }

    #[test]
    fn test_rewrite_header_leaves_hunks_alone() {
        let diff = "diff --git a/f b/f.new\n--- a/f\n+++ b/f.new\n@@ -1 +1 @@\n-see b/f.new\n+see b/f.new!\n";
        assert_eq!(
            rewrite_header(diff, "f"),
            "diff --git a/f b/f\n--- a/f\n+++ b/f\n@@ -1 +1 @@\n-see b/f.new\n+see b/f.new!\n"
        );
    }

    #[test]
    fn test_rewrite_header_with_tab_terminated_names() {
        let diff = "diff --git a/s p b/s p.new\n--- a/s p\t\n+++ b/s p.new\t\n@@ -1 +1 @@\n-a\n+b\n";
        let rewritten = rewrite_header(diff, "s p");
        assert!(rewritten.contains("+++ b/s p\t\n"));
        assert!(rewritten.starts_with("diff --git a/s p b/s p\n"));
    }

    #[test]
    fn test_rewrite_header_regenerates_quoted_names() {
        let diff = concat!(
            "diff --git \"a/we\\\"ird.js\" \"b/we\\\"ird.js.new\"\n",
            "index 1..2 100644\n",
            "--- \"a/we\\\"ird.js\"\n",
            "+++ \"b/we\\\"ird.js.new\"\n",
            "@@ -1 +1 @@\n-a\n+b\n",
        );
        assert_eq!(
            rewrite_header(diff, "we\"ird.js"),
            concat!(
                "diff --git \"a/we\\\"ird.js\" \"b/we\\\"ird.js\"\n",
                "index 1..2 100644\n",
                "--- \"a/we\\\"ird.js\"\n",
                "+++ \"b/we\\\"ird.js\"\n",
                "@@ -1 +1 @@\n-a\n+b\n",
            )
        );
    }

    #[test]
    fn test_quote_path_matches_git_notation() {
        assert_eq!(quote_path("a/", "src/app.js"), "a/src/app.js");
        assert_eq!(quote_path("a/", "s p.js"), "a/s p.js");
        assert_eq!(quote_path("b/", "caf\u{e9}.js"), "b/caf\u{e9}.js");
        assert_eq!(quote_path("b/", "x\\y"), "\"b/x\\\\y\"");
        assert_eq!(quote_path("a/", "t\tab"), "\"a/t\\tab\"");
        assert_eq!(quote_path("a/", "e\x1b"), "\"a/e\\033\"");
    }

    #[test]
    fn test_shadow_write_failure_is_io_error() {
        let repo = repo(&[("a.js", "a\n")]);
        // A directory squatting on the shadow path makes the write fail.
        fs::create_dir_all(repo.dir.path().join("a.js.new")).unwrap();
        let err = PatchSynthesizer::new(&BuiltinDiffer)
            .synthesize("File: a.js\n```\nb\n```\n", &repo.snapshot, repo.dir.path())
            .unwrap_err();
        assert!(matches!(err, FixError::Io { .. }));
        assert!(repo.dir.path().join("a.js.new").is_dir());
    }

    #[test]
    fn test_existing_shadow_path_is_left_untouched() {
        let repo = repo(&[("a.js", "a\n"), ("notes/a.js.new", "keep\n")]);
        fs::write(repo.dir.path().join("a.js.new"), "user data\n").unwrap();

        let err = PatchSynthesizer::new(&BuiltinDiffer)
            .synthesize("File: a.js\n```\nb\n```\n", &repo.snapshot, repo.dir.path())
            .unwrap_err();

        assert!(matches!(err, FixError::Io { .. }));
        assert_eq!(
            fs::read_to_string(repo.dir.path().join("a.js.new")).unwrap(),
            "user data\n"
        );
    }

    mod with_git {
        use super::*;
        use crate::patch::differ::GitDiffer;
        use std::process::Command;

        fn git_available() -> bool {
            Command::new("git")
                .arg("--version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        }

        fn synthesize_with_git(repo: &Repo, completion: &str) -> SynthesisReport {
            PatchSynthesizer::new(&GitDiffer::default())
                .synthesize(completion, &repo.snapshot, repo.dir.path())
                .unwrap()
        }

        /// Write `patch` into the repo and ask git whether it applies cleanly.
        fn assert_applies(repo: &Repo, patch: &str) {
            let root = repo.dir.path();
            let init = Command::new("git").args(["init", "-q"]).current_dir(root).output().unwrap();
            assert!(init.status.success());
            fs::write(root.join("patch.diff"), patch).unwrap();
            let check = Command::new("git")
                .args(["apply", "--check", "patch.diff"])
                .current_dir(root)
                .output()
                .unwrap();
            assert!(
                check.status.success(),
                "git apply --check failed: {}\n{}",
                String::from_utf8_lossy(&check.stderr),
                patch
            );
        }

        #[test]
        fn test_nested_path_header_names_real_file() {
            if !git_available() {
                return;
            }
            let repo = repo(&[("src/deep/app.js", "let a = 1;\nlet b = 2;\n")]);
            let report = synthesize_with_git(
                &repo,
                "File: src/deep/app.js\n```js\nlet a = 1;\nlet b = 3;\n```\n",
            );

            assert_eq!(report.patch.len(), 1);
            let text = &report.patch.fragments()[0].text;
            let header: Vec<_> = text.lines().take_while(|l| !l.starts_with("@@")).collect();
            assert_eq!(header[0], "diff --git a/src/deep/app.js b/src/deep/app.js");
            assert!(header.contains(&"--- a/src/deep/app.js"));
            assert!(header.contains(&"+++ b/src/deep/app.js"));
            assert!(text.contains("-let b = 2;\n+let b = 3;\n"));
            assert!(shadow_files(repo.dir.path()).is_empty());
            assert_applies(&repo, &report.patch.render());
        }

        #[cfg(unix)]
        #[test]
        fn test_executable_original_has_no_mode_lines() {
            use std::os::unix::fs::PermissionsExt;

            if !git_available() {
                return;
            }
            let repo = repo(&[("bin/run.sh", "#!/bin/sh\necho old\n")]);
            let script = repo.dir.path().join("bin/run.sh");
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

            let report = synthesize_with_git(
                &repo,
                "File: bin/run.sh\n```sh\n#!/bin/sh\necho new\n```\n",
            );

            let text = &report.patch.fragments()[0].text;
            assert!(!text.contains("old mode"), "{}", text);
            assert!(!text.contains("new mode"), "{}", text);
            assert!(text.starts_with("diff --git a/bin/run.sh b/bin/run.sh\n"));
            assert_applies(&repo, &report.patch.render());
        }

        #[cfg(unix)]
        #[test]
        fn test_quoted_name_header_drops_shadow_suffix() {
            if !git_available() {
                return;
            }
            let repo = repo(&[("we\"ird.js", "x\n"), ("plain.js", "p\n")]);
            let report = synthesize_with_git(
                &repo,
                "File: we\"ird.js\n```\ny\n```\nFile: plain.js\n```\nq\n```\n",
            );

            assert_eq!(report.patch.len(), 2);
            let text = &report.patch.fragments()[0].text;
            assert!(!text.contains(SHADOW_SUFFIX), "{}", text);
            assert!(text.starts_with("diff --git \"a/we\\\"ird.js\" \"b/we\\\"ird.js\"\n"));
            assert!(text.contains("+++ \"b/we\\\"ird.js\"\n"));
            assert_applies(&repo, &report.patch.render());
        }
    }
}
