//! Repository loader.
//!
//! Walks a working copy and collects the text-like source files the model
//! gets to see. Version-control and dependency directories are pruned, not
//! descended into. Paths are relative to the root and always use `/`.

use std::collections::HashSet;
use std::path::{Component, Path};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::LoaderConfig;
use crate::errors::FixError;

/// One file of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

/// Files in traversal order (depth-first, entries sorted by name).
#[derive(Debug, Clone, Default)]
pub struct CodebaseSnapshot {
    files: Vec<SourceFile>,
}

impl CodebaseSnapshot {
    pub fn new(files: Vec<SourceFile>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn get(&self, path: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.content.len()).sum()
    }
}

/// Loads snapshots according to a [`LoaderConfig`].
pub struct RepoLoader {
    extensions: HashSet<String>,
    excluded_dirs: HashSet<String>,
}

impl RepoLoader {
    pub fn new(config: &LoaderConfig) -> Self {
        Self {
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            excluded_dirs: config.excluded_dirs.iter().cloned().collect(),
        }
    }

    /// Walk `root` and read every allow-listed file.
    ///
    /// An unreadable root, or an unreadable directory or file inside it, is an
    /// `IOError`. Files that are not valid UTF-8 are skipped with a warning.
    pub fn load(&self, root: &Path) -> Result<CodebaseSnapshot, FixError> {
        let meta = std::fs::metadata(root).map_err(|e| FixError::io(root, e))?;
        if !meta.is_dir() {
            return Err(FixError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_pruned(entry));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
                FixError::io(path, source)
            })?;

            if !entry.file_type().is_file() || !self.is_allowed(entry.path()) {
                continue;
            }

            let bytes = std::fs::read(entry.path()).map_err(|e| FixError::io(entry.path(), e))?;
            let content = match String::from_utf8(bytes) {
                Ok(content) => content,
                Err(_) => {
                    warn!(path = %entry.path().display(), "skipping file that is not valid UTF-8");
                    continue;
                }
            };

            let Some(path) = relative_slash_path(root, entry.path()) else {
                continue;
            };
            debug!(%path, bytes = content.len(), "loaded source file");
            files.push(SourceFile { path, content });
        }

        Ok(CodebaseSnapshot::new(files))
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.excluded_dirs.contains(name))
    }

    fn is_allowed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }
}

/// `root`-relative path joined with `/` regardless of host separator.
fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn loader() -> RepoLoader {
        RepoLoader::new(&LoaderConfig::default())
    }

    fn paths(snapshot: &CodebaseSnapshot) -> Vec<&str> {
        snapshot.files().iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn test_load_excludes_vcs_and_dependency_dirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.js", "console.log(1);\n");
        write(dir.path(), ".git/config.txt", "tracked text inside git dir\n");
        write(dir.path(), ".git/hooks/readme.md", "# hook docs\n");
        write(dir.path(), "node_modules/lodash/index.js", "module.exports = {};\n");
        write(dir.path(), "lib/node_modules_helper.js", "// not a dependency dir\n");

        let snapshot = loader().load(dir.path()).unwrap();
        assert_eq!(paths(&snapshot), vec!["index.js", "lib/node_modules_helper.js"]);
    }

    #[test]
    fn test_load_filters_by_extension() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "README.md", "# readme\n");
        write(dir.path(), "logo.png", "not really a png");
        write(dir.path(), "Makefile", "all:\n");
        write(dir.path(), "style.CSS", "body {}\n");

        let snapshot = loader().load(dir.path()).unwrap();
        assert_eq!(paths(&snapshot), vec!["README.md", "style.CSS"]);
    }

    #[test]
    fn test_load_orders_depth_first_by_name() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.js", "b");
        write(dir.path(), "a/z.js", "az");
        write(dir.path(), "a/b/c.js", "abc");
        write(dir.path(), "c.md", "c");

        let snapshot = loader().load(dir.path()).unwrap();
        assert_eq!(paths(&snapshot), vec!["a/b/c.js", "a/z.js", "b.js", "c.md"]);
    }

    #[test]
    fn test_load_preserves_content_exactly() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/app.ts", "line one\r\n  line two\n\n");

        let snapshot = loader().load(dir.path()).unwrap();
        let file = snapshot.get("src/app.ts").unwrap();
        assert_eq!(file.content, "line one\r\n  line two\n\n");
        assert_eq!(snapshot.total_bytes(), file.content.len());
    }

    #[test]
    fn test_load_skips_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("binary.txt"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        write(dir.path(), "ok.txt", "fine\n");

        let snapshot = loader().load(dir.path()).unwrap();
        assert_eq!(paths(&snapshot), vec!["ok.txt"]);
    }

    #[test]
    fn test_load_missing_root_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let err = loader().load(&missing).unwrap_err();
        assert!(matches!(err, FixError::Io { .. }));
    }

    #[test]
    fn test_load_file_root_is_io_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "file.txt", "x");
        let err = loader().load(&dir.path().join("file.txt")).unwrap_err();
        assert!(matches!(err, FixError::Io { .. }));
    }

    #[test]
    fn test_custom_lists() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.rs", "fn main() {}\n");
        write(dir.path(), "vendor/dep.rs", "pub fn dep() {}\n");
        write(dir.path(), "notes.txt", "notes\n");

        let loader = RepoLoader::new(&LoaderConfig {
            extensions: vec![".rs".into()],
            excluded_dirs: vec!["vendor".into()],
        });
        let snapshot = loader.load(dir.path()).unwrap();
        assert_eq!(paths(&snapshot), vec!["main.rs"]);
    }

    #[test]
    fn test_empty_repo_yields_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let snapshot = loader().load(dir.path()).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.len(), 0);
    }

    #[test]
    fn test_relative_slash_path() {
        let root = Path::new("/repo");
        assert_eq!(
            relative_slash_path(root, &root.join("src").join("lib.rs")),
            Some("src/lib.rs".to_string())
        );
        assert_eq!(relative_slash_path(root, root), None);
        assert_eq!(relative_slash_path(root, Path::new("/other/x.rs")), None);
    }
}
