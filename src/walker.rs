//! Local enumeration: recursive directory walk producing sorted [`FileEntry`]
//! records, with fnmatch-style exclude patterns applied to the relative path.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use regex::Regex;
use tracing::debug;

/// One local file as seen by the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the walk root, forward-slash separated.
    pub rel: String,
    pub size: u64,
    /// Modification time as epoch seconds.
    pub mtime: i64,
}

#[derive(Debug)]
pub enum WalkError {
    Io(std::io::Error),
    NotADirectory(PathBuf),
    BadPattern(String),
}

impl From<std::io::Error> for WalkError {
    fn from(e: std::io::Error) -> Self {
        WalkError::Io(e)
    }
}

impl fmt::Display for WalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkError::Io(e) => write!(f, "I/O error during walk: {e}"),
            WalkError::NotADirectory(p) => {
                write!(f, "local_dir not found or not a directory: {}", p.display())
            }
            WalkError::BadPattern(p) => write!(f, "invalid exclude pattern: {p}"),
        }
    }
}

impl std::error::Error for WalkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WalkError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Compiled exclude patterns, matched against the full relative path.
///
/// Patterns use fnmatch semantics: `*` matches any run of characters
/// (including `/`), `?` matches a single character, everything else is
/// literal. So `*.log` excludes log files at any depth and `tmp/*`
/// excludes everything under `tmp/`.
pub struct ExcludeSet {
    patterns: Vec<Regex>,
}

impl ExcludeSet {
    pub fn new(patterns: &[String]) -> Result<Self, WalkError> {
        let patterns = patterns
            .iter()
            .map(|p| glob_to_regex(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, rel: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(rel))
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex, WalkError> {
    let mut re = String::with_capacity(pattern.len() + 4);
    re.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| WalkError::BadPattern(format!("{pattern}: {e}")))
}

/// Walks `root` recursively and returns all regular files, excluded paths
/// removed, sorted by relative path.
pub fn iter_files(root: &Path, excludes: &ExcludeSet) -> Result<Vec<FileEntry>, WalkError> {
    if !root.is_dir() {
        return Err(WalkError::NotADirectory(root.to_path_buf()));
    }
    let mut entries = Vec::new();
    visit_dir(root, root, excludes, &mut entries)?;
    entries.sort_by(|a, b| a.rel.cmp(&b.rel));
    debug!(files = entries.len(), root = %root.display(), "local walk complete");
    Ok(entries)
}

fn visit_dir(
    dir: &Path,
    root: &Path,
    excludes: &ExcludeSet,
    out: &mut Vec<FileEntry>,
) -> Result<(), WalkError> {
    for entry_res in fs::read_dir(dir)? {
        let entry = entry_res?;
        let path = entry.path();
        if path.is_dir() {
            visit_dir(&path, root, excludes, out)?;
        } else if path.is_file() {
            let rel = relative_posix(&path, root);
            if excludes.matches(&rel) {
                debug!(rel, "excluded by pattern");
                continue;
            }
            let meta = entry.metadata()?;
            out.push(FileEntry {
                rel,
                size: meta.len(),
                mtime: epoch_secs(&meta),
                path,
            });
        }
    }
    Ok(())
}

fn relative_posix(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn epoch_secs(meta: &fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, write};
    use tempfile::tempdir;

    fn no_excludes() -> ExcludeSet {
        ExcludeSet::new(&[]).unwrap()
    }

    #[test]
    fn walk_returns_sorted_relative_paths_with_sizes() {
        let dir = tempdir().unwrap();
        write(dir.path().join("b.txt"), b"world!").unwrap();
        create_dir_all(dir.path().join("sub/deep")).unwrap();
        write(dir.path().join("sub/deep/a.txt"), b"hi").unwrap();

        let entries = iter_files(dir.path(), &no_excludes()).unwrap();
        let rels: Vec<&str> = entries.iter().map(|e| e.rel.as_str()).collect();
        assert_eq!(rels, vec!["b.txt", "sub/deep/a.txt"]);
        assert_eq!(entries[0].size, 6);
        assert_eq!(entries[1].size, 2);
        assert!(entries[0].mtime > 0, "mtime should be populated");
    }

    #[test]
    fn exclude_patterns_filter_at_any_depth() {
        let dir = tempdir().unwrap();
        write(dir.path().join("keep.txt"), b"x").unwrap();
        write(dir.path().join("skip.log"), b"x").unwrap();
        create_dir_all(dir.path().join("tmp")).unwrap();
        write(dir.path().join("tmp/cache.bin"), b"x").unwrap();
        create_dir_all(dir.path().join("logs")).unwrap();
        write(dir.path().join("logs/old.log"), b"x").unwrap();

        let excludes = ExcludeSet::new(&["*.log".to_string(), "tmp/*".to_string()]).unwrap();
        let entries = iter_files(dir.path(), &excludes).unwrap();
        let rels: Vec<&str> = entries.iter().map(|e| e.rel.as_str()).collect();
        assert_eq!(rels, vec!["keep.txt"]);
    }

    #[test]
    fn question_mark_matches_single_character() {
        let excludes = ExcludeSet::new(&["file?.txt".to_string()]).unwrap();
        assert!(excludes.matches("file1.txt"));
        assert!(!excludes.matches("file10.txt"));
        assert!(!excludes.matches("file.txt"));
    }

    #[test]
    fn literal_dots_are_not_wildcards() {
        let excludes = ExcludeSet::new(&["a.txt".to_string()]).unwrap();
        assert!(excludes.matches("a.txt"));
        assert!(!excludes.matches("axtxt"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let gone = dir.path().join("nope");
        let err = iter_files(&gone, &no_excludes()).unwrap_err();
        assert!(matches!(err, WalkError::NotADirectory(_)));
    }
}
