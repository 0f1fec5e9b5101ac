//! Assertion helpers for testing

use std::path::Path;
use walkdir::WalkDir;

/// Assert that a directory exists
#[macro_export]
macro_rules! assert_dir_exists {
    ($path:expr) => {
        assert!(
            $path.exists() && $path.is_dir(),
            "Directory should exist: {}",
            $path.display()
        );
    };
}

/// Assert that a path does not exist
#[macro_export]
macro_rules! assert_path_not_exists {
    ($path:expr) => {
        assert!(!$path.exists(), "Path should not exist: {}", $path.display());
    };
}

/// Relative path and content of every file below `root`, sorted.
///
/// Used to check that a second run left a tree byte-for-byte unchanged.
pub fn snapshot_tree(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<(String, Vec<u8>)> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .into_owned();
            let content = std::fs::read(entry.path()).unwrap();
            (relative, content)
        })
        .collect();
    files.sort();
    files
}

/// Assert that `lines` contains an entry starting with `prefix`
pub fn assert_has_command(lines: &[String], prefix: &str) {
    assert!(
        lines.iter().any(|line| line.starts_with(prefix)),
        "expected a command starting with {:?}, got {:#?}",
        prefix,
        lines
    );
}
