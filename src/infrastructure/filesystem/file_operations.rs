use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::common::error::DmError;
use crate::common::result::{DmResult, ResultExt};

/// Copy a file or a directory tree to `dest`, overwriting existing files.
/// Returns the number of files written.
pub fn copy_path(source: &Path, dest: &Path) -> DmResult<usize> {
    let metadata = fs::metadata(source)
        .with_filesystem_error("cannot read copy source", Some(source.to_path_buf()))?;

    if metadata.is_dir() {
        copy_dir(source, dest)
    } else {
        ensure_parent(dest)?;
        fs::copy(source, dest).with_filesystem_error(
            format!("failed to copy {}", source.display()),
            Some(dest.to_path_buf()),
        )?;
        Ok(1)
    }
}

fn copy_dir(source: &Path, dest: &Path) -> DmResult<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| DmError::internal_error_with_source("walked outside copy source", e))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_filesystem_error("failed to create directory", Some(target.clone()))?;
        } else {
            ensure_parent(&target)?;
            fs::copy(entry.path(), &target).with_filesystem_error(
                format!("failed to copy {}", entry.path().display()),
                Some(target.clone()),
            )?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn ensure_parent(path: &Path) -> DmResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_filesystem_error("failed to create directory", Some(parent.to_path_buf()))?;
        }
    }
    Ok(())
}

/// Recursively remove a directory. Missing directories are not an error.
pub fn remove_dir(path: &Path) -> DmResult<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DmError::filesystem_error_with_source(
            "failed to remove directory",
            Some(path.to_path_buf()),
            e,
        )),
    }
}

/// Remove a file if present
pub fn remove_file(path: &Path) -> DmResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DmError::filesystem_error_with_source(
            "failed to remove file",
            Some(path.to_path_buf()),
            e,
        )),
    }
}

/// Immediate child entries of `dir`, sorted by name
pub fn list_children(dir: &Path) -> DmResult<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        children.push(entry?.into_path());
    }
    Ok(children)
}

/// Whether `path` is relative and stays below its base (no `..`, no root)
pub fn is_contained_relative(path: &Path) -> bool {
    use std::path::Component;
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
