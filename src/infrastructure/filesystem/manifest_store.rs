use std::path::{Path, PathBuf};
use tokio::fs as async_fs;

use crate::common::error::DmError;
use crate::common::result::DmResult;
use crate::domain::entities::manifest::{Manifest, PyProjectDocument};
use crate::domain::entities::workspace::Workspace;

/// Raw manifest as read from disk
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub path: PathBuf,
    pub manifest: Manifest,
}

/// Outcome of writing the starter manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestWrite {
    /// A new pyproject.toml was created
    Created,
    /// The table was appended to an existing pyproject.toml
    Appended,
    /// The file was rewritten; the previous content was saved to `backup`
    Replaced { backup: PathBuf },
}

/// Reads and writes the `[tool.django_mongodb_cli]` table of pyproject.toml
#[derive(Debug, Clone, Default)]
pub struct ManifestStore;

impl ManifestStore {
    pub fn new() -> Self {
        Self
    }

    /// Read and deserialize the manifest table. Every failure is a
    /// configuration error naming the offending path.
    pub async fn read_manifest(&self, path: &Path) -> DmResult<LoadedManifest> {
        let content = match async_fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DmError::config_error(
                    "manifest file not found",
                    Some(path.to_path_buf()),
                ));
            }
            Err(e) => {
                return Err(DmError::config_error_with_source(
                    "cannot read manifest file",
                    Some(path.to_path_buf()),
                    e,
                ));
            }
        };

        let manifest = Self::parse_manifest(&content, path)?;
        tracing::debug!(
            "loaded manifest {} ({} repository entries)",
            path.display(),
            manifest.repos.len()
        );
        Ok(LoadedManifest {
            path: path.to_path_buf(),
            manifest,
        })
    }

    /// Parse pyproject.toml content
    pub fn parse_manifest(content: &str, path: &Path) -> DmResult<Manifest> {
        let document: PyProjectDocument = toml::from_str(content).map_err(|e| {
            DmError::config_error(
                format!("malformed manifest: {}", e.message()),
                Some(path.to_path_buf()),
            )
        })?;

        document.tool.django_mongodb_cli.ok_or_else(|| {
            DmError::config_error(
                "no [tool.django_mongodb_cli] table",
                Some(path.to_path_buf()),
            )
        })
    }

    /// Write the starter manifest into `path`.
    ///
    /// Refuses when the table already exists unless `force` is set.
    pub async fn write_starter_manifest(
        &self,
        path: &Path,
        template: &str,
        force: bool,
    ) -> DmResult<ManifestWrite> {
        let existing = match async_fs::read_to_string(path).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(DmError::filesystem_error_with_source(
                    "cannot read existing file",
                    Some(path.to_path_buf()),
                    e,
                ))
            }
        };

        let result = match existing {
            None => {
                self.write(path, template).await?;
                ManifestWrite::Created
            }
            Some(content) if Workspace::content_has_manifest_table(&content) => {
                if !force {
                    return Err(DmError::state_conflict(
                        format!(
                            "{} already contains a [tool.django_mongodb_cli] table (use --force to overwrite)",
                            path.display()
                        ),
                        Some(path.to_path_buf()),
                    ));
                }
                let backup = Self::backup_path(path);
                self.write(&backup, &content).await?;
                self.write(path, template).await?;
                ManifestWrite::Replaced { backup }
            }
            Some(content) => {
                let mut combined = content;
                if !combined.ends_with('\n') {
                    combined.push('\n');
                }
                combined.push('\n');
                combined.push_str(template);
                self.write(path, &combined).await?;
                ManifestWrite::Appended
            }
        };
        tracing::debug!("wrote manifest {}: {:?}", path.display(), result);
        Ok(result)
    }

    async fn write(&self, path: &Path, content: &str) -> DmResult<()> {
        async_fs::write(path, content).await.map_err(|e| {
            DmError::filesystem_error_with_source(
                "failed to write file",
                Some(path.to_path_buf()),
                e,
            )
        })
    }

    fn backup_path(path: &Path) -> PathBuf {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".bak_{}", timestamp));
        path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STARTER: &str = "[tool.django_mongodb_cli]\nrepos = []\n";

    #[tokio::test]
    async fn test_read_missing_manifest_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pyproject.toml");
        let err = ManifestStore::new().read_manifest(&path).await.unwrap_err();
        assert!(matches!(err, DmError::ConfigError { path: Some(ref p), .. } if p == &path));
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_read_malformed_manifest_names_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pyproject.toml");
        std::fs::write(&path, "[tool.django_mongodb_cli\nrepos = ").unwrap();
        let err = ManifestStore::new().read_manifest(&path).await.unwrap_err();
        assert!(err.to_string().contains("pyproject.toml"));
        assert!(err.to_string().contains("malformed manifest"));
    }

    #[tokio::test]
    async fn test_read_manifest_without_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pyproject.toml");
        std::fs::write(&path, "[project]\nname = \"x\"\n").unwrap();
        let err = ManifestStore::new().read_manifest(&path).await.unwrap_err();
        assert!(err.to_string().contains("no [tool.django_mongodb_cli] table"));
    }

    #[tokio::test]
    async fn test_write_starter_manifest_lifecycle() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pyproject.toml");
        let store = ManifestStore::new();

        std::fs::write(&path, "[project]\nname = \"ws\"").unwrap();
        assert_eq!(
            store.write_starter_manifest(&path, STARTER, false).await.unwrap(),
            ManifestWrite::Appended
        );
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[project]"));
        assert!(content.contains("[tool.django_mongodb_cli]"));

        let err = store
            .write_starter_manifest(&path, STARTER, false)
            .await
            .unwrap_err();
        assert!(matches!(err, DmError::StateConflict { .. }));

        match store.write_starter_manifest(&path, STARTER, true).await.unwrap() {
            ManifestWrite::Replaced { backup } => {
                assert!(std::fs::read_to_string(backup).unwrap().contains("[project]"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), STARTER);
    }

    #[tokio::test]
    async fn test_write_creates_new_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pyproject.toml");
        assert_eq!(
            ManifestStore::new()
                .write_starter_manifest(&path, STARTER, false)
                .await
                .unwrap(),
            ManifestWrite::Created
        );
        let loaded = ManifestStore::new().read_manifest(&path).await.unwrap();
        assert!(loaded.manifest.repos.is_empty());
    }
}
