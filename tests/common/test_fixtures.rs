//! Workspaces on disk for integration tests

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use django_mongodb_cli::application::services::ManifestService;
use django_mongodb_cli::domain::entities::workspace::Workspace;

/// A manifest covering the scenarios the integration tests exercise:
/// a branch-pinned repository, a group, a repository with two test
/// roots and a migrations fixture, and one with nothing installable.
pub const SAMPLE_MANIFEST: &str = r#"
[tool.django_mongodb_cli]
home = "src"
repos = [
    "demo@https://example.com/demo.git#main",
    "django-filter @ git+ssh://git@github.com/carltongibson/django-filter@main",
    { name = "wagtail", url = "https://github.com/wagtail/wagtail.git", groups = ["cms"] },
    "bare@https://example.com/bare.git",
]

[tool.django_mongodb_cli.groups]
g = ["demo", "django-filter"]

[tool.django_mongodb_cli.test.django-filter]
command = "./runtests.py"
dirs = ["tests", "tests/rest_framework"]
settings = { test = "tests.settings" }
migrations = { source = "config/mongo_migrations", target = "tests/mongo_migrations" }
"#;

/// Temporary directory holding a `pyproject.toml` manifest
pub struct WorkspaceFixture {
    temp: TempDir,
}

impl WorkspaceFixture {
    /// Create a workspace whose pyproject.toml contains `manifest`
    pub fn new(manifest: &str) -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        fs::write(
            temp.path().join("pyproject.toml"),
            format!("[project]\nname = \"workspace\"\n{}", manifest),
        )
        .expect("Failed to write manifest");
        Self { temp }
    }

    /// The sample workspace, with its migrations fixture source in place
    pub fn sample() -> Self {
        let fixture = Self::new(SAMPLE_MANIFEST);
        fixture.write("config/mongo_migrations/admin/0001_initial.py", "# admin\n");
        fixture.write("config/mongo_migrations/auth/0001_initial.py", "# auth\n");
        fixture
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root().join("pyproject.toml")
    }

    pub fn clone_path(&self, name: &str) -> PathBuf {
        self.root().join("src").join(name)
    }

    /// Write a file relative to the workspace root, creating parents
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Pretend `name` was cloned
    pub fn fake_clone(&self, name: &str) -> PathBuf {
        let path = self.clone_path(name);
        fs::create_dir_all(path.join(".git")).expect("Failed to create clone dir");
        path
    }

    /// Parse and validate the manifest
    pub async fn load(&self) -> Workspace {
        ManifestService::new()
            .load(&self.manifest_path())
            .await
            .expect("sample manifest should load")
            .workspace
    }
}
