use std::path::{Path, PathBuf};
use validator::Validate;

use crate::common::error::DmError;
use crate::common::result::DmResult;
use crate::domain::entities::manifest::{FixtureTable, InstallTable, Manifest, RepoEntry, TestTable};
use crate::domain::entities::registry::Registry;
use crate::domain::entities::repository::{
    FileCopy, FixtureKind, InstallSpec, RepositorySpec, RunnerKind, TestSpec,
};
use crate::domain::entities::workspace::{ProjectSettings, ToolSettings, Workspace};
use crate::domain::value_objects::repo_source::validate_repo_name;
use crate::domain::value_objects::{EnvOverlay, RepoSource};
use crate::infrastructure::filesystem::file_operations::is_contained_relative;
use crate::infrastructure::filesystem::{LoadedManifest, ManifestStore};

/// マニフェスト処理結果
#[derive(Debug, Clone)]
pub struct ProcessedManifest {
    /// 検証済みのワークスペース
    pub workspace: Workspace,

    /// 処理中に発生した警告
    pub warnings: Vec<String>,
}

/// マニフェストの探索・読み込み・検証を行うサービス
#[derive(Debug, Clone, Default)]
pub struct ManifestService {
    store: ManifestStore,
}

impl ManifestService {
    pub fn new() -> Self {
        Self::default()
    }

    /// マニフェストのパスを決定する（明示指定 > 上位ディレクトリ探索）
    pub fn locate(&self, explicit: Option<&Path>, start_dir: &Path) -> DmResult<PathBuf> {
        if let Some(path) = explicit {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                start_dir.join(path)
            };
            return Ok(path);
        }
        Workspace::discover_manifest(start_dir).ok_or_else(|| {
            DmError::config_error(
                format!(
                    "no pyproject.toml with a [tool.django_mongodb_cli] table found in {} or any parent directory (run `dm init`)",
                    start_dir.display()
                ),
                None,
            )
        })
    }

    /// マニフェストを読み込み、検証してワークスペースを構築する
    pub async fn load(&self, manifest_path: &Path) -> DmResult<ProcessedManifest> {
        let loaded = self.store.read_manifest(manifest_path).await?;
        Self::process(loaded)
    }

    /// 生のマニフェストを検証する。問題はすべて集めてまとめて報告する
    pub fn process(loaded: LoadedManifest) -> DmResult<ProcessedManifest> {
        let LoadedManifest { path, manifest } = loaded;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut builder = RegistryBuilder::new(&root);
        builder.check(&manifest);

        if !builder.problems.is_empty() {
            return Err(DmError::manifest_validation(path, builder.problems));
        }

        let settings = ToolSettings {
            python: manifest.python.clone(),
            installer: manifest.installer,
            timeout_secs: manifest.timeout.filter(|t| *t > 0),
            project: ProjectSettings {
                template: manifest.project.template.as_ref().map(|t| root.join(t)),
                app_template: manifest.project.app_template.as_ref().map(|t| root.join(t)),
                frontend_template: manifest
                    .project
                    .frontend_template
                    .as_ref()
                    .map(|t| root.join(t)),
                settings: manifest.project.settings.clone(),
            },
        };

        let workspace = Workspace::new(path, &manifest.home, builder.registry, settings);
        Ok(ProcessedManifest {
            workspace,
            warnings: builder.warnings,
        })
    }
}

/// 検証しながらレジストリを組み立てる
struct RegistryBuilder<'a> {
    root: &'a Path,
    registry: Registry,
    problems: Vec<String>,
    warnings: Vec<String>,
}

impl<'a> RegistryBuilder<'a> {
    fn new(root: &'a Path) -> Self {
        Self {
            root,
            registry: Registry::new(),
            problems: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn check(&mut self, manifest: &Manifest) {
        if let Err(e) = manifest.validate() {
            self.problems.push(format!("manifest: {}", e));
        }
        if Path::new(&manifest.home).is_absolute() {
            self.warnings.push(format!(
                "home '{}' is absolute; clones will live outside the workspace",
                manifest.home
            ));
        }

        let mut entry_groups: Vec<(String, Vec<String>)> = Vec::new();
        for (index, entry) in manifest.repos.iter().enumerate() {
            let (name, source, groups) = match self.parse_entry(entry) {
                Ok(parsed) => parsed,
                Err(e) => {
                    self.problems.push(format!("repos[{}]: {}", index, e));
                    continue;
                }
            };

            if self.registry.contains(&name) {
                self.problems
                    .push(format!("repos[{}]: duplicate repository '{}'", index, name));
                continue;
            }

            let mut repo = RepositorySpec::new(name.clone(), source);
            if let Some(install) = manifest.install.get(&name) {
                repo = repo.with_install(self.install_spec(&name, install));
            }
            if let Some(test) = manifest.test.get(&name) {
                if let Some(spec) = self.test_spec(&name, test) {
                    repo = repo.with_test(spec);
                }
                for copy in self.fixtures(&name, test) {
                    repo = repo.with_file_copy(copy);
                }
            }

            match self.registry.insert(repo) {
                Ok(()) => entry_groups.push((name, groups)),
                Err(e) => self.problems.push(format!("repos[{}]: {}", index, e)),
            }
        }

        for (group, members) in &manifest.groups {
            let unknown: Vec<&String> = members
                .iter()
                .filter(|m| !self.registry.contains(m))
                .collect();
            if !unknown.is_empty() {
                for member in unknown {
                    self.problems.push(format!(
                        "groups.{}: unknown repository '{}'",
                        group, member
                    ));
                }
                continue;
            }
            if members.is_empty() {
                self.warnings.push(format!("group '{}' has no members", group));
            }
            if let Err(e) = self.registry.define_group(group.clone(), members.clone()) {
                self.problems.push(format!("groups.{}: {}", group, e));
            }
        }

        for (name, groups) in entry_groups {
            for group in groups {
                if let Err(e) = self.registry.define_group(group.clone(), vec![name.clone()]) {
                    self.problems.push(format!("repos.{}: {}", name, e));
                }
            }
        }

        self.check_unknown_tables("install", manifest.install.keys());
        self.check_unknown_tables("test", manifest.test.keys());
    }

    fn check_unknown_tables<'k>(&mut self, table: &str, names: impl Iterator<Item = &'k String>) {
        for name in names {
            if !self.registry.contains(name) {
                self.problems.push(format!(
                    "{}.{}: no repository named '{}' is declared",
                    table, name, name
                ));
            }
        }
    }

    fn parse_entry(&self, entry: &RepoEntry) -> DmResult<(String, RepoSource, Vec<String>)> {
        match entry {
            RepoEntry::Spec(spec) => {
                let parsed = RepoSource::parse_spec(spec)?;
                Ok((parsed.name, parsed.source, Vec::new()))
            }
            RepoEntry::Table(table) => {
                table.validate().map_err(|e| {
                    DmError::validation_error("repos", e.to_string(), Some(table.url.clone()))
                })?;
                let source = RepoSource::new(&table.url, table.branch.as_deref())?;
                let name = match &table.name {
                    Some(name) => name.clone(),
                    None => source.default_name().ok_or_else(|| {
                        DmError::validation_error(
                            "repos",
                            "cannot derive a repository name from the URL",
                            Some(table.url.clone()),
                        )
                    })?,
                };
                validate_repo_name(&name)?;
                Ok((name, source, table.groups.clone()))
            }
        }
    }

    fn relative_path(&mut self, context: &str, value: &str) -> Option<PathBuf> {
        let path = PathBuf::from(value);
        if is_contained_relative(&path) {
            Some(path)
        } else {
            self.problems.push(format!(
                "{}: '{}' must be a relative path inside the clone",
                context, value
            ));
            None
        }
    }

    fn install_spec(&mut self, name: &str, table: &InstallTable) -> InstallSpec {
        if let Err(e) = table.validate() {
            self.problems.push(format!("install.{}: {}", name, e));
        }
        let layout = table
            .dir
            .as_deref()
            .and_then(|dir| self.relative_path(&format!("install.{}.dir", name), dir));
        InstallSpec {
            layout,
            package: table.package.clone(),
            env: EnvOverlay::from(table.env.clone()),
        }
    }

    fn test_spec(&mut self, name: &str, table: &TestTable) -> Option<TestSpec> {
        if let Err(e) = table.validate() {
            self.problems.push(format!("test.{}: {}", name, e));
            return None;
        }

        let command: Vec<String> = table.command.split_whitespace().map(String::from).collect();
        if command.is_empty() {
            self.problems.push(format!("test.{}.command: empty command", name));
            return None;
        }

        let primary_root = self.relative_path(
            &format!("test.{}.dir", name),
            table.dir.as_deref().unwrap_or("."),
        )?;
        let mut roots = Vec::new();
        for dir in &table.dirs {
            if let Some(root) = self.relative_path(&format!("test.{}.dirs", name), dir) {
                if !roots.contains(&root) {
                    roots.push(root);
                }
            }
        }
        if roots.is_empty() {
            roots.push(primary_root.clone());
        }

        let runner = table.runner.unwrap_or_else(|| RunnerKind::infer(&command));
        let settings = table.settings.clone().unwrap_or_default();

        Some(TestSpec {
            command,
            runner,
            primary_root,
            roots,
            args: table.args.clone(),
            settings_module: settings.test,
            migrations_settings_module: settings.migrations,
            env: EnvOverlay::from(table.env.clone()),
        })
    }

    fn fixtures(&mut self, name: &str, table: &TestTable) -> Vec<FileCopy> {
        let declared: [(FixtureKind, &Option<FixtureTable>); 4] = [
            (FixtureKind::Apps, &table.apps),
            (FixtureKind::Migrations, &table.migrations),
            (FixtureKind::Settings, &table.settings_file),
            (FixtureKind::MigrationsSettings, &table.migrations_settings_file),
        ];

        let mut copies = Vec::new();
        for (kind, fixture) in declared {
            let Some(fixture) = fixture else { continue };
            let context = format!("test.{}.{}", name, kind.key());
            if let Err(e) = fixture.validate() {
                self.problems.push(format!("{}: {}", context, e));
                continue;
            }
            let Some(target) = self.relative_path(&format!("{}.target", context), &fixture.target)
            else {
                continue;
            };
            copies.push(FileCopy {
                kind,
                source: self.root.join(&fixture.source),
                target,
                policy: fixture.policy.unwrap_or_else(|| kind.default_policy()),
            });
        }
        copies
    }
}
