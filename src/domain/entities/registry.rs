use std::collections::{BTreeMap, HashMap};

use super::repository::RepositorySpec;
use crate::common::error::DmError;
use crate::common::result::DmResult;

/// リポジトリ名・グループ名の解決結果の出どころ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// リポジトリ名に一致
    Repository,
    /// グループ名に一致
    Group,
    /// どちらにも一致しない
    Unknown,
}

/// 検証済みのリポジトリレジストリ
///
/// 起動時に一度だけ構築され、以降は読み取り専用。
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// 宣言順のリポジトリ
    repos: Vec<RepositorySpec>,

    /// 名前から `repos` のインデックス
    index: HashMap<String, usize>,

    /// グループ名からメンバー名（宣言順）
    groups: BTreeMap<String, Vec<String>>,
}

impl Registry {
    /// 空のレジストリを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// リポジトリを追加（名前の重複はエラー）
    pub fn insert(&mut self, repo: RepositorySpec) -> DmResult<()> {
        if self.index.contains_key(&repo.name) {
            return Err(DmError::validation_error(
                "repos",
                format!("duplicate repository '{}'", repo.name),
                Some(repo.name.clone()),
            ));
        }
        self.index.insert(repo.name.clone(), self.repos.len());
        self.repos.push(repo);
        Ok(())
    }

    /// グループを定義（メンバーは登録済みである必要がある）
    pub fn define_group(&mut self, group: impl Into<String>, members: Vec<String>) -> DmResult<()> {
        let group = group.into();
        if let Some(missing) = members.iter().find(|m| !self.index.contains_key(*m)) {
            return Err(DmError::validation_error(
                "groups",
                format!("group '{}' references unknown repository '{}'", group, missing),
                Some(missing.clone()),
            ));
        }

        for member in &members {
            if let Some(&i) = self.index.get(member) {
                let repo = &mut self.repos[i];
                if !repo.groups.contains(&group) {
                    repo.groups.push(group.clone());
                }
            }
        }

        let entry = self.groups.entry(group).or_default();
        for member in members {
            if !entry.contains(&member) {
                entry.push(member);
            }
        }
        Ok(())
    }

    /// 名前を解決する: まずリポジトリ名、次にグループ名。
    /// どちらにも一致しなければ空のリストを返す。
    pub fn resolve(&self, name_or_group: &str) -> Vec<&RepositorySpec> {
        self.resolve_with_origin(name_or_group).0
    }

    /// 解決結果とその出どころを返す
    pub fn resolve_with_origin(&self, name_or_group: &str) -> (Vec<&RepositorySpec>, Resolution) {
        if let Some(repo) = self.get(name_or_group) {
            return (vec![repo], Resolution::Repository);
        }
        match self.groups.get(name_or_group) {
            Some(members) => (
                members.iter().filter_map(|m| self.get(m)).collect(),
                Resolution::Group,
            ),
            None => (Vec::new(), Resolution::Unknown),
        }
    }

    /// グループ名のみで解決する
    pub fn resolve_group(&self, group: &str) -> Option<Vec<&RepositorySpec>> {
        self.groups
            .get(group)
            .map(|members| members.iter().filter_map(|m| self.get(m)).collect())
    }

    /// 宣言順の全リポジトリ
    pub fn list_all(&self) -> &[RepositorySpec] {
        &self.repos
    }

    pub fn get(&self, name: &str) -> Option<&RepositorySpec> {
        self.index.get(name).map(|&i| &self.repos[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn groups(&self) -> &BTreeMap<String, Vec<String>> {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::RepoSource;
    use pretty_assertions::assert_eq;

    fn repo(name: &str) -> RepositorySpec {
        let url = format!("https://example.com/{}.git", name);
        RepositorySpec::new(name, RepoSource::new(&url, None).unwrap())
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        for name in ["a", "b", "c"] {
            registry.insert(repo(name)).unwrap();
        }
        registry
            .define_group("g", vec!["a".to_string(), "b".to_string()])
            .unwrap();
        registry
    }

    fn names(repos: Vec<&RepositorySpec>) -> Vec<String> {
        repos.into_iter().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn test_resolve_name_first() {
        let registry = registry();
        assert_eq!(names(registry.resolve("c")), vec!["c"]);
    }

    #[test]
    fn test_resolve_group_in_declared_order() {
        let registry = registry();
        let (repos, origin) = registry.resolve_with_origin("g");
        assert_eq!(origin, Resolution::Group);
        assert_eq!(names(repos), vec!["a", "b"]);
    }

    #[test]
    fn test_resolve_unknown_is_empty() {
        let registry = registry();
        let (repos, origin) = registry.resolve_with_origin("nope");
        assert!(repos.is_empty());
        assert_eq!(origin, Resolution::Unknown);
    }

    #[test]
    fn test_repository_name_shadows_group() {
        let mut registry = registry();
        registry.insert(repo("g2")).unwrap();
        registry.define_group("g2", vec!["c".to_string()]).unwrap();
        assert_eq!(names(registry.resolve("g2")), vec!["g2"]);
        assert_eq!(names(registry.resolve_group("g2").unwrap()), vec!["c"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = registry();
        assert!(registry.insert(repo("a")).is_err());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_group_with_unknown_member_rejected() {
        let mut registry = registry();
        assert!(registry
            .define_group("bad", vec!["a".to_string(), "zzz".to_string()])
            .is_err());
        assert!(registry.resolve_group("bad").is_none());
    }

    #[test]
    fn test_list_all_keeps_insertion_order() {
        let registry = registry();
        let listed: Vec<&str> = registry.list_all().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(listed, vec!["a", "b", "c"]);
        assert!(registry.get("a").unwrap().in_group("g"));
        assert!(!registry.get("c").unwrap().in_group("g"));
    }
}
