use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use url::Url;

use crate::common::error::DmError;
use crate::common::result::DmResult;

/// リポジトリ名として許可するパターン
fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("static regex is valid")
    })
}

/// scp形式のURL（`git@github.com:org/repo.git`）
fn scp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._-]+@[A-Za-z0-9._-]+:[^\s]+$").expect("static regex is valid")
    })
}

/// リポジトリのリモートURLとブランチ
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoSource {
    /// clone に渡すURL（`git+` 接頭辞は除去済み）
    url: String,

    /// チェックアウトするブランチ（Noneの場合はデフォルトブランチ）
    branch: Option<String>,
}

/// spec文字列を解析した結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRepoSpec {
    pub name: String,
    pub source: RepoSource,
}

impl RepoSource {
    /// URLとブランチから作成
    pub fn new(url: &str, branch: Option<&str>) -> DmResult<Self> {
        let url = Self::normalize_url(url.trim())?;
        let branch = branch
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string);
        if let Some(ref branch) = branch {
            Self::validate_branch(branch)?;
        }
        Ok(Self { url, branch })
    }

    /// spec文字列を解析する
    ///
    /// 対応する形式:
    /// - `https://example.com/demo.git`
    /// - `demo@https://example.com/demo.git#main`
    /// - `django @ git+ssh://git@github.com/mongodb-forks/django@mongodb-5.2.x`
    /// - `git@github.com:org/demo.git`
    pub fn parse_spec(spec: &str) -> DmResult<ParsedRepoSpec> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(Self::spec_error(spec, "empty repository spec"));
        }

        let (body, mut branch) = match trimmed.split_once('#') {
            Some((body, fragment)) if !fragment.starts_with("egg=") && !fragment.is_empty() => {
                (body.trim(), Some(fragment.trim().to_string()))
            }
            Some((body, _)) => (body.trim(), None),
            None => (trimmed, None),
        };

        let (name, location) = Self::split_name(body)?;
        let location = location.strip_prefix("git+").unwrap_or(location);

        let url = if location.contains("://") {
            let (url, pinned) = Self::split_pinned_ref(location);
            if branch.is_none() {
                branch = pinned;
            }
            url
        } else if scp_pattern().is_match(location) {
            location.to_string()
        } else {
            return Err(Self::spec_error(spec, "no repository URL found"));
        };

        let source = Self::new(&url, branch.as_deref())
            .map_err(|e| Self::spec_error(spec, &e.to_string()))?;

        let name = match name {
            Some(name) => name,
            None => source
                .default_name()
                .ok_or_else(|| Self::spec_error(spec, "cannot derive a repository name"))?,
        };
        validate_repo_name(&name).map_err(|e| Self::spec_error(spec, &e.to_string()))?;

        Ok(ParsedRepoSpec { name, source })
    }

    /// 名前部分とURL部分に分割する
    fn split_name(body: &str) -> DmResult<(Option<String>, &str)> {
        // pip形式: `name @ url`
        if let Some((name, rest)) = body.split_once(" @ ") {
            return Ok((Some(name.trim().to_string()), rest.trim()));
        }

        if let Some(scheme_sep) = body.find("://") {
            let scheme_start = body[..scheme_sep]
                .rfind(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-')))
                .map(|i| i + 1)
                .unwrap_or(0);
            let prefix = body[..scheme_start].trim();
            let prefix = prefix.strip_suffix('@').unwrap_or(prefix).trim();
            let name = if prefix.is_empty() {
                None
            } else {
                Some(prefix.to_string())
            };
            return Ok((name, body[scheme_start..].trim()));
        }

        Ok((None, body))
    }

    /// URLの最後のパスセグメントに含まれる `@ref` を分離する
    fn split_pinned_ref(url: &str) -> (String, Option<String>) {
        let path_start = url.find("://").map(|i| i + 3).unwrap_or(0);
        let last_slash = match url[path_start..].rfind('/') {
            Some(i) => path_start + i,
            None => return (url.to_string(), None),
        };
        match url[last_slash..].find('@') {
            Some(at) => {
                let at = last_slash + at;
                let reference = &url[at + 1..];
                let reference = if reference.is_empty() {
                    None
                } else {
                    Some(reference.to_string())
                };
                (url[..at].to_string(), reference)
            }
            None => (url.to_string(), None),
        }
    }

    fn normalize_url(url: &str) -> DmResult<String> {
        let url = url.strip_prefix("git+").unwrap_or(url);
        if url.is_empty() {
            return Err(DmError::validation_error("url", "empty URL", None));
        }
        if url.contains(char::is_whitespace) {
            return Err(DmError::validation_error(
                "url",
                "URL must not contain whitespace",
                Some(url.to_string()),
            ));
        }

        if url.contains("://") {
            let parsed = Url::parse(url).map_err(|e| {
                DmError::validation_error("url", format!("invalid URL: {}", e), Some(url.to_string()))
            })?;
            if parsed.scheme() != "file" && parsed.host_str().is_none() {
                return Err(DmError::validation_error(
                    "url",
                    "URL has no host",
                    Some(url.to_string()),
                ));
            }
            Ok(url.trim_end_matches('/').to_string())
        } else if scp_pattern().is_match(url) {
            Ok(url.to_string())
        } else {
            Err(DmError::validation_error(
                "url",
                "expected scheme://host/path or user@host:path",
                Some(url.to_string()),
            ))
        }
    }

    fn validate_branch(branch: &str) -> DmResult<()> {
        let invalid = branch.starts_with('-')
            || branch.contains("..")
            || branch.contains(char::is_whitespace)
            || branch.ends_with('/')
            || branch.ends_with(".lock");
        if invalid {
            return Err(DmError::validation_error(
                "branch",
                "invalid branch name",
                Some(branch.to_string()),
            ));
        }
        Ok(())
    }

    fn spec_error(spec: &str, reason: &str) -> DmError {
        DmError::validation_error(
            "repos",
            format!("invalid repository spec '{}': {}", spec.trim(), reason),
            Some(spec.to_string()),
        )
    }

    /// URLの最後のセグメントから `.git` を除いた名前
    pub fn default_name(&self) -> Option<String> {
        let path = match self.url.find("://") {
            Some(i) => &self.url[i + 3..],
            None => self.url.split_once(':').map(|(_, p)| p).unwrap_or(&self.url),
        };
        let segment = path.trim_end_matches('/').rsplit('/').next()?;
        let name = segment.strip_suffix(".git").unwrap_or(segment);
        if name.is_empty() || !path.contains('/') && self.url.contains("://") {
            None
        } else {
            Some(name.to_string())
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }
}

impl fmt::Display for RepoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.branch {
            Some(branch) => write!(f, "{}#{}", self.url, branch),
            None => write!(f, "{}", self.url),
        }
    }
}

/// リポジトリ名の検証
pub fn validate_repo_name(name: &str) -> DmResult<()> {
    if name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(DmError::validation_error(
            "name",
            format!("'{}' is not a valid repository name", name),
            Some(name.to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_name_at_url_with_fragment_branch() {
        let parsed = RepoSource::parse_spec("demo@https://example.com/demo.git#main").unwrap();
        assert_eq!(parsed.name, "demo");
        assert_eq!(parsed.source.url(), "https://example.com/demo.git");
        assert_eq!(parsed.source.branch(), Some("main"));
    }

    #[test]
    fn test_parse_pip_style_spec() {
        let parsed = RepoSource::parse_spec(
            "django @ git+ssh://git@github.com/mongodb-forks/django@mongodb-5.2.x",
        )
        .unwrap();
        assert_eq!(parsed.name, "django");
        assert_eq!(parsed.source.url(), "ssh://git@github.com/mongodb-forks/django");
        assert_eq!(parsed.source.branch(), Some("mongodb-5.2.x"));
    }

    #[test]
    fn test_parse_bare_url_derives_name() {
        let parsed = RepoSource::parse_spec("https://github.com/wagtail/wagtail.git").unwrap();
        assert_eq!(parsed.name, "wagtail");
        assert_eq!(parsed.source.branch(), None);
    }

    #[test]
    fn test_parse_pip_style_without_name_or_branch() {
        let parsed =
            RepoSource::parse_spec("git+ssh://git@github.com/carltongibson/django-filter").unwrap();
        assert_eq!(parsed.name, "django-filter");
        assert_eq!(parsed.source.url(), "ssh://git@github.com/carltongibson/django-filter");
        assert_eq!(parsed.source.branch(), None);
    }

    #[test]
    fn test_fragment_branch_wins_over_pinned_ref() {
        let parsed =
            RepoSource::parse_spec("x @ git+https://example.com/org/x.git@v1#feature").unwrap();
        assert_eq!(parsed.source.branch(), Some("feature"));
        assert_eq!(parsed.source.url(), "https://example.com/org/x.git");
    }

    #[test]
    fn test_parse_scp_style() {
        let parsed = RepoSource::parse_spec("git@github.com:mongodb/mongo-python-driver.git").unwrap();
        assert_eq!(parsed.name, "mongo-python-driver");
        assert_eq!(parsed.source.url(), "git@github.com:mongodb/mongo-python-driver.git");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(RepoSource::parse_spec("").is_err());
        assert!(RepoSource::parse_spec("just-a-name").is_err());
        assert!(RepoSource::parse_spec("bad name@https://example.com/x.git").is_err());
        assert!(RepoSource::parse_spec("x@https://example.com/x.git#-evil").is_err());
    }

    #[test]
    fn test_new_validates_url() {
        assert!(RepoSource::new("https://example.com/demo.git", Some("main")).is_ok());
        assert!(RepoSource::new("not a url", None).is_err());
        let source = RepoSource::new("https://example.com/demo.git", Some("  ")).unwrap();
        assert_eq!(source.branch(), None);
    }

    #[test]
    fn test_display_includes_branch() {
        let source = RepoSource::new("https://example.com/demo.git", Some("main")).unwrap();
        assert_eq!(source.to_string(), "https://example.com/demo.git#main");
    }

    #[test]
    fn test_validate_repo_name() {
        assert!(validate_repo_name("django-rest-framework").is_ok());
        assert!(validate_repo_name("mongo_python.driver").is_ok());
        assert!(validate_repo_name("../escape").is_err());
        assert!(validate_repo_name("").is_err());
    }
}
