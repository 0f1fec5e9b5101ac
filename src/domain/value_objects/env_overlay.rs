use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 子プロセスに渡す環境変数の上書きセット
///
/// 親プロセスの環境は変更せず、起動する子プロセスにだけ適用する。
/// 後から `set` / `merge` した値が優先される。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvOverlay {
    vars: BTreeMap<String, String>,
}

impl EnvOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// 変数を設定
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// ビルダー形式で変数を設定
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// 値がある場合のみ設定
    pub fn with_optional(mut self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    /// 別のオーバーレイを重ねる（`other` が優先）
    pub fn merge(&mut self, other: &EnvOverlay) -> &mut Self {
        for (key, value) in &other.vars {
            self.vars.insert(key.clone(), value.clone());
        }
        self
    }

    /// `other` を重ねた新しいオーバーレイを返す
    pub fn merged(&self, other: &EnvOverlay) -> Self {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    /// PATH形式の変数の先頭に値を追加する
    ///
    /// オーバーレイに値がなければ `inherited` の値に対して追加する。
    pub fn prepend_path(&mut self, key: &str, entry: &str, inherited: Option<String>) -> &mut Self {
        let current = self.vars.get(key).cloned().or(inherited);
        let value = match current {
            Some(existing) if !existing.is_empty() => format!("{}{}{}", entry, path_separator(), existing),
            _ => entry.to_string(),
        };
        self.vars.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for EnvOverlay {
    fn from(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvOverlay {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

fn path_separator() -> char {
    if cfg!(windows) {
        ';'
    } else {
        ':'
    }
}
