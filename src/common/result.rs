use crate::common::error::DmError;

/// プロジェクト全体で使用するResult型のエイリアス
///
/// # Examples
///
/// ```
/// use django_mongodb_cli::common::result::DmResult;
/// use django_mongodb_cli::common::error::DmError;
///
/// fn example_function() -> DmResult<String> {
///     Ok("success".to_string())
/// }
///
/// fn example_with_error() -> DmResult<()> {
///     Err(DmError::internal_error("Something went wrong"))
/// }
/// ```
pub type DmResult<T> = Result<T, DmError>;

/// OptionをDmResultに変換するためのヘルパー
pub trait OptionExt<T> {
    /// Noneの場合にNotFoundエラーを返す
    ///
    /// ```
    /// use django_mongodb_cli::common::result::{DmResult, OptionExt};
    ///
    /// let none_value: Option<String> = None;
    /// let result: DmResult<String> = none_value.ok_or_not_found("Project", "mysite");
    /// assert!(result.is_err());
    /// ```
    fn ok_or_not_found(self, kind: impl Into<String>, name: impl Into<String>) -> DmResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, kind: impl Into<String>, name: impl Into<String>) -> DmResult<T> {
        self.ok_or_else(|| DmError::not_found(kind, name))
    }
}

/// 標準のResult型をDmResultに変換するためのヘルパー
pub trait ResultExt<T, E> {
    /// ファイルシステムエラーとして変換（パス付き）
    ///
    /// ```
    /// use django_mongodb_cli::common::result::{DmResult, ResultExt};
    ///
    /// let result: Result<String, std::io::Error> = Err(std::io::Error::new(
    ///     std::io::ErrorKind::NotFound, "file not found"
    /// ));
    /// let dm_result: DmResult<String> = result.with_filesystem_error("read failed", None);
    /// assert!(dm_result.is_err());
    /// ```
    fn with_filesystem_error(
        self,
        message: impl Into<String>,
        path: Option<std::path::PathBuf>,
    ) -> DmResult<T>
    where
        E: Into<std::io::Error>;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn with_filesystem_error(
        self,
        message: impl Into<String>,
        path: Option<std::path::PathBuf>,
    ) -> DmResult<T>
    where
        E: Into<std::io::Error>,
    {
        self.map_err(|e| DmError::filesystem_error_with_source(message, path, e.into()))
    }
}

/// DmResult操作を連鎖させるためのヘルパー
pub trait DmResultExt<T> {
    /// エラーを警告として記録し、処理を継続する（ベストエフォート操作用）
    fn warn_on_error(self, context: &str);
}

impl<T> DmResultExt<T> for DmResult<T> {
    fn warn_on_error(self, context: &str) {
        if let Err(e) = self {
            tracing::warn!("{}: {}", context, e);
        }
    }
}

/// async関数用のヘルパー
pub mod async_helpers {
    use super::{DmError, DmResult};
    use std::future::Future;

    /// タイムアウト付きasync実行（`None` の場合は無制限）
    pub async fn with_optional_timeout<F, T>(f: F, timeout_secs: Option<u64>) -> DmResult<T>
    where
        F: Future<Output = DmResult<T>>,
    {
        match timeout_secs {
            Some(secs) if secs > 0 => {
                let duration = std::time::Duration::from_secs(secs);
                match tokio::time::timeout(duration, f).await {
                    Ok(result) => result,
                    Err(_) => Err(DmError::timeout(secs)),
                }
            }
            _ => f.await,
        }
    }
}
