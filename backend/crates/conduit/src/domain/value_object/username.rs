//! Username Value Object
//!
//! ユーザー名はプロフィール URL (`/profiles/{username}`) に現れる公開ハンドル。
//! 大文字小文字は区別し、入力どおりに保存する。
//!
//! ## 不変条件
//! - NFKC 正規化・前後の空白除去の後で 1〜64 文字
//! - 空白・制御文字・`/` を含まない

use kernel::error::app_error::{AppError, AppResult};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Maximum length for username (in characters)
pub const USERNAME_MAX_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    pub fn new(raw: impl AsRef<str>) -> AppResult<Self> {
        let normalized: String = raw.as_ref().nfkc().collect();
        let username = normalized.trim();

        if username.is_empty() {
            return Err(AppError::bad_request("username can't be blank"));
        }

        if username.chars().count() > USERNAME_MAX_LENGTH {
            return Err(AppError::bad_request(format!(
                "username must be at most {} characters",
                USERNAME_MAX_LENGTH
            )));
        }

        if username
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '/')
        {
            return Err(AppError::bad_request(
                "username must not contain spaces or '/'",
            ));
        }

        Ok(Self(username.to_string()))
    }

    /// Rebuild from a stored value without validation
    pub(crate) fn from_trusted(username: String) -> Self {
        Self(username)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_username_keeps_case() {
        assert_eq!(Username::new(" Jake ").unwrap().as_str(), "Jake");
    }

    #[test]
    fn test_nfkc_normalization() {
        // Fullwidth letters fold to ASCII
        assert_eq!(Username::new("ｊａｋｅ").unwrap().as_str(), "jake");
    }

    #[test]
    fn test_rejects_blank_and_separators() {
        assert!(Username::new("").is_err());
        assert!(Username::new("   ").is_err());
        assert!(Username::new("jake smith").is_err());
        assert!(Username::new("jake/admin").is_err());
    }

    #[test]
    fn test_length_limit() {
        assert!(Username::new("a".repeat(USERNAME_MAX_LENGTH)).is_ok());
        assert!(Username::new("a".repeat(USERNAME_MAX_LENGTH + 1)).is_err());
    }
}
