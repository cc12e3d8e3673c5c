//! Email Value Object
//!
//! Represents a validated, lowercased email address. Format validation is
//! intentionally shallow; ownership of the address is never verified.

use kernel::error::app_error::{AppError, AppResult};
use std::fmt;

/// Maximum email length (per RFC 5321)
const EMAIL_MAX_LENGTH: usize = 254;

/// Maximum local-part length (per RFC 5321)
const LOCAL_PART_MAX_LENGTH: usize = 64;

/// Email address value object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Create a new email with validation
    pub fn new(email: impl AsRef<str>) -> AppResult<Self> {
        let email = email.as_ref().trim().to_lowercase();

        if email.is_empty() {
            return Err(AppError::bad_request("email can't be blank"));
        }

        if email.len() > EMAIL_MAX_LENGTH {
            return Err(AppError::bad_request(format!(
                "email must be at most {} characters",
                EMAIL_MAX_LENGTH
            )));
        }

        if !Self::is_valid_format(&email) {
            return Err(AppError::bad_request("email is invalid"));
        }

        Ok(Self(email))
    }

    /// Rebuild from a stored value without validation
    pub(crate) fn from_trusted(email: String) -> Self {
        Self(email)
    }

    fn is_valid_format(email: &str) -> bool {
        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };

        if local.is_empty() || local.len() > LOCAL_PART_MAX_LENGTH || domain.contains('@') {
            return false;
        }

        if local.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return false;
        }

        if domain.is_empty() || !domain.contains('.') {
            return false;
        }

        if !domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return false;
        }

        !(domain.starts_with(['.', '-']) || domain.ends_with(['.', '-']) || domain.contains(".."))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email_is_lowercased() {
        let email = Email::new("  Jake@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "jake@example.com");
    }

    #[test]
    fn test_blank_email() {
        let err = Email::new("   ").unwrap_err();
        assert_eq!(err.message(), "email can't be blank");
    }

    #[test]
    fn test_invalid_formats() {
        for raw in [
            "jake",
            "jake@",
            "@example.com",
            "jake@example",
            "jake@@example.com",
            "ja ke@example.com",
            "jake@-example.com",
            "jake@example..com",
            "jake@exa_mple.com",
        ] {
            assert!(Email::new(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn test_too_long() {
        let raw = format!("{}@example.com", "a".repeat(250));
        assert!(Email::new(raw).is_err());
    }
}
