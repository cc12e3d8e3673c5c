//! Application Configuration
//!
//! Configuration for the Conduit application layer.

use std::fmt;
use std::time::Duration;

use platform::token::TokenSigner;

/// Conduit application configuration
#[derive(Clone)]
pub struct ConduitConfig {
    /// HMAC secret for access tokens
    pub jwt_secret: Vec<u8>,
    /// `iss` claim written into and required from access tokens
    pub token_issuer: String,
    /// Access token lifetime (1 hour)
    pub token_ttl: Duration,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
}

impl Default for ConduitConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Vec::new(),
            token_issuer: "conduit".to_string(),
            token_ttl: Duration::from_secs(3600),
            password_pepper: None,
        }
    }
}

impl ConduitConfig {
    /// Create config with a random token secret
    ///
    /// Tokens do not survive a restart with this secret.
    pub fn with_random_secret() -> Self {
        Self {
            jwt_secret: platform::crypto::random_bytes(32),
            ..Default::default()
        }
    }

    /// Create config for development
    pub fn development() -> Self {
        Self::with_random_secret()
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    pub fn token_signer(&self) -> TokenSigner {
        TokenSigner::hs256(&self.jwt_secret, &self.token_issuer)
    }
}

impl fmt::Debug for ConduitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConduitConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_issuer", &self.token_issuer)
            .field("token_ttl", &self.token_ttl)
            .field("password_pepper", &self.password_pepper.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
