//! Access Token Claims

use std::time::Duration;

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::user::User;

/// Claims carried by a Conduit access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub bio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl AccessClaims {
    pub fn issue(user: &User, issuer: &str, ttl: Duration, now: DateTime<Utc>) -> Self {
        let iat = now.timestamp();
        Self {
            iss: issuer.to_string(),
            iat,
            exp: iat + ttl.as_secs() as i64,
            user_id: user.id.into_uuid(),
            email: user.email.as_str().to_string(),
            username: user.username.as_str().to_string(),
            bio: user.bio.clone(),
            image: user.image.clone(),
        }
    }

    pub fn user_id(&self) -> UserId {
        UserId::from_uuid(self.user_id)
    }
}
