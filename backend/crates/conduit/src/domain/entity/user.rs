//! User Entity

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use platform::password::HashedPassword;

use crate::domain::entity::article::Author;
use crate::domain::value_object::{Email, Username};

/// Registered user
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub username: Username,
    pub password_hash: HashedPassword,
    pub bio: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a user; `None` leaves the field untouched
#[derive(Debug, Default)]
pub struct UserChanges {
    pub email: Option<Email>,
    pub username: Option<Username>,
    pub password_hash: Option<HashedPassword>,
    pub bio: Option<String>,
    /// An empty string clears the image
    pub image: Option<String>,
}

impl User {
    pub fn new(email: Email, username: Username, password_hash: HashedPassword) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email,
            username,
            password_hash,
            bio: String::new(),
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, changes: UserChanges) {
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(username) = changes.username {
            self.username = username;
        }
        if let Some(password_hash) = changes.password_hash {
            self.password_hash = password_hash;
        }
        if let Some(bio) = changes.bio {
            self.bio = bio;
        }
        if let Some(image) = changes.image {
            self.image = (!image.is_empty()).then_some(image);
        }
        self.updated_at = Utc::now();
    }

    /// Snapshot embedded into the user's articles and comments
    pub fn author(&self) -> Author {
        Author {
            id: self.id,
            username: self.username.as_str().to_string(),
            bio: self.bio.clone(),
            image: self.image.clone(),
        }
    }

    pub fn profile(&self, following: bool) -> Profile {
        Profile {
            username: self.username.as_str().to_string(),
            bio: self.bio.clone(),
            image: self.image.clone(),
            following,
        }
    }
}

/// Public view of a user relative to a viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub username: String,
    pub bio: String,
    pub image: Option<String>,
    pub following: bool,
}
