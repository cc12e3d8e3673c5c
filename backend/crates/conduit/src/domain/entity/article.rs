//! Article Entity

use chrono::{DateTime, Utc};
use kernel::error::app_error::{AppError, AppResult};
use kernel::id::{ArticleId, UserId};

/// Denormalized author fields stored with articles and comments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub username: String,
    pub bio: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Article {
    pub id: ArticleId,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tags: Vec<String>,
    pub author: Author,
    /// Computed by storage at read time; never written
    pub favorites_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of an article; `None` leaves the field untouched
#[derive(Debug, Default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
}

impl ArticleChanges {
    /// Supplied fields must not be blank
    pub fn validate(&self) -> AppResult<()> {
        let fields = [
            ("title", &self.title),
            ("description", &self.description),
            ("body", &self.body),
        ];
        for (name, value) in fields {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(AppError::bad_request(format!("{name} can't be blank")));
            }
        }
        Ok(())
    }
}

impl Article {
    pub fn new(
        author: Author,
        title: String,
        description: String,
        body: String,
        tags: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ArticleId::new(),
            slug: platform::slug::generate(&title),
            title,
            description,
            body,
            tags: normalize_tags(tags),
            author,
            favorites_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_authored_by(&self, user_id: &UserId) -> bool {
        self.author.id == *user_id
    }

    /// Apply the supplied fields; the slug is regenerated only when the
    /// title actually changes. Returns whether the slug changed.
    pub fn apply(&mut self, changes: ArticleChanges) -> bool {
        let mut slug_changed = false;

        if let Some(title) = changes.title {
            if title != self.title {
                self.slug = platform::slug::generate(&title);
                self.title = title;
                slug_changed = true;
            }
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(body) = changes.body {
            self.body = body;
        }

        self.updated_at = Utc::now();
        slug_changed
    }
}

/// Trim, drop blanks and de-duplicate while keeping the caller's order
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}

/// Article with flags relative to the viewer
#[derive(Debug, Clone)]
pub struct ArticleView {
    pub article: Article,
    pub favorited: bool,
    pub following: bool,
}
