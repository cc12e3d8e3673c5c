//! Comment Entity

use chrono::{DateTime, Utc};
use kernel::id::{ArticleId, CommentId};

use crate::domain::entity::article::Author;

/// Comment on an article. The author snapshot is the one taken when the
/// comment was written.
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: CommentId,
    pub article_id: ArticleId,
    pub body: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(article_id: ArticleId, author: Author, body: String) -> Self {
        let now = Utc::now();
        Self {
            id: CommentId::new(),
            article_id,
            body,
            author,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: Comment,
    pub following: bool,
}
