//! Repository Traits
//!
//! Interfaces for data persistence. Implementations live in the
//! infrastructure layer. Every repository value is bound to one open
//! transaction; see [`TransactionManager`].

use std::collections::HashSet;
use std::future::Future;

use kernel::id::{ArticleId, CommentId, UserId};

use crate::domain::entity::{Article, Author, Comment, User};
use crate::domain::value_object::{Email, Username};
use crate::error::ConduitResult;

/// Default page size for article listings
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Limit/offset pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

/// Optional, AND-combined article filters
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub tag: Option<String>,
    pub author: Option<String>,
    /// Username of a user who favorited the article
    pub favorited_by: Option<String>,
    pub page: Page,
}

/// User and follow-edge repository
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Insert a user; a taken email or username is `DuplicateIdentifier`
    async fn create_user(&self, user: &User) -> ConduitResult<()>;

    async fn find_user_by_id(&self, id: &UserId) -> ConduitResult<Option<User>>;

    async fn find_user_by_email(&self, email: &Email) -> ConduitResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> ConduitResult<Option<User>>;

    async fn exists_user_by_email_or_username(
        &self,
        email: &Email,
        username: &Username,
    ) -> ConduitResult<bool>;

    /// Overwrite all mutable fields; a taken email or username is `DuplicateIdentifier`
    async fn update_user(&self, user: &User) -> ConduitResult<()>;

    /// Create the edge; an existing edge is left as is
    async fn create_follow(&self, follower: &UserId, following: &UserId) -> ConduitResult<()>;

    async fn exists_follow(&self, follower: &UserId, following: &UserId) -> ConduitResult<bool>;

    /// The subset of `candidates` that `follower` follows, in one lookup
    async fn find_followed_among(
        &self,
        follower: &UserId,
        candidates: &[UserId],
    ) -> ConduitResult<HashSet<UserId>>;

    /// Remove the edge; a missing edge is not an error
    async fn delete_follow(&self, follower: &UserId, following: &UserId) -> ConduitResult<()>;
}

/// Article, tag and favorite-edge repository
#[trait_variant::make(ArticleRepository: Send)]
pub trait LocalArticleRepository {
    /// Insert an article; a slug collision is `Internal`
    async fn create_article(&self, article: &Article) -> ConduitResult<()>;

    /// Overwrite slug, title, description, body and `updated_at`
    async fn update_article(&self, article: &Article) -> ConduitResult<()>;

    async fn find_article_by_slug(&self, slug: &str) -> ConduitResult<Option<Article>>;

    /// Newest first
    async fn find_articles(&self, filter: &ArticleFilter) -> ConduitResult<Vec<Article>>;

    /// Articles by authors `follower` follows, newest first
    async fn find_feed(&self, follower: &UserId, page: &Page) -> ConduitResult<Vec<Article>>;

    /// Hard delete, cascading to favorites and comments
    async fn delete_article(&self, id: &ArticleId) -> ConduitResult<()>;

    /// Rewrite the author snapshot of every article by `author.id`
    async fn update_author_snapshot(&self, author: &Author) -> ConduitResult<u64>;

    /// Create the edge; an existing edge is left as is
    async fn create_favorite(&self, user: &UserId, article: &ArticleId) -> ConduitResult<()>;

    async fn exists_favorite(&self, user: &UserId, article: &ArticleId) -> ConduitResult<bool>;

    /// The subset of `candidates` that `user` favorited, in one lookup
    async fn find_favorited_among(
        &self,
        user: &UserId,
        candidates: &[ArticleId],
    ) -> ConduitResult<HashSet<ArticleId>>;

    /// Remove the edge; a missing edge is not an error
    async fn delete_favorite(&self, user: &UserId, article: &ArticleId) -> ConduitResult<()>;

    /// Distinct tags across all articles
    async fn find_tags(&self) -> ConduitResult<Vec<String>>;
}

/// Comment repository
#[trait_variant::make(CommentRepository: Send)]
pub trait LocalCommentRepository {
    async fn create_comment(&self, comment: &Comment) -> ConduitResult<()>;

    /// Oldest first
    async fn find_comments_by_article(&self, article: &ArticleId) -> ConduitResult<Vec<Comment>>;

    /// Delete where both id and author match; `false` when nothing matched
    async fn delete_comment(&self, id: &CommentId, author: &UserId) -> ConduitResult<bool>;
}

/// Full repository set available inside one transaction
pub trait ConduitRepository:
    UserRepository + ArticleRepository + CommentRepository + Clone + Send + Sync + 'static
{
}

impl<T> ConduitRepository for T where
    T: UserRepository + ArticleRepository + CommentRepository + Clone + Send + Sync + 'static
{
}

/// Opens and closes the per-request transaction scope
///
/// The HTTP layer owns the scope: it begins one before the handler runs and
/// must end it with exactly one of [`commit`](Self::commit) or
/// [`rollback`](Self::rollback). A scope dropped without either is rolled back.
pub trait TransactionManager: Clone + Send + Sync + 'static {
    type Scope: ConduitRepository;

    fn begin(&self) -> impl Future<Output = ConduitResult<Self::Scope>> + Send;

    fn commit(&self, scope: Self::Scope) -> impl Future<Output = ConduitResult<()>> + Send;

    fn rollback(&self, scope: Self::Scope) -> impl Future<Output = ConduitResult<()>> + Send;
}
