//! PostgreSQL Repository Implementations
//!
//! [`PgStore`] opens one transaction per request; [`PgConduitRepository`]
//! is the repository set bound to that transaction.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::{ArticleId, CommentId, UserId};
use platform::password::HashedPassword;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Transaction};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::entity::{Article, Author, Comment, User};
use crate::domain::repository::{
    ArticleFilter, ArticleRepository, CommentRepository, Page, TransactionManager,
    UserRepository,
};
use crate::domain::value_object::{Email, Username};
use crate::error::{ConduitError, ConduitResult};

type TxSlot = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// Pool-backed transaction manager
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Repository set bound to one open transaction
///
/// Clones share the transaction. Dropping the last clone without a commit
/// rolls the transaction back.
#[derive(Clone)]
pub struct PgConduitRepository {
    tx: TxSlot,
}

impl PgConduitRepository {
    async fn take(&self) -> ConduitResult<Transaction<'static, Postgres>> {
        self.tx.lock().await.take().ok_or_else(closed)
    }
}

fn closed() -> ConduitError {
    ConduitError::Internal("transaction already closed".to_string())
}

fn active<'a>(
    slot: &'a mut Option<Transaction<'static, Postgres>>,
) -> ConduitResult<&'a mut PgConnection> {
    slot.as_deref_mut().ok_or_else(closed)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Unique violations on users are taken emails or usernames
fn user_write_error(err: sqlx::Error) -> ConduitError {
    if is_unique_violation(&err) {
        ConduitError::DuplicateIdentifier
    } else {
        ConduitError::Database(err)
    }
}

// ============================================================================
// Transaction Manager
// ============================================================================

impl TransactionManager for PgStore {
    type Scope = PgConduitRepository;

    async fn begin(&self) -> ConduitResult<PgConduitRepository> {
        let tx = self.pool.begin().await?;
        Ok(PgConduitRepository {
            tx: Arc::new(Mutex::new(Some(tx))),
        })
    }

    async fn commit(&self, scope: PgConduitRepository) -> ConduitResult<()> {
        scope.take().await?.commit().await?;
        Ok(())
    }

    async fn rollback(&self, scope: PgConduitRepository) -> ConduitResult<()> {
        scope.take().await?.rollback().await?;
        Ok(())
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

const SELECT_USERS: &str = r#"
    SELECT id, email, username, password_hash, bio, image, created_at, updated_at
    FROM users
"#;

impl UserRepository for PgConduitRepository {
    async fn create_user(&self, user: &User) -> ConduitResult<()> {
        let mut tx = self.tx.lock().await;

        sqlx::query(
            r#"
            INSERT INTO users (
                id,
                email,
                username,
                password_hash,
                bio,
                image,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(user.email.as_str())
        .bind(user.username.as_str())
        .bind(user.password_hash.as_phc_string())
        .bind(&user.bio)
        .bind(&user.image)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(active(&mut tx)?)
        .await
        .map_err(user_write_error)?;

        Ok(())
    }

    async fn find_user_by_id(&self, id: &UserId) -> ConduitResult<Option<User>> {
        let mut tx = self.tx.lock().await;

        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USERS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(active(&mut tx)?)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_user_by_email(&self, email: &Email) -> ConduitResult<Option<User>> {
        let mut tx = self.tx.lock().await;

        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USERS} WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(active(&mut tx)?)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> ConduitResult<Option<User>> {
        let mut tx = self.tx.lock().await;

        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USERS} WHERE username = $1"))
            .bind(username)
            .fetch_optional(active(&mut tx)?)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn exists_user_by_email_or_username(
        &self,
        email: &Email,
        username: &Username,
    ) -> ConduitResult<bool> {
        let mut tx = self.tx.lock().await;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 OR username = $2)",
        )
        .bind(email.as_str())
        .bind(username.as_str())
        .fetch_one(active(&mut tx)?)
        .await?;

        Ok(exists)
    }

    async fn update_user(&self, user: &User) -> ConduitResult<()> {
        let mut tx = self.tx.lock().await;

        sqlx::query(
            r#"
            UPDATE users SET
                email = $2,
                username = $3,
                password_hash = $4,
                bio = $5,
                image = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(user.email.as_str())
        .bind(user.username.as_str())
        .bind(user.password_hash.as_phc_string())
        .bind(&user.bio)
        .bind(&user.image)
        .bind(user.updated_at)
        .execute(active(&mut tx)?)
        .await
        .map_err(user_write_error)?;

        Ok(())
    }

    async fn create_follow(&self, follower: &UserId, following: &UserId) -> ConduitResult<()> {
        let mut tx = self.tx.lock().await;

        sqlx::query(
            r#"
            INSERT INTO follows (follower_id, following_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, following_id) DO NOTHING
            "#,
        )
        .bind(follower.as_uuid())
        .bind(following.as_uuid())
        .execute(active(&mut tx)?)
        .await?;

        Ok(())
    }

    async fn exists_follow(&self, follower: &UserId, following: &UserId) -> ConduitResult<bool> {
        let mut tx = self.tx.lock().await;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)",
        )
        .bind(follower.as_uuid())
        .bind(following.as_uuid())
        .fetch_one(active(&mut tx)?)
        .await?;

        Ok(exists)
    }

    async fn find_followed_among(
        &self,
        follower: &UserId,
        candidates: &[UserId],
    ) -> ConduitResult<HashSet<UserId>> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }

        let mut tx = self.tx.lock().await;
        let ids: Vec<Uuid> = candidates.iter().map(|id| id.into_uuid()).collect();

        let rows = sqlx::query_scalar::<_, Uuid>(
            "SELECT following_id FROM follows WHERE follower_id = $1 AND following_id = ANY($2)",
        )
        .bind(follower.as_uuid())
        .bind(ids)
        .fetch_all(active(&mut tx)?)
        .await?;

        Ok(rows.into_iter().map(UserId::from_uuid).collect())
    }

    async fn delete_follow(&self, follower: &UserId, following: &UserId) -> ConduitResult<()> {
        let mut tx = self.tx.lock().await;

        sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
            .bind(follower.as_uuid())
            .bind(following.as_uuid())
            .execute(active(&mut tx)?)
            .await?;

        Ok(())
    }
}

// ============================================================================
// Article Repository Implementation
// ============================================================================

const SELECT_ARTICLES: &str = r#"
    SELECT
        a.id,
        a.slug,
        a.title,
        a.description,
        a.body,
        a.tags,
        a.author_id,
        a.author_username,
        a.author_bio,
        a.author_image,
        (SELECT COUNT(*) FROM favorites f WHERE f.article_id = a.id) AS favorites_count,
        a.created_at,
        a.updated_at
    FROM articles a
"#;

impl ArticleRepository for PgConduitRepository {
    async fn create_article(&self, article: &Article) -> ConduitResult<()> {
        let mut tx = self.tx.lock().await;

        sqlx::query(
            r#"
            INSERT INTO articles (
                id,
                slug,
                title,
                description,
                body,
                tags,
                author_id,
                author_username,
                author_bio,
                author_image,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(article.id.as_uuid())
        .bind(&article.slug)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.body)
        .bind(&article.tags)
        .bind(article.author.id.as_uuid())
        .bind(&article.author.username)
        .bind(&article.author.bio)
        .bind(&article.author.image)
        .bind(article.created_at)
        .bind(article.updated_at)
        .execute(active(&mut tx)?)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ConduitError::Internal(format!("slug collision on {}", article.slug))
            } else {
                ConduitError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn update_article(&self, article: &Article) -> ConduitResult<()> {
        let mut tx = self.tx.lock().await;

        sqlx::query(
            r#"
            UPDATE articles SET
                slug = $2,
                title = $3,
                description = $4,
                body = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(article.id.as_uuid())
        .bind(&article.slug)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.body)
        .bind(article.updated_at)
        .execute(active(&mut tx)?)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ConduitError::Internal(format!("slug collision on {}", article.slug))
            } else {
                ConduitError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn find_article_by_slug(&self, slug: &str) -> ConduitResult<Option<Article>> {
        let mut tx = self.tx.lock().await;

        let row = sqlx::query_as::<_, ArticleRow>(&format!("{SELECT_ARTICLES} WHERE a.slug = $1"))
            .bind(slug)
            .fetch_optional(active(&mut tx)?)
            .await?;

        Ok(row.map(ArticleRow::into_article))
    }

    async fn find_articles(&self, filter: &ArticleFilter) -> ConduitResult<Vec<Article>> {
        let mut tx = self.tx.lock().await;

        let mut query = QueryBuilder::<Postgres>::new(SELECT_ARTICLES);
        query.push(" WHERE TRUE");

        if let Some(tag) = &filter.tag {
            query.push(" AND ").push_bind(tag.clone()).push(" = ANY(a.tags)");
        }
        if let Some(author) = &filter.author {
            query
                .push(" AND a.author_username = ")
                .push_bind(author.clone());
        }
        if let Some(favorited_by) = &filter.favorited_by {
            query
                .push(
                    " AND a.id IN (SELECT f.article_id FROM favorites f \
                     JOIN users u ON u.id = f.user_id WHERE u.username = ",
                )
                .push_bind(favorited_by.clone())
                .push(")");
        }

        query
            .push(" ORDER BY a.created_at DESC LIMIT ")
            .push_bind(filter.page.limit)
            .push(" OFFSET ")
            .push_bind(filter.page.offset);

        let rows = query
            .build_query_as::<ArticleRow>()
            .fetch_all(active(&mut tx)?)
            .await?;

        Ok(rows.into_iter().map(ArticleRow::into_article).collect())
    }

    async fn find_feed(&self, follower: &UserId, page: &Page) -> ConduitResult<Vec<Article>> {
        let mut tx = self.tx.lock().await;

        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            r#"
            {SELECT_ARTICLES}
            WHERE a.author_id IN (
                SELECT following_id FROM follows WHERE follower_id = $1
            )
            ORDER BY a.created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(follower.as_uuid())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(active(&mut tx)?)
        .await?;

        Ok(rows.into_iter().map(ArticleRow::into_article).collect())
    }

    async fn delete_article(&self, id: &ArticleId) -> ConduitResult<()> {
        let mut tx = self.tx.lock().await;

        sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(active(&mut tx)?)
            .await?;

        Ok(())
    }

    async fn update_author_snapshot(&self, author: &Author) -> ConduitResult<u64> {
        let mut tx = self.tx.lock().await;

        let updated = sqlx::query(
            r#"
            UPDATE articles SET
                author_username = $2,
                author_bio = $3,
                author_image = $4
            WHERE author_id = $1
            "#,
        )
        .bind(author.id.as_uuid())
        .bind(&author.username)
        .bind(&author.bio)
        .bind(&author.image)
        .execute(active(&mut tx)?)
        .await?
        .rows_affected();

        Ok(updated)
    }

    async fn create_favorite(&self, user: &UserId, article: &ArticleId) -> ConduitResult<()> {
        let mut tx = self.tx.lock().await;

        sqlx::query(
            r#"
            INSERT INTO favorites (user_id, article_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, article_id) DO NOTHING
            "#,
        )
        .bind(user.as_uuid())
        .bind(article.as_uuid())
        .execute(active(&mut tx)?)
        .await?;

        Ok(())
    }

    async fn exists_favorite(&self, user: &UserId, article: &ArticleId) -> ConduitResult<bool> {
        let mut tx = self.tx.lock().await;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = $1 AND article_id = $2)",
        )
        .bind(user.as_uuid())
        .bind(article.as_uuid())
        .fetch_one(active(&mut tx)?)
        .await?;

        Ok(exists)
    }

    async fn find_favorited_among(
        &self,
        user: &UserId,
        candidates: &[ArticleId],
    ) -> ConduitResult<HashSet<ArticleId>> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }

        let mut tx = self.tx.lock().await;
        let ids: Vec<Uuid> = candidates.iter().map(|id| id.into_uuid()).collect();

        let rows = sqlx::query_scalar::<_, Uuid>(
            "SELECT article_id FROM favorites WHERE user_id = $1 AND article_id = ANY($2)",
        )
        .bind(user.as_uuid())
        .bind(ids)
        .fetch_all(active(&mut tx)?)
        .await?;

        Ok(rows.into_iter().map(ArticleId::from_uuid).collect())
    }

    async fn delete_favorite(&self, user: &UserId, article: &ArticleId) -> ConduitResult<()> {
        let mut tx = self.tx.lock().await;

        sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND article_id = $2")
            .bind(user.as_uuid())
            .bind(article.as_uuid())
            .execute(active(&mut tx)?)
            .await?;

        Ok(())
    }

    async fn find_tags(&self) -> ConduitResult<Vec<String>> {
        let mut tx = self.tx.lock().await;

        let tags = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT tag FROM articles, unnest(articles.tags) AS tag ORDER BY tag",
        )
        .fetch_all(active(&mut tx)?)
        .await?;

        Ok(tags)
    }
}

// ============================================================================
// Comment Repository Implementation
// ============================================================================

impl CommentRepository for PgConduitRepository {
    async fn create_comment(&self, comment: &Comment) -> ConduitResult<()> {
        let mut tx = self.tx.lock().await;

        sqlx::query(
            r#"
            INSERT INTO comments (
                id,
                article_id,
                body,
                author_id,
                author_username,
                author_bio,
                author_image,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(comment.id.as_uuid())
        .bind(comment.article_id.as_uuid())
        .bind(&comment.body)
        .bind(comment.author.id.as_uuid())
        .bind(&comment.author.username)
        .bind(&comment.author.bio)
        .bind(&comment.author.image)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(active(&mut tx)?)
        .await?;

        Ok(())
    }

    async fn find_comments_by_article(&self, article: &ArticleId) -> ConduitResult<Vec<Comment>> {
        let mut tx = self.tx.lock().await;

        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT
                id,
                article_id,
                body,
                author_id,
                author_username,
                author_bio,
                author_image,
                created_at,
                updated_at
            FROM comments
            WHERE article_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(article.as_uuid())
        .fetch_all(active(&mut tx)?)
        .await?;

        Ok(rows.into_iter().map(CommentRow::into_comment).collect())
    }

    async fn delete_comment(&self, id: &CommentId, author: &UserId) -> ConduitResult<bool> {
        let mut tx = self.tx.lock().await;

        let deleted = sqlx::query("DELETE FROM comments WHERE id = $1 AND author_id = $2")
            .bind(id.as_uuid())
            .bind(author.as_uuid())
            .execute(active(&mut tx)?)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    username: String,
    password_hash: String,
    bio: String,
    image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> ConduitResult<User> {
        Ok(User {
            id: UserId::from_uuid(self.id),
            email: Email::from_trusted(self.email),
            username: Username::from_trusted(self.username),
            password_hash: HashedPassword::from_phc_string(self.password_hash)?,
            bio: self.bio,
            image: self.image,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: Uuid,
    slug: String,
    title: String,
    description: String,
    body: String,
    tags: Vec<String>,
    author_id: Uuid,
    author_username: String,
    author_bio: String,
    author_image: Option<String>,
    favorites_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ArticleRow {
    fn into_article(self) -> Article {
        Article {
            id: ArticleId::from_uuid(self.id),
            slug: self.slug,
            title: self.title,
            description: self.description,
            body: self.body,
            tags: self.tags,
            author: Author {
                id: UserId::from_uuid(self.author_id),
                username: self.author_username,
                bio: self.author_bio,
                image: self.author_image,
            },
            favorites_count: self.favorites_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    article_id: Uuid,
    body: String,
    author_id: Uuid,
    author_username: String,
    author_bio: String,
    author_image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CommentRow {
    fn into_comment(self) -> Comment {
        Comment {
            id: CommentId::from_uuid(self.id),
            article_id: ArticleId::from_uuid(self.article_id),
            body: self.body,
            author: Author {
                id: UserId::from_uuid(self.author_id),
                username: self.author_username,
                bio: self.author_bio,
                image: self.author_image,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// Run with a reachable database:
// DATABASE_URL=postgres://... cargo test -p conduit -- --ignored
#[cfg(test)]
mod tests {
    use chrono::Duration;
    use platform::password::ClearTextPassword;

    use super::*;

    fn user(name: &str) -> User {
        let password = ClearTextPassword::new("password123".to_string()).unwrap();
        User::new(
            Email::new(format!("{name}@example.com")).unwrap(),
            Username::new(name).unwrap(),
            password.hash(None).unwrap(),
        )
    }

    fn article(author: &User, title: &str, tags: &[&str], minutes_ago: i64) -> Article {
        let mut article = Article::new(
            author.author(),
            title.to_string(),
            "description".to_string(),
            "body".to_string(),
            tags.iter().map(|t| t.to_string()).collect(),
        );
        article.created_at = Utc::now() - Duration::minutes(minutes_ago);
        article.updated_at = article.created_at;
        article
    }

    fn slugs(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.slug.as_str()).collect()
    }

    async fn seed_users(repo: &PgConduitRepository, names: &[&str]) -> Vec<User> {
        let mut users = Vec::new();
        for name in names {
            let user = user(name);
            repo.create_user(&user).await.unwrap();
            users.push(user);
        }
        users
    }

    #[sqlx::test(migrations = "../../../database/migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_user_lookups(pool: PgPool) {
        let repo = PgStore::new(pool).begin().await.unwrap();
        let alice = &seed_users(&repo, &["alice"]).await[0];

        let by_id = repo.find_user_by_id(&alice.id).await.unwrap().unwrap();
        assert_eq!(by_id.username.as_str(), "alice");
        assert!(by_id.password_hash.verify(
            &ClearTextPassword::new("password123".to_string()).unwrap(),
            None
        ));

        let by_email = repo.find_user_by_email(&alice.email).await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(alice.id));

        let by_name = repo.find_user_by_username("alice").await.unwrap();
        assert_eq!(by_name.map(|u| u.id), Some(alice.id));
        assert!(repo.find_user_by_username("nobody").await.unwrap().is_none());

        let other = Username::new("someone").unwrap();
        assert!(repo.exists_user_by_email_or_username(&alice.email, &other).await.unwrap());
    }

    #[sqlx::test(migrations = "../../../database/migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_taken_email_is_duplicate_identifier(pool: PgPool) {
        let repo = PgStore::new(pool).begin().await.unwrap();
        seed_users(&repo, &["alice"]).await;

        let mut twin = user("alice2");
        twin.email = Email::new("alice@example.com").unwrap();

        let err = repo.create_user(&twin).await.unwrap_err();
        assert!(matches!(err, ConduitError::DuplicateIdentifier));
    }

    #[sqlx::test(migrations = "../../../database/migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_update_to_taken_username_is_duplicate_identifier(pool: PgPool) {
        let repo = PgStore::new(pool).begin().await.unwrap();
        let users = seed_users(&repo, &["alice", "bob"]).await;

        let mut bob = users[1].clone();
        bob.username = Username::new("alice").unwrap();

        let err = repo.update_user(&bob).await.unwrap_err();
        assert!(matches!(err, ConduitError::DuplicateIdentifier));
    }

    #[sqlx::test(migrations = "../../../database/migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_slug_collision_is_internal(pool: PgPool) {
        let repo = PgStore::new(pool).begin().await.unwrap();
        let alice = &seed_users(&repo, &["alice"]).await[0];

        let first = article(alice, "Same title", &[], 1);
        repo.create_article(&first).await.unwrap();

        let mut second = article(alice, "Same title", &[], 0);
        second.slug = first.slug.clone();

        let err = repo.create_article(&second).await.unwrap_err();
        assert!(matches!(err, ConduitError::Internal(_)));
    }

    #[sqlx::test(migrations = "../../../database/migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_article_filters_combine(pool: PgPool) {
        let repo = PgStore::new(pool).begin().await.unwrap();
        let users = seed_users(&repo, &["alice", "bob"]).await;
        let (alice, bob) = (&users[0], &users[1]);

        let oldest = article(alice, "Rust by alice", &["rust"], 3);
        let middle = article(alice, "Go by alice", &["go"], 2);
        let newest = article(bob, "Rust by bob", &["rust", "web"], 1);
        for a in [&oldest, &middle, &newest] {
            repo.create_article(a).await.unwrap();
        }
        repo.create_favorite(&bob.id, &oldest.id).await.unwrap();
        repo.create_favorite(&bob.id, &newest.id).await.unwrap();

        let all = repo.find_articles(&ArticleFilter::default()).await.unwrap();
        assert_eq!(slugs(&all), [&newest.slug, &middle.slug, &oldest.slug]);

        let rust = repo
            .find_articles(&ArticleFilter {
                tag: Some("rust".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(slugs(&rust), [&newest.slug, &oldest.slug]);

        let rust_by_alice = repo
            .find_articles(&ArticleFilter {
                tag: Some("rust".to_string()),
                author: Some("alice".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(slugs(&rust_by_alice), [&oldest.slug]);

        let favorited = repo
            .find_articles(&ArticleFilter {
                author: Some("alice".to_string()),
                favorited_by: Some("bob".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(slugs(&favorited), [&oldest.slug]);
        assert_eq!(favorited[0].favorites_count, 1);

        let nothing = repo
            .find_articles(&ArticleFilter {
                favorited_by: Some("alice".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(nothing.is_empty());
    }

    #[sqlx::test(migrations = "../../../database/migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_article_pagination(pool: PgPool) {
        let repo = PgStore::new(pool).begin().await.unwrap();
        let alice = &seed_users(&repo, &["alice"]).await[0];

        let articles: Vec<Article> = (0..5)
            .map(|i| article(alice, &format!("Post {i}"), &[], 10 - i))
            .collect();
        for a in &articles {
            repo.create_article(a).await.unwrap();
        }

        let page = repo
            .find_articles(&ArticleFilter {
                page: Page { limit: 2, offset: 1 },
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(slugs(&page), [&articles[3].slug, &articles[2].slug]);
    }

    #[sqlx::test(migrations = "../../../database/migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_feed_and_batched_flags(pool: PgPool) {
        let repo = PgStore::new(pool).begin().await.unwrap();
        let users = seed_users(&repo, &["alice", "bob", "carol"]).await;
        let (alice, bob, carol) = (&users[0], &users[1], &users[2]);

        let by_bob = article(bob, "By bob", &[], 2);
        let by_carol = article(carol, "By carol", &[], 1);
        repo.create_article(&by_bob).await.unwrap();
        repo.create_article(&by_carol).await.unwrap();

        repo.create_follow(&alice.id, &bob.id).await.unwrap();
        repo.create_follow(&alice.id, &bob.id).await.unwrap();
        repo.create_favorite(&alice.id, &by_carol.id).await.unwrap();
        repo.create_favorite(&alice.id, &by_carol.id).await.unwrap();

        let feed = repo.find_feed(&alice.id, &Page::default()).await.unwrap();
        assert_eq!(slugs(&feed), [&by_bob.slug]);

        let followed = repo
            .find_followed_among(&alice.id, &[bob.id, carol.id])
            .await
            .unwrap();
        assert_eq!(followed, HashSet::from([bob.id]));

        let favorited = repo
            .find_favorited_among(&alice.id, &[by_bob.id, by_carol.id])
            .await
            .unwrap();
        assert_eq!(favorited, HashSet::from([by_carol.id]));

        let carol_article = repo.find_article_by_slug(&by_carol.slug).await.unwrap().unwrap();
        assert_eq!(carol_article.favorites_count, 1);

        assert!(repo.find_followed_among(&alice.id, &[]).await.unwrap().is_empty());

        repo.delete_follow(&alice.id, &bob.id).await.unwrap();
        repo.delete_follow(&alice.id, &bob.id).await.unwrap();
        assert!(!repo.exists_follow(&alice.id, &bob.id).await.unwrap());
        assert!(repo.find_feed(&alice.id, &Page::default()).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "../../../database/migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_tags_are_distinct_and_sorted(pool: PgPool) {
        let repo = PgStore::new(pool).begin().await.unwrap();
        let alice = &seed_users(&repo, &["alice"]).await[0];

        assert!(repo.find_tags().await.unwrap().is_empty());

        repo.create_article(&article(alice, "One", &["web", "rust"], 2)).await.unwrap();
        repo.create_article(&article(alice, "Two", &["axum", "rust"], 1)).await.unwrap();

        assert_eq!(repo.find_tags().await.unwrap(), ["axum", "rust", "web"]);
    }

    #[sqlx::test(migrations = "../../../database/migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_comment_delete_matches_author(pool: PgPool) {
        let repo = PgStore::new(pool).begin().await.unwrap();
        let users = seed_users(&repo, &["alice", "bob"]).await;
        let (alice, bob) = (&users[0], &users[1]);

        let post = article(alice, "Commented", &[], 1);
        repo.create_article(&post).await.unwrap();

        let mut first = Comment::new(post.id, alice.author(), "first".to_string());
        first.created_at = Utc::now() - Duration::minutes(1);
        let second = Comment::new(post.id, bob.author(), "second".to_string());
        repo.create_comment(&second).await.unwrap();
        repo.create_comment(&first).await.unwrap();

        let listed = repo.find_comments_by_article(&post.id).await.unwrap();
        let bodies: Vec<&str> = listed.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, ["first", "second"]);

        assert!(!repo.delete_comment(&first.id, &bob.id).await.unwrap());
        assert!(repo.delete_comment(&first.id, &alice.id).await.unwrap());
        assert!(!repo.delete_comment(&first.id, &alice.id).await.unwrap());

        repo.delete_article(&post.id).await.unwrap();
        assert!(repo.find_comments_by_article(&post.id).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "../../../database/migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_author_snapshot_refresh(pool: PgPool) {
        let repo = PgStore::new(pool).begin().await.unwrap();
        let mut alice = seed_users(&repo, &["alice"]).await.remove(0);

        let post = article(&alice, "Snapshot", &[], 1);
        repo.create_article(&post).await.unwrap();

        alice.username = Username::new("alice2").unwrap();
        alice.bio = "new bio".to_string();
        repo.update_user(&alice).await.unwrap();
        assert_eq!(repo.update_author_snapshot(&alice.author()).await.unwrap(), 1);

        let stored = repo.find_article_by_slug(&post.slug).await.unwrap().unwrap();
        assert_eq!(stored.author.username, "alice2");
        assert_eq!(stored.author.bio, "new bio");
    }

    #[sqlx::test(migrations = "../../../database/migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_commit_and_rollback(pool: PgPool) {
        let store = PgStore::new(pool);

        let kept = store.begin().await.unwrap();
        seed_users(&kept, &["alice"]).await;
        store.commit(kept).await.unwrap();

        let discarded = store.begin().await.unwrap();
        seed_users(&discarded, &["bob"]).await;
        store.rollback(discarded).await.unwrap();

        let dropped = store.begin().await.unwrap();
        seed_users(&dropped, &["carol"]).await;
        drop(dropped);

        let names: Vec<String> = sqlx::query_scalar("SELECT username FROM users ORDER BY username")
            .fetch_all(store.pool())
            .await
            .unwrap();
        assert_eq!(names, ["alice"]);

        let closed = store.begin().await.unwrap();
        store.commit(closed.clone()).await.unwrap();
        assert!(closed.find_tags().await.is_err());
    }
}
