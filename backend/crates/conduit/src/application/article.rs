//! Article Service
//!
//! Listing operations compute `favorited` and `following` for a whole page
//! with one batched lookup each, never one query per article.

use std::collections::HashSet;
use std::sync::Arc;

use kernel::id::UserId;

use crate::domain::entity::{Article, ArticleChanges, ArticleView};
use crate::domain::repository::{ArticleFilter, ArticleRepository, Page, UserRepository};
use crate::error::{ConduitError, ConduitResult};

pub struct CreateArticleInput {
    pub title: String,
    pub description: String,
    pub body: String,
    pub tags: Vec<String>,
}

pub struct ArticleService<A, U>
where
    A: ArticleRepository,
    U: UserRepository,
{
    article_repo: Arc<A>,
    user_repo: Arc<U>,
}

impl<A, U> ArticleService<A, U>
where
    A: ArticleRepository,
    U: UserRepository,
{
    pub fn new(article_repo: Arc<A>, user_repo: Arc<U>) -> Self {
        Self {
            article_repo,
            user_repo,
        }
    }

    pub async fn create(
        &self,
        author_id: &UserId,
        input: CreateArticleInput,
    ) -> ConduitResult<ArticleView> {
        // The id comes from a verified token, so a missing author is a server fault
        let author = self
            .user_repo
            .find_user_by_id(author_id)
            .await?
            .ok_or_else(|| ConduitError::Internal(format!("author {} not found", author_id)))?;

        let article = Article::new(
            author.author(),
            input.title,
            input.description,
            input.body,
            input.tags,
        );
        self.article_repo.create_article(&article).await?;

        tracing::info!(slug = %article.slug, author_id = %author_id, "Article created");

        Ok(ArticleView {
            article,
            favorited: false,
            following: false,
        })
    }

    pub async fn find(&self, viewer: Option<&UserId>, slug: &str) -> ConduitResult<ArticleView> {
        let article = self.require(slug).await?;
        self.view(viewer, article).await
    }

    pub async fn list(
        &self,
        viewer: Option<&UserId>,
        filter: &ArticleFilter,
    ) -> ConduitResult<Vec<ArticleView>> {
        let articles = self.article_repo.find_articles(filter).await?;
        self.views(viewer, articles).await
    }

    pub async fn feed(&self, viewer: &UserId, page: &Page) -> ConduitResult<Vec<ArticleView>> {
        let articles = self.article_repo.find_feed(viewer, page).await?;
        self.views(Some(viewer), articles).await
    }

    pub async fn update(
        &self,
        author_id: &UserId,
        slug: &str,
        changes: ArticleChanges,
    ) -> ConduitResult<ArticleView> {
        let mut article = self.require(slug).await?;

        if !article.is_authored_by(author_id) {
            return Err(ConduitError::NonOwnedContent);
        }
        changes.validate()?;

        if article.apply(changes) {
            tracing::debug!(old = %slug, new = %article.slug, "Article slug regenerated");
        }
        self.article_repo.update_article(&article).await?;

        tracing::info!(slug = %article.slug, author_id = %author_id, "Article updated");

        self.view(Some(author_id), article).await
    }

    pub async fn delete(&self, author_id: &UserId, slug: &str) -> ConduitResult<()> {
        let article = self.require(slug).await?;

        if !article.is_authored_by(author_id) {
            return Err(ConduitError::NonOwnedContent);
        }

        self.article_repo.delete_article(&article.id).await?;

        tracing::info!(slug = %slug, author_id = %author_id, "Article deleted");

        Ok(())
    }

    pub async fn favorite(&self, user_id: &UserId, slug: &str) -> ConduitResult<ArticleView> {
        let article = self.require(slug).await?;
        self.article_repo
            .create_favorite(user_id, &article.id)
            .await?;

        // Re-read so that favoritesCount includes this favorite
        let article = self.reload(slug).await?;
        self.view(Some(user_id), article).await
    }

    /// Unfavoriting an article that was never favorited succeeds
    pub async fn unfavorite(&self, user_id: &UserId, slug: &str) -> ConduitResult<ArticleView> {
        let article = self.require(slug).await?;
        self.article_repo
            .delete_favorite(user_id, &article.id)
            .await?;

        let article = self.reload(slug).await?;
        self.view(Some(user_id), article).await
    }

    pub async fn tags(&self) -> ConduitResult<Vec<String>> {
        self.article_repo.find_tags().await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn require(&self, slug: &str) -> ConduitResult<Article> {
        self.article_repo
            .find_article_by_slug(slug)
            .await?
            .ok_or(ConduitError::NotFound)
    }

    async fn reload(&self, slug: &str) -> ConduitResult<Article> {
        self.article_repo
            .find_article_by_slug(slug)
            .await?
            .ok_or_else(|| ConduitError::Internal(format!("article {} vanished", slug)))
    }

    async fn view(&self, viewer: Option<&UserId>, article: Article) -> ConduitResult<ArticleView> {
        let Some(viewer) = viewer else {
            return Ok(ArticleView {
                article,
                favorited: false,
                following: false,
            });
        };

        let favorited = self
            .article_repo
            .exists_favorite(viewer, &article.id)
            .await?;
        let following = if article.is_authored_by(viewer) {
            false
        } else {
            self.user_repo
                .exists_follow(viewer, &article.author.id)
                .await?
        };

        Ok(ArticleView {
            article,
            favorited,
            following,
        })
    }

    async fn views(
        &self,
        viewer: Option<&UserId>,
        articles: Vec<Article>,
    ) -> ConduitResult<Vec<ArticleView>> {
        let (favorited, followed) = match viewer {
            Some(viewer) if !articles.is_empty() => {
                let article_ids: Vec<_> = articles.iter().map(|a| a.id).collect();
                let author_ids: Vec<_> = articles
                    .iter()
                    .map(|a| a.author.id)
                    .collect::<HashSet<_>>()
                    .into_iter()
                    .collect();

                (
                    self.article_repo
                        .find_favorited_among(viewer, &article_ids)
                        .await?,
                    self.user_repo
                        .find_followed_among(viewer, &author_ids)
                        .await?,
                )
            }
            _ => (HashSet::new(), HashSet::new()),
        };

        Ok(articles
            .into_iter()
            .map(|article| ArticleView {
                favorited: favorited.contains(&article.id),
                following: followed.contains(&article.author.id),
                article,
            })
            .collect())
    }
}
