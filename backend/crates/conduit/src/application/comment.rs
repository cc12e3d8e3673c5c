//! Comment Service

use std::collections::HashSet;
use std::sync::Arc;

use kernel::id::{CommentId, UserId};

use crate::domain::entity::{Comment, CommentView};
use crate::domain::repository::{ArticleRepository, CommentRepository, UserRepository};
use crate::error::{ConduitError, ConduitResult};

pub struct CommentService<C, A, U>
where
    C: CommentRepository,
    A: ArticleRepository,
    U: UserRepository,
{
    comment_repo: Arc<C>,
    article_repo: Arc<A>,
    user_repo: Arc<U>,
}

impl<C, A, U> CommentService<C, A, U>
where
    C: CommentRepository,
    A: ArticleRepository,
    U: UserRepository,
{
    pub fn new(comment_repo: Arc<C>, article_repo: Arc<A>, user_repo: Arc<U>) -> Self {
        Self {
            comment_repo,
            article_repo,
            user_repo,
        }
    }

    /// The new comment is returned with `following = false`
    pub async fn create(
        &self,
        author_id: &UserId,
        slug: &str,
        body: String,
    ) -> ConduitResult<CommentView> {
        let article = self
            .article_repo
            .find_article_by_slug(slug)
            .await?
            .ok_or(ConduitError::NotFound)?;

        let author = self
            .user_repo
            .find_user_by_id(author_id)
            .await?
            .ok_or_else(|| ConduitError::Internal(format!("author {} not found", author_id)))?;

        let comment = Comment::new(article.id, author.author(), body);
        self.comment_repo.create_comment(&comment).await?;

        tracing::info!(comment_id = %comment.id, slug = %slug, "Comment created");

        Ok(CommentView {
            comment,
            following: false,
        })
    }

    pub async fn list(
        &self,
        viewer: Option<&UserId>,
        slug: &str,
    ) -> ConduitResult<Vec<CommentView>> {
        let article = self
            .article_repo
            .find_article_by_slug(slug)
            .await?
            .ok_or(ConduitError::NotFound)?;

        let comments = self
            .comment_repo
            .find_comments_by_article(&article.id)
            .await?;

        let followed = match viewer {
            Some(viewer) if !comments.is_empty() => {
                let author_ids: Vec<UserId> = comments
                    .iter()
                    .map(|c| c.author.id)
                    .collect::<HashSet<_>>()
                    .into_iter()
                    .collect();
                self.user_repo
                    .find_followed_among(viewer, &author_ids)
                    .await?
            }
            _ => HashSet::new(),
        };

        Ok(comments
            .into_iter()
            .map(|comment| CommentView {
                following: followed.contains(&comment.author.id),
                comment,
            })
            .collect())
    }

    /// A comment owned by someone else is indistinguishable from a missing one
    pub async fn delete(&self, author_id: &UserId, comment_id: &CommentId) -> ConduitResult<()> {
        if !self
            .comment_repo
            .delete_comment(comment_id, author_id)
            .await?
        {
            return Err(ConduitError::NonOwnedContent);
        }

        tracing::info!(comment_id = %comment_id, author_id = %author_id, "Comment deleted");

        Ok(())
    }
}
