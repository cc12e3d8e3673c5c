//! In-memory repository used by unit and router tests
//!
//! `begin` snapshots the committed state, `commit` writes the snapshot back
//! and `rollback` drops it, so transaction boundaries are observable.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use kernel::id::{ArticleId, CommentId, UserId};

use crate::domain::entity::{Article, Author, Comment, User};
use crate::domain::repository::{
    ArticleFilter, ArticleRepository, CommentRepository, Page, TransactionManager,
    UserRepository,
};
use crate::domain::value_object::{Email, Username};
use crate::error::{ConduitError, ConduitResult};

/// Per-method call counts, for asserting batched lookups
#[derive(Debug, Clone, Default)]
pub struct CallCounts {
    pub exists_follow: usize,
    pub exists_favorite: usize,
    pub find_followed_among: usize,
    pub find_favorited_among: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    users: Vec<User>,
    follows: HashSet<(UserId, UserId)>,
    articles: Vec<Article>,
    favorites: HashSet<(UserId, ArticleId)>,
    comments: Vec<Comment>,
    pub calls: CallCounts,
    /// Makes `update_author_snapshot` fail
    pub fail_author_snapshot: bool,
}

impl MemoryState {
    fn favorites_count(&self, article: &ArticleId) -> i64 {
        self.favorites.iter().filter(|(_, a)| a == article).count() as i64
    }

    fn with_count(&self, article: &Article) -> Article {
        let mut article = article.clone();
        article.favorites_count = self.favorites_count(&article.id);
        article
    }

    /// Newest first; ties keep the later insert first
    fn newest_first<'a>(&self, articles: impl Iterator<Item = &'a Article>, page: &Page) -> Vec<Article> {
        let mut found: Vec<&Article> = articles.collect();
        found.reverse();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .map(|a| self.with_count(a))
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    committed: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the committed state
    pub fn state(&self) -> MemoryState {
        self.committed.lock().unwrap().clone()
    }

    /// Mutate the committed state directly
    pub fn update<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        f(&mut self.committed.lock().unwrap())
    }

    /// A scope that writes straight into the committed state
    pub fn repository(&self) -> MemoryRepository {
        MemoryRepository {
            state: self.committed.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub fn calls(&self) -> CallCounts {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn fail_author_snapshot(&self) {
        self.state.lock().unwrap().fail_author_snapshot = true;
    }

    fn with<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

impl TransactionManager for MemoryStore {
    type Scope = MemoryRepository;

    async fn begin(&self) -> ConduitResult<MemoryRepository> {
        Ok(MemoryRepository {
            state: Arc::new(Mutex::new(self.state())),
        })
    }

    async fn commit(&self, scope: MemoryRepository) -> ConduitResult<()> {
        let snapshot = scope.state.lock().unwrap().clone();
        *self.committed.lock().unwrap() = snapshot;
        Ok(())
    }

    async fn rollback(&self, _scope: MemoryRepository) -> ConduitResult<()> {
        Ok(())
    }
}

impl UserRepository for MemoryRepository {
    async fn create_user(&self, user: &User) -> ConduitResult<()> {
        self.with(|s| {
            if s
                .users
                .iter()
                .any(|u| u.email == user.email || u.username == user.username)
            {
                return Err(ConduitError::DuplicateIdentifier);
            }
            s.users.push(user.clone());
            Ok(())
        })
    }

    async fn find_user_by_id(&self, id: &UserId) -> ConduitResult<Option<User>> {
        Ok(self.with(|s| s.users.iter().find(|u| u.id == *id).cloned()))
    }

    async fn find_user_by_email(&self, email: &Email) -> ConduitResult<Option<User>> {
        Ok(self.with(|s| s.users.iter().find(|u| u.email == *email).cloned()))
    }

    async fn find_user_by_username(&self, username: &str) -> ConduitResult<Option<User>> {
        Ok(self.with(|s| {
            s.users
                .iter()
                .find(|u| u.username.as_str() == username)
                .cloned()
        }))
    }

    async fn exists_user_by_email_or_username(
        &self,
        email: &Email,
        username: &Username,
    ) -> ConduitResult<bool> {
        Ok(self.with(|s| {
            s.users
                .iter()
                .any(|u| u.email == *email || u.username == *username)
        }))
    }

    async fn update_user(&self, user: &User) -> ConduitResult<()> {
        self.with(|s| {
            if s.users.iter().any(|u| {
                u.id != user.id && (u.email == user.email || u.username == user.username)
            }) {
                return Err(ConduitError::DuplicateIdentifier);
            }
            if let Some(stored) = s.users.iter_mut().find(|u| u.id == user.id) {
                *stored = user.clone();
            }
            Ok(())
        })
    }

    async fn create_follow(&self, follower: &UserId, following: &UserId) -> ConduitResult<()> {
        self.with(|s| s.follows.insert((*follower, *following)));
        Ok(())
    }

    async fn exists_follow(&self, follower: &UserId, following: &UserId) -> ConduitResult<bool> {
        Ok(self.with(|s| {
            s.calls.exists_follow += 1;
            s.follows.contains(&(*follower, *following))
        }))
    }

    async fn find_followed_among(
        &self,
        follower: &UserId,
        candidates: &[UserId],
    ) -> ConduitResult<HashSet<UserId>> {
        Ok(self.with(|s| {
            s.calls.find_followed_among += 1;
            candidates
                .iter()
                .filter(|c| s.follows.contains(&(*follower, **c)))
                .copied()
                .collect()
        }))
    }

    async fn delete_follow(&self, follower: &UserId, following: &UserId) -> ConduitResult<()> {
        self.with(|s| s.follows.remove(&(*follower, *following)));
        Ok(())
    }
}

impl ArticleRepository for MemoryRepository {
    async fn create_article(&self, article: &Article) -> ConduitResult<()> {
        self.with(|s| {
            if s.articles.iter().any(|a| a.slug == article.slug) {
                return Err(ConduitError::Internal(format!(
                    "slug collision on {}",
                    article.slug
                )));
            }
            s.articles.push(article.clone());
            Ok(())
        })
    }

    async fn update_article(&self, article: &Article) -> ConduitResult<()> {
        self.with(|s| {
            if let Some(stored) = s.articles.iter_mut().find(|a| a.id == article.id) {
                stored.slug = article.slug.clone();
                stored.title = article.title.clone();
                stored.description = article.description.clone();
                stored.body = article.body.clone();
                stored.updated_at = article.updated_at;
            }
        });
        Ok(())
    }

    async fn find_article_by_slug(&self, slug: &str) -> ConduitResult<Option<Article>> {
        Ok(self.with(|s| {
            s.articles
                .iter()
                .find(|a| a.slug == slug)
                .map(|a| s.with_count(a))
        }))
    }

    async fn find_articles(&self, filter: &ArticleFilter) -> ConduitResult<Vec<Article>> {
        Ok(self.with(|s| {
            let favorited_by = filter.favorited_by.as_ref().map(|name| {
                s.users
                    .iter()
                    .find(|u| u.username.as_str() == name)
                    .map(|u| u.id)
            });

            let matching = s.articles.iter().filter(|a| {
                filter.tag.as_ref().is_none_or(|t| a.tags.contains(t))
                    && filter
                        .author
                        .as_ref()
                        .is_none_or(|name| a.author.username == *name)
                    && favorited_by.is_none_or(|user| {
                        user.is_some_and(|user| s.favorites.contains(&(user, a.id)))
                    })
            });

            s.newest_first(matching, &filter.page)
        }))
    }

    async fn find_feed(&self, follower: &UserId, page: &Page) -> ConduitResult<Vec<Article>> {
        Ok(self.with(|s| {
            let matching = s
                .articles
                .iter()
                .filter(|a| s.follows.contains(&(*follower, a.author.id)));
            s.newest_first(matching, page)
        }))
    }

    async fn delete_article(&self, id: &ArticleId) -> ConduitResult<()> {
        self.with(|s| {
            s.articles.retain(|a| a.id != *id);
            s.favorites.retain(|(_, a)| a != id);
            s.comments.retain(|c| c.article_id != *id);
        });
        Ok(())
    }

    async fn update_author_snapshot(&self, author: &Author) -> ConduitResult<u64> {
        self.with(|s| {
            if s.fail_author_snapshot {
                return Err(ConduitError::Internal("author snapshot write failed".to_string()));
            }
            let mut updated = 0;
            for article in s.articles.iter_mut().filter(|a| a.author.id == author.id) {
                article.author = author.clone();
                updated += 1;
            }
            Ok(updated)
        })
    }

    async fn create_favorite(&self, user: &UserId, article: &ArticleId) -> ConduitResult<()> {
        self.with(|s| s.favorites.insert((*user, *article)));
        Ok(())
    }

    async fn exists_favorite(&self, user: &UserId, article: &ArticleId) -> ConduitResult<bool> {
        Ok(self.with(|s| {
            s.calls.exists_favorite += 1;
            s.favorites.contains(&(*user, *article))
        }))
    }

    async fn find_favorited_among(
        &self,
        user: &UserId,
        candidates: &[ArticleId],
    ) -> ConduitResult<HashSet<ArticleId>> {
        Ok(self.with(|s| {
            s.calls.find_favorited_among += 1;
            candidates
                .iter()
                .filter(|c| s.favorites.contains(&(*user, **c)))
                .copied()
                .collect()
        }))
    }

    async fn delete_favorite(&self, user: &UserId, article: &ArticleId) -> ConduitResult<()> {
        self.with(|s| s.favorites.remove(&(*user, *article)));
        Ok(())
    }

    async fn find_tags(&self) -> ConduitResult<Vec<String>> {
        Ok(self.with(|s| {
            s.articles
                .iter()
                .flat_map(|a| a.tags.iter().cloned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        }))
    }
}

impl CommentRepository for MemoryRepository {
    async fn create_comment(&self, comment: &Comment) -> ConduitResult<()> {
        self.with(|s| s.comments.push(comment.clone()));
        Ok(())
    }

    async fn find_comments_by_article(&self, article: &ArticleId) -> ConduitResult<Vec<Comment>> {
        Ok(self.with(|s| {
            let mut found: Vec<Comment> = s
                .comments
                .iter()
                .filter(|c| c.article_id == *article)
                .cloned()
                .collect();
            found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            found
        }))
    }

    async fn delete_comment(&self, id: &CommentId, author: &UserId) -> ConduitResult<bool> {
        Ok(self.with(|s| {
            let before = s.comments.len();
            s.comments
                .retain(|c| !(c.id == *id && c.author.id == *author));
            s.comments.len() != before
        }))
    }
}
