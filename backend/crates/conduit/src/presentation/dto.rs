//! API DTOs (Data Transfer Objects)
//!
//! Every payload is wrapped in a single named envelope (`user`, `article`,
//! ...). Request fields the API requires are still `Option` so that a missing
//! field is reported as a validation error naming it.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::application::{AuthenticatedUser, CreateArticleInput, LoginInput, RegisterInput, UpdateUserInput};
use crate::domain::entity::{ArticleChanges, ArticleView, Author, CommentView, Profile};
use crate::domain::repository::{ArticleFilter, DEFAULT_PAGE_LIMIT, Page};
use crate::error::{ConduitError, ConduitResult};

/// RFC 3339, UTC, millisecond precision
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn required(value: Option<String>, field: &str) -> ConduitResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConduitError::Validation(format!("{field} can't be blank"))),
    }
}

/// A field that may be omitted but must not be blank when given
fn not_blank(value: Option<String>, field: &str) -> ConduitResult<Option<String>> {
    value.map(|v| required(Some(v), field)).transpose()
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub user: RegisterUser,
}

#[derive(Debug, Deserialize)]
pub struct RegisterUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl TryFrom<RegisterUser> for RegisterInput {
    type Error = ConduitError;

    fn try_from(user: RegisterUser) -> ConduitResult<Self> {
        Ok(RegisterInput {
            email: required(user.email, "email")?,
            username: required(user.username, "username")?,
            password: required(user.password, "password")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user: LoginUser,
}

#[derive(Debug, Deserialize)]
pub struct LoginUser {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl TryFrom<LoginUser> for LoginInput {
    type Error = ConduitError;

    fn try_from(user: LoginUser) -> ConduitResult<Self> {
        Ok(LoginInput {
            email: required(user.email, "email")?,
            password: required(user.password, "password")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub user: UpdateUser,
}

/// Omitted fields are left unchanged; `image: ""` clears the image
#[derive(Debug, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

impl TryFrom<UpdateUser> for UpdateUserInput {
    type Error = ConduitError;

    fn try_from(user: UpdateUser) -> ConduitResult<Self> {
        Ok(UpdateUserInput {
            email: not_blank(user.email, "email")?,
            username: not_blank(user.username, "username")?,
            password: not_blank(user.password, "password")?,
            bio: user.bio,
            image: user.image,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserBody,
}

#[derive(Debug, Serialize)]
pub struct UserBody {
    pub email: String,
    pub token: String,
    pub username: String,
    pub bio: String,
    pub image: Option<String>,
}

impl From<AuthenticatedUser> for UserResponse {
    fn from(AuthenticatedUser { user, token }: AuthenticatedUser) -> Self {
        Self {
            user: UserBody {
                email: user.email.as_str().to_string(),
                token,
                username: user.username.as_str().to_string(),
                bio: user.bio,
                image: user.image,
            },
        }
    }
}

// ============================================================================
// Profiles
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: ProfileBody,
}

#[derive(Debug, Serialize)]
pub struct ProfileBody {
    pub username: String,
    pub bio: String,
    pub image: Option<String>,
    pub following: bool,
}

impl ProfileBody {
    fn of_author(author: Author, following: bool) -> Self {
        Self {
            username: author.username,
            bio: author.bio,
            image: author.image,
            following,
        }
    }
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            profile: ProfileBody {
                username: profile.username,
                bio: profile.bio,
                image: profile.image,
                following: profile.following,
            },
        }
    }
}

// ============================================================================
// Articles
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    pub article: CreateArticle,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub tag_list: Option<Vec<String>>,
}

impl TryFrom<CreateArticle> for CreateArticleInput {
    type Error = ConduitError;

    fn try_from(article: CreateArticle) -> ConduitResult<Self> {
        Ok(CreateArticleInput {
            title: required(article.title, "title")?,
            description: required(article.description, "description")?,
            body: required(article.body, "body")?,
            tags: article.tag_list.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateArticleRequest {
    pub article: UpdateArticle,
}

#[derive(Debug, Deserialize)]
pub struct UpdateArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
}

impl From<UpdateArticle> for ArticleChanges {
    fn from(article: UpdateArticle) -> Self {
        ArticleChanges {
            title: article.title,
            description: article.description,
            body: article.body,
        }
    }
}

/// `GET /articles` query string
#[derive(Debug, Default, Deserialize)]
pub struct ListArticlesQuery {
    pub tag: Option<String>,
    pub author: Option<String>,
    pub favorited: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TryFrom<ListArticlesQuery> for ArticleFilter {
    type Error = ConduitError;

    fn try_from(query: ListArticlesQuery) -> ConduitResult<Self> {
        Ok(ArticleFilter {
            tag: query.tag,
            author: query.author,
            favorited_by: query.favorited,
            page: page(query.limit, query.offset)?,
        })
    }
}

/// `GET /articles/feed` query string
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TryFrom<FeedQuery> for Page {
    type Error = ConduitError;

    fn try_from(query: FeedQuery) -> ConduitResult<Self> {
        page(query.limit, query.offset)
    }
}

fn page(limit: Option<i64>, offset: Option<i64>) -> ConduitResult<Page> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = offset.unwrap_or(0);
    if limit < 0 || offset < 0 {
        return Err(ConduitError::Validation(
            "limit and offset must not be negative".to_string(),
        ));
    }
    Ok(Page { limit, offset })
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub article: ArticleBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleBody {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub favorited: bool,
    pub favorites_count: i64,
    pub author: ProfileBody,
}

impl From<ArticleView> for ArticleBody {
    fn from(view: ArticleView) -> Self {
        let article = view.article;
        Self {
            slug: article.slug,
            title: article.title,
            description: article.description,
            body: article.body,
            tag_list: article.tags,
            created_at: timestamp(article.created_at),
            updated_at: timestamp(article.updated_at),
            favorited: view.favorited,
            favorites_count: article.favorites_count,
            author: ProfileBody::of_author(article.author, view.following),
        }
    }
}

impl From<ArticleView> for ArticleResponse {
    fn from(view: ArticleView) -> Self {
        Self {
            article: view.into(),
        }
    }
}

/// `articlesCount` is the number of articles in this page
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleArticlesResponse {
    pub articles: Vec<ArticleBody>,
    pub articles_count: usize,
}

impl From<Vec<ArticleView>> for MultipleArticlesResponse {
    fn from(views: Vec<ArticleView>) -> Self {
        let articles: Vec<ArticleBody> = views.into_iter().map(ArticleBody::from).collect();
        Self {
            articles_count: articles.len(),
            articles,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

// ============================================================================
// Comments
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub comment: AddComment,
}

#[derive(Debug, Deserialize)]
pub struct AddComment {
    pub body: Option<String>,
}

impl AddComment {
    pub fn into_body(self) -> ConduitResult<String> {
        required(self.body, "body")
    }
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub comment: CommentBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentBody {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub body: String,
    pub author: ProfileBody,
}

impl From<CommentView> for CommentBody {
    fn from(view: CommentView) -> Self {
        let comment = view.comment;
        Self {
            id: comment.id.to_string(),
            created_at: timestamp(comment.created_at),
            updated_at: timestamp(comment.updated_at),
            body: comment.body,
            author: ProfileBody::of_author(comment.author, view.following),
        }
    }
}

impl From<CommentView> for CommentResponse {
    fn from(view: CommentView) -> Self {
        Self {
            comment: view.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MultipleCommentsResponse {
    pub comments: Vec<CommentBody>,
}

impl From<Vec<CommentView>> for MultipleCommentsResponse {
    fn from(views: Vec<CommentView>) -> Self {
        Self {
            comments: views.into_iter().map(CommentBody::from).collect(),
        }
    }
}
