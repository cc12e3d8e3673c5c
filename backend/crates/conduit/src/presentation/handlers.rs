//! HTTP Handlers
//!
//! Handlers are generic over the transaction-scoped repository `R`, taken
//! from the request extension that the transaction middleware inserts.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use platform::token::TokenSigner;
use uuid::Uuid;

use crate::application::config::ConduitConfig;
use crate::application::{ArticleService, AuthService, CommentService, ProfileService};
use crate::domain::entity::ArticleChanges;
use crate::domain::repository::{ArticleFilter, ConduitRepository, Page};
use crate::error::ConduitResult;
use crate::presentation::dto::{
    AddCommentRequest, ArticleResponse, CommentResponse, CreateArticleRequest, FeedQuery,
    ListArticlesQuery, LoginRequest, MultipleArticlesResponse, MultipleCommentsResponse,
    ProfileResponse, RegisterRequest, TagsResponse, UpdateArticleRequest, UpdateUserRequest,
    UserResponse,
};
use crate::presentation::extract::{Anonymous, ApiJson, ApiPath, ApiQuery, AuthUser, MaybeAuthUser};

/// Shared state for conduit handlers
#[derive(Clone)]
pub struct ConduitAppState {
    pub config: Arc<ConduitConfig>,
    pub signer: Arc<TokenSigner>,
}

fn auth_service<R: ConduitRepository>(state: &ConduitAppState, repo: Arc<R>) -> AuthService<R, R> {
    AuthService::new(repo.clone(), repo, state.config.clone(), state.signer.clone())
}

fn article_service<R: ConduitRepository>(repo: Arc<R>) -> ArticleService<R, R> {
    ArticleService::new(repo.clone(), repo)
}

fn comment_service<R: ConduitRepository>(repo: Arc<R>) -> CommentService<R, R, R> {
    CommentService::new(repo.clone(), repo.clone(), repo)
}

// ============================================================================
// Users
// ============================================================================

/// POST /api/users
pub async fn register<R: ConduitRepository>(
    State(state): State<ConduitAppState>,
    Extension(repo): Extension<R>,
    _: Anonymous,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ConduitResult<(StatusCode, Json<UserResponse>)> {
    let output = auth_service(&state, Arc::new(repo))
        .register(req.user.try_into()?)
        .await?;

    Ok((StatusCode::CREATED, Json(output.into())))
}

/// POST /api/users/login
pub async fn login<R: ConduitRepository>(
    State(state): State<ConduitAppState>,
    Extension(repo): Extension<R>,
    _: Anonymous,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ConduitResult<Json<UserResponse>> {
    let output = auth_service(&state, Arc::new(repo))
        .login(req.user.try_into()?)
        .await?;

    Ok(Json(output.into()))
}

/// GET /api/user
pub async fn current_user<R: ConduitRepository>(
    State(state): State<ConduitAppState>,
    Extension(repo): Extension<R>,
    AuthUser(identity): AuthUser,
) -> ConduitResult<Json<UserResponse>> {
    let output = auth_service(&state, Arc::new(repo))
        .current(&identity.user_id, identity.token)
        .await?;

    Ok(Json(output.into()))
}

/// PUT /api/user
pub async fn update_user<R: ConduitRepository>(
    State(state): State<ConduitAppState>,
    Extension(repo): Extension<R>,
    AuthUser(identity): AuthUser,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ConduitResult<Json<UserResponse>> {
    let output = auth_service(&state, Arc::new(repo))
        .update(&identity.user_id, req.user.try_into()?)
        .await?;

    Ok(Json(output.into()))
}

// ============================================================================
// Profiles
// ============================================================================

/// GET /api/profiles/{username}
pub async fn get_profile<R: ConduitRepository>(
    Extension(repo): Extension<R>,
    viewer: MaybeAuthUser,
    ApiPath(username): ApiPath<String>,
) -> ConduitResult<Json<ProfileResponse>> {
    let profile = ProfileService::new(Arc::new(repo))
        .find(viewer.user_id(), &username)
        .await?;

    Ok(Json(profile.into()))
}

/// POST /api/profiles/{username}/follow
pub async fn follow_user<R: ConduitRepository>(
    Extension(repo): Extension<R>,
    AuthUser(identity): AuthUser,
    ApiPath(username): ApiPath<String>,
) -> ConduitResult<Json<ProfileResponse>> {
    let profile = ProfileService::new(Arc::new(repo))
        .follow(&identity.user_id, &username)
        .await?;

    Ok(Json(profile.into()))
}

/// DELETE /api/profiles/{username}/follow
pub async fn unfollow_user<R: ConduitRepository>(
    Extension(repo): Extension<R>,
    AuthUser(identity): AuthUser,
    ApiPath(username): ApiPath<String>,
) -> ConduitResult<Json<ProfileResponse>> {
    let profile = ProfileService::new(Arc::new(repo))
        .unfollow(&identity.user_id, &username)
        .await?;

    Ok(Json(profile.into()))
}

// ============================================================================
// Articles
// ============================================================================

/// GET /api/articles
pub async fn list_articles<R: ConduitRepository>(
    Extension(repo): Extension<R>,
    viewer: MaybeAuthUser,
    ApiQuery(query): ApiQuery<ListArticlesQuery>,
) -> ConduitResult<Json<MultipleArticlesResponse>> {
    let filter = ArticleFilter::try_from(query)?;
    let views = article_service(Arc::new(repo))
        .list(viewer.user_id(), &filter)
        .await?;

    Ok(Json(views.into()))
}

/// GET /api/articles/feed
pub async fn feed_articles<R: ConduitRepository>(
    Extension(repo): Extension<R>,
    AuthUser(identity): AuthUser,
    ApiQuery(query): ApiQuery<FeedQuery>,
) -> ConduitResult<Json<MultipleArticlesResponse>> {
    let page = Page::try_from(query)?;
    let views = article_service(Arc::new(repo))
        .feed(&identity.user_id, &page)
        .await?;

    Ok(Json(views.into()))
}

/// POST /api/articles
pub async fn create_article<R: ConduitRepository>(
    Extension(repo): Extension<R>,
    AuthUser(identity): AuthUser,
    ApiJson(req): ApiJson<CreateArticleRequest>,
) -> ConduitResult<(StatusCode, Json<ArticleResponse>)> {
    let view = article_service(Arc::new(repo))
        .create(&identity.user_id, req.article.try_into()?)
        .await?;

    Ok((StatusCode::CREATED, Json(view.into())))
}

/// GET /api/articles/{slug}
pub async fn get_article<R: ConduitRepository>(
    Extension(repo): Extension<R>,
    viewer: MaybeAuthUser,
    ApiPath(slug): ApiPath<String>,
) -> ConduitResult<Json<ArticleResponse>> {
    let view = article_service(Arc::new(repo))
        .find(viewer.user_id(), &slug)
        .await?;

    Ok(Json(view.into()))
}

/// PUT /api/articles/{slug}
pub async fn update_article<R: ConduitRepository>(
    Extension(repo): Extension<R>,
    AuthUser(identity): AuthUser,
    ApiPath(slug): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateArticleRequest>,
) -> ConduitResult<Json<ArticleResponse>> {
    let changes = ArticleChanges::from(req.article);
    let view = article_service(Arc::new(repo))
        .update(&identity.user_id, &slug, changes)
        .await?;

    Ok(Json(view.into()))
}

/// DELETE /api/articles/{slug}
pub async fn delete_article<R: ConduitRepository>(
    Extension(repo): Extension<R>,
    AuthUser(identity): AuthUser,
    ApiPath(slug): ApiPath<String>,
) -> ConduitResult<StatusCode> {
    article_service(Arc::new(repo))
        .delete(&identity.user_id, &slug)
        .await?;

    Ok(StatusCode::OK)
}

/// POST /api/articles/{slug}/favorite
pub async fn favorite_article<R: ConduitRepository>(
    Extension(repo): Extension<R>,
    AuthUser(identity): AuthUser,
    ApiPath(slug): ApiPath<String>,
) -> ConduitResult<Json<ArticleResponse>> {
    let view = article_service(Arc::new(repo))
        .favorite(&identity.user_id, &slug)
        .await?;

    Ok(Json(view.into()))
}

/// DELETE /api/articles/{slug}/favorite
pub async fn unfavorite_article<R: ConduitRepository>(
    Extension(repo): Extension<R>,
    AuthUser(identity): AuthUser,
    ApiPath(slug): ApiPath<String>,
) -> ConduitResult<Json<ArticleResponse>> {
    let view = article_service(Arc::new(repo))
        .unfavorite(&identity.user_id, &slug)
        .await?;

    Ok(Json(view.into()))
}

/// GET /api/tags
pub async fn list_tags<R: ConduitRepository>(
    Extension(repo): Extension<R>,
) -> ConduitResult<Json<TagsResponse>> {
    let tags = article_service(Arc::new(repo)).tags().await?;

    Ok(Json(TagsResponse { tags }))
}

// ============================================================================
// Comments
// ============================================================================

/// POST /api/articles/{slug}/comments
pub async fn add_comment<R: ConduitRepository>(
    Extension(repo): Extension<R>,
    AuthUser(identity): AuthUser,
    ApiPath(slug): ApiPath<String>,
    ApiJson(req): ApiJson<AddCommentRequest>,
) -> ConduitResult<(StatusCode, Json<CommentResponse>)> {
    let body = req.comment.into_body()?;
    let view = comment_service(Arc::new(repo))
        .create(&identity.user_id, &slug, body)
        .await?;

    Ok((StatusCode::CREATED, Json(view.into())))
}

/// GET /api/articles/{slug}/comments
pub async fn list_comments<R: ConduitRepository>(
    Extension(repo): Extension<R>,
    viewer: MaybeAuthUser,
    ApiPath(slug): ApiPath<String>,
) -> ConduitResult<Json<MultipleCommentsResponse>> {
    let views = comment_service(Arc::new(repo))
        .list(viewer.user_id(), &slug)
        .await?;

    Ok(Json(views.into()))
}

/// DELETE /api/articles/{slug}/comments/{id}
///
/// The slug is not consulted; ownership of the comment is what matters.
pub async fn delete_comment<R: ConduitRepository>(
    Extension(repo): Extension<R>,
    AuthUser(identity): AuthUser,
    ApiPath((_slug, id)): ApiPath<(String, Uuid)>,
) -> ConduitResult<StatusCode> {
    comment_service(Arc::new(repo))
        .delete(&identity.user_id, &id.into())
        .await?;

    Ok(StatusCode::OK)
}
