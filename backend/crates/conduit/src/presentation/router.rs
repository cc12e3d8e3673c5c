//! Conduit Router

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;

use crate::application::config::ConduitConfig;
use crate::domain::repository::TransactionManager;
use crate::infra::postgres::PgStore;
use crate::presentation::handlers::{self, ConduitAppState};
use crate::presentation::middleware::{resolve_identity, transaction};

/// Create the Conduit router backed by PostgreSQL
///
/// Paths are relative; the binary nests the router under `/api`.
pub fn conduit_router(store: PgStore, config: ConduitConfig) -> Router {
    conduit_router_generic(store, config)
}

/// Create a Conduit router for any transaction manager implementation
pub fn conduit_router_generic<T>(store: T, config: ConduitConfig) -> Router
where
    T: TransactionManager,
{
    let signer = Arc::new(config.token_signer());
    let state = ConduitAppState {
        config: Arc::new(config),
        signer: signer.clone(),
    };

    Router::new()
        .route("/users", post(handlers::register::<T::Scope>))
        .route("/users/login", post(handlers::login::<T::Scope>))
        .route(
            "/user",
            get(handlers::current_user::<T::Scope>).put(handlers::update_user::<T::Scope>),
        )
        .route("/profiles/{username}", get(handlers::get_profile::<T::Scope>))
        .route(
            "/profiles/{username}/follow",
            post(handlers::follow_user::<T::Scope>).delete(handlers::unfollow_user::<T::Scope>),
        )
        .route(
            "/articles",
            get(handlers::list_articles::<T::Scope>).post(handlers::create_article::<T::Scope>),
        )
        .route("/articles/feed", get(handlers::feed_articles::<T::Scope>))
        .route(
            "/articles/{slug}",
            get(handlers::get_article::<T::Scope>)
                .put(handlers::update_article::<T::Scope>)
                .delete(handlers::delete_article::<T::Scope>),
        )
        .route(
            "/articles/{slug}/favorite",
            post(handlers::favorite_article::<T::Scope>)
                .delete(handlers::unfavorite_article::<T::Scope>),
        )
        .route(
            "/articles/{slug}/comments",
            get(handlers::list_comments::<T::Scope>).post(handlers::add_comment::<T::Scope>),
        )
        .route(
            "/articles/{slug}/comments/{id}",
            delete(handlers::delete_comment::<T::Scope>),
        )
        .route("/tags", get(handlers::list_tags::<T::Scope>))
        .layer(axum::middleware::from_fn_with_state(store, transaction::<T>))
        .layer(axum::middleware::from_fn_with_state(signer, resolve_identity))
        .with_state(state)
}
