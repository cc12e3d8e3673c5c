//! Conduit Middleware
//!
//! - [`resolve_identity`]: turns a valid `Authorization` header into an
//!   [`Identity`] extension
//! - [`transaction`]: opens the per-request transaction scope and closes it
//!   according to the response status

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use platform::token::{TokenSigner, parse_authorization};

use crate::domain::entity::AccessClaims;
use crate::domain::repository::TransactionManager;
use crate::presentation::extract::Identity;

/// Resolve the caller from the access token, if one is presented
///
/// An unusable token leaves the request anonymous. Routes that require
/// authentication then reject it with 401.
pub async fn resolve_identity(
    State(signer): State<Arc<TokenSigner>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization)
        .map(str::to_owned);

    if let Some(token) = token {
        match signer.verify::<AccessClaims>(&token) {
            Ok(claims) => {
                req.extensions_mut().insert(Identity {
                    user_id: claims.user_id(),
                    token,
                });
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unusable access token");
            }
        }
    }

    next.run(req).await
}

/// Run the request inside one transaction scope
///
/// The scope is handed to handlers as a request extension. It is committed
/// when the response status is 200 or 201 and rolled back otherwise. A scope
/// dropped by a panicking handler is rolled back by the store.
pub async fn transaction<T>(State(store): State<T>, mut req: Request, next: Next) -> Response
where
    T: TransactionManager,
{
    let scope = match store.begin().await {
        Ok(scope) => scope,
        Err(e) => return e.into_response(),
    };
    req.extensions_mut().insert(scope.clone());

    let response = next.run(req).await;

    if matches!(response.status(), StatusCode::OK | StatusCode::CREATED) {
        if let Err(e) = store.commit(scope).await {
            tracing::error!(error = %e, "Transaction commit failed");
            return e.into_response();
        }
    } else if let Err(e) = store.rollback(scope).await {
        tracing::warn!(error = %e, status = %response.status(), "Transaction rollback failed");
    }

    response
}
