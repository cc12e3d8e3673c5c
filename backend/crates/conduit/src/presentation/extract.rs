//! Request Extractors
//!
//! Body, query and path extractors whose rejections become
//! `ConduitError::Validation`, plus the caller-identity extractors.

use std::convert::Infallible;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use kernel::id::UserId;

use crate::error::ConduitError;

/// JSON body extractor rejecting with a 400 envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ConduitError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor rejecting with a 400 envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ConduitError))]
pub struct ApiQuery<T>(pub T);

/// Path extractor rejecting with a 400 envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ConduitError))]
pub struct ApiPath<T>(pub T);

impl From<JsonRejection> for ConduitError {
    fn from(rejection: JsonRejection) -> Self {
        ConduitError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ConduitError {
    fn from(rejection: QueryRejection) -> Self {
        ConduitError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ConduitError {
    fn from(rejection: PathRejection) -> Self {
        ConduitError::Validation(rejection.body_text())
    }
}

/// Caller resolved from a verified access token
///
/// Inserted into request extensions by
/// [`resolve_identity`](crate::presentation::middleware::resolve_identity).
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: UserId,
    /// The token as presented, echoed back by `GET /user`
    pub token: String,
}

/// Requires an authenticated caller (401 otherwise)
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ConduitError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or(ConduitError::AuthenticationRequired)
    }
}

/// Authenticated caller if any
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<Identity>);

impl MaybeAuthUser {
    pub fn user_id(&self) -> Option<&UserId> {
        self.0.as_ref().map(|identity| &identity.user_id)
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(parts.extensions.get::<Identity>().cloned()))
    }
}

/// Requires an anonymous caller (400 otherwise)
#[derive(Debug, Clone, Copy)]
pub struct Anonymous;

impl<S> FromRequestParts<S> for Anonymous
where
    S: Send + Sync,
{
    type Rejection = ConduitError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if parts.extensions.get::<Identity>().is_some() {
            return Err(ConduitError::AuthenticationNotAllowed);
        }
        Ok(Anonymous)
    }
}
