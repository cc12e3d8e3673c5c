//! Conduit (RealWorld) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Services enforcing the business rules
//! - `infra/` - Database implementations
//! - `presentation/` - HTTP handlers, DTOs, extractors, router
//!
//! ## Features
//! - Registration and login with JWT access tokens
//! - Profiles with follow / unfollow
//! - Articles with tags, favorites, filtered listing and a personal feed
//! - Comments on articles
//!
//! ## Transactions
//! Every request runs inside one storage transaction opened by the
//! presentation layer. Services receive a transaction-scoped repository
//! and never begin or end transactions themselves.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


// Re-exports for convenience
pub use application::config::ConduitConfig;
pub use error::{ConduitError, ConduitResult};
pub use infra::postgres::{PgConduitRepository, PgStore};
pub use presentation::router::{conduit_router, conduit_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
