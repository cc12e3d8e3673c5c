//! Presentation Layer
//!
//! HTTP handlers, DTOs, extractors, router, and middleware.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;


pub use extract::{Anonymous, AuthUser, Identity, MaybeAuthUser};
pub use handlers::ConduitAppState;
pub use middleware::{resolve_identity, transaction};
pub use router::{conduit_router, conduit_router_generic};
