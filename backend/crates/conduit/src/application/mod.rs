//! Application Layer
//!
//! Services composing repository calls under the business rules.

pub mod article;
pub mod auth;
pub mod comment;
pub mod config;
pub mod profile;

// Re-exports
pub use article::{ArticleService, CreateArticleInput};
pub use auth::{AuthService, AuthenticatedUser, LoginInput, RegisterInput, UpdateUserInput};
pub use comment::CommentService;
pub use config::ConduitConfig;
pub use profile::ProfileService;
