pub mod article;
pub mod claims;
pub mod comment;
pub mod user;

pub use article::{Article, ArticleChanges, ArticleView, Author};
pub use claims::AccessClaims;
pub use comment::{Comment, CommentView};
pub use user::{Profile, User, UserChanges};
