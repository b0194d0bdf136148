//! Data models
//!
//! Data structures used throughout Blogicum:
//! - Database entities (Post, Category, Location, Comment, User, Session)
//! - Display projections with joined data (PostWithMeta, CommentWithMeta)
//! - Query criteria and pagination

mod category;
mod comment;
mod location;
mod pagination;
mod post;
mod session;
mod user;

pub use category::{is_valid_slug, Category, CategoryInput};
pub use comment::{Comment, CommentWithMeta};
pub use location::{Location, LocationInput};
pub use pagination::{Page, PageRequest, DEFAULT_PAGE_SIZE};
pub use post::{Post, PostFilter, PostInlineUpdate, PostInput, PostWithMeta, Visibility};
pub use session::Session;
pub use user::{gravatar_url, CreateUserInput, UpdateProfileInput, User};
