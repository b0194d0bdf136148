//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They:
//! - implement the visibility and authorship rules
//! - validate input
//! - map repository failures into per-service error enums

pub mod category;
pub mod comment;
pub mod location;
pub mod password;
pub mod post;
pub mod user;

pub use category::{CategoryService, CategoryServiceError};
pub use comment::{CommentAction, CommentService, CommentServiceError};
pub use location::{LocationService, LocationServiceError};
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
