// Common types and utilities shared across the application

pub mod auth;
pub mod entity_ids;
pub mod id;
pub mod pagination;
pub mod types;

pub use auth::{Actor, AdminCapability, AuthError, HasAuthContext};
pub use entity_ids::*;
pub use id::Id;
pub use pagination::{Cursor, Page, PageRequest, ValidatedPage};
pub use types::*;
