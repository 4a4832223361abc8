pub mod models;
pub mod store;

pub use models::CareGroup;
pub use store::{GroupMembership, InMemoryGroupMembership, PostgresGroupMembership};
