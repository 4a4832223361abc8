pub mod actions;
pub mod memory;
pub mod models;
pub mod store;

pub use memory::InMemoryEventLedger;
pub use models::*;
pub use store::{EventFilter, EventLedger, PostgresEventLedger};
