// Moderation Workflow Engine - Core
//
// Every action that needs administrator sign-off (registrations, discussion
// postings, citations, private conversation requests) is recorded in an event
// ledger and decided exactly once. Decisions are mirrored into the domain
// stores that own the affected entities.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
