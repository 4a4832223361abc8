//! Moderation workflow: decisions, domain hooks, review queues and
//! ledger/domain reconciliation.

pub mod errors;
pub mod hooks;
pub mod notifications;
pub mod outcome;
pub mod queries;
pub mod service;

pub use errors::{ModerationError, ModerationResult};
pub use hooks::{DomainHook, HookEffect, HookRegistry, MirrorState, Notification};
pub use outcome::*;
pub use queries::{review_queue, ReviewRow, ReviewSubject};
pub use service::ModerationService;
