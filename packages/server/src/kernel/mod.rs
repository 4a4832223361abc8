//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod mail_relay;
pub mod test_dependencies;
pub mod traits;

pub use deps::{ServerDeps, StorePools};
pub use mail_relay::{LoggingNotifier, MailRelayClient};
pub use test_dependencies::{MockNotifier, SentMail, TestDependencies};
pub use traits::*;
