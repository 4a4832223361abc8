//! Server dependencies for moderation actions (using traits for testability)
//!
//! Every domain store is reached through its trait object, so each one can
//! live in its own database and tests can swap in in-memory stores.

use sqlx::PgPool;
use std::sync::Arc;

use crate::common::auth::HasAuthContext;
use crate::domains::auth::JwtService;
use crate::domains::conversations::{ConversationStore, PostgresConversationStore};
use crate::domains::events::{EventLedger, PostgresEventLedger};
use crate::domains::groups::{GroupMembership, PostgresGroupMembership};
use crate::domains::postings::{PostgresPostingStore, PostingStore};
use crate::domains::users::{PostgresUserDirectory, UserDirectory};
use crate::kernel::BaseNotifier;

/// Connection pools for the independently owned stores.
#[derive(Clone)]
pub struct StorePools {
    pub events: PgPool,
    pub users: PgPool,
    pub postings: PgPool,
}

#[derive(Clone)]
pub struct ServerDeps {
    pub events: Arc<dyn EventLedger>,
    pub users: Arc<dyn UserDirectory>,
    pub groups: Arc<dyn GroupMembership>,
    pub postings: Arc<dyn PostingStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub notifier: Arc<dyn BaseNotifier>,
    /// JWT service for token creation
    pub jwt_service: Arc<JwtService>,
    pub admin_identifiers: Vec<String>,
}

impl ServerDeps {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        events: Arc<dyn EventLedger>,
        users: Arc<dyn UserDirectory>,
        groups: Arc<dyn GroupMembership>,
        postings: Arc<dyn PostingStore>,
        conversations: Arc<dyn ConversationStore>,
        notifier: Arc<dyn BaseNotifier>,
        jwt_service: Arc<JwtService>,
        admin_identifiers: Vec<String>,
    ) -> Self {
        Self {
            events,
            users,
            groups,
            postings,
            conversations,
            notifier,
            jwt_service,
            admin_identifiers,
        }
    }

    /// Postgres-backed stores. Groups live with users, conversations with postings.
    pub fn postgres(
        pools: StorePools,
        notifier: Arc<dyn BaseNotifier>,
        jwt_service: Arc<JwtService>,
        admin_identifiers: Vec<String>,
    ) -> Self {
        Self::new(
            Arc::new(PostgresEventLedger::new(pools.events)),
            Arc::new(PostgresUserDirectory::new(pools.users.clone())),
            Arc::new(PostgresGroupMembership::new(pools.users)),
            Arc::new(PostgresPostingStore::new(pools.postings.clone())),
            Arc::new(PostgresConversationStore::new(pools.postings)),
            notifier,
            jwt_service,
            admin_identifiers,
        )
    }
}

/// Implement HasAuthContext for ServerDeps to enable authorization checks
impl HasAuthContext for ServerDeps {
    fn admin_identifiers(&self) -> &[String] {
        &self.admin_identifiers
    }
}
