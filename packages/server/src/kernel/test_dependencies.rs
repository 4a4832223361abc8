// TestDependencies - in-memory stores and a recording notifier for tests
//
// Keeps typed handles to every store so tests can inspect and stage state
// behind the trait objects the orchestrator sees.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{BaseNotifier, ServerDeps};
use crate::domains::auth::JwtService;
use crate::domains::conversations::InMemoryConversationStore;
use crate::domains::events::InMemoryEventLedger;
use crate::domains::groups::InMemoryGroupMembership;
use crate::domains::postings::InMemoryPostingStore;
use crate::domains::users::InMemoryUserDirectory;

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_JWT_ISSUER: &str = "moderation-server";

// =============================================================================
// Mock Notifier
// =============================================================================

/// A message captured by [`MockNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub struct MockNotifier {
    sent: Arc<Mutex<Vec<SentMail>>>,
    fail: bool,
    delay: Option<Duration>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: false,
            delay: None,
        }
    }

    /// Every send records the attempt and then errors.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Every send sleeps before completing.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<SentMail> {
        self.sent()
            .into_iter()
            .filter(|mail| mail.to == address)
            .collect()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseNotifier for MockNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });

        if self.fail {
            anyhow::bail!("Mock notifier configured to fail");
        }
        Ok(())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

pub struct TestDependencies {
    pub events: Arc<InMemoryEventLedger>,
    pub users: Arc<InMemoryUserDirectory>,
    pub groups: Arc<InMemoryGroupMembership>,
    pub postings: Arc<InMemoryPostingStore>,
    pub conversations: Arc<InMemoryConversationStore>,
    pub notifier: Arc<MockNotifier>,
    pub admin_identifiers: Vec<String>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            events: Arc::new(InMemoryEventLedger::new()),
            users: Arc::new(InMemoryUserDirectory::new()),
            groups: Arc::new(InMemoryGroupMembership::new()),
            postings: Arc::new(InMemoryPostingStore::new()),
            conversations: Arc::new(InMemoryConversationStore::new()),
            notifier: Arc::new(MockNotifier::new()),
            admin_identifiers: Vec::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: MockNotifier) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    pub fn with_admin_identifiers(mut self, identifiers: Vec<String>) -> Self {
        self.admin_identifiers = identifiers;
        self
    }

    /// Build the container the application code consumes.
    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.events.clone(),
            self.users.clone(),
            self.groups.clone(),
            self.postings.clone(),
            self.conversations.clone(),
            self.notifier.clone(),
            Arc::new(JwtService::new(TEST_JWT_SECRET, TEST_JWT_ISSUER.to_string())),
            self.admin_identifiers.clone(),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
