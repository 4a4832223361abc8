//! Test harness over in-memory stores.
//!
//! Every store the orchestrator talks to is an in-memory implementation of
//! the same trait the Postgres store implements, so tests run without
//! containers and can stage ledger/domain divergence directly.

use std::time::Duration;

use axum::Router;
use moderation_core::config::ModerationSettings;
use moderation_core::domains::moderation::{HookRegistry, ModerationService};
use moderation_core::kernel::{MockNotifier, ServerDeps, TestDependencies};
use moderation_core::server::build_app;
use test_context::AsyncTestContext;

/// Short budgets so timeout tests finish quickly.
pub fn test_settings() -> ModerationSettings {
    ModerationSettings {
        domain_call_timeout: Duration::from_millis(200),
        notification_timeout: Duration::from_millis(200),
    }
}

/// Test harness that owns one set of stores.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let outcome = ctx.moderation.decide(event_id, Outcome::Approve).await.unwrap();
/// }
/// ```
pub struct TestHarness {
    /// Typed handles to the in-memory stores and the recording notifier.
    pub stores: TestDependencies,
    /// The trait-object container application code sees.
    pub deps: ServerDeps,
    pub moderation: ModerationService,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new()
    }

    async fn teardown(self) {
        // In-memory stores are dropped with the harness
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::from_stores(TestDependencies::new())
    }

    /// Harness whose notifier behaves as given.
    pub fn with_notifier(notifier: MockNotifier) -> Self {
        Self::from_stores(TestDependencies::new().with_notifier(notifier))
    }

    /// Harness using a custom hook registry.
    pub fn with_hooks(hooks: HookRegistry) -> Self {
        init_tracing();
        let stores = TestDependencies::new();
        let deps = stores.server_deps();
        let moderation = ModerationService::with_hooks(deps.clone(), hooks, test_settings());
        Self {
            stores,
            deps,
            moderation,
        }
    }

    /// Harness whose container is adjusted after the in-memory stores are
    /// wired, e.g. to put a misbehaving store in front of one of them.
    pub fn with_deps(adjust: impl FnOnce(&TestDependencies, &mut ServerDeps)) -> Self {
        init_tracing();
        let stores = TestDependencies::new();
        let mut deps = stores.server_deps();
        adjust(&stores, &mut deps);
        let moderation = ModerationService::new(deps.clone(), test_settings());
        Self {
            stores,
            deps,
            moderation,
        }
    }

    fn from_stores(stores: TestDependencies) -> Self {
        init_tracing();
        let deps = stores.server_deps();
        let moderation = ModerationService::new(deps.clone(), test_settings());
        Self {
            stores,
            deps,
            moderation,
        }
    }

    /// The HTTP application over this harness's stores.
    pub fn app(&self) -> Router {
        build_app(self.deps.clone(), test_settings())
    }
}

// Run tests with: RUST_LOG=debug cargo test -- --nocapture
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
