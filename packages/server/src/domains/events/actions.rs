use tracing::{info, warn};

use super::models::{LedgerDecision, Outcome};
use crate::common::EventId;
use crate::kernel::ServerDeps;

/// Reject an event whose entity was never stored, so it leaves the review queue.
///
/// Only the ledger changes; there is no entity for a hook to update.
/// Pre-approved events cannot be withdrawn and show up in audits as missing
/// their target.
pub async fn withdraw(deps: &ServerDeps, event_id: EventId) {
    match deps.events.decide(event_id, Outcome::Reject).await {
        Ok(LedgerDecision::Decided(_)) => info!(%event_id, "Orphaned event withdrawn"),
        Ok(LedgerDecision::AlreadyDecided(event)) => warn!(
            %event_id,
            recorded = %event.status,
            "Orphaned event was already decided; left as is"
        ),
        Ok(LedgerDecision::NotFound) => warn!(%event_id, "Orphaned event not found in ledger"),
        Err(e) => warn!(%event_id, error = %e, "Could not withdraw orphaned event"),
    }
}
