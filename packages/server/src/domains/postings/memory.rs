use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::models::{Posting, PostingStatus, RemovedPosting};
use super::store::PostingStore;
use crate::common::{EventId, PostingId, StatusChange};

#[derive(Default)]
pub struct InMemoryPostingStore {
    postings: RwLock<HashMap<PostingId, Posting>>,
}

impl InMemoryPostingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a posting verbatim, bypassing the store's transitions.
    pub async fn put(&self, posting: Posting) {
        self.postings.write().await.insert(posting.id, posting);
    }
}

#[async_trait]
impl PostingStore for InMemoryPostingStore {
    async fn insert(&self, posting: &Posting) -> Result<Posting> {
        let mut postings = self.postings.write().await;
        if postings.contains_key(&posting.id) {
            bail!("Posting {} already exists", posting.id);
        }
        postings.insert(posting.id, posting.clone());
        Ok(posting.clone())
    }

    async fn find_by_id(&self, id: PostingId) -> Result<Option<Posting>> {
        Ok(self.postings.read().await.get(&id).cloned())
    }

    async fn find_by_event(&self, event_id: EventId) -> Result<Option<Posting>> {
        Ok(self
            .postings
            .read()
            .await
            .values()
            .find(|p| p.event_id == Some(event_id))
            .cloned())
    }

    async fn set_posting_status(&self, id: PostingId, status: PostingStatus) -> Result<StatusChange> {
        let mut postings = self.postings.write().await;
        Ok(match postings.get_mut(&id) {
            None => StatusChange::Missing,
            Some(posting) if posting.status == status => StatusChange::Unchanged,
            Some(posting) => {
                posting.status = status;
                StatusChange::Applied
            }
        })
    }

    async fn transition_posting(
        &self,
        id: PostingId,
        from: PostingStatus,
        to: PostingStatus,
    ) -> Result<StatusChange> {
        let mut postings = self.postings.write().await;
        Ok(match postings.get_mut(&id) {
            None => StatusChange::Missing,
            Some(posting) if posting.status != from => StatusChange::Unchanged,
            Some(posting) => {
                posting.status = to;
                StatusChange::Applied
            }
        })
    }

    async fn delete_posting(&self, id: PostingId) -> Result<Option<RemovedPosting>> {
        Ok(self
            .postings
            .write()
            .await
            .remove(&id)
            .map(RemovedPosting::from))
    }

    async fn flag_posting(&self, id: PostingId, event_id: EventId) -> Result<StatusChange> {
        let mut postings = self.postings.write().await;
        Ok(match postings.get_mut(&id) {
            None => StatusChange::Missing,
            Some(posting) if posting.cite_event_id.is_some() => StatusChange::Unchanged,
            Some(posting) => {
                posting.cite_event_id = Some(event_id);
                StatusChange::Applied
            }
        })
    }

    async fn clear_flag(&self, id: PostingId, event_id: EventId) -> Result<StatusChange> {
        let mut postings = self.postings.write().await;
        Ok(match postings.get_mut(&id) {
            None => StatusChange::Missing,
            Some(posting) if posting.cite_event_id != Some(event_id) => StatusChange::Unchanged,
            Some(posting) => {
                posting.cite_event_id = None;
                StatusChange::Applied
            }
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::UserId;
    use crate::domains::postings::PostingKind;
    use chrono::Utc;

    fn discussion(status: PostingStatus) -> Posting {
        Posting {
            id: PostingId::new(),
            event_id: Some(EventId::new()),
            author_id: UserId::new(),
            kind: PostingKind::Discussion,
            topic: None,
            message: "Visiting hours".to_string(),
            group_id: "PPA".to_string(),
            status,
            cite_event_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_transition_only_from_expected_status() {
        let store = InMemoryPostingStore::new();
        let posting = store.insert(&discussion(PostingStatus::Pending)).await.unwrap();

        let published = store
            .transition_posting(posting.id, PostingStatus::Pending, PostingStatus::Open)
            .await
            .unwrap();
        assert_eq!(published, StatusChange::Applied);

        let repeated = store
            .transition_posting(posting.id, PostingStatus::Pending, PostingStatus::Open)
            .await
            .unwrap();
        assert_eq!(repeated, StatusChange::Unchanged);
    }

    #[tokio::test]
    async fn test_stale_publish_does_not_reopen_terminated_discussion() {
        let store = InMemoryPostingStore::new();
        let posting = store.insert(&discussion(PostingStatus::Pending)).await.unwrap();
        // The author closed it after the hook read it as pending.
        store.put(Posting { status: PostingStatus::Terminated, ..posting.clone() }).await;

        let change = store
            .transition_posting(posting.id, PostingStatus::Pending, PostingStatus::Open)
            .await
            .unwrap();

        assert_eq!(change, StatusChange::Unchanged);
        let stored = store.find_by_id(posting.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PostingStatus::Terminated);
    }

    #[tokio::test]
    async fn test_transition_of_unknown_posting_is_missing() {
        let store = InMemoryPostingStore::new();

        let change = store
            .transition_posting(PostingId::new(), PostingStatus::Open, PostingStatus::Terminated)
            .await
            .unwrap();

        assert_eq!(change, StatusChange::Missing);
    }
}
