//! The async export queue: accepts requests, stamps them `pending`, and
//! backs `get_status`/`cancel` for every id it has ever seen until cleanup
//! evicts the terminal response.
//!
//! Owns its lock as the first in the documented hierarchy (manager -> queue
//! -> workers -> health -> metrics -> router); never acquires another
//! component's lock while holding it.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use driftwatch_model::{ExportRequest, ExportResponse, ExportStatus};
use tokio::sync::RwLock;

use crate::error::ExportError;

struct Entry {
    response: ExportResponse,
    enqueued_at: DateTime<Utc>,
}

pub struct Queue {
    pending: RwLock<VecDeque<ExportRequest>>,
    entries: RwLock<BTreeMap<String, Entry>>,
    capacity: usize,
}

impl Queue {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: RwLock::new(VecDeque::new()),
            entries: RwLock::new(BTreeMap::new()),
            capacity,
        }
    }

    /// Stamps `request` pending and enqueues it, failing fast if the queue
    /// is at capacity (spec.md §4.6 step 1).
    pub async fn enqueue(&self, request: ExportRequest) -> Result<String, ExportError> {
        let mut pending = self.pending.write().await;
        if pending.len() >= self.capacity {
            return Err(ExportError::QueueFull {
                capacity: self.capacity,
            });
        }
        let id = request.id.clone();
        self.entries.write().await.insert(
            id.clone(),
            Entry {
                response: ExportResponse::pending(id.clone()),
                enqueued_at: Utc::now(),
            },
        );
        pending.push_back(request);
        Ok(id)
    }

    /// Pops the next still-pending request. Requests canceled while pending
    /// are silently skipped rather than dispatched.
    pub async fn dequeue_next(&self) -> Option<ExportRequest> {
        let mut pending = self.pending.write().await;
        while let Some(request) = pending.pop_front() {
            let entries = self.entries.read().await;
            match entries.get(&request.id).map(|e| e.response.status) {
                Some(ExportStatus::Pending) => return Some(request),
                _ => continue,
            }
        }
        None
    }

    pub async fn mark_processing(&self, id: &str) -> Result<(), ExportError> {
        self.transition(id, ExportStatus::Processing, |_| {}).await
    }

    pub async fn complete(&self, id: &str, response: ExportResponse) -> Result<(), ExportError> {
        self.transition(id, response.status, move |entry| {
            entry.response = response.clone();
        })
        .await
    }

    /// Honored only while `Pending` (spec.md §4.6 "cancellation").
    pub async fn cancel(&self, id: &str) -> Result<(), ExportError> {
        self.transition(id, ExportStatus::Cancelled, |_| {}).await
    }

    pub async fn status(&self, id: &str) -> Option<ExportResponse> {
        self.entries.read().await.get(id).map(|e| e.response.clone())
    }

    /// Evicts responses in a terminal state older than `retention`
    /// (spec.md §4.6 step 5, default 24h).
    pub async fn cleanup(&self, retention: ChronoDuration) {
        let cutoff = Utc::now() - retention;
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| {
            let terminal = matches!(
                entry.response.status,
                ExportStatus::Completed | ExportStatus::Failed | ExportStatus::Cancelled
            );
            !(terminal && entry.enqueued_at < cutoff)
        });
    }

    async fn transition(
        &self,
        id: &str,
        next: ExportStatus,
        mutate: impl FnOnce(&mut ExportResponse),
    ) -> Result<(), ExportError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| ExportError::RequestNotFound(id.to_string()))?;
        if !entry.response.status.can_transition_to(next) {
            return Err(ExportError::NotPending { id: id.to_string() });
        }
        entry.response.status = next;
        mutate(&mut entry.response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch_model::DataType;

    fn sample_request() -> ExportRequest {
        ExportRequest::new("json", DataType::Snapshot, driftwatch_model::ConfigValue::Null)
    }

    #[tokio::test]
    async fn enqueue_then_dequeue_round_trips() {
        let queue = Queue::new(10);
        let request = sample_request();
        let id = queue.enqueue(request.clone()).await.unwrap();
        assert_eq!(queue.status(&id).await.unwrap().status, ExportStatus::Pending);

        let dequeued = queue.dequeue_next().await.unwrap();
        assert_eq!(dequeued.id, request.id);
    }

    #[tokio::test]
    async fn full_queue_rejects_fast() {
        let queue = Queue::new(1);
        queue.enqueue(sample_request()).await.unwrap();
        let err = queue.enqueue(sample_request()).await.unwrap_err();
        assert!(matches!(err, ExportError::QueueFull { capacity: 1 }));
    }

    #[tokio::test]
    async fn cancel_only_honored_while_pending() {
        let queue = Queue::new(10);
        let id = queue.enqueue(sample_request()).await.unwrap();
        queue.mark_processing(&id).await.unwrap();
        let err = queue.cancel(&id).await.unwrap_err();
        assert!(matches!(err, ExportError::NotPending { .. }));
    }

    #[tokio::test]
    async fn canceled_pending_requests_are_skipped_on_dequeue() {
        let queue = Queue::new(10);
        let id = queue.enqueue(sample_request()).await.unwrap();
        queue.cancel(&id).await.unwrap();
        assert!(queue.dequeue_next().await.is_none());
    }

    #[tokio::test]
    async fn cleanup_evicts_only_old_terminal_entries() {
        let queue = Queue::new(10);
        let id = queue.enqueue(sample_request()).await.unwrap();
        queue.mark_processing(&id).await.unwrap();
        let mut response = ExportResponse::pending(id.clone());
        response.status = ExportStatus::Completed;
        queue.complete(&id, response).await.unwrap();

        queue.cleanup(ChronoDuration::hours(24)).await;
        assert!(queue.status(&id).await.is_some(), "fresh terminal entries survive cleanup");

        queue.cleanup(ChronoDuration::zero()).await;
        assert!(queue.status(&id).await.is_none(), "cleanup evicts terminal entries past retention");
    }
}
