//! # Promotion Job Registry
//!
//! Tracks at most one live job per batch and gives progress consumers read
//! access and a push hook.
//!
//! ## Subscribers
//!
//! Each batch has a single subscriber slot. Subscribing again replaces the
//! previous callback. Callbacks run inline in the processing loop, so they
//! must return quickly; [`JobRegistry::watch_progress`] is the non-blocking
//! way to relay updates to a long-lived connection.
//!
//! ## Usage
//!
//! ```rust
//! use promotion_core::registry::{JobRegistry, PromotionJob};
//! use uuid::Uuid;
//!
//! let registry = JobRegistry::in_memory(chrono::Duration::hours(24));
//! let batch_id = Uuid::new_v4();
//! registry.register_job(PromotionJob::new(batch_id, Uuid::new_v4(), 30));
//!
//! registry.subscribe_to_progress(batch_id, |job| {
//!     println!("{}/{} processed", job.processed_students, job.total_students);
//! });
//!
//! let snapshot = registry.get_job_progress(batch_id).unwrap();
//! assert_eq!(snapshot.total_students, 30);
//! ```

use super::job::{PromotionJob, SharedJob};
use super::job_store::{InMemoryJobStore, JobStore};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

pub type ProgressCallback = Arc<dyn Fn(&PromotionJob) + Send + Sync>;

#[derive(Clone)]
pub struct JobRegistry {
    store: Arc<dyn JobStore>,
    subscribers: Arc<DashMap<Uuid, ProgressCallback>>,
    retention: chrono::Duration,
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("jobs", &self.store.entries().len())
            .field("subscribers", &self.subscribers.len())
            .field("retention", &self.retention)
            .finish()
    }
}

impl JobRegistry {
    pub fn new(store: Arc<dyn JobStore>, retention: chrono::Duration) -> Self {
        Self {
            store,
            subscribers: Arc::new(DashMap::new()),
            retention,
        }
    }

    pub fn in_memory(retention: chrono::Duration) -> Self {
        Self::new(Arc::new(InMemoryJobStore::new()), retention)
    }

    /// Register `job` under its batch id, replacing any existing entry.
    /// The replaced job is not merged or stopped.
    pub fn register_job(&self, job: PromotionJob) -> SharedJob {
        let batch_id = job.batch_id;
        let shared = job.into_shared();
        if let Some(replaced) = self.store.set(batch_id, Arc::clone(&shared)) {
            debug!(
                batch_id = %batch_id,
                replaced_status = %replaced.read().status,
                "Replaced existing promotion job entry"
            );
        }
        shared
    }

    /// Register `job` unless a non-terminal job already exists for its batch.
    ///
    /// The check and the insert are one atomic store operation, so concurrent
    /// callers cannot both win. `Err` carries a snapshot of the running job.
    pub fn register_job_unless_running(
        &self,
        job: PromotionJob,
    ) -> std::result::Result<SharedJob, PromotionJob> {
        let batch_id = job.batch_id;
        let shared = job.into_shared();
        match self.store.set_unless_running(batch_id, Arc::clone(&shared)) {
            Ok(replaced) => {
                if replaced.is_some() {
                    debug!(batch_id = %batch_id, "Replaced finished promotion job entry");
                }
                Ok(shared)
            }
            Err(running) => Err(running.read().clone()),
        }
    }

    /// Snapshot of the live job for `batch_id`
    pub fn get_job_progress(&self, batch_id: Uuid) -> Option<PromotionJob> {
        self.store.get(&batch_id).map(|job| job.read().clone())
    }

    /// The shared job itself, for callers that need identity rather than a copy
    pub fn shared_job(&self, batch_id: Uuid) -> Option<SharedJob> {
        self.store.get(&batch_id)
    }

    pub fn subscribe_to_progress<F>(&self, batch_id: Uuid, callback: F)
    where
        F: Fn(&PromotionJob) + Send + Sync + 'static,
    {
        if self.subscribers.insert(batch_id, Arc::new(callback)).is_some() {
            debug!(batch_id = %batch_id, "Replaced progress subscriber");
        }
    }

    pub fn unsubscribe_from_progress(&self, batch_id: Uuid) {
        self.subscribers.remove(&batch_id);
    }

    pub fn has_subscriber(&self, batch_id: Uuid) -> bool {
        self.subscribers.contains_key(&batch_id)
    }

    /// Invoke the subscriber for `batch_id`, if any, with `job`
    pub fn notify(&self, batch_id: Uuid, job: &PromotionJob) {
        // Clone out of the map so the callback never runs under a shard lock
        let callback = self
            .subscribers
            .get(&batch_id)
            .map(|entry| Arc::clone(entry.value()));
        if let Some(callback) = callback {
            callback(job);
        }
    }

    /// Subscribe through a `watch` channel seeded with the current snapshot.
    ///
    /// This takes the batch's subscriber slot. Returns `None` when no job is
    /// registered for `batch_id`.
    pub fn watch_progress(&self, batch_id: Uuid) -> Option<watch::Receiver<PromotionJob>> {
        let current = self.get_job_progress(batch_id)?;
        let (sender, receiver) = watch::channel(current);
        self.subscribe_to_progress(batch_id, move |job| {
            sender.send_replace(job.clone());
        });
        Some(receiver)
    }

    /// Remove terminal jobs that completed more than the retention window
    /// before `now`. Returns how many were removed.
    pub fn cleanup_completed_jobs_at(&self, now: DateTime<Utc>) -> usize {
        let retention = self.retention;
        let mut removed = 0;
        for (batch_id, _) in self.store.entries() {
            // Re-checked on the stored entry, which may have been replaced
            // since the copy was taken
            let expired = move |job: &SharedJob| job.read().is_expired(now, retention);
            if self.store.delete_if(&batch_id, &expired).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, "Cleaned up completed promotion jobs");
        }
        removed
    }

    pub fn cleanup_completed_jobs(&self) -> usize {
        self.cleanup_completed_jobs_at(Utc::now())
    }

    /// Run [`Self::cleanup_completed_jobs`] every `interval` until the handle
    /// is aborted. Must be called within a Tokio runtime.
    pub fn spawn_cleanup_task(&self, interval: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                registry.cleanup_completed_jobs();
            }
        })
    }

    pub fn job_count(&self) -> usize {
        self.store.entries().len()
    }
}
