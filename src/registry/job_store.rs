//! # Job Store
//!
//! Where live jobs are kept, keyed by batch id. The registry only talks to the
//! [`JobStore`] trait, so the process-local map can be replaced without
//! touching the processor.

use super::job::SharedJob;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

pub trait JobStore: Send + Sync {
    fn get(&self, batch_id: &Uuid) -> Option<SharedJob>;

    /// Insert or replace; returns the replaced job, if any
    fn set(&self, batch_id: Uuid, job: SharedJob) -> Option<SharedJob>;

    /// Insert unless a non-terminal job already holds the slot. The check and
    /// the insert happen under one entry lock. `Err` carries the running job.
    fn set_unless_running(
        &self,
        batch_id: Uuid,
        job: SharedJob,
    ) -> Result<Option<SharedJob>, SharedJob>;

    fn delete(&self, batch_id: &Uuid) -> Option<SharedJob>;

    /// Remove the entry only if `predicate` holds for the job stored at the
    /// moment of removal
    fn delete_if(
        &self,
        batch_id: &Uuid,
        predicate: &(dyn Fn(&SharedJob) -> bool + Send + Sync),
    ) -> Option<SharedJob>;

    /// Point-in-time copy of every entry
    fn entries(&self) -> Vec<(Uuid, SharedJob)>;
}

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<Uuid, SharedJob>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl JobStore for InMemoryJobStore {
    fn get(&self, batch_id: &Uuid) -> Option<SharedJob> {
        self.jobs.get(batch_id).map(|entry| entry.value().clone())
    }

    fn set(&self, batch_id: Uuid, job: SharedJob) -> Option<SharedJob> {
        self.jobs.insert(batch_id, job)
    }

    fn set_unless_running(
        &self,
        batch_id: Uuid,
        job: SharedJob,
    ) -> Result<Option<SharedJob>, SharedJob> {
        match self.jobs.entry(batch_id) {
            Entry::Occupied(mut entry) => {
                if !entry.get().read().status.is_terminal() {
                    return Err(entry.get().clone());
                }
                Ok(Some(entry.insert(job)))
            }
            Entry::Vacant(entry) => {
                entry.insert(job);
                Ok(None)
            }
        }
    }

    fn delete(&self, batch_id: &Uuid) -> Option<SharedJob> {
        self.jobs.remove(batch_id).map(|(_, job)| job)
    }

    fn delete_if(
        &self,
        batch_id: &Uuid,
        predicate: &(dyn Fn(&SharedJob) -> bool + Send + Sync),
    ) -> Option<SharedJob> {
        self.jobs
            .remove_if(batch_id, |_, job| predicate(job))
            .map(|(_, job)| job)
    }

    fn entries(&self) -> Vec<(Uuid, SharedJob)> {
        self.jobs
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }
}
