//! Keyed registry of jobs
//!
//! One instance is created at startup and handed to whatever drives requests.
//! The map lock is held only to insert or look up; job state has its own lock.

use crate::job::{Job, JobView};
use parking_lot::RwLock;
use sentilens_core::{Error, JobId, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared, cloneable handle to the job registry
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, Arc<Job>>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh job in Processing with `progress = 0`
    pub(crate) fn register(&self, total: usize) -> Arc<Job> {
        let mut jobs = self.jobs.write();

        let mut id = JobId::new();
        while jobs.contains_key(&id) {
            id = JobId::new();
        }

        let job = Arc::new(Job::new(id, total));
        jobs.insert(id, Arc::clone(&job));
        metrics::gauge!("sentilens_jobs_registered").set(jobs.len() as f64);

        job
    }

    /// Look up a job, failing with `NotFound` for unknown ids
    pub fn get(&self, id: &JobId) -> Result<Arc<Job>> {
        self.jobs
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("job {id} not found")))
    }

    /// Snapshot of a job's current state
    pub fn status(&self, id: &JobId) -> Result<JobView> {
        Ok(self.get(id)?.view())
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Ids of all registered jobs, in no particular order
    pub fn ids(&self) -> Vec<JobId> {
        self.jobs.read().keys().copied().collect()
    }
}
