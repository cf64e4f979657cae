//! Job registry, worker dispatch and TTL eviction

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::job::ConversionJob;
use super::worker::JobWorker;
use crate::conversion::HtmlConverter;
use crate::error::{Error, Result};
use crate::output::AssetStore;
use crate::types::{FileDescriptor, JobSnapshot, Settings};

/// Owns every live job. Structural changes to the registry happen under
/// one lock; job contents are written only by each job's worker.
pub struct JobOrchestrator {
    jobs: Mutex<HashMap<Uuid, Arc<ConversionJob>>>,
    store: AssetStore,
    worker: JobWorker,
}

impl JobOrchestrator {
    pub fn new(converter: HtmlConverter, store: AssetStore) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            worker: JobWorker::new(converter, store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// Create a job under a fresh id and start its worker
    pub fn submit_job(&self, files: Vec<FileDescriptor>, settings: Settings) -> Uuid {
        self.submit_job_with_id(Uuid::new_v4(), files, settings)
    }

    /// Create a job under `job_id`, used when uploads were stored under the
    /// id before submission. Must be called inside a tokio runtime.
    pub fn submit_job_with_id(&self, job_id: Uuid, files: Vec<FileDescriptor>, settings: Settings) -> Uuid {
        let (job, writer) = ConversionJob::new(job_id, files, settings);
        let total = job.files.len();
        self.jobs.lock().insert(job_id, job);

        tokio::spawn(self.worker.clone().run(writer));
        tracing::info!("[{}] Job submitted with {} files", job_id, total);
        job_id
    }

    /// Register a job under `job_id` and convert it before returning. The
    /// job stays registered, so its outputs are served and evicted like any
    /// other job's.
    pub async fn run_job(&self, job_id: Uuid, files: Vec<FileDescriptor>, settings: Settings) -> JobSnapshot {
        let (job, writer) = ConversionJob::new(job_id, files, settings);
        self.jobs.lock().insert(job_id, job.clone());
        tracing::info!("[{}] Converting {} files inline", job_id, job.files.len());

        self.worker.clone().run(writer).await;
        job.snapshot()
    }

    pub fn get_job(&self, job_id: Uuid) -> Option<Arc<ConversionJob>> {
        self.jobs.lock().get(&job_id).cloned()
    }

    pub fn get_job_status(&self, job_id: Uuid) -> Result<JobSnapshot> {
        self.get_job(job_id)
            .map(|job| job.snapshot())
            .ok_or_else(|| Error::not_found(format!("Job {} not found", job_id)))
    }

    /// Remove the registry entry and the job's directories. A worker that is
    /// still running is not stopped. Returns whether the job was registered.
    pub fn delete_job(&self, job_id: Uuid) -> bool {
        let removed = self.jobs.lock().remove(&job_id);
        if let Some(job) = &removed {
            if !job.status().is_terminal() {
                tracing::warn!("[{}] Deleting job while its worker is still running", job_id);
            }
        }
        self.store.remove_job(job_id);
        tracing::info!("[{}] Job cleaned up", job_id);
        removed.is_some()
    }

    pub fn active_jobs(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Evict every job older than `ttl` at `now`
    pub fn sweep_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> Vec<Uuid> {
        let expired: Vec<Uuid> = {
            let mut jobs = self.jobs.lock();
            let ids: Vec<Uuid> = jobs
                .values()
                .filter(|job| job.is_expired(now, ttl))
                .map(|job| job.id)
                .collect();
            for id in &ids {
                jobs.remove(id);
            }
            ids
        };

        for id in &expired {
            self.store.remove_job(*id);
        }
        if !expired.is_empty() {
            tracing::info!("Evicted {} expired jobs", expired.len());
        }
        expired
    }

    /// Run [`JobOrchestrator::sweep_expired`] every `interval`
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, ttl: Duration) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                tracing::debug!("Running job eviction sweep");
                orchestrator.sweep_expired(Utc::now(), ttl);
            }
        })
    }
}
