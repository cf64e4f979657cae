//! Conversion job record and its single writer

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use crate::types::{ConversionResult, FileDescriptor, FileStatus, JobSnapshot, JobStatus, Settings};

/// A submitted batch of files. Identity, inputs and settings are fixed at
/// creation; everything else lives behind the state lock and is written only
/// through the job's [`JobWriter`].
#[derive(Debug)]
pub struct ConversionJob {
    pub id: Uuid,
    pub files: Vec<FileDescriptor>,
    pub settings: Settings,
    pub created_at: DateTime<Utc>,
    state: RwLock<JobState>,
}

#[derive(Debug)]
struct JobState {
    status: JobStatus,
    progress: f64,
    results: Vec<ConversionResult>,
    error: Option<String>,
    completed_at: Option<DateTime<Utc>>,
}

impl ConversionJob {
    /// Create a pending job together with the only handle allowed to mutate it
    pub fn new(id: Uuid, files: Vec<FileDescriptor>, settings: Settings) -> (Arc<Self>, JobWriter) {
        let job = Arc::new(Self {
            id,
            files,
            settings,
            created_at: Utc::now(),
            state: RwLock::new(JobState {
                status: JobStatus::Pending,
                progress: 0.0,
                results: Vec::new(),
                error: None,
                completed_at: None,
            }),
        });
        let writer = JobWriter { job: job.clone() };
        (job, writer)
    }

    pub fn status(&self) -> JobStatus {
        self.state.read().status
    }

    pub fn progress(&self) -> f64 {
        self.state.read().progress
    }

    /// Whether the job is older than `ttl` at `now`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.created_at > ttl
    }

    /// Outputs of files that converted successfully
    pub fn successful_outputs(&self) -> Vec<std::path::PathBuf> {
        self.state
            .read()
            .results
            .iter()
            .filter(|r| r.status == FileStatus::Success)
            .filter_map(|r| r.output_path.clone())
            .collect()
    }

    /// Consistent copy of the job for pollers
    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.state.read();
        JobSnapshot {
            job_id: self.id,
            status: state.status,
            progress: state.progress,
            total_files: self.files.len(),
            completed_files: state.results.iter().filter(|r| r.status == FileStatus::Success).count(),
            failed_files: state.results.iter().filter(|r| r.status == FileStatus::Failed).count(),
            results: state.results.clone(),
            error: state.error.clone(),
            created_at: self.created_at,
            completed_at: state.completed_at,
        }
    }
}

/// Exclusive write access to one job. Not `Clone`: exactly one task owns it.
#[derive(Debug)]
pub struct JobWriter {
    job: Arc<ConversionJob>,
}

impl JobWriter {
    pub fn job(&self) -> &Arc<ConversionJob> {
        &self.job
    }

    /// pending -> processing
    pub fn start(&self) {
        let mut state = self.job.state.write();
        advance(self.job.id, &mut state, JobStatus::Processing);
    }

    /// Append the next file's result and advance progress. Progress stays
    /// below 100 until [`JobWriter::complete`].
    pub fn record_result(&self, result: ConversionResult) {
        let total = self.job.files.len();
        let mut state = self.job.state.write();
        if state.status.is_terminal() || state.results.len() >= total {
            tracing::warn!("[{}] Ignoring result for {}", self.job.id, result.original_filename);
            return;
        }
        state.results.push(result);
        let done = state.results.len();
        if done < total {
            state.progress = state.progress.max(done as f64 / total as f64 * 100.0);
        }
    }

    /// processing -> completed
    pub fn complete(self) {
        let mut state = self.job.state.write();
        if advance(self.job.id, &mut state, JobStatus::Completed) {
            state.progress = 100.0;
            state.completed_at = Some(Utc::now());
        }
    }

    /// Abort the job. Files never reached get a `skipped` result carrying
    /// the reason so the result count still matches the input count.
    pub fn fail(self, error: impl Into<String>) {
        let error = error.into();
        let mut state = self.job.state.write();
        if !advance(self.job.id, &mut state, JobStatus::Failed) {
            return;
        }
        let reached = state.results.len();
        for file in self.job.files.iter().skip(reached) {
            state
                .results
                .push(ConversionResult::skipped(&file.filename, Some(error.clone())));
        }
        state.error = Some(error);
        state.completed_at = Some(Utc::now());
    }
}

fn advance(job_id: Uuid, state: &mut JobState, next: JobStatus) -> bool {
    if state.status.can_advance_to(next) {
        state.status = next;
        true
    } else {
        tracing::warn!("[{}] Illegal transition {:?} -> {:?}", job_id, state.status, next);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(n: usize) -> Vec<FileDescriptor> {
        (0..n)
            .map(|i| FileDescriptor::new(format!("f{}.pdf", i), format!("/tmp/f{}.pdf", i), 1))
            .collect()
    }

    #[test]
    fn test_progress_reaches_100_only_on_completion() {
        let (job, writer) = ConversionJob::new(Uuid::new_v4(), files(2), Settings::default());
        assert_eq!(job.status(), JobStatus::Pending);

        writer.start();
        writer.record_result(ConversionResult::failed("f0.pdf", "x"));
        assert_eq!(job.progress(), 50.0);

        writer.record_result(ConversionResult::failed("f1.pdf", "y"));
        assert!(job.progress() < 100.0);
        assert_eq!(job.status(), JobStatus::Processing);

        writer.complete();
        let snapshot = job.snapshot();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.progress, 100.0);
        assert_eq!(snapshot.results.len(), 2);
        assert_eq!(snapshot.failed_files, 2);
        assert!(snapshot.completed_at.is_some());
    }

    #[test]
    fn test_fail_pads_unreached_files() {
        let (job, writer) = ConversionJob::new(Uuid::new_v4(), files(3), Settings::default());
        writer.start();
        writer.record_result(ConversionResult::failed("f0.pdf", "x"));
        writer.fail("disk full");

        let snapshot = job.snapshot();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.results.len(), 3);
        assert_eq!(snapshot.results[2].status, FileStatus::Skipped);
        assert_eq!(snapshot.results[2].error.as_deref(), Some("disk full"));
        assert_eq!(snapshot.error.as_deref(), Some("disk full"));
        assert!(snapshot.progress < 100.0);
    }

    #[test]
    fn test_empty_job_completes_at_100() {
        let (job, writer) = ConversionJob::new(Uuid::new_v4(), Vec::new(), Settings::default());
        writer.start();
        writer.complete();
        assert_eq!(job.progress(), 100.0);
        assert_eq!(job.status(), JobStatus::Completed);
    }

    #[test]
    fn test_complete_without_start_is_rejected() {
        let (job, writer) = ConversionJob::new(Uuid::new_v4(), files(1), Settings::default());
        writer.complete();
        assert_eq!(job.status(), JobStatus::Pending);
        assert_eq!(job.progress(), 0.0);
    }

    #[test]
    fn test_is_expired() {
        let (job, _writer) = ConversionJob::new(Uuid::new_v4(), files(1), Settings::default());
        let ttl = chrono::Duration::hours(24);
        assert!(!job.is_expired(job.created_at + chrono::Duration::hours(1), ttl));
        assert!(job.is_expired(job.created_at + chrono::Duration::hours(25), ttl));
    }
}
