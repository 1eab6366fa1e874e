//! Job entity and its lifecycle state machine
//!
//! `Processing -> Completed | Failed`. Terminal states never change again,
//! except that a completed table accepts label corrections.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sentilens_core::{Error, JobId, LabelCounts, Record, Result, ResultTable};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

/// Error captured when a job fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    /// Error kind, as reported by [`Error::kind`]
    pub kind: String,
    pub message: String,
}

impl From<&Error> for JobFailure {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug)]
enum JobState {
    Processing {
        progress: usize,
    },
    Completed {
        table: ResultTable,
        finished_at: DateTime<Utc>,
    },
    Failed {
        failure: JobFailure,
        progress: usize,
        finished_at: DateTime<Utc>,
    },
}

/// Snapshot of a job returned by status queries
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobView {
    Processing {
        job_id: JobId,
        progress: usize,
        total: usize,
        created_at: DateTime<Utc>,
    },
    Completed {
        job_id: JobId,
        progress: usize,
        total: usize,
        data: Vec<Record>,
        stats: LabelCounts,
        created_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
    Failed {
        job_id: JobId,
        error: JobFailure,
        progress: usize,
        total: usize,
        created_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
}

impl JobView {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Processing { .. } => JobStatus::Processing,
            Self::Completed { .. } => JobStatus::Completed,
            Self::Failed { .. } => JobStatus::Failed,
        }
    }

    pub fn job_id(&self) -> JobId {
        match self {
            Self::Processing { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::Failed { job_id, .. } => *job_id,
        }
    }
}

/// One submitted batch-classification request.
///
/// Progress and terminal transitions are written only by the runner that owns
/// the job; readers go through the lock and receive snapshots.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    total: usize,
    created_at: DateTime<Utc>,
    state: RwLock<JobState>,
}

impl Job {
    pub(crate) fn new(id: JobId, total: usize) -> Self {
        Self {
            id,
            total,
            created_at: Utc::now(),
            state: RwLock::new(JobState::Processing { progress: 0 }),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> JobStatus {
        match &*self.state.read() {
            JobState::Processing { .. } => JobStatus::Processing,
            JobState::Completed { .. } => JobStatus::Completed,
            JobState::Failed { .. } => JobStatus::Failed,
        }
    }

    /// Texts classified so far
    pub fn progress(&self) -> usize {
        match &*self.state.read() {
            JobState::Processing { progress } | JobState::Failed { progress, .. } => *progress,
            JobState::Completed { .. } => self.total,
        }
    }

    /// Current snapshot of the job
    pub fn view(&self) -> JobView {
        match &*self.state.read() {
            JobState::Processing { progress } => JobView::Processing {
                job_id: self.id,
                progress: *progress,
                total: self.total,
                created_at: self.created_at,
            },
            JobState::Completed { table, finished_at } => JobView::Completed {
                job_id: self.id,
                progress: self.total,
                total: self.total,
                data: table.records().to_vec(),
                stats: table.label_counts(),
                created_at: self.created_at,
                finished_at: *finished_at,
            },
            JobState::Failed {
                failure,
                progress,
                finished_at,
            } => JobView::Failed {
                job_id: self.id,
                error: failure.clone(),
                progress: *progress,
                total: self.total,
                created_at: self.created_at,
                finished_at: *finished_at,
            },
        }
    }

    /// Read the result table of a completed job
    pub fn with_table<R>(&self, f: impl FnOnce(&ResultTable) -> R) -> Result<R> {
        match &*self.state.read() {
            JobState::Completed { table, .. } => Ok(f(table)),
            other => Err(self.not_ready(other)),
        }
    }

    /// Mutate the result table of a completed job under the job's write lock
    pub fn with_table_mut<R>(&self, f: impl FnOnce(&mut ResultTable) -> Result<R>) -> Result<R> {
        match &mut *self.state.write() {
            JobState::Completed { table, .. } => f(table),
            other => Err(self.not_ready(other)),
        }
    }

    /// Record that the first `processed` texts are classified.
    ///
    /// Progress never decreases and never exceeds `total`.
    pub(crate) fn advance(&self, processed: usize) {
        if let JobState::Processing { progress } = &mut *self.state.write() {
            *progress = processed.min(self.total).max(*progress);
        }
    }

    /// Move to Completed; returns false if the job was already terminal
    pub(crate) fn complete(&self, table: ResultTable) -> bool {
        let mut state = self.state.write();
        if !matches!(*state, JobState::Processing { .. }) {
            return false;
        }
        *state = JobState::Completed {
            table,
            finished_at: Utc::now(),
        };
        true
    }

    /// Move to Failed, keeping progress reached so far; returns false if the
    /// job was already terminal
    pub(crate) fn fail(&self, err: &Error) -> bool {
        let mut state = self.state.write();
        let progress = match &*state {
            JobState::Processing { progress } => *progress,
            _ => return false,
        };
        *state = JobState::Failed {
            failure: JobFailure::from(err),
            progress,
            finished_at: Utc::now(),
        };
        true
    }

    // Caller holds the state lock.
    fn not_ready(&self, state: &JobState) -> Error {
        let status = match state {
            JobState::Processing { .. } => JobStatus::Processing,
            JobState::Completed { .. } => JobStatus::Completed,
            JobState::Failed { .. } => JobStatus::Failed,
        };
        Error::not_ready(format!("job {} is {}", self.id, status.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentilens_core::{Label, Prediction, TextInput};

    fn table(n: usize) -> ResultTable {
        let mut builder = ResultTable::builder(n);
        for i in 0..n {
            builder.push(
                TextInput::new(format!("text {i}")),
                Prediction::new(Label::Neutral, 0.5),
            );
        }
        builder.finish()
    }

    #[test]
    fn test_new_job_is_processing() {
        let job = Job::new(JobId::new(), 10);
        assert_eq!(job.status(), JobStatus::Processing);
        assert_eq!(job.progress(), 0);
        assert!(matches!(
            job.view(),
            JobView::Processing {
                progress: 0,
                total: 10,
                ..
            }
        ));
    }

    #[test]
    fn test_progress_is_monotonic_and_capped() {
        let job = Job::new(JobId::new(), 10);
        job.advance(4);
        assert_eq!(job.progress(), 4);
        job.advance(2);
        assert_eq!(job.progress(), 4);
        job.advance(64);
        assert_eq!(job.progress(), 10);
    }

    #[test]
    fn test_complete_is_terminal() {
        let job = Job::new(JobId::new(), 2);
        assert!(job.complete(table(2)));
        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.progress(), 2);

        assert!(!job.fail(&Error::internal("late")));
        assert!(!job.complete(table(1)));
        assert_eq!(job.with_table(|t| t.len()).unwrap(), 2);
    }

    #[test]
    fn test_failed_job_hides_results() {
        let job = Job::new(JobId::new(), 5);
        job.advance(3);
        assert!(job.fail(&Error::model_unavailable("boom")));

        match job.view() {
            JobView::Failed {
                error, progress, ..
            } => {
                assert_eq!(error.kind, "model_unavailable");
                assert!(error.message.contains("boom"));
                assert_eq!(progress, 3);
            }
            other => panic!("unexpected view: {other:?}"),
        }
        assert!(matches!(job.with_table(|t| t.len()), Err(Error::NotReady(_))));
        job.advance(5);
        assert_eq!(job.progress(), 3);
    }

    #[test]
    fn test_view_serialization() {
        let job = Job::new(JobId::new(), 1);
        job.complete(table(1));
        let json = serde_json::to_value(job.view()).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["progress"], 1);
        assert_eq!(json["total"], 1);
        assert_eq!(json["stats"]["neutral"], 1);
        assert_eq!(json["data"][0]["text"], "text 0");
        assert_eq!(json["data"][0]["label"], 1);
    }
}
