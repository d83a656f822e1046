use crate::export::EngineDocument;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error | JobStatus::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    pub logs: Vec<String>,
    pub result: Option<EngineDocument>,
    pub error: Option<String>,
    /// Creation order, used for eviction
    sequence: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("job table full: {0} unfinished job(s) retained")]
    TableFull(usize),
}

/// In-memory job registry shared by the HTTP handlers and background workers.
///
/// Finished jobs are kept until the table reaches `max_retained`, then the
/// oldest finished job makes room for a new one.
#[derive(Clone)]
pub struct JobTable {
    jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,
    next_sequence: Arc<AtomicU64>,
    max_retained: usize,
}

impl JobTable {
    pub fn new(max_retained: usize) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            next_sequence: Arc::new(AtomicU64::new(0)),
            max_retained: max_retained.max(1),
        }
    }

    pub async fn create(&self) -> Result<JobId, JobError> {
        let mut jobs = self.jobs.write().await;

        if jobs.len() >= self.max_retained {
            let oldest_finished = jobs
                .values()
                .filter(|job| job.status.is_finished())
                .min_by_key(|job| job.sequence)
                .map(|job| job.id);

            match oldest_finished {
                Some(id) => {
                    jobs.remove(&id);
                    debug!("Evicted finished job {}", id);
                }
                None => {
                    warn!("Job table full with {} unfinished job(s)", jobs.len());
                    return Err(JobError::TableFull(jobs.len()));
                }
            }
        }

        let id = Uuid::new_v4();
        jobs.insert(
            id,
            JobRecord {
                id,
                status: JobStatus::Queued,
                logs: vec!["queued".to_string()],
                result: None,
                error: None,
                sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            },
        );
        info!("Job {} created", id);

        Ok(id)
    }

    /// Move an unfinished job to `status`. Finished jobs are left alone.
    pub async fn set_status(&self, id: JobId, status: JobStatus) -> bool {
        match self.jobs.write().await.get_mut(&id) {
            Some(job) if !job.status.is_finished() => {
                job.status = status;
                true
            }
            _ => false,
        }
    }

    pub async fn log(&self, id: JobId, line: impl Into<String>) {
        if let Some(job) = self.jobs.write().await.get_mut(&id) {
            job.logs.push(line.into());
        }
    }

    /// Store a result. Returns false when the job was cancelled or is gone.
    pub async fn complete(&self, id: JobId, result: EngineDocument) -> bool {
        match self.jobs.write().await.get_mut(&id) {
            Some(job) if !job.status.is_finished() => {
                job.status = JobStatus::Done;
                job.logs.push("done".to_string());
                job.result = Some(result);
                true
            }
            Some(job) => {
                debug!("Discarding late result for job {} ({:?})", id, job.status);
                false
            }
            None => false,
        }
    }

    pub async fn fail(&self, id: JobId, message: impl Into<String>) -> bool {
        let message = message.into();
        match self.jobs.write().await.get_mut(&id) {
            Some(job) if !job.status.is_finished() => {
                job.status = JobStatus::Error;
                job.logs.push(format!("error: {}", message));
                job.error = Some(message);
                true
            }
            _ => false,
        }
    }

    /// Cancel a pending job. Returns the job's status after the call.
    pub async fn cancel(&self, id: JobId) -> Option<JobStatus> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id)?;

        if !job.status.is_finished() {
            job.status = JobStatus::Cancelled;
            job.logs.push("cancelled".to_string());
            info!("Job {} cancelled", id);
        }

        Some(job.status)
    }

    pub async fn get(&self, id: JobId) -> Option<JobRecord> {
        self.jobs.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Fog, Lighting, RuleFlags, Scene};

    fn empty_document() -> EngineDocument {
        EngineDocument::from_scene(&Scene {
            actors: Vec::new(),
            lighting: Lighting {
                brightness: 10.0,
                temperature: 46.6,
                time_of_day: 6.82,
                sun_angle: 0.0,
            },
            fog: Fog {
                density: 0.02,
                ray_density: 0.02,
                height: 0.2,
            },
            rule_flags: RuleFlags::default(),
            seed: 0,
        })
    }

    #[tokio::test]
    async fn test_job_lifecycle() {
        let table = JobTable::new(8);
        let id = table.create().await.unwrap();
        assert_eq!(table.get(id).await.unwrap().status, JobStatus::Queued);

        assert!(table.set_status(id, JobStatus::Running).await);
        table.log(id, "composing").await;
        assert!(table.complete(id, empty_document()).await);

        let job = table.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert!(job.result.is_some());
        assert_eq!(job.logs, vec!["queued", "composing", "done"]);
    }

    #[tokio::test]
    async fn test_cancelled_job_never_completes() {
        let table = JobTable::new(8);
        let id = table.create().await.unwrap();
        table.set_status(id, JobStatus::Running).await;

        assert_eq!(table.cancel(id).await, Some(JobStatus::Cancelled));
        assert!(!table.complete(id, empty_document()).await);
        assert!(!table.set_status(id, JobStatus::Running).await);

        let job = table.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.result.is_none());
    }

    #[tokio::test]
    async fn test_failure_records_message() {
        let table = JobTable::new(8);
        let id = table.create().await.unwrap();
        assert!(table.fail(id, "capacity exceeded").await);

        let job = table.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("capacity exceeded"));
        assert_eq!(table.cancel(id).await, Some(JobStatus::Error));
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let table = JobTable::new(8);
        let id = Uuid::new_v4();
        assert!(table.get(id).await.is_none());
        assert!(table.cancel(id).await.is_none());
    }

    #[tokio::test]
    async fn test_retention_evicts_oldest_finished() {
        let table = JobTable::new(2);
        let first = table.create().await.unwrap();
        let second = table.create().await.unwrap();

        assert_eq!(table.create().await, Err(JobError::TableFull(2)));

        table.fail(second, "boom").await;
        table.complete(first, empty_document()).await;
        let third = table.create().await.unwrap();

        assert_eq!(table.len().await, 2);
        assert!(table.get(first).await.is_none());
        assert!(table.get(second).await.is_some());
        assert!(table.get(third).await.is_some());
    }
}
