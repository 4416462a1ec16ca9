use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::api::models::ScrapeReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: u64,
    pub url: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub content: Option<ScrapeReport>,
}

/// Scrape jobs and their reports, kept for the life of the process.
/// Ids are serial and start at 1.
#[derive(Debug, Default)]
pub struct JobStore {
    inner: Mutex<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    next_id: u64,
    jobs: HashMap<u64, JobRecord>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_job(&self, url: &str) -> u64 {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.jobs.insert(
            id,
            JobRecord {
                id,
                url: url.to_string(),
                status: JobStatus::InProgress,
                created_at: Utc::now(),
                content: None,
            },
        );
        debug!("Created job {} for {}", id, url);
        id
    }

    pub fn update_job_status(&self, job_id: u64, status: JobStatus) {
        if let Some(job) = self.lock().jobs.get_mut(&job_id) {
            job.status = status;
        }
    }

    pub fn get_job_status(&self, job_id: u64) -> Option<JobStatus> {
        self.lock().jobs.get(&job_id).map(|job| job.status)
    }

    pub fn save_content(&self, job_id: u64, report: ScrapeReport) {
        if let Some(job) = self.lock().jobs.get_mut(&job_id) {
            job.content = Some(report);
        }
    }

    pub fn get_content(&self, job_id: u64) -> Option<ScrapeReport> {
        self.lock().jobs.get(&job_id).and_then(|job| job.content.clone())
    }

    pub fn get_job(&self, job_id: u64) -> Option<JobRecord> {
        self.lock().jobs.get(&job_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        // A poisoned lock only means another handler panicked mid-update;
        // the map itself is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::TreeNode;

    fn report(url: &str) -> ScrapeReport {
        ScrapeReport {
            start_url: url.to_string(),
            total_pages_attempted: 1,
            total_pages_scraped: 1,
            content: Vec::new(),
            errors: Vec::new(),
            skipped_urls: Vec::new(),
            url_tree: TreeNode::new(url),
        }
    }

    #[test]
    fn ids_are_serial() {
        let store = JobStore::new();
        assert_eq!(store.create_job("https://a.test"), 1);
        assert_eq!(store.create_job("https://b.test"), 2);
    }

    #[test]
    fn job_lifecycle() {
        let store = JobStore::new();
        let id = store.create_job("https://a.test");
        assert_eq!(store.get_job_status(id), Some(JobStatus::InProgress));
        assert!(store.get_content(id).is_none());

        store.save_content(id, report("https://a.test"));
        store.update_job_status(id, JobStatus::Completed);

        assert_eq!(store.get_job_status(id), Some(JobStatus::Completed));
        assert_eq!(store.get_content(id).unwrap().start_url, "https://a.test");
        assert_eq!(store.get_job(id).unwrap().url, "https://a.test");
    }

    #[test]
    fn unknown_jobs_are_absent() {
        let store = JobStore::new();
        store.update_job_status(42, JobStatus::Failed);
        assert!(store.get_job_status(42).is_none());
        assert!(store.get_content(42).is_none());
    }
}
