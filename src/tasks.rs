//! Background scrape tasks.
//!
//! Every task owns a `watch` channel holding its latest snapshot. The status
//! endpoint reads the current value; the update stream follows changes.
//! Finished tasks are dropped once the retention period has passed; their
//! reports stay in the job store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::models::{ScrapeUpdate, TaskResult, TaskState, TaskStatus, TreeNode, UpdateStatus};
use crate::crawler::{CrawlJob, CrawlProgress, Crawler, ProgressSink};
use crate::store::{JobStatus, JobStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub state: TaskState,
    pub status: String,
    pub pages_scraped: usize,
    pub url_tree: Option<TreeNode>,
    pub result: Option<TaskResult>,
    pub message: Option<String>,
}

impl TaskSnapshot {
    fn pending() -> Self {
        Self {
            state: TaskState::Pending,
            status: "Task is waiting to start".to_string(),
            pages_scraped: 0,
            url_tree: None,
            result: None,
            message: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn to_status(&self) -> TaskStatus {
        TaskStatus {
            state: self.state,
            status: self.status.clone(),
            result: self.result.clone(),
        }
    }

    pub fn to_update(&self) -> ScrapeUpdate {
        let status = match self.state {
            TaskState::Pending => UpdateStatus::Started,
            TaskState::Progress => UpdateStatus::Progress,
            TaskState::Success => UpdateStatus::Completed,
            TaskState::Failure | TaskState::Unknown => UpdateStatus::Error,
        };
        ScrapeUpdate {
            status,
            pages_scraped: self.pages_scraped,
            url_tree: self.url_tree.clone(),
            result: self.result.clone(),
            message: self.message.clone(),
        }
    }
}

pub const DEFAULT_TASK_RETENTION: Duration = Duration::from_secs(600);

#[derive(Debug)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<String, Arc<watch::Sender<TaskSnapshot>>>>,
    retention: Duration,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::with_retention(DEFAULT_TASK_RETENTION)
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long a finished task stays readable.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            retention,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forgets a task. Receivers already handed out keep their last value.
    pub fn remove(&self, task_id: &str) -> bool {
        self.lock().remove(task_id).is_some()
    }

    /// Removes the task once the retention period has elapsed.
    pub fn expire_after_retention(self: &Arc<Self>, task_id: &str) {
        let registry = Arc::clone(self);
        let task_id = task_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(registry.retention).await;
            if registry.remove(&task_id) {
                debug!("Evicted finished task {}", task_id);
            }
        });
    }

    pub fn create(&self) -> String {
        let task_id = Uuid::new_v4().to_string();
        let (tx, _rx) = watch::channel(TaskSnapshot::pending());
        self.lock().insert(task_id.clone(), Arc::new(tx));
        task_id
    }

    pub fn snapshot(&self, task_id: &str) -> Option<TaskSnapshot> {
        self.sender(task_id).map(|tx| tx.borrow().clone())
    }

    pub fn subscribe(&self, task_id: &str) -> Option<watch::Receiver<TaskSnapshot>> {
        self.sender(task_id).map(|tx| tx.subscribe())
    }

    pub fn publish(&self, task_id: &str, snapshot: TaskSnapshot) {
        match self.sender(task_id) {
            Some(tx) => {
                tx.send_replace(snapshot);
            }
            None => warn!("Dropping update for unknown task {}", task_id),
        }
    }

    fn sender(&self, task_id: &str) -> Option<Arc<watch::Sender<TaskSnapshot>>> {
        self.lock().get(task_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<watch::Sender<TaskSnapshot>>>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Republishes crawl progress as task snapshots.
struct TaskProgress<'a> {
    registry: &'a TaskRegistry,
    task_id: &'a str,
}

impl ProgressSink for TaskProgress<'_> {
    fn page_done(&self, progress: CrawlProgress) {
        self.registry.publish(
            self.task_id,
            TaskSnapshot {
                state: TaskState::Progress,
                status: format!("{} pages scraped", progress.pages_scraped),
                pages_scraped: progress.pages_scraped,
                url_tree: Some(progress.url_tree),
                result: None,
                message: None,
            },
        );
    }
}

/// Runs one scrape job to completion, recording the outcome in both the job
/// store and the task registry.
pub async fn run_scrape_task(
    crawler: Arc<Crawler>,
    store: Arc<JobStore>,
    registry: Arc<TaskRegistry>,
    task_id: String,
    job_id: u64,
    job: CrawlJob,
) {
    registry.publish(
        &task_id,
        TaskSnapshot {
            state: TaskState::Progress,
            status: "started".to_string(),
            ..TaskSnapshot::pending()
        },
    );

    let sink = TaskProgress {
        registry: &registry,
        task_id: &task_id,
    };

    match crawler.crawl(&job, &sink).await {
        Ok(report) => {
            let result = TaskResult::from_report(job_id, &report);
            let snapshot = TaskSnapshot {
                state: TaskState::Success,
                status: "completed".to_string(),
                pages_scraped: report.total_pages_scraped,
                url_tree: Some(report.url_tree.clone()),
                result: Some(result),
                message: None,
            };
            store.save_content(job_id, report);
            store.update_job_status(job_id, JobStatus::Completed);
            info!("Task {} (job {}) {}", task_id, job_id, JobStatus::Completed.as_str());
            registry.publish(&task_id, snapshot);
        }
        Err(e) => {
            warn!("Task {} (job {}) {}: {}", task_id, job_id, JobStatus::Failed.as_str(), e);
            store.update_job_status(job_id, JobStatus::Failed);
            let last = registry.snapshot(&task_id).unwrap_or_else(TaskSnapshot::pending);
            registry.publish(
                &task_id,
                TaskSnapshot {
                    state: TaskState::Failure,
                    status: "error".to_string(),
                    message: Some(e.to_string()),
                    ..last
                },
            );
        }
    }

    registry.expire_after_retention(&task_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tasks_are_pending() {
        let registry = TaskRegistry::new();
        let id = registry.create();
        let snapshot = registry.snapshot(&id).unwrap();
        assert_eq!(snapshot.state, TaskState::Pending);
        assert_eq!(snapshot.to_update().status, UpdateStatus::Started);
        assert!(registry.snapshot("missing").is_none());
    }

    #[test]
    fn subscribers_see_the_latest_snapshot() {
        let registry = TaskRegistry::new();
        let id = registry.create();
        let rx = registry.subscribe(&id).unwrap();

        registry.publish(
            &id,
            TaskSnapshot {
                state: TaskState::Success,
                status: "completed".into(),
                ..TaskSnapshot::pending()
            },
        );

        let latest = rx.borrow().clone();
        assert!(latest.is_finished());
        assert_eq!(latest.to_status().state, TaskState::Success);
        assert_eq!(latest.to_update().status, UpdateStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_tasks_expire_after_retention() {
        let registry = Arc::new(TaskRegistry::with_retention(Duration::from_secs(30)));
        let id = registry.create();
        let kept = registry.create();
        let rx = registry.subscribe(&id).unwrap();

        registry.expire_after_retention(&id);
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(registry.snapshot(&id).is_some());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(registry.snapshot(&id).is_none());
        assert!(registry.snapshot(&kept).is_some());
        assert_eq!(registry.len(), 1);
        assert_eq!(rx.borrow().state, TaskState::Pending);
    }

    #[test]
    fn failures_map_to_error_updates() {
        let snapshot = TaskSnapshot {
            state: TaskState::Failure,
            message: Some("boom".into()),
            ..TaskSnapshot::pending()
        };
        let update = snapshot.to_update();
        assert_eq!(update.status, UpdateStatus::Error);
        assert_eq!(update.message.as_deref(), Some("boom"));
    }
}
