//! Wire types shared by the service and the client controller.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_WORKERS: usize = 5;

/// File name used for a job's downloadable results.
pub fn download_filename(job_id: u64) -> String {
    format!("scraped_content_{}.json", job_id)
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreprocessingOptions {
    #[serde(default = "enabled")]
    pub clean_html: bool,
    #[serde(default = "enabled")]
    pub remove_special_chars: bool,
    #[serde(default = "enabled")]
    pub remove_extra_whitespace: bool,
    #[serde(default)]
    pub remove_stopwords: bool,
}

impl Default for PreprocessingOptions {
    fn default() -> Self {
        Self {
            clean_html: true,
            remove_special_chars: true,
            remove_extra_whitespace: true,
            remove_stopwords: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessing_options: Option<PreprocessingOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthCredentials>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageContent {
    pub url: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedUrl {
    pub url: String,
    pub reason: String,
}

/// One URL of a crawl and the URLs first discovered from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeNode {
    pub url: String,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(url: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            url: url.into(),
            children,
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }
}

/// Everything a finished crawl produced. Stored per job and served by
/// `/show_content` and `/download`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapeReport {
    pub start_url: String,
    pub total_pages_attempted: usize,
    pub total_pages_scraped: usize,
    pub content: Vec<PageContent>,
    pub errors: Vec<String>,
    pub skipped_urls: Vec<SkippedUrl>,
    pub url_tree: TreeNode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStatus {
    Success,
    Completed,
    TaskStarted,
    Error,
}

/// Body of `POST /scrape`, discriminated by `status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapeResult {
    pub status: ScrapeStatus,
    #[serde(default)]
    pub content: Vec<PageContent>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_tree: Option<TreeNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages_attempted: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages_scraped: Option<usize>,
}

impl ScrapeResult {
    fn empty(status: ScrapeStatus) -> Self {
        Self {
            status,
            content: Vec::new(),
            errors: Vec::new(),
            job_id: None,
            task_id: None,
            url_tree: None,
            formatted_content: None,
            message: None,
            total_pages_attempted: None,
            total_pages_scraped: None,
        }
    }

    pub fn completed(job_id: u64, report: ScrapeReport, formatted_content: String) -> Self {
        Self {
            content: report.content,
            errors: report.errors,
            job_id: Some(job_id),
            url_tree: Some(report.url_tree),
            formatted_content: Some(formatted_content),
            total_pages_attempted: Some(report.total_pages_attempted),
            total_pages_scraped: Some(report.total_pages_scraped),
            ..Self::empty(ScrapeStatus::Completed)
        }
    }

    pub fn task_started(task_id: String, job_id: u64) -> Self {
        Self {
            task_id: Some(task_id),
            job_id: Some(job_id),
            ..Self::empty(ScrapeStatus::TaskStarted)
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::empty(ScrapeStatus::Error)
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Progress,
    Success,
    Failure,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskState::Pending | TaskState::Progress)
    }
}

/// Final payload of a background task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<u64>,
    #[serde(default)]
    pub content: Vec<PageContent>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_tree: Option<TreeNode>,
}

impl TaskResult {
    pub fn from_report(job_id: u64, report: &ScrapeReport) -> Self {
        Self {
            job_id: Some(job_id),
            content: report.content.clone(),
            errors: report.errors.clone(),
            url_tree: Some(report.url_tree.clone()),
        }
    }
}

/// Body of `GET /task_status/{task_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    Started,
    Progress,
    Completed,
    Error,
}

/// One message of the `GET /scrape_updates/{task_id}` event stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapeUpdate {
    pub status: UpdateStatus,
    #[serde(default)]
    pub pages_scraped: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_tree: Option<TreeNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
