pub mod api;
pub mod client;
pub mod config;
pub mod crawler;
pub mod error;
pub mod preprocess;
pub mod robots;
pub mod scraper;
pub mod store;
pub mod tasks;

use std::sync::Arc;
use config::Config;
use crawler::Crawler;
use store::JobStore;
use tasks::TaskRegistry;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<JobStore>,
    pub tasks: Arc<TaskRegistry>,
    pub crawler: Arc<Crawler>,
}

impl AppState {
    pub fn new(config: Config) -> error::Result<Self> {
        let crawler = Crawler::new(config.crawl.clone())?;
        let tasks = TaskRegistry::with_retention(config.task_retention);
        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(JobStore::new()),
            tasks: Arc::new(tasks),
            crawler: Arc::new(crawler),
        })
    }
}
