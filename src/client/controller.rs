use tracing::{info, warn};

use crate::api::models::{download_filename, ScrapeRequest, DEFAULT_MAX_WORKERS};
use crate::client::api::ScrapeApi;
use crate::client::content::{ContentView, DownloadOffer};
use crate::client::delivery::{DeliveryEvent, FinalResult, ResultDelivery};
use crate::client::form::ScrapeForm;
use crate::client::tree::TreeView;
use crate::client::view::{ScrapeView, StatusTone};
use crate::error::Result;

const INVALID_URL: &str = "Please enter a valid URL";
const IN_PROGRESS: &str = "Scraping in progress...";
const COMPLETED: &str = "Scraping completed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The form was rejected before anything was sent.
    Rejected,
    Completed(FinalResult),
    Failed(String),
}

/// Drives one view through submit → deliver → render cycles.
///
/// `submit` borrows the controller mutably for the whole cycle, so a second
/// submission cannot start while one is in flight.
pub struct ScrapeController<A, V> {
    api: A,
    view: V,
    delivery: ResultDelivery,
    max_workers: usize,
    submit_enabled: bool,
    tree: Option<TreeView>,
    content: Option<ContentView>,
}

impl<A: ScrapeApi, V: ScrapeView> ScrapeController<A, V> {
    pub fn new(api: A, view: V, delivery: ResultDelivery) -> Self {
        Self {
            api,
            view,
            delivery,
            max_workers: DEFAULT_MAX_WORKERS,
            submit_enabled: true,
            tree: None,
            content: None,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    pub fn tree(&self) -> Option<&TreeView> {
        self.tree.as_ref()
    }

    pub fn content(&self) -> Option<&ContentView> {
        self.content.as_ref()
    }

    pub async fn submit(&mut self, form: &ScrapeForm) -> SubmitOutcome {
        let Some(request) = form.to_request(self.max_workers) else {
            self.view.alert(INVALID_URL);
            return SubmitOutcome::Rejected;
        };

        self.set_submit_enabled(false);
        self.view.set_status(IN_PROGRESS, StatusTone::InProgress);
        self.tree = None;
        self.content = None;
        self.view.clear_results();

        let outcome = match self.run(&request).await {
            Ok(result) => {
                info!("Scrape of {} completed with {} pages", request.url, result.content.len());
                self.view.set_status(COMPLETED, StatusTone::Success);
                self.render(&result);
                SubmitOutcome::Completed(result)
            }
            Err(e) => {
                warn!("Scrape of {} failed: {}", request.url, e);
                self.view.set_status(&format!("Error: {}", e), StatusTone::Error);
                SubmitOutcome::Failed(e.to_string())
            }
        };

        self.set_submit_enabled(true);
        outcome
    }

    /// Reveals the next batch of pages, if the control is showing.
    pub fn show_more(&mut self) -> bool {
        let Some(content) = self.content.as_mut() else {
            return false;
        };
        if !content.show_more_visible() {
            return false;
        }
        content.show_more();
        self.view.render_content(content);
        true
    }

    pub fn toggle_tree(&mut self, path: &[usize]) -> bool {
        let Some(tree) = self.tree.as_mut() else {
            return false;
        };
        let changed = tree.toggle(path);
        if changed {
            self.view.render_tree(tree);
        }
        changed
    }

    async fn run(&mut self, request: &ScrapeRequest) -> Result<FinalResult> {
        let submitted = self.api.submit(request).await?;

        let view = &mut self.view;
        let tree = &mut self.tree;
        let mut on_event = |event: DeliveryEvent| match event {
            DeliveryEvent::Status(text) => view.set_status(&text, StatusTone::InProgress),
            DeliveryEvent::Tree(node) => {
                let rendered = tree.insert(TreeView::new(node));
                view.render_tree(rendered);
            }
        };

        self.delivery.deliver(&self.api, submitted, &mut on_event).await
    }

    fn render(&mut self, result: &FinalResult) {
        if let Some(node) = &result.url_tree {
            let tree = self.tree.insert(TreeView::new(node.clone()));
            self.view.render_tree(tree);
        }

        let content = self.content.insert(ContentView::new(
            result.content.clone(),
            result.errors.clone(),
            result.job_id,
        ));
        self.view.render_content(content);

        if let (Some(payload), Some(job_id)) = (&result.formatted_content, result.job_id) {
            self.view.offer_download(&DownloadOffer::File {
                filename: download_filename(job_id),
                payload: payload.clone(),
            });
        }
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        self.submit_enabled = enabled;
        self.view.set_submit_enabled(enabled);
    }
}
