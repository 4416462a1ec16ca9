use crate::client::content::{ContentView, DownloadOffer};
use crate::client::tree::TreeView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    InProgress,
    Success,
    Error,
}

/// Whatever displays the controller's state: a terminal, a test recorder.
pub trait ScrapeView {
    fn alert(&mut self, message: &str);

    fn set_submit_enabled(&mut self, enabled: bool);

    fn set_status(&mut self, text: &str, tone: StatusTone);

    /// Empties the tree and content areas before a new submission.
    fn clear_results(&mut self);

    fn render_tree(&mut self, tree: &TreeView);

    fn render_content(&mut self, content: &ContentView);

    fn offer_download(&mut self, offer: &DownloadOffer);
}
