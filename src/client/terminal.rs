use std::io::Write;
use tracing::warn;

use crate::client::content::{ContentView, DownloadOffer};
use crate::client::tree::TreeView;
use crate::client::view::{ScrapeView, StatusTone};

/// Line-oriented view for terminals and pipes.
pub struct TerminalView<W: Write> {
    out: W,
    expand_trees: bool,
    base_url: String,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, base_url: impl Into<String>) -> Self {
        Self {
            out,
            expand_trees: true,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Print trees as the controller holds them instead of fully expanded.
    pub fn collapsed_trees(mut self) -> Self {
        self.expand_trees = false;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            warn!("Failed to write to terminal: {}", e);
        }
    }
}

impl<W: Write> ScrapeView for TerminalView<W> {
    fn alert(&mut self, message: &str) {
        self.line(&format!("! {}", message));
    }

    fn set_submit_enabled(&mut self, _enabled: bool) {}

    fn set_status(&mut self, text: &str, tone: StatusTone) {
        let tag = match tone {
            StatusTone::InProgress => "working",
            StatusTone::Success => "done",
            StatusTone::Error => "failed",
        };
        self.line(&format!("[{}] {}", tag, text));
    }

    fn clear_results(&mut self) {}

    fn render_tree(&mut self, tree: &TreeView) {
        let lines = if self.expand_trees {
            let mut expanded = tree.clone();
            expanded.expand_all();
            expanded.render_lines()
        } else {
            tree.render_lines()
        };

        self.line("URL tree:");
        for line in lines {
            self.line(&format!("  {}", line));
        }
    }

    fn render_content(&mut self, content: &ContentView) {
        let server_job = match content.download() {
            Some(DownloadOffer::Server { job_id }) => Some(*job_id),
            _ => None,
        };

        for line in content.render_lines() {
            match server_job {
                Some(job_id) if line.starts_with("[Download Results]") => {
                    let link = format!("[Download Results] {}/download/{}", self.base_url, job_id);
                    self.line(&link);
                }
                _ => self.line(&line),
            }
        }
    }

    fn offer_download(&mut self, offer: &DownloadOffer) {
        match offer {
            DownloadOffer::Server { job_id } => {
                self.line(&format!("Download: {}/download/{}", self.base_url, job_id))
            }
            DownloadOffer::File { filename, payload } => self.line(&format!(
                "Formatted results ready as {} ({} bytes)",
                filename,
                payload.len()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{PageContent, TreeNode};

    fn output(view: TerminalView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn status_lines_are_tagged() {
        let mut view = TerminalView::new(Vec::new(), "http://localhost:3000/");
        view.set_status("Scraping in progress...", StatusTone::InProgress);
        view.set_status("Error: boom", StatusTone::Error);
        view.alert("Please enter a valid URL");
        assert_eq!(
            output(view),
            "[working] Scraping in progress...\n[failed] Error: boom\n! Please enter a valid URL\n"
        );
    }

    #[test]
    fn trees_print_expanded_by_default() {
        let tree = TreeView::new(TreeNode::with_children("/", vec![TreeNode::new("/a")]));

        let mut view = TerminalView::new(Vec::new(), "http://localhost:3000");
        view.render_tree(&tree);
        assert_eq!(output(view), "URL tree:\n  ▾ /\n    • /a\n");

        let mut view = TerminalView::new(Vec::new(), "http://localhost:3000").collapsed_trees();
        view.render_tree(&tree);
        assert_eq!(output(view), "URL tree:\n  ▸ /\n");
    }

    #[test]
    fn download_link_points_at_the_server() {
        let content = ContentView::new(
            vec![PageContent {
                url: "https://x.test/".into(),
                content: "hi".into(),
            }],
            vec![],
            Some(4),
        );
        let mut view = TerminalView::new(Vec::new(), "http://localhost:3000");
        view.render_content(&content);
        assert!(output(view).ends_with("[Download Results] http://localhost:3000/download/4\n"));
    }
}
