use crate::api::models::PageContent;

pub const PAGE_BATCH: usize = 5;
pub const PREVIEW_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOffer {
    /// Results the server keeps for a job, fetched from `/download/{job_id}`.
    Server { job_id: u64 },
    /// A payload the response already carried, saved as-is.
    File { filename: String, payload: String },
}

impl DownloadOffer {
    pub fn label(&self) -> String {
        match self {
            DownloadOffer::Server { job_id } => format!("/download/{}", job_id),
            DownloadOffer::File { filename, .. } => filename.clone(),
        }
    }
}

/// Errors plus a list of scraped pages revealed in batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentView {
    pages: Vec<PageContent>,
    errors: Vec<String>,
    visible: usize,
    download: Option<DownloadOffer>,
}

impl ContentView {
    pub fn new(pages: Vec<PageContent>, errors: Vec<String>, job_id: Option<u64>) -> Self {
        let download = if pages.is_empty() {
            None
        } else {
            job_id.map(|job_id| DownloadOffer::Server { job_id })
        };
        Self {
            visible: pages.len().min(PAGE_BATCH),
            pages,
            errors,
            download,
        }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_content(&self) -> bool {
        !self.pages.is_empty()
    }

    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn visible_pages(&self) -> &[PageContent] {
        &self.pages[..self.visible]
    }

    /// Whether the "Show More" control is displayed.
    pub fn show_more_visible(&self) -> bool {
        self.visible < self.pages.len()
    }

    /// Reveals the next batch; returns how many pages became visible.
    pub fn show_more(&mut self) -> usize {
        let next = (self.visible + PAGE_BATCH).min(self.pages.len());
        let revealed = next - self.visible;
        self.visible = next;
        revealed
    }

    pub fn download(&self) -> Option<&DownloadOffer> {
        self.download.as_ref()
    }

    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = vec!["Scraping Results:".to_string()];

        if !self.errors.is_empty() {
            lines.push("Errors:".to_string());
            lines.extend(self.errors.iter().map(|error| format!("  - {}", error)));
        }

        if !self.has_content() {
            lines.push("No content was scraped.".to_string());
            return lines;
        }

        lines.push("Scraped Content:".to_string());
        for (i, page) in self.visible_pages().iter().enumerate() {
            lines.push(format!("Page {}: {}", i + 1, page.url));
            lines.push(format!("  {}", preview(&page.content)));
        }
        if self.show_more_visible() {
            lines.push(format!("[Show More] ({} of {} shown)", self.visible, self.pages.len()));
        }
        if let Some(offer) = &self.download {
            lines.push(format!("[Download Results] {}", offer.label()));
        }

        lines
    }
}

/// First characters of a page followed by an ellipsis.
pub fn preview(content: &str) -> String {
    let mut text: String = content.chars().take(PREVIEW_CHARS).collect();
    text.push_str("...");
    text
}
