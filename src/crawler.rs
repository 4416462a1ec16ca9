//! Same-site crawler.
//!
//! Pages are visited level by level starting from the job's URL. Each level is
//! fetched with up to `max_workers` requests in flight, and results are taken
//! in discovery order so reports are stable between runs. A level is split
//! into chunks no larger than the remaining page budget; failed fetches leave
//! the budget untouched for the rest of the level.

use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};
use url::Url;

use crate::api::models::{
    AuthCredentials, PageContent, PreprocessingOptions, ScrapeReport, ScrapeRequest, SkippedUrl,
    TreeNode,
};
use crate::config::CrawlSettings;
use crate::error::{AppError, Result};
use crate::preprocess::preprocess;
use crate::robots::{self, RobotsRules};
use crate::scraper::{authority, build_client, extract_links, fetch_html, is_same_domain};

const SKIP_ROBOTS: &str = "Not allowed by robots.txt";
const SKIP_MAX_PAGES: &str = "Max pages reached";

/// Snapshot sent after every attempted page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlProgress {
    pub pages_attempted: usize,
    pub pages_scraped: usize,
    pub url_tree: TreeNode,
}

pub trait ProgressSink: Send + Sync {
    fn page_done(&self, progress: CrawlProgress);
}

/// Sink for callers that only want the final report.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn page_done(&self, _progress: CrawlProgress) {}
}

/// What to crawl and how, resolved from a request and the service settings.
#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub start_url: String,
    pub max_pages: usize,
    pub max_workers: usize,
    pub ignore_robots: bool,
    pub auth: Option<AuthCredentials>,
    pub preprocessing: PreprocessingOptions,
}

impl CrawlJob {
    pub fn from_request(req: &ScrapeRequest, settings: &CrawlSettings) -> Self {
        Self {
            start_url: req.url.trim().to_string(),
            max_pages: settings.max_pages,
            max_workers: req.max_workers.max(1),
            ignore_robots: settings.ignore_robots,
            auth: req.auth.clone(),
            preprocessing: req.preprocessing_options.clone().unwrap_or_default(),
        }
    }
}

pub struct Crawler {
    client: Client,
    settings: CrawlSettings,
}

impl Crawler {
    pub fn new(settings: CrawlSettings) -> Result<Self> {
        let client = build_client(&settings)?;
        Ok(Self { client, settings })
    }

    pub async fn crawl(&self, job: &CrawlJob, sink: &dyn ProgressSink) -> Result<ScrapeReport> {
        let start = parse_start_url(&job.start_url)?;
        let domain = authority(&start);
        info!("Starting scrape of {}", start);

        let robots = if job.ignore_robots {
            RobotsRules::allow_all()
        } else {
            robots::fetch_rules(&self.client, &start).await
        };

        let mut tree = UrlTree::default();
        let mut seen: HashSet<String> = HashSet::from([start.as_str().to_string()]);
        let mut frontier: Vec<(Url, Option<usize>)> = vec![(start.clone(), None)];

        let mut content = Vec::new();
        let mut errors = Vec::new();
        let mut skipped_urls = Vec::new();
        let mut pages_scraped = 0usize;

        while !frontier.is_empty() {
            let mut pending = VecDeque::new();
            for (url, parent) in frontier.drain(..) {
                if robots.allows(&url) {
                    pending.push_back((url, parent));
                } else {
                    debug!("Skipping {}: {}", url, SKIP_ROBOTS);
                    skipped_urls.push(skipped(&url, SKIP_ROBOTS));
                }
            }

            let mut next_frontier = Vec::new();
            // Only successful pages count against the budget, so a chunk never
            // asks for more pages than are still allowed.
            while !pending.is_empty() && pages_scraped < job.max_pages {
                let take = (job.max_pages - pages_scraped).min(pending.len());
                let chunk: Vec<_> = pending.drain(..take).collect();

                let mut fetches = stream::iter(chunk)
                    .map(|(url, parent)| async move {
                        if !self.settings.request_delay.is_zero() {
                            tokio::time::sleep(self.settings.request_delay).await;
                        }
                        let fetched = fetch_html(&self.client, &url, job.auth.as_ref()).await;
                        (url, parent, fetched)
                    })
                    .buffered(job.max_workers.max(1));

                while let Some((url, parent, fetched)) = fetches.next().await {
                    let node = tree.add(parent, url.as_str());

                    match fetched {
                        Ok(html) => {
                            debug!("Scraped {} ({} bytes)", url, html.len());
                            for link in extract_links(&html, &url) {
                                if is_same_domain(&link, &domain) && seen.insert(link.as_str().to_string()) {
                                    next_frontier.push((link, Some(node)));
                                }
                            }
                            content.push(PageContent {
                                url: url.to_string(),
                                content: preprocess(&html, &job.preprocessing),
                            });
                            pages_scraped += 1;
                        }
                        Err(e) => {
                            let message = format!("Error scraping {}: {}", url, e);
                            warn!("{}", message);
                            errors.push(message);
                        }
                    }

                    sink.page_done(CrawlProgress {
                        pages_attempted: tree.len(),
                        pages_scraped,
                        url_tree: tree.snapshot(start.as_str()),
                    });
                }
            }

            for (url, _) in pending {
                debug!("Skipping {}: {}", url, SKIP_MAX_PAGES);
                skipped_urls.push(skipped(&url, SKIP_MAX_PAGES));
            }

            frontier = next_frontier;
        }

        info!(
            "Finished scrape of {}: {} scraped, {} errors, {} skipped",
            start,
            pages_scraped,
            errors.len(),
            skipped_urls.len()
        );

        Ok(ScrapeReport {
            start_url: job.start_url.clone(),
            total_pages_attempted: tree.len(),
            total_pages_scraped: pages_scraped,
            content,
            errors,
            skipped_urls,
            url_tree: tree.snapshot(start.as_str()),
        })
    }
}

pub fn parse_start_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| AppError::ValidationError(format!("Invalid URL {}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::ValidationError(format!("Unsupported URL scheme: {}", url.scheme())));
    }
    Ok(url)
}

fn skipped(url: &Url, reason: &str) -> SkippedUrl {
    SkippedUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

/// Discovery tree kept as an arena while the crawl mutates it.
#[derive(Debug, Default)]
struct UrlTree {
    nodes: Vec<ArenaNode>,
}

#[derive(Debug)]
struct ArenaNode {
    url: String,
    children: Vec<usize>,
}

impl UrlTree {
    fn add(&mut self, parent: Option<usize>, url: &str) -> usize {
        let index = self.nodes.len();
        self.nodes.push(ArenaNode {
            url: url.to_string(),
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(index);
        }
        index
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Root is always node 0. A crawl whose start page was skipped still has
    /// a one-node tree for the start URL.
    fn snapshot(&self, start_url: &str) -> TreeNode {
        if self.nodes.is_empty() {
            return TreeNode::new(start_url);
        }
        self.build(0)
    }

    fn build(&self, index: usize) -> TreeNode {
        let node = &self.nodes[index];
        TreeNode::with_children(
            node.url.clone(),
            node.children.iter().map(|&child| self.build(child)).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_snapshot_keeps_child_order() {
        let mut tree = UrlTree::default();
        let root = tree.add(None, "r");
        let a = tree.add(Some(root), "a");
        tree.add(Some(root), "b");
        tree.add(Some(a), "c");

        let snapshot = tree.snapshot("r");
        assert_eq!(
            snapshot,
            TreeNode::with_children(
                "r",
                vec![
                    TreeNode::with_children("a", vec![TreeNode::new("c")]),
                    TreeNode::new("b"),
                ]
            )
        );
    }

    #[test]
    fn empty_arena_falls_back_to_start_url() {
        assert_eq!(UrlTree::default().snapshot("https://x.test/"), TreeNode::new("https://x.test/"));
    }

    #[test]
    fn start_url_must_be_http() {
        assert!(matches!(parse_start_url("ftp://x.test"), Err(AppError::ValidationError(_))));
        assert!(matches!(parse_start_url("not a url"), Err(AppError::ValidationError(_))));
        assert!(parse_start_url("https://x.test/path").is_ok());
    }

    #[test]
    fn job_takes_limits_from_settings() {
        let req = ScrapeRequest {
            url: "  https://x.test  ".into(),
            max_workers: 0,
            preprocessing_options: None,
            auth: None,
        };
        let job = CrawlJob::from_request(&req, &CrawlSettings::default());
        assert_eq!(job.start_url, "https://x.test");
        assert_eq!(job.max_workers, 1);
        assert_eq!(job.max_pages, 10);
        assert_eq!(job.preprocessing, PreprocessingOptions::default());
    }
}
