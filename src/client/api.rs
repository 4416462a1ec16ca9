use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{header, Client};
use tracing::debug;
use url::Url;

use crate::api::models::{ScrapeRequest, ScrapeResult, ScrapeUpdate, TaskStatus};
use crate::client::sse::SseDecoder;
use crate::error::{AppError, Result};

pub type UpdateStream = BoxStream<'static, Result<ScrapeUpdate>>;

/// The backend calls the controller needs.
#[async_trait]
pub trait ScrapeApi: Send + Sync {
    async fn submit(&self, request: &ScrapeRequest) -> Result<ScrapeResult>;

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus>;

    /// Opens the update stream of a task. Dropping the stream closes it.
    async fn scrape_updates(&self, task_id: &str) -> Result<UpdateStream>;

    async fn download(&self, job_id: u64) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct HttpScrapeApi {
    client: Client,
    base: Url,
}

impl HttpScrapeApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid server URL {}: {}", base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| AppError::ConfigError(format!("Invalid endpoint {}: {}", path, e)))
    }
}

#[async_trait]
impl ScrapeApi for HttpScrapeApi {
    async fn submit(&self, request: &ScrapeRequest) -> Result<ScrapeResult> {
        let url = self.endpoint("scrape")?;
        debug!("POST {} for {}", url, request.url);

        let response = self.client.post(url).json(request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        // Failures still carry a ScrapeResult-shaped body; fall back to the
        // HTTP status only when the body is not one.
        match serde_json::from_slice::<ScrapeResult>(&body) {
            Ok(result) => Ok(result),
            Err(_) if !status.is_success() => {
                Err(AppError::BackendError(format!("Server responded with {}", status)))
            }
            Err(e) => Err(AppError::ParseError(format!("Invalid scrape response: {}", e))),
        }
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus> {
        let url = self.endpoint(&format!("task_status/{}", task_id))?;
        let status = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<TaskStatus>()
            .await?;
        Ok(status)
    }

    async fn scrape_updates(&self, task_id: &str) -> Result<UpdateStream> {
        let url = self.endpoint(&format!("scrape_updates/{}", task_id))?;
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;

        let mut bytes = response.bytes_stream();
        let updates = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        for data in decoder.push(&chunk) {
                            yield serde_json::from_str::<ScrapeUpdate>(&data).map_err(AppError::from);
                        }
                    }
                    Err(e) => {
                        yield Err(AppError::StreamError(e.to_string()));
                        break;
                    }
                }
            }
        };

        Ok(updates.boxed())
    }

    async fn download(&self, job_id: u64) -> Result<Vec<u8>> {
        let url = self.endpoint(&format!("download/{}", job_id))?;
        let body = self.client.get(url).send().await?.error_for_status()?.bytes().await?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_keep_a_base_path() {
        let api = HttpScrapeApi::new("http://localhost:3000/scraper").unwrap();
        assert_eq!(
            api.endpoint("task_status/abc").unwrap().as_str(),
            "http://localhost:3000/scraper/task_status/abc"
        );

        let api = HttpScrapeApi::new("http://localhost:3000").unwrap();
        assert_eq!(api.endpoint("scrape").unwrap().as_str(), "http://localhost:3000/scrape");
    }

    #[test]
    fn bad_server_url_is_a_config_error() {
        assert!(matches!(HttpScrapeApi::new("not a url"), Err(AppError::ConfigError(_))));
    }
}
