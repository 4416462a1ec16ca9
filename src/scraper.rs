use reqwest::{Client, ClientBuilder};
use scraper::{Html, Selector};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use url::Url;

use crate::api::models::AuthCredentials;
use crate::config::CrawlSettings;
use crate::error::{AppError, Result};

// Create static selectors to avoid recompiling them each time
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a[href]").expect("Failed to parse link selector")
});

/// HTTP client shared by every fetch of one crawler.
pub fn build_client(settings: &CrawlSettings) -> Result<Client> {
    ClientBuilder::new()
        .user_agent(settings.user_agent.clone())
        .timeout(settings.request_timeout)
        .connect_timeout(settings.request_timeout.min(std::time::Duration::from_secs(5)))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

pub async fn fetch_html(client: &Client, url: &Url, auth: Option<&AuthCredentials>) -> Result<String> {
    let mut request = client.get(url.clone());
    if let Some(auth) = auth {
        request = request.basic_auth(&auth.username, Some(&auth.password));
    }

    let response = request.send().await?.error_for_status()?;
    let html = response.text().await?;
    Ok(html)
}

/// Absolute http(s) links of a page, fragments removed, first occurrence wins.
pub fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    document
        .select(&LINK_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .filter(|url| seen.insert(url.as_str().to_string()))
        .collect()
}

/// Host plus explicit port, the part of a URL that decides "same site".
pub fn authority(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

pub fn is_same_domain(url: &Url, domain: &str) -> bool {
    authority(url) == domain
}
