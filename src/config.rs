use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

/// How a deployment hands scrape results back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// `POST /scrape` blocks until the crawl is done and returns the result.
    #[default]
    Immediate,
    /// `POST /scrape` returns a task id; callers poll `/task_status/{id}`.
    Polled,
    /// `POST /scrape` returns a task id; callers subscribe to `/scrape_updates/{id}`.
    Streamed,
}

impl FromStr for DeliveryMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" | "sync" => Ok(DeliveryMode::Immediate),
            "polled" | "poll" => Ok(DeliveryMode::Polled),
            "streamed" | "stream" | "sse" => Ok(DeliveryMode::Streamed),
            other => Err(AppError::ConfigError(format!("Unknown delivery mode: {}", other))),
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeliveryMode::Immediate => "immediate",
            DeliveryMode::Polled => "polled",
            DeliveryMode::Streamed => "streamed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub delivery_mode: DeliveryMode,
    pub crawl: CrawlSettings,
    /// Upper bound for an inline (immediate mode) scrape.
    pub scrape_timeout: Duration,
    /// How long finished background tasks stay queryable.
    pub task_retention: Duration,
}

/// Knobs the crawler reads for every job.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub max_pages: usize,
    pub ignore_robots: bool,
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_pages: 10,
            ignore_robots: true,
            request_delay: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(10),
            user_agent: "LLMTrainingBot/1.0".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or("PORT", lookup("PORT"), 3000u16)?;
        let ip = IpAddr::from_str(&host)
            .map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let delivery_mode = match lookup("DELIVERY_MODE") {
            Some(raw) => raw.parse()?,
            None => DeliveryMode::default(),
        };

        let defaults = CrawlSettings::default();
        let crawl = CrawlSettings {
            max_pages: parse_or("MAX_PAGES", lookup("MAX_PAGES"), defaults.max_pages)?,
            ignore_robots: parse_or("IGNORE_ROBOTS", lookup("IGNORE_ROBOTS"), defaults.ignore_robots)?,
            request_delay: Duration::from_millis(parse_or(
                "REQUEST_DELAY_MS",
                lookup("REQUEST_DELAY_MS"),
                defaults.request_delay.as_millis() as u64,
            )?),
            request_timeout: Duration::from_secs(parse_or(
                "REQUEST_TIMEOUT_SECS",
                lookup("REQUEST_TIMEOUT_SECS"),
                defaults.request_timeout.as_secs(),
            )?),
            user_agent: lookup("USER_AGENT").unwrap_or(defaults.user_agent),
        };

        let scrape_timeout = Duration::from_secs(parse_or(
            "SCRAPE_TIMEOUT_SECS",
            lookup("SCRAPE_TIMEOUT_SECS"),
            90u64,
        )?);

        let task_retention = Duration::from_secs(parse_or(
            "TASK_RETENTION_SECS",
            lookup("TASK_RETENTION_SECS"),
            600u64,
        )?);

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            delivery_mode,
            crawl,
            scrape_timeout,
            task_retention,
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}
