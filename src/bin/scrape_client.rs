use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rust_site_scraper::{
    api::models::{download_filename, PreprocessingOptions},
    client::{
        FinalResult, HttpScrapeApi, ResultDelivery, ScrapeApi, ScrapeController, ScrapeForm,
        SubmitOutcome, TerminalView,
    },
    config::DeliveryMode,
    error::Result,
};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "scrape-client",
    version,
    about = "Submit a site to the scrape service and print what comes back"
)]
struct Cli {
    #[arg(value_name = "URL")]
    url: String,

    #[arg(long, value_name = "URL", env = "SCRAPE_SERVER", default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Must match the server's DELIVERY_MODE
    #[arg(long, env = "DELIVERY_MODE", default_value = "immediate")]
    delivery: DeliveryMode,

    #[arg(long, value_name = "MS", default_value_t = 2000, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_ms: u64,

    #[arg(long, value_name = "USER", requires = "auth_password")]
    auth_user: Option<String>,

    #[arg(long, value_name = "PASSWORD", requires = "auth_user")]
    auth_password: Option<String>,

    #[arg(long, default_value_t = false)]
    no_clean_html: bool,

    #[arg(long, default_value_t = false)]
    keep_special_chars: bool,

    #[arg(long, default_value_t = false)]
    keep_whitespace: bool,

    #[arg(long, default_value_t = false)]
    remove_stopwords: bool,

    /// Print every page instead of paging through them
    #[arg(long, default_value_t = false)]
    all: bool,

    /// Directory to save the downloaded results into
    #[arg(long, value_name = "DIR")]
    save: Option<PathBuf>,
}

impl Cli {
    fn form(&self) -> ScrapeForm {
        let mut form = ScrapeForm::new(self.url.clone());
        form.preprocessing = PreprocessingOptions {
            clean_html: !self.no_clean_html,
            remove_special_chars: !self.keep_special_chars,
            remove_extra_whitespace: !self.keep_whitespace,
            remove_stopwords: self.remove_stopwords,
        };
        match (&self.auth_user, &self.auth_password) {
            (Some(user), Some(password)) => form.with_auth(user.clone(), password.clone()),
            _ => form,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let api = HttpScrapeApi::new(&cli.server)?;
    let delivery = ResultDelivery::from_mode(cli.delivery, Duration::from_millis(cli.poll_interval_ms));
    let view = TerminalView::new(io::stdout(), cli.server.clone());
    let mut controller = ScrapeController::new(api, view, delivery);

    let result = match controller.submit(&cli.form()).await {
        SubmitOutcome::Completed(result) => result,
        SubmitOutcome::Rejected | SubmitOutcome::Failed(_) => return Ok(false),
    };

    if cli.all {
        while controller.show_more() {}
    } else if io::stdin().is_terminal() {
        page_interactively(&mut controller)?;
    }

    if let Some(dir) = &cli.save {
        save_results(controller.api(), &result, dir).await?;
    }

    Ok(true)
}

fn page_interactively<A, W>(controller: &mut ScrapeController<A, TerminalView<W>>) -> Result<()>
where
    A: ScrapeApi,
    W: Write,
{
    let stdin = io::stdin();
    let mut input = String::new();
    while controller.content().is_some_and(|content| content.show_more_visible()) {
        eprint!("Press Enter to show more, q to stop: ");
        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 || input.trim().eq_ignore_ascii_case("q") {
            break;
        }
        controller.show_more();
    }
    Ok(())
}

/// Writes the formatted payload when the response carried one, otherwise
/// fetches the job's results from the server.
async fn save_results(api: &impl ScrapeApi, result: &FinalResult, dir: &Path) -> Result<()> {
    let Some(job_id) = result.job_id else {
        info!("No job id in the result; nothing to save");
        return Ok(());
    };
    if result.content.is_empty() && result.formatted_content.is_none() {
        info!("No content was scraped; nothing to save");
        return Ok(());
    }

    let bytes = match &result.formatted_content {
        Some(payload) => payload.clone().into_bytes(),
        None => api.download(job_id).await?,
    };

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(download_filename(job_id));
    tokio::fs::write(&path, bytes).await?;
    println!("Saved results to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_must_be_positive() {
        let parsed = Cli::try_parse_from(["scrape-client", "https://x.test", "--poll-interval-ms", "0"]);
        assert!(parsed.is_err());

        let cli = Cli::try_parse_from(["scrape-client", "https://x.test", "--poll-interval-ms", "250"]).unwrap();
        assert_eq!(cli.poll_interval_ms, 250);
    }

    #[test]
    fn auth_flags_come_in_pairs() {
        assert!(Cli::try_parse_from(["scrape-client", "https://x.test", "--auth-user", "ada"]).is_err());

        let cli = Cli::try_parse_from([
            "scrape-client",
            "https://x.test",
            "--auth-user",
            "ada",
            "--auth-password",
            "s3cret",
            "--remove-stopwords",
        ])
        .unwrap();
        let form = cli.form();
        assert!(form.requires_auth);
        assert!(form.preprocessing.remove_stopwords);
        assert!(form.preprocessing.clean_html);
    }
}
