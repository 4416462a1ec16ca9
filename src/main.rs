use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use rust_site_scraper::{
    config::Config,
    api::routes::create_router,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("rust_site_scraper=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    let config = Config::load()?;
    let server_addr = config.server_addr;
    info!(
        "Starting server on {} (delivery: {}, max pages: {})",
        server_addr, config.delivery_mode, config.crawl.max_pages
    );

    let app = create_router(AppState::new(config)?);
    let listener = TcpListener::bind(server_addr).await?;
    info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
