use clap::Parser;
use tracing::{error, info};

use stellen_scout::{CliArgs, RawSettings, SearchConfig};

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // `.env` first; real environment variables win over file entries.
    dotenvy::dotenv().ok();

    let cli = CliArgs::parse();
    let config = match SearchConfig::resolve(&cli, &RawSettings::from_env()) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Running with the following configuration:");
    info!("  job title: {}", config.job_title);
    info!("  location:  {} (radius {} km)", config.location, config.radius);
    info!(
        "  pages:     up to {} × {} results",
        config.max_pages, config.results_per_page
    );

    match stellen_scout::scrape::run(&config).await {
        Ok(summary) => {
            info!(
                "✅ Done: {} listings from {} pages",
                summary.listings_found, summary.pages_scraped
            );
            for path in &summary.files_written {
                info!("   wrote {}", path.display());
            }
            for (format, err) in &summary.export_errors {
                error!("   {} export failed: {}", format, err);
            }
            // Partial results are still a successful run.
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            std::process::exit(2);
        }
    }
}
