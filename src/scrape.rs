//! The run itself: one linear flow from browser launch to export.
//!
//! launch → inject saved cookies → navigate → wait / challenge → page loop
//! (extract, append, paginate) → export → save cookies → close. The browser
//! is released on every exit path: explicitly on the normal one, via `Drop`
//! on the rest.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::{JobListing, RunSummary, SearchConfig};
use crate::export;
use crate::features::{challenge, session_store};
use crate::scraping::browser_manager::BrowserSession;
use crate::scraping::{extractor, navigator};

/// Execute a full scrape run. Launch failures are fatal; everything past a
/// successful launch degrades to partial results instead of erroring.
pub async fn run(config: &SearchConfig) -> Result<RunSummary> {
    let session = BrowserSession::launch(config)
        .await
        .context("browser launch failed")?;

    let result = drive(config, &session).await;

    // Release the browser whether the run succeeded or not.
    session.close().await;
    result
}

async fn drive(config: &SearchConfig, session: &BrowserSession) -> Result<RunSummary> {
    let page = &session.page;
    let timeout = Duration::from_secs(config.timeout_secs);

    // Inject before navigation so the cookies ride on the first request; a
    // saved cf_clearance is worthless once the interstitial has fired.
    let jar = session_store::load();
    if !jar.is_empty() {
        session_store::inject(page, &jar).await;
    }

    let url = navigator::search_url(config);
    navigator::navigate(page, &url).await?;

    // The wait gives the page its fair chance to render; the assessment then
    // classifies whatever state it landed in (consent banners overlay fully
    // rendered pages, so it runs even when listings showed up in time).
    navigator::wait_for_results(page, timeout).await;
    challenge::resolve(page).await?;

    let mut results: Vec<JobListing> = Vec::new();
    let mut pages_scraped = 0u32;

    for page_no in 1..=config.max_pages {
        let html = page
            .content()
            .await
            .map_err(|e| anyhow!("Failed to read page {}: {}", page_no, e))?;

        let listings = extractor::extract_listings(&html, url.as_str());
        if listings.is_empty() {
            warn!("No listings on page {} — stopping", page_no);
            break;
        }

        info!("Page {}: {} listings", page_no, listings.len());
        pages_scraped = page_no;
        results.extend(listings);

        // Don't click past the last wanted page.
        if page_no == config.max_pages {
            info!("Reached max pages ({})", config.max_pages);
            break;
        }

        navigator::polite_delay().await;
        match navigator::go_to_next_page(page).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                warn!("Pagination failed: {:#} — stopping with partial results", e);
                break;
            }
        }

        navigator::wait_for_results(page, timeout).await;
        challenge::resolve(page).await?;
    }

    info!(
        "📊 Scraped {} listings across {} pages",
        results.len(),
        pages_scraped
    );

    let (files_written, export_errors) =
        export::export(&results, config, Path::new(export::OUTPUT_DIR));

    // Persist the session on completion so the next run may skip the
    // challenge entirely. Failures here are logged, never fatal.
    match session_store::capture(page).await {
        Ok(jar) if !jar.is_empty() => {
            if let Err(e) = session_store::save(&jar) {
                warn!("Cookie save failed: {}", e);
            }
        }
        Ok(_) => {}
        Err(e) => warn!("Cookie capture failed: {}", e),
    }

    Ok(RunSummary {
        pages_scraped,
        listings_found: results.len(),
        files_written,
        export_errors,
    })
}
