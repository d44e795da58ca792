//! Page navigation: search URL building, bounded result waits, pagination.
//!
//! Navigation never raises on "the page isn't showing listings": a timeout
//! here is the signal that challenge handling should run, not an error.

use anyhow::{anyhow, Result};
use chromiumoxide::Page;
use rand::RngExt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use crate::core::SearchConfig;
use crate::scraping::markers;

const BASE_SEARCH_URL: &str = "https://de.indeed.com/jobs";
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Build the de.indeed.com search URL. Filtering happens through query
/// parameters rather than by driving the search form.
pub fn search_url(config: &SearchConfig) -> Url {
    Url::parse_with_params(
        BASE_SEARCH_URL,
        [
            ("q", config.job_title.clone()),
            ("l", config.location.clone()),
            ("radius", config.radius.to_string()),
            ("limit", config.results_per_page.to_string()),
        ],
    )
    .expect("static base URL is valid")
}

/// Issue the page load. Does not wait for anything; pair with
/// [`wait_for_results`].
pub async fn navigate(page: &Page, url: &Url) -> Result<()> {
    info!("🌐 Navigating to {}", url);
    page.goto(url.as_str())
        .await
        .map_err(|e| anyhow!("Navigation to {} failed: {}", url, e))?;
    Ok(())
}

/// Combined listing-card selector for a single `querySelectorAll` probe.
fn job_card_probe_script() -> String {
    format!(
        r#"document.querySelectorAll("{}").length"#,
        markers::JOB_CARD_SELECTORS.join(", ")
    )
}

/// Number of listing cards currently rendered, 0 when the probe fails.
pub async fn visible_job_cards(page: &Page) -> u64 {
    page.evaluate(job_card_probe_script())
        .await
        .ok()
        .and_then(|v| v.into_value::<serde_json::Value>().ok())
        .and_then(|j| j.as_u64())
        .unwrap_or(0)
}

/// Poll for the listing container until it appears or `timeout` elapses.
///
/// Returns `false` on timeout without raising; the orchestrator decides
/// whether that means a challenge page or a dead end.
pub async fn wait_for_results(page: &Page, timeout: Duration) -> bool {
    let start = Instant::now();
    loop {
        let count = visible_job_cards(page).await;
        if count > 0 {
            debug!("{} job cards rendered after {:?}", count, start.elapsed());
            return true;
        }
        if start.elapsed() >= timeout {
            warn!("No job cards after {:?} — page may be challenged", timeout);
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Locate and activate the pagination-next control.
///
/// Returns `Ok(false)` when no next-page control exists (last page). A click
/// that lands does not guarantee the next page renders; the caller follows
/// up with [`wait_for_results`].
pub async fn go_to_next_page(page: &Page) -> Result<bool> {
    // A consent banner re-appearing mid-run sits exactly over the pagination
    // bar; sweep it before looking for the control.
    crate::features::challenge::try_accept_consent(page).await;

    for selector in markers::NEXT_PAGE_SELECTORS {
        let element = match page.find_element(*selector).await {
            Ok(el) => el,
            Err(_) => continue,
        };

        // Bring the control into the viewport the way a user would reach it.
        let _ = page
            .evaluate(format!(
                r#"document.querySelector("{}")?.scrollIntoView(true)"#,
                selector
            ))
            .await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        if let Err(e) = element.click().await {
            debug!("Direct click on '{}' failed ({}); trying JS click", selector, e);
            page.evaluate(format!(
                r#"document.querySelector("{}")?.click()"#,
                selector
            ))
            .await
            .map_err(|e| anyhow!("JS click on pagination control failed: {}", e))?;
        }

        info!("➡️  Advanced to next page via '{}'", selector);
        return Ok(true);
    }

    info!("No next-page control found — last page reached");
    Ok(false)
}

/// Randomized pause between page loads. A fixed cadence is its own bot
/// signal.
pub async fn polite_delay() {
    jittered_delay(1500, 4000).await;
}

async fn jittered_delay(min_ms: u64, max_ms: u64) {
    let wait_ms = {
        let mut rng = rand::rng();
        rng.random_range(min_ms..=max_ms)
    };
    debug!("Polite delay: {}ms before next page", wait_ms);
    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SearchConfig {
        SearchConfig {
            job_title: "software engineer".into(),
            location: "Berlin".into(),
            radius: 25,
            results_per_page: 15,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn search_url_form_encodes_query() {
        let url = search_url(&config());
        let s = url.as_str();
        assert!(s.starts_with("https://de.indeed.com/jobs?"));
        assert!(s.contains("q=software+engineer"));
        assert!(s.contains("l=Berlin"));
        assert!(s.contains("radius=25"));
        assert!(s.contains("limit=15"));
    }

    #[test]
    fn search_url_encodes_umlauts() {
        let mut cfg = config();
        cfg.location = "München".into();
        let url = search_url(&cfg);
        assert!(url.as_str().contains("l=M%C3%BCnchen"));
    }

    #[test]
    fn probe_script_embeds_all_card_selectors() {
        let script = job_card_probe_script();
        for sel in markers::JOB_CARD_SELECTORS {
            assert!(script.contains(sel));
        }
    }

    #[tokio::test]
    async fn jittered_delay_honors_the_lower_bound() {
        let start = Instant::now();
        jittered_delay(30, 60).await;
        assert!(start.elapsed().as_millis() >= 30);
    }
}
