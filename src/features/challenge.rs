//! Challenge and consent handling, with a human-in-the-loop fallback.
//!
//! Page state is assessed from a rendered-HTML snapshot and handled as a
//! small state machine: consent dialogs get one scripted accept attempt
//! before escalating; bot challenges go straight to the operator. The
//! operator prompt is the one wait in the program with no timeout: a
//! Cloudflare challenge cannot be resolved by the program alone, so it blocks
//! until a human types `done`.

use anyhow::{anyhow, Result};
use chromiumoxide::Page;
use scraper::{Html, Selector};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::features::session_store;
use crate::scraping::markers;

// ─────────────────────────────────────────────────────────────────────────────
// Assessment
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// Listings (or at least no blocker); carry on.
    Normal,
    /// A consent banner is overlaying the page.
    ConsentDialog,
    /// Challenge interstitial; only a human can clear it.
    BotChallenge,
    /// A human confirmed the page is usable.
    Resolved,
}

fn matches_any(document: &Html, selectors: &[&str]) -> bool {
    selectors.iter().any(|s| {
        Selector::parse(s)
            .map(|sel| document.select(&sel).next().is_some())
            .unwrap_or(false)
    })
}

/// Classify a rendered page.
///
/// A challenge signature only counts when no listing cards are rendered,
/// since result pages legitimately reference captcha vendors in their script
/// bundles. Consent overlays can sit on top of a fully rendered page, so
/// they are checked independently of card presence.
pub fn assess(html: &str) -> PageStatus {
    let document = Html::parse_document(html);
    let has_cards = matches_any(&document, markers::JOB_CARD_SELECTORS);

    if !has_cards && markers::challenge_matcher().is_match(&html.to_lowercase()) {
        return PageStatus::BotChallenge;
    }
    if matches_any(&document, markers::CONSENT_OVERLAY_SELECTORS) {
        return PageStatus::ConsentDialog;
    }
    PageStatus::Normal
}

// ─────────────────────────────────────────────────────────────────────────────
// Scripted consent accept
// ─────────────────────────────────────────────────────────────────────────────

/// In-page routine: click known consent-accept buttons first, then any
/// visible button whose label reads like an accept. Returns the click count.
fn consent_accept_script() -> String {
    let ids = serde_json::to_string(markers::CONSENT_BUTTON_SELECTORS)
        .unwrap_or_else(|_| "[]".to_string());
    let labels = serde_json::to_string(markers::CONSENT_BUTTON_LABELS)
        .unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"
(() => {{
    const knownSelectors = {ids};
    const acceptLabels = {labels};
    let clicked = 0;

    const isVisible = (el) =>
        el && el.offsetParent !== null && el.getBoundingClientRect().height > 0;

    for (const sel of knownSelectors) {{
        for (const el of document.querySelectorAll(sel)) {{
            if (!isVisible(el)) continue;
            try {{ el.scrollIntoView(true); el.click(); clicked++; }} catch (_) {{}}
        }}
    }}
    if (clicked > 0) return clicked;

    const candidates = document.querySelectorAll(
        'button, [role="button"], input[type="button"], input[type="submit"]'
    );
    for (const el of candidates) {{
        if (!isVisible(el)) continue;
        const text = (el.innerText || el.value || '').trim().toLowerCase();
        if (!text) continue;
        if (acceptLabels.some(l => text === l || text.startsWith(l + ' '))) {{
            try {{ el.click(); clicked++; }} catch (_) {{}}
        }}
    }}
    return clicked;
}})()
"#
    )
}

/// Attempt the scripted accept-click. Returns `true` when something was
/// clicked (the dialog may still need a moment to animate away).
pub async fn try_accept_consent(page: &Page) -> bool {
    let clicked: u64 = match page.evaluate(consent_accept_script()).await {
        Ok(result) => result
            .into_value::<serde_json::Value>()
            .ok()
            .and_then(|j| j.as_u64())
            .unwrap_or(0),
        Err(e) => {
            warn!("Consent accept script failed: {}", e);
            0
        }
    };

    if clicked > 0 {
        info!("✅ Accepted consent dialog ({} clicks)", clicked);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        true
    } else {
        false
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operator prompt
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Done,
    Save,
}

/// Console protocol: `done` / `save`, case-insensitive, anything else
/// re-prompts.
pub fn parse_command(input: &str) -> Option<OperatorCommand> {
    match input.trim().to_lowercase().as_str() {
        "done" => Some(OperatorCommand::Done),
        "save" => Some(OperatorCommand::Save),
        _ => None,
    }
}

fn print_banner() {
    let line = "=".repeat(80);
    println!("\n{line}");
    println!("MANUAL NAVIGATION MODE");
    println!("1. Solve the CAPTCHA / Cloudflare challenge in the browser window.");
    println!("2. Dismiss any consent dialog and make sure the job listings are visible.");
    println!("3. Type 'done' and press Enter to continue scraping.");
    println!("4. Type 'save' to store the current cookies for future runs.");
    println!("{line}\n");
}

/// Block on the operator console until `done`.
///
/// `save` persists the browser's current cookies and keeps prompting. There
/// is deliberately no timeout and no retry limit here; this wait ends when
/// a human says it ends.
pub async fn prompt_operator(page: &Page) -> Result<()> {
    print_banner();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("Command (done/save): ");
        std::io::stdout().flush().ok();

        let line = lines
            .next_line()
            .await
            .map_err(|e| anyhow!("Console read failed: {}", e))?;

        let Some(line) = line else {
            // stdin closed; nobody is coming. Continue rather than hang.
            warn!("Console closed during manual navigation — continuing");
            return Ok(());
        };

        match parse_command(&line) {
            Some(OperatorCommand::Done) => {
                info!("Operator confirmed — continuing with scraping");
                return Ok(());
            }
            Some(OperatorCommand::Save) => {
                match session_store::capture(page).await {
                    Ok(jar) => {
                        if let Err(e) = session_store::save(&jar) {
                            warn!("Cookie save failed: {}", e);
                        }
                    }
                    Err(e) => warn!("Cookie capture failed: {}", e),
                }
                // keep prompting; the challenge may not be solved yet
            }
            None => {
                println!("Unknown command '{}'", line.trim());
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Driver
// ─────────────────────────────────────────────────────────────────────────────

/// Run the challenge state machine against the current page until it is
/// usable. Consent dialogs get one scripted attempt before a human is
/// involved; bot challenges always go to the operator.
pub async fn resolve(page: &Page) -> Result<PageStatus> {
    let html = page
        .content()
        .await
        .map_err(|e| anyhow!("Failed to read page content: {}", e))?;

    match assess(&html) {
        PageStatus::Normal => Ok(PageStatus::Normal),
        PageStatus::ConsentDialog => {
            info!("Consent dialog detected — attempting scripted accept");
            if try_accept_consent(page).await {
                let html = page
                    .content()
                    .await
                    .map_err(|e| anyhow!("Failed to re-read page content: {}", e))?;
                if assess(&html) == PageStatus::Normal {
                    return Ok(PageStatus::Normal);
                }
            }
            warn!("Consent dialog not cleared automatically — operator needed");
            prompt_operator(page).await?;
            Ok(PageStatus::Resolved)
        }
        PageStatus::BotChallenge => {
            warn!("🛡️  Bot challenge detected — operator needed");
            prompt_operator(page).await?;
            Ok(PageStatus::Resolved)
        }
        PageStatus::Resolved => Ok(PageStatus::Resolved),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const CHALLENGE_PAGE: &str = r#"
        <html><head><title>Just a moment...</title></head>
        <body><div class="cf-wrapper"><div id="challenge-running">
        Checking your browser before accessing de.indeed.com
        </div></div></body></html>"#;

    const CONSENT_PAGE: &str = r#"
        <html><body>
        <div id="onetrust-banner-sdk"><button id="onetrust-accept-btn-handler">
        Alle akzeptieren</button></div>
        <div data-testid="jobCard"><h2 class="jobTitle"><span>Dev</span></h2></div>
        </body></html>"#;

    const NORMAL_PAGE: &str = r#"
        <html><body>
        <div data-testid="jobCard"><h2 class="jobTitle"><span>Dev</span></h2></div>
        </body></html>"#;

    #[test]
    fn challenge_page_is_flagged() {
        assert_eq!(assess(CHALLENGE_PAGE), PageStatus::BotChallenge);
    }

    #[test]
    fn consent_overlay_is_flagged_even_with_cards() {
        assert_eq!(assess(CONSENT_PAGE), PageStatus::ConsentDialog);
    }

    #[test]
    fn plain_results_page_is_normal() {
        assert_eq!(assess(NORMAL_PAGE), PageStatus::Normal);
    }

    /// Captcha-vendor strings inside a page that did render listings must not
    /// trip the challenge detector.
    #[test]
    fn vendor_mention_with_cards_is_not_a_challenge() {
        let html = r#"
            <html><body>
            <script src="https://www.recaptcha.net/recaptcha/api.js"></script>
            <div data-testid="jobCard"><h2 class="jobTitle"><span>Dev</span></h2></div>
            </body></html>"#;
        assert_eq!(assess(html), PageStatus::Normal);
    }

    #[test]
    fn command_parsing_is_lenient_about_case_and_whitespace() {
        assert_eq!(parse_command("done"), Some(OperatorCommand::Done));
        assert_eq!(parse_command("  DONE \n"), Some(OperatorCommand::Done));
        assert_eq!(parse_command("Save"), Some(OperatorCommand::Save));
        assert_eq!(parse_command("quit"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn accept_script_embeds_known_buttons_and_labels() {
        let script = consent_accept_script();
        assert!(script.contains("onetrust-accept-btn-handler"));
        assert!(script.contains("alle akzeptieren"));
    }
}
