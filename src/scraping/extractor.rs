//! Listing extraction from a rendered results page.
//!
//! Operates on an HTML snapshot (`page.content()`), never on the live
//! page, so extraction is read-only by construction. Every field goes through an
//! ordered selector fallback chain from [`markers`]; a card missing a
//! required field is skipped with a warning, a missing optional field is
//! simply `None`.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::core::JobListing;
use crate::scraping::markers;

/// Compile a selector table, dropping anything unparsable. The tables are
/// covered by tests, so drops only happen if markup data rots.
fn compile(table: &[&str]) -> Vec<Selector> {
    table
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
}

/// First non-empty text content under any of `selectors`, whitespace
/// normalized.
fn first_text(card: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    for selector in selectors {
        if let Some(el) = card.select(selector).next() {
            let text = el
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// First `href` under any of `selectors`, resolved against the page URL so
/// relative card links come out absolute.
fn first_href(card: ElementRef<'_>, selectors: &[Selector], base: &Url) -> Option<String> {
    for selector in selectors {
        if let Some(el) = card.select(selector).next() {
            if let Some(href) = el.value().attr("href") {
                if let Ok(resolved) = base.join(href) {
                    return Some(resolved.to_string());
                }
            }
        }
    }
    None
}

/// Indeed's posting id, carried in the `jk` query parameter of the card link.
fn job_id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "jk")
        .map(|(_, v)| v.to_string())
}

/// Salary and employment type share the attribute-snippet container; a `€`
/// figure makes a snippet salary, a known employment-type label makes it the
/// job type.
fn classify_snippets(card: ElementRef<'_>, selectors: &[Selector]) -> (Option<String>, Option<String>) {
    let mut salary = None;
    let mut job_type = None;

    for selector in selectors {
        for el in card.select(selector) {
            let text = el
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if text.is_empty() {
                continue;
            }

            if salary.is_none() && text.contains('€') {
                salary = Some(text);
                continue;
            }
            if job_type.is_none() {
                let lower = text.to_lowercase();
                if markers::EMPLOYMENT_TYPE_LABELS
                    .iter()
                    .any(|label| lower.contains(&label.to_lowercase()))
                {
                    job_type = Some(text);
                }
            }
        }
        if salary.is_some() && job_type.is_some() {
            break;
        }
    }

    (salary, job_type)
}

struct FieldSelectors {
    title: Vec<Selector>,
    company: Vec<Selector>,
    location: Vec<Selector>,
    url: Vec<Selector>,
    snippet: Vec<Selector>,
    date: Vec<Selector>,
    attributes: Vec<Selector>,
}

impl FieldSelectors {
    fn new() -> Self {
        Self {
            title: compile(markers::TITLE_SELECTORS),
            company: compile(markers::COMPANY_SELECTORS),
            location: compile(markers::LOCATION_SELECTORS),
            url: compile(markers::URL_SELECTORS),
            snippet: compile(markers::SNIPPET_SELECTORS),
            date: compile(markers::DATE_SELECTORS),
            attributes: compile(markers::ATTRIBUTE_SNIPPET_SELECTORS),
        }
    }
}

/// Extract every listing card on a rendered results page, in document order.
///
/// `page_url` anchors relative link resolution. Cards missing title, company,
/// or a link are skipped (warned), never fatal.
pub fn extract_listings(html: &str, page_url: &str) -> Vec<JobListing> {
    let document = Html::parse_document(html);
    let base = match Url::parse(page_url) {
        Ok(u) => u,
        Err(e) => {
            warn!("Invalid page URL '{}': {}; skipping extraction", page_url, e);
            return Vec::new();
        }
    };

    // First card selector with any matches wins; mixing generations of
    // markup would double-count cards.
    let mut cards: Vec<ElementRef<'_>> = Vec::new();
    for selector_str in markers::JOB_CARD_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            cards = document.select(&selector).collect();
            if !cards.is_empty() {
                debug!("{} job cards via '{}'", cards.len(), selector_str);
                break;
            }
        }
    }

    if cards.is_empty() {
        warn!("No job cards found on page");
        return Vec::new();
    }

    let selectors = FieldSelectors::new();
    let mut listings = Vec::with_capacity(cards.len());
    let mut skipped = 0usize;

    for card in cards {
        match extract_card(card, &selectors, &base) {
            Some(listing) => listings.push(listing),
            None => skipped += 1,
        }
    }

    info!(
        "📋 Extracted {} listings ({} cards skipped)",
        listings.len(),
        skipped
    );
    listings
}

fn extract_card(
    card: ElementRef<'_>,
    selectors: &FieldSelectors,
    base: &Url,
) -> Option<JobListing> {
    let title = match first_text(card, &selectors.title) {
        Some(t) => t,
        None => {
            warn!("Skipping card: no title");
            return None;
        }
    };
    let company = match first_text(card, &selectors.company) {
        Some(c) => c,
        None => {
            warn!("Skipping card '{}': no company", title);
            return None;
        }
    };
    let url = match first_href(card, &selectors.url, base) {
        Some(u) => u,
        None => {
            warn!("Skipping card '{}': no link", title);
            return None;
        }
    };

    let location = first_text(card, &selectors.location).unwrap_or_else(|| {
        debug!("Card '{}': no location", title);
        String::new()
    });
    let description = first_text(card, &selectors.snippet).unwrap_or_else(|| {
        debug!("Card '{}': no snippet", title);
        String::new()
    });
    let date_posted = first_text(card, &selectors.date);
    let (salary, job_type) = classify_snippets(card, &selectors.attributes);
    let job_id = job_id_from_url(&url);

    Some(JobListing {
        title,
        company,
        location,
        salary,
        description,
        url,
        date_posted,
        job_type,
        job_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_parses_from_jk_param() {
        assert_eq!(
            job_id_from_url("https://de.indeed.com/viewjob?jk=abc123&from=serp"),
            Some("abc123".to_string())
        );
        assert_eq!(job_id_from_url("https://de.indeed.com/viewjob?from=serp"), None);
    }

    #[test]
    fn snippet_classification_splits_salary_and_type() {
        let html = r#"
            <div data-testid="jobCard">
              <div data-testid="attribute_snippet_testid">55.000 € – 65.000 € pro Jahr</div>
              <div data-testid="attribute_snippet_testid">Vollzeit</div>
            </div>"#;
        let doc = Html::parse_document(html);
        let card_sel = Selector::parse("div[data-testid='jobCard']").unwrap();
        let card = doc.select(&card_sel).next().unwrap();
        let attrs = compile(markers::ATTRIBUTE_SNIPPET_SELECTORS);

        let (salary, job_type) = classify_snippets(card, &attrs);
        assert_eq!(salary.as_deref(), Some("55.000 € – 65.000 € pro Jahr"));
        assert_eq!(job_type.as_deref(), Some("Vollzeit"));
    }
}
