//! Every Indeed.de DOM selector and page-state signature in one place.
//!
//! These are coupled to a third-party site's current markup and change
//! whenever Indeed ships a redesign. They are configuration data, not logic.
//! Each field uses an ordered fallback chain: the first selector that matches
//! wins, older layouts sit further down the list.

use aho_corasick::AhoCorasick;
use std::sync::OnceLock;

// ── Result-page structure ────────────────────────────────────────────────────

/// A listing card. Presence of any of these is the "results are rendered"
/// signal the navigator polls for.
pub const JOB_CARD_SELECTORS: &[&str] = &[
    "div[data-testid='jobCard']",
    ".jobsearch-ResultsList > div",
    "#mosaic-provider-jobcards .job_seen_beacon",
];

pub const NEXT_PAGE_SELECTORS: &[&str] = &[
    "a[data-testid='pagination-page-next']",
    "a.pn",
    "a[aria-label='Next']",
    "a.np",
];

// ── Per-card fields ──────────────────────────────────────────────────────────

pub const TITLE_SELECTORS: &[&str] = &[
    "h2.jobTitle span",
    "h2.jobTitle a span",
    "a.jcs-JobTitle span",
    ".jobTitle",
];

pub const COMPANY_SELECTORS: &[&str] = &[
    "span[data-testid='company-name']",
    ".companyName",
    ".company_location .companyName",
];

pub const LOCATION_SELECTORS: &[&str] = &[
    "div[data-testid='text-location']",
    ".companyLocation",
    ".company_location .companyLocation",
];

/// Salary and employment type share the same attribute-snippet container;
/// `€` content classifies a snippet as salary, a known employment-type label
/// classifies it as job type.
pub const ATTRIBUTE_SNIPPET_SELECTORS: &[&str] = &[
    "div[data-testid='attribute_snippet_testid']",
    ".salary-snippet",
    ".salaryOnly",
    ".metadata",
];

pub const URL_SELECTORS: &[&str] = &["h2.jobTitle a", "a.jcs-JobTitle", ".jobTitle a"];

pub const SNIPPET_SELECTORS: &[&str] =
    &["div.job-snippet", ".job-snippet", ".job-snippet-container"];

pub const DATE_SELECTORS: &[&str] = &["span.date", ".date", ".new"];

/// Employment-type labels as Indeed.de renders them (German first, English
/// variants for mixed-language postings).
pub const EMPLOYMENT_TYPE_LABELS: &[&str] = &[
    "Vollzeit",
    "Teilzeit",
    "Festanstellung",
    "Befristet",
    "Minijob",
    "Werkstudent",
    "Praktikum",
    "Ausbildung",
    "Freie Mitarbeit",
    "Full-time",
    "Part-time",
    "Permanent",
    "Temporary",
    "Internship",
    "Contract",
];

// ── Consent dialog ───────────────────────────────────────────────────────────

/// Overlay containers whose presence means a consent dialog is blocking the
/// page.
pub const CONSENT_OVERLAY_SELECTORS: &[&str] = &[
    "#onetrust-banner-sdk",
    ".overlay",
    ".modal",
    ".dialog",
    ".popup",
    ".consent",
    ".cookie",
];

/// Known accept-button ids/selectors, tried before falling back to a
/// label-text sweep.
pub const CONSENT_BUTTON_SELECTORS: &[&str] = &[
    "#onetrust-accept-btn-handler",
    "#accept-cookie-notification",
    "button[data-testid='cookie-consent-accept']",
    ".accept-cookies-button",
    "button.cookie-consent-accept",
];

/// Accept-like button labels, lowercase, German first (Indeed.de serves the
/// OneTrust banner in German).
pub const CONSENT_BUTTON_LABELS: &[&str] = &[
    "alle akzeptieren",
    "akzeptieren",
    "zustimmen",
    "einverstanden",
    "accept all",
    "i accept",
    "accept",
    "agree",
    "got it",
    "ok",
];

// ── Bot challenge signatures ─────────────────────────────────────────────────

/// Substrings (matched case-insensitively over the page HTML) that identify a
/// Cloudflare interstitial or captcha wall. Sources: the classic cf-*
/// challenge markup, Turnstile, and the common captcha vendors.
const CHALLENGE_MARKERS: &[&str] = &[
    "challenge-running",
    "cf-challenge-running",
    "cf-browser-verification",
    "cf-im-under-attack",
    "cf-wrapper",
    "cf-chl-",
    "cf-turnstile",
    "challenges.cloudflare.com",
    "checking your browser",
    "ddos protection",
    "g-recaptcha",
    "hcaptcha.com",
    "recaptcha",
    "verify you are human",
    "i am human",
    "unusual traffic",
];

static CHALLENGE_MATCHER: OnceLock<AhoCorasick> = OnceLock::new();

/// Linear-time scan for any challenge signature. Input must already be
/// lowercased.
pub fn challenge_matcher() -> &'static AhoCorasick {
    CHALLENGE_MATCHER.get_or_init(|| {
        AhoCorasick::new(CHALLENGE_MARKERS).expect("valid challenge markers")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    /// A typo in any selector table would otherwise only surface at runtime
    /// as "field never extracted".
    #[test]
    fn every_selector_parses() {
        let tables = [
            JOB_CARD_SELECTORS,
            NEXT_PAGE_SELECTORS,
            TITLE_SELECTORS,
            COMPANY_SELECTORS,
            LOCATION_SELECTORS,
            ATTRIBUTE_SNIPPET_SELECTORS,
            URL_SELECTORS,
            SNIPPET_SELECTORS,
            DATE_SELECTORS,
            CONSENT_OVERLAY_SELECTORS,
            CONSENT_BUTTON_SELECTORS,
        ];
        for table in tables {
            for sel in table {
                assert!(Selector::parse(sel).is_ok(), "bad selector: {}", sel);
            }
        }
    }

    #[test]
    fn challenge_matcher_hits_known_signatures() {
        let m = challenge_matcher();
        assert!(m.is_match("<div id=\"cf-wrapper\">checking your browser</div>"));
        assert!(m.is_match("<iframe src=\"https://challenges.cloudflare.com/x\">"));
        assert!(!m.is_match("<div class=\"job_seen_beacon\">Rust Developer</div>"));
    }
}
