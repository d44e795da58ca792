//! Cookie persistence between runs.
//!
//! A solved Cloudflare challenge lives in the browser's cookies; saving them
//! after a successful run (or on an explicit operator `save`) and injecting
//! them before navigation on the next run means a human has to step in far
//! less often.
//!
//! Cookies are stored as a JSON array at `~/.stellen-scout/cookies.json`.
//! Loading is never fatal: an absent, unreadable, or corrupt file is a cold
//! start, nothing more. Saving is atomic (write-to-temp then rename) so a
//! crash cannot leave a half-written jar behind.

use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetCookiesParams};
use chromiumoxide::Page;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// One browser cookie. The named fields are what the rest of the code cares
/// about; `extra` flattens through every further CDP cookie attribute
/// (httpOnly, secure, sameSite, …) so capture → save → load → inject carries
/// the complete cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Ordered cookie set for one run. Order is preserved through save/load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieJar {
    pub cookies: Vec<CookieRecord>,
}

impl CookieJar {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed jar location: `~/.stellen-scout/cookies.json`, falling back to the
/// working directory when no home directory can be resolved.
pub fn cookie_file_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".stellen-scout").join("cookies.json"),
        None => PathBuf::from("stellen-scout-cookies.json"),
    }
}

/// Load the jar from `path`. Any failure degrades to an empty jar; a cold
/// start is never an error.
pub fn load_from(path: &Path) -> CookieJar {
    if !path.exists() {
        info!("No cookie file at {} — cold start", path.display());
        return CookieJar::default();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            warn!("Cookie file {} unreadable: {} — cold start", path.display(), e);
            return CookieJar::default();
        }
    };

    match serde_json::from_str::<CookieJar>(&content) {
        Ok(jar) => {
            info!("🍪 Loaded {} cookies from {}", jar.len(), path.display());
            jar
        }
        Err(e) => {
            warn!("Cookie file {} corrupt: {} — cold start", path.display(), e);
            CookieJar::default()
        }
    }
}

/// Load from the fixed path.
pub fn load() -> CookieJar {
    load_from(&cookie_file_path())
}

/// Persist the jar to `path` atomically: write `{path}.tmp`, then rename, so
/// readers never observe a partial file.
pub fn save_to(path: &Path, jar: &CookieJar) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(jar)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &json)?;
    std::fs::rename(&tmp, path)?;

    info!("🍪 Saved {} cookies to {}", jar.len(), path.display());
    Ok(())
}

/// Persist to the fixed path.
pub fn save(jar: &CookieJar) -> anyhow::Result<()> {
    save_to(&cookie_file_path(), jar)
}

// ─────────────────────────────────────────────────────────────────────────────
// CDP bridge
// ─────────────────────────────────────────────────────────────────────────────

/// Convert stored records into CDP `CookieParam`s. Individually malformed
/// records are dropped so a partially stale jar never blocks a run.
fn to_cookie_params(jar: &CookieJar) -> Vec<CookieParam> {
    jar.cookies
        .iter()
        .filter_map(|record| {
            serde_json::to_value(record)
                .ok()
                .and_then(|v| serde_json::from_value::<CookieParam>(v).ok())
        })
        .collect()
}

/// Inject the jar into a live page **before** navigation, so the cookies ride
/// along on the initial request.
pub async fn inject(page: &Page, jar: &CookieJar) {
    if jar.is_empty() {
        return;
    }

    let params = to_cookie_params(jar);
    if params.is_empty() {
        warn!("Stored jar contained no usable cookies — skipping injection");
        return;
    }

    let count = params.len();
    match page.execute(SetCookiesParams::new(params)).await {
        Ok(_) => info!("💉 Injected {} session cookies", count),
        Err(e) => warn!("Cookie injection failed: {}", e),
    }
}

/// Snapshot the browser's current cookies into a jar, preserving CDP order.
pub async fn capture(page: &Page) -> anyhow::Result<CookieJar> {
    let cookies = page.get_cookies().await?;

    let records: Vec<CookieRecord> = cookies
        .iter()
        .filter_map(|cookie| {
            serde_json::to_value(cookie)
                .ok()
                .and_then(|v| serde_json::from_value::<CookieRecord>(v).ok())
        })
        .collect();

    info!("🍪 Captured {} cookies from browser", records.len());
    Ok(CookieJar { cookies: records })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn jar() -> CookieJar {
        serde_json::from_value(json!([
            {"name": "CTK", "value": "abc", "domain": ".indeed.com", "path": "/",
             "expires": 1_900_000_000.0, "httpOnly": true, "secure": true},
            {"name": "cf_clearance", "value": "xyz", "domain": ".indeed.com", "path": "/",
             "expires": -1.0},
            {"name": "bare", "value": "v"}
        ]))
        .unwrap()
    }

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("stellen-scout-{}-{}.json", tag, std::process::id()))
    }

    #[test]
    fn jar_round_trips_through_save_and_load() {
        let path = temp_path("roundtrip");
        let original = jar();

        save_to(&path, &original).unwrap();
        let loaded = load_from(&path);
        std::fs::remove_file(&path).ok();

        // Same records, same order, extras intact.
        assert_eq!(loaded, original);
        assert_eq!(loaded.cookies[0].extra.get("httpOnly"), Some(&json!(true)));
    }

    #[test]
    fn missing_file_is_a_cold_start() {
        let path = temp_path("missing-never-created");
        assert!(load_from(&path).is_empty());
    }

    #[test]
    fn corrupt_file_is_a_cold_start() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "not json {{{").unwrap();
        let loaded = load_from(&path);
        std::fs::remove_file(&path).ok();
        assert!(loaded.is_empty());
    }

    #[test]
    fn records_convert_to_cookie_params() {
        let params = to_cookie_params(&jar());
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].name, "CTK");
    }
}
