//! Result export: CSV and/or JSON under `output/`.
//!
//! Filenames follow `indeed_jobs_<job_title>_<location>_<timestamp>.<ext>`
//! with slug-sanitized search terms and a sortable timestamp, so consecutive
//! runs line up in a directory listing. The two formats are written
//! independently: one failing never blocks the other.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::{JobListing, SearchConfig};

pub const OUTPUT_DIR: &str = "output";

/// Collapse every run of non-alphanumeric characters into a single `_`.
/// Case is preserved: "software engineer" → "software_engineer",
/// "Berlin" stays "Berlin".
pub fn slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut gap = false;
    for c in input.chars() {
        if c.is_alphanumeric() {
            if gap && !out.is_empty() {
                out.push('_');
            }
            gap = false;
            out.push(c);
        } else {
            gap = true;
        }
    }
    out
}

fn export_filename(config: &SearchConfig, timestamp: &str, ext: &str) -> String {
    format!(
        "indeed_jobs_{}_{}_{}.{}",
        slug(&config.job_title),
        slug(&config.location),
        timestamp,
        ext
    )
}

/// Write the listings as CSV with a header row. Column order is the
/// `JobListing` field order; optional fields become empty cells.
pub fn write_csv(listings: &[JobListing], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for listing in listings {
        writer.serialize(listing)?;
    }
    writer.flush()?;
    info!("💾 Wrote {} listings to {}", listings.len(), path.display());
    Ok(())
}

/// Write the listings as a pretty-printed JSON array.
pub fn write_json(listings: &[JobListing], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(listings)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!("💾 Wrote {} listings to {}", listings.len(), path.display());
    Ok(())
}

/// Export per the config's output flags into `out_dir`.
///
/// Returns the written paths and the per-format failures. Nothing is written
/// for an empty result set.
pub fn export(
    listings: &[JobListing],
    config: &SearchConfig,
    out_dir: &Path,
) -> (Vec<PathBuf>, Vec<(String, String)>) {
    let mut written = Vec::new();
    let mut failures = Vec::new();

    if listings.is_empty() {
        info!("No listings to export");
        return (written, failures);
    }

    if let Err(e) = std::fs::create_dir_all(out_dir) {
        let msg = format!("cannot create {}: {}", out_dir.display(), e);
        warn!("{}", msg);
        if config.output_csv {
            failures.push(("csv".to_string(), msg.clone()));
        }
        if config.output_json {
            failures.push(("json".to_string(), msg));
        }
        return (written, failures);
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();

    if config.output_csv {
        let path = out_dir.join(export_filename(config, &timestamp, "csv"));
        match write_csv(listings, &path) {
            Ok(()) => written.push(path),
            Err(e) => {
                warn!("CSV export failed: {:#}", e);
                failures.push(("csv".to_string(), format!("{:#}", e)));
            }
        }
    }

    if config.output_json {
        let path = out_dir.join(export_filename(config, &timestamp, "json"));
        match write_json(listings, &path) {
            Ok(()) => written.push(path),
            Err(e) => {
                warn!("JSON export failed: {:#}", e);
                failures.push(("json".to_string(), format!("{:#}", e)));
            }
        }
    }

    (written, failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(title: &str) -> JobListing {
        JobListing {
            title: title.to_string(),
            company: "ACME GmbH".to_string(),
            location: "Berlin".to_string(),
            salary: Some("60.000 € pro Jahr".to_string()),
            description: "Builds things".to_string(),
            url: "https://de.indeed.com/viewjob?jk=abc".to_string(),
            date_posted: None,
            job_type: Some("Vollzeit".to_string()),
            job_id: Some("abc".to_string()),
        }
    }

    fn config(csv: bool, json: bool) -> SearchConfig {
        SearchConfig {
            job_title: "software engineer".into(),
            location: "Berlin".into(),
            output_csv: csv,
            output_json: json,
            ..SearchConfig::default()
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "stellen-scout-export-{}-{}",
            tag,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn slug_collapses_non_alphanumeric_runs() {
        assert_eq!(slug("software engineer"), "software_engineer");
        assert_eq!(slug("Berlin"), "Berlin");
        assert_eq!(slug("C++ / embedded!"), "C_embedded");
        assert_eq!(slug("  padded  "), "padded");
        assert!(!slug("a/b\\c d").contains(['/', '\\', ' ']));
    }

    #[test]
    fn csv_only_writes_exactly_one_csv_file() {
        let dir = temp_dir("csv-only");
        let (written, failures) = export(&[listing("Dev")], &config(true, false), &dir);

        assert!(failures.is_empty());
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].extension().unwrap(), "csv");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn filename_carries_sanitized_terms() {
        let dir = temp_dir("filename");
        let (written, _) = export(&[listing("Dev")], &config(true, false), &dir);
        let name = written[0].file_name().unwrap().to_string_lossy().to_string();

        assert!(name.starts_with("indeed_jobs_software_engineer_Berlin_"));
        assert!(!name.contains(' '));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn csv_has_header_plus_one_row_per_listing() {
        let dir = temp_dir("rows");
        let (written, _) = export(
            &[listing("Dev"), listing("Ops")],
            &config(true, false),
            &dir,
        );

        let content = std::fs::read_to_string(&written[0]).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "title,company,location,salary,description,url,date_posted,job_type,job_id"
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn json_round_trips_with_the_same_keys() {
        let dir = temp_dir("json");
        let (written, _) = export(&[listing("Dev")], &config(false, true), &dir);

        let content = std::fs::read_to_string(&written[0]).unwrap();
        let parsed: Vec<JobListing> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title, "Dev");
        assert_eq!(parsed[0].job_type.as_deref(), Some("Vollzeit"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_result_set_writes_nothing() {
        let dir = temp_dir("empty");
        let (written, failures) = export(&[], &config(true, true), &dir);
        assert!(written.is_empty());
        assert!(failures.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }
}
