use serde::{Deserialize, Serialize};

/// One job posting as it appears on a results page.
///
/// Field order is load-bearing: the CSV exporter derives its column order
/// from it. Optional fields serialize as empty cells (CSV) or `null` (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub description: String,
    pub url: String,
    pub date_posted: Option<String>,
    pub job_type: Option<String>,
    /// Indeed's internal posting id, parsed from the `jk=` URL parameter.
    pub job_id: Option<String>,
}

/// What a completed run produced, for the final log line and exit decision.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub pages_scraped: u32,
    pub listings_found: usize,
    /// Paths of the export files that were actually written.
    pub files_written: Vec<std::path::PathBuf>,
    /// Export attempts that failed (format label + error text). Per-format
    /// failures are recoverable; they end up here instead of aborting.
    pub export_errors: Vec<(String, String)>,
}
