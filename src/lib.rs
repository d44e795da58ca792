pub mod core;
pub mod export;
pub mod features;
pub mod scrape;
pub mod scraping;

// --- Primary exports ---
pub use self::core::config::{CliArgs, ConfigError, RawSettings, SearchConfig};
pub use self::core::types::{JobListing, RunSummary};
pub use self::features::{challenge, session_store};
pub use self::scraping::{browser_manager, extractor, markers, navigator};
