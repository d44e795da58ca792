pub mod config;
pub mod types;

pub use config::{CliArgs, ConfigError, RawSettings, SearchConfig};
pub use types::{JobListing, RunSummary};
