//! Search configuration: defaults, then `.env`/environment, then CLI; CLI wins.
//!
//! The merge itself is a pure function over a [`RawSettings`] snapshot so the
//! precedence rules are testable without touching process state.

use clap::Parser;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Environment keys
// ---------------------------------------------------------------------------

pub const ENV_JOB_TITLE: &str = "JOB_TITLE";
pub const ENV_LOCATION: &str = "LOCATION";
pub const ENV_RADIUS: &str = "RADIUS";
pub const ENV_RESULTS_PER_PAGE: &str = "RESULTS_PER_PAGE";
pub const ENV_MAX_PAGES: &str = "MAX_PAGES";
pub const ENV_OUTPUT_CSV: &str = "OUTPUT_CSV";
pub const ENV_OUTPUT_JSON: &str = "OUTPUT_JSON";
pub const ENV_TIMEOUT: &str = "TIMEOUT";
pub const ENV_HEADLESS: &str = "HEADLESS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' is not a number")]
    InvalidNumber { key: &'static str, value: String },

    #[error("invalid value for {key}: '{value}' must be positive")]
    NonPositive { key: &'static str, value: String },
}

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Command-line overrides. Anything left unset falls through to the
/// environment and then to the built-in defaults.
#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "stellen-scout",
    version,
    about = "Manual-assist Indeed.de job scraper with Cloudflare HITL fallback"
)]
pub struct CliArgs {
    /// Job title to search for
    #[arg(long)]
    pub job_title: Option<String>,

    /// Location to search in
    #[arg(long)]
    pub location: Option<String>,

    /// Search radius in km (0 = exact location)
    #[arg(long)]
    pub radius: Option<u32>,

    /// Maximum number of result pages to scrape
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Results requested per page
    #[arg(long)]
    pub results_per_page: Option<u32>,

    /// Seconds to wait for listings before treating the page as challenged
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Write results to CSV
    #[arg(long)]
    pub output_csv: bool,

    /// Write results to JSON
    #[arg(long)]
    pub output_json: bool,

    /// Run the browser headless (challenges can then only be cleared by
    /// saved cookies, not by hand)
    #[arg(long, overrides_with = "no_headless")]
    pub headless: bool,

    /// Run the browser with a visible window (default)
    #[arg(long)]
    pub no_headless: bool,
}

// ---------------------------------------------------------------------------
// Environment snapshot
// ---------------------------------------------------------------------------

/// Raw environment values, captured once. `None` = key unset.
#[derive(Debug, Default, Clone)]
pub struct RawSettings {
    pub job_title: Option<String>,
    pub location: Option<String>,
    pub radius: Option<String>,
    pub results_per_page: Option<String>,
    pub max_pages: Option<String>,
    pub output_csv: Option<String>,
    pub output_json: Option<String>,
    pub timeout: Option<String>,
    pub headless: Option<String>,
}

impl RawSettings {
    /// Snapshot the process environment. `.env` loading (dotenvy) must have
    /// happened before this is called; real env vars win over `.env` entries.
    pub fn from_env() -> Self {
        let get = |k: &str| std::env::var(k).ok();
        Self {
            job_title: get(ENV_JOB_TITLE),
            location: get(ENV_LOCATION),
            radius: get(ENV_RADIUS),
            results_per_page: get(ENV_RESULTS_PER_PAGE),
            max_pages: get(ENV_MAX_PAGES),
            output_csv: get(ENV_OUTPUT_CSV),
            output_json: get(ENV_OUTPUT_JSON),
            timeout: get(ENV_TIMEOUT),
            headless: get(ENV_HEADLESS),
        }
    }
}

/// Strip an inline `#` comment and surrounding whitespace from an env value.
/// `.env` files in the wild carry `RADIUS=25  # km` style annotations.
fn clean_value(value: &str) -> &str {
    match value.find('#') {
        Some(pos) => value[..pos].trim(),
        None => value.trim(),
    }
}

fn parse_num<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<&String>,
) -> Result<Option<T>, ConfigError> {
    match raw {
        Some(v) => {
            let cleaned = clean_value(v);
            if cleaned.is_empty() {
                return Ok(None);
            }
            cleaned
                .parse::<T>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidNumber {
                    key,
                    value: cleaned.to_string(),
                })
        }
        None => Ok(None),
    }
}

fn parse_bool(raw: Option<&String>) -> Option<bool> {
    raw.map(|v| clean_value(v).eq_ignore_ascii_case("true"))
}

// ---------------------------------------------------------------------------
// SearchConfig
// ---------------------------------------------------------------------------

/// Immutable settings for one run.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub job_title: String,
    pub location: String,
    pub radius: u32,
    pub results_per_page: u32,
    pub max_pages: u32,
    pub output_csv: bool,
    pub output_json: bool,
    pub timeout_secs: u64,
    pub headless: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            job_title: "software engineer".to_string(),
            location: "Berlin".to_string(),
            radius: 25,
            results_per_page: 15,
            max_pages: 5,
            output_csv: true,
            output_json: true,
            timeout_secs: 10,
            headless: false,
        }
    }
}

impl SearchConfig {
    /// Merge precedence: CLI > environment > default.
    ///
    /// Numeric env values that fail to parse are a hard error and abort
    /// before a browser ever launches.
    pub fn resolve(cli: &CliArgs, env: &RawSettings) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let radius = cli
            .radius
            .or(parse_num::<u32>(ENV_RADIUS, env.radius.as_ref())?)
            .unwrap_or(defaults.radius);
        let results_per_page = cli
            .results_per_page
            .or(parse_num::<u32>(
                ENV_RESULTS_PER_PAGE,
                env.results_per_page.as_ref(),
            )?)
            .unwrap_or(defaults.results_per_page);
        let max_pages = cli
            .max_pages
            .or(parse_num::<u32>(ENV_MAX_PAGES, env.max_pages.as_ref())?)
            .unwrap_or(defaults.max_pages);
        let timeout_secs = cli
            .timeout
            .or(parse_num::<u64>(ENV_TIMEOUT, env.timeout.as_ref())?)
            .unwrap_or(defaults.timeout_secs);

        if results_per_page == 0 {
            return Err(ConfigError::NonPositive {
                key: ENV_RESULTS_PER_PAGE,
                value: results_per_page.to_string(),
            });
        }
        if max_pages == 0 {
            return Err(ConfigError::NonPositive {
                key: ENV_MAX_PAGES,
                value: max_pages.to_string(),
            });
        }
        if timeout_secs == 0 {
            return Err(ConfigError::NonPositive {
                key: ENV_TIMEOUT,
                value: timeout_secs.to_string(),
            });
        }

        // Output flags: a bare `--output-csv` means "yes"; absence defers to
        // the environment, then to the on-by-default setting.
        let output_csv = if cli.output_csv {
            true
        } else {
            parse_bool(env.output_csv.as_ref()).unwrap_or(defaults.output_csv)
        };
        let output_json = if cli.output_json {
            true
        } else {
            parse_bool(env.output_json.as_ref()).unwrap_or(defaults.output_json)
        };

        let headless = if cli.headless {
            true
        } else if cli.no_headless {
            false
        } else {
            parse_bool(env.headless.as_ref()).unwrap_or(defaults.headless)
        };

        Ok(Self {
            job_title: cli
                .job_title
                .clone()
                .or_else(|| env.job_title.as_deref().map(|v| clean_value(v).to_string()))
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.job_title),
            location: cli
                .location
                .clone()
                .or_else(|| env.location.as_deref().map(|v| clean_value(v).to_string()))
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.location),
            radius,
            results_per_page,
            max_pages,
            output_csv,
            output_json,
            timeout_secs,
            headless,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn env(values: &[(&str, &str)]) -> RawSettings {
        let get = |k: &str| {
            values
                .iter()
                .find(|(key, _)| *key == k)
                .map(|(_, v)| v.to_string())
        };
        RawSettings {
            job_title: get(ENV_JOB_TITLE),
            location: get(ENV_LOCATION),
            radius: get(ENV_RADIUS),
            results_per_page: get(ENV_RESULTS_PER_PAGE),
            max_pages: get(ENV_MAX_PAGES),
            output_csv: get(ENV_OUTPUT_CSV),
            output_json: get(ENV_OUTPUT_JSON),
            timeout: get(ENV_TIMEOUT),
            headless: get(ENV_HEADLESS),
        }
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = SearchConfig::resolve(&CliArgs::default(), &RawSettings::default()).unwrap();
        assert_eq!(cfg.job_title, "software engineer");
        assert_eq!(cfg.location, "Berlin");
        assert_eq!(cfg.radius, 25);
        assert_eq!(cfg.max_pages, 5);
        assert!(cfg.output_csv && cfg.output_json);
        assert!(!cfg.headless);
    }

    #[test]
    fn cli_wins_over_env_for_every_field() {
        let cli = CliArgs {
            job_title: Some("rust developer".into()),
            location: Some("Hamburg".into()),
            radius: Some(50),
            max_pages: Some(2),
            results_per_page: Some(10),
            timeout: Some(30),
            headless: true,
            ..Default::default()
        };
        let environment = env(&[
            (ENV_JOB_TITLE, "data analyst"),
            (ENV_LOCATION, "München"),
            (ENV_RADIUS, "5"),
            (ENV_MAX_PAGES, "9"),
            (ENV_RESULTS_PER_PAGE, "50"),
            (ENV_TIMEOUT, "99"),
            (ENV_HEADLESS, "false"),
        ]);
        let cfg = SearchConfig::resolve(&cli, &environment).unwrap();
        assert_eq!(cfg.job_title, "rust developer");
        assert_eq!(cfg.location, "Hamburg");
        assert_eq!(cfg.radius, 50);
        assert_eq!(cfg.max_pages, 2);
        assert_eq!(cfg.results_per_page, 10);
        assert_eq!(cfg.timeout_secs, 30);
        assert!(cfg.headless);
    }

    #[test]
    fn env_wins_over_defaults() {
        let environment = env(&[(ENV_JOB_TITLE, "devops engineer"), (ENV_MAX_PAGES, "3")]);
        let cfg = SearchConfig::resolve(&CliArgs::default(), &environment).unwrap();
        assert_eq!(cfg.job_title, "devops engineer");
        assert_eq!(cfg.max_pages, 3);
    }

    #[test]
    fn inline_comments_are_stripped() {
        let environment = env(&[(ENV_RADIUS, "25  # km"), (ENV_JOB_TITLE, "qa tester # note")]);
        let cfg = SearchConfig::resolve(&CliArgs::default(), &environment).unwrap();
        assert_eq!(cfg.radius, 25);
        assert_eq!(cfg.job_title, "qa tester");
    }

    #[test]
    fn unparsable_number_is_an_error() {
        let environment = env(&[(ENV_MAX_PAGES, "many")]);
        let err = SearchConfig::resolve(&CliArgs::default(), &environment).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { key, .. } if key == ENV_MAX_PAGES));
    }

    #[test]
    fn zero_max_pages_is_rejected_but_zero_radius_is_fine() {
        let environment = env(&[(ENV_MAX_PAGES, "0")]);
        assert!(matches!(
            SearchConfig::resolve(&CliArgs::default(), &environment),
            Err(ConfigError::NonPositive { .. })
        ));

        let environment = env(&[(ENV_RADIUS, "0")]);
        let cfg = SearchConfig::resolve(&CliArgs::default(), &environment).unwrap();
        assert_eq!(cfg.radius, 0);
    }

    #[test]
    fn bool_parsing_is_case_insensitive() {
        let environment = env(&[(ENV_OUTPUT_CSV, "False"), (ENV_OUTPUT_JSON, "TRUE")]);
        let cfg = SearchConfig::resolve(&CliArgs::default(), &environment).unwrap();
        assert!(!cfg.output_csv);
        assert!(cfg.output_json);
    }
}
