//! Analyzer configuration and environment variable parsing.
//!
//! This module turns the raw user inputs (repository URL, optional dates, branch and
//! access token) into a validated, immutable `AnalyzerConfig`. Tunables such as page
//! size and staleness thresholds live in `AnalyzerSettings`, loaded from
//! `REPOSTATS_`-prefixed environment variables with sensible defaults.

use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Input format for the optional date bounds, e.g. `01.01.2017`.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

const MIN_CREDENTIAL_LEN: usize = 2;
const ENV_PREFIX: &str = "REPOSTATS_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("wrong repository url: '{0}'")]
    InvalidRepositoryUrl(String),

    #[error("wrong date format '{value}', expected DD.MM.YYYY (e.g. 01.01.2017)")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("access token must not be empty (at least 2 characters)")]
    MissingCredential,

    #[error("invalid settings: {0}")]
    Settings(#[from] envy::Error),
}

/// A unique identifier for a GitHub repository.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepoId {
    /// The owner of the repository (e.g., "facebook").
    pub owner: String,
    /// The name of the repository (e.g., "react").
    pub repo: String,
}

impl RepoId {
    /// Extracts `owner/name` from a repository URL such as
    /// `https://github.com/rust-lang/rust/tree/master`.
    ///
    /// A missing scheme is tolerated (`github.com/x/y`). Anything after the
    /// second path segment is ignored.
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let trimmed = url.trim();
        let invalid = || ConfigError::InvalidRepositoryUrl(trimmed.to_string());

        let parsed = Url::parse(trimmed)
            .or_else(|_| Url::parse(&format!("https://{trimmed}")))
            .map_err(|_| invalid())?;

        let mut segments = parsed
            .path_segments()
            .into_iter()
            .flatten()
            .filter(|segment| !segment.is_empty());

        match (segments.next(), segments.next()) {
            (Some(owner), Some(repo)) => Ok(Self {
                owner: owner.to_string(),
                repo: repo.to_string(),
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Optional calendar-date bounds applied to every statistic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub begin: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    /// Parses both bounds. Empty or absent strings leave the bound unset.
    pub fn parse(begin: Option<&str>, end: Option<&str>) -> Result<Self, ConfigError> {
        Ok(Self {
            begin: parse_date(begin)?,
            end: parse_date(end)?,
        })
    }

    pub fn is_set(&self) -> bool {
        self.begin.is_some() || self.end.is_some()
    }

    /// Inclusive at both ends. A window with no bounds contains every date.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.begin.map_or(true, |begin| date >= begin) && self.end.map_or(true, |end| date <= end)
    }
}

/// Parses a `DD.MM.YYYY` date. Blank input means "no filter", not an error.
pub fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>, ConfigError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, DATE_FORMAT)
            .map(Some)
            .map_err(|source| ConfigError::InvalidDate {
                value: v.to_string(),
                source,
            }),
    }
}

/// What the analyzer does when a request fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log and treat the failure as "no more data" (paging) or zero (search counts).
    #[default]
    Truncate,
    /// Propagate the failure to the caller.
    Abort,
}

/// Tunables injected into the analyzer, loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AnalyzerSettings {
    /// Root of the REST API. Must end with a slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Branch assumed when none is given. Enables the contributors fast path.
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// `per_page` value for paginated endpoints.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Number of contributors considered on the fast path and ranked entries reported.
    #[serde(default = "default_top_contributors")]
    pub top_contributors: usize,

    /// Age in days from which an issue counts as old.
    #[serde(default = "default_issue_stale_days")]
    pub issue_stale_days: i64,

    /// Age in days from which a pull request counts as old.
    #[serde(default = "default_pull_request_stale_days")]
    pub pull_request_stale_days: i64,

    /// Optional hard limit on pages fetched per paginated walk.
    #[serde(default)]
    pub max_pages: Option<u32>,

    #[serde(default)]
    pub on_transport_failure: FailurePolicy,
}

fn default_base_url() -> String {
    "https://api.github.com/".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_top_contributors() -> usize {
    30
}

fn default_issue_stale_days() -> i64 {
    14
}

fn default_pull_request_stale_days() -> i64 {
    30
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_branch: default_branch(),
            page_size: default_page_size(),
            top_contributors: default_top_contributors(),
            issue_stale_days: default_issue_stale_days(),
            pull_request_stale_days: default_pull_request_stale_days(),
            max_pages: None,
            on_transport_failure: FailurePolicy::default(),
        }
    }
}

impl AnalyzerSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::prefixed(ENV_PREFIX).from_env()?)
    }
}

/// Access token. Never printed by `Debug`.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Validated configuration shared read-only by every statistic.
#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    pub repo: RepoId,
    pub window: DateWindow,
    pub branch: String,
    pub credential: Credential,
    pub settings: AnalyzerSettings,
}

impl AnalyzerConfig {
    /// Validates raw inputs. Fails before any network activity on a bad URL,
    /// an unparseable date, or a missing/too-short credential.
    pub fn new(
        url: &str,
        date_begin: Option<&str>,
        date_end: Option<&str>,
        branch: Option<&str>,
        credential: Option<&str>,
        settings: AnalyzerSettings,
    ) -> Result<Self, ConfigError> {
        let repo = RepoId::from_url(url)?;
        let window = DateWindow::parse(date_begin, date_end)?;

        let branch = branch
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| settings.default_branch.clone());

        let credential = credential
            .filter(|c| c.chars().count() >= MIN_CREDENTIAL_LEN)
            .map(|c| Credential(c.to_string()))
            .ok_or(ConfigError::MissingCredential)?;

        Ok(Self {
            repo,
            window,
            branch,
            credential,
            settings,
        })
    }

    pub fn is_default_branch(&self) -> bool {
        self.branch == self.settings.default_branch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_repo_id_from_url() {
        let id = RepoId::from_url("https://github.com/rust-lang/cargo").unwrap();
        assert_eq!(id.owner, "rust-lang");
        assert_eq!(id.repo, "cargo");
        assert_eq!(id.to_string(), "rust-lang/cargo");

        let id = RepoId::from_url("https://github.com/x/y/tree/main/src").unwrap();
        assert_eq!((id.owner.as_str(), id.repo.as_str()), ("x", "y"));

        let id = RepoId::from_url("github.com/x/y").unwrap();
        assert_eq!((id.owner.as_str(), id.repo.as_str()), ("x", "y"));
    }

    #[test]
    fn test_repo_id_rejects_short_urls() {
        assert!(RepoId::from_url("").is_err());
        assert!(RepoId::from_url("https://github.com").is_err());
        assert!(RepoId::from_url("https://github.com/").is_err());
        assert!(RepoId::from_url("https://github.com/only-owner").is_err());
        assert!(RepoId::from_url("https://github.com//y").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(Some("01.01.2017")).unwrap(), Some(date(2017, 1, 1)));
        assert_eq!(parse_date(Some("02.06.2017")).unwrap(), Some(date(2017, 6, 2)));
        assert_eq!(parse_date(Some("")).unwrap(), None);
        assert_eq!(parse_date(Some("   ")).unwrap(), None);
        assert_eq!(parse_date(None).unwrap(), None);

        assert!(matches!(
            parse_date(Some("2017-01-01")),
            Err(ConfigError::InvalidDate { .. })
        ));
        assert!(parse_date(Some("31.02.2017")).is_err());
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let window = DateWindow {
            begin: Some(date(2024, 1, 1)),
            end: Some(date(2024, 1, 31)),
        };
        assert!(window.contains(date(2024, 1, 1)));
        assert!(window.contains(date(2024, 1, 31)));
        assert!(!window.contains(date(2023, 12, 31)));
        assert!(!window.contains(date(2024, 2, 1)));

        let from = DateWindow {
            begin: Some(date(2024, 1, 1)),
            end: None,
        };
        assert!(from.contains(date(2030, 1, 1)));
        assert!(!from.contains(date(2023, 12, 31)));

        let until = DateWindow {
            begin: None,
            end: Some(date(2024, 1, 1)),
        };
        assert!(until.contains(date(2000, 1, 1)));
        assert!(!until.contains(date(2024, 1, 2)));

        assert!(!DateWindow::default().is_set());
        assert!(DateWindow::default().contains(date(1970, 1, 1)));
    }

    #[test]
    fn test_config_defaults_branch_and_validates_credential() {
        let config = AnalyzerConfig::new(
            "https://github.com/x/y",
            None,
            Some(""),
            Some(""),
            Some("abc"),
            AnalyzerSettings::default(),
        )
        .unwrap();
        assert_eq!(config.branch, "master");
        assert!(config.is_default_branch());
        assert!(!config.window.is_set());
        assert_eq!(config.credential.expose(), "abc");
        assert!(!format!("{config:?}").contains("abc"));

        for credential in [None, Some(""), Some("a")] {
            let result = AnalyzerConfig::new(
                "https://github.com/x/y",
                None,
                None,
                None,
                credential,
                AnalyzerSettings::default(),
            );
            assert!(matches!(result, Err(ConfigError::MissingCredential)));
        }
    }

    #[test]
    fn test_config_rejects_bad_url_and_dates() {
        let bad_url = AnalyzerConfig::new(
            "not a url",
            None,
            None,
            None,
            Some("abc"),
            AnalyzerSettings::default(),
        );
        assert!(matches!(bad_url, Err(ConfigError::InvalidRepositoryUrl(_))));

        let bad_date = AnalyzerConfig::new(
            "https://github.com/x/y",
            Some("2017-01-01"),
            None,
            None,
            Some("abc"),
            AnalyzerSettings::default(),
        );
        assert!(matches!(bad_date, Err(ConfigError::InvalidDate { .. })));
    }

    #[test]
    #[serial]
    fn test_settings_from_env() {
        env::set_var("REPOSTATS_DEFAULT_BRANCH", "main");
        env::set_var("REPOSTATS_PAGE_SIZE", "50");
        env::set_var("REPOSTATS_ISSUE_STALE_DAYS", "7");
        env::set_var("REPOSTATS_MAX_PAGES", "3");
        env::set_var("REPOSTATS_ON_TRANSPORT_FAILURE", "abort");

        let settings = AnalyzerSettings::from_env().expect("Failed to load settings");

        assert_eq!(settings.default_branch, "main");
        assert_eq!(settings.page_size, 50);
        assert_eq!(settings.issue_stale_days, 7);
        assert_eq!(settings.pull_request_stale_days, 30);
        assert_eq!(settings.top_contributors, 30);
        assert_eq!(settings.max_pages, Some(3));
        assert_eq!(settings.on_transport_failure, FailurePolicy::Abort);
        assert_eq!(settings.base_url, "https://api.github.com/");

        // Clean up
        env::remove_var("REPOSTATS_DEFAULT_BRANCH");
        env::remove_var("REPOSTATS_PAGE_SIZE");
        env::remove_var("REPOSTATS_ISSUE_STALE_DAYS");
        env::remove_var("REPOSTATS_MAX_PAGES");
        env::remove_var("REPOSTATS_ON_TRANSPORT_FAILURE");
    }

    #[test]
    #[serial]
    fn test_settings_invalid_value() {
        env::set_var("REPOSTATS_PAGE_SIZE", "lots");
        let result = AnalyzerSettings::from_env();
        assert!(matches!(result, Err(ConfigError::Settings(_))));
        env::remove_var("REPOSTATS_PAGE_SIZE");
    }
}
