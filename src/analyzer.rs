//! Repository statistics computed from the GitHub REST API.
//!
//! `RepoAnalyzer` owns the validated configuration and a `Transport`. Each public
//! method computes one statistic:
//! 1. Building the endpoint URL (server-side filters, branch, credential).
//! 2. Walking pages sequentially until an empty page, or issuing one search request.
//! 3. Decoding raw records into typed ones and reducing them with `metrics`.
//!
//! Request failures are handled according to `FailurePolicy`: by default they end
//! pagination (or count as zero) after a warning.

use crate::config::{AnalyzerConfig, DateWindow, FailurePolicy};
use crate::metrics::{self, CommitTally};
use crate::transport::{redact, Transport, TransportError};
use crate::types::{ClosedRecord, CommitRecord, Contributor, SearchCount, TimelineRecord};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

const SEARCH_PATH: &str = "search/issues";

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("malformed record from {endpoint}: {source}")]
    MalformedRecord {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a JSON array from {url}")]
    UnexpectedShape { url: String },
}

/// Item type filter of the search endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Issue,
    PullRequest,
}

impl ItemKind {
    fn as_str(self) -> &'static str {
        match self {
            ItemKind::Issue => "issue",
            ItemKind::PullRequest => "pr",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemState {
    Open,
    Closed,
}

impl ItemState {
    fn as_str(self) -> &'static str {
        match self {
            ItemState::Open => "open",
            ItemState::Closed => "closed",
        }
    }

    /// Timestamp the date window applies to in search queries.
    fn date_field(self) -> &'static str {
        match self {
            ItemState::Open => "created",
            ItemState::Closed => "closed",
        }
    }
}

/// Repository collections that can be listed page by page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collection {
    Issues,
    Pulls,
}

impl Collection {
    fn as_str(self) -> &'static str {
        match self {
            Collection::Issues => "issues",
            Collection::Pulls => "pulls",
        }
    }
}

type Query = Vec<(&'static str, String)>;

pub struct RepoAnalyzer<T> {
    config: AnalyzerConfig,
    transport: T,
}

impl<T: Transport> RepoAnalyzer<T> {
    pub fn new(config: AnalyzerConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Commits per author, highest first, limited to `top_contributors` entries.
    ///
    /// On the default branch without a date window a single contributors request is
    /// enough. Otherwise every commit of the branch within the window is enumerated.
    pub async fn commit_tally(&self) -> Result<Vec<(String, u64)>, AnalyzerError> {
        let tally = if self.config.is_default_branch() && !self.config.window.is_set() {
            self.contributors_tally().await?
        } else {
            self.commits_tally().await?
        };

        let ranked = tally.ranked(self.config.settings.top_contributors);
        tracing::info!(repo = %self.config.repo, authors = ranked.len(), "Computed commit tally");
        Ok(ranked)
    }

    pub async fn open_issues(&self) -> Result<u64, AnalyzerError> {
        self.search_count(ItemKind::Issue, ItemState::Open).await
    }

    pub async fn closed_issues(&self) -> Result<u64, AnalyzerError> {
        self.search_count(ItemKind::Issue, ItemState::Closed).await
    }

    pub async fn open_pull_requests(&self) -> Result<u64, AnalyzerError> {
        self.search_count(ItemKind::PullRequest, ItemState::Open).await
    }

    /// Closed pull requests, counted by listing them.
    ///
    /// The search endpoint reports wrong totals for closed pull requests, so each
    /// page is enumerated and `closed_at` is matched against the window locally.
    pub async fn closed_pull_requests(&self) -> Result<u64, AnalyzerError> {
        let path = self.repo_path("pulls");
        let mut query: Query = vec![
            ("per_page", self.config.settings.page_size.to_string()),
            ("state", "closed".to_string()),
        ];
        if let Some(base) = self.base_filter() {
            query.push(("base", base));
        }

        let window = self.config.window;
        let mut count = 0u64;
        self.for_each_page(&path, &query, |records| {
            if window.is_set() {
                let closed: Vec<ClosedRecord> = decode(&path, records)?;
                count += metrics::count_closed_in_window(&closed, &window) as u64;
            } else {
                count += records.len() as u64;
            }
            Ok(())
        })
        .await?;

        tracing::info!(repo = %self.config.repo, count, "Counted closed pull requests");
        Ok(count)
    }

    pub async fn old_issues(&self) -> Result<u64, AnalyzerError> {
        self.old_items(Collection::Issues, self.config.settings.issue_stale_days, Utc::now())
            .await
    }

    pub async fn old_pull_requests(&self) -> Result<u64, AnalyzerError> {
        self.old_items(
            Collection::Pulls,
            self.config.settings.pull_request_stale_days,
            Utc::now(),
        )
        .await
    }

    /// Counts items of `collection` created inside the window that stayed open for at
    /// least `threshold_days` (until closing, or until `now` if still open).
    pub async fn old_items(
        &self,
        collection: Collection,
        threshold_days: i64,
        now: DateTime<Utc>,
    ) -> Result<u64, AnalyzerError> {
        let path = self.repo_path(collection.as_str());
        let mut query: Query = vec![
            ("state", "all".to_string()),
            ("per_page", self.config.settings.page_size.to_string()),
        ];
        if collection == Collection::Pulls {
            if let Some(base) = self.base_filter() {
                query.push(("base", base));
            }
        }

        let window = self.config.window;
        let mut count = 0u64;
        self.for_each_page(&path, &query, |records| {
            let items: Vec<TimelineRecord> = decode(&path, records)?;
            count += metrics::count_old(&items, &window, threshold_days, now) as u64;
            Ok(())
        })
        .await?;

        tracing::info!(
            repo = %self.config.repo,
            collection = collection.as_str(),
            threshold_days,
            count,
            "Counted old items"
        );
        Ok(count)
    }

    /// Unencoded search query, e.g. `repo:x/y+type:issue+is:open`.
    pub fn search_query(&self, kind: ItemKind, state: ItemState) -> String {
        self.search_terms(kind, state).join("+")
    }

    fn search_terms(&self, kind: ItemKind, state: ItemState) -> Vec<String> {
        let mut terms = vec![
            format!("repo:{}", self.config.repo),
            format!("type:{}", kind.as_str()),
            format!("is:{}", state.as_str()),
        ];
        if kind == ItemKind::PullRequest && !self.config.is_default_branch() {
            terms.push(format!("base:{}", self.config.branch));
        }
        if let Some(clause) = date_clause(&self.config.window) {
            terms.push(format!("{}:{}", state.date_field(), clause));
        }
        terms
    }

    async fn search_count(&self, kind: ItemKind, state: ItemState) -> Result<u64, AnalyzerError> {
        let q = self
            .search_terms(kind, state)
            .iter()
            .map(|term| urlencoding::encode(term).into_owned())
            .collect::<Vec<_>>()
            .join("+");
        let url = self.url(SEARCH_PATH, &[("q", q)]);

        let count = match self.request(&url).await? {
            Some(body) => {
                serde_json::from_value::<SearchCount>(body)
                    .map_err(|source| AnalyzerError::MalformedRecord {
                        endpoint: SEARCH_PATH.to_string(),
                        source,
                    })?
                    .total_count
            }
            None => 0,
        };

        tracing::info!(
            repo = %self.config.repo,
            kind = kind.as_str(),
            state = state.as_str(),
            count,
            "Counted items via search"
        );
        Ok(count)
    }

    async fn contributors_tally(&self) -> Result<CommitTally, AnalyzerError> {
        let limit = self.config.settings.top_contributors;
        let path = self.repo_path("contributors");
        let url = self.url(&path, &[("page", "1".to_string())]);

        let mut records = self.fetch_page(&url).await?;
        records.truncate(limit);
        let contributors: Vec<Contributor> = decode(&path, records)?;

        Ok(metrics::tally_contributors(&contributors, limit))
    }

    async fn commits_tally(&self) -> Result<CommitTally, AnalyzerError> {
        let path = self.repo_path("commits");
        let window = self.config.window;

        let mut query: Query = Vec::new();
        if let Some(begin) = window.begin {
            query.push(("since", metrics::iso8601(metrics::start_of_day(begin))));
        }
        if let Some(end) = window.end {
            query.push(("until", metrics::iso8601(metrics::end_of_day(end))));
        }
        query.push(("sha", urlencoding::encode(&self.config.branch).into_owned()));
        query.push(("per_page", self.config.settings.page_size.to_string()));

        let mut tally = CommitTally::new();
        self.for_each_page(&path, &query, |records| {
            let commits: Vec<CommitRecord> = decode(&path, records)?;
            metrics::tally_commits(&mut tally, &commits);
            Ok(())
        })
        .await?;

        Ok(tally)
    }

    /// Requests pages 1, 2, ... of `path` and hands each non-empty page to `visit`.
    /// Stops at the first empty page, or at `max_pages` when configured.
    ///
    /// Returns the number of pages consumed.
    async fn for_each_page<F>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
        mut visit: F,
    ) -> Result<u32, AnalyzerError>
    where
        F: FnMut(Vec<Value>) -> Result<(), AnalyzerError>,
    {
        let mut consumed = 0u32;

        loop {
            if let Some(max_pages) = self.config.settings.max_pages {
                if consumed >= max_pages {
                    tracing::warn!(
                        "Hit max_pages ({}) for {} before reaching the last page. Data may be incomplete.",
                        max_pages,
                        path
                    );
                    break;
                }
            }

            let page = consumed + 1;
            let mut page_query = query.to_vec();
            page_query.push(("page", page.to_string()));
            let url = self.url(path, &page_query);

            let records = self.fetch_page(&url).await?;
            if records.is_empty() {
                break;
            }

            tracing::debug!(path, page, records = records.len(), "Fetched page");
            visit(records)?;
            consumed = page;
        }

        Ok(consumed)
    }

    /// One page of raw records. Failures and non-array bodies read as an empty page
    /// under `FailurePolicy::Truncate`.
    async fn fetch_page(&self, url: &str) -> Result<Vec<Value>, AnalyzerError> {
        match self.request(url).await? {
            Some(Value::Array(records)) => Ok(records),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(_) => match self.config.settings.on_transport_failure {
                FailurePolicy::Truncate => {
                    tracing::warn!(url = %redact(url), "Expected a JSON array, treating as end of data");
                    Ok(Vec::new())
                }
                FailurePolicy::Abort => Err(AnalyzerError::UnexpectedShape { url: redact(url) }),
            },
        }
    }

    async fn request(&self, url: &str) -> Result<Option<Value>, AnalyzerError> {
        match self.transport.fetch(url).await {
            Ok(body) => Ok(Some(body)),
            Err(source) => match self.config.settings.on_transport_failure {
                FailurePolicy::Truncate => {
                    tracing::warn!(url = %redact(url), error = %source, "GitHub request failed, treating as no data");
                    Ok(None)
                }
                FailurePolicy::Abort => Err(AnalyzerError::Transport {
                    url: redact(url),
                    source,
                }),
            },
        }
    }

    fn repo_path(&self, endpoint: &str) -> String {
        format!(
            "repos/{}/{}/{}",
            self.config.repo.owner, self.config.repo.repo, endpoint
        )
    }

    /// `base` query value, only set when analyzing a non-default branch.
    fn base_filter(&self) -> Option<String> {
        (!self.config.is_default_branch())
            .then(|| urlencoding::encode(&self.config.branch).into_owned())
    }

    /// Fully qualified URL with the credential appended. Query values must already be encoded.
    fn url(&self, path: &str, query: &[(&'static str, String)]) -> String {
        let mut url = format!("{}{}?", self.config.settings.base_url, path);
        for (key, value) in query {
            url.push_str(key);
            url.push('=');
            url.push_str(value);
            url.push('&');
        }
        url.push_str("access_token=");
        url.push_str(&urlencoding::encode(self.config.credential.expose()));
        url
    }
}

fn decode<R: DeserializeOwned>(endpoint: &str, records: Vec<Value>) -> Result<Vec<R>, AnalyzerError> {
    records
        .into_iter()
        .map(|record| {
            serde_json::from_value(record).map_err(|source| AnalyzerError::MalformedRecord {
                endpoint: endpoint.to_string(),
                source,
            })
        })
        .collect()
}

/// Search qualifier value for the window: `>=begin`, `<=end`, `begin..end`, or nothing.
fn date_clause(window: &DateWindow) -> Option<String> {
    let day = |date: NaiveDate| date.format("%Y-%m-%d").to_string();
    match (window.begin, window.end) {
        (Some(begin), None) => Some(format!(">={}", day(begin))),
        (None, Some(end)) => Some(format!("<={}", day(end))),
        (Some(begin), Some(end)) => Some(format!("{}..{}", day(begin), day(end))),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_clause() {
        let begin = Some(date(2017, 1, 1));
        let end = Some(date(2017, 6, 30));

        assert_eq!(date_clause(&DateWindow::default()), None);
        assert_eq!(
            date_clause(&DateWindow { begin, end: None }).as_deref(),
            Some(">=2017-01-01")
        );
        assert_eq!(
            date_clause(&DateWindow { begin: None, end }).as_deref(),
            Some("<=2017-06-30")
        );
        assert_eq!(
            date_clause(&DateWindow { begin, end }).as_deref(),
            Some("2017-01-01..2017-06-30")
        );
    }
}
