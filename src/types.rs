//! Typed views of the GitHub REST records this crate reads.
//!
//! Each struct carries only the fields a statistic needs. Optional fields are
//! optional because the API omits them (e.g. commits whose author has no GitHub
//! account), not for convenience.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Author name used when the API does not report a login.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Entry of `repos/{owner}/{repo}/contributors`.
#[derive(Debug, Deserialize, Clone)]
pub struct Contributor {
    pub login: Option<String>,
    #[serde(default)]
    pub contributions: u64,
}

/// Entry of `repos/{owner}/{repo}/commits`.
#[derive(Debug, Deserialize, Clone)]
pub struct CommitRecord {
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommitAuthor {
    pub login: Option<String>,
}

/// Body of `search/issues`. Only the aggregate count is used.
#[derive(Debug, Deserialize, Clone)]
pub struct SearchCount {
    #[serde(default)]
    pub total_count: u64,
}

/// A closed issue or pull request; `closed_at` is guaranteed for `state=closed`.
#[derive(Debug, Deserialize, Clone)]
pub struct ClosedRecord {
    pub closed_at: DateTime<Utc>,
}

/// An issue or pull request of any state.
#[derive(Debug, Deserialize, Clone)]
pub struct TimelineRecord {
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_decode_missing_optional_fields() {
        let contributor: Contributor = serde_json::from_value(json!({ "id": 1 })).unwrap();
        assert_eq!(contributor.login, None);
        assert_eq!(contributor.contributions, 0);

        let commit: CommitRecord = serde_json::from_value(json!({ "author": null })).unwrap();
        assert!(commit.author.is_none());

        let count: SearchCount = serde_json::from_value(json!({ "items": [] })).unwrap();
        assert_eq!(count.total_count, 0);
    }

    #[test]
    fn test_decode_timestamps() {
        let record: TimelineRecord = serde_json::from_value(json!({
            "created_at": "2017-03-01T10:15:00Z",
            "closed_at": null
        }))
        .unwrap();
        assert_eq!(
            record.created_at,
            Utc.with_ymd_and_hms(2017, 3, 1, 10, 15, 0).unwrap()
        );
        assert!(record.closed_at.is_none());

        let missing = serde_json::from_value::<TimelineRecord>(json!({ "closed_at": null }));
        assert!(missing.is_err());

        let garbled = serde_json::from_value::<ClosedRecord>(json!({ "closed_at": "yesterday" }));
        assert!(garbled.is_err());
    }
}
