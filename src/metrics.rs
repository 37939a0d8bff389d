use crate::config::DateWindow;
use crate::types::{ClosedRecord, CommitRecord, Contributor, TimelineRecord, UNKNOWN_AUTHOR};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::collections::HashMap;

const END_OF_DAY_HOUR: u32 = 23;
const END_OF_DAY_MIN: u32 = 59;
const END_OF_DAY_SEC: u32 = 59;

/// Commit counts per author, remembering the order in which authors were first seen
/// so that ranking is stable for equal counts.
#[derive(Debug, Default, Clone)]
pub struct CommitTally {
    index: HashMap<String, usize>,
    entries: Vec<(String, u64)>,
}

impl CommitTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, author: &str, commits: u64) {
        match self.index.get(author) {
            Some(&i) => self.entries[i].1 += commits,
            None => {
                self.index.insert(author.to_string(), self.entries.len());
                self.entries.push((author.to_string(), commits));
            }
        }
    }

    pub fn get(&self, author: &str) -> Option<u64> {
        self.index.get(author).map(|&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Authors sorted by descending count, ties in first-seen order, truncated to `limit`.
    pub fn ranked(mut self, limit: usize) -> Vec<(String, u64)> {
        // sort_by is stable
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries.truncate(limit);
        self.entries
    }
}

/// Sums `contributions` per login over the first `limit` contributors.
pub fn tally_contributors(contributors: &[Contributor], limit: usize) -> CommitTally {
    let mut tally = CommitTally::new();
    for contributor in contributors.iter().take(limit) {
        let login = contributor.login.as_deref().unwrap_or(UNKNOWN_AUTHOR);
        tally.add(login, contributor.contributions);
    }
    tally
}

/// Adds one commit per record to its author. Commits without a linked author are skipped.
pub fn tally_commits(tally: &mut CommitTally, commits: &[CommitRecord]) {
    for author in commits.iter().filter_map(|c| c.author.as_ref()) {
        tally.add(author.login.as_deref().unwrap_or(UNKNOWN_AUTHOR), 1);
    }
}

/// Number of records closed on a day inside `window`.
pub fn count_closed_in_window(records: &[ClosedRecord], window: &DateWindow) -> usize {
    records
        .iter()
        .filter(|r| window.contains(r.closed_at.date_naive()))
        .count()
}

/// Whole days between creation and closing, or `now` for items still open.
pub fn age_in_days(record: &TimelineRecord, now: DateTime<Utc>) -> i64 {
    (record.closed_at.unwrap_or(now) - record.created_at).num_days()
}

/// Counts records created inside `window` whose age reaches `threshold_days`.
///
/// With no bounds set every record is eligible; with one bound the window is
/// open-ended on the other side.
pub fn count_old(
    records: &[TimelineRecord],
    window: &DateWindow,
    threshold_days: i64,
    now: DateTime<Utc>,
) -> usize {
    records
        .iter()
        .filter(|r| window.contains(r.created_at.date_naive()))
        .filter(|r| age_in_days(r, now) >= threshold_days)
        .count()
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Last second of `date`, so an `until` bound covers the whole day.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(END_OF_DAY_HOUR, END_OF_DAY_MIN, END_OF_DAY_SEC)
        .expect("23:59:59 is a valid time");
    date.and_time(time).and_utc()
}

/// ISO 8601 form accepted by the `since`/`until` query parameters.
pub fn iso8601(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
