use crate::analyzer::RepoAnalyzer;
use crate::transport::Transport;
use anyhow::Result;
use std::io::Write;

/// Every statistic of one run, in report order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoReport {
    pub commits: Vec<(String, u64)>,
    pub open_issues: u64,
    pub closed_issues: u64,
    pub open_pull_requests: u64,
    pub closed_pull_requests: u64,
    pub old_issues: u64,
    pub old_pull_requests: u64,
}

/// Computes all statistics in a fixed order and writes each line to `out` as soon as
/// its statistic is known, so long paginated walks show progress.
///
/// This keeps presentation separate from retrieval: the analyzer only returns values.
pub async fn write_full_report<T: Transport, W: Write>(
    analyzer: &RepoAnalyzer<T>,
    out: &mut W,
) -> Result<RepoReport> {
    writeln!(out, "Group user by commits:")?;
    let commits = analyzer.commit_tally().await?;
    for (author, count) in &commits {
        writeln!(out, "{} {}", author, count)?;
    }

    let open_issues = analyzer.open_issues().await?;
    writeln!(out, "Count opened issues: {}", open_issues)?;

    let closed_issues = analyzer.closed_issues().await?;
    writeln!(out, "Count closed issues: {}", closed_issues)?;

    let open_pull_requests = analyzer.open_pull_requests().await?;
    writeln!(out, "Count opened pull-requests: {}", open_pull_requests)?;

    let closed_pull_requests = analyzer.closed_pull_requests().await?;
    writeln!(out, "Count closed pull-requests: {}", closed_pull_requests)?;

    let old_issues = analyzer.old_issues().await?;
    writeln!(out, "Count \"old\" issues: {}", old_issues)?;

    let old_pull_requests = analyzer.old_pull_requests().await?;
    writeln!(out, "Count \"old\" requests: {}", old_pull_requests)?;

    out.flush()?;

    Ok(RepoReport {
        commits,
        open_issues,
        closed_issues,
        open_pull_requests,
        closed_pull_requests,
        old_issues,
        old_pull_requests,
    })
}
