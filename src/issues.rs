use crate::model::{or, IssueSummary};
use crate::render::banner;
use crate::sentry::SentryClient;
use std::io::{self, Write};

pub const DEFAULT_QUERY: &str = "is:unresolved";
pub const DEFAULT_PERIOD: &str = "24h";
/// Only this many issues are printed; the caller still gets all of them.
pub const MAX_LISTED: usize = 20;

pub struct IssueQuery<'a> {
    pub org: &'a str,
    pub project: &'a str,
    pub query: &'a str,
    pub period: &'a str,
}

/// Fetch issues for a project and print a summary of the first [`MAX_LISTED`].
pub fn list_issues(
    client: &SentryClient,
    params: &IssueQuery<'_>,
    out: &mut impl Write,
) -> anyhow::Result<Vec<IssueSummary>> {
    let issues = client.list_issues(params.org, params.project, params.query, params.period)?;
    render_issues(out, params, &issues)?;
    Ok(issues)
}

pub fn render_issues(
    out: &mut impl Write,
    params: &IssueQuery<'_>,
    issues: &[IssueSummary],
) -> io::Result<()> {
    banner(
        out,
        &format!(
            "Issues in {}/{} ({}, last {})",
            params.org, params.project, params.query, params.period
        ),
    )?;

    if issues.is_empty() {
        writeln!(out, "No issues found.")?;
        return Ok(());
    }

    for issue in issues.iter().take(MAX_LISTED) {
        writeln!(
            out,
            "[{}] {}",
            or(&issue.short_id, "?"),
            or(&issue.title, "(untitled)")
        )?;
        writeln!(
            out,
            "  ID: {} | Events: {} | Users: {}",
            or(&issue.id, "?"),
            or(&issue.count, "0"),
            or(&issue.user_count, "0")
        )?;
        writeln!(out, "  Last seen: {}", or(&issue.last_seen, "N/A"))?;
        writeln!(out, "  Culprit: {}", or(&issue.culprit, "N/A"))?;
        writeln!(out)?;
    }
    Ok(())
}
