use crate::model::{display_value, or, Breadcrumb, Entry, Event};
use crate::render::banner;
use crate::sentry::SentryClient;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use std::io::{self, Write};
use tracing::debug;

const MAX_TAGS: usize = 10;
const MAX_CONTEXT_FIELDS: usize = 3;
const MAX_BREADCRUMBS: usize = 10;

/// Fetch the latest event of an issue and print its details.
pub fn inspect_latest_event(
    client: &SentryClient,
    issue_id: &str,
    out: &mut impl Write,
) -> anyhow::Result<Event> {
    let event = client.latest_event(issue_id)?;
    render_event(out, issue_id, &event)?;
    Ok(event)
}

pub fn render_event(out: &mut impl Write, issue_id: &str, event: &Event) -> io::Result<()> {
    banner(out, &format!("Latest Event for Issue {}", issue_id))?;

    writeln!(out, "Event ID: {}", or(&event.event_id, "N/A"))?;
    writeln!(out, "Timestamp: {}", or(&event.date_created, "N/A"))?;
    writeln!(out, "Message: {}", or(&event.message, "N/A"))?;

    if let Some(user) = &event.user {
        writeln!(out)?;
        writeln!(out, "User: {}", user.label())?;
    }

    if !event.tags.is_empty() {
        writeln!(out)?;
        writeln!(out, "Tags:")?;
        for tag in event.tags.iter().take(MAX_TAGS) {
            writeln!(out, "  {}: {}", or(&tag.key, "?"), display_value(&tag.value))?;
        }
    }

    if !event.contexts.is_empty() {
        writeln!(out)?;
        writeln!(out, "Contexts:")?;
        for (name, data) in &event.contexts {
            // Only object-shaped contexts have fields worth summarising.
            if let Value::Object(fields) = data {
                let summary = fields
                    .iter()
                    .take(MAX_CONTEXT_FIELDS)
                    .map(|(k, v)| format!("{}={}", k, display_value(v)))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(out, "  {}: {}", name, summary)?;
            }
        }
    }

    for entry in &event.entries {
        match entry {
            Entry::Exception(data) => {
                writeln!(out)?;
                writeln!(out, "--- EXCEPTION ---")?;
                for exc in &data.values {
                    writeln!(out, "Type: {}", or(&exc.kind, "N/A"))?;
                    writeln!(out, "Value: {}", or(&exc.value, "N/A"))?;
                }
            }
            Entry::Breadcrumbs(data) => {
                writeln!(out)?;
                writeln!(out, "--- BREADCRUMBS (last {}) ---", MAX_BREADCRUMBS)?;
                for crumb in last_breadcrumbs(&data.values) {
                    writeln!(
                        out,
                        "  [{}] {}: {}",
                        crumb_time(&crumb.timestamp),
                        or(&crumb.category, "default"),
                        or(&crumb.message, "")
                    )?;
                }
            }
            Entry::Request(data) => {
                writeln!(out)?;
                writeln!(out, "--- REQUEST ---")?;
                writeln!(
                    out,
                    "  {} {}",
                    or(&data.method, "GET"),
                    or(&data.url, "N/A")
                )?;
            }
            Entry::Other(raw) => {
                debug!(entry_type = ?raw.get("type"), "skipping entry");
            }
        }
    }

    Ok(())
}

/// The trailing window of breadcrumbs, oldest first.
pub fn last_breadcrumbs(crumbs: &[Breadcrumb]) -> &[Breadcrumb] {
    &crumbs[crumbs.len().saturating_sub(MAX_BREADCRUMBS)..]
}

/// `HH:MM:SS` (UTC) for a breadcrumb timestamp.
///
/// Accepts RFC 3339 strings, naive ISO-8601 strings and epoch seconds. Anything
/// else is shown as its last 8 characters, which is the time part of most
/// ISO-8601-ish strings but is not validated.
pub fn crumb_time(timestamp: &Value) -> String {
    let parsed = match timestamp {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            }),
        Value::Number(n) => n.as_f64().and_then(|secs| {
            DateTime::from_timestamp(secs.trunc() as i64, 0)
        }),
        _ => None,
    };

    match (parsed, timestamp) {
        (Some(dt), _) => dt.format("%H:%M:%S").to_string(),
        (None, Value::String(s)) => {
            let skip = s.chars().count().saturating_sub(8);
            s.chars().skip(skip).collect()
        }
        (None, Value::Null) => String::new(),
        (None, other) => display_value(other),
    }
}
