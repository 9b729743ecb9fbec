use crate::model::{or, Event, Frame};
use crate::render::banner;
use crate::sentry::SentryClient;
use std::io::{self, Write};

const IN_APP_MARKER: &str = "→";
const LIBRARY_MARKER: &str = " ";

/// Fetch the latest event of an issue and print each exception's stack,
/// most recent call first.
pub fn extract_stacktrace(
    client: &SentryClient,
    issue_id: &str,
    out: &mut impl Write,
) -> anyhow::Result<Event> {
    let event = client.latest_event(issue_id)?;
    render_stacktrace(out, issue_id, &event)?;
    Ok(event)
}

pub fn render_stacktrace(out: &mut impl Write, issue_id: &str, event: &Event) -> io::Result<()> {
    banner(out, &format!("Stacktrace for Issue {}", issue_id))?;

    for exc in event.exceptions() {
        writeln!(
            out,
            "Exception: {}: {}",
            or(&exc.kind, "N/A"),
            or(&exc.value, "N/A")
        )?;
        writeln!(out)?;

        // Frames arrive outermost first.
        for frame in exc.frames().iter().rev() {
            render_frame(out, frame)?;
        }
    }
    Ok(())
}

fn render_frame(out: &mut impl Write, frame: &Frame) -> io::Result<()> {
    let marker = if frame.in_app {
        IN_APP_MARKER
    } else {
        LIBRARY_MARKER
    };
    writeln!(
        out,
        "{} {}:{} in {}()",
        marker,
        or(&frame.filename, "unknown"),
        or(&frame.lineno, "?"),
        or(&frame.function, "unknown")
    )?;

    if let Some(line) = frame.context_line.as_deref().filter(|l| !l.trim().is_empty()) {
        writeln!(out, "    {}", line.trim())?;
    }
    writeln!(out)
}
