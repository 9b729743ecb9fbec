use assert_fs::prelude::*;
use assert_fs::TempDir;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use serde_json::json;
use std::process::{Command, Output};

fn run(dir: &TempDir, env: &[(&str, &str)], args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sentry-debug"))
        .current_dir(dir.path())
        .env_clear()
        .envs(env.iter().copied())
        .args(args)
        .output()
        .expect("failed to run sentry-debug")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn event_body() -> serde_json::Value {
    json!({
        "eventID": "ev-1",
        "dateCreated": "2024-05-01T10:00:00Z",
        "entries": [{
            "type": "exception",
            "data": {"values": [{
                "type": "ValueError",
                "value": "bad input",
                "stacktrace": {"frames": [
                    {"filename": "b.py", "lineno": 3, "function": "g", "inApp": false},
                    {"filename": "a.py", "lineno": 10, "function": "f", "inApp": true,
                     "context_line": "    raise ValueError('bad input')"}
                ]}
            }]}
        }]
    })
}

fn mock_event(server: &mut Server) -> mockito::Mock {
    server
        .mock("GET", "/issues/E1/events/latest/")
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(event_body().to_string())
        .create()
}

#[test]
fn missing_token_fails_without_request() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut server = Server::new();
    let mock = server.mock("GET", Matcher::Any).expect(0).create();
    let url = server.url();

    let output = run(
        &dir,
        &[("SENTRY_URL", url.as_str())],
        &["issues", "--org", "a", "--project", "b"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(predicate::str::contains("SENTRY_AUTH_TOKEN").eval(&stderr(&output)));
    assert!(stdout(&output).is_empty());
    mock.assert();
    Ok(())
}

#[test]
fn issues_without_project_fails_without_request() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut server = Server::new();
    let mock = server.mock("GET", Matcher::Any).expect(0).create();
    let url = server.url();

    let output = run(
        &dir,
        &[
            ("SENTRY_AUTH_TOKEN", "test-token"),
            ("SENTRY_ORG", "a"),
            ("SENTRY_URL", url.as_str()),
        ],
        &["issues"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(predicate::str::contains("--org and --project required").eval(&stderr(&output)));
    mock.assert();
    Ok(())
}

#[test]
fn event_prints_exception_without_frames() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut server = Server::new();
    let mock = mock_event(&mut server);
    let url = server.url();

    let output = run(
        &dir,
        &[("SENTRY_AUTH_TOKEN", "test-token"), ("SENTRY_URL", url.as_str())],
        &["event", "E1"],
    );

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(predicate::str::contains("Latest Event for Issue E1").eval(&out));
    assert!(predicate::str::contains("Event ID: ev-1").eval(&out));
    assert!(predicate::str::contains("--- EXCEPTION ---").eval(&out));
    assert!(predicate::str::contains("Type: ValueError").eval(&out));
    assert!(predicate::str::contains("Value: bad input").eval(&out));
    assert!(!out.contains("a.py"));
    assert!(!out.contains("b.py"));
    mock.assert();
    Ok(())
}

#[test]
fn stacktrace_prints_innermost_frame_first() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut server = Server::new();
    let mock = mock_event(&mut server);
    let url = server.url();

    let output = run(
        &dir,
        &[("SENTRY_AUTH_TOKEN", "test-token"), ("SENTRY_URL", url.as_str())],
        &["stacktrace", "E1"],
    );

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Exception: ValueError: bad input"));

    let lines: Vec<&str> = out.lines().collect();
    let a = lines.iter().position(|l| *l == "→ a.py:10 in f()").unwrap();
    let b = lines.iter().position(|l| *l == "  b.py:3 in g()").unwrap();
    assert!(a < b);
    assert_eq!(lines[a + 1], "    raise ValueError('bad input')");
    mock.assert();
    Ok(())
}

#[test]
fn unauthorized_prints_credential_hint() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/issues/E1/events/latest/")
        .with_status(401)
        .with_body(json!({"detail": "Invalid token"}).to_string())
        .create();
    let url = server.url();

    let output = run(
        &dir,
        &[("SENTRY_AUTH_TOKEN", "expired"), ("SENTRY_URL", url.as_str())],
        &["event", "E1"],
    );

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("API Error 401: Unauthorized"));
    assert!(err.contains("Check your SENTRY_AUTH_TOKEN"));
    mock.assert();
    Ok(())
}

#[test]
fn server_error_has_no_credential_hint() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/issues/E1/events/latest/")
        .with_status(500)
        .create();
    let url = server.url();

    let output = run(
        &dir,
        &[("SENTRY_AUTH_TOKEN", "test-token"), ("SENTRY_URL", url.as_str())],
        &["stacktrace", "E1"],
    );

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("API Error 500: Internal Server Error"));
    assert!(!err.contains("Check your SENTRY_AUTH_TOKEN"));
    mock.assert();
    Ok(())
}

#[test]
fn issues_reads_settings_from_dotenv() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/projects/acme/web/issues/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".into(), "is:unresolved".into()),
            Matcher::UrlEncoded("statsPeriod".into(), "7d".into()),
        ]))
        .match_header("authorization", "Bearer from-dotenv")
        .with_status(200)
        .with_body(
            json!([{
                "id": "101",
                "shortId": "WEB-1",
                "title": "TypeError: x is undefined",
                "count": "12",
                "userCount": 4,
                "lastSeen": "2024-05-01T10:00:00Z"
            }])
            .to_string(),
        )
        .create();

    dir.child(".env").write_str(&format!(
        "SENTRY_AUTH_TOKEN=from-dotenv\nSENTRY_ORG=acme\nSENTRY_PROJECT=web\nSENTRY_URL={}\n",
        server.url()
    ))?;

    let output = run(&dir, &[], &["issues", "--period", "7d"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Issues in acme/web (is:unresolved, last 7d)"));
    assert!(out.contains("[WEB-1] TypeError: x is undefined"));
    assert!(out.contains("  ID: 101 | Events: 12 | Users: 4"));
    assert!(out.contains("  Culprit: N/A"));
    mock.assert();
    Ok(())
}

#[test]
fn completion_needs_no_token() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let output = run(&dir, &[], &["completion", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("sentry-debug"));
    Ok(())
}
