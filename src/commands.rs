use crate::config::{self, Credentials};
use crate::event::inspect_latest_event;
use crate::issues::{list_issues, IssueQuery, DEFAULT_PERIOD, DEFAULT_QUERY};
use crate::logging;
use crate::sentry::{ApiError, SentryClient};
use crate::stacktrace::extract_stacktrace;
use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Sentry debug helper - fetch and format error data for debugging"
)]
#[command(
    long_about = "List Sentry issues for a project and inspect the latest event of an issue: \
    exception details, breadcrumbs, tags, contexts and reconstructed stack traces.\n\n\
    Reads SENTRY_AUTH_TOKEN (required), SENTRY_ORG, SENTRY_PROJECT and SENTRY_URL \
    from the environment or a .env file in the current directory."
)]
pub struct Cli {
    /// Organization slug
    #[arg(long, global = true, help = "Organization slug (defaults to SENTRY_ORG)")]
    org: Option<String>,

    /// Project slug
    #[arg(long, global = true, help = "Project slug (defaults to SENTRY_PROJECT)")]
    project: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long, global = true, help = "Print debug logs to stderr")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// List issues for a project
    #[command(about = "List issues for a project")]
    Issues {
        /// Search query
        #[arg(long, default_value = DEFAULT_QUERY, help = "Sentry search query")]
        query: String,
        /// Time period
        #[arg(long, default_value = DEFAULT_PERIOD, help = "Stats period, e.g. 24h or 14d")]
        period: String,
    },
    /// Show the latest event of an issue
    #[command(about = "Get latest event details for an issue")]
    Event {
        #[arg(help = "Issue ID from Sentry (found in issue URL or the issues command)")]
        issue_id: String,
    },
    /// Show the stack trace of an issue's latest event
    #[command(about = "Extract the stacktrace of an issue's latest event")]
    Stacktrace {
        #[arg(help = "Issue ID from Sentry (found in issue URL or the issues command)")]
        issue_id: String,
    },
    /// Generate shell completions
    #[command(about = "Generate shell completion scripts")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    pub fn run() -> Result<()> {
        let cli = Self::parse();
        logging::init(cli.verbose)?;

        if let Commands::Completion { shell } = cli.command {
            let mut cmd = Self::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut io::stdout());
            return Ok(());
        }

        config::load_dotenv(Path::new("."))?;
        let credentials = Credentials::resolve(cli.org, cli.project, |name| {
            std::env::var(name).ok()
        })?;
        tracing::debug!(?credentials, "resolved credentials");

        execute(&cli.command, &credentials, &mut io::stdout().lock())
    }

    #[cfg(test)]
    pub fn parse_from(args: &[&str]) -> Self {
        Self::try_parse_from(args).unwrap()
    }
}

fn execute(command: &Commands, credentials: &Credentials, out: &mut impl io::Write) -> Result<()> {
    match command {
        Commands::Issues { query, period } => {
            // Checked before any request goes out.
            let (org, project) = credentials.require_scope()?;
            let client = SentryClient::new(credentials);
            let params = IssueQuery {
                org,
                project,
                query,
                period,
            };
            list_issues(&client, &params, out)?;
        }
        Commands::Event { issue_id } => {
            let client = SentryClient::new(credentials);
            inspect_latest_event(&client, issue_id, out)?;
        }
        Commands::Stacktrace { issue_id } => {
            let client = SentryClient::new(credentials);
            extract_stacktrace(&client, issue_id, out)?;
        }
        Commands::Completion { .. } => {}
    }
    Ok(())
}

/// Lines to print on stderr for a failed run. A 401 adds a credentials hint.
pub fn error_report(err: &anyhow::Error) -> Vec<String> {
    let api_error = err.chain().find_map(|e| e.downcast_ref::<ApiError>());

    let mut lines = vec![match api_error {
        Some(_) => format!("{:#}", err),
        None => format!("Error: {:#}", err),
    }];
    lines.extend(api_error.and_then(ApiError::hint).map(str::to_string));
    lines
}
