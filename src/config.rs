use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const TOKEN_VAR: &str = "SENTRY_AUTH_TOKEN";
pub const ORG_VAR: &str = "SENTRY_ORG";
pub const PROJECT_VAR: &str = "SENTRY_PROJECT";
pub const URL_VAR: &str = "SENTRY_URL";
pub const DEFAULT_BASE_URL: &str = "https://sentry.io/api/0";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("SENTRY_AUTH_TOKEN environment variable not set")]
    MissingToken,
    #[error("--org and --project required (or set SENTRY_ORG/SENTRY_PROJECT)")]
    MissingScope,
}

/// Everything a command needs to talk to Sentry, resolved once at startup.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub auth_token: String,
    pub org: Option<String>,
    pub project: Option<String>,
    pub base_url: String,
}

// The token must never end up in logs or panic messages.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_token", &"<redacted>")
            .field("org", &self.org)
            .field("project", &self.project)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Credentials {
    /// Resolve credentials from command-line overrides and an environment lookup.
    ///
    /// Flags win over the environment. Empty values count as unset.
    pub fn resolve<F>(
        flag_org: Option<String>,
        flag_project: Option<String>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| env(name).filter(|value| !value.trim().is_empty());

        let auth_token = lookup(TOKEN_VAR).ok_or(ConfigError::MissingToken)?;
        let org = pick("org", flag_org, lookup(ORG_VAR));
        let project = pick("project", flag_project, lookup(PROJECT_VAR));
        let base_url = lookup(URL_VAR)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            auth_token,
            org,
            project,
            base_url,
        })
    }

    /// Org and project slugs, both of which are needed to list issues.
    pub fn require_scope(&self) -> Result<(&str, &str), ConfigError> {
        match (self.org.as_deref(), self.project.as_deref()) {
            (Some(org), Some(project)) => Ok((org, project)),
            _ => Err(ConfigError::MissingScope),
        }
    }
}

fn pick(what: &str, flag: Option<String>, env: Option<String>) -> Option<String> {
    match (flag.filter(|value| !value.trim().is_empty()), env) {
        (Some(value), _) => {
            debug!(%what, %value, "using command-line value");
            Some(value)
        }
        (None, Some(value)) => {
            debug!(%what, %value, "using environment value");
            Some(value)
        }
        (None, None) => None,
    }
}

/// Load a `.env` file from `dir` if present. Variables already set in the
/// process environment are left untouched.
pub fn load_dotenv(dir: &Path) -> anyhow::Result<()> {
    let path = dir.join(".env");
    if !path.exists() {
        return Ok(());
    }
    dotenvy::from_path(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", path.display(), e))?;
    debug!(path = %path.display(), "loaded .env file");
    Ok(())
}
