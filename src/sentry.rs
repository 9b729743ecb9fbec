use crate::config::Credentials;
use crate::model::{Event, IssueSummary};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

pub const UNAUTHORIZED_HINT: &str = "Check your SENTRY_AUTH_TOKEN";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API Error {status}: {reason}")]
    Http { status: u16, reason: String },
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Http { status: 401, .. })
    }

    /// Extra advice worth showing alongside the error, if any.
    pub fn hint(&self) -> Option<&'static str> {
        self.is_unauthorized().then_some(UNAUTHORIZED_HINT)
    }
}

pub struct SentryClient {
    client: Client,
    base_url: String,
    auth_token: String,
}

impl SentryClient {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            client: Client::new(),
            base_url: credentials.base_url.clone(),
            auth_token: credentials.auth_token.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.auth_token))
            .map_err(|_| ApiError::Transport("auth token is not a valid header value".into()))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// Authenticated GET of `base_url + path`, returning the parsed JSON body.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .headers(self.get_headers()?)
            .query(query)
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), "received response");

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response
            .text()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub fn list_issues(
        &self,
        org_slug: &str,
        project_slug: &str,
        query: &str,
        period: &str,
    ) -> Result<Vec<IssueSummary>, ApiError> {
        let path = format!(
            "/projects/{}/{}/issues/",
            urlencoding::encode(org_slug),
            urlencoding::encode(project_slug)
        );
        let body = self.get(&path, &[("query", query), ("statsPeriod", period)])?;

        if !body.is_array() {
            return Err(ApiError::Decode("expected a list of issues".into()));
        }
        let issues: Vec<IssueSummary> = decode(body)?;
        debug!(count = issues.len(), "decoded issues");
        Ok(issues)
    }

    pub fn latest_event(&self, issue_id: &str) -> Result<Event, ApiError> {
        let path = format!("/issues/{}/events/latest/", urlencoding::encode(issue_id));
        let body = self.get(&path, &[])?;

        if !body.is_object() {
            return Err(ApiError::Decode("expected an event object".into()));
        }
        let event: Event = decode(body)?;
        debug!(entries = event.entries.len(), "decoded event");
        Ok(event)
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
}
