use reqwest::blocking::Client as BlockingClient;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{StatusCode, Url};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::core::config::ExporterConfig;
use crate::core::models::usage::UsageSnapshot;

pub const DEFAULT_BASE_URL: &str = "https://api.twilio.com";
pub const API_VERSION: &str = "2010-04-01";

/// Upstream error bodies are truncated to this many bytes before logging.
const MAX_ERROR_BODY: usize = 512;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("endpoint must use HTTPS, got: {0}")]
    InvalidEndpoint(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to usage records endpoint failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("HTTP {} from usage records endpoint: {body}", .status.as_u16())]
    Status { status: StatusCode, body: String },
    #[error("failed to read usage records response: {0}")]
    Body(#[source] reqwest::Error),
    #[error("failed to parse usage records response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Validate that an upstream base URL is safe to send credentials to.
///
/// HTTPS is required. Plain HTTP is tolerated for loopback hosts only, so a
/// local stub can stand in for the real API.
pub fn validate_endpoint(url: &str) -> Result<(), FetchError> {
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidEndpoint(url.to_string()))?;
    match parsed.scheme() {
        "https" => Ok(()),
        "http" if is_loopback(&parsed) => Ok(()),
        _ => Err(FetchError::InvalidEndpoint(url.to_string())),
    }
}

fn is_loopback(url: &Url) -> bool {
    matches!(
        url.host_str(),
        Some("localhost") | Some("127.0.0.1") | Some("[::1]")
    )
}

/// Blocking client for the Usage Records API.
///
/// One call to [`UsageClient::fetch`] is one upstream GET; no response data is
/// cached between calls. The underlying HTTP client and its connection pool
/// are reused.
#[derive(Clone)]
pub struct UsageClient {
    records_url: String,
    authorization: String,
    user_agent: String,
    timeout: Duration,
    http: OnceLock<BlockingClient>,
}

impl std::fmt::Debug for UsageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageClient")
            .field("records_url", &self.records_url)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl UsageClient {
    pub fn new(config: &ExporterConfig) -> Result<Self, FetchError> {
        validate_endpoint(&config.base_url)?;
        Ok(Self {
            records_url: records_url(&config.base_url, &config.account_sid)?,
            authorization: format!("Basic {}", config.basic_token),
            user_agent: config.user_agent.clone(),
            timeout: config.timeout,
            http: OnceLock::new(),
        })
    }

    pub fn records_url(&self) -> &str {
        &self.records_url
    }

    /// Fetch the first page of usage records.
    ///
    /// Blocks the calling thread; must not be called from an async context.
    pub fn fetch(&self) -> Result<UsageSnapshot, FetchError> {
        let response = self
            .http()?
            .get(&self.records_url)
            .header(AUTHORIZATION, &self.authorization)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(FetchError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::Status {
                status,
                body: truncate(body.trim(), MAX_ERROR_BODY),
            });
        }

        let body = response.bytes().map_err(FetchError::Body)?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// The shared HTTP client, built on first use.
    ///
    /// A blocking client cannot be created inside the async runtime, so this
    /// only runs from [`UsageClient::fetch`] on a blocking thread.
    fn http(&self) -> Result<&BlockingClient, FetchError> {
        if let Some(http) = self.http.get() {
            return Ok(http);
        }
        let http = BlockingClient::builder()
            .timeout(self.timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(self.http.get_or_init(|| http))
    }
}

/// Each part is pushed as its own path segment, so reserved characters in
/// the account SID are percent-encoded rather than reshaping the path.
fn records_url(base_url: &str, account_sid: &str) -> Result<String, FetchError> {
    let invalid = || FetchError::InvalidEndpoint(base_url.to_string());
    let mut url = Url::parse(base_url).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend([API_VERSION, "Accounts", account_sid, "Usage", "Records.json"]);
    Ok(url.into())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
