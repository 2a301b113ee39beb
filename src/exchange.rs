//! Synchronous exchange of an access token for a bearer token.
//!
//! One `GET` against the configured token-service URL per request, no
//! retries. The response body is a JSON object with two optional fields:
//! `token` carries the bearer token on success, `message` carries the token
//! service's rejection (expired, unknown, ...). A non-empty `message`
//! dominates a present `token`.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::config::{Config, TOKEN_PLACEHOLDER};
use crate::validate::is_valid_access_token;

/// Idle connections kept per host. Every exchange targets the same host, so
/// the pool ceiling is raised well above reqwest's generic default.
const POOL_MAX_IDLE_PER_HOST: usize = 100;

/// Response body of the token service.
#[derive(Debug, Deserialize)]
struct UserTokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Performs the access-token → bearer-token exchange against the token
/// service.
///
/// Cheap to clone; the inner `reqwest::Client` is reference-counted and its
/// connection pool is shared across clones and in-flight requests.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    client: reqwest::Client,
    token_url: String,
}

impl TokenExchanger {
    /// Build an exchanger from a validated config and an injected client.
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        Self {
            client,
            token_url: config.token_url.clone(),
        }
    }

    /// Exchange `access_token` for a bearer token.
    ///
    /// Exactly one network attempt; a timed-out or failed call surfaces as
    /// [`ExchangeError::Transport`] without retry.
    pub async fn fetch_user_token(&self, access_token: &str) -> Result<String, ExchangeError> {
        // Callers gate on length only; the full structural check lives here
        // so no malformed value ever reaches the token service.
        if !is_valid_access_token(access_token) {
            return Err(ExchangeError::InvalidFormat);
        }

        let url = self.token_url.replace(TOKEN_PLACEHOLDER, access_token);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ExchangeError::Transport)?;

        // The body alone is authoritative; the status code is not consulted.
        let body = response.bytes().await.map_err(ExchangeError::Transport)?;

        parse_token_response(&body)
    }
}

/// Apply the token service's response rules to a raw body.
pub fn parse_token_response(body: &[u8]) -> Result<String, ExchangeError> {
    let response: UserTokenResponse =
        serde_json::from_slice(body).map_err(ExchangeError::MalformedResponse)?;

    if let Some(message) = response.message.filter(|m| !m.is_empty()) {
        return Err(ExchangeError::Upstream(message));
    }
    match response.token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(ExchangeError::EmptyToken),
    }
}

/// Build the shared HTTP client used for exchange calls.
///
/// The whole call (connect, send, read body) is bounded by `timeout`.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .build()
}

/// Ways an exchange can fail. All of them collapse to the same
/// caller-visible 403; the variants exist for operator diagnostics.
#[derive(Debug)]
pub enum ExchangeError {
    /// The access token failed structural validation; no call was made.
    InvalidFormat,
    /// Network-level failure reaching the token service (includes timeout).
    Transport(reqwest::Error),
    /// The token service's body was not the expected JSON object.
    MalformedResponse(serde_json::Error),
    /// The token service reported a rejection message.
    Upstream(String),
    /// The response parsed but carried no token.
    EmptyToken,
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat => write!(f, "invalid access token format"),
            Self::Transport(e) => write!(f, "token service unreachable: {}", e),
            Self::MalformedResponse(e) => write!(f, "malformed token service response: {}", e),
            Self::Upstream(message) => write!(f, "token service rejected the token: {}", message),
            Self::EmptyToken => write!(f, "empty token response"),
        }
    }
}

impl std::error::Error for ExchangeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::MalformedResponse(e) => Some(e),
            _ => None,
        }
    }
}
