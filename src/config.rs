//! Configuration for the token-translation filter.

use std::fmt;
use std::time::Duration;

/// Placeholder the token URL template must contain exactly once.
pub const TOKEN_PLACEHOLDER: &str = "{token}";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Immutable filter configuration, validated once at construction.
#[derive(Debug, Clone)]
pub struct Config {
    /// Token-service URL template, e.g.
    /// `https://auth.internal/user-token/{token}`.
    pub(crate) token_url: String,
    /// Reject non-empty credentials that cannot be attempted (wrong length)
    /// instead of passing them through. Default: `false`.
    pub(crate) strict: bool,
    /// Whole-call timeout for the exchange request. Default: `10s`.
    pub(crate) http_timeout: Duration,
}

impl Config {
    /// Create a config from a token URL template.
    ///
    /// The template must be non-empty and contain [`TOKEN_PLACEHOLDER`]
    /// exactly once.
    pub fn new(token_url: impl Into<String>) -> Result<Self, ConfigError> {
        let token_url: String = token_url.into();

        if token_url.is_empty() {
            return Err(ConfigError::EmptyTokenUrl);
        }
        match token_url.matches(TOKEN_PLACEHOLDER).count() {
            0 => return Err(ConfigError::MissingPlaceholder),
            1 => {}
            n => return Err(ConfigError::ExtraPlaceholder(n)),
        }

        Ok(Self {
            token_url,
            strict: false,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        })
    }

    /// Reject malformed non-empty credentials instead of passing them through.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Override the whole-call timeout for exchange requests.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Token-service URL template.
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Whether strict mode is enabled.
    pub fn strict(&self) -> bool {
        self.strict
    }

    /// Exchange-call timeout.
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }
}

/// Errors produced when validating a [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The token URL template is empty.
    EmptyTokenUrl,
    /// The template does not contain `{token}`.
    MissingPlaceholder,
    /// The template contains `{token}` more than once.
    ExtraPlaceholder(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTokenUrl => write!(f, "token URL cannot be empty"),
            Self::MissingPlaceholder => {
                write!(f, "token URL must contain '{}'", TOKEN_PLACEHOLDER)
            }
            Self::ExtraPlaceholder(n) => write!(
                f,
                "token URL must contain '{}' exactly once, found {}",
                TOKEN_PLACEHOLDER, n
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
