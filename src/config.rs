//! Client configuration.
//!
//! [`ClientConfig`] holds everything a client needs: the credential, the
//! endpoint, defaults for per-call options, input limits and the retry policy.
//! Every field has a default, so configs can be deserialized from partial
//! JSON/TOML documents or assembled with the `with_*` builders.
//!
//! ```
//! use neuralex::{ClientConfig, RetryConfig};
//! use std::time::Duration;
//!
//! let config = ClientConfig::new("nlx_your_api_key")
//!     .with_default_model("nlx-embed-1")
//!     .with_timeout(Duration::from_secs(20))
//!     .with_retry(RetryConfig::default().with_max_attempts(5));
//!
//! config.validate().expect("valid config");
//! ```
//!
//! ## Environment
//!
//! [`ClientConfig::from_env`] reads:
//!
//! - `NEURALEX_API_KEY` - bearer credential
//! - `NEURALEX_BASE_URL` - endpoint override
//! - `NEURALEX_MODEL` - default model
//! - `NEURALEX_TIMEOUT_SECS` - per-call deadline in seconds
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{NeuralexError, Result};
use crate::response::ItemOrdering;
use crate::retry::RetryConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.neuralex.ai";
pub const DEFAULT_EMBED_PATH: &str = "/v1/embed";

/// Longest accepted deadline or timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub const ENV_API_KEY: &str = "NEURALEX_API_KEY";
pub const ENV_BASE_URL: &str = "NEURALEX_BASE_URL";
pub const ENV_MODEL: &str = "NEURALEX_MODEL";
pub const ENV_TIMEOUT_SECS: &str = "NEURALEX_TIMEOUT_SECS";

/// Bearer credential. Never printed, logged or serialized.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw secret, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Configuration owned by one client instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    #[serde(skip_serializing)]
    pub api_key: ApiKey,
    /// Scheme and host, e.g. `https://api.neuralex.ai`.
    pub base_url: String,
    /// Path of the embedding endpoint, joined onto `base_url`.
    pub embed_path: String,
    /// Model sent when a call does not name one. `None` lets the service pick.
    pub default_model: Option<String>,
    /// Deadline for a whole `embed` call, retries and backoff included.
    #[serde(with = "crate::serde_millis")]
    pub timeout: Duration,
    /// Cap on a single attempt. `None` lets one attempt use the whole deadline.
    #[serde(with = "crate::serde_millis::option")]
    pub attempt_timeout: Option<Duration>,
    #[serde(with = "crate::serde_millis")]
    pub connect_timeout: Duration,
    /// Largest number of texts accepted in one call.
    pub max_batch_size: usize,
    /// Longest accepted text, in characters. `None` disables the check.
    pub max_text_chars: Option<usize>,
    pub retry: RetryConfig,
    /// How response items are matched back to inputs.
    pub ordering: ItemOrdering,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: ApiKey::default(),
            base_url: DEFAULT_BASE_URL.into(),
            embed_path: DEFAULT_EMBED_PATH.into(),
            default_model: None,
            timeout: Duration::from_secs(60),
            attempt_timeout: Some(Duration::from_secs(30)),
            connect_timeout: Duration::from_secs(10),
            max_batch_size: 100,
            max_text_chars: None,
            retry: RetryConfig::default(),
            ordering: ItemOrdering::default(),
            user_agent: concat!("neuralex-rust/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<ApiKey>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Build a config from `NEURALEX_*` environment variables on top of the
    /// defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading variables through
    /// `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key) = lookup(ENV_API_KEY) {
            config.api_key = ApiKey::new(key);
        }
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_owned();
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            config.default_model = Some(model.trim().to_owned());
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: f64 = raw.trim().parse().map_err(|_| {
                NeuralexError::validation(format!("{ENV_TIMEOUT_SECS} is not a number: {raw:?}"))
            })?;
            config.timeout = Duration::try_from_secs_f64(secs).map_err(|_| {
                NeuralexError::validation(format!("{ENV_TIMEOUT_SECS} is out of range: {raw:?}"))
            })?;
        }

        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<ApiKey>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_embed_path(mut self, path: impl Into<String>) -> Self {
        self.embed_path = path.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    pub fn with_max_text_chars(mut self, chars: Option<usize>) -> Self {
        self.max_text_chars = chars;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_ordering(mut self, ordering: ItemOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Check the config before a client is built from it.
    ///
    /// A missing key is an authentication failure; every other problem is a
    /// validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_blank() {
            return Err(NeuralexError::Authentication {
                status: None,
                message: format!("api key is required (set {ENV_API_KEY} or pass one)"),
            });
        }

        let base = self.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(NeuralexError::validation(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.default_model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(NeuralexError::validation("default_model must not be blank"));
        }
        for (name, value) in [
            ("timeout", Some(self.timeout)),
            ("attempt_timeout", self.attempt_timeout),
            ("connect_timeout", Some(self.connect_timeout)),
        ] {
            match value {
                Some(t) if t.is_zero() => {
                    return Err(NeuralexError::validation(format!(
                        "{name} must be greater than zero"
                    )));
                }
                Some(t) if t > MAX_TIMEOUT => {
                    return Err(NeuralexError::validation(format!(
                        "{name} of {t:?} exceeds the limit of {MAX_TIMEOUT:?}"
                    )));
                }
                _ => {}
            }
        }
        if self.max_batch_size == 0 {
            return Err(NeuralexError::validation("max_batch_size must be at least 1"));
        }
        if self.max_text_chars == Some(0) {
            return Err(NeuralexError::validation("max_text_chars must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(NeuralexError::validation("retry.max_attempts must be at least 1"));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(NeuralexError::validation(
                "retry.base_delay must not exceed retry.max_delay",
            ));
        }

        Ok(())
    }
}
