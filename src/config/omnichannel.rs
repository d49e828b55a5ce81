use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Connection to the omnichannel chat platform.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OmnichannelConfig {
    /// Platform root URL, e.g. `https://omnichannel.qiscus.com`.
    pub base_url: String,

    /// Application id sent with every request.
    pub app_id: String,

    /// Secret key sent with every request.
    pub secret_key: String,

    /// Header carrying the application id.
    #[serde(default = "default_app_id_header")]
    pub app_id_header: String,

    /// Header carrying the secret key.
    #[serde(default = "default_secret_key_header")]
    pub secret_key_header: String,

    /// Log one line per outbound call (method, url, status, latency).
    #[serde(default)]
    pub debug: bool,

    /// HTTP client tuning.
    #[serde(default)]
    pub http_client: HttpClientConfig,

    /// Retry policy for outbound calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl std::fmt::Debug for OmnichannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OmnichannelConfig")
            .field("base_url", &self.base_url)
            .field("app_id", &self.app_id)
            .field("secret_key", &"****")
            .field("app_id_header", &self.app_id_header)
            .field("secret_key_header", &self.secret_key_header)
            .field("debug", &self.debug)
            .field("http_client", &self.http_client)
            .field("retry", &self.retry)
            .finish()
    }
}

impl OmnichannelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.base_url).map_err(|e| {
            ConfigError::Validation(format!(
                "omnichannel.base_url '{}' is not a valid URL: {}",
                self.base_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "omnichannel.base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.app_id.is_empty() {
            return Err(ConfigError::Validation(
                "omnichannel.app_id cannot be empty".into(),
            ));
        }
        if self.secret_key.is_empty() {
            return Err(ConfigError::Validation(
                "omnichannel.secret_key cannot be empty".into(),
            ));
        }
        for header in [&self.app_id_header, &self.secret_key_header] {
            if http::HeaderName::from_bytes(header.as_bytes()).is_err() {
                return Err(ConfigError::Validation(format!(
                    "'{}' is not a valid header name",
                    header
                )));
            }
        }
        self.retry.validate()?;
        Ok(())
    }
}

fn default_app_id_header() -> String {
    "Qiscus-App-Id".to_string()
}

fn default_secret_key_header() -> String {
    "Qiscus-Secret-Key".to_string()
}

/// HTTP client configuration for outbound requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpClientConfig {
    /// Per-attempt request timeout in seconds.
    #[serde(default = "default_http_client_timeout")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds.
    #[serde(default = "default_http_client_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Maximum idle connections per host.
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,

    /// Idle connection timeout in seconds.
    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_timeout_secs: u64,

    /// User-Agent header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_client_timeout(),
            connect_timeout_secs: default_http_client_connect_timeout(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
            pool_idle_timeout_secs: default_pool_idle_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpClientConfig {
    /// Build a reqwest Client from this configuration.
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(self.pool_idle_timeout_secs))
            .user_agent(&self.user_agent)
            .build()
    }
}

fn default_http_client_timeout() -> u64 {
    20
}

fn default_http_client_connect_timeout() -> u64 {
    10
}

fn default_pool_max_idle_per_host() -> usize {
    8
}

fn default_pool_idle_timeout() -> u64 {
    90
}

fn default_user_agent() -> String {
    format!("roomkeeper/{}", env!("CARGO_PKG_VERSION"))
}

/// Retry configuration for outbound calls.
///
/// Retries happen on transport failures and on the configured status codes
/// (429 and 500 by default). Every other status is final.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Whether retries are enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of retry attempts (not including the initial request).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial delay before first retry in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Random jitter added to delays (fraction, 0.0-1.0). Off by default.
    #[serde(default)]
    pub jitter: f64,

    /// Status codes that should trigger a retry.
    #[serde(default = "default_retryable_status_codes")]
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: 0.0,
            retryable_status_codes: default_retryable_status_codes(),
        }
    }
}

impl RetryConfig {
    /// Check if a status code should trigger a retry.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.enabled && self.retryable_status_codes.contains(&status)
    }

    /// Total attempts including the initial request.
    pub fn max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }

    /// Calculate the delay for a given retry attempt (0-indexed).
    ///
    /// `initial_delay_ms * backoff_multiplier^attempt`, capped at `max_delay_ms`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            (self.initial_delay_ms as f64) * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay_ms as f64);

        let jitter_range = capped_delay * self.jitter;
        let jitter = if jitter_range > 0.0 {
            use rand::Rng;
            rand::thread_rng().gen_range(-jitter_range..jitter_range)
        } else {
            0.0
        };

        let final_delay = (capped_delay + jitter).max(0.0);
        Duration::from_millis(final_delay as u64)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Validation(
                "retry.backoff_multiplier must be at least 1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::Validation(
                "retry.jitter must be between 0.0 and 1.0".into(),
            ));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Validation(
                "retry.initial_delay_ms cannot exceed retry.max_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_retryable_status_codes() -> Vec<u16> {
    vec![429, 500]
}
