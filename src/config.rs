//! Configuration for a conversion session.
//!
//! All session behaviour is controlled through [`ConversionConfig`], built via
//! its [`ConversionConfigBuilder`]. The builder lets callers set only what
//! they care about and rely on documented defaults for the rest.

use crate::error::Batch2MdError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Endpoint of a locally running conversion server.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8181/convert";

/// Configuration for a [`crate::session::ConversionSession`] and its
/// [`crate::client::HttpConversionService`].
///
/// # Example
/// ```rust
/// use batch2md::{ConversionConfig, FailurePolicy};
///
/// let config = ConversionConfig::builder()
///     .endpoint("http://converter.internal:8181/convert")
///     .request_timeout_secs(300)
///     .failure_policy(FailurePolicy::ContinueOnError)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Full URL of the conversion endpoint. Default: [`DEFAULT_ENDPOINT`].
    ///
    /// Both the probe and file conversions are `POST`ed here.
    pub endpoint: String,

    /// Overall per-request timeout in seconds. Default: none.
    ///
    /// Large office documents can take minutes to convert, so the session
    /// itself never times a request out; set this to bound the wait.
    pub request_timeout_secs: Option<u64>,

    /// TCP connect timeout in seconds. Default: none (OS default).
    pub connect_timeout_secs: Option<u64>,

    /// What a run does after an item fails. Default: [`FailurePolicy::FailFast`].
    pub failure_policy: FailurePolicy,

    /// Receives run, item, and status events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: None,
            connect_timeout_secs: None,
            failure_policy: FailurePolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("endpoint", &self.endpoint)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("failure_policy", &self.failure_policy)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = Some(secs);
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Batch2MdError> {
        let c = &self.config;
        let url = reqwest::Url::parse(&c.endpoint).map_err(|e| {
            Batch2MdError::InvalidConfig(format!("endpoint '{}' is not a valid URL: {e}", c.endpoint))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Batch2MdError::InvalidConfig(format!(
                "endpoint must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(Batch2MdError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.connect_timeout_secs == Some(0) {
            return Err(Batch2MdError::InvalidConfig(
                "connect timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a run reacts to a failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Stop at the first failure; later items are never sent. (default)
    #[default]
    FailFast,
    /// Attempt every item and report per-file outcomes; the run still ends
    /// `Failed` if any item failed.
    ContinueOnError,
}
