//! TOML-based load test configuration.
//!
//! Defines typed structs for the request to replay, the virtual user and
//! pacing settings, and the expectations every response must satisfy.
//!
//! # Example TOML
//!
//! ```toml
//! [settings]
//! users = 10
//! requests_per_user = 50
//! delay_min_ms = 100
//! delay_max_ms = 500
//! timeout_ms = 5000
//!
//! [request]
//! method = "POST"
//! url = "http://localhost:8080/api/orders"
//! body = '{"sku": "A-1", "qty": 1}'
//!
//! [request.headers]
//! content-type = "application/json"
//!
//! [[expectation]]
//! type = "status"
//! code = 201
//!
//! [[expectation]]
//! type = "body_contains"
//! text = "order_id"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::loadtest::error::LoadTestError;
use crate::loadtest::expectation::{
    BodyContains, Expectation, HeaderPresent, StatusIs, SuccessStatus,
};
use crate::loadtest::pacer::DelayRange;
use crate::loadtest::request::RequestTemplate;

/// Top-level load test configuration parsed from a TOML file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoadTestConfig {
    /// Virtual user, pacing, and timeout settings.
    pub settings: Settings,
    /// The request replayed by every job.
    pub request: RequestConfig,
    /// Expectations checked against every response, in order.
    ///
    /// The field name is `expectation` (not `expectations`) because TOML
    /// `[[expectation]]` array-of-tables syntax creates a key called
    /// `expectation`.
    #[serde(default)]
    pub expectation: Vec<ExpectationConfig>,
}

/// Batch shape and pacing settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Number of concurrent virtual users.
    pub users: u32,
    /// Requests issued by each virtual user.
    pub requests_per_user: u32,
    /// Lower bound of the per-request think time (ms).
    #[serde(default)]
    pub delay_min_ms: u64,
    /// Upper bound of the per-request think time (ms). Swapped with
    /// `delay_min_ms` if smaller.
    #[serde(default)]
    pub delay_max_ms: u64,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Display name; defaults to `"<METHOD> <URL>"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Default per-request timeout: 30 seconds.
fn default_timeout_ms() -> u64 {
    30_000
}

/// The HTTP request to replay.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RequestConfig {
    /// HTTP method (defaults to `GET`).
    #[serde(default = "default_method")]
    pub method: String,
    /// Absolute `http`/`https` URL.
    pub url: String,
    /// Request headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Request body sent verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// A response expectation.
///
/// The `type` field in TOML selects the variant via serde's internally
/// tagged enum support.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExpectationConfig {
    /// Status must equal `code`.
    Status { code: u16 },
    /// Status must be 2xx.
    SuccessStatus,
    /// Body must contain `text`.
    BodyContains { text: String },
    /// Header `name` must be present, and equal `value` if given.
    Header {
        name: String,
        #[serde(default)]
        value: Option<String>,
    },
}

impl ExpectationConfig {
    /// Builds the runtime expectation for this entry.
    pub fn build(&self) -> Result<Arc<dyn Expectation>, LoadTestError> {
        let expectation: Arc<dyn Expectation> = match self {
            Self::Status { code } => Arc::new(StatusIs::try_new(*code).ok_or_else(|| {
                LoadTestError::ConfigValidation {
                    message: format!("Invalid expected status code {code}"),
                }
            })?),
            Self::SuccessStatus => Arc::new(SuccessStatus),
            Self::BodyContains { text } => Arc::new(BodyContains::new(text.clone())),
            Self::Header { name, value } => {
                let header = HeaderPresent::new(name.clone());
                Arc::new(match value {
                    Some(v) => header.with_value(v.clone()),
                    None => header,
                })
            },
        };
        Ok(expectation)
    }
}

impl LoadTestConfig {
    /// Parse a TOML string into a validated [`LoadTestConfig`].
    ///
    /// Returns an error if the TOML is malformed or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, LoadTestError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a [`LoadTestConfig`] from a file path.
    ///
    /// Returns [`LoadTestError::ConfigIo`] if the file cannot be read,
    /// [`LoadTestError::ConfigParse`] if the TOML is malformed, or
    /// [`LoadTestError::ConfigValidation`] if validation fails.
    pub fn load(path: &Path) -> Result<Self, LoadTestError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadTestError::ConfigIo {
            source,
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Batch size: `users × requests_per_user`.
    pub fn batch_size(&self) -> u64 {
        u64::from(self.settings.users) * u64::from(self.settings.requests_per_user)
    }

    /// Normalized delay range.
    pub fn delay_range(&self) -> DelayRange {
        DelayRange::new(
            Duration::from_millis(self.settings.delay_min_ms),
            Duration::from_millis(self.settings.delay_max_ms),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.settings.timeout_ms)
    }

    /// Builds the request template described by `[request]`.
    pub fn request_template(&self) -> Result<RequestTemplate, LoadTestError> {
        let mut template = RequestTemplate::parse(&self.request.method, &self.request.url)?;
        for (name, value) in &self.request.headers {
            template = template.with_header(name, value)?;
        }
        if let Some(body) = &self.request.body {
            template = template.with_body(body.clone());
        }
        Ok(template)
    }

    /// Builds every `[[expectation]]` in declaration order.
    pub fn expectations(&self) -> Result<Vec<Arc<dyn Expectation>>, LoadTestError> {
        self.expectation.iter().map(ExpectationConfig::build).collect()
    }

    /// Validate that the config is semantically correct.
    ///
    /// Checks:
    /// - `[request]` describes a valid method, absolute URL, and headers
    /// - every expectation can be built (e.g., status codes are in range)
    /// - `timeout_ms` is greater than zero
    ///
    /// A zero `users` or `requests_per_user` is allowed (the batch is empty)
    /// but logged as a warning.
    pub fn validate(&self) -> Result<(), LoadTestError> {
        self.request_template()
            .map_err(|e| LoadTestError::ConfigValidation {
                message: e.to_string(),
            })?;
        self.expectations()?;

        if self.settings.timeout_ms == 0 {
            return Err(LoadTestError::ConfigValidation {
                message: "timeout_ms must be greater than 0".to_string(),
            });
        }

        if self.batch_size() == 0 {
            tracing::warn!(
                users = self.settings.users,
                requests_per_user = self.settings.requests_per_user,
                "batch is empty; no requests will be sent"
            );
        }

        if self.settings.delay_min_ms > self.settings.delay_max_ms {
            tracing::warn!(
                delay_min_ms = self.settings.delay_min_ms,
                delay_max_ms = self.settings.delay_max_ms,
                "delay bounds are reversed and will be swapped"
            );
        }

        Ok(())
    }
}
