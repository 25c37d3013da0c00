//! Response validators.
//!
//! An [`Expectation`] is a pure predicate over an [`HttpResponse`]. Sessions
//! run their expectations in registration order and stop at the first
//! failure. Any `Fn(&HttpResponse) -> Result<(), ExpectationError>` closure
//! is an expectation; the built-in ones cover the common status, body, and
//! header checks and are what the TOML `[[expectation]]` blocks compile to.

use http::StatusCode;

use crate::loadtest::error::ExpectationError;
use crate::loadtest::request::HttpResponse;

/// A user-supplied response validator.
pub trait Expectation: Send + Sync {
    /// Human-readable name used in validation error messages.
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Returns `Ok(())` if the response satisfies the expectation.
    fn validate(&self, response: &HttpResponse) -> Result<(), ExpectationError>;
}

impl<F> Expectation for F
where
    F: Fn(&HttpResponse) -> Result<(), ExpectationError> + Send + Sync,
{
    fn name(&self) -> String {
        "custom".to_string()
    }

    fn validate(&self, response: &HttpResponse) -> Result<(), ExpectationError> {
        self(response)
    }
}

/// Attaches a display name to another expectation.
pub struct Named<E> {
    name: String,
    inner: E,
}

impl<E: Expectation> Named<E> {
    pub fn new(name: impl Into<String>, inner: E) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}

impl<E: Expectation> Expectation for Named<E> {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn validate(&self, response: &HttpResponse) -> Result<(), ExpectationError> {
        self.inner.validate(response)
    }
}

/// Response status must equal an exact code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusIs(StatusCode);

impl StatusIs {
    /// Panics if `code` is outside `100..=999`; use [`StatusIs::try_new`] for user input.
    pub fn new(code: u16) -> Self {
        Self::try_new(code).unwrap_or_else(|| panic!("invalid HTTP status code {code}"))
    }

    pub fn try_new(code: u16) -> Option<Self> {
        StatusCode::from_u16(code).ok().map(Self)
    }
}

impl Expectation for StatusIs {
    fn name(&self) -> String {
        format!("status == {}", self.0.as_u16())
    }

    fn validate(&self, response: &HttpResponse) -> Result<(), ExpectationError> {
        if response.status() == self.0 {
            Ok(())
        } else {
            Err(ExpectationError::new(format!(
                "expected status {}, got {}",
                self.0.as_u16(),
                response.status().as_u16()
            )))
        }
    }
}

/// Response status must be 2xx.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuccessStatus;

impl Expectation for SuccessStatus {
    fn name(&self) -> String {
        "status is 2xx".to_string()
    }

    fn validate(&self, response: &HttpResponse) -> Result<(), ExpectationError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ExpectationError::new(format!(
                "expected a 2xx status, got {}",
                response.status().as_u16()
            )))
        }
    }
}

/// Response body must contain a substring.
#[derive(Debug, Clone)]
pub struct BodyContains(String);

impl BodyContains {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl Expectation for BodyContains {
    fn name(&self) -> String {
        format!("body contains {:?}", self.0)
    }

    fn validate(&self, response: &HttpResponse) -> Result<(), ExpectationError> {
        if response.text().contains(self.0.as_str()) {
            Ok(())
        } else {
            Err(ExpectationError::new(format!(
                "body does not contain {:?}",
                self.0
            )))
        }
    }
}

/// Response must carry a header, optionally with an exact value.
#[derive(Debug, Clone)]
pub struct HeaderPresent {
    name: String,
    value: Option<String>,
}

impl HeaderPresent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl Expectation for HeaderPresent {
    fn name(&self) -> String {
        match &self.value {
            Some(value) => format!("header {} == {:?}", self.name, value),
            None => format!("header {} present", self.name),
        }
    }

    fn validate(&self, response: &HttpResponse) -> Result<(), ExpectationError> {
        let Some(actual) = response.headers().get(self.name.as_str()) else {
            return Err(ExpectationError::new(format!(
                "missing header '{}'",
                self.name
            )));
        };
        match &self.value {
            Some(expected) if actual.as_bytes() != expected.as_bytes() => {
                Err(ExpectationError::new(format!(
                    "header '{}' is {:?}, expected {:?}",
                    self.name,
                    String::from_utf8_lossy(actual.as_bytes()),
                    expected
                )))
            },
            _ => Ok(()),
        }
    }
}
