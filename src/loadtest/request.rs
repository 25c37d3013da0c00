//! Request template and response types exchanged with the transport.
//!
//! A [`RequestTemplate`] is immutable once built. The session clones it once
//! per job so workers never share request state.

use std::borrow::Cow;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode};
use url::Url;

use crate::loadtest::error::LoadTestError;

/// Description of the HTTP call replayed by every job.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTemplate {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl RequestTemplate {
    /// Creates a template from an already-parsed method and URL.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Parses a method and an absolute `http`/`https` URL into a template.
    ///
    /// The method is case-insensitive (`"get"` and `"GET"` are the same).
    pub fn parse(method: &str, url: &str) -> Result<Self, LoadTestError> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| LoadTestError::InvalidRequest {
                message: format!("invalid HTTP method '{method}'"),
            })?;
        let url = Url::parse(url).map_err(|e| LoadTestError::InvalidRequest {
            message: format!("invalid URL '{url}': {e}"),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(LoadTestError::InvalidRequest {
                message: format!("unsupported URL scheme '{}'", url.scheme()),
            });
        }
        Ok(Self::new(method, url))
    }

    /// Shorthand for `RequestTemplate::parse("GET", url)`.
    pub fn get(url: &str) -> Result<Self, LoadTestError> {
        Self::parse("GET", url)
    }

    /// Adds a header, validating its name and value.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, LoadTestError> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| LoadTestError::InvalidRequest {
                message: format!("invalid header name '{name}'"),
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| LoadTestError::InvalidRequest {
                message: format!("invalid value for header '{name}'"),
            })?;
        self.headers.append(header_name, header_value);
        Ok(self)
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Default display name: `"<METHOD> <URL>"`.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// A fully buffered HTTP response handed to expectations.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl HttpResponse {
    /// Creates an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Builds a response from its parts.
    pub fn from_parts(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Appends a header. Panics on an invalid name or value, so only use with literals.
    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.append(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
        self
    }

    /// Replaces the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
