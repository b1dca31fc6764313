//! Request types for one outbound call.
//!
//! # Design
//! `RequestSpec` is the validated caller input. `OutboundRequest` is the
//! fully-configured call handed to a `Transport`: method, url, the fixed
//! header set, the optional body and both timeouts. Building it is pure, so
//! everything up to the transport boundary is testable without a network.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::ExchangeError;

/// Content type sent with every request, whatever the body holds.
pub const CONTENT_TYPE: &str = "text/html";

/// HTTP method for a request. Only GET and POST are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("GET") {
            Ok(HttpMethod::Get)
        } else if s.eq_ignore_ascii_case("POST") {
            Ok(HttpMethod::Post)
        } else {
            Err(ExchangeError::InvalidArgument(
                "method is only be POST or GET".to_string(),
            ))
        }
    }
}

/// Validated input of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub url: String,
    pub method: HttpMethod,
}

impl RequestSpec {
    /// Validate raw caller input. Runs before any network access.
    pub fn parse(url: &str, method: &str) -> Result<Self, ExchangeError> {
        if url.is_empty() || method.is_empty() {
            return Err(ExchangeError::InvalidArgument(
                "url or method is required".to_string(),
            ));
        }
        Ok(Self {
            url: url.to_string(),
            method: method.parse()?,
        })
    }

    /// Everything from the first `?` of the url onwards, `?` included.
    ///
    /// The remote endpoint reads its parameters from the request body, so
    /// this is written verbatim as the body for GET and POST alike.
    pub fn query_body(&self) -> Option<&str> {
        self.url.find('?').map(|idx| &self.url[idx..])
    }

    pub fn to_outbound(&self, config: &ClientConfig) -> OutboundRequest {
        OutboundRequest {
            method: self.method,
            url: self.url.clone(),
            headers: vec![
                ("Content-Type".to_string(), CONTENT_TYPE.to_string()),
                ("Connection".to_string(), "Keep-Alive".to_string()),
            ],
            body: self.query_body().map(str::to_string),
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
        }
    }
}

/// A fully-configured outbound call, ready for a `Transport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}
