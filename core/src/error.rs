//! Error types for the data-exchange client.
//!
//! # Design
//! Every failure of a call is one `ExchangeError` variant, so callers match
//! on the variant (or on the fieldless `ErrorKind`) instead of inspecting
//! strings. Remote failures carry only the message extracted from the HTML
//! error page. Low-level transport causes are logged at the failure site
//! and never stored in the returned error.

use thiserror::Error;

/// Fixed message for the read-timeout heuristic.
pub const MSG_NOT_IN_WHITE_LIST: &str = "ip is not in the white list";

/// Errors returned by `ExchangeClient::execute`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// The url or method is missing, or the method is not GET/POST.
    #[error("{0}")]
    InvalidArgument(String),

    /// The url could not be opened: malformed, unreachable, or TLS failure.
    #[error("can not access:{url}, please check it")]
    ConnectionSetup { url: String },

    /// The server returned 401.
    #[error("{0}")]
    Unauthorized(String),

    /// The server returned 429.
    #[error("{0}")]
    RequestLimitExceeded(String),

    /// The server did not answer within the timeout. The upstream gateway
    /// drops callers that are not whitelisted instead of rejecting them.
    #[error("ip is not in the white list")]
    NotInWhiteList,

    /// The server returned a status >= 400 other than 401 and 429.
    #[error("{message}")]
    Remote { status: u16, message: String },

    /// The response body stream failed mid-read.
    #[error("parse response error")]
    ResponseParse,

    /// Releasing the connection failed after the call had otherwise succeeded.
    #[error("{0}")]
    ResourceCleanup(String),
}

/// Fieldless discriminant of `ExchangeError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    ConnectionSetup,
    Unauthorized,
    RequestLimitExceeded,
    NotInWhiteList,
    Remote,
    ResponseParse,
    ResourceCleanup,
}

impl ExchangeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ExchangeError::ConnectionSetup { .. } => ErrorKind::ConnectionSetup,
            ExchangeError::Unauthorized(_) => ErrorKind::Unauthorized,
            ExchangeError::RequestLimitExceeded(_) => ErrorKind::RequestLimitExceeded,
            ExchangeError::NotInWhiteList => ErrorKind::NotInWhiteList,
            ExchangeError::Remote { .. } => ErrorKind::Remote,
            ExchangeError::ResponseParse => ErrorKind::ResponseParse,
            ExchangeError::ResourceCleanup(_) => ErrorKind::ResourceCleanup,
        }
    }

    /// HTTP status behind a remote failure, if the error came from one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ExchangeError::Unauthorized(_) => Some(401),
            ExchangeError::RequestLimitExceeded(_) => Some(429),
            ExchangeError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures reported by a `Transport` or `Connection`.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A connect or read deadline elapsed.
    #[error("timed out")]
    Timeout,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
