//! The request executor: one blocking HTTPS call per `execute`.
//!
//! # Design
//! `ExchangeClient` holds only an immutable `ClientConfig` and a transport,
//! so one instance can be shared by many callers without locking. A call
//! runs strictly in order: validate, open, dispatch, classify the status,
//! read the body, disconnect. The connection lives in a `ConnectionGuard`
//! that disconnects exactly once on every exit path.

use std::io::Read;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ExchangeError, TransportError};
use crate::extract::{decode_error_body, extract_message};
use crate::http::RequestSpec;
use crate::transport::{is_timeout, Connection, HttpsTransport, Transport};

/// Message reported when releasing the connection fails.
const MSG_CLOSE_ERROR: &str = "DEXS close https connection error";

/// Blocking client for the remote data-exchange endpoint.
#[derive(Debug, Clone)]
pub struct ExchangeClient<T = HttpsTransport> {
    config: ClientConfig,
    transport: T,
}

impl ExchangeClient<HttpsTransport> {
    /// Non-positive timeouts fall back to `DEFAULT_TIMEOUT_MS`.
    pub fn new(connect_timeout_ms: i64, read_timeout_ms: i64) -> Self {
        Self::with_config(ClientConfig::new(connect_timeout_ms, read_timeout_ms))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_transport(config, HttpsTransport::new())
    }
}

impl Default for ExchangeClient<HttpsTransport> {
    fn default() -> Self {
        Self::with_config(ClientConfig::default())
    }
}

impl<T: Transport> ExchangeClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issue one GET or POST to `url` and return the response body.
    ///
    /// Any query string in `url` (from the first `?`, inclusive) is also
    /// written as the request body. Statuses below 400 return the body
    /// decoded as UTF-8. Statuses of 400 and above fail with the text of
    /// the last `<p>` element of the error page. A timeout while waiting
    /// for the server fails with `ExchangeError::NotInWhiteList`.
    pub fn execute(&self, url: &str, method: &str) -> Result<String, ExchangeError> {
        let spec = RequestSpec::parse(url, method)?;
        let call_id = Uuid::new_v4();
        let span = tracing::debug_span!("exchange", %call_id, method = %spec.method, url = %spec.url);
        let _enter = span.enter();

        let request = spec.to_outbound(&self.config);
        let conn = match self.transport.open(&request) {
            Ok(Some(conn)) => conn,
            Ok(None) => {
                error!("transport returned no connection");
                return Ok(String::new());
            }
            Err(e) => {
                error!(error = %e, "failed to open connection");
                return Err(ExchangeError::ConnectionSetup { url: spec.url });
            }
        };

        let mut guard = ConnectionGuard::new(conn);
        let outcome = exchange(guard.connection(), &spec.url);
        guard.finish(outcome)
    }
}

/// Map a status code and its error body to the failure it represents.
///
/// Returns `None` for statuses below 400.
pub fn classify(status: u16, error_body: &[u8]) -> Option<ExchangeError> {
    if status < 400 {
        return None;
    }
    let message = extract_message(&decode_error_body(error_body));
    Some(match status {
        401 => ExchangeError::Unauthorized(message),
        429 => ExchangeError::RequestLimitExceeded(message),
        _ => ExchangeError::Remote { status, message },
    })
}

fn exchange<C: Connection>(conn: &mut C, url: &str) -> Result<String, ExchangeError> {
    let status = conn.dispatch().map_err(|e| match e {
        TransportError::Timeout => {
            warn!("no response before timeout, treating caller as not whitelisted");
            ExchangeError::NotInWhiteList
        }
        other => {
            error!(error = %other, "request dispatch failed");
            ExchangeError::ConnectionSetup {
                url: url.to_string(),
            }
        }
    })?;
    debug!(status, "response received");

    if status < 400 {
        let bytes = read_body(conn).map_err(|e| {
            error!(error = %e, "failed to read response body");
            ExchangeError::ResponseParse
        })?;
        return Ok(String::from_utf8_lossy(&bytes).into_owned());
    }

    let bytes = read_body(conn).map_err(|e| match e {
        TransportError::Timeout => ExchangeError::NotInWhiteList,
        TransportError::Io(ref io) if is_timeout(io) => ExchangeError::NotInWhiteList,
        other => {
            error!(error = %other, "failed to read error body");
            ExchangeError::ResponseParse
        }
    })?;
    match classify(status, &bytes) {
        Some(err) => {
            warn!(status, error = %err, "remote call failed");
            Err(err)
        }
        None => Ok(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

/// Read the whole body stream. The reader is dropped before returning.
fn read_body<C: Connection>(conn: &mut C) -> Result<Vec<u8>, TransportError> {
    let mut reader = conn.body()?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Owns a connection for one call and disconnects it exactly once.
///
/// `finish` disconnects on normal paths and folds a close failure into the
/// outcome. `Drop` covers unwinding, where no outcome exists to report to.
struct ConnectionGuard<C: Connection> {
    conn: C,
    closed: bool,
}

impl<C: Connection> ConnectionGuard<C> {
    fn new(conn: C) -> Self {
        Self { conn, closed: false }
    }

    fn connection(&mut self) -> &mut C {
        &mut self.conn
    }

    /// The first definitive error wins; a close failure only replaces a success.
    fn finish(mut self, outcome: Result<String, ExchangeError>) -> Result<String, ExchangeError> {
        self.closed = true;
        match (outcome, self.conn.disconnect()) {
            (outcome, Ok(())) => outcome,
            (Err(err), Err(close_err)) => {
                error!(error = %close_err, "{MSG_CLOSE_ERROR}");
                Err(err)
            }
            (Ok(_), Err(close_err)) => {
                error!(error = %close_err, "{MSG_CLOSE_ERROR}");
                Err(ExchangeError::ResourceCleanup(MSG_CLOSE_ERROR.to_string()))
            }
        }
    }
}

impl<C: Connection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.conn.disconnect() {
                error!(error = %e, "{MSG_CLOSE_ERROR}");
            }
        }
    }
}
