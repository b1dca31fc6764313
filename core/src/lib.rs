//! Blocking HTTPS client for a remote data-exchange endpoint.
//!
//! # Overview
//! `ExchangeClient::execute` issues a single GET or POST, returns the body on
//! success, and turns error statuses into typed `ExchangeError` values that
//! carry the message the server put in its HTML error page.
//!
//! # Design
//! - `ExchangeClient` holds only an immutable `ClientConfig`; calls share no
//!   mutable state and may run concurrently from many threads.
//! - Network I/O sits behind the `Transport` / `Connection` traits. The
//!   default `HttpsTransport` uses `ureq`; tests substitute scripted stubs.
//! - No retries, no pooling across calls. Each call opens and closes its own
//!   connection.
//! - Events are emitted through `tracing`; installing a subscriber is left to
//!   the host application.

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod transport;

pub use client::{classify, ExchangeClient};
pub use config::{ClientConfig, DEFAULT_TIMEOUT_MS};
pub use error::{ErrorKind, ExchangeError, TransportError, MSG_NOT_IN_WHITE_LIST};
pub use http::{HttpMethod, OutboundRequest, RequestSpec};
pub use transport::{Connection, HttpsConnection, HttpsTransport, Transport};
