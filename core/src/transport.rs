//! Transport seam and the default HTTPS transport.
//!
//! # Design
//! `ExchangeClient` never talks to a socket directly. It asks a `Transport`
//! to open a `Connection` for an `OutboundRequest`, dispatches it, reads
//! back one body stream and disconnects. The default `HttpsTransport` builds
//! a fresh `ureq` agent for every call, so nothing is pooled or reused
//! between calls. TLS roots come from ureq's default configuration.
//!
//! The read timeout bounds each wait for data, not the whole body: a
//! response that keeps streaming is read to the end however long it takes.
//! ureq only offers whole-body deadlines, so the body is pumped on a helper
//! thread and every chunk is awaited with `recv_timeout`.

use std::io::{self, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use ureq::http::{Response, Uri};
use ureq::{Agent, Body, RequestBuilder};

use crate::error::TransportError;
use crate::http::{HttpMethod, OutboundRequest};

/// Opens connections for outbound calls.
pub trait Transport {
    type Connection: Connection;

    /// Prepare a connection for `request` without sending anything.
    ///
    /// `Ok(None)` means the transport produced no connection and reported no
    /// error; the client treats this as an anomalous empty success.
    fn open(&self, request: &OutboundRequest) -> Result<Option<Self::Connection>, TransportError>;
}

/// One live call. Used strictly in order: `dispatch`, `body`, `disconnect`.
pub trait Connection {
    /// Connect, write the request body (if any), and wait for the status.
    fn dispatch(&mut self) -> Result<u16, TransportError>;

    /// The response body, or the error body when the status is >= 400.
    fn body(&mut self) -> Result<Box<dyn Read + '_>, TransportError>;

    fn disconnect(&mut self) -> Result<(), TransportError>;
}

/// Default transport backed by `ureq`. Only `https` urls are accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpsTransport {
    allow_plain_http: bool,
}

impl HttpsTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that also accepts `http` urls, for local test servers.
    pub fn allow_plain_http() -> Self {
        Self {
            allow_plain_http: true,
        }
    }

    fn accepts_scheme(&self, scheme: &str) -> bool {
        scheme.eq_ignore_ascii_case("https")
            || (self.allow_plain_http && scheme.eq_ignore_ascii_case("http"))
    }
}

impl Transport for HttpsTransport {
    type Connection = HttpsConnection;

    fn open(&self, request: &OutboundRequest) -> Result<Option<HttpsConnection>, TransportError> {
        let uri: Uri = request
            .url
            .parse()
            .map_err(|e: ureq::http::uri::InvalidUri| TransportError::Other(e.to_string()))?;
        let scheme = uri.scheme_str().ok_or_else(|| {
            TransportError::Other(format!("url has no scheme: {}", request.url))
        })?;
        if !self.accepts_scheme(scheme) {
            return Err(TransportError::Other(format!("unsupported scheme: {scheme}")));
        }
        if uri.host().is_none() {
            return Err(TransportError::Other(format!("url has no host: {}", request.url)));
        }

        // No recv_body deadline: `InactivityReader` bounds each read instead.
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(request.connect_timeout))
            .timeout_recv_response(Some(request.read_timeout))
            .timeout_recv_body(None)
            .build()
            .new_agent();

        Ok(Some(HttpsConnection {
            agent: Some(agent),
            request: request.clone(),
            response: None,
        }))
    }
}

/// A single ureq round-trip. Dropping the agent releases its socket.
pub struct HttpsConnection {
    agent: Option<Agent>,
    request: OutboundRequest,
    response: Option<Response<Body>>,
}

impl Connection for HttpsConnection {
    fn dispatch(&mut self) -> Result<u16, TransportError> {
        let agent = self
            .agent
            .as_ref()
            .ok_or_else(|| TransportError::Other("connection already closed".to_string()))?;
        let req = &self.request;

        let result = match (req.method, req.body.as_deref()) {
            (HttpMethod::Get, None) => with_headers(agent.get(&req.url), &req.headers).call(),
            (HttpMethod::Get, Some(body)) => with_headers(agent.get(&req.url), &req.headers)
                .force_send_body()
                .send(body.as_bytes()),
            (HttpMethod::Post, None) => {
                with_headers(agent.post(&req.url), &req.headers).send_empty()
            }
            (HttpMethod::Post, Some(body)) => {
                with_headers(agent.post(&req.url), &req.headers).send(body.as_bytes())
            }
        };

        let response = result.map_err(map_ureq_error)?;
        let status = response.status().as_u16();
        self.response = Some(response);
        Ok(status)
    }

    fn body(&mut self) -> Result<Box<dyn Read + '_>, TransportError> {
        let response = self
            .response
            .take()
            .ok_or_else(|| TransportError::Other("request was not dispatched".to_string()))?;
        let reader =
            InactivityReader::spawn(response.into_body().into_reader(), self.request.read_timeout)?;
        Ok(Box::new(reader))
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.response = None;
        self.agent = None;
        Ok(())
    }
}

const CHUNK_SIZE: usize = 8 * 1024;

/// Reads a body on a helper thread and fails with `TimedOut` when no data
/// arrives within `timeout` of the previous chunk.
///
/// After a timeout the helper thread is detached; it exits on its next read
/// result, when the server sends data or the socket closes.
pub(crate) struct InactivityReader {
    chunks: Receiver<io::Result<Vec<u8>>>,
    timeout: Duration,
    chunk: Vec<u8>,
    pos: usize,
    done: bool,
}

impl InactivityReader {
    pub(crate) fn spawn<R>(mut inner: R, timeout: Duration) -> Result<Self, TransportError>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(4);
        thread::Builder::new()
            .name("exchange-body".to_string())
            .spawn(move || {
                let mut buf = vec![0u8; CHUNK_SIZE];
                loop {
                    match inner.read(&mut buf) {
                        // An empty chunk marks end of body.
                        Ok(0) => {
                            let _ = tx.send(Ok(Vec::new()));
                            break;
                        }
                        Ok(n) => {
                            if tx.send(Ok(buf[..n].to_vec())).is_err() {
                                break;
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            let _ = tx.send(Err(e));
                            break;
                        }
                    }
                }
            })?;

        Ok(Self {
            chunks: rx,
            timeout,
            chunk: Vec::new(),
            pos: 0,
            done: false,
        })
    }
}

impl Read for InactivityReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.chunk.len() {
                let n = buf.len().min(self.chunk.len() - self.pos);
                buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if self.done || buf.is_empty() {
                return Ok(0);
            }
            match self.chunks.recv_timeout(self.timeout) {
                Ok(Ok(chunk)) if chunk.is_empty() => self.done = true,
                Ok(Ok(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Ok(Err(e)) => {
                    self.done = true;
                    return Err(e);
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "no body data within read timeout",
                    ));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.done = true;
                    return Err(io::Error::other("body reader stopped"));
                }
            }
        }
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}

fn map_ureq_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(e) if is_timeout(&e) => TransportError::Timeout,
        ureq::Error::Io(e) => TransportError::Io(e),
        other => TransportError::Other(other.to_string()),
    }
}

/// Whether an I/O error is a socket deadline expiring.
pub(crate) fn is_timeout(err: &io::Error) -> bool {
    if matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
        return true;
    }
    // Body readers wrap the ureq error in an io::Error.
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<ureq::Error>())
        .is_some_and(|inner| matches!(inner, ureq::Error::Timeout(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::http::RequestSpec;
    use std::io::Cursor;
    use std::time::Instant;

    fn outbound(url: &str) -> OutboundRequest {
        RequestSpec::parse(url, "GET")
            .unwrap()
            .to_outbound(&ClientConfig::default())
    }

    /// Yields one byte per read, sleeping `gap` before each.
    struct Drip {
        data: Vec<u8>,
        pos: usize,
        gap: Duration,
    }

    impl Read for Drip {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos == self.data.len() {
                return Ok(0);
            }
            thread::sleep(self.gap);
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn open_rejects_url_without_host() {
        let err = HttpsTransport::new().open(&outbound("not a url")).err().unwrap();
        assert!(matches!(err, TransportError::Other(_)));

        let err = HttpsTransport::new().open(&outbound("/relative/path")).err().unwrap();
        assert!(matches!(err, TransportError::Other(_)));
    }

    #[test]
    fn plain_http_needs_opt_in() {
        let req = outbound("http://127.0.0.1:8080/data");
        let err = HttpsTransport::new().open(&req).err().unwrap();
        assert!(matches!(err, TransportError::Other(ref m) if m.contains("http")));
        assert!(HttpsTransport::allow_plain_http().open(&req).unwrap().is_some());
    }

    #[test]
    fn other_schemes_are_always_rejected() {
        let req = outbound("ftp://host/file");
        assert!(HttpsTransport::new().open(&req).is_err());
        assert!(HttpsTransport::allow_plain_http().open(&req).is_err());
    }

    #[test]
    fn open_does_not_touch_the_network() {
        let conn = HttpsTransport::new()
            .open(&outbound("https://unreachable.invalid/x?y=1"))
            .unwrap();
        assert!(conn.is_some());
    }

    #[test]
    fn body_before_dispatch_is_an_error() {
        let mut conn = HttpsTransport::new()
            .open(&outbound("https://example.com/"))
            .unwrap()
            .unwrap();
        assert!(conn.body().is_err());
        conn.disconnect().unwrap();
        assert!(conn.dispatch().is_err());
    }

    #[test]
    fn timeouts_are_recognised() {
        assert!(is_timeout(&io::Error::new(io::ErrorKind::TimedOut, "slow")));
        assert!(is_timeout(&io::Error::new(io::ErrorKind::WouldBlock, "slow")));
        assert!(!is_timeout(&io::Error::new(io::ErrorKind::ConnectionRefused, "no")));
    }

    #[test]
    fn slow_drip_within_timeout_reads_everything() {
        let drip = Drip {
            data: b"abcde".to_vec(),
            pos: 0,
            gap: Duration::from_millis(40),
        };
        let started = Instant::now();
        let mut reader = InactivityReader::spawn(drip, Duration::from_millis(150)).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcde");
        // Total time exceeds the timeout; only the gaps are bounded.
        assert!(started.elapsed() > Duration::from_millis(150));
    }

    #[test]
    fn stalled_body_times_out() {
        let drip = Drip {
            data: b"ab".to_vec(),
            pos: 0,
            gap: Duration::from_millis(300),
        };
        let mut reader = InactivityReader::spawn(drip, Duration::from_millis(50)).unwrap();
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(is_timeout(&err));
    }

    #[test]
    fn large_body_passes_through_unchanged() {
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let mut reader =
            InactivityReader::spawn(Cursor::new(data.clone()), Duration::from_secs(5)).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
