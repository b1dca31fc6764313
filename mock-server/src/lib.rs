//! Stand-in for the remote data-exchange endpoint.
//!
//! Serves the responses the client has to classify: a JSON payload, an echo
//! of the raw request body, HTML error pages for 401/429/5xx, arbitrary
//! statuses, a body that trickles in byte by byte, and a route that stalls
//! past any sensible read timeout.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    body::Body,
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use futures_util::stream;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use uuid::Uuid;

/// How long `/stall` waits before answering.
pub const STALL: Duration = Duration::from_secs(5);

/// Body streamed by `/drip`, one byte per `DRIP_GAP`.
pub const DRIP_BODY: &[u8] = b"abcde";
pub const DRIP_GAP: Duration = Duration::from_millis(100);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub plate: String,
    pub region: String,
}

pub fn records() -> Vec<Record> {
    vec![
        Record {
            id: Uuid::from_u128(1),
            plate: "京A12345".to_string(),
            region: "北京".to_string(),
        },
        Record {
            id: Uuid::from_u128(2),
            plate: "沪B67890".to_string(),
            region: "上海".to_string(),
        },
    ]
}

pub fn app() -> Router {
    Router::new()
        .route("/data", any(data))
        .route("/echo", any(echo))
        .route("/unauthorized", any(unauthorized))
        .route("/limited", any(limited))
        .route("/broken", any(broken))
        .route("/latin1", any(latin1))
        .route("/status/{code}", any(status))
        .route("/stall", any(stall))
        .route("/drip", any(drip))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Wrap `message` the way the upstream gateway renders its error pages.
pub fn error_page(title: &str, message: &str) -> String {
    format!(
        "<html>\r\n<head><title>{title}</title></head>\r\n<body>\r\n<h1>{title}</h1>\r\n<p class=\"message\">{message}</p>\r\n</body>\r\n</html>\r\n"
    )
}

fn html(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/html")], body).into_response()
}

async fn data() -> Json<Vec<Record>> {
    Json(records())
}

async fn echo(body: String) -> String {
    tracing::debug!(len = body.len(), "echoing request body");
    body
}

async fn unauthorized() -> Response {
    html(
        StatusCode::UNAUTHORIZED,
        error_page("401 Unauthorized", "invalid api key"),
    )
}

async fn limited() -> Response {
    html(
        StatusCode::TOO_MANY_REQUESTS,
        "<html><p class=x>Rate limited</p></html>".to_string(),
    )
}

async fn broken() -> Response {
    html(
        StatusCode::INTERNAL_SERVER_ERROR,
        "<html><body><h1>Internal Server Error</h1></body></html>".to_string(),
    )
}

/// Error page encoded as Latin-1, not UTF-8.
async fn latin1() -> Response {
    let mut body = b"<p>caf".to_vec();
    body.push(0xe9);
    body.extend_from_slice(b"</p>");
    (StatusCode::BAD_REQUEST, [(header::CONTENT_TYPE, "text/html")], body).into_response()
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => html(status, error_page(&code.to_string(), &format!("status {code}"))),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn stall() -> &'static str {
    tokio::time::sleep(STALL).await;
    "too late"
}

/// 200 whose body arrives one byte at a time, `DRIP_GAP` apart.
async fn drip() -> Response {
    let chunks = stream::unfold(0usize, |i| async move {
        let byte = match DRIP_BODY.get(i) {
            Some(byte) => *byte,
            None => return None,
        };
        tokio::time::sleep(DRIP_GAP).await;
        Some((Ok::<_, Infallible>(vec![byte]), i + 1))
    });
    Response::new(Body::from_stream(chunks))
}
