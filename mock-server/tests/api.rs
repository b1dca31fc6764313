use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, records, Record, DRIP_BODY, DRIP_GAP};
use tower::ServiceExt;

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn body_text(response: axum::response::Response) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}

fn request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "text/html")
        .body(body.to_string())
        .unwrap()
}

// --- success ---

#[tokio::test]
async fn data_returns_records() {
    let resp = app().oneshot(request("GET", "/data", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let got: Vec<Record> = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(got, records());
}

#[tokio::test]
async fn data_accepts_post() {
    let resp = app().oneshot(request("POST", "/data", "?a=1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn echo_returns_raw_body_for_get() {
    let resp = app()
        .oneshot(request("GET", "/echo?a=1&b=2", "?a=1&b=2"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "?a=1&b=2");
}

// --- error pages ---

#[tokio::test]
async fn unauthorized_page_has_message_paragraph() {
    let resp = app().oneshot(request("GET", "/unauthorized", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(resp).await.contains("<p class=\"message\">invalid api key</p>"));
}

#[tokio::test]
async fn limited_returns_429() {
    let resp = app().oneshot(request("POST", "/limited", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_text(resp).await, "<html><p class=x>Rate limited</p></html>");
}

#[tokio::test]
async fn broken_has_no_paragraph() {
    let resp = app().oneshot(request("GET", "/broken", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body_text(resp).await.contains("<p"));
}

#[tokio::test]
async fn latin1_page_is_not_utf8() {
    let resp = app().oneshot(request("GET", "/latin1", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = body_bytes(resp).await;
    assert_eq!(&bytes[..], b"<p>caf\xe9</p>");
    assert!(std::str::from_utf8(&bytes).is_err());
}

#[tokio::test]
async fn status_route_uses_requested_code() {
    let resp = app().oneshot(request("GET", "/status/503", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_text(resp).await.contains("<p class=\"message\">status 503</p>"));
}

#[tokio::test]
async fn status_route_rejects_out_of_range_code() {
    let resp = app().oneshot(request("GET", "/status/42", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn drip_streams_whole_body_slowly() {
    let started = std::time::Instant::now();
    let resp = app().oneshot(request("GET", "/drip", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], DRIP_BODY);
    assert!(started.elapsed() >= DRIP_GAP * DRIP_BODY.len() as u32);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let resp = app().oneshot(request("GET", "/nope", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
