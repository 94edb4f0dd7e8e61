//! `HttpConversionService` against a wiremock conversion server.

use batch2md::{
    ConnectivityError, ConnectivityProber, ConversionConfig, ConversionError, ConversionService,
    ConversionSession, HttpConversionService, OperationStatus, SelectedFile,
};
use bytes::Bytes;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> HttpConversionService {
    let config = ConversionConfig::builder()
        .endpoint(format!("{}/convert", server.uri()))
        .request_timeout_secs(10)
        .build()
        .expect("valid config");
    HttpConversionService::new(&config).expect("client builds")
}

/// An endpoint nothing listens on: bind a port, then release it.
fn dead_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/convert")
}

// ── Probe ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn probe_sends_json_test_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .and(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .and(body_json(json!({"test": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let svc = service_for(&server);
    assert_eq!(ConnectivityProber::new().probe(&svc).await, Ok(()));
}

#[tokio::test]
async fn probe_rejected_with_service_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "warming up"})))
        .mount(&server)
        .await;

    let err = ConnectivityProber::new()
        .probe(&service_for(&server))
        .await
        .unwrap_err();
    assert_eq!(err, ConnectivityError::ServiceRejected("warming up".into()));
    assert!(err.hint().is_none());
}

#[tokio::test]
async fn probe_success_without_json_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&server)
        .await;

    let err = ConnectivityProber::new()
        .probe(&service_for(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectivityError::ServiceRejected(_)));
}

#[tokio::test]
async fn probe_unreachable_service() {
    let config = ConversionConfig::builder()
        .endpoint(dead_endpoint())
        .connect_timeout_secs(2)
        .build()
        .unwrap();
    let svc = HttpConversionService::new(&config).unwrap();

    let err = ConnectivityProber::new().probe(&svc).await.unwrap_err();
    assert!(matches!(err, ConnectivityError::Unreachable(_)), "got {err:?}");
    assert!(err.hint().is_some());
}

// ── Convert ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn convert_posts_multipart_file_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"notes.txt\""))
        .and(body_string_contains("hello world"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# Notes\n\nhello world\n"))
        .expect(1)
        .mount(&server)
        .await;

    let text = service_for(&server)
        .convert("notes.txt", Bytes::from_static(b"hello world"))
        .await
        .unwrap();
    assert_eq!(text, "# Notes\n\nhello world\n");
}

#[tokio::test]
async fn convert_failure_uses_error_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"error": "Conversion failed: unsupported format"})),
        )
        .mount(&server)
        .await;

    let err = service_for(&server)
        .convert("x.bin", Bytes::from_static(b"\0\0"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ConversionError::Service {
            status: 500,
            message: "Conversion failed: unsupported format".into()
        }
    );
}

#[tokio::test]
async fn convert_failure_with_html_body_is_unknown_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<h1>Bad Gateway</h1>"))
        .mount(&server)
        .await;

    let err = service_for(&server)
        .convert("a.txt", Bytes::from_static(b"a"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ConversionError::Service {
            status: 502,
            message: "unknown error".into()
        }
    );
}

#[tokio::test]
async fn convert_non_utf8_reply_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xfe, 0xfd]))
        .mount(&server)
        .await;

    let err = service_for(&server)
        .convert("a.txt", Bytes::from_static(b"a"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConversionError::Unknown { .. }), "got {err:?}");
}

#[tokio::test]
async fn convert_unreachable_is_transport_failure() {
    let config = ConversionConfig::builder()
        .endpoint(dead_endpoint())
        .build()
        .unwrap();
    let err = HttpConversionService::new(&config)
        .unwrap()
        .convert("a.txt", Bytes::from_static(b"a"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConversionError::Transport { .. }), "got {err:?}");
}

// ── Full run over HTTP ───────────────────────────────────────────────────────

#[tokio::test]
async fn session_run_over_http_stops_at_first_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .and(body_string_contains("filename=\"a.txt\""))
        .respond_with(ResponseTemplate::new(200).set_body_string("# A"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .and(body_string_contains("filename=\"b.txt\""))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "bad encoding"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .and(body_string_contains("filename=\"c.txt\""))
        .respond_with(ResponseTemplate::new(200).set_body_string("# C"))
        .expect(0)
        .mount(&server)
        .await;

    let svc = service_for(&server);
    let session = ConversionSession::new(ConversionConfig::default());
    session
        .set_selection(vec![
            SelectedFile::new("a.txt", "alpha"),
            SelectedFile::new("b.txt", "beta"),
            SelectedFile::new("c.txt", "gamma"),
        ])
        .unwrap();

    let report = session.start(&svc).await.unwrap();
    assert_eq!(report.status, OperationStatus::Failed("bad encoding".into()));
    assert_eq!(report.dispatched, 2);
    assert_eq!(session.latest_result().unwrap().text, "# A");

    let dir = tempfile::tempdir().unwrap();
    let saved = session.save_latest(dir.path()).await.unwrap();
    assert_eq!(saved.file_name().unwrap(), "a.md");
    assert_eq!(std::fs::read_to_string(saved).unwrap(), "# A");
}
