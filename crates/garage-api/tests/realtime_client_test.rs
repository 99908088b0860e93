// Integration tests for `RealtimeClient` using wiremock.
#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use garage_api::{Error, FeedEvent, RealtimeClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(auth: Option<&str>) -> (MockServer, RealtimeClient) {
    let server = MockServer::start().await;
    let client = RealtimeClient::with_clients(
        reqwest::Client::new(),
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        auth.map(|a| SecretString::from(a.to_owned())),
    );
    (server, client)
}

fn sse(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_put_writes_whole_document() {
    let (server, client) = setup(Some("token-1")).await;
    let action = json!({ "type": "CLOSE", "uid": "user-1", "a_timestamp": "2024-01-01 08:00:00" });

    Mock::given(method("PUT"))
        .and(path("/garages/home_garage/controller/action.json"))
        .and(query_param("auth", "token-1"))
        .and(body_json(&action))
        .respond_with(ResponseTemplate::new(200).set_body_json(&action))
        .expect(1)
        .mount(&server)
        .await;

    client
        .put("garages/home_garage/controller/action", &action)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rejected_write_maps_database_error() {
    let (server, client) = setup(None).await;

    Mock::given(method("PUT"))
        .and(path("/garages/home_garage/status.json"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "Permission denied" })),
        )
        .mount(&server)
        .await;

    let err = client
        .put("garages/home_garage/status", &json!({ "type": "OPEN" }))
        .await
        .unwrap_err();

    match err {
        Error::Database { status, ref message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Permission denied");
        }
        other => panic!("expected database error, got {other:?}"),
    }
    assert!(err.is_permission_denied());
}

#[tokio::test]
async fn test_delete_removes_node() {
    let (server, client) = setup(None).await;

    Mock::given(method("DELETE"))
        .and(path("/garages/home_garage/device_tokens/status_update/tok.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&server)
        .await;

    client
        .delete("garages/home_garage/device_tokens/status_update/tok")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_get_reads_absent_node_as_null() {
    let (server, client) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/garages/home_garage/status.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let value = client.get("garages/home_garage/status").await.unwrap();
    assert_eq!(value, serde_json::Value::Null);
}

// ── Change feeds ────────────────────────────────────────────────────

#[tokio::test]
async fn test_listen_folds_edits_into_snapshots() {
    let (server, client) = setup(None).await;

    let body = "event: put\n\
                data: {\"path\":\"/\",\"data\":{\"type\":\"CLOSED\"}}\n\n\
                event: keep-alive\n\
                data: null\n\n\
                event: put\n\
                data: {\"path\":\"/type\",\"data\":\"OPENING\"}\n\n";

    Mock::given(method("GET"))
        .and(path("/garages/home_garage/status.json"))
        .and(header("accept", "text/event-stream"))
        .respond_with(sse(body))
        .mount(&server)
        .await;

    let mut rx = client.listen("garages/home_garage/status").unwrap();

    assert_eq!(
        rx.recv().await,
        Some(FeedEvent::Snapshot(json!({ "type": "CLOSED" })))
    );
    assert_eq!(
        rx.recv().await,
        Some(FeedEvent::Snapshot(json!({ "type": "OPENING" })))
    );
    assert_eq!(
        rx.recv().await,
        Some(FeedEvent::Cancelled {
            reason: "stream ended".into()
        })
    );
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn test_listen_skips_undecodable_frame() {
    let (server, client) = setup(None).await;

    let body = "event: put\n\
                data: {\"path\":\"/\",\"data\":{\"type\":\"CLOSED\"}}\n\n\
                event: patch\n\
                data: not json\n\n\
                event: put\n\
                data: {\"path\":\"/type\",\"data\":\"OPEN\"}\n\n";

    Mock::given(method("GET"))
        .and(path("/garages/home_garage/status.json"))
        .respond_with(sse(body))
        .mount(&server)
        .await;

    let mut rx = client.listen("garages/home_garage/status").unwrap();

    assert_eq!(
        rx.recv().await,
        Some(FeedEvent::Snapshot(json!({ "type": "CLOSED" })))
    );
    assert_eq!(
        rx.recv().await,
        Some(FeedEvent::Snapshot(json!({ "type": "OPEN" })))
    );
    assert_eq!(
        rx.recv().await,
        Some(FeedEvent::Cancelled {
            reason: "stream ended".into()
        })
    );
}

#[tokio::test]
async fn test_listen_reports_server_cancel() {
    let (server, client) = setup(None).await;

    let body = "event: put\n\
                data: {\"path\":\"/\",\"data\":null}\n\n\
                event: cancel\n\
                data: \"Permission denied\"\n\n";

    Mock::given(method("GET"))
        .and(path("/garages/home_garage/controller/auto_close_options.json"))
        .respond_with(sse(body))
        .mount(&server)
        .await;

    let mut rx = client
        .listen("garages/home_garage/controller/auto_close_options")
        .unwrap();

    assert_eq!(rx.recv().await, Some(FeedEvent::Snapshot(serde_json::Value::Null)));
    assert_eq!(
        rx.recv().await,
        Some(FeedEvent::Cancelled {
            reason: "Permission denied".into()
        })
    );
}

#[tokio::test]
async fn test_listen_rejected_feed_is_cancelled() {
    let (server, client) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/garages/home_garage/status.json"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "Permission denied" })),
        )
        .mount(&server)
        .await;

    let mut rx = client.listen("garages/home_garage/status").unwrap();

    match rx.recv().await {
        Some(FeedEvent::Cancelled { reason }) => assert!(reason.contains("Permission denied")),
        other => panic!("expected cancellation, got {other:?}"),
    }
}
