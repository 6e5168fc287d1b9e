#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pbx3_api::{
    ApiClient, Error, Payload, SecretString, SessionEvent, SessionProvider, SessionStore,
    StatusCode,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Arc<SessionStore>, ApiClient) {
    let server = MockServer::start().await;
    let store = SessionStore::with_credentials(
        format!("{}/api/", server.uri()),
        Some(SecretString::from("secret-token")),
    )
    .shared();
    let client = ApiClient::with_client(reqwest::Client::new(), store.clone());
    (server, store, client)
}

/// Session double that counts side effects and never clears its endpoint.
struct CountingSession {
    base: String,
    invalidations: AtomicUsize,
    redirects: AtomicUsize,
}

impl SessionProvider for CountingSession {
    fn base_endpoint(&self) -> String {
        self.base.clone()
    }

    fn token(&self) -> Option<SecretString> {
        Some(SecretString::from("stale-token"))
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }

    fn on_login_redirect(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Request construction ────────────────────────────────────────────

#[tokio::test]
async fn test_get_sends_accept_and_bearer_headers() {
    let (server, _store, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/tenants"))
        .and(header("accept", "application/json"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"pkey": "default"}])))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client.get("/tenants").await.unwrap();
    assert_eq!(payload, Payload::Json(json!([{"pkey": "default"}])));
}

#[tokio::test]
async fn test_get_with_query_appends_form_encoded_pairs() {
    let (server, _store, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/tenants"))
        .and(query_param("a", "1"))
        .and(query_param("b", "x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    client
        .get_with_query("tenants", &[("a", json!(1)), ("b", json!("x"))])
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].url.as_str(),
        format!("{}/api/tenants?a=1&b=x", server.uri())
    );
}

#[tokio::test]
async fn test_query_values_use_form_encoding() {
    let (server, _store, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    client
        .get_with_query("extensions", &json!({"desc": "Main Office", "active": true}))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap();
    assert!(query.contains("desc=Main+Office"), "query: {query}");
    assert!(query.contains("active=true"), "query: {query}");
}

#[tokio::test]
async fn test_struct_and_object_queries_keep_field_order() {
    #[derive(serde::Serialize)]
    struct Page {
        page: u32,
        filter: &'static str,
    }

    let (server, _store, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/tenants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    client
        .get_with_query("tenants", &Page { page: 2, filter: "x" })
        .await
        .unwrap();
    client
        .get_with_query("tenants", &json!({"zone": "b", "area": "a"}))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), Some("page=2&filter=x"));
    assert_eq!(requests[1].url.query(), Some("zone=b&area=a"));
}

#[tokio::test]
async fn test_empty_query_adds_no_question_mark() {
    let (server, _store, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let empty: HashMap<String, String> = HashMap::new();
    client.get_with_query("tenants", &empty).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_post_round_trips_json() {
    let (server, _store, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/echo"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"foo": "bar"})))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"foo":"bar"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client.post("echo", &json!({"foo": "bar"})).await.unwrap();
    assert_eq!(payload, Payload::Json(json!({"foo": "bar"})));
}

#[tokio::test]
async fn test_post_without_body_omits_content_type() {
    let (server, _store, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/syscommands/commit"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let payload = client.post("syscommands/commit", &()).await.unwrap();
    assert_eq!(payload, Payload::Text("OK".into()));

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("content-type").is_none());
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_put_sends_json_body() {
    let (server, _store, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/extensions/1000"))
        .and(body_json(json!({"desc": "Reception"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pkey": "1000"})))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client
        .put("extensions/1000", &json!({"desc": "Reception"}))
        .await
        .unwrap();
    assert_eq!(payload.as_json(), Some(&json!({"pkey": "1000"})));
}

#[tokio::test]
async fn test_delete_with_empty_body_decodes_to_empty() {
    let (server, _store, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/queues/sales"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client.delete("queues/sales").await.unwrap();
    assert!(payload.is_empty());
}

#[tokio::test]
async fn test_missing_token_sends_no_authorization() {
    let server = MockServer::start().await;
    let store = SessionStore::with_credentials(format!("{}/api", server.uri()), None).shared();
    let client = ApiClient::with_client(reqwest::Client::new(), store);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    client.get("auth/whoami").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_credentials_are_read_per_call() {
    let (server, store, client) = setup().await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer rotated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    store.set_credentials(
        format!("{}/api", server.uri()),
        Some(SecretString::from("rotated")),
    );
    client.get("tenants").await.unwrap();
}

#[tokio::test]
async fn test_unserializable_body_fails_before_network() {
    let (server, _store, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut body: HashMap<(u8, u8), u8> = HashMap::new();
    body.insert((1, 2), 3);

    let result = client.post("tenants", &body).await;
    assert!(matches!(result, Err(Error::Encode(_))), "got: {result:?}");
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_http_error_carries_raw_and_parsed_body() {
    let (server, store, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/extensions/1000"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"pkey": ["Must be 3-5 digits"]})),
        )
        .mount(&server)
        .await;

    let err = client
        .put("extensions/1000", &json!({"pkey": "1"}))
        .await
        .unwrap_err();

    let failure = err.failure().expect("HTTP failure");
    assert!(matches!(err, Error::Http(_)));
    assert_eq!(failure.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        failure.message,
        "API PUT extensions/1000: 422 Unprocessable Entity"
    );
    assert_eq!(
        failure.parsed_body,
        Some(json!({"pkey": ["Must be 3-5 digits"]}))
    );
    assert!(failure.raw_body.contains("Must be 3-5 digits"));
    assert!(store.is_logged_in(), "non-401 failures must not log out");
}

#[tokio::test]
async fn test_401_invalidates_session_and_requests_login() {
    let (server, store, client) = setup().await;
    let mut events = store.subscribe();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthenticated."))
        .mount(&server)
        .await;

    let err = client.get("tenants").await.unwrap_err();

    assert!(err.is_auth_expired(), "got: {err:?}");
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(err.failure().unwrap().raw_body, "Unauthenticated.");
    assert!(err.failure().unwrap().parsed_body.is_none());

    assert!(!store.is_logged_in());
    assert!(store.base_endpoint().is_empty());

    assert_eq!(events.try_recv().ok(), Some(SessionEvent::Invalidated));
    assert_eq!(events.try_recv().ok(), Some(SessionEvent::LoginRequired));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_concurrent_401s_each_invalidate_once() {
    let server = MockServer::start().await;
    let session = Arc::new(CountingSession {
        base: format!("{}/api", server.uri()),
        invalidations: AtomicUsize::new(0),
        redirects: AtomicUsize::new(0),
    });
    let client = ApiClient::with_client(reqwest::Client::new(), session.clone());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(3)
        .mount(&server)
        .await;

    let results = futures::future::join_all([
        client.get("tenants"),
        client.get("extensions"),
        client.get("queues"),
    ])
    .await;

    assert!(results.iter().all(|r| matches!(r, Err(Error::SessionExpired(_)))));
    assert_eq!(session.invalidations.load(Ordering::SeqCst), 3);
    assert_eq!(session.redirects.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_network_failure_has_no_status() {
    let store = SessionStore::with_credentials("http://127.0.0.1:1/api", None).shared();
    let client = ApiClient::with_client(reqwest::Client::new(), store.clone());

    let err = client.get("tenants").await.unwrap_err();

    assert!(matches!(err, Error::Network(_)), "got: {err:?}");
    assert_eq!(err.status(), None);
    assert_eq!(store.base_endpoint(), "http://127.0.0.1:1/api");
}

// ── Blobs ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_blob_returns_raw_bytes() {
    let (server, _store, client) = setup().await;
    let wav = vec![0x52_u8, 0x49, 0x46, 0x46, 0x00, 0xff];

    Mock::given(method("GET"))
        .and(path("/api/greetings/usergreeting1001.wav"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(wav.clone(), "audio/wav"))
        .mount(&server)
        .await;

    let bytes = client
        .get_blob("greetings/usergreeting1001.wav")
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), wav.as_slice());

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("content-type").is_none());
}

#[tokio::test]
async fn test_get_blob_401_also_invalidates() {
    let (server, store, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.get_blob("backups/latest").await.unwrap_err();
    assert!(err.is_auth_expired());
    assert!(!store.is_logged_in());
}

#[tokio::test]
async fn test_get_blob_error_is_a_transport_failure() {
    let (server, store, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "No such file"})))
        .mount(&server)
        .await;

    let err = client.get_blob("greetings/missing.wav").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.failure().unwrap().message,
        "API GET greetings/missing.wav: 404 Not Found"
    );
    assert!(store.is_logged_in());
}

#[tokio::test]
async fn test_truncated_error_body_still_reports_status() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 2048];
        let _ = socket.read(&mut buf).await;
        // Promise 100 bytes, send a few, then hang up.
        let _ = socket
            .write_all(
                b"HTTP/1.1 500 Internal Server Error\r\n\
                  Content-Type: application/json\r\n\
                  Content-Length: 100\r\n\r\n{\"mess",
            )
            .await;
    });

    let store = SessionStore::with_credentials(format!("http://{addr}/api"), None).shared();
    let client = ApiClient::with_client(reqwest::Client::new(), store);

    let err = client.get("tenants").await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
    let failure = err.failure().unwrap();
    assert_eq!(failure.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(failure.raw_body.is_empty());
    assert!(failure.parsed_body.is_none());
}
