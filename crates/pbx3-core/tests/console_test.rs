#![allow(clippy::unwrap_used)]
// Integration tests for `Console` using wiremock.

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pbx3_api::{SecretString, SessionEvent, SessionProvider, TransportConfig};
use pbx3_core::{CacheState, ConnectionConfig, Console, CoreError};

async fn setup() -> (MockServer, Console, String) {
    let server = MockServer::start().await;
    let console = Console::new(&TransportConfig::default()).unwrap();
    let base = format!("{}/api", server.uri());
    (server, console, base)
}

fn whoami_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"name": "admin", "role": "isAdmin"}))
}

// ── Login / logout ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_verifies_token_and_records_user() {
    let (server, console, base) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/whoami"))
        .and(header("authorization", "Bearer good"))
        .respond_with(whoami_ok())
        .expect(1)
        .mount(&server)
        .await;

    assert!(!console.is_logged_in());
    let user = console
        .login(&base, SecretString::from("good"))
        .await
        .unwrap();

    assert_eq!(user["name"], "admin");
    assert!(console.is_logged_in());
    assert_eq!(console.user(), Some(user));
    assert_eq!(console.session().base_endpoint(), base);
}

#[tokio::test]
async fn test_login_rejected_token_clears_session() {
    let (server, console, base) = setup().await;
    let mut events = console.subscribe();

    Mock::given(method("GET"))
        .and(path("/api/auth/whoami"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthenticated."})))
        .mount(&server)
        .await;

    let err = console
        .login(&base, SecretString::from("bad"))
        .await
        .unwrap_err();

    assert!(err.is_auth_expired());
    assert!(!console.is_logged_in());
    assert!(console.user().is_none());

    assert_eq!(events.recv().await.unwrap(), SessionEvent::CredentialsChanged);
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Invalidated);
    assert_eq!(events.recv().await.unwrap(), SessionEvent::LoginRequired);
}

#[tokio::test]
async fn test_login_server_error_clears_session() {
    let (server, console, base) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/whoami"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = console
        .login(&base, SecretString::from("tok"))
        .await
        .unwrap_err();

    assert!(!err.is_auth_expired());
    assert!(!console.is_logged_in());
    assert!(console.session().base_endpoint().is_empty());
}

#[tokio::test]
async fn test_login_and_logout_reset_schema_cache() {
    let (server, console, base) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/whoami"))
        .respond_with(whoami_ok())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/schemas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"trunks": {}})))
        .expect(2)
        .mount(&server)
        .await;

    console.login(&base, SecretString::from("one")).await.unwrap();
    console.schemas().ensure_loaded().await.unwrap();
    assert_eq!(console.schemas().state(), CacheState::Ready);

    console.login(&base, SecretString::from("two")).await.unwrap();
    assert_eq!(console.schemas().state(), CacheState::Empty);

    console.schemas().ensure_loaded().await.unwrap();
    console.logout();
    assert_eq!(console.schemas().state(), CacheState::Empty);
    assert!(!console.is_logged_in());
}

#[tokio::test]
async fn test_whoami_requires_login() {
    let (_server, console, _base) = setup().await;
    let err = console.whoami().await.unwrap_err();
    assert!(matches!(err, CoreError::NotLoggedIn));
}

#[tokio::test]
async fn test_from_config_seeds_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/whoami"))
        .and(header("authorization", "Bearer seeded"))
        .respond_with(whoami_ok())
        .expect(1)
        .mount(&server)
        .await;

    let config = ConnectionConfig::new(format!("{}/api", server.uri()))
        .with_token(SecretString::from("seeded"));
    let console = Console::from_config(&config).unwrap();

    assert!(console.is_logged_in());
    let user = console.whoami().await.unwrap();
    assert_eq!(console.user(), Some(user));
}

// ── Lists ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_normalizes_wrapped_responses() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tenants"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": [{"pkey": "default"}, {"pkey": "acme"}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ivrs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"1": {"pkey": "b"}, "0": {"pkey": "a"}})),
        )
        .mount(&server)
        .await;

    let config = ConnectionConfig::new(format!("{}/api", server.uri()))
        .with_token(SecretString::from("tok"));
    let console = Console::from_config(&config).unwrap();

    let tenants = console.list("tenants", Some("tenants")).await.unwrap();
    assert_eq!(tenants.len(), 2);
    assert_eq!(tenants[1]["pkey"], "acme");

    let ivrs = console.list("ivrs", None).await.unwrap();
    assert_eq!(ivrs, vec![json!({"pkey": "a"}), json!({"pkey": "b"})]);
}
