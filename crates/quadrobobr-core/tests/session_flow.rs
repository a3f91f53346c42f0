//! End-to-end session tests against a stubbed authentication server.

use std::sync::Arc;
use std::time::Duration;

use quadrobobr_core::api::{ApiClient, ApiError, AuthError, INVALID_CREDENTIALS_MESSAGE};
use quadrobobr_core::auth::{
    FileStore, MemoryStore, SessionManager, SessionState, SessionStore, IDENTITY_KEY, TOKEN_KEY,
};
use quadrobobr_core::routes::{Navigation, Route, RouteGuard, Section};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn manager_with_store(base_url: &str, store: Box<dyn SessionStore>) -> Arc<SessionManager> {
    let api = ApiClient::new(base_url, Duration::from_secs(5)).expect("client should build");
    Arc::new(SessionManager::new(store, api))
}

fn memory_manager(base_url: &str) -> Arc<SessionManager> {
    manager_with_store(base_url, Box::new(MemoryStore::new()))
}

async fn mount_login_success(server: &MockServer, token: &str, admin: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "admin@example.com", "password": "correct"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "admin": admin,
        })))
        .mount(server)
        .await;
}

/// Store that can be read but refuses every write.
struct ReadOnlyStore(MemoryStore);

impl SessionStore for ReadOnlyStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.0.get(key)
    }

    fn set_all(&self, _entries: &[(&str, &str)]) -> anyhow::Result<()> {
        anyhow::bail!("read-only file system")
    }

    fn remove_all(&self, keys: &[&str]) -> anyhow::Result<()> {
        self.0.remove_all(keys)
    }
}

async fn mount_login_rejected(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "admin@example.com", "password": "wrongpass"})))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Unauthorized"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_success_stores_token_and_identity() {
    let server = MockServer::start().await;
    mount_login_success(
        &server,
        "tok123",
        json!({"email": "admin@example.com", "firstName": "A"}),
    )
    .await;

    let session = memory_manager(&server.uri());
    assert!(!session.is_authenticated());

    let identity = session
        .login("admin@example.com", "correct")
        .await
        .expect("login should succeed");

    assert_eq!(identity.email, "admin@example.com");
    assert_eq!(session.token().as_deref(), Some("tok123"));
    assert!(session.is_authenticated());

    let stored = session.identity().expect("identity should be stored");
    assert_eq!(stored.email, "admin@example.com");
    assert_eq!(stored.first_name.as_deref(), Some("A"));
    assert_eq!(stored, identity);
}

#[tokio::test]
async fn test_login_rejected_writes_nothing() {
    let server = MockServer::start().await;
    mount_login_rejected(&server).await;

    let session = memory_manager(&server.uri());
    let err = session
        .login("admin@example.com", "wrongpass")
        .await
        .expect_err("login should be rejected");

    assert!(matches!(err, AuthError::InvalidCredentials));
    assert_eq!(err.to_string(), INVALID_CREDENTIALS_MESSAGE);
    assert_eq!(session.token(), None);
    assert!(!session.is_authenticated());
    assert_eq!(session.identity(), None);
}

#[tokio::test]
async fn test_rejected_login_keeps_existing_session() {
    let server = MockServer::start().await;
    mount_login_success(&server, "tok123", json!({"email": "admin@example.com"})).await;
    mount_login_rejected(&server).await;

    let session = memory_manager(&server.uri());
    session
        .login("admin@example.com", "correct")
        .await
        .expect("first login should succeed");

    let err = session
        .login("admin@example.com", "wrongpass")
        .await
        .expect_err("second login should be rejected");
    assert!(matches!(err, AuthError::InvalidCredentials));

    assert!(session.is_authenticated());
    assert_eq!(session.token().as_deref(), Some("tok123"));
}

#[tokio::test]
async fn test_server_error_is_reported_as_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = memory_manager(&server.uri());
    let err = session
        .login("admin@example.com", "correct")
        .await
        .expect_err("non-2xx should fail");
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_malformed_response_fails_closed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok123"
        })))
        .mount(&server)
        .await;

    let session = memory_manager(&server.uri());
    let err = session
        .login("admin@example.com", "correct")
        .await
        .expect_err("missing admin should fail");

    assert!(matches!(err, AuthError::MalformedResponse(_)));
    assert!(err.is_retryable());
    assert_eq!(session.token(), None);
    assert_eq!(session.identity(), None);
}

#[tokio::test]
async fn test_non_json_body_fails_closed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let session = memory_manager(&server.uri());
    let err = session
        .login("admin@example.com", "correct")
        .await
        .expect_err("html body should fail");
    assert!(matches!(err, AuthError::MalformedResponse(_)));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Nothing listens on port 1
    let session = memory_manager("http://127.0.0.1:1");
    let err = session
        .login("admin@example.com", "correct")
        .await
        .expect_err("connection should fail");

    assert!(matches!(err, AuthError::NetworkUnavailable(_)));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_login_timeout_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "access_token": "tok123",
                    "admin": {"email": "admin@example.com"},
                }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), Duration::from_millis(300)).expect("client should build");
    let session = SessionManager::new(Box::new(MemoryStore::new()), api);
    let err = session
        .login("admin@example.com", "correct")
        .await
        .expect_err("slow server should time out");

    assert!(matches!(err, AuthError::NetworkUnavailable(_)));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_storage_failure_keeps_previous_session() {
    let server = MockServer::start().await;
    mount_login_success(&server, "tok123", json!({"email": "admin@example.com"})).await;

    let seeded = MemoryStore::new();
    seeded
        .set_all(&[
            (IDENTITY_KEY, r#"{"email":"old@example.com"}"#),
            (TOKEN_KEY, "old-token"),
        ])
        .expect("seed");
    let session = manager_with_store(&server.uri(), Box::new(ReadOnlyStore(seeded)));
    let rx = session.subscribe();

    let err = session
        .login("admin@example.com", "correct")
        .await
        .expect_err("write should fail");

    assert!(matches!(err, AuthError::Storage(_)));
    assert_eq!(session.token().as_deref(), Some("old-token"));
    assert_eq!(
        session.identity().map(|identity| identity.email).as_deref(),
        Some("old@example.com")
    );
    assert!(!rx.has_changed().expect("sender alive"));
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let server = MockServer::start().await;
    mount_login_success(&server, "tok123", json!({"email": "admin@example.com"})).await;

    let session = memory_manager(&server.uri());
    session.logout();
    assert!(!session.is_authenticated());

    session
        .login("admin@example.com", "correct")
        .await
        .expect("login should succeed");
    session.logout();
    assert!(!session.is_authenticated());
    assert_eq!(session.identity(), None);

    session.logout();
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_session_survives_reopen_and_identity_is_stored_verbatim() {
    let server = MockServer::start().await;
    let admin = json!({
        "email": "admin@example.com",
        "firstName": "Anna",
        "lastName": null,
        "role": "superadmin",
        "id": 42
    });
    mount_login_success(&server, "tok123", admin.clone()).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let session = manager_with_store(&server.uri(), Box::new(FileStore::new(dir.path())));
    session
        .login("admin@example.com", "correct")
        .await
        .expect("login should succeed");

    // Stored profile equals the server's object
    let raw = FileStore::new(dir.path())
        .get(IDENTITY_KEY)
        .expect("read")
        .expect("identity slot should exist");
    let stored: serde_json::Value = serde_json::from_str(&raw).expect("stored identity is JSON");
    assert_eq!(stored, admin);

    // A fresh manager over the same directory sees the same session
    let reopened = manager_with_store(&server.uri(), Box::new(FileStore::new(dir.path())));
    assert!(reopened.is_authenticated());
    assert_eq!(reopened.token().as_deref(), Some("tok123"));
    let identity = reopened.identity().expect("identity should survive reopen");
    assert_eq!(identity.display_name(), "Anna");
    assert_eq!(identity.role.as_deref(), Some("superadmin"));
    assert_eq!(identity.extra.get("id"), Some(&json!(42)));

    reopened.logout();
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_subscribers_observe_login_and_logout() {
    let server = MockServer::start().await;
    mount_login_success(&server, "tok123", json!({"email": "admin@example.com"})).await;

    let session = memory_manager(&server.uri());
    let mut rx = session.subscribe();
    assert_eq!(*rx.borrow_and_update(), SessionState::SignedOut);

    let identity = session
        .login("admin@example.com", "correct")
        .await
        .expect("login should succeed");
    assert!(rx.has_changed().expect("sender alive"));
    assert_eq!(
        *rx.borrow_and_update(),
        SessionState::SignedIn(Some(identity))
    );

    session.logout();
    assert!(rx.has_changed().expect("sender alive"));
    assert_eq!(*rx.borrow_and_update(), SessionState::SignedOut);

    // A second logout publishes nothing
    session.logout();
    assert!(!rx.has_changed().expect("sender alive"));
}

#[tokio::test]
async fn test_authorized_request_sends_bearer_token() {
    let server = MockServer::start().await;
    mount_login_success(&server, "tok123", json!({"email": "admin@example.com"})).await;
    Mock::given(method("GET"))
        .and(path("/api/contact-forms/unread-count"))
        .and(header("authorization", "Bearer tok123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(3)))
        .expect(1)
        .mount(&server)
        .await;

    let session = memory_manager(&server.uri());
    session
        .login("admin@example.com", "correct")
        .await
        .expect("login should succeed");

    let client = session.api().authorized(session.clone());
    let count = client
        .unread_message_count()
        .await
        .expect("count should load");
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_authorized_request_without_session_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/contact-forms/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(0)))
        .expect(0)
        .mount(&server)
        .await;

    let session = memory_manager(&server.uri());
    let client = session.api().authorized(session.clone());
    let err = client
        .unread_message_count()
        .await
        .expect_err("no token means no request");
    assert!(matches!(err, ApiError::NotAuthenticated));
}

#[tokio::test]
async fn test_rejected_token_signs_out_and_guard_redirects() {
    let server = MockServer::start().await;
    mount_login_success(&server, "tok123", json!({"email": "admin@example.com"})).await;
    Mock::given(method("GET"))
        .and(path("/api/faq/all"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let session = memory_manager(&server.uri());
    session
        .login("admin@example.com", "correct")
        .await
        .expect("login should succeed");

    let guard = RouteGuard::new();
    let faq = Section::Faq;
    assert_eq!(
        guard.resolve(faq.path(), &*session),
        Navigation::Render(Route::Section(faq))
    );

    let client = session.api().authorized(session.clone());
    let err = client
        .get::<serde_json::Value>(faq.api_collection())
        .await
        .expect_err("401 should surface");
    assert!(matches!(err, ApiError::Unauthorized));

    assert!(!session.is_authenticated());
    assert_eq!(
        guard.resolve(faq.path(), &*session),
        Navigation::Redirect(Route::Login)
    );
}

#[tokio::test]
async fn test_late_rejection_of_old_token_keeps_new_session() {
    let server = MockServer::start().await;
    for (email, token) in [("first@example.com", "token-a"), ("second@example.com", "token-b")] {
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({"email": email, "password": "correct"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": token,
                "admin": {"email": email},
            })))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/api/faq/all"))
        .and(header("authorization", "Bearer token-a"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(400)))
        .mount(&server)
        .await;

    let session = memory_manager(&server.uri());
    session
        .login("first@example.com", "correct")
        .await
        .expect("first login should succeed");

    let client = session.api().authorized(session.clone());
    let (stale, relogin) = tokio::join!(client.get::<serde_json::Value>("/api/faq/all"), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.login("second@example.com", "correct").await
    });

    relogin.expect("second login should succeed");
    assert!(matches!(stale, Err(ApiError::Unauthorized)));
    assert_eq!(session.token().as_deref(), Some("token-b"));
    assert_eq!(
        session.identity().map(|identity| identity.email).as_deref(),
        Some("second@example.com")
    );
}

#[tokio::test]
async fn test_forbidden_keeps_session() {
    let server = MockServer::start().await;
    mount_login_success(&server, "tok123", json!({"email": "admin@example.com"})).await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/7"))
        .respond_with(ResponseTemplate::new(403).set_body_string("superadmin only"))
        .mount(&server)
        .await;

    let session = memory_manager(&server.uri());
    session
        .login("admin@example.com", "correct")
        .await
        .expect("login should succeed");

    let client = session.api().authorized(session.clone());
    let err = client
        .delete("/api/users/7")
        .await
        .expect_err("403 should surface");
    assert!(matches!(err, ApiError::AccessDenied(ref body) if body == "superadmin only"));
    assert!(session.is_authenticated());
}
