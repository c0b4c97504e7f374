//! Authenticated request path against a mock portal.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use reqwest::Method;
use serde_json::json;
use url::Url;

use vinfra::auth::{CachedAuth, Prompter};
use vinfra::configuration::Credential;
use vinfra::cookie_jar::CookieJar;
use vinfra::credential_store::CredentialStore;
use vinfra::error::{Result, VinfraError};
use vinfra::kinds;
use vinfra::manager::RestManager;
use vinfra::resolver::find_resource;
use vinfra::session::{AuthSession, RequestOptions, Transport};

#[derive(Clone, Default)]
struct MockPortal {
    logins: Arc<AtomicUsize>,
    hits: Arc<AtomicUsize>,
    reject_login: bool,
    always_unauthorized: bool,
    require_token: bool,
    cookie_without_path: bool,
}

async fn login(State(portal): State<MockPortal>) -> Response {
    portal.logins.fetch_add(1, Ordering::SeqCst);
    if portal.reject_login {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "Invalid credentials"})),
        )
            .into_response();
    }
    let cookie = if portal.cookie_without_path {
        "session=fresh; HttpOnly"
    } else {
        "session=fresh; Path=/; HttpOnly"
    };
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({"username": "admin"})),
    )
        .into_response()
}

async fn scope() -> Json<serde_json::Value> {
    Json(json!({"token": "project-token"}))
}

async fn domains(State(portal): State<MockPortal>, headers: HeaderMap) -> Response {
    portal.hits.fetch_add(1, Ordering::SeqCst);
    let has_session = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("session=fresh"))
        .unwrap_or(false);
    let has_token = !portal.require_token
        || headers
            .get("x-auth-token")
            .map(|value| value == "project-token")
            .unwrap_or(false);

    if portal.always_unauthorized || !has_session || !has_token {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Session expired"})),
        )
            .into_response();
    }
    Json(json!([{"id": "4f0e8b5c-1d2a-4c3b-9e8f-7a6b5c4d3e2f", "name": "Default"}])).into_response()
}

async fn start(portal: MockPortal) -> Url {
    let app = Router::new()
        .route("/api/v2/login", post(login))
        .route("/api/v2/login/scope", post(scope))
        .route("/api/v2/domains", get(domains))
        .with_state(portal);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{}/", address)).unwrap()
}

struct NoPrompt;

impl Prompter for NoPrompt {
    fn prompt_username(&self) -> Result<String> {
        Err(VinfraError::Authentication("no terminal".to_string()))
    }

    fn prompt_password(&self, _credential: &Credential) -> Result<String> {
        Err(VinfraError::Authentication("no terminal".to_string()))
    }
}

fn credential() -> Credential {
    Credential::new("127.0.0.1", "admin").with_password("secret")
}

fn session(url: &Url, store: &CredentialStore, credential: Credential) -> AuthSession {
    let transport = Transport::new(url.clone(), false).unwrap();
    AuthSession::new(
        transport,
        CachedAuth::new(credential, store.clone()).with_prompter(NoPrompt),
    )
}

/// Leave a cookie file behind as an earlier, now expired, login would
fn seed_stale_session(url: &Url, store: &CredentialStore, credential: &Credential) {
    let jar = CookieJar::new();
    let stale = HeaderValue::from_static("session=stale; Path=/");
    jar.set_cookies(&mut std::iter::once(&stale), url);
    store.save_cookies(&jar, credential).unwrap();
}

#[tokio::test]
async fn test_unauthorized_without_cached_session_is_not_retried() {
    let portal = MockPortal {
        always_unauthorized: true,
        ..Default::default()
    };
    let url = start(portal.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path());

    let err = session(&url, &store, credential())
        .get_json("api/v2/domains", RequestOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_status(reqwest::StatusCode::UNAUTHORIZED));
    assert_eq!(err.exit_code().code(), 1);
    // The initial login only; the 401 itself triggers nothing
    assert_eq!(portal.logins.load(Ordering::SeqCst), 1);
    assert_eq!(portal.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_expired_cached_session_is_renewed_once() {
    let portal = MockPortal::default();
    let url = start(portal.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path());
    seed_stale_session(&url, &store, &credential());

    let domains = session(&url, &store, credential())
        .get_json("api/v2/domains", RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(domains[0]["name"], "Default");
    assert_eq!(portal.logins.load(Ordering::SeqCst), 1);
    assert_eq!(portal.hits.load(Ordering::SeqCst), 2);

    let cached = std::fs::read_to_string(store.path_for(&credential())).unwrap();
    assert!(cached.contains("fresh"));
    assert!(!cached.contains("stale"));
    assert!(!cached.contains("secret"));
}

#[tokio::test]
async fn test_retry_happens_at_most_once() {
    let portal = MockPortal {
        always_unauthorized: true,
        ..Default::default()
    };
    let url = start(portal.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path());
    seed_stale_session(&url, &store, &credential());

    let err = session(&url, &store, credential())
        .get_json("api/v2/domains", RequestOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_status(reqwest::StatusCode::UNAUTHORIZED));
    assert_eq!(portal.logins.load(Ordering::SeqCst), 1);
    assert_eq!(portal.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unauthenticated_request_never_logs_in() {
    let portal = MockPortal::default();
    let url = start(portal.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path());
    seed_stale_session(&url, &store, &credential());

    let err = session(&url, &store, credential())
        .request(Method::GET, "api/v2/domains", RequestOptions::unauthenticated())
        .await
        .unwrap_err();

    assert!(err.is_status(reqwest::StatusCode::UNAUTHORIZED));
    assert_eq!(portal.logins.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rejected_login_is_an_authentication_error() {
    let portal = MockPortal {
        reject_login: true,
        ..Default::default()
    };
    let url = start(portal.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path());
    let session = session(&url, &store, credential());

    let err = session
        .get_json("api/v2/domains", RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VinfraError::Authentication(ref m) if m.contains("Invalid credentials")));
    assert_eq!(err.exit_code().code(), 1);
    assert!(!store.session_exists(&credential()));

    // The rejected password is forgotten, so the next attempt must prompt
    let err = session.login().await.unwrap_err();
    assert!(matches!(err, VinfraError::Authentication(ref m) if m.contains("no terminal")));
    assert_eq!(portal.logins.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_project_scope_token_is_sent_and_cached() {
    let portal = MockPortal {
        require_token: true,
        ..Default::default()
    };
    let url = start(portal.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path());
    let credential = credential().with_project("p1");

    session(&url, &store, credential.clone())
        .get_json("api/v2/domains", RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(
        store.load_project_token(&credential).as_deref(),
        Some("project-token")
    );

    // A second process reuses both cached files without logging in
    session(&url, &store, credential)
        .get_json("api/v2/domains", RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(portal.logins.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unreachable_portal_is_a_connection_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("http://{}/", address)).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path());

    let err = session(&url, &store, credential())
        .get_json("api/v2/domains", RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VinfraError::Connection(_)), "{:?}", err);
    assert_eq!(err.exit_code().code(), 101);
}

#[tokio::test]
async fn test_cached_session_without_cookie_path_is_reused() {
    let portal = MockPortal {
        cookie_without_path: true,
        ..Default::default()
    };
    let url = start(portal.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path());

    session(&url, &store, credential())
        .get_json("api/v2/domains", RequestOptions::default())
        .await
        .unwrap();

    // A later process starts from the cache file alone
    session(&url, &store, credential())
        .get_json("api/v2/domains", RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(portal.logins.load(Ordering::SeqCst), 1);
    assert_eq!(portal.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rejected_login_during_uuid_lookup_is_reported() {
    let portal = MockPortal {
        reject_login: true,
        ..Default::default()
    };
    let url = start(portal.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path());
    let manager = RestManager::new(
        Arc::new(session(&url, &store, credential())),
        &kinds::VOLUME,
    );

    let err = find_resource(&manager, "4f0e8b5c-1d2a-4c3b-9e8f-7a6b5c4d3e2f")
        .await
        .unwrap_err();

    assert!(
        matches!(err, VinfraError::Authentication(ref m) if m.contains("Invalid credentials")),
        "{:?}",
        err
    );
    assert_eq!(portal.logins.load(Ordering::SeqCst), 1);
}
