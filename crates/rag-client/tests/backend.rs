//! Drives the client against an in-process stand-in for the RAG backend.
#![allow(non_snake_case)]

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use rag_client::storage::{TOKEN_KEY, USER_KEY};
use rag_client::{
    connect, ApiClient, BackendConfig, ConsoleMetrics, FileStorage, MemoryStorage, SessionStorage,
};
use rag_types::{ConsoleError, Role, ORG_FIELDS_REQUIRED, USER_TARGET_REQUIRED};
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug)]
struct Seen {
    method: String,
    path: String,
    authorization: Option<String>,
}

#[derive(Clone, Default)]
struct Backend {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Backend {
    fn record(&self, method: &str, path: String, headers: &HeaderMap) {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.seen.lock().unwrap().push(Seen {
            method: method.into(),
            path,
            authorization,
        });
    }

    fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    matches!(
        headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()),
        Some("Bearer T") | Some("Bearer R")
    )
}

async fn token(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    backend.record("POST", "/token".into(), &headers);
    match (form.username.as_str(), form.password.as_str()) {
        ("alice", "pw") => {
            Json(json!({"access_token": "T", "token_type": "bearer", "role": "editor"}))
                .into_response()
        }
        ("root", "pw") => {
            Json(json!({"access_token": "R", "token_type": "bearer", "role": "admin"}))
                .into_response()
        }
        _ => detail(StatusCode::BAD_REQUEST, "Incorrect username or password"),
    }
}

async fn list_orgs(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    backend.record("GET", "/orgs".into(), &headers);
    if !bearer_ok(&headers) {
        return detail(StatusCode::UNAUTHORIZED, "Could not validate credentials");
    }
    Json(json!({"orgs": [{"org_id": "acme", "name": "Acme"}]})).into_response()
}

async fn create_org(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    backend.record("POST", "/admin/orgs".into(), &headers);
    if body["org_id"] == "acme" {
        return detail(StatusCode::CONFLICT, "Org already exists");
    }
    (
        StatusCode::CREATED,
        Json(json!({"org_id": body["org_id"], "name": body["org_name"]})),
    )
        .into_response()
}

async fn list_users(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(org_id): Path<String>,
) -> Response {
    backend.record("GET", format!("/orgs/{org_id}/users"), &headers);
    if org_id == "expired" || !bearer_ok(&headers) {
        return detail(StatusCode::UNAUTHORIZED, "Could not validate credentials");
    }
    Json(json!({"users": [
        {"username": "alice", "role": "editor"},
        {"username": "bob", "role": "viewer"}
    ]}))
    .into_response()
}

async fn create_user(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(org_id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    backend.record("POST", format!("/orgs/{org_id}/users"), &headers);
    if body["username"] == "taken" {
        return detail(StatusCode::CONFLICT, "User exists");
    }
    if body["role"] == "viewer" && body["password"] == "short" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [
                {"loc": ["body", "password"], "msg": "too short", "type": "value_error"}
            ]})),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({"username": body["username"], "role": body["role"], "org_id": org_id})),
    )
        .into_response()
}

async fn delete_user(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path((org_id, username)): Path<(String, String)>,
) -> Response {
    backend.record("DELETE", format!("/orgs/{org_id}/users/{username}"), &headers);
    Json(json!({"deleted": username})).into_response()
}

async fn spawn_backend() -> (Backend, String) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/token", post(token))
        .route("/orgs", get(list_orgs))
        .route("/admin/orgs", post(create_org))
        .route("/orgs/:org_id/users", get(list_users).post(create_user))
        .route("/orgs/:org_id/users/:username", delete(delete_user))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (backend, format!("http://{addr}"))
}

fn client_for(baseUrl: &str, storage: Arc<dyn SessionStorage>) -> ApiClient {
    let config = BackendConfig {
        base_url: baseUrl.to_string(),
        timeout_secs: 5,
    };
    connect(&config, storage, ConsoleMetrics::new().unwrap()).expect("client")
}

#[tokio::test]
async fn login_then_list_users_carries_bearer() {
    let (backend, baseUrl) = spawn_backend().await;
    let storage = Arc::new(MemoryStorage::new());
    let client = client_for(&baseUrl, storage.clone());

    let session = client.guard().login("alice", "pw").await.unwrap().session;
    assert_eq!(session.username(), "alice");
    assert_eq!(session.role(), Role::Editor);
    assert_eq!(session.token.as_str(), "T");
    assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("T"));
    assert_eq!(
        storage.get(USER_KEY).unwrap().as_deref(),
        Some(r#"{"username":"alice","role":"editor"}"#)
    );

    let users = client.list_users("acme").await.unwrap();
    assert_eq!(users.len(), 2);

    let requests = backend.requests();
    let tokenRequest = &requests[0];
    assert_eq!(tokenRequest.path, "/token");
    assert_eq!(tokenRequest.authorization, None);

    let listRequest = requests.last().unwrap();
    assert_eq!(listRequest.method, "GET");
    assert_eq!(listRequest.path, "/orgs/acme/users");
    assert_eq!(listRequest.authorization.as_deref(), Some("Bearer T"));
}

#[tokio::test]
async fn bad_credentials_are_authentication_errors() {
    let (_backend, baseUrl) = spawn_backend().await;
    let client = client_for(&baseUrl, Arc::new(MemoryStorage::new()));

    let err = client.guard().login("alice", "nope").await.unwrap_err();
    assert_eq!(
        err,
        ConsoleError::Authentication("Incorrect username or password".into())
    );
    assert!(!client.guard().is_authenticated());
}

#[tokio::test]
async fn no_bearer_after_logout() {
    let (backend, baseUrl) = spawn_backend().await;
    let client = client_for(&baseUrl, Arc::new(MemoryStorage::new()));
    client.guard().login("alice", "pw").await.unwrap();
    client.guard().logout();

    let err = client.list_orgs().await.unwrap_err();
    assert!(matches!(err, ConsoleError::Authentication(_)));
    let last = backend.requests().pop().unwrap();
    assert_eq!(last.path, "/orgs");
    assert_eq!(last.authorization, None);
}

#[tokio::test]
async fn empty_org_id_never_reaches_backend() {
    let (backend, baseUrl) = spawn_backend().await;
    let client = client_for(&baseUrl, Arc::new(MemoryStorage::new()));
    client.guard().login("root", "pw").await.unwrap();
    let before = backend.requests().len();

    let err = client.create_org("", "Acme").await.unwrap_err();
    assert_eq!(err.to_string(), ORG_FIELDS_REQUIRED);
    assert_eq!(backend.requests().len(), before);
}

#[tokio::test]
async fn blank_delete_target_never_reaches_backend() {
    let (backend, baseUrl) = spawn_backend().await;
    let client = client_for(&baseUrl, Arc::new(MemoryStorage::new()));
    client.guard().login("alice", "pw").await.unwrap();
    let before = backend.requests().len();

    let err = client.delete_user("acme", "").await.unwrap_err();
    assert_eq!(err, ConsoleError::validation(USER_TARGET_REQUIRED));
    let err = client.delete_user(" ", "bob").await.unwrap_err();
    assert_eq!(err, ConsoleError::validation(USER_TARGET_REQUIRED));
    assert_eq!(backend.requests().len(), before);
}

#[tokio::test]
async fn editor_is_refused_org_creation_locally() {
    let (backend, baseUrl) = spawn_backend().await;
    let client = client_for(&baseUrl, Arc::new(MemoryStorage::new()));
    client.guard().login("alice", "pw").await.unwrap();
    let before = backend.requests().len();

    let err = client.create_org("globex", "Globex").await.unwrap_err();
    assert!(matches!(err, ConsoleError::Authorization(_)));
    let err = client
        .create_user("acme", "mallory", "pw", Role::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Authorization(_)));
    assert_eq!(backend.requests().len(), before);
}

#[tokio::test]
async fn admin_creates_org_and_sees_conflicts() {
    let (_backend, baseUrl) = spawn_backend().await;
    let client = client_for(&baseUrl, Arc::new(MemoryStorage::new()));
    client.guard().login("root", "pw").await.unwrap();

    let org = client.create_org("globex", "Globex").await.unwrap();
    assert_eq!(org.org_id, "globex");
    assert_eq!(org.name, "Globex");

    let err = client.create_org("acme", "Acme").await.unwrap_err();
    assert_eq!(
        err,
        ConsoleError::Rejected {
            status: 409,
            message: "Org already exists".into()
        }
    );

    let orgs = client.list_orgs().await.unwrap();
    assert_eq!(orgs[0].org_id, "acme");
}

#[tokio::test]
async fn user_lifecycle_and_backend_validation() {
    let (backend, baseUrl) = spawn_backend().await;
    let client = client_for(&baseUrl, Arc::new(MemoryStorage::new()));
    client.guard().login("alice", "pw").await.unwrap();

    let created = client
        .create_user("acme", "carol", "secret", Role::Editor)
        .await
        .unwrap();
    assert_eq!(created.org_id, "acme");
    assert_eq!(created.role, Role::Editor);

    let err = client
        .create_user("acme", "dave", "short", Role::Viewer)
        .await
        .unwrap_err();
    assert_eq!(err, ConsoleError::Validation(vec!["password: too short".into()]));

    let deleted = client.delete_user("acme", "bob").await.unwrap();
    assert_eq!(deleted.deleted, "bob");
    let last = backend.requests().pop().unwrap();
    assert_eq!(last.method, "DELETE");
    assert_eq!(last.path, "/orgs/acme/users/bob");
    assert_eq!(last.authorization.as_deref(), Some("Bearer T"));
}

#[tokio::test]
async fn rejected_token_forces_reauthentication() {
    let (_backend, baseUrl) = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path().join("session.json")));
    let client = client_for(&baseUrl, storage.clone());
    client.guard().login("alice", "pw").await.unwrap();
    assert!(storage.path().exists());

    let err = client.list_users("expired").await.unwrap_err();
    assert!(matches!(err, ConsoleError::Authentication(_)));
    assert!(!client.guard().is_authenticated());
    assert!(!storage.path().exists());
}

#[tokio::test]
async fn session_survives_restart() {
    let (backend, baseUrl) = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let first = client_for(&baseUrl, Arc::new(FileStorage::new(&path)));
    first.guard().login("alice", "pw").await.unwrap();

    let second = client_for(&baseUrl, Arc::new(FileStorage::new(&path)));
    assert_eq!(second.guard().current_role(), Some(Role::Editor));
    second.list_orgs().await.unwrap();
    assert_eq!(
        backend.requests().pop().unwrap().authorization.as_deref(),
        Some("Bearer T")
    );

    second.guard().logout();
    let third = client_for(&baseUrl, Arc::new(FileStorage::new(&path)));
    assert!(!third.guard().is_authenticated());
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    let client = client_for("http://127.0.0.1:9", Arc::new(MemoryStorage::new()));
    let err = client.guard().login("alice", "pw").await.unwrap_err();
    assert!(matches!(err, ConsoleError::Network(_)));
}
