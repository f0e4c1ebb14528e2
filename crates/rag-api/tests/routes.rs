#![allow(non_snake_case)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use rag_api::middleware::auth::{require_page_auth, AppState};
use rag_client::access::SESSION_COOKIE;
use rag_client::{ApiClient, Authenticator, ConsoleMetrics, MemoryStorage, SessionGuard};
use rag_types::{BearerToken, ConsoleError, ConsoleResult, Role, Session, SessionUser};
use tower::ServiceExt;

/// Accepts `<role>/pw` for every role name.
struct RoleAuthenticator;

#[async_trait]
impl Authenticator for RoleAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> ConsoleResult<Session> {
        let role: Role = username
            .parse()
            .map_err(|_| ConsoleError::Authentication("Incorrect username or password".into()))?;
        if password != "pw" {
            return Err(ConsoleError::Authentication(
                "Incorrect username or password".into(),
            ));
        }
        Ok(Session {
            user: SessionUser {
                username: username.to_string(),
                role,
            },
            token: BearerToken::new(format!("token-{username}")).unwrap(),
        })
    }
}

fn app_state() -> AppState {
    let metrics = ConsoleMetrics::new().unwrap();
    let guard = SessionGuard::with_metrics(
        Arc::new(MemoryStorage::new()),
        Arc::new(RoleAuthenticator),
        metrics.clone(),
    );
    // Nothing listens on the discard port; any call that reaches it fails.
    let base = reqwest::Url::parse("http://127.0.0.1:9").unwrap();
    AppState {
        client: ApiClient::new(reqwest::Client::new(), base, guard),
        metrics,
    }
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Logs in directly through the guard and returns the access key.
async fn login_as(state: &AppState, role: Role) -> String {
    let signedIn = state.guard().login(role.as_str(), "pw").await.expect("login");
    signedIn.key.as_str().to_string()
}

fn with_cookie(mut request: Request<Body>, key: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::COOKIE,
        format!("{SESSION_COOKIE}={key}").parse().unwrap(),
    );
    request
}

fn with_bearer(mut request: Request<Body>, key: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {key}").parse().unwrap(),
    );
    request
}

/// `name=value` of the session cookie set by `response`.
fn issued_cookie(response: &axum::response::Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(SESSION_COOKIE))
        .and_then(|v| v.split(';').next())
        .expect("session cookie")
        .to_string()
}

#[tokio::test]
async fn login_session_logout_cycle() {
    let state = app_state();
    let app = rag_api::api_router(state.clone());

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/auth/session"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            serde_json::json!({"username": "editor", "password": "pw"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = issued_cookie(&response);
    let setCookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(setCookie.contains("HttpOnly"));
    assert!(setCookie.contains("SameSite=Strict"));
    let body = read_json(response).await;
    assert_eq!(body["username"], "editor");
    assert_eq!(body["role"], "editor");
    assert!(body.get("token").is_none());

    let mut request = empty_request("GET", "/api/v1/auth/session");
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["username"], "editor");

    let mut request = empty_request("POST", "/api/v1/auth/logout");
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));
    assert!(!state.guard().is_authenticated());
}

#[tokio::test]
async fn anonymous_callers_cannot_use_a_live_session() {
    let state = app_state();
    login_as(&state, Role::Admin).await;
    let app = rag_api::api_router(state.clone());

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/auth/session"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(empty_request("POST", "/api/v1/auth/logout"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(state.guard().is_authenticated());

    let response = app
        .clone()
        .oneshot(with_cookie(empty_request("GET", "/api/v1/orgs"), "forged"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_some());

    let response = app
        .oneshot(with_bearer(
            json_request(
                "POST",
                "/api/v1/orgs",
                serde_json::json!({"org_id": "globex", "org_name": "Globex"}),
            ),
            "forged",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn earlier_login_key_stops_working_after_relogin() {
    let state = app_state();
    let stale = login_as(&state, Role::Viewer).await;
    let current = login_as(&state, Role::Admin).await;
    let app = rag_api::api_router(state);

    let response = app
        .clone()
        .oneshot(with_cookie(empty_request("GET", "/api/v1/auth/session"), &stale))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(with_bearer(empty_request("GET", "/api/v1/auth/session"), &current))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["role"], "admin");
}

#[tokio::test]
async fn bad_login_is_unauthorized() {
    let app = rag_api::api_router(app_state());
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            serde_json::json!({"username": "admin", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Incorrect username or password");
}

#[tokio::test]
async fn org_routes_require_session() {
    let app = rag_api::api_router(app_state());
    let response = app
        .oneshot(empty_request("GET", "/api/v1/orgs"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn editor_cannot_create_org() {
    let state = app_state();
    let key = login_as(&state, Role::Editor).await;
    let app = rag_api::api_router(state);

    let response = app
        .oneshot(with_cookie(
            json_request(
                "POST",
                "/api/v1/orgs",
                serde_json::json!({"org_id": "globex", "org_name": "Globex"}),
            ),
            &key,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn empty_org_id_is_unprocessable() {
    let state = app_state();
    let key = login_as(&state, Role::Admin).await;
    let app = rag_api::api_router(state);

    let response = app
        .oneshot(with_cookie(
            json_request(
                "POST",
                "/api/v1/orgs",
                serde_json::json!({"org_id": "", "org_name": "Globex"}),
            ),
            &key,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(response).await;
    assert_eq!(
        body["details"],
        serde_json::json!(["Organization ID and Name are required"])
    );
}

#[tokio::test]
async fn viewer_cannot_delete_users() {
    let state = app_state();
    let key = login_as(&state, Role::Viewer).await;
    let app = rag_api::api_router(state);

    let response = app
        .oneshot(with_cookie(
            empty_request("DELETE", "/api/v1/orgs/acme/users/bob"),
            &key,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn editor_cannot_assign_admin() {
    let state = app_state();
    let key = login_as(&state, Role::Editor).await;
    let app = rag_api::api_router(state);

    let response = app
        .oneshot(with_cookie(
            json_request(
                "POST",
                "/api/v1/orgs/acme/users",
                serde_json::json!({"username": "mallory", "password": "pw", "role": "admin"}),
            ),
            &key,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unreachable_backend_is_bad_gateway() {
    let state = app_state();
    let key = login_as(&state, Role::Admin).await;
    let app = rag_api::api_router(state);

    let response = app
        .oneshot(with_bearer(empty_request("GET", "/api/v1/orgs"), &key))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn pages_redirect_to_login_without_session() {
    let state = app_state();
    let app = Router::new()
        .route("/", get(|| async { "orgs" }))
        .route("/login", get(|| async { "login" }))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_page_auth,
        ));

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/"))
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/login"
    );

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/login"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let key = login_as(&state, Role::Viewer).await;
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/"))
        .await
        .unwrap();
    assert!(response.status().is_redirection());

    let response = app
        .clone()
        .oneshot(with_cookie(empty_request("GET", "/"), &key))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    state.guard().logout();
    let response = app
        .oneshot(with_cookie(empty_request("GET", "/"), &key))
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert!(response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));
}

#[tokio::test]
async fn metrics_count_requests_and_logins() {
    let state = app_state();
    let app = rag_api::api_router(state.clone()).layer(axum::middleware::from_fn_with_state(
        state.metrics.clone(),
        rag_api::middleware::metrics::track_requests,
    ));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            serde_json::json!({"username": "admin", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    login_as(&state, Role::Editor).await;

    let response = app
        .oneshot(empty_request("GET", "/metrics"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("app_requests_total"));
    assert!(text.contains("request_latency_seconds"));
    assert!(text.contains("login_attempts_total"));

    assert_eq!(state.metrics.requests("POST", "/api/v1/auth/login"), 1.0);
    assert_eq!(state.metrics.login_attempts(false, None), 1.0);
    assert_eq!(state.metrics.login_attempts(true, Some(Role::Editor)), 1.0);
}
