use axum::{
    body::Body,
    extract::{FromRef, State},
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::{self, Next},
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Extension, Router,
};
use rag_client::access::{cookie_value, expired_cookie, issue_cookie};
use rag_client::{ApiClient, ConsoleMetrics, SessionGuard};
use rag_types::{ConsoleError, SessionUser};
use serde::{Deserialize, Serialize};

use crate::error::ApiFailure;

#[derive(Clone)]
pub struct AppState {
    pub client: ApiClient,
    pub metrics: ConsoleMetrics,
}

impl AppState {
    pub fn guard(&self) -> &SessionGuard {
        self.client.guard()
    }
}

impl FromRef<AppState> for ConsoleMetrics {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// Access key the request authenticated with, for handlers that act on it.
#[derive(Clone)]
pub struct PresentedKey(pub String);

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct OkResponse {
    ok: bool,
}

pub fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/v1/auth/logout", post(handle_logout))
        .route("/api/v1/auth/session", get(handle_session))
        .route_layer(middleware::from_fn_with_state(state, require_api_auth));

    Router::new()
        .route("/api/v1/auth/login", post(handle_login))
        .merge(protected)
}

async fn handle_login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiFailure> {
    let signedIn = state.guard().login(&body.username, &body.password).await?;
    let mut response = Json(signedIn.session.user).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&issue_cookie(&signedIn.key))
            .unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    Ok(response)
}

async fn handle_logout(
    State(state): State<AppState>,
    Extension(presented): Extension<PresentedKey>,
) -> Response {
    state.guard().revoke(&presented.0);
    with_expired_cookie(Json(OkResponse { ok: true }).into_response())
}

async fn handle_session(Extension(user): Extension<SessionUser>) -> Json<SessionUser> {
    Json(user)
}

/// Middleware for API routes: requires the current access key, either as
/// `Authorization: Bearer <key>` or as the session cookie.
pub async fn require_api_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let presented = bearer_key(request.headers()).or_else(|| cookie_key(request.headers()));

    let user = presented
        .as_deref()
        .and_then(|key| state.guard().user_for(key));

    match (user, presented) {
        (Some(user), Some(key)) => {
            request.extensions_mut().insert(user);
            request.extensions_mut().insert(PresentedKey(key));
            next.run(request).await
        }
        (_, presented) => {
            let response =
                ApiFailure(ConsoleError::Authentication("Not logged in".into())).into_response();
            if presented.is_some() {
                with_expired_cookie(response)
            } else {
                response
            }
        }
    }
}

/// Middleware for page routes: checks the session cookie, redirects to
/// /login if it is missing or stale.
pub async fn require_page_auth(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    // Exempt paths: login page, static assets, pkg files, api routes, metrics
    if path == "/login"
        || path == "/metrics"
        || path.starts_with("/pkg/")
        || path.starts_with("/api/")
        || path.starts_with("/assets/")
    {
        return next.run(request).await;
    }

    let cookieKey = cookie_key(request.headers());
    let isAuthorized = cookieKey
        .as_deref()
        .is_some_and(|key| state.guard().user_for(key).is_some());

    if !isAuthorized {
        let redirect = Redirect::to("/login").into_response();
        return if cookieKey.is_some() {
            with_expired_cookie(redirect)
        } else {
            redirect
        };
    }

    next.run(request).await
}

fn bearer_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

fn cookie_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(cookie_value)
        .map(str::to_string)
}

fn with_expired_cookie(mut response: Response) -> Response {
    if let Ok(value) = HeaderValue::from_str(&expired_cookie()) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}
