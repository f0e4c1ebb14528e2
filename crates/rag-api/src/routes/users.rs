use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get},
    Json, Router,
};
use rag_types::{CreateUserRequest, CreatedUser, DeletedUser, OrgUser};

use crate::error::ApiFailure;
use crate::middleware::auth::{require_api_auth, AppState};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/orgs/:org_id/users", get(get_users).post(post_user))
        .route("/api/v1/orgs/:org_id/users/:username", delete(delete_user))
        .route_layer(middleware::from_fn_with_state(state, require_api_auth))
}

async fn get_users(
    State(state): State<AppState>,
    Path(orgId): Path<String>,
) -> Result<Json<Vec<OrgUser>>, ApiFailure> {
    Ok(Json(state.client.list_users(&orgId).await?))
}

async fn post_user(
    State(state): State<AppState>,
    Path(orgId): Path<String>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreatedUser>), ApiFailure> {
    let created = state
        .client
        .create_user(&orgId, &body.username, &body.password, body.role)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_user(
    State(state): State<AppState>,
    Path((orgId, username)): Path<(String, String)>,
) -> Result<Json<DeletedUser>, ApiFailure> {
    Ok(Json(state.client.delete_user(&orgId, &username).await?))
}
