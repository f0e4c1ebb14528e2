use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use rag_types::{CreateOrgRequest, Organization};

use crate::error::ApiFailure;
use crate::middleware::auth::{require_api_auth, AppState};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/orgs", get(get_orgs).post(post_org))
        .route_layer(middleware::from_fn_with_state(state, require_api_auth))
}

async fn get_orgs(State(state): State<AppState>) -> Result<Json<Vec<Organization>>, ApiFailure> {
    Ok(Json(state.client.list_orgs().await?))
}

async fn post_org(
    State(state): State<AppState>,
    Json(body): Json<CreateOrgRequest>,
) -> Result<(StatusCode, Json<Organization>), ApiFailure> {
    let org = state.client.create_org(&body.org_id, &body.org_name).await?;
    Ok((StatusCode::CREATED, Json(org)))
}
