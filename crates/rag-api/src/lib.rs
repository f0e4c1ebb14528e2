#![allow(non_snake_case)]

pub mod error;
pub mod middleware;
pub mod routes;

use axum::{routing::get, Router};

use crate::middleware::auth::AppState;

pub fn api_router(state: AppState) -> Router {
    let apiRoutes = routes::api_routes(state.clone());
    let authRoutes = middleware::auth::auth_routes(state.clone());

    Router::new()
        .merge(apiRoutes)
        .merge(authRoutes)
        .route("/metrics", get(middleware::metrics::handle_metrics))
        .with_state(state)
}
