pub mod orgs;
pub mod users;

use axum::Router;

use crate::middleware::auth::AppState;

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(orgs::routes(state.clone()))
        .merge(users::routes(state))
}
