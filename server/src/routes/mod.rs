//! HTTP route definitions.

mod health;
mod nodes;
mod projects;
mod versions;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(projects::routes())
        .merge(versions::routes())
        .merge(nodes::routes())
}
