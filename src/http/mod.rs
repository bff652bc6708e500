pub mod error;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/signup", post(handlers::auth::signup))
        .route("/login", post(handlers::auth::login))
        .route("/institution_id", get(handlers::auth::institution_id))
        .route("/generate_org_id", post(handlers::auth::generate_org_id))
        .route("/register_user", post(handlers::roster::register_user))
        .route(
            "/report_violation",
            post(handlers::violations::report_violation),
        )
        .route(
            "/violation_summary/:org_id",
            get(handlers::violations::violation_summary),
        )
        .route(
            "/reset_summary/:org_id",
            post(handlers::violations::reset_summary),
        )
        .route("/ws/:org_id", get(handlers::ws::subscribe))
        .with_state(state)
}
