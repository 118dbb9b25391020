use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers::{self, auth, locations};
use crate::middleware::auth::auth_middleware;
use crate::middleware::rider_rate_limit::create_rider_governor;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public account routes
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    // Posting a location requires an identity; the report is owned by it
    let report_routes = Router::new()
        .route("/", post(locations::create_location))
        .layer(create_rider_governor())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Group status is readable by anyone
    let status_routes = Router::new().route("/group/status", get(locations::group_status));

    Router::new()
        .route("/", get(handlers::health))
        .nest("/auth", auth_routes)
        .nest("/locations", report_routes.merge(status_routes))
        .with_state(state)
}
