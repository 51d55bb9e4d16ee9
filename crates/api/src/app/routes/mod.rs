use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod business;
pub mod registration;
pub mod system;
pub mod team;

/// Endpoints open to anonymous callers.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/login", post(auth::login))
        .route("/auth/invites/accept", post(auth::accept_invite))
        .route("/auth/external/:provider", post(auth::external_callback))
        .route("/registration-requests", post(registration::submit))
}

/// Authenticated endpoints closed to temporary-credential sessions.
pub fn protected_router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/authz/explain", post(system::explain))
        .nest("/team", team::router())
        .nest("/admin", registration::admin_router())
}
