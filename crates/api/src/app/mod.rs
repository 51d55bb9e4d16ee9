//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: directory, identity gateway and onboarding wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Layering, outermost first:
/// - public routes: none
/// - password rotation: bearer auth
/// - protected routes: bearer auth → first-login gate
/// - tenant routes: bearer auth → first-login gate → tenant scope
pub fn build_app(services: Arc<AppServices>) -> Router {
    let auth = axum::middleware::from_fn_with_state(services.clone(), middleware::auth_middleware);

    let rotation = routes::auth::rotation_router().route_layer(auth.clone());

    let protected = routes::protected_router()
        .route_layer(axum::middleware::from_fn(middleware::first_login_gate))
        .route_layer(auth.clone());

    let tenant_scoped = routes::business::router()
        .route_layer(axum::middleware::from_fn_with_state(
            services.clone(),
            middleware::tenant_middleware,
        ))
        .route_layer(axum::middleware::from_fn(middleware::first_login_gate))
        .route_layer(auth);

    Router::new()
        .merge(routes::public_router())
        .merge(rotation)
        .merge(protected)
        .merge(tenant_scoped)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
