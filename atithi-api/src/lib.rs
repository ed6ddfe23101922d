use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod error;
pub mod middleware;
pub mod registrations;
pub mod state;
pub mod summary;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware: the registration form and the admin panel are served
    // from a separate origin
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let moderation = admin::routes().route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        middleware::auth::admin_auth_middleware,
    ));

    Router::new()
        .merge(auth::routes())
        .merge(registrations::routes())
        .merge(moderation)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
