//! Router construction and middleware.

use axum::http::{request::Parts, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use qa_core::{AppError, AppResult, CorsConfig};
use regex::Regex;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{health, qa, vector};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// # Errors
/// Returns `AppError::Config` when the CORS origin regex does not compile.
pub fn router(state: AppState) -> AppResult<Router> {
    let cors = build_cors_layer(&state.config.cors)?;

    Ok(Router::new()
        .route("/api/health", get(health::health))
        .route("/api/qa/ask", post(qa::ask))
        .route("/api/vector/add", post(vector::add))
        .route("/api/vector/search", post(vector::search))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// Build the CORS layer from the allow-list, origin regex and credentials flag.
pub fn build_cors_layer(cors: &CorsConfig) -> AppResult<CorsLayer> {
    let layer = if cors.allows_any_origin() {
        CorsLayer::new().allow_origin(AllowOrigin::any())
    } else {
        let regex = cors
            .allow_origin_regex
            .as_deref()
            .map(|pattern| Regex::new(&format!("^(?:{})$", pattern)))
            .transpose()
            .map_err(|e| AppError::Config(format!("Invalid CORS origin regex: {}", e)))?;

        let allowed: Vec<HeaderValue> = cors
            .allow_origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();

        CorsLayer::new().allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                allowed.iter().any(|o| o == origin)
                    || match (&regex, origin.to_str()) {
                        (Some(re), Ok(origin)) => re.is_match(origin),
                        _ => false,
                    }
            },
        ))
    };

    // Wildcards are not allowed together with credentials.
    Ok(if cors.allow_credentials && !cors.allows_any_origin() {
        layer
            .allow_credentials(true)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
    } else {
        layer.allow_methods(Any).allow_headers(Any)
    })
}
