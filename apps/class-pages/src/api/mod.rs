//! # class-pages HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /view?class=&subtab=&filter=` - Build a class page
//! - `POST /navigate` - Apply a navigation action to a carried-over state
//! - `GET /lists?filter=` - Spell list editor matrix
//! - `PUT /lists/{class}` - Replace one class's spell list
//! - `POST /lists/{class}/toggle` - Add or remove one spell
//! - `POST /import?mode=override|merge` - Import a spell list document
//! - `GET /export` - Download the spell list backup
//! - `GET /overrides` - Label and backdrop overrides per class
//! - `PUT /overrides/{class}` - Edit one class's overrides
//! - `GET /sources` - Configured and available catalog sources
//! - `PUT /sources/{record_type}` - Replace one family's sources
//!
//! ## Security Configuration
//!
//! Resolved once from [`ServerConfig`] (file, then `CLASS_PAGES_*` env vars):
//! - `cors_origins`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `rate_limit`: Requests per second (default: 100, 0 to disable)
//! - `api_key`: If set, only Bearer callers presenting it may change configuration

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{ApiKey, key_matches, resolve_caller};
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    ApiError, ErrorResponse, HealthResponse, ImportQuery, ImportResponse, ListResponse,
    ListsQuery, NavigateRequest, SetListRequest, SetSourcesRequest, SourcesResponse,
    ToggleRequest, ViewQuery, status_for,
};

use crate::config::ServerConfig;
use crate::service::ClassPagesService;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use class_pages_core::ClassPagesError;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Request body limit (2 MiB).
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ClassPagesService>,
}

impl AppState {
    #[must_use]
    pub fn new(service: ClassPagesService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer.
///
/// - `"*"`: allows all origins (development only)
/// - `None`: localhost only
/// - otherwise: the comma-separated list; falls back to localhost when no
///   entry parses
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                with_methods(CorsLayer::new().allow_origin(allowed_origins))
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse().ok())
    .collect();

    with_methods(CorsLayer::new().allow_origin(origins))
}

fn with_methods(layer: CorsLayer) -> CorsLayer {
    layer
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting - global quota (if enabled)
/// 5. Caller resolution - API key to `Caller`
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let api_key: ApiKey = server
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .map(Arc::from);
    if api_key.is_some() {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - every caller may change configuration! \
             Set CLASS_PAGES_API_KEY to restrict it."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/view", get(handlers::view_handler))
        .route("/navigate", post(handlers::navigate_handler))
        .route("/lists", get(handlers::lists_handler))
        .route("/lists/{class}", put(handlers::set_list_handler))
        .route("/lists/{class}/toggle", post(handlers::toggle_handler))
        .route("/import", post(handlers::import_handler))
        .route("/export", get(handlers::export_handler))
        .route("/overrides", get(handlers::overrides_handler))
        .route("/overrides/{class}", put(handlers::set_override_handler))
        .route("/sources", get(handlers::sources_handler))
        .route("/sources/{record_type}", put(handlers::set_sources_handler))
        .layer(axum_middleware::from_fn_with_state(
            api_key,
            auth::caller_middleware,
        ));

    match create_rate_limiter(server.rate_limit) {
        Some(limiter) => {
            tracing::info!("Rate limiting enabled: {} requests/second", server.rate_limit);
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("Rate limiting disabled"),
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(server.cors_origins.as_deref()))
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_SIZE)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(service: ClassPagesService, server: &ServerConfig) -> Result<(), ClassPagesError> {
    let router = create_router(AppState::new(service), server);
    let addr = format!("{}:{}", server.host, server.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ClassPagesError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("class-pages HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| ClassPagesError::IoError(format!("Server error: {}", e)))
}
