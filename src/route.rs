//! Route definitions for the storefront API
//!
//! This module configures all HTTP routes and maps them to their respective handlers.
//! It creates the Axum router with the application state.

use axum::{
    extract::DefaultBodyLimit,
    handler::Handler,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
};

use crate::database::AppState;
use crate::error::handle_panic;
use crate::handler::{auth, booking, catalog, health, route_not_found};
use crate::middleware::{api_key_middleware, API_KEY_HEADER};
use crate::model::Category;

/// Largest accepted booking submission (two documents plus form fields)
pub const BOOKING_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET /health` - liveness probe (public)
/// - `GET /uploads/*` - locally stored booking documents (public)
/// - `POST /api/auth/login` - admin login
/// - `/api/cameras`, `/api/accessories` - catalog; reads are open, writes need an admin token
/// - `POST /api/bookings` - checkout submission
/// - `GET|PUT|DELETE /api/bookings[/{id}]` - admin booking management
/// - `GET /api/bookings/{id}/{wa-message,wa-link,status}` - derived views
///
/// Everything under `/api` requires the `x-api-key` header.
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .nest("/cameras", catalog_routes(Category::Camera))
        .nest("/accessories", catalog_routes(Category::Accessory))
        .route(
            "/bookings",
            get(booking::list_bookings)
                .post(booking::create_booking.layer(DefaultBodyLimit::max(BOOKING_BODY_LIMIT))),
        )
        .route(
            "/bookings/{id}",
            get(booking::get_booking)
                .put(booking::update_booking)
                .delete(booking::delete_booking),
        )
        .route("/bookings/{id}/wa-message", get(booking::whatsapp_message))
        .route("/bookings/{id}/wa-link", get(booking::whatsapp_link))
        .route("/bookings/{id}/status", get(booking::booking_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), api_key_middleware));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .fallback(route_not_found)
        .layer(cors_layer(&state.config.cors_origins))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// One catalog mount; handlers read the category from the extension
fn catalog_routes(category: Category) -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::list_items).post(catalog::create_item))
        .route(
            "/{id}",
            get(catalog::get_item)
                .put(catalog::update_item)
                .delete(catalog::delete_item),
        )
        .layer(Extension(category))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(API_KEY_HEADER),
        ])
}
