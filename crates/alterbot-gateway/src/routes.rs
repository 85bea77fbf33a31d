// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Route definitions for the control API and Web UI.

use crate::handlers;
use crate::AppState;
use axum::{
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use rust_embed::RustEmbed;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

#[derive(RustEmbed)]
#[folder = "static/"]
struct Assets;

/// Keyed API routes. Unknown paths fall through to a JSON 404 behind the
/// same key check.
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/status",
            get(handlers::status).fallback(handlers::not_found),
        )
        .route("/apply", post(handlers::apply).fallback(handlers::not_found))
        .route(
            "/restart",
            post(handlers::restart).fallback(handlers::not_found),
        )
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(state, handlers::require_key))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}

/// Web UI and liveness routes (no key)
pub fn ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(serve_index))
        .route("/index.html", get(serve_index))
        .route("/favicon.ico", get(serve_favicon))
        .route("/health", get(handlers::health))
}

async fn serve_index() -> Response {
    serve_asset("index.html")
}

async fn serve_favicon() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

fn serve_asset(path: &str) -> Response {
    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref()),
                    (header::CACHE_CONTROL, "public, max-age=3600"),
                ],
                content.data,
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}
