// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! AlterBot Gateway - HTTP control surface with Web UI
//!
//! # Endpoints
//!
//! - `GET /` - Web UI dashboard (no key)
//! - `GET /health` - Liveness probe (no key)
//! - `GET /status?key=...` - Connection status and target
//! - `POST /apply?key=...` - Partial target update, then restart
//! - `POST /restart?key=...` - Immediate reconnect
//!
//! Every other path answers `404 {"error":"Not found"}` once the key checks
//! out; a missing or wrong key answers `401 {"error":"Unauthorized"}`.

pub mod handlers;
pub mod routes;

use alterbot::ControlFacade;
use axum::http::{header, Method};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Debug)]
pub struct AppState {
    facade: ControlFacade,
    api_key: String,
}

impl AppState {
    pub fn new(facade: ControlFacade, api_key: impl Into<String>) -> Self {
        Self {
            facade,
            api_key: api_key.into(),
        }
    }

    pub fn facade(&self) -> &ControlFacade {
        &self.facade
    }

    /// True if `key` matches the configured API key.
    pub fn authorized(&self, key: &str) -> bool {
        key == self.api_key
    }
}

/// Assemble UI and API routes with CORS and request tracing.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::ui_routes())
        .merge(routes::api_routes(state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
