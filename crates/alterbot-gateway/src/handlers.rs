// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HTTP request handlers for the control API.

use crate::AppState;
use alterbot::{ConfigUpdate, RuntimeConfig, Status};
use axum::{
    body::Bytes,
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip)]
    pub code: u16,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self {
            error: "Unauthorized".into(),
            code: 401,
        }
    }

    pub fn not_found() -> Self {
        Self {
            error: "Not found".into(),
            code: 404,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// `?key=` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct KeyQuery {
    #[serde(default)]
    pub key: String,
}

/// Rejects API requests without the configured key.
pub async fn require_key(
    State(state): State<Arc<AppState>>,
    query: Option<Query<KeyQuery>>,
    request: Request,
    next: Next,
) -> Response {
    let key = query.map(|Query(q)| q.key).unwrap_or_default();
    if !state.authorized(&key) {
        warn!("[HTTP] rejected {} {}: bad key", request.method(), request.uri().path());
        return ApiError::unauthorized().into_response();
    }
    next.run(request).await
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<Status> {
    Json(state.facade().status())
}

/// POST /apply body: a partial target plus an optional `restart` flag.
#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    #[serde(flatten)]
    pub update: ConfigUpdate,

    /// Reconnect with the new target right away (default: true).
    #[serde(default = "default_restart")]
    pub restart: bool,
}

fn default_restart() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ApplyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<RuntimeConfig>,
}

impl ApplyResponse {
    fn applied(message: &str, config: RuntimeConfig) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                message: Some(message.to_string()),
                error: None,
                config: Some(config),
            }),
        )
    }

    fn rejected(error: String) -> (StatusCode, Json<Self>) {
        (
            StatusCode::BAD_REQUEST,
            Json(Self {
                success: false,
                message: None,
                error: Some(error),
                config: None,
            }),
        )
    }
}

/// POST /apply
///
/// The body is parsed by hand so malformed JSON gets the same 400 shape as
/// a rejected port.
pub async fn apply(State(state): State<Arc<AppState>>, body: Bytes) -> (StatusCode, Json<ApplyResponse>) {
    let request: ApplyRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("[HTTP] /apply: invalid body: {}", e);
            return ApplyResponse::rejected(format!("Invalid request: {}", e));
        }
    };

    match state.facade().update_config(&request.update, request.restart) {
        Ok(config) if request.restart => {
            ApplyResponse::applied("Config applied, bot restarting...", config)
        }
        Ok(config) => ApplyResponse::applied("Config applied", config),
        Err(e) => {
            warn!("[HTTP] /apply: {}", e);
            ApplyResponse::rejected(e.to_string())
        }
    }
}

/// POST /restart
pub async fn restart(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    info!("[HTTP] restart requested");
    state.facade().restart();
    Json(serde_json::json!({
        "success": true,
        "message": "Bot restarting...",
    }))
}

/// Fallback for unknown paths and methods
pub async fn not_found() -> ApiError {
    ApiError::not_found()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_request_defaults_to_restart() {
        let request: ApplyRequest =
            serde_json::from_str(r#"{"host":"a","port":"25570","username":""}"#).unwrap();
        assert!(request.restart);
        assert_eq!(request.update.host.as_deref(), Some("a"));
        assert_eq!(request.update.username.as_deref(), Some(""));
    }

    #[test]
    fn test_apply_request_without_restart() {
        let request: ApplyRequest =
            serde_json::from_str(r#"{"port":25570,"restart":false}"#).unwrap();
        assert!(!request.restart);
        assert!(request.update.host.is_none());
        assert!(request.update.port.is_some());
    }

    #[test]
    fn test_api_error_body() {
        let json = serde_json::to_value(ApiError::unauthorized()).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Unauthorized" }));
    }
}
