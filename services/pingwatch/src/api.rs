//! REST API for registering targets and reading their status

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::error::PingwatchError;
use crate::store::TargetStore;
use crate::target::NewTarget;

/// API application state
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn TargetStore>,
}

/// Build the API axum router
pub fn build_router(store: Arc<dyn TargetStore>) -> Router {
    let api_state = ApiState { store };

    Router::new()
        .route("/ping", get(list_handler).post(create_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(api_state)
}

/// JSON error body: `{"error": "..."}`
struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<PingwatchError> for ApiError {
    fn from(err: PingwatchError) -> Self {
        let status = match &err {
            PingwatchError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            PingwatchError::Conflict(_) => StatusCode::CONFLICT,
            PingwatchError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::warn!("API request failed: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

async fn list_handler(State(api): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let targets = api.store.list_targets().await?;
    Ok(Json(targets))
}

async fn create_handler(
    State(api): State<ApiState>,
    payload: Result<Json<NewTarget>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new) = payload?;
    let new = new.validate()?;
    let target = api.store.insert_target(new).await?;
    tracing::info!("Registered target '{}' ({}) as #{}", target.name, target.url, target.id);
    Ok((StatusCode::CREATED, Json(target)))
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
