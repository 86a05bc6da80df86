//! HTTP API for the Anise query service.

use anise_model::{Card, CardImage, CardStatus};
use anise_query::Anise;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageResponse {
    pub content_type: String,
    /// Standard base64 of the image bytes.
    pub data: String,
}

impl From<&CardImage> for ImageResponse {
    fn from(image: &CardImage) -> Self {
        Self {
            content_type: image.content_type.clone(),
            data: STANDARD.encode(&image.bytes),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CardResponse {
    pub text: String,
    pub status: CardStatus,
    pub images: Vec<ImageResponse>,
}

impl From<&Card> for CardResponse {
    fn from(card: &Card) -> Self {
        Self {
            text: card.text.clone(),
            status: card.status,
            images: card.images.iter().map(ImageResponse::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub handlers: usize,
    pub sources: usize,
    pub entities: usize,
    pub aliases: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReloadResponse {
    pub handlers: usize,
    pub sources: usize,
    pub entities: usize,
    pub aliases: usize,
    pub synced: usize,
    pub sync_failed: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by an API route.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

#[derive(Deserialize, Debug)]
struct QueryParams {
    q: Option<String>,
}

async fn query_handler(
    State(anise): State<Arc<Anise>>,
    Query(params): Query<QueryParams>,
) -> Result<Json<CardResponse>, ApiError> {
    let text = params.q.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ApiError::bad_request("missing query parameter `q`"));
    }
    let card = anise.query(&text).await;
    Ok(Json(CardResponse::from(&card)))
}

async fn reload_handler(State(anise): State<Arc<Anise>>) -> Result<Json<ReloadResponse>, ApiError> {
    match anise.sync_and_reload().await {
        Ok(report) => {
            info!(handlers = report.handlers, entities = report.catalog.entities, "reloaded via API");
            Ok(Json(ReloadResponse {
                handlers: report.handlers,
                sources: report.catalog.sources,
                entities: report.catalog.entities,
                aliases: report.catalog.aliases,
                synced: report.sync.succeeded(),
                sync_failed: report.sync.failed(),
            }))
        }
        Err(e) => {
            error!(error = %e, "reload via API failed");
            Err(ApiError::internal(e.to_string()))
        }
    }
}

async fn health_handler(State(anise): State<Arc<Anise>>) -> Json<HealthResponse> {
    let stats = anise.catalog().stats();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        handlers: anise.pipeline().len(),
        sources: stats.sources,
        entities: stats.entities,
        aliases: stats.aliases,
    })
}

/// Build the HTTP API router around the service context.
pub fn build_router(anise: Arc<Anise>) -> Router {
    Router::new()
        .route("/api/v1/query", get(query_handler))
        .route("/api/v1/reload", post(reload_handler))
        .route("/api/v1/health", get(health_handler))
        .with_state(anise)
}
