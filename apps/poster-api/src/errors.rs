use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::layout::ComposeError;
use crate::render::RenderError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Compose error: {0}")]
    Compose(#[from] ComposeError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("No font available for rendering")]
    FontUnavailable,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::ImageDecode(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "IMAGE_DECODE_ERROR",
                format!("Could not decode image: {e}"),
            ),
            AppError::Compose(ComposeError::InvalidImage { width, height }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_IMAGE",
                format!("Image has invalid dimensions {width}x{height}"),
            ),
            AppError::Compose(e) => {
                tracing::error!("Compose error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMPOSE_ERROR",
                    "Text layout failed".to_string(),
                )
            }
            AppError::Render(e) => {
                tracing::error!("Render error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "RENDER_ERROR",
                    "Poster rendering failed".to_string(),
                )
            }
            AppError::FontUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "FONT_UNAVAILABLE",
                "No usable font is configured; set FONT_PATH".to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
