use crate::error::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Service(Error::Sampling { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!("Request failed ({}): {}", status, self);

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
