use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::WanderlensError;

/// Error answer of every API route
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    App(WanderlensError),
}

impl From<WanderlensError> for ApiError {
    fn from(err: WanderlensError) -> Self {
        ApiError::App(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::App(WanderlensError::Validation { .. }) => StatusCode::BAD_REQUEST,
            ApiError::App(
                WanderlensError::Upstream { .. } | WanderlensError::InvalidResponse { .. },
            ) => StatusCode::BAD_GATEWAY,
            ApiError::App(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::NotFound(what) => format!("{what} not found"),
            ApiError::App(err) => {
                if status.is_server_error() {
                    tracing::error!("Request failed: {}", err);
                } else {
                    tracing::warn!("Request rejected: {}", err);
                }
                err.user_message()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
