use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use super::dto::ErrorResponse;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid command")]
    InvalidCommand,

    #[error("Invalid JSON body")]
    MalformedBody(#[from] serde_json::Error),

    /// `context` is the client-facing message, e.g. "Error saving data".
    #[error("{context}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    /// For `map_err`: wraps a store failure under an endpoint-specific message.
    pub fn store(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { context, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidCommand => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    message: "Invalid command".to_owned(),
                    error: None,
                },
            ),
            ApiError::MalformedBody(e) => {
                warn!(error = %e, "Rejected malformed JSON body");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        message: "Invalid JSON body".to_owned(),
                        error: Some(e.to_string()),
                    },
                )
            }
            ApiError::Store { context, source } => {
                error!(error = %source, "{context}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        message: context.to_owned(),
                        error: Some(source.to_string()),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
