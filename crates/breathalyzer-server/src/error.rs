use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use breathalyzer_core::{CoreError, GateError, IngestError, StorageError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed request: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            AppError::Core(CoreError::Validation(_)) => StatusCode::BAD_REQUEST,
            AppError::Core(CoreError::Gate(gate)) => match gate {
                GateError::Busy => StatusCode::CONFLICT,
                GateError::CoolingDown { .. } => StatusCode::FORBIDDEN,
                GateError::EmptyName | GateError::NoActiveSession => StatusCode::BAD_REQUEST,
            },
            AppError::Core(CoreError::Ingest(ingest)) | AppError::Ingest(ingest) => match ingest {
                IngestError::InvalidInput(_) | IngestError::NoSession => StatusCode::BAD_REQUEST,
                IngestError::PersistFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Core(CoreError::Storage(_) | CoreError::Config(_))
            | AppError::Storage(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = match &self {
            AppError::Core(CoreError::Gate(GateError::CoolingDown { minutes_remaining })) => json!({
                "error": self.to_string(),
                "minutes_remaining": minutes_remaining,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
