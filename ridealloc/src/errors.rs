use crate::{allocation::AllocationError, approval::ApprovalError, records::RecordError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Input could not be parsed, or output could not be rendered
    #[error(transparent)]
    Records(#[from] RecordError),

    /// Requests could not be totalled
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// Approval could not be obtained, or the answer broke the approval contract
    #[error(transparent)]
    Approval(#[from] ApprovalError),

    /// Upload arrived without a `file` field
    #[error("No file uploaded")]
    MissingFile,

    /// Multipart body could not be read
    #[error("Invalid upload: {message}")]
    InvalidUpload { message: String },

    /// Upload exceeds the configured size limit
    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Every run-level failure is reported as a server error, except oversized uploads which
    /// are rejected before any processing starts.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Records(_)
            | Error::Allocation(_)
            | Error::Approval(_)
            | Error::MissingFile
            | Error::InvalidUpload { .. }
            | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Records(RecordError::Io(_)) => "Failed to read or write ride records".to_string(),
            Error::Records(err) => err.to_string(),
            Error::Allocation(err) => err.to_string(),
            Error::Approval(err) => err.to_string(),
            Error::MissingFile => "No file uploaded. Send the ride requests as a multipart field named 'file'".to_string(),
            Error::InvalidUpload { message } => format!("Invalid upload: {message}"),
            Error::PayloadTooLarge { message } => message.clone(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Other(_) | Error::Records(RecordError::Io(_)) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Approval(_) => {
                tracing::error!("Approval failed: {}", self);
            }
            Error::Records(_)
            | Error::Allocation(_)
            | Error::MissingFile
            | Error::InvalidUpload { .. }
            | Error::PayloadTooLarge { .. } => {
                tracing::warn!("Rejected input: {}", self);
            }
        }

        let status = self.status_code();
        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(error: Error) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_record_error_is_server_error_with_message() {
        let error = Error::from(RecordError::InvalidCount {
            row: 3,
            value: "abc".to_string(),
        });

        let (status, body) = body_json(error).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            "Invalid number_of_rides_requested on row 3: 'abc' is not a non-negative integer"
        );
    }

    #[tokio::test]
    async fn test_payload_too_large() {
        let (status, body) = body_json(Error::PayloadTooLarge {
            message: "File exceeds the 10 byte limit".to_string(),
        })
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "File exceeds the 10 byte limit");
    }

    #[tokio::test]
    async fn test_other_does_not_leak_details() {
        let (status, body) = body_json(Error::Other(anyhow::anyhow!("connection string postgres://secret"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn test_approval_error_message() {
        let error = Error::from(ApprovalError::Unavailable("timed out".to_string()));
        assert_eq!(error.user_message(), "Approval service unavailable: timed out");
    }

    #[tokio::test]
    async fn test_allocation_error_is_server_error_with_message() {
        let error = Error::from(AllocationError::TotalTooLarge {
            destination: "JFK".to_string(),
        });

        let (status, body) = body_json(error).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Total rides requested for destination 'JFK' is too large");
    }
}
