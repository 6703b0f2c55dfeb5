use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),

    #[error("learner {learner_id} is not enrolled in course {course_id}")]
    NotEnrolled { learner_id: String, course_id: Uuid },

    #[error("course is {percent}% complete, a certificate requires 100%")]
    NotReady { percent: u8 },

    #[error("{0}")]
    ValidationFailed(String),

    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::ValidationFailed(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NOT_FOUND",
            Error::NotEnrolled { .. } => "NOT_ENROLLED",
            Error::NotReady { .. } => "NOT_READY",
            Error::ValidationFailed(_) => "VALIDATION_FAILED",
            Error::Unavailable(_) => "UNAVAILABLE",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::NotEnrolled { .. } => StatusCode::FORBIDDEN,
            Error::NotReady { .. } => StatusCode::CONFLICT,
            Error::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the client should do about it.
    pub fn client_action(&self) -> ClientAction {
        match self {
            Error::NotReady { .. } | Error::ValidationFailed(_) => ClientAction::Inline,
            Error::NotFound(_) | Error::NotEnrolled { .. } => ClientAction::Reload,
            Error::Unavailable(_) | Error::Internal(_) => ClientAction::Retry,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAction {
    Inline,
    Reload,
    Retry,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    pub action: ClientAction,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Error::Unavailable(e) => {
                tracing::error!(error = %e, "store error");
                "store unavailable, retry later".to_string()
            }
            Error::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: message,
            code: self.code(),
            action: self.client_action(),
        };
        (status, Json(body)).into_response()
    }
}
