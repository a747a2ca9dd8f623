use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No content available: {0}")]
    NoContentAvailable(String),

    #[error("User is not enrolled in this course")]
    NotEnrolled,

    #[error("Complete all course topics before scheduling the exam ({completed}/{total} completed)")]
    TopicsIncomplete { completed: i64, total: i64 },

    #[error("Invalid exam transition: {0}")]
    InvalidTransition(String),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure classes reported by a generative backend.
///
/// `RateLimited` and `QuotaExceeded` mean "stop calling"; everything else is
/// a per-request failure the caller may absorb.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Generative backend rate limit exceeded")]
    RateLimited,

    #[error("Generative backend quota exceeded")]
    QuotaExceeded,

    #[error("Generative backend server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Generative backend error {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Generative backend unreachable: {0}")]
    Transport(String),

    #[error("Generative backend returned no text")]
    EmptyResponse,
}

impl GenerationError {
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => GenerationError::RateLimited,
            403 => GenerationError::QuotaExceeded,
            500..=599 => GenerationError::Server { status, message },
            _ => GenerationError::Backend { status, message },
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            GenerationError::RateLimited | GenerationError::QuotaExceeded
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Response JSON is not an object")]
    NotAnObject,

    #[error("Response JSON has no questions array")]
    MissingQuestions,
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            err @ Error::NoContentAvailable(_) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            err @ Error::NotEnrolled => (StatusCode::FORBIDDEN, err.to_string()),
            err @ Error::TopicsIncomplete { .. } => (StatusCode::FORBIDDEN, err.to_string()),
            Error::InvalidTransition(msg) => (StatusCode::CONFLICT, msg),
            Error::Generation(err) => (StatusCode::BAD_GATEWAY, err.to_string()),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Database(err) => {
                tracing::error!(error = ?err, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Reqwest(err) => (StatusCode::BAD_GATEWAY, format!("External service error: {}", err)),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_generation_classes() {
        assert_eq!(GenerationError::from_status(429, ""), GenerationError::RateLimited);
        assert_eq!(GenerationError::from_status(403, ""), GenerationError::QuotaExceeded);
        assert!(matches!(
            GenerationError::from_status(503, "unavailable"),
            GenerationError::Server { status: 503, .. }
        ));
        assert!(matches!(
            GenerationError::from_status(400, "bad"),
            GenerationError::Backend { status: 400, .. }
        ));
    }

    #[test]
    fn only_rate_and_quota_errors_abort() {
        assert!(GenerationError::RateLimited.is_rate_limit());
        assert!(GenerationError::QuotaExceeded.is_rate_limit());
        assert!(!GenerationError::EmptyResponse.is_rate_limit());
        assert!(!GenerationError::Transport("timeout".into()).is_rate_limit());
    }

    #[test]
    fn incomplete_topics_message_names_counts() {
        let err = Error::TopicsIncomplete { completed: 3, total: 7 };
        assert!(err.to_string().contains("3/7"));
    }
}
