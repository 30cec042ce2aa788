use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use taskman_core::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error(transparent)]
    Validation(ValidationError),

    #[error("{0}")]
    Conflict(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Internal(taskman_core::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<taskman_core::Error> for ApiError {
    fn from(err: taskman_core::Error) -> Self {
        use taskman_core::Error as Core;
        match err {
            Core::NotFound { entity, id } => Self::NotFound { entity, id },
            Core::Validation(e) => Self::Validation(e),
            Core::StatusCycle { status, parent } => Self::Validation(ValidationError::single(
                "parent_id",
                format!("status {} would become its own ancestor through {}", status, parent),
            )),
            Core::Protected { .. } => Self::Conflict(err.to_string()),
            other => Self::Internal(other),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            tracing::error!("Request failed: {}", err);
        }
        let status = self.status();
        let body = match &self {
            Self::Validation(e) => json!({ "error": "validation failed", "fields": e.errors }),
            other => json!({ "error": other.public_message() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Turns a missing record into [`ApiError::NotFound`].
pub fn found<T>(record: Option<T>, entity: &'static str, id: i64) -> Result<T, ApiError> {
    record.ok_or(ApiError::NotFound { entity, id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_status_codes() {
        let cases = [
            (taskman_core::Error::NotFound { entity: "task", id: 1 }, StatusCode::NOT_FOUND),
            (
                taskman_core::Error::StatusCycle { status: 1, parent: 2 },
                StatusCode::BAD_REQUEST,
            ),
            (
                taskman_core::Error::Protected {
                    entity: "project",
                    id: 1,
                    reason: "sprints".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                taskman_core::Error::Corrupt("bad row".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_details_stay_private() {
        let err = ApiError::from(taskman_core::Error::Corrupt("secret".into()));
        assert_eq!(err.public_message(), "internal server error");
    }
}
