use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    services::question_generator::GeneratorError,
    state::{
        catalog::CatalogError, password::PasswordError, redemption::RedemptionError,
        state_machine::InvalidTransition, timer::TimerError,
    },
};

/// Message shown to players instead of backend details.
const PLAYER_FACING_FAILURE: &str = "Something went wrong, please try again in a moment";

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Missing or invalid credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Authenticated caller lacks the required role or the action is not allowed now.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Duplicate or already consumed resource.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The player identity held by the client no longer exists.
    #[error("player not found; please register again")]
    StaleClient,
    /// Every question of an AI category was already answered.
    #[error("all questions of this category were answered")]
    Exhausted,
    /// The external question generator failed.
    #[error("question generator failed")]
    Generator(#[source] GeneratorError),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<GeneratorError> for ServiceError {
    fn from(err: GeneratorError) -> Self {
        ServiceError::Generator(err)
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<TimerError> for ServiceError {
    fn from(err: TimerError) -> Self {
        match err {
            TimerError::InvalidTransition(invalid) => invalid.into(),
            TimerError::NotActive => ServiceError::InvalidState(err.to_string()),
            TimerError::InvalidDuration(_) | TimerError::InvalidSpeed(_) => {
                ServiceError::InvalidInput(err.to_string())
            }
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<RedemptionError> for ServiceError {
    fn from(err: RedemptionError) -> Self {
        match err {
            RedemptionError::StalePlayer => ServiceError::StaleClient,
            RedemptionError::UnknownCode(_) | RedemptionError::UnknownQuestion => {
                ServiceError::NotFound(err.to_string())
            }
            RedemptionError::GameNotActive | RedemptionError::MinigameDisabled(_) => {
                ServiceError::Forbidden(err.to_string())
            }
            RedemptionError::AlreadyClaimed | RedemptionError::AlreadyAnswered => {
                ServiceError::Conflict(err.to_string())
            }
        }
    }
}

impl From<CatalogError> for ServiceError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownCategory | CatalogError::UnknownQuestion => {
                ServiceError::NotFound(err.to_string())
            }
            CatalogError::ForeignCategory | CatalogError::NotCustom => {
                ServiceError::Forbidden(err.to_string())
            }
            CatalogError::DuplicateName(_) => ServiceError::Conflict(err.to_string()),
            CatalogError::Inactive => ServiceError::InvalidInput(err.to_string()),
            CatalogError::Exhausted => ServiceError::Exhausted,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Missing or invalid credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Caller is authenticated but not allowed to perform the action.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Player identity is gone; the client must clear its local storage.
    #[error("{0}")]
    StaleClient(String),
    /// AI category fully answered.
    #[error("{0}")]
    Exhausted(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Upstream dependency failed.
    #[error("bad gateway: {0}")]
    BadGateway(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convert for a player-facing route: backend failures lose their details.
    pub fn for_player(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(_) | ServiceError::Degraded | ServiceError::Timeout => {
                AppError::ServiceUnavailable(PLAYER_FACING_FAILURE.into())
            }
            ServiceError::Generator(_) => AppError::BadGateway(PLAYER_FACING_FAILURE.into()),
            other => other.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::StaleClient(_) | AppError::Exhausted(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) | ServiceError::Conflict(message) => {
                AppError::Conflict(message)
            }
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::StaleClient => AppError::StaleClient(message),
            ServiceError::Exhausted => AppError::Exhausted(message),
            ServiceError::Generator(source) => AppError::BadGateway(source.to_string()),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Serialize)]
struct ErrorBody {
    message: String,
    clear_storage: Option<bool>,
    all_answered: Option<bool>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let payload = Json(ErrorBody {
            clear_storage: matches!(self, AppError::StaleClient(_)).then_some(true),
            all_answered: matches!(self, AppError::Exhausted(_)).then_some(true),
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn stale_client_asks_to_clear_storage() {
        let (status, body) = body_of(ServiceError::StaleClient.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["clear_storage"], true);
        assert!(body.get("all_answered").is_none());
    }

    #[tokio::test]
    async fn exhausted_category_is_flagged() {
        let (status, body) = body_of(ServiceError::from(CatalogError::Exhausted).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["all_answered"], true);
    }

    #[tokio::test]
    async fn player_routes_hide_storage_details() {
        let err = ServiceError::Unavailable(StorageError::unavailable(
            "connection reset by mongo-1",
            std::io::Error::other("reset"),
        ));
        let (status, body) = body_of(AppError::for_player(err)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body["message"].as_str().unwrap().contains("mongo-1"));
    }

    #[test]
    fn redemption_errors_map_to_http_semantics() {
        let conflict: AppError = ServiceError::from(RedemptionError::AlreadyClaimed).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        let forbidden: AppError = ServiceError::from(RedemptionError::GameNotActive).into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }
}
