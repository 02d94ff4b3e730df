use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bank::ServiceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Contest not found")]
    ContestNotFound,

    #[error("Malformed contest row: {0}")]
    MalformedRow(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::ContestNotFound => StatusCode::NOT_FOUND,
            AppError::MalformedRow { .. } | AppError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Service(e) => match e {
                ServiceError::UserNotFound | ServiceError::ContestNotFound => StatusCode::NOT_FOUND,
                ServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
                ServiceError::InvalidCredentials | ServiceError::Banned => StatusCode::UNAUTHORIZED,
                ServiceError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        };

        (status, self.to_string()).into_response()
    }
}
