use crate::auth::SqliteAuthBackend;
use axum::{
    extract::rejection::{FormRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
    #[error("You are not authorized to perform this action: {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Library(#[from] libbiobank::Error),
    #[error("Resource Not Found: {0}")]
    NotFound(String),
    #[error("The submitted form was rejected: {0}")]
    UnprocessableEntityFormRejection(#[source] FormRejection),
    #[error("The provided query string was rejected: {0}")]
    UnprocessableEntityQueryRejection(#[source] QueryRejection),
    #[error(transparent)]
    Session(#[from] tower_sessions::session::Error),
    #[error("New user registration is currently disabled")]
    UserRegistrationDisabled,
}

impl Error {
    pub(crate) fn to_client_status(&self) -> (StatusCode, String) {
        match self {
            Error::Database(sqlx::Error::RowNotFound) => {
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            Error::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
            Error::Other(_) | Error::Session(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unknown error".to_string(),
            ),
            Error::Library(e) if e.is_not_found() => {
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            Error::Library(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Library error".to_string()),
            Error::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.clone()),
            Error::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Error::UnprocessableEntityFormRejection(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "The submitted form was not in the expected format. The request could not be processed.".to_string(),
            ),
            Error::UnprocessableEntityQueryRejection(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "The query string was not in the expected format. The request could not be processed.".to_string(),
            ),
            Error::UserRegistrationDisabled => (StatusCode::FORBIDDEN, self.to_string()),
        }
    }
}

// axum_login::Error<SqliteAuthBackend> wraps our own error type, so it is
// flattened here rather than nested as a variant.
impl From<axum_login::Error<SqliteAuthBackend>> for Error {
    fn from(value: axum_login::Error<SqliteAuthBackend>) -> Self {
        match value {
            axum_login::Error::Session(e) => Error::Session(e),
            axum_login::Error::Backend(e) => e,
        }
    }
}

// Tell axum how to convert `Error` into a response.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        warn!("Got error for response: {self:?}");
        let (status, _) = self.to_client_status();
        let mut response = status.into_response();
        // the response mapper renders the error page from this
        response.extensions_mut().insert(Arc::new(self));
        response
    }
}
