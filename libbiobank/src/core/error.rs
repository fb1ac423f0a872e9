//! Objects related to reporting errors from this library

/// A list of error types that can occur within this library
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // authentication-related errors
    #[error("authentication error: couldn't hash password")]
    AuthHashFailure(#[from] password_hash::Error),

    #[error("invalid username: this field is required")]
    AuthInvalidUsernameEmpty,

    #[error("invalid username: at most {0} characters are allowed")]
    AuthInvalidUsernameTooLong(usize),

    #[error("invalid username: contains invalid characters '{0}'")]
    AuthInvalidUsernameInvalidCharacters(String),

    #[error("can't update the object, no id was specified")]
    InvalidUpdateObjectNotFound,

    #[error("can't insert the object, it already exists in the database with id = {}", .0)]
    InvalidInsertObjectAlreadyExists(i64),

    #[error("Invalid state: the object has an unspecified attribute '{}'", .0)]
    InvalidStateMissingAttribute(String),

    #[error(transparent)]
    DatabaseError(#[from] sqlx::Error),

    #[error(transparent)]
    DatabaseMigrationError(#[from] sqlx::migrate::MigrateError),
}

impl Error {
    /// Whether this error was caused by a query that expected a row but didn't find one
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::DatabaseError(sqlx::Error::RowNotFound))
    }
}

/// A convenience type alias for a [Result] with [Error] as its error type
pub type Result<T, E = Error> = std::result::Result<T, E>;
