//! Defines the app level error type and its conversion into JSON error responses.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request body was not a JSON object with the expected field types.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// A required field was missing or empty in a submitted transaction.
    ///
    /// The string is the name of the field as the client sent it.
    #[error("the field \"{0}\" is required")]
    MissingField(&'static str),

    /// The amount of a submitted transaction could not be parsed as a number.
    #[error("\"{0}\" is not a valid amount")]
    InvalidAmount(String),

    /// The type of a submitted transaction was neither `income` nor `expense`.
    #[error("\"{0}\" is not a valid transaction type, expected \"income\" or \"expense\"")]
    InvalidTransactionType(String),

    /// Adding the amount of a submitted transaction would take the balance
    /// outside the range a decimal can represent.
    #[error("adding {0} would take the balance outside the supported range")]
    BalanceOutOfRange(rust_decimal::Decimal),

    /// The sort order for listing transactions was not recognised.
    #[error("\"{0}\" is not a valid sort order")]
    InvalidSortOrder(String),

    /// Summing the stored amounts overflowed.
    ///
    /// The string names the total that overflowed.
    #[error("the {0} is outside the supported range")]
    TotalOutOfRange(&'static str),

    /// The requested resource was not found.
    ///
    /// For the user stats this means the database has not been initialized.
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The user stats were changed by another writer between reading and
    /// writing them.
    ///
    /// The whole submission is rolled back when this happens.
    #[error("the user stats were modified by another writer")]
    StaleUserStats,

    /// A value read from the database could not be converted into its domain
    /// type, e.g. an amount that is not a valid decimal.
    #[error("the database contains an invalid value: {0}")]
    CorruptValue(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            rusqlite::Error::FromSqlConversionFailure(column, _, error) => {
                tracing::error!("could not convert column {column}: {error}");
                Error::CorruptValue(error.to_string())
            }
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// Whether the error was caused by bad client input rather than the server.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidBody(_)
                | Error::MissingField(_)
                | Error::InvalidAmount(_)
                | Error::InvalidTransactionType(_)
                | Error::BalanceOutOfRange(_)
                | Error::InvalidSortOrder(_)
        )
    }
}

/// The JSON body sent to the client when a request fails.
#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    /// A human readable description of what went wrong.
    pub message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status_code, message) = match self {
            error if error.is_validation_error() => (StatusCode::BAD_REQUEST, error.to_string()),
            Error::NotFound => (StatusCode::NOT_FOUND, Error::NotFound.to_string()),
            // Storage errors are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred, check the server logs for more details."
                        .to_owned(),
                )
            }
        };

        (status_code, Json(ErrorMessage { message })).into_response()
    }
}
