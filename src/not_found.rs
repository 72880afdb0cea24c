//! The fallback route handler for unknown routes.
use axum::response::{IntoResponse, Response};

use crate::Error;

/// Respond with a 404 and a JSON error message.
pub async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}
