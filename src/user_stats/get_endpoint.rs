use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};

use crate::{AppState, Error, user_stats::get_user_stats};

/// A route handler for the user stats, 404 if they have not been initialized.
pub async fn get_user_stats_endpoint(State(state): State<AppState>) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match get_user_stats(&connection) {
        Ok(user_stats) => Json(user_stats).into_response(),
        Err(error) => error.into_response(),
    }
}
