//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    db::{initialize, initialize_with_demo_data},
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection.
    ///
    /// Handlers hold the lock for the whole of a read-modify-write, which
    /// serializes submissions within this process.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the
    /// domain models and creating the user stats.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self::from_initialized(db_connection))
    }

    /// Same as [AppState::new], but an empty database is filled with example
    /// transactions first.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn with_demo_data(db_connection: Connection) -> Result<Self, Error> {
        initialize_with_demo_data(&db_connection)?;

        Ok(Self::from_initialized(db_connection))
    }

    fn from_initialized(db_connection: Connection) -> Self {
        Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
        }
    }
}
