#![allow(missing_docs)]

use rusqlite::Connection;

use crate::db::initialize;

/// An in-memory database with the tables and user stats set up.
pub(crate) fn get_test_connection() -> Connection {
    let conn = Connection::open_in_memory().expect("Could not open database in memory.");
    initialize(&conn).expect("Could not initialize database.");
    conn
}
