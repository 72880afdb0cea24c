//! Sets up the application database and provides helpers shared by the queries.

use std::str::FromStr;

use rusqlite::{Connection, Row, TransactionBehavior, types::Type};
use rust_decimal::Decimal;

use crate::{
    Error,
    transaction::{
        Transaction, TransactionType, count_transactions, create_transaction,
        create_transaction_table,
    },
    user_stats::{create_user_stats_table, initialize_user_stats},
};

/// Create the tables for the domain models and the user stats record.
///
/// Safe to call on a database that has already been initialized, existing
/// data is left untouched.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    initialize_with_options(connection, false)
}

/// Same as [initialize], but a new database is first filled with a few
/// example transactions.
///
/// The user stats start with the balance of the example transactions and no
/// experience, as if the transactions were there before the game started.
/// Databases that already hold transactions or user stats are not seeded.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn initialize_with_demo_data(connection: &Connection) -> Result<(), Error> {
    initialize_with_options(connection, true)
}

fn initialize_with_options(connection: &Connection, seed_demo_data: bool) -> Result<(), Error> {
    let transaction = rusqlite::Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_transaction_table(&transaction)?;
    create_user_stats_table(&transaction)?;

    if seed_demo_data && is_empty(&transaction)? {
        insert_demo_transactions(&transaction)?;
    }

    let user_stats = initialize_user_stats(&transaction)?;

    transaction.commit()?;

    tracing::debug!("Database initialized with user stats {user_stats:?}");

    Ok(())
}

fn is_empty(connection: &Connection) -> Result<bool, Error> {
    let has_user_stats: bool =
        connection.query_row("SELECT EXISTS(SELECT 1 FROM user_stats)", [], |row| {
            row.get(0)
        })?;

    Ok(!has_user_stats && count_transactions(connection)? == 0)
}

fn insert_demo_transactions(connection: &Connection) -> Result<(), Error> {
    let demo_transactions = [
        ("Salary", 3000, TransactionType::Income, "Work"),
        ("Rent", 1200, TransactionType::Expense, "Housing"),
        ("Groceries", 350, TransactionType::Expense, "Food"),
    ];

    for (description, amount, transaction_type, category) in demo_transactions {
        create_transaction(
            Transaction::build(
                description,
                Decimal::from(amount),
                transaction_type,
                category,
            ),
            connection,
        )?;
    }

    tracing::info!("Seeded the database with demo transactions");

    Ok(())
}

/// Read a decimal that is stored as text in the column at `index`.
///
/// # Errors
/// Returns a [rusqlite::Error::FromSqlConversionFailure] if the text is not a
/// valid decimal, or the error from [Row::get] if the column is not text.
pub fn get_decimal(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(index)?;

    Decimal::from_str(&text).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}
