//! Totals over all transactions and the endpoint that serves them.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    db::get_decimal,
    transaction::TransactionType,
};

/// Income and expense totals over every transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    /// The number of transactions.
    pub transaction_count: u32,
    /// The sum of all income.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_income: Decimal,
    /// The sum of the magnitudes of all expenses, never negative.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_expenses: Decimal,
    /// Income minus expenses, which should equal the user's balance.
    #[serde(with = "rust_decimal::serde::float")]
    pub net: Decimal,
}

/// Compute the totals over all transactions.
///
/// # Errors
/// This function will return a:
/// - [Error::CorruptValue] if a stored amount is not a valid decimal,
/// - [Error::TotalOutOfRange] if a total does not fit in a decimal,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction_summary(connection: &Connection) -> Result<TransactionSummary, Error> {
    let mut statement = connection.prepare("SELECT type, amount FROM \"transaction\"")?;
    let mut rows = statement.query([])?;

    let mut transaction_count = 0;
    let mut total_income = Decimal::ZERO;
    let mut total_expenses = Decimal::ZERO;

    while let Some(row) = rows.next()? {
        let transaction_type: TransactionType = row.get(0)?;
        let amount = get_decimal(row, 1)?;

        transaction_count += 1;
        match transaction_type {
            TransactionType::Income => {
                total_income = total_income
                    .checked_add(amount)
                    .ok_or(Error::TotalOutOfRange("total income"))?;
            }
            TransactionType::Expense => {
                total_expenses = total_expenses
                    .checked_add(amount.abs())
                    .ok_or(Error::TotalOutOfRange("total expenses"))?;
            }
        }
    }

    let net = total_income
        .checked_sub(total_expenses)
        .ok_or(Error::TotalOutOfRange("net total"))?;

    Ok(TransactionSummary {
        transaction_count,
        total_income,
        total_expenses,
        net,
    })
}

/// A route handler for the transaction totals.
pub async fn get_summary_endpoint(State(state): State<AppState>) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match get_transaction_summary(&connection) {
        Ok(summary) => Json(summary).into_response(),
        Err(error) => error.into_response(),
    }
}
