//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, database_id::TransactionId, db::get_decimal};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money was earned, the amount is never negative.
    Income,
    /// Money was spent, the amount is never positive.
    Expense,
}

impl TransactionType {
    /// The lowercase name used in JSON and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    /// Give `amount` the sign that matches this type, keeping its magnitude.
    pub fn signed_amount(&self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Income => amount.abs(),
            TransactionType::Expense if amount.is_zero() => Decimal::ZERO,
            TransactionType::Expense => -amount.abs(),
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(Error::InvalidTransactionType(other.to_owned())),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money spent or earned in this transaction.
    ///
    /// Positive for income, negative for expenses.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Whether the transaction was income or an expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// What the money was earned or spent on, e.g. "Work", "Rent", "Groceries".
    pub category: String,
    /// When the transaction was recorded.
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// The sign of `amount` is ignored, the stored amount is positive for
    /// [TransactionType::Income] and negative for [TransactionType::Expense].
    ///
    /// Shortcut for [NewTransaction] for discoverability.
    pub fn build(
        description: &str,
        amount: Decimal,
        transaction_type: TransactionType,
        category: &str,
    ) -> NewTransaction {
        NewTransaction {
            description: description.to_owned(),
            amount: transaction_type.signed_amount(amount),
            transaction_type,
            category: category.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// A validated transaction that has not been stored yet.
///
/// The amount always carries the sign dictated by the transaction type, so
/// fields are only readable. Use [Transaction::build] or
/// [TransactionForm::validate](crate::transaction::TransactionForm::validate)
/// to create one.
#[derive(Debug, PartialEq, Clone)]
pub struct NewTransaction {
    description: String,
    amount: Decimal,
    transaction_type: TransactionType,
    category: String,
    created_at: OffsetDateTime,
}

impl NewTransaction {
    /// Set the creation time, defaults to the current time in UTC.
    pub fn created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = created_at;
        self
    }

    /// The signed amount.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Whether this is income or an expense.
    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    /// The description of the transaction.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The category of the transaction.
    pub fn category(&self) -> &str {
        &self.category
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Store a new transaction in the database.
///
/// The database assigns the ID.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (description, amount, type, category, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, description, amount, type, category, created_at",
        )?
        .query_row(
            (
                new_transaction.description,
                new_transaction.amount.to_string(),
                new_transaction.transaction_type,
                new_transaction.category,
                new_transaction.created_at,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, description, amount, type, category, created_at
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve all transactions, newest first.
///
/// Transactions created at the same instant are ordered by descending ID.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_all_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, description, amount, type, category, created_at
             FROM \"transaction\"
             ORDER BY created_at DESC, id DESC",
        )?
        .query_map([], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Retrieve the transactions of one type, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_transactions_by_type(
    transaction_type: TransactionType,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, description, amount, type, category, created_at
             FROM \"transaction\"
             WHERE type = :type
             ORDER BY created_at DESC, id DESC",
        )?
        .query_map(&[(":type", &transaction_type)], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Sum the amounts of every transaction in the database.
///
/// The amounts are stored as text, so the sum is computed with exact decimal
/// arithmetic here rather than with SQL's floating point `SUM`. They are
/// added in insertion order, so every partial sum is a balance the user
/// stats once held.
///
/// # Errors
/// This function will return a:
/// - [Error::CorruptValue] if a stored amount is not a valid decimal,
/// - [Error::TotalOutOfRange] if the sum does not fit in a decimal,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn sum_transaction_amounts(connection: &Connection) -> Result<Decimal, Error> {
    let mut statement = connection.prepare("SELECT amount FROM \"transaction\" ORDER BY id")?;
    let mut rows = statement.query([])?;
    let mut total = Decimal::ZERO;

    while let Some(row) = rows.next()? {
        total = total
            .checked_add(get_decimal(row, 0)?)
            .ok_or(Error::TotalOutOfRange("sum of the transaction amounts"))?;
    }

    Ok(total)
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL CHECK (description <> ''),
                amount TEXT NOT NULL,
                type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
                category TEXT NOT NULL CHECK (category <> ''),
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_created_at ON \"transaction\"(created_at);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let description = row.get(1)?;
    let amount = get_decimal(row, 2)?;
    let transaction_type = row.get(3)?;
    let category = row.get(4)?;
    let created_at = row.get(5)?;

    Ok(Transaction {
        id,
        description,
        amount,
        transaction_type,
        category,
        created_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod transaction_type_tests {
    use rust_decimal::Decimal;

    use crate::{Error, transaction::TransactionType};

    #[test]
    fn parses_exact_names_only() {
        assert_eq!("income".parse(), Ok(TransactionType::Income));
        assert_eq!("expense".parse(), Ok(TransactionType::Expense));
        assert_eq!(
            "Income".parse::<TransactionType>(),
            Err(Error::InvalidTransactionType("Income".to_owned()))
        );
    }

    #[test]
    fn expense_amounts_are_negative() {
        let amount = Decimal::new(12_50, 2);

        assert_eq!(TransactionType::Expense.signed_amount(amount), -amount);
        assert_eq!(TransactionType::Expense.signed_amount(-amount), -amount);
    }

    #[test]
    fn income_amounts_are_positive() {
        let amount = Decimal::new(12_50, 2);

        assert_eq!(TransactionType::Income.signed_amount(amount), amount);
        assert_eq!(TransactionType::Income.signed_amount(-amount), amount);
    }
}
