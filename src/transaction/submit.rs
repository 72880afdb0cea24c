//! Records a transaction and the user stats it produces as one atomic unit.

use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    transaction::{Transaction, TransactionForm, TransactionType, create_transaction},
    user_stats::{UserStats, apply_transaction, get_user_stats, save_user_stats},
};

/// The stored transaction together with the user stats after applying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    /// The transaction as it was stored.
    pub transaction: Transaction,
    /// The user stats after applying the transaction.
    #[serde(rename = "userStats")]
    pub user_stats: UserStats,
}

/// Validate `form`, then store the transaction and update the user stats.
///
/// Both writes happen in one SQLite transaction that takes the write lock
/// before the user stats are read, so concurrent submissions cannot compute
/// from the same snapshot. If anything fails after validation, the SQLite
/// transaction is rolled back and neither the transaction nor the stats
/// change is visible.
///
/// # Errors
/// This function will return a:
/// - validation error (see [TransactionForm::validate]) without touching the database,
/// - [Error::BalanceOutOfRange] if the new balance cannot be represented,
/// - [Error::NotFound] if the user stats have not been initialized,
/// - [Error::StaleUserStats] if another writer saved the stats in the meantime,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn submit_transaction(
    form: TransactionForm,
    connection: &mut Connection,
) -> Result<SubmittedTransaction, Error> {
    let new_transaction = form.validate()?;

    let sql_transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let current_stats = get_user_stats(&sql_transaction)?;
    let new_stats = apply_transaction(
        &current_stats,
        new_transaction.amount(),
        new_transaction.transaction_type(),
    )?;

    let transaction = create_transaction(new_transaction, &sql_transaction)?;
    let user_stats = save_user_stats(&new_stats, &sql_transaction)?;

    sql_transaction.commit()?;

    log_progress(&current_stats, &user_stats, transaction.transaction_type);
    tracing::info!("Created transaction {transaction:?}, user stats are now {user_stats:?}");

    Ok(SubmittedTransaction {
        transaction,
        user_stats,
    })
}

fn log_progress(before: &UserStats, after: &UserStats, transaction_type: TransactionType) {
    if after.experience > before.experience {
        tracing::info!("Gained experience, now at {} XP", after.experience);
    }

    if after.level > before.level {
        tracing::info!("Levelled up to level {}", after.level);
    }

    if transaction_type == TransactionType::Expense && after.balance < Decimal::ZERO {
        tracing::warn!("The balance is negative: {}", after.balance);
    }
}
