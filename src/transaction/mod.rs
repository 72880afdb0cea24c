//! Transaction management for the ledger.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `NewTransaction` for creating transactions
//! - Validation of submitted transactions
//! - Database functions for storing and querying transactions
//! - The atomic submission that also updates the user stats
//! - Route handlers for the transaction endpoints

mod core;
mod create_endpoint;
mod form;
mod submit;
mod summary;
mod transactions_endpoint;

pub use core::{
    NewTransaction, Transaction, TransactionType, count_transactions, create_transaction,
    create_transaction_table, get_all_transactions, get_transaction, get_transactions_by_type,
    map_transaction_row, sum_transaction_amounts,
};
pub use create_endpoint::create_transaction_endpoint;
pub use form::{AmountInput, TransactionForm};
pub use submit::{SubmittedTransaction, submit_transaction};
pub use summary::{TransactionSummary, get_summary_endpoint, get_transaction_summary};
pub use transactions_endpoint::{
    TransactionListQuery, TransactionSort, get_transactions_endpoint, sort_transactions,
};
