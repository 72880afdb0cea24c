//! Defines the endpoint for listing transactions.
use std::{cmp::Ordering, str::FromStr};

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    AppState, Error,
    transaction::{Transaction, TransactionType, get_all_transactions, get_transactions_by_type},
};

/// The query parameters for listing transactions.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionListQuery {
    /// Only list transactions of this type, "income" or "expense".
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// How to order the transactions, see [TransactionSort].
    pub sort: Option<String>,
}

/// The order in which transactions are listed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TransactionSort {
    /// Newest first.
    #[default]
    Newest,
    /// Smallest signed amount first, so the largest expense comes first.
    AmountAscending,
    /// Largest signed amount first.
    AmountDescending,
    /// Alphabetical by description, ignoring case.
    DescriptionAscending,
    /// Reverse alphabetical by description, ignoring case.
    DescriptionDescending,
}

impl FromStr for TransactionSort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" | "newest" => Ok(TransactionSort::Newest),
            "amount_asc" => Ok(TransactionSort::AmountAscending),
            "amount_desc" => Ok(TransactionSort::AmountDescending),
            "description_asc" => Ok(TransactionSort::DescriptionAscending),
            "description_desc" => Ok(TransactionSort::DescriptionDescending),
            other => Err(Error::InvalidSortOrder(other.to_owned())),
        }
    }
}

/// Reorder `transactions`, which must already be newest first.
///
/// The sort is stable, transactions that compare equal stay newest first.
pub fn sort_transactions(transactions: &mut [Transaction], sort: TransactionSort) {
    match sort {
        TransactionSort::Newest => {}
        TransactionSort::AmountAscending => transactions.sort_by(|a, b| a.amount.cmp(&b.amount)),
        TransactionSort::AmountDescending => transactions.sort_by(|a, b| b.amount.cmp(&a.amount)),
        TransactionSort::DescriptionAscending => transactions.sort_by(compare_descriptions),
        TransactionSort::DescriptionDescending => {
            transactions.sort_by(|a, b| compare_descriptions(b, a))
        }
    }
}

fn compare_descriptions(a: &Transaction, b: &Transaction) -> Ordering {
    a.description
        .to_lowercase()
        .cmp(&b.description.to_lowercase())
        .then_with(|| a.description.cmp(&b.description))
}

/// A route handler that lists transactions, newest first unless another
/// order is requested.
pub async fn get_transactions_endpoint(
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> Response {
    let transaction_type = match query.transaction_type.as_deref() {
        None | Some("") | Some("all") => None,
        Some(name) => match name.parse::<TransactionType>() {
            Ok(transaction_type) => Some(transaction_type),
            Err(error) => return error.into_response(),
        },
    };

    let sort = match query.sort.as_deref().map(str::parse::<TransactionSort>) {
        None => TransactionSort::default(),
        Some(Ok(sort)) => sort,
        Some(Err(error)) => return error.into_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    let transactions = match transaction_type {
        Some(transaction_type) => get_transactions_by_type(transaction_type, &connection),
        None => get_all_transactions(&connection),
    };

    match transactions {
        Ok(mut transactions) => {
            sort_transactions(&mut transactions, sort);
            Json(transactions).into_response()
        }
        Err(error) => {
            tracing::error!("could not get transactions: {error}");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::{
        Error,
        test_utils::get_test_connection,
        transaction::{Transaction, TransactionType, create_transaction, get_all_transactions},
    };

    use super::{TransactionSort, sort_transactions};

    fn get_newest_first(entries: &[(&str, i64, TransactionType)]) -> Vec<Transaction> {
        let conn = get_test_connection();
        for (description, amount, transaction_type) in entries {
            create_transaction(
                Transaction::build(description, Decimal::from(*amount), *transaction_type, "Test"),
                &conn,
            )
            .unwrap();
        }

        get_all_transactions(&conn).unwrap()
    }

    fn descriptions(transactions: &[Transaction]) -> Vec<&str> {
        transactions
            .iter()
            .map(|transaction| transaction.description.as_str())
            .collect()
    }

    #[test]
    fn parses_sort_orders() {
        assert_eq!("".parse::<TransactionSort>(), Ok(TransactionSort::Newest));
        assert_eq!("none".parse::<TransactionSort>(), Ok(TransactionSort::Newest));
        assert_eq!(
            "amount_asc".parse::<TransactionSort>(),
            Ok(TransactionSort::AmountAscending)
        );
        assert_eq!(
            "amount_desc".parse::<TransactionSort>(),
            Ok(TransactionSort::AmountDescending)
        );
        assert_eq!(
            "description_asc".parse::<TransactionSort>(),
            Ok(TransactionSort::DescriptionAscending)
        );
        assert_eq!(
            "description_desc".parse::<TransactionSort>(),
            Ok(TransactionSort::DescriptionDescending)
        );
        assert_eq!(
            "random".parse::<TransactionSort>(),
            Err(Error::InvalidSortOrder("random".to_owned()))
        );
    }

    #[test]
    fn sorts_by_signed_amount() {
        let mut transactions = get_newest_first(&[
            ("Salary", 3000, TransactionType::Income),
            ("Rent", 1200, TransactionType::Expense),
            ("Refund", 20, TransactionType::Income),
        ]);

        sort_transactions(&mut transactions, TransactionSort::AmountAscending);
        assert_eq!(descriptions(&transactions), ["Rent", "Refund", "Salary"]);

        sort_transactions(&mut transactions, TransactionSort::AmountDescending);
        assert_eq!(descriptions(&transactions), ["Salary", "Refund", "Rent"]);
    }

    #[test]
    fn sorts_by_description_ignoring_case() {
        let mut transactions = get_newest_first(&[
            ("groceries", 50, TransactionType::Expense),
            ("Bonus", 100, TransactionType::Income),
            ("Rent", 1200, TransactionType::Expense),
        ]);

        sort_transactions(&mut transactions, TransactionSort::DescriptionAscending);
        assert_eq!(descriptions(&transactions), ["Bonus", "groceries", "Rent"]);

        sort_transactions(&mut transactions, TransactionSort::DescriptionDescending);
        assert_eq!(descriptions(&transactions), ["Rent", "groceries", "Bonus"]);
    }

    #[test]
    fn equal_amounts_stay_newest_first() {
        let mut transactions = get_newest_first(&[
            ("First coffee", 5, TransactionType::Expense),
            ("Second coffee", 5, TransactionType::Expense),
        ]);

        sort_transactions(&mut transactions, TransactionSort::AmountAscending);

        assert_eq!(
            descriptions(&transactions),
            ["Second coffee", "First coffee"]
        );
    }
}
