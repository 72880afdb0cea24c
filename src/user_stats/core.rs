//! The experience, level and balance of the user, and the rules for updating them.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    db::get_decimal,
    transaction::{TransactionType, sum_transaction_amounts},
};

/// The experience awarded for an income transaction that leaves the balance positive.
pub const XP_GAIN: u32 = 500;

/// The experience needed per level. Reaching the next level from level `n`
/// requires a total of `XP_PER_LEVEL * n` experience.
pub const XP_PER_LEVEL: u32 = 1000;

/// The single record of the user's progress.
///
/// This is derived from the transactions: `balance` is always the sum of all
/// transaction amounts. It is stored separately and updated with
/// [apply_transaction] so it never has to be recomputed from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    /// Starts at 1 and never decreases.
    pub level: u32,
    /// Never decreases.
    pub experience: u32,
    /// The sum of the amounts of all transactions.
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    /// Incremented every time the record is saved, used to detect concurrent writers.
    #[serde(skip)]
    pub version: i64,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0,
            balance: Decimal::ZERO,
            version: 0,
        }
    }
}

/// Compute the stats after adding a transaction of `amount`.
///
/// `amount` must already carry the sign for `transaction_type`.
///
/// Experience is only awarded for income that leaves the balance positive.
/// Experience is never spent on levelling up, so the threshold for each level
/// is checked against the running total (see [level_for_experience]).
///
/// # Errors
/// Returns [Error::BalanceOutOfRange] if the new balance cannot be represented.
pub fn apply_transaction(
    current: &UserStats,
    amount: Decimal,
    transaction_type: TransactionType,
) -> Result<UserStats, Error> {
    let balance = current
        .balance
        .checked_add(amount)
        .ok_or(Error::BalanceOutOfRange(amount))?;

    let experience = if transaction_type == TransactionType::Income && balance > Decimal::ZERO {
        current.experience.saturating_add(XP_GAIN)
    } else {
        current.experience
    };

    Ok(UserStats {
        level: level_for_experience(experience, current.level),
        experience,
        balance,
        version: current.version,
    })
}

/// Raise `level` until `experience` is below the threshold of the current level.
///
/// The threshold grows with each level, a single call can raise the level
/// more than once. The returned level is never lower than `level`.
pub fn level_for_experience(experience: u32, level: u32) -> u32 {
    let mut level = level.max(1);

    while u64::from(experience) >= u64::from(XP_PER_LEVEL) * u64::from(level) {
        level += 1;
    }

    level
}

/// Create the table that holds the single user stats record.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_user_stats_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user_stats (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                level INTEGER NOT NULL CHECK (level >= 1),
                experience INTEGER NOT NULL CHECK (experience >= 0),
                balance TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 0
                )",
        (),
    )?;

    Ok(())
}

/// Create the user stats record if it does not exist yet and return it.
///
/// A new record starts at level 1 with no experience, and a balance equal to
/// the sum of the transactions already in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn initialize_user_stats(connection: &Connection) -> Result<UserStats, Error> {
    let balance = sum_transaction_amounts(connection)?;
    let defaults = UserStats {
        balance,
        ..Default::default()
    };

    connection.execute(
        "INSERT OR IGNORE INTO user_stats (id, level, experience, balance, version)
         VALUES (1, ?1, ?2, ?3, ?4)",
        (
            defaults.level,
            defaults.experience,
            defaults.balance.to_string(),
            defaults.version,
        ),
    )?;

    get_user_stats(connection)
}

/// Retrieve the user stats.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the user stats have not been initialized,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_user_stats(connection: &Connection) -> Result<UserStats, Error> {
    let user_stats = connection
        .prepare("SELECT level, experience, balance, version FROM user_stats WHERE id = 1")?
        .query_one([], map_user_stats_row)?;

    Ok(user_stats)
}

/// Overwrite the user stats with `user_stats`, returning the saved record.
///
/// The write only succeeds if the stored version still equals
/// `user_stats.version`, i.e. nobody else saved the stats since they were
/// read. The returned record carries the incremented version.
///
/// # Errors
/// This function will return a:
/// - [Error::StaleUserStats] if the stored version does not match,
/// - or [Error::SqlError] there is some other SQL error.
pub fn save_user_stats(user_stats: &UserStats, connection: &Connection) -> Result<UserStats, Error> {
    let rows_changed = connection.execute(
        "UPDATE user_stats
         SET level = ?1, experience = ?2, balance = ?3, version = version + 1
         WHERE id = 1 AND version = ?4",
        (
            user_stats.level,
            user_stats.experience,
            user_stats.balance.to_string(),
            user_stats.version,
        ),
    )?;

    if rows_changed == 0 {
        return Err(Error::StaleUserStats);
    }

    Ok(UserStats {
        version: user_stats.version + 1,
        ..user_stats.clone()
    })
}

/// The stored balance next to the balance recomputed from all transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceReconciliation {
    /// The balance in the user stats record.
    pub stored: Decimal,
    /// The sum of the amounts of all transactions.
    pub folded: Decimal,
}

impl BalanceReconciliation {
    /// Whether the stored balance agrees with the transactions.
    pub fn is_consistent(&self) -> bool {
        self.stored == self.folded
    }
}

/// Compare the stored balance with the sum of all transaction amounts.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the user stats have not been initialized,
/// - or [Error::SqlError] there is some other SQL error.
pub fn reconcile_balance(connection: &Connection) -> Result<BalanceReconciliation, Error> {
    let stored = get_user_stats(connection)?.balance;
    let folded = sum_transaction_amounts(connection)?;

    Ok(BalanceReconciliation { stored, folded })
}

fn map_user_stats_row(row: &Row) -> Result<UserStats, rusqlite::Error> {
    let level = row.get(0)?;
    let experience = row.get(1)?;
    let balance = get_decimal(row, 2)?;
    let version = row.get(3)?;

    Ok(UserStats {
        level,
        experience,
        balance,
        version,
    })
}

#[cfg(test)]
mod apply_transaction_tests {
    use rust_decimal::Decimal;

    use crate::{
        Error,
        transaction::TransactionType,
        user_stats::{UserStats, XP_GAIN, apply_transaction, level_for_experience},
    };

    fn stats(level: u32, experience: u32, balance: i64) -> UserStats {
        UserStats {
            level,
            experience,
            balance: Decimal::from(balance),
            version: 0,
        }
    }

    #[test]
    fn salary_awards_experience() {
        let got = apply_transaction(
            &UserStats::default(),
            Decimal::from(3000),
            TransactionType::Income,
        )
        .unwrap();

        assert_eq!(got, stats(1, 500, 3000));
    }

    #[test]
    fn second_salary_levels_up() {
        let got = apply_transaction(
            &stats(1, 500, 3000),
            Decimal::from(3000),
            TransactionType::Income,
        )
        .unwrap();

        assert_eq!(got, stats(2, 1000, 6000));
    }

    #[test]
    fn expense_only_changes_balance() {
        let got = apply_transaction(
            &stats(1, 500, 3000),
            Decimal::from(-1200),
            TransactionType::Expense,
        )
        .unwrap();

        assert_eq!(got, stats(1, 500, 1800));
    }

    #[test]
    fn expense_into_negative_balance_only_changes_balance() {
        let got = apply_transaction(
            &stats(3, 2500, 100),
            Decimal::from(-500),
            TransactionType::Expense,
        )
        .unwrap();

        assert_eq!(got, stats(3, 2500, -400));
    }

    #[test]
    fn income_leaving_balance_negative_awards_nothing() {
        let got = apply_transaction(
            &stats(1, 0, -1000),
            Decimal::from(400),
            TransactionType::Income,
        )
        .unwrap();

        assert_eq!(got, stats(1, 0, -600));
    }

    #[test]
    fn income_reaching_exactly_zero_awards_nothing() {
        let got = apply_transaction(
            &stats(1, 0, -400),
            Decimal::from(400),
            TransactionType::Income,
        )
        .unwrap();

        assert_eq!(got, stats(1, 0, 0));
    }

    #[test]
    fn zero_income_on_positive_balance_awards_experience() {
        let got = apply_transaction(&stats(1, 0, 10), Decimal::ZERO, TransactionType::Income).unwrap();

        assert_eq!(got, stats(1, XP_GAIN, 10));
    }

    #[test]
    fn version_is_not_changed() {
        let current = UserStats {
            version: 7,
            ..UserStats::default()
        };

        let got = apply_transaction(&current, Decimal::ONE, TransactionType::Income).unwrap();

        assert_eq!(got.version, 7);
    }

    #[test]
    fn level_threshold_uses_accumulated_experience() {
        assert_eq!(level_for_experience(0, 1), 1);
        assert_eq!(level_for_experience(999, 1), 1);
        assert_eq!(level_for_experience(1000, 1), 2);
        assert_eq!(level_for_experience(1999, 2), 2);
        assert_eq!(level_for_experience(2000, 2), 3);
    }

    #[test]
    fn level_can_rise_several_times_at_once() {
        // 1000 >= 1000 * 1, 2000 >= 1000 * 2, 3000 >= 1000 * 3, 3000 < 1000 * 4
        assert_eq!(level_for_experience(3000, 1), 4);
    }

    #[test]
    fn level_never_decreases() {
        assert_eq!(level_for_experience(0, 5), 5);
    }

    #[test]
    fn experience_and_level_never_decrease_over_a_sequence() {
        let amounts = [3000, -5000, 200, 7000, -100, 50, -20000, 30000, 1];
        let mut current = UserStats::default();

        for amount in amounts {
            let transaction_type = if amount < 0 {
                TransactionType::Expense
            } else {
                TransactionType::Income
            };
            let next = apply_transaction(&current, Decimal::from(amount), transaction_type).unwrap();

            assert!(next.level >= current.level);
            assert!(next.experience >= current.experience);
            current = next;
        }

        assert_eq!(current.balance, Decimal::from(amounts.iter().sum::<i64>()));
    }

    #[test]
    fn balance_overflow_is_an_error() {
        let current = UserStats {
            balance: Decimal::MAX,
            ..UserStats::default()
        };

        let got = apply_transaction(&current, Decimal::ONE, TransactionType::Income);

        assert_eq!(got, Err(Error::BalanceOutOfRange(Decimal::ONE)));
    }

    #[test]
    fn balance_underflow_is_an_error() {
        let current = UserStats {
            balance: Decimal::MIN,
            ..UserStats::default()
        };

        let got = apply_transaction(&current, -Decimal::ONE, TransactionType::Expense);

        assert_eq!(got, Err(Error::BalanceOutOfRange(-Decimal::ONE)));
    }
}

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;

    use crate::{
        Error,
        test_utils::get_test_connection,
        transaction::{Transaction, TransactionType, create_transaction, create_transaction_table},
        user_stats::{
            UserStats, create_user_stats_table, get_user_stats, initialize_user_stats,
            reconcile_balance, save_user_stats,
        },
    };

    #[test]
    fn get_fails_before_initialization() {
        let conn = Connection::open_in_memory().unwrap();
        create_transaction_table(&conn).unwrap();
        create_user_stats_table(&conn).unwrap();

        assert_eq!(get_user_stats(&conn), Err(Error::NotFound));
    }

    #[test]
    fn initialize_uses_existing_transactions_for_balance() {
        let conn = Connection::open_in_memory().unwrap();
        create_transaction_table(&conn).unwrap();
        create_user_stats_table(&conn).unwrap();
        for (amount, transaction_type) in [
            (3000, TransactionType::Income),
            (1200, TransactionType::Expense),
            (350, TransactionType::Expense),
        ] {
            create_transaction(
                Transaction::build("seed", Decimal::from(amount), transaction_type, "Seed"),
                &conn,
            )
            .unwrap();
        }

        let got = initialize_user_stats(&conn).unwrap();

        assert_eq!(
            got,
            UserStats {
                balance: Decimal::from(1450),
                ..UserStats::default()
            }
        );
    }

    #[test]
    fn save_increments_version() {
        let conn = get_test_connection();
        let current = get_user_stats(&conn).unwrap();
        let new_stats = UserStats {
            level: 2,
            experience: 1000,
            balance: Decimal::new(6000_10, 2),
            ..current
        };

        let saved = save_user_stats(&new_stats, &conn).unwrap();

        assert_eq!(saved.version, new_stats.version + 1);
        assert_eq!(get_user_stats(&conn), Ok(saved));
    }

    #[test]
    fn save_rejects_stale_version() {
        let conn = get_test_connection();
        let snapshot = get_user_stats(&conn).unwrap();
        let first_writer = UserStats {
            balance: Decimal::from(10),
            ..snapshot.clone()
        };
        let second_writer = UserStats {
            balance: Decimal::from(20),
            ..snapshot
        };
        let saved = save_user_stats(&first_writer, &conn).unwrap();

        let result = save_user_stats(&second_writer, &conn);

        assert_eq!(result, Err(Error::StaleUserStats));
        assert_eq!(get_user_stats(&conn), Ok(saved));
    }

    #[test]
    fn reconcile_detects_drift() {
        let conn = get_test_connection();
        create_transaction(
            Transaction::build("untracked", Decimal::from(5), TransactionType::Income, "Test"),
            &conn,
        )
        .unwrap();

        let reconciliation = reconcile_balance(&conn).unwrap();

        assert!(!reconciliation.is_consistent());
        assert_eq!(reconciliation.stored, Decimal::ZERO);
        assert_eq!(reconciliation.folded, Decimal::from(5));
    }
}
