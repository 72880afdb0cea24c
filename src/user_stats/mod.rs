//! The gamification layer: the user's balance, experience and level.

mod core;
mod get_endpoint;

pub use core::{
    BalanceReconciliation, UserStats, XP_GAIN, XP_PER_LEVEL, apply_transaction,
    create_user_stats_table, get_user_stats, initialize_user_stats, level_for_experience,
    reconcile_balance, save_user_stats,
};
pub use get_endpoint::get_user_stats_endpoint;
