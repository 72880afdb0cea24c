//! The API endpoints URIs.

/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/transactions";
/// The route to get the experience, level and balance of the user.
pub const USER_STATS: &str = "/user-stats";
/// The route to get the income and expense totals over all transactions.
pub const SUMMARY: &str = "/summary";
