pub mod record_sale_command;

use chrono::{DateTime, Utc};

/// Free solo-tier ceiling: confirmed sales per calendar month.
pub const SOLO_FREE_MONTHLY_LIMIT: i32 = 30;

/// Calendar-month bucket key, e.g. "2026-08".
pub fn year_month(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}
