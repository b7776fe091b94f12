pub mod migrations;
pub mod queries;

use anyhow::Context;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use rusqlite::Connection;

/// Storage format for every timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite date functions only cover years 0000 through 9999.
pub fn is_storable(ts: &NaiveDateTime) -> bool {
    (0..=9999).contains(&ts.year())
}

/// Last second SQLite date functions can represent.
pub fn latest_storable() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .unwrap_or(NaiveDateTime::MAX)
}

/// Current UTC time truncated to the stored precision.
pub fn now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}
