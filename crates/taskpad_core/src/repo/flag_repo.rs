//! Persisted launch-flag access over the `app_flags` table.
//!
//! # Responsibility
//! - Read and set the single "seed import completed" boolean.
//!
//! # Invariants
//! - The flag defaults to `false` when no row exists.
//! - The flag only ever transitions `false -> true`; nothing in core resets it.

use crate::repo::task_repo::RepoResult;
use rusqlite::{Connection, OptionalExtension};

/// Fixed key for the one-time seed import flag.
pub const SEED_COMPLETED_FLAG: &str = "seed_completed";

/// Returns whether the first-launch seed import has already completed.
pub fn first_launch_done(conn: &Connection) -> RepoResult<bool> {
    let value: Option<i64> = conn
        .query_row(
            "SELECT value FROM app_flags WHERE name = ?1;",
            [SEED_COMPLETED_FLAG],
            |row| row.get(0),
        )
        .optional()?;

    Ok(matches!(value, Some(raw) if raw != 0))
}

/// Durably records that the first-launch seed import completed.
pub fn mark_first_launch_done(conn: &Connection) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO app_flags (name, value) VALUES (?1, 1)
         ON CONFLICT(name) DO UPDATE SET value = 1;",
        [SEED_COMPLETED_FLAG],
    )?;

    Ok(())
}
