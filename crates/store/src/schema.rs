//! Table layout for oracle history and latest state

use sqlx::SqliteConnection;

/// Append-only history, one row per accepted change
pub const CREATE_UPDATES: &str = r#"
    CREATE TABLE IF NOT EXISTS oracle_updates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        oracle_name TEXT NOT NULL,
        price REAL NOT NULL,
        updated_at INTEGER NOT NULL,
        recorded_at INTEGER NOT NULL,
        decimals INTEGER NOT NULL,
        raw_price TEXT NOT NULL
    )
"#;

/// Latest state, one row per oracle name
pub const CREATE_LATEST: &str = r#"
    CREATE TABLE IF NOT EXISTS oracle_latest (
        oracle_name TEXT PRIMARY KEY,
        price REAL NOT NULL,
        updated_at INTEGER NOT NULL,
        recorded_at INTEGER NOT NULL,
        decimals INTEGER NOT NULL,
        raw_price TEXT NOT NULL,
        last_change_at INTEGER,
        update_count INTEGER NOT NULL DEFAULT 0
    )
"#;

pub const CREATE_UPDATES_TIME_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_updates_oracle_time
    ON oracle_updates(oracle_name, recorded_at DESC)
"#;

/// At most one history row per `(oracle_name, updated_at)`
pub const CREATE_UPDATES_UNIQUE_INDEX: &str = r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_updates_oracle_updated
    ON oracle_updates(oracle_name, updated_at)
"#;

/// Create tables and indexes if they do not exist.
///
/// Runs on a single connection that is closed before any pool opens the
/// database; pooled connections then all parse the final schema.
pub async fn init(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    for statement in [
        CREATE_UPDATES,
        CREATE_LATEST,
        CREATE_UPDATES_TIME_INDEX,
        CREATE_UPDATES_UNIQUE_INDEX,
    ] {
        sqlx::query(statement).execute(&mut *conn).await?;
    }
    Ok(())
}
