//! Durable change recording for oracle readings
//!
//! Keeps an append-only history of accepted changes and one latest-state
//! row per oracle. Change detection and the statistics update run in a
//! single write transaction, so re-polling a current value is a no-op.

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteStore;
