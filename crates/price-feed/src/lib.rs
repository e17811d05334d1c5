//! Oracle price feed aggregator
//!
//! Features:
//! - Concurrent reads of every oracle contract per asset
//! - Per-feed failure isolation
//! - Idempotent change recording through an [`oracle_core::OracleStore`]
//! - Freshness-ranked views, published per asset without locking readers

pub mod aggregator;
pub mod poller;
pub mod reader;
pub mod state;

pub use aggregator::{AggregatorConfig, AggregatorError, OracleAggregator};
pub use poller::{poll_feeds, CycleRunner, CycleSnapshot, FeedOutcome};
pub use reader::{ChainReader, FeedReader};
pub use state::{SnapshotState, SnapshotStats};
