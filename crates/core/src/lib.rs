//! Core types for the oracle aggregator
//!
//! This crate provides the pieces shared by every component:
//! - Oracle readings, latest records and history entries
//! - The on-chain feed catalog
//! - Raw tuple normalization
//! - Freshness ranking
//! - Configuration, errors and the persistence seam

pub mod types;
pub mod feeds;
pub mod normalize;
pub mod ranking;
pub mod store;
pub mod config;
pub mod errors;

pub use types::*;
pub use feeds::*;
pub use normalize::*;
pub use ranking::*;
pub use store::*;
pub use config::*;
pub use errors::*;
