//! HTTP server for the oracle aggregator
//!
//! Serves freshness-ranked oracle views and recorded change history

pub mod api;
pub mod responses;
pub mod server;
pub mod service;
pub mod settings;

pub use api::create_router;
pub use server::{HttpServer, HttpServerBuilder};
pub use service::{History, OracleService, ViewError};
