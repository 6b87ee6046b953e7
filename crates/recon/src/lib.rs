//! `tradeaudit-recon`: trade-report reconciliation engine.
//!
//! Pure engine crate: receives the primary (clearing) and counterparty
//! (execution venue) reports as CSV text, returns per-(venue, liquidity)
//! quantity and fee discrepancies plus the transaction rows behind them.
//! No CLI or filesystem dependencies.

pub mod aggregate;
pub mod config;
pub mod discrepancy;
pub mod engine;
pub mod error;
pub mod export;
pub mod ingest;
pub mod matcher;
pub mod model;
pub mod summary;
pub mod venue;

pub use config::ReconConfig;
pub use engine::{ingest, reconcile, run, ReconInput};
pub use error::ReconError;
pub use model::{ComparisonRow, Lineage, Measure, NormalizedRow, ReconResult};
pub use venue::VenueMapper;
