//! Funding Rate Arbitrage Backtester
//!
//! Detects and manages delta-neutral funding rate arbitrage positions across
//! multiple perpetual swap venues, evaluated against historical data with a
//! strict no-lookahead guarantee.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod data;
pub mod engine;
pub mod host;
pub mod market;
pub mod sim;
pub mod strategy;
pub mod utils;

// Re-export commonly used types
pub use config::ArbConfig;
pub use data::{FundingRateProvider, FundingSample, PriceSample, TimeSeriesStore};
pub use engine::{BacktestEngine, BacktestReport};
pub use host::{HostInterface, LegId, PaperHost};
pub use market::{InstrumentId, MarketRegistry, VenueId};
pub use sim::{PriceSnapshot, PriceSynchronizer};
pub use strategy::{ArbitrageOpportunity, DecisionLog, OpportunityScanner, PositionManager};

/// Result type used throughout the application
pub type Result<T> = anyhow::Result<T>;

/// Common error types for the arbitrage backtester
#[derive(thiserror::Error, Debug)]
pub enum FundingArbError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data loading or parsing error
    #[error("Data error: {0}")]
    Data(String),

    /// Host order/position interface error
    #[error("Host error: {0}")]
    Host(String),
}

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
