//! Arbitrage strategy: opportunity scanning and position lifecycle

pub mod audit;
pub mod lifecycle;
pub mod scanner;

pub use audit::{DecisionAction, DecisionLog, DecisionLogEntry};
pub use lifecycle::{ArbitragePosition, ExitReason, PositionManager};
pub use scanner::OpportunityScanner;

use crate::market::{InstrumentId, VenueId};
use indexmap::IndexMap;
use rust_decimal::Decimal;

/// Candidate delta-neutral entry produced by a scan
///
/// Transient: produced fresh each scan, never persisted. `decision_time` is
/// the time-of-knowledge after the execution delay; downstream consumers
/// must not re-query data at a fresher time for this decision.
#[derive(Debug, Clone)]
pub struct ArbitrageOpportunity {
    /// Instrument to arbitrage
    pub instrument: InstrumentId,
    /// Venue to go long (lower normalized rate)
    pub venue_long: VenueId,
    /// Venue to go short (higher normalized rate)
    pub venue_short: VenueId,
    /// Normalized hourly spread at decision time
    pub spread_hourly: Decimal,
    /// Delayed timestamp the rates were queried at
    pub decision_time: i64,
    /// Raw per-interval rates per venue, as of decision time
    pub as_of_rates: IndexMap<VenueId, Decimal>,
}
