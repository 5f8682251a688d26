//! Host order/position interface
//!
//! The core never mutates order books or balances directly; it requests leg
//! creation and closure through this boundary and reads back per-leg P&L.
//! `PaperHost` is the bundled simulation host used by the backtest driver.

use crate::market::{InstrumentId, MarketRegistry, VenueId};
use crate::sim::PriceSnapshot;
use crate::{FundingArbError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Opaque handle to a host-managed position leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LegId(Uuid);

impl LegId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a position leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegSide {
    /// Long exposure
    Long,
    /// Short exposure
    Short,
}

impl fmt::Display for LegSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegSide::Long => write!(f, "LONG"),
            LegSide::Short => write!(f, "SHORT"),
        }
    }
}

/// Capability set the core requires from the surrounding host
pub trait HostInterface {
    /// Open one position leg with the given notional and leverage
    fn create_position_leg(
        &mut self,
        venue: VenueId,
        instrument: InstrumentId,
        side: LegSide,
        notional: Decimal,
        leverage: u32,
    ) -> Result<LegId>;

    /// Request closure of a leg
    fn close_position_leg(&mut self, leg: LegId) -> Result<()>;

    /// Net P&L of a leg, `None` if the leg is not currently active
    fn leg_net_pnl(&self, leg: LegId) -> Option<Decimal>;
}

#[derive(Debug, Clone)]
struct PaperLeg {
    venue: VenueId,
    instrument: InstrumentId,
    side: LegSide,
    amount: Decimal,
    entry_price: Decimal,
    mark_price: Decimal,
    open: bool,
}

impl PaperLeg {
    fn net_pnl(&self) -> Decimal {
        let delta = self.mark_price - self.entry_price;
        match self.side {
            LegSide::Long => delta * self.amount,
            LegSide::Short => -delta * self.amount,
        }
    }
}

/// Simulated host that marks legs against the step price snapshot
///
/// Legs are sized as `notional / entry_price`, marked to the latest
/// snapshot each step, and report unrealized P&L while open. No fee
/// accounting is performed.
#[derive(Debug)]
pub struct PaperHost {
    registry: Arc<MarketRegistry>,
    legs: HashMap<LegId, PaperLeg>,
    snapshot: PriceSnapshot,
    realized_pnl: Decimal,
}

impl PaperHost {
    /// Create an empty paper host
    pub fn new(registry: Arc<MarketRegistry>) -> Self {
        Self {
            registry,
            legs: HashMap::new(),
            snapshot: PriceSnapshot::default(),
            realized_pnl: Decimal::ZERO,
        }
    }

    /// Mark all open legs against a fresh price snapshot
    ///
    /// A leg whose pair is missing from the snapshot keeps its previous
    /// mark rather than being zeroed.
    pub fn mark(&mut self, snapshot: &PriceSnapshot) {
        for leg in self.legs.values_mut() {
            if !leg.open {
                continue;
            }
            if let Some(price) = snapshot.price(leg.venue, leg.instrument) {
                leg.mark_price = price;
            }
        }
        self.snapshot = snapshot.clone();
    }

    /// Realized P&L across all closed legs
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// Unrealized P&L across all open legs
    pub fn unrealized_pnl(&self) -> Decimal {
        self.legs
            .values()
            .filter(|leg| leg.open)
            .map(|leg| leg.net_pnl())
            .sum()
    }

    /// Number of currently open legs
    pub fn open_leg_count(&self) -> usize {
        self.legs.values().filter(|leg| leg.open).count()
    }
}

impl HostInterface for PaperHost {
    fn create_position_leg(
        &mut self,
        venue: VenueId,
        instrument: InstrumentId,
        side: LegSide,
        notional: Decimal,
        leverage: u32,
    ) -> Result<LegId> {
        let entry_price = self.snapshot.price(venue, instrument).ok_or_else(|| {
            FundingArbError::Host(format!(
                "No price for {} on {} at leg creation",
                self.registry.instrument_name(instrument),
                self.registry.venue_name(venue)
            ))
        })?;

        if entry_price <= Decimal::ZERO {
            return Err(FundingArbError::Host(format!(
                "Non-positive price for {} on {}",
                self.registry.instrument_name(instrument),
                self.registry.venue_name(venue)
            ))
            .into());
        }

        let id = LegId::new();
        let amount = notional / entry_price;
        self.legs.insert(
            id,
            PaperLeg {
                venue,
                instrument,
                side,
                amount,
                entry_price,
                mark_price: entry_price,
                open: true,
            },
        );

        info!(
            leg = %id,
            venue = %self.registry.venue_name(venue),
            instrument = %self.registry.instrument_name(instrument),
            %side,
            %notional,
            leverage,
            %entry_price,
            "Opened paper leg"
        );
        Ok(id)
    }

    fn close_position_leg(&mut self, leg: LegId) -> Result<()> {
        let entry = self
            .legs
            .get_mut(&leg)
            .ok_or_else(|| FundingArbError::Host(format!("Unknown leg {}", leg)))?;

        if !entry.open {
            return Err(FundingArbError::Host(format!("Leg {} already closed", leg)).into());
        }

        entry.open = false;
        let pnl = entry.net_pnl();
        self.realized_pnl += pnl;

        debug!(leg = %leg, %pnl, "Closed paper leg");
        Ok(())
    }

    fn leg_net_pnl(&self, leg: LegId) -> Option<Decimal> {
        self.legs
            .get(&leg)
            .filter(|entry| entry.open)
            .map(|entry| entry.net_pnl())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::PriceSynchronizer;
    use crate::{ArbConfig, PriceSample};

    fn setup() -> (Arc<MarketRegistry>, PaperHost, PriceSynchronizer) {
        let registry = Arc::new(MarketRegistry::from_config(&ArbConfig::default()).unwrap());
        let samples = vec![
            PriceSample {
                timestamp: 1000,
                venue: "lighter_perpetual".to_string(),
                instrument: "KAITO".to_string(),
                price: "2.00".parse().unwrap(),
            },
            PriceSample {
                timestamp: 2000,
                venue: "lighter_perpetual".to_string(),
                instrument: "KAITO".to_string(),
                price: "2.10".parse().unwrap(),
            },
        ];
        let sync = PriceSynchronizer::new(registry.clone(), &samples).unwrap();
        let host = PaperHost::new(registry.clone());
        (registry, host, sync)
    }

    #[test]
    fn test_leg_pnl_marks_against_snapshot() {
        let (registry, mut host, mut sync) = setup();
        let lighter = registry.venue("lighter_perpetual").unwrap();
        let kaito = registry.instrument("KAITO").unwrap();

        host.mark(sync.advance(1000));
        let leg = host
            .create_position_leg(lighter, kaito, LegSide::Long, "500".parse().unwrap(), 5)
            .unwrap();
        assert_eq!(host.leg_net_pnl(leg), Some(Decimal::ZERO));

        // Price moves 2.00 -> 2.10 on a 250-unit leg: +25 quote.
        host.mark(sync.advance(2000));
        assert_eq!(host.leg_net_pnl(leg), Some("25".parse().unwrap()));
    }

    #[test]
    fn test_short_leg_pnl_inverts() {
        let (registry, mut host, mut sync) = setup();
        let lighter = registry.venue("lighter_perpetual").unwrap();
        let kaito = registry.instrument("KAITO").unwrap();

        host.mark(sync.advance(1000));
        let leg = host
            .create_position_leg(lighter, kaito, LegSide::Short, "500".parse().unwrap(), 5)
            .unwrap();

        host.mark(sync.advance(2000));
        assert_eq!(host.leg_net_pnl(leg), Some("-25".parse().unwrap()));
    }

    #[test]
    fn test_closed_leg_reports_no_pnl() {
        let (registry, mut host, mut sync) = setup();
        let lighter = registry.venue("lighter_perpetual").unwrap();
        let kaito = registry.instrument("KAITO").unwrap();

        host.mark(sync.advance(1000));
        let leg = host
            .create_position_leg(lighter, kaito, LegSide::Long, "500".parse().unwrap(), 5)
            .unwrap();

        host.mark(sync.advance(2000));
        host.close_position_leg(leg).unwrap();

        assert_eq!(host.leg_net_pnl(leg), None);
        assert_eq!(host.realized_pnl(), "25".parse().unwrap());
        assert!(host.close_position_leg(leg).is_err());
    }

    #[test]
    fn test_create_leg_without_price_fails() {
        let (registry, mut host, mut sync) = setup();
        let extended = registry.venue("extended_perpetual").unwrap();
        let kaito = registry.instrument("KAITO").unwrap();

        host.mark(sync.advance(1000));
        let result =
            host.create_position_leg(extended, kaito, LegSide::Long, "500".parse().unwrap(), 5);
        assert!(result.is_err());
    }
}
