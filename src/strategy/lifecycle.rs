//! Position lifecycle management
//!
//! One state machine per instrument, Idle -> Open -> Idle. At most one
//! position per instrument at any time. Exit checks run on fresh data at the
//! current step time; entries were decided on delayed data by the scanner.

use crate::config::ArbConfig;
use crate::data::FundingRateProvider;
use crate::host::{HostInterface, LegId, LegSide};
use crate::log_decision;
use crate::market::{InstrumentId, VenueId};
use crate::sim::PriceSnapshot;
use crate::strategy::{ArbitrageOpportunity, DecisionLog};
use crate::Result;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Why an open position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Spread fell below the configured fraction of the entry spread
    SpreadCompressed,
    /// Spread fell below the absolute floor
    BelowMinimum,
    /// Position exceeded the maximum holding duration
    MaxDuration,
    /// Combined leg loss breached the stop threshold
    StopLoss,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::SpreadCompressed => write!(f, "spread compressed"),
            ExitReason::BelowMinimum => write!(f, "below minimum"),
            ExitReason::MaxDuration => write!(f, "max duration"),
            ExitReason::StopLoss => write!(f, "stop loss"),
        }
    }
}

/// An open delta-neutral position: one long and one short leg
#[derive(Debug, Clone)]
pub struct ArbitragePosition {
    /// Instrument the position is in
    pub instrument: InstrumentId,
    /// Venue holding the long leg
    pub venue_long: VenueId,
    /// Venue holding the short leg
    pub venue_short: VenueId,
    /// Host handle for the long leg
    pub leg_long: LegId,
    /// Host handle for the short leg
    pub leg_short: LegId,
    /// Normalized hourly spread captured at entry
    pub entry_spread: Decimal,
    /// Step time the legs were created at
    pub entry_time: i64,
    /// Delayed time the entry decision was based on
    pub decision_time: i64,
}

/// Opens and closes positions, enforcing one position per instrument
#[derive(Debug)]
pub struct PositionManager {
    leverage: u32,
    position_size_quote: Decimal,
    absolute_min_spread_exit: Decimal,
    compression_exit_threshold: Decimal,
    max_loss_per_position_pct: Decimal,
    max_position_duration_secs: i64,
    positions: BTreeMap<InstrumentId, ArbitragePosition>,
}

impl PositionManager {
    /// Create a manager from a validated configuration
    pub fn new(config: &ArbConfig) -> Self {
        Self {
            leverage: config.leverage,
            position_size_quote: config.position_size_quote,
            absolute_min_spread_exit: config.absolute_min_spread_exit,
            compression_exit_threshold: config.compression_exit_threshold,
            max_loss_per_position_pct: config.max_loss_per_position_pct,
            max_position_duration_secs: config.max_position_duration_secs(),
            positions: BTreeMap::new(),
        }
    }

    /// Instruments currently holding an open position
    pub fn active_instruments(&self) -> impl Iterator<Item = InstrumentId> + '_ {
        self.positions.keys().copied()
    }

    /// Number of open positions
    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    /// The open position for an instrument, if any
    pub fn position(&self, instrument: InstrumentId) -> Option<&ArbitragePosition> {
        self.positions.get(&instrument)
    }

    /// Open a position for a scanned opportunity
    ///
    /// Returns `Ok(false)` without touching the host when either venue has
    /// no price in the current snapshot; the opportunity is dropped, not
    /// queued. Both legs carry the same quote notional.
    pub fn open_position(
        &mut self,
        opportunity: &ArbitrageOpportunity,
        current_time: i64,
        snapshot: &PriceSnapshot,
        provider: &FundingRateProvider,
        host: &mut dyn HostInterface,
    ) -> Result<bool> {
        let registry = provider.registry();
        assert!(
            !self.positions.contains_key(&opportunity.instrument),
            "open_position called for instrument {} with a position already open",
            registry.instrument_name(opportunity.instrument)
        );

        // Both legs must be priceable before either is created.
        for venue in [opportunity.venue_long, opportunity.venue_short] {
            if snapshot.price(venue, opportunity.instrument).is_none() {
                warn!(
                    instrument = %registry.instrument_name(opportunity.instrument),
                    venue = %registry.venue_name(venue),
                    timestamp = current_time,
                    "No price available for entry, dropping opportunity"
                );
                return Ok(false);
            }
        }

        let leg_long = host.create_position_leg(
            opportunity.venue_long,
            opportunity.instrument,
            LegSide::Long,
            self.position_size_quote,
            self.leverage,
        )?;
        let leg_short = host.create_position_leg(
            opportunity.venue_short,
            opportunity.instrument,
            LegSide::Short,
            self.position_size_quote,
            self.leverage,
        )?;

        info!(
            instrument = %registry.instrument_name(opportunity.instrument),
            venue_long = %registry.venue_name(opportunity.venue_long),
            venue_short = %registry.venue_name(opportunity.venue_short),
            entry_spread = %opportunity.spread_hourly,
            timestamp = current_time,
            "Opened arbitrage position"
        );

        self.positions.insert(
            opportunity.instrument,
            ArbitragePosition {
                instrument: opportunity.instrument,
                venue_long: opportunity.venue_long,
                venue_short: opportunity.venue_short,
                leg_long,
                leg_short,
                entry_spread: opportunity.spread_hourly,
                entry_time: current_time,
                decision_time: opportunity.decision_time,
            },
        );
        Ok(true)
    }

    /// Evaluate every open position against the exit rules, in fixed order
    ///
    /// Runs on fresh data at `current_time`. A position whose venue pair has
    /// no spread this step is left untouched until data returns. Returns the
    /// instruments freed this step; callers must keep them out of the same
    /// step's scan.
    pub fn evaluate_exits(
        &mut self,
        current_time: i64,
        provider: &FundingRateProvider,
        host: &mut dyn HostInterface,
        log: &mut DecisionLog,
    ) -> Result<Vec<InstrumentId>> {
        let mut exits: Vec<(InstrumentId, ExitReason, Decimal)> = Vec::new();

        for position in self.positions.values() {
            let Some(current_spread) = provider.spread_between(
                current_time,
                position.instrument,
                position.venue_long,
                position.venue_short,
            ) else {
                continue;
            };

            if let Some(reason) = self.exit_reason(position, current_time, current_spread, host) {
                exits.push((position.instrument, reason, current_spread));
            }
        }

        let mut freed = Vec::with_capacity(exits.len());
        for (instrument, reason, current_spread) in exits {
            let position = self
                .positions
                .remove(&instrument)
                .ok_or_else(|| crate::FundingArbError::Host(format!(
                    "position for instrument {} vanished during exit",
                    instrument
                )))?;

            host.close_position_leg(position.leg_long)?;
            host.close_position_leg(position.leg_short)?;

            let registry = provider.registry();
            log_decision!(
                info,
                "EXIT",
                registry.instrument_name(instrument),
                current_spread,
                current_time,
                reason = %reason,
                "Closed arbitrage position"
            );

            let mut rates = BTreeMap::new();
            for venue in [position.venue_long, position.venue_short] {
                if let Some(rate) = provider.get_rate(current_time, venue, instrument) {
                    rates.insert(registry.venue_name(venue).to_string(), rate);
                }
            }
            log.record_exit(
                current_time,
                registry.instrument_name(instrument),
                current_spread,
                &reason.to_string(),
                rates,
            );

            freed.push(instrument);
        }
        Ok(freed)
    }

    fn exit_reason(
        &self,
        position: &ArbitragePosition,
        current_time: i64,
        current_spread: Decimal,
        host: &dyn HostInterface,
    ) -> Option<ExitReason> {
        if position.entry_spread > Decimal::ZERO
            && current_spread / position.entry_spread < self.compression_exit_threshold
        {
            return Some(ExitReason::SpreadCompressed);
        }

        if current_spread < self.absolute_min_spread_exit {
            return Some(ExitReason::BelowMinimum);
        }

        if current_time - position.entry_time >= self.max_position_duration_secs {
            return Some(ExitReason::MaxDuration);
        }

        // Stop loss requires both legs to be reporting; an inactive leg
        // skips the check rather than counting as zero.
        if let (Some(pnl_long), Some(pnl_short)) = (
            host.leg_net_pnl(position.leg_long),
            host.leg_net_pnl(position.leg_short),
        ) {
            let pnl_pct = (pnl_long + pnl_short) / (Decimal::TWO * self.position_size_quote);
            if pnl_pct <= -self.max_loss_per_position_pct {
                return Some(ExitReason::StopLoss);
            }
        }

        None
    }
}
