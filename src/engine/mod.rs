//! Backtest replay engine
//!
//! Drives the replay loop over the funding time grid: advance the price
//! clock, mark open legs, evaluate exits, then scan for entries. Within a
//! step exits always run before entries, and an instrument freed by an exit
//! is not eligible for re-entry until the next step.

use crate::config::ArbConfig;
use crate::data::{FundingRateProvider, FundingSample, PriceSample, TimeSeriesStore};
use crate::host::PaperHost;
use crate::market::{InstrumentId, MarketRegistry};
use crate::sim::PriceSynchronizer;
use crate::strategy::{DecisionLog, OpportunityScanner, PositionManager};
use crate::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::info;

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

/// Aggregate results of a completed backtest run
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    /// Number of steps replayed
    pub steps: u64,
    /// Positions opened over the run
    pub entries: u64,
    /// Positions closed over the run
    pub exits: u64,
    /// Positions still open at the end of the run
    pub open_positions: usize,
    /// P&L realized by closed legs
    pub realized_pnl: Decimal,
    /// Mark-to-market P&L of legs still open
    pub unrealized_pnl: Decimal,
    /// Exit counts keyed by logged reason
    pub exits_by_reason: BTreeMap<String, u64>,
}

/// Funding rate arbitrage backtester over in-memory historical data
pub struct BacktestEngine {
    registry: Arc<MarketRegistry>,
    provider: FundingRateProvider,
    sync: PriceSynchronizer,
    host: PaperHost,
    scanner: OpportunityScanner,
    manager: PositionManager,
    log: DecisionLog,
    steps: u64,
    entries: u64,
    exits: u64,
}

impl BacktestEngine {
    /// Build an engine from a validated configuration and loaded samples
    ///
    /// When `interpolate_max_gap` is set, funding series are densified onto
    /// each venue's union time grid before replay, filling gaps up to the
    /// given number of seconds.
    pub fn new(
        config: &ArbConfig,
        funding: &[FundingSample],
        prices: &[PriceSample],
        interpolate_max_gap: Option<u64>,
    ) -> Result<Self> {
        let registry = Arc::new(MarketRegistry::from_config(config)?);

        let mut store = TimeSeriesStore::new(registry.clone());
        store.load(funding)?;
        if let Some(max_gap) = interpolate_max_gap {
            store.interpolate(max_gap);
        }

        let provider = FundingRateProvider::new(registry.clone(), store);
        let sync = PriceSynchronizer::new(registry.clone(), prices)?;
        let host = PaperHost::new(registry.clone());
        let scanner = OpportunityScanner::new(config);
        let manager = PositionManager::new(config);

        info!(
            venues = registry.venue_count(),
            instruments = registry.instrument_count(),
            "Backtest engine initialized"
        );

        Ok(Self {
            registry,
            provider,
            sync,
            host,
            scanner,
            manager,
            log: DecisionLog::new(),
            steps: 0,
            entries: 0,
            exits: 0,
        })
    }

    /// The market registry the engine was built against
    pub fn registry(&self) -> &MarketRegistry {
        &self.registry
    }

    /// The append-only audit log of entry and exit decisions
    pub fn decision_log(&self) -> &DecisionLog {
        &self.log
    }

    /// Replay a single step at `timestamp`
    ///
    /// Timestamps must be presented in strictly increasing order across
    /// calls.
    pub fn step(&mut self, timestamp: i64) -> Result<()> {
        self.sync.advance(timestamp);
        let snapshot = self.sync.snapshot().clone();
        self.host.mark(&snapshot);

        let freed = self.manager.evaluate_exits(
            timestamp,
            &self.provider,
            &mut self.host,
            &mut self.log,
        )?;
        self.exits += freed.len() as u64;

        // Instruments freed this step sit out the same step's scan.
        let mut excluded: HashSet<InstrumentId> =
            self.manager.active_instruments().collect();
        excluded.extend(freed);

        let opportunities =
            self.scanner
                .scan(timestamp, &self.provider, &excluded, &mut self.log);
        for opportunity in &opportunities {
            let opened = self.manager.open_position(
                opportunity,
                timestamp,
                &snapshot,
                &self.provider,
                &mut self.host,
            )?;
            if opened {
                self.entries += 1;
            }
        }

        self.steps += 1;
        Ok(())
    }

    /// Replay every timestamp in the loaded funding data, in order
    pub fn run(&mut self) -> Result<BacktestReport> {
        if let Some((start, end)) = self.provider.store().time_bounds() {
            info!(
                start = %format_ts(start),
                end = %format_ts(end),
                "Replaying data window"
            );
        }

        let timestamps = self.provider.store().step_timestamps();
        info!(steps = timestamps.len(), "Starting backtest replay");

        for timestamp in timestamps {
            self.step(timestamp)?;
        }

        let report = self.report();
        info!(
            steps = report.steps,
            entries = report.entries,
            exits = report.exits,
            realized_pnl = %report.realized_pnl,
            "Backtest replay finished"
        );
        Ok(report)
    }

    /// Snapshot of run statistics so far
    pub fn report(&self) -> BacktestReport {
        let mut exits_by_reason = BTreeMap::new();
        for entry in self.log.entries() {
            if !entry.reason.is_empty() {
                *exits_by_reason.entry(entry.reason.clone()).or_insert(0) += 1;
            }
        }

        BacktestReport {
            steps: self.steps,
            entries: self.entries,
            exits: self.exits,
            open_positions: self.manager.open_count(),
            realized_pnl: self.host.realized_pnl(),
            unrealized_pnl: self.host.unrealized_pnl(),
            exits_by_reason,
        }
    }
}
