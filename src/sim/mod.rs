//! Simulation price/time synchronizer
//!
//! At every simulated step the host replay loop advances the logical clock
//! and publishes a consistent price snapshot for every tracked
//! (venue, instrument) pair, so position sizing never falls back to a stale
//! or default price for a pair just because it is not the primary pair of
//! the scan.

use crate::data::{PriceSample, Series};
use crate::market::{InstrumentId, MarketRegistry, VenueId};
use crate::Result;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Consistent per-step view of prices for all tracked pairs
///
/// Pairs with no price sample at or before the step timestamp are omitted;
/// consumers must treat that as missing data, never as zero.
#[derive(Debug, Clone, Default)]
pub struct PriceSnapshot {
    /// Step timestamp the snapshot was taken at
    pub timestamp: i64,
    prices: HashMap<(VenueId, InstrumentId), Decimal>,
}

impl PriceSnapshot {
    /// Price for a pair, if one was available at or before the timestamp
    pub fn price(&self, venue: VenueId, instrument: InstrumentId) -> Option<Decimal> {
        self.prices.get(&(venue, instrument)).copied()
    }

    /// Number of pairs with a resolved price
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Whether no pair resolved a price
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Advances the logical clock and recomputes the price snapshot each step
#[derive(Debug)]
pub struct PriceSynchronizer {
    registry: Arc<MarketRegistry>,
    series: HashMap<(VenueId, InstrumentId), Series>,
    clock: Option<i64>,
    snapshot: PriceSnapshot,
}

impl PriceSynchronizer {
    /// Create a synchronizer and materialize price history up front
    pub fn new(registry: Arc<MarketRegistry>, samples: &[PriceSample]) -> Result<Self> {
        let mut series: HashMap<(VenueId, InstrumentId), Series> = HashMap::new();
        let mut skipped = 0usize;

        for sample in samples {
            let (Some(venue), Some(instrument)) = (
                registry.venue(&sample.venue),
                registry.instrument(&sample.instrument),
            ) else {
                skipped += 1;
                continue;
            };
            series
                .entry((venue, instrument))
                .or_default()
                .push(sample.timestamp, sample.price);
        }

        for s in series.values_mut() {
            s.finalize();
        }

        info!(
            pairs = series.len(),
            skipped, "Price history materialized for synchronizer"
        );

        Ok(Self {
            registry,
            series,
            clock: None,
            snapshot: PriceSnapshot::default(),
        })
    }

    /// Current logical time, if any step has run
    pub fn time(&self) -> Option<i64> {
        self.clock
    }

    /// Latest snapshot
    pub fn snapshot(&self) -> &PriceSnapshot {
        &self.snapshot
    }

    /// Advance the logical clock and recompute the snapshot
    ///
    /// Steps must be presented in strictly increasing time order; a
    /// non-increasing timestamp is a caller contract violation.
    pub fn advance(&mut self, timestamp: i64) -> &PriceSnapshot {
        if let Some(clock) = self.clock {
            assert!(
                timestamp > clock,
                "Synchronizer stepped backwards: {} after {}",
                timestamp,
                clock
            );
        }
        self.clock = Some(timestamp);

        let mut prices = HashMap::new();
        for venue in self.registry.venues() {
            for instrument in self.registry.instruments() {
                if let Some(series) = self.series.get(&(venue, instrument)) {
                    // Exact match preferred, else nearest sample at or
                    // before the timestamp; same as-of semantics as the
                    // funding store.
                    if let Some(price) = series.as_of(timestamp) {
                        prices.insert((venue, instrument), price);
                    }
                }
            }
        }

        debug!(
            timestamp,
            resolved = prices.len(),
            "Advanced simulation clock"
        );

        self.snapshot = PriceSnapshot { timestamp, prices };
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArbConfig;

    fn price(ts: i64, venue: &str, instrument: &str, price: &str) -> PriceSample {
        PriceSample {
            timestamp: ts,
            venue: venue.to_string(),
            instrument: instrument.to_string(),
            price: price.parse().unwrap(),
        }
    }

    fn test_registry() -> Arc<MarketRegistry> {
        Arc::new(MarketRegistry::from_config(&ArbConfig::default()).unwrap())
    }

    #[test]
    fn test_snapshot_covers_all_pairs_with_history() {
        let registry = test_registry();
        let mut sync = PriceSynchronizer::new(
            registry.clone(),
            &[
                price(1000, "lighter_perpetual", "KAITO", "1.50"),
                price(1000, "extended_perpetual", "KAITO", "1.51"),
                price(900, "lighter_perpetual", "SUI", "3.10"),
            ],
        )
        .unwrap();

        assert_eq!(sync.time(), None);
        let snapshot = sync.advance(1000);
        let lighter = registry.venue("lighter_perpetual").unwrap();
        let extended = registry.venue("extended_perpetual").unwrap();
        let kaito = registry.instrument("KAITO").unwrap();
        let sui = registry.instrument("SUI").unwrap();

        assert_eq!(snapshot.price(lighter, kaito), Some("1.50".parse().unwrap()));
        assert_eq!(
            snapshot.price(extended, kaito),
            Some("1.51".parse().unwrap())
        );
        // Nearest sample at or before the timestamp.
        assert_eq!(snapshot.price(lighter, sui), Some("3.10".parse().unwrap()));
        // No history for this pair: omitted, not defaulted.
        assert_eq!(snapshot.price(extended, sui), None);
    }

    #[test]
    fn test_pair_with_only_future_samples_omitted() {
        let registry = test_registry();
        let mut sync = PriceSynchronizer::new(
            registry.clone(),
            &[price(2000, "lighter_perpetual", "KAITO", "1.50")],
        )
        .unwrap();

        let snapshot = sync.advance(1000);
        assert!(snapshot.is_empty());
    }

    #[test]
    #[should_panic(expected = "stepped backwards")]
    fn test_non_increasing_step_panics() {
        let registry = test_registry();
        let mut sync = PriceSynchronizer::new(registry, &[]).unwrap();
        sync.advance(1000);
        sync.advance(1000);
    }
}
