//! Funding rate provider
//!
//! Wraps the time series store with venue/instrument normalization,
//! multi-venue batch queries, and best-spread search on a common hourly
//! basis.

use crate::config::ConfigDefaults;
use crate::data::TimeSeriesStore;
use crate::market::{InstrumentId, MarketRegistry, VenueId};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Most profitable venue pair for an instrument at a point in time
///
/// The side convention follows the venue-reported rate sign at face value:
/// the leg on the lower normalized rate venue is bought, the higher one is
/// sold, which is what captures the spread as funding income.
#[derive(Debug, Clone, PartialEq)]
pub struct BestSpread {
    /// Venue to go long (lower hourly funding rate)
    pub venue_long: VenueId,
    /// Venue to go short (higher hourly funding rate)
    pub venue_short: VenueId,
    /// Absolute spread normalized to an hourly basis
    pub spread_hourly: Decimal,
}

/// Time-aware funding rate provider over the store
#[derive(Debug)]
pub struct FundingRateProvider {
    registry: Arc<MarketRegistry>,
    store: TimeSeriesStore,
}

impl FundingRateProvider {
    /// Create a provider over a populated store
    pub fn new(registry: Arc<MarketRegistry>, store: TimeSeriesStore) -> Self {
        Self { registry, store }
    }

    /// Registry shared with the rest of the system
    pub fn registry(&self) -> &MarketRegistry {
        &self.registry
    }

    /// Underlying time series store
    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    /// Raw per-interval rate for a single venue, as of `time`
    pub fn get_rate(&self, time: i64, venue: VenueId, instrument: InstrumentId) -> Option<Decimal> {
        self.store.query_as_of(venue, instrument, time)
    }

    /// Raw per-interval rates across all tracked venues, as of `time`
    ///
    /// Venues with no data at `time` are omitted from the result, never an
    /// error. Insertion order is the registry's lexical venue order, which
    /// fixes the pair iteration order downstream.
    pub fn get_rates_for_instrument(
        &self,
        time: i64,
        instrument: InstrumentId,
    ) -> IndexMap<VenueId, Decimal> {
        let mut rates = IndexMap::new();
        for venue in self.registry.venues() {
            if let Some(rate) = self.get_rate(time, venue, instrument) {
                rates.insert(venue, rate);
            }
        }
        rates
    }

    /// Whether every tracked venue reported a rate
    ///
    /// Partial coverage disqualifies an instrument for the time step; there
    /// is no partial-venue trading.
    pub fn has_full_coverage(&self, rates: &IndexMap<VenueId, Decimal>) -> bool {
        rates.len() == self.registry.venue_count()
    }

    /// Normalize a per-interval rate to the common hourly basis
    pub fn hourly_rate(&self, venue: VenueId, rate: Decimal) -> Decimal {
        // Multiply before dividing so common interval lengths stay exact
        // in decimal arithmetic.
        rate * Decimal::from(ConfigDefaults::HOURLY_BASIS_SECS)
            / Decimal::from(self.registry.funding_interval_secs(venue))
    }

    /// Best (largest) normalized spread over all unordered venue pairs
    ///
    /// Returns `None` when fewer than two venues have data. Ties keep the
    /// first pair encountered in the fixed venue iteration order.
    pub fn best_spread(&self, time: i64, instrument: InstrumentId) -> Option<BestSpread> {
        let rates = self.get_rates_for_instrument(time, instrument);
        self.best_spread_from_rates(&rates)
    }

    /// Best spread over a previously fetched rate map
    pub fn best_spread_from_rates(
        &self,
        rates: &IndexMap<VenueId, Decimal>,
    ) -> Option<BestSpread> {
        if rates.len() < 2 {
            return None;
        }

        let hourly: Vec<(VenueId, Decimal)> = rates
            .iter()
            .map(|(venue, rate)| (*venue, self.hourly_rate(*venue, *rate)))
            .collect();

        let mut best: Option<BestSpread> = None;
        for i in 0..hourly.len() {
            for j in (i + 1)..hourly.len() {
                let (venue_a, rate_a) = hourly[i];
                let (venue_b, rate_b) = hourly[j];
                let spread = (rate_a - rate_b).abs();

                // Strict comparison keeps the first pair on ties.
                if best
                    .as_ref()
                    .map(|b| spread > b.spread_hourly)
                    .unwrap_or(true)
                {
                    let (venue_long, venue_short) = if rate_a < rate_b {
                        (venue_a, venue_b)
                    } else {
                        (venue_b, venue_a)
                    };
                    best = Some(BestSpread {
                        venue_long,
                        venue_short,
                        spread_hourly: spread,
                    });
                }
            }
        }
        best
    }

    /// Normalized spread restricted to two specific venues
    ///
    /// Used by exit checks against a position's own venue pair. Returns
    /// `None` if either venue has no data at `time`.
    pub fn spread_between(
        &self,
        time: i64,
        instrument: InstrumentId,
        venue_a: VenueId,
        venue_b: VenueId,
    ) -> Option<Decimal> {
        let rate_a = self.get_rate(time, venue_a, instrument)?;
        let rate_b = self.get_rate(time, venue_b, instrument)?;

        let hourly_a = self.hourly_rate(venue_a, rate_a);
        let hourly_b = self.hourly_rate(venue_b, rate_b);
        Some((hourly_a - hourly_b).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FundingSample;
    use crate::ArbConfig;

    fn build_provider(samples: Vec<FundingSample>) -> FundingRateProvider {
        let registry = Arc::new(MarketRegistry::from_config(&ArbConfig::default()).unwrap());
        let mut store = TimeSeriesStore::new(registry.clone());
        store.load(&samples).unwrap();
        FundingRateProvider::new(registry, store)
    }

    fn sample(ts: i64, venue: &str, instrument: &str, rate: &str) -> FundingSample {
        FundingSample {
            timestamp: ts,
            venue: venue.to_string(),
            instrument: instrument.to_string(),
            rate: rate.parse().unwrap(),
        }
    }

    #[test]
    fn test_missing_venue_omitted_from_rates() {
        let provider = build_provider(vec![sample(1000, "lighter_perpetual", "KAITO", "0.002")]);
        let kaito = provider.registry().instrument("KAITO").unwrap();

        let rates = provider.get_rates_for_instrument(1000, kaito);
        assert_eq!(rates.len(), 1);
        assert!(!provider.has_full_coverage(&rates));
    }

    #[test]
    fn test_hourly_normalization() {
        let provider = build_provider(vec![
            // Extended pays every 8h, so 0.008 per interval is 0.001 hourly.
            sample(1000, "extended_perpetual", "KAITO", "0.008"),
            sample(1000, "lighter_perpetual", "KAITO", "0.002"),
        ]);
        let registry = provider.registry();
        let extended = registry.venue("extended_perpetual").unwrap();
        let lighter = registry.venue("lighter_perpetual").unwrap();

        assert_eq!(
            provider.hourly_rate(extended, "0.008".parse().unwrap()),
            "0.001".parse().unwrap()
        );
        assert_eq!(
            provider.hourly_rate(lighter, "0.002".parse().unwrap()),
            "0.002".parse().unwrap()
        );

        let kaito = registry.instrument("KAITO").unwrap();
        let best = provider.best_spread(1000, kaito).unwrap();
        assert_eq!(best.spread_hourly, "0.001".parse().unwrap());
        // Long the lower hourly rate (extended), short the higher (lighter).
        assert_eq!(best.venue_long, extended);
        assert_eq!(best.venue_short, lighter);
    }

    #[test]
    fn test_best_spread_scenario_both_hourly() {
        // Both venues hourly, rates 0.002 and -0.001
        // give a 0.003 hourly spread.
        let registry = {
            let mut config = ArbConfig::default();
            config
                .venue_funding_interval_seconds
                .insert("extended_perpetual".to_string(), 3600);
            Arc::new(MarketRegistry::from_config(&config).unwrap())
        };
        let mut store = TimeSeriesStore::new(registry.clone());
        store
            .load(&[
                sample(1000, "extended_perpetual", "KAITO", "0.002"),
                sample(1000, "lighter_perpetual", "KAITO", "-0.001"),
            ])
            .unwrap();
        let provider = FundingRateProvider::new(registry.clone(), store);

        let kaito = registry.instrument("KAITO").unwrap();
        let best = provider.best_spread(1000, kaito).unwrap();
        assert_eq!(best.spread_hourly, "0.003".parse().unwrap());
        assert_eq!(best.venue_long, registry.venue("lighter_perpetual").unwrap());
        assert_eq!(
            best.venue_short,
            registry.venue("extended_perpetual").unwrap()
        );
    }

    #[test]
    fn test_best_spread_requires_two_venues() {
        let provider = build_provider(vec![sample(1000, "lighter_perpetual", "KAITO", "0.002")]);
        let kaito = provider.registry().instrument("KAITO").unwrap();
        assert!(provider.best_spread(1000, kaito).is_none());
    }

    #[test]
    fn test_spread_between_missing_data() {
        let provider = build_provider(vec![sample(1000, "lighter_perpetual", "KAITO", "0.002")]);
        let registry = provider.registry();
        let extended = registry.venue("extended_perpetual").unwrap();
        let lighter = registry.venue("lighter_perpetual").unwrap();
        let kaito = registry.instrument("KAITO").unwrap();

        assert!(provider
            .spread_between(1000, kaito, extended, lighter)
            .is_none());
    }

    #[test]
    fn test_spread_independent_of_venue_order() {
        let provider = build_provider(vec![
            sample(1000, "extended_perpetual", "KAITO", "0.008"),
            sample(1000, "lighter_perpetual", "KAITO", "0.002"),
        ]);
        let registry = provider.registry();
        let extended = registry.venue("extended_perpetual").unwrap();
        let lighter = registry.venue("lighter_perpetual").unwrap();
        let kaito = registry.instrument("KAITO").unwrap();

        let forward = provider.spread_between(1000, kaito, extended, lighter);
        let backward = provider.spread_between(1000, kaito, lighter, extended);
        assert_eq!(forward, backward);
    }
}
