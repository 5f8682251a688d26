//! Opportunity scanner
//!
//! Stateless pass over all tracked instruments once per step. The execution
//! delay is applied here and nowhere else: every entry decision is based on
//! rates as of `current_time - execution_delay_seconds`, modeling the lag
//! between a funding event and safe execution.

use crate::config::ArbConfig;
use crate::data::FundingRateProvider;
use crate::log_spread;
use crate::market::InstrumentId;
use crate::strategy::{ArbitrageOpportunity, DecisionLog};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::collections::HashSet;
use tracing::debug;

/// Scans for funding rate arbitrage entries above the profitability threshold
#[derive(Debug)]
pub struct OpportunityScanner {
    min_profitability: Decimal,
    execution_delay_seconds: i64,
}

impl OpportunityScanner {
    /// Create a scanner from a validated configuration
    pub fn new(config: &ArbConfig) -> Self {
        Self {
            min_profitability: config.min_funding_rate_profitability,
            execution_delay_seconds: config.execution_delay_seconds as i64,
        }
    }

    /// The delayed time-of-knowledge for a scan at `current_time`
    pub fn decision_time(&self, current_time: i64) -> i64 {
        current_time - self.execution_delay_seconds
    }

    /// Scan all tracked instruments for entry candidates
    ///
    /// `excluded` holds instruments with an open position plus any freed
    /// earlier in the same step; those are not eligible for (re-)entry
    /// until the next step. Emits one ENTER audit record per opportunity,
    /// stamped with the decision time.
    pub fn scan(
        &self,
        current_time: i64,
        provider: &FundingRateProvider,
        excluded: &HashSet<InstrumentId>,
        log: &mut DecisionLog,
    ) -> Vec<ArbitrageOpportunity> {
        let decision_time = self.decision_time(current_time);
        let registry = provider.registry();
        let mut opportunities = Vec::new();

        for instrument in registry.instruments() {
            if excluded.contains(&instrument) {
                continue;
            }

            let rates = provider.get_rates_for_instrument(decision_time, instrument);

            // Partial venue coverage disqualifies the instrument this step.
            if !provider.has_full_coverage(&rates) {
                debug!(
                    instrument = %registry.instrument_name(instrument),
                    available = rates.len(),
                    required = registry.venue_count(),
                    "Skipping instrument with partial venue coverage"
                );
                continue;
            }

            let Some(best) = provider.best_spread_from_rates(&rates) else {
                continue;
            };

            if best.spread_hourly < self.min_profitability {
                continue;
            }

            log_spread!(
                info,
                registry.instrument_name(instrument),
                registry.venue_name(best.venue_long),
                registry.venue_name(best.venue_short),
                best.spread_hourly,
                decision_time,
                "Arbitrage opportunity detected"
            );

            let named_rates: BTreeMap<String, Decimal> = rates
                .iter()
                .map(|(venue, rate)| (registry.venue_name(*venue).to_string(), *rate))
                .collect();
            log.record_enter(
                decision_time,
                registry.instrument_name(instrument),
                best.spread_hourly,
                named_rates,
            );

            opportunities.push(ArbitrageOpportunity {
                instrument,
                venue_long: best.venue_long,
                venue_short: best.venue_short,
                spread_hourly: best.spread_hourly,
                decision_time,
                as_of_rates: rates,
            });
        }

        opportunities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FundingSample, TimeSeriesStore};
    use crate::market::MarketRegistry;
    use std::sync::Arc;

    fn sample(ts: i64, venue: &str, instrument: &str, rate: &str) -> FundingSample {
        FundingSample {
            timestamp: ts,
            venue: venue.to_string(),
            instrument: instrument.to_string(),
            rate: rate.parse().unwrap(),
        }
    }

    fn hourly_config() -> ArbConfig {
        // Both venues on an hourly interval so raw rates compare directly.
        let mut config = ArbConfig::default();
        config
            .venue_funding_interval_seconds
            .insert("extended_perpetual".to_string(), 3600);
        config
    }

    fn build_provider(config: &ArbConfig, samples: Vec<FundingSample>) -> FundingRateProvider {
        let registry = Arc::new(MarketRegistry::from_config(config).unwrap());
        let mut store = TimeSeriesStore::new(registry.clone());
        store.load(&samples).unwrap();
        FundingRateProvider::new(registry, store)
    }

    #[test]
    fn test_opportunity_emitted_above_threshold() {
        let mut config = hourly_config();
        config.min_funding_rate_profitability = "0.0025".parse().unwrap();
        let provider = build_provider(
            &config,
            vec![
                sample(1000, "extended_perpetual", "KAITO", "0.002"),
                sample(1000, "lighter_perpetual", "KAITO", "-0.001"),
            ],
        );

        let scanner = OpportunityScanner::new(&config);
        let mut log = DecisionLog::new();
        let opportunities = scanner.scan(1120, &provider, &HashSet::new(), &mut log);

        assert_eq!(opportunities.len(), 1);
        let opp = &opportunities[0];
        assert_eq!(opp.spread_hourly, "0.003".parse().unwrap());
        assert_eq!(opp.decision_time, 1000);
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].timestamp, 1000);
    }

    #[test]
    fn test_no_opportunity_below_threshold() {
        let mut config = hourly_config();
        config.min_funding_rate_profitability = "0.004".parse().unwrap();
        let provider = build_provider(
            &config,
            vec![
                sample(1000, "extended_perpetual", "KAITO", "0.002"),
                sample(1000, "lighter_perpetual", "KAITO", "-0.001"),
            ],
        );

        let scanner = OpportunityScanner::new(&config);
        let mut log = DecisionLog::new();
        let opportunities = scanner.scan(1120, &provider, &HashSet::new(), &mut log);

        assert!(opportunities.is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn test_execution_delay_selects_older_sample() {
        // Data at t=1000 and t=1100; scanning at t=1150 with a 120s delay
        // queries t=1030 and must see the t=1000 sample, not t=1100.
        let mut config = hourly_config();
        config.min_funding_rate_profitability = "0.0025".parse().unwrap();
        let provider = build_provider(
            &config,
            vec![
                sample(1000, "extended_perpetual", "KAITO", "0.002"),
                sample(1000, "lighter_perpetual", "KAITO", "-0.001"),
                sample(1100, "extended_perpetual", "KAITO", "0.010"),
                sample(1100, "lighter_perpetual", "KAITO", "-0.010"),
            ],
        );

        let scanner = OpportunityScanner::new(&config);
        let mut log = DecisionLog::new();
        let opportunities = scanner.scan(1150, &provider, &HashSet::new(), &mut log);

        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].decision_time, 1030);
        assert_eq!(opportunities[0].spread_hourly, "0.003".parse().unwrap());
    }

    #[test]
    fn test_partial_coverage_skips_instrument() {
        let mut config = hourly_config();
        config.min_funding_rate_profitability = "0.0001".parse().unwrap();
        let provider = build_provider(
            &config,
            vec![sample(1000, "lighter_perpetual", "KAITO", "0.002")],
        );

        let scanner = OpportunityScanner::new(&config);
        let mut log = DecisionLog::new();
        let opportunities = scanner.scan(1120, &provider, &HashSet::new(), &mut log);

        assert!(opportunities.is_empty());
    }

    #[test]
    fn test_excluded_instrument_not_scanned() {
        let mut config = hourly_config();
        config.min_funding_rate_profitability = "0.0001".parse().unwrap();
        let provider = build_provider(
            &config,
            vec![
                sample(1000, "extended_perpetual", "KAITO", "0.002"),
                sample(1000, "lighter_perpetual", "KAITO", "-0.001"),
            ],
        );
        let kaito = provider.registry().instrument("KAITO").unwrap();

        let scanner = OpportunityScanner::new(&config);
        let mut log = DecisionLog::new();
        let excluded: HashSet<_> = [kaito].into_iter().collect();
        let opportunities = scanner.scan(1120, &provider, &excluded, &mut log);

        assert!(opportunities.is_empty());
    }
}
