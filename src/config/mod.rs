//! Configuration management module

pub mod settings;

pub use settings::*;

use crate::{FundingArbError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Main configuration structure for the funding rate arbitrage backtester
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbConfig {
    /// Tracked perpetual venues (at least two required)
    pub connectors: BTreeSet<String>,
    /// Tracked instruments (base token symbols)
    pub tokens: BTreeSet<String>,
    /// Leverage applied to both legs
    pub leverage: u32,
    /// Minimum hourly funding spread to enter (e.g. 0.003 for 0.3%)
    pub min_funding_rate_profitability: Decimal,
    /// Position size per side in quote currency
    pub position_size_quote: Decimal,
    /// Exit when the current spread falls below this absolute level
    pub absolute_min_spread_exit: Decimal,
    /// Exit when current/entry spread drops below this ratio (in (0, 1))
    pub compression_exit_threshold: Decimal,
    /// Maximum position holding time in hours
    pub max_position_duration_hours: u64,
    /// Stop loss as a fraction of total position value (e.g. 0.03 for 3%)
    pub max_loss_per_position_pct: Decimal,
    /// Data propagation delay subtracted before entry queries, in seconds
    pub execution_delay_seconds: u64,
    /// Funding payment interval per venue, in seconds
    pub venue_funding_interval_seconds: BTreeMap<String, u64>,
}

impl ArbConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| FundingArbError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ArbConfig = toml::from_str(&content)
            .map_err(|e| FundingArbError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Must be called before any simulation step runs; every violation here
    /// is fatal at startup.
    pub fn validate(&self) -> Result<()> {
        if self.connectors.len() < 2 {
            return Err(FundingArbError::Config(
                "At least two venues required for arbitrage".to_string(),
            )
            .into());
        }

        if self.tokens.is_empty() {
            return Err(FundingArbError::Config("At least one token required".to_string()).into());
        }

        for token in &self.tokens {
            ConfigValidator::validate_token(token)?;
        }

        if self.leverage == 0 {
            return Err(FundingArbError::Config("Leverage must be positive".to_string()).into());
        }

        ConfigValidator::validate_positive_decimal(
            self.min_funding_rate_profitability,
            "min_funding_rate_profitability",
        )?;
        ConfigValidator::validate_positive_decimal(
            self.position_size_quote,
            "position_size_quote",
        )?;
        ConfigValidator::validate_positive_decimal(
            self.max_loss_per_position_pct,
            "max_loss_per_position_pct",
        )?;

        if self.absolute_min_spread_exit < Decimal::ZERO {
            return Err(FundingArbError::Config(
                "absolute_min_spread_exit must not be negative".to_string(),
            )
            .into());
        }

        ConfigValidator::validate_open_unit_interval(
            self.compression_exit_threshold,
            "compression_exit_threshold",
        )?;

        if self.max_position_duration_hours == 0 {
            return Err(FundingArbError::Config(
                "max_position_duration_hours must be positive".to_string(),
            )
            .into());
        }

        // Every tracked venue needs a funding interval or rate normalization
        // cannot run.
        for venue in &self.connectors {
            match self.venue_funding_interval_seconds.get(venue) {
                Some(interval) if *interval > 0 => {}
                Some(_) => {
                    return Err(FundingArbError::Config(format!(
                        "Funding interval for venue '{}' must be positive",
                        venue
                    ))
                    .into());
                }
                None => {
                    return Err(FundingArbError::Config(format!(
                        "Missing funding interval for venue '{}'",
                        venue
                    ))
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Maximum position duration in seconds
    pub fn max_position_duration_secs(&self) -> i64 {
        self.max_position_duration_hours as i64 * 3600
    }
}

impl Default for ArbConfig {
    fn default() -> Self {
        let connectors: BTreeSet<String> = ["extended_perpetual", "lighter_perpetual"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let tokens: BTreeSet<String> = [
            "KAITO", "IP", "GRASS", "ZEC", "APT", "SUI", "TRUMP", "LDO", "OP", "SEI",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut venue_funding_interval_seconds = BTreeMap::new();
        venue_funding_interval_seconds.insert("extended_perpetual".to_string(), 3600 * 8);
        venue_funding_interval_seconds.insert("lighter_perpetual".to_string(), 3600);

        Self {
            connectors,
            tokens,
            leverage: 5,
            min_funding_rate_profitability: Decimal::new(3, 3), // 0.3% hourly
            position_size_quote: Decimal::new(500, 0),          // $500 per side
            absolute_min_spread_exit: Decimal::new(2, 3),       // 0.2%
            compression_exit_threshold: Decimal::new(4, 1),     // exit below 40% of entry
            max_position_duration_hours: 24,
            max_loss_per_position_pct: Decimal::new(3, 2), // 3% stop loss
            execution_delay_seconds: ConfigDefaults::EXECUTION_DELAY_SECS,
            venue_funding_interval_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_validation() {
        let config = ArbConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fewer_than_two_venues_rejected() {
        let mut config = ArbConfig::default();
        config.connectors = ["extended_perpetual".to_string()].into_iter().collect();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_funding_interval_rejected() {
        let mut config = ArbConfig::default();
        config
            .venue_funding_interval_seconds
            .remove("lighter_perpetual");

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_leverage_rejected() {
        let mut config = ArbConfig::default();
        config.leverage = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_compression_threshold_bounds() {
        let mut config = ArbConfig::default();
        config.compression_exit_threshold = Decimal::ONE;
        assert!(config.validate().is_err());

        config.compression_exit_threshold = Decimal::ZERO;
        assert!(config.validate().is_err());

        config.compression_exit_threshold = Decimal::new(4, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = ArbConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(!toml_str.is_empty());

        let parsed_config: ArbConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.connectors, parsed_config.connectors);
        assert_eq!(
            config.min_funding_rate_profitability,
            parsed_config.min_funding_rate_profitability
        );
    }

    #[test]
    fn test_config_from_file() {
        let config = ArbConfig::default();
        let toml_content = toml::to_string(&config).unwrap();

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let loaded_config = ArbConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.tokens, loaded_config.tokens);
    }
}
