//! Historical market data: sample types, time series storage, rate provider

pub mod provider;
pub mod store;

pub use provider::{BestSpread, FundingRateProvider};
pub use store::{Series, TimeSeriesStore};

use crate::{FundingArbError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One historical funding rate observation
///
/// The rate is per funding interval as reported by the venue, not yet
/// normalized to a common time basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingSample {
    /// Unix timestamp in seconds
    pub timestamp: i64,
    /// Venue name
    pub venue: String,
    /// Instrument (base token) symbol
    pub instrument: String,
    /// Funding rate per payment interval
    pub rate: Decimal,
}

/// One historical price observation for a (venue, instrument) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    /// Unix timestamp in seconds
    pub timestamp: i64,
    /// Venue name
    pub venue: String,
    /// Instrument (base token) symbol
    pub instrument: String,
    /// Mid/close price in quote currency
    pub price: Decimal,
}

/// Load funding samples from a JSON array file
///
/// The upstream ETL is expected to have deduplicated and normalized records
/// already; this only deserializes them.
pub fn load_funding_samples<P: AsRef<Path>>(path: P) -> Result<Vec<FundingSample>> {
    let content = std::fs::read_to_string(&path)
        .map_err(|e| FundingArbError::Data(format!("Failed to read funding data file: {}", e)))?;

    let samples: Vec<FundingSample> = serde_json::from_str(&content)
        .map_err(|e| FundingArbError::Data(format!("Failed to parse funding data: {}", e)))?;

    Ok(samples)
}

/// Load price samples from a JSON array file
pub fn load_price_samples<P: AsRef<Path>>(path: P) -> Result<Vec<PriceSample>> {
    let content = std::fs::read_to_string(&path)
        .map_err(|e| FundingArbError::Data(format!("Failed to read price data file: {}", e)))?;

    let samples: Vec<PriceSample> = serde_json::from_str(&content)
        .map_err(|e| FundingArbError::Data(format!("Failed to parse price data: {}", e)))?;

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_funding_sample_roundtrip() {
        let sample = FundingSample {
            timestamp: 1000,
            venue: "lighter_perpetual".to_string(),
            instrument: "KAITO".to_string(),
            rate: Decimal::new(2, 3),
        };

        let json = serde_json::to_string(&sample).unwrap();
        let parsed: FundingSample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample, parsed);
    }

    #[test]
    fn test_load_funding_samples_from_file() {
        let samples = vec![
            FundingSample {
                timestamp: 1000,
                venue: "lighter_perpetual".to_string(),
                instrument: "KAITO".to_string(),
                rate: Decimal::new(2, 3),
            },
            FundingSample {
                timestamp: 2000,
                venue: "extended_perpetual".to_string(),
                instrument: "KAITO".to_string(),
                rate: Decimal::new(-1, 3),
            },
        ];

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(serde_json::to_string(&samples).unwrap().as_bytes())
            .unwrap();

        let loaded = load_funding_samples(temp_file.path()).unwrap();
        assert_eq!(loaded, samples);
    }
}
