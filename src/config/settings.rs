//! Configuration validation utilities

use crate::{FundingArbError, Result};
use rust_decimal::Decimal;

/// Configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a token symbol format
    pub fn validate_token(token: &str) -> Result<()> {
        if token.is_empty() {
            return Err(FundingArbError::Config("Token cannot be empty".to_string()).into());
        }

        if !token.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FundingArbError::Config(format!(
                "Token '{}' must contain only alphanumeric characters",
                token
            ))
            .into());
        }

        Ok(())
    }

    /// Validate a strictly positive decimal value
    pub fn validate_positive_decimal(value: Decimal, name: &str) -> Result<()> {
        if value <= Decimal::ZERO {
            return Err(FundingArbError::Config(format!("{} must be positive", name)).into());
        }
        Ok(())
    }

    /// Validate a value in the open interval (0, 1)
    pub fn validate_open_unit_interval(value: Decimal, name: &str) -> Result<()> {
        if value <= Decimal::ZERO || value >= Decimal::ONE {
            return Err(FundingArbError::Config(format!(
                "{} must be strictly between 0 and 1",
                name
            ))
            .into());
        }
        Ok(())
    }
}

/// Configuration defaults
pub struct ConfigDefaults;

impl ConfigDefaults {
    /// Default execution delay between funding data and safe execution
    pub const EXECUTION_DELAY_SECS: u64 = 120;

    /// Default forward/backward fill bound for interpolation (2 hours)
    pub const MAX_INTERPOLATION_GAP_SECS: u64 = 2 * 3600;

    /// Common hourly basis used to compare funding rates across venues
    pub const HOURLY_BASIS_SECS: u64 = 3600;
}
