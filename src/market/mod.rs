//! Venue and instrument identifiers
//!
//! String venue/token names are interned once at startup into small integer
//! tags, keeping the hot query paths free of repeated string hashing.

use crate::{ArbConfig, FundingArbError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Interned venue identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VenueId(pub u16);

/// Interned instrument identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentId(pub u16);

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "venue#{}", self.0)
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instrument#{}", self.0)
    }
}

/// Registry of tracked venues and instruments
///
/// Names are registered sorted lexically, so iterating ids in ascending
/// order is the fixed, deterministic iteration order used everywhere a
/// tie-break depends on it.
#[derive(Debug, Clone)]
pub struct MarketRegistry {
    venue_names: Vec<String>,
    venue_intervals: Vec<u64>,
    venue_index: HashMap<String, VenueId>,
    instrument_names: Vec<String>,
    instrument_index: HashMap<String, InstrumentId>,
}

impl MarketRegistry {
    /// Build the registry from a validated configuration
    pub fn from_config(config: &ArbConfig) -> Result<Self> {
        let mut venue_names = Vec::new();
        let mut venue_intervals = Vec::new();
        let mut venue_index = HashMap::new();

        // BTreeSet iteration is already lexical.
        for name in &config.connectors {
            let interval = config
                .venue_funding_interval_seconds
                .get(name)
                .copied()
                .ok_or_else(|| {
                    FundingArbError::Config(format!("Missing funding interval for venue '{}'", name))
                })?;
            let id = VenueId(venue_names.len() as u16);
            venue_index.insert(name.clone(), id);
            venue_names.push(name.clone());
            venue_intervals.push(interval);
        }

        let mut instrument_names = Vec::new();
        let mut instrument_index = HashMap::new();
        for name in &config.tokens {
            let id = InstrumentId(instrument_names.len() as u16);
            instrument_index.insert(name.clone(), id);
            instrument_names.push(name.clone());
        }

        Ok(Self {
            venue_names,
            venue_intervals,
            venue_index,
            instrument_names,
            instrument_index,
        })
    }

    /// Resolve a venue name to its id
    pub fn venue(&self, name: &str) -> Option<VenueId> {
        self.venue_index.get(name).copied()
    }

    /// Resolve an instrument name to its id
    pub fn instrument(&self, name: &str) -> Option<InstrumentId> {
        self.instrument_index.get(name).copied()
    }

    /// Venue name for an id
    pub fn venue_name(&self, id: VenueId) -> &str {
        &self.venue_names[id.0 as usize]
    }

    /// Instrument name for an id
    pub fn instrument_name(&self, id: InstrumentId) -> &str {
        &self.instrument_names[id.0 as usize]
    }

    /// Funding payment interval for a venue, in seconds
    pub fn funding_interval_secs(&self, id: VenueId) -> u64 {
        self.venue_intervals[id.0 as usize]
    }

    /// All venue ids in deterministic (lexical) order
    pub fn venues(&self) -> impl Iterator<Item = VenueId> + '_ {
        (0..self.venue_names.len()).map(|i| VenueId(i as u16))
    }

    /// All instrument ids in deterministic (lexical) order
    pub fn instruments(&self) -> impl Iterator<Item = InstrumentId> + '_ {
        (0..self.instrument_names.len()).map(|i| InstrumentId(i as u16))
    }

    /// Number of tracked venues
    pub fn venue_count(&self) -> usize {
        self.venue_names.len()
    }

    /// Number of tracked instruments
    pub fn instrument_count(&self) -> usize {
        self.instrument_names.len()
    }

    /// Canonical trading pair for an instrument (USD quote suffix)
    pub fn trading_pair(&self, id: InstrumentId) -> String {
        format!("{}-USD", self.instrument_name(id))
    }
}
