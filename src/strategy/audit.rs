//! Append-only decision audit log
//!
//! Every entry and exit decision is recorded with the rates it was based
//! on, so post-hoc tooling can verify that no decision used data from the
//! future.

use crate::{FundingArbError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Kind of decision recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionAction {
    /// Position entry
    Enter,
    /// Position exit
    Exit,
}

impl fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionAction::Enter => write!(f, "ENTER"),
            DecisionAction::Exit => write!(f, "EXIT"),
        }
    }
}

/// One audit record; write-once, never mutated
#[derive(Debug, Clone, Serialize)]
pub struct DecisionLogEntry {
    /// Decision timestamp (for entries: the delayed decision time)
    pub timestamp: i64,
    /// Entry or exit
    pub action: DecisionAction,
    /// Instrument name
    pub instrument: String,
    /// Normalized hourly spread backing the decision
    pub spread: Decimal,
    /// Human-readable reason (empty for entries)
    pub reason: String,
    /// Raw per-interval rate per venue at decision time
    pub rates: BTreeMap<String, Decimal>,
}

/// Append-only sequence of decision records
#[derive(Debug, Default)]
pub struct DecisionLog {
    entries: Vec<DecisionLogEntry>,
}

impl DecisionLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry decision
    pub fn record_enter(
        &mut self,
        timestamp: i64,
        instrument: &str,
        spread: Decimal,
        rates: BTreeMap<String, Decimal>,
    ) {
        self.entries.push(DecisionLogEntry {
            timestamp,
            action: DecisionAction::Enter,
            instrument: instrument.to_string(),
            spread,
            reason: String::new(),
            rates,
        });
    }

    /// Record an exit decision
    pub fn record_exit(
        &mut self,
        timestamp: i64,
        instrument: &str,
        spread: Decimal,
        reason: &str,
        rates: BTreeMap<String, Decimal>,
    ) {
        self.entries.push(DecisionLogEntry {
            timestamp,
            action: DecisionAction::Exit,
            instrument: instrument.to_string(),
            spread,
            reason: reason.to_string(),
            rates,
        });
    }

    /// All records, in append order
    pub fn entries(&self) -> &[DecisionLogEntry] {
        &self.entries
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the full log as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.entries)
            .map_err(|e| FundingArbError::Data(format!("Failed to serialize decision log: {}", e)).into())
    }

    /// Write the full log as JSON for external reporting tools
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(&path, self.to_json()?)
            .map_err(|e| FundingArbError::Data(format!("Failed to write decision log: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_append_in_order() {
        let mut log = DecisionLog::new();
        let mut rates = BTreeMap::new();
        rates.insert("lighter_perpetual".to_string(), Decimal::new(2, 3));

        log.record_enter(1000, "KAITO", Decimal::new(3, 3), rates.clone());
        log.record_exit(2000, "KAITO", Decimal::new(1, 3), "max duration", rates);

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].action, DecisionAction::Enter);
        assert_eq!(log.entries()[1].action, DecisionAction::Exit);
        assert_eq!(log.entries()[1].reason, "max duration");
    }

    #[test]
    fn test_json_export_field_names() {
        let mut log = DecisionLog::new();
        let mut rates = BTreeMap::new();
        rates.insert("lighter_perpetual".to_string(), Decimal::new(2, 3));
        log.record_enter(1000, "KAITO", Decimal::new(3, 3), rates);

        let json = log.to_json().unwrap();
        assert!(json.contains("\"action\": \"ENTER\""));
        assert!(json.contains("\"instrument\": \"KAITO\""));
        assert!(json.contains("\"timestamp\": 1000"));
        assert!(json.contains("lighter_perpetual"));
    }
}
