//! Time series storage with as-of queries
//!
//! Holds one ordered series per (venue, instrument) pair and answers
//! "value as of time T" queries. `Series::as_of` is the single causality
//! checkpoint of the whole backtest: no sample with a timestamp greater
//! than the query time is ever returned.

use crate::data::FundingSample;
use crate::market::{InstrumentId, MarketRegistry, VenueId};
use crate::{FundingArbError, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

/// Ordered sequence of (timestamp, value) samples
#[derive(Debug, Clone, Default)]
pub struct Series {
    points: Vec<(i64, Decimal)>,
}

impl Series {
    /// Append a raw sample (ordering restored by `finalize`)
    pub fn push(&mut self, timestamp: i64, value: Decimal) {
        self.points.push((timestamp, value));
    }

    /// Sort by timestamp and collapse duplicate timestamps, keeping the
    /// last-loaded value for each
    pub fn finalize(&mut self) {
        // Stable sort preserves load order among equal timestamps, so the
        // last element of each run is the last-loaded one.
        self.points.sort_by_key(|(ts, _)| *ts);

        let mut collapsed: Vec<(i64, Decimal)> = Vec::with_capacity(self.points.len());
        for &(ts, value) in &self.points {
            match collapsed.last_mut() {
                Some(last) if last.0 == ts => last.1 = value,
                _ => collapsed.push((ts, value)),
            }
        }
        self.points = collapsed;
    }

    /// Value from the sample with the greatest timestamp `<= time`
    pub fn as_of(&self, time: i64) -> Option<Decimal> {
        let idx = self.points.partition_point(|(ts, _)| *ts <= time);
        if idx == 0 {
            None
        } else {
            Some(self.points[idx - 1].1)
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series holds no samples
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Timestamps of all samples, in order
    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        self.points.iter().map(|(ts, _)| *ts)
    }

    fn exact(&self, time: i64) -> Option<Decimal> {
        self.points
            .binary_search_by_key(&time, |(ts, _)| *ts)
            .ok()
            .map(|idx| self.points[idx].1)
    }
}

/// In-memory store of funding rate series per (venue, instrument) pair
///
/// Populated once up front, then read-only during replay.
#[derive(Debug)]
pub struct TimeSeriesStore {
    registry: Arc<MarketRegistry>,
    series: Vec<Series>,
    loaded: bool,
}

impl TimeSeriesStore {
    /// Create an empty store for the registry's tracked pairs
    pub fn new(registry: Arc<MarketRegistry>) -> Self {
        let slots = registry.venue_count() * registry.instrument_count();
        Self {
            registry,
            series: vec![Series::default(); slots],
            loaded: false,
        }
    }

    fn slot(&self, venue: VenueId, instrument: InstrumentId) -> usize {
        venue.0 as usize * self.registry.instrument_count() + instrument.0 as usize
    }

    /// Bulk-insert funding samples
    ///
    /// Samples for untracked instruments are skipped; a sample referencing a
    /// venue with no configured funding interval is a data error. Duplicate
    /// (timestamp, venue, instrument) tuples keep the last-loaded value.
    pub fn load(&mut self, records: &[FundingSample]) -> Result<()> {
        let mut inserted = 0usize;
        let mut skipped = 0usize;

        for record in records {
            let venue = self.registry.venue(&record.venue).ok_or_else(|| {
                FundingArbError::Data(format!(
                    "Funding sample references unknown venue '{}'",
                    record.venue
                ))
            })?;

            let Some(instrument) = self.registry.instrument(&record.instrument) else {
                skipped += 1;
                continue;
            };

            let slot = self.slot(venue, instrument);
            self.series[slot].push(record.timestamp, record.rate);
            inserted += 1;
        }

        for series in &mut self.series {
            series.finalize();
        }
        self.loaded = true;

        info!(
            inserted,
            skipped, "Loaded funding samples into time series store"
        );
        Ok(())
    }

    /// Rate from the most recent sample at or before `time`
    ///
    /// Panics if called before any `load`; that is a caller contract
    /// violation, not a recoverable condition. A pair that was never loaded
    /// simply returns `None`.
    pub fn query_as_of(
        &self,
        venue: VenueId,
        instrument: InstrumentId,
        time: i64,
    ) -> Option<Decimal> {
        assert!(
            self.loaded,
            "TimeSeriesStore queried before load() was called"
        );
        self.series[self.slot(venue, instrument)].as_of(time)
    }

    /// Earliest and latest sample timestamps across all series
    pub fn time_bounds(&self) -> Option<(i64, i64)> {
        let mut bounds: Option<(i64, i64)> = None;
        for series in &self.series {
            for ts in series.timestamps() {
                bounds = Some(match bounds {
                    None => (ts, ts),
                    Some((lo, hi)) => (lo.min(ts), hi.max(ts)),
                });
            }
        }
        bounds
    }

    /// Union of distinct sample timestamps across all series, in order
    pub fn step_timestamps(&self) -> Vec<i64> {
        let mut all: Vec<i64> = self
            .series
            .iter()
            .flat_map(|s| s.timestamps())
            .collect();
        all.sort_unstable();
        all.dedup();
        all
    }

    /// Forward-fill then back-fill each series onto its venue's time grid
    ///
    /// A gap is only ever bridged when the nearest real sample lies within
    /// `max_gap_seconds`; grid points further away than that are dropped
    /// rather than guessed.
    pub fn interpolate(&mut self, max_gap_seconds: u64) {
        let max_gap = max_gap_seconds as i64;
        let n_instruments = self.registry.instrument_count();

        for venue in self.registry.venues() {
            // Uniform grid for this venue: union of timestamps across all of
            // its instrument series.
            let mut grid: Vec<i64> = Vec::new();
            for instrument in self.registry.instruments() {
                let slot = venue.0 as usize * n_instruments + instrument.0 as usize;
                grid.extend(self.series[slot].timestamps());
            }
            grid.sort_unstable();
            grid.dedup();

            if grid.is_empty() {
                continue;
            }

            for instrument in self.registry.instruments() {
                let slot = venue.0 as usize * n_instruments + instrument.0 as usize;
                let series = &self.series[slot];
                if series.is_empty() {
                    continue;
                }

                let exact: Vec<Option<Decimal>> =
                    grid.iter().map(|ts| series.exact(*ts)).collect();
                let mut filled = exact.clone();

                // Forward pass: carry the last real sample within the bound.
                let mut last_real: Option<(i64, Decimal)> = None;
                for (i, ts) in grid.iter().enumerate() {
                    match exact[i] {
                        Some(value) => last_real = Some((*ts, value)),
                        None => {
                            if let Some((real_ts, value)) = last_real {
                                if ts - real_ts <= max_gap {
                                    filled[i] = Some(value);
                                }
                            }
                        }
                    }
                }

                // Backward pass: fill remaining holes from the next real
                // sample within the bound.
                let mut next_real: Option<(i64, Decimal)> = None;
                for (i, ts) in grid.iter().enumerate().rev() {
                    match exact[i] {
                        Some(value) => next_real = Some((*ts, value)),
                        None => {
                            if filled[i].is_none() {
                                if let Some((real_ts, value)) = next_real {
                                    if real_ts - ts <= max_gap {
                                        filled[i] = Some(value);
                                    }
                                }
                            }
                        }
                    }
                }

                let before = series.len();
                let mut dense = Series::default();
                for (i, ts) in grid.iter().enumerate() {
                    if let Some(value) = filled[i] {
                        dense.push(*ts, value);
                    }
                }
                debug!(
                    venue = %self.registry.venue_name(venue),
                    instrument = %self.registry.instrument_name(instrument),
                    before,
                    after = dense.len(),
                    "Interpolated funding series"
                );
                self.series[slot] = dense;
            }
        }
    }
}
