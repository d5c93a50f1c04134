//! Persistence port trait.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::AnalyzerError;

/// Durable storage of enriched bars keyed by `(date, instrument)`.
pub trait StorePort {
    /// Insert or replace every bar of `series` in one transaction. Returns the
    /// number of distinct `(date, instrument)` keys written; when `series`
    /// repeats a date the last bar for it is the one stored. On failure nothing
    /// from this call is committed.
    fn upsert(&self, series: &BarSeries) -> Result<usize, AnalyzerError>;
}
