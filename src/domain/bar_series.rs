//! Ordered, date-indexed bars for a single instrument.
//!
//! Bars are kept in the order the source delivered them. No re-sorting is
//! done: when a source returns unsorted rows, every "previous bar"
//! computation uses the positional predecessor.

use crate::domain::error::AnalyzerError;
use crate::domain::ohlcv::{Bar, RawBar};
use chrono::NaiveDate;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    instrument: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn from_raw(instrument: &str, rows: Vec<RawBar>) -> Result<Self, AnalyzerError> {
        let instrument = instrument.to_uppercase();
        if rows.is_empty() {
            return Err(AnalyzerError::EmptySeries { instrument });
        }
        let bars = rows
            .into_iter()
            .map(|raw| Bar::from_raw(&instrument, raw))
            .collect();
        Ok(Self { instrument, bars })
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub(crate) fn bars_mut(&mut self) -> &mut [Bar] {
        &mut self.bars
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn get_by_date(&self, date: NaiveDate) -> Option<&Bar> {
        if self.is_sorted() {
            self.bars
                .binary_search_by_key(&date, |b| b.date)
                .ok()
                .map(|i| &self.bars[i])
        } else {
            self.bars.iter().find(|b| b.date == date)
        }
    }

    pub fn first(&self) -> &Bar {
        &self.bars[0]
    }

    pub fn last(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn start_date(&self) -> NaiveDate {
        self.first().date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.last().date
    }

    /// True when dates are strictly ascending.
    pub fn is_sorted(&self) -> bool {
        self.bars.windows(2).all(|w| w[0].date < w[1].date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn adj_closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.adj_close).collect()
    }

    /// The defined change values, in series order (index 0 excluded).
    pub fn changes(&self) -> Vec<f64> {
        self.bars.iter().filter_map(|b| b.change).collect()
    }

    /// Number of distinct dates. Less than `len()` only when the source
    /// repeated a date.
    pub fn distinct_dates(&self) -> usize {
        self.bars.iter().map(|b| b.date).collect::<BTreeSet<_>>().len()
    }
}
