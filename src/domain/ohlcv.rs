//! OHLCV bar representation.

use chrono::NaiveDate;

/// One row as delivered by a market-data source, before it is tied to an
/// instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

/// One trading day for one instrument. `(date, instrument)` is the storage
/// identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub instrument: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
    /// Day-over-day fractional return on adjusted close. `None` until derived,
    /// and always `None` for the first bar of a series.
    pub change: Option<f64>,
}

impl Bar {
    pub fn from_raw(instrument: &str, raw: RawBar) -> Self {
        Bar {
            date: raw.date,
            instrument: instrument.to_uppercase(),
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            adj_close: raw.adj_close,
            volume: raw.volume,
            change: None,
        }
    }

    pub fn to_raw(&self) -> RawBar {
        RawBar {
            date: self.date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            adj_close: self.adj_close,
            volume: self.volume,
        }
    }
}
