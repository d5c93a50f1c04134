#![allow(dead_code)]

use chrono::NaiveDate;
use stockanalyzer::domain::bar_series::BarSeries;
use stockanalyzer::domain::error::AnalyzerError;
pub use stockanalyzer::domain::ohlcv::RawBar;
use stockanalyzer::ports::config_port::ConfigPort;
use stockanalyzer::ports::data_port::DataPort;
use stockanalyzer::ports::store_port::StorePort;
use std::cell::Cell;
use std::collections::HashMap;

/// In-memory market data keyed by uppercase instrument. Honors `[start, end)`.
pub struct MockDataPort {
    pub data: HashMap<String, Vec<RawBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, instrument: &str, bars: Vec<RawBar>) -> Self {
        self.data.insert(instrument.to_uppercase(), bars);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors
            .insert(instrument.to_uppercase(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<RawBar>, AnalyzerError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(AnalyzerError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(instrument)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date < end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Store that always fails and counts attempts.
#[derive(Default)]
pub struct FailingStore {
    pub attempts: Cell<usize>,
}

impl StorePort for FailingStore {
    fn upsert(&self, _series: &BarSeries) -> Result<usize, AnalyzerError> {
        self.attempts.set(self.attempts.get() + 1);
        Err(AnalyzerError::Storage {
            reason: "database is locked".into(),
        })
    }
}

/// Config answering from a fixed key list.
pub struct MapConfig(pub HashMap<(String, String), String>);

impl MapConfig {
    pub fn new(entries: &[(&str, &str, &str)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(s, k, v)| ((s.to_string(), k.to_string()), v.to_string()))
                .collect(),
        )
    }
}

impl ConfigPort for MapConfig {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.0.get(&(section.to_string(), key.to_string())).cloned()
    }
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get_string(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.get_string(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.get_string(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: &str, close: f64) -> RawBar {
    RawBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        adj_close: close,
        volume: 1000,
    }
}

/// One bar per calendar day from `start_date`, with the given adjusted closes.
pub fn bars_from_prices(start_date: &str, prices: &[f64]) -> Vec<RawBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| RawBar {
            date: start + chrono::Duration::days(i as i64),
            open: p,
            high: p + 1.0,
            low: p - 1.0,
            close: p,
            adj_close: p,
            volume: 1000 + i as u64,
        })
        .collect()
}

pub fn generate_bars(start_date: &str, count: usize, start_price: f64) -> Vec<RawBar> {
    let prices: Vec<f64> = (0..count).map(|i| start_price + i as f64).collect();
    bars_from_prices(start_date, &prices)
}
