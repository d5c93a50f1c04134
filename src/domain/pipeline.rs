//! Fetch → derive → compute → persist orchestration.

use crate::domain::bar_series::BarSeries;
use crate::domain::date_range::DateRange;
use crate::domain::derived::derive;
use crate::domain::error::AnalyzerError;
use crate::domain::metrics::{MetricsCalculator, MetricsConfig, MetricsResult};
use crate::ports::data_port::DataPort;
use crate::ports::store_port::StorePort;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Explicit request parameters for one analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub instrument: String,
    pub range: DateRange,
}

impl AnalysisRequest {
    /// Trims and uppercases the instrument; rejects an empty one.
    pub fn new(instrument: &str, range: DateRange) -> Result<Self, AnalyzerError> {
        let instrument = instrument.trim().to_uppercase();
        if instrument.is_empty() {
            return Err(AnalyzerError::InvalidInstrument {
                instrument,
                reason: "instrument must not be empty".into(),
            });
        }
        Ok(Self { instrument, range })
    }

    pub fn parse(instrument: &str, start: &str, end: &str) -> Result<Self, AnalyzerError> {
        Self::new(instrument, DateRange::parse(start, end)?)
    }
}

/// Shared cancellation flag checked between pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), AnalyzerError> {
        if self.is_cancelled() {
            Err(AnalyzerError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Result bundle of a successful analysis. A failed upsert is carried as
/// `storage_warning`; the in-memory results stay valid.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub series: BarSeries,
    pub metrics: MetricsResult,
    /// SMA(short) over close, one entry per bar.
    pub overlay: Vec<Option<f64>>,
    /// Momentum over close, one entry per bar.
    pub momentum: Vec<Option<f64>>,
    pub rows_persisted: usize,
    pub storage_warning: Option<AnalyzerError>,
}

pub struct AnalysisPipeline<'a> {
    data: &'a dyn DataPort,
    store: &'a dyn StorePort,
    calculator: MetricsCalculator,
}

impl<'a> AnalysisPipeline<'a> {
    pub fn new(data: &'a dyn DataPort, store: &'a dyn StorePort) -> Self {
        Self {
            data,
            store,
            calculator: MetricsCalculator::default(),
        }
    }

    pub fn with_config(mut self, config: MetricsConfig) -> Self {
        self.calculator = MetricsCalculator::new(config);
        self
    }

    pub fn run(&self, instrument: &str, start: &str, end: &str) -> Result<AnalysisOutcome, AnalyzerError> {
        let request = AnalysisRequest::parse(instrument, start, end)?;
        self.run_cancellable(&request, &CancelToken::new())
    }

    pub fn run_cancellable(
        &self,
        request: &AnalysisRequest,
        cancel: &CancelToken,
    ) -> Result<AnalysisOutcome, AnalyzerError> {
        info!(
            instrument = %request.instrument,
            range = %request.range,
            source = self.data.name(),
            "starting analysis"
        );

        let series = self.fetch_series(request)?;
        cancel.check()?;

        let series = derive(series);
        let metrics = self.calculator.compute(&series)?;
        let overlay = self.calculator.overlay(&series);
        let momentum = self.calculator.momentum_series(&series);
        debug!(
            instrument = %request.instrument,
            total_return = metrics.total_return,
            std_dev = metrics.std_dev,
            "metrics computed"
        );
        cancel.check()?;

        let (rows_persisted, storage_warning) = match self.store.upsert(&series) {
            Ok(rows) => {
                info!(instrument = %request.instrument, rows, "bars persisted");
                (rows, None)
            }
            Err(e) => {
                warn!(instrument = %request.instrument, error = %e, "persistence failed");
                (0, Some(e))
            }
        };

        Ok(AnalysisOutcome {
            series,
            metrics,
            overlay,
            momentum,
            rows_persisted,
            storage_warning,
        })
    }

    /// Fetch and build the series only: no derivation, no persistence.
    pub fn fetch_series(&self, request: &AnalysisRequest) -> Result<BarSeries, AnalyzerError> {
        fetch_series(self.data, request)
    }
}

pub fn fetch_series(data: &dyn DataPort, request: &AnalysisRequest) -> Result<BarSeries, AnalyzerError> {
    let rows = data.fetch_ohlcv(&request.instrument, request.range.start, request.range.end)?;
    debug!(instrument = %request.instrument, rows = rows.len(), "fetched bars");
    if rows.is_empty() {
        return Err(AnalyzerError::NoData {
            instrument: request.instrument.clone(),
            start: request.range.start,
            end: request.range.end,
        });
    }
    BarSeries::from_raw(&request.instrument, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::RawBar;
    use chrono::NaiveDate;
    use std::cell::{Cell, RefCell};

    struct FixedData(Vec<RawBar>);

    impl DataPort for FixedData {
        fn fetch_ohlcv(
            &self,
            _instrument: &str,
            _start_date: NaiveDate,
            _end_date: NaiveDate,
        ) -> Result<Vec<RawBar>, AnalyzerError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        calls: Cell<usize>,
        fail: bool,
        rows: RefCell<Vec<(NaiveDate, String)>>,
    }

    impl StorePort for RecordingStore {
        fn upsert(&self, series: &BarSeries) -> Result<usize, AnalyzerError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(AnalyzerError::storage("disk full"));
            }
            let mut rows = self.rows.borrow_mut();
            for bar in series.bars() {
                rows.push((bar.date, bar.instrument.clone()));
            }
            Ok(series.len())
        }
    }

    fn rows(prices: &[f64]) -> Vec<RawBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| RawBar {
                date: NaiveDate::from_ymd_opt(2024, 3, (i + 1) as u32).unwrap(),
                open: p,
                high: p,
                low: p,
                close: p,
                adj_close: p,
                volume: 100,
            })
            .collect()
    }

    #[test]
    fn request_normalizes_instrument() {
        let req = AnalysisRequest::parse("  aapl ", "2024-01-01", "2024-02-01").unwrap();
        assert_eq!(req.instrument, "AAPL");
    }

    #[test]
    fn request_rejects_blank_instrument() {
        let err = AnalysisRequest::parse("   ", "2024-01-01", "2024-02-01").unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidInstrument { .. }));
    }

    #[test]
    fn run_happy_path() {
        let data = FixedData(rows(&[100.0, 110.0, 99.0]));
        let store = RecordingStore::default();
        let outcome = AnalysisPipeline::new(&data, &store)
            .run("aapl", "2024-03-01", "2024-03-04")
            .unwrap();

        assert_eq!(outcome.series.instrument(), "AAPL");
        assert_eq!(outcome.rows_persisted, 3);
        assert!(outcome.storage_warning.is_none());
        assert_eq!(outcome.overlay.len(), 3);
        assert_eq!(outcome.momentum, vec![None; 3]);
        assert!(outcome.metrics.total_return.abs() < 1e-9);
        assert_eq!(store.rows.borrow().len(), 3);
    }

    #[test]
    fn storage_failure_is_a_warning() {
        let data = FixedData(rows(&[100.0, 101.0, 102.0]));
        let store = RecordingStore {
            fail: true,
            ..Default::default()
        };
        let outcome = AnalysisPipeline::new(&data, &store)
            .run("MSFT", "2024-03-01", "2024-03-04")
            .unwrap();

        assert_eq!(outcome.rows_persisted, 0);
        assert!(matches!(
            outcome.storage_warning,
            Some(AnalyzerError::Storage { .. })
        ));
        assert!(outcome.metrics.total_return > 0.0);
    }

    #[test]
    fn empty_fetch_is_no_data_without_write() {
        let data = FixedData(vec![]);
        let store = RecordingStore::default();
        let err = AnalysisPipeline::new(&data, &store)
            .run("MSFT", "2024-03-01", "2024-03-04")
            .unwrap_err();

        assert!(matches!(err, AnalyzerError::NoData { .. }));
        assert_eq!(store.calls.get(), 0);
    }

    #[test]
    fn invalid_range_blocks_everything() {
        let data = FixedData(rows(&[1.0, 2.0]));
        let store = RecordingStore::default();
        let err = AnalysisPipeline::new(&data, &store)
            .run("MSFT", "2024-03-05", "2024-03-01")
            .unwrap_err();

        assert!(matches!(err, AnalyzerError::InvalidDateRange { .. }));
        assert_eq!(store.calls.get(), 0);
    }

    #[test]
    fn cancelled_run_does_not_persist() {
        let data = FixedData(rows(&[1.0, 2.0, 3.0]));
        let store = RecordingStore::default();
        let token = CancelToken::new();
        token.cancel();
        let req = AnalysisRequest::parse("X", "2024-03-01", "2024-03-04").unwrap();

        let err = AnalysisPipeline::new(&data, &store)
            .run_cancellable(&req, &token)
            .unwrap_err();

        assert!(matches!(err, AnalyzerError::Cancelled));
        assert_eq!(store.calls.get(), 0);
    }

    #[test]
    fn single_bar_fails_insufficient_without_write() {
        let data = FixedData(rows(&[100.0]));
        let store = RecordingStore::default();
        let err = AnalysisPipeline::new(&data, &store)
            .run("X", "2024-03-01", "2024-03-04")
            .unwrap_err();

        assert!(matches!(err, AnalyzerError::InsufficientData { .. }));
        assert_eq!(store.calls.get(), 0);
    }
}
