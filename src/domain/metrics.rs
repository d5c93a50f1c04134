//! Summary statistics over an enriched bar series.
//!
//! All return statistics run over the defined change values only:
//!
//! total_return = mean(change) * count(change) * 100
//! std_dev      = pstdev(change) * sqrt(count(change))
//! risk_return  = mean(change) / (pstdev(change) * 100)
//!
//! total_return is the plain sum of daily returns in percent, not a
//! compounded return.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::AnalyzerError;
use crate::domain::indicator::momentum::{momentum, momentum_series};
use crate::domain::indicator::sma::{sma_last, sma_series};

pub const DEFAULT_SMA_SHORT: usize = 50;
pub const DEFAULT_SMA_LONG: usize = 200;
pub const DEFAULT_MOMENTUM_PERIOD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsConfig {
    pub sma_short: usize,
    pub sma_long: usize,
    pub momentum_period: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            sma_short: DEFAULT_SMA_SHORT,
            sma_long: DEFAULT_SMA_LONG,
            momentum_period: DEFAULT_MOMENTUM_PERIOD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsResult {
    pub instrument: String,
    /// Percent.
    pub total_return: f64,
    pub std_dev: f64,
    /// Undefined when the change values have zero dispersion.
    pub risk_return: Option<f64>,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub momentum: Option<f64>,
    pub sma_short_window: usize,
    pub sma_long_window: usize,
    pub momentum_period: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCalculator {
    config: MetricsConfig,
}

impl MetricsCalculator {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Fails with `InsufficientData` when the series has no defined change
    /// value. Window-limited fields degrade to `None` instead.
    pub fn compute(&self, series: &BarSeries) -> Result<MetricsResult, AnalyzerError> {
        let changes = series.changes();
        let stats = ReturnStats::from_changes(&changes).ok_or_else(|| {
            AnalyzerError::InsufficientData {
                instrument: series.instrument().to_string(),
                points: changes.len(),
                minimum: 1,
            }
        })?;

        let closes = series.closes();
        let n = stats.count as f64;

        let total_return = stats.mean * n * 100.0;
        let std_dev = stats.pstdev * n.sqrt();
        let risk_return = if stats.pstdev > 0.0 {
            Some(stats.mean / (stats.pstdev * 100.0))
        } else {
            None
        };

        Ok(MetricsResult {
            instrument: series.instrument().to_string(),
            total_return,
            std_dev,
            risk_return,
            sma_short: sma_last(&closes, self.config.sma_short),
            sma_long: sma_last(&closes, self.config.sma_long),
            momentum: momentum(&closes, self.config.momentum_period),
            sma_short_window: self.config.sma_short,
            sma_long_window: self.config.sma_long,
            momentum_period: self.config.momentum_period,
        })
    }

    /// Full-length SMA(short) on close, for chart overlays.
    pub fn overlay(&self, series: &BarSeries) -> Vec<Option<f64>> {
        sma_series(&series.closes(), self.config.sma_short)
    }

    pub fn momentum_series(&self, series: &BarSeries) -> Vec<Option<f64>> {
        momentum_series(&series.closes(), self.config.momentum_period)
    }
}

struct ReturnStats {
    count: usize,
    mean: f64,
    pstdev: f64,
}

impl ReturnStats {
    fn from_changes(changes: &[f64]) -> Option<Self> {
        if changes.is_empty() {
            return None;
        }
        let n = changes.len() as f64;
        let mean = changes.iter().sum::<f64>() / n;
        let variance = changes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            count: changes.len(),
            mean,
            pstdev: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::derived::derive;
    use crate::domain::ohlcv::RawBar;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_series(prices: &[f64]) -> BarSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let rows = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| RawBar {
                date: start + chrono::Duration::days(i as i64),
                open: p,
                high: p,
                low: p,
                close: p,
                adj_close: p,
                volume: 1000,
            })
            .collect();
        derive(BarSeries::from_raw("TEST", rows).unwrap())
    }

    #[test]
    fn three_bar_example() {
        let series = make_series(&[100.0, 110.0, 99.0]);
        let m = MetricsCalculator::default().compute(&series).unwrap();

        assert_relative_eq!(m.total_return, 0.0, epsilon = 1e-9);
        // pstdev of [0.1, -0.1] is 0.1, times sqrt(2)
        assert_relative_eq!(m.std_dev, 0.1 * 2f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(m.risk_return.unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn total_return_is_sum_of_changes() {
        let series = make_series(&[100.0, 102.0, 101.0, 105.0, 104.0]);
        let m = MetricsCalculator::default().compute(&series).unwrap();
        let sum: f64 = series.changes().iter().sum();

        assert_relative_eq!(m.total_return, sum * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn risk_return_formula() {
        let series = make_series(&[100.0, 101.0, 103.0, 102.0]);
        let changes = series.changes();
        let n = changes.len() as f64;
        let mean = changes.iter().sum::<f64>() / n;
        let pstdev = (changes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n).sqrt();

        let m = MetricsCalculator::default().compute(&series).unwrap();
        assert_relative_eq!(m.risk_return.unwrap(), mean / (pstdev * 100.0), epsilon = 1e-12);
    }

    #[test]
    fn single_bar_is_insufficient() {
        let series = make_series(&[100.0]);
        match MetricsCalculator::default().compute(&series) {
            Err(AnalyzerError::InsufficientData { points, minimum, .. }) => {
                assert_eq!(points, 0);
                assert_eq!(minimum, 1);
            }
            other => panic!("expected InsufficientData, got: {other:?}"),
        }
    }

    #[test]
    fn two_bars_have_undefined_risk_return() {
        let series = make_series(&[100.0, 101.0]);
        let m = MetricsCalculator::default().compute(&series).unwrap();
        assert_relative_eq!(m.std_dev, 0.0);
        assert_eq!(m.risk_return, None);
    }

    #[test]
    fn short_series_degrades_window_fields() {
        let prices: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let series = make_series(&prices);
        let m = MetricsCalculator::default().compute(&series).unwrap();

        assert_eq!(m.sma_short, None);
        assert_eq!(m.sma_long, None);
        assert_eq!(m.momentum, None);
        assert!(m.total_return.is_finite());
        assert!(m.std_dev.is_finite());
    }

    #[test]
    fn long_series_fills_window_fields() {
        let prices: Vec<f64> = (0..200).map(|i| 100.0 + i as f64).collect();
        let series = make_series(&prices);
        let m = MetricsCalculator::default().compute(&series).unwrap();

        // last 50 closes are 250..=299
        assert_relative_eq!(m.sma_short.unwrap(), 274.5, epsilon = 1e-9);
        assert_relative_eq!(m.sma_long.unwrap(), 199.5, epsilon = 1e-9);
        assert_relative_eq!(m.momentum.unwrap(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn custom_windows() {
        let series = make_series(&[1.0, 2.0, 3.0, 4.0]);
        let calc = MetricsCalculator::new(MetricsConfig {
            sma_short: 2,
            sma_long: 4,
            momentum_period: 3,
        });
        let m = calc.compute(&series).unwrap();

        assert_relative_eq!(m.sma_short.unwrap(), 3.5);
        assert_relative_eq!(m.sma_long.unwrap(), 2.5);
        assert_relative_eq!(m.momentum.unwrap(), 3.0);
        assert_eq!(m.sma_short_window, 2);
        assert_eq!(calc.overlay(&series), vec![None, Some(1.5), Some(2.5), Some(3.5)]);
        assert_eq!(calc.momentum_series(&series), vec![None, None, None, Some(3.0)]);
    }
}
