//! CSV file data adapter.
//!
//! Reads `<INSTRUMENT>.csv` from a base directory. The expected header is the
//! export shape (`Date,Open,High,Low,Close,Adj Close,Volume`); column order is
//! free and `Adj Close` falls back to `Close` when absent.

use crate::domain::date_range::{DateRange, DATE_FORMAT};
use crate::domain::error::AnalyzerError;
use crate::domain::ohlcv::RawBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    adj_close: Option<usize>,
    volume: usize,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, AnalyzerError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                AnalyzerError::data_source(format!("missing {name} column"))
            })
        };

        Ok(Self {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            adj_close: find("adj close").or_else(|| find("adj_close")),
            volume: require("volume")?,
        })
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument.to_uppercase()))
    }
}

fn field<'r>(record: &'r csv::StringRecord, index: usize, name: &str) -> Result<&'r str, AnalyzerError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| AnalyzerError::data_source(format!("missing {name} value")))
}

fn parse_f64(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, AnalyzerError> {
    field(record, index, name)?
        .parse()
        .map_err(|e| AnalyzerError::data_source(format!("invalid {name} value: {e}")))
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<RawBar>, AnalyzerError> {
        let path = self.csv_path(instrument);
        let content = fs::read_to_string(&path).map_err(|e| {
            AnalyzerError::data_source(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| AnalyzerError::data_source(format!("CSV parse error: {e}")))?
            .clone();
        let cols = Columns::from_headers(&headers)?;
        let range = DateRange {
            start: start_date,
            end: end_date,
        };
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record =
                result.map_err(|e| AnalyzerError::data_source(format!("CSV parse error: {e}")))?;

            let date_str = field(&record, cols.date, "date")?;
            let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|e| {
                AnalyzerError::data_source(format!("invalid date format {date_str:?}: {e}"))
            })?;

            if !range.contains(date) {
                continue;
            }

            let close = parse_f64(&record, cols.close, "close")?;
            let adj_close = match cols.adj_close {
                Some(i) => parse_f64(&record, i, "adj close")?,
                None => close,
            };
            // Some exports write volume as a float ("1200.0").
            let volume_str = field(&record, cols.volume, "volume")?;
            let volume = volume_str
                .parse::<u64>()
                .or_else(|_| volume_str.parse::<f64>().map(|v| v.max(0.0) as u64))
                .map_err(|e| AnalyzerError::data_source(format!("invalid volume value: {e}")))?;

            bars.push(RawBar {
                date,
                open: parse_f64(&record, cols.open, "open")?,
                high: parse_f64(&record, cols.high, "high")?,
                low: parse_f64(&record, cols.low, "low")?,
                close,
                adj_close,
                volume,
            });
        }

        Ok(bars)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "Date,Open,High,Low,Close,Adj Close,Volume\n\
            2024-01-15,100.0,110.0,90.0,105.0,104.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,109.0,60000\n\
            2024-01-17,110.0,120.0,105.0,115.0,114.0,55000\n";

        fs::write(path.join("BHP.csv"), csv_content).unwrap();
        fs::write(
            path.join("CBA.csv"),
            "date,open,high,low,close,volume\n2024-01-15,1,2,0.5,1.5,10.0\n",
        )
        .unwrap();
        fs::write(path.join("BAD.csv"), "Date,Open,High,Low,Volume\n").unwrap();

        (dir, path)
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn fetch_ohlcv_returns_correct_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_ohlcv("BHP", d(15), d(18)).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, d(15));
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].adj_close, 104.0);
        assert_eq!(bars[0].volume, 50000);
    }

    #[test]
    fn fetch_ohlcv_end_is_exclusive() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_ohlcv("bhp", d(16), d(17)).unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, d(16));
    }

    #[test]
    fn missing_adj_close_falls_back_to_close() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_ohlcv("CBA", d(1), d(31)).unwrap();
        assert_eq!(bars[0].adj_close, 1.5);
        assert_eq!(bars[0].volume, 10);
    }

    #[test]
    fn missing_file_is_data_source_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_ohlcv("XYZ", d(1), d(31));
        assert!(matches!(result, Err(AnalyzerError::DataSource { .. })));
    }

    #[test]
    fn missing_required_column() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_ohlcv("BAD", d(1), d(31)).unwrap_err();
        assert!(err.to_string().contains("missing close column"));
    }

    #[test]
    fn range_outside_file_is_empty() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert!(adapter.fetch_ohlcv("BHP", d(1), d(10)).unwrap().is_empty());
    }
}
