//! CSV export of a bar series.

use crate::domain::bar_series::BarSeries;
use crate::domain::date_range::DATE_FORMAT;
use crate::domain::error::AnalyzerError;
use crate::ports::export_port::ExportPort;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub const EXPORT_HEADER: [&str; 7] = ["Date", "Open", "High", "Low", "Close", "Adj Close", "Volume"];

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl CsvExporter {
    pub fn write_to<W: Write>(&self, series: &BarSeries, writer: W) -> Result<(), AnalyzerError> {
        let mut wtr = csv::Writer::from_writer(writer);

        wtr.write_record(EXPORT_HEADER).map_err(csv_error)?;
        for bar in series.bars() {
            wtr.write_record([
                bar.date.format(DATE_FORMAT).to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.adj_close.to_string(),
                bar.volume.to_string(),
            ])
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Renders with `csv::Error`'s own `Display`.
fn csv_error(e: csv::Error) -> AnalyzerError {
    AnalyzerError::Io(e.into())
}

impl ExportPort for CsvExporter {
    fn export(&self, series: &BarSeries, path: &Path) -> Result<(), AnalyzerError> {
        let file = std::fs::File::create(path)?;
        self.write_to(series, file)?;
        info!(
            instrument = series.instrument(),
            rows = series.len(),
            path = %path.display(),
            "series exported"
        );
        Ok(())
    }
}
