//! Export port trait.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::AnalyzerError;
use std::path::Path;

/// Writes a bar series to a user-chosen destination.
pub trait ExportPort {
    fn export(&self, series: &BarSeries, path: &Path) -> Result<(), AnalyzerError>;
}
