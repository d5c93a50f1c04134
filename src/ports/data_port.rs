//! Market data access port trait.

use crate::domain::error::AnalyzerError;
use crate::domain::ohlcv::RawBar;
use chrono::NaiveDate;

/// A remote or local provider of daily bars.
pub trait DataPort {
    /// Bars for `instrument` over `[start_date, end_date)`, in the provider's
    /// order. An empty vector is a valid "no data" answer; connectivity and
    /// provider faults are `DataSource` errors.
    fn fetch_ohlcv(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<RawBar>, AnalyzerError>;

    fn name(&self) -> &str;
}
