//! SQLite persistence adapter.

use crate::domain::bar_series::BarSeries;
use crate::domain::date_range::DATE_FORMAT;
use crate::domain::error::AnalyzerError;
use crate::domain::ohlcv::Bar;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_DB_PATH: &str = "stock_data.db";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AnalyzerError> {
        let db_path = config
            .get_string("sqlite", "path")
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let pool_size = config.get_int("sqlite", "pool_size", 4);
        if pool_size < 1 {
            return Err(AnalyzerError::ConfigInvalid {
                section: "sqlite".into(),
                key: "pool_size".into(),
                reason: format!("must be at least 1, got {pool_size}"),
            });
        }

        Self::open(db_path, pool_size as u32)
    }

    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> Result<Self, AnalyzerError> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| AnalyzerError::storage(e))?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, AnalyzerError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| AnalyzerError::storage(e))?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, AnalyzerError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| AnalyzerError::storage(e))
    }

    pub fn initialize_schema(&self) -> Result<(), AnalyzerError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS stock_data (
                date TEXT NOT NULL,
                instrument TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                adj_close REAL NOT NULL,
                volume INTEGER NOT NULL,
                change REAL,
                PRIMARY KEY (date, instrument)
            );
            CREATE INDEX IF NOT EXISTS idx_stock_data_instrument ON stock_data(instrument);",
        )
        .map_err(|e: rusqlite::Error| AnalyzerError::storage(e))?;

        Ok(())
    }

    /// Stored bars for `instrument`, ascending by date.
    pub fn load_bars(&self, instrument: &str) -> Result<Vec<Bar>, AnalyzerError> {
        let conn = self.conn()?;

        let query = "SELECT date, instrument, open, high, low, close, adj_close, volume, change
                     FROM stock_data
                     WHERE instrument = ?1
                     ORDER BY date ASC";

        let mut stmt = conn
            .prepare(query)
            .map_err(|e: rusqlite::Error| AnalyzerError::storage(e))?;

        let rows = stmt
            .query_map(params![instrument.to_uppercase()], |row| {
                let date_str: String = row.get(0)?;
                let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                let volume: i64 = row.get(7)?;
                Ok(Bar {
                    date,
                    instrument: row.get(1)?,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    adj_close: row.get(6)?,
                    volume: volume.max(0) as u64,
                    change: row.get(8)?,
                })
            })
            .map_err(|e: rusqlite::Error| AnalyzerError::storage(e))?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(row.map_err(|e: rusqlite::Error| AnalyzerError::storage(e))?);
        }

        Ok(bars)
    }

    pub fn get_data_range(
        &self,
        instrument: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, AnalyzerError> {
        let conn = self.conn()?;

        let query = "SELECT MIN(date), MAX(date), COUNT(*) FROM stock_data WHERE instrument = ?1";

        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(query, params![instrument.to_uppercase()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(|e: rusqlite::Error| AnalyzerError::storage(e))?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let min = NaiveDate::parse_from_str(&min_str, DATE_FORMAT)
                    .map_err(|e: chrono::ParseError| AnalyzerError::storage(e))?;
                let max = NaiveDate::parse_from_str(&max_str, DATE_FORMAT)
                    .map_err(|e: chrono::ParseError| AnalyzerError::storage(e))?;
                Ok(Some((min, max, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

impl StorePort for SqliteAdapter {
    fn upsert(&self, series: &BarSeries) -> Result<usize, AnalyzerError> {
        let mut conn = self.conn()?;

        // Dropping `tx` without commit rolls the whole batch back.
        let tx = conn
            .transaction()
            .map_err(|e: rusqlite::Error| AnalyzerError::storage(e))?;

        for bar in series.bars() {
            let volume = i64::try_from(bar.volume).map_err(|_| {
                AnalyzerError::storage(format!(
                    "volume {} on {} out of range for {}",
                    bar.volume, bar.date, bar.instrument
                ))
            })?;

            tx.execute(
                "INSERT OR REPLACE INTO stock_data
                    (date, instrument, open, high, low, close, adj_close, volume, change)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    bar.date.format(DATE_FORMAT).to_string(),
                    bar.instrument,
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.adj_close,
                    volume,
                    bar.change
                ],
            )
            .map_err(|e: rusqlite::Error| AnalyzerError::storage(e))?;
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| AnalyzerError::storage(e))?;

        let rows = series.distinct_dates();
        debug!(instrument = series.instrument(), rows, "sqlite upsert committed");
        Ok(rows)
    }
}
