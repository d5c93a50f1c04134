//! PostgreSQL persistence adapter.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::AnalyzerError;
use crate::domain::ohlcv::Bar;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;
use chrono::NaiveDate;
use postgres::NoTls;
use postgres::types::ToSql;
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use tracing::debug;

type Manager = PostgresConnectionManager<NoTls>;

pub struct PostgresAdapter {
    pool: Pool<Manager>,
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AnalyzerError> {
        let connection_string = config
            .get_string("postgres", "connection_string")
            .ok_or_else(|| AnalyzerError::ConfigMissing {
                section: "postgres".into(),
                key: "connection_string".into(),
            })?;

        let pg_config: postgres::Config =
            connection_string
                .parse()
                .map_err(|e: postgres::Error| AnalyzerError::ConfigInvalid {
                    section: "postgres".into(),
                    key: "connection_string".into(),
                    reason: e.to_string(),
                })?;

        let pool_size = config.get_int("postgres", "pool_size", 4).max(1) as u32;
        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| AnalyzerError::storage(e))?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<Manager>, AnalyzerError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| AnalyzerError::storage(e))
    }

    pub fn initialize_schema(&self) -> Result<(), AnalyzerError> {
        self.conn()?
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS stock_data (
                    date DATE NOT NULL,
                    instrument TEXT NOT NULL,
                    open DOUBLE PRECISION NOT NULL,
                    high DOUBLE PRECISION NOT NULL,
                    low DOUBLE PRECISION NOT NULL,
                    close DOUBLE PRECISION NOT NULL,
                    adj_close DOUBLE PRECISION NOT NULL,
                    volume BIGINT NOT NULL,
                    change DOUBLE PRECISION,
                    PRIMARY KEY (date, instrument)
                )",
            )
            .map_err(|e| AnalyzerError::storage(e))
    }

    pub fn load_bars(&self, instrument: &str) -> Result<Vec<Bar>, AnalyzerError> {
        let query = "SELECT date, instrument, open, high, low, close, adj_close, volume, change \
                     FROM stock_data \
                     WHERE instrument = $1 \
                     ORDER BY date ASC";

        let rows = self
            .conn()?
            .query(query, &[&instrument.to_uppercase()])
            .map_err(|e| AnalyzerError::storage(e))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let volume: i64 = row.get(7);
                Bar {
                    date: row.get(0),
                    instrument: row.get(1),
                    open: row.get(2),
                    high: row.get(3),
                    low: row.get(4),
                    close: row.get(5),
                    adj_close: row.get(6),
                    volume: volume.max(0) as u64,
                    change: row.get(8),
                }
            })
            .collect())
    }

    pub fn get_data_range(
        &self,
        instrument: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, AnalyzerError> {
        let query = "SELECT MIN(date), MAX(date), COUNT(*) FROM stock_data WHERE instrument = $1";

        let row = self
            .conn()?
            .query_one(query, &[&instrument.to_uppercase()])
            .map_err(|e| AnalyzerError::storage(e))?;

        let min: Option<NaiveDate> = row.get(0);
        let max: Option<NaiveDate> = row.get(1);
        let count: i64 = row.get(2);

        match (min, max) {
            (Some(min), Some(max)) if count > 0 => Ok(Some((min, max, count as usize))),
            _ => Ok(None),
        }
    }
}

impl StorePort for PostgresAdapter {
    fn upsert(&self, series: &BarSeries) -> Result<usize, AnalyzerError> {
        let mut conn = self.conn()?;
        let mut tx = conn
            .transaction()
            .map_err(|e| AnalyzerError::storage(e))?;

        let stmt = tx
            .prepare(
                "INSERT INTO stock_data \
                    (date, instrument, open, high, low, close, adj_close, volume, change) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                 ON CONFLICT (date, instrument) DO UPDATE SET \
                    open = EXCLUDED.open, high = EXCLUDED.high, low = EXCLUDED.low, \
                    close = EXCLUDED.close, adj_close = EXCLUDED.adj_close, \
                    volume = EXCLUDED.volume, change = EXCLUDED.change",
            )
            .map_err(|e| AnalyzerError::storage(e))?;

        for bar in series.bars() {
            let volume = i64::try_from(bar.volume).map_err(|_| {
                AnalyzerError::storage(format!(
                    "volume {} on {} out of range for {}",
                    bar.volume, bar.date, bar.instrument
                ))
            })?;
            let params: [&(dyn ToSql + Sync); 9] = [
                &bar.date,
                &bar.instrument,
                &bar.open,
                &bar.high,
                &bar.low,
                &bar.close,
                &bar.adj_close,
                &volume,
                &bar.change,
            ];
            tx.execute(&stmt, &params)
                .map_err(|e| AnalyzerError::storage(e))?;
        }

        tx.commit().map_err(|e| AnalyzerError::storage(e))?;

        let rows = series.distinct_dates();
        debug!(instrument = series.instrument(), rows, "postgres upsert committed");
        Ok(rows)
    }
}
