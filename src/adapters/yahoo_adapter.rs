//! Yahoo Finance data provider.
//!
//! Fetches daily OHLCV bars from the v8 chart API and company metadata from
//! the v10 quote summary API. Yahoo has no official API and changes its
//! response shape without notice; the CSV adapter is the offline fallback.

use crate::domain::company::CompanyInfo;
use crate::domain::date_range::DateRange;
use crate::domain::error::AnalyzerError;
use crate::domain::ohlcv::RawBar;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::metadata_port::MetadataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    result: Option<Vec<SummaryData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryData {
    asset_profile: Option<AssetProfile>,
    price: Option<PriceModule>,
}

#[derive(Debug, Deserialize)]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
    exchange: Option<String>,
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooAdapter {
    pub fn new(timeout: Duration, max_retries: u32) -> Result<Self, AnalyzerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| AnalyzerError::data_source(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AnalyzerError> {
        let timeout = config.get_int("yahoo", "timeout_secs", 30);
        if timeout <= 0 {
            return Err(AnalyzerError::ConfigInvalid {
                section: "yahoo".into(),
                key: "timeout_secs".into(),
                reason: format!("must be positive, got {timeout}"),
            });
        }
        let retries = config.get_int("yahoo", "max_retries", 3).clamp(0, 10) as u32;
        Self::new(Duration::from_secs(timeout as u64), retries)
    }

    /// The request window is padded by a day on each side so sessions of
    /// exchanges east or west of UTC are not cut off; `parse_chart` trims
    /// back to `[start, end)` on exchange-local dates.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let midnight = |d: NaiveDate| d.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let start_ts = midnight(start) - SECONDS_PER_DAY;
        let end_ts = midnight(end) + SECONDS_PER_DAY;
        format!(
            "{CHART_URL}/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true&events=div%2Csplits"
        )
    }

    fn summary_url(symbol: &str) -> String {
        format!("{SUMMARY_URL}/{symbol}?modules=assetProfile%2Cprice")
    }

    /// GET `url` and decode JSON, retrying transient failures with
    /// exponential backoff.
    fn get_json<T: DeserializeOwned>(&self, url: &str, symbol: &str) -> Result<T, AnalyzerError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, ?delay, "retrying yahoo request");
                std::thread::sleep(delay);
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        warn!(symbol, %status, "yahoo request failed");
                        last_error = Some(AnalyzerError::data_source(format!(
                            "HTTP {status} for {symbol}"
                        )));
                        continue;
                    }

                    // 404 carries a JSON error body that the parsers report.
                    if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
                        return Err(AnalyzerError::data_source(format!(
                            "HTTP {status} for {symbol}"
                        )));
                    }

                    return resp.json::<T>().map_err(|e| {
                        AnalyzerError::data_source(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    });
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    warn!(symbol, error = %e, "yahoo unreachable");
                    last_error = Some(AnalyzerError::data_source(e));
                }
                Err(e) => return Err(AnalyzerError::data_source(e)),
            }
        }

        Err(last_error.unwrap_or_else(|| AnalyzerError::data_source("max retries exceeded")))
    }
}

fn api_error(symbol: &str, err: Option<ApiError>) -> AnalyzerError {
    match err {
        Some(err) if err.code == "Not Found" => {
            AnalyzerError::data_source(format!("symbol not found: {symbol}"))
        }
        Some(err) => AnalyzerError::data_source(format!("{}: {}", err.code, err.description)),
        None => AnalyzerError::data_source("empty result with no error"),
    }
}

/// Decode chart rows, keeping those inside `[start, end)`. Rows with no OHLCV
/// at all (holidays) are skipped. An empty vector is a valid result.
///
/// Timestamps are session opens in UTC. Each row is dated in the exchange's
/// local time using `meta.gmtoffset`, so a Sydney open at 23:00 UTC lands on
/// the following calendar day.
fn parse_chart(
    symbol: &str,
    resp: ChartResponse,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<RawBar>, AnalyzerError> {
    let result = match resp.chart.result {
        Some(result) => result,
        None => return Err(api_error(symbol, resp.chart.error)),
    };

    let Some(data) = result.into_iter().next() else {
        return Ok(Vec::new());
    };

    // Yahoo omits timestamps entirely when the range holds no trading day.
    let Some(timestamps) = data.timestamp else {
        return Ok(Vec::new());
    };

    let gmtoffset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let range = DateRange { start, end };

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| AnalyzerError::data_source("no quote data"))?;

    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let mut bars = Vec::with_capacity(timestamps.len());

    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts + gmtoffset, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| AnalyzerError::data_source(format!("invalid timestamp: {ts}")))?;

        if !range.contains(date) {
            continue;
        }

        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();

        let (Some(open), Some(high), Some(low), Some(close)) = (open, high, low, close) else {
            continue;
        };

        let adj_close = adj_closes
            .as_ref()
            .and_then(|v| v.get(i).copied().flatten())
            .unwrap_or(close);

        bars.push(RawBar {
            date,
            open,
            high,
            low,
            close,
            adj_close,
            volume: volume.unwrap_or(0),
        });
    }

    Ok(bars)
}

fn parse_summary(symbol: &str, resp: SummaryResponse) -> Result<CompanyInfo, AnalyzerError> {
    let result = match resp.quote_summary.result {
        Some(result) => result,
        None => return Err(api_error(symbol, resp.quote_summary.error)),
    };
    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| AnalyzerError::data_source(format!("symbol not found: {symbol}")))?;

    let (sector, industry, country) = match data.asset_profile {
        Some(p) => (p.sector, p.industry, p.country),
        None => (None, None, None),
    };
    let (name, exchange) = match data.price {
        Some(p) => (p.long_name.or(p.short_name), p.exchange),
        None => (None, None),
    };

    Ok(CompanyInfo {
        instrument: symbol.to_string(),
        name,
        sector,
        industry,
        country,
        exchange,
    })
}

impl DataPort for YahooAdapter {
    fn fetch_ohlcv(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<RawBar>, AnalyzerError> {
        let symbol = instrument.to_uppercase();
        let url = Self::chart_url(&symbol, start_date, end_date);
        let resp: ChartResponse = self.get_json(&url, &symbol)?;
        parse_chart(&symbol, resp, start_date, end_date)
    }

    fn name(&self) -> &str {
        "yahoo_finance"
    }
}

impl MetadataPort for YahooAdapter {
    fn lookup(&self, instrument: &str) -> Result<CompanyInfo, AnalyzerError> {
        let symbol = instrument.trim().to_uppercase();
        let resp: SummaryResponse = self.get_json(&Self::summary_url(&symbol), &symbol)?;
        parse_summary(&symbol, resp)
    }
}
