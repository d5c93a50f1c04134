//! Plain-text rendering of analysis results and data previews.

use crate::domain::bar_series::BarSeries;
use crate::domain::date_range::DATE_FORMAT;
use crate::domain::metrics::MetricsResult;
use std::fmt::Write;

pub const PREVIEW_COLUMNS: [&str; 9] = [
    "Date", "Open", "High", "Low", "Close", "Adj Close", "Volume", "Change", "Momentum",
];

fn fixed(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => "n/a".to_string(),
    }
}

pub fn format_metrics(m: &MetricsResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Results for {}:", m.instrument);
    let _ = writeln!(out, "Total Return: {}%", fixed(Some(m.total_return), 2));
    let _ = writeln!(out, "Standard Deviation: {}", fixed(Some(m.std_dev), 4));
    let _ = writeln!(out, "Risk Return: {}", fixed(m.risk_return, 4));
    let _ = writeln!(
        out,
        "{}-day Moving Average: {}",
        m.sma_short_window,
        fixed(m.sma_short, 2)
    );
    let _ = writeln!(
        out,
        "{}-day Moving Average: {}",
        m.sma_long_window,
        fixed(m.sma_long, 2)
    );
    let _ = writeln!(
        out,
        "{}-day Momentum: {}",
        m.momentum_period,
        fixed(m.momentum, 2)
    );
    out
}

/// Row count, column names and the first `rows` bars as an aligned table.
/// `momentum` is aligned with the bars; missing entries print as `n/a`.
pub fn format_preview(series: &BarSeries, momentum: &[Option<f64>], rows: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Data for {}:", series.instrument());
    let _ = writeln!(out, "Number of Rows: {}", series.len());
    let _ = writeln!(out, "Columns: {}", PREVIEW_COLUMNS.join(", "));

    if rows == 0 {
        return out;
    }
    out.push('\n');
    let _ = writeln!(
        out,
        "{:<10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>12} {:>10} {:>10}",
        PREVIEW_COLUMNS[0],
        PREVIEW_COLUMNS[1],
        PREVIEW_COLUMNS[2],
        PREVIEW_COLUMNS[3],
        PREVIEW_COLUMNS[4],
        PREVIEW_COLUMNS[5],
        PREVIEW_COLUMNS[6],
        PREVIEW_COLUMNS[7],
        PREVIEW_COLUMNS[8],
    );
    for (i, bar) in series.bars().iter().take(rows).enumerate() {
        let _ = writeln!(
            out,
            "{:<10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12} {:>10} {:>10}",
            bar.date.format(DATE_FORMAT),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.adj_close,
            bar.volume,
            fixed(bar.change, 6),
            fixed(momentum.get(i).copied().flatten(), 2),
        );
    }
    out
}
