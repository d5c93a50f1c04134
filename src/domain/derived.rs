//! Per-bar derived fields.
//!
//! change[i] = adj_close[i] / adj_close[i-1] - 1 for i >= 1
//! change[0] is undefined.
//! A zero (or non-finite) previous adjusted close leaves change[i] undefined,
//! so a series with such a bar has fewer than `len - 1` defined changes.

use crate::domain::bar_series::BarSeries;

/// Daily return column for `series`, same length as the series.
///
/// Entry 0 is always `None`. Entry `i` is `None` when the previous adjusted
/// close is zero or the ratio is not finite; every other entry is defined.
pub fn compute_changes(series: &BarSeries) -> Vec<Option<f64>> {
    let adj = series.adj_closes();
    let mut changes = Vec::with_capacity(adj.len());
    changes.push(None);

    changes.extend(adj.windows(2).map(|w| {
        let change = w[1] / w[0] - 1.0;
        (w[0] != 0.0 && change.is_finite()).then_some(change)
    }));

    changes
}

/// Attach the change column to the series and return it.
pub fn derive(mut series: BarSeries) -> BarSeries {
    let changes = compute_changes(&series);
    for (bar, change) in series.bars_mut().iter_mut().zip(changes) {
        bar.change = change;
    }
    series
}
