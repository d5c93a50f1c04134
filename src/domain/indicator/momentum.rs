//! Momentum indicator.
//!
//! MOMENTUM(n)[i] = C[i] - C[i-n]
//! Warmup: first n positions are undefined.

pub fn momentum_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| {
            if i >= period {
                Some(closes[i] - closes[i - period])
            } else {
                None
            }
        })
        .collect()
}

/// Momentum at the last bar; `None` with fewer than `period + 1` closes.
pub fn momentum(closes: &[f64], period: usize) -> Option<f64> {
    let last = closes.len().checked_sub(1)?;
    let base = last.checked_sub(period)?;
    Some(closes[last] - closes[base])
}
