//! SMA (Simple Moving Average) indicator.
//!
//! SMA(n)[i] = sum(V[i-j] for j in 0..n) / n
//! Warmup: first (n-1) positions are undefined. n == 0 is undefined everywhere.

/// Lazy trailing mean over a slice. Yields exactly `values.len()` items.
#[derive(Debug, Clone)]
pub struct Sma<'a> {
    values: &'a [f64],
    window: usize,
    index: usize,
}

impl Iterator for Sma<'_> {
    type Item = Option<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.values.len() {
            return None;
        }
        let i = self.index;
        self.index += 1;

        if self.window == 0 || i + 1 < self.window {
            return Some(None);
        }
        let window = &self.values[i + 1 - self.window..=i];
        Some(Some(window.iter().sum::<f64>() / self.window as f64))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.values.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Sma<'_> {}

pub fn sma(values: &[f64], window: usize) -> Sma<'_> {
    Sma {
        values,
        window,
        index: 0,
    }
}

/// Last SMA value, i.e. the mean of the final `window` values.
pub fn sma_last(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    sma(&values[values.len() - window..], window).last().flatten()
}

pub fn sma_series(values: &[f64], window: usize) -> Vec<Option<f64>> {
    sma(values, window).collect()
}
