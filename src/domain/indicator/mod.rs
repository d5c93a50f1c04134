//! Technical indicators over price columns. Each function returns one
//! entry per input value, `None` during warmup.

pub mod momentum;
pub mod sma;
