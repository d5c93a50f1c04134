//! Core domain types and logic.

pub mod bar_series;
pub mod company;
pub mod date_range;
pub mod derived;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod ohlcv;
pub mod pipeline;
