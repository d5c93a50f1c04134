//! stockanalyzer: daily OHLCV retrieval, return statistics and persistence.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. [`worker`] runs analyses off the
//! caller's thread; [`cli`] is the command line host.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod logging;
pub mod ports;
pub mod report;
pub mod worker;
