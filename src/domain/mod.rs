//! Core domain types and logic.

pub mod analysis;
pub mod auto_trader;
pub mod decision;
pub mod error;
pub mod indicator;
pub mod limits;
pub mod ohlcv;
pub mod position;
pub mod preferences;
pub mod scoring;
pub mod signal;
pub mod snapshot;
pub mod trade;
pub mod watchlist;
