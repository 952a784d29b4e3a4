//! Port traits for every external collaborator of the decision loop.

pub mod brokerage_port;
pub mod config_port;
pub mod market_data_port;
pub mod preferences_port;
pub mod snapshot_port;
pub mod trade_log_port;
pub mod watchlist_port;
