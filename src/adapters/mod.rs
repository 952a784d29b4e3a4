//! Adapter implementations for port traits.

#[cfg(feature = "alpaca")]
pub mod alpaca_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod indicator_snapshot_adapter;
pub mod paper_broker;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
