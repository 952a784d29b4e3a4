//! autotrader: watchlist-driven automated trading loop.
//!
//! Hexagonal layout: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], the pass loop timer in
//! [`scheduler`].

pub mod adapters;
#[cfg(feature = "sqlite")]
pub mod cli;
pub mod domain;
pub mod ports;
pub mod scheduler;
