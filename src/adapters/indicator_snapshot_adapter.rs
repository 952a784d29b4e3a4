//! Snapshot provider computed from daily bars.

use crate::domain::analysis::{analyze, MIN_BARS};
use crate::domain::error::AutotraderError;
use crate::domain::snapshot::Snapshot;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::snapshot_port::SnapshotPort;

pub const DEFAULT_BENCHMARK: &str = "SPY";
pub const DEFAULT_BAR_LIMIT: usize = 300;

pub struct IndicatorSnapshotAdapter<'a> {
    data: &'a dyn MarketDataPort,
    benchmark: String,
    bar_limit: usize,
}

impl<'a> IndicatorSnapshotAdapter<'a> {
    pub fn new(data: &'a dyn MarketDataPort, benchmark: &str, bar_limit: usize) -> Self {
        Self {
            data,
            benchmark: benchmark.trim().to_uppercase(),
            bar_limit: bar_limit.max(MIN_BARS),
        }
    }

    /// Reads `[market_data] benchmark` and `bar_limit`.
    pub fn from_config(data: &'a dyn MarketDataPort, config: &dyn ConfigPort) -> Self {
        let benchmark = config
            .get_string("market_data", "benchmark")
            .unwrap_or_else(|| DEFAULT_BENCHMARK.to_string());
        let bar_limit = config
            .get_int("market_data", "bar_limit", DEFAULT_BAR_LIMIT as i64)
            .max(0) as usize;
        Self::new(data, &benchmark, bar_limit)
    }

    pub fn benchmark(&self) -> &str {
        &self.benchmark
    }
}

impl SnapshotPort for IndicatorSnapshotAdapter<'_> {
    fn get_snapshot(&self, symbol: &str) -> Result<Snapshot, AutotraderError> {
        let symbol = symbol.trim().to_uppercase();
        let bars = self.data.fetch_bars(&symbol, self.bar_limit)?;

        // Without a benchmark the market trend reads as down and RS is unknown.
        let benchmark = match self.data.fetch_bars(&self.benchmark, self.bar_limit) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(benchmark = %self.benchmark, reason = %e, "benchmark unavailable");
                Vec::new()
            }
        };

        analyze(&symbol, &bars, &benchmark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::signal::Signal;
    use chrono::{Days, NaiveDate};
    use std::collections::HashMap;

    struct Bars(HashMap<String, Vec<OhlcvBar>>);

    impl MarketDataPort for Bars {
        fn fetch_bars(&self, symbol: &str, limit: usize) -> Result<Vec<OhlcvBar>, AutotraderError> {
            let bars = self.0.get(symbol).ok_or_else(|| AutotraderError::NotFound {
                symbol: symbol.to_string(),
            })?;
            Ok(bars[bars.len().saturating_sub(limit)..].to_vec())
        }
    }

    fn rising(symbol: &str, n: usize, step: f64) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64 * step;
                OhlcvBar {
                    symbol: symbol.into(),
                    date: start + Days::new(i as u64),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1_000,
                }
            })
            .collect()
    }

    #[test]
    fn uptrending_stock_with_benchmark() {
        let data = Bars(HashMap::from([
            ("AAPL".to_string(), rising("AAPL", 260, 1.0)),
            ("SPY".to_string(), rising("SPY", 260, 0.1)),
        ]));
        let adapter = IndicatorSnapshotAdapter::new(&data, "spy", 300);
        let snap = adapter.get_snapshot("aapl").unwrap();
        assert_eq!(snap.symbol, "AAPL");
        assert_eq!(snap.price, 359.0);
        assert!(snap.above_both_mas);
        assert!(snap.market_trend_up);
        assert!(snap.rs_rating.is_some());
        assert!(snap.signal.is_buy() || snap.signal == Signal::Hold);
    }

    #[test]
    fn missing_benchmark_is_not_fatal() {
        let data = Bars(HashMap::from([("AAPL".to_string(), rising("AAPL", 260, 1.0))]));
        let adapter = IndicatorSnapshotAdapter::new(&data, "SPY", 300);
        let snap = adapter.get_snapshot("AAPL").unwrap();
        assert!(!snap.market_trend_up);
        assert_eq!(snap.rs_rating, None);
    }

    #[test]
    fn unknown_symbol_and_short_history() {
        let data = Bars(HashMap::from([("NEW".to_string(), rising("NEW", 30, 1.0))]));
        let adapter = IndicatorSnapshotAdapter::new(&data, "SPY", 300);
        assert!(matches!(
            adapter.get_snapshot("NOPE").unwrap_err(),
            AutotraderError::NotFound { .. }
        ));
        assert!(matches!(
            adapter.get_snapshot("NEW").unwrap_err(),
            AutotraderError::InsufficientData { bars: 30, .. }
        ));
    }

    #[test]
    fn bar_limit_never_below_minimum() {
        let data = Bars(HashMap::new());
        let adapter = IndicatorSnapshotAdapter::new(&data, "SPY", 10);
        assert_eq!(adapter.bar_limit, MIN_BARS);
        assert_eq!(adapter.benchmark(), "SPY");
    }
}
