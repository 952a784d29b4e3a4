//! Per-cycle market snapshot for one symbol.

use crate::domain::signal::Signal;

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub symbol: String,
    pub price: f64,
    pub signal: Signal,
    /// 0-100.
    pub confidence: f64,
    pub golden_cross: bool,
    pub above_both_mas: bool,
    pub volume_breakout: bool,
    pub rs_rating: Option<f64>,
    pub market_trend_up: bool,
}

impl Snapshot {
    /// A neutral snapshot: HOLD with no technical facts set.
    pub fn neutral(symbol: &str, price: f64) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            price,
            signal: Signal::Hold,
            confidence: 0.0,
            golden_cross: false,
            above_both_mas: false,
            volume_breakout: false,
            rs_rating: None,
            market_trend_up: false,
        }
    }

    pub fn rs_above(&self, threshold: f64) -> bool {
        self.rs_rating.is_some_and(|rs| rs > threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_uppercases_symbol() {
        let snap = Snapshot::neutral("aapl", 175.5);
        assert_eq!(snap.symbol, "AAPL");
        assert_eq!(snap.signal, Signal::Hold);
        assert!(!snap.golden_cross);
    }

    #[test]
    fn rs_above_requires_a_rating() {
        let mut snap = Snapshot::neutral("AAPL", 100.0);
        assert!(!snap.rs_above(80.0));
        snap.rs_rating = Some(80.0);
        assert!(!snap.rs_above(80.0));
        snap.rs_rating = Some(80.1);
        assert!(snap.rs_above(80.0));
    }
}
