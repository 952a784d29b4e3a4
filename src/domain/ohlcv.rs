//! OHLCV bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Percent change of close from `bars[len - period]` to the last bar.
pub fn period_return(bars: &[OhlcvBar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let start = bars[bars.len() - period].close;
    let end = bars[bars.len() - 1].close;
    if start == 0.0 {
        return None;
    }
    Some((end - start) / start * 100.0)
}
