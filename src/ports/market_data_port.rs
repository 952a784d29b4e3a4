//! Daily bar source port.

use crate::domain::error::AutotraderError;
use crate::domain::ohlcv::OhlcvBar;

pub trait MarketDataPort {
    /// Up to `limit` most recent daily bars, oldest first.
    fn fetch_bars(&self, symbol: &str, limit: usize) -> Result<Vec<OhlcvBar>, AutotraderError>;

    /// Most recent close, used to price fills.
    fn latest_close(&self, symbol: &str) -> Result<f64, AutotraderError> {
        self.fetch_bars(symbol, 1)?
            .last()
            .map(|b| b.close)
            .ok_or_else(|| AutotraderError::NotFound {
                symbol: symbol.to_string(),
            })
    }
}
