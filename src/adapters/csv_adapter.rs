//! CSV market data adapter.
//!
//! One file per symbol at `<dir>/<SYMBOL>.csv` with a header row and columns
//! `date,open,high,low,close,volume` (date as `YYYY-MM-DD`).

use crate::domain::error::AutotraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn field<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    symbol: &str,
) -> Result<T, AutotraderError>
where
    T::Err: std::fmt::Display,
{
    let raw = record.get(index).ok_or_else(|| AutotraderError::InvalidData {
        symbol: symbol.to_string(),
        reason: format!("missing {name} column"),
    })?;
    raw.trim().parse().map_err(|e: T::Err| AutotraderError::InvalidData {
        symbol: symbol.to_string(),
        reason: format!("invalid {name} value {raw:?}: {e}"),
    })
}

impl MarketDataPort for CsvAdapter {
    fn fetch_bars(&self, symbol: &str, limit: usize) -> Result<Vec<OhlcvBar>, AutotraderError> {
        let symbol = symbol.trim().to_uppercase();
        let path = self.csv_path(&symbol);
        if !path.exists() {
            return Err(AutotraderError::NotFound { symbol });
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(|e| AutotraderError::InvalidData {
            symbol: symbol.clone(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| AutotraderError::InvalidData {
                symbol: symbol.clone(),
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str: String = field(&record, 0, "date", &symbol)?;
            let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                AutotraderError::InvalidData {
                    symbol: symbol.clone(),
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            bars.push(OhlcvBar {
                symbol: symbol.clone(),
                date,
                open: field(&record, 1, "open", &symbol)?,
                high: field(&record, 2, "high", &symbol)?,
                low: field(&record, 3, "low", &symbol)?,
                close: field(&record, 4, "close", &symbol)?,
                volume: field(&record, 5, "volume", &symbol)?,
            });
        }

        if bars.is_empty() {
            return Err(AutotraderError::NotFound { symbol });
        }

        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        if bars.len() > limit {
            bars.drain(..bars.len() - limit);
        }
        Ok(bars)
    }
}
