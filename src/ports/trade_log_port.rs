//! Append-only trade log port.

use crate::domain::error::AutotraderError;
use crate::domain::limits::DailyCounters;
use crate::domain::trade::TradeRecord;
use chrono::NaiveDate;

pub trait TradeLogPort {
    fn append_trade_record(&self, record: &TradeRecord) -> Result<(), AutotraderError>;

    /// Successful trades for `user_id` dated `today`.
    fn count_trades_today(
        &self,
        user_id: i64,
        today: NaiveDate,
    ) -> Result<DailyCounters, AutotraderError>;

    /// Newest first.
    fn recent_trades(&self, user_id: i64, limit: usize)
    -> Result<Vec<TradeRecord>, AutotraderError>;
}
