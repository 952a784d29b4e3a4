//! Daily trade limits.
//!
//! Counters are keyed by calendar date and rebuilt from the trade log on the
//! first access of each day, so a restart mid-day keeps the day's counts.
//! The counters sit behind a mutex; holding the guard across
//! check -> submit -> increment makes that sequence one critical section per
//! account.

use crate::domain::error::AutotraderError;
use crate::domain::preferences::TradingPreferences;
use crate::domain::trade::{Side, TradeRecord};
use crate::ports::trade_log_port::TradeLogPort;
use chrono::NaiveDate;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCounters {
    pub date: NaiveDate,
    pub buys: u32,
    pub sells: u32,
    pub total: u32,
}

impl DailyCounters {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            buys: 0,
            sells: 0,
            total: 0,
        }
    }

    /// Counts the successful records dated `date`.
    pub fn from_records(date: NaiveDate, records: &[TradeRecord]) -> Self {
        let mut counters = Self::new(date);
        records
            .iter()
            .filter(|r| r.is_success() && r.timestamp.date() == date)
            .for_each(|r| counters.record(r.side));
        counters
    }

    pub fn can_trade(&self, prefs: &TradingPreferences) -> bool {
        self.total < prefs.max_trades_per_day
    }

    pub fn can_buy(&self, prefs: &TradingPreferences) -> bool {
        self.buys < prefs.max_buys_per_day && self.can_trade(prefs)
    }

    pub fn can_sell(&self, prefs: &TradingPreferences) -> bool {
        self.sells < prefs.max_sells_per_day && self.can_trade(prefs)
    }

    /// Count one successful order. Only call after the brokerage accepted it.
    pub fn record(&mut self, side: Side) {
        match side {
            Side::Buy => self.buys += 1,
            Side::Sell => self.sells += 1,
        }
        self.total += 1;
    }

    pub fn within(&self, prefs: &TradingPreferences) -> bool {
        self.buys <= prefs.max_buys_per_day
            && self.sells <= prefs.max_sells_per_day
            && self.total <= prefs.max_trades_per_day
    }
}

pub struct DailyLimitTracker {
    user_id: i64,
    counters: Mutex<DailyCounters>,
}

impl DailyLimitTracker {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            counters: Mutex::new(DailyCounters::new(NaiveDate::MIN)),
        }
    }

    /// Lock the counters for `today`. On the first access of a new day the
    /// counts are reloaded from the trade log before anything is checked.
    pub fn lock<'a>(
        &'a self,
        today: NaiveDate,
        trade_log: &dyn TradeLogPort,
    ) -> Result<MutexGuard<'a, DailyCounters>, AutotraderError> {
        let mut guard = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.date != today {
            let mut loaded = trade_log.count_trades_today(self.user_id, today)?;
            loaded.date = today;
            tracing::debug!(
                user_id = self.user_id,
                %today,
                buys = loaded.buys,
                sells = loaded.sells,
                total = loaded.total,
                "daily counters loaded"
            );
            *guard = loaded;
        }
        Ok(guard)
    }

    /// Last loaded counters, if any day has been accessed yet.
    pub fn snapshot(&self) -> Option<DailyCounters> {
        let guard = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (guard.date != NaiveDate::MIN).then_some(*guard)
    }
}
