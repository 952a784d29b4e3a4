//! The decision loop: one pass over a user's auto-trade watchlist.
//!
//! Per symbol: snapshot -> score -> position -> limits -> decide -> submit
//! -> record. Any failure before an order is submitted skips just that
//! symbol. Every submitted order, accepted or not, is appended to the trade
//! log; only accepted orders count against the daily limits.

use crate::domain::decision::{decide, Decision, HoldReason};
use crate::domain::error::AutotraderError;
use crate::domain::limits::DailyLimitTracker;
use crate::domain::preferences::TradingPreferences;
use crate::domain::scoring::{score_snapshot, Score};
use crate::domain::snapshot::Snapshot;
use crate::domain::trade::{Outcome, Side, TradeRecord};
use crate::domain::watchlist::{auto_trade_symbols, WatchlistEntry};
use crate::ports::brokerage_port::{BrokeragePort, OrderId};
use crate::ports::snapshot_port::SnapshotPort;
use crate::ports::trade_log_port::TradeLogPort;
use chrono::NaiveDateTime;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    Bought { order_id: OrderId, quantity: i64 },
    Sold { order_id: OrderId, quantity: i64 },
    OrderFailed { side: Side, reason: String },
    /// Position, buying power or counters could not be read; no order sent.
    Unavailable { reason: String },
    Held { score: u8, reason: HoldReason },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub evaluated: usize,
    pub bought: usize,
    pub sold: usize,
    pub held: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl PassReport {
    fn tally(&mut self, outcome: &SymbolOutcome) {
        self.evaluated += 1;
        match outcome {
            SymbolOutcome::Bought { .. } => self.bought += 1,
            SymbolOutcome::Sold { .. } => self.sold += 1,
            SymbolOutcome::OrderFailed { .. } | SymbolOutcome::Unavailable { .. } => {
                self.failed += 1
            }
            SymbolOutcome::Held { .. } => self.held += 1,
            SymbolOutcome::Skipped { .. } => self.skipped += 1,
        }
    }
}

pub struct AutoTrader<'a> {
    user_id: i64,
    snapshots: &'a dyn SnapshotPort,
    broker: &'a dyn BrokeragePort,
    trade_log: &'a dyn TradeLogPort,
    tracker: DailyLimitTracker,
}

impl<'a> AutoTrader<'a> {
    pub fn new(
        user_id: i64,
        snapshots: &'a dyn SnapshotPort,
        broker: &'a dyn BrokeragePort,
        trade_log: &'a dyn TradeLogPort,
    ) -> Self {
        Self {
            user_id,
            snapshots,
            broker,
            trade_log,
            tracker: DailyLimitTracker::new(user_id),
        }
    }

    pub fn tracker(&self) -> &DailyLimitTracker {
        &self.tracker
    }

    /// Evaluate every auto-trade-enabled entry once, sequentially.
    pub fn run_pass(
        &self,
        watchlist: &[WatchlistEntry],
        prefs: &TradingPreferences,
        now: NaiveDateTime,
    ) -> PassReport {
        let symbols = auto_trade_symbols(watchlist);
        let mut report = PassReport::default();

        if symbols.is_empty() {
            info!(user_id = self.user_id, "no symbols enabled for auto-trading");
            return report;
        }
        info!(
            user_id = self.user_id,
            count = symbols.len(),
            "checking symbols for auto-trading"
        );

        for symbol in &symbols {
            let outcome = self.process_symbol(symbol, prefs, now);
            report.tally(&outcome);
        }

        if let Some(c) = self.tracker.snapshot() {
            info!(
                user_id = self.user_id,
                buys = c.buys,
                sells = c.sells,
                total = c.total,
                bought = report.bought,
                sold = report.sold,
                held = report.held,
                failed = report.failed,
                skipped = report.skipped,
                "pass complete"
            );
        }
        report
    }

    pub fn process_symbol(
        &self,
        symbol: &str,
        prefs: &TradingPreferences,
        now: NaiveDateTime,
    ) -> SymbolOutcome {
        let symbol = symbol.trim().to_uppercase();

        let snapshot = match self.snapshots.get_snapshot(&symbol) {
            Ok(s) => s,
            Err(e) => {
                warn!(%symbol, %now, reason = %e, "snapshot unavailable, skipping");
                return SymbolOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let score = score_snapshot(&snapshot);
        info!(
            %symbol,
            signal = %snapshot.signal,
            confidence = snapshot.confidence,
            score = score.value,
            reasons = ?score.reasons,
            "scored"
        );

        let position = match self.broker.get_position(&symbol) {
            Ok(p) => p,
            Err(e) => return self.unavailable(&symbol, now, "position query failed", e),
        };

        // Held until the order outcome is counted.
        let mut counters = match self.tracker.lock(now.date(), self.trade_log) {
            Ok(c) => c,
            Err(e) => return self.unavailable(&symbol, now, "daily counters unavailable", e),
        };

        let decision = match decide(
            &snapshot,
            &score,
            position.as_ref(),
            &counters,
            prefs,
            || self.broker.get_buying_power(),
        ) {
            Ok(d) => d,
            Err(e) => return self.unavailable(&symbol, now, "buying power query failed", e),
        };

        match decision {
            Decision::Hold(reason) => {
                info!(%symbol, score = score.value, %reason, "no order");
                SymbolOutcome::Held {
                    score: score.value,
                    reason,
                }
            }
            Decision::Buy(order) => {
                info!(
                    %symbol,
                    quantity = order.quantity,
                    price = order.reference_price,
                    stop = order.stop_price,
                    target = order.take_profit_price,
                    "submitting bracket buy"
                );
                let result = self.broker.submit_bracket_order(&order);
                let reason = buy_reason(&snapshot, &score);
                let outcome = self.record(
                    &symbol,
                    Side::Buy,
                    order.quantity,
                    snapshot.price,
                    now,
                    reason,
                    result,
                );
                if let SymbolOutcome::Bought { .. } = outcome {
                    counters.record(Side::Buy);
                }
                outcome
            }
            Decision::Sell { quantity } => {
                info!(%symbol, quantity, "submitting close order");
                let result = self.broker.submit_close_order(&symbol);
                let reason = format!(
                    "auto-trade: {} signal ({:.0}% confidence)",
                    snapshot.signal, snapshot.confidence
                );
                let outcome = self.record(
                    &symbol,
                    Side::Sell,
                    quantity,
                    snapshot.price,
                    now,
                    reason,
                    result,
                );
                if let SymbolOutcome::Sold { .. } = outcome {
                    counters.record(Side::Sell);
                }
                outcome
            }
        }
    }

    fn unavailable(
        &self,
        symbol: &str,
        now: NaiveDateTime,
        context: &str,
        err: AutotraderError,
    ) -> SymbolOutcome {
        error!(%symbol, %now, reason = %err, "{context}, skipping");
        SymbolOutcome::Unavailable {
            reason: format!("{context}: {err}"),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        symbol: &str,
        side: Side,
        quantity: i64,
        price: f64,
        now: NaiveDateTime,
        reason: String,
        result: Result<OrderId, AutotraderError>,
    ) -> SymbolOutcome {
        let (order_id, outcome, reason) = match &result {
            Ok(id) => (Some(id.clone()), Outcome::Submitted, reason),
            Err(e) => (None, Outcome::Failed, format!("{reason}; failed: {e}")),
        };

        let record = TradeRecord {
            user_id: self.user_id,
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
            timestamp: now,
            order_id,
            outcome,
            reason,
        };
        if let Err(e) = self.trade_log.append_trade_record(&record) {
            error!(%symbol, %now, reason = %e, "failed to append trade record");
        }

        match result {
            Ok(order_id) => {
                info!(%symbol, %side, quantity, %order_id, "order submitted");
                match side {
                    Side::Buy => SymbolOutcome::Bought { order_id, quantity },
                    Side::Sell => SymbolOutcome::Sold { order_id, quantity },
                }
            }
            Err(e) => {
                error!(%symbol, %side, %now, reason = %e, "order failed");
                SymbolOutcome::OrderFailed {
                    side,
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn buy_reason(snapshot: &Snapshot, score: &Score) -> String {
    format!(
        "auto-trade: {} ({:.0}% confidence), score {}/10: {}",
        snapshot.signal,
        snapshot.confidence,
        score.value,
        score.reasons.join("; ")
    )
}
