//! In-memory paper brokerage.
//!
//! Bracket orders fill immediately at the order's reference price when cash
//! covers them; the exit legs are not simulated. Closes fill at the latest
//! close from the optional quote source, else at the entry price. State is
//! lost when the process exits.

use crate::domain::error::AutotraderError;
use crate::domain::position::Position;
use crate::domain::trade::BracketOrder;
use crate::ports::brokerage_port::{BrokeragePort, OrderId};
use crate::ports::market_data_port::MarketDataPort;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const DEFAULT_STARTING_CASH: f64 = 100_000.0;

#[derive(Debug)]
struct Account {
    cash: f64,
    positions: HashMap<String, Position>,
    next_order: u64,
}

impl Account {
    fn order_id(&mut self) -> OrderId {
        self.next_order += 1;
        format!("paper-{}", self.next_order)
    }
}

pub struct PaperBroker<'a> {
    account: Mutex<Account>,
    quotes: Option<&'a dyn MarketDataPort>,
}

impl<'a> PaperBroker<'a> {
    pub fn new(starting_cash: f64) -> Self {
        Self {
            account: Mutex::new(Account {
                cash: starting_cash.max(0.0),
                positions: HashMap::new(),
                next_order: 0,
            }),
            quotes: None,
        }
    }

    pub fn with_quotes(mut self, quotes: &'a dyn MarketDataPort) -> Self {
        self.quotes = Some(quotes);
        self
    }

    /// Seed an open position without touching cash.
    pub fn with_position(self, symbol: &str, quantity: i64, entry_price: f64) -> Self {
        self.account().positions.insert(
            symbol.to_uppercase(),
            Position {
                symbol: symbol.to_uppercase(),
                quantity,
                entry_price,
            },
        );
        self
    }

    fn account(&self) -> MutexGuard<'_, Account> {
        self.account.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cash(&self) -> f64 {
        self.account().cash
    }

    pub fn positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self.account().positions.values().cloned().collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        positions
    }

    fn exit_price(&self, position: &Position) -> f64 {
        self.quotes
            .and_then(|q| q.latest_close(&position.symbol).ok())
            .filter(|p| *p > 0.0)
            .unwrap_or(position.entry_price)
    }
}

impl BrokeragePort for PaperBroker<'_> {
    fn get_position(&self, symbol: &str) -> Result<Option<Position>, AutotraderError> {
        Ok(self
            .account()
            .positions
            .get(&symbol.to_uppercase())
            .filter(|p| p.is_open())
            .cloned())
    }

    fn get_buying_power(&self) -> Result<f64, AutotraderError> {
        Ok(self.cash())
    }

    fn submit_bracket_order(&self, order: &BracketOrder) -> Result<OrderId, AutotraderError> {
        let symbol = order.symbol.to_uppercase();
        if order.quantity < 1 || order.reference_price <= 0.0 {
            return Err(AutotraderError::BrokerageRejected {
                symbol,
                reason: "invalid quantity or price".into(),
            });
        }

        let mut account = self.account();
        let cost = order.quantity as f64 * order.reference_price;
        if cost > account.cash {
            return Err(AutotraderError::BrokerageRejected {
                symbol,
                reason: format!(
                    "insufficient buying power: need {:.2}, have {:.2}",
                    cost, account.cash
                ),
            });
        }

        account.cash -= cost;
        let position = account
            .positions
            .entry(symbol.clone())
            .or_insert_with(|| Position {
                symbol: symbol.clone(),
                quantity: 0,
                entry_price: 0.0,
            });
        let held = position.quantity as f64 * position.entry_price;
        position.quantity += order.quantity;
        position.entry_price = (held + cost) / position.quantity as f64;

        let id = account.order_id();
        tracing::info!(
            %symbol,
            quantity = order.quantity,
            price = order.reference_price,
            order_id = %id,
            cash = account.cash,
            "paper bracket order filled"
        );
        Ok(id)
    }

    fn submit_close_order(&self, symbol: &str) -> Result<OrderId, AutotraderError> {
        let symbol = symbol.to_uppercase();
        let position = self
            .account()
            .positions
            .get(&symbol)
            .filter(|p| p.is_open())
            .cloned()
            .ok_or_else(|| AutotraderError::BrokerageRejected {
                symbol: symbol.clone(),
                reason: "no open position".into(),
            })?;

        // Quote lookup happens outside the account lock.
        let price = self.exit_price(&position);

        let mut account = self.account();
        account.cash += position.quantity as f64 * price;
        account.positions.remove(&symbol);
        let id = account.order_id();
        tracing::info!(
            %symbol,
            quantity = position.quantity,
            price,
            order_id = %id,
            pnl = position.unrealized_pnl(price),
            "paper position closed"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    struct FixedQuote(f64);

    impl MarketDataPort for FixedQuote {
        fn fetch_bars(
            &self,
            symbol: &str,
            _limit: usize,
        ) -> Result<Vec<OhlcvBar>, AutotraderError> {
            Ok(vec![OhlcvBar {
                symbol: symbol.into(),
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                open: self.0,
                high: self.0,
                low: self.0,
                close: self.0,
                volume: 1,
            }])
        }
    }

    fn order(quantity: i64, price: f64) -> BracketOrder {
        BracketOrder {
            symbol: "aapl".into(),
            quantity,
            reference_price: price,
            stop_price: price * 0.95,
            take_profit_price: price * 1.10,
        }
    }

    #[test]
    fn bracket_fill_debits_cash_and_opens_position() {
        let broker = PaperBroker::new(10_000.0);
        let id = broker.submit_bracket_order(&order(5, 175.50)).unwrap();
        assert_eq!(id, "paper-1");
        assert_relative_eq!(broker.cash(), 10_000.0 - 877.5);

        let position = broker.get_position("AAPL").unwrap().unwrap();
        assert_eq!(position.quantity, 5);
        assert_relative_eq!(position.entry_price, 175.50);
        assert_relative_eq!(broker.get_buying_power().unwrap(), broker.cash());
    }

    #[test]
    fn adding_to_position_averages_entry() {
        let broker = PaperBroker::new(10_000.0);
        broker.submit_bracket_order(&order(2, 100.0)).unwrap();
        broker.submit_bracket_order(&order(2, 200.0)).unwrap();
        let position = broker.get_position("AAPL").unwrap().unwrap();
        assert_eq!(position.quantity, 4);
        assert_relative_eq!(position.entry_price, 150.0);
    }

    #[test]
    fn unaffordable_order_rejected() {
        let broker = PaperBroker::new(100.0);
        let err = broker.submit_bracket_order(&order(1, 175.50)).unwrap_err();
        assert!(matches!(err, AutotraderError::BrokerageRejected { .. }));
        assert_relative_eq!(broker.cash(), 100.0);
        assert!(broker.get_position("AAPL").unwrap().is_none());
    }

    #[test]
    fn close_uses_latest_quote() {
        let quotes = FixedQuote(110.0);
        let broker = PaperBroker::new(0.0)
            .with_quotes(&quotes)
            .with_position("MSFT", 10, 100.0);
        let id = broker.submit_close_order("msft").unwrap();
        assert_eq!(id, "paper-1");
        assert_relative_eq!(broker.cash(), 1_100.0);
        assert!(broker.positions().is_empty());
    }

    #[test]
    fn close_without_quotes_uses_entry_price() {
        let broker = PaperBroker::new(0.0).with_position("MSFT", 10, 100.0);
        broker.submit_close_order("MSFT").unwrap();
        assert_relative_eq!(broker.cash(), 1_000.0);
    }

    #[test]
    fn close_without_position_rejected() {
        let broker = PaperBroker::new(0.0);
        assert!(matches!(
            broker.submit_close_order("MSFT").unwrap_err(),
            AutotraderError::BrokerageRejected { .. }
        ));
    }
}
