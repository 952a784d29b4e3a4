#![allow(dead_code)]

use autotrader::domain::error::AutotraderError;
use autotrader::domain::limits::DailyCounters;
pub use autotrader::domain::ohlcv::OhlcvBar;
pub use autotrader::domain::position::Position;
pub use autotrader::domain::preferences::TradingPreferences;
pub use autotrader::domain::signal::Signal;
pub use autotrader::domain::snapshot::Snapshot;
pub use autotrader::domain::trade::{BracketOrder, Outcome, Side, TradeRecord};
use autotrader::ports::brokerage_port::{BrokeragePort, OrderId};
use autotrader::ports::snapshot_port::SnapshotPort;
use autotrader::ports::trade_log_port::TradeLogPort;
use chrono::{Days, NaiveDate, NaiveDateTime};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;

/// Snapshots keyed by symbol; unknown symbols fail with `NotFound`.
#[derive(Default)]
pub struct FakeSnapshots {
    pub snapshots: HashMap<String, Snapshot>,
    pub rate_limited: HashSet<String>,
}

impl FakeSnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, snapshot: Snapshot) -> Self {
        self.snapshots.insert(snapshot.symbol.clone(), snapshot);
        self
    }

    pub fn with_rate_limit(mut self, symbol: &str) -> Self {
        self.rate_limited.insert(symbol.to_string());
        self
    }
}

impl SnapshotPort for FakeSnapshots {
    fn get_snapshot(&self, symbol: &str) -> Result<Snapshot, AutotraderError> {
        if self.rate_limited.contains(symbol) {
            return Err(AutotraderError::RateLimited {
                symbol: symbol.to_string(),
            });
        }
        self.snapshots
            .get(symbol)
            .cloned()
            .ok_or_else(|| AutotraderError::NotFound {
                symbol: symbol.to_string(),
            })
    }
}

/// Brokerage that accepts everything unless told otherwise and remembers
/// what it was asked to do.
pub struct FakeBroker {
    pub buying_power: f64,
    pub positions: RefCell<HashMap<String, Position>>,
    pub reject: HashSet<String>,
    pub broken_positions: HashSet<String>,
    pub bracket_orders: RefCell<Vec<BracketOrder>>,
    pub closes: RefCell<Vec<String>>,
    pub buying_power_queries: Cell<usize>,
    next_id: Cell<u64>,
}

impl FakeBroker {
    pub fn new(buying_power: f64) -> Self {
        Self {
            buying_power,
            positions: RefCell::new(HashMap::new()),
            reject: HashSet::new(),
            broken_positions: HashSet::new(),
            bracket_orders: RefCell::new(Vec::new()),
            closes: RefCell::new(Vec::new()),
            buying_power_queries: Cell::new(0),
            next_id: Cell::new(0),
        }
    }

    pub fn with_position(self, symbol: &str, quantity: i64, entry_price: f64) -> Self {
        self.positions.borrow_mut().insert(
            symbol.to_string(),
            Position {
                symbol: symbol.to_string(),
                quantity,
                entry_price,
            },
        );
        self
    }

    pub fn rejecting(mut self, symbol: &str) -> Self {
        self.reject.insert(symbol.to_string());
        self
    }

    pub fn with_broken_position_query(mut self, symbol: &str) -> Self {
        self.broken_positions.insert(symbol.to_string());
        self
    }

    pub fn order_count(&self) -> usize {
        self.bracket_orders.borrow().len() + self.closes.borrow().len()
    }

    fn next_id(&self) -> OrderId {
        self.next_id.set(self.next_id.get() + 1);
        format!("ord-{}", self.next_id.get())
    }
}

impl BrokeragePort for FakeBroker {
    fn get_position(&self, symbol: &str) -> Result<Option<Position>, AutotraderError> {
        if self.broken_positions.contains(symbol) {
            return Err(AutotraderError::BrokerageTransport {
                reason: "connection reset".into(),
            });
        }
        Ok(self.positions.borrow().get(symbol).cloned())
    }

    fn get_buying_power(&self) -> Result<f64, AutotraderError> {
        self.buying_power_queries
            .set(self.buying_power_queries.get() + 1);
        Ok(self.buying_power)
    }

    fn submit_bracket_order(&self, order: &BracketOrder) -> Result<OrderId, AutotraderError> {
        self.bracket_orders.borrow_mut().push(order.clone());
        if self.reject.contains(&order.symbol) {
            return Err(AutotraderError::BrokerageRejected {
                symbol: order.symbol.clone(),
                reason: "market closed".into(),
            });
        }
        Ok(self.next_id())
    }

    fn submit_close_order(&self, symbol: &str) -> Result<OrderId, AutotraderError> {
        self.closes.borrow_mut().push(symbol.to_string());
        if self.reject.contains(symbol) {
            return Err(AutotraderError::BrokerageRejected {
                symbol: symbol.to_string(),
                reason: "market closed".into(),
            });
        }
        self.positions.borrow_mut().remove(symbol);
        Ok(self.next_id())
    }
}

#[derive(Default)]
pub struct MemoryTradeLog {
    pub records: RefCell<Vec<TradeRecord>>,
    pub fail_appends: bool,
}

impl MemoryTradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            records: RefCell::new(Vec::new()),
            fail_appends: true,
        }
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }
}

impl TradeLogPort for MemoryTradeLog {
    fn append_trade_record(&self, record: &TradeRecord) -> Result<(), AutotraderError> {
        if self.fail_appends {
            return Err(AutotraderError::DatabaseQuery {
                reason: "disk full".into(),
            });
        }
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }

    fn count_trades_today(
        &self,
        _user_id: i64,
        today: NaiveDate,
    ) -> Result<DailyCounters, AutotraderError> {
        Ok(DailyCounters::from_records(today, &self.records.borrow()))
    }

    fn recent_trades(
        &self,
        _user_id: i64,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, AutotraderError> {
        Ok(self.records.borrow().iter().rev().take(limit).cloned().collect())
    }
}

pub fn prefs() -> TradingPreferences {
    TradingPreferences {
        min_confidence: 70.0,
        max_position_size: 0.10,
        max_trades_per_day: 5,
        max_buys_per_day: 3,
        max_sells_per_day: 3,
        stop_loss: 0.05,
        take_profit: 0.10,
    }
}

pub fn strong_buy(symbol: &str, price: f64) -> Snapshot {
    Snapshot {
        symbol: symbol.to_string(),
        price,
        signal: Signal::StrongBuy,
        confidence: 85.0,
        golden_cross: true,
        above_both_mas: true,
        volume_breakout: true,
        rs_rating: Some(90.0),
        market_trend_up: true,
    }
}

pub fn sell(symbol: &str, price: f64) -> Snapshot {
    Snapshot {
        signal: Signal::Sell,
        confidence: 60.0,
        ..Snapshot::neutral(symbol, price)
    }
}

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// Daily bars with the given closes and constant volume except the last.
pub fn bars(symbol: &str, closes: &[f64], last_volume: i64) -> Vec<OhlcvBar> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let n = closes.len();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            symbol: symbol.to_string(),
            date: start + Days::new(i as u64),
            open: close,
            high: close,
            low: close,
            close,
            volume: if i + 1 == n { last_volume } else { 1_000 },
        })
        .collect()
}

pub fn write_bars_csv(dir: &Path, bars: &[OhlcvBar]) {
    let Some(first) = bars.first() else {
        return;
    };
    let mut out = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        writeln!(
            out,
            "{},{},{},{},{},{}",
            b.date.format("%Y-%m-%d"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        )
        .unwrap();
    }
    std::fs::write(dir.join(format!("{}.csv", first.symbol)), out).unwrap();
}
