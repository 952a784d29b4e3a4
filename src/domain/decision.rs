//! Buy / sell / hold decision for one symbol.
//!
//! Pure apart from the buying-power lookup, which is deferred until the buy
//! path is otherwise eligible.

use crate::domain::limits::DailyCounters;
use crate::domain::position::Position;
use crate::domain::preferences::TradingPreferences;
use crate::domain::scoring::Score;
use crate::domain::signal::Signal;
use crate::domain::snapshot::Snapshot;
use crate::domain::trade::BracketOrder;
use std::fmt;

pub const MIN_BUY_SCORE: u8 = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Buy(BracketOrder),
    /// Close the entire position.
    Sell { quantity: i64 },
    Hold(HoldReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    NoActionableSignal(Signal),
    ConfidenceBelowThreshold,
    ScoreBelowThreshold,
    DailyBuyLimit,
    DailySellLimit,
    DailyTradeLimit,
    AlreadyHolding,
    NoPositionToSell,
    InvalidPrice,
    InsufficientBuyingPower,
}

impl fmt::Display for HoldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldReason::NoActionableSignal(signal) => write!(f, "hold: {signal} signal"),
            HoldReason::ConfidenceBelowThreshold => {
                f.write_str("skipped: confidence below threshold")
            }
            HoldReason::ScoreBelowThreshold => f.write_str("skipped: score below threshold"),
            HoldReason::DailyBuyLimit => f.write_str("skipped: daily buy limit reached"),
            HoldReason::DailySellLimit => f.write_str("skipped: daily sell limit reached"),
            HoldReason::DailyTradeLimit => f.write_str("skipped: daily trade limit reached"),
            HoldReason::AlreadyHolding => f.write_str("skipped: position already open"),
            HoldReason::NoPositionToSell => f.write_str("skipped: no position to sell"),
            HoldReason::InvalidPrice => f.write_str("skipped: invalid price"),
            HoldReason::InsufficientBuyingPower => {
                f.write_str("skipped: insufficient buying power for one share")
            }
        }
    }
}

/// Fraction of buying power to commit: `max_position_size * min(score / 10, 1)`.
pub fn position_fraction(prefs: &TradingPreferences, score: &Score) -> f64 {
    prefs.max_position_size * score.fraction()
}

/// Size a bracket order; `None` when not even one share is affordable.
pub fn size_bracket_order(
    snapshot: &Snapshot,
    score: &Score,
    buying_power: f64,
    prefs: &TradingPreferences,
) -> Option<BracketOrder> {
    let budget = buying_power.max(0.0) * position_fraction(prefs, score);
    let quantity = (budget / snapshot.price).floor() as i64;
    if quantity < 1 {
        return None;
    }
    Some(BracketOrder {
        symbol: snapshot.symbol.clone(),
        quantity,
        reference_price: snapshot.price,
        stop_price: snapshot.price * (1.0 - prefs.stop_loss),
        take_profit_price: snapshot.price * (1.0 + prefs.take_profit),
    })
}

fn buy_gate(
    snapshot: &Snapshot,
    score: &Score,
    position: Option<&Position>,
    counters: &DailyCounters,
    prefs: &TradingPreferences,
) -> Result<(), HoldReason> {
    if snapshot.confidence < prefs.min_confidence {
        return Err(HoldReason::ConfidenceBelowThreshold);
    }
    if score.value < MIN_BUY_SCORE {
        return Err(HoldReason::ScoreBelowThreshold);
    }
    if counters.buys >= prefs.max_buys_per_day {
        return Err(HoldReason::DailyBuyLimit);
    }
    if !counters.can_trade(prefs) {
        return Err(HoldReason::DailyTradeLimit);
    }
    if position.is_some_and(Position::is_open) {
        return Err(HoldReason::AlreadyHolding);
    }
    if !(snapshot.price.is_finite() && snapshot.price > 0.0) {
        return Err(HoldReason::InvalidPrice);
    }
    Ok(())
}

fn sell_gate(
    position: Option<&Position>,
    counters: &DailyCounters,
    prefs: &TradingPreferences,
) -> Result<i64, HoldReason> {
    let quantity = match position {
        Some(p) if p.is_long() => p.quantity,
        _ => return Err(HoldReason::NoPositionToSell),
    };
    if counters.sells >= prefs.max_sells_per_day {
        return Err(HoldReason::DailySellLimit);
    }
    if !counters.can_trade(prefs) {
        return Err(HoldReason::DailyTradeLimit);
    }
    Ok(quantity)
}

/// Decide what to do with one symbol this pass.
///
/// The buy path is evaluated first. Only an exact SELL signal closes a
/// position; the sell side has no score or confidence gate.
pub fn decide<E>(
    snapshot: &Snapshot,
    score: &Score,
    position: Option<&Position>,
    counters: &DailyCounters,
    prefs: &TradingPreferences,
    buying_power: impl FnOnce() -> Result<f64, E>,
) -> Result<Decision, E> {
    if snapshot.signal.is_buy() {
        if let Err(reason) = buy_gate(snapshot, score, position, counters, prefs) {
            return Ok(Decision::Hold(reason));
        }
        let power = buying_power()?;
        return Ok(match size_bracket_order(snapshot, score, power, prefs) {
            Some(order) => Decision::Buy(order),
            None => Decision::Hold(HoldReason::InsufficientBuyingPower),
        });
    }

    if snapshot.signal == Signal::Sell {
        return Ok(match sell_gate(position, counters, prefs) {
            Ok(quantity) => Decision::Sell { quantity },
            Err(reason) => Decision::Hold(reason),
        });
    }

    Ok(Decision::Hold(HoldReason::NoActionableSignal(snapshot.signal)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scoring::score_snapshot;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use std::convert::Infallible;

    fn prefs() -> TradingPreferences {
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

    fn strong_snapshot() -> Snapshot {
        Snapshot {
            symbol: "AAPL".into(),
            price: 175.50,
            signal: Signal::StrongBuy,
            confidence: 85.0,
            golden_cross: true,
            above_both_mas: true,
            volume_breakout: true,
            rs_rating: Some(90.0),
            market_trend_up: true,
        }
    }

    fn counters() -> DailyCounters {
        DailyCounters::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
    }

    fn held(quantity: i64) -> Position {
        Position {
            symbol: "AAPL".into(),
            quantity,
            entry_price: 150.0,
        }
    }

    fn run(
        snap: &Snapshot,
        position: Option<&Position>,
        counters: &DailyCounters,
        buying_power: f64,
    ) -> Decision {
        let score = score_snapshot(snap);
        decide(snap, &score, position, counters, &prefs(), || {
            Ok::<_, Infallible>(buying_power)
        })
        .unwrap()
    }

    #[test]
    fn strong_buy_sizes_five_shares() {
        let snap = strong_snapshot();
        match run(&snap, None, &counters(), 10_000.0) {
            Decision::Buy(order) => {
                assert_eq!(order.symbol, "AAPL");
                assert_eq!(order.quantity, 5);
                assert_relative_eq!(order.reference_price, 175.50);
                assert_relative_eq!(order.stop_price, 175.50 * 0.95, epsilon = 1e-9);
                assert_relative_eq!(order.take_profit_price, 175.50 * 1.10, epsilon = 1e-9);
            }
            other => panic!("expected buy, got {other:?}"),
        }
    }

    #[test]
    fn position_fraction_scales_with_score() {
        let mut snap = strong_snapshot();
        snap.golden_cross = false;
        snap.market_trend_up = false;
        // 2 + 2 + 2 + 1 + 2 = 9
        let score = score_snapshot(&snap);
        assert_eq!(score.value, 9);
        assert_relative_eq!(position_fraction(&prefs(), &score), 0.09, epsilon = 1e-12);
    }

    #[test]
    fn buy_limit_reached_holds() {
        let mut c = counters();
        c.buys = 3;
        c.total = 3;
        assert_eq!(
            run(&strong_snapshot(), None, &c, 10_000.0),
            Decision::Hold(HoldReason::DailyBuyLimit)
        );
        assert_eq!(
            HoldReason::DailyBuyLimit.to_string(),
            "skipped: daily buy limit reached"
        );
    }

    #[test]
    fn total_limit_reached_holds() {
        let mut c = counters();
        c.sells = 3;
        c.buys = 2;
        c.total = 5;
        assert_eq!(
            run(&strong_snapshot(), None, &c, 10_000.0),
            Decision::Hold(HoldReason::DailyTradeLimit)
        );
    }

    #[test]
    fn low_confidence_holds() {
        let mut snap = strong_snapshot();
        snap.confidence = 69.0;
        assert_eq!(
            run(&snap, None, &counters(), 10_000.0),
            Decision::Hold(HoldReason::ConfidenceBelowThreshold)
        );
    }

    #[test]
    fn low_score_holds() {
        let mut snap = Snapshot::neutral("AAPL", 100.0);
        snap.signal = Signal::Buy;
        snap.confidence = 75.0;
        snap.above_both_mas = true;
        assert_eq!(
            run(&snap, None, &counters(), 10_000.0),
            Decision::Hold(HoldReason::ScoreBelowThreshold)
        );
    }

    #[test]
    fn existing_position_blocks_buy() {
        let pos = held(10);
        assert_eq!(
            run(&strong_snapshot(), Some(&pos), &counters(), 10_000.0),
            Decision::Hold(HoldReason::AlreadyHolding)
        );
    }

    #[test]
    fn zero_quantity_holds() {
        assert_eq!(
            run(&strong_snapshot(), None, &counters(), 1_000.0),
            Decision::Hold(HoldReason::InsufficientBuyingPower)
        );
    }

    #[test]
    fn buying_power_not_queried_when_gated() {
        let snap = strong_snapshot();
        let score = score_snapshot(&snap);
        let mut c = counters();
        c.buys = 3;
        let decision = decide(&snap, &score, None, &c, &prefs(), || {
            Err::<f64, &str>("should not be called")
        });
        assert_eq!(decision, Ok(Decision::Hold(HoldReason::DailyBuyLimit)));
    }

    #[test]
    fn buying_power_error_propagates() {
        let snap = strong_snapshot();
        let score = score_snapshot(&snap);
        let decision = decide(&snap, &score, None, &counters(), &prefs(), || {
            Err::<f64, &str>("down")
        });
        assert_eq!(decision, Err("down"));
    }

    #[test]
    fn sell_closes_whole_position() {
        let mut snap = Snapshot::neutral("AAPL", 140.0);
        snap.signal = Signal::Sell;
        snap.confidence = 30.0;
        let pos = held(12);
        assert_eq!(
            run(&snap, Some(&pos), &counters(), 0.0),
            Decision::Sell { quantity: 12 }
        );
    }

    #[test]
    fn sell_without_position_holds() {
        let mut snap = Snapshot::neutral("AAPL", 140.0);
        snap.signal = Signal::Sell;
        assert_eq!(
            run(&snap, None, &counters(), 0.0),
            Decision::Hold(HoldReason::NoPositionToSell)
        );
    }

    #[test]
    fn sell_ignores_short_position() {
        let mut snap = Snapshot::neutral("AAPL", 140.0);
        snap.signal = Signal::Sell;
        assert_eq!(
            run(&snap, Some(&held(-7)), &counters(), 0.0),
            Decision::Hold(HoldReason::NoPositionToSell)
        );
    }

    #[test]
    fn sell_limit_reached_holds() {
        let mut snap = Snapshot::neutral("AAPL", 140.0);
        snap.signal = Signal::Sell;
        let mut c = counters();
        c.sells = 3;
        c.total = 3;
        assert_eq!(
            run(&snap, Some(&held(5)), &c, 0.0),
            Decision::Hold(HoldReason::DailySellLimit)
        );
    }

    #[test]
    fn strong_sell_and_hold_do_nothing() {
        for signal in [Signal::StrongSell, Signal::Hold] {
            let mut snap = Snapshot::neutral("AAPL", 140.0);
            snap.signal = signal;
            assert_eq!(
                run(&snap, Some(&held(5)), &counters(), 10_000.0),
                Decision::Hold(HoldReason::NoActionableSignal(signal))
            );
        }
    }
}
