//! Snapshot analysis from daily bars.
//!
//! Turns a symbol's bars and a benchmark's bars into a [`Snapshot`]:
//! 50/200-day moving averages and golden cross, 50-day volume breakout,
//! relative strength versus the benchmark, market trend, and a discrete
//! signal with confidence.
//!
//! Signal rules:
//! - close strictly below SMA(50) and/or SMA(200): SELL, 30 confidence per
//!   broken average
//! - otherwise count {above both MAs, volume breakout, market uptrend}:
//!   3 -> STRONG_BUY (95), 2 -> BUY (75)
//! - otherwise HOLD, 50 when above SMA(50), else 30

use crate::domain::error::AutotraderError;
use crate::domain::indicator::sma::{calculate_sma, calculate_volume_sma};
use crate::domain::ohlcv::{period_return, OhlcvBar};
use crate::domain::signal::Signal;
use crate::domain::snapshot::Snapshot;

pub const SHORT_MA: usize = 50;
pub const LONG_MA: usize = 200;
pub const VOLUME_WINDOW: usize = 50;
/// Volume must exceed this multiple of its trailing average.
pub const VOLUME_BREAKOUT_RATIO: f64 = 1.40;
pub const MIN_BARS: usize = LONG_MA;

/// (lookback in bars, weight), most weight first.
const RS_PERIODS: [usize; 4] = [252, 126, 63, 21];
const RS_WEIGHTS: [f64; 4] = [0.4, 0.3, 0.2, 0.1];

#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverages {
    pub price: f64,
    pub short: f64,
    pub long: f64,
    pub golden_cross: bool,
}

impl MovingAverages {
    pub fn above_short(&self) -> bool {
        self.price > self.short
    }

    pub fn above_long(&self) -> bool {
        self.price > self.long
    }

    pub fn above_both(&self) -> bool {
        self.above_short() && self.above_long()
    }

    pub fn below_short(&self) -> bool {
        self.price < self.short
    }

    pub fn below_long(&self) -> bool {
        self.price < self.long
    }
}

pub fn moving_averages(bars: &[OhlcvBar]) -> Option<MovingAverages> {
    let price = bars.last()?.close;
    let short = calculate_sma(bars, SHORT_MA);
    let long = calculate_sma(bars, LONG_MA);

    let (short_now, long_now) = (short.last()?, long.last()?);
    let golden_cross = match (short.back(1), long.back(1)) {
        (Some(short_prev), Some(long_prev)) => short_now > long_now && short_prev <= long_prev,
        _ => false,
    };

    Some(MovingAverages {
        price,
        short: short_now,
        long: long_now,
        golden_cross,
    })
}

pub fn volume_breakout(bars: &[OhlcvBar]) -> bool {
    let (Some(last), Some(avg)) = (bars.last(), calculate_volume_sma(bars, VOLUME_WINDOW).last())
    else {
        return false;
    };
    avg > 0.0 && last.volume as f64 > avg * VOLUME_BREAKOUT_RATIO
}

/// Weighted outperformance versus the benchmark mapped onto 0-100, centred
/// on 50. Lookbacks longer than either series are skipped.
pub fn relative_strength(bars: &[OhlcvBar], benchmark: &[OhlcvBar]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = RS_PERIODS
        .iter()
        .filter_map(|&period| {
            Some((period_return(bars, period)?, period_return(benchmark, period)?))
        })
        .collect();
    if pairs.is_empty() {
        return None;
    }

    let (stock, bench) = pairs
        .iter()
        .zip(RS_WEIGHTS)
        .fold((0.0, 0.0), |(s, b), (&(sr, br), w)| (s + sr * w, b + br * w));
    Some((50.0 + (stock - bench)).clamp(0.0, 100.0))
}

pub fn market_uptrend(benchmark: &[OhlcvBar]) -> bool {
    let Some(price) = benchmark.last().map(|b| b.close) else {
        return false;
    };
    let Some(short) = calculate_sma(benchmark, SHORT_MA).last() else {
        return false;
    };
    match calculate_sma(benchmark, LONG_MA).last() {
        Some(long) => price > short && price > long && short > long,
        None => price > short,
    }
}

pub fn derive_signal(
    averages: &MovingAverages,
    volume_breakout: bool,
    market_up: bool,
) -> (Signal, f64) {
    let broken = [averages.below_short(), averages.below_long()]
        .iter()
        .filter(|&&b| b)
        .count();
    if broken > 0 {
        return (Signal::Sell, (broken as f64 * 30.0).min(100.0));
    }

    let met = [averages.above_both(), volume_breakout, market_up]
        .iter()
        .filter(|&&m| m)
        .count();
    match met {
        3 => (Signal::StrongBuy, 95.0),
        2 => (Signal::Buy, 75.0),
        _ if averages.above_short() => (Signal::Hold, 50.0),
        _ => (Signal::Hold, 30.0),
    }
}

pub fn analyze(
    symbol: &str,
    bars: &[OhlcvBar],
    benchmark: &[OhlcvBar],
) -> Result<Snapshot, AutotraderError> {
    let symbol = symbol.to_uppercase();
    if bars.is_empty() {
        return Err(AutotraderError::NotFound { symbol });
    }
    if bars.len() < MIN_BARS {
        return Err(AutotraderError::InsufficientData {
            symbol,
            bars: bars.len(),
            minimum: MIN_BARS,
        });
    }
    let averages = moving_averages(bars).ok_or_else(|| AutotraderError::InsufficientData {
        symbol: symbol.clone(),
        bars: bars.len(),
        minimum: MIN_BARS,
    })?;

    let breakout = volume_breakout(bars);
    let market_up = market_uptrend(benchmark);
    let (signal, confidence) = derive_signal(&averages, breakout, market_up);

    Ok(Snapshot {
        symbol,
        price: averages.price,
        signal,
        confidence,
        golden_cross: averages.golden_cross,
        above_both_mas: averages.above_both(),
        volume_breakout: breakout,
        rs_rating: relative_strength(bars, benchmark),
        market_trend_up: market_up,
    })
}
