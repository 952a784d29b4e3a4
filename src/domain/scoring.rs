//! Opportunity scoring.
//!
//! Each qualifying condition adds a fixed number of points and appends a
//! fixed reason, in this order:
//!
//! | condition                                   | points |
//! |---------------------------------------------|--------|
//! | BUY/STRONG_BUY with confidence >= 80        | 2      |
//! | golden cross                                | 3      |
//! | price above both moving averages            | 2      |
//! | volume breakout                             | 2      |
//! | RS rating > 80                              | 1      |
//! | market in uptrend                           | 1      |
//! | two or more of the four buy criteria        | 2      |
//!
//! The total is capped at [`MAX_SCORE`].

use crate::domain::snapshot::Snapshot;

pub const MAX_SCORE: u8 = 10;
pub const HIGH_CONFIDENCE: f64 = 80.0;
pub const STRONG_RS: f64 = 80.0;

pub const REASON_HIGH_CONFIDENCE: &str = "High-confidence buy signal";
pub const REASON_GOLDEN_CROSS: &str = "Golden cross: short MA crossed above long MA";
pub const REASON_ABOVE_MAS: &str = "Price above short and long moving averages";
pub const REASON_VOLUME_BREAKOUT: &str = "Volume breakout above 140% of average";
pub const REASON_STRONG_RS: &str = "Relative strength rating above 80";
pub const REASON_MARKET_UPTREND: &str = "Market in uptrend";
pub const REASON_MULTI_CRITERIA: &str = "Multiple buy criteria aligned";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    pub value: u8,
    pub reasons: Vec<&'static str>,
}

impl Score {
    /// Score as a 0.0-1.0 fraction of the maximum.
    pub fn fraction(&self) -> f64 {
        (self.value as f64 / MAX_SCORE as f64).min(1.0)
    }
}

pub fn score_snapshot(snapshot: &Snapshot) -> Score {
    let mut points: u32 = 0;
    let mut reasons = Vec::new();

    let mut add = |condition: bool, value: u32, reason: &'static str| {
        if condition {
            points += value;
            reasons.push(reason);
        }
    };

    add(
        snapshot.signal.is_buy() && snapshot.confidence >= HIGH_CONFIDENCE,
        2,
        REASON_HIGH_CONFIDENCE,
    );
    add(snapshot.golden_cross, 3, REASON_GOLDEN_CROSS);
    add(snapshot.above_both_mas, 2, REASON_ABOVE_MAS);
    add(snapshot.volume_breakout, 2, REASON_VOLUME_BREAKOUT);
    add(snapshot.rs_above(STRONG_RS), 1, REASON_STRONG_RS);
    add(snapshot.market_trend_up, 1, REASON_MARKET_UPTREND);

    let criteria = [
        snapshot.golden_cross,
        snapshot.above_both_mas,
        snapshot.volume_breakout,
        snapshot.rs_above(STRONG_RS),
    ]
    .iter()
    .filter(|&&met| met)
    .count();
    add(criteria >= 2, 2, REASON_MULTI_CRITERIA);

    Score {
        value: points.min(MAX_SCORE as u32) as u8,
        reasons,
    }
}
