//! Trade records written for every attempted order.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Submitted,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Submitted => "submitted",
            Outcome::Failed => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "submitted" => Ok(Outcome::Submitted),
            "failed" => Ok(Outcome::Failed),
            other => Err(format!("unknown outcome: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub user_id: i64,
    pub symbol: String,
    pub side: Side,
    pub quantity: i64,
    pub price: f64,
    pub timestamp: NaiveDateTime,
    pub order_id: Option<String>,
    pub outcome: Outcome,
    pub reason: String,
}

impl TradeRecord {
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Submitted
    }
}

/// Entry order with attached stop-loss and take-profit exits.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketOrder {
    pub symbol: String,
    pub quantity: i64,
    /// Price the order was sized against.
    pub reference_price: f64,
    pub stop_price: f64,
    pub take_profit_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_parse_and_display() {
        assert_eq!("buy".parse::<Side>(), Ok(Side::Buy));
        assert_eq!("SELL".parse::<Side>(), Ok(Side::Sell));
        assert!("short".parse::<Side>().is_err());
        assert_eq!(Side::Buy.to_string(), "BUY");
    }

    #[test]
    fn outcome_parse_and_display() {
        assert_eq!("submitted".parse::<Outcome>(), Ok(Outcome::Submitted));
        assert_eq!("FAILED".parse::<Outcome>(), Ok(Outcome::Failed));
        assert!("pending".parse::<Outcome>().is_err());
        assert_eq!(Outcome::Failed.to_string(), "failed");
    }

    #[test]
    fn success_follows_outcome() {
        let mut record = TradeRecord {
            user_id: 1,
            symbol: "AAPL".into(),
            side: Side::Buy,
            quantity: 5,
            price: 175.5,
            timestamp: chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            order_id: Some("abc".into()),
            outcome: Outcome::Submitted,
            reason: "score 10".into(),
        };
        assert!(record.is_success());
        record.outcome = Outcome::Failed;
        assert!(!record.is_success());
    }
}
