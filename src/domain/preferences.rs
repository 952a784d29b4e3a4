//! Per-user trading preferences.
//!
//! Preferences are stored as string settings. Percent-valued settings are
//! stored as 0-100 and converted to fractions here. Every key is required:
//! no default preferences are assumed for a user.

use crate::domain::error::AutotraderError;
use std::collections::HashMap;

pub const KEY_MIN_CONFIDENCE: &str = "min_confidence";
pub const KEY_MAX_POSITION_PCT: &str = "max_position_pct";
pub const KEY_MAX_TRADES_PER_DAY: &str = "max_trades_per_day";
pub const KEY_MAX_BUYS_PER_DAY: &str = "max_buys_per_day";
pub const KEY_MAX_SELLS_PER_DAY: &str = "max_sells_per_day";
pub const KEY_STOP_LOSS_PCT: &str = "stop_loss_pct";
pub const KEY_TAKE_PROFIT_PCT: &str = "take_profit_pct";

pub const PREFERENCE_KEYS: [&str; 7] = [
    KEY_MIN_CONFIDENCE,
    KEY_MAX_POSITION_PCT,
    KEY_MAX_TRADES_PER_DAY,
    KEY_MAX_BUYS_PER_DAY,
    KEY_MAX_SELLS_PER_DAY,
    KEY_STOP_LOSS_PCT,
    KEY_TAKE_PROFIT_PCT,
];

const SECTION: &str = "preferences";

#[derive(Debug, Clone, PartialEq)]
pub struct TradingPreferences {
    /// 0-100.
    pub min_confidence: f64,
    /// Fraction of buying power, 0-1.
    pub max_position_size: f64,
    pub max_trades_per_day: u32,
    pub max_buys_per_day: u32,
    pub max_sells_per_day: u32,
    /// Fraction below entry, 0-1.
    pub stop_loss: f64,
    /// Fraction above entry.
    pub take_profit: f64,
}

impl TradingPreferences {
    /// Build preferences from raw settings, failing on the first missing or
    /// invalid key.
    pub fn from_settings(
        user_id: i64,
        settings: &HashMap<String, String>,
    ) -> Result<Self, AutotraderError> {
        let prefs = Self {
            min_confidence: percent(user_id, settings, KEY_MIN_CONFIDENCE)?,
            max_position_size: percent(user_id, settings, KEY_MAX_POSITION_PCT)? / 100.0,
            max_trades_per_day: count(user_id, settings, KEY_MAX_TRADES_PER_DAY)?,
            max_buys_per_day: count(user_id, settings, KEY_MAX_BUYS_PER_DAY)?,
            max_sells_per_day: count(user_id, settings, KEY_MAX_SELLS_PER_DAY)?,
            stop_loss: percent(user_id, settings, KEY_STOP_LOSS_PCT)? / 100.0,
            take_profit: non_negative(user_id, settings, KEY_TAKE_PROFIT_PCT)? / 100.0,
        };
        prefs.validate()?;
        Ok(prefs)
    }

    /// Settings representation, the inverse of [`from_settings`](Self::from_settings).
    pub fn to_settings(&self) -> Vec<(&'static str, String)> {
        vec![
            (KEY_MIN_CONFIDENCE, format_number(self.min_confidence)),
            (KEY_MAX_POSITION_PCT, format_number(self.max_position_size * 100.0)),
            (KEY_MAX_TRADES_PER_DAY, self.max_trades_per_day.to_string()),
            (KEY_MAX_BUYS_PER_DAY, self.max_buys_per_day.to_string()),
            (KEY_MAX_SELLS_PER_DAY, self.max_sells_per_day.to_string()),
            (KEY_STOP_LOSS_PCT, format_number(self.stop_loss * 100.0)),
            (KEY_TAKE_PROFIT_PCT, format_number(self.take_profit * 100.0)),
        ]
    }

    pub fn validate(&self) -> Result<(), AutotraderError> {
        if !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(invalid(KEY_MIN_CONFIDENCE, "must be between 0 and 100"));
        }
        if !(0.0..=1.0).contains(&self.max_position_size) || self.max_position_size == 0.0 {
            return Err(invalid(
                KEY_MAX_POSITION_PCT,
                "must be greater than 0 and at most 100",
            ));
        }
        if self.stop_loss >= 1.0 {
            return Err(invalid(KEY_STOP_LOSS_PCT, "must be below 100"));
        }
        Ok(())
    }
}

fn format_number(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

fn invalid(key: &str, reason: &str) -> AutotraderError {
    AutotraderError::ConfigInvalid {
        section: SECTION.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn raw<'a>(
    user_id: i64,
    settings: &'a HashMap<String, String>,
    key: &str,
) -> Result<&'a str, AutotraderError> {
    settings
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AutotraderError::PreferencesMissing {
            user_id,
            key: key.to_string(),
        })
}

fn non_negative(
    user_id: i64,
    settings: &HashMap<String, String>,
    key: &str,
) -> Result<f64, AutotraderError> {
    let value: f64 = raw(user_id, settings, key)?
        .parse()
        .map_err(|_| invalid(key, "not a number"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(key, "must be non-negative"));
    }
    Ok(value)
}

fn percent(
    user_id: i64,
    settings: &HashMap<String, String>,
    key: &str,
) -> Result<f64, AutotraderError> {
    let value = non_negative(user_id, settings, key)?;
    if value > 100.0 {
        return Err(invalid(key, "must be between 0 and 100"));
    }
    Ok(value)
}

fn count(
    user_id: i64,
    settings: &HashMap<String, String>,
    key: &str,
) -> Result<u32, AutotraderError> {
    raw(user_id, settings, key)?
        .parse()
        .map_err(|_| invalid(key, "must be a non-negative integer"))
}
