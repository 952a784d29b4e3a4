//! Per-user trading preferences port.

use crate::domain::error::AutotraderError;
use crate::domain::preferences::TradingPreferences;

pub trait PreferencesPort {
    /// Fails with `PreferencesMissing` when the user has not configured
    /// every preference.
    fn load_preferences(&self, user_id: i64) -> Result<TradingPreferences, AutotraderError>;
}
