//! Domain error types.

/// Top-level error type for autotrader.
#[derive(Debug, thiserror::Error)]
pub enum AutotraderError {
    #[error("no market data found for {symbol}")]
    NotFound { symbol: String },

    #[error("network failure fetching {symbol}: {reason}")]
    NetworkFailure { symbol: String, reason: String },

    #[error("rate limited fetching {symbol}")]
    RateLimited { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("malformed market data for {symbol}: {reason}")]
    InvalidData { symbol: String, reason: String },

    #[error("order for {symbol} rejected: {reason}")]
    BrokerageRejected { symbol: String, reason: String },

    #[error("brokerage transport error: {reason}")]
    BrokerageTransport { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("trading preferences for user {user_id} are not configured (missing {key})")]
    PreferencesMissing { user_id: i64, key: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AutotraderError {
    /// True for the failures a snapshot provider reports; the symbol is
    /// skipped for this pass and the loop moves on.
    pub fn is_snapshot_unavailable(&self) -> bool {
        matches!(
            self,
            AutotraderError::NotFound { .. }
                | AutotraderError::NetworkFailure { .. }
                | AutotraderError::RateLimited { .. }
                | AutotraderError::InsufficientData { .. }
                | AutotraderError::InvalidData { .. }
        )
    }

    pub fn is_brokerage(&self) -> bool {
        matches!(
            self,
            AutotraderError::BrokerageRejected { .. } | AutotraderError::BrokerageTransport { .. }
        )
    }
}

impl From<&AutotraderError> for std::process::ExitCode {
    fn from(err: &AutotraderError) -> Self {
        let code: u8 = match err {
            AutotraderError::Io(_) => 1,
            AutotraderError::ConfigParse { .. }
            | AutotraderError::ConfigMissing { .. }
            | AutotraderError::ConfigInvalid { .. }
            | AutotraderError::PreferencesMissing { .. } => 2,
            AutotraderError::Database { .. } | AutotraderError::DatabaseQuery { .. } => 3,
            AutotraderError::BrokerageRejected { .. }
            | AutotraderError::BrokerageTransport { .. } => 4,
            AutotraderError::NotFound { .. }
            | AutotraderError::NetworkFailure { .. }
            | AutotraderError::RateLimited { .. }
            | AutotraderError::InsufficientData { .. }
            | AutotraderError::InvalidData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
