//! SQLite store for watchlists, per-user settings and the trade log.

use crate::domain::error::AutotraderError;
use crate::domain::limits::DailyCounters;
use crate::domain::preferences::TradingPreferences;
use crate::domain::trade::{Side, TradeRecord};
use crate::domain::watchlist::WatchlistEntry;
use crate::ports::config_port::ConfigPort;
use crate::ports::preferences_port::PreferencesPort;
use crate::ports::trade_log_port::TradeLogPort;
use crate::ports::watchlist_port::WatchlistPort;
use chrono::{NaiveDate, NaiveDateTime};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::collections::HashMap;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn query_err(e: rusqlite::Error) -> AutotraderError {
    AutotraderError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_err(
    column: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AutotraderError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| AutotraderError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| AutotraderError::Database {
                    reason: e.to_string(),
                })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    /// Single-connection in-memory store; the schema still needs
    /// [`initialize_schema`](Self::initialize_schema).
    pub fn in_memory() -> Result<Self, AutotraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| AutotraderError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, AutotraderError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| AutotraderError::Database {
                reason: e.to_string(),
            })
    }

    pub fn initialize_schema(&self) -> Result<(), AutotraderError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS watchlists (
                user_id INTEGER NOT NULL,
                symbol TEXT NOT NULL,
                auto_trade INTEGER NOT NULL DEFAULT 0,
                added_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, symbol)
            );
            CREATE TABLE IF NOT EXISTS user_settings (
                user_id INTEGER NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (user_id, key)
            );
            CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                price REAL NOT NULL,
                timestamp TEXT NOT NULL,
                order_id TEXT,
                outcome TEXT NOT NULL,
                reason TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_trades_user_time ON trades(user_id, timestamp);",
        )
        .map_err(query_err)
    }

    /// Insert or update a watchlist entry.
    pub fn add_to_watchlist(
        &self,
        user_id: i64,
        symbol: &str,
        auto_trade: bool,
    ) -> Result<(), AutotraderError> {
        let entry = WatchlistEntry::new(symbol, auto_trade);
        self.conn()?
            .execute(
                "INSERT INTO watchlists (user_id, symbol, auto_trade) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, symbol) DO UPDATE SET auto_trade = excluded.auto_trade",
                params![user_id, entry.symbol, entry.auto_trade_enabled],
            )
            .map_err(query_err)?;
        Ok(())
    }

    /// Returns whether an entry was removed.
    pub fn remove_from_watchlist(
        &self,
        user_id: i64,
        symbol: &str,
    ) -> Result<bool, AutotraderError> {
        let removed = self
            .conn()?
            .execute(
                "DELETE FROM watchlists WHERE user_id = ?1 AND symbol = ?2",
                params![user_id, symbol.trim().to_uppercase()],
            )
            .map_err(query_err)?;
        Ok(removed > 0)
    }

    /// Returns whether the symbol was on the watchlist.
    pub fn set_auto_trade(
        &self,
        user_id: i64,
        symbol: &str,
        enabled: bool,
    ) -> Result<bool, AutotraderError> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE watchlists SET auto_trade = ?3 WHERE user_id = ?1 AND symbol = ?2",
                params![user_id, symbol.trim().to_uppercase(), enabled],
            )
            .map_err(query_err)?;
        Ok(updated > 0)
    }

    pub fn save_setting(
        &self,
        user_id: i64,
        key: &str,
        value: &str,
    ) -> Result<(), AutotraderError> {
        self.conn()?
            .execute(
                "INSERT INTO user_settings (user_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, key) DO UPDATE SET value = excluded.value",
                params![user_id, key, value],
            )
            .map_err(query_err)?;
        Ok(())
    }

    pub fn save_preferences(
        &self,
        user_id: i64,
        prefs: &TradingPreferences,
    ) -> Result<(), AutotraderError> {
        prefs.validate()?;
        for (key, value) in prefs.to_settings() {
            self.save_setting(user_id, key, &value)?;
        }
        Ok(())
    }

    pub fn all_settings(&self, user_id: i64) -> Result<HashMap<String, String>, AutotraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM user_settings WHERE user_id = ?1")
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(query_err)?;

        let mut settings = HashMap::new();
        for row in rows {
            let (key, value): (String, String) = row.map_err(query_err)?;
            settings.insert(key, value);
        }
        Ok(settings)
    }
}

impl PreferencesPort for SqliteAdapter {
    fn load_preferences(&self, user_id: i64) -> Result<TradingPreferences, AutotraderError> {
        TradingPreferences::from_settings(user_id, &self.all_settings(user_id)?)
    }
}

impl WatchlistPort for SqliteAdapter {
    fn watchlist(&self, user_id: i64) -> Result<Vec<WatchlistEntry>, AutotraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, auto_trade FROM watchlists
                 WHERE user_id = ?1 ORDER BY added_at ASC, symbol ASC",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(WatchlistEntry {
                    symbol: row.get(0)?,
                    auto_trade_enabled: row.get(1)?,
                })
            })
            .map_err(query_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(query_err)?);
        }
        Ok(entries)
    }
}

impl TradeLogPort for SqliteAdapter {
    fn append_trade_record(&self, record: &TradeRecord) -> Result<(), AutotraderError> {
        self.conn()?
            .execute(
                "INSERT INTO trades
                 (user_id, symbol, side, quantity, price, timestamp, order_id, outcome, reason)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.user_id,
                    record.symbol,
                    record.side.as_str(),
                    record.quantity,
                    record.price,
                    record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    record.order_id,
                    record.outcome.as_str(),
                    record.reason
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn count_trades_today(
        &self,
        user_id: i64,
        today: NaiveDate,
    ) -> Result<DailyCounters, AutotraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT side, COUNT(*) FROM trades
                 WHERE user_id = ?1 AND outcome = 'submitted' AND substr(timestamp, 1, 10) = ?2
                 GROUP BY side",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(
                params![user_id, today.format(DATE_FORMAT).to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .map_err(query_err)?;

        let mut counters = DailyCounters::new(today);
        for row in rows {
            let (side, count) = row.map_err(query_err)?;
            let count = count.max(0) as u32;
            match side.parse::<Side>() {
                Ok(Side::Buy) => counters.buys += count,
                Ok(Side::Sell) => counters.sells += count,
                Err(reason) => {
                    return Err(AutotraderError::DatabaseQuery { reason });
                }
            }
            counters.total += count;
        }
        Ok(counters)
    }

    fn recent_trades(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, AutotraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT user_id, symbol, side, quantity, price, timestamp, order_id, outcome, reason
                 FROM trades WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![user_id, limit as i64], |row| {
                let side: String = row.get(2)?;
                let timestamp: String = row.get(5)?;
                let outcome: String = row.get(7)?;
                Ok(TradeRecord {
                    user_id: row.get(0)?,
                    symbol: row.get(1)?,
                    side: side
                        .parse()
                        .map_err(|e: String| conversion_err(2, std::io::Error::other(e)))?,
                    quantity: row.get(3)?,
                    price: row.get(4)?,
                    timestamp: NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT)
                        .map_err(|e| conversion_err(5, e))?,
                    order_id: row.get(6)?,
                    outcome: outcome
                        .parse()
                        .map_err(|e: String| conversion_err(7, std::io::Error::other(e)))?,
                    reason: row.get(8)?,
                })
            })
            .map_err(query_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(query_err)?);
        }
        Ok(records)
    }
}
