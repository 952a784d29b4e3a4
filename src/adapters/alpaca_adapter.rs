//! Alpaca REST adapter: brokerage (trading API) and daily bars (data API).
//!
//! Money values travel as decimal strings. Bracket exit prices are rounded
//! to cents here, at the wire boundary.

use crate::domain::error::AutotraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::position::Position;
use crate::domain::trade::BracketOrder;
use crate::ports::brokerage_port::{BrokeragePort, OrderId};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use chrono::{DateTime, Days, NaiveDate, Utc};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://paper-api.alpaca.markets";
pub const LIVE_BASE_URL: &str = "https://api.alpaca.markets";
pub const DEFAULT_DATA_URL: &str = "https://data.alpaca.markets";
const ENV_KEY_ID: &str = "APCA_API_KEY_ID";
const ENV_SECRET_KEY: &str = "APCA_API_SECRET_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlpacaCredentials {
    pub key_id: String,
    pub secret_key: String,
}

impl AlpacaCredentials {
    /// `[alpaca] key_id / secret_key`, falling back to the standard
    /// `APCA_API_*` environment variables.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AutotraderError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    fn resolve(
        config: &dyn ConfigPort,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AutotraderError> {
        let lookup = |key: &str, var: &str| {
            config
                .get_string("alpaca", key)
                .or_else(|| env(var).filter(|v| !v.trim().is_empty()))
                .ok_or_else(|| AutotraderError::ConfigMissing {
                    section: "alpaca".into(),
                    key: key.into(),
                })
        };
        Ok(Self {
            key_id: lookup("key_id", ENV_KEY_ID)?,
            secret_key: lookup("secret_key", ENV_SECRET_KEY)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    buying_power: String,
}

#[derive(Debug, Deserialize)]
struct PositionResponse {
    symbol: String,
    qty: String,
    avg_entry_price: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct TakeProfitLeg {
    limit_price: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct StopLossLeg {
    stop_price: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct BracketOrderRequest {
    symbol: String,
    qty: String,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    order_class: &'static str,
    take_profit: TakeProfitLeg,
    stop_loss: StopLossLeg,
}

impl BracketOrderRequest {
    fn from_order(order: &BracketOrder) -> Self {
        Self {
            symbol: order.symbol.clone(),
            qty: order.quantity.to_string(),
            side: "buy",
            order_type: "market",
            time_in_force: "gtc",
            order_class: "bracket",
            take_profit: TakeProfitLeg {
                limit_price: format!("{:.2}", round_cents(order.take_profit_price)),
            },
            stop_loss: StopLossLeg {
                stop_price: format!("{:.2}", round_cents(order.stop_price)),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: Option<Vec<AlpacaBar>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlpacaBar {
    t: DateTime<Utc>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

pub fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

fn parse_decimal(field: &str, value: &str) -> Result<f64, AutotraderError> {
    value
        .trim()
        .parse()
        .map_err(|e| AutotraderError::BrokerageTransport {
            reason: format!("unparseable {field} {value:?}: {e}"),
        })
}

/// Share count of a position. Fractional holdings cannot be traded by the
/// whole-share orders this adapter sends, so they are an error.
fn whole_shares(symbol: &str, value: &str) -> Result<i64, AutotraderError> {
    let quantity = parse_decimal("qty", value)?;
    if quantity.fract() != 0.0 {
        tracing::warn!(%symbol, qty = %value.trim(), "fractional position");
        return Err(AutotraderError::BrokerageTransport {
            reason: format!(
                "fractional position of {} {symbol} is not supported",
                value.trim()
            ),
        });
    }
    Ok(quantity as i64)
}

/// Calendar-day lookback that covers `limit` trading days.
fn lookback_start(today: NaiveDate, limit: usize) -> NaiveDate {
    let days = (limit as u64 * 7).div_ceil(5) + 10;
    today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

fn default_base_url(config: &dyn ConfigPort) -> &'static str {
    if config.get_bool("alpaca", "paper", true) {
        DEFAULT_BASE_URL
    } else {
        LIVE_BASE_URL
    }
}

pub struct AlpacaAdapter {
    client: Client,
    base_url: String,
    data_url: String,
    credentials: AlpacaCredentials,
}

impl AlpacaAdapter {
    pub fn new(
        base_url: &str,
        data_url: &str,
        credentials: AlpacaCredentials,
    ) -> Result<Self, AutotraderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("autotrader/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AutotraderError::BrokerageTransport {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            data_url: data_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// `[alpaca] base_url` wins; otherwise `paper = false` selects the live
    /// endpoint and anything else the paper one.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AutotraderError> {
        let base_url = config
            .get_string("alpaca", "base_url")
            .unwrap_or_else(|| default_base_url(config).to_string());
        let data_url = config
            .get_string("alpaca", "data_url")
            .unwrap_or_else(|| DEFAULT_DATA_URL.to_string());
        Self::new(&base_url, &data_url, AlpacaCredentials::from_config(config)?)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("APCA-API-KEY-ID", &self.credentials.key_id)
            .header("APCA-API-SECRET-KEY", &self.credentials.secret_key)
    }

    fn trading_url(&self, path: &str) -> String {
        format!("{}/v2/{}", self.base_url, path)
    }

    fn bars_url(&self, symbol: &str) -> String {
        format!("{}/v2/stocks/{}/bars", self.data_url, symbol)
    }

    /// Send a trading API request; non-2xx responses become errors.
    fn send_trading(
        &self,
        builder: RequestBuilder,
        symbol: &str,
    ) -> Result<Response, AutotraderError> {
        let resp = self
            .authed(builder)
            .send()
            .map_err(|e| AutotraderError::BrokerageTransport {
                reason: e.to_string(),
            })?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().unwrap_or_default();
        let message = serde_json::from_str::<ApiMessage>(&body)
            .map(|m| m.message)
            .unwrap_or(body);
        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            Err(AutotraderError::BrokerageRejected {
                symbol: symbol.to_string(),
                reason: format!("HTTP {status}: {message}"),
            })
        } else {
            Err(AutotraderError::BrokerageTransport {
                reason: format!("HTTP {status}: {message}"),
            })
        }
    }

    fn fetch_bars_page(
        &self,
        symbol: &str,
        start: NaiveDate,
        page_token: Option<&str>,
    ) -> Result<BarsResponse, AutotraderError> {
        let mut query = vec![
            ("timeframe", "1Day".to_string()),
            ("start", start.format("%Y-%m-%d").to_string()),
            ("adjustment", "split".to_string()),
            ("limit", "10000".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("page_token", token.to_string()));
        }

        let resp = self
            .authed(self.client.get(self.bars_url(symbol)).query(&query))
            .send()
            .map_err(|e| AutotraderError::NetworkFailure {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AutotraderError::RateLimited {
                symbol: symbol.to_string(),
            });
        }
        if status == StatusCode::NOT_FOUND || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(AutotraderError::NotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            return Err(AutotraderError::NetworkFailure {
                symbol: symbol.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        resp.json().map_err(|e| AutotraderError::InvalidData {
            symbol: symbol.to_string(),
            reason: format!("failed to parse bars response: {e}"),
        })
    }
}

fn to_bars(symbol: &str, raw: Vec<AlpacaBar>) -> Vec<OhlcvBar> {
    raw.into_iter()
        .map(|b| OhlcvBar {
            symbol: symbol.to_string(),
            date: b.t.date_naive(),
            open: b.o,
            high: b.h,
            low: b.l,
            close: b.c,
            volume: b.v.round() as i64,
        })
        .collect()
}

impl MarketDataPort for AlpacaAdapter {
    fn fetch_bars(&self, symbol: &str, limit: usize) -> Result<Vec<OhlcvBar>, AutotraderError> {
        let symbol = symbol.trim().to_uppercase();
        let start = lookback_start(Utc::now().date_naive(), limit);

        let mut bars = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.fetch_bars_page(&symbol, start, token.as_deref())?;
            bars.extend(to_bars(&symbol, page.bars.unwrap_or_default()));
            match page.next_page_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }

        if bars.is_empty() {
            return Err(AutotraderError::NotFound { symbol });
        }
        bars.sort_by_key(|b| b.date);
        if bars.len() > limit {
            bars.drain(..bars.len() - limit);
        }
        tracing::debug!(%symbol, bars = bars.len(), "fetched bars from alpaca");
        Ok(bars)
    }
}

impl BrokeragePort for AlpacaAdapter {
    fn get_position(&self, symbol: &str) -> Result<Option<Position>, AutotraderError> {
        let url = self.trading_url(&format!("positions/{symbol}"));
        let resp = self
            .authed(self.client.get(url))
            .send()
            .map_err(|e| AutotraderError::BrokerageTransport {
                reason: e.to_string(),
            })?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(AutotraderError::BrokerageTransport {
                reason: format!("HTTP {} querying position {symbol}", resp.status()),
            });
        }

        let body: PositionResponse =
            resp.json().map_err(|e| AutotraderError::BrokerageTransport {
                reason: format!("failed to parse position: {e}"),
            })?;
        let quantity = whole_shares(&body.symbol, &body.qty)?;
        Ok(Some(Position {
            symbol: body.symbol,
            quantity,
            entry_price: parse_decimal("avg_entry_price", &body.avg_entry_price)?,
        })
        .filter(Position::is_open))
    }

    fn get_buying_power(&self) -> Result<f64, AutotraderError> {
        let resp = self.send_trading(self.client.get(self.trading_url("account")), "")?;
        let account: AccountResponse =
            resp.json().map_err(|e| AutotraderError::BrokerageTransport {
                reason: format!("failed to parse account: {e}"),
            })?;
        parse_decimal("buying_power", &account.buying_power)
    }

    fn submit_bracket_order(&self, order: &BracketOrder) -> Result<OrderId, AutotraderError> {
        let request = BracketOrderRequest::from_order(order);
        let resp = self.send_trading(
            self.client.post(self.trading_url("orders")).json(&request),
            &order.symbol,
        )?;
        let body: OrderResponse = resp.json().map_err(|e| AutotraderError::BrokerageTransport {
            reason: format!("failed to parse order response: {e}"),
        })?;
        Ok(body.id)
    }

    fn submit_close_order(&self, symbol: &str) -> Result<OrderId, AutotraderError> {
        let resp = self.send_trading(
            self.client
                .delete(self.trading_url(&format!("positions/{symbol}"))),
            symbol,
        )?;
        let body: OrderResponse = resp.json().map_err(|e| AutotraderError::BrokerageTransport {
            reason: format!("failed to parse close response: {e}"),
        })?;
        Ok(body.id)
    }
}
