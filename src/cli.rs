//! CLI definition and dispatch.

use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::{require_string, FileConfigAdapter};
use crate::adapters::indicator_snapshot_adapter::IndicatorSnapshotAdapter;
use crate::adapters::paper_broker::{PaperBroker, DEFAULT_STARTING_CASH};
use crate::adapters::sqlite_adapter::SqliteAdapter;
use crate::domain::auto_trader::{AutoTrader, PassReport};
use crate::domain::error::AutotraderError;
use crate::domain::preferences::{TradingPreferences, PREFERENCE_KEYS};
use crate::domain::scoring::{score_snapshot, MAX_SCORE};
use crate::domain::snapshot::Snapshot;
use crate::ports::brokerage_port::BrokeragePort;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::preferences_port::PreferencesPort;
use crate::ports::snapshot_port::SnapshotPort;
use crate::ports::trade_log_port::TradeLogPort;
use crate::ports::watchlist_port::WatchlistPort;
use crate::scheduler::IntervalScheduler;

#[derive(Parser, Debug)]
#[command(name = "autotrader", about = "Watchlist auto-trading loop")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the auto-trading loop for a user
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        user_id: i64,
        /// Minutes between passes
        #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,
        /// Trade against the in-memory paper brokerage
        #[arg(long)]
        paper: bool,
        /// Run a single pass and exit
        #[arg(long)]
        once: bool,
    },
    /// Print the snapshot and score for a symbol
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        symbol: String,
    },
    /// Manage a user's watchlist
    Watchlist {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        user_id: i64,
        #[command(subcommand)]
        action: WatchlistAction,
    },
    /// Show or change a user's trading preferences
    Settings {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        user_id: i64,
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Show recent trade records
    History {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        user_id: i64,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum WatchlistAction {
    List,
    Add {
        symbol: String,
        /// Enable auto-trading for the symbol
        #[arg(long)]
        auto_trade: bool,
    },
    Remove {
        symbol: String,
    },
    /// Turn auto-trading on or off for a listed symbol
    AutoTrade {
        symbol: String,
        state: Toggle,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    Show,
    Set { key: String, value: String },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn execute(command: Command) -> Result<(), AutotraderError> {
    match command {
        Command::Run {
            config,
            user_id,
            interval,
            paper,
            once,
        } => run_loop(&config, user_id, interval, paper, once),
        Command::Analyze { config, symbol } => run_analyze(&config, &symbol),
        Command::Watchlist {
            config,
            user_id,
            action,
        } => run_watchlist(&config, user_id, action),
        Command::Settings {
            config,
            user_id,
            action,
        } => run_settings(&config, user_id, action),
        Command::History {
            config,
            user_id,
            limit,
        } => run_history(&config, user_id, limit),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, AutotraderError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Bar source named by `[market_data] source` (`csv` or `alpaca`).
pub fn build_market_data(
    config: &dyn ConfigPort,
) -> Result<Box<dyn MarketDataPort>, AutotraderError> {
    let source = config
        .get_string("market_data", "source")
        .unwrap_or_else(|| "csv".to_string())
        .to_lowercase();
    match source.as_str() {
        "csv" => {
            let dir = require_string(config, "market_data", "csv_dir")?;
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir))))
        }
        #[cfg(feature = "alpaca")]
        "alpaca" => Ok(Box::new(
            crate::adapters::alpaca_adapter::AlpacaAdapter::from_config(config)?,
        )),
        other => Err(AutotraderError::ConfigInvalid {
            section: "market_data".into(),
            key: "source".into(),
            reason: format!("unsupported source {other:?}"),
        }),
    }
}

fn build_broker<'a>(
    config: &dyn ConfigPort,
    paper: bool,
    quotes: &'a dyn MarketDataPort,
) -> Result<Box<dyn BrokeragePort + 'a>, AutotraderError> {
    if paper {
        let cash = config.get_double("paper", "starting_cash", DEFAULT_STARTING_CASH);
        eprintln!("Using paper brokerage with {cash:.2} starting cash");
        return Ok(Box::new(PaperBroker::new(cash).with_quotes(quotes)));
    }

    #[cfg(feature = "alpaca")]
    {
        Ok(Box::new(
            crate::adapters::alpaca_adapter::AlpacaAdapter::from_config(config)?,
        ))
    }

    #[cfg(not(feature = "alpaca"))]
    {
        Err(AutotraderError::ConfigInvalid {
            section: "alpaca".into(),
            key: "base_url".into(),
            reason: "alpaca feature is required for live trading; use --paper".into(),
        })
    }
}

/// Load preferences and the watchlist, then run one pass.
pub fn run_cycle<S>(
    trader: &AutoTrader<'_>,
    store: &S,
    user_id: i64,
) -> Result<PassReport, AutotraderError>
where
    S: PreferencesPort + WatchlistPort,
{
    let prefs = store.load_preferences(user_id)?;
    let watchlist = store.watchlist(user_id)?;
    Ok(trader.run_pass(&watchlist, &prefs, Local::now().naive_local()))
}

/// Exit status when a second interrupt arrives before the loop has stopped.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Record an interrupt on the stop flag. Returns true when a stop was
/// already pending, meaning the caller should exit immediately.
pub fn handle_interrupt(stop: &AtomicBool) -> bool {
    stop.swap(true, Ordering::SeqCst)
}

fn install_interrupt_handler(stop: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                tracing::warn!(reason = %e, "could not install interrupt handler");
                return;
            }
        };
        runtime.block_on(async {
            while tokio::signal::ctrl_c().await.is_ok() {
                if handle_interrupt(&stop) {
                    tracing::warn!("second interrupt received, exiting now");
                    std::process::exit(FORCED_EXIT_CODE);
                }
                tracing::info!("interrupt received, stopping after the current pass");
            }
        });
    });
}

fn run_loop(
    config_path: &Path,
    user_id: i64,
    interval: u64,
    paper: bool,
    once: bool,
) -> Result<(), AutotraderError> {
    let config = load_config(config_path)?;
    let store = SqliteAdapter::from_config(&config)?;

    // Preferences must exist before the loop starts.
    let prefs = store.load_preferences(user_id)?;
    eprintln!(
        "Loaded preferences for user {user_id}: min confidence {:.0}, max position {:.0}%",
        prefs.min_confidence,
        prefs.max_position_size * 100.0
    );

    let data = build_market_data(&config)?;
    let snapshots = IndicatorSnapshotAdapter::from_config(data.as_ref(), &config);
    let broker = build_broker(&config, paper, data.as_ref())?;
    let trader = AutoTrader::new(user_id, &snapshots, broker.as_ref(), &store);

    if once {
        let report = run_cycle(&trader, &store, user_id)?;
        print_report(&report);
        return Ok(());
    }

    let scheduler = IntervalScheduler::from_minutes(interval);
    install_interrupt_handler(scheduler.stop_handle());
    tracing::info!(user_id, interval_minutes = interval, paper, "auto-trader started");

    scheduler.run(|pass| match run_cycle(&trader, &store, user_id) {
        Ok(report) => tracing::info!(
            pass,
            evaluated = report.evaluated,
            bought = report.bought,
            sold = report.sold,
            failed = report.failed,
            "pass finished"
        ),
        Err(e) => tracing::error!(pass, reason = %e, "pass failed"),
    });
    Ok(())
}

fn print_report(report: &PassReport) {
    println!(
        "evaluated {}  bought {}  sold {}  held {}  failed {}  skipped {}",
        report.evaluated, report.bought, report.sold, report.held, report.failed, report.skipped
    );
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

pub fn format_snapshot(snapshot: &Snapshot) -> String {
    let score = score_snapshot(snapshot);
    let rs = snapshot
        .rs_rating
        .map(|r| format!("{r:.1}"))
        .unwrap_or_else(|| "n/a".to_string());

    let mut out = format!(
        "{}  price {:.2}  signal {} ({:.0}% confidence)\n",
        snapshot.symbol, snapshot.price, snapshot.signal, snapshot.confidence
    );
    out.push_str(&format!(
        "  golden cross: {}  above MAs: {}  volume breakout: {}  RS: {}  market uptrend: {}\n",
        yes_no(snapshot.golden_cross),
        yes_no(snapshot.above_both_mas),
        yes_no(snapshot.volume_breakout),
        rs,
        yes_no(snapshot.market_trend_up)
    ));
    out.push_str(&format!("score {}/{}\n", score.value, MAX_SCORE));
    for reason in &score.reasons {
        out.push_str(&format!("  - {reason}\n"));
    }
    out
}

fn run_analyze(config_path: &Path, symbol: &str) -> Result<(), AutotraderError> {
    let config = load_config(config_path)?;
    let data = build_market_data(&config)?;
    let snapshots = IndicatorSnapshotAdapter::from_config(data.as_ref(), &config);
    let snapshot = snapshots.get_snapshot(symbol)?;
    print!("{}", format_snapshot(&snapshot));
    Ok(())
}

fn run_watchlist(
    config_path: &Path,
    user_id: i64,
    action: WatchlistAction,
) -> Result<(), AutotraderError> {
    let config = load_config(config_path)?;
    let store = SqliteAdapter::from_config(&config)?;

    match action {
        WatchlistAction::List => {
            let entries = store.watchlist(user_id)?;
            if entries.is_empty() {
                println!("watchlist for user {user_id} is empty");
            }
            for entry in entries {
                let flag = if entry.auto_trade_enabled { "on" } else { "off" };
                println!("{:<8} auto-trade {}", entry.symbol, flag);
            }
        }
        WatchlistAction::Add { symbol, auto_trade } => {
            store.add_to_watchlist(user_id, &symbol, auto_trade)?;
            println!("added {}", symbol.to_uppercase());
        }
        WatchlistAction::Remove { symbol } => {
            if store.remove_from_watchlist(user_id, &symbol)? {
                println!("removed {}", symbol.to_uppercase());
            } else {
                eprintln!("warning: {} is not on the watchlist", symbol.to_uppercase());
            }
        }
        WatchlistAction::AutoTrade { symbol, state } => {
            let enabled = state == Toggle::On;
            if store.set_auto_trade(user_id, &symbol, enabled)? {
                println!(
                    "auto-trade {} for {}",
                    if enabled { "on" } else { "off" },
                    symbol.to_uppercase()
                );
            } else {
                eprintln!("warning: {} is not on the watchlist", symbol.to_uppercase());
            }
        }
    }
    Ok(())
}

/// Validate one setting against the rest of the stored values.
pub fn check_setting(
    user_id: i64,
    stored: &HashMap<String, String>,
    key: &str,
    value: &str,
) -> Result<(), AutotraderError> {
    if !PREFERENCE_KEYS.contains(&key) {
        return Err(AutotraderError::ConfigInvalid {
            section: "settings".into(),
            key: key.into(),
            reason: format!("unknown key; expected one of {}", PREFERENCE_KEYS.join(", ")),
        });
    }
    if value.trim().parse::<f64>().is_err() {
        return Err(AutotraderError::ConfigInvalid {
            section: "settings".into(),
            key: key.into(),
            reason: format!("{value:?} is not a number"),
        });
    }

    let mut merged = stored.clone();
    merged.insert(key.to_string(), value.to_string());
    if PREFERENCE_KEYS.iter().all(|k| merged.contains_key(*k)) {
        TradingPreferences::from_settings(user_id, &merged)?;
    }
    Ok(())
}

fn run_settings(
    config_path: &Path,
    user_id: i64,
    action: SettingsAction,
) -> Result<(), AutotraderError> {
    let config = load_config(config_path)?;
    let store = SqliteAdapter::from_config(&config)?;
    let stored = store.all_settings(user_id)?;

    match action {
        SettingsAction::Show => {
            for key in PREFERENCE_KEYS {
                let value = stored.get(key).map(String::as_str).unwrap_or("(unset)");
                println!("{key:<20} {value}");
            }
            if let Err(e) = TradingPreferences::from_settings(user_id, &stored) {
                eprintln!("warning: {e}");
            }
        }
        SettingsAction::Set { key, value } => {
            let key = key.trim().to_lowercase();
            check_setting(user_id, &stored, &key, &value)?;
            store.save_setting(user_id, &key, value.trim())?;
            println!("{key} = {}", value.trim());
        }
    }
    Ok(())
}

fn run_history(config_path: &Path, user_id: i64, limit: usize) -> Result<(), AutotraderError> {
    let config = load_config(config_path)?;
    let store = SqliteAdapter::from_config(&config)?;
    let trades = store.recent_trades(user_id, limit)?;
    if trades.is_empty() {
        println!("no trades recorded for user {user_id}");
    }
    for t in trades {
        println!(
            "{}  {:<4} {:>6} {:<8} @ {:>10.2}  {:<9} {:<12} {}",
            t.timestamp.format("%Y-%m-%d %H:%M:%S"),
            t.side,
            t.quantity,
            t.symbol,
            t.price,
            t.outcome,
            t.order_id.as_deref().unwrap_or("-"),
            t.reason
        );
    }
    Ok(())
}
