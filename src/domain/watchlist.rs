//! Watchlist entries.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub auto_trade_enabled: bool,
}

impl WatchlistEntry {
    pub fn new(symbol: &str, auto_trade_enabled: bool) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            auto_trade_enabled,
        }
    }
}

/// Symbols with auto-trading enabled, upper-cased, first occurrence kept.
pub fn auto_trade_symbols(entries: &[WatchlistEntry]) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for entry in entries.iter().filter(|e| e.auto_trade_enabled) {
        let symbol = entry.symbol.trim().to_uppercase();
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalises_symbol() {
        assert_eq!(WatchlistEntry::new(" msft ", true).symbol, "MSFT");
    }

    #[test]
    fn only_enabled_symbols_in_order() {
        let entries = vec![
            WatchlistEntry::new("AAPL", true),
            WatchlistEntry::new("TSLA", false),
            WatchlistEntry::new("msft", true),
            WatchlistEntry {
                symbol: "aapl".into(),
                auto_trade_enabled: true,
            },
        ];
        assert_eq!(auto_trade_symbols(&entries), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn empty_watchlist() {
        assert!(auto_trade_symbols(&[]).is_empty());
    }
}
