//! Application configuration loaded from environment variables.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// Variable names follow the field names in upper case. Legacy names such as
/// `STRATEGY_1_MIN_PROFIT_MARGIN` are accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Polymarket Credentials ===
    /// CLOB API key (required for live trading).
    #[serde(default, alias = "apikey")]
    pub polymarket_api_key: Option<String>,

    /// CLOB API secret, base64url encoded.
    #[serde(default, alias = "secret")]
    pub polymarket_api_secret: Option<String>,

    /// CLOB API passphrase.
    #[serde(default, alias = "polymarket_api_passphrase", alias = "passphrase")]
    pub polymarket_passphrase: Option<String>,

    /// Wallet address sent as `POLY_ADDRESS`.
    #[serde(default)]
    pub polymarket_address: Option<String>,

    /// Signature type: 0=EOA, 1=Magic.link, 2=Gnosis Safe.
    #[serde(default)]
    pub polymarket_signature_type: u8,

    /// CLOB API base URL.
    #[serde(default = "default_clob_url", alias = "polymarket_host")]
    pub polymarket_clob_url: String,

    /// Chain ID (137 for Polygon).
    #[serde(default = "default_chain_id")]
    pub polymarket_chain_id: u64,

    // === Strategy Parameters ===
    /// Minimum profit margin after fees (0.01 = 1%).
    #[serde(default = "default_min_profit_pct", alias = "strategy_1_min_profit_margin")]
    pub min_profit_pct: Decimal,

    /// Trading fee rate applied to the pair cost (0.02 = 2%).
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,

    /// Maximum USD allocated to one trade.
    #[serde(default = "default_max_position_size", alias = "strategy_1_max_position_size")]
    pub max_position_size: Decimal,

    /// Limit price buffer over the quoted price (0.02 = 2%).
    #[serde(default = "default_max_slippage_pct")]
    pub max_slippage_pct: Decimal,

    /// Seconds to sleep between scan cycles.
    #[serde(default = "default_scan_interval", alias = "arbitrage_scan_interval")]
    pub scan_interval_seconds: f64,

    // === Operation Modes ===
    /// Paper trading mode (no real orders).
    #[serde(default)]
    pub paper_trading: bool,

    /// Starting balance for paper trading.
    #[serde(default = "default_paper_balance", alias = "initial_balance")]
    pub paper_trading_balance: Decimal,

    /// Path of the append-only trade log.
    #[serde(default = "default_trade_log_path")]
    pub trade_log_path: String,

    /// Maximum number of market pages fetched per scan.
    #[serde(default = "default_max_market_pages")]
    pub max_market_pages: u32,

    /// HTTP request timeout for venue calls.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    // === Server Configuration ===
    /// HTTP server port for health/status/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level", alias = "log_level")]
    pub rust_log: String,

    /// Optional file that receives a copy of the log output.
    #[serde(default)]
    pub log_file: Option<String>,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub log_json: bool,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_clob_url() -> String {
    "https://clob.polymarket.com".to_string()
}

fn default_chain_id() -> u64 {
    137
}

fn default_min_profit_pct() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_fee_rate() -> Decimal {
    Decimal::new(2, 2) // 0.02
}

fn default_max_position_size() -> Decimal {
    Decimal::new(1000, 0) // $1000
}

fn default_max_slippage_pct() -> Decimal {
    Decimal::new(2, 2) // 0.02
}

fn default_scan_interval() -> f64 {
    0.1
}

fn default_paper_balance() -> Decimal {
    Decimal::new(10_000, 0) // $10,000
}

fn default_trade_log_path() -> String {
    "trades.jsonl".to_string()
}

fn default_max_market_pages() -> u32 {
    5
}

fn default_http_timeout_ms() -> u64 {
    5000
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            polymarket_api_key: None,
            polymarket_api_secret: None,
            polymarket_passphrase: None,
            polymarket_address: None,
            polymarket_signature_type: 0,
            polymarket_clob_url: default_clob_url(),
            polymarket_chain_id: default_chain_id(),
            min_profit_pct: default_min_profit_pct(),
            fee_rate: default_fee_rate(),
            max_position_size: default_max_position_size(),
            max_slippage_pct: default_max_slippage_pct(),
            scan_interval_seconds: default_scan_interval(),
            paper_trading: false,
            paper_trading_balance: default_paper_balance(),
            trade_log_path: default_trade_log_path(),
            max_market_pages: default_max_market_pages(),
            http_timeout_ms: default_http_timeout_ms(),
            port: default_port(),
            rust_log: default_log_level(),
            log_file: None,
            log_json: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return Err("FEE_RATE must be in [0, 1)".to_string());
        }

        if self.min_profit_pct < Decimal::ZERO {
            return Err("MIN_PROFIT_PCT must not be negative".to_string());
        }

        if self.max_position_size <= Decimal::ZERO {
            return Err("MAX_POSITION_SIZE must be positive".to_string());
        }

        if self.max_slippage_pct < Decimal::ZERO {
            return Err("MAX_SLIPPAGE_PCT must not be negative".to_string());
        }

        if Duration::try_from_secs_f64(self.scan_interval_seconds).map_or(true, |d| d.is_zero()) {
            return Err("SCAN_INTERVAL_SECONDS must be a positive number of seconds".to_string());
        }

        if self.max_market_pages == 0 {
            return Err("MAX_MARKET_PAGES must be at least 1".to_string());
        }

        if self.paper_trading {
            if self.paper_trading_balance <= Decimal::ZERO {
                return Err("PAPER_TRADING_BALANCE must be positive".to_string());
            }
        } else if !self.has_credentials() {
            return Err(
                "POLYMARKET_API_KEY and POLYMARKET_API_SECRET are required for live trading"
                    .to_string(),
            );
        }

        Ok(())
    }

    /// Whether API key and secret are both present and non-empty.
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.polymarket_api_key) && present(&self.polymarket_api_secret)
    }

    /// Interval between scan cycles. Falls back to the default when the
    /// configured value is not a representable duration.
    pub fn scan_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.scan_interval_seconds)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_scan_interval()))
    }

    /// Human readable trading mode.
    pub fn mode_label(&self) -> &'static str {
        if self.paper_trading {
            "PAPER TRADING"
        } else {
            "LIVE TRADING"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn paper_config() -> Config {
        Config {
            paper_trading: true,
            ..Config::default()
        }
    }

    #[test]
    fn default_values_match_strategy_defaults() {
        let config = Config::default();
        assert_eq!(config.min_profit_pct, dec!(0.01));
        assert_eq!(config.fee_rate, dec!(0.02));
        assert_eq!(config.max_position_size, dec!(1000));
        assert_eq!(config.max_slippage_pct, dec!(0.02));
        assert_eq!(config.paper_trading_balance, dec!(10000));
        assert_eq!(config.scan_interval(), Duration::from_millis(100));
        assert!(!config.paper_trading);
    }

    #[test]
    fn validate_accepts_paper_mode_without_credentials() {
        assert!(paper_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_live_mode_without_credentials() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let config = Config {
            polymarket_api_key: Some("key".to_string()),
            polymarket_api_secret: Some(String::new()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_live_mode_with_credentials() {
        let config = Config {
            polymarket_api_key: Some("key".to_string()),
            polymarket_api_secret: Some("c2VjcmV0".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_parameters() {
        let config = Config {
            fee_rate: dec!(1),
            ..paper_config()
        };
        assert!(config.validate().is_err());

        let config = Config {
            max_position_size: dec!(0),
            ..paper_config()
        };
        assert!(config.validate().is_err());

        let config = Config {
            scan_interval_seconds: 0.0,
            ..paper_config()
        };
        assert!(config.validate().is_err());

        let config = Config {
            paper_trading_balance: dec!(-5),
            ..paper_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_scan_interval_is_rejected_without_panicking() {
        for seconds in [1e30, f64::INFINITY, f64::NAN, -1.0] {
            let config = Config {
                scan_interval_seconds: seconds,
                ..paper_config()
            };
            assert!(config.validate().is_err(), "{seconds} accepted");
            assert_eq!(config.scan_interval(), Duration::from_millis(100));
        }
    }

    #[test]
    fn deserializes_legacy_variable_names() {
        let vars = vec![
            ("STRATEGY_1_MIN_PROFIT_MARGIN".to_string(), "0.03".to_string()),
            ("STRATEGY_1_MAX_POSITION_SIZE".to_string(), "250".to_string()),
            ("ARBITRAGE_SCAN_INTERVAL".to_string(), "0.5".to_string()),
            ("PAPER_TRADING".to_string(), "true".to_string()),
            ("PAPER_TRADING_BALANCE".to_string(), "5000".to_string()),
        ];

        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.min_profit_pct, dec!(0.03));
        assert_eq!(config.max_position_size, dec!(250));
        assert_eq!(config.scan_interval(), Duration::from_millis(500));
        assert!(config.paper_trading);
        assert_eq!(config.paper_trading_balance, dec!(5000));
        assert_eq!(config.fee_rate, dec!(0.02));
    }
}
