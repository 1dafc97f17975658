//! Polymarket YES/NO spread arbitrage engine.
//!
//! In a binary market exactly one of YES and NO pays $1.00 per share at
//! resolution. When the two quotes plus fees sum to less than $1.00, buying
//! both legs in equal size locks in the difference:
//!
//! ```text
//! YES price:        $0.50
//! NO price:         $0.44
//! Fees (2%):        $0.0188
//! ─────────────────────────
//! Cost with fees:   $0.9588 < $0.99
//! Margin:           $0.0412 per share pair (4.12%)
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Market snapshots, the gateway trait, live and paper gateways
//! - [`arbitrage`]: Opportunity detection, sizing and hedged execution
//! - [`trading`]: Order types, positions and the trade log
//! - [`bot`]: The scan loop and its statistics
//! - [`signing`]: L2 request signing for the CLOB API
//! - [`api`]: HTTP API for health/status/metrics
//! - [`utils`]: Shutdown signal and formatting helpers

pub mod api;
pub mod arbitrage;
pub mod bot;
pub mod config;
pub mod error;
pub mod market;
pub mod metrics;
pub mod signing;
pub mod trading;
pub mod utils;

pub use config::Config;
pub use error::{BotError, Result};
