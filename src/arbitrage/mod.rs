//! Arbitrage module for detecting and executing opportunities.
//!
//! This module handles:
//! - Pair cost and margin calculations
//! - Opportunity detection and ranking
//! - Hedged pair execution with compensation

pub mod calculator;
pub mod detector;
pub mod executor;

pub use calculator::{ArbitrageOpportunity, PairCost, MIN_PROFIT_THRESHOLD};
pub use detector::{ArbitrageDetector, Rejection};
pub use executor::{ArbitrageExecutor, ExecutionResult, LegFailure};
