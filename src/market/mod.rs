//! Market module: snapshots and the venue gateways.
//!
//! This module handles:
//! - Market types and data structures
//! - The gateway trait the engine trades through
//! - Polymarket CLOB client
//! - Paper-trading simulator

pub mod client;
pub mod gateway;
pub mod paper;
pub mod types;

pub use client::PolymarketClient;
pub use gateway::MarketGateway;
pub use paper::{PaperStatistics, PaperTradingClient, Settlement, SimulatedFaults};
pub use types::{Market, Outcome};
