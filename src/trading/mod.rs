//! Trading module for orders, positions and the trade log.
//!
//! This module handles:
//! - Order types shared by the gateways
//! - Position tracking for the paper ledger
//! - Trade records and their durable log

pub mod order;
pub mod position;
pub mod trade_log;

pub use order::{Order, OrderParams, OrderStatus, OrderType, Side};
pub use position::{MarketPositions, Position};
pub use trade_log::{JsonlTradeLog, TradeLog, TradeRecord, TradeStatus};
