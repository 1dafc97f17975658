//! Venue gateway abstraction.
//!
//! The engine talks to the venue only through [`MarketGateway`]. The live
//! Polymarket client and the paper-trading simulator both implement it and
//! are chosen once at startup.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::paper::PaperStatistics;
use super::types::Market;
use crate::error::GatewayError;
use crate::trading::{Order, OrderParams};

/// Market data and order routing capability of a venue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketGateway: Send + Sync {
    /// Fetch market snapshots. With `active_only`, only tradeable markets are returned.
    async fn list_markets(&self, active_only: bool) -> Result<Vec<Market>, GatewayError>;

    /// Available collateral balance in USD.
    async fn get_balance(&self) -> Result<Decimal, GatewayError>;

    /// Submit an order.
    async fn place_order(&self, params: &OrderParams) -> Result<Order, GatewayError>;

    /// Cancel an order. `Ok(false)` means the venue did not cancel it.
    async fn cancel_order(&self, order_id: &str) -> Result<bool, GatewayError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Simulator ledger statistics, `None` for live venues.
    fn paper_statistics(&self) -> Option<PaperStatistics> {
        None
    }
}
