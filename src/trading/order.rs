//! Order types shared by both gateway implementations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

use crate::market::Outcome;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order.
    #[strum(to_string = "BUY", serialize = "buy")]
    Buy,
    /// Sell order.
    #[strum(to_string = "SELL", serialize = "sell")]
    Sell,
}

/// Order type sent to the venue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Limit order, rests on the book at the given price.
    #[default]
    #[strum(to_string = "LIMIT", serialize = "limit")]
    Limit,
    /// Good-till-cancelled.
    #[strum(to_string = "GTC", serialize = "gtc")]
    Gtc,
    /// Fill-or-kill.
    #[strum(to_string = "FOK", serialize = "fok")]
    Fok,
}

/// Order parameters for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderParams {
    /// Market the order belongs to.
    pub market_id: String,
    /// Outcome leg being traded.
    pub outcome: Outcome,
    /// Venue token id for the leg, when routing to a live venue.
    pub token_id: Option<String>,
    /// Order side (buy/sell).
    pub side: Side,
    /// Limit price.
    pub price: Decimal,
    /// Order size in shares.
    pub size: Decimal,
    /// Order type.
    pub order_type: OrderType,
}

impl OrderParams {
    /// Create a new limit buy order for one outcome leg.
    pub fn buy(
        market_id: impl Into<String>,
        outcome: Outcome,
        token_id: Option<String>,
        price: Decimal,
        size: Decimal,
    ) -> Self {
        Self {
            market_id: market_id.into(),
            outcome,
            token_id,
            side: Side::Buy,
            price,
            size,
            order_type: OrderType::Limit,
        }
    }

    /// Notional cost of the order.
    pub fn cost(&self) -> Decimal {
        self.price * self.size
    }

    /// Validate order parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.market_id.is_empty() {
            return Err("market_id is required".to_string());
        }
        if self.price <= Decimal::ZERO {
            return Err("price must be positive".to_string());
        }
        if self.size <= Decimal::ZERO {
            return Err("size must be positive".to_string());
        }
        Ok(())
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Order is live on the book.
    #[strum(to_string = "LIVE", serialize = "live")]
    Live,
    /// Order matched in full.
    #[strum(to_string = "FILLED", serialize = "filled", serialize = "MATCHED", serialize = "matched")]
    Filled,
    /// Order accepted but not yet matched.
    #[strum(to_string = "DELAYED", serialize = "delayed", serialize = "UNMATCHED", serialize = "unmatched")]
    Pending,
    /// Order was cancelled.
    #[strum(to_string = "CANCELED", serialize = "canceled", serialize = "CANCELLED", serialize = "cancelled")]
    Canceled,
}

/// An order accepted by a gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Gateway-assigned order id.
    pub id: String,
    /// Market the order belongs to.
    pub market_id: String,
    /// Outcome leg.
    pub outcome: Outcome,
    /// Order side.
    pub side: Side,
    /// Limit price.
    pub price: Decimal,
    /// Size in shares.
    pub size: Decimal,
    /// `price * size`.
    pub cost: Decimal,
    /// Order type.
    pub order_type: OrderType,
    /// Current status.
    pub status: OrderStatus,
    /// When the gateway accepted the order.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Order {
    /// Build an order record from accepted parameters.
    pub fn from_params(id: impl Into<String>, params: &OrderParams, status: OrderStatus) -> Self {
        Self {
            id: id.into(),
            market_id: params.market_id.clone(),
            outcome: params.outcome,
            side: params.side,
            price: params.price,
            size: params.size,
            cost: params.cost(),
            order_type: params.order_type,
            status,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
