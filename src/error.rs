//! Unified error types for the arbitrage bot.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the arbitrage bot.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Market gateway error.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Trade log error.
    #[error("trade log error: {0}")]
    TradeLog(#[from] TradeLogError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by a [`MarketGateway`](crate::market::MarketGateway) implementation.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// HTTP transport failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Venue answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        /// Endpoint path that failed.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        body: String,
    },

    /// Response could not be parsed.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// An authenticated call was made without API credentials.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// Request signing failed.
    #[error("signing error: {0}")]
    Signing(String),

    /// Order parameters were rejected before submission.
    #[error("invalid order parameters: {0}")]
    InvalidParams(String),

    /// Order rejected by the venue.
    #[error("order rejected: {reason}")]
    OrderRejected {
        /// Rejection reason from the venue.
        reason: String,
    },

    /// Not enough balance to cover the order cost.
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        /// Required amount.
        required: Decimal,
        /// Available amount.
        available: Decimal,
    },

    /// Failure injected into the paper gateway.
    #[error("simulated fault: {0}")]
    Simulated(String),
}

/// Durable trade log errors.
#[derive(Error, Debug)]
pub enum TradeLogError {
    /// Writing or reading the log file failed.
    #[error("trade log io error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or an existing line decoded.
    #[error("trade log encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
