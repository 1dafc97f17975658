//! Hedged pair execution.
//!
//! For one opportunity the executor sizes a position, buys the YES leg and then
//! the NO leg at a slippage-buffered limit price, and records the trade. If
//! either leg fails, whichever leg was accepted is cancelled. Compensation is
//! best effort: a failed cancel leaves an unhedged position that is logged at
//! error level for the operator.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, warn};

use super::calculator::ArbitrageOpportunity;
use crate::config::Config;
use crate::error::GatewayError;
use crate::market::{MarketGateway, Outcome};
use crate::metrics;
use crate::trading::{Order, OrderParams, TradeLog, TradeRecord, TradeStatus};

/// Smallest position the executor opens, and the balance below which it
/// refuses to trade.
pub const MIN_TICKET: Decimal = dec!(100);

/// Share of capital used as the base position.
const BASE_CAPITAL_FRACTION: Decimal = dec!(0.10);

/// Hard cap on the share of capital in one trade.
const MAX_CAPITAL_FRACTION: Decimal = dec!(0.20);

/// Position grows by `profit_margin * MARGIN_SCALE` over the base.
const MARGIN_SCALE: Decimal = dec!(10);

/// A leg that the gateway did not accept.
#[derive(Debug, Clone, PartialEq)]
pub struct LegFailure {
    /// Outcome leg.
    pub outcome: Outcome,
    /// Gateway error message.
    pub reason: String,
}

/// What happened to the compensating cancel of an accepted leg.
#[derive(Debug, Clone, PartialEq)]
pub enum Compensation {
    /// Gateway confirmed the cancel.
    Cancelled {
        /// Cancelled order.
        order_id: String,
    },
    /// Gateway answered but did not cancel.
    NotCancelled {
        /// Order left open.
        order_id: String,
    },
    /// Cancel call failed.
    CancelFailed {
        /// Order left open.
        order_id: String,
        /// Gateway error message.
        reason: String,
    },
}

impl Compensation {
    /// Whether the accepted leg was unwound.
    pub fn is_hedged(&self) -> bool {
        matches!(self, Compensation::Cancelled { .. })
    }
}

/// Result of attempting to execute an arbitrage.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// Both legs accepted.
    Executed(TradeRecord),
    /// Balance below the minimum ticket; nothing was sent.
    InsufficientBalance {
        /// Balance reported by the gateway.
        available: Decimal,
    },
    /// At least one leg failed; accepted legs were cancelled.
    LegFailed {
        /// Legs the gateway rejected.
        failures: Vec<LegFailure>,
        /// Cancels issued for accepted legs.
        compensations: Vec<Compensation>,
    },
    /// The position cannot be expressed as a share count; nothing was sent.
    Unsizeable {
        /// Dollars the sizing policy allocated.
        position_size: Decimal,
    },
    /// Gateway failed before any order was sent.
    GatewayFault(String),
}

/// Sizes and places hedged YES+NO order pairs.
pub struct ArbitrageExecutor {
    /// Venue gateway.
    gateway: Arc<dyn MarketGateway>,
    /// Durable trade sink.
    trade_log: Option<Arc<dyn TradeLog>>,
    /// Maximum dollars per trade.
    max_position_size: Decimal,
    /// Limit price buffer over the quote.
    max_slippage_pct: Decimal,
    /// Trades executed by this instance.
    history: Vec<TradeRecord>,
}

impl std::fmt::Debug for ArbitrageExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArbitrageExecutor")
            .field("gateway", &self.gateway.name())
            .field("max_position_size", &self.max_position_size)
            .field("max_slippage_pct", &self.max_slippage_pct)
            .field("trades", &self.history.len())
            .finish()
    }
}

impl ArbitrageExecutor {
    /// Create an executor with explicit limits.
    pub fn new(
        gateway: Arc<dyn MarketGateway>,
        max_position_size: Decimal,
        max_slippage_pct: Decimal,
    ) -> Self {
        Self {
            gateway,
            trade_log: None,
            max_position_size,
            max_slippage_pct,
            history: Vec::new(),
        }
    }

    /// Create an executor from config.
    pub fn from_config(gateway: Arc<dyn MarketGateway>, config: &Config) -> Self {
        Self::new(gateway, config.max_position_size, config.max_slippage_pct)
    }

    /// Attach a durable trade log.
    pub fn with_trade_log(mut self, trade_log: Arc<dyn TradeLog>) -> Self {
        self.trade_log = Some(trade_log);
        self
    }

    /// Trades executed by this instance, oldest first.
    pub fn trade_history(&self) -> &[TradeRecord] {
        &self.history
    }

    /// Dollars to allocate to an opportunity given the available capital.
    ///
    /// Starts from 10% of capital (capped at the max position), scales up with
    /// the margin, caps at the max position and 20% of capital, and never goes
    /// below the minimum ticket.
    pub fn size_position(
        &self,
        opportunity: &ArbitrageOpportunity,
        available_capital: Decimal,
    ) -> Decimal {
        let base_size = self
            .max_position_size
            .min(available_capital * BASE_CAPITAL_FRACTION);
        let scaled_size = base_size * (Decimal::ONE + opportunity.profit_margin * MARGIN_SCALE);
        let position_size = scaled_size
            .min(self.max_position_size)
            .min(available_capital * MAX_CAPITAL_FRACTION);

        position_size.max(MIN_TICKET)
    }

    /// Limit price for a leg: the quote plus the slippage buffer.
    pub fn limit_price(&self, price: Decimal) -> Decimal {
        price * (Decimal::ONE + self.max_slippage_pct)
    }

    /// Execute an opportunity, returning the trade record on success.
    ///
    /// Every failure mode is logged and reported as `None`.
    pub async fn execute(&mut self, opportunity: &ArbitrageOpportunity) -> Option<TradeRecord> {
        match self.try_execute(opportunity).await {
            ExecutionResult::Executed(record) => Some(record),
            _ => None,
        }
    }

    /// Execute an opportunity and report exactly what happened.
    #[instrument(skip(self, opportunity), fields(market = %opportunity.market_id))]
    pub async fn try_execute(&mut self, opportunity: &ArbitrageOpportunity) -> ExecutionResult {
        let balance = match self.gateway.get_balance().await {
            Ok(balance) => balance,
            Err(e) => {
                metrics::inc_gateway_errors("get_balance");
                error!(error = %e, "Failed to fetch balance");
                return ExecutionResult::GatewayFault(e.to_string());
            }
        };

        if balance < MIN_TICKET {
            warn!(
                available = %balance,
                minimum = %MIN_TICKET,
                "Insufficient balance, skipping trade"
            );
            return ExecutionResult::InsufficientBalance { available: balance };
        }

        let position_size = self.size_position(opportunity, balance);
        let Some(shares) = opportunity.shares_for(position_size) else {
            error!(
                position_size = %position_size,
                total_cost = %opportunity.total_cost,
                "Share count overflows, skipping trade"
            );
            return ExecutionResult::Unsizeable { position_size };
        };
        self.log_opportunity(opportunity, position_size, shares);

        let yes_params = OrderParams::buy(
            opportunity.market_id.clone(),
            Outcome::Yes,
            opportunity.yes_token_id.clone(),
            self.limit_price(opportunity.yes_price),
            shares,
        );
        let no_params = OrderParams::buy(
            opportunity.market_id.clone(),
            Outcome::No,
            opportunity.no_token_id.clone(),
            self.limit_price(opportunity.no_price),
            shares,
        );

        // Both legs are always attempted, YES first.
        let yes_result = self.place_leg(&yes_params).await;
        let no_result = self.place_leg(&no_params).await;

        match (yes_result, no_result) {
            (Ok(yes_order), Ok(no_order)) => {
                let record = TradeRecord {
                    market_id: opportunity.market_id.clone(),
                    description: opportunity.description.clone(),
                    yes_order_id: yes_order.id,
                    no_order_id: no_order.id,
                    yes_price: opportunity.yes_price,
                    no_price: opportunity.no_price,
                    shares,
                    position_size,
                    expected_profit: opportunity.expected_profit(position_size),
                    profit_margin: opportunity.profit_margin,
                    timestamp: OffsetDateTime::now_utc(),
                    status: TradeStatus::Executed,
                };
                self.record_trade(&record).await;
                ExecutionResult::Executed(record)
            }
            (yes_result, no_result) => {
                let mut failures = Vec::new();
                let mut accepted = Vec::new();
                for (outcome, result) in [(Outcome::Yes, yes_result), (Outcome::No, no_result)] {
                    match result {
                        Ok(order) => accepted.push(order),
                        Err(e) => failures.push(LegFailure {
                            outcome,
                            reason: e.to_string(),
                        }),
                    }
                }

                let mut compensations = Vec::with_capacity(accepted.len());
                for order in &accepted {
                    compensations.push(self.compensate(order).await);
                }

                warn!(
                    failed_legs = failures.len(),
                    cancelled = compensations.iter().filter(|c| c.is_hedged()).count(),
                    "Trade failed, no position recorded"
                );
                ExecutionResult::LegFailed {
                    failures,
                    compensations,
                }
            }
        }
    }

    /// Submit one leg.
    async fn place_leg(&self, params: &OrderParams) -> Result<Order, GatewayError> {
        metrics::inc_orders_submitted();
        match self.gateway.place_order(params).await {
            Ok(order) => {
                info!(
                    outcome = %params.outcome,
                    order_id = %order.id,
                    price = %params.price,
                    size = %params.size,
                    "Leg accepted"
                );
                Ok(order)
            }
            Err(e) => {
                metrics::inc_orders_failed();
                error!(outcome = %params.outcome, error = %e, "Leg failed");
                Err(e)
            }
        }
    }

    /// Cancel an accepted leg after its partner failed.
    async fn compensate(&self, order: &Order) -> Compensation {
        metrics::inc_compensating_cancels();
        let order_id = order.id.clone();

        match self.gateway.cancel_order(&order.id).await {
            Ok(true) => {
                info!(order_id = %order_id, outcome = %order.outcome, "Compensating cancel succeeded");
                Compensation::Cancelled { order_id }
            }
            Ok(false) => {
                metrics::inc_cancel_failures();
                error!(
                    order_id = %order_id,
                    outcome = %order.outcome,
                    shares = %order.size,
                    "UNHEDGED EXPOSURE: gateway did not cancel accepted leg"
                );
                Compensation::NotCancelled { order_id }
            }
            Err(e) => {
                metrics::inc_cancel_failures();
                error!(
                    order_id = %order_id,
                    outcome = %order.outcome,
                    shares = %order.size,
                    error = %e,
                    "UNHEDGED EXPOSURE: compensating cancel failed"
                );
                Compensation::CancelFailed {
                    order_id,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Append to history and the durable log. Log failures do not fail the trade.
    async fn record_trade(&mut self, record: &TradeRecord) {
        metrics::inc_trades_executed();
        self.history.push(record.clone());

        info!("========================================");
        info!("ARBITRAGE EXECUTED");
        info!("========================================");
        info!("YES order:            {}", record.yes_order_id);
        info!("NO order:             {}", record.no_order_id);
        info!("Shares each side:     {}", record.shares.round_dp(4));
        info!("Position size:        ${}", record.position_size.round_dp(2));
        info!("EXPECTED PROFIT:      ${}", record.expected_profit.round_dp(2));
        info!("========================================");

        if let Some(trade_log) = &self.trade_log {
            match trade_log.append(record).await {
                Ok(true) => debug!("Trade logged"),
                Ok(false) => debug!("Trade already in log"),
                Err(e) => error!(error = %e, "Failed to write trade log"),
            }
        }
    }

    /// Log opportunity details.
    fn log_opportunity(
        &self,
        opportunity: &ArbitrageOpportunity,
        position_size: Decimal,
        shares: Decimal,
    ) {
        info!("========================================");
        info!("ARBITRAGE OPPORTUNITY");
        info!("========================================");
        info!("Market:               {}", opportunity.description);
        info!("YES price:            ${}", opportunity.yes_price);
        info!("NO price:             ${}", opportunity.no_price);
        info!("Total cost:           ${}", opportunity.total_cost);
        info!("Cost with fees:       ${}", opportunity.total_cost_with_fees);
        info!("Profit margin:        {}%", opportunity.profit_pct.round_dp(2));
        info!("----------------------------------------");
        info!("Position size:        ${}", position_size.round_dp(2));
        info!("Shares each side:     {}", shares.round_dp(4));
        info!(
            "Expected profit:      ${}",
            opportunity.expected_profit(position_size).round_dp(2)
        );
        info!("========================================");
    }
}
