//! Paper-trading gateway.
//!
//! Simulates the venue with an in-memory ledger: orders fill immediately at
//! their limit price, cancels reverse the fill, and market resolution pays $1
//! per winning share. Market data comes from a seeded list or, when attached,
//! from the live client used read-only.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::gateway::MarketGateway;
use super::types::{Market, Outcome};
use crate::error::GatewayError;
use crate::trading::{MarketPositions, Order, OrderParams, OrderStatus, Position};

/// Failures injected into the simulator.
#[derive(Debug, Clone, Default)]
pub struct SimulatedFaults {
    /// Reject every order for this outcome leg.
    pub reject_orders_for: Option<Outcome>,
    /// Fail `list_markets`.
    pub fail_list_markets: bool,
    /// Fail `get_balance`.
    pub fail_balance: bool,
    /// Fail `cancel_order`.
    pub fail_cancel: bool,
}

/// Result of resolving a market on the paper ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settlement {
    /// Market that resolved.
    pub market_id: String,
    /// Winning outcome.
    pub winning_outcome: Outcome,
    /// Cost basis of the settled positions.
    pub cost: Decimal,
    /// Amount paid out.
    pub payout: Decimal,
    /// Part of the payout locked in by matched YES+NO pairs.
    pub guaranteed_payout: Decimal,
    /// `payout - cost`.
    pub profit: Decimal,
}

/// Ledger statistics of the paper gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperStatistics {
    /// Starting balance.
    pub initial_balance: Decimal,
    /// Current cash balance.
    pub current_balance: Decimal,
    /// Orders accepted, including cancelled ones.
    pub total_orders: usize,
    /// Open positions.
    pub active_positions: usize,
    /// Settled markets.
    pub completed_trades: usize,
    /// Cost basis of settled markets.
    pub total_invested: Decimal,
    /// Payout of settled markets.
    pub total_payout: Decimal,
    /// `total_payout - total_invested`.
    pub total_profit: Decimal,
    /// Return on settled capital, in percent.
    pub roi: Decimal,
}

#[derive(Debug)]
struct PaperLedger {
    balance: Decimal,
    next_order_id: u64,
    orders: Vec<Order>,
    positions: Vec<Position>,
    settlements: Vec<Settlement>,
    markets: Vec<Market>,
}

/// Simulated gateway backed by an in-memory ledger.
pub struct PaperTradingClient {
    /// Starting balance.
    initial_balance: Decimal,
    /// Ledger state.
    ledger: Mutex<PaperLedger>,
    /// Injected failures.
    faults: Mutex<SimulatedFaults>,
    /// Read-only market data source.
    market_source: Option<Arc<dyn MarketGateway>>,
}

impl std::fmt::Debug for PaperTradingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaperTradingClient")
            .field("initial_balance", &self.initial_balance)
            .field("market_source", &self.market_source.as_ref().map(|s| s.name()))
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PaperTradingClient {
    /// Create a simulator with the given starting balance and no markets.
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            initial_balance,
            ledger: Mutex::new(PaperLedger {
                balance: initial_balance,
                next_order_id: 1,
                orders: Vec::new(),
                positions: Vec::new(),
                settlements: Vec::new(),
                markets: Vec::new(),
            }),
            faults: Mutex::new(SimulatedFaults::default()),
            market_source: None,
        }
    }

    /// Seed the market list.
    pub fn with_markets(self, markets: Vec<Market>) -> Self {
        self.set_markets(markets);
        self
    }

    /// Read market data from another gateway (normally the live client).
    pub fn with_market_source(mut self, source: Arc<dyn MarketGateway>) -> Self {
        self.market_source = Some(source);
        self
    }

    /// Replace the seeded market list.
    pub fn set_markets(&self, markets: Vec<Market>) {
        lock(&self.ledger).markets = markets;
    }

    /// Replace the injected failures.
    pub fn set_faults(&self, faults: SimulatedFaults) {
        *lock(&self.faults) = faults;
    }

    /// Current cash balance.
    pub fn balance(&self) -> Decimal {
        lock(&self.ledger).balance
    }

    /// Every order accepted so far.
    pub fn orders(&self) -> Vec<Order> {
        lock(&self.ledger).orders.clone()
    }

    /// Open positions.
    pub fn positions(&self) -> Vec<Position> {
        lock(&self.ledger).positions.clone()
    }

    /// Aggregated holdings in one market.
    pub fn market_positions(&self, market_id: &str) -> MarketPositions {
        let ledger = lock(&self.ledger);
        MarketPositions::from_positions(
            ledger.positions.iter().filter(|p| p.market_id == market_id),
        )
    }

    /// Resolve a market: pay $1 per winning share and close its positions.
    ///
    /// Returns `None` if no positions are held in the market.
    #[instrument(skip(self))]
    pub fn simulate_market_resolution(
        &self,
        market_id: &str,
        winning_outcome: Outcome,
    ) -> Option<Settlement> {
        let mut ledger = lock(&self.ledger);

        let (settled, open): (Vec<Position>, Vec<Position>) = ledger
            .positions
            .drain(..)
            .partition(|p| p.market_id == market_id);
        ledger.positions = open;

        if settled.is_empty() {
            debug!("No positions to settle");
            return None;
        }

        let holdings = MarketPositions::from_positions(&settled);
        if !holdings.is_hedged() {
            warn!(unhedged = %holdings.unhedged_shares(), "Resolving market with unhedged shares");
        }

        let cost = holdings.cost_basis;
        let payout: Decimal = settled.iter().map(|p| p.payout(winning_outcome)).sum();
        ledger.balance += payout;

        let settlement = Settlement {
            market_id: market_id.to_string(),
            winning_outcome,
            cost,
            payout,
            guaranteed_payout: holdings.guaranteed_payout(),
            profit: payout - cost,
        };
        ledger.settlements.push(settlement.clone());

        info!(
            winner = %winning_outcome,
            cost = %cost,
            payout = %payout,
            profit = %settlement.profit,
            balance = %ledger.balance,
            "Paper market resolved"
        );
        Some(settlement)
    }

    /// Ledger statistics.
    pub fn statistics(&self) -> PaperStatistics {
        let ledger = lock(&self.ledger);

        let total_invested: Decimal = ledger.settlements.iter().map(|s| s.cost).sum();
        let total_payout: Decimal = ledger.settlements.iter().map(|s| s.payout).sum();
        let total_profit = total_payout - total_invested;
        let roi = if total_invested > Decimal::ZERO {
            total_profit / total_invested * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        PaperStatistics {
            initial_balance: self.initial_balance,
            current_balance: ledger.balance,
            total_orders: ledger.orders.len(),
            active_positions: ledger.positions.len(),
            completed_trades: ledger.settlements.len(),
            total_invested,
            total_payout,
            total_profit,
            roi,
        }
    }
}

#[async_trait]
impl MarketGateway for PaperTradingClient {
    async fn list_markets(&self, active_only: bool) -> Result<Vec<Market>, GatewayError> {
        if lock(&self.faults).fail_list_markets {
            return Err(GatewayError::Simulated("list_markets unavailable".to_string()));
        }

        if let Some(source) = &self.market_source {
            return source.list_markets(active_only).await;
        }

        let ledger = lock(&self.ledger);
        Ok(ledger
            .markets
            .iter()
            .filter(|m| !active_only || m.is_tradeable())
            .cloned()
            .collect())
    }

    async fn get_balance(&self) -> Result<Decimal, GatewayError> {
        if lock(&self.faults).fail_balance {
            return Err(GatewayError::Simulated("get_balance unavailable".to_string()));
        }
        Ok(self.balance())
    }

    #[instrument(skip(self, params), fields(market = %params.market_id, outcome = %params.outcome))]
    async fn place_order(&self, params: &OrderParams) -> Result<Order, GatewayError> {
        params.validate().map_err(GatewayError::InvalidParams)?;

        if lock(&self.faults).reject_orders_for == Some(params.outcome) {
            warn!("Paper order rejected by injected fault");
            return Err(GatewayError::OrderRejected {
                reason: format!("simulated rejection of {} leg", params.outcome),
            });
        }

        let mut ledger = lock(&self.ledger);
        let cost = params.cost();
        if cost > ledger.balance {
            warn!(cost = %cost, balance = %ledger.balance, "Paper order exceeds balance");
            return Err(GatewayError::InsufficientFunds {
                required: cost,
                available: ledger.balance,
            });
        }

        let order_id = format!("paper_order_{}", ledger.next_order_id);
        ledger.next_order_id += 1;
        ledger.balance -= cost;

        let order = Order::from_params(order_id.clone(), params, OrderStatus::Filled);
        ledger.orders.push(order.clone());
        ledger.positions.push(Position {
            order_id: order_id.clone(),
            market_id: params.market_id.clone(),
            outcome: params.outcome,
            shares: params.size,
            avg_price: params.price,
        });

        info!(
            order_id = %order_id,
            price = %params.price,
            size = %params.size,
            cost = %cost,
            balance = %ledger.balance,
            "Paper order filled"
        );
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: &str) -> Result<bool, GatewayError> {
        if lock(&self.faults).fail_cancel {
            return Err(GatewayError::Simulated("cancel_order unavailable".to_string()));
        }

        let mut ledger = lock(&self.ledger);
        let Some(order) = ledger
            .orders
            .iter_mut()
            .find(|o| o.id == order_id && o.status == OrderStatus::Filled)
        else {
            debug!("No open paper order to cancel");
            return Ok(false);
        };

        order.status = OrderStatus::Canceled;
        let refund = order.cost;
        ledger.balance += refund;
        ledger.positions.retain(|p| p.order_id != order_id);

        info!(refund = %refund, balance = %ledger.balance, "Paper order cancelled");
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "paper"
    }

    fn paper_statistics(&self) -> Option<PaperStatistics> {
        Some(self.statistics())
    }
}
