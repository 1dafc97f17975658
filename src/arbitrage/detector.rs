//! Arbitrage opportunity detection.
//!
//! Pure functions over market snapshots: no I/O, no logging, no mutation.

use rust_decimal::Decimal;
use thiserror::Error;

use super::calculator::{ArbitrageOpportunity, PairCost, MIN_PROFIT_THRESHOLD};
use crate::config::Config;
use crate::market::Market;

/// Why a market is not an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// A quote is zero or negative.
    #[error("non-positive price (yes={yes_price}, no={no_price})")]
    NonPositivePrice {
        /// YES quote.
        yes_price: Decimal,
        /// NO quote.
        no_price: Decimal,
    },

    /// Cost with fees does not clear the fixed guard.
    #[error("cost with fees {total_cost_with_fees} not below {limit}")]
    Unprofitable {
        /// Pair cost including fees.
        total_cost_with_fees: Decimal,
        /// `1 - MIN_PROFIT_THRESHOLD`.
        limit: Decimal,
    },

    /// Margin is below the configured minimum.
    #[error("margin {profit_margin} below minimum {minimum}")]
    BelowMinimum {
        /// Computed margin.
        profit_margin: Decimal,
        /// Configured minimum.
        minimum: Decimal,
    },
}

/// Detects YES+NO pairs that sum to less than $1 after fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbitrageDetector {
    /// Configured minimum profit margin.
    pub min_profit_pct: Decimal,
    /// Fee rate applied to the pair cost.
    pub fee_rate: Decimal,
}

impl ArbitrageDetector {
    /// Create a detector with explicit thresholds.
    pub fn new(min_profit_pct: Decimal, fee_rate: Decimal) -> Self {
        Self {
            min_profit_pct,
            fee_rate,
        }
    }

    /// Create a detector from config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.min_profit_pct, config.fee_rate)
    }

    /// Evaluate one market, returning the opportunity or the reason it was rejected.
    pub fn diagnose(&self, market: &Market) -> Result<ArbitrageOpportunity, Rejection> {
        if !market.has_valid_prices() {
            return Err(Rejection::NonPositivePrice {
                yes_price: market.yes_price,
                no_price: market.no_price,
            });
        }

        let cost = PairCost::new(market.yes_price, market.no_price, self.fee_rate);
        if !cost.is_profitable() {
            return Err(Rejection::Unprofitable {
                total_cost_with_fees: cost.total_cost_with_fees,
                limit: Decimal::ONE - MIN_PROFIT_THRESHOLD,
            });
        }

        let profit_margin = cost.profit_margin();
        if profit_margin < self.min_profit_pct {
            return Err(Rejection::BelowMinimum {
                profit_margin,
                minimum: self.min_profit_pct,
            });
        }

        Ok(ArbitrageOpportunity::from_market(market, cost))
    }

    /// Evaluate one market.
    pub fn evaluate(&self, market: &Market) -> Option<ArbitrageOpportunity> {
        self.diagnose(market).ok()
    }

    /// Evaluate every market and rank the opportunities by margin, best first.
    ///
    /// The sort is stable, so equal margins keep their input order.
    pub fn scan(&self, markets: &[Market]) -> Vec<ArbitrageOpportunity> {
        let mut opportunities: Vec<_> = markets.iter().filter_map(|m| self.evaluate(m)).collect();
        opportunities.sort_by(|a, b| b.profit_margin.cmp(&a.profit_margin));
        opportunities
    }
}
