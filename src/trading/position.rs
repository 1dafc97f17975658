//! Position tracking for the paper ledger.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::market::Outcome;

/// Shares held in one outcome leg, opened by a single fill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    /// Order that opened the position.
    pub order_id: String,
    /// Market the shares belong to.
    pub market_id: String,
    /// Outcome leg.
    pub outcome: Outcome,
    /// Number of shares owned.
    pub shares: Decimal,
    /// Average entry price.
    pub avg_price: Decimal,
}

impl Position {
    /// Calculate the cost basis.
    pub fn cost_basis(&self) -> Decimal {
        self.shares * self.avg_price
    }

    /// Payout at resolution: $1 per share if this leg won, nothing otherwise.
    pub fn payout(&self, winning: Outcome) -> Decimal {
        if self.outcome == winning {
            self.shares
        } else {
            Decimal::ZERO
        }
    }
}

/// Aggregated YES and NO holdings in one market.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketPositions {
    /// YES shares held.
    pub yes_shares: Decimal,
    /// NO shares held.
    pub no_shares: Decimal,
    /// Total cost paid for all shares.
    pub cost_basis: Decimal,
}

impl MarketPositions {
    /// Aggregate a set of positions.
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Self {
        positions
            .into_iter()
            .fold(Self::default(), |mut acc, position| {
                match position.outcome {
                    Outcome::Yes => acc.yes_shares += position.shares,
                    Outcome::No => acc.no_shares += position.shares,
                }
                acc.cost_basis += position.cost_basis();
                acc
            })
    }

    /// Check if positions are hedged (equal size on both sides).
    pub fn is_hedged(&self) -> bool {
        self.yes_shares == self.no_shares
    }

    /// Shares held on one side without a matching opposite share.
    pub fn unhedged_shares(&self) -> Decimal {
        (self.yes_shares - self.no_shares).abs()
    }

    /// Payout guaranteed whichever side wins: each YES+NO pair pays $1.
    pub fn guaranteed_payout(&self) -> Decimal {
        self.yes_shares.min(self.no_shares)
    }
}
