//! Profit and cost calculations for YES+NO spread opportunities.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::market::Market;

/// Fixed guard: a pair is only profitable if its cost with fees stays below
/// `1 - MIN_PROFIT_THRESHOLD`. Independent of the configured minimum margin.
pub const MIN_PROFIT_THRESHOLD: Decimal = dec!(0.01);

/// Cost of one YES+NO share pair including fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairCost {
    /// `yes_price + no_price`.
    pub total_cost: Decimal,
    /// `total_cost * fee_rate`.
    pub fees: Decimal,
    /// `total_cost + fees`.
    pub total_cost_with_fees: Decimal,
}

impl PairCost {
    /// Compute the pair cost for two quotes.
    pub fn new(yes_price: Decimal, no_price: Decimal, fee_rate: Decimal) -> Self {
        let total_cost = yes_price + no_price;
        let fees = total_cost * fee_rate;
        Self {
            total_cost,
            fees,
            total_cost_with_fees: total_cost + fees,
        }
    }

    /// Whether the pair clears the fixed guard.
    pub fn is_profitable(&self) -> bool {
        self.total_cost_with_fees < Decimal::ONE - MIN_PROFIT_THRESHOLD
    }

    /// Margin left from the $1 payout after cost and fees.
    pub fn profit_margin(&self) -> Decimal {
        Decimal::ONE - self.total_cost_with_fees
    }
}

/// Detected arbitrage opportunity. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageOpportunity {
    /// Market being traded.
    pub market_id: String,
    /// Market question.
    pub description: String,
    /// YES token id.
    pub yes_token_id: Option<String>,
    /// NO token id.
    pub no_token_id: Option<String>,
    /// YES quote at detection.
    pub yes_price: Decimal,
    /// NO quote at detection.
    pub no_price: Decimal,
    /// `yes_price + no_price`.
    pub total_cost: Decimal,
    /// Fees on the pair.
    pub fees: Decimal,
    /// `total_cost + fees`.
    pub total_cost_with_fees: Decimal,
    /// `1 - total_cost_with_fees`.
    pub profit_margin: Decimal,
    /// `profit_margin * 100`.
    pub profit_pct: Decimal,
    /// Share pairs bought per dollar, `1 / total_cost`.
    pub shares_per_dollar: Decimal,
}

impl ArbitrageOpportunity {
    /// Build an opportunity from a market and its pair cost.
    ///
    /// Callers must have checked that both prices are positive. The smallest
    /// positive cost is `1e-28`, so `1 / total_cost` always fits.
    pub fn from_market(market: &Market, cost: PairCost) -> Self {
        let profit_margin = cost.profit_margin();
        Self {
            market_id: market.id.clone(),
            description: market.description.clone(),
            yes_token_id: market.yes_token_id.clone(),
            no_token_id: market.no_token_id.clone(),
            yes_price: market.yes_price,
            no_price: market.no_price,
            total_cost: cost.total_cost,
            fees: cost.fees,
            total_cost_with_fees: cost.total_cost_with_fees,
            profit_margin,
            profit_pct: profit_margin * Decimal::ONE_HUNDRED,
            shares_per_dollar: Decimal::ONE / cost.total_cost,
        }
    }

    /// Number of share pairs a position of `position_size` dollars buys, or
    /// `None` if the count overflows.
    pub fn shares_for(&self, position_size: Decimal) -> Option<Decimal> {
        position_size.checked_div(self.total_cost)
    }

    /// Expected profit for a position of `position_size` dollars.
    pub fn expected_profit(&self, position_size: Decimal) -> Decimal {
        position_size * self.profit_margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_cost_includes_fees() {
        let cost = PairCost::new(dec!(0.50), dec!(0.44), dec!(0.02));

        assert_eq!(cost.total_cost, dec!(0.94));
        assert_eq!(cost.fees, dec!(0.0188));
        assert_eq!(cost.total_cost_with_fees, dec!(0.9588));
        assert_eq!(cost.profit_margin(), dec!(0.0412));
        assert!(cost.is_profitable());
    }

    #[test]
    fn profitability_requires_clearing_guard() {
        // 0.98 * 1.02 = 0.9996
        assert!(!PairCost::new(dec!(0.52), dec!(0.46), dec!(0.02)).is_profitable());
        // exactly 0.99 with no fees is not below the guard
        assert!(!PairCost::new(dec!(0.49), dec!(0.50), dec!(0)).is_profitable());

        let cost = PairCost::new(dec!(0.49), dec!(0.49), dec!(0));
        assert!(cost.is_profitable());
        assert_eq!(cost.profit_margin(), dec!(0.02));
    }

    #[test]
    fn opportunity_derived_fields() {
        let market = Market::new("m1", "Will it rain?", dec!(0.50), dec!(0.44));
        let opp = ArbitrageOpportunity::from_market(&market, PairCost::new(dec!(0.50), dec!(0.44), dec!(0.02)));

        assert_eq!(opp.total_cost, dec!(0.94));
        assert_eq!(opp.profit_margin, dec!(0.0412));
        assert_eq!(opp.profit_pct, dec!(4.12));
        assert_eq!(opp.shares_per_dollar, Decimal::ONE / dec!(0.94));
        assert_eq!(opp.expected_profit(dec!(1000)), dec!(41.2));
        assert_eq!(opp.shares_for(dec!(94)), Some(dec!(100)));
        assert_eq!(opp.yes_token_id.as_deref(), Some("m1-yes"));
    }

    #[test]
    fn sizing_overflow_is_reported_not_panicked() {
        let tiny = Decimal::new(1, 28);
        let market = Market::new("dust", "q", tiny, tiny);
        let opp = ArbitrageOpportunity::from_market(&market, PairCost::new(tiny, tiny, dec!(0.02)));

        assert_eq!(opp.shares_per_dollar, dec!(5000000000000000000000000000));
        assert_eq!(opp.shares_for(dec!(1000)), None);
    }
}
