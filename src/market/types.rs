//! Market snapshot types for binary YES/NO prediction markets.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

/// Outcome leg of a binary market.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    /// YES share, pays $1 if the event happens.
    #[strum(to_string = "YES", serialize = "yes", serialize = "Yes")]
    #[default]
    Yes,
    /// NO share, pays $1 if the event does not happen.
    #[strum(to_string = "NO", serialize = "no", serialize = "No")]
    No,
}

impl Outcome {
    /// Get the opposite outcome.
    pub fn opposite(&self) -> Self {
        match self {
            Outcome::Yes => Outcome::No,
            Outcome::No => Outcome::Yes,
        }
    }
}

/// Snapshot of a single binary market as seen by one poll.
///
/// Produced fresh by the gateway on every poll and never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    /// Venue market identifier (condition id on Polymarket).
    pub id: String,
    /// Market question text.
    pub description: String,
    /// Price of one YES share, in `[0, 1]`.
    pub yes_price: Decimal,
    /// Price of one NO share, in `[0, 1]`.
    pub no_price: Decimal,
    /// Venue token id of the YES outcome.
    pub yes_token_id: Option<String>,
    /// Venue token id of the NO outcome.
    pub no_token_id: Option<String>,
    /// Whether the market is active.
    pub active: bool,
    /// Whether the order book accepts orders.
    pub accepting_orders: bool,
    /// Whether the market is archived.
    pub archived: bool,
    /// Scheduled end date.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    /// Creation date.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

impl Market {
    /// Create an active, order-accepting market with the given quotes.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        yes_price: Decimal,
        no_price: Decimal,
    ) -> Self {
        let id = id.into();
        Self {
            yes_token_id: Some(format!("{id}-yes")),
            no_token_id: Some(format!("{id}-no")),
            id,
            description: description.into(),
            yes_price,
            no_price,
            active: true,
            accepting_orders: true,
            archived: false,
            end_date: None,
            created_at: None,
        }
    }

    /// Whether the market passes the active-only filter.
    pub fn is_tradeable(&self) -> bool {
        self.active && self.accepting_orders && !self.archived
    }

    /// Whether both quotes are strictly positive.
    pub fn has_valid_prices(&self) -> bool {
        self.yes_price > Decimal::ZERO && self.no_price > Decimal::ZERO
    }

    /// Quoted price for an outcome.
    pub fn price(&self, outcome: Outcome) -> Decimal {
        match outcome {
            Outcome::Yes => self.yes_price,
            Outcome::No => self.no_price,
        }
    }

    /// Token id for an outcome, if known.
    pub fn token_id(&self, outcome: Outcome) -> Option<&str> {
        match outcome {
            Outcome::Yes => self.yes_token_id.as_deref(),
            Outcome::No => self.no_token_id.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn outcome_opposite_works() {
        assert_eq!(Outcome::Yes.opposite(), Outcome::No);
        assert_eq!(Outcome::No.opposite(), Outcome::Yes);
    }

    #[test]
    fn outcome_from_string_works() {
        use std::str::FromStr;
        assert_eq!(Outcome::from_str("Yes").unwrap(), Outcome::Yes);
        assert_eq!(Outcome::from_str("NO").unwrap(), Outcome::No);
        assert!(Outcome::from_str("maybe").is_err());
        assert_eq!(Outcome::Yes.to_string(), "YES");
    }

    #[test]
    fn market_accessors() {
        let market = Market::new("m1", "Will it rain?", dec!(0.40), dec!(0.55));

        assert_eq!(market.price(Outcome::Yes), dec!(0.40));
        assert_eq!(market.price(Outcome::No), dec!(0.55));
        assert_eq!(market.token_id(Outcome::Yes), Some("m1-yes"));
        assert_eq!(market.token_id(Outcome::No), Some("m1-no"));
        assert!(market.is_tradeable());
        assert!(market.has_valid_prices());
    }

    #[test]
    fn tradeable_requires_all_flags() {
        let base = Market::new("m1", "q", dec!(0.4), dec!(0.5));

        let inactive = Market { active: false, ..base.clone() };
        let closed_book = Market { accepting_orders: false, ..base.clone() };
        let archived = Market { archived: true, ..base.clone() };

        assert!(!inactive.is_tradeable());
        assert!(!closed_book.is_tradeable());
        assert!(!archived.is_tradeable());
    }

    #[test]
    fn zero_price_is_not_valid() {
        let market = Market::new("m1", "q", dec!(0), dec!(0.5));
        assert!(!market.has_valid_prices());
    }
}
