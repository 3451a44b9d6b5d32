//! Product price using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product price in the shop's single currency.
///
/// Stored as `NUMERIC(10, 2)`. Negative prices are rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Wrap a decimal amount, rejecting negative values.
    #[must_use]
    pub fn new(amount: Decimal) -> Option<Self> {
        (!amount.is_sign_negative()).then_some(Self(amount))
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Format for display, e.g. `$19.99`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("${:.2}", self.0)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

impl std::str::FromStr for Price {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount: Decimal = s
            .trim()
            .trim_start_matches('$')
            .parse()
            .map_err(|e| format!("invalid price {s}: {e}"))?;
        Self::new(amount).ok_or_else(|| format!("price cannot be negative: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        let price: Price = "19.5".parse().unwrap();
        assert_eq!(price.to_string(), "$19.50");
    }

    #[test]
    fn test_rejects_negative() {
        assert!("-1.00".parse::<Price>().is_err());
        assert!(Price::new(Decimal::new(-100, 2)).is_none());
    }

    #[test]
    fn test_accepts_dollar_prefix() {
        let price: Price = "$3.25".parse().unwrap();
        assert_eq!(price.amount(), Decimal::new(325, 2));
    }
}
