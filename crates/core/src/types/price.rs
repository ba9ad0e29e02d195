//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors converting a [`Price`] to the payment processor's integer amount.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Negative amounts cannot be charged.
    #[error("price cannot be negative")]
    Negative,
    /// The amount does not fit in an `i64` of minor units.
    #[error("price is out of range")]
    OutOfRange,
    /// Unknown ISO 4217 code.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Amount in the currency's smallest unit (cents for USD), rounded
    /// half-away-from-zero to the currency's precision.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for negative amounts and
    /// [`PriceError::OutOfRange`] when the result overflows `i64`.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(PriceError::Negative);
        }

        let scale = Decimal::from(10_i64.pow(self.currency_code.exponent()));
        let scaled = self
            .amount
            .checked_mul(scale)
            .ok_or(PriceError::OutOfRange)?
            .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero);

        scaled.to_i64().ok_or(PriceError::OutOfRange)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.currency_code.exponent() as usize;
        write!(
            f,
            "{}{:.precision$}",
            self.currency_code.symbol(),
            self.amount.round_dp(self.currency_code.exponent()),
        )
    }
}

/// ISO 4217 currency codes accepted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    JPY,
}

impl CurrencyCode {
    /// Number of decimal digits in the minor unit.
    #[must_use]
    pub const fn exponent(self) -> u32 {
        match self {
            Self::JPY => 0,
            _ => 2,
        }
    }

    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::JPY => "¥",
        }
    }

    /// Uppercase ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::JPY => "JPY",
        }
    }

    /// Lowercase ISO code, as Stripe expects it.
    #[must_use]
    pub const fn stripe_code(self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
            Self::JPY => "jpy",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "JPY" => Ok(Self::JPY),
            other => Err(PriceError::UnsupportedCurrency(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_minor_units_usd() {
        let price = Price::new(dec("19.99"), CurrencyCode::USD);
        assert_eq!(price.to_minor_units(), Ok(1999));
    }

    #[test]
    fn test_minor_units_rounds_half_away_from_zero() {
        let price = Price::new(dec("0.125"), CurrencyCode::EUR);
        assert_eq!(price.to_minor_units(), Ok(13));
    }

    #[test]
    fn test_minor_units_zero_decimal_currency() {
        let price = Price::new(dec("1500"), CurrencyCode::JPY);
        assert_eq!(price.to_minor_units(), Ok(1500));
    }

    #[test]
    fn test_minor_units_negative() {
        let price = Price::new(dec("-1.00"), CurrencyCode::USD);
        assert_eq!(price.to_minor_units(), Err(PriceError::Negative));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::new(dec("5"), CurrencyCode::USD).to_string(), "$5.00");
        assert_eq!(Price::new(dec("7.5"), CurrencyCode::GBP).to_string(), "£7.50");
        assert_eq!(Price::new(dec("300"), CurrencyCode::JPY).to_string(), "¥300");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("usd".parse::<CurrencyCode>(), Ok(CurrencyCode::USD));
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
