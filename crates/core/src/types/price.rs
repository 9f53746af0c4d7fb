//! Basket price using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(10, 2)` and always denominated in BRL.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is zero or negative.
    #[error("price must be greater than zero (got {0})")]
    NotPositive(Decimal),
}

/// A strictly positive basket price in Brazilian reais.
///
/// ```
/// use hoby_loop_core::Price;
/// use rust_decimal::Decimal;
///
/// let price = Price::new(Decimal::new(4990, 2)).unwrap();
/// assert_eq!(price.format_brl(), "R$ 49,90");
/// assert!(Price::new(Decimal::ZERO).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotPositive`] if `amount <= 0`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive(amount));
        }
        Ok(Self(amount))
    }

    /// The amount in reais.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Render as Brazilian currency, e.g. `R$ 149,90`.
    #[must_use]
    pub fn format_brl(&self) -> String {
        let fixed = format!("{:.2}", self.0.round_dp(2));
        format!("R$ {}", fixed.replace('.', ","))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0.round_dp(2))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive() {
        assert_eq!(
            Price::new(Decimal::ZERO),
            Err(PriceError::NotPositive(Decimal::ZERO))
        );
        assert!(Price::new(Decimal::new(-100, 2)).is_err());
    }

    #[test]
    fn test_format_brl() {
        let price = Price::new(Decimal::new(14990, 2)).unwrap();
        assert_eq!(price.format_brl(), "R$ 149,90");

        let whole = Price::new(Decimal::new(50, 0)).unwrap();
        assert_eq!(whole.format_brl(), "R$ 50,00");
    }

    #[test]
    fn test_deserialize_from_number_and_string() {
        let from_number: Price = serde_json::from_str("50").unwrap();
        let from_string: Price = serde_json::from_str("\"50.00\"").unwrap();
        assert_eq!(from_number, from_string);

        assert!(serde_json::from_str::<Price>("0").is_err());
    }
}
