//! Monetary amounts using decimal arithmetic.
//!
//! Vendora trades in a single currency, so `Money` is a plain non-negative
//! decimal amount kept at cent precision.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when constructing [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// Amount has more than two decimal places.
    #[error("amount cannot have more than 2 decimal places")]
    TooPrecise,
    /// Amount is above [`Money::MAX`].
    #[error("amount cannot exceed 9999999999.99")]
    TooLarge,
}

/// A non-negative amount with at most two decimal places, capped at
/// [`Money::MAX`] so it fits a `NUMERIC(12, 2)` column.
///
/// ```
/// use rust_decimal::Decimal;
/// use vendora_core::Money;
///
/// let price = Money::parse("19.99").unwrap();
/// assert_eq!(price.times(3), Money::parse("59.97").unwrap());
/// assert!(Money::new(Decimal::new(-1, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest representable amount, 9 999 999 999.99.
    pub const MAX: Self = Self(Decimal::from_parts(3_567_587_327, 232, 0, false, 2));

    /// Create an amount, rejecting negative, sub-cent or oversized values.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError` if the value is negative, too precise or above
    /// [`Money::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        if amount.normalize().scale() > 2 {
            return Err(MoneyError::TooPrecise);
        }
        if amount > Self::MAX.0 {
            return Err(MoneyError::TooLarge);
        }
        Ok(Self(amount.normalize()))
    }

    fn bounded(amount: Decimal) -> Option<Self> {
        (amount <= Self::MAX.0).then(|| Self(amount.normalize()))
    }

    /// Create an amount from whole cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2).normalize())
    }

    /// Parse an amount from its decimal string form.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` for unparseable input as well as negatives.
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let amount: Decimal = s.trim().parse().map_err(|_| MoneyError::Negative)?;
        Self::new(amount)
    }

    /// The underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Multiply by a quantity, or `None` past [`Money::MAX`].
    #[must_use]
    pub fn checked_times(&self, quantity: u32) -> Option<Self> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .and_then(Self::bounded)
    }

    /// Add, or `None` past [`Money::MAX`].
    #[must_use]
    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).and_then(Self::bounded)
    }

    /// Multiply by a quantity, saturating at [`Money::MAX`].
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        self.checked_times(quantity).unwrap_or(Self::MAX)
    }

    /// A percentage of this amount, rounded half-to-even to cents and
    /// saturating at [`Money::MAX`].
    #[must_use]
    pub fn percent(&self, percent: Decimal) -> Self {
        self.0
            .checked_mul(percent)
            .map(|raw| {
                (raw / Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
            })
            .and_then(Self::bounded)
            .unwrap_or(Self::MAX)
    }

    /// Subtract, clamping at zero.
    #[must_use]
    pub fn saturating_sub(&self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::ZERO
        } else {
            Self((self.0 - other.0).normalize())
        }
    }
}

/// Saturates at [`Money::MAX`]; use [`Money::checked_add`] to detect it.
impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.checked_add(rhs).unwrap_or(Self::MAX)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
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
    fn test_rejects_negative_and_sub_cent() {
        assert_eq!(Money::parse("-0.01"), Err(MoneyError::Negative));
        assert_eq!(Money::parse("1.005"), Err(MoneyError::TooPrecise));
        assert!(Money::parse("1.50").is_ok());
        assert!(Money::parse("0").is_ok());
    }

    #[test]
    fn test_rejects_amounts_above_max() {
        assert_eq!(Money::MAX, Money::parse("9999999999.99").unwrap());
        assert_eq!(
            Money::parse("10000000000"),
            Err(MoneyError::TooLarge)
        );
        assert_eq!(
            Money::parse("79228162514264337593543950335"),
            Err(MoneyError::TooLarge)
        );
    }

    #[test]
    fn test_arithmetic_past_max() {
        assert_eq!(Money::MAX.checked_times(2), None);
        assert_eq!(Money::MAX.checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::MAX.times(u32::MAX), Money::MAX);
        assert_eq!(Money::MAX + Money::MAX, Money::MAX);
        assert_eq!(
            Money::parse("2.50").unwrap().checked_times(4),
            Money::parse("10").ok()
        );
    }

    #[test]
    fn test_percent_rounds_half_even() {
        // 8% of 10.25 = 0.82
        assert_eq!(
            Money::parse("10.25").unwrap().percent(Decimal::new(8, 0)),
            Money::parse("0.82").unwrap()
        );
        // 0.075 sits on the midpoint and rounds to the even cent
        assert_eq!(
            Money::parse("0.75").unwrap().percent(Decimal::new(10, 0)),
            Money::parse("0.08").unwrap()
        );
    }

    #[test]
    fn test_sum_and_saturating_sub() {
        let total: Money = ["1.10", "2.20", "3.30"]
            .iter()
            .map(|s| Money::parse(s).unwrap())
            .sum();
        assert_eq!(total, Money::parse("6.60").unwrap());
        assert_eq!(
            Money::parse("1").unwrap().saturating_sub(total),
            Money::ZERO
        );
    }

    #[test]
    fn test_display_two_places() {
        assert_eq!(Money::parse("5").unwrap().to_string(), "5.00");
        assert_eq!(Money::from_cents(1999).to_string(), "19.99");
    }

    #[test]
    fn test_deserialize_validates() {
        let amount: Money = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(amount, Money::from_cents(1250));
        assert!(serde_json::from_str::<Money>("\"-3\"").is_err());
        assert!(serde_json::from_str::<Money>("\"10000000000.00\"").is_err());
    }
}
