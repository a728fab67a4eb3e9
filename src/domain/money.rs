//! Fixed-point monetary values.
//!
//! [`Money`] stores an amount as signed integer minor units (cents) and is
//! exposed on the wire as a decimal string with exactly two fraction
//! digits. All arithmetic happens on minor units, so sums and equality
//! checks are exact; there is no tolerance anywhere in the engine.
//! Parsing and ratio rounding go through [`rust_decimal`].

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::prelude::*;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of fraction digits accepted and rendered.
const DECIMAL_PLACES: u32 = 2;

/// Errors produced while parsing or dividing monetary values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// Input is not a plain decimal number.
    #[error("malformed amount: {0:?}")]
    Malformed(String),

    /// Input has more than two fraction digits.
    #[error("amount {0:?} has more than 2 fraction digits")]
    ExcessPrecision(String),

    /// Input exceeds the supported magnitude.
    #[error("amount {0:?} is out of range")]
    OutOfRange(String),

    /// A division was requested with zero parts or zero total weight.
    #[error("cannot divide into {0} parts")]
    InvalidDivisor(u64),

    /// Division of a negative amount was requested.
    #[error("cannot divide a negative amount ({0})")]
    NegativeAmount(Money),
}

/// Monetary amount in integer minor units.
///
/// Serialized as a string such as `"33.34"`. Deserializes from either a
/// string or a JSON number; in both cases more than two fraction digits
/// are rejected instead of rounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Largest magnitude accepted at the boundary (10 000 000.00).
    pub const MAX: Self = Self(1_000_000_000);

    /// Creates a value from minor units.
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Returns `true` when the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` when the amount is strictly greater than zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` when the amount is strictly below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked multiplication by an integer quantity.
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(i64::from(quantity)).map(Self)
    }

    /// Scales the amount by `numerator / denominator`, rounding half away
    /// from zero at the minor-unit level.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::InvalidDivisor`] when `denominator` is zero
    /// and [`MoneyError::OutOfRange`] when the result does not fit.
    pub fn multiply_by_ratio(self, numerator: u64, denominator: u64) -> Result<Self, MoneyError> {
        if denominator == 0 {
            return Err(MoneyError::InvalidDivisor(0));
        }
        let out_of_range = || MoneyError::OutOfRange(format!("{self} * {numerator}/{denominator}"));
        Decimal::from(self.0)
            .checked_mul(Decimal::from(numerator))
            .and_then(|scaled| scaled.checked_div(Decimal::from(denominator)))
            .map(|ratio| ratio.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|rounded| rounded.to_i64())
            .map(Self)
            .ok_or_else(out_of_range)
    }

    /// Converts a decimal amount, rejecting more than two fraction digits
    /// and magnitudes above [`Money::MAX`]. `raw` is the input as received,
    /// used in error messages.
    fn from_decimal(value: Decimal, raw: &str) -> Result<Self, MoneyError> {
        if value.scale() > DECIMAL_PLACES {
            return Err(MoneyError::ExcessPrecision(raw.to_string()));
        }
        if value.abs() > Decimal::new(Self::MAX.0, DECIMAL_PLACES) {
            return Err(MoneyError::OutOfRange(raw.to_string()));
        }
        let mut value = value;
        value.rescale(DECIMAL_PLACES);
        i64::try_from(value.mantissa())
            .map(Self)
            .map_err(|_| MoneyError::OutOfRange(raw.to_string()))
    }

    /// Splits the amount into `parts` shares whose sum equals `self`
    /// exactly.
    ///
    /// Every share gets the floor of the division; the remaining `k`
    /// minor units go one each to the first `k` shares, left to right.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::InvalidDivisor`] for zero parts and
    /// [`MoneyError::NegativeAmount`] for negative amounts.
    pub fn divide_evenly(self, parts: usize) -> Result<Vec<Self>, MoneyError> {
        let weights = vec![1_u64; parts];
        self.allocate(&weights)
    }

    /// Splits the amount proportionally to `weights`, with the sum of the
    /// shares equal to `self` exactly.
    ///
    /// Each share is the floor of its proportional value; leftover minor
    /// units are handed out one at a time, left to right, to shares with a
    /// non-zero weight. With all weights equal this is
    /// [`Money::divide_evenly`].
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::InvalidDivisor`] if the weights are empty or
    /// sum to zero and [`MoneyError::NegativeAmount`] for negative amounts.
    pub fn allocate(self, weights: &[u64]) -> Result<Vec<Self>, MoneyError> {
        if self.is_negative() {
            return Err(MoneyError::NegativeAmount(self));
        }
        let total_weight: u128 = weights.iter().map(|w| u128::from(*w)).sum();
        if total_weight == 0 {
            return Err(MoneyError::InvalidDivisor(0));
        }

        let amount = u128::from(self.0.unsigned_abs());
        let mut shares: Vec<u128> = weights
            .iter()
            .map(|w| amount * u128::from(*w) / total_weight)
            .collect();

        let distributed: u128 = shares.iter().sum();
        let mut leftover = amount - distributed;
        while leftover > 0 {
            for (share, weight) in shares.iter_mut().zip(weights) {
                if leftover == 0 {
                    break;
                }
                if *weight > 0 {
                    *share += 1;
                    leftover -= 1;
                }
            }
        }

        shares
            .into_iter()
            .map(|s| {
                i64::try_from(s)
                    .map(Self)
                    .map_err(|_| MoneyError::OutOfRange(s.to_string()))
            })
            .collect()
    }

    /// Returns the absolute value.
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Decimal::new(self.0, DECIMAL_PLACES), f)
    }
}

/// Plain decimal shape: optional `-`, digits, optional `.` and digits.
/// `Decimal` alone would also take `+1`, `1_000` and `1.`.
fn is_plain_decimal(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    digits(int_part) && frac_part.is_none_or(digits)
}

impl FromStr for Money {
    type Err = MoneyError;

    /// Parses `"12"`, `"12.5"`, `"12.50"` or `"-3.10"`. Rejects blanks,
    /// exponents, thousands separators, a bare `"."`, and anything with
    /// more than two fraction digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_plain_decimal(s) {
            return Err(MoneyError::Malformed(s.to_string()));
        }
        // Only magnitude can fail once the shape is valid.
        let value =
            Decimal::from_str_exact(s).map_err(|_| MoneyError::OutOfRange(s.to_string()))?;
        Self::from_decimal(value, s)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl Visitor<'_> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount with at most 2 fraction digits")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Money::from_decimal(Decimal::from(v), &v.to_string()).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Money::from_decimal(Decimal::from(v), &v.to_string()).map_err(E::custom)
    }

    // `f64` Display is the shortest round-tripping form, so `12.34` stays
    // `12.34` (not the `12.339999...` of its binary value) and `12.345`
    // is rejected rather than silently rounded.
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        let raw = v.to_string();
        if !v.is_finite() {
            return Err(E::custom(MoneyError::Malformed(raw)));
        }
        let value = Decimal::from_str_exact(&raw)
            .map_err(|_| E::custom(MoneyError::OutOfRange(raw.clone())))?;
        Money::from_decimal(value, &raw).map_err(E::custom)
    }
}

impl utoipa::PartialSchema for Money {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        utoipa::openapi::ObjectBuilder::new()
            .schema_type(utoipa::openapi::schema::Type::String)
            .description(Some(
                "Decimal amount with exactly two fraction digits, e.g. \"33.34\"",
            ))
            .into()
    }
}

impl utoipa::ToSchema for Money {}
