//! Fixed-point token amounts.
//!
//! Every balance and transfer amount is a count of minor units
//! (`10^-AMOUNT_SCALE` tokens) held in a `u64`. Parsing goes through
//! [`rust_decimal::Decimal`] so no value ever passes through a float.

use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

use crate::{Result, WalletError, constants};

/// A non-negative token amount in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Whole tokens, e.g. `Amount::tokens(10)` == `10.0000`.
    #[must_use]
    pub const fn tokens(whole: u64) -> Self {
        Self(whole * constants::MINOR_UNITS_PER_TOKEN)
    }

    #[must_use]
    pub const fn minor(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Convert an exact decimal into minor units.
    ///
    /// # Errors
    /// `InvalidAmount` if negative, more precise than `AMOUNT_SCALE`
    /// digits, or too large to represent.
    pub fn from_decimal(value: Decimal) -> Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(invalid("amount must not be negative"));
        }
        let value = value.normalize();
        if value.scale() > constants::AMOUNT_SCALE {
            return Err(invalid(format!(
                "at most {} decimal places are allowed",
                constants::AMOUNT_SCALE
            )));
        }
        value
            .checked_mul(Decimal::from(constants::MINOR_UNITS_PER_TOKEN))
            .and_then(|minor| minor.to_u64())
            .map(Self)
            .ok_or_else(|| invalid("amount is too large"))
    }

    /// Parse a decimal string such as `"10.0001"`.
    ///
    /// # Errors
    /// `InvalidAmount` if the string is not a plain decimal number.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid("amount is required"));
        }
        let value = Decimal::from_str(trimmed).map_err(|_| invalid("amount must be a number"))?;
        Self::from_decimal(value)
    }

    /// Parse an amount from a JSON value: either a number or a numeric string.
    ///
    /// Numbers are read through their textual form, never through `f64`
    /// arithmetic.
    ///
    /// # Errors
    /// `InvalidAmount` for any other JSON type or a malformed number.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Number(n) => Self::parse(&n.to_string()),
            serde_json::Value::String(s) => Self::parse(s),
            serde_json::Value::Null => Err(invalid("amount is required")),
            _ => Err(invalid("amount must be a number")),
        }
    }

    /// Same as [`Amount::from_json`] but additionally rejects zero.
    ///
    /// # Errors
    /// `InvalidAmount` if not parseable or not strictly positive.
    pub fn positive_from_json(value: &serde_json::Value) -> Result<Self> {
        let amount = Self::from_json(value)?;
        amount.ensure_positive()?;
        Ok(amount)
    }

    /// # Errors
    /// `InvalidAmount` if the amount is zero.
    pub fn ensure_positive(self) -> Result<()> {
        if self.is_zero() {
            Err(invalid("amount must be greater than zero"))
        } else {
            Ok(())
        }
    }

    /// Exact decimal value with exactly `AMOUNT_SCALE` fractional digits.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), constants::AMOUNT_SCALE)
    }
}

fn invalid(reason: impl Into<String>) -> WalletError {
    WalletError::InvalidAmount {
        reason: reason.into(),
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for Amount {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(D::Error::custom)
    }
}

impl std::iter::Sum for Amount {
    /// Saturates at `u64::MAX`; callers that care use [`Amount::checked_add`].
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.fold(0u64, |acc, a| acc.saturating_add(a.0)))
    }
}
