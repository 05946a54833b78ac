//! Fixed-point currency.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Number of fractional digits carried by [`Money`].
pub const SCALE: u32 = 2;

const UNIT: i64 = 10_i64.pow(SCALE);

/// Money amount held as an integer count of minor units (1/100 of the
/// currency unit), so sums and products never drift.
///
/// Catalog prices are stored as decimal text (`"15000"`, `"15000.50"`);
/// [`Money::from_str`](std::str::FromStr) reads that form and
/// [`Money::to_decimal_string`] writes it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    minor_units: i64,
}

impl Money {
    /// Creates an amount from minor units (e.g., 1050 = 10.50).
    pub const fn from_minor_units(minor_units: i64) -> Self {
        Self { minor_units }
    }

    /// Creates an amount from whole currency units.
    pub fn from_units(units: i64) -> Option<Self> {
        units.checked_mul(UNIT).map(Self::from_minor_units)
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self { minor_units: 0 }
    }

    /// Returns the amount in minor units.
    pub const fn minor_units(&self) -> i64 {
        self.minor_units
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.minor_units == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.minor_units < 0
    }

    /// Adds another amount, returning `None` on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.minor_units
            .checked_add(other.minor_units)
            .map(Money::from_minor_units)
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    pub fn checked_mul(&self, quantity: u32) -> Option<Money> {
        self.minor_units
            .checked_mul(i64::from(quantity))
            .map(Money::from_minor_units)
    }

    /// Sums a sequence of amounts, failing on overflow.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }

    /// Renders the amount as decimal text with exactly two fractional digits.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.minor_units.unsigned_abs();
        let unit = UNIT.unsigned_abs();
        format!(
            "{sign}{}.{:0width$}",
            abs / unit,
            abs % unit,
            width = SCALE as usize
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl std::str::FromStr for Money {
    type Err = DomainError;

    /// Parses a non-negative decimal with at most two fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidAmount {
            input: s.to_string(),
        };
        let text = s.trim();

        let (whole, fraction) = match text.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (text, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty()
            || !all_digits(whole)
            || !all_digits(fraction)
            || fraction.len() > SCALE as usize
            || (text.contains('.') && fraction.is_empty())
        {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let mut fraction_units: i64 = 0;
        for (position, digit) in fraction.bytes().enumerate() {
            let weight = 10_i64.pow(SCALE - 1 - position as u32);
            fraction_units += i64::from(digit - b'0') * weight;
        }

        whole
            .checked_mul(UNIT)
            .and_then(|units| units.checked_add(fraction_units))
            .map(Money::from_minor_units)
            .ok_or_else(invalid)
    }
}
