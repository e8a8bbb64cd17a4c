//! Money as integer minor units (cents).
//!
//! Catalog prices arrive as decimal text (or JSON numbers) from the backend and
//! are parsed straight into cents; no binary floating point is involved at any
//! step, so recomputing an estimate never drifts.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value_object::ValueObject;

/// An amount of money in the tenant's currency, stored as cents.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    #[error("empty amount")]
    Empty,

    #[error("malformed amount '{0}'")]
    Malformed(String),

    #[error("amount '{0}' has sub-cent precision")]
    SubCent(String),

    #[error("amount '{0}' is out of range")]
    OutOfRange(String),
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Whole currency units (e.g. dollars).
    pub const fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    pub fn checked_mul(self, qty: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(qty)).map(Money)
    }

    pub fn checked_neg(self) -> Option<Money> {
        self.0.checked_neg().map(Money)
    }

    /// `self * bps / 10_000`, rounded half away from zero to the cent.
    pub fn percent_bps(self, bps: u32) -> Option<Money> {
        let scaled = i128::from(self.0).checked_mul(i128::from(bps))?;
        let half = if scaled < 0 { -5_000 } else { 5_000 };
        let rounded = (scaled + half) / 10_000;
        i64::try_from(rounded).ok().map(Money)
    }

    /// Sum a sequence of amounts, `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(iter: I) -> Option<Money> {
        iter.into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }

    /// Parse a decimal amount such as `"199.99"`, `"-50"`, `"$1,250.00"` or
    /// `"200.000"`. Digits past the cent are accepted only when they are zero.
    pub fn parse_decimal(input: &str) -> Result<Money, MoneyParseError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(MoneyParseError::Empty);
        }

        let (negative, rest) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };
        let rest = rest.strip_prefix('$').unwrap_or(rest);
        let cleaned: String = rest.chars().filter(|c| *c != ',').collect();

        let (whole, frac) = match cleaned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (cleaned.as_str(), ""),
        };

        let malformed = || MoneyParseError::Malformed(input.to_string());
        if whole.is_empty() && frac.is_empty() {
            return Err(malformed());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }
        if frac.len() > 2 && frac[2..].chars().any(|c| c != '0') {
            return Err(MoneyParseError::SubCent(input.to_string()));
        }

        let out_of_range = || MoneyParseError::OutOfRange(input.to_string());
        let units: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| out_of_range())?
        };
        let mut cents_part = 0i64;
        for (i, c) in frac.chars().take(2).enumerate() {
            let digit = i64::from(c as u8 - b'0');
            cents_part += if i == 0 { digit * 10 } else { digit };
        }

        let cents = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents_part))
            .ok_or_else(out_of_range)?;
        Ok(Money(if negative { -cents } else { cents }))
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse_decimal(s)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_formatted_amounts() {
        assert_eq!(Money::parse_decimal("200").unwrap(), Money::from_cents(20_000));
        assert_eq!(Money::parse_decimal("199.99").unwrap(), Money::from_cents(19_999));
        assert_eq!(Money::parse_decimal("0.5").unwrap(), Money::from_cents(50));
        assert_eq!(Money::parse_decimal("$1,250.00").unwrap(), Money::from_cents(125_000));
        assert_eq!(Money::parse_decimal("-50").unwrap(), Money::from_cents(-5_000));
        assert_eq!(Money::parse_decimal(".75").unwrap(), Money::from_cents(75));
        assert_eq!(Money::parse_decimal("30.000").unwrap(), Money::from_cents(3_000));
    }

    #[test]
    fn rejects_sub_cent_and_garbage() {
        assert_eq!(
            Money::parse_decimal("10.005"),
            Err(MoneyParseError::SubCent("10.005".to_string()))
        );
        assert!(matches!(Money::parse_decimal("abc"), Err(MoneyParseError::Malformed(_))));
        assert!(matches!(Money::parse_decimal("1e3"), Err(MoneyParseError::Malformed(_))));
        assert!(matches!(Money::parse_decimal("."), Err(MoneyParseError::Malformed(_))));
        assert_eq!(Money::parse_decimal("  "), Err(MoneyParseError::Empty));
    }

    #[test]
    fn display_pads_cents() {
        assert_eq!(Money::from_cents(25_000).to_string(), "250.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1_050).to_string(), "-10.50");
    }

    #[test]
    fn percent_rounds_half_up() {
        // 10% of 199.95 = 19.995 -> 20.00
        assert_eq!(Money::from_cents(19_995).percent_bps(1_000), Some(Money::from_cents(2_000)));
        // 15% of 250.00 = 37.50
        assert_eq!(Money::from_cents(25_000).percent_bps(1_500), Some(Money::from_cents(3_750)));
    }

    #[test]
    fn checked_sum_detects_overflow() {
        let big = Money::from_cents(i64::MAX);
        assert_eq!(Money::checked_sum([big, Money::from_cents(1)]), None);
        assert_eq!(
            Money::checked_sum([Money::from_units(2), Money::from_units(3)]),
            Some(Money::from_units(5))
        );
    }

    #[test]
    fn serializes_as_integer_cents() {
        let json = serde_json::to_string(&Money::from_cents(1_999)).unwrap();
        assert_eq!(json, "1999");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: display form parses back to the same amount.
            #[test]
            fn display_parses_back(cents in -1_000_000_000i64..1_000_000_000i64) {
                let m = Money::from_cents(cents);
                prop_assert_eq!(Money::parse_decimal(&m.to_string()).unwrap(), m);
            }
        }
    }
}
