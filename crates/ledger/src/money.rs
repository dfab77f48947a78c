use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Signed money amount stored as **integer euro cents**.
///
/// Every monetary value in the workspace (menu prices, order totals, wallet
/// balances, ledger amounts) is a `MoneyCents`. Binary floating point is never
/// used for money, so chained debits and credits cannot drift.
///
/// Line totals (`price × quantity`) are exact in integer cents. The only place
/// a sub-cent value can appear is when an amount is derived from a fractional
/// rate; such derivations must round **half-up** at that boundary and nowhere
/// else.
///
/// # Examples
///
/// ```rust
/// use ledger::MoneyCents;
///
/// let price = MoneyCents::new(4_50);
/// assert_eq!(price.cents(), 450);
/// assert_eq!(price.to_string(), "4.50€");
/// assert_eq!("4.50".parse::<MoneyCents>().unwrap(), price);
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Creates an amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (`None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_add(rhs.0).map(MoneyCents)
    }

    /// Checked subtraction (`None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_sub(rhs.0).map(MoneyCents)
    }

    /// Checked multiplication by a unitless factor, e.g. an order-line
    /// quantity (`None` on overflow).
    #[must_use]
    pub fn checked_mul(self, factor: i64) -> Option<MoneyCents> {
        self.0.checked_mul(factor).map(MoneyCents)
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}€", abs / 100, abs % 100)
    }
}

impl From<i64> for MoneyCents {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl From<MoneyCents> for i64 {
    fn from(amount: MoneyCents) -> Self {
        amount.0
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 + rhs.0)
    }
}

impl AddAssign for MoneyCents {
    fn add_assign(&mut self, rhs: MoneyCents) {
        self.0 += rhs.0;
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 - rhs.0)
    }
}

impl SubAssign for MoneyCents {
    fn sub_assign(&mut self, rhs: MoneyCents) {
        self.0 -= rhs.0;
    }
}

impl Neg for MoneyCents {
    type Output = MoneyCents;

    fn neg(self) -> Self::Output {
        MoneyCents(-self.0)
    }
}

impl Sum for MoneyCents {
    fn sum<I: Iterator<Item = MoneyCents>>(iter: I) -> Self {
        iter.fold(MoneyCents::ZERO, Add::add)
    }
}

impl FromStr for MoneyCents {
    type Err = LedgerError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` or `,` as decimal separator, an optional leading `+`/`-`,
    /// and at most two fractional digits (`"4.505"` is rejected, not rounded).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::InvalidAmount(format!("invalid amount: {s:?}"));
        let overflow = || LedgerError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        if digits.is_empty() {
            return Err(invalid());
        }

        let digits = digits.replace(',', ".");
        let (whole, frac) = match digits.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (digits.as_str(), ""),
        };

        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            2 => frac.parse::<i64>().map_err(|_| invalid())?,
            _ => {
                return Err(LedgerError::InvalidAmount(
                    "too many decimals".to_string(),
                ));
            }
        };

        let total = whole
            .parse::<i64>()
            .map_err(|_| invalid())?
            .checked_mul(100)
            .and_then(|major| major.checked_add(cents))
            .ok_or_else(overflow)?;

        Ok(MoneyCents(if negative { -total } else { total }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_eur() {
        assert_eq!(MoneyCents::ZERO.to_string(), "0.00€");
        assert_eq!(MoneyCents::new(5).to_string(), "0.05€");
        assert_eq!(MoneyCents::new(450).to_string(), "4.50€");
        assert_eq!(MoneyCents::new(-11000).to_string(), "-110.00€");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("3".parse::<MoneyCents>().unwrap().cents(), 300);
        assert_eq!("4.5".parse::<MoneyCents>().unwrap().cents(), 450);
        assert_eq!("4,50".parse::<MoneyCents>().unwrap().cents(), 450);
        assert_eq!("-0,05".parse::<MoneyCents>().unwrap().cents(), -5);
        assert_eq!(" +2.30 ".parse::<MoneyCents>().unwrap().cents(), 230);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<MoneyCents>().is_err());
        assert!("-".parse::<MoneyCents>().is_err());
        assert!("4.505".parse::<MoneyCents>().is_err());
        assert!("4.5.0".parse::<MoneyCents>().is_err());
        assert!("abc".parse::<MoneyCents>().is_err());
    }

    #[test]
    fn line_totals_are_exact() {
        let price = MoneyCents::new(4500);
        assert_eq!(price.checked_mul(2), Some(MoneyCents::new(9000)));
        assert_eq!(MoneyCents::new(i64::MAX).checked_mul(2), None);
    }

    #[test]
    fn sums_over_iterators() {
        let total: MoneyCents = [MoneyCents::new(9000), MoneyCents::new(2000)]
            .into_iter()
            .sum();
        assert_eq!(total, MoneyCents::new(11000));
    }
}
