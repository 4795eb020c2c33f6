use std::{
    fmt,
    ops::{Add, AddAssign},
};

use serde::{Deserialize, Serialize};

use crate::{LedgerError, LedgerResult};

/// Amount of shop coins, always a whole number.
///
/// Every balance, price and transfer amount in the ledger is a `Coins`. There
/// is no fractional part, so no floating point ever touches a balance.
///
/// # Examples
///
/// ```rust
/// use ledger::Coins;
///
/// let price = Coins::new(80);
/// assert_eq!(price.amount(), 80);
/// assert_eq!(price.to_string(), "80 coins");
/// assert!(Coins::ZERO.ensure_transferable().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Coins(i64);

impl Coins {
    pub const ZERO: Coins = Coins(0);

    /// Largest amount a single transfer or purchase may move.
    pub const MAX_TRANSFER: Coins = Coins(10_000_000_000);

    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Returns the raw number of coins.
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Coins) -> Option<Coins> {
        self.0.checked_add(rhs.0).map(Coins)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Coins) -> Option<Coins> {
        self.0.checked_sub(rhs.0).map(Coins)
    }

    /// Accept the amount for a transfer or purchase.
    ///
    /// Must be strictly positive and not above [`Coins::MAX_TRANSFER`].
    pub fn ensure_transferable(self) -> LedgerResult<Coins> {
        if self.0 <= 0 {
            return Err(LedgerError::InvalidAmount(
                "amount must be positive".to_string(),
            ));
        }
        if self > Self::MAX_TRANSFER {
            return Err(LedgerError::InvalidAmount(format!(
                "amount must not exceed {}",
                Self::MAX_TRANSFER
            )));
        }
        Ok(self)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} coins", self.0)
    }
}

impl From<i64> for Coins {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Coins> for i64 {
    fn from(value: Coins) -> Self {
        value.0
    }
}

impl Add for Coins {
    type Output = Coins;

    fn add(self, rhs: Coins) -> Self::Output {
        Coins(self.0 + rhs.0)
    }
}

impl AddAssign for Coins {
    fn add_assign(&mut self, rhs: Coins) {
        self.0 += rhs.0;
    }
}
