//! This module contains definitions for the wallet's internal unit of value and the external
//! currencies it can be purchased with.

use std::ops::{Add, AddAssign, Sub, SubAssign};

use thiserror::Error;

/// An amount of the wallet's internal coin. Coins are indivisible.
#[derive(Debug, Clone, Copy, Default, PartialOrd, Ord, PartialEq, Eq)]
pub struct Coins(pub i64);

impl Add for Coins {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Coins {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Coins {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl SubAssign for Coins {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

#[derive(Debug, Error)]
#[error("unknown currency")]
pub struct UnknownCurrency;

/// An external currency accepted as payment for coins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Usdt,
    Btc,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usdt => "USDT",
            Currency::Btc => "BTC",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, UnknownCurrency> {
        match s {
            "USDT" => Ok(Currency::Usdt),
            "BTC" => Ok(Currency::Btc),
            _ => Err(UnknownCurrency),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_arithmetic() {
        let mut amount = Coins(10);
        amount += Coins(5);
        assert_eq!(amount, Coins(15));
        amount -= Coins(15);
        assert_eq!(amount, Coins(0));
        assert!(Coins(1) > Coins(0));
    }

    #[test]
    fn currency_round_trips_through_str() {
        for currency in [Currency::Usdt, Currency::Btc] {
            assert_eq!(Currency::from_str(currency.as_str()).unwrap(), currency);
        }
        assert!(Currency::from_str("DOGE").is_err());
    }
}
