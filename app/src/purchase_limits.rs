//! Implements checking of coin purchase limits.

use crate::coins::Coins;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("quantity too low")]
    QuantityTooLow,
    #[error("quantity too high")]
    QuantityTooHigh,
    #[error("daily limit exceeded")]
    DailyLimitExceeded,
}

#[derive(Debug)]
pub struct PurchaseLimits {
    pub min: Coins,
    pub max: Coins,
    pub daily: Coins,
}

#[derive(Debug)]
pub(crate) struct Amounts {
    /// Coin quantity of the purchase being checked.
    pub quantity: Coins,
    /// Total quantity the buyer already purchased today.
    pub daily_total: Coins,
}

impl PurchaseLimits {
    /// Returns an error if any limits are violated.
    pub(crate) fn check(
        &self,
        Amounts {
            quantity,
            daily_total,
        }: Amounts,
    ) -> Result<(), Error> {
        if quantity < self.min {
            Err(Error::QuantityTooLow)
        } else if quantity > self.max {
            Err(Error::QuantityTooHigh)
        } else if daily_total + quantity > self.daily {
            Err(Error::DailyLimitExceeded)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> PurchaseLimits {
        PurchaseLimits {
            min: Coins(1),
            max: Coins(100),
            daily: Coins(250),
        }
    }

    fn check(quantity: i64, daily_total: i64) -> Result<(), Error> {
        limits().check(Amounts {
            quantity: Coins(quantity),
            daily_total: Coins(daily_total),
        })
    }

    #[test]
    fn quantities_inside_the_limits_pass() {
        assert!(check(1, 0).is_ok());
        assert!(check(100, 0).is_ok());
        assert!(check(50, 200).is_ok());
    }

    #[test]
    fn quantities_outside_the_limits_fail() {
        assert!(matches!(check(0, 0), Err(Error::QuantityTooLow)));
        assert!(matches!(check(101, 0), Err(Error::QuantityTooHigh)));
    }

    #[test]
    fn the_daily_limit_counts_todays_purchases() {
        assert!(check(50, 200).is_ok());
        assert!(matches!(check(51, 200), Err(Error::DailyLimitExceeded)));
    }
}
