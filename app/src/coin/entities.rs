use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
    #[error("price must be a positive number")]
    InvalidPrice,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Id(pub Uuid);

/// A coin price record. The price is denominated in the reference currency (USD) per coin.
#[derive(Debug)]
pub struct Coin {
    pub id: Id,
    pub price: f64,
    pub updated: DateTime<Utc>,
}

impl Coin {
    pub(crate) fn create(price: f64) -> Result<Self, Error> {
        if !price.is_finite() || price <= 0.0 {
            return Err(Error::InvalidPrice);
        }
        Ok(Self {
            id: Id(Uuid::new_v4()),
            price,
            updated: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_finite_prices_are_accepted() {
        assert_eq!(Coin::create(1.25).unwrap().price, 1.25);
    }

    #[test]
    fn degenerate_prices_are_rejected() {
        for price in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(Coin::create(price).is_err());
        }
    }
}
