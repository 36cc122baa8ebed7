use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::coins::Currency;

#[derive(Debug, Error)]
pub enum Error {
    #[error("address must not be empty")]
    EmptyAddress,
}

/// A receiving address buyers pay their external currency to. One address per currency,
/// configured by an administrator and shown to buyers next to the purchase form.
#[derive(Debug)]
pub struct DepositAddress {
    pub currency: Currency,
    pub address: String,
    pub updated: DateTime<Utc>,
}

impl DepositAddress {
    pub(crate) fn create(currency: Currency, address: String) -> Result<Self, Error> {
        if address.trim().is_empty() {
            return Err(Error::EmptyAddress);
        }
        Ok(Self {
            currency,
            address,
            updated: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_must_not_be_blank() {
        assert!(DepositAddress::create(Currency::Btc, "  ".to_owned()).is_err());
        let address =
            DepositAddress::create(Currency::Btc, "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq".to_owned())
                .unwrap();
        assert_eq!(address.currency, Currency::Btc);
    }
}
