use crate::{coins::Currency, database::Database};

mod entities;

pub use entities::{DepositAddress, Error};

pub async fn get_addresses(db: &Database) -> Vec<DepositAddress> {
    queries::list(db).await
}

/// Sets the receiving address for a currency, replacing any earlier one. Administrative.
pub async fn set_address(
    db: &Database,
    currency: Currency,
    address: String,
) -> Result<DepositAddress, Error> {
    let address = DepositAddress::create(currency, address)?;
    queries::upsert(db, &address).await;
    Ok(address)
}

mod queries {
    use super::DepositAddress;
    use crate::{coins::Currency, database::Database};
    use chrono::{DateTime, Utc};

    pub(super) async fn list(db: &Database) -> Vec<DepositAddress> {
        sqlx::query_as::<_, AddressRow>(
            "SELECT currency, address, updated FROM deposit_addresses ORDER BY currency",
        )
        .fetch_all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.into_entity())
        .collect()
    }

    pub(super) async fn upsert(db: &Database, address: &DepositAddress) {
        sqlx::query(
            r#"INSERT INTO deposit_addresses (currency, address, updated)
                VALUES ($1, $2, $3) ON CONFLICT (currency) DO UPDATE SET
                address = $2, updated = $3"#,
        )
        .bind(address.currency.as_str())
        .bind(&address.address)
        .bind(address.updated)
        .execute(db)
        .await
        .unwrap();
    }

    #[derive(sqlx::FromRow, Debug)]
    struct AddressRow {
        currency: String,
        address: String,
        updated: DateTime<Utc>,
    }

    impl AddressRow {
        fn into_entity(self) -> DepositAddress {
            DepositAddress {
                currency: Currency::from_str(&self.currency).unwrap(),
                address: self.address,
                updated: self.updated,
            }
        }
    }
}
