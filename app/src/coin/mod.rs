use crate::database::Database;

mod entities;

pub use entities::{Coin, Error, Id};

/// Returns the effective coin price, i.e. the most recently set record. None until an
/// administrator has set a price.
pub async fn get(db: &Database) -> Option<Coin> {
    queries::get_latest(db).await
}

/// Sets a new coin price. Older records are kept; the newest one wins.
pub async fn set_price(db: &Database, price: f64) -> Result<Coin, Error> {
    let coin = Coin::create(price)?;
    queries::insert(db, &coin).await;
    Ok(coin)
}

mod queries {
    use super::{Coin, Id};
    use crate::database::Database;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    pub(super) async fn get_latest(db: &Database) -> Option<Coin> {
        sqlx::query_as::<_, CoinRow>(
            "SELECT id, price, updated FROM coin_prices ORDER BY updated DESC LIMIT 1",
        )
        .fetch_optional(db)
        .await
        .unwrap()
        .map(|row| row.into_entity())
    }

    pub(super) async fn insert(db: &Database, coin: &Coin) {
        sqlx::query("INSERT INTO coin_prices (id, price, updated) VALUES ($1, $2, $3)")
            .bind(coin.id.0)
            .bind(coin.price)
            .bind(coin.updated)
            .execute(db)
            .await
            .unwrap();
    }

    #[derive(sqlx::FromRow, Debug)]
    struct CoinRow {
        id: Uuid,
        price: f64,
        updated: DateTime<Utc>,
    }

    impl CoinRow {
        fn into_entity(self) -> Coin {
            Coin {
                id: Id(self.id),
                price: self.price,
                updated: self.updated,
            }
        }
    }
}
