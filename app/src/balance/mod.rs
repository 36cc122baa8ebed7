use crate::coins::Coins;
use crate::concurrency;
use crate::database;
use crate::user;
use uuid::Uuid;

mod entities;

pub use entities::{Balance, InsufficientBalance};

pub async fn get(data_tx: &mut database::Transaction, user_id: user::Id) -> Balance {
    sqlx::query_as::<_, BalanceRow>("SELECT id AS user_id, coin_balance FROM users WHERE id = $1")
        .bind(user_id.0)
        .fetch_one(data_tx)
        .await
        .unwrap()
        .into_entity()
}

pub async fn update(
    data_tx: &mut database::Transaction,
    balance: &Balance,
) -> Result<(), concurrency::ConflictError> {
    if balance.changed() {
        sqlx::query(
            "UPDATE users SET coin_balance = $1 WHERE id = $2 AND coin_balance = $3 RETURNING id",
        )
        .bind(balance.amount().0)
        .bind(balance.user_id().0)
        .bind(balance.original_amount().0)
        .fetch_optional(data_tx)
        .await
        .unwrap()
        .ok_or(concurrency::ConflictError)?;
    }
    Ok(())
}

#[derive(sqlx::FromRow, Debug)]
struct BalanceRow {
    user_id: Uuid,
    coin_balance: i64,
}

impl BalanceRow {
    fn into_entity(self) -> Balance {
        Balance::new(user::Id(self.user_id), Coins(self.coin_balance))
    }
}
