use super::{Database, Transaction};
use crate::user;
use chrono::Utc;
use uuid::Uuid;

/// Seeds accounts, a coin price, and deposit addresses for local development. Running twice is
/// harmless; existing rows are left alone.
pub async fn seed_development_data(db: &Database) {
    let mut data_tx = db.begin().await.unwrap();
    seed_test_user(&mut data_tx, 1, user::KycStatus::Verified).await;
    seed_test_user(&mut data_tx, 2, user::KycStatus::NotSubmitted).await;
    seed_coin_price(&mut data_tx).await;
    seed_deposit_address(&mut data_tx, "USDT", "TXYZopQ7morWDev5Y1example1111111111").await;
    seed_deposit_address(&mut data_tx, "BTC", "bc1qexampledev00000000000000000000000000").await;
    data_tx.commit().await.unwrap();
}

async fn seed_test_user(data_tx: &mut Transaction, index: u128, kyc_status: user::KycStatus) {
    let row = sqlx::query(r#"SELECT id FROM users WHERE id = $1"#)
        .bind(Uuid::from_u128(index))
        .fetch_optional(&mut *data_tx)
        .await
        .unwrap();
    if row.is_some() {
        return;
    }
    // The password of test user N is "test-N".
    let digest = user::PasswordDigest::generate(&format!("test-{}", index));
    sqlx::query(
        r#"INSERT INTO users (id, username, email, password_hash, coin_balance, kyc_status, created)
            VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
    )
    .bind(Uuid::from_u128(index))
    .bind(format!("test-{}", index))
    .bind(format!("test-{}@user.net", index))
    .bind(digest.as_str())
    .bind(1_000)
    .bind(kyc_status.to_int())
    .bind(Utc::now())
    .execute(&mut *data_tx)
    .await
    .unwrap();
}

async fn seed_coin_price(data_tx: &mut Transaction) {
    let row = sqlx::query("SELECT id FROM coin_prices LIMIT 1")
        .fetch_optional(&mut *data_tx)
        .await
        .unwrap();
    if row.is_some() {
        return;
    }
    sqlx::query("INSERT INTO coin_prices (id, price, updated) VALUES ($1, $2, $3)")
        .bind(Uuid::from_u128(1))
        .bind(1.25)
        .bind(Utc::now())
        .execute(&mut *data_tx)
        .await
        .unwrap();
}

async fn seed_deposit_address(data_tx: &mut Transaction, currency: &str, address: &str) {
    sqlx::query(
        r#"INSERT INTO deposit_addresses (currency, address, updated)
            VALUES ($1, $2, $3) ON CONFLICT (currency) DO NOTHING"#,
    )
    .bind(currency)
    .bind(address)
    .bind(Utc::now())
    .execute(&mut *data_tx)
    .await
    .unwrap();
}
