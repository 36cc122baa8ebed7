use crate::{auth, balance, coins::Coins, concurrency, database::Database};
use thiserror::Error;

mod entities;

pub use entities::{Email, Id, KycStatus, KycTransitionError, PasswordDigest, User};

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("a user with this email already exists")]
    EmailTaken,
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid credentials")]
    InvalidCredentials,
}

#[derive(Debug, Error)]
pub enum CreditError {
    #[error("unknown user")]
    UnknownUser,
    #[error("{0:?}")]
    InsufficientBalance(#[from] balance::InsufficientBalance),
    #[error("{0:?}")]
    ConcurrencyConflict(#[from] concurrency::ConflictError),
}

pub async fn register(
    db: &Database,
    username: String,
    email: Email,
    password: &str,
) -> Result<User, RegisterError> {
    let (user, digest) = User::create(username, email, password);
    let mut data_tx = db.begin().await.unwrap();
    queries::insert(&mut data_tx, &user, &digest).await?;
    data_tx.commit().await.unwrap();
    Ok(user)
}

pub async fn get(grant: &auth::SessionGrant, db: &Database) -> Option<User> {
    queries::get(db, grant.user_id).await
}

pub async fn change_password(
    grant: &auth::SessionGrant,
    db: &Database,
    current_password: &str,
    new_password: &str,
) -> Result<(), PasswordError> {
    // The grant proves the user row exists.
    let digest = queries::get_digest(db, grant.user_id).await.unwrap();
    if !digest.verify(current_password) {
        return Err(PasswordError::InvalidCredentials);
    }
    queries::set_digest(db, grant.user_id, &PasswordDigest::generate(new_password)).await;
    Ok(())
}

/// Adjusts a user's coin balance by the given amount, which may be negative. The adjustment is
/// a compare-and-swap inside a transaction, so concurrent adjustments cannot lose updates.
pub async fn credit(db: &Database, id: Id, amount: Coins) -> Result<Coins, CreditError> {
    if !queries::exists(db, id).await {
        return Err(CreditError::UnknownUser);
    }
    concurrency::retry_loop(|| async {
        let mut data_tx = db.begin().await.unwrap();
        let mut balance = balance::get(&mut data_tx, id).await;
        if amount >= Coins(0) {
            balance.credit(amount);
        } else {
            balance.debit(Coins(0) - amount)?;
        }
        balance::update(&mut data_tx, &balance).await?;
        data_tx.commit().await.unwrap();
        Ok::<_, CreditError>(balance.amount())
    })
    .await
}

mod queries {
    use super::{Email, Id, KycStatus, PasswordDigest, RegisterError, User};
    use crate::coins::Coins;
    use crate::database::{self, Database};
    use chrono::{DateTime, NaiveDate, Utc};
    use const_format::formatcp;
    use uuid::Uuid;

    const COLUMNS: &str = "id, username, email, full_name, phone, date_of_birth, country, address, coin_balance, kyc_status, created";

    pub(super) async fn insert(
        data_tx: &mut database::Transaction,
        user: &User,
        digest: &PasswordDigest,
    ) -> Result<(), RegisterError> {
        let result = sqlx::query(formatcp!(
            r#"INSERT INTO users ({}, password_hash)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
            COLUMNS
        ))
        .bind(user.id.0)
        .bind(&user.username)
        .bind(&user.email.0)
        .bind(user.full_name.clone())
        .bind(user.phone.clone())
        .bind(user.date_of_birth)
        .bind(user.country.clone())
        .bind(user.address.clone())
        .bind(user.balance.0)
        .bind(user.kyc_status.to_int())
        .bind(user.created)
        .bind(digest.as_str())
        .execute(&mut *data_tx)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if database::is_unique_violation(&e) => Err(RegisterError::EmailTaken),
            Err(e) => panic!("failed to insert user: {}", e),
        }
    }

    pub(super) async fn get(db: &Database, id: Id) -> Option<User> {
        sqlx::query_as::<_, UserRow>(formatcp!(
            "SELECT {} FROM users WHERE id = $1",
            COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(db)
        .await
        .unwrap()
        .map(|row| row.into_entity())
    }

    pub(super) async fn exists(db: &Database, id: Id) -> bool {
        sqlx::query("SELECT id FROM users WHERE id = $1")
            .bind(id.0)
            .fetch_optional(db)
            .await
            .unwrap()
            .is_some()
    }

    pub(super) async fn get_digest(db: &Database, id: Id) -> Option<PasswordDigest> {
        sqlx::query_as::<_, DigestRow>("SELECT password_hash FROM users WHERE id = $1")
            .bind(id.0)
            .fetch_optional(db)
            .await
            .unwrap()
            .map(|row| PasswordDigest::from_stored(row.password_hash))
    }

    pub(super) async fn set_digest(db: &Database, id: Id, digest: &PasswordDigest) {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(digest.as_str())
            .bind(id.0)
            .execute(db)
            .await
            .unwrap();
    }

    #[derive(sqlx::FromRow, Debug)]
    struct DigestRow {
        password_hash: String,
    }

    #[derive(sqlx::FromRow, Debug)]
    struct UserRow {
        id: Uuid,
        username: String,
        email: String,
        full_name: Option<String>,
        phone: Option<String>,
        date_of_birth: Option<NaiveDate>,
        country: Option<String>,
        address: Option<String>,
        coin_balance: i64,
        kyc_status: i32,
        created: DateTime<Utc>,
    }

    impl UserRow {
        fn into_entity(self) -> User {
            User {
                id: Id(self.id),
                username: self.username,
                email: Email(self.email),
                full_name: self.full_name,
                phone: self.phone,
                date_of_birth: self.date_of_birth,
                country: self.country,
                address: self.address,
                balance: Coins(self.coin_balance),
                kyc_status: KycStatus::from_int(self.kyc_status),
                created: self.created,
            }
        }
    }
}
