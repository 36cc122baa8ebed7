use crate::{
    auth, balance,
    coins::{Coins, Currency},
    concurrency,
    database::Database,
    purchase_limits::PurchaseLimits,
    QueryRange,
};

mod entities;

pub use entities::{
    AlreadyCompleted, CompleteError, CreateError, Id, ProofError, Purchase, PurchaseWithBuyer,
    Status,
};

pub async fn create(
    grant: &auth::TradeGrant,
    db: &Database,
    currency: Currency,
    amount: f64,
    quantity: Coins,
    limits: &PurchaseLimits,
) -> Result<Purchase, CreateError> {
    let daily_total = queries::daily_total(db, grant.user_id).await;
    let purchase = Purchase::create(grant, currency, amount, quantity, limits, daily_total)?;
    let mut data_tx = db.begin().await.unwrap();
    queries::upsert(&mut data_tx, &purchase).await;
    data_tx.commit().await.unwrap();
    Ok(purchase)
}

pub async fn get(grant: &auth::SessionGrant, db: &Database, id: Id) -> Option<Purchase> {
    queries::get(db, id, grant.user_id).await
}

pub async fn list(grant: &auth::SessionGrant, db: &Database, range: QueryRange) -> Vec<Purchase> {
    queries::list(db, grant.user_id, range).await
}

/// Lists every purchase with the buyer's account details. Administrative; callers must have
/// checked the admin credential.
pub async fn list_all(db: &Database, range: QueryRange) -> Vec<PurchaseWithBuyer> {
    queries::list_all(db, range).await
}

pub async fn attach_proof(
    grant: &auth::SessionGrant,
    db: &Database,
    id: Id,
    image: String,
) -> Result<Purchase, ProofError> {
    let mut data_tx = db.begin().await.unwrap();
    let mut purchase = queries::get_scoped(&mut data_tx, id, grant.user_id)
        .await
        .ok_or(ProofError::UnknownPurchase)?;
    purchase.attach_proof(image)?;
    queries::upsert(&mut data_tx, &purchase).await;
    data_tx.commit().await.unwrap();
    Ok(purchase)
}

/// Completes a purchase and credits the buyer in a single database transaction. The row is
/// locked for the duration, so a retried or concurrent completion call observes the final
/// status instead of crediting twice.
pub async fn complete(db: &Database, id: Id) -> Result<Purchase, CompleteError> {
    concurrency::retry_loop(|| async {
        let mut data_tx = db.begin().await.unwrap();
        let mut purchase = queries::get_any(&mut data_tx, id)
            .await
            .ok_or(CompleteError::UnknownPurchase)?;
        let mut balance = balance::get(&mut data_tx, purchase.buyer_id).await;
        purchase.complete(&mut balance)?;
        queries::upsert(&mut data_tx, &purchase).await;
        balance::update(&mut data_tx, &balance).await?;
        data_tx.commit().await.unwrap();
        Ok::<_, CompleteError>(purchase)
    })
    .await
}

mod queries {
    use super::{Id, Purchase, PurchaseWithBuyer, Status};
    use crate::{
        auth,
        coins::{Coins, Currency},
        database::{self, Database, SumRow},
        user, QueryRange,
    };
    use chrono::{DateTime, Duration, Utc};
    use const_format::formatcp;
    use uuid::Uuid;

    const COLUMNS: &str =
        "id, buyer_id, session_id, currency, amount, coins, status, proof, created, completed";

    pub(super) async fn upsert(data_tx: &mut database::Transaction, purchase: &Purchase) {
        sqlx::query(formatcp!(
            r#"INSERT INTO purchases ({})
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) ON CONFLICT (id) DO UPDATE SET
                buyer_id = $2, session_id = $3, currency = $4, amount = $5, coins = $6, status = $7, proof = $8, created = $9, completed = $10"#,
            COLUMNS
        ))
        .bind(purchase.id.0)
        .bind(purchase.buyer_id.0)
        .bind(purchase.session_id.0)
        .bind(purchase.currency.as_str())
        .bind(purchase.amount)
        .bind(purchase.coins.0)
        .bind(match purchase.status {
            Status::Pending => 0,
            Status::Completed { .. } => 1,
        })
        .bind(purchase.proof.clone())
        .bind(purchase.created)
        .bind(match purchase.status {
            Status::Pending => None,
            Status::Completed { timestamp } => Some(timestamp),
        })
        .execute(&mut *data_tx)
        .await
        .unwrap();
    }

    pub(super) async fn get(db: &Database, id: Id, user_id: user::Id) -> Option<Purchase> {
        sqlx::query_as::<_, PurchaseRow>(formatcp!(
            "SELECT {} FROM purchases WHERE id = $1 AND buyer_id = $2",
            COLUMNS
        ))
        .bind(id.0)
        .bind(user_id.0)
        .fetch_optional(db)
        .await
        .unwrap()
        .map(|row| row.into_entity())
    }

    pub(super) async fn get_scoped(
        data_tx: &mut database::Transaction,
        id: Id,
        user_id: user::Id,
    ) -> Option<Purchase> {
        sqlx::query_as::<_, PurchaseRow>(formatcp!(
            "SELECT {} FROM purchases WHERE id = $1 AND buyer_id = $2 FOR UPDATE",
            COLUMNS
        ))
        .bind(id.0)
        .bind(user_id.0)
        .fetch_optional(data_tx)
        .await
        .unwrap()
        .map(|row| row.into_entity())
    }

    pub(super) async fn get_any(data_tx: &mut database::Transaction, id: Id) -> Option<Purchase> {
        sqlx::query_as::<_, PurchaseRow>(formatcp!(
            "SELECT {} FROM purchases WHERE id = $1 FOR UPDATE",
            COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(data_tx)
        .await
        .unwrap()
        .map(|row| row.into_entity())
    }

    pub(super) async fn list(
        db: &Database,
        user_id: user::Id,
        range: QueryRange,
    ) -> Vec<Purchase> {
        sqlx::query_as::<_, PurchaseRow>(formatcp!(
            "SELECT {} FROM purchases WHERE buyer_id = $1 ORDER BY created DESC LIMIT $2 OFFSET $3",
            COLUMNS
        ))
        .bind(user_id.0)
        .bind(range.limit)
        .bind(range.offset)
        .fetch_all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.into_entity())
        .collect()
    }

    pub(super) async fn list_all(db: &Database, range: QueryRange) -> Vec<PurchaseWithBuyer> {
        sqlx::query_as::<_, PurchaseWithBuyerRow>(formatcp!(
            r#"SELECT {}, users.username AS buyer_username, users.email AS buyer_email
                FROM purchases JOIN users ON purchases.buyer_id = users.id
                ORDER BY purchases.created DESC LIMIT $1 OFFSET $2"#,
            "purchases.id, purchases.buyer_id, purchases.session_id, purchases.currency, purchases.amount, purchases.coins, purchases.status, purchases.proof, purchases.created, purchases.completed"
        ))
        .bind(range.limit)
        .bind(range.offset)
        .fetch_all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.into_entity())
        .collect()
    }

    pub(super) async fn daily_total(db: &Database, user_id: user::Id) -> Coins {
        sqlx::query_as::<_, SumRow<Option<i64>>>(
            "SELECT SUM(CAST(coins AS INTEGER)) AS sum FROM purchases WHERE buyer_id = $1 AND created > $2",
        )
        .bind(user_id.0)
        .bind(Utc::now() - Duration::days(1))
        .fetch_one(db)
        .await
        .unwrap()
        .sum
        .map(Coins)
        .unwrap_or_default()
    }

    #[derive(sqlx::FromRow, Debug)]
    struct PurchaseRow {
        id: Uuid,
        buyer_id: Uuid,
        session_id: Uuid,
        currency: String,
        amount: f64,
        coins: i64,
        status: i32,
        proof: Option<String>,
        created: DateTime<Utc>,
        completed: Option<DateTime<Utc>>,
    }

    impl PurchaseRow {
        fn into_entity(self) -> Purchase {
            Purchase {
                id: Id(self.id),
                buyer_id: user::Id(self.buyer_id),
                session_id: auth::SessionId(self.session_id),
                currency: Currency::from_str(&self.currency).unwrap(),
                amount: self.amount,
                coins: Coins(self.coins),
                proof: self.proof,
                created: self.created,
                status: match (self.status, self.completed) {
                    (0, _) => Status::Pending,
                    (1, Some(timestamp)) => Status::Completed { timestamp },
                    _ => unreachable!("unknown purchase status number"),
                },
            }
        }
    }

    #[derive(sqlx::FromRow, Debug)]
    struct PurchaseWithBuyerRow {
        id: Uuid,
        buyer_id: Uuid,
        session_id: Uuid,
        currency: String,
        amount: f64,
        coins: i64,
        status: i32,
        proof: Option<String>,
        created: DateTime<Utc>,
        completed: Option<DateTime<Utc>>,
        buyer_username: String,
        buyer_email: String,
    }

    impl PurchaseWithBuyerRow {
        fn into_entity(self) -> PurchaseWithBuyer {
            let purchase = PurchaseRow {
                id: self.id,
                buyer_id: self.buyer_id,
                session_id: self.session_id,
                currency: self.currency,
                amount: self.amount,
                coins: self.coins,
                status: self.status,
                proof: self.proof,
                created: self.created,
                completed: self.completed,
            };
            PurchaseWithBuyer {
                purchase: purchase.into_entity(),
                buyer_username: self.buyer_username,
                buyer_email: user::Email(self.buyer_email),
            }
        }
    }
}
