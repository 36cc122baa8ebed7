use crate::{auth, database::Database, user};

mod entities;

pub use entities::{Error, Form, Id, ReviewError, Submission};

/// Stores a verification submission and moves the account into the pending state. The profile
/// fields from the form are copied onto the user row so that the profile screen shows them.
pub async fn submit(
    grant: &auth::SessionGrant,
    db: &Database,
    form: Form,
) -> Result<Submission, Error> {
    let mut data_tx = db.begin().await.unwrap();
    // The grant proves the user row exists.
    let status = queries::get_status(&mut data_tx, grant.user_id)
        .await
        .unwrap();
    let status = status.submit()?;
    let submission = Submission::create(grant, form)?;
    queries::insert(&mut data_tx, &submission).await;
    queries::apply_to_user(&mut data_tx, &submission, status).await;
    data_tx.commit().await.unwrap();
    Ok(submission)
}

/// Resolves a pending submission. Approval makes the account eligible for trade grants.
pub async fn review(
    db: &Database,
    user_id: user::Id,
    approved: bool,
) -> Result<user::KycStatus, ReviewError> {
    let mut data_tx = db.begin().await.unwrap();
    let status = queries::get_status(&mut data_tx, user_id)
        .await
        .ok_or(ReviewError::UnknownUser)?;
    let status = status.review(approved)?;
    queries::set_status(&mut data_tx, user_id, status).await;
    data_tx.commit().await.unwrap();
    Ok(status)
}

mod queries {
    use super::Submission;
    use crate::{database, user};

    pub(super) async fn get_status(
        data_tx: &mut database::Transaction,
        user_id: user::Id,
    ) -> Option<user::KycStatus> {
        sqlx::query_as::<_, StatusRow>("SELECT kyc_status FROM users WHERE id = $1")
            .bind(user_id.0)
            .fetch_optional(data_tx)
            .await
            .unwrap()
            .map(|row| user::KycStatus::from_int(row.kyc_status))
    }

    pub(super) async fn set_status(
        data_tx: &mut database::Transaction,
        user_id: user::Id,
        status: user::KycStatus,
    ) {
        sqlx::query("UPDATE users SET kyc_status = $1 WHERE id = $2")
            .bind(status.to_int())
            .bind(user_id.0)
            .execute(data_tx)
            .await
            .unwrap();
    }

    pub(super) async fn insert(data_tx: &mut database::Transaction, submission: &Submission) {
        sqlx::query(
            r#"INSERT INTO kyc_submissions (id, user_id, full_name, phone, date_of_birth, country, address, document, photo, submitted)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(submission.id.0)
        .bind(submission.user_id.0)
        .bind(&submission.full_name)
        .bind(&submission.phone)
        .bind(submission.date_of_birth)
        .bind(&submission.country)
        .bind(&submission.address)
        .bind(&submission.document)
        .bind(&submission.photo)
        .bind(submission.submitted)
        .execute(&mut *data_tx)
        .await
        .unwrap();
    }

    pub(super) async fn apply_to_user(
        data_tx: &mut database::Transaction,
        submission: &Submission,
        status: user::KycStatus,
    ) {
        sqlx::query(
            r#"UPDATE users SET full_name = $1, phone = $2, date_of_birth = $3, country = $4, address = $5, kyc_status = $6
                WHERE id = $7"#,
        )
        .bind(&submission.full_name)
        .bind(&submission.phone)
        .bind(submission.date_of_birth)
        .bind(&submission.country)
        .bind(&submission.address)
        .bind(status.to_int())
        .bind(submission.user_id.0)
        .execute(&mut *data_tx)
        .await
        .unwrap();
    }

    #[derive(sqlx::FromRow, Debug)]
    struct StatusRow {
        kyc_status: i32,
    }
}
