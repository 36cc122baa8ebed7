use crate::{database::Database, user};

mod entities;

pub use entities::{
    AccessDenied, InvalidCredentials, Session, SessionGrant, SessionId, SessionToken, TokenHash,
    TradeError, TradeGrant,
};

/// The result of a successful login. The token is the only copy the backend ever exposes.
pub struct Login {
    pub token: SessionToken,
    pub user_id: user::Id,
    pub username: String,
    pub kyc_status: user::KycStatus,
}

pub async fn login(
    db: &Database,
    email: &user::Email,
    password: &str,
) -> Result<Login, InvalidCredentials> {
    let credentials = queries::get_credentials(db, email)
        .await
        .ok_or(InvalidCredentials)?;
    if !credentials.digest.verify(password) {
        return Err(InvalidCredentials);
    }
    let (session, token) = Session::open(credentials.user_id, credentials.kyc_status);
    queries::insert_session(db, &session, &TokenHash::generate(token.as_str())).await;
    Ok(Login {
        token,
        user_id: credentials.user_id,
        username: credentials.username,
        kyc_status: credentials.kyc_status,
    })
}

pub async fn logout(grant: &SessionGrant, db: &Database) {
    queries::disable_session(db, grant.session_id).await;
}

pub async fn get_session_grant(db: &Database, token: &str) -> Result<SessionGrant, AccessDenied> {
    queries::get_session(db, token)
        .await
        .ok_or(AccessDenied)?
        .session_grant()
}

pub async fn get_trade_grant(db: &Database, token: &str) -> Result<TradeGrant, TradeError> {
    queries::get_session(db, token)
        .await
        .ok_or(AccessDenied)?
        .trade_grant()
}

mod queries {
    use super::entities::{Session, SessionId, TokenHash};
    use crate::{database::Database, user};
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    pub(super) async fn get_session(db: &Database, token: &str) -> Option<Session> {
        let token_hash = TokenHash::generate(token);
        sqlx::query_as::<_, SessionRow>(
            r#"SELECT sessions.id, sessions.user_id, sessions.created, sessions.disabled, users.kyc_status
                FROM sessions JOIN users ON sessions.user_id = users.id
                WHERE sessions.token_hash = $1"#,
        )
        .bind(token_hash.as_str())
        .fetch_optional(db)
        .await
        .unwrap()
        .map(|row| row.into_entity())
    }

    pub(super) async fn insert_session(db: &Database, session: &Session, token_hash: &TokenHash) {
        sqlx::query(
            r#"INSERT INTO sessions (id, user_id, token_hash, created, disabled)
                VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(session.id.0)
        .bind(session.user_id.0)
        .bind(token_hash.as_str())
        .bind(session.created)
        .bind(session.disabled)
        .execute(db)
        .await
        .unwrap();
    }

    pub(super) async fn disable_session(db: &Database, id: SessionId) {
        sqlx::query("UPDATE sessions SET disabled = $1 WHERE id = $2 AND disabled IS NULL")
            .bind(Utc::now())
            .bind(id.0)
            .execute(db)
            .await
            .unwrap();
    }

    pub(super) struct Credentials {
        pub user_id: user::Id,
        pub username: String,
        pub digest: user::PasswordDigest,
        pub kyc_status: user::KycStatus,
    }

    pub(super) async fn get_credentials(db: &Database, email: &user::Email) -> Option<Credentials> {
        sqlx::query_as::<_, CredentialsRow>(
            "SELECT id, username, password_hash, kyc_status FROM users WHERE email = $1",
        )
        .bind(&email.0)
        .fetch_optional(db)
        .await
        .unwrap()
        .map(|row| Credentials {
            user_id: user::Id(row.id),
            username: row.username,
            digest: user::PasswordDigest::from_stored(row.password_hash),
            kyc_status: user::KycStatus::from_int(row.kyc_status),
        })
    }

    #[derive(sqlx::FromRow, Debug)]
    struct CredentialsRow {
        id: Uuid,
        username: String,
        password_hash: String,
        kyc_status: i32,
    }

    #[derive(sqlx::FromRow, Debug)]
    struct SessionRow {
        id: Uuid,
        user_id: Uuid,
        created: DateTime<Utc>,
        disabled: Option<DateTime<Utc>>,
        kyc_status: i32,
    }

    impl SessionRow {
        fn into_entity(self) -> Session {
            Session {
                id: SessionId(self.id),
                user_id: user::Id(self.user_id),
                kyc_status: user::KycStatus::from_int(self.kyc_status),
                created: self.created,
                disabled: self.disabled,
            }
        }
    }
}
