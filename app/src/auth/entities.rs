//! Handles sessions, authentication, and authorization. Authentication is proven by possession
//! of a session token issued at login; authorization is proven by possession of a grant. A
//! session grant covers reading and owning-user operations, a trade grant additionally requires
//! the account to have passed KYC verification.

use crate::{hex::Hex, user};
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::Digest;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("access denied")]
pub struct AccessDenied;

#[derive(Debug, Error)]
#[error("invalid credentials")]
pub struct InvalidCredentials;

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("access denied")]
    AccessDenied(#[from] AccessDenied),
    #[error("kyc verification required")]
    KycRequired,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub Uuid);

/// This grant represents a compile-time proof that the session may read and modify its own
/// user's data.
#[derive(Debug)]
pub struct SessionGrant {
    pub session_id: SessionId,
    pub user_id: user::Id,
}

/// This grant represents a compile-time proof that the session belongs to a KYC-verified user
/// and may create purchases.
#[derive(Debug)]
pub struct TradeGrant {
    pub session_id: SessionId,
    pub user_id: user::Id,
}

/// A session token in plaintext. It is handed to the client exactly once, at login; only its
/// hash is stored.
pub struct SessionToken(Hex);

impl SessionToken {
    pub(crate) fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(Hex::encode(&bytes))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// A hash of a session token.
pub struct TokenHash(Hex);

impl TokenHash {
    /// Hashes a token with a specific hashing algorithm.
    ///
    /// Session tokens are generated from 32 random bytes, so they have high entropy and a
    /// single unsalted SHA256 round is sufficient. Account passwords do NOT go through this,
    /// see [`user::PasswordDigest`].
    pub fn generate(token: &str) -> Self {
        let mut hasher = sha2::Sha256::new();
        hasher.update(token);
        let sha = hasher.finalize();
        Self(Hex::encode(&sha))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// A login session. A user can hold several sessions at once (one per device); logging out
/// disables a single session.
#[derive(Debug)]
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) user_id: user::Id,
    pub(crate) kyc_status: user::KycStatus,
    pub(crate) created: DateTime<Utc>,
    pub(crate) disabled: Option<DateTime<Utc>>,
}

impl Session {
    pub(crate) fn open(user_id: user::Id, kyc_status: user::KycStatus) -> (Self, SessionToken) {
        let session = Self {
            id: SessionId(Uuid::new_v4()),
            user_id,
            kyc_status,
            created: Utc::now(),
            disabled: None,
        };
        (session, SessionToken::generate())
    }

    pub(crate) fn session_grant(&self) -> Result<SessionGrant, AccessDenied> {
        if self.is_enabled() {
            Ok(SessionGrant {
                session_id: self.id,
                user_id: self.user_id,
            })
        } else {
            Err(AccessDenied)
        }
    }

    pub(crate) fn trade_grant(&self) -> Result<TradeGrant, TradeError> {
        if !self.is_enabled() {
            return Err(AccessDenied.into());
        }
        if !self.kyc_status.is_verified() {
            return Err(TradeError::KycRequired);
        }
        Ok(TradeGrant {
            session_id: self.id,
            user_id: self.user_id,
        })
    }

    fn is_enabled(&self) -> bool {
        self.disabled.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::KycStatus;

    fn session(kyc_status: KycStatus) -> Session {
        Session::open(user::Id(Uuid::from_u128(1)), kyc_status).0
    }

    #[test]
    fn token_hash_is_deterministic() {
        let token = SessionToken::generate();
        assert_eq!(
            TokenHash::generate(token.as_str()).as_str(),
            TokenHash::generate(token.as_str()).as_str()
        );
    }

    #[test]
    fn distinct_tokens_have_distinct_hashes() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_ne!(a.as_str(), b.as_str());
        assert_ne!(
            TokenHash::generate(a.as_str()).as_str(),
            TokenHash::generate(b.as_str()).as_str()
        );
    }

    #[test]
    fn disabled_sessions_grant_nothing() {
        let mut session = session(KycStatus::Verified);
        session.disabled = Some(Utc::now());
        assert!(session.session_grant().is_err());
        assert!(matches!(
            session.trade_grant(),
            Err(TradeError::AccessDenied(_))
        ));
    }

    #[test]
    fn trade_grant_requires_verified_kyc() {
        for status in [
            KycStatus::NotSubmitted,
            KycStatus::Pending,
            KycStatus::Rejected,
        ] {
            assert!(matches!(
                session(status).trade_grant(),
                Err(TradeError::KycRequired)
            ));
        }
        assert!(session(KycStatus::Verified).trade_grant().is_ok());
        assert!(session(KycStatus::Verified).session_grant().is_ok());
    }
}
