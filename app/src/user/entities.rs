use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::coins::Coins;

#[derive(Debug, Clone)]
pub struct Email(pub String);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(pub Uuid);

#[derive(Debug)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: Email,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub balance: Coins,
    pub kyc_status: KycStatus,
    pub created: DateTime<Utc>,
}

impl User {
    /// Creates a new account with an empty profile and a zero balance. The password digest is
    /// returned separately so that it never travels with the entity.
    pub(crate) fn create(username: String, email: Email, password: &str) -> (Self, PasswordDigest) {
        let user = Self {
            id: Id(Uuid::new_v4()),
            username,
            email,
            full_name: None,
            phone: None,
            date_of_birth: None,
            country: None,
            address: None,
            balance: Coins(0),
            kyc_status: KycStatus::NotSubmitted,
            created: Utc::now(),
        };
        (user, PasswordDigest::generate(password))
    }
}

#[derive(Debug, Error)]
pub enum KycTransitionError {
    #[error("a previous submission is still being reviewed")]
    ReviewPending,
    #[error("the account is already verified")]
    AlreadyVerified,
    #[error("there is no submission to review")]
    NothingToReview,
}

/// Identity verification state of an account. There is exactly one path through these states:
/// a submission moves the account into [`KycStatus::Pending`], a review resolves it to
/// [`KycStatus::Verified`] or [`KycStatus::Rejected`], and only a rejected account can submit
/// again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KycStatus {
    NotSubmitted,
    Pending,
    Verified,
    Rejected,
}

impl KycStatus {
    pub fn submit(self) -> Result<Self, KycTransitionError> {
        match self {
            KycStatus::NotSubmitted | KycStatus::Rejected => Ok(KycStatus::Pending),
            KycStatus::Pending => Err(KycTransitionError::ReviewPending),
            KycStatus::Verified => Err(KycTransitionError::AlreadyVerified),
        }
    }

    pub fn review(self, approved: bool) -> Result<Self, KycTransitionError> {
        match self {
            KycStatus::Pending => Ok(if approved {
                KycStatus::Verified
            } else {
                KycStatus::Rejected
            }),
            _ => Err(KycTransitionError::NothingToReview),
        }
    }

    pub fn is_verified(self) -> bool {
        self == KycStatus::Verified
    }

    pub(crate) fn from_int(status: i32) -> Self {
        match status {
            0 => KycStatus::NotSubmitted,
            1 => KycStatus::Pending,
            2 => KycStatus::Verified,
            3 => KycStatus::Rejected,
            _ => unreachable!("unknown kyc status number"),
        }
    }

    pub(crate) fn to_int(self) -> i32 {
        match self {
            KycStatus::NotSubmitted => 0,
            KycStatus::Pending => 1,
            KycStatus::Verified => 2,
            KycStatus::Rejected => 3,
        }
    }
}

/// An argon2 digest of an account password, in PHC string format. Passwords are low-entropy
/// user input, so unlike session tokens they get a salted memory-hard hash.
pub struct PasswordDigest(String);

impl PasswordDigest {
    pub(crate) fn generate(password: &str) -> Self {
        let salt = SaltString::generate(&mut OsRng);
        let digest = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string();
        Self(digest)
    }

    pub(crate) fn verify(&self, password: &str) -> bool {
        let parsed = PasswordHash::new(&self.0).unwrap();
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    pub(crate) fn from_stored(digest: String) -> Self {
        Self(digest)
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kyc_submission_only_from_unsubmitted_or_rejected() {
        assert_eq!(
            KycStatus::NotSubmitted.submit().unwrap(),
            KycStatus::Pending
        );
        assert_eq!(KycStatus::Rejected.submit().unwrap(), KycStatus::Pending);
        assert!(matches!(
            KycStatus::Pending.submit(),
            Err(KycTransitionError::ReviewPending)
        ));
        assert!(matches!(
            KycStatus::Verified.submit(),
            Err(KycTransitionError::AlreadyVerified)
        ));
    }

    #[test]
    fn kyc_review_only_from_pending() {
        assert_eq!(
            KycStatus::Pending.review(true).unwrap(),
            KycStatus::Verified
        );
        assert_eq!(
            KycStatus::Pending.review(false).unwrap(),
            KycStatus::Rejected
        );
        for status in [
            KycStatus::NotSubmitted,
            KycStatus::Verified,
            KycStatus::Rejected,
        ] {
            assert!(matches!(
                status.review(true),
                Err(KycTransitionError::NothingToReview)
            ));
        }
    }

    #[test]
    fn kyc_status_round_trips_through_int() {
        for status in [
            KycStatus::NotSubmitted,
            KycStatus::Pending,
            KycStatus::Verified,
            KycStatus::Rejected,
        ] {
            assert_eq!(KycStatus::from_int(status.to_int()), status);
        }
    }

    #[test]
    fn password_digest_verifies_the_original_password_only() {
        let digest = PasswordDigest::generate("hunter2");
        assert!(digest.verify("hunter2"));
        assert!(!digest.verify("hunter3"));
    }

    #[test]
    fn new_accounts_start_unverified_with_zero_balance() {
        let (user, _) = User::create(
            "satoshi".to_owned(),
            Email("satoshi@example.com".to_owned()),
            "hunter2",
        );
        assert_eq!(user.balance, Coins(0));
        assert_eq!(user.kyc_status, KycStatus::NotSubmitted);
        assert!(user.full_name.is_none());
    }
}
