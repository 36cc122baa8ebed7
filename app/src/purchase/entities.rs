//! Handles the logic behind coin purchases. A purchase is created when a buyer commits to
//! paying for coins in an external currency, and completed by an administrator once the payment
//! has been checked against the uploaded proof. Completing a purchase credits the buyer's coin
//! balance in the same database transaction that flips the status, so a completed purchase
//! implies the credit happened exactly once.

use crate::auth;
use crate::balance::Balance;
use crate::coins::{Coins, Currency};
use crate::concurrency;
use crate::purchase_limits::{self, PurchaseLimits};
use crate::user;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("{0:?}")]
    LimitsViolated(#[from] purchase_limits::Error),
    #[error("amount must be a positive number")]
    InvalidAmount,
}

#[derive(Debug, Error)]
#[error("the purchase has already been completed")]
pub struct AlreadyCompleted;

#[derive(Debug, Error)]
pub enum ProofError {
    #[error("unknown purchase")]
    UnknownPurchase,
    #[error("proof image must not be empty")]
    EmptyProof,
    #[error("{0}")]
    AlreadyCompleted(#[from] AlreadyCompleted),
}

#[derive(Debug, Error)]
pub enum CompleteError {
    #[error("unknown purchase")]
    UnknownPurchase,
    #[error("{0}")]
    AlreadyCompleted(#[from] AlreadyCompleted),
    #[error("{0:?}")]
    ConcurrencyConflict(#[from] concurrency::ConflictError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Id(pub Uuid);

/// A coin purchase.
#[derive(Debug)]
pub struct Purchase {
    pub id: Id,
    pub buyer_id: user::Id,
    pub session_id: auth::SessionId,
    pub currency: Currency,
    pub amount: f64,
    pub coins: Coins,
    pub proof: Option<String>,
    pub created: DateTime<Utc>,
    pub status: Status,
}

#[derive(Debug, PartialEq)]
pub enum Status {
    Pending,
    Completed { timestamp: DateTime<Utc> },
}

impl Purchase {
    /// Creates a new pending purchase. This cannot cause a concurrency conflict.
    pub(crate) fn create(
        grant: &auth::TradeGrant,
        currency: Currency,
        amount: f64,
        quantity: Coins,
        limits: &PurchaseLimits,
        daily_total: Coins,
    ) -> Result<Self, CreateError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CreateError::InvalidAmount);
        }
        limits.check(purchase_limits::Amounts {
            quantity,
            daily_total,
        })?;
        Ok(Self {
            id: Id(Uuid::new_v4()),
            buyer_id: grant.user_id,
            session_id: grant.session_id,
            currency,
            amount,
            coins: quantity,
            proof: None,
            created: Utc::now(),
            status: Status::Pending,
        })
    }

    /// Attaches a proof-of-payment image. Replacing an earlier proof is allowed as long as the
    /// purchase is still pending.
    pub(crate) fn attach_proof(&mut self, image: String) -> Result<(), ProofError> {
        if self.is_completed() {
            return Err(AlreadyCompleted.into());
        }
        if image.trim().is_empty() {
            return Err(ProofError::EmptyProof);
        }
        self.proof = Some(image);
        Ok(())
    }

    /// Completes the purchase and credits the coins to the buyer's balance. Completion is
    /// final; calling this on a completed purchase fails without touching the balance.
    pub(crate) fn complete(&mut self, balance: &mut Balance) -> Result<(), AlreadyCompleted> {
        if self.buyer_id != balance.user_id() {
            panic!(
                "balance user id {:?} does not match buyer {:?} for purchase {:?}",
                balance.user_id(),
                self.buyer_id,
                self.id
            );
        }
        if self.is_completed() {
            return Err(AlreadyCompleted);
        }
        balance.credit(self.coins);
        self.status = Status::Completed {
            timestamp: Utc::now(),
        };
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, Status::Completed { .. })
    }
}

/// A purchase joined with the buyer's account details, for administrative listings.
#[derive(Debug)]
pub struct PurchaseWithBuyer {
    pub purchase: Purchase,
    pub buyer_username: String,
    pub buyer_email: user::Email,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{SessionId, TradeGrant};

    fn grant() -> TradeGrant {
        TradeGrant {
            session_id: SessionId(Uuid::from_u128(1)),
            user_id: user::Id(Uuid::from_u128(2)),
        }
    }

    fn limits() -> PurchaseLimits {
        PurchaseLimits {
            min: Coins(1),
            max: Coins(100),
            daily: Coins(250),
        }
    }

    fn purchase() -> Purchase {
        Purchase::create(
            &grant(),
            Currency::Usdt,
            125.0,
            Coins(100),
            &limits(),
            Coins(0),
        )
        .unwrap()
    }

    #[test]
    fn a_new_purchase_is_pending_without_proof() {
        let purchase = purchase();
        assert_eq!(purchase.status, Status::Pending);
        assert!(purchase.proof.is_none());
        assert_eq!(purchase.coins, Coins(100));
    }

    #[test]
    fn degenerate_amounts_are_rejected() {
        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let result = Purchase::create(
                &grant(),
                Currency::Btc,
                amount,
                Coins(10),
                &limits(),
                Coins(0),
            );
            assert!(matches!(result, Err(CreateError::InvalidAmount)));
        }
    }

    #[test]
    fn limit_violations_bubble_up() {
        let result = Purchase::create(
            &grant(),
            Currency::Usdt,
            125.0,
            Coins(101),
            &limits(),
            Coins(0),
        );
        assert!(matches!(result, Err(CreateError::LimitsViolated(_))));
    }

    #[test]
    fn proof_can_be_attached_and_replaced_while_pending() {
        let mut purchase = purchase();
        purchase.attach_proof("data:image/png;base64,AAAA".to_owned()).unwrap();
        purchase.attach_proof("data:image/png;base64,BBBB".to_owned()).unwrap();
        assert_eq!(purchase.proof.as_deref(), Some("data:image/png;base64,BBBB"));
        assert!(matches!(
            purchase.attach_proof("   ".to_owned()),
            Err(ProofError::EmptyProof)
        ));
    }

    #[test]
    fn completion_credits_the_buyer_exactly_once() {
        let mut purchase = purchase();
        let mut balance = Balance::new(purchase.buyer_id, Coins(5));
        purchase.complete(&mut balance).unwrap();
        assert!(purchase.is_completed());
        assert_eq!(balance.amount(), Coins(105));

        assert!(purchase.complete(&mut balance).is_err());
        assert_eq!(balance.amount(), Coins(105));
    }

    #[test]
    fn proof_cannot_be_attached_after_completion() {
        let mut purchase = purchase();
        let mut balance = Balance::new(purchase.buyer_id, Coins(0));
        purchase.complete(&mut balance).unwrap();
        assert!(matches!(
            purchase.attach_proof("data:image/png;base64,AAAA".to_owned()),
            Err(ProofError::AlreadyCompleted(_))
        ));
    }

    #[test]
    #[should_panic]
    fn completing_against_a_foreign_balance_panics() {
        let mut purchase = purchase();
        let mut balance = Balance::new(user::Id(Uuid::from_u128(99)), Coins(0));
        let _ = purchase.complete(&mut balance);
    }
}
