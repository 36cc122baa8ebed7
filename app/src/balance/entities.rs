//! Facilities for operating on user coin balances. There are two operations: credits, which
//! increase a balance (purchase completion, admin adjustments), and debits, which decrease it.
//! A debit must never push a balance below zero, and neither operation may lose a concurrent
//! update, so balances are written back with a compare-and-swap against the amount that was
//! originally loaded (see [`super::update`]).

use crate::coins::Coins;
use crate::user;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("insufficient balance")]
pub struct InsufficientBalance;

/// A user's coin balance as loaded from the database.
///
/// The struct remembers the originally loaded amount alongside the working amount. The update
/// query only succeeds if the stored balance still equals the original amount, which turns a
/// concurrent modification into a retryable conflict instead of a lost update.
#[derive(Debug, Clone, Default)]
pub struct Balance {
    user_id: user::Id,
    original_amount: Coins,
    amount: Coins,
}

impl Balance {
    pub fn new(user_id: user::Id, amount: Coins) -> Self {
        Self {
            user_id,
            original_amount: amount,
            amount,
        }
    }

    pub fn user_id(&self) -> user::Id {
        self.user_id
    }

    pub fn original_amount(&self) -> Coins {
        self.original_amount
    }

    pub fn amount(&self) -> Coins {
        self.amount
    }

    pub fn changed(&self) -> bool {
        self.original_amount != self.amount
    }

    pub fn credit(&mut self, amount: Coins) {
        self.amount += amount
    }

    pub fn debit(&mut self, amount: Coins) -> Result<(), InsufficientBalance> {
        if amount > self.amount {
            return Err(InsufficientBalance);
        }
        self.amount -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn balance(amount: i64) -> Balance {
        Balance::new(user::Id(Uuid::from_u128(1)), Coins(amount))
    }

    #[test]
    fn credits_and_debits_track_the_working_amount() {
        let mut balance = balance(100);
        balance.credit(Coins(50));
        balance.debit(Coins(30)).unwrap();
        assert_eq!(balance.amount(), Coins(120));
        assert_eq!(balance.original_amount(), Coins(100));
        assert!(balance.changed());
    }

    #[test]
    fn debit_cannot_go_negative() {
        let mut balance = balance(10);
        assert!(balance.debit(Coins(11)).is_err());
        assert_eq!(balance.amount(), Coins(10));
        assert!(!balance.changed());
    }

    #[test]
    fn debit_of_the_full_amount_is_allowed() {
        let mut balance = balance(10);
        balance.debit(Coins(10)).unwrap();
        assert_eq!(balance.amount(), Coins(0));
    }
}
