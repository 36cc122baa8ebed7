use std::sync::Arc;

use app::user;
use dashmap::{mapref::entry::Entry, DashMap};
use std::time::Duration;

pub struct RateLimit {
    limit: usize,
    span: Duration,
    counter: Arc<DashMap<user::Id, usize>>,
}

impl RateLimit {
    pub fn new(limit: usize, span: Duration) -> Self {
        Self {
            limit,
            span,
            counter: Arc::new(Default::default()),
        }
    }

    /// Returns true if the user should be rate limited, false otherwise.
    pub fn limit(&self, user_id: user::Id) -> bool {
        match self.counter.entry(user_id) {
            Entry::Occupied(mut count) => {
                let count = count.get_mut();
                if *count >= self.limit {
                    true
                } else {
                    *count += 1;
                    self.decrement_later(user_id);
                    false
                }
            }
            Entry::Vacant(e) => {
                e.insert(0);
                false
            }
        }
    }

    fn decrement_later(&self, user_id: user::Id) {
        let counter = Arc::clone(&self.counter);
        let span = self.span;
        tokio::spawn(async move {
            tokio::time::sleep(span).await;
            match counter.entry(user_id) {
                Entry::Occupied(mut e) => {
                    let v = e.get_mut();
                    *v -= 1;
                    if *v == 0 {
                        e.remove();
                    }
                }
                Entry::Vacant(_) => {
                    log::error!(
                        "entry should not be vacant, this is a bug. user id {:?}",
                        user_id
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn blocks_once_the_limit_is_reached() {
        let rate_limit = RateLimit::new(2, Duration::from_secs(600));
        let user_id = user::Id(Uuid::from_u128(1));
        assert!(!rate_limit.limit(user_id));
        assert!(!rate_limit.limit(user_id));
        assert!(!rate_limit.limit(user_id));
        assert!(rate_limit.limit(user_id));
    }

    #[tokio::test]
    async fn users_are_limited_independently() {
        let rate_limit = RateLimit::new(1, Duration::from_secs(600));
        let first = user::Id(Uuid::from_u128(1));
        let second = user::Id(Uuid::from_u128(2));
        while !rate_limit.limit(first) {}
        assert!(!rate_limit.limit(second));
    }
}
