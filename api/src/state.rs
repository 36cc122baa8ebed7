use app::{database::Database, PurchaseLimits};

use crate::rate_limit::RateLimit;

pub struct RocketState {
    pub db: Database,
    pub purchase_limits: PurchaseLimits,
    /// SHA256 hex of the administrative token from the server configuration.
    pub admin_token_hash: String,
    pub rate_limit: RateLimit,
}
