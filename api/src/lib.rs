//! This library contains definitions for the API layer.

use app::{database::Database, PurchaseLimits};
use rocket::{Build, Rocket};
use state::RocketState;

mod access;
mod error;
mod rate_limit;
mod routes;
mod state;

pub use rate_limit::RateLimit;

pub fn register(
    rocket: Rocket<Build>,
    db: Database,
    purchase_limits: PurchaseLimits,
    admin_token_hash: String,
    rate_limit: RateLimit,
) -> Rocket<Build> {
    routes::register(
        rocket,
        RocketState {
            db,
            purchase_limits,
            admin_token_hash,
            rate_limit,
        },
    )
}
