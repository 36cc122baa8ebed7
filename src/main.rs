use std::time::Duration;

use app::database::{self, run_migrations, seed_development_data};
use rocket::{launch, Build, Rocket};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct Config {
    database_url: Url,
    /// SHA256 hex of the administrative token. The plaintext token never appears in the
    /// configuration.
    admin_token_sha256: String,
    purchase_limits: LimitsConfig,
    rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize)]
struct LimitsConfig {
    purchase_min_coins: i64,
    purchase_max_coins: i64,
    purchase_daily_coins: i64,
}

impl LimitsConfig {
    fn into_purchase_limits(self) -> app::PurchaseLimits {
        app::PurchaseLimits {
            min: app::Coins(self.purchase_min_coins),
            max: app::Coins(self.purchase_max_coins),
            daily: app::Coins(self.purchase_daily_coins),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitConfig {
    limit: usize,
    span: Duration,
}

impl RateLimitConfig {
    fn into_rate_limit(self) -> api::RateLimit {
        api::RateLimit::new(self.limit, self.span)
    }
}

#[launch]
async fn rocket() -> _ {
    start_server().await
}

async fn start_server() -> Rocket<Build> {
    env_logger::init();

    let rocket = Rocket::build();
    let config: Config = rocket.figment().extract().unwrap();

    let db = database::connect(&config.database_url).await;

    run_migrations(&db).await;
    #[cfg(debug_assertions)]
    seed_development_data(&db).await;

    log::info!("database ready, registering routes");

    api::register(
        rocket,
        db,
        config.purchase_limits.into_purchase_limits(),
        config.admin_token_sha256,
        config.rate_limit.into_rate_limit(),
    )
}
