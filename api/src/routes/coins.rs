//! Routes for reading and setting the coin price.

use chrono::{DateTime, Utc};
use rocket::{get, put, serde::json::Json, State};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use app::coin;

use crate::{
    access,
    error::{self, JsonResult},
    state::RocketState,
};

#[derive(Debug, Serialize, JsonSchema)]
struct CoinModel {
    /// Price of one coin, in the reference currency.
    price: f64,
    /// When this price was set.
    updated_at: DateTime<Utc>,
}

impl CoinModel {
    fn from_entity(coin: &coin::Coin) -> Self {
        Self {
            price: coin.price,
            updated_at: coin.updated,
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct CoinResponse {
    coin: CoinModel,
}

/// Get the current coin price. Returns 404 until an administrator has set a price.
#[openapi(tag = "Coins")]
#[get("/coins")]
pub(super) async fn get(
    _guard: access::SessionGuard,
    state: &State<RocketState>,
) -> Option<Json<CoinResponse>> {
    coin::get(&state.db).await.map(|coin| {
        Json(CoinResponse {
            coin: CoinModel::from_entity(&coin),
        })
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct PriceRequest {
    /// The new price of one coin, in the reference currency.
    price: f64,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum PriceError {
    /// The price was zero, negative, or not a number.
    InvalidPrice,
}

/// Set a new coin price. Administrative. Earlier prices are kept as history; the newest price
/// is the one served to clients.
#[openapi(tag = "Coins")]
#[put("/coins", data = "<req>")]
pub(super) async fn put(
    _guard: access::AdminGuard,
    state: &State<RocketState>,
    req: Json<PriceRequest>,
) -> JsonResult<CoinResponse, PriceError> {
    coin::set_price(&state.db, req.price)
        .await
        .map(|coin| {
            Json(CoinResponse {
                coin: CoinModel::from_entity(&coin),
            })
        })
        .map_err(|e| match e {
            coin::Error::InvalidPrice => error::bad_request(
                PriceError::InvalidPrice,
                "price must be a positive number".to_owned(),
            ),
        })
}
