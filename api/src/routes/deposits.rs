//! Routes for the deposit addresses buyers pay their external currency to.

use super::CurrencyModel;
use crate::{
    access,
    error::{self, JsonResult},
    state::RocketState,
};
use app::deposit;
use chrono::{DateTime, Utc};
use rocket::{get, put, serde::json::Json, State};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, JsonSchema)]
struct AddressModel {
    /// Currency this address receives.
    currency: CurrencyModel,
    /// The receiving wallet address.
    address: String,
    /// When this address was configured.
    updated_at: DateTime<Utc>,
}

impl AddressModel {
    fn from_entity(address: &deposit::DepositAddress) -> Self {
        Self {
            currency: CurrencyModel::from_entity(address.currency),
            address: address.address.clone(),
            updated_at: address.updated,
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct AddressResponse {
    deposit_address: AddressModel,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct AddressesResponse {
    deposit_addresses: Vec<AddressModel>,
}

/// List the configured deposit addresses. Buyers send their payment to the address matching
/// the purchase currency.
#[openapi(tag = "Deposit Addresses")]
#[get("/deposits/addresses")]
pub(super) async fn list_addresses(
    _guard: access::SessionGuard,
    state: &State<RocketState>,
) -> Json<AddressesResponse> {
    let addresses = deposit::get_addresses(&state.db).await;
    Json(AddressesResponse {
        deposit_addresses: addresses.iter().map(AddressModel::from_entity).collect(),
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct AddressRequest {
    /// Currency the address receives.
    currency: CurrencyModel,
    /// The receiving wallet address.
    address: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum AddressError {
    /// The address was empty.
    EmptyAddress,
}

/// Set the deposit address for a currency, replacing any earlier one. Administrative.
#[openapi(tag = "Deposit Addresses")]
#[put("/deposits/addresses", data = "<req>")]
pub(super) async fn put_address(
    _guard: access::AdminGuard,
    state: &State<RocketState>,
    req: Json<AddressRequest>,
) -> JsonResult<AddressResponse, AddressError> {
    deposit::set_address(&state.db, req.currency.into_entity(), req.address.clone())
        .await
        .map(|address| {
            Json(AddressResponse {
                deposit_address: AddressModel::from_entity(&address),
            })
        })
        .map_err(|e| match e {
            deposit::Error::EmptyAddress => error::bad_request(
                AddressError::EmptyAddress,
                "address must not be empty".to_owned(),
            ),
        })
}
