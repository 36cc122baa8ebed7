//! Routes for coin purchases: creation, listing, proof upload, and administrative completion.

use super::{CurrencyModel, Range, RangeError};
use crate::{
    access,
    error::{self, JsonResult},
    state::RocketState,
};
use app::{coins::Coins, purchase, purchase_limits};
use chrono::{DateTime, Utc};
use rocket::{get, post, put, serde::json::Json, State};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Serialize, JsonSchema)]
struct PurchaseModel {
    /// Unique purchase identifier.
    id: Uuid,
    /// Currency the buyer pays with.
    currency: CurrencyModel,
    /// Amount to pay, in the reference currency.
    amount: f64,
    /// Coin quantity being bought.
    coins: i64,
    /// True once an administrator confirmed the payment and the coins were credited.
    is_completed: bool,
    /// Proof-of-payment image as a base64 data URI, if uploaded.
    proof: Option<String>,
    /// Purchase creation time.
    created_at: DateTime<Utc>,
    /// Completion time, if the purchase has been completed.
    completed_at: Option<DateTime<Utc>>,
}

impl PurchaseModel {
    fn from_entity(purchase: &purchase::Purchase) -> Self {
        Self {
            id: purchase.id.0,
            currency: CurrencyModel::from_entity(purchase.currency),
            amount: purchase.amount,
            coins: purchase.coins.0,
            is_completed: purchase.is_completed(),
            proof: purchase.proof.clone(),
            created_at: purchase.created,
            completed_at: match purchase.status {
                purchase::Status::Pending => None,
                purchase::Status::Completed { timestamp } => Some(timestamp),
            },
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct PurchaseResponse {
    purchase: PurchaseModel,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct PurchasesResponse {
    purchases: Vec<PurchaseModel>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct AdminPurchaseModel {
    purchase: PurchaseModel,
    /// Identifier of the buying user.
    buyer_id: Uuid,
    /// Display name of the buying user.
    buyer_username: String,
    /// Email of the buying user.
    buyer_email: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct AdminPurchasesResponse {
    purchases: Vec<AdminPurchaseModel>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct PurchaseRequest {
    /// Currency the buyer will pay with.
    currency: CurrencyModel,
    /// Amount to pay, in the reference currency.
    amount: f64,
    /// Coin quantity to buy.
    coins: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum CreateError {
    /// Coin quantity below the per-purchase minimum.
    QuantityTooLow,
    /// Coin quantity above the per-purchase maximum.
    QuantityTooHigh,
    /// Daily purchase total exceeded.
    DailyLimitExceeded,
    /// The amount was zero, negative, or not a number.
    InvalidAmount,
}

/// Create a new pending purchase. Requires a KYC-verified account. Pay the amount to the
/// matching deposit address and upload a proof image afterwards; an administrator completes the
/// purchase once the payment checks out.
#[openapi(tag = "Transactions")]
#[post("/transactions", data = "<req>")]
pub(super) async fn post(
    guard: access::TradeGuard,
    state: &State<RocketState>,
    req: Json<PurchaseRequest>,
) -> JsonResult<PurchaseResponse, CreateError> {
    purchase::create(
        guard.grant(),
        &state.db,
        req.currency.into_entity(),
        req.amount,
        Coins(req.coins),
        &state.purchase_limits,
    )
    .await
    .map(|purchase| {
        Json(PurchaseResponse {
            purchase: PurchaseModel::from_entity(&purchase),
        })
    })
    .map_err(|e| match e {
        purchase::CreateError::LimitsViolated(purchase_limits::Error::QuantityTooLow) => {
            error::bad_request(CreateError::QuantityTooLow, "coin quantity too low".to_owned())
        }
        purchase::CreateError::LimitsViolated(purchase_limits::Error::QuantityTooHigh) => {
            error::bad_request(
                CreateError::QuantityTooHigh,
                "coin quantity too high".to_owned(),
            )
        }
        purchase::CreateError::LimitsViolated(purchase_limits::Error::DailyLimitExceeded) => {
            error::bad_request(
                CreateError::DailyLimitExceeded,
                "daily purchase total exceeded".to_owned(),
            )
        }
        purchase::CreateError::InvalidAmount => error::bad_request(
            CreateError::InvalidAmount,
            "amount must be a positive number".to_owned(),
        ),
    })
}

/// List the purchases of the logged-in user, newest first.
#[openapi(tag = "Transactions")]
#[get("/transactions?<range..>")]
pub(super) async fn list(
    guard: access::SessionGuard,
    state: &State<RocketState>,
    range: Range,
) -> JsonResult<PurchasesResponse, RangeError> {
    Ok(Json(PurchasesResponse {
        purchases: purchase::list(guard.grant(), &state.db, range.query_range()?)
            .await
            .iter()
            .map(PurchaseModel::from_entity)
            .collect(),
    }))
}

/// List every purchase together with the buyer's account details. Administrative.
#[openapi(tag = "Transactions")]
#[get("/transactions/all?<range..>")]
pub(super) async fn list_all(
    _guard: access::AdminGuard,
    state: &State<RocketState>,
    range: Range,
) -> JsonResult<AdminPurchasesResponse, RangeError> {
    Ok(Json(AdminPurchasesResponse {
        purchases: purchase::list_all(&state.db, range.query_range()?)
            .await
            .iter()
            .map(|with_buyer| AdminPurchaseModel {
                purchase: PurchaseModel::from_entity(&with_buyer.purchase),
                buyer_id: with_buyer.purchase.buyer_id.0,
                buyer_username: with_buyer.buyer_username.clone(),
                buyer_email: with_buyer.buyer_email.0.clone(),
            })
            .collect(),
    }))
}

/// Get one of the logged-in user's purchases.
#[openapi(tag = "Transactions")]
#[get("/transactions/<purchase_id>")]
pub(super) async fn get(
    guard: access::SessionGuard,
    state: &State<RocketState>,
    purchase_id: String,
) -> Option<Json<PurchaseResponse>> {
    match Uuid::from_str(&purchase_id) {
        Ok(purchase_id) => {
            purchase::get(guard.grant(), &state.db, purchase::Id(purchase_id))
                .await
                .map(|purchase| {
                    Json(PurchaseResponse {
                        purchase: PurchaseModel::from_entity(&purchase),
                    })
                })
        }
        Err(_) => None,
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct ProofRequest {
    /// Proof-of-payment image as a base64 data URI.
    image: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum ProofError {
    /// The logged-in user has no purchase with this id.
    UnknownPurchase,
    /// The image was empty.
    EmptyProof,
    /// The purchase is already completed.
    AlreadyCompleted,
}

/// Upload a proof-of-payment image for one of the logged-in user's pending purchases. A new
/// upload replaces an earlier one.
#[openapi(tag = "Transactions")]
#[put("/transactions/<purchase_id>/proof", data = "<req>")]
pub(super) async fn put_proof(
    guard: access::SessionGuard,
    state: &State<RocketState>,
    purchase_id: String,
    req: Json<ProofRequest>,
) -> JsonResult<PurchaseResponse, ProofError> {
    let purchase_id = Uuid::from_str(&purchase_id)
        .map_err(|_| error::not_found(ProofError::UnknownPurchase, "unknown purchase".to_owned()))?;
    purchase::attach_proof(
        guard.grant(),
        &state.db,
        purchase::Id(purchase_id),
        req.image.clone(),
    )
    .await
    .map(|purchase| {
        Json(PurchaseResponse {
            purchase: PurchaseModel::from_entity(&purchase),
        })
    })
    .map_err(|e| match e {
        purchase::ProofError::UnknownPurchase => {
            error::not_found(ProofError::UnknownPurchase, "unknown purchase".to_owned())
        }
        purchase::ProofError::EmptyProof => error::bad_request(
            ProofError::EmptyProof,
            "proof image must not be empty".to_owned(),
        ),
        purchase::ProofError::AlreadyCompleted(_) => error::conflict(
            ProofError::AlreadyCompleted,
            "the purchase has already been completed".to_owned(),
        ),
    })
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum CompleteError {
    /// No purchase with this id.
    UnknownPurchase,
    /// The purchase is already completed; the balance was not touched again.
    AlreadyCompleted,
    /// The completion kept conflicting with concurrent balance changes.
    Conflict,
}

/// Complete a purchase, crediting the coins to the buyer's balance. Administrative. Completion
/// and the balance credit happen in one database transaction, and a purchase can only be
/// completed once.
#[openapi(tag = "Transactions")]
#[put("/transactions/<purchase_id>/complete")]
pub(super) async fn put_complete(
    _guard: access::AdminGuard,
    state: &State<RocketState>,
    purchase_id: String,
) -> JsonResult<PurchaseResponse, CompleteError> {
    let purchase_id = Uuid::from_str(&purchase_id).map_err(|_| {
        error::not_found(CompleteError::UnknownPurchase, "unknown purchase".to_owned())
    })?;
    purchase::complete(&state.db, purchase::Id(purchase_id))
        .await
        .map(|purchase| {
            Json(PurchaseResponse {
                purchase: PurchaseModel::from_entity(&purchase),
            })
        })
        .map_err(|e| match e {
            purchase::CompleteError::UnknownPurchase => {
                error::not_found(CompleteError::UnknownPurchase, "unknown purchase".to_owned())
            }
            purchase::CompleteError::AlreadyCompleted(_) => error::conflict(
                CompleteError::AlreadyCompleted,
                "the purchase has already been completed".to_owned(),
            ),
            purchase::CompleteError::ConcurrencyConflict(_) => {
                error::concurrency_error(CompleteError::Conflict)
            }
        })
}
