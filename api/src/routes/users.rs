//! Routes for account management: registration, login, profile, passwords, KYC, and
//! administrative balance adjustments.

use chrono::{DateTime, NaiveDate, Utc};
use rocket::{get, post, put, serde::json::Json, State};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use app::{coins::Coins, kyc, user};

use crate::{
    access,
    error::{self, JsonResult},
    state::RocketState,
};

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum KycStatusModel {
    /// No verification submission yet.
    NotSubmitted,
    /// A submission is waiting for review.
    Pending,
    /// The account passed verification.
    Verified,
    /// The last submission was rejected; the user may submit again.
    Rejected,
}

impl KycStatusModel {
    pub(super) fn from_entity(status: user::KycStatus) -> Self {
        match status {
            user::KycStatus::NotSubmitted => KycStatusModel::NotSubmitted,
            user::KycStatus::Pending => KycStatusModel::Pending,
            user::KycStatus::Verified => KycStatusModel::Verified,
            user::KycStatus::Rejected => KycStatusModel::Rejected,
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
struct UserModel {
    /// Public display name.
    username: String,
    /// Registered account email.
    email: String,
    /// Legal name, as provided on the KYC form.
    full_name: Option<String>,
    /// Contact phone number, as provided on the KYC form.
    phone: Option<String>,
    /// Date of birth, as provided on the KYC form.
    date_of_birth: Option<NaiveDate>,
    /// Country of residence, as provided on the KYC form.
    country: Option<String>,
    /// Street address, as provided on the KYC form.
    address: Option<String>,
    /// Current coin balance.
    coin_balance: i64,
    /// Identity verification state.
    kyc_status: KycStatusModel,
    /// Account creation time.
    created_at: DateTime<Utc>,
}

impl UserModel {
    fn from_entity(user: &user::User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.0.clone(),
            full_name: user.full_name.clone(),
            phone: user.phone.clone(),
            date_of_birth: user.date_of_birth,
            country: user.country.clone(),
            address: user.address.clone(),
            coin_balance: user.balance.0,
            kyc_status: KycStatusModel::from_entity(user.kyc_status),
            created_at: user.created,
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct UserResponse {
    user: UserModel,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct RegisterRequest {
    /// Public display name.
    username: String,
    /// Account email; must not be registered yet.
    email: String,
    /// Account password. Only an argon2 digest of it is stored.
    password: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum RegisterError {
    /// A required field was empty.
    MissingField,
    /// Another account already uses this email.
    EmailTaken,
}

/// Register a new account. The new account starts with a zero balance and no KYC submission.
#[openapi(tag = "User")]
#[post("/user/register", data = "<req>")]
pub(super) async fn register(
    state: &State<RocketState>,
    req: Json<RegisterRequest>,
) -> JsonResult<UserResponse, RegisterError> {
    for (value, name) in [
        (&req.username, "username"),
        (&req.email, "email"),
        (&req.password, "password"),
    ] {
        if value.trim().is_empty() {
            return Err(error::bad_request(
                RegisterError::MissingField,
                format!("{} must not be empty", name),
            ));
        }
    }
    user::register(
        &state.db,
        req.username.clone(),
        user::Email(req.email.clone()),
        &req.password,
    )
    .await
    .map(|user| {
        Json(UserResponse {
            user: UserModel::from_entity(&user),
        })
    })
    .map_err(|e| match e {
        user::RegisterError::EmailTaken => error::conflict(
            RegisterError::EmailTaken,
            "an account with this email already exists".to_owned(),
        ),
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct LoginRequest {
    /// Registered account email.
    email: String,
    /// Account password.
    password: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct SessionUserModel {
    /// Identifier of the logged-in user.
    user_id: Uuid,
    /// Public display name.
    username: String,
    /// Identity verification state.
    kyc_status: KycStatusModel,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct LoginResponse {
    /// The session token. This is the only time the backend hands it out; send it in the
    /// X-Session-Token header on subsequent requests.
    token: String,
    user: SessionUserModel,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum LoginError {
    /// Unknown email or wrong password.
    InvalidCredentials,
}

/// Log in and open a session. Unknown emails and wrong passwords are indistinguishable in the
/// response.
#[openapi(tag = "User")]
#[post("/user/login", data = "<req>")]
pub(super) async fn login(
    state: &State<RocketState>,
    req: Json<LoginRequest>,
) -> JsonResult<LoginResponse, LoginError> {
    app::auth::login(&state.db, &user::Email(req.email.clone()), &req.password)
        .await
        .map(|login| {
            Json(LoginResponse {
                token: login.token.as_str().to_owned(),
                user: SessionUserModel {
                    user_id: login.user_id.0,
                    username: login.username,
                    kyc_status: KycStatusModel::from_entity(login.kyc_status),
                },
            })
        })
        .map_err(|_| {
            error::unauthorized(
                LoginError::InvalidCredentials,
                "invalid credentials".to_owned(),
            )
        })
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct LogoutResponse {
    /// True if the session is now disabled.
    logged_out: bool,
}

/// Log out, disabling the session token. Other sessions of the same user stay valid.
#[openapi(tag = "User")]
#[post("/user/logout")]
pub(super) async fn logout(
    guard: access::SessionGuard,
    state: &State<RocketState>,
) -> Json<LogoutResponse> {
    app::auth::logout(guard.grant(), &state.db).await;
    Json(LogoutResponse { logged_out: true })
}

/// Get the profile of the logged-in user, including the coin balance and KYC state.
#[openapi(tag = "User")]
#[get("/user")]
pub(super) async fn get(
    guard: access::SessionGuard,
    state: &State<RocketState>,
) -> Option<Json<UserResponse>> {
    user::get(guard.grant(), &state.db).await.map(|user| {
        Json(UserResponse {
            user: UserModel::from_entity(&user),
        })
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct PasswordRequest {
    /// The password currently set on the account.
    current_password: String,
    /// The replacement password.
    new_password: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct PasswordResponse {
    /// True if the password was changed.
    changed: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum PasswordError {
    /// The new password was empty.
    MissingField,
    /// The current password did not match.
    InvalidCredentials,
}

/// Change the account password. The current password must be provided again.
#[openapi(tag = "User")]
#[put("/user/password", data = "<req>")]
pub(super) async fn put_password(
    guard: access::SessionGuard,
    state: &State<RocketState>,
    req: Json<PasswordRequest>,
) -> JsonResult<PasswordResponse, PasswordError> {
    if req.new_password.trim().is_empty() {
        return Err(error::bad_request(
            PasswordError::MissingField,
            "new_password must not be empty".to_owned(),
        ));
    }
    user::change_password(
        guard.grant(),
        &state.db,
        &req.current_password,
        &req.new_password,
    )
    .await
    .map(|()| Json(PasswordResponse { changed: true }))
    .map_err(|e| match e {
        user::PasswordError::InvalidCredentials => error::unauthorized(
            PasswordError::InvalidCredentials,
            "invalid credentials".to_owned(),
        ),
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct KycRequest {
    /// Legal name.
    full_name: String,
    /// Contact phone number.
    phone: String,
    /// Date of birth in YYYY-MM-DD format.
    date_of_birth: String,
    /// Country of residence.
    country: String,
    /// Street address.
    address: String,
    /// Identity document as a base64 data URI.
    document: String,
    /// Portrait photo as a base64 data URI.
    photo: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct KycResponse {
    /// Verification state after the submission.
    kyc_status: KycStatusModel,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum KycError {
    /// A required field was empty.
    MissingField,
    /// The date of birth could not be parsed.
    InvalidDateOfBirth,
    /// A previous submission is still being reviewed.
    ReviewPending,
    /// The account is already verified.
    AlreadyVerified,
    /// There is no submission to review.
    NothingToReview,
}

/// Submit the KYC form. All fields are required; a successful submission puts the account into
/// the PENDING state until an administrator reviews it.
#[openapi(tag = "User")]
#[put("/user/kyc", data = "<req>")]
pub(super) async fn put_kyc(
    guard: access::SessionGuard,
    state: &State<RocketState>,
    req: Json<KycRequest>,
) -> JsonResult<KycResponse, KycError> {
    let date_of_birth =
        NaiveDate::parse_from_str(&req.date_of_birth, "%Y-%m-%d").map_err(|_| {
            error::bad_request(
                KycError::InvalidDateOfBirth,
                "date_of_birth is not a YYYY-MM-DD date".to_owned(),
            )
        })?;
    let form = kyc::Form {
        full_name: req.full_name.clone(),
        phone: req.phone.clone(),
        date_of_birth,
        country: req.country.clone(),
        address: req.address.clone(),
        document: req.document.clone(),
        photo: req.photo.clone(),
    };
    kyc::submit(guard.grant(), &state.db, form)
        .await
        .map(|_| {
            Json(KycResponse {
                kyc_status: KycStatusModel::Pending,
            })
        })
        .map_err(|e| match e {
            kyc::Error::MissingField(field) => error::bad_request(
                KycError::MissingField,
                format!("missing required field {}", field),
            ),
            kyc::Error::Transition(user::KycTransitionError::ReviewPending) => error::conflict(
                KycError::ReviewPending,
                "a previous submission is still being reviewed".to_owned(),
            ),
            kyc::Error::Transition(user::KycTransitionError::AlreadyVerified) => error::conflict(
                KycError::AlreadyVerified,
                "the account is already verified".to_owned(),
            ),
            kyc::Error::Transition(user::KycTransitionError::NothingToReview) => {
                error::bad_request(
                    KycError::NothingToReview,
                    "there is no submission to review".to_owned(),
                )
            }
        })
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum ReviewModel {
    /// Approve the pending submission.
    Verified,
    /// Reject the pending submission.
    Rejected,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct AuthorizationRequest {
    /// The verdict for the pending submission.
    status: ReviewModel,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum AuthorizationError {
    /// No user with this id.
    UnknownUser,
    /// There is no pending submission to review.
    NothingToReview,
}

/// Review a user's pending KYC submission. Administrative.
#[openapi(tag = "User")]
#[put("/user/<user_id>/authorization", data = "<req>")]
pub(super) async fn put_authorization(
    _guard: access::AdminGuard,
    state: &State<RocketState>,
    user_id: String,
    req: Json<AuthorizationRequest>,
) -> JsonResult<KycResponse, AuthorizationError> {
    let user_id = Uuid::from_str(&user_id).map_err(|_| {
        error::not_found(AuthorizationError::UnknownUser, "unknown user".to_owned())
    })?;
    let approved = matches!(req.status, ReviewModel::Verified);
    kyc::review(&state.db, user::Id(user_id), approved)
        .await
        .map(|status| {
            Json(KycResponse {
                kyc_status: KycStatusModel::from_entity(status),
            })
        })
        .map_err(|e| match e {
            kyc::ReviewError::UnknownUser => {
                error::not_found(AuthorizationError::UnknownUser, "unknown user".to_owned())
            }
            kyc::ReviewError::Transition(_) => error::conflict(
                AuthorizationError::NothingToReview,
                "there is no pending submission to review".to_owned(),
            ),
        })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct CreditRequest {
    /// Coin amount to add to the balance. Negative values debit the balance.
    coins: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct CreditResponse {
    /// The balance after the adjustment.
    coin_balance: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum CreditError {
    /// No user with this id.
    UnknownUser,
    /// The debit would make the balance negative.
    InsufficientBalance,
    /// The adjustment kept conflicting with concurrent balance changes.
    Conflict,
}

/// Adjust a user's coin balance. Administrative; pass a negative amount to debit.
#[openapi(tag = "User")]
#[post("/user/<user_id>/credit", data = "<req>")]
pub(super) async fn post_credit(
    _guard: access::AdminGuard,
    state: &State<RocketState>,
    user_id: String,
    req: Json<CreditRequest>,
) -> JsonResult<CreditResponse, CreditError> {
    let user_id = Uuid::from_str(&user_id)
        .map_err(|_| error::not_found(CreditError::UnknownUser, "unknown user".to_owned()))?;
    user::credit(&state.db, user::Id(user_id), Coins(req.coins))
        .await
        .map(|balance| Json(CreditResponse {
            coin_balance: balance.0,
        }))
        .map_err(|e| match e {
            user::CreditError::UnknownUser => {
                error::not_found(CreditError::UnknownUser, "unknown user".to_owned())
            }
            user::CreditError::InsufficientBalance(_) => error::bad_request(
                CreditError::InsufficientBalance,
                "the debit would make the balance negative".to_owned(),
            ),
            user::CreditError::ConcurrencyConflict(_) => {
                error::concurrency_error(CreditError::Conflict)
            }
        })
}
