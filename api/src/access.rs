use std::future::Future;

use app::{auth, database::Database, user};
use okapi::openapi3::{Object, SecurityRequirement, SecurityScheme, SecuritySchemeData};
use rocket::{
    async_trait,
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};
use rocket_okapi::{
    gen::OpenApiGenerator,
    request::{OpenApiFromRequest, RequestHeaderInput},
};
use thiserror::Error;

use crate::state::RocketState;

/// Proves an authenticated session; unlocks reads and owning-user operations.
pub struct SessionGuard(auth::SessionGrant);

impl SessionGuard {
    pub fn grant(&self) -> &auth::SessionGrant {
        &self.0
    }
}

/// Proves an authenticated session of a KYC-verified user; unlocks purchase creation.
pub struct TradeGuard(auth::TradeGrant);

impl TradeGuard {
    pub fn grant(&self) -> &auth::TradeGrant {
        &self.0
    }
}

/// Proves possession of the administrative token.
pub struct AdminGuard;

#[derive(Debug, Error)]
pub enum Error {
    #[error("access denied")]
    AccessDenied(#[from] auth::AccessDenied),
    #[error("kyc verification required")]
    KycRequired,
    #[error("rate limit exceeded")]
    RateLimited,
}

impl From<auth::TradeError> for Error {
    fn from(e: auth::TradeError) -> Self {
        match e {
            auth::TradeError::AccessDenied(e) => Error::AccessDenied(e),
            auth::TradeError::KycRequired => Error::KycRequired,
        }
    }
}

const SESSION_TOKEN_HEADER: &str = "X-Session-Token";
const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

#[async_trait]
impl<'r> FromRequest<'r> for SessionGuard {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        guard_impl(req, auth::get_session_grant, Self).await
    }
}

#[async_trait]
impl<'r> FromRequest<'r> for TradeGuard {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        guard_impl(req, auth::get_trade_grant, Self).await
    }
}

#[async_trait]
impl<'r> FromRequest<'r> for AdminGuard {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match req.headers().get_one(ADMIN_TOKEN_HEADER) {
            Some(token) => {
                let state = req.rocket().state::<RocketState>().unwrap();
                if auth::TokenHash::generate(token).as_str() == state.admin_token_hash {
                    Outcome::Success(AdminGuard)
                } else {
                    Outcome::Error((Status::Forbidden, auth::AccessDenied.into()))
                }
            }
            None => Outcome::Error((Status::Forbidden, auth::AccessDenied.into())),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for SessionGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(openapi_auth(
            SESSION_TOKEN_HEADER,
            "Requires a session token obtained at login",
        ))
    }
}

impl<'a> OpenApiFromRequest<'a> for TradeGuard {
    fn from_request_input(
        _: &mut OpenApiGenerator,
        _: String,
        _: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(openapi_auth(
            SESSION_TOKEN_HEADER,
            "Requires a session token of a KYC-verified account",
        ))
    }
}

impl<'a> OpenApiFromRequest<'a> for AdminGuard {
    fn from_request_input(
        _: &mut OpenApiGenerator,
        _: String,
        _: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(openapi_auth(
            ADMIN_TOKEN_HEADER,
            "Requires the administrative token",
        ))
    }
}

async fn guard_impl<
    'a,
    'b,
    G: AnyGrant,
    E: Into<Error>,
    F: Future<Output = Result<G, E>> + 'a,
    R,
>(
    req: &'a Request<'b>,
    get_grant: impl FnOnce(&'a Database, &'a str) -> F,
    create_guard: impl FnOnce(G) -> R,
) -> Outcome<R, Error> {
    match req.headers().get_one(SESSION_TOKEN_HEADER) {
        Some(token) => {
            let state = req.rocket().state::<RocketState>().unwrap();
            match get_grant(&state.db, token).await {
                Ok(grant) => {
                    if state.rate_limit.limit(grant.user_id()) {
                        log::info!("rate limiting user {:?}", grant.user_id());
                        Outcome::Error((Status::TooManyRequests, Error::RateLimited))
                    } else {
                        Outcome::Success(create_guard(grant))
                    }
                }
                Err(e) => Outcome::Error((Status::Forbidden, e.into())),
            }
        }
        None => Outcome::Error((Status::Forbidden, auth::AccessDenied.into())),
    }
}

/// Helper trait implemented for all grant types.
trait AnyGrant {
    /// Every grant applies to a user.
    fn user_id(&self) -> user::Id;
}

impl AnyGrant for auth::SessionGrant {
    fn user_id(&self) -> user::Id {
        self.user_id
    }
}

impl AnyGrant for auth::TradeGrant {
    fn user_id(&self) -> user::Id {
        self.user_id
    }
}

fn openapi_auth(header: &str, description: &str) -> RequestHeaderInput {
    let security_scheme = SecurityScheme {
        description: Some(format!("{}: \"{}\".", description, header)),
        data: SecuritySchemeData::ApiKey {
            name: header.to_owned(),
            location: "header".to_owned(),
        },
        extensions: Object::default(),
    };
    let mut security_req = SecurityRequirement::new();
    security_req.insert(header.to_owned(), Vec::new());
    RequestHeaderInput::Security(header.to_owned(), security_scheme, security_req)
}
