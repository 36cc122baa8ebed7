//! Add top-level routes as submodules here.

use crate::{
    error::{self, JsonError},
    state::RocketState,
};
use app::{coins::Currency, QueryRange};
use rocket::{Build, FromForm, Rocket};
use rocket_okapi::{
    openapi_get_routes,
    swagger_ui::{make_swagger_ui, DefaultModelRendering, SwaggerUIConfig},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod coins;
mod deposits;
mod transactions;
mod users;

/// The external currencies buyers can pay with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
enum CurrencyModel {
    Usdt,
    Btc,
}

impl CurrencyModel {
    fn into_entity(self) -> Currency {
        match self {
            CurrencyModel::Usdt => Currency::Usdt,
            CurrencyModel::Btc => Currency::Btc,
        }
    }

    fn from_entity(currency: Currency) -> Self {
        match currency {
            Currency::Usdt => CurrencyModel::Usdt,
            Currency::Btc => CurrencyModel::Btc,
        }
    }
}

const MIN_LIMIT: i64 = 1;
const MAX_LIMIT: i64 = 250;

#[derive(FromForm, JsonSchema)]
struct Range {
    limit: Option<String>,
    offset: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RangeError {
    /// Invalid limit.
    InvalidLimit,
    /// Invalid offset.
    InvalidOffset,
}

impl Range {
    fn query_range(self) -> Result<QueryRange, JsonError<RangeError>> {
        Ok(QueryRange {
            limit: Self::parse_limit(self.limit)?,
            offset: Self::parse_offset(self.offset)?,
        })
    }

    fn parse_limit(s: Option<String>) -> Result<i64, JsonError<RangeError>> {
        let limit: i64 = s.unwrap_or_else(|| "100".to_owned()).parse().map_err(|_| {
            error::bad_request(RangeError::InvalidLimit, "limit is not a number".to_owned())
        })?;
        if limit < MIN_LIMIT {
            Err(error::bad_request(
                RangeError::InvalidLimit,
                format!("limit must be at least {}", MIN_LIMIT),
            ))
        } else if limit > MAX_LIMIT {
            Err(error::bad_request(
                RangeError::InvalidLimit,
                format!("limit can be at most {}", MAX_LIMIT),
            ))
        } else {
            Ok(limit)
        }
    }

    fn parse_offset(s: Option<String>) -> Result<i64, JsonError<RangeError>> {
        let offset = s.unwrap_or_else(|| "0".to_owned()).parse().map_err(|_| {
            error::bad_request(
                RangeError::InvalidOffset,
                "offset is not a number".to_owned(),
            )
        })?;
        if offset < 0 {
            Err(error::bad_request(
                RangeError::InvalidOffset,
                "offset must be positive".to_owned(),
            ))
        } else {
            Ok(offset)
        }
    }
}

pub fn register(rocket: Rocket<Build>, state: RocketState) -> Rocket<Build> {
    let rocket = rocket.manage(state);
    // The mobile client uses unversioned paths, so everything mounts at the root.
    let rocket = rocket.mount(
        "/",
        openapi_get_routes![
            users::register,
            users::login,
            users::logout,
            users::get,
            users::put_password,
            users::put_kyc,
            users::put_authorization,
            users::post_credit,
            coins::get,
            coins::put,
            transactions::post,
            transactions::list,
            transactions::list_all,
            transactions::get,
            transactions::put_proof,
            transactions::put_complete,
            deposits::list_addresses,
            deposits::put_address,
        ],
    );
    mount_swagger(rocket)
}

pub fn mount_swagger(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount(
        "/swagger",
        make_swagger_ui(&SwaggerUIConfig {
            url: "../openapi.json".to_owned(),
            default_model_rendering: DefaultModelRendering::Model,
            show_extensions: true,
            ..Default::default()
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(limit: Option<&str>, offset: Option<&str>) -> Range {
        Range {
            limit: limit.map(str::to_owned),
            offset: offset.map(str::to_owned),
        }
    }

    #[test]
    fn missing_parameters_get_defaults() {
        let query_range = range(None, None).query_range().unwrap();
        assert_eq!(query_range.limit, 100);
        assert_eq!(query_range.offset, 0);
    }

    #[test]
    fn boundary_values_are_accepted() {
        assert!(range(Some("1"), Some("0")).query_range().is_ok());
        assert!(range(Some("250"), Some("9000")).query_range().is_ok());
    }

    #[test]
    fn out_of_range_or_garbage_values_are_rejected() {
        assert!(range(Some("0"), None).query_range().is_err());
        assert!(range(Some("251"), None).query_range().is_err());
        assert!(range(Some("ten"), None).query_range().is_err());
        assert!(range(None, Some("-1")).query_range().is_err());
        assert!(range(None, Some("x")).query_range().is_err());
    }
}
