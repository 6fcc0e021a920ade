//! Angel One SmartAPI.
//!
//! [`SmartApiProvider`] logs in with client code, PIN and a TOTP code (derived from the
//! account's TOTP secret, or supplied by the caller), then exchanges the refresh token for a
//! fresh JWT. The resulting [`SmartApiSession`] serves historical candles, holdings and
//! logout. All calls share one client-side rate limiter.

pub mod params;
pub mod provider;
pub mod response;
pub mod session;
pub mod totp;

use std::num::NonZeroU32;

use nonzero_ext::nonzero;
use secrecy::SecretString;
use shared_utils::env::{get_env_var, get_optional_env_var};
use snafu::ResultExt;

use crate::providers::{MissingEnvVarSnafu, ProviderInitError};

pub use provider::SmartApiProvider;
pub use session::SmartApiSession;
pub use totp::LoginCode;

pub const DEFAULT_BASE_URL: &str = "https://apiconnect.angelone.in";

/// The broker enforces per-second quotas on the historical endpoint.
pub const DEFAULT_REQUESTS_PER_SECOND: NonZeroU32 = nonzero!(3u32);

pub(crate) const LOGIN_PATH: &str = "/rest/auth/angelbroking/user/v1/loginByPassword";
pub(crate) const TOKEN_PATH: &str = "/rest/auth/angelbroking/jwt/v1/generateTokens";
pub(crate) const CANDLE_PATH: &str = "/rest/secure/angelbroking/historical/v1/getCandleData";
pub(crate) const HOLDING_PATH: &str = "/rest/secure/angelbroking/portfolio/v1/getHolding";
pub(crate) const LOGOUT_PATH: &str = "/rest/secure/angelbroking/user/v1/logout";

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartApiSettings {
    pub base_url: String,
    pub requests_per_second: NonZeroU32,
}

impl Default for SmartApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

/// Login material.
#[derive(Debug)]
pub struct SmartApiCredentials {
    pub api_key: SecretString,
    pub client_code: String,
    pub pin: SecretString,
    pub totp: LoginCode,
}

impl SmartApiCredentials {
    /// Reads `API_KEY`, `CLIENT_ID` and `MPIN`. The login code is `totp` if given, else
    /// `TOTP`, else derived from `TOTP_SECRET` at each login.
    pub fn from_env(totp: Option<String>) -> Result<Self, ProviderInitError> {
        let api_key = get_env_var("API_KEY").context(MissingEnvVarSnafu)?;
        let client_code = get_env_var("CLIENT_ID").context(MissingEnvVarSnafu)?;
        let pin = get_env_var("MPIN").context(MissingEnvVarSnafu)?;
        let totp = LoginCode::resolve(
            totp.or_else(|| get_optional_env_var("TOTP")),
            get_optional_env_var("TOTP_SECRET"),
        )?;
        Ok(Self {
            api_key: SecretString::new(api_key.into()),
            client_code,
            pin: SecretString::new(pin.into()),
            totp,
        })
    }
}
