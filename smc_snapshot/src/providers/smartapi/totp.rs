use secrecy::{ExposeSecret, SecretString};
use shared_utils::env::MissingEnvVarError;
use snafu::ResultExt;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::providers::{InvalidTotpSecretSnafu, MissingEnvVarSnafu, ProviderInitError};

/// SmartAPI uses plain RFC 6238 codes: SHA1, six digits, 30 second step.
const DIGITS: usize = 6;
const STEP_SECS: u64 = 30;

/// Where the one-time login code comes from.
#[derive(Debug)]
pub enum LoginCode {
    /// A code typed in by the operator, valid for a single login.
    Fixed(SecretString),
    /// A base32 TOTP secret; a fresh code is derived at each login.
    Derived(SecretString),
}

impl LoginCode {
    /// An explicit code wins over a secret. A secret is decoded here so a typo fails before
    /// any request is made.
    pub fn resolve(
        code: Option<String>,
        secret: Option<String>,
    ) -> Result<Self, ProviderInitError> {
        if let Some(code) = code {
            return Ok(LoginCode::Fixed(SecretString::new(code.into())));
        }
        let Some(secret) = secret else {
            return Err(MissingEnvVarError("TOTP_SECRET".into())).context(MissingEnvVarSnafu);
        };
        let secret = SecretString::new(secret.into());
        generator(&secret)?;
        Ok(LoginCode::Derived(secret))
    }

    /// The code to send for a login at `unix_secs`.
    pub fn at(&self, unix_secs: u64) -> Result<SecretString, ProviderInitError> {
        let code = match self {
            LoginCode::Fixed(code) => code.expose_secret().to_string(),
            LoginCode::Derived(secret) => generator(secret)?.generate(unix_secs),
        };
        Ok(SecretString::new(code.into()))
    }

    /// The code to send for a login now.
    pub fn current(&self) -> Result<SecretString, ProviderInitError> {
        let now = chrono::Utc::now().timestamp();
        self.at(u64::try_from(now).unwrap_or_default())
    }
}

fn generator(secret: &SecretString) -> Result<TOTP, ProviderInitError> {
    // authenticator apps show the secret grouped, lowercased or padded
    let cleaned: String = secret
        .expose_secret()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let bytes = Secret::Encoded(cleaned)
        .to_bytes()
        .ok()
        .filter(|b| !b.is_empty());
    let Some(bytes) = bytes else {
        let message = "not valid base32";
        return InvalidTotpSecretSnafu { message }.fail();
    };
    Ok(TOTP::new_unchecked(Algorithm::SHA1, DIGITS, 1, STEP_SECS, bytes))
}
