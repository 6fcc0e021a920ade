use serde::Deserialize;
use serde_json::Value;

use crate::providers::{ApiSnafu, ProviderError};

/// Every SmartAPI response is wrapped in this envelope.
#[derive(Deserialize, Debug)]
pub struct Envelope<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errorcode: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// The `data` member, or an API error carrying the broker's message and code.
    pub fn into_data(self) -> Result<Option<T>, ProviderError> {
        if self.status {
            return Ok(self.data);
        }
        ApiSnafu {
            message: self.describe(),
        }
        .fail()
    }

    pub fn describe(&self) -> String {
        if self.errorcode.is_empty() {
            self.message.clone()
        } else {
            format!("{} ({})", self.message, self.errorcode)
        }
    }
}

/// Tokens issued by `loginByPassword` and `generateTokens`.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    pub jwt_token: String,
    pub refresh_token: String,
}

impl TokenSet {
    /// The JWT without any `Bearer ` prefix the broker may have included.
    pub fn bare_jwt(&self) -> &str {
        self.jwt_token
            .strip_prefix("Bearer ")
            .unwrap_or(&self.jwt_token)
    }
}

pub type RawEnvelope = Envelope<Value>;
