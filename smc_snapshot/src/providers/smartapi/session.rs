use async_trait::async_trait;
use reqwest::Method;
use secrecy::SecretString;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::models::request_params::CandleRequest;
use crate::providers::smartapi::params::construct_params;
use crate::providers::smartapi::provider::Transport;
use crate::providers::smartapi::response::{RawEnvelope, TokenSet};
use crate::providers::smartapi::{CANDLE_PATH, HOLDING_PATH, LOGOUT_PATH};
use crate::providers::{BrokerSession, CandleSource, ProviderError};

/// A logged-in SmartAPI session.
pub struct SmartApiSession {
    transport: Transport,
    client_code: String,
    jwt: SecretString,
}

impl SmartApiSession {
    pub(crate) fn new(transport: Transport, client_code: String, tokens: &TokenSet) -> Self {
        Self {
            transport,
            client_code,
            jwt: SecretString::new(tokens.bare_jwt().into()),
        }
    }
}

#[async_trait]
impl CandleSource for SmartApiSession {
    async fn fetch_candles(&self, request: &CandleRequest) -> Result<Value, ProviderError> {
        let params = construct_params(request)?;
        debug!(
            token = %params.symboltoken,
            interval = params.interval,
            from = %params.fromdate,
            to = %params.todate,
            "fetching candles"
        );
        let envelope: RawEnvelope = self
            .transport
            .send(Method::POST, CANDLE_PATH, Some(&self.jwt), Some(&params))
            .await?;
        Ok(envelope.into_data()?.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl BrokerSession for SmartApiSession {
    async fn holdings(&self) -> Result<Value, ProviderError> {
        let envelope: RawEnvelope = self
            .transport
            .send::<Value, Value>(Method::GET, HOLDING_PATH, Some(&self.jwt), None)
            .await?;
        Ok(envelope.into_data()?.unwrap_or(Value::Null))
    }

    async fn logout(&self) -> Result<(), ProviderError> {
        let body = json!({ "clientcode": self.client_code });
        let envelope: RawEnvelope = self
            .transport
            .send(Method::POST, LOGOUT_PATH, Some(&self.jwt), Some(&body))
            .await?;
        envelope.into_data()?;
        info!(client = %self.client_code, "smartapi session closed");
        Ok(())
    }
}
