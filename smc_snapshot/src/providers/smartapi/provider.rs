use std::sync::Arc;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use snafu::{ResultExt, ensure};
use tracing::{debug, info};

use crate::providers::smartapi::response::{Envelope, TokenSet};
use crate::providers::smartapi::session::SmartApiSession;
use crate::providers::smartapi::{LOGIN_PATH, SmartApiCredentials, SmartApiSettings, TOKEN_PATH};
use crate::providers::{
    ApiSnafu, AuthSnafu, ClientBuildSnafu, InitSnafu, InternalSnafu, InvalidApiKeySnafu,
    ProviderError, ProviderInitError, ReqwestSnafu, SessionProvider,
};

// SmartAPI insists on these client-identification headers but does not validate them.
const CLIENT_LOCAL_IP: &str = "127.0.0.1";
const CLIENT_PUBLIC_IP: &str = "127.0.0.1";
const MAC_ADDRESS: &str = "00:00:00:00:00:00";

/// HTTP plumbing shared by the provider and its sessions.
#[derive(Clone)]
pub(crate) struct Transport {
    client: Client,
    base_url: String,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl Transport {
    fn new(api_key: &SecretString, settings: &SmartApiSettings) -> Result<Self, ProviderInitError> {
        let private_key = HeaderValue::from_str(api_key.expose_secret())
            .context(InvalidApiKeySnafu)?;

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in [
            ("X-UserType", "USER"),
            ("X-SourceID", "WEB"),
            ("X-ClientLocalIP", CLIENT_LOCAL_IP),
            ("X-ClientPublicIP", CLIENT_PUBLIC_IP),
            ("X-MACAddress", MAC_ADDRESS),
        ] {
            headers.insert(name, HeaderValue::from_static(value));
        }
        headers.insert("X-PrivateKey", private_key);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context(ClientBuildSnafu)?;

        let quota = Quota::per_second(settings.requests_per_second);
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// One rate-limited call, decoded into the broker's envelope.
    pub(crate) async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        jwt: Option<&SecretString>,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ProviderError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.limiter.until_ready().await;

        let url = format!("{}{path}", self.base_url);
        debug!(method = %method, %url, "smartapi request");
        let mut request = self.client.request(method, &url);
        if let Some(jwt) = jwt {
            request = request.bearer_auth(jwt.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.context(ReqwestSnafu)?;
        let status = response.status();
        let text = response.text().await.context(ReqwestSnafu)?;
        ensure!(
            status.is_success(),
            ApiSnafu {
                message: format!("HTTP {status} from {path}: {}", excerpt(&text)),
            }
        );
        serde_json::from_str(&text).map_err(|e| {
            InternalSnafu {
                message: format!("unreadable response from {path}: {e}"),
            }
            .build()
        })
    }
}

fn excerpt(text: &str) -> &str {
    const MAX: usize = 200;
    match text.char_indices().nth(MAX) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

/// Opens SmartAPI sessions for one set of credentials.
pub struct SmartApiProvider {
    transport: Transport,
    credentials: SmartApiCredentials,
}

impl SmartApiProvider {
    /// Creates a new SmartAPI provider.
    pub fn new(
        credentials: SmartApiCredentials,
        settings: &SmartApiSettings,
    ) -> Result<Self, ProviderInitError> {
        Ok(Self {
            transport: Transport::new(&credentials.api_key, settings)?,
            credentials,
        })
    }

    /// Creates a provider from the environment; see [`SmartApiCredentials::from_env`].
    pub fn from_env(
        totp: Option<String>,
        settings: &SmartApiSettings,
    ) -> Result<Self, ProviderInitError> {
        Self::new(SmartApiCredentials::from_env(totp)?, settings)
    }

    async fn request_tokens(&self) -> Result<TokenSet, ProviderError> {
        let totp = self.credentials.totp.current().context(InitSnafu)?;
        let body = json!({
            "clientcode": self.credentials.client_code,
            "password": self.credentials.pin.expose_secret(),
            "totp": totp.expose_secret(),
        });
        let envelope: Envelope<TokenSet> = self
            .transport
            .send(Method::POST, LOGIN_PATH, None, Some(&body))
            .await?;
        ensure!(
            envelope.status,
            AuthSnafu {
                message: envelope.describe(),
            }
        );
        envelope.data.ok_or_else(|| {
            AuthSnafu {
                message: "login succeeded without issuing tokens",
            }
            .build()
        })
    }

    async fn renew(&self, tokens: TokenSet) -> Result<TokenSet, ProviderError> {
        let jwt = SecretString::new(tokens.bare_jwt().into());
        let body = json!({ "refreshToken": tokens.refresh_token });
        let envelope: Envelope<TokenSet> = self
            .transport
            .send(Method::POST, TOKEN_PATH, Some(&jwt), Some(&body))
            .await?;
        Ok(envelope.into_data()?.unwrap_or(tokens))
    }
}

#[async_trait]
impl SessionProvider for SmartApiProvider {
    type Session = SmartApiSession;

    async fn login(&self) -> Result<SmartApiSession, ProviderError> {
        let tokens = self.request_tokens().await.map_err(as_auth)?;
        let tokens = self.renew(tokens).await.map_err(as_auth)?;
        info!(client = %self.credentials.client_code, "smartapi session established");
        Ok(SmartApiSession::new(
            self.transport.clone(),
            self.credentials.client_code.clone(),
            &tokens,
        ))
    }
}

/// Any broker-side refusal while logging in means there is no session.
fn as_auth(err: ProviderError) -> ProviderError {
    match err {
        ProviderError::Api { message, .. } => AuthSnafu { message }.build(),
        other => other,
    }
}
