//! Broker abstraction.
//!
//! Three traits split what the pipeline needs from a broker:
//!
//! - [`SessionProvider`] turns credentials into an authenticated session. Failing here is
//!   fatal to the run.
//! - [`CandleSource`] fetches raw historical rows. The rows are handed to the
//!   [normalizer](crate::normalize) untouched, so sources never build [`Candle`]s
//!   themselves.
//! - [`BrokerSession`] is a logged-in session: a candle source that can also report
//!   holdings and log out.
//!
//! Each concrete broker (currently Angel One SmartAPI) implements these to hide its
//! vendor-specific wire format, headers and validation.
//!
//! [`Candle`]: crate::models::candle::Candle
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use serde_json::{Value, json};
//! use smc_snapshot::models::request_params::CandleRequest;
//! use smc_snapshot::providers::{CandleSource, ProviderError};
//!
//! struct Canned;
//!
//! #[async_trait]
//! impl CandleSource for Canned {
//!     async fn fetch_candles(&self, _request: &CandleRequest) -> Result<Value, ProviderError> {
//!         Ok(json!([["2025-08-13T09:15:00+05:30", 1.0, 2.0, 0.5, 1.5, 100]]))
//!     }
//! }
//! ```

pub mod smartapi;

use async_trait::async_trait;
use serde_json::Value;
use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::models::request_params::CandleRequest;

/// Fetches raw candle rows for one request.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Returns the broker's row payload (usually an array of
    /// `[timestamp, open, high, low, close, volume]`, or `null` when the window is empty).
    async fn fetch_candles(&self, request: &CandleRequest) -> Result<Value, ProviderError>;
}

/// An authenticated broker session.
#[async_trait]
pub trait BrokerSession: CandleSource {
    /// The account's holdings, passed through as the broker returns them.
    async fn holdings(&self) -> Result<Value, ProviderError>;

    /// Ends the session on the broker side.
    async fn logout(&self) -> Result<(), ProviderError>;
}

/// Establishes broker sessions.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Session: BrokerSession;

    /// Log in. Errors here are [`ProviderError::Auth`] (or transport errors) and end the run.
    async fn login(&self) -> Result<Self::Session, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// missed environment variable.
    #[snafu(display("{source}"))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The TOTP secret could not be decoded.
    #[snafu(display("Invalid TOTP secret: {message}"))]
    InvalidTotpSecret {
        message: String,
        backtrace: Backtrace,
    },

    /// API key contains invalid characters.
    #[snafu(display("Invalid API key format: {source}"))]
    InvalidApiKey {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a broker session or provider.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The broker's API returned an error envelope or a non-success status.
    #[snafu(display("API error: {message}"))]
    Api {
        message: String,
        backtrace: Backtrace,
    },

    /// The broker refused to open a session.
    #[snafu(display("Authentication failed: {message}"))]
    Auth {
        message: String,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// An internal error occurred while processing data within the provider.
    #[snafu(display("Internal provider error: {message}"))]
    Internal {
        message: String,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

impl ProviderError {
    /// `true` for failures that mean no session exists.
    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::Auth { .. })
    }
}
