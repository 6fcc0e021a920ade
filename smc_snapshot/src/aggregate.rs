//! Multi-timeframe assembly.
//!
//! For each configured timeframe the [`Aggregator`] resolves the request window, fetches
//! raw rows, normalizes them and (unless the slice is raw-only) annotates them. Timeframes
//! run one after another and are independent: a failure is logged with the timeframe key,
//! recorded in [`AggregateRun::failures`] and simply leaves that key out of the payload.

use chrono::{Duration, NaiveDateTime};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{error, info};

use crate::annotate::SmcAdapter;
use crate::exchange_time::{DEFAULT_EXCHANGE_TZ, SessionHours, parse_local_timestamp};
use crate::models::interval::Interval;
use crate::models::payload::{Payload, SliceContent, TimeframeSlice};
use crate::models::request_params::CandleRequest;
use crate::normalize::{NormalizeError, normalize_value};
use crate::providers::{CandleSource, ProviderError};
use crate::smc::{DetectorError, SmcDetector};

/// Whether a slice carries annotations or plain candles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceMode {
    #[default]
    Annotated,
    Raw,
}

/// How a timeframe's request window is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RangeSpec {
    /// A fixed window.
    Fixed {
        #[serde(deserialize_with = "exchange_local")]
        from: NaiveDateTime,
        #[serde(deserialize_with = "exchange_local")]
        to: NaiveDateTime,
    },
    /// The last `days` calendar days up to now.
    LookbackDays { days: u32 },
    /// The most recent business day before today, open to close.
    PreviousSession,
    /// Today's open up to now.
    CurrentSession,
}

impl RangeSpec {
    /// The concrete window for a run at `now`.
    pub fn resolve(
        &self,
        now: NaiveDateTime,
        hours: &SessionHours,
    ) -> Result<(NaiveDateTime, NaiveDateTime), TimeframeError> {
        let (from, to) = match *self {
            RangeSpec::Fixed { from, to } => (from, to),
            RangeSpec::LookbackDays { days } => (now - Duration::days(i64::from(days)), now),
            RangeSpec::PreviousSession => hours.previous_session(now),
            RangeSpec::CurrentSession => hours.current_session(now),
        };
        if from >= to {
            return Err(TimeframeError::InvalidRange { from, to });
        }
        Ok((from, to))
    }
}

// Fixed bounds are wall times in whatever zone the run uses; an offset would be ambiguous.
fn exchange_local<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(d)?;
    parse_local_timestamp(&raw).map_err(|_| {
        serde::de::Error::custom(format!(
            "{raw:?} is not an exchange-local time; use YYYY-MM-DDTHH:MM[:SS] without an offset"
        ))
    })
}

/// One entry of the timeframe list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeframeConfig {
    /// Payload key, e.g. `"5m"` or `"prev_day_10m"`.
    pub key: String,
    pub interval: Interval,
    pub range: RangeSpec,
    #[serde(default)]
    pub mode: SliceMode,
}

impl TimeframeConfig {
    pub fn new(
        key: impl Into<String>,
        interval: Interval,
        range: RangeSpec,
        mode: SliceMode,
    ) -> Self {
        Self {
            key: key.into(),
            interval,
            range,
            mode,
        }
    }
}

/// The usual snapshot: annotated 5m/1h/1d plus the previous session at 10m as context.
pub fn default_timeframes() -> Vec<TimeframeConfig> {
    use Interval::*;
    use RangeSpec::*;
    use SliceMode::*;
    vec![
        TimeframeConfig::new("5m", FiveMinute, LookbackDays { days: 5 }, Annotated),
        TimeframeConfig::new("1h", OneHour, LookbackDays { days: 30 }, Annotated),
        TimeframeConfig::new("1d", OneDay, LookbackDays { days: 365 }, Annotated),
        TimeframeConfig::new("prev_day_10m", TenMinute, PreviousSession, Raw),
    ]
}

/// The instrument a run is about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SymbolConfig {
    /// Human label written to the payload (`"NIFTY"`).
    pub label: String,
    /// Broker instrument token (`"99926000"`).
    pub token: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
}

fn default_exchange() -> String {
    "NSE".to_string()
}

#[derive(Debug, Error)]
pub enum TimeframeError {
    #[error("empty request window: {from} .. {to}")]
    InvalidRange {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },

    #[error("fetch failed: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("no valid candles in the requested window")]
    NoCandles,

    #[error("annotation failed: {0}")]
    Detector(#[from] DetectorError),
}

/// A timeframe that did not make it into the payload.
#[derive(Debug)]
pub struct TimeframeFailure {
    pub key: String,
    pub error: TimeframeError,
}

/// Outcome of one run: whatever succeeded, plus what did not.
#[derive(Debug)]
pub struct AggregateRun {
    pub payload: Payload,
    pub failures: Vec<TimeframeFailure>,
}

pub struct Aggregator<D> {
    adapter: SmcAdapter<D>,
    hours: SessionHours,
    tz: Tz,
    require_candles: bool,
}

impl<D: SmcDetector> Aggregator<D> {
    pub fn new(adapter: SmcAdapter<D>) -> Self {
        Self {
            adapter,
            hours: SessionHours::default(),
            tz: DEFAULT_EXCHANGE_TZ,
            require_candles: true,
        }
    }

    pub fn with_session_hours(mut self, hours: SessionHours) -> Self {
        self.hours = hours;
        self
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    /// Whether a timeframe with zero valid candles counts as failed (default `true`).
    pub fn require_candles(mut self, require: bool) -> Self {
        self.require_candles = require;
        self
    }

    /// Build every timeframe in order. Never fails as a whole.
    pub async fn run<S: CandleSource + ?Sized>(
        &self,
        source: &S,
        symbol: &SymbolConfig,
        timeframes: &[TimeframeConfig],
        now: NaiveDateTime,
    ) -> AggregateRun {
        let mut payload = Payload::new(symbol.label.as_str());
        let mut failures = Vec::new();

        for tf in timeframes {
            match self.build_slice(source, symbol, tf, now).await {
                Ok(slice) => {
                    info!(symbol = %symbol.label, timeframe = %tf.key, "timeframe ready");
                    payload.timeframes.insert(tf.key.clone(), slice);
                }
                Err(err) => {
                    error!(
                        symbol = %symbol.label,
                        timeframe = %tf.key,
                        error = %err,
                        "timeframe failed"
                    );
                    failures.push(TimeframeFailure {
                        key: tf.key.clone(),
                        error: err,
                    });
                }
            }
        }

        AggregateRun { payload, failures }
    }

    /// Fetch, normalize and (for annotated slices) annotate one timeframe.
    pub async fn build_slice<S: CandleSource + ?Sized>(
        &self,
        source: &S,
        symbol: &SymbolConfig,
        tf: &TimeframeConfig,
        now: NaiveDateTime,
    ) -> Result<TimeframeSlice, TimeframeError> {
        let (from, to) = tf.range.resolve(now, &self.hours)?;
        let request = CandleRequest {
            symbol_token: symbol.token.clone(),
            exchange: symbol.exchange.clone(),
            interval: tf.interval,
            from,
            to,
        };

        let raw = source.fetch_candles(&request).await?;
        let normalized = normalize_value(&raw, &symbol.label, tf.interval, self.tz)?;
        let series = normalized.series;
        if series.is_empty() && self.require_candles {
            return Err(TimeframeError::NoCandles);
        }

        let content = match tf.mode {
            SliceMode::Annotated => SliceContent::Annotated(self.adapter.annotate(&series)?),
            SliceMode::Raw => SliceContent::Raw {
                candles: series.candles,
            },
        };

        Ok(TimeframeSlice {
            stock: symbol.label.clone(),
            from,
            to,
            content,
        })
    }
}
