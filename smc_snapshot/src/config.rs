//! TOML run configuration.
//!
//! ```toml
//! [symbol]
//! label = "NIFTY"
//! token = "99926000"
//!
//! [[timeframes]]
//! key = "5m"
//! interval = "FIVE_MINUTE"
//! range = { kind = "lookback_days", days = 5 }
//! ```
//!
//! Everything except `[symbol]` is optional. Credentials never live here; they come from
//! the environment (see [`SmartApiCredentials`](crate::providers::smartapi::SmartApiCredentials)).
//!
//! `fixed` ranges take exchange-local wall times (`"2025-08-13 09:15"`) in the zone set by
//! `[broker].timezone`. A bound carrying an offset or `Z` is rejected.

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;

use crate::aggregate::{RangeSpec, SymbolConfig, TimeframeConfig, default_timeframes};
use crate::exchange_time::{DEFAULT_EXCHANGE_TZ, SessionHours};
use crate::providers::smartapi::{DEFAULT_BASE_URL, DEFAULT_REQUESTS_PER_SECOND, SmartApiSettings};
use crate::smc::AnalysisSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    pub symbol: SymbolConfig,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub session: SessionHours,
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<TimeframeConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    /// Fail a timeframe that yields no valid candles.
    #[serde(default = "default_true")]
    pub require_candles: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    pub base_url: String,
    pub timezone: Tz,
    pub requests_per_second: NonZeroU32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timezone: DEFAULT_EXCHANGE_TZ,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

impl BrokerConfig {
    pub fn smartapi_settings(&self) -> SmartApiSettings {
        SmartApiSettings {
            base_url: self.base_url.clone(),
            requests_per_second: self.requests_per_second,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("smc_snapshot.json"),
        }
    }
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.label.trim().is_empty() || self.symbol.token.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol label and token must be set".into()));
        }
        if self.timeframes.is_empty() {
            return Err(ConfigError::Invalid("at least one timeframe is required".into()));
        }

        let mut seen = HashSet::new();
        for tf in &self.timeframes {
            if tf.key.trim().is_empty() {
                return Err(ConfigError::Invalid("timeframe key is empty".into()));
            }
            if !seen.insert(tf.key.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate timeframe key {:?}", tf.key)));
            }
            match tf.range {
                RangeSpec::LookbackDays { days: 0 } => {
                    return Err(ConfigError::Invalid(format!(
                        "timeframe {:?}: lookback must be at least one day",
                        tf.key
                    )));
                }
                RangeSpec::Fixed { from, to } if from >= to => {
                    return Err(ConfigError::Invalid(format!(
                        "timeframe {:?}: from {from} is not before to {to}",
                        tf.key
                    )));
                }
                _ => {}
            }
        }

        if self.session.open >= self.session.close {
            return Err(ConfigError::Invalid("session open must be before close".into()));
        }

        self.analysis
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::aggregate::SliceMode;
    use crate::models::interval::Interval;

    const MINIMAL: &str = r#"
        [symbol]
        label = "NIFTY"
        token = "99926000"
    "#;

    const EXAMPLE: &str = include_str!("../../smc_snapshot.example.toml");

    #[test]
    fn minimal_config_gets_defaults() {
        let config = AppConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.symbol.exchange, "NSE");
        assert_eq!(config.broker, BrokerConfig::default());
        assert_eq!(config.analysis, AnalysisSettings::default());
        assert_eq!(config.session, SessionHours::default());
        let keys: Vec<_> = config.timeframes.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, ["5m", "1h", "1d", "prev_day_10m"]);
        assert!(config.require_candles);
    }

    #[test]
    fn full_config_round_trips_into_types() {
        let config = AppConfig::from_toml(
            r#"
            require_candles = false

            [broker]
            timezone = "Asia/Kolkata"
            requests_per_second = 2

            [symbol]
            label = "Reliance"
            token = "2885"
            exchange = "NSE"

            [analysis]
            swing_length = 10
            liquidity_range_fraction = 0.01

            [session]
            open = "09:15"
            close = "15:30"

            [[timeframes]]
            key = "today_5m"
            interval = "FIVE_MINUTE"
            range = { kind = "current_session" }
            mode = "raw"

            [output]
            path = "out/reliance.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.broker.requests_per_second.get(), 2);
        assert_eq!(config.analysis.swing_length, 10);
        assert_eq!(config.timeframes.len(), 1);
        assert_eq!(config.timeframes[0].interval, Interval::FiveMinute);
        assert_eq!(config.timeframes[0].mode, SliceMode::Raw);
        assert_eq!(config.output.path, PathBuf::from("out/reliance.json"));
        assert!(!config.require_candles);
    }

    fn with_timeframe(range: &str) -> String {
        let tf = format!("key = \"5m\"\ninterval = \"FIVE_MINUTE\"\nrange = {range}");
        format!("{MINIMAL}\n[[timeframes]]\n{tf}\n")
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let tf = with_timeframe(r#"{ kind = "lookback_days", days = 2 }"#);
        let text = format!("{tf}{}", tf.trim_start_matches(MINIMAL));
        assert!(matches!(AppConfig::from_toml(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_lookback_and_bad_analysis_are_rejected() {
        let zero = with_timeframe(r#"{ kind = "lookback_days", days = 0 }"#);
        assert!(matches!(AppConfig::from_toml(&zero), Err(ConfigError::Invalid(_))));

        let bad = format!("{MINIMAL}\n[analysis]\nswing_length = 0");
        assert!(matches!(AppConfig::from_toml(&bad), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_fields_and_zero_rate_are_parse_errors() {
        let unknown = format!("{MINIMAL}\n[output]\npath = \"x.json\"\nformat = \"yaml\"");
        assert!(matches!(AppConfig::from_toml(&unknown), Err(ConfigError::Parse(_))));

        let zero_rate = format!("[broker]\nrequests_per_second = 0\n{MINIMAL}");
        assert!(matches!(AppConfig::from_toml(&zero_rate), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn fixed_ranges_are_exchange_local_wall_times() {
        let naive = with_timeframe(
            r#"{ kind = "fixed", from = "2025-08-13T09:15", to = "2025-08-13T15:30:00" }"#,
        );
        let config = AppConfig::from_toml(&naive).unwrap();
        let from = NaiveDate::from_ymd_opt(2025, 8, 13).unwrap();
        let expected = RangeSpec::Fixed {
            from: from.and_hms_opt(9, 15, 0).unwrap(),
            to: from.and_hms_opt(15, 30, 0).unwrap(),
        };
        assert_eq!(config.timeframes[0].range, expected);

        // with a non-default zone an offset would silently shift the window
        let offset = with_timeframe(
            r#"{ kind = "fixed", from = "2025-08-13T03:45:00Z", to = "2025-08-13T15:30" }"#,
        );
        let text = format!("[broker]\ntimezone = \"Asia/Dubai\"\n{offset}");
        let err = AppConfig::from_toml(&text).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("without an offset"), "{err}");
    }

    #[test]
    fn shipped_example_config_is_valid() {
        let config = AppConfig::from_toml(EXAMPLE).unwrap();
        assert_eq!(config.timeframes, default_timeframes());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
