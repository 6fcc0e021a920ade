use chrono::NaiveDateTime;
use chrono_tz::Tz;
use thiserror::Error;

use crate::exchange_time::{TimestampError, parse_exchange_timestamp};
use crate::models::interval::{Interval, IntervalError};
use crate::models::request_params::CandleRequest;

#[derive(Debug, Error)]
pub enum ParamError {
    #[error(transparent)]
    Interval(#[from] IntervalError),

    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error("window start {from} is not before end {to}")]
    EmptyWindow {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },
}

/// Build a [`CandleRequest`] from raw `candles` arguments.
pub fn parse_candle_request(
    token: &str,
    exchange: &str,
    interval: &str,
    from: &str,
    to: &str,
    tz: Tz,
) -> Result<CandleRequest, ParamError> {
    let interval: Interval = interval.parse()?;
    let from = parse_exchange_timestamp(from, tz)?;
    let to = parse_exchange_timestamp(to, tz)?;
    if from >= to {
        return Err(ParamError::EmptyWindow { from, to });
    }
    Ok(CandleRequest {
        symbol_token: token.trim().to_string(),
        exchange: exchange.trim().to_uppercase(),
        interval,
        from,
        to,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange_time::DEFAULT_EXCHANGE_TZ;

    #[test]
    fn offset_inputs_land_in_exchange_time() {
        let req = parse_candle_request(
            " 2885 ",
            "nse",
            "15m",
            "2025-08-13T03:45:00Z",
            "2025-08-13 15:30",
            DEFAULT_EXCHANGE_TZ,
        )
        .unwrap();
        assert_eq!(req.symbol_token, "2885");
        assert_eq!(req.exchange, "NSE");
        assert_eq!(req.interval, Interval::FifteenMinute);
        assert_eq!(req.from.to_string(), "2025-08-13 09:15:00");
        assert_eq!(req.to.to_string(), "2025-08-13 15:30:00");
    }

    #[test]
    fn reversed_window_and_bad_interval_are_rejected() {
        let reversed = parse_candle_request(
            "1",
            "NSE",
            "5m",
            "2025-08-13 15:30",
            "2025-08-13 09:15",
            DEFAULT_EXCHANGE_TZ,
        );
        assert!(matches!(reversed, Err(ParamError::EmptyWindow { .. })));

        let bad = parse_candle_request(
            "1",
            "NSE",
            "7m",
            "2025-08-13 09:15",
            "2025-08-13 15:30",
            DEFAULT_EXCHANGE_TZ,
        );
        assert!(matches!(bad, Err(ParamError::Interval(_))));
    }
}
