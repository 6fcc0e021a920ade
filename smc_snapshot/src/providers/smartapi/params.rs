use serde::Serialize;
use snafu::ensure;

use crate::exchange_time::format_broker;
use crate::models::{interval::Interval, request_params::CandleRequest};
use crate::providers::{ProviderError, ValidationSnafu};

/// Body of a `getCandleData` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoricParams {
    pub exchange: String,
    pub symboltoken: String,
    pub interval: &'static str,
    pub fromdate: String,
    pub todate: String,
}

/// Longest window, in days, the historical endpoint serves for one interval.
pub const fn max_span_days(interval: Interval) -> i64 {
    match interval {
        Interval::OneMinute => 30,
        Interval::ThreeMinute => 60,
        Interval::FiveMinute | Interval::TenMinute => 100,
        Interval::FifteenMinute | Interval::ThirtyMinute => 200,
        Interval::OneHour => 400,
        Interval::OneDay => 2000,
    }
}

/// Check a request against what SmartAPI accepts and build its wire body.
pub fn construct_params(request: &CandleRequest) -> Result<HistoricParams, ProviderError> {
    ensure!(
        !request.symbol_token.trim().is_empty(),
        ValidationSnafu {
            message: "symbol token is empty",
        }
    );
    ensure!(
        !request.exchange.trim().is_empty(),
        ValidationSnafu {
            message: "exchange is empty",
        }
    );
    ensure!(
        request.from < request.to,
        ValidationSnafu {
            message: format!("from {} is not before to {}", request.from, request.to),
        }
    );

    let limit = max_span_days(request.interval);
    let span = request.to - request.from;
    ensure!(
        span.num_days() <= limit,
        ValidationSnafu {
            message: format!(
                "{} spans {} days; {} allows at most {limit}",
                request.interval.broker_label(),
                span.num_days(),
                request.interval
            ),
        }
    );

    Ok(HistoricParams {
        exchange: request.exchange.clone(),
        symboltoken: request.symbol_token.clone(),
        interval: request.interval.broker_label(),
        fromdate: format_broker(request.from),
        todate: format_broker(request.to),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    use super::*;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn request(interval: Interval, from: NaiveDateTime, to: NaiveDateTime) -> CandleRequest {
        CandleRequest {
            symbol_token: "99926000".into(),
            exchange: "NSE".into(),
            interval,
            from,
            to,
        }
    }

    #[test]
    fn wire_body_uses_broker_labels_and_format() {
        let req = request(Interval::FiveMinute, at(13, 9, 15), at(13, 15, 30));
        let params = construct_params(&req).unwrap();
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            serde_json::json!({
                "exchange": "NSE",
                "symboltoken": "99926000",
                "interval": "FIVE_MINUTE",
                "fromdate": "2025-08-13 09:15",
                "todate": "2025-08-13 15:30"
            })
        );
    }

    #[test]
    fn inverted_window_is_rejected() {
        let req = request(Interval::OneDay, at(13, 15, 30), at(13, 9, 15));
        let err = construct_params(&req).unwrap_err();
        assert!(matches!(err, ProviderError::Validation { .. }));
    }

    #[test]
    fn span_limit_depends_on_interval() {
        let from = at(1, 9, 15);
        let to = from + Duration::days(45);
        assert!(construct_params(&request(Interval::OneMinute, from, to)).is_err());
        assert!(construct_params(&request(Interval::ThreeMinute, from, to)).is_ok());
    }

    #[test]
    fn blank_token_is_rejected() {
        let mut req = request(Interval::OneHour, at(13, 9, 15), at(13, 15, 30));
        req.symbol_token = " ".into();
        assert!(matches!(
            construct_params(&req),
            Err(ProviderError::Validation { .. })
        ));
    }
}
