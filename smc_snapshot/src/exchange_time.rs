//! Exchange-local time handling.
//!
//! What this module provides:
//! - [`parse_exchange_timestamp`]: accept the timestamp spellings brokers emit and map them
//!   onto exchange-local wall time.
//! - [`format_iso`] / [`format_broker`]: the two outbound renderings (payload and request).
//! - [`SessionHours`]: trading-session bounds used to compute the dynamic "previous session"
//!   and "current session" request windows.
//!
//! Notes:
//! - Every candle timestamp in this crate is a [`NaiveDateTime`] holding exchange-local wall
//!   time. The exchange zone defaults to `Asia/Kolkata` and is configurable.
//! - Inputs carrying an explicit offset are converted into the exchange zone before the
//!   offset is dropped, so `2025-08-13T03:45:00Z` and `2025-08-13T09:15:00+05:30` both become
//!   `2025-08-13T09:15:00`.
//! - Inputs without an offset are taken as already exchange-local.
//!
//! Examples
//! - "2025-08-13T09:15:00+05:30" -> 2025-08-13 09:15:00
//! - "2025-08-13 09:15"          -> 2025-08-13 09:15:00

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default exchange zone (NSE/BSE).
pub const DEFAULT_EXCHANGE_TZ: Tz = chrono_tz::Asia::Kolkata;

/// Payload rendering; fractional seconds only appear when present.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Request rendering expected by the broker's historical endpoint.
pub const BROKER_FORMAT: &str = "%Y-%m-%d %H:%M";

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
];

/// A timestamp string matched none of the accepted spellings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized timestamp: {0:?}")]
pub struct TimestampError(pub String);

/// Parse a broker timestamp into exchange-local wall time.
///
/// Accepted, in order of preference:
/// - RFC-3339 with offset (`2025-08-13T09:15:00+05:30`, `...Z`)
/// - `YYYY-MM-DDTHH:MM:SS[.fff]` and `YYYY-MM-DD HH:MM:SS[.fff]`
/// - `YYYY-MM-DDTHH:MM` and `YYYY-MM-DD HH:MM`
/// - `YYYY-MM-DD` (midnight)
pub fn parse_exchange_timestamp(s: &str, tz: Tz) -> Result<NaiveDateTime, TimestampError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&tz).naive_local());
    }
    // RFC-3339 requires seconds; brokers sometimes send "+0530" style offsets too.
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&tz).naive_local());
        }
    }
    parse_local_timestamp(s)
}

/// Parse a timestamp that is already exchange-local wall time. Offsets are not accepted.
pub fn parse_local_timestamp(s: &str) -> Result<NaiveDateTime, TimestampError> {
    let s = s.trim();
    for fmt in NAIVE_FORMATS {
        if fmt == "%Y-%m-%d" {
            if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                return Ok(d.and_time(NaiveTime::MIN));
            }
        } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    Err(TimestampError(s.to_string()))
}

/// Render exchange-local time as ISO-8601 without offset (`2025-08-13T09:15:00`).
pub fn format_iso(ts: NaiveDateTime) -> String {
    ts.format(ISO_FORMAT).to_string()
}

/// Render exchange-local time the way the historical endpoint expects (`2025-08-13 09:15`).
pub fn format_broker(ts: NaiveDateTime) -> String {
    ts.format(BROKER_FORMAT).to_string()
}

/// Current exchange-local wall time.
pub fn now_in(tz: Tz) -> NaiveDateTime {
    Utc::now().with_timezone(&tz).naive_local()
}

/// Most recent business day strictly before `date`, skipping Saturdays and Sundays.
///
/// Exchange holidays are not known here; a holiday simply yields an empty fetch.
pub fn previous_business_day(date: NaiveDate) -> NaiveDate {
    let mut d = date - Duration::days(1);
    while matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
        d -= Duration::days(1);
    }
    d
}

/// Regular trading-session bounds in exchange-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionHours {
    /// Session open (NSE: 09:15).
    #[serde(with = "hhmm")]
    pub open: NaiveTime,
    /// Session close (NSE: 15:30).
    #[serde(with = "hhmm")]
    pub close: NaiveTime,
}

const NSE_OPEN: NaiveTime = match NaiveTime::from_hms_opt(9, 15, 0) {
    Some(t) => t,
    None => panic!("invalid session open"),
};

const NSE_CLOSE: NaiveTime = match NaiveTime::from_hms_opt(15, 30, 0) {
    Some(t) => t,
    None => panic!("invalid session close"),
};

impl Default for SessionHours {
    fn default() -> Self {
        Self {
            open: NSE_OPEN,
            close: NSE_CLOSE,
        }
    }
}

impl SessionHours {
    /// Open..close of the most recent business day before `now`'s date.
    pub fn previous_session(&self, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        let day = previous_business_day(now.date());
        (day.and_time(self.open), day.and_time(self.close))
    }

    /// Today's open up to `now`, clamped to the close.
    pub fn current_session(&self, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        let day = now.date();
        let close = day.and_time(self.close);
        (day.and_time(self.open), now.min(close))
    }
}

/// serde helpers for `HH:MM` session times in TOML.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn parse(s: &str) -> Result<NaiveDateTime, TimestampError> {
        parse_exchange_timestamp(s, DEFAULT_EXCHANGE_TZ)
    }

    #[test]
    fn offset_timestamps_land_in_exchange_time() {
        let ist = parse("2025-08-13T09:15:00+05:30").unwrap();
        let utc = parse("2025-08-13T03:45:00Z").unwrap();
        assert_eq!(ist, at(2025, 8, 13, 9, 15));
        assert_eq!(utc, ist);
    }

    #[test]
    fn naive_spellings_are_taken_as_local() {
        for s in [
            "2025-08-13T09:15:00",
            "2025-08-13 09:15:00",
            "2025-08-13 09:15",
            "2025-08-13T09:15",
        ] {
            assert_eq!(parse(s).unwrap(), at(2025, 8, 13, 9, 15), "{s}");
        }
        assert_eq!(parse("2025-08-13").unwrap(), at(2025, 8, 13, 0, 0));
    }

    #[test]
    fn local_parsing_refuses_offsets() {
        let local = parse_local_timestamp("2025-08-13T09:15").unwrap();
        assert_eq!(local, at(2025, 8, 13, 9, 15));
        assert!(parse_local_timestamp("2025-08-13T03:45:00Z").is_err());
        assert!(parse_local_timestamp("2025-08-13T09:15:00+05:30").is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let err = parse("yesterday").unwrap_err();
        assert_eq!(err, TimestampError("yesterday".into()));
    }

    #[test]
    fn iso_rendering_round_trips() {
        let ts = at(2025, 8, 13, 9, 15);
        let s = format_iso(ts);
        assert_eq!(s, "2025-08-13T09:15:00");
        assert_eq!(parse(&s).unwrap(), ts);
        assert_eq!(format_broker(ts), "2025-08-13 09:15");
    }

    #[test]
    fn previous_business_day_skips_weekends() {
        // 2025-08-18 is a Monday.
        let monday = NaiveDate::from_ymd_opt(2025, 8, 18).unwrap();
        assert_eq!(
            previous_business_day(monday),
            NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()
        );
        let sunday = NaiveDate::from_ymd_opt(2025, 8, 17).unwrap();
        assert_eq!(
            previous_business_day(sunday),
            NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()
        );
        let wednesday = NaiveDate::from_ymd_opt(2025, 8, 13).unwrap();
        assert_eq!(
            previous_business_day(wednesday),
            NaiveDate::from_ymd_opt(2025, 8, 12).unwrap()
        );
    }

    #[test]
    fn session_windows() {
        let hours = SessionHours::default();
        let now = at(2025, 8, 18, 11, 2);
        assert_eq!(
            hours.previous_session(now),
            (at(2025, 8, 15, 9, 15), at(2025, 8, 15, 15, 30))
        );
        assert_eq!(hours.current_session(now), (at(2025, 8, 18, 9, 15), now));

        let (_, to) = hours.current_session(at(2025, 8, 18, 18, 0));
        assert_eq!(to, at(2025, 8, 18, 15, 30));
    }
}
