//! JSON rendering of payloads.
//!
//! Timestamps serialize through [`iso_timestamp`] / [`iso_timestamp_opt`] so that no
//! date-time ever reaches the output as anything but an ISO-8601 string. Non-finite floats
//! come out as `null` (serde_json's behavior), which keeps the document valid JSON.

use serde::Serialize;
use snafu::ResultExt;

use crate::io::sink::{SerializeSnafu, SinkError};

/// `#[serde(with = "iso_timestamp")]` for `NaiveDateTime` fields.
pub mod iso_timestamp {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    use crate::exchange_time::ISO_FORMAT;

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(ISO_FORMAT))
    }
}

/// `#[serde(with = "iso_timestamp_opt")]` for `Option<NaiveDateTime>` fields; `None` is `null`.
pub mod iso_timestamp_opt {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    use crate::exchange_time::ISO_FORMAT;

    pub fn serialize<S: Serializer>(ts: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.collect_str(&ts.format(ISO_FORMAT)),
            None => s.serialize_none(),
        }
    }
}

/// Convert any payload fragment into a JSON tree.
pub fn to_json_value<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value, SinkError> {
    serde_json::to_value(value).context(SerializeSnafu)
}

/// Human-readable (2-space indented) JSON; key order follows struct and map insertion order.
///
/// This is the body handed back when the payload is served rather than written to disk.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String, SinkError> {
    serde_json::to_string_pretty(value).context(SerializeSnafu)
}
