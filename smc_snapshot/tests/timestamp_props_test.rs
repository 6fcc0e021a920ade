use chrono::{DateTime, Duration, NaiveDateTime};
use proptest::prelude::*;
use smc_snapshot::exchange_time::{
    DEFAULT_EXCHANGE_TZ, format_broker, format_iso, parse_exchange_timestamp,
};

// 2000-01-01 .. 2040-01-01, whole seconds
fn exchange_local() -> impl Strategy<Value = NaiveDateTime> {
    (946_684_800i64..2_208_988_800i64).prop_map(|secs| {
        DateTime::from_timestamp(secs, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or_default()
    })
}

proptest! {
    #[test]
    fn iso_rendering_parses_back(ts in exchange_local()) {
        let text = format_iso(ts);
        prop_assert_eq!(parse_exchange_timestamp(&text, DEFAULT_EXCHANGE_TZ).unwrap(), ts);
    }

    #[test]
    fn offsets_are_folded_into_exchange_time(ts in exchange_local()) {
        let with_offset = format!("{}+05:30", ts.format("%Y-%m-%dT%H:%M:%S"));
        prop_assert_eq!(parse_exchange_timestamp(&with_offset, DEFAULT_EXCHANGE_TZ).unwrap(), ts);

        let utc = ts - Duration::minutes(330);
        let zulu = format!("{}Z", utc.format("%Y-%m-%dT%H:%M:%S"));
        prop_assert_eq!(parse_exchange_timestamp(&zulu, DEFAULT_EXCHANGE_TZ).unwrap(), ts);
    }

    #[test]
    fn broker_rendering_keeps_the_minute(ts in exchange_local()) {
        let text = format_broker(ts);
        let back = parse_exchange_timestamp(&text, DEFAULT_EXCHANGE_TZ).unwrap();
        prop_assert!(back <= ts);
        prop_assert!(ts - back < Duration::minutes(1));
    }
}
