use chrono::Duration;
use serial_test::serial;
use smc_snapshot::exchange_time::{DEFAULT_EXCHANGE_TZ, now_in};
use smc_snapshot::models::interval::Interval;
use smc_snapshot::models::request_params::CandleRequest;
use smc_snapshot::normalize::normalize_value;
use smc_snapshot::providers::smartapi::{SmartApiProvider, SmartApiSettings};
use smc_snapshot::providers::{BrokerSession, CandleSource, SessionProvider};

#[tokio::test]
#[serial]
#[ignore]
async fn test_smartapi_session_fetches_daily_candles() {
    dotenvy::dotenv().ok();
    // Needs API_KEY, CLIENT_ID, MPIN and TOTP_SECRET (or a fresh TOTP) in the environment.
    let missing = |name: &str| std::env::var(name).is_err();
    if ["API_KEY", "CLIENT_ID", "MPIN"].into_iter().any(missing)
        || (missing("TOTP") && missing("TOTP_SECRET"))
    {
        println!("Skipping test_smartapi_session_fetches_daily_candles: credentials not set.");
        return;
    }

    let provider = SmartApiProvider::from_env(None, &SmartApiSettings::default())
        .expect("Failed to create SmartApiProvider");
    let session = provider.login().await.expect("login failed");

    let now = now_in(DEFAULT_EXCHANGE_TZ);
    let request = CandleRequest {
        symbol_token: "99926000".to_string(),
        exchange: "NSE".to_string(),
        interval: Interval::OneDay,
        from: now - Duration::days(10),
        to: now,
    };
    let raw = session.fetch_candles(&request).await;
    let _ = session.logout().await;

    let raw = raw.expect("fetch_candles returned an error");
    let normalized = normalize_value(&raw, "NIFTY", Interval::OneDay, DEFAULT_EXCHANGE_TZ)
        .expect("candle data was not an array");
    assert!(
        normalized.rejected.is_empty(),
        "rejected rows: {:?}",
        normalized.rejected
    );
    assert!(
        !normalized.series.is_empty(),
        "Expected at least one daily candle for NIFTY"
    );

    let candles = &normalized.series.candles;
    assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}
