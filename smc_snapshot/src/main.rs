use std::path::Path;

use anyhow::Context;
use chrono_tz::Tz;
use clap::Parser;
use smc_snapshot::aggregate::Aggregator;
use smc_snapshot::annotate::SmcAdapter;
use smc_snapshot::cli::commands::{Cli, Commands};
use smc_snapshot::cli::params::parse_candle_request;
use smc_snapshot::config::{AppConfig, BrokerConfig};
use smc_snapshot::exchange_time::now_in;
use smc_snapshot::io::json::to_json_string;
use smc_snapshot::io::sink::{JsonFileSink, PayloadSink, ResponseBodySink};
use smc_snapshot::normalize::normalize_value;
use smc_snapshot::providers::smartapi::{SmartApiProvider, SmartApiSession};
use smc_snapshot::providers::{BrokerSession, CandleSource, SessionProvider};
use smc_snapshot::smc::SmcEngine;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // candles/holdings work without a run config
    let config = match &cli.command {
        Commands::Snapshot { .. } => Some(AppConfig::load(&cli.config)?),
        _ if cli.config.exists() => Some(AppConfig::load(&cli.config)?),
        _ => None,
    };
    let broker = config
        .as_ref()
        .map(|c| c.broker.clone())
        .unwrap_or_default();

    let provider = SmartApiProvider::from_env(cli.totp.clone(), &broker.smartapi_settings())
        .context("failed to set up the SmartAPI client")?;
    let session = provider.login().await.context("login failed")?;

    let result = dispatch(&cli.command, config.as_ref(), &broker, &session).await;

    if let Err(e) = session.logout().await {
        warn!(error = %e, "logout failed");
    }
    result
}

async fn dispatch(
    command: &Commands,
    config: Option<&AppConfig>,
    broker: &BrokerConfig,
    session: &SmartApiSession,
) -> anyhow::Result<()> {
    match command {
        Commands::Snapshot { out, stdout } => {
            let config = config.context("snapshot needs a config file")?;
            let path = out.as_deref().unwrap_or(&config.output.path);
            snapshot(config, session, path, *stdout).await
        }

        Commands::Candles {
            token,
            exchange,
            interval,
            from,
            to,
            normalize,
        } => {
            let tz: Tz = broker.timezone;
            let request = parse_candle_request(token, exchange, interval, from, to, tz)?;
            let raw = session.fetch_candles(&request).await?;
            let body = if *normalize {
                let normalized = normalize_value(&raw, token, request.interval, tz)?;
                if !normalized.rejected.is_empty() {
                    let rejected = normalized.rejected.len();
                    warn!(rejected, "some rows were skipped");
                }
                to_json_string(&normalized.series.candles)?
            } else {
                to_json_string(&raw)?
            };
            println!("{body}");
            Ok(())
        }

        Commands::Holdings => {
            let holdings = session.holdings().await?;
            println!("{}", to_json_string(&holdings)?);
            Ok(())
        }
    }
}

async fn snapshot(
    config: &AppConfig,
    session: &SmartApiSession,
    path: &Path,
    stdout: bool,
) -> anyhow::Result<()> {
    let tz = config.broker.timezone;
    let aggregator = Aggregator::new(SmcAdapter::new(SmcEngine, config.analysis))
        .with_session_hours(config.session)
        .with_timezone(tz)
        .require_candles(config.require_candles);

    let run = aggregator
        .run(session, &config.symbol, &config.timeframes, now_in(tz))
        .await;

    if stdout {
        println!("{}", ResponseBodySink.write(&run.payload).await?);
    } else {
        let written = JsonFileSink::new(path).write(&run.payload).await?;
        println!("{}", written.display());
    }

    info!(
        symbol = %config.symbol.label,
        succeeded = run.payload.timeframes.len(),
        failed = run.failures.len(),
        "snapshot done"
    );
    // summary on stderr so stdout stays machine-readable
    eprintln!(
        "SUMMARY: {} succeeded, {} failed",
        run.payload.timeframes.len(),
        run.failures.len()
    );
    for failure in &run.failures {
        eprintln!("ERROR: {} - {}", failure.key, failure.error);
    }
    Ok(())
}
