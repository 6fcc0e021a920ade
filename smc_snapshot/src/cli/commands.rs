use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the run config (smc_snapshot.toml)
    #[arg(short, long, default_value = "smc_snapshot.toml")]
    pub config: PathBuf,

    /// One-time login code; overrides TOTP and TOTP_SECRET from the environment
    #[arg(long)]
    pub totp: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the multi-timeframe SMC payload for the configured symbol
    Snapshot {
        /// Write the payload here instead of the configured output path
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print the payload to stdout instead of writing a file
        #[arg(long, conflicts_with = "out")]
        stdout: bool,
    },

    /// Fetch raw candle rows for one window and print them as JSON
    Candles {
        /// Broker instrument token (e.g. "99926000")
        #[arg(long)]
        token: String,

        /// Exchange segment
        #[arg(long, default_value = "NSE")]
        exchange: String,

        /// Interval, short ("5m") or broker form ("FIVE_MINUTE")
        #[arg(long, default_value = "5m")]
        interval: String,

        /// Window start, exchange-local (e.g. "2025-08-13 09:15")
        #[arg(long)]
        from: String,

        /// Window end, exchange-local (e.g. "2025-08-13 15:30")
        #[arg(long)]
        to: String,

        /// Normalize rows into candles before printing
        #[arg(long)]
        normalize: bool,
    },

    /// Print the account's holdings as JSON
    Holdings,
}
