//! Multi-timeframe Smart Money Concepts snapshots.
//!
//! Raw broker candles flow through [`normalize`], get annotated by [`annotate`] using the
//! detectors in [`smc`], and are assembled per timeframe by [`aggregate`] into one
//! [`Payload`](models::payload::Payload) that [`io::sink`] serializes.

pub mod aggregate;
pub mod annotate;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod exchange_time;
pub mod io;
pub mod models;
pub mod normalize;
pub mod providers;
pub mod smc;
