//! Command-line surface for the `smc-snapshot` binary.

pub mod commands;
pub mod params;
