//! Codebox CLI
//!
//! Runs the codebox service and manages its configuration.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use clap::Parser;
use codebox_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    codebox_cli::run(Cli::parse()).await
}
