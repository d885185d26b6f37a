//! ## churnsim-cli
//! **Command-line entry point for churn simulations**
//!
//! - `churnsim simulate`: runs a churn simulation and prints its summary and digest
//! - `churnsim config`: prints the effective configuration

use clap::Parser;

mod commands;
mod error;

use commands::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::run_command(cli)
}
