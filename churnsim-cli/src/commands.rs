use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use churnsim_config::{ChurnMode, ChurnsimConfig, ConfigError, DeviceType, ReseedPolicy};
use churnsim_simulator::Simulator;
use churnsim_telemetry::{EventLogger, MetricsRecorder};

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "churnsim", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a churn simulation over virtual time
    Simulate(SimulateArgs),
    /// Print the effective configuration as YAML
    Config(ConfigArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChurnArg {
    #[value(alias = "0")]
    Off,
    #[value(alias = "1")]
    Static,
    #[value(alias = "2")]
    Dynamic,
}

impl From<ChurnArg> for ChurnMode {
    fn from(arg: ChurnArg) -> Self {
        match arg {
            ChurnArg::Off => ChurnMode::Off,
            ChurnArg::Static => ChurnMode::StaticOnce,
            ChurnArg::Dynamic => ChurnMode::DynamicRecurring,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DeviceArg {
    Csma,
    Wifi,
    Loopback,
}

impl From<DeviceArg> for DeviceType {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Csma => DeviceType::Csma,
            DeviceArg::Wifi => DeviceType::Wifi,
            DeviceArg::Loopback => DeviceType::Loopback,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReseedArg {
    Once,
    #[value(alias = "per_epoch")]
    PerEpoch,
    #[value(alias = "wall_clock")]
    WallClock,
}

impl From<ReseedArg> for ReseedPolicy {
    fn from(arg: ReseedArg) -> Self {
        match arg {
            ReseedArg::Once => ReseedPolicy::Once,
            ReseedArg::PerEpoch => ReseedPolicy::PerEpoch,
            ReseedArg::WallClock => ReseedPolicy::WallClock,
        }
    }
}

/// Overrides applied on top of the loaded configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Configuration file; without it `config/churnsim.yaml` and
    /// `config/<CHURNSIM_ENV>.yaml` are used when present
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Total number of nodes
    #[arg(long)]
    pub num_nodes: Option<usize>,
    /// Leading nodes exempt from churn (servers, attackers, monitors)
    #[arg(long)]
    pub none_devs_nodes: Option<usize>,
    /// Virtual run length in seconds
    #[arg(long)]
    pub total_time: Option<f64>,
    #[arg(long, value_enum)]
    pub churn: Option<ChurnArg>,
    #[arg(long, value_enum)]
    pub device: Option<DeviceArg>,
    /// Seconds between passes in dynamic mode
    #[arg(long)]
    pub interval: Option<f64>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long, value_enum)]
    pub reseed: Option<ReseedArg>,
}

impl ConfigOverrides {
    /// Loads the configuration, applies the overrides and validates the result.
    pub fn resolve(&self) -> Result<ChurnsimConfig, ConfigError> {
        let config = match &self.config {
            Some(path) => ChurnsimConfig::load_from_path(path)?,
            None => ChurnsimConfig::load()?,
        };
        self.apply(config).validated()
    }

    pub fn apply(&self, mut config: ChurnsimConfig) -> ChurnsimConfig {
        if let Some(num_nodes) = self.num_nodes {
            config.topology.node_count = num_nodes;
        }
        if let Some(exempt) = self.none_devs_nodes {
            config.churn.exclusion_count = exempt;
        }
        if let Some(total_time) = self.total_time {
            config.simulation.total_time_secs = total_time;
        }
        if let Some(churn) = self.churn {
            config.churn.mode = churn.into();
        }
        if let Some(device) = self.device {
            config.topology.device = device.into();
        }
        if let Some(interval) = self.interval {
            config.churn.interval_secs = interval;
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = seed;
        }
        if let Some(reseed) = self.reseed {
            config.churn.reseed = reseed.into();
        }
        config
    }
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrides,
    /// Expected run digest; a mismatch fails the command
    #[arg(long)]
    pub validate_hash: Option<String>,
    /// Print Prometheus metrics when the run ends
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Simulate(args) => run_simulation_mode(args),
        Commands::Config(args) => print_config(args),
    }
}

fn run_simulation_mode(args: SimulateArgs) -> anyhow::Result<()> {
    let config = args.overrides.resolve().context("Invalid configuration")?;
    EventLogger::init(&config.telemetry.log_level);

    let metrics = if args.metrics || config.telemetry.metrics {
        Some(MetricsRecorder::new()?)
    } else {
        None
    };

    let mut simulator = Simulator::from_config(&config, metrics.clone())?;
    let summary = simulator.run()?;
    info!("Simulation complete. State hash: {}", summary.digest);

    println!(
        "passes={} rearms={} churned_nodes={} enabled_nodes={} stopped_at={:.1}s",
        summary.passes,
        summary.rearms_delivered,
        summary.churned_nodes,
        summary.enabled_nodes,
        summary.stopped_at.as_secs_f64()
    );
    println!("digest={}", summary.digest);

    if let Some(metrics) = metrics {
        print!("{}", metrics.gather_metrics()?);
    }

    if let Some(expected) = args.validate_hash {
        if !expected.eq_ignore_ascii_case(&summary.digest) {
            return Err(CliError::HashMismatch {
                expected,
                actual: summary.digest,
            }
            .into());
        }
    }
    Ok(())
}

fn print_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = args.overrides.resolve().context("Invalid configuration")?;
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}
