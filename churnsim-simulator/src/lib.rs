// churnsim-simulator/src/lib.rs

/*!
# churnsim Simulator

Deterministic node-churn runs over virtual time. A run builds the topology,
binds every eligible node's device, and lets the churn scheduler take nodes
out of and back into service while the event queue advances the clock.

## Key Components:
- **Topology:** one device per node, owned here, referenced weakly by churn.
- **Churn Model:** two uniform draws per node mapped to a churn probability.
- **Churn Scheduler:** per-epoch passes, optional recurrence, all-or-nothing device updates.
- **Run Digest:** BLAKE3 over every churn decision, for replay checks.
*/

use std::time::Duration;

use tracing::info;

use churnsim_config::{ChurnMode, ChurnsimConfig};
use churnsim_core::device::DeviceList;
use churnsim_core::time::EventQueue;
use churnsim_core::SimulationError;
use churnsim_telemetry::MetricsRecorder;

pub mod churn;
pub mod topology;

pub use churn::{ChurnScheduler, PassReport, PassSummary, SharedChurnScheduler, StopHandle};
pub use topology::Topology;

/// What a finished run reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Churn passes executed, the start-up pass included.
    pub passes: usize,
    /// Re-arm invocations the event queue delivered.
    pub rearms_delivered: u64,
    /// Eligible nodes churned out at the end of the run.
    pub churned_nodes: usize,
    /// Nodes whose device was enabled at the end of the run.
    pub enabled_nodes: usize,
    /// Tasks still queued at the horizon.
    pub pending_tasks: usize,
    pub stopped_at: Duration,
    /// Hex BLAKE3 digest of every churn decision.
    pub digest: String,
}

/// Ties the topology, the churn scheduler and the event queue together.
pub struct Simulator {
    queue: EventQueue,
    topology: Topology,
    churn: SharedChurnScheduler,
    total_time: Duration,
    started: bool,
}

impl Simulator {
    /// Builds a run from a validated configuration.
    pub fn from_config(
        config: &ChurnsimConfig,
        metrics: Option<MetricsRecorder>,
    ) -> Result<Self, SimulationError> {
        let topology = Topology::build(&config.topology);
        Self::with_topology(config, topology, metrics)
    }

    /// Same as [`Simulator::from_config`] over a prebuilt topology. The
    /// topology's node count wins over `config.topology.node_count`.
    pub fn with_topology(
        config: &ChurnsimConfig,
        topology: Topology,
        metrics: Option<MetricsRecorder>,
    ) -> Result<Self, SimulationError> {
        let total_time = config.simulation.total_time().ok_or_else(|| {
            SimulationError::Config(format!(
                "total time must be a positive number of seconds, got {}",
                config.simulation.total_time_secs
            ))
        })?;

        let node_count = topology.node_count();
        let devices = match config.churn.mode {
            ChurnMode::Off => DeviceList::new(),
            ChurnMode::StaticOnce | ChurnMode::DynamicRecurring => {
                topology.device_list(config.churn.exclusion_count..node_count)?
            }
        };

        let mut churn =
            ChurnScheduler::new(&config.churn, config.simulation.seed, node_count, devices)?;
        if let Some(metrics) = metrics {
            churn = churn.with_metrics(metrics);
        }

        Ok(Self {
            queue: EventQueue::new(),
            topology,
            churn: churn.into_shared(),
            total_time,
            started: false,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn churn(&self) -> &SharedChurnScheduler {
        &self.churn
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.churn.lock().stop_handle()
    }

    /// Starts churn at virtual time zero and drives the event queue to the
    /// configured horizon. A simulator runs once.
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        if self.started {
            return Err(SimulationError::Config("simulation already ran".into()));
        }
        self.started = true;

        info!(
            nodes = self.topology.node_count(),
            total_time_secs = self.total_time.as_secs_f64(),
            "Starting simulation"
        );
        ChurnScheduler::start(&self.churn, &mut self.queue)?;
        let stats = self.queue.run_until(self.total_time)?;

        let churn = self.churn.lock();
        let summary = RunSummary {
            passes: churn.passes(),
            rearms_delivered: churn.rearms_delivered(),
            churned_nodes: churn.churned_nodes(),
            enabled_nodes: self.topology.enabled_nodes(),
            pending_tasks: stats.pending,
            stopped_at: stats.stopped_at,
            digest: churn.digest(),
        };
        info!(
            passes = summary.passes,
            churned_nodes = summary.churned_nodes,
            digest = %summary.digest,
            "Simulation finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_runs_without_churn() {
        let mut simulator = Simulator::from_config(&ChurnsimConfig::default(), None).unwrap();
        let summary = simulator.run().unwrap();
        assert_eq!(summary.passes, 0);
        assert_eq!(summary.enabled_nodes, 10);
        assert_eq!(summary.stopped_at, Duration::from_secs(600));
    }

    #[test]
    fn second_run_is_refused() {
        let mut simulator = Simulator::from_config(&ChurnsimConfig::default(), None).unwrap();
        simulator.run().unwrap();
        assert!(matches!(simulator.run(), Err(SimulationError::Config(_))));
    }
}
