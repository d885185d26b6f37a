//! ## churnsim-simulator::churn::scheduler
//! **Churn epochs over virtual time**
//!
//! A [`ChurnScheduler`] owns the per-node churn flags, the random source and
//! the device handles of every eligible node. Each pass walks the eligible
//! nodes in index order, applies the model decision to the device and keeps
//! a [`PassReport`].
//!
//! In dynamic mode the scheduler re-arms itself on the host [`Scheduler`]
//! after every completed pass. The pending task holds a clone of the shared
//! handle, so the host and the recurrence see the same state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use blake3::Hasher;
use parking_lot::Mutex;
use tracing::{debug, info, info_span, warn};

use churnsim_config::{ChurnConfig, ChurnMode, ReseedPolicy};
use churnsim_core::device::{DeviceAvailability, DeviceList};
use churnsim_core::network::DeviceError;
use churnsim_core::random::{RandomSource, SeededRandomSource};
use churnsim_core::time::Scheduler;
use churnsim_core::SimulationError;
use churnsim_telemetry::MetricsRecorder;

use super::model::{ChurnDecision, ChurnModel};
use super::state::ChurnState;

/// Scheduler shared between the host and its own pending re-arm.
pub type SharedChurnScheduler = Arc<Mutex<ChurnScheduler>>;

/// Cooperative cancellation for the recurring pass.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Available to churned out.
    ChurnedOut,
    /// Churned out back to available.
    Restored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    pub node: usize,
    pub decision: ChurnDecision,
    pub transition: Option<Transition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    /// Zero-based pass number.
    pub epoch: u64,
    pub time: Duration,
    pub nodes: Vec<NodeReport>,
    /// Eligible nodes churned out once the pass completed.
    pub churned_nodes: usize,
}

impl PassReport {
    pub fn node(&self, node: usize) -> Option<&NodeReport> {
        self.nodes.iter().find(|report| report.node == node)
    }

    pub fn transitions(&self, kind: Transition) -> usize {
        self.nodes
            .iter()
            .filter(|report| report.transition == Some(kind))
            .count()
    }
}

/// Per-pass counts, kept for every pass of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub epoch: u64,
    pub time: Duration,
    pub evaluated: usize,
    pub churned_out: usize,
    pub restored: usize,
    pub churned_nodes: usize,
}

impl From<&PassReport> for PassSummary {
    fn from(report: &PassReport) -> Self {
        Self {
            epoch: report.epoch,
            time: report.time,
            evaluated: report.nodes.len(),
            churned_out: report.transitions(Transition::ChurnedOut),
            restored: report.transitions(Transition::Restored),
            churned_nodes: report.churned_nodes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceAction {
    Disable,
    Enable,
}

impl DeviceAction {
    fn apply(self, device: &dyn DeviceAvailability) -> Result<(), DeviceError> {
        match self {
            DeviceAction::Disable => device.disable(),
            DeviceAction::Enable => device.enable(),
        }
    }

    fn reverse(self) -> Self {
        match self {
            DeviceAction::Disable => DeviceAction::Enable,
            DeviceAction::Enable => DeviceAction::Disable,
        }
    }
}

/// A node decision not yet committed to state.
struct StagedNode {
    report: NodeReport,
    device: Arc<dyn DeviceAvailability>,
    action: Option<DeviceAction>,
}

pub struct ChurnScheduler {
    mode: ChurnMode,
    interval: Duration,
    exclusion_count: usize,
    node_count: usize,
    reseed: ReseedPolicy,
    seed: u64,
    model: ChurnModel,
    rng: Box<dyn RandomSource>,
    state: ChurnState,
    devices: DeviceList,
    stop: StopHandle,
    rearms_delivered: u64,
    summaries: Vec<PassSummary>,
    last_report: Option<PassReport>,
    digest: Hasher,
    metrics: Option<MetricsRecorder>,
}

impl ChurnScheduler {
    /// Builds a scheduler over nodes `[0, node_count)` seeded from `seed`.
    ///
    /// # Errors
    /// `InvalidInterval` for a non-positive epoch interval and
    /// `EmptyEligibleRange` when churn is requested but every node is exempt.
    pub fn new(
        config: &ChurnConfig,
        seed: u64,
        node_count: usize,
        devices: DeviceList,
    ) -> Result<Self, SimulationError> {
        let interval = config
            .interval()
            .ok_or(SimulationError::InvalidInterval(config.interval_secs))?;

        if config.mode != ChurnMode::Off && config.exclusion_count >= node_count {
            return Err(SimulationError::EmptyEligibleRange {
                exclusion_count: config.exclusion_count,
                node_count,
            });
        }

        debug!(
            mode = ?config.mode,
            interval_secs = interval.as_secs_f64(),
            exclusion_count = config.exclusion_count,
            node_count,
            reseed = ?config.reseed,
            "Churn scheduler configured"
        );

        Ok(Self {
            mode: config.mode,
            interval,
            exclusion_count: config.exclusion_count,
            node_count,
            reseed: config.reseed,
            seed,
            model: ChurnModel::from_config(config),
            rng: Box::new(SeededRandomSource::new(seed)),
            state: ChurnState::new(node_count),
            devices,
            stop: StopHandle::new(),
            rearms_delivered: 0,
            summaries: Vec::new(),
            last_report: None,
            digest: Hasher::new(),
            metrics: None,
        })
    }

    /// Replaces the seeded ChaCha source, e.g. with a scripted one.
    pub fn with_random_source(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn into_shared(self) -> SharedChurnScheduler {
        Arc::new(Mutex::new(self))
    }

    pub fn mode(&self) -> ChurnMode {
        self.mode
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Nodes `[exclusion_count, node_count)`.
    pub fn eligible(&self) -> std::ops::Range<usize> {
        self.exclusion_count..self.node_count
    }

    pub fn state(&self) -> &ChurnState {
        &self.state
    }

    /// Counts for every completed pass, oldest first.
    pub fn summaries(&self) -> &[PassSummary] {
        &self.summaries
    }

    /// Per-node records of the most recent completed pass.
    pub fn last_report(&self) -> Option<&PassReport> {
        self.last_report.as_ref()
    }

    pub fn passes(&self) -> usize {
        self.summaries.len()
    }

    /// Re-arm invocations the host delivered, including ignored ones.
    pub fn rearms_delivered(&self) -> u64 {
        self.rearms_delivered
    }

    pub fn churned_nodes(&self) -> usize {
        self.state.count_churned(self.eligible())
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// BLAKE3 over every diagnostic record so far, hex encoded.
    pub fn digest(&self) -> String {
        hex::encode(self.digest.finalize().as_bytes())
    }

    /// Runs one churn epoch at virtual time `now`.
    ///
    /// Every eligible device is resolved before anything changes, so a missing
    /// device leaves state, devices and the random source untouched. Decisions
    /// are staged and applied to devices in node order; if a device refuses,
    /// the devices already switched are switched back and nothing is committed
    /// (the draws stay consumed).
    pub fn run_pass(&mut self, now: Duration) -> Result<&PassReport, SimulationError> {
        let epoch = self.summaries.len() as u64;
        let _pass = info_span!("churn_pass", epoch).entered();

        let devices = self
            .eligible()
            .map(|node| self.devices.resolve(node))
            .collect::<Result<Vec<_>, _>>()?;

        if self.reseed == ReseedPolicy::PerEpoch {
            self.rng.reseed(self.seed, epoch);
        }

        let time = now.as_secs_f64();
        let mut staged = Vec::with_capacity(devices.len());

        for (node, device) in self.eligible().zip(devices) {
            if self.reseed == ReseedPolicy::WallClock {
                let second = wall_clock_second();
                self.rng.reseed(second, second);
            }

            let decision = self.model.decide(self.rng.as_mut());
            let sample = decision.sample;
            info!(
                time,
                node,
                q = sample.q,
                e = sample.e,
                availability = sample.availability,
                pressure = sample.pressure,
                p = sample.probability,
                "churn evaluation"
            );

            let was_churned = self.state.is_churned(node);
            let (transition, action) = if decision.churned_out {
                (
                    (!was_churned).then_some(Transition::ChurnedOut),
                    device.is_enabled().then_some(DeviceAction::Disable),
                )
            } else if was_churned {
                (
                    Some(Transition::Restored),
                    (!device.is_enabled()).then_some(DeviceAction::Enable),
                )
            } else {
                (None, None)
            };

            staged.push(StagedNode {
                report: NodeReport {
                    node,
                    decision,
                    transition,
                },
                device,
                action,
            });
        }

        apply_device_actions(time, &staged)?;

        for entry in &staged {
            let report = &entry.report;
            match report.transition {
                Some(Transition::ChurnedOut) => {
                    self.state.set(report.node, true);
                }
                Some(Transition::Restored) => {
                    self.state.set(report.node, false);
                }
                None => {}
            }
            self.record_digest(epoch, report.node, &report.decision);
            if let Some(metrics) = &self.metrics {
                metrics.record_evaluation(report.decision.sample.probability);
            }
        }

        let report = PassReport {
            epoch,
            time: now,
            nodes: staged.into_iter().map(|entry| entry.report).collect(),
            churned_nodes: self.churned_nodes(),
        };
        let summary = PassSummary::from(&report);
        info!(
            time,
            epoch,
            churned_nodes = summary.churned_nodes,
            eligible = summary.evaluated,
            "churn pass complete"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_pass(summary.churned_nodes, summary.churned_out, summary.restored);
        }

        self.summaries.push(summary);
        Ok(&*self.last_report.insert(report))
    }

    /// Runs the start-up pass for the configured mode and, in dynamic mode,
    /// arms the recurrence on `host`.
    pub fn start(
        handle: &SharedChurnScheduler,
        host: &mut dyn Scheduler,
    ) -> Result<(), SimulationError> {
        let mode = handle.lock().mode;
        match mode {
            ChurnMode::Off => {
                info!("Churn disabled");
                Ok(())
            }
            ChurnMode::StaticOnce | ChurnMode::DynamicRecurring => {
                info!(?mode, "Starting churn");
                Self::fire(handle, host)
            }
        }
    }

    fn fire(handle: &SharedChurnScheduler, host: &mut dyn Scheduler) -> Result<(), SimulationError> {
        let rearm = {
            let mut churn = handle.lock();
            if churn.stop.is_stop_requested() {
                debug!(time = host.now_secs(), "Churn stopped, pass skipped");
                return Ok(());
            }
            churn.run_pass(host.now())?;
            churn.next_rearm()
        };

        if let Some(interval) = rearm {
            let next = Arc::clone(handle);
            host.schedule_after(
                interval,
                Box::new(move |host: &mut dyn Scheduler| {
                    next.lock().rearms_delivered += 1;
                    Self::fire(&next, host)
                }),
            );
        }
        Ok(())
    }

    fn next_rearm(&self) -> Option<Duration> {
        (self.mode == ChurnMode::DynamicRecurring && !self.stop.is_stop_requested())
            .then_some(self.interval)
    }

    fn record_digest(&mut self, epoch: u64, node: usize, decision: &ChurnDecision) {
        self.digest.update(&epoch.to_le_bytes());
        self.digest.update(&(node as u64).to_le_bytes());
        self.digest.update(&decision.sample.q.to_le_bytes());
        self.digest.update(&decision.sample.e.to_le_bytes());
        self.digest.update(&[u8::from(decision.churned_out)]);
    }
}

/// Applies staged device calls in node order. On the first refusal the calls
/// already made are reversed, newest first.
fn apply_device_actions(time: f64, staged: &[StagedNode]) -> Result<(), SimulationError> {
    for (index, entry) in staged.iter().enumerate() {
        let Some(action) = entry.action else {
            continue;
        };
        let node = entry.report.node;
        if let Err(source) = action.apply(&*entry.device) {
            warn!(time, node, %source, "Device rejected transition, rolling back pass");
            for applied in staged[..index].iter().rev() {
                if let Some(action) = applied.action {
                    if let Err(undo) = action.reverse().apply(&*applied.device) {
                        warn!(node = applied.report.node, %undo, "Rollback failed");
                    }
                }
            }
            return Err(SimulationError::Device { node, source });
        }
        match action {
            DeviceAction::Disable => debug!(time, node, kind = %entry.device.kind(), "Device disabled"),
            DeviceAction::Enable => debug!(time, node, kind = %entry.device.kind(), "Device enabled"),
        }
    }
    Ok(())
}

fn wall_clock_second() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use churnsim_core::device::{DeviceAvailability, DeviceHandle};
    use churnsim_core::network::CsmaNetDevice;
    use churnsim_core::random::ScriptedRandomSource;
    use churnsim_core::time::EventQueue;

    fn config(mode: ChurnMode, exclusion_count: usize) -> ChurnConfig {
        ChurnConfig {
            mode,
            exclusion_count,
            ..ChurnConfig::default()
        }
    }

    fn wired(node_count: usize) -> (Vec<Arc<dyn DeviceAvailability>>, DeviceList) {
        let devices: Vec<Arc<dyn DeviceAvailability>> = (0..node_count)
            .map(|_| Arc::new(CsmaNetDevice::new()) as Arc<dyn DeviceAvailability>)
            .collect();
        let list = devices.iter().map(DeviceHandle::from_device).collect();
        (devices, list)
    }

    #[test]
    fn rejects_non_positive_interval() {
        let mut cfg = config(ChurnMode::DynamicRecurring, 1);
        cfg.interval_secs = 0.0;
        let (_devices, list) = wired(3);
        let err = ChurnScheduler::new(&cfg, 1, 3, list).err().unwrap();
        assert!(matches!(err, SimulationError::InvalidInterval(i) if i == 0.0));
    }

    #[test]
    fn rejects_empty_eligible_range_only_when_churning() {
        let (_devices, list) = wired(2);
        let err = ChurnScheduler::new(&config(ChurnMode::StaticOnce, 2), 1, 2, list.clone())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SimulationError::EmptyEligibleRange {
                exclusion_count: 2,
                node_count: 2
            }
        ));
        assert!(ChurnScheduler::new(&config(ChurnMode::Off, 2), 1, 2, list).is_ok());
    }

    #[test]
    fn pass_evaluates_only_eligible_nodes_in_order() {
        let (devices, list) = wired(5);
        let mut churn = ChurnScheduler::new(&config(ChurnMode::StaticOnce, 2), 7, 5, list)
            .unwrap()
            .with_random_source(Box::new(ScriptedRandomSource::new(vec![0.1, 0.1])));

        let report = churn.run_pass(Duration::ZERO).unwrap();
        let visited: Vec<usize> = report.nodes.iter().map(|n| n.node).collect();
        assert_eq!(visited, vec![2, 3, 4]);
        assert_eq!(report.churned_nodes, 0);
        assert!(devices.iter().all(|d| d.is_enabled()));
    }

    #[test]
    fn churned_out_node_loses_its_device() {
        let (devices, list) = wired(3);
        let mut churn = ChurnScheduler::new(&config(ChurnMode::StaticOnce, 1), 7, 3, list)
            .unwrap()
            .with_random_source(Box::new(ScriptedRandomSource::new(vec![0.3, 0.2])));

        let report = churn.run_pass(Duration::ZERO).unwrap().clone();
        assert_eq!(report.churned_nodes, 2);
        assert_eq!(report.transitions(Transition::ChurnedOut), 2);
        assert!(devices[0].is_enabled());
        assert!(!devices[1].is_enabled());
        assert!(!devices[2].is_enabled());
        assert!(churn.state().is_churned(1));
        assert!(!churn.state().is_churned(0));
    }

    #[test]
    fn missing_device_aborts_before_any_change() {
        let (devices, mut list) = wired(3);
        let orphan: Arc<dyn DeviceAvailability> = Arc::new(CsmaNetDevice::new());
        list.attach(2, DeviceHandle::from_device(&orphan));
        drop(orphan);

        let scripted = ScriptedRandomSource::new(vec![0.3, 0.2]);
        let mut churn = ChurnScheduler::new(&config(ChurnMode::StaticOnce, 1), 7, 3, list)
            .unwrap()
            .with_random_source(Box::new(scripted));

        let err = churn.run_pass(Duration::ZERO).unwrap_err();
        assert!(matches!(err, SimulationError::DeviceAccess { node: 2 }));
        assert!(devices[1].is_enabled());
        assert_eq!(churn.state().count_churned(0..4), 0);
        assert_eq!(churn.passes(), 0);
    }

    #[test]
    fn per_epoch_reseed_repeats_each_pass() {
        let (_devices, list) = wired(4);
        let mut cfg = config(ChurnMode::DynamicRecurring, 1);
        cfg.reseed = ReseedPolicy::PerEpoch;
        let mut churn = ChurnScheduler::new(&cfg, 9, 4, list).unwrap();

        let first = churn.run_pass(Duration::ZERO).unwrap().clone();
        let second = churn.run_pass(Duration::from_secs(20)).unwrap().clone();
        let draws = |report: &PassReport| -> Vec<f64> {
            report.nodes.iter().map(|n| n.decision.sample.q).collect()
        };
        assert_ne!(draws(&first), draws(&second));

        let (_devices, list) = wired(4);
        let mut replay = ChurnScheduler::new(&cfg, 9, 4, list).unwrap();
        replay.run_pass(Duration::ZERO).unwrap();
        let replayed = replay.run_pass(Duration::from_secs(20)).unwrap();
        assert_eq!(draws(replayed), draws(&second));
    }

    #[test]
    fn stop_request_prevents_rearm() {
        let (_devices, list) = wired(3);
        let churn = ChurnScheduler::new(&config(ChurnMode::DynamicRecurring, 1), 7, 3, list)
            .unwrap()
            .into_shared();
        let stop = churn.lock().stop_handle();
        let mut queue = EventQueue::new();

        ChurnScheduler::start(&churn, &mut queue).unwrap();
        assert_eq!(queue.pending(), 1);
        stop.request_stop();

        let stats = queue.run_until(Duration::from_secs(100)).unwrap();
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.pending, 0);
        let churn = churn.lock();
        assert_eq!(churn.passes(), 1);
        assert_eq!(churn.rearms_delivered(), 1);
    }

    #[tracing_test::traced_test]
    #[test]
    fn pass_logs_each_evaluation_and_a_summary() {
        let (_devices, list) = wired(3);
        let mut churn = ChurnScheduler::new(&config(ChurnMode::StaticOnce, 1), 7, 3, list)
            .unwrap()
            .with_random_source(Box::new(ScriptedRandomSource::new(vec![0.3, 0.2])));
        churn.run_pass(Duration::from_secs(40)).unwrap();

        assert!(logs_contain("churn evaluation"));
        assert!(logs_contain("node=2"));
        assert!(logs_contain("p=0.04"));
        assert!(logs_contain("churned_nodes=2"));
        assert!(logs_contain("Device disabled"));
        assert!(logs_contain("churn_pass"));
        assert!(!logs_contain("node=0"));
    }

    #[test]
    fn wall_clock_reseed_happens_before_every_node() {
        let draws = vec![0.3, 0.2, 0.1, 0.1];
        let samples = |reseed: ReseedPolicy| -> Vec<(f64, f64)> {
            let (_devices, list) = wired(4);
            let mut cfg = config(ChurnMode::StaticOnce, 1);
            cfg.reseed = reseed;
            let mut churn = ChurnScheduler::new(&cfg, 7, 4, list)
                .unwrap()
                .with_random_source(Box::new(ScriptedRandomSource::new(draws.clone())));
            let report = churn.run_pass(Duration::ZERO).unwrap();
            let samples = report
                .nodes
                .iter()
                .map(|n| (n.decision.sample.q, n.decision.sample.e))
                .collect();
            samples
        };

        assert_eq!(
            samples(ReseedPolicy::WallClock),
            vec![(0.3, 0.2), (0.3, 0.2), (0.3, 0.2)]
        );
        assert_eq!(
            samples(ReseedPolicy::Once),
            vec![(0.3, 0.2), (0.1, 0.1), (0.3, 0.2)]
        );
    }

    #[test]
    fn only_the_latest_report_is_kept() {
        let (_devices, list) = wired(5);
        let mut churn = ChurnScheduler::new(&config(ChurnMode::DynamicRecurring, 1), 3, 5, list)
            .unwrap()
            .with_random_source(Box::new(ScriptedRandomSource::new(vec![0.3, 0.2, 0.1, 0.1])));
        assert!(churn.last_report().is_none());

        for epoch in 0..3u64 {
            churn.run_pass(Duration::from_secs(20 * epoch)).unwrap();
        }

        assert_eq!(churn.passes(), 3);
        let last = churn.last_report().unwrap();
        assert_eq!(last.epoch, 2);
        assert_eq!(last.nodes.len(), 4);

        let summaries = churn.summaries();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[2], PassSummary::from(last));
        assert!(summaries.iter().all(|s| s.evaluated == 4));
        let times: Vec<u64> = summaries.iter().map(|s| s.time.as_secs()).collect();
        assert_eq!(times, vec![0, 20, 40]);
    }

    #[test]
    fn digest_tracks_every_record() {
        let (_devices, list) = wired(3);
        let mut churn = ChurnScheduler::new(&config(ChurnMode::StaticOnce, 1), 7, 3, list).unwrap();
        let empty = churn.digest();
        churn.run_pass(Duration::ZERO).unwrap();
        assert_ne!(churn.digest(), empty);
        assert_eq!(churn.digest().len(), 64);
    }
}
