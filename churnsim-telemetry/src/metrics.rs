//! ## churnsim-telemetry::metrics
//! **Prometheus registry for churn runs**
//!
//! Counters for passes, evaluations and transitions in both directions, a
//! gauge for the nodes currently churned out, and a histogram of the rounded
//! churn probability `p`.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub passes: IntCounter,
    pub evaluations: IntCounter,
    pub churn_out: IntCounter,
    pub churn_in: IntCounter,
    pub churned_nodes: IntGauge,
    pub churn_probability: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let passes = IntCounter::new("churnsim_passes_total", "Completed churn passes")?;
        let evaluations = IntCounter::new(
            "churnsim_evaluations_total",
            "Per-node churn decisions taken",
        )?;
        let churn_out = IntCounter::new(
            "churnsim_churn_out_total",
            "Transitions from available to churned out",
        )?;
        let churn_in = IntCounter::new(
            "churnsim_churn_in_total",
            "Transitions from churned out back to available",
        )?;
        let churned_nodes = IntGauge::new(
            "churnsim_churned_nodes",
            "Eligible nodes churned out after the latest pass",
        )?;
        let churn_probability = Histogram::with_opts(
            HistogramOpts::new(
                "churnsim_churn_probability",
                "Rounded churn probability per evaluation",
            )
            .buckets(vec![0.0, 0.01, 0.02, 0.03, 0.04, 0.08, 0.16]),
        )?;

        registry.register(Box::new(passes.clone()))?;
        registry.register(Box::new(evaluations.clone()))?;
        registry.register(Box::new(churn_out.clone()))?;
        registry.register(Box::new(churn_in.clone()))?;
        registry.register(Box::new(churned_nodes.clone()))?;
        registry.register(Box::new(churn_probability.clone()))?;

        Ok(Self {
            registry,
            passes,
            evaluations,
            churn_out,
            churn_in,
            churned_nodes,
            churn_probability,
        })
    }

    pub fn record_evaluation(&self, probability: f64) {
        self.evaluations.inc();
        self.churn_probability.observe(probability);
    }

    pub fn record_pass(&self, churned_nodes: usize, churned_out: usize, restored: usize) {
        self.passes.inc();
        self.churn_out.inc_by(churned_out as u64);
        self.churn_in.inc_by(restored as u64);
        self.churned_nodes.set(churned_nodes as i64);
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_updates_counters_and_gauge() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.record_evaluation(0.04);
        metrics.record_evaluation(0.0);
        metrics.record_pass(1, 1, 0);
        metrics.record_pass(0, 0, 1);

        assert_eq!(metrics.passes.get(), 2);
        assert_eq!(metrics.evaluations.get(), 2);
        assert_eq!(metrics.churn_out.get(), 1);
        assert_eq!(metrics.churn_in.get(), 1);
        assert_eq!(metrics.churned_nodes.get(), 0);
    }

    #[test]
    fn exposition_lists_every_metric() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.record_evaluation(0.03);
        metrics.record_pass(0, 0, 0);
        let text = metrics.gather_metrics().unwrap();
        for name in [
            "churnsim_passes_total",
            "churnsim_evaluations_total",
            "churnsim_churn_out_total",
            "churnsim_churn_in_total",
            "churnsim_churned_nodes",
            "churnsim_churn_probability",
        ] {
            assert!(text.contains(name), "missing {name}");
        }
    }
}
