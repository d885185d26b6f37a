//! Node churn: the probability model, per-node flags and the epoch scheduler.

pub mod model;
pub mod scheduler;
pub mod state;

pub use model::{round_to_hundredths, ChurnDecision, ChurnModel, ChurnSample, HealthBand};
pub use scheduler::{
    ChurnScheduler, NodeReport, PassReport, PassSummary, SharedChurnScheduler, StopHandle,
    Transition,
};
pub use state::ChurnState;
