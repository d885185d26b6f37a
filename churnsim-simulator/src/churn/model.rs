//! # Churn probability model
//!
//! Two uniform draws per node, `q` (unavailability pressure) and `e`
//! (environmental stress), give the joint availability
//! `L = (1 - q)(1 - e)`. Availability picks a health band, the band picks a
//! severity coefficient, and `p = round2(coefficient * L)` is compared
//! against the threshold.
//!
//! With the default coefficients the rounded probability can only reach the
//! 0.04 threshold in two regions: degraded nodes with `L >= 0.2188` and
//! moderate nodes with `L >= 0.4375`. Healthy nodes top out at `p = 0.04`
//! only when `L >= 0.875`.

use churnsim_config::{ChurnConfig, SeverityCoefficients};
use churnsim_core::random::RandomSource;

/// Upper availability bound (inclusive) of the degraded band.
pub const DEGRADED_CEILING: f64 = 0.4;
/// Upper availability bound (inclusive) of the moderate band.
pub const MODERATE_CEILING: f64 = 0.7;

/// Health band selected by availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthBand {
    /// `L <= 0.4`
    Degraded,
    /// `0.4 < L <= 0.7`
    Moderate,
    /// `L > 0.7`
    Healthy,
}

impl HealthBand {
    #[inline]
    pub fn classify(availability: f64) -> Self {
        if availability <= DEGRADED_CEILING {
            HealthBand::Degraded
        } else if availability <= MODERATE_CEILING {
            HealthBand::Moderate
        } else {
            HealthBand::Healthy
        }
    }
}

/// Every intermediate value of one node evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChurnSample {
    pub q: f64,
    pub e: f64,
    /// `L = (1 - q)(1 - e)`
    pub availability: f64,
    pub band: HealthBand,
    /// Unrounded `coefficient * L`.
    pub pressure: f64,
    /// `pressure` rounded to two decimals.
    pub probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChurnDecision {
    pub churned_out: bool,
    pub sample: ChurnSample,
}

/// Rounds to two decimals as `floor(x * 100 + 0.5) / 100`.
#[inline]
pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Stateless churn decision function.
#[derive(Debug, Clone, PartialEq)]
pub struct ChurnModel {
    severity: SeverityCoefficients,
    threshold: f64,
}

impl Default for ChurnModel {
    fn default() -> Self {
        Self::from_config(&ChurnConfig::default())
    }
}

impl ChurnModel {
    pub fn new(severity: SeverityCoefficients, threshold: f64) -> Self {
        Self {
            severity,
            threshold,
        }
    }

    pub fn from_config(config: &ChurnConfig) -> Self {
        Self::new(config.severity.clone(), config.threshold)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn coefficient(&self, band: HealthBand) -> f64 {
        match band {
            HealthBand::Degraded => self.severity.degraded,
            HealthBand::Moderate => self.severity.moderate,
            HealthBand::Healthy => self.severity.healthy,
        }
    }

    /// Draws `q` then `e` from `rng` and evaluates them.
    pub fn decide(&self, rng: &mut dyn RandomSource) -> ChurnDecision {
        let q = rng.next_unit();
        let e = rng.next_unit();
        self.evaluate(q, e)
    }

    pub fn evaluate(&self, q: f64, e: f64) -> ChurnDecision {
        let availability = (1.0 - q) * (1.0 - e);
        let band = HealthBand::classify(availability);
        let pressure = self.coefficient(band) * availability;
        let probability = round_to_hundredths(pressure);

        ChurnDecision {
            churned_out: probability >= self.threshold,
            sample: ChurnSample {
                q,
                e,
                availability,
                band,
                pressure,
                probability,
            },
        }
    }
}
