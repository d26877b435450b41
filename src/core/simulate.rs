//! Monte Carlo composition of soil concentration after feedstock application
//!
//! For every draw, one value is resampled independently from each of the four
//! input distributions and combined as
//!
//! ```text
//! total = feedstock_conc * (rate / 10) / depth / bulk_density + soil_conc
//! ```
//!
//! `rate / 10` converts t/ha to kg/m². The element of interest is assumed
//! immobile while everything else weathers away (worst case).

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::distribution::{Distribution, DEFAULT_SAMPLE_COUNT};

/// Soil depth floor (m)
pub const DEPTH_FLOOR: f64 = 1.0;

/// How drawn soil depths are floored before use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DepthFloorPolicy {
    /// Any depth below the floor is raised to it: `max(depth, 1)`
    #[default]
    Unconditional,
    /// Only non-positive depths are replaced by the floor
    NonPositiveOnly,
}

impl DepthFloorPolicy {
    /// Depth actually used in the concentration formula
    pub fn effective_depth(&self, depth: f64) -> f64 {
        match self {
            DepthFloorPolicy::Unconditional => {
                if depth < DEPTH_FLOOR || depth.is_nan() {
                    DEPTH_FLOOR
                } else {
                    depth
                }
            }
            DepthFloorPolicy::NonPositiveOnly => {
                if depth <= 0.0 || depth.is_nan() {
                    DEPTH_FLOOR
                } else {
                    depth
                }
            }
        }
    }
}

impl std::fmt::Display for DepthFloorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepthFloorPolicy::Unconditional => write!(f, "unconditional"),
            DepthFloorPolicy::NonPositiveOnly => write!(f, "non-positive-only"),
        }
    }
}

/// Concentration added by the feedstock (mg/kg)
pub fn feedstock_contribution(feedstock_conc: f64, rate: f64, depth: f64, bulk_density: f64) -> f64 {
    feedstock_conc * (rate / 10.0) / depth / bulk_density
}

/// Soil concentration after application (mg/kg)
pub fn total_concentration(
    soil_conc: f64,
    feedstock_conc: f64,
    rate: f64,
    depth: f64,
    bulk_density: f64,
) -> f64 {
    feedstock_contribution(feedstock_conc, rate, depth, bulk_density) + soil_conc
}

/// Errors from the simulator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    #[error("application rate must be a non-negative number, got {rate}")]
    InvalidRate { rate: f64 },

    #[error("{input} distribution has {found} samples, expected {expected}")]
    SampleCountMismatch {
        input: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("no application rates requested")]
    NoRates,
}

/// The four independent uncertain inputs
#[derive(Debug, Clone)]
pub struct SimulationInputs {
    /// Background soil concentration (mg/kg)
    pub soil_concentration: Distribution,

    /// Feedstock concentration (mg/kg)
    pub feedstock_concentration: Distribution,

    /// Soil bulk density (kg/m³)
    pub bulk_density: Distribution,

    /// Soil mixing depth (m)
    pub soil_depth: Distribution,
}

impl SimulationInputs {
    fn named(&self) -> [(&'static str, &Distribution); 4] {
        [
            ("soil concentration", &self.soil_concentration),
            ("feedstock concentration", &self.feedstock_concentration),
            ("bulk density", &self.bulk_density),
            ("soil depth", &self.soil_depth),
        ]
    }
}

/// Output distribution per application rate, in request order
#[derive(Debug, Clone, Default)]
pub struct SimulationResult {
    runs: Vec<(f64, Distribution)>,
}

impl SimulationResult {
    pub fn get(&self, rate: f64) -> Option<&Distribution> {
        self.runs.iter().find(|(r, _)| *r == rate).map(|(_, d)| d)
    }

    pub fn rates(&self) -> Vec<f64> {
        self.runs.iter().map(|(r, _)| *r).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &Distribution)> {
        self.runs.iter().map(|(r, d)| (*r, d))
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Runs the per-rate Monte Carlo composition
#[derive(Debug, Clone, Copy)]
pub struct ConcentrationSimulator {
    sample_count: usize,
    policy: DepthFloorPolicy,
}

impl Default for ConcentrationSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_COUNT, DepthFloorPolicy::default())
    }
}

impl ConcentrationSimulator {
    pub fn new(sample_count: usize, policy: DepthFloorPolicy) -> Self {
        Self {
            sample_count,
            policy,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn policy(&self) -> DepthFloorPolicy {
        self.policy
    }

    fn check_inputs(&self, inputs: &SimulationInputs) -> Result<(), SimulationError> {
        for (input, dist) in inputs.named() {
            if dist.len() != self.sample_count {
                return Err(SimulationError::SampleCountMismatch {
                    input,
                    expected: self.sample_count,
                    found: dist.len(),
                });
            }
        }
        Ok(())
    }

    fn check_rate(rate: f64) -> Result<(), SimulationError> {
        if rate.is_finite() && rate >= 0.0 {
            Ok(())
        } else {
            Err(SimulationError::InvalidRate { rate })
        }
    }

    /// Simulate a single application rate
    pub fn simulate_rate<R: Rng + ?Sized>(
        &self,
        inputs: &SimulationInputs,
        rate: f64,
        rng: &mut R,
    ) -> Result<Distribution, SimulationError> {
        self.check_inputs(inputs)?;
        Self::check_rate(rate)?;
        Ok(self.run(inputs, rate, rng))
    }

    /// Simulate every rate, each on its own worker thread
    ///
    /// Every worker gets a generator seeded from `rng`, so a seeded `rng`
    /// gives reproducible results.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        inputs: &SimulationInputs,
        rates: &[f64],
        rng: &mut R,
    ) -> Result<SimulationResult, SimulationError> {
        if rates.is_empty() {
            return Err(SimulationError::NoRates);
        }
        self.check_inputs(inputs)?;
        for &rate in rates {
            Self::check_rate(rate)?;
        }

        let seeded: Vec<(f64, u64)> = rates.iter().map(|&r| (r, rng.random())).collect();

        let runs = std::thread::scope(|scope| {
            let handles: Vec<_> = seeded
                .iter()
                .map(|&(rate, seed)| {
                    scope.spawn(move || {
                        let mut worker_rng = StdRng::seed_from_u64(seed);
                        (rate, self.run(inputs, rate, &mut worker_rng))
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(run) => run,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect::<Vec<_>>()
        });

        Ok(SimulationResult { runs })
    }

    fn run<R: Rng + ?Sized>(&self, inputs: &SimulationInputs, rate: f64, rng: &mut R) -> Distribution {
        // check_inputs guarantees every input holds sample_count draws
        let totals: Vec<f64> = (0..self.sample_count)
            .map_while(|_| {
                let feedstock_conc = inputs.feedstock_concentration.resample(rng)?;
                let soil_conc = inputs.soil_concentration.resample(rng)?;
                let bulk_density = inputs.bulk_density.resample(rng)?;
                let soil_depth = self.policy.effective_depth(inputs.soil_depth.resample(rng)?);
                Some(total_concentration(
                    soil_conc,
                    feedstock_conc,
                    rate,
                    soil_depth,
                    bulk_density,
                ))
            })
            .collect();

        let dist = Distribution::new(totals);
        log::debug!(
            "rate {} t/ha: {} samples, mean {:.4}",
            rate,
            dist.len(),
            dist.mean().unwrap_or(f64::NAN)
        );
        dist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(n: usize, value: f64) -> Distribution {
        Distribution::new(vec![value; n])
    }

    fn constant_inputs(n: usize, soil: f64, feed: f64, dbd: f64, depth: f64) -> SimulationInputs {
        SimulationInputs {
            soil_concentration: constant(n, soil),
            feedstock_concentration: constant(n, feed),
            bulk_density: constant(n, dbd),
            soil_depth: constant(n, depth),
        }
    }

    #[test]
    fn test_formula() {
        // 1500 * (20/10) / 1.5 / 1300 + 50
        let total = total_concentration(50.0, 1500.0, 20.0, 1.5, 1300.0);
        assert!((total - (50.0 + 3000.0 / 1.5 / 1300.0)).abs() < 1e-12);
        assert_eq!(feedstock_contribution(1500.0, 0.0, 1.0, 1300.0), 0.0);
    }

    #[test]
    fn test_unconditional_floor() {
        let policy = DepthFloorPolicy::Unconditional;
        assert_eq!(policy.effective_depth(-0.5), 1.0);
        assert_eq!(policy.effective_depth(0.0), 1.0);
        assert_eq!(policy.effective_depth(0.18), 1.0);
        assert_eq!(policy.effective_depth(0.999_999), 1.0);
        assert_eq!(policy.effective_depth(1.0), 1.0);
        assert_eq!(policy.effective_depth(1.25), 1.25);
        assert_eq!(policy.effective_depth(f64::NAN), 1.0);
    }

    #[test]
    fn test_non_positive_only_floor() {
        let policy = DepthFloorPolicy::NonPositiveOnly;
        assert_eq!(policy.effective_depth(-0.5), 1.0);
        assert_eq!(policy.effective_depth(0.0), 1.0);
        assert_eq!(policy.effective_depth(0.18), 0.18);
    }

    #[test]
    fn test_constant_inputs_give_exact_output() {
        let sim = ConcentrationSimulator::new(100, DepthFloorPolicy::Unconditional);
        let inputs = constant_inputs(100, 50.0, 1500.0, 1300.0, 0.18);
        let mut rng = StdRng::seed_from_u64(1);

        let dist = sim.simulate_rate(&inputs, 20.0, &mut rng).unwrap();
        assert_eq!(dist.len(), 100);
        let expected = 50.0 + 1500.0 * 2.0 / 1.0 / 1300.0;
        assert!(dist.samples().iter().all(|&v| (v - expected).abs() < 1e-12));
    }

    #[test]
    fn test_zero_rate_reproduces_soil() {
        let sim = ConcentrationSimulator::new(50, DepthFloorPolicy::Unconditional);
        let inputs = SimulationInputs {
            soil_concentration: Distribution::new((0..50).map(f64::from).collect()),
            ..constant_inputs(50, 0.0, 900.0, 1200.0, 0.2)
        };
        let mut rng = StdRng::seed_from_u64(2);
        let dist = sim.simulate_rate(&inputs, 0.0, &mut rng).unwrap();
        assert!(dist
            .samples()
            .iter()
            .all(|v| inputs.soil_concentration.samples().contains(v)));
    }

    #[test]
    fn test_simulate_all_rates() {
        let sim = ConcentrationSimulator::new(200, DepthFloorPolicy::Unconditional);
        let inputs = constant_inputs(200, 10.0, 1000.0, 1000.0, 1.0);
        let mut rng = StdRng::seed_from_u64(3);
        let rates = [0.0, 25.0, 50.0];

        let result = sim.simulate(&inputs, &rates, &mut rng).unwrap();
        assert_eq!(result.rates(), rates.to_vec());
        for (rate, dist) in result.iter() {
            assert_eq!(dist.len(), 200);
            let expected = 10.0 + 1000.0 * (rate / 10.0) / 1.0 / 1000.0;
            assert!((dist.mean().unwrap() - expected).abs() < 1e-9);
        }
        assert!(result.get(75.0).is_none());
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let sim = ConcentrationSimulator::new(500, DepthFloorPolicy::Unconditional);
        let inputs = SimulationInputs {
            soil_concentration: Distribution::new((0..500).map(|i| i as f64 * 0.1).collect()),
            feedstock_concentration: Distribution::new(
                (0..500).map(|i| 1000.0 + i as f64).collect(),
            ),
            bulk_density: constant(500, 1300.0),
            soil_depth: constant(500, 1.0),
        };

        let a = sim
            .simulate(&inputs, &[10.0, 20.0], &mut StdRng::seed_from_u64(9))
            .unwrap();
        let b = sim
            .simulate(&inputs, &[10.0, 20.0], &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(a.get(10.0), b.get(10.0));
        assert_eq!(a.get(20.0), b.get(20.0));
    }

    #[test]
    fn test_sample_count_mismatch_rejected() {
        let sim = ConcentrationSimulator::new(100, DepthFloorPolicy::Unconditional);
        let inputs = SimulationInputs {
            bulk_density: constant(99, 1300.0),
            ..constant_inputs(100, 1.0, 1.0, 1.0, 1.0)
        };
        let err = sim
            .simulate_rate(&inputs, 10.0, &mut StdRng::seed_from_u64(4))
            .unwrap_err();
        assert_eq!(
            err,
            SimulationError::SampleCountMismatch {
                input: "bulk density",
                expected: 100,
                found: 99
            }
        );
    }

    #[test]
    fn test_invalid_rates_rejected() {
        let sim = ConcentrationSimulator::new(10, DepthFloorPolicy::Unconditional);
        let inputs = constant_inputs(10, 1.0, 1.0, 1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(5);
        assert!(sim.simulate_rate(&inputs, -1.0, &mut rng).is_err());
        assert!(sim.simulate_rate(&inputs, f64::NAN, &mut rng).is_err());
        assert_eq!(
            sim.simulate(&inputs, &[], &mut rng).unwrap_err(),
            SimulationError::NoRates
        );
    }
}
