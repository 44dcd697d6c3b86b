//! Iterative multi-step forecasting
//!
//! Each prediction is appended to the window as a new step (target channel
//! set to the prediction, every other channel set to a placeholder) and the
//! oldest step is dropped. The whole horizon is generated `repeats` times and
//! averaged element-wise.
//!
//! Passes only differ when a perturbation is configured: noise drawn from a
//! per-pass RNG is added to the value fed back into the window. Without a
//! perturbation every pass would be identical, so a single pass is computed.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use burn::tensor::backend::Backend;

use crate::model::lstm::LSTMRegressor;
use crate::{ForecastConfig, ForecastError, Result};

/// Noise injected into fed-back predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Perturbation {
    None,
    /// Zero-mean Gaussian noise in scaled units
    Gaussian { std_dev: f32 },
}

impl Perturbation {
    /// True when passes can differ from one another
    pub fn is_stochastic(&self) -> bool {
        matches!(self, Perturbation::Gaussian { std_dev } if *std_dev > 0.0)
    }
}

/// Averaged forecast in scaled units
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// One value per future step
    pub values: Vec<f32>,
    /// Generation passes that were actually averaged
    pub passes: usize,
}

/// Autoregressive forecaster
#[derive(Debug, Clone)]
pub struct IterativeForecaster {
    horizon: usize,
    repeats: usize,
    placeholder: f32,
    perturbation: Perturbation,
    target_index: usize,
    seed: u64,
}

impl IterativeForecaster {
    pub fn new(config: &ForecastConfig, target_index: usize, seed: u64) -> Self {
        IterativeForecaster {
            horizon: config.horizon,
            repeats: config.repeats.max(1),
            placeholder: config.placeholder,
            perturbation: config.perturbation,
            target_index,
            seed,
        }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Forecast with a trained model
    pub fn forecast<B: Backend>(
        &self,
        model: &LSTMRegressor<B>,
        last_window: &[Vec<f32>],
        device: &B::Device,
    ) -> Result<Forecast> {
        self.forecast_with(last_window, |steps| model.predict_window(steps, device))
    }

    /// Forecast with any next-step predictor over a window of steps
    pub fn forecast_with<F>(&self, last_window: &[Vec<f32>], mut predict: F) -> Result<Forecast>
    where
        F: FnMut(&[Vec<f32>]) -> f32,
    {
        let width = last_window.first().map(|s| s.len()).unwrap_or(0);
        if last_window.is_empty() || width == 0 {
            return Err(ForecastError::Config("forecast window is empty".to_string()));
        }
        if self.target_index >= width {
            return Err(ForecastError::Config(format!(
                "target channel {} is outside the {}-wide feature vector",
                self.target_index, width
            )));
        }

        let noise = match self.perturbation {
            Perturbation::Gaussian { std_dev } if std_dev > 0.0 => Some(
                Normal::new(0.0f32, std_dev)
                    .map_err(|e| ForecastError::Config(format!("invalid perturbation: {}", e)))?,
            ),
            _ => None,
        };

        let passes = if noise.is_some() {
            self.repeats
        } else {
            if self.repeats > 1 {
                log::debug!(
                    "No perturbation configured; {} repeats would be identical, generating once",
                    self.repeats
                );
            }
            1
        };

        let mut sums = vec![0.0f64; self.horizon];
        for pass in 0..passes {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(pass as u64));
            let values = self.generate(last_window, width, &mut predict, |_| {
                noise.as_ref().map(|n| n.sample(&mut rng)).unwrap_or(0.0)
            });

            log::debug!(
                "Forecast pass {}/{}: first={:?} last={:?}",
                pass + 1,
                passes,
                values.first(),
                values.last()
            );

            for (sum, value) in sums.iter_mut().zip(&values) {
                *sum += *value as f64;
            }
        }

        let values = sums
            .into_iter()
            .map(|sum| (sum / passes as f64) as f32)
            .collect();

        Ok(Forecast { values, passes })
    }

    /// One autoregressive pass over the horizon
    fn generate<F, N>(&self, start: &[Vec<f32>], width: usize, predict: &mut F, mut noise: N) -> Vec<f32>
    where
        F: FnMut(&[Vec<f32>]) -> f32,
        N: FnMut(usize) -> f32,
    {
        let mut window: VecDeque<Vec<f32>> = start.iter().cloned().collect();
        let mut values = Vec::with_capacity(self.horizon);

        for step in 0..self.horizon {
            let next = predict(window.make_contiguous());
            values.push(next);

            let mut fed = vec![self.placeholder; width];
            fed[self.target_index] = next + noise(step);

            window.pop_front();
            window.push_back(fed);
        }

        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(horizon: usize, repeats: usize, perturbation: Perturbation) -> ForecastConfig {
        ForecastConfig {
            horizon,
            repeats,
            placeholder: 0.0,
            perturbation,
        }
    }

    fn start_window() -> Vec<Vec<f32>> {
        (0..4).map(|i| vec![0.1 * i as f32, 7.0, 7.0]).collect()
    }

    /// Mean of the target channel plus a small drift, so feedback is visible
    fn drift(steps: &[Vec<f32>]) -> f32 {
        steps.iter().map(|s| s[0]).sum::<f32>() / steps.len() as f32 + 0.05
    }

    /// Reference single pass written out by hand
    fn direct_run(horizon: usize) -> Vec<f32> {
        let mut window = start_window();
        let mut out = Vec::new();
        for _ in 0..horizon {
            let next = drift(&window);
            out.push(next);
            window.remove(0);
            window.push(vec![next, 0.0, 0.0]);
        }
        out
    }

    #[test]
    fn test_single_pass_matches_direct_run() {
        let forecaster = IterativeForecaster::new(&config(90, 1, Perturbation::None), 0, 42);
        let forecast = forecaster.forecast_with(&start_window(), drift).unwrap();

        assert_eq!(forecast.values.len(), 90);
        assert_eq!(forecast.passes, 1);
        assert_eq!(forecast.values, direct_run(90));
    }

    #[test]
    fn test_fed_back_steps_use_placeholder() {
        let mut seen = Vec::new();
        let forecaster = IterativeForecaster::new(&config(3, 1, Perturbation::None), 0, 0);
        forecaster
            .forecast_with(&start_window(), |steps| {
                seen.push(steps.to_vec());
                1.5
            })
            .unwrap();

        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], start_window());
        assert_eq!(seen[1][3], vec![1.5, 0.0, 0.0]);
        assert_eq!(seen[2][2], vec![1.5, 0.0, 0.0]);
        assert_eq!(seen[2][0], start_window()[2]);
        assert!(seen.iter().all(|w| w.len() == 4));
    }

    // Without perturbation the repeats carry no information, so they collapse
    // to a single pass instead of averaging identical copies.
    #[test]
    fn test_unperturbed_repeats_are_redundant() {
        let once = IterativeForecaster::new(&config(20, 1, Perturbation::None), 0, 42)
            .forecast_with(&start_window(), drift)
            .unwrap();
        let five = IterativeForecaster::new(&config(20, 5, Perturbation::None), 0, 42)
            .forecast_with(&start_window(), drift)
            .unwrap();

        assert_eq!(five.passes, 1);
        assert_eq!(once.values, five.values);
    }

    // With perturbation every pass differs and the result is their mean.
    #[test]
    fn test_perturbed_repeats_are_seeded() {
        let perturbation = Perturbation::Gaussian { std_dev: 0.05 };
        let a = IterativeForecaster::new(&config(30, 5, perturbation), 0, 42)
            .forecast_with(&start_window(), drift)
            .unwrap();
        let b = IterativeForecaster::new(&config(30, 5, perturbation), 0, 42)
            .forecast_with(&start_window(), drift)
            .unwrap();
        let other_seed = IterativeForecaster::new(&config(30, 5, perturbation), 0, 7)
            .forecast_with(&start_window(), drift)
            .unwrap();
        let clean = IterativeForecaster::new(&config(30, 1, Perturbation::None), 0, 42)
            .forecast_with(&start_window(), drift)
            .unwrap();

        assert_eq!(a.passes, 5);
        assert_eq!(a, b);
        assert_ne!(a.values, other_seed.values);
        assert_ne!(a.values, clean.values);
        // The first step is predicted before any noise is fed back
        assert_eq!(a.values[0], clean.values[0]);
    }

    #[test]
    fn test_zero_std_dev_is_deterministic() {
        let forecaster =
            IterativeForecaster::new(&config(10, 3, Perturbation::Gaussian { std_dev: 0.0 }), 0, 1);
        let forecast = forecaster.forecast_with(&start_window(), drift).unwrap();

        assert_eq!(forecast.passes, 1);
        assert_eq!(forecast.values, direct_run(10));
    }

    #[test]
    fn test_invalid_windows() {
        let forecaster = IterativeForecaster::new(&config(5, 1, Perturbation::None), 3, 0);

        assert!(forecaster.forecast_with(&[], drift).is_err());
        assert!(forecaster.forecast_with(&start_window(), drift).is_err());
    }

    #[test]
    fn test_perturbation_serde() {
        let json = serde_json::to_string(&Perturbation::Gaussian { std_dev: 0.5 }).unwrap();
        assert_eq!(json, r#"{"kind":"gaussian","std_dev":0.5}"#);

        let none: Perturbation = serde_json::from_str(r#"{"kind":"none"}"#).unwrap();
        assert_eq!(none, Perturbation::None);
        assert!(!none.is_stochastic());
    }
}
