//! Seeded bootstrap forecast cone.
//!
//! Projects the distribution of future cumulative returns by resampling the
//! in-sample return history with replacement: each sample is an independent
//! path of `num_days` draws, compounded from `starting_value`. The cone is
//! the per-horizon mean of those paths with bands at the configured standard
//! deviation multiples. Non-parametric by construction; nothing assumes the
//! returns are normal.
//!
//! Sampling is deterministic under a fixed [`ConeConfig::seed`]: a master
//! generator derives one seed per sample, and each path draws from its own
//! generator, so the result is stable regardless of how the worker pool
//! schedules the samples.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AnalyticsError;
use crate::stats::cum_returns;

/// Standard-deviation multiples used when a config does not override them.
pub const DEFAULT_CONE_STD: [f64; 3] = [1.0, 1.5, 2.0];

// ============================================================================
// Configuration
// ============================================================================

/// Bootstrap cone parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConeConfig {
    /// Number of periods to project forward.
    pub num_days: usize,
    /// Standard-deviation multiples, one band per entry.
    pub std_multiples: Vec<f64>,
    /// Cumulative value the projection compounds from.
    pub starting_value: f64,
    /// Number of bootstrap paths to draw.
    pub num_samples: usize,
    /// Master seed; `None` draws one from the operating system.
    pub seed: Option<u64>,
}

impl Default for ConeConfig {
    fn default() -> Self {
        Self {
            num_days: 252,
            std_multiples: DEFAULT_CONE_STD.to_vec(),
            starting_value: 1.0,
            num_samples: 1000,
            seed: None,
        }
    }
}

// ============================================================================
// Output
// ============================================================================

/// One band of the cone at a fixed standard-deviation multiple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConeBand {
    /// Multiple of the per-horizon standard deviation this band sits at.
    pub std_multiple: f64,
    /// `mean + std_multiple * std` per horizon.
    pub upper: Vec<f64>,
    /// `mean - std_multiple * std` per horizon.
    pub lower: Vec<f64>,
}

/// Projected cumulative-return cone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCone {
    /// Mean cumulative value across the bootstrap paths, per horizon.
    pub mean: Vec<f64>,
    /// Bands in the order of the configured standard-deviation multiples.
    pub bands: Vec<ConeBand>,
}

// ============================================================================
// Simulation
// ============================================================================

/// Draws `num_samples` bootstrap paths of `num_days` returns each.
///
/// Every path samples the in-sample returns uniformly with replacement.
/// Paths are raw returns, not yet compounded.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] when `returns` is empty.
pub fn simulate_paths(
    returns: &[f64],
    config: &ConeConfig,
) -> Result<Vec<Vec<f64>>, AnalyticsError> {
    if returns.is_empty() {
        return Err(AnalyticsError::insufficient_data(1, 0));
    }
    let mut master = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let seeds: Vec<u64> = (0..config.num_samples).map(|_| master.random()).collect();

    let paths: Vec<Vec<f64>> = seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..config.num_days)
                .map(|_| returns[rng.random_range(0..returns.len())])
                .collect()
        })
        .collect();

    debug!(
        samples = paths.len(),
        horizon = config.num_days,
        "simulated bootstrap return paths"
    );
    Ok(paths)
}

/// Reduces bootstrap return paths to a cone.
///
/// Each path is compounded from [`ConeConfig::starting_value`]; the mean and
/// population standard deviation across paths at each horizon produce one
/// band per configured multiple. Uneven paths are truncated to the shortest
/// so every horizon aggregates over all of them.
#[must_use]
pub fn summarize_paths(paths: &[Vec<f64>], config: &ConeConfig) -> ForecastCone {
    let cum_paths: Vec<Vec<f64>> = paths
        .iter()
        .map(|path| cum_returns(path, config.starting_value))
        .collect();
    let horizon = cum_paths.iter().map(Vec::len).min().unwrap_or(0);
    let samples = cum_paths.len() as f64;

    let mut mean = vec![0.0; horizon];
    let mut std = vec![0.0; horizon];
    for t in 0..horizon {
        let sum: f64 = cum_paths.iter().map(|path| path[t]).sum();
        mean[t] = sum / samples;
        let squared: f64 = cum_paths
            .iter()
            .map(|path| (path[t] - mean[t]).powi(2))
            .sum();
        std[t] = (squared / samples).sqrt();
    }

    let bands = config
        .std_multiples
        .iter()
        .map(|&std_multiple| ConeBand {
            std_multiple,
            upper: mean
                .iter()
                .zip(&std)
                .map(|(m, s)| m + s * std_multiple)
                .collect(),
            lower: mean
                .iter()
                .zip(&std)
                .map(|(m, s)| m - s * std_multiple)
                .collect(),
        })
        .collect();

    ForecastCone { mean, bands }
}

/// Bootstrap cone over the in-sample returns.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] when `returns` is empty.
pub fn forecast_cone_bootstrap(
    returns: &[f64],
    config: &ConeConfig,
) -> Result<ForecastCone, AnalyticsError> {
    let paths = simulate_paths(returns, config)?;
    Ok(summarize_paths(&paths, config))
}

// ============================================================================
// Tests
// ============================================================================
