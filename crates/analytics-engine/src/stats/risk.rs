//! Downside and tail risk statistics.

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::periods::Period;
use crate::series::ReturnSeries;
use crate::stats::aggregate::aggregate_returns;
use crate::stats::backend;

// ============================================================================
// Drawdown / Tails
// ============================================================================

/// Worst peak-to-trough loss as a non-positive fraction.
///
/// Compounds the returns onto a prepended baseline, tracks the running peak,
/// and reports the most negative relative gap. `NaN` rows compound as flat.
/// `NaN` for empty input, zero when the series never falls below a prior
/// peak.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return f64::NAN;
    }
    let mut current = 100.0;
    let mut peak = 100.0;
    let mut worst = 0.0;
    for r in returns {
        if !r.is_nan() {
            current *= 1.0 + r;
        }
        if current > peak {
            peak = current;
        }
        let drawdown = (current - peak) / peak;
        if drawdown < worst {
            worst = drawdown;
        }
    }
    worst
}

/// Ratio of the right tail to the left tail.
///
/// Drops `NaN` rows, then divides the magnitude of the 95th percentile by
/// the magnitude of the 5th. `NaN` when no valid observations remain.
pub fn tail_ratio(returns: &[f64]) -> f64 {
    let clean: Vec<f64> = returns.iter().copied().filter(|v| !v.is_nan()).collect();
    if clean.is_empty() {
        return f64::NAN;
    }
    percentile(&clean, 95.0).abs() / percentile(&clean, 5.0).abs()
}

/// Linear-interpolation percentile of `values` at `q` in `[0, 100]`.
///
/// `NaN` for empty input, any `NaN` entry, or `q` outside the valid range.
pub(crate) fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() || !(0.0..=100.0).contains(&q) {
        return f64::NAN;
    }
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

// ============================================================================
// Value at Risk
// ============================================================================

/// Parametric value at risk: `nanmean - sigma * nanstd` with sample
/// standard deviation.
pub fn value_at_risk(returns: &[f64], sigma: f64) -> f64 {
    backend::nanmean(returns) - sigma * backend::nanstd(returns, 1)
}

/// [`value_at_risk`] with an optional aggregation applied first.
///
/// With `period` set, the series is compounded into that periodicity before
/// the parametric formula runs.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidPeriod`] when `period` is
/// [`Period::Daily`], which the aggregation step rejects.
pub fn value_at_risk_series(
    series: &ReturnSeries,
    period: Option<Period>,
    sigma: f64,
) -> Result<f64, AnalyticsError> {
    match period {
        Some(period) => {
            let buckets = aggregate_returns(series, period)?;
            let values: Vec<f64> = buckets.iter().map(|b| b.value).collect();
            Ok(value_at_risk(&values, sigma))
        }
        None => Ok(value_at_risk(series.values(), sigma)),
    }
}

/// Historical value at risk: the linear-interpolation percentile at
/// `cutoff * 100`. Any `NaN` entry propagates.
pub fn value_at_risk_historical(returns: &[f64], cutoff: f64) -> f64 {
    percentile(returns, cutoff * 100.0)
}

/// Expected shortfall: mean of the lowest `int((len - 1) * cutoff) + 1`
/// returns, found by partition selection rather than a full sort. `NaN` for
/// empty input.
pub fn conditional_value_at_risk(returns: &[f64], cutoff: f64) -> f64 {
    if returns.is_empty() {
        return f64::NAN;
    }
    let cutoff_index = ((returns.len() - 1) as f64 * cutoff) as usize;
    let k = cutoff_index.min(returns.len() - 1);
    let mut scratch = returns.to_vec();
    scratch.select_nth_unstable_by(k, |a, b| a.total_cmp(b));
    let lowest = &scratch[..=k];
    lowest.iter().sum::<f64>() / lowest.len() as f64
}

// ============================================================================
// Distribution Moments
// ============================================================================

/// Biased sample skewness over the non-`NaN` values.
///
/// `NaN` when no valid observations remain or the variance is zero.
pub fn skew(returns: &[f64]) -> f64 {
    let (m2, m3, _) = central_moments(returns);
    if m2 == 0.0 {
        return f64::NAN;
    }
    m3 / m2.powf(1.5)
}

/// Biased excess kurtosis over the non-`NaN` values.
///
/// `NaN` when no valid observations remain or the variance is zero.
pub fn kurtosis(returns: &[f64]) -> f64 {
    let (m2, _, m4) = central_moments(returns);
    if m2 == 0.0 {
        return f64::NAN;
    }
    m4 / (m2 * m2) - 3.0
}

fn central_moments(returns: &[f64]) -> (f64, f64, f64) {
    let clean: Vec<f64> = returns.iter().copied().filter(|v| !v.is_nan()).collect();
    if clean.is_empty() {
        return (f64::NAN, f64::NAN, f64::NAN);
    }
    let n = clean.len() as f64;
    let mean = clean.iter().sum::<f64>() / n;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in &clean {
        let d = v - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

// ============================================================================
// Generalized Pareto Tail Fit
// ============================================================================

/// Result of a generalized Pareto fit to the loss tail.
///
/// All fields are zero when no acceptable fit exists (no losses, too few
/// observations, or the threshold search exhausted itself).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GpdRiskEstimates {
    /// Loss threshold above which exceedances were fitted.
    pub threshold: f64,
    /// Fitted scale parameter.
    pub scale: f64,
    /// Fitted shape parameter.
    pub shape: f64,
    /// Value at risk implied by the fitted tail.
    pub var: f64,
    /// Expected shortfall implied by the fitted tail.
    pub es: f64,
}

impl GpdRiskEstimates {
    /// Values in `[threshold, scale, shape, var, es]` order.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 5] {
        [self.threshold, self.scale, self.shape, self.var, self.es]
    }
}

const GPD_DEFAULT_THRESHOLD: f64 = 0.2;
const GPD_MINIMUM_THRESHOLD: f64 = 1e-9;

/// Tail risk estimates from a generalized Pareto fit of the losses.
///
/// Losses are the positive values of the negated returns. Starting at a 0.2
/// loss threshold and halving on failure, the exceedances are fitted by
/// maximum likelihood (Nelder-Mead over scale and shape); a fit is accepted
/// once the shape is positive and the implied value at risk at probability
/// `var_p` is positive. Expected shortfall follows the Gilli & Kellezi
/// closed form. Fewer than three observations, or no accepted fit, yields
/// all zeros.
pub fn gpd_risk_estimates(returns: &[f64], var_p: f64) -> GpdRiskEstimates {
    if returns.len() < 3 {
        return GpdRiskEstimates::default();
    }
    let losses: Vec<f64> = returns.iter().map(|r| -r).filter(|l| *l > 0.0).collect();

    let mut threshold = GPD_DEFAULT_THRESHOLD;
    while threshold > GPD_MINIMUM_THRESHOLD {
        let exceedances: Vec<f64> = losses
            .iter()
            .copied()
            .filter(|l| *l >= threshold)
            .collect();
        if let Some([scale, shape]) = fit_gpd_params(&exceedances) {
            let var = gpd_var(
                threshold,
                scale,
                shape,
                var_p,
                losses.len(),
                exceedances.len(),
            );
            if shape > 0.0 && var > 0.0 {
                let es = gpd_es(var, threshold, scale, shape);
                return GpdRiskEstimates {
                    threshold,
                    scale,
                    shape,
                    var,
                    es,
                };
            }
        }
        threshold /= 2.0;
    }
    GpdRiskEstimates::default()
}

fn gpd_var(
    threshold: f64,
    scale: f64,
    shape: f64,
    probability: f64,
    total_n: usize,
    exceedance_n: usize,
) -> f64 {
    if exceedance_n == 0 || shape <= 0.0 {
        return 0.0;
    }
    let param_ratio = scale / shape;
    let prob_ratio = (total_n as f64 / exceedance_n as f64) * probability;
    threshold + param_ratio * (prob_ratio.powf(-shape) - 1.0)
}

fn gpd_es(var: f64, threshold: f64, scale: f64, shape: f64) -> f64 {
    if 1.0 - shape == 0.0 {
        return 0.0;
    }
    var / (1.0 - shape) + (scale - shape * threshold) / (1.0 - shape)
}

fn fit_gpd_params(exceedances: &[f64]) -> Option<[f64; 2]> {
    if exceedances.is_empty() {
        return None;
    }
    nelder_mead(
        |params| gpd_negative_loglikelihood(params, exceedances),
        [1.0, 1.0],
    )
}

fn gpd_negative_loglikelihood(params: [f64; 2], data: &[f64]) -> f64 {
    let [scale, shape] = params;
    let n = data.len() as f64;
    let loglikelihood = if shape != 0.0 {
        if scale != 0.0 && shape / scale >= 0.0 && scale >= 0.0 {
            -n * scale.ln()
                - (1.0 / shape + 1.0)
                    * data
                        .iter()
                        .map(|x| (shape / scale * x + 1.0).ln())
                        .sum::<f64>()
        } else {
            -f64::MAX
        }
    } else if scale >= 0.0 {
        -n * scale.ln() - data.iter().sum::<f64>() / scale
    } else {
        -f64::MAX
    };
    -loglikelihood
}

// Downhill simplex with the standard reflection/expansion/contraction
// coefficients, a 5% initial perturbation per coordinate, 1e-4 absolute
// tolerances, and a budget of 200 iterations and evaluations per dimension.
// Returns the best vertex only on convergence within budget.
fn nelder_mead(f: impl Fn([f64; 2]) -> f64, x0: [f64; 2]) -> Option<[f64; 2]> {
    const RHO: f64 = 1.0;
    const CHI: f64 = 2.0;
    const PSI: f64 = 0.5;
    const SIGMA: f64 = 0.5;
    const NONZDELT: f64 = 0.05;
    const ZDELT: f64 = 0.00025;
    const XATOL: f64 = 1e-4;
    const FATOL: f64 = 1e-4;
    const DIMS: usize = 2;
    let max_iterations = 200 * DIMS;
    let max_evaluations = 200 * DIMS;

    let mut evaluations = 0usize;
    let eval = |x: [f64; 2], count: &mut usize| {
        *count += 1;
        f(x)
    };

    let mut sim = [x0; 3];
    for k in 0..DIMS {
        if sim[k + 1][k] == 0.0 {
            sim[k + 1][k] = ZDELT;
        } else {
            sim[k + 1][k] *= 1.0 + NONZDELT;
        }
    }
    let mut fsim = [0.0f64; 3];
    for (vertex, value) in sim.iter().zip(fsim.iter_mut()) {
        *value = eval(*vertex, &mut evaluations);
    }
    sort_simplex(&mut sim, &mut fsim);

    let within_tolerance = |sim: &[[f64; 2]; 3], fsim: &[f64; 3]| {
        let x_spread = sim[1..]
            .iter()
            .flat_map(|v| v.iter().zip(sim[0].iter()).map(|(a, b)| (a - b).abs()))
            .fold(0.0f64, f64::max);
        let f_spread = fsim[1..]
            .iter()
            .map(|v| (v - fsim[0]).abs())
            .fold(0.0f64, f64::max);
        x_spread <= XATOL && f_spread <= FATOL
    };

    let mut iterations = 1usize;
    let mut converged = false;
    while evaluations < max_evaluations && iterations < max_iterations {
        if within_tolerance(&sim, &fsim) {
            converged = true;
            break;
        }

        let xbar = [
            (sim[0][0] + sim[1][0]) / 2.0,
            (sim[0][1] + sim[1][1]) / 2.0,
        ];
        let worst = sim[2];
        let reflect = |coef: f64| {
            [
                (1.0 + coef) * xbar[0] - coef * worst[0],
                (1.0 + coef) * xbar[1] - coef * worst[1],
            ]
        };

        let xr = reflect(RHO);
        let fxr = eval(xr, &mut evaluations);
        let mut shrink = false;

        if fxr < fsim[0] {
            let xe = reflect(RHO * CHI);
            let fxe = eval(xe, &mut evaluations);
            if fxe < fxr {
                sim[2] = xe;
                fsim[2] = fxe;
            } else {
                sim[2] = xr;
                fsim[2] = fxr;
            }
        } else if fxr < fsim[1] {
            sim[2] = xr;
            fsim[2] = fxr;
        } else {
            if fxr < fsim[2] {
                let xc = reflect(PSI * RHO);
                let fxc = eval(xc, &mut evaluations);
                if fxc <= fxr {
                    sim[2] = xc;
                    fsim[2] = fxc;
                } else {
                    shrink = true;
                }
            } else {
                let xcc = [
                    (1.0 - PSI) * xbar[0] + PSI * worst[0],
                    (1.0 - PSI) * xbar[1] + PSI * worst[1],
                ];
                let fxcc = eval(xcc, &mut evaluations);
                if fxcc < fsim[2] {
                    sim[2] = xcc;
                    fsim[2] = fxcc;
                } else {
                    shrink = true;
                }
            }
            if shrink {
                for j in 1..3 {
                    sim[j] = [
                        sim[0][0] + SIGMA * (sim[j][0] - sim[0][0]),
                        sim[0][1] + SIGMA * (sim[j][1] - sim[0][1]),
                    ];
                    fsim[j] = eval(sim[j], &mut evaluations);
                }
            }
        }

        sort_simplex(&mut sim, &mut fsim);
        iterations += 1;
    }

    converged.then_some(sim[0])
}

fn sort_simplex(sim: &mut [[f64; 2]; 3], fsim: &mut [f64; 3]) {
    let mut order = [0usize, 1, 2];
    order.sort_by(|a, b| fsim[*a].total_cmp(&fsim[*b]));
    *sim = [sim[order[0]], sim[order[1]], sim[order[2]]];
    *fsim = [fsim[order[0]], fsim[order[1]], fsim[order[2]]];
}
