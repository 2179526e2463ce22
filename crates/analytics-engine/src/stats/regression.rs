//! Benchmark-relative regression and capture statistics.
//!
//! The regression pair treats the factor (benchmark) series as the
//! independent variable: `beta` is the slope of the ordinary least squares
//! fit over rows where both series are observed, and `alpha` is the
//! annualized mean residual against that slope. Capture ratios compare
//! compound annual growth between the strategy and the factor over all, up,
//! or down factor rows.

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::periods::Annualization;
use crate::series::ReturnSeries;
use crate::stats::backend;
use crate::stats::check_lengths;
use crate::stats::returns::annual_return;

/// Independent-variable variances below this threshold make the OLS slope
/// numerically meaningless and resolve to `NaN`.
const MIN_INDEPENDENT_VARIANCE: f64 = 1e-30;

// ============================================================================
// Alpha / Beta
// ============================================================================

/// OLS slope of `returns` against `factor_returns` over equal-length
/// buffers. `NaN` with fewer than two rows or a degenerate factor.
pub(crate) fn beta_aligned(returns: &[f64], factor_returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return f64::NAN;
    }
    // Mask the independent side wherever the dependent value is missing so
    // the center and both moments all run over the same joint-valid rows.
    let independent: Vec<f64> = returns
        .iter()
        .zip(factor_returns)
        .map(|(r, f)| if r.is_nan() { f64::NAN } else { *f })
        .collect();
    let center = backend::nanmean(&independent);
    let covariance_terms: Vec<f64> = independent
        .iter()
        .zip(returns)
        .map(|(x, r)| (x - center) * r)
        .collect();
    let variance_terms: Vec<f64> = independent
        .iter()
        .map(|x| (x - center) * (x - center))
        .collect();
    let variance = backend::nanmean(&variance_terms);
    if variance < MIN_INDEPENDENT_VARIANCE {
        return f64::NAN;
    }
    backend::nanmean(&covariance_terms) / variance
}

/// Annualized mean residual of the OLS fit.
///
/// `(nanmean((r − rf) − beta * (f − rf)) + 1) ^ factor − 1`, with the slope
/// recomputed unless a hint is supplied. `NaN` with fewer than two rows.
fn alpha_aligned(
    returns: &[f64],
    factor_returns: &[f64],
    risk_free: f64,
    annualization: Annualization,
    beta_hint: Option<f64>,
) -> f64 {
    if returns.len() < 2 {
        return f64::NAN;
    }
    let beta = beta_hint.unwrap_or_else(|| beta_aligned(returns, factor_returns));
    let residuals: Vec<f64> = returns
        .iter()
        .zip(factor_returns)
        .map(|(r, f)| (r - risk_free) - beta * (f - risk_free))
        .collect();
    (backend::nanmean(&residuals) + 1.0).powf(annualization.factor()) - 1.0
}

pub(crate) fn alpha_beta_aligned(
    returns: &[f64],
    factor_returns: &[f64],
    risk_free: f64,
    annualization: Annualization,
) -> (f64, f64) {
    let beta = beta_aligned(returns, factor_returns);
    let alpha = alpha_aligned(returns, factor_returns, risk_free, annualization, Some(beta));
    (alpha, beta)
}

/// Annualized alpha and beta of `returns` against `factor_returns`.
///
/// Rows where either value is `NaN` are excluded from the fit. `(NaN, NaN)`
/// with fewer than two rows; beta alone is `NaN` when the factor variance
/// collapses below `1e-30`.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the inputs disagree in
/// length.
pub fn alpha_beta(
    returns: &[f64],
    factor_returns: &[f64],
    risk_free: f64,
    annualization: impl Into<Annualization>,
) -> Result<(f64, f64), AnalyticsError> {
    check_lengths(returns, factor_returns)?;
    Ok(alpha_beta_aligned(
        returns,
        factor_returns,
        risk_free,
        annualization.into(),
    ))
}

/// Annualized alpha alone.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the inputs disagree in
/// length.
pub fn alpha(
    returns: &[f64],
    factor_returns: &[f64],
    risk_free: f64,
    annualization: impl Into<Annualization>,
) -> Result<f64, AnalyticsError> {
    check_lengths(returns, factor_returns)?;
    Ok(alpha_aligned(
        returns,
        factor_returns,
        risk_free,
        annualization.into(),
        None,
    ))
}

/// OLS beta alone.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the inputs disagree in
/// length.
pub fn beta(returns: &[f64], factor_returns: &[f64]) -> Result<f64, AnalyticsError> {
    check_lengths(returns, factor_returns)?;
    Ok(beta_aligned(returns, factor_returns))
}

/// [`alpha_beta`] over labeled series, outer-aligned on their indexes first.
///
/// Rows present in only one series are `NaN`-filled by the alignment and
/// excluded from the fit, so differing indexes are handled rather than
/// rejected.
pub fn alpha_beta_series(
    returns: &ReturnSeries,
    factor_returns: &ReturnSeries,
    risk_free: f64,
    annualization: impl Into<Annualization>,
) -> (f64, f64) {
    let (aligned_returns, aligned_factor) = returns.align_outer(factor_returns);
    alpha_beta_aligned(
        aligned_returns.values(),
        aligned_factor.values(),
        risk_free,
        annualization.into(),
    )
}

/// [`beta`] over labeled series, outer-aligned on their indexes first.
pub fn beta_series(returns: &ReturnSeries, factor_returns: &ReturnSeries) -> f64 {
    let (aligned_returns, aligned_factor) = returns.align_outer(factor_returns);
    beta_aligned(aligned_returns.values(), aligned_factor.values())
}

// ============================================================================
// Up / Down Market Variants
// ============================================================================

/// Keeps the row pairs whose factor return satisfies `keep`. `NaN` factor
/// rows satisfy neither direction and drop out of both filters.
pub(crate) fn filter_by_factor(
    returns: &[f64],
    factor_returns: &[f64],
    keep: impl Fn(f64) -> bool,
) -> (Vec<f64>, Vec<f64>) {
    returns
        .iter()
        .zip(factor_returns)
        .filter(|(_, f)| keep(**f))
        .map(|(r, f)| (*r, *f))
        .unzip()
}

/// [`alpha_beta`] restricted to rows where the factor return is positive.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the inputs disagree in
/// length.
pub fn up_alpha_beta(
    returns: &[f64],
    factor_returns: &[f64],
    risk_free: f64,
    annualization: impl Into<Annualization>,
) -> Result<(f64, f64), AnalyticsError> {
    check_lengths(returns, factor_returns)?;
    let (up_returns, up_factor) = filter_by_factor(returns, factor_returns, |f| f > 0.0);
    Ok(alpha_beta_aligned(
        &up_returns,
        &up_factor,
        risk_free,
        annualization.into(),
    ))
}

/// [`alpha_beta`] restricted to rows where the factor return is negative.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the inputs disagree in
/// length.
pub fn down_alpha_beta(
    returns: &[f64],
    factor_returns: &[f64],
    risk_free: f64,
    annualization: impl Into<Annualization>,
) -> Result<(f64, f64), AnalyticsError> {
    check_lengths(returns, factor_returns)?;
    let (down_returns, down_factor) = filter_by_factor(returns, factor_returns, |f| f < 0.0);
    Ok(alpha_beta_aligned(
        &down_returns,
        &down_factor,
        risk_free,
        annualization.into(),
    ))
}

// ============================================================================
// Capture Ratios
// ============================================================================

pub(crate) fn capture_aligned(
    returns: &[f64],
    factor_returns: &[f64],
    annualization: Annualization,
) -> f64 {
    annual_return(returns, annualization) / annual_return(factor_returns, annualization)
}

pub(crate) fn up_capture_aligned(
    returns: &[f64],
    factor_returns: &[f64],
    annualization: Annualization,
) -> f64 {
    let (up_returns, up_factor) = filter_by_factor(returns, factor_returns, |f| f > 0.0);
    capture_aligned(&up_returns, &up_factor, annualization)
}

pub(crate) fn down_capture_aligned(
    returns: &[f64],
    factor_returns: &[f64],
    annualization: Annualization,
) -> f64 {
    let (down_returns, down_factor) = filter_by_factor(returns, factor_returns, |f| f < 0.0);
    capture_aligned(&down_returns, &down_factor, annualization)
}

pub(crate) fn up_down_capture_aligned(
    returns: &[f64],
    factor_returns: &[f64],
    annualization: Annualization,
) -> f64 {
    up_capture_aligned(returns, factor_returns, annualization)
        / down_capture_aligned(returns, factor_returns, annualization)
}

/// Capture ratio: compound annual growth of `returns` over that of
/// `factor_returns`. `NaN` when either side is empty.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the inputs disagree in
/// length.
pub fn capture(
    returns: &[f64],
    factor_returns: &[f64],
    annualization: impl Into<Annualization>,
) -> Result<f64, AnalyticsError> {
    check_lengths(returns, factor_returns)?;
    Ok(capture_aligned(returns, factor_returns, annualization.into()))
}

/// [`capture`] restricted to rows where the factor return is positive.
/// `NaN` when the factor never rises.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the inputs disagree in
/// length.
pub fn up_capture(
    returns: &[f64],
    factor_returns: &[f64],
    annualization: impl Into<Annualization>,
) -> Result<f64, AnalyticsError> {
    check_lengths(returns, factor_returns)?;
    Ok(up_capture_aligned(
        returns,
        factor_returns,
        annualization.into(),
    ))
}

/// [`capture`] restricted to rows where the factor return is negative.
/// `NaN` when the factor never falls.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the inputs disagree in
/// length.
pub fn down_capture(
    returns: &[f64],
    factor_returns: &[f64],
    annualization: impl Into<Annualization>,
) -> Result<f64, AnalyticsError> {
    check_lengths(returns, factor_returns)?;
    Ok(down_capture_aligned(
        returns,
        factor_returns,
        annualization.into(),
    ))
}

/// Quotient of [`up_capture`] over [`down_capture`].
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the inputs disagree in
/// length.
pub fn up_down_capture(
    returns: &[f64],
    factor_returns: &[f64],
    annualization: impl Into<Annualization>,
) -> Result<f64, AnalyticsError> {
    check_lengths(returns, factor_returns)?;
    Ok(up_down_capture_aligned(
        returns,
        factor_returns,
        annualization.into(),
    ))
}

// ============================================================================
// Fragility & Hit Rates
// ============================================================================

/// Median-of-three heuristic for convexity of `returns` against the factor.
///
/// Joint-valid row pairs are stable-sorted by factor return; the start, the
/// `round_half_even(n / 2)`-th, and the last pair form a convex combination
/// whose weights come from the factor spread. Positive values indicate
/// concavity toward large factor moves (fragility). `NaN` with fewer than
/// three rows or when no joint-valid pair remains.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the inputs disagree in
/// length.
pub fn beta_fragility_heuristic(
    returns: &[f64],
    factor_returns: &[f64],
) -> Result<f64, AnalyticsError> {
    check_lengths(returns, factor_returns)?;
    if returns.len() < 3 {
        return Ok(f64::NAN);
    }

    let mut pairs: Vec<(f64, f64)> = factor_returns
        .iter()
        .zip(returns)
        .filter(|(f, r)| !f.is_nan() && !r.is_nan())
        .map(|(f, r)| (*f, *r))
        .collect();
    if pairs.is_empty() {
        return Ok(f64::NAN);
    }
    // Stable sort keeps the original row order inside equal-factor runs,
    // which pins down which return lands at the median slot.
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mid_index = (pairs.len() as f64 / 2.0).round_ties_even() as usize;
    let (start_factor, start_return) = pairs[0];
    let (mid_factor, mid_return) = pairs[mid_index.min(pairs.len() - 1)];
    let (end_factor, end_return) = pairs[pairs.len() - 1];

    let factor_spread = end_factor - start_factor;
    let (start_weight, end_weight) = if factor_spread == 0.0 {
        (0.5, 0.5)
    } else {
        (
            (mid_factor - start_factor) / factor_spread,
            (end_factor - mid_factor) / factor_spread,
        )
    };
    Ok(start_weight * start_return + end_weight * end_return - mid_return)
}

/// Hit rates of the strategy against the factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BattingAverage {
    /// Fraction of joint-valid rows where the strategy beat the factor.
    pub overall: f64,
    /// The same fraction over rows where the factor return was positive.
    pub up_market: f64,
    /// The same fraction over rows where the factor return was negative.
    pub down_market: f64,
}

impl BattingAverage {
    /// The three rates as `[overall, up_market, down_market]`.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 3] {
        [self.overall, self.up_market, self.down_market]
    }
}

fn hit_rate(returns: &[f64], factor_returns: &[f64], keep: impl Fn(f64) -> bool) -> f64 {
    let mut wins = 0_usize;
    let mut total = 0_usize;
    for (r, f) in returns.iter().zip(factor_returns) {
        if r.is_nan() || f.is_nan() || !keep(*f) {
            continue;
        }
        total += 1;
        if r > f {
            wins += 1;
        }
    }
    if total == 0 {
        f64::NAN
    } else {
        wins as f64 / total as f64
    }
}

/// Fraction of periods in which the strategy beat the factor, overall and
/// split by factor direction. Buckets with no qualifying rows are `NaN`.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the inputs disagree in
/// length.
pub fn batting_average(
    returns: &[f64],
    factor_returns: &[f64],
) -> Result<BattingAverage, AnalyticsError> {
    check_lengths(returns, factor_returns)?;
    Ok(BattingAverage {
        overall: hit_rate(returns, factor_returns, |_| true),
        up_market: hit_rate(returns, factor_returns, |f| f > 0.0),
        down_market: hit_rate(returns, factor_returns, |f| f < 0.0),
    })
}

// ============================================================================
// Tests
// ============================================================================
