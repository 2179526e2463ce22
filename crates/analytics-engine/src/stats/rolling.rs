//! Trailing-window application of the statistics catalog.
//!
//! The engine walks zero-copy slices over the input (`slice::windows`), so a
//! rolling statistic costs one closure call per window with no per-window
//! allocation beyond what the statistic itself needs. Output rows are stamped
//! with the timestamp of each window's last observation, matching how the
//! dashboard plots trailing measures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::periods::Annualization;
use crate::series::ReturnSeries;
use crate::stats::check_lengths;
use crate::stats::ratios::sharpe_ratio;
use crate::stats::regression::{
    alpha_beta_aligned, beta_aligned, down_capture_aligned, filter_by_factor, up_capture_aligned,
    up_down_capture_aligned,
};
use crate::stats::risk::max_drawdown;

// ============================================================================
// Core Engine
// ============================================================================

/// Applies `stat` to every `window`-length slice of `values`.
///
/// The output has `len - window + 1` entries; a zero-length window or one
/// longer than the input yields an empty vector.
pub fn roll_array(values: &[f64], window: usize, stat: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    if window == 0 || window > values.len() {
        return Vec::new();
    }
    values.windows(window).map(stat).collect()
}

/// [`roll_array`] over a labeled series, stamping each output row with the
/// timestamp of its window's last observation.
pub fn roll(series: &ReturnSeries, window: usize, stat: impl Fn(&[f64]) -> f64) -> ReturnSeries {
    let values = roll_array(series.values(), window, stat);
    let index = if values.is_empty() {
        Vec::new()
    } else {
        series.index()[window - 1..].to_vec()
    };
    ReturnSeries::from_validated(index, values)
}

/// Applies `stat` to paired `window`-length slices of two buffers.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the buffers disagree in
/// length.
pub fn roll_pair_array(
    returns: &[f64],
    factor_returns: &[f64],
    window: usize,
    stat: impl Fn(&[f64], &[f64]) -> f64,
) -> Result<Vec<f64>, AnalyticsError> {
    check_lengths(returns, factor_returns)?;
    if window == 0 || window > returns.len() {
        return Ok(Vec::new());
    }
    Ok(returns
        .windows(window)
        .zip(factor_returns.windows(window))
        .map(|(r, f)| stat(r, f))
        .collect())
}

/// [`roll_pair_array`] over labeled series sharing one index.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the series disagree in
/// length, or [`AnalyticsError::InvalidIndex`] when their timestamps differ.
pub fn roll_pair(
    returns: &ReturnSeries,
    factor_returns: &ReturnSeries,
    window: usize,
    stat: impl Fn(&[f64], &[f64]) -> f64,
) -> Result<ReturnSeries, AnalyticsError> {
    check_paired_index(returns, factor_returns)?;
    let values = roll_pair_array(returns.values(), factor_returns.values(), window, stat)?;
    let index = if values.is_empty() {
        Vec::new()
    } else {
        returns.index()[window - 1..].to_vec()
    };
    Ok(ReturnSeries::from_validated(index, values))
}

fn check_paired_index(
    returns: &ReturnSeries,
    factor_returns: &ReturnSeries,
) -> Result<(), AnalyticsError> {
    check_lengths(returns.values(), factor_returns.values())?;
    if returns.index() != factor_returns.index() {
        return Err(AnalyticsError::invalid_index(
            "paired rolling statistics require identical timestamps",
        ));
    }
    Ok(())
}

// ============================================================================
// Direction Combinators
// ============================================================================

/// Runs `stat` over only the rows where the factor return is positive.
pub fn up<T>(returns: &[f64], factor_returns: &[f64], stat: impl FnOnce(&[f64], &[f64]) -> T) -> T {
    let (up_returns, up_factor) = filter_by_factor(returns, factor_returns, |f| f > 0.0);
    stat(&up_returns, &up_factor)
}

/// Runs `stat` over only the rows where the factor return is negative.
pub fn down<T>(
    returns: &[f64],
    factor_returns: &[f64],
    stat: impl FnOnce(&[f64], &[f64]) -> T,
) -> T {
    let (down_returns, down_factor) = filter_by_factor(returns, factor_returns, |f| f < 0.0);
    stat(&down_returns, &down_factor)
}

// ============================================================================
// Rolling Wrappers
// ============================================================================

/// Rolling [`max_drawdown`] over trailing windows.
pub fn roll_max_drawdown(series: &ReturnSeries, window: usize) -> ReturnSeries {
    roll(series, window, max_drawdown)
}

/// Rolling [`sharpe_ratio`] with a scalar risk-free rate.
pub fn roll_sharpe_ratio(
    series: &ReturnSeries,
    window: usize,
    risk_free: f64,
    annualization: impl Into<Annualization>,
) -> ReturnSeries {
    let annualization = annualization.into();
    roll(series, window, |values| {
        sharpe_ratio(values, risk_free, annualization).unwrap_or(f64::NAN)
    })
}

/// One row of a rolling alpha/beta regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingAlphaBeta {
    /// Timestamp of the window's last observation.
    pub timestamp: DateTime<Utc>,
    /// Annualized alpha over the trailing window.
    pub alpha: f64,
    /// OLS beta over the trailing window.
    pub beta: f64,
}

/// Rolling annualized alpha and OLS beta against a factor series.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the series disagree in
/// length, or [`AnalyticsError::InvalidIndex`] when their timestamps differ.
pub fn roll_alpha_beta(
    returns: &ReturnSeries,
    factor_returns: &ReturnSeries,
    window: usize,
    risk_free: f64,
    annualization: impl Into<Annualization>,
) -> Result<Vec<RollingAlphaBeta>, AnalyticsError> {
    check_paired_index(returns, factor_returns)?;
    if window == 0 || window > returns.len() {
        return Ok(Vec::new());
    }
    let annualization = annualization.into();
    Ok(returns
        .values()
        .windows(window)
        .zip(factor_returns.values().windows(window))
        .zip(&returns.index()[window - 1..])
        .map(|((r, f), timestamp)| {
            let (alpha, beta) = alpha_beta_aligned(r, f, risk_free, annualization);
            RollingAlphaBeta {
                timestamp: *timestamp,
                alpha,
                beta,
            }
        })
        .collect())
}

/// Rolling OLS beta against a factor series.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the series disagree in
/// length, or [`AnalyticsError::InvalidIndex`] when their timestamps differ.
pub fn roll_beta(
    returns: &ReturnSeries,
    factor_returns: &ReturnSeries,
    window: usize,
) -> Result<ReturnSeries, AnalyticsError> {
    roll_pair(returns, factor_returns, window, beta_aligned)
}

/// Rolling up-market capture ratio against a factor series.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the series disagree in
/// length, or [`AnalyticsError::InvalidIndex`] when their timestamps differ.
pub fn roll_up_capture(
    returns: &ReturnSeries,
    factor_returns: &ReturnSeries,
    window: usize,
    annualization: impl Into<Annualization>,
) -> Result<ReturnSeries, AnalyticsError> {
    let annualization = annualization.into();
    roll_pair(returns, factor_returns, window, |r, f| {
        up_capture_aligned(r, f, annualization)
    })
}

/// Rolling down-market capture ratio against a factor series.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the series disagree in
/// length, or [`AnalyticsError::InvalidIndex`] when their timestamps differ.
pub fn roll_down_capture(
    returns: &ReturnSeries,
    factor_returns: &ReturnSeries,
    window: usize,
    annualization: impl Into<Annualization>,
) -> Result<ReturnSeries, AnalyticsError> {
    let annualization = annualization.into();
    roll_pair(returns, factor_returns, window, |r, f| {
        down_capture_aligned(r, f, annualization)
    })
}

/// Rolling up-capture over down-capture quotient against a factor series.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the series disagree in
/// length, or [`AnalyticsError::InvalidIndex`] when their timestamps differ.
pub fn roll_up_down_capture(
    returns: &ReturnSeries,
    factor_returns: &ReturnSeries,
    window: usize,
    annualization: impl Into<Annualization>,
) -> Result<ReturnSeries, AnalyticsError> {
    let annualization = annualization.into();
    roll_pair(returns, factor_returns, window, |r, f| {
        up_down_capture_aligned(r, f, annualization)
    })
}

// ============================================================================
// Tests
// ============================================================================
