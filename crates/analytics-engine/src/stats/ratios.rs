//! Risk-adjusted return ratios.

use crate::error::AnalyticsError;
use crate::periods::Annualization;
use crate::stats::backend;
use crate::stats::returns::annual_return;
use crate::stats::risk::max_drawdown;
use crate::stats::{Adjustment, excess_returns};

/// Annualized Sharpe ratio.
///
/// Mean excess return over its sample standard deviation, scaled by the
/// square root of the annualization factor. `risk_free` may be a scalar or a
/// series aligned with `returns`. `NaN` with fewer than two observations;
/// zero dispersion yields `NaN` or a signed infinity depending on the mean.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when a series threshold
/// disagrees with `returns` in length.
pub fn sharpe_ratio<'a>(
    returns: &[f64],
    risk_free: impl Into<Adjustment<'a>>,
    annualization: impl Into<Annualization>,
) -> Result<f64, AnalyticsError> {
    if returns.len() < 2 {
        return Ok(f64::NAN);
    }
    let excess = excess_returns(returns, risk_free)?;
    let factor = annualization.into().factor();
    Ok(backend::nanmean(&excess) / backend::nanstd(&excess, 1) * factor.sqrt())
}

/// Annualized Sortino ratio.
///
/// Mean excess return annualized linearly, divided by the annualized
/// downside deviation below the same threshold.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when a series threshold
/// disagrees with `returns` in length.
pub fn sortino_ratio<'a>(
    returns: &[f64],
    required_return: impl Into<Adjustment<'a>>,
    annualization: impl Into<Annualization>,
) -> Result<f64, AnalyticsError> {
    if returns.len() < 2 {
        return Ok(f64::NAN);
    }
    let excess = excess_returns(returns, required_return)?;
    let factor = annualization.into().factor();
    Ok(backend::nanmean(&excess) * factor / downside_from_excess(&excess, factor))
}

/// Annualized downside deviation.
///
/// Root mean square of the excess returns clipped above at zero, with the
/// full count of valid observations in the denominator, scaled by the square
/// root of the annualization factor. Zero when nothing falls below the
/// threshold; `NaN` for empty input.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when a series threshold
/// disagrees with `returns` in length.
pub fn downside_risk<'a>(
    returns: &[f64],
    required_return: impl Into<Adjustment<'a>>,
    annualization: impl Into<Annualization>,
) -> Result<f64, AnalyticsError> {
    if returns.is_empty() {
        return Ok(f64::NAN);
    }
    let excess = excess_returns(returns, required_return)?;
    Ok(downside_from_excess(&excess, annualization.into().factor()))
}

fn downside_from_excess(excess: &[f64], factor: f64) -> f64 {
    let clipped_squares: Vec<f64> = excess
        .iter()
        .map(|v| if *v < 0.0 { v * v } else { 0.0 * v })
        .collect();
    backend::nanmean(&clipped_squares).sqrt() * factor.sqrt()
}

/// Information ratio against a factor series: mean active return over its
/// sample standard deviation, with a `NaN` tracking error coerced to zero.
/// `NaN` with fewer than two observations.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when the inputs disagree in
/// length.
pub fn excess_sharpe(returns: &[f64], factor_returns: &[f64]) -> Result<f64, AnalyticsError> {
    if returns.len() < 2 {
        return Ok(f64::NAN);
    }
    let active = excess_returns(returns, factor_returns)?;
    let mut tracking_error = backend::nanstd(&active, 1);
    if tracking_error.is_nan() {
        tracking_error = 0.0;
    }
    Ok(backend::nanmean(&active) / tracking_error)
}

/// Calmar ratio: compound annual growth rate over the magnitude of the
/// maximum drawdown. `NaN` when the series never draws down or the quotient
/// is infinite.
pub fn calmar_ratio(returns: &[f64], annualization: impl Into<Annualization>) -> f64 {
    let max_dd = max_drawdown(returns);
    if max_dd < 0.0 {
        let ratio = annual_return(returns, annualization) / max_dd.abs();
        if ratio.is_infinite() { f64::NAN } else { ratio }
    } else {
        f64::NAN
    }
}

/// Omega ratio: probability-weighted gains over losses relative to a
/// threshold return.
///
/// The per-period threshold is `(1 + required_return)^(1 / factor) - 1`,
/// or `required_return` verbatim when the factor is one. `NaN` when
/// `required_return <= -1`, when no return falls below the threshold, or
/// with fewer than two observations.
pub fn omega_ratio(
    returns: &[f64],
    risk_free: f64,
    required_return: f64,
    annualization: impl Into<Annualization>,
) -> f64 {
    if returns.len() < 2 {
        return f64::NAN;
    }
    let factor = annualization.into().factor();
    let return_threshold = if factor == 1.0 {
        required_return
    } else if required_return <= -1.0 {
        return f64::NAN;
    } else {
        (1.0 + required_return).powf(1.0 / factor) - 1.0
    };

    let mut gains = 0.0;
    let mut losses = 0.0;
    for r in returns {
        let excess = r - risk_free - return_threshold;
        if excess > 0.0 {
            gains += excess;
        } else if excess < 0.0 {
            losses -= excess;
        }
    }
    if losses > 0.0 { gains / losses } else { f64::NAN }
}

/// R-squared of a linear fit to the cumulative log returns.
///
/// Measures how consistently the series compounds: 1.0 for a perfectly
/// steady growth path, 0.0 for a flat or patternless one. `NaN` values are
/// dropped before fitting; `NaN` when fewer than two observations remain.
pub fn stability_of_timeseries(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return f64::NAN;
    }
    let clean: Vec<f64> = returns.iter().copied().filter(|v| !v.is_nan()).collect();
    if clean.len() < 2 {
        return f64::NAN;
    }

    let mut acc = 0.0;
    let cum_log: Vec<f64> = clean
        .iter()
        .map(|r| {
            acc += r.ln_1p();
            acc
        })
        .collect();

    let n = cum_log.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = cum_log.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (i, y) in cum_log.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = sxx * syy;
    if denom == 0.0 {
        return 0.0;
    }
    let r = (sxy / denom.sqrt()).clamp(-1.0, 1.0);
    r * r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periods::Period;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-8,
            "expected {expected}, got {actual}"
        );
    }

    fn make_mixed() -> Vec<f64> {
        vec![f64::NAN, 0.01, 0.1, -0.04, 0.02, 0.03, 0.02, 0.01, -0.1]
    }

    fn make_benchmark() -> Vec<f64> {
        vec![0.0, 0.01, 0.0, 0.01, 0.0, 0.01, 0.0, 0.01, 0.0]
    }

    #[test]
    fn test_sharpe_mixed() {
        let sharpe = sharpe_ratio(&make_mixed(), 0.0, Period::Daily).unwrap();
        assert_close(sharpe, 1.7238613961706866);
    }

    #[test]
    fn test_sharpe_degenerate_dispersion() {
        assert!(
            sharpe_ratio(&[0.01, 0.01], 0.0, Period::Daily)
                .unwrap()
                .is_infinite()
        );
        assert!(sharpe_ratio(&[0.0, 0.0], 0.0, Period::Daily).unwrap().is_nan());
        assert!(sharpe_ratio(&[0.01], 0.0, Period::Daily).unwrap().is_nan());
        assert!(sharpe_ratio(&[], 0.0, Period::Daily).unwrap().is_nan());
    }

    #[test]
    fn test_sharpe_series_threshold() {
        let benchmark = make_benchmark();
        let adjusted = sharpe_ratio(&make_mixed(), &benchmark[..], Period::Daily).unwrap();
        let flat = sharpe_ratio(&make_mixed(), 0.0, Period::Daily).unwrap();
        assert!(adjusted < flat);

        let short = [0.0, 0.01];
        let err = sharpe_ratio(&make_mixed(), &short[..], Period::Daily).unwrap_err();
        assert_eq!(err, AnalyticsError::mismatched_inputs(9, 2));
    }

    #[test]
    fn test_downside_risk_mixed() {
        let risk = downside_risk(&make_mixed(), 0.0, Period::Daily).unwrap();
        assert_close(risk, 0.60448325038829653);
        assert!(downside_risk(&[], 0.0, Period::Daily).unwrap().is_nan());
        assert_eq!(downside_risk(&[0.01, 0.02], 0.0, Period::Daily).unwrap(), 0.0);
    }

    #[test]
    fn test_sortino_mixed() {
        let sortino = sortino_ratio(&make_mixed(), 0.0, Period::Daily).unwrap();
        assert_close(sortino, 2.605531251673693);
    }

    #[test]
    fn test_excess_sharpe_mixed() {
        let value = excess_sharpe(&make_mixed(), &make_benchmark()).unwrap();
        assert!((value - 0.0214882).abs() < 1e-5);
        assert!(excess_sharpe(&[0.01], &[0.0]).unwrap().is_nan());
    }

    #[test]
    fn test_calmar_mixed() {
        assert_close(calmar_ratio(&make_mixed(), Period::Daily), 19.135925373194233);
        // No drawdown means no ratio.
        assert!(calmar_ratio(&[0.01, 0.02], Period::Daily).is_nan());
    }

    #[test]
    fn test_omega_mixed_zero_threshold() {
        let omega = omega_ratio(&make_mixed(), 0.0, 0.0, 252.0);
        assert_close(omega, 0.19 / 0.14);
    }

    #[test]
    fn test_omega_threshold_edges() {
        // Annualization of one takes the required return verbatim.
        let raw = omega_ratio(&make_mixed(), 0.0, 0.01, 1.0);
        let annualized = omega_ratio(&make_mixed(), 0.0, 0.01, 252.0);
        assert!(raw < annualized);

        assert!(omega_ratio(&make_mixed(), 0.0, -1.0, 252.0).is_nan());
        // All returns above the threshold leave an empty loss tail.
        assert!(omega_ratio(&[0.01, 0.02], 0.0, 0.0, 252.0).is_nan());
        assert!(omega_ratio(&[0.01], 0.0, 0.0, 252.0).is_nan());
    }

    #[test]
    fn test_stability_bounds() {
        // Constant compounding is perfectly explained by a linear fit.
        assert_close(stability_of_timeseries(&[0.01; 30]), 1.0);
        // A flat line at zero has no dispersion to explain.
        assert_eq!(stability_of_timeseries(&[0.0; 30]), 0.0);

        let mixed = stability_of_timeseries(&make_mixed());
        assert!(mixed > 0.0 && mixed < 1.0);
        assert!(stability_of_timeseries(&[0.01]).is_nan());
        assert!(stability_of_timeseries(&[f64::NAN, 0.01]).is_nan());
    }
}
