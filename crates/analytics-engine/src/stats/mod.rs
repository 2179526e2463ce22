//! The performance-statistics catalog.
//!
//! Every statistic is a pure function over return buffers (`&[f64]`) or
//! labeled [`ReturnSeries`] values, re-exported flat from this module:
//!
//! - returns: simple/cumulative/annualized return transforms
//! - ratios: Sharpe, Sortino, Calmar, Omega, excess Sharpe, stability
//! - risk: drawdown, tail ratio, the VaR family, moments, GPD tail fits
//! - regression: alpha/beta, up/down variants, capture ratios, fragility
//! - rolling: the trailing-window engine and its wrappers
//! - aggregate: calendar bucketing (weekly/monthly/quarterly/yearly)
//!
//! Missing observations are `NaN` and skipped per the reducers in
//! [`backend`]; degenerate inputs resolve to `NaN`, structural misuse to
//! [`AnalyticsError`].

use std::borrow::Cow;

use crate::error::AnalyticsError;
use crate::series::ReturnSeries;

pub mod backend;

mod aggregate;
mod ratios;
mod regression;
mod returns;
mod risk;
mod rolling;

pub use aggregate::{AggregatedReturn, aggregate_returns};
pub use ratios::{
    calmar_ratio, downside_risk, excess_sharpe, omega_ratio, sharpe_ratio, sortino_ratio,
    stability_of_timeseries,
};
pub use regression::{
    BattingAverage, alpha, alpha_beta, alpha_beta_series, batting_average, beta,
    beta_fragility_heuristic, beta_series, capture, down_alpha_beta, down_capture, up_alpha_beta,
    up_capture, up_down_capture,
};
pub use returns::{
    annual_return, annual_volatility, cum_returns, cum_returns_final, cum_returns_series,
    simple_returns, simple_returns_series,
};
pub use risk::{
    GpdRiskEstimates, conditional_value_at_risk, gpd_risk_estimates, kurtosis, max_drawdown, skew,
    tail_ratio, value_at_risk, value_at_risk_historical, value_at_risk_series,
};
pub use rolling::{
    RollingAlphaBeta, down, roll, roll_alpha_beta, roll_array, roll_beta, roll_down_capture,
    roll_max_drawdown, roll_pair, roll_pair_array, roll_sharpe_ratio, roll_up_capture,
    roll_up_down_capture, up,
};

pub(crate) use aggregate::aggregate_monthly;

// ============================================================================
// Adjustment
// ============================================================================

/// Per-period adjustment subtracted from a return buffer before a statistic
/// runs.
///
/// Most callers pass a scalar risk-free rate (usually `0.0`); threshold and
/// benchmark-relative statistics pass another return buffer to be subtracted
/// row for row.
#[derive(Debug, Clone, Copy)]
pub enum Adjustment<'a> {
    /// Constant per-period rate.
    Scalar(f64),
    /// Per-period rates aligned row for row with the returns.
    Series(&'a [f64]),
}

impl From<f64> for Adjustment<'_> {
    fn from(rate: f64) -> Self {
        Self::Scalar(rate)
    }
}

impl<'a> From<&'a [f64]> for Adjustment<'a> {
    fn from(rates: &'a [f64]) -> Self {
        Self::Series(rates)
    }
}

impl<'a> From<&'a Vec<f64>> for Adjustment<'a> {
    fn from(rates: &'a Vec<f64>) -> Self {
        Self::Series(rates)
    }
}

impl<'a> From<&'a ReturnSeries> for Adjustment<'a> {
    fn from(series: &'a ReturnSeries) -> Self {
        Self::Series(series.values())
    }
}

/// Subtracts an [`Adjustment`] from `returns`.
///
/// A zero scalar borrows the input unchanged, so the common
/// `risk_free = 0.0` path allocates nothing. A series adjustment must match
/// the returns in length; `NaN` on either side stays `NaN` in the output.
///
/// # Errors
///
/// Returns [`AnalyticsError::MismatchedInputs`] when a series adjustment
/// disagrees with the returns in length.
pub(crate) fn excess_returns<'a, 'b>(
    returns: &'a [f64],
    adjustment: impl Into<Adjustment<'b>>,
) -> Result<Cow<'a, [f64]>, AnalyticsError> {
    match adjustment.into() {
        Adjustment::Scalar(rate) => {
            if rate == 0.0 {
                Ok(Cow::Borrowed(returns))
            } else {
                Ok(Cow::Owned(returns.iter().map(|r| r - rate).collect()))
            }
        }
        Adjustment::Series(rates) => {
            check_lengths(returns, rates)?;
            Ok(Cow::Owned(
                returns.iter().zip(rates).map(|(r, rate)| r - rate).collect(),
            ))
        }
    }
}

pub(crate) fn check_lengths(left: &[f64], right: &[f64]) -> Result<(), AnalyticsError> {
    if left.len() == right.len() {
        Ok(())
    } else {
        Err(AnalyticsError::mismatched_inputs(left.len(), right.len()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_scalar_adjustment_borrows() {
        let returns = [0.01, -0.02, 0.03];
        let excess = excess_returns(&returns, 0.0).unwrap();
        assert!(matches!(excess, Cow::Borrowed(_)));
        assert_eq!(excess.as_ref(), &returns);
    }

    #[test]
    fn test_scalar_adjustment_shifts_every_row() {
        let returns = [0.01, -0.02, 0.03];
        let excess = excess_returns(&returns, 0.01).unwrap();
        assert!(matches!(excess, Cow::Owned(_)));
        for (e, expected) in excess.iter().zip([0.0, -0.03, 0.02]) {
            assert!((e - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_series_adjustment_subtracts_row_for_row() {
        let returns = vec![0.03, 0.02, f64::NAN];
        let rates = vec![0.01, 0.02, 0.0];
        let excess = excess_returns(&returns, &rates).unwrap();
        assert!((excess[0] - 0.02).abs() < 1e-12);
        assert_eq!(excess[1], 0.0);
        assert!(excess[2].is_nan());
    }

    #[test]
    fn test_series_adjustment_length_mismatch() {
        let err = excess_returns(&[0.01, 0.02], &[0.01][..]).unwrap_err();
        assert_eq!(err, AnalyticsError::mismatched_inputs(2, 1));
    }
}
