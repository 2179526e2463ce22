//! Return-path transforms and annualized level statistics.

use crate::periods::Annualization;
use crate::series::ReturnSeries;
use crate::stats::backend;

/// Period-over-period returns from a price path.
///
/// Output holds one entry per consecutive pair, `price[t] / price[t-1] - 1`,
/// so it is one element shorter than the input. Inputs with fewer than two
/// prices produce an empty buffer.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// [`simple_returns`] over a price series, dropping the first timestamp.
pub fn simple_returns_series(prices: &ReturnSeries) -> ReturnSeries {
    let values = simple_returns(prices.values());
    let index = if prices.is_empty() {
        Vec::new()
    } else {
        prices.index()[1..].to_vec()
    };
    ReturnSeries::from_validated(index, values)
}

/// Cumulative return path.
///
/// Compounds `starting_value * prod(1 + r)` position by position, treating
/// `NaN` returns as zero. A `starting_value` of zero switches the output to
/// growth above zero, `prod(1 + r) - 1`.
pub fn cum_returns(returns: &[f64], starting_value: f64) -> Vec<f64> {
    let mut acc = 1.0;
    returns
        .iter()
        .map(|r| {
            if !r.is_nan() {
                acc *= 1.0 + r;
            }
            if starting_value == 0.0 {
                acc - 1.0
            } else {
                acc * starting_value
            }
        })
        .collect()
}

/// [`cum_returns`] with the input index preserved.
pub fn cum_returns_series(returns: &ReturnSeries, starting_value: f64) -> ReturnSeries {
    ReturnSeries::from_validated(
        returns.index().to_vec(),
        cum_returns(returns.values(), starting_value),
    )
}

/// Final value of the cumulative return path; `NaN` for empty input.
pub fn cum_returns_final(returns: &[f64], starting_value: f64) -> f64 {
    if returns.is_empty() {
        return f64::NAN;
    }
    let product: f64 = returns
        .iter()
        .filter(|r| !r.is_nan())
        .map(|r| 1.0 + r)
        .product();
    if starting_value == 0.0 {
        product - 1.0
    } else {
        product * starting_value
    }
}

/// Compound annual growth rate.
///
/// Total compounded growth raised to `factor / len`, counting `NaN` rows in
/// the period count. `NaN` for empty input.
pub fn annual_return(returns: &[f64], annualization: impl Into<Annualization>) -> f64 {
    if returns.is_empty() {
        return f64::NAN;
    }
    let factor = annualization.into().factor();
    let num_years = returns.len() as f64 / factor;
    let ending_value = cum_returns_final(returns, 1.0);
    ending_value.powf(1.0 / num_years) - 1.0
}

/// Annualized standard deviation of returns.
///
/// `nanstd` with the given `ddof`, scaled by the square root of the
/// annualization factor. `NaN` when fewer than two observations.
pub fn annual_volatility(
    returns: &[f64],
    annualization: impl Into<Annualization>,
    ddof: usize,
) -> f64 {
    if returns.len() < 2 {
        return f64::NAN;
    }
    backend::nanstd(returns, ddof) * annualization.into().factor().sqrt()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

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

    #[test]
    fn test_simple_returns_from_prices() {
        let prices = [100.0, 120.0, 90.0];
        let returns = simple_returns(&prices);
        assert_eq!(returns.len(), 2);
        assert_close(returns[0], 0.2);
        assert_close(returns[1], -0.25);
        assert!(simple_returns(&[100.0]).is_empty());
    }

    #[test]
    fn test_simple_returns_series_drops_first_timestamp() {
        let index = (1..=3)
            .map(|d| Utc.with_ymd_and_hms(2020, 1, d, 0, 0, 0).unwrap())
            .collect();
        let prices = ReturnSeries::new(index, vec![100.0, 110.0, 121.0]).unwrap();
        let returns = simple_returns_series(&prices);
        assert_eq!(returns.len(), 2);
        assert_eq!(returns.first_timestamp(), Some(prices.index()[1]));
    }

    #[test]
    fn test_cum_returns_treats_nan_as_flat() {
        let path = cum_returns(&make_mixed(), 0.0);
        assert_eq!(path.len(), 9);
        assert_eq!(path[0], 0.0);
        assert_close(path[1], 0.01);
        assert_close(path[8], 0.03893109170048);
    }

    #[test]
    fn test_cum_returns_starting_value_scales_path() {
        let path = cum_returns(&[0.1, -0.05], 100.0);
        assert_close(path[0], 110.0);
        assert_close(path[1], 104.5);
    }

    #[test]
    fn test_cum_returns_empty() {
        assert!(cum_returns(&[], 0.0).is_empty());
        assert!(cum_returns_final(&[], 0.0).is_nan());
    }

    #[test]
    fn test_cum_returns_final_matches_path_end() {
        let mixed = make_mixed();
        let path = cum_returns(&mixed, 0.0);
        assert_close(cum_returns_final(&mixed, 0.0), path[8]);
    }

    #[test]
    fn test_annual_return_mixed() {
        assert_close(annual_return(&make_mixed(), Period::Daily), 1.9135925373194231);
        assert!(annual_return(&[], Period::Daily).is_nan());
    }

    #[test]
    fn test_annual_return_counts_nan_periods() {
        // The NaN row dilutes growth through the period count.
        let with_nan = annual_return(&make_mixed(), Period::Daily);
        let without: Vec<f64> = make_mixed()[1..].to_vec();
        assert!(annual_return(&without, Period::Daily) > with_nan);
    }

    #[test]
    fn test_annual_volatility_mixed() {
        assert_close(
            annual_volatility(&make_mixed(), Period::Daily, 1),
            0.9136465399704637,
        );
        assert!(annual_volatility(&[0.01], Period::Daily, 1).is_nan());
    }

    #[test]
    fn test_annual_volatility_custom_factor() {
        let weekly = [0.1, 0.2, -0.1];
        let expected = annual_volatility(&weekly, Period::Weekly, 1);
        assert_close(annual_volatility(&weekly, 52.0, 1), expected);
    }
}
