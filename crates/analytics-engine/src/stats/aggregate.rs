//! Resampling of return series to coarser periodicities.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::periods::Period;
use crate::series::ReturnSeries;

/// One compounded bucket of an aggregated return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedReturn {
    /// Calendar year of the bucket.
    pub year: i32,
    /// Quarter, month, or ISO week number within `year`; `0` for yearly
    /// aggregation.
    pub subperiod: u32,
    /// Compounded return of the bucket.
    pub value: f64,
}

/// Compounds a finer-grained return series into coarser buckets.
///
/// Within each bucket the return is `prod(1 + r) - 1` with `NaN` rows
/// contributing a factor of one. Buckets are keyed by calendar year plus the
/// subperiod number and come back in ascending key order. Weekly buckets pair
/// the calendar year with the ISO week number, so the handful of December
/// days that ISO assigns to week 1 of the following year land in a
/// `(year, 1)` bucket of their own calendar year.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidPeriod`] for [`Period::Daily`], which has
/// nothing to compound into.
pub fn aggregate_returns(
    series: &ReturnSeries,
    period: Period,
) -> Result<Vec<AggregatedReturn>, AnalyticsError> {
    let key_fn: fn(DateTime<Utc>) -> (i32, u32) = match period {
        Period::Daily => {
            return Err(AnalyticsError::invalid_period(Period::Daily.label()));
        }
        Period::Weekly => |ts| (ts.year(), ts.iso_week().week()),
        Period::Monthly => |ts| (ts.year(), ts.month()),
        Period::Quarterly => |ts| (ts.year(), (ts.month() + 2) / 3),
        Period::Yearly => |ts| (ts.year(), 0),
    };
    Ok(bucket_compound(series, key_fn))
}

/// Monthly aggregation without the period indirection, for the
/// month-by-year pivot.
pub(crate) fn aggregate_monthly(series: &ReturnSeries) -> Vec<AggregatedReturn> {
    bucket_compound(series, |ts| (ts.year(), ts.month()))
}

fn bucket_compound(
    series: &ReturnSeries,
    key_fn: impl Fn(DateTime<Utc>) -> (i32, u32),
) -> Vec<AggregatedReturn> {
    let mut buckets: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for (ts, value) in series.iter() {
        let product = buckets.entry(key_fn(ts)).or_insert(1.0);
        if !value.is_nan() {
            *product *= 1.0 + value;
        }
    }
    buckets
        .into_iter()
        .map(|((year, subperiod), product)| AggregatedReturn {
            year,
            subperiod,
            value: product - 1.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-8,
            "expected {expected}, got {actual}"
        );
    }

    /// Nine daily observations alternating 0.0 / 0.01, starting Sunday
    /// 2000-01-30.
    fn make_benchmark() -> ReturnSeries {
        let start = Utc.with_ymd_and_hms(2000, 1, 30, 0, 0, 0).unwrap();
        let index = (0..9).map(|d| start + chrono::Duration::days(d)).collect();
        let values = (0..9).map(|d| if d % 2 == 0 { 0.0 } else { 0.01 }).collect();
        ReturnSeries::new(index, values).unwrap()
    }

    #[test]
    fn test_monthly_buckets() {
        let monthly = aggregate_returns(&make_benchmark(), Period::Monthly).unwrap();
        assert_eq!(monthly.len(), 2);
        assert_eq!((monthly[0].year, monthly[0].subperiod), (2000, 1));
        assert_close(monthly[0].value, 0.01);
        assert_eq!((monthly[1].year, monthly[1].subperiod), (2000, 2));
        assert_close(monthly[1].value, 1.01f64.powi(3) - 1.0);
    }

    #[test]
    fn test_weekly_buckets_use_iso_week() {
        let weekly = aggregate_returns(&make_benchmark(), Period::Weekly).unwrap();
        let keys: Vec<(i32, u32)> = weekly.iter().map(|a| (a.year, a.subperiod)).collect();
        assert_eq!(keys, [(2000, 4), (2000, 5), (2000, 6)]);
        assert_close(weekly[0].value, 0.0);
        assert_close(weekly[1].value, 1.01f64.powi(4) - 1.0);
        assert_close(weekly[2].value, 0.0);
    }

    #[test]
    fn test_weekly_year_boundary_quirk() {
        // 2019-12-30 is a Monday that ISO assigns to week 1 of 2020; the
        // bucket key keeps the calendar year.
        let index = vec![
            Utc.with_ymd_and_hms(2019, 12, 30, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
        ];
        let series = ReturnSeries::new(index, vec![0.1, 0.2]).unwrap();
        let weekly = aggregate_returns(&series, Period::Weekly).unwrap();
        let keys: Vec<(i32, u32)> = weekly.iter().map(|a| (a.year, a.subperiod)).collect();
        assert_eq!(keys, [(2019, 1), (2020, 1)]);
        assert_close(weekly[0].value, 0.1);
        assert_close(weekly[1].value, 0.2);
    }

    #[test]
    fn test_quarterly_and_yearly_buckets() {
        let quarterly = aggregate_returns(&make_benchmark(), Period::Quarterly).unwrap();
        assert_eq!(quarterly.len(), 1);
        assert_eq!((quarterly[0].year, quarterly[0].subperiod), (2000, 1));
        assert_close(quarterly[0].value, 1.01f64.powi(4) - 1.0);

        let yearly = aggregate_returns(&make_benchmark(), Period::Yearly).unwrap();
        assert_eq!(yearly.len(), 1);
        assert_eq!((yearly[0].year, yearly[0].subperiod), (2000, 0));
        assert_close(yearly[0].value, 1.01f64.powi(4) - 1.0);
    }

    #[test]
    fn test_daily_target_is_rejected() {
        let err = aggregate_returns(&make_benchmark(), Period::Daily).unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::InvalidPeriod {
                label: "daily".to_string()
            }
        );
    }

    #[test]
    fn test_empty_series_aggregates_to_nothing() {
        let series = ReturnSeries::new(vec![], vec![]).unwrap();
        assert!(aggregate_returns(&series, Period::Yearly).unwrap().is_empty());
    }

    #[test]
    fn test_nan_contributes_flat_factor() {
        let index = vec![
            Utc.with_ymd_and_hms(2020, 3, 2, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 3, 3, 0, 0, 0).unwrap(),
        ];
        let series = ReturnSeries::new(index, vec![f64::NAN, 0.1]).unwrap();
        let monthly = aggregate_returns(&series, Period::Monthly).unwrap();
        assert_eq!(monthly.len(), 1);
        assert_close(monthly[0].value, 0.1);
    }
}
