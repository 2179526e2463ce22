//! Performance-summary table and monthly-returns pivot.
//!
//! [`perf_stats`] condenses every column of a portfolio's return table into
//! the thirteen headline statistics the dashboard shows, each row tagged
//! with a [`FormatHint`] so the presentation layer renders percentages and
//! plain numbers consistently. [`monthly_returns_pivot`] lays monthly
//! returns out as a year-by-month grid for the heatmap.

use serde::{Deserialize, Serialize};

use crate::periods::Period;
use crate::portfolio::Portfolio;
use crate::series::ReturnSeries;
use crate::stats::{
    aggregate_monthly, annual_return, annual_volatility, calmar_ratio, cum_returns_final,
    kurtosis, max_drawdown, omega_ratio, sharpe_ratio, skew, sortino_ratio,
    stability_of_timeseries, tail_ratio, value_at_risk,
};

// ============================================================================
// Format hints
// ============================================================================

/// How a summary value should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatHint {
    /// Percentage with one decimal place, e.g. `12.3%`.
    Percent1,
    /// Plain number with two decimal places, e.g. `1.52`.
    Fixed2,
}

impl FormatHint {
    /// Renders `value` under this hint. `NaN` renders as `NaN` (with the
    /// percent suffix kept), following the float formatter.
    #[must_use]
    pub fn format(self, value: f64) -> String {
        match self {
            Self::Percent1 => format!("{:.1}%", value * 100.0),
            Self::Fixed2 => format!("{value:.2}"),
        }
    }
}

// ============================================================================
// Performance-summary table
// ============================================================================

/// One metric row: a label, a render hint, and one value per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfStatsRow {
    /// Human-readable metric label.
    pub metric: String,
    /// Render hint for the row's values.
    pub format: FormatHint,
    /// Metric value per column, in [`PerfStatsTable::columns`] order.
    pub values: Vec<f64>,
}

/// Summary table: thirteen metric rows by one column per return column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfStatsTable {
    /// Column names, in the return table's insertion order.
    pub columns: Vec<String>,
    /// Metric rows, in presentation order.
    pub rows: Vec<PerfStatsRow>,
}

impl PerfStatsTable {
    /// Looks up a row by its metric label.
    #[must_use]
    pub fn row(&self, metric: &str) -> Option<&PerfStatsRow> {
        self.rows.iter().find(|row| row.metric == metric)
    }
}

type Metric = (&'static str, FormatHint, fn(&[f64]) -> f64);

/// Headline metrics in presentation order, computed with a zero risk-free
/// rate and daily annualization.
fn metric_catalog() -> [Metric; 13] {
    [
        ("Annual return", FormatHint::Percent1, |v| {
            annual_return(v, Period::Daily)
        }),
        ("Cumulative returns", FormatHint::Percent1, |v| {
            cum_returns_final(v, 0.0)
        }),
        ("Annual volatility", FormatHint::Percent1, |v| {
            annual_volatility(v, Period::Daily, 1)
        }),
        ("Sharpe ratio", FormatHint::Fixed2, |v| {
            sharpe_ratio(v, 0.0, Period::Daily).unwrap_or(f64::NAN)
        }),
        ("Calmar ratio", FormatHint::Fixed2, |v| {
            calmar_ratio(v, Period::Daily)
        }),
        ("Stability", FormatHint::Fixed2, stability_of_timeseries),
        ("Max drawdown", FormatHint::Percent1, max_drawdown),
        ("Omega ratio", FormatHint::Fixed2, |v| {
            omega_ratio(v, 0.0, 0.0, Period::Daily)
        }),
        ("Sortino ratio", FormatHint::Fixed2, |v| {
            sortino_ratio(v, 0.0, Period::Daily).unwrap_or(f64::NAN)
        }),
        ("Skew", FormatHint::Fixed2, skew),
        ("Kurtosis", FormatHint::Fixed2, kurtosis),
        ("Tail ratio", FormatHint::Fixed2, tail_ratio),
        ("Daily value at risk", FormatHint::Percent1, |v| {
            value_at_risk(v, 2.0)
        }),
    ]
}

/// Builds the summary table over every column of the portfolio's return
/// table.
///
/// Metrics run on the full (unsplit) history; columns keep the return
/// table's order, so the strategy lands wherever it was inserted.
#[must_use]
pub fn perf_stats(portfolio: &Portfolio) -> PerfStatsTable {
    let table = portfolio.returns();
    let columns: Vec<String> = table.column_names().map(str::to_string).collect();
    let rows = metric_catalog()
        .into_iter()
        .map(|(metric, format, stat)| PerfStatsRow {
            metric: metric.to_string(),
            format,
            values: table.columns().map(|(_, values)| stat(values)).collect(),
        })
        .collect();
    PerfStatsTable { columns, rows }
}

// ============================================================================
// Monthly-returns pivot
// ============================================================================

/// Year-by-month grid of compounded monthly returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturnsPivot {
    /// Calendar years, ascending, one per row of `returns`.
    pub years: Vec<i32>,
    /// Twelve monthly returns per year, January first; months with no
    /// observations are `NaN`.
    pub returns: Vec<[f64; 12]>,
}

/// Pivots a return series into the year-by-month heatmap grid.
#[must_use]
pub fn monthly_returns_pivot(series: &ReturnSeries) -> MonthlyReturnsPivot {
    let mut years: Vec<i32> = Vec::new();
    let mut returns: Vec<[f64; 12]> = Vec::new();
    for bucket in aggregate_monthly(series) {
        if years.last() != Some(&bucket.year) {
            years.push(bucket.year);
            returns.push([f64::NAN; 12]);
        }
        if let Some(row) = returns.last_mut() {
            row[(bucket.subperiod - 1) as usize] = bucket.value;
        }
    }
    MonthlyReturnsPivot { years, returns }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::series::ReturnTable;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-8,
            "expected {expected}, got {actual}"
        );
    }

    fn make_portfolio() -> Portfolio {
        let start = Utc.with_ymd_and_hms(2000, 1, 30, 0, 0, 0).unwrap();
        let index: Vec<DateTime<Utc>> =
            (0..9).map(|d| start + chrono::Duration::days(d)).collect();
        let strategy = vec![f64::NAN, 0.01, 0.1, -0.04, 0.02, 0.03, 0.02, 0.01, -0.1];
        let benchmark = vec![0.0, 0.01, 0.0, 0.01, 0.0, 0.01, 0.0, 0.01, 0.0];
        let table = ReturnTable::new(
            index,
            vec![
                ("strategy".to_string(), strategy),
                ("benchmark".to_string(), benchmark),
            ],
        )
        .unwrap();
        Portfolio::builder("strategy", table)
            .benchmark("benchmark")
            .build()
            .unwrap()
    }

    #[test]
    fn test_perf_stats_rows_are_ordered_for_presentation() {
        let stats = make_portfolio().perf_stats();

        let labels: Vec<&str> = stats.rows.iter().map(|row| row.metric.as_str()).collect();
        assert_eq!(
            labels,
            [
                "Annual return",
                "Cumulative returns",
                "Annual volatility",
                "Sharpe ratio",
                "Calmar ratio",
                "Stability",
                "Max drawdown",
                "Omega ratio",
                "Sortino ratio",
                "Skew",
                "Kurtosis",
                "Tail ratio",
                "Daily value at risk",
            ]
        );
        assert_eq!(stats.columns, ["strategy", "benchmark"]);
        for row in &stats.rows {
            assert_eq!(row.values.len(), 2, "{}", row.metric);
        }
    }

    #[test]
    fn test_perf_stats_values_match_the_underlying_statistics() {
        let stats = make_portfolio().perf_stats();

        let sharpe = stats.row("Sharpe ratio").unwrap();
        assert_eq!(sharpe.format, FormatHint::Fixed2);
        assert_close(sharpe.values[0], 1.7238613961706866);

        let drawdown = stats.row("Max drawdown").unwrap();
        assert_eq!(drawdown.format, FormatHint::Percent1);
        assert_close(drawdown.values[0], -0.1);

        let stability = stats.row("Stability").unwrap();
        assert_eq!(stability.format, FormatHint::Fixed2);
        assert_close(stability.values[0], 0.152_997_366_511_127_3);

        let tail = stats.row("Tail ratio").unwrap();
        assert_close(tail.values[0], 0.955_696_202_531_645_6);
    }

    #[test]
    fn test_format_hints_render_percentages_and_plain_numbers() {
        assert_eq!(FormatHint::Percent1.format(0.123), "12.3%");
        assert_eq!(FormatHint::Percent1.format(-0.1), "-10.0%");
        assert_eq!(FormatHint::Fixed2.format(1.5), "1.50");
        assert_eq!(FormatHint::Fixed2.format(0.333_333), "0.33");
        assert_eq!(FormatHint::Percent1.format(f64::NAN), "NaN%");
        assert_eq!(FormatHint::Fixed2.format(f64::NAN), "NaN");
    }

    #[test]
    fn test_monthly_pivot_fills_missing_months_with_nan() {
        let index = vec![
            Utc.with_ymd_and_hms(1999, 12, 30, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(1999, 12, 31, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2000, 1, 31, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2000, 2, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2000, 2, 2, 0, 0, 0).unwrap(),
        ];
        let series = ReturnSeries::new(index, vec![0.1, 0.1, 0.01, 0.02, 0.02]).unwrap();

        let pivot = monthly_returns_pivot(&series);
        assert_eq!(pivot.years, [1999, 2000]);
        assert_close(pivot.returns[0][11], 1.1 * 1.1 - 1.0);
        assert!(pivot.returns[0][..11].iter().all(|v| v.is_nan()));
        assert_close(pivot.returns[1][0], 0.01);
        assert_close(pivot.returns[1][1], 1.02 * 1.02 - 1.0);
        assert!(pivot.returns[1][2..].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_empty_series_pivots_to_an_empty_grid() {
        let series = ReturnSeries::new(vec![], vec![]).unwrap();
        let pivot = monthly_returns_pivot(&series);
        assert!(pivot.years.is_empty());
        assert!(pivot.returns.is_empty());
    }

    #[test]
    fn test_perf_stats_table_round_trips_through_json() {
        let stats = make_portfolio().perf_stats();
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"Sharpe ratio\""));
        assert!(json.contains("\"percent1\""));

        let back: PerfStatsTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.columns, stats.columns);
        assert_eq!(back.rows.len(), stats.rows.len());
        let (original, restored) = (
            stats.row("Sharpe ratio").unwrap(),
            back.row("Sharpe ratio").unwrap(),
        );
        assert_eq!(restored.format, original.format);
        assert_close(restored.values[0], original.values[0]);
    }
}
