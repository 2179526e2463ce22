//! Portfolio aggregate: a return table plus analysis context.
//!
//! A [`Portfolio`] names one column of a [`ReturnTable`] as the strategy
//! under analysis, optionally names a second column as its benchmark, and
//! optionally carries a live-trading start date. The live split is half-open:
//! rows strictly before the live start are backtest, rows at or after it are
//! live. Derived views are recomputed on demand; nothing is cached, so a
//! portfolio is cheap to clone and safe to share.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::cone::{ConeConfig, ForecastCone, forecast_cone_bootstrap};
use crate::drawdown::{self, DrawdownRecord};
use crate::error::AnalyticsError;
use crate::periods::{APPROX_BDAYS_PER_MONTH, APPROX_BDAYS_PER_YEAR, Period};
use crate::series::{ReturnSeries, ReturnTable};
use crate::stats::backend;
use crate::stats::{cum_returns, cum_returns_final, roll, roll_beta, roll_sharpe_ratio};
use crate::summary::{self, MonthlyReturnsPivot, PerfStatsTable};

/// Default window for the portfolio rolling views: six months of business
/// days.
pub const DEFAULT_ROLLING_WINDOW: usize = 6 * APPROX_BDAYS_PER_MONTH;

// ============================================================================
// Live-start parsing
// ============================================================================

/// Live-trading start, accepted pre-parsed or as text.
///
/// Text forms resolve in order: RFC 3339 (offset honored, converted to UTC),
/// naive date-time with a space or `T` separator (taken as UTC), and bare
/// date (midnight UTC).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveStart {
    /// Already-parsed UTC timestamp.
    Timestamp(DateTime<Utc>),
    /// Text parsed during [`PortfolioBuilder::build`].
    Text(String),
}

impl From<DateTime<Utc>> for LiveStart {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<&str> for LiveStart {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for LiveStart {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl LiveStart {
    fn resolve(&self) -> Result<DateTime<Utc>, AnalyticsError> {
        match self {
            Self::Timestamp(at) => Ok(*at),
            Self::Text(text) => parse_live_start(text),
        }
    }
}

fn parse_live_start(text: &str) -> Result<DateTime<Utc>, AnalyticsError> {
    if let Ok(aware) = DateTime::parse_from_rfc3339(text) {
        return Ok(aware.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    Err(AnalyticsError::invalid_timestamp(text))
}

// ============================================================================
// Portfolio
// ============================================================================

/// Return table plus the context needed to analyze one of its columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Portfolio {
    name: String,
    returns: ReturnTable,
    benchmark_name: Option<String>,
    live_start_date: Option<DateTime<Utc>>,
}

/// Staged [`Portfolio`] construction; validation happens in
/// [`PortfolioBuilder::build`].
#[derive(Debug, Clone)]
pub struct PortfolioBuilder {
    name: String,
    returns: ReturnTable,
    benchmark: Option<String>,
    live_start: Option<LiveStart>,
}

impl PortfolioBuilder {
    /// Names the benchmark column inside the return table.
    #[must_use]
    pub fn benchmark(mut self, name: impl Into<String>) -> Self {
        self.benchmark = Some(name.into());
        self
    }

    /// Sets the live-trading start, pre-parsed or as text.
    #[must_use]
    pub fn live_start(mut self, at: impl Into<LiveStart>) -> Self {
        self.live_start = Some(at.into());
        self
    }

    /// Validates the staged inputs and assembles the portfolio.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidIndex`] when the portfolio or
    /// benchmark name does not match a table column, and
    /// [`AnalyticsError::InvalidTimestamp`] when a textual live start does
    /// not parse.
    pub fn build(self) -> Result<Portfolio, AnalyticsError> {
        if self.returns.column_values(&self.name).is_none() {
            return Err(AnalyticsError::invalid_index(format!(
                "portfolio column '{}' not found in return table",
                self.name
            )));
        }
        if let Some(benchmark) = &self.benchmark {
            if self.returns.column_values(benchmark).is_none() {
                return Err(AnalyticsError::invalid_index(format!(
                    "benchmark column '{benchmark}' not found in return table"
                )));
            }
        }
        let live_start_date = self.live_start.as_ref().map(LiveStart::resolve).transpose()?;
        debug!(
            name = %self.name,
            rows = self.returns.len(),
            live = live_start_date.is_some(),
            "constructed portfolio"
        );
        Ok(Portfolio {
            name: self.name,
            returns: self.returns,
            benchmark_name: self.benchmark,
            live_start_date,
        })
    }
}

impl Portfolio {
    /// Starts building a portfolio around `returns` with `name` as the
    /// strategy column.
    #[must_use]
    pub fn builder(name: impl Into<String>, returns: ReturnTable) -> PortfolioBuilder {
        PortfolioBuilder {
            name: name.into(),
            returns,
            benchmark: None,
            live_start: None,
        }
    }

    /// Strategy column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full return table: strategy, benchmark, and any comparison columns.
    #[must_use]
    pub fn returns(&self) -> &ReturnTable {
        &self.returns
    }

    /// Benchmark column name, when one was declared.
    #[must_use]
    pub fn benchmark_name(&self) -> Option<&str> {
        self.benchmark_name.as_deref()
    }

    /// Live-trading start; `None` means the whole history is backtest.
    #[must_use]
    pub fn live_start_date(&self) -> Option<DateTime<Utc>> {
        self.live_start_date
    }

    // ========================================================================
    // Derived views
    // ========================================================================

    /// Strategy column as an owned series.
    #[must_use]
    pub fn primary_returns(&self) -> ReturnSeries {
        // The builder rejects portfolios whose name is not a column.
        self.returns
            .column_series(&self.name)
            .unwrap_or_else(|| ReturnSeries::from_validated(Vec::new(), Vec::new()))
    }

    /// Benchmark column as an owned series.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::MissingBenchmark`] when no benchmark was
    /// declared.
    pub fn benchmark_returns(&self) -> Result<ReturnSeries, AnalyticsError> {
        let benchmark = self
            .benchmark_name
            .as_deref()
            .ok_or_else(|| AnalyticsError::missing_benchmark(&self.name))?;
        Ok(self
            .returns
            .column_series(benchmark)
            .unwrap_or_else(|| ReturnSeries::from_validated(Vec::new(), Vec::new())))
    }

    /// Rows strictly before the live start; the whole table when no live
    /// start is set.
    #[must_use]
    pub fn backtest_returns(&self) -> ReturnTable {
        match self.live_start_date {
            Some(live) => self.returns.split_at_time(live).0,
            None => self.returns.clone(),
        }
    }

    /// Rows at or after the live start; empty (column names preserved) when
    /// no live start is set.
    #[must_use]
    pub fn live_returns(&self) -> ReturnTable {
        match self.live_start_date {
            Some(live) => self.returns.split_at_time(live).1,
            None => ReturnTable::from_validated(
                Vec::new(),
                self.returns
                    .column_names()
                    .map(|name| (name.to_string(), Vec::new()))
                    .collect(),
            ),
        }
    }

    /// Cumulative growth of every column, compounded from `starting_value`.
    #[must_use]
    pub fn cum_returns_table(&self, starting_value: f64) -> ReturnTable {
        self.returns
            .map_columns_values(|values| cum_returns(values, starting_value))
    }

    /// Rolling annualized volatility of the strategy column.
    ///
    /// The window standard deviation (ddof 1) is scaled by the square root
    /// of the business-day year. Output covers the full table index; the
    /// first `window - 1` rows, and any window containing `NaN`, are `NaN`.
    #[must_use]
    pub fn rolling_volatility(&self, window: usize) -> ReturnSeries {
        let scale = (APPROX_BDAYS_PER_YEAR as f64).sqrt();
        let rolled = roll(&self.primary_returns(), window, |values| {
            if values.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                backend::nanstd(values, 1) * scale
            }
        });
        self.pad_to_full_index(&rolled)
    }

    /// Rolling Sharpe ratio (zero risk-free, daily annualization) of the
    /// strategy column, covering the full table index with a `NaN` head.
    #[must_use]
    pub fn rolling_sharpe(&self, window: usize) -> ReturnSeries {
        let rolled = roll_sharpe_ratio(&self.primary_returns(), window, 0.0, Period::Daily);
        self.pad_to_full_index(&rolled)
    }

    /// Rolling regression beta of the strategy column against the benchmark,
    /// covering the full table index with a `NaN` head.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::MissingBenchmark`] when no benchmark was
    /// declared.
    pub fn rolling_beta(&self, window: usize) -> Result<ReturnSeries, AnalyticsError> {
        let rolled = roll_beta(&self.primary_returns(), &self.benchmark_returns()?, window)?;
        Ok(self.pad_to_full_index(&rolled))
    }

    fn pad_to_full_index(&self, rolled: &ReturnSeries) -> ReturnSeries {
        let mut values = vec![f64::NAN; self.returns.len() - rolled.len()];
        values.extend_from_slice(rolled.values());
        ReturnSeries::from_validated(self.returns.index().to_vec(), values)
    }

    /// Bootstrap forecast cone anchored at the end of the backtest history.
    ///
    /// The configured `starting_value` is replaced by the final in-sample
    /// cumulative growth, so the cone continues the observed equity path.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InsufficientData`] when the in-sample
    /// window holds no observations.
    pub fn forecast_cone(&self, config: &ConeConfig) -> Result<ForecastCone, AnalyticsError> {
        let primary = self.primary_returns();
        let in_sample = match self.live_start_date {
            Some(live) => primary.split_at_time(live).0,
            None => primary,
        };
        let anchored = ConeConfig {
            starting_value: cum_returns_final(in_sample.values(), 1.0),
            ..config.clone()
        };
        forecast_cone_bootstrap(in_sample.values(), &anchored)
    }

    /// Ranked drawdown-episode table of the strategy column.
    #[must_use]
    pub fn top_drawdown_table(&self, top: usize) -> Vec<DrawdownRecord> {
        drawdown::top_drawdown_table(&self.primary_returns(), top)
    }

    /// Underwater (drawdown-from-peak) series of the strategy column.
    #[must_use]
    pub fn underwater(&self) -> ReturnSeries {
        drawdown::underwater(&self.primary_returns())
    }

    /// Performance-summary table with one value column per table column.
    #[must_use]
    pub fn perf_stats(&self) -> PerfStatsTable {
        summary::perf_stats(self)
    }

    /// Calendar pivot of the strategy column's monthly returns.
    #[must_use]
    pub fn monthly_returns_pivot(&self) -> MonthlyReturnsPivot {
        summary::monthly_returns_pivot(&self.primary_returns())
    }
}

// ============================================================================
// Tests
// ============================================================================
