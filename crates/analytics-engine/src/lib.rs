// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Analytics Engine - Rust Core Library
//!
//! Deterministic portfolio performance analytics for the Folio dashboard.
//!
//! The engine turns a UTC-indexed series (or multi-column table) of periodic
//! fractional returns into the statistics, tables, and derived series the
//! presentation layer renders. Every operation is a pure function over
//! in-memory data: no I/O, no global state, no hidden randomness.
//!
//! # Components (leaf-first)
//!
//! - [`periods`]: sampling periodicities and their annualization factors
//! - [`series`]: `ReturnSeries` / `ReturnTable` time-indexed containers
//! - [`stats`]: the statistics catalog - cumulative/annual returns, risk
//!   ratios, VaR family, alpha/beta and capture regressions, the rolling
//!   window engine, and calendar aggregation
//! - [`drawdown`]: underwater series and ranked peak/valley/recovery episodes
//! - [`portfolio`]: the `Portfolio` aggregate with its backtest/live split
//! - [`cone`]: seeded bootstrap forecast cone for out-of-sample projection
//! - [`summary`]: performance-summary table and monthly-returns pivot
//!
//! # NaN policy
//!
//! Missing observations are `NaN`. Statistics tolerate `NaN` per their
//! documented contracts (usually by skipping missing rows); insufficient or
//! degenerate data resolves to `NaN` rather than an error. Structural misuse
//! (bad period label, unalignable inputs, bad timestamps) fails fast with
//! [`AnalyticsError`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Modules
// =============================================================================

pub mod cone;
pub mod drawdown;
pub mod error;
pub mod periods;
pub mod portfolio;
pub mod series;
pub mod stats;
pub mod summary;

// =============================================================================
// Re-exports
// =============================================================================

pub use cone::{ConeBand, ConeConfig, DEFAULT_CONE_STD, ForecastCone};
pub use drawdown::{DrawdownEpisode, DrawdownRecord};
pub use error::AnalyticsError;
pub use periods::{
    APPROX_BDAYS_PER_MONTH, APPROX_BDAYS_PER_YEAR, Annualization, Period,
};
pub use portfolio::{DEFAULT_ROLLING_WINDOW, LiveStart, Portfolio, PortfolioBuilder};
pub use series::{ReturnSeries, ReturnTable};
pub use summary::{FormatHint, MonthlyReturnsPivot, PerfStatsTable};
