//! Error types for the analytics engine.
//!
//! The engine distinguishes *data conditions* from *structural misuse*.
//! Empty series, zero variance, and short windows are expected in financial
//! time series and resolve to `NaN`/empty results inside the statistics
//! catalog. The variants here cover the structural cases: they are raised
//! at the point of misuse and never absorbed into `NaN`.

use thiserror::Error;

/// Errors raised by series construction, portfolio configuration, and the
/// paired/rolling statistic entry points.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    /// Unrecognized periodicity label.
    #[error(
        "invalid period '{label}': expected one of 'daily', 'weekly', 'monthly', 'quarterly', 'yearly'"
    )]
    InvalidPeriod {
        /// The label that failed to parse.
        label: String,
    },

    /// A computation had nothing to work with and no `NaN` result is
    /// meaningful (for example bootstrapping from an empty in-sample
    /// segment).
    #[error("insufficient data: {required} observations required, {actual} available")]
    InsufficientData {
        /// Minimum number of observations the operation needs.
        required: usize,
        /// Number of observations actually supplied.
        actual: usize,
    },

    /// Two inputs to a paired statistic could not be aligned.
    #[error("mismatched inputs: left has {left} observations, right has {right}")]
    MismatchedInputs {
        /// Observation count of the first input.
        left: usize,
        /// Observation count of the second input.
        right: usize,
    },

    /// A live-start timestamp could not be normalized to UTC.
    #[error("invalid timestamp '{value}': not normalizable to UTC")]
    InvalidTimestamp {
        /// The offending timestamp text.
        value: String,
    },

    /// A benchmark-requiring operation was invoked on a portfolio with no
    /// benchmark configured.
    #[error("portfolio '{portfolio}' has no benchmark configured")]
    MissingBenchmark {
        /// Name of the portfolio.
        portfolio: String,
    },

    /// Series or table construction violated an index invariant.
    #[error("invalid index: {reason}")]
    InvalidIndex {
        /// Human-readable description of the violation.
        reason: String,
    },
}

impl AnalyticsError {
    /// Unrecognized period label.
    pub fn invalid_period(label: impl Into<String>) -> Self {
        Self::InvalidPeriod {
            label: label.into(),
        }
    }

    /// Too few observations for an operation that cannot produce `NaN`.
    #[must_use]
    pub const fn insufficient_data(required: usize, actual: usize) -> Self {
        Self::InsufficientData { required, actual }
    }

    /// Paired inputs of incompatible lengths.
    #[must_use]
    pub const fn mismatched_inputs(left: usize, right: usize) -> Self {
        Self::MismatchedInputs { left, right }
    }

    /// Timestamp text that could not be normalized to UTC.
    pub fn invalid_timestamp(value: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
        }
    }

    /// Missing benchmark on a portfolio.
    pub fn missing_benchmark(portfolio: impl Into<String>) -> Self {
        Self::MissingBenchmark {
            portfolio: portfolio.into(),
        }
    }

    /// Index invariant violation during construction.
    pub fn invalid_index(reason: impl Into<String>) -> Self {
        Self::InvalidIndex {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = AnalyticsError::invalid_period("hourly");
        assert!(err.to_string().contains("hourly"));
        assert!(err.to_string().contains("daily"));

        let err = AnalyticsError::mismatched_inputs(9, 8);
        assert_eq!(
            err.to_string(),
            "mismatched inputs: left has 9 observations, right has 8"
        );

        let err = AnalyticsError::missing_benchmark("Portfolio");
        assert!(err.to_string().contains("Portfolio"));
    }

    #[test]
    fn test_equality() {
        assert_eq!(
            AnalyticsError::insufficient_data(1, 0),
            AnalyticsError::InsufficientData {
                required: 1,
                actual: 0
            }
        );
    }
}
