//! Sampling periodicities and annualization factors.
//!
//! Every annualizing statistic scales a per-period quantity by a
//! periods-per-year factor (or its square root). [`Period`] enumerates the
//! canonical sampling frequencies; [`Annualization`] lets callers pass either
//! a period or an explicit numeric override.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// Approximate business days in a month, used for rolling-window sizing.
pub const APPROX_BDAYS_PER_MONTH: usize = 21;

/// Approximate business days in a year.
pub const APPROX_BDAYS_PER_YEAR: usize = 252;

/// Canonical sampling periodicity of a return series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// One observation per trading day (252 per year).
    Daily,
    /// One observation per week (52 per year).
    Weekly,
    /// One observation per month (12 per year).
    Monthly,
    /// One observation per quarter (4 per year).
    Quarterly,
    /// One observation per year.
    Yearly,
}

impl Period {
    /// Periods per year for this sampling frequency.
    #[must_use]
    pub const fn annualization_factor(self) -> f64 {
        match self {
            Self::Daily => 252.0,
            Self::Weekly => 52.0,
            Self::Monthly => 12.0,
            Self::Quarterly => 4.0,
            Self::Yearly => 1.0,
        }
    }

    /// Canonical lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(AnalyticsError::invalid_period(s)),
        }
    }
}

/// Annualization input accepted by every annualizing statistic.
///
/// A [`Period`] resolves to its canonical factor; a raw `f64` passes through
/// unchanged, letting callers annualize irregular sampling frequencies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Annualization {
    /// Canonical factor of a sampling period.
    Period(Period),
    /// Explicit periods-per-year override.
    Custom(f64),
}

impl Annualization {
    /// Periods-per-year factor this annualization resolves to.
    #[must_use]
    pub const fn factor(self) -> f64 {
        match self {
            Self::Period(period) => period.annualization_factor(),
            Self::Custom(factor) => factor,
        }
    }
}

impl From<Period> for Annualization {
    fn from(period: Period) -> Self {
        Self::Period(period)
    }
}

impl From<f64> for Annualization {
    fn from(factor: f64) -> Self {
        Self::Custom(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annualization_factors() {
        assert_eq!(Period::Daily.annualization_factor(), 252.0);
        assert_eq!(Period::Weekly.annualization_factor(), 52.0);
        assert_eq!(Period::Monthly.annualization_factor(), 12.0);
        assert_eq!(Period::Quarterly.annualization_factor(), 4.0);
        assert_eq!(Period::Yearly.annualization_factor(), 1.0);
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("daily".parse::<Period>().unwrap(), Period::Daily);
        assert_eq!("WEEKLY".parse::<Period>().unwrap(), Period::Weekly);
        assert_eq!("Monthly".parse::<Period>().unwrap(), Period::Monthly);
    }

    #[test]
    fn test_parse_rejects_unknown_label() {
        let err = "hourly".parse::<Period>().unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::InvalidPeriod {
                label: "hourly".to_string()
            }
        );
    }

    #[test]
    fn test_label_round_trip() {
        for period in [
            Period::Daily,
            Period::Weekly,
            Period::Monthly,
            Period::Quarterly,
            Period::Yearly,
        ] {
            assert_eq!(period.label().parse::<Period>().unwrap(), period);
        }
    }

    #[test]
    fn test_serde_lowercase_labels() {
        assert_eq!(serde_json::to_string(&Period::Daily).unwrap(), "\"daily\"");
        let period: Period = serde_json::from_str("\"quarterly\"").unwrap();
        assert_eq!(period, Period::Quarterly);
    }

    #[test]
    fn test_annualization_resolution() {
        let from_period: Annualization = Period::Monthly.into();
        assert_eq!(from_period.factor(), 12.0);

        let custom: Annualization = 365.0.into();
        assert_eq!(custom.factor(), 365.0);
    }
}
