//! Underwater series and ranked drawdown episodes.
//!
//! A drawdown episode runs from the last time the cumulative-return path sat
//! at its running high (the peak), through its lowest point below that high
//! (the valley), to the first return to the high (the recovery, absent while
//! the path is still underwater). Episodes are extracted deepest-first by
//! repeatedly excising the span of the worst remaining episode from the
//! underwater series.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::series::ReturnSeries;
use crate::stats::cum_returns;

// ============================================================================
// Types
// ============================================================================

/// One peak-to-recovery drawdown episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawdownEpisode {
    /// Last time the cumulative path sat at its running high before falling.
    pub peak: DateTime<Utc>,
    /// Bottom of the episode.
    pub valley: DateTime<Utc>,
    /// First return to the prior high; `None` while still underwater.
    pub recovery: Option<DateTime<Utc>>,
}

/// One row of the ranked drawdown table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownRecord {
    /// 1-based rank, deepest episode first.
    pub rank: usize,
    /// Peak-to-valley loss as a fraction of the peak value.
    #[serde(rename = "Net drawdown in %")]
    pub net_drawdown: f64,
    /// Timestamp of the episode's peak.
    #[serde(rename = "Peak date")]
    pub peak: DateTime<Utc>,
    /// Timestamp of the episode's valley.
    #[serde(rename = "Valley date")]
    pub valley: DateTime<Utc>,
    /// Timestamp of the recovery; `None` while still underwater.
    #[serde(rename = "Recovery date")]
    pub recovery: Option<DateTime<Utc>>,
    /// Business days from peak through recovery, inclusive of both ends.
    #[serde(rename = "Duration")]
    pub duration: Option<i64>,
}

// ============================================================================
// Operations
// ============================================================================

/// Depth below the running high at each timestamp, as `cum / max - 1`.
///
/// Zero while the path sits at a fresh high, negative while underwater.
#[must_use]
pub fn underwater(returns: &ReturnSeries) -> ReturnSeries {
    let cum = cum_returns(returns.values(), 1.0);
    let mut running_max = f64::NEG_INFINITY;
    let depths = cum
        .iter()
        .map(|c| {
            running_max = running_max.max(*c);
            c / running_max - 1.0
        })
        .collect();
    ReturnSeries::from_validated(returns.index().to_vec(), depths)
}

/// Up to `top` drawdown episodes, deepest first.
///
/// A path that never leaves its running high yields a single degenerate
/// episode with peak, valley, and recovery all at the first timestamp. Empty
/// input or `top == 0` yields no episodes.
#[must_use]
pub fn top_drawdowns(returns: &ReturnSeries, top: usize) -> Vec<DrawdownEpisode> {
    let cum = cum_returns(returns.values(), 1.0);
    let index = returns.index();
    top_drawdown_spans(&cum, top)
        .into_iter()
        .map(|(peak, valley, recovery)| DrawdownEpisode {
            peak: index[peak],
            valley: index[valley],
            recovery: recovery.map(|r| index[r]),
        })
        .collect()
}

/// Ranked drawdown table over the worst `top` episodes.
///
/// Each row carries the episode bounds, the peak-to-valley loss as a
/// fraction of the peak value, and the business-day duration from peak
/// through recovery (absent while unrecovered).
#[must_use]
pub fn top_drawdown_table(returns: &ReturnSeries, top: usize) -> Vec<DrawdownRecord> {
    let cum = cum_returns(returns.values(), 1.0);
    let index = returns.index();
    top_drawdown_spans(&cum, top)
        .into_iter()
        .enumerate()
        .map(|(i, (peak, valley, recovery))| DrawdownRecord {
            rank: i + 1,
            net_drawdown: (cum[peak] - cum[valley]) / cum[peak],
            peak: index[peak],
            valley: index[valley],
            recovery: recovery.map(|r| index[r]),
            duration: recovery.map(|r| {
                1 + business_days_between(index[peak].date_naive(), index[r].date_naive())
            }),
        })
        .collect()
}

// ============================================================================
// Extraction
// ============================================================================

/// Positions of up to `top` (peak, valley, recovery) spans into `cum`.
///
/// The underwater series is kept as (original position, depth) pairs so that
/// excising an episode's interior leaves the survivors addressable into the
/// cumulative path.
fn top_drawdown_spans(cum: &[f64], top: usize) -> Vec<(usize, usize, Option<usize>)> {
    let mut running_max = f64::NEG_INFINITY;
    let mut underwater: Vec<(usize, f64)> = cum
        .iter()
        .enumerate()
        .map(|(i, c)| {
            running_max = running_max.max(*c);
            (i, c / running_max - 1.0)
        })
        .collect();

    let mut spans = Vec::with_capacity(top);
    for _ in 0..top {
        if underwater.is_empty() {
            break;
        }
        let (peak, valley, recovery) = max_drawdown_span(&underwater);
        spans.push((
            underwater[peak].0,
            underwater[valley].0,
            recovery.map(|r| underwater[r].0),
        ));
        match recovery {
            // Keep the peak and recovery rows; only the interior of the
            // episode leaves the series.
            Some(recovery) => {
                if recovery > peak {
                    underwater.drain(peak + 1..recovery);
                }
            }
            None => underwater.truncate(peak + 1),
        }
        let remaining_min = underwater
            .iter()
            .fold(f64::INFINITY, |acc, (_, depth)| acc.min(*depth));
        if underwater.is_empty() || remaining_min == 0.0 {
            break;
        }
    }
    spans
}

/// Worst remaining span: first occurrence of the minimum depth, the last
/// at-high row at or before it, and the first at-high row at or after it.
fn max_drawdown_span(underwater: &[(usize, f64)]) -> (usize, usize, Option<usize>) {
    let mut valley = 0;
    for (i, (_, depth)) in underwater.iter().enumerate() {
        if *depth < underwater[valley].1 {
            valley = i;
        }
    }
    let peak = underwater[..=valley]
        .iter()
        .rposition(|(_, depth)| *depth == 0.0)
        .unwrap_or(0);
    let recovery = underwater[valley..]
        .iter()
        .position(|(_, depth)| *depth == 0.0)
        .map(|offset| valley + offset);
    (peak, valley, recovery)
}

/// Weekdays in the half-open range `[start, end)`; zero when `end <= start`.
fn business_days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    let days = (end - start).num_days();
    if days <= 0 {
        return 0;
    }
    let mut count = days / 7 * 5;
    let start_weekday = i64::from(start.weekday().num_days_from_monday());
    for offset in 0..days % 7 {
        if (start_weekday + offset) % 7 < 5 {
            count += 1;
        }
    }
    count
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn day(offset: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 1, 3, 0, 0, 0).unwrap() + Duration::days(offset)
    }

    /// Per-period price ratios minus one, with the conventional undefined
    /// first row, indexed on consecutive calendar days from 2000-01-03. The
    /// ratio form keeps the compounded path landing exactly back on its
    /// running high when prices revisit a prior level.
    fn series_from_prices(prices: &[f64]) -> ReturnSeries {
        let mut returns = vec![f64::NAN];
        returns.extend(prices.windows(2).map(|w| w[1] / w[0] - 1.0));
        let index = (0..returns.len() as i64).map(day).collect();
        ReturnSeries::new(index, returns).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-8,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_net_drawdown_from_first_day() {
        let series = series_from_prices(&[10.0, 9.0, 7.5]);
        let records = top_drawdown_table(&series, 1);
        assert_eq!(records.len(), 1);
        assert_close(records[0].net_drawdown, 0.25);
        assert_eq!(records[0].peak, day(0));
        assert_eq!(records[0].valley, day(2));
        assert_eq!(records[0].recovery, None);
        assert_eq!(records[0].duration, None);
    }

    #[test]
    fn test_two_episode_table() {
        let prices: Vec<f64> = [
            100.0, 110.0, 120.0, 150.0, 180.0, 200.0, 100.0, 120.0, 160.0, 180.0, 200.0, 300.0,
            400.0, 500.0, 600.0, 800.0, 900.0, 1000.0, 650.0, 600.0,
        ]
        .iter()
        .map(|p| p / 10.0)
        .collect();
        let series = series_from_prices(&prices);
        let records = top_drawdown_table(&series, 2);
        assert_eq!(records.len(), 2);

        // Deepest episode first: the halving from 20 to 10.
        assert_eq!(records[0].rank, 1);
        assert_close(records[0].net_drawdown, 0.5);
        assert_eq!(records[0].peak, day(5)); // 2000-01-08
        assert_eq!(records[0].valley, day(6)); // 2000-01-09
        assert_eq!(records[0].recovery, Some(day(10))); // 2000-01-13
        assert_eq!(records[0].duration, Some(4));

        assert_eq!(records[1].rank, 2);
        assert_close(records[1].net_drawdown, 0.4);
        assert_eq!(records[1].peak, day(17)); // 2000-01-20
        assert_eq!(records[1].valley, day(19)); // 2000-01-22
        assert_eq!(records[1].recovery, None);
        assert_eq!(records[1].duration, None);
    }

    #[test]
    fn test_monotonic_path_degenerates_to_first_timestamp() {
        let index = (0..5).map(day).collect();
        let series = ReturnSeries::new(index, vec![0.01; 5]).unwrap();
        let episodes = top_drawdowns(&series, 3);
        assert_eq!(
            episodes,
            vec![DrawdownEpisode {
                peak: day(0),
                valley: day(0),
                recovery: Some(day(0)),
            }]
        );
        let records = top_drawdown_table(&series, 3);
        assert_eq!(records.len(), 1);
        assert_close(records[0].net_drawdown, 0.0);
        assert_eq!(records[0].duration, Some(1));
    }

    #[test]
    fn test_underwater_depths() {
        let series = series_from_prices(&[10.0, 9.0, 7.5]);
        let depths = underwater(&series);
        assert_eq!(depths.index(), series.index());
        assert_close(depths.values()[0], 0.0);
        assert_close(depths.values()[1], -0.1);
        assert_close(depths.values()[2], -0.25);
    }

    #[test]
    fn test_empty_and_zero_top() {
        let series = ReturnSeries::new(Vec::new(), Vec::new()).unwrap();
        assert!(top_drawdowns(&series, 5).is_empty());

        let series = series_from_prices(&[10.0, 9.0, 7.5]);
        assert!(top_drawdowns(&series, 0).is_empty());
    }

    #[test]
    fn test_business_day_count_skips_weekends() {
        // 2000-01-08 was a Saturday, 2000-01-13 a Thursday.
        let start = NaiveDate::from_ymd_opt(2000, 1, 8).unwrap();
        let end = NaiveDate::from_ymd_opt(2000, 1, 13).unwrap();
        assert_eq!(business_days_between(start, end), 3);
        assert_eq!(business_days_between(end, end), 0);
        assert_eq!(business_days_between(end, start), 0);

        // A full week contributes five weekdays wherever it starts.
        let monday = NaiveDate::from_ymd_opt(2000, 1, 10).unwrap();
        assert_eq!(business_days_between(monday, monday + Duration::days(7)), 5);
    }

    #[test]
    fn test_drawdown_record_serializes_dashboard_labels() {
        let record = DrawdownRecord {
            rank: 1,
            net_drawdown: 0.25,
            peak: day(0),
            valley: day(2),
            recovery: Some(day(5)),
            duration: Some(5),
        };
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["rank"], 1);
        assert_eq!(json["Net drawdown in %"], 0.25);
        assert_eq!(json["Duration"], 5);
        assert!(json["Peak date"].is_string());
        assert!(json["Valley date"].is_string());
        assert!(json["Recovery date"].is_string());

        let back: DrawdownRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_unrecovered_record_serializes_nulls() {
        let series = series_from_prices(&[10.0, 9.0, 7.5]);
        let records = top_drawdown_table(&series, 1);
        let json = serde_json::to_value(records[0]).unwrap();
        assert!(json["Recovery date"].is_null());
        assert!(json["Duration"].is_null());
    }
}
