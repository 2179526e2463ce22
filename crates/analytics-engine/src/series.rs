//! Time-indexed return containers.
//!
//! [`ReturnSeries`] is an ordered sequence of fractional returns indexed by
//! UTC timestamps; [`ReturnTable`] is its multi-column variant with named
//! columns sharing one index. Both validate their index at construction:
//! strictly increasing, unique timestamps, value buffers matching the index
//! length. Values may be `NaN` for missing observations; the statistics
//! catalog decides per function whether `NaN` is tolerated or propagated.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AnalyticsError;

// ============================================================================
// ReturnSeries
// ============================================================================

/// Single-column return series with a strictly increasing UTC index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSeries {
    index: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Builds a series from parallel index and value buffers.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidIndex`] when the buffers disagree in
    /// length or the index is not strictly increasing.
    pub fn new(index: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self, AnalyticsError> {
        validate_index(&index, values.len())?;
        Ok(Self { index, values })
    }

    /// Constructor for crate-internal transforms that preserve an already
    /// validated index.
    pub(crate) fn from_validated(index: Vec<DateTime<Utc>>, values: Vec<f64>) -> Self {
        debug_assert_eq!(index.len(), values.len());
        debug_assert!(index.windows(2).all(|w| w[0] < w[1]));
        Self { index, values }
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` when the series holds no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Timestamp index.
    #[must_use]
    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    /// Value buffer.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// First timestamp, if any.
    #[must_use]
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.index.first().copied()
    }

    /// Last timestamp, if any.
    #[must_use]
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.index.last().copied()
    }

    /// Iterates `(timestamp, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }

    /// Splits into `(before, at_or_after)` around `at`.
    ///
    /// The left part holds rows strictly before `at`, the right part rows at
    /// or after it. Either part may be empty.
    #[must_use]
    pub fn split_at_time(&self, at: DateTime<Utc>) -> (Self, Self) {
        let pos = self.index.partition_point(|ts| *ts < at);
        (
            Self::from_validated(self.index[..pos].to_vec(), self.values[..pos].to_vec()),
            Self::from_validated(self.index[pos..].to_vec(), self.values[pos..].to_vec()),
        )
    }

    /// Replaces the value buffer, keeping the index.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidIndex`] when `values` does not match
    /// the index length.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self, AnalyticsError> {
        if values.len() != self.index.len() {
            return Err(AnalyticsError::invalid_index(format!(
                "replacement values length {} does not match index length {}",
                values.len(),
                self.index.len()
            )));
        }
        Ok(Self::from_validated(self.index.clone(), values))
    }

    /// Rows where the value is not `NaN`, as a new series.
    #[must_use]
    pub fn dropna(&self) -> Self {
        let mut index = Vec::with_capacity(self.len());
        let mut values = Vec::with_capacity(self.len());
        for (ts, value) in self.iter() {
            if !value.is_nan() {
                index.push(ts);
                values.push(value);
            }
        }
        Self::from_validated(index, values)
    }

    /// Aligns two series on the union of their indexes (outer join).
    ///
    /// Timestamps present in only one input carry `NaN` in the other output.
    /// Both outputs share the merged index.
    #[must_use]
    pub fn align_outer(&self, other: &Self) -> (Self, Self) {
        let mut index = Vec::with_capacity(self.len().max(other.len()));
        let mut left = Vec::with_capacity(index.capacity());
        let mut right = Vec::with_capacity(index.capacity());

        let (mut i, mut j) = (0, 0);
        while i < self.len() || j < other.len() {
            let take_left = j >= other.len()
                || (i < self.len() && self.index[i] <= other.index[j]);
            let take_right = i >= self.len()
                || (j < other.len() && other.index[j] <= self.index[i]);

            let ts = if take_left {
                self.index[i]
            } else {
                other.index[j]
            };
            index.push(ts);
            left.push(if take_left { self.values[i] } else { f64::NAN });
            right.push(if take_right { other.values[j] } else { f64::NAN });
            if take_left {
                i += 1;
            }
            if take_right {
                j += 1;
            }
        }

        (
            Self::from_validated(index.clone(), left),
            Self::from_validated(index, right),
        )
    }
}

// ============================================================================
// ReturnTable
// ============================================================================

/// Multi-column return table: named columns over one shared index.
///
/// Column order is insertion order and is preserved by every per-column
/// operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnTable {
    index: Vec<DateTime<Utc>>,
    columns: Vec<(String, Vec<f64>)>,
}

impl ReturnTable {
    /// Builds a table from an index and `(name, values)` columns.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidIndex`] when the index is not
    /// strictly increasing, a column length disagrees with the index, or a
    /// column name repeats.
    pub fn new(
        index: Vec<DateTime<Utc>>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, AnalyticsError> {
        for (name, values) in &columns {
            validate_index(&index, values.len())?;
            let occurrences = columns.iter().filter(|(other, _)| other == name).count();
            if occurrences > 1 {
                return Err(AnalyticsError::invalid_index(format!(
                    "duplicate column name '{name}'"
                )));
            }
        }
        if columns.is_empty() {
            validate_index(&index, index.len())?;
        }
        Ok(Self { index, columns })
    }

    /// Builds a single-column table from a named series.
    #[must_use]
    pub fn from_series(name: impl Into<String>, series: &ReturnSeries) -> Self {
        Self {
            index: series.index().to_vec(),
            columns: vec![(name.into(), series.values().to_vec())],
        }
    }

    pub(crate) fn from_validated(
        index: Vec<DateTime<Utc>>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Self {
        debug_assert!(index.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(columns.iter().all(|(_, v)| v.len() == index.len()));
        Self { index, columns }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// `true` when the table holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Timestamp index shared by all columns.
    #[must_use]
    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// `(name, values)` pairs in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Value buffer of the named column, if present.
    #[must_use]
    pub fn column_values(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Named column as an owned [`ReturnSeries`], if present.
    #[must_use]
    pub fn column_series(&self, name: &str) -> Option<ReturnSeries> {
        self.column_values(name)
            .map(|values| ReturnSeries::from_validated(self.index.clone(), values.to_vec()))
    }

    /// Applies a scalar statistic to every column, preserving column order.
    pub fn map_columns<F>(&self, f: F) -> Vec<(String, f64)>
    where
        F: Fn(&[f64]) -> f64,
    {
        self.columns
            .iter()
            .map(|(name, values)| (name.clone(), f(values)))
            .collect()
    }

    /// Applies a same-length transform to every column, keeping the index.
    ///
    /// The transform must return one value per input row.
    pub(crate) fn map_columns_values<F>(&self, f: F) -> Self
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                let mapped = f(values);
                debug_assert_eq!(mapped.len(), values.len());
                (name.clone(), mapped)
            })
            .collect();
        Self::from_validated(self.index.clone(), columns)
    }

    /// Splits into `(before, at_or_after)` around `at`, all columns at once.
    #[must_use]
    pub fn split_at_time(&self, at: DateTime<Utc>) -> (Self, Self) {
        let pos = self.index.partition_point(|ts| *ts < at);
        let split = |range: std::ops::Range<usize>| {
            Self::from_validated(
                self.index[range.clone()].to_vec(),
                self.columns
                    .iter()
                    .map(|(name, values)| (name.clone(), values[range.clone()].to_vec()))
                    .collect(),
            )
        };
        (split(0..pos), split(pos..self.len()))
    }
}

fn validate_index(index: &[DateTime<Utc>], values_len: usize) -> Result<(), AnalyticsError> {
    if index.len() != values_len {
        return Err(AnalyticsError::invalid_index(format!(
            "values length {} does not match index length {}",
            values_len,
            index.len()
        )));
    }
    if let Some(pos) = index.windows(2).position(|w| w[0] >= w[1]) {
        return Err(AnalyticsError::invalid_index(format!(
            "timestamps must be strictly increasing (violation at position {})",
            pos + 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap()
    }

    fn make_series(days: &[u32], values: &[f64]) -> ReturnSeries {
        let index = days.iter().map(|d| ts(*d)).collect();
        ReturnSeries::new(index, values.to_vec()).unwrap()
    }

    #[test]
    fn test_new_accepts_empty() {
        let series = ReturnSeries::new(vec![], vec![]).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.first_timestamp(), None);
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let err = ReturnSeries::new(vec![ts(1)], vec![0.01, 0.02]).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidIndex { .. }));
    }

    #[test]
    fn test_new_rejects_unsorted_index() {
        let err = ReturnSeries::new(vec![ts(2), ts(1)], vec![0.01, 0.02]).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidIndex { .. }));
    }

    #[test]
    fn test_new_rejects_duplicate_timestamps() {
        let err = ReturnSeries::new(vec![ts(1), ts(1)], vec![0.01, 0.02]).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidIndex { .. }));
    }

    #[test]
    fn test_split_at_time_partitions_rows() {
        let series = make_series(&[1, 2, 3, 4], &[0.1, 0.2, 0.3, 0.4]);
        let (before, after) = series.split_at_time(ts(3));
        assert_eq!(before.values(), &[0.1, 0.2]);
        assert_eq!(after.values(), &[0.3, 0.4]);
        assert_eq!(after.first_timestamp(), Some(ts(3)));
    }

    #[test]
    fn test_dropna_removes_missing_rows() {
        let series = make_series(&[1, 2, 3], &[f64::NAN, 0.2, f64::NAN]);
        let clean = series.dropna();
        assert_eq!(clean.len(), 1);
        assert_eq!(clean.values(), &[0.2]);
        assert_eq!(clean.index(), &[ts(2)]);
    }

    #[test]
    fn test_align_outer_fills_gaps_with_nan() {
        let left = make_series(&[1, 3], &[0.1, 0.3]);
        let right = make_series(&[2, 3], &[0.2, 0.4]);
        let (a, b) = left.align_outer(&right);
        assert_eq!(a.index(), &[ts(1), ts(2), ts(3)]);
        assert_eq!(a.index(), b.index());
        assert_eq!(a.values()[0], 0.1);
        assert!(a.values()[1].is_nan());
        assert_eq!(a.values()[2], 0.3);
        assert!(b.values()[0].is_nan());
        assert_eq!(b.values()[1], 0.2);
        assert_eq!(b.values()[2], 0.4);
    }

    #[test]
    fn test_table_preserves_column_order() {
        let table = ReturnTable::new(
            vec![ts(1), ts(2)],
            vec![
                ("Portfolio".to_string(), vec![0.01, 0.02]),
                ("Benchmark".to_string(), vec![0.0, 0.01]),
            ],
        )
        .unwrap();
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, ["Portfolio", "Benchmark"]);

        let stats = table.map_columns(|values| values[0]);
        assert_eq!(stats[0], ("Portfolio".to_string(), 0.01));
        assert_eq!(stats[1], ("Benchmark".to_string(), 0.0));
    }

    #[test]
    fn test_table_rejects_duplicate_column() {
        let err = ReturnTable::new(
            vec![ts(1)],
            vec![
                ("Portfolio".to_string(), vec![0.01]),
                ("Portfolio".to_string(), vec![0.02]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidIndex { .. }));
    }

    #[test]
    fn test_table_column_lookup() {
        let table = ReturnTable::new(
            vec![ts(1), ts(2)],
            vec![("Portfolio".to_string(), vec![0.01, 0.02])],
        )
        .unwrap();
        assert_eq!(table.column_values("Portfolio"), Some(&[0.01, 0.02][..]));
        assert_eq!(table.column_values("Missing"), None);

        let series = table.column_series("Portfolio").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.index(), table.index());
    }
}
