//! NaN-aware reducer backend.
//!
//! Missing observations travel through the engine as `NaN`, so every reducer
//! the statistics catalog leans on has to skip them. [`NanOps`] is the
//! strategy seam: the portable implementation below is always available, and
//! embedders with an accelerated implementation can install it once at
//! startup before any statistic runs.

use std::sync::OnceLock;

use tracing::debug;

// ============================================================================
// Strategy Interface
// ============================================================================

/// NaN-tolerant reductions over a raw `f64` buffer.
///
/// Semantics follow the conventions the statistics catalog is written
/// against: reductions ignore `NaN` entries, empty or all-`NaN` input yields
/// `NaN` (except [`nansum`](Self::nansum), which yields zero), and the `arg`
/// variants report the first occurrence or `None` when no valid value exists.
pub trait NanOps: Send + Sync {
    /// Mean of the non-`NaN` values.
    fn nanmean(&self, values: &[f64]) -> f64;

    /// Standard deviation of the non-`NaN` values with `ddof` delta degrees
    /// of freedom. `NaN` when fewer than `ddof + 1` valid values remain.
    fn nanstd(&self, values: &[f64], ddof: usize) -> f64;

    /// Sum of the non-`NaN` values; zero for empty or all-`NaN` input.
    fn nansum(&self, values: &[f64]) -> f64;

    /// Smallest non-`NaN` value.
    fn nanmin(&self, values: &[f64]) -> f64;

    /// Largest non-`NaN` value.
    fn nanmax(&self, values: &[f64]) -> f64;

    /// Position of the first occurrence of the smallest non-`NaN` value.
    fn nanargmin(&self, values: &[f64]) -> Option<usize>;

    /// Position of the first occurrence of the largest non-`NaN` value.
    fn nanargmax(&self, values: &[f64]) -> Option<usize>;
}

// ============================================================================
// Portable Implementation
// ============================================================================

/// Default pure-Rust backend, correct on every target.
#[derive(Debug, Default, Clone, Copy)]
pub struct PortableOps;

impl NanOps for PortableOps {
    fn nanmean(&self, values: &[f64]) -> f64 {
        let (sum, count) = sum_and_count(values);
        sum / count
    }

    fn nanstd(&self, values: &[f64], ddof: usize) -> f64 {
        let (sum, count) = sum_and_count(values);
        if count == 0.0 {
            return f64::NAN;
        }
        let mean = sum / count;
        let ssd: f64 = values
            .iter()
            .filter(|v| !v.is_nan())
            .map(|v| (v - mean).powi(2))
            .sum();
        // 0/0 and negative divisors both resolve to NaN through sqrt.
        let denom = count - ddof as f64;
        (ssd / denom).sqrt()
    }

    fn nansum(&self, values: &[f64]) -> f64 {
        values.iter().filter(|v| !v.is_nan()).sum()
    }

    fn nanmin(&self, values: &[f64]) -> f64 {
        values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(f64::NAN, f64::min)
    }

    fn nanmax(&self, values: &[f64]) -> f64 {
        values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(f64::NAN, f64::max)
    }

    fn nanargmin(&self, values: &[f64]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, v) in values.iter().copied().enumerate() {
            if v.is_nan() {
                continue;
            }
            match best {
                Some((_, current)) if v >= current => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, _)| i)
    }

    fn nanargmax(&self, values: &[f64]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, v) in values.iter().copied().enumerate() {
            if v.is_nan() {
                continue;
            }
            match best {
                Some((_, current)) if v <= current => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, _)| i)
    }
}

fn sum_and_count(values: &[f64]) -> (f64, f64) {
    let mut sum = 0.0;
    let mut count = 0.0;
    for v in values {
        if !v.is_nan() {
            sum += v;
            count += 1.0;
        }
    }
    (sum, count)
}

// ============================================================================
// Process-Wide Selection
// ============================================================================

static BACKEND: OnceLock<&'static dyn NanOps> = OnceLock::new();

/// Installs a replacement backend for the whole process.
///
/// Must run before the first statistic; returns `false` when a backend
/// (including the portable default) has already been selected, in which case
/// the earlier selection stays active.
pub fn install(ops: &'static dyn NanOps) -> bool {
    let installed = BACKEND.set(ops).is_ok();
    if installed {
        debug!("nan reducer backend installed");
    }
    installed
}

/// Currently selected backend, defaulting to [`PortableOps`].
#[must_use]
pub fn active() -> &'static dyn NanOps {
    *BACKEND.get_or_init(|| &PortableOps)
}

/// Mean of the non-`NaN` values via the active backend.
#[must_use]
pub fn nanmean(values: &[f64]) -> f64 {
    active().nanmean(values)
}

/// Standard deviation of the non-`NaN` values via the active backend.
#[must_use]
pub fn nanstd(values: &[f64], ddof: usize) -> f64 {
    active().nanstd(values, ddof)
}

/// Sum of the non-`NaN` values via the active backend.
#[must_use]
pub fn nansum(values: &[f64]) -> f64 {
    active().nansum(values)
}
