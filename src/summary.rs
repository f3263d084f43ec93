//! Quantile bands and other reductions across the sample axis of an MC
//! ensemble.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::config::BandConfig;
use crate::data::model::Matrix;
use crate::error::{ProxyError, Result};

// ---------------------------------------------------------------------------
// Quantile bands
// ---------------------------------------------------------------------------

/// Per-column quantiles of an ensemble: `values` is levels x grid points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileBand {
    pub grid: Vec<f64>,
    pub levels: Vec<f64>,
    pub values: Matrix,
}

impl QuantileBand {
    /// The 0.5 row.
    pub fn median(&self) -> &[f64] {
        self.values.row(self.levels.len() / 2)
    }

    /// `(lower, upper)` row pairs, outermost first.
    pub fn envelopes(&self) -> impl Iterator<Item = (&[f64], &[f64])> {
        let n = self.levels.len();
        (0..n / 2).map(move |i| (self.values.row(i), self.values.row(n - 1 - i)))
    }

    /// Indices of grid columns that had enough samples to be summarised.
    pub fn defined_columns(&self) -> Vec<usize> {
        (0..self.values.cols())
            .filter(|&j| !self.values.get(0, j).is_nan())
            .collect()
    }

    pub fn undefined_count(&self) -> usize {
        self.values.cols() - self.defined_columns().len()
    }
}

/// Quantile bands of `samples` (T x M) over `grid` (M points).
///
/// NaN cells are dropped per column. A column left with `min_sample_count`
/// values or fewer is NaN at every level.
pub fn summarize(grid: &[f64], samples: &Matrix, config: &BandConfig) -> Result<QuantileBand> {
    if grid.len() != samples.cols() {
        return Err(ProxyError::ShapeMismatch {
            grid: grid.len(),
            columns: samples.cols(),
        });
    }
    config.validate()?;

    let levels = config.effective_levels();
    let mut values = Matrix::filled(levels.len(), grid.len(), f64::NAN);
    let mut column = Vec::with_capacity(samples.rows());

    for j in 0..samples.cols() {
        column.clear();
        column.extend(samples.column(j).filter(|v| !v.is_nan()));
        if column.len() <= config.min_sample_count {
            continue;
        }
        column.sort_by(f64::total_cmp);
        for (i, &q) in levels.iter().enumerate() {
            values.set(i, j, quantile_sorted(&column, q));
        }
    }

    Ok(QuantileBand {
        grid: grid.to_vec(),
        levels,
        values,
    })
}

/// Linear interpolation between order statistics (`h = (n - 1) q`).
/// `sorted` must be non-empty and ascending.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

// ---------------------------------------------------------------------------
// Slices across the ensemble
// ---------------------------------------------------------------------------

/// Finite values of column `j`: the ensemble at one grid point.
pub fn age_slice(samples: &Matrix, j: usize) -> Vec<f64> {
    samples.column(j).filter(|v| v.is_finite()).collect()
}

/// Per-sample sum over a window of columns, e.g. proxy accumulated over an
/// age interval. Samples with a missing cell inside the window are dropped.
pub fn column_window_totals(samples: &Matrix, cols: Range<usize>) -> Vec<f64> {
    let cols = cols.start.min(samples.cols())..cols.end.min(samples.cols());
    samples
        .iter_rows()
        .map(|row| row[cols.clone()].iter().sum::<f64>())
        .filter(|v| !v.is_nan())
        .collect()
}

/// `a[i] - b[i]` over the shorter of the two.
pub fn paired_differences(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `counts.len() + 1` bin edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Equal-width histogram over the finite values. `None` when there are
    /// none or `bins` is zero.
    pub fn from_values(values: &[f64], bins: usize) -> Option<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() || bins == 0 {
            return None;
        }
        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // Same convention as a single-valued numpy histogram.
        let (min, max) = if max > min { (min, max) } else { (min - 0.5, max + 0.5) };
        let width = (max - min) / bins as f64;

        let mut counts = vec![0usize; bins];
        for v in &finite {
            let b = (((v - min) / width).floor() as usize).min(bins - 1);
            counts[b] += 1;
        }
        let edges = (0..=bins).map(|i| min + i as f64 * width).collect();
        Some(Histogram { edges, counts })
    }

    pub fn bin_width(&self) -> f64 {
        self.edges[1] - self.edges[0]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Bin heights normalised to unit area.
    pub fn density(&self) -> Vec<f64> {
        let norm = self.total() as f64 * self.bin_width();
        self.counts.iter().map(|&c| c as f64 / norm).collect()
    }

    /// Midpoints of the bins.
    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band_config(min_sample_count: usize) -> BandConfig {
        BandConfig {
            levels: vec![0.10, 0.25],
            min_sample_count,
        }
    }

    /// `rows` samples, column j holds `0, 1, ..., rows - 1` shifted by j.
    fn ramp(rows: usize, cols: usize) -> Matrix {
        Matrix::from_rows(
            (0..rows)
                .map(|t| (0..cols).map(|j| (t + j) as f64).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn quantiles_match_linear_order_statistics() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(quantile_sorted(&sorted, 0.5), 3.0);
        assert_eq!(quantile_sorted(&sorted, 1.0), 5.0);
        assert!((quantile_sorted(&sorted, 0.1) - 1.4).abs() < 1e-12);
        assert!((quantile_sorted(&[7.0], 0.9) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn grid_and_columns_must_agree() {
        let err = summarize(&[0.0, 1.0], &ramp(5, 3), &band_config(1)).unwrap_err();
        assert!(matches!(err, ProxyError::ShapeMismatch { grid: 2, columns: 3 }));
    }

    #[test]
    fn bands_are_ordered_around_the_median() {
        let band = summarize(&[0.0, 1.0, 2.0], &ramp(201, 3), &band_config(100)).unwrap();
        assert_eq!(band.levels.len(), 5);
        for j in 0..3 {
            // Column j holds j..=200+j, so the median is 100 + j.
            assert!((band.median()[j] - (100.0 + j as f64)).abs() < 1e-12);
            let col: Vec<f64> = band.values.column(j).collect();
            assert!(col.windows(2).all(|w| w[0] <= w[1]));
        }
        let pairs: Vec<_> = band.envelopes().collect();
        assert_eq!(pairs.len(), 2);
        assert!((pairs[0].0[0] - 20.0).abs() < 1e-12);
        assert!((pairs[0].1[0] - 180.0).abs() < 1e-12);
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut samples = ramp(101, 2);
        samples.set(0, 1, f64::NAN);
        let band = summarize(&[0.0, 1.0], &samples, &band_config(100)).unwrap();
        assert_eq!(band.defined_columns(), vec![0]);
        assert!(band.values.column(1).all(f64::is_nan));
        assert_eq!(band.undefined_count(), 1);
    }

    #[test]
    fn window_totals_drop_incomplete_samples() {
        let mut samples = ramp(3, 4);
        samples.set(1, 2, f64::NAN);
        assert_eq!(column_window_totals(&samples, 0..2), vec![1.0, 3.0, 5.0]);
        assert_eq!(column_window_totals(&samples, 1..3), vec![3.0, 7.0]);
        assert_eq!(column_window_totals(&samples, 3..10), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn differences_truncate_to_the_shorter_side() {
        assert_eq!(paired_differences(&[3.0, 5.0, 9.0], &[1.0, 1.0]), vec![2.0, 4.0]);
    }

    #[test]
    fn histogram_counts_every_finite_value() {
        let h = Histogram::from_values(&[0.0, 0.1, 0.5, 0.9, 1.0, f64::NAN], 2).unwrap();
        assert_eq!(h.counts, vec![2, 3]);
        assert_eq!(h.edges, vec![0.0, 0.5, 1.0]);
        let area: f64 = h.density().iter().map(|d| d * h.bin_width()).sum();
        assert!((area - 1.0).abs() < 1e-12);
        assert!(Histogram::from_values(&[f64::NAN], 4).is_none());
        assert_eq!(Histogram::from_values(&[2.0, 2.0], 1).unwrap().counts, vec![2]);
    }
}
