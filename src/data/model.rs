use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::{ProxyError, Result};

// ---------------------------------------------------------------------------
// Matrix – dense sample-by-grid array
// ---------------------------------------------------------------------------

/// Dense row-major `f64` array. Rows are MC samples, columns are grid points.
///
/// Missing cells are NaN in memory and `null` once serialised, so the shape
/// is always preserved even when individual cells are undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// A `rows` x `cols` matrix with every cell set to `value`.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Build from nested rows. Returns `None` for ragged input.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let n_rows = rows.len();
        Some(Matrix {
            rows: n_rows,
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Iterate over the rows as slices.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // `chunks(0)` panics, and a zero-width matrix still has rows.
        (0..self.rows).map(move |r| self.row(r))
    }

    /// Values of one column, top to bottom, NaN included.
    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.rows).map(move |r| self.get(r, col))
    }

    /// Smallest and largest finite entry, or `None` if there is none.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Number of NaN cells.
    pub fn missing_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }
}

impl Serialize for Matrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter_rows().map(|row| {
            row.iter()
                .map(|v| if v.is_nan() { None } else { Some(*v) })
                .collect::<Vec<Option<f64>>>()
        }))
    }
}

impl<'de> Deserialize<'de> for Matrix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let rows: Vec<Vec<Option<f64>>> = Vec::deserialize(deserializer)?;
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            .collect();
        Matrix::from_rows(rows).ok_or_else(|| de::Error::custom("ragged matrix rows"))
    }
}

// ---------------------------------------------------------------------------
// Core settings and depth grid
// ---------------------------------------------------------------------------

/// The three scalars of a core's `_settings.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoreSettings {
    pub d_min: f64,
    pub d_max: f64,
    pub d_by: f64,
}

impl CoreSettings {
    /// Number of depth grid points, `int((d_max - d_min) / d_by) + 1`.
    ///
    /// The sampler names its output file after this count.
    pub fn point_count(&self) -> usize {
        (((self.d_max - self.d_min) / self.d_by) + 1e-9).floor() as usize + 1
    }

    fn validate(&self) -> Result<()> {
        let finite = self.d_min.is_finite() && self.d_max.is_finite() && self.d_by.is_finite();
        if !finite || self.d_by <= 0.0 || self.d_max <= self.d_min {
            return Err(ProxyError::InvalidConfig(format!(
                "depth settings need d_min < d_max and d_by > 0 (got d_min={}, d_max={}, d_by={})",
                self.d_min, self.d_max, self.d_by
            )));
        }
        if self.point_count() < 2 {
            return Err(ProxyError::InvalidConfig(format!(
                "d_by={} leaves fewer than two depth points between {} and {}",
                self.d_by, self.d_min, self.d_max
            )));
        }
        Ok(())
    }
}

impl fmt::Display for CoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "d_min={:.6}, d_max={:.6}, d_by={:.6}",
            self.d_min, self.d_max, self.d_by
        )
    }
}

/// Regular depth grid `d_min, d_min + d_by, ..., d_max`.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthGrid {
    settings: CoreSettings,
    points: Vec<f64>,
}

impl DepthGrid {
    pub fn new(settings: CoreSettings) -> Result<Self> {
        settings.validate()?;
        let points = (0..settings.point_count())
            .map(|k| settings.d_min + k as f64 * settings.d_by)
            .collect();
        Ok(DepthGrid { settings, points })
    }

    pub fn settings(&self) -> CoreSettings {
        self.settings
    }

    pub fn d_by(&self) -> f64 {
        self.settings.d_by
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// Number of grid points (K). Always at least 2.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of sections between grid points (K - 1).
    pub fn sections(&self) -> usize {
        self.points.len() - 1
    }
}

// ---------------------------------------------------------------------------
// Age-depth ensemble
// ---------------------------------------------------------------------------

/// T sampled age-depth models sharing one depth grid.
///
/// Sample `t` starts at `start_ages[t]` at the top of the grid and accumulates
/// `rates[t][j]` years per depth unit across section `j`.
#[derive(Debug, Clone)]
pub struct AgeDepthEnsemble {
    depths: DepthGrid,
    start_ages: Vec<f64>,
    rates: Matrix,
}

impl AgeDepthEnsemble {
    pub fn new(depths: DepthGrid, start_ages: Vec<f64>, rates: Matrix) -> Result<Self> {
        if rates.rows() != start_ages.len() {
            return Err(ProxyError::InvalidConfig(format!(
                "{} start ages for {} rate rows",
                start_ages.len(),
                rates.rows()
            )));
        }
        if rates.cols() != depths.sections() {
            return Err(ProxyError::InvalidConfig(format!(
                "{} rates per sample but the depth grid has {} sections",
                rates.cols(),
                depths.sections()
            )));
        }
        Ok(AgeDepthEnsemble {
            depths,
            start_ages,
            rates,
        })
    }

    /// Build from the raw sampler table: column 0 is the start age, columns
    /// `1..K` the section rates. Trailing columns are ignored.
    pub fn from_sampler_table(depths: DepthGrid, table: &Matrix) -> Result<Self> {
        let sections = depths.sections();
        if table.cols() < sections + 1 {
            return Err(ProxyError::InvalidConfig(format!(
                "sampler output has {} columns, need at least {} for {} sections",
                table.cols(),
                sections + 1,
                sections
            )));
        }
        let start_ages = table.column(0).collect();
        let mut rates = Matrix::filled(table.rows(), sections, 0.0);
        for (t, row) in table.iter_rows().enumerate() {
            rates.row_mut(t).copy_from_slice(&row[1..=sections]);
        }
        AgeDepthEnsemble::new(depths, start_ages, rates)
    }

    pub fn depths(&self) -> &DepthGrid {
        &self.depths
    }

    pub fn start_ages(&self) -> &[f64] {
        &self.start_ages
    }

    pub fn rates(&self) -> &Matrix {
        &self.rates
    }

    /// Number of MC samples (T).
    pub fn len(&self) -> usize {
        self.start_ages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start_ages.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Proxy table
// ---------------------------------------------------------------------------

/// Proxy measurements by depth. Column 0 of the source file is depth; the
/// remaining columns are named proxies, addressed by their file column index.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyTable {
    header: Vec<String>,
    depth: Vec<f64>,
    values: Vec<Vec<f64>>,
}

impl ProxyTable {
    /// `header` names every column including depth; `values[p - 1]` holds
    /// column `p`. Depth must be non-decreasing.
    pub fn new(header: Vec<String>, depth: Vec<f64>, values: Vec<Vec<f64>>) -> Result<Self> {
        if header.len() != values.len() + 1 {
            return Err(ProxyError::InvalidConfig(format!(
                "{} column names for {} proxy columns plus depth",
                header.len(),
                values.len()
            )));
        }
        if values.iter().any(|col| col.len() != depth.len()) {
            return Err(ProxyError::InvalidConfig(
                "proxy columns differ in length from the depth column".into(),
            ));
        }
        if depth.is_empty() {
            return Err(ProxyError::InvalidConfig("proxy table has no rows".into()));
        }
        if let Some(row) = depth.windows(2).position(|w| !(w[0] <= w[1])) {
            return Err(ProxyError::InvalidConfig(format!(
                "depth must be increasing, row {} ({}) is followed by {}",
                row,
                depth[row],
                depth[row + 1]
            )));
        }
        Ok(ProxyTable {
            header,
            depth,
            values,
        })
    }

    pub fn depth(&self) -> &[f64] {
        &self.depth
    }

    pub fn min_depth(&self) -> f64 {
        self.depth[0]
    }

    pub fn max_depth(&self) -> f64 {
        self.depth[self.depth.len() - 1]
    }

    /// All column names, depth first.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Names of the proxy columns (everything after depth).
    pub fn proxy_names(&self) -> &[String] {
        &self.header[1..]
    }

    /// Name of file column `p`; `None` for depth (0) or out of range.
    pub fn name(&self, p: usize) -> Option<&str> {
        if p == 0 {
            return None;
        }
        self.header.get(p).map(String::as_str)
    }

    /// Values of file column `p`; `None` for depth (0) or out of range.
    pub fn column(&self, p: usize) -> Option<&[f64]> {
        p.checked_sub(1)
            .and_then(|i| self.values.get(i))
            .map(Vec::as_slice)
    }

    /// Linear interpolation of column `p` at `depth`. `None` outside
    /// `[min_depth, max_depth]` or for an unknown column.
    pub fn interpolate(&self, p: usize, depth: f64) -> Option<f64> {
        let values = self.column(p)?;
        if !(self.min_depth() <= depth && depth <= self.max_depth()) {
            return None;
        }
        let hi = self.depth.partition_point(|&d| d < depth);
        if hi == 0 {
            return Some(values[0]);
        }
        let lo = hi - 1;
        let (x0, x1) = (self.depth[lo], self.depth[hi]);
        if x1 == x0 {
            return Some(values[hi]);
        }
        let w = (depth - x0) / (x1 - x0);
        Some(values[lo] + w * (values[hi] - values[lo]))
    }
}

// ---------------------------------------------------------------------------
// Result record
// ---------------------------------------------------------------------------

/// Resampled proxy ensembles for one core: proxy name → T x |age grid|.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResultSet {
    pub age_grid: Vec<f64>,
    pub proxy: BTreeMap<String, Matrix>,
}

impl ProxyResultSet {
    pub fn get(&self, name: &str) -> Option<&Matrix> {
        self.proxy.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.proxy.keys().map(String::as_str)
    }
}
