//! Age-depth inversion and proxy resampling.
//!
//! ```text
//!  sampler table ──► solns[T][K]  (age at every depth point, per sample)
//!                       │
//!            age grid ──┤  for every (sample, age): invert age → depth
//!                       ▼
//!  proxy table ──► interpolate at depth ──► solns_p[T][|age grid|]
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::ResampleConfig;
use crate::data::loader::{self, CoreData, CorePaths};
use crate::data::model::{AgeDepthEnsemble, CoreSettings, Matrix, ProxyResultSet, ProxyTable};
use crate::error::{ProxyError, Result};

// ---------------------------------------------------------------------------
// Age-depth models and age grid
// ---------------------------------------------------------------------------

/// Modelled age at every depth grid point, one row per sample:
/// `solns[t][0] = start[t]`, `solns[t][k] = start[t] + Σ_{j<k} d_by · rate[t][j]`.
pub fn build_age_depth_models(ensemble: &AgeDepthEnsemble) -> Matrix {
    let d_by = ensemble.depths().d_by();
    let k = ensemble.depths().len();
    let mut solns = Matrix::filled(ensemble.len(), k, 0.0);
    for (t, &start) in ensemble.start_ages().iter().enumerate() {
        let rates = ensemble.rates().row(t);
        let row = solns.row_mut(t);
        row[0] = start;
        for j in 0..rates.len() {
            row[j + 1] = row[j] + d_by * rates[j];
        }
    }
    solns
}

/// Calendar ages `ceil(min)`, `ceil(min) + y_by`, ... strictly below
/// `floor(max)` over every modelled age. Empty if the range collapses.
pub fn age_grid(solns: &Matrix, y_by: f64) -> Result<Vec<f64>> {
    if !y_by.is_finite() || y_by <= 0.0 {
        return Err(ProxyError::InvalidConfig(format!(
            "y_by must be a positive number, got {y_by}"
        )));
    }
    let Some((min, max)) = solns.finite_range() else {
        return Ok(Vec::new());
    };
    let (start, stop) = (min.ceil(), max.floor());
    if start >= stop {
        return Ok(Vec::new());
    }
    let n = ((stop - start) / y_by).ceil() as usize;
    Ok((0..n).map(|i| start + i as f64 * y_by).collect())
}

// ---------------------------------------------------------------------------
// Inversion
// ---------------------------------------------------------------------------

/// Depth at which one sample's age model reaches `age`.
///
/// `ages` is the sample's row of `solns` (K points), `rates` its K - 1
/// section rates. The section is the last one whose top is younger than
/// `age`; when there is none, section K - 2 is used. Below the last grid
/// point the bottom section's rate is extrapolated.
pub fn invert_depth(ages: &[f64], rates: &[f64], depths: &[f64], age: f64) -> f64 {
    let k = ages.len();
    let idx = match ages.partition_point(|&a| a < age) {
        0 => k - 2,
        n => n - 1,
    };
    let rate = rates[idx.min(k - 2)];
    depths[idx] + (age - ages[idx]) / rate
}

/// Proxy column `column` at the depth where the sample reaches `age`, or
/// `None` when that depth lies outside the proxy table.
pub fn invert_and_interpolate(
    ages: &[f64],
    rates: &[f64],
    depths: &[f64],
    proxy: &ProxyTable,
    column: usize,
    age: f64,
) -> Option<f64> {
    let depth = invert_depth(ages, rates, depths, age);
    proxy.interpolate(column, depth)
}

// ---------------------------------------------------------------------------
// Resampler
// ---------------------------------------------------------------------------

/// Resamples proxy columns of one core onto calendar ages.
pub struct AgeDepthResampler<'a> {
    ensemble: &'a AgeDepthEnsemble,
    proxy: &'a ProxyTable,
    solns: Matrix,
}

impl<'a> AgeDepthResampler<'a> {
    pub fn new(ensemble: &'a AgeDepthEnsemble, proxy: &'a ProxyTable) -> Self {
        let solns = build_age_depth_models(ensemble);
        AgeDepthResampler {
            ensemble,
            proxy,
            solns,
        }
    }

    /// Modelled ages, T x K.
    pub fn solns(&self) -> &Matrix {
        &self.solns
    }

    pub fn into_solns(self) -> Matrix {
        self.solns
    }

    pub fn age_grid(&self, y_by: f64) -> Result<Vec<f64>> {
        age_grid(&self.solns, y_by)
    }

    fn check_column(&self, column: usize) -> Result<&str> {
        self.proxy.name(column).ok_or_else(|| {
            ProxyError::InvalidConfig(format!(
                "proxy column {column} is not one of 1..={}",
                self.proxy.proxy_names().len()
            ))
        })
    }

    /// T x |grid| proxy values; NaN where the inverted depth falls outside
    /// the proxy table.
    pub fn resample_column(&self, grid: &[f64], column: usize) -> Result<Matrix> {
        self.check_column(column)?;
        let depths = self.ensemble.depths().points();
        let rate_rows = self.ensemble.rates();
        let mut out = Matrix::filled(self.solns.rows(), grid.len(), f64::NAN);
        for t in 0..self.solns.rows() {
            let ages = self.solns.row(t);
            let rates = rate_rows.row(t);
            let row = out.row_mut(t);
            for (cell, &age) in row.iter_mut().zip(grid) {
                if let Some(v) = invert_and_interpolate(ages, rates, depths, self.proxy, column, age) {
                    *cell = v;
                }
            }
        }
        Ok(out)
    }

    /// Resample every requested column onto a common age grid.
    pub fn resample(&self, columns: &[usize], y_by: f64) -> Result<ProxyResultSet> {
        let grid = self.age_grid(y_by)?;
        if grid.is_empty() {
            log::warn!("modelled ages span less than one year; age grid is empty");
        } else {
            log::debug!(
                "age grid {}..{} step {y_by} ({} points)",
                grid[0],
                grid[grid.len() - 1],
                grid.len()
            );
        }

        let mut proxy = BTreeMap::new();
        for &column in columns {
            let name = self.check_column(column)?.to_string();
            let samples = self.resample_column(&grid, column)?;
            log::info!(
                "Proxy ({name}): {} of {} cells outside the measured depth range",
                samples.missing_count(),
                samples.rows() * samples.cols()
            );
            proxy.insert(name, samples);
        }

        Ok(ProxyResultSet {
            age_grid: grid,
            proxy,
        })
    }
}

// ---------------------------------------------------------------------------
// Running one core
// ---------------------------------------------------------------------------

/// Dataset metadata reported for every run, including dry runs.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreInfo {
    pub tag: String,
    pub sampler_file: PathBuf,
    pub settings: CoreSettings,
    /// Depth grid points (K).
    pub points: usize,
    /// MC samples (T).
    pub samples: usize,
    pub proxy_names: Vec<String>,
}

impl fmt::Display for CoreInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.sampler_file.display())?;
        writeln!(f, "{}, K={}, T={}", self.settings, self.points, self.samples)?;
        write!(f, "Proxies: {:?}", self.proxy_names)
    }
}

/// A resampled core together with what the plots need to draw it.
#[derive(Debug, Clone)]
pub struct CoreResult {
    pub info: CoreInfo,
    pub depths: Vec<f64>,
    pub solns: Matrix,
    pub proxy_table: ProxyTable,
    pub result: ProxyResultSet,
}

#[derive(Debug, Clone)]
pub enum CoreRun {
    /// No proxies requested: only the metadata was read.
    DryRun(CoreInfo),
    Resampled(CoreResult),
}

impl CoreRun {
    pub fn info(&self) -> &CoreInfo {
        match self {
            CoreRun::DryRun(info) => info,
            CoreRun::Resampled(res) => &res.info,
        }
    }
}

/// Metadata of a loaded core.
pub fn core_info(data: &CoreData) -> CoreInfo {
    let depths = data.ensemble.depths();
    CoreInfo {
        tag: data.paths.tag(),
        sampler_file: data.paths.sampler_output(depths.len()),
        settings: depths.settings(),
        points: depths.len(),
        samples: data.ensemble.len(),
        proxy_names: data.proxy.proxy_names().to_vec(),
    }
}

/// Resample `columns` of an already loaded core.
pub fn resample_core(data: &CoreData, columns: &[usize], y_by: f64) -> Result<CoreResult> {
    let resampler = AgeDepthResampler::new(&data.ensemble, &data.proxy);
    let result = resampler.resample(columns, y_by)?;
    Ok(CoreResult {
        info: core_info(data),
        depths: data.ensemble.depths().points().to_vec(),
        solns: resampler.into_solns(),
        proxy_table: data.proxy.clone(),
        result,
    })
}

/// Load a core from disk and resample the configured proxies. Without any
/// proxies only the metadata is read and reported.
pub fn run_core(paths: &CorePaths, config: &ResampleConfig) -> Result<CoreRun> {
    config.validate()?;
    let data = loader::load_core(paths)?;
    match &config.proxies {
        Some(columns) if !config.is_dry_run() => {
            resample_core(&data, columns, config.y_by).map(CoreRun::Resampled)
        }
        _ => Ok(CoreRun::DryRun(core_info(&data))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::DepthGrid;

    fn ensemble(starts: Vec<f64>, rates: Vec<Vec<f64>>, d_max: f64, d_by: f64) -> AgeDepthEnsemble {
        let grid = DepthGrid::new(CoreSettings {
            d_min: 0.0,
            d_max,
            d_by,
        })
        .unwrap();
        AgeDepthEnsemble::new(grid, starts, Matrix::from_rows(rates).unwrap()).unwrap()
    }

    fn linear_proxy() -> ProxyTable {
        ProxyTable::new(
            vec!["depth".into(), "value".into()],
            vec![0.0, 5.0, 10.0],
            vec![vec![10.0, 20.0, 30.0]],
        )
        .unwrap()
    }

    #[test]
    fn models_are_prefix_sums_from_the_start_age() {
        let ens = ensemble(vec![100.0], vec![vec![2.0, 3.0]], 10.0, 5.0);
        let solns = build_age_depth_models(&ens);
        assert_eq!(solns.row(0), &[100.0, 110.0, 125.0]);
    }

    #[test]
    fn age_grid_is_half_open() {
        let solns = Matrix::from_rows(vec![vec![0.4, 10.0, 20.6]]).unwrap();
        assert_eq!(age_grid(&solns, 5.0).unwrap(), vec![1.0, 6.0, 11.0, 16.0]);
    }

    #[test]
    fn collapsed_range_gives_empty_grid() {
        let solns = Matrix::from_rows(vec![vec![3.2, 3.4, 3.9]]).unwrap();
        assert!(age_grid(&solns, 1.0).unwrap().is_empty());
        assert!(age_grid(&solns, 0.0).is_err());
    }

    #[test]
    fn inversion_hits_grid_points() {
        let ages = [0.0, 10.0, 25.0];
        let rates = [2.0, 3.0];
        let depths = [0.0, 5.0, 10.0];
        assert!((invert_depth(&ages, &rates, &depths, 10.0) - 5.0).abs() < 1e-12);
        assert!((invert_depth(&ages, &rates, &depths, 25.0) - 10.0).abs() < 1e-12);
        assert!((invert_depth(&ages, &rates, &depths, 16.0) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn age_at_or_above_the_top_uses_the_second_to_last_section() {
        let ages = [100.0, 110.0, 130.0, 160.0];
        let rates = [1.0, 2.0, 3.0];
        let depths = [0.0, 10.0, 20.0, 30.0];
        // idx = K - 2 = 2: 20 + (90 - 130) / 3
        let d = invert_depth(&ages, &rates, &depths, 90.0);
        assert!((d - (20.0 - 40.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn age_below_the_bottom_extrapolates_the_last_section() {
        let ages = [0.0, 10.0, 25.0];
        let rates = [2.0, 3.0];
        let depths = [0.0, 5.0, 10.0];
        assert!((invert_depth(&ages, &rates, &depths, 31.0) - 12.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_depth_is_missing_not_an_error() {
        let ens = ensemble(vec![0.0], vec![vec![1.0, 1.0]], 10.0, 5.0);
        let proxy = ProxyTable::new(
            vec!["depth".into(), "value".into()],
            vec![2.0, 8.0],
            vec![vec![1.0, 1.0]],
        )
        .unwrap();
        let r = AgeDepthResampler::new(&ens, &proxy);
        let m = r.resample_column(&[1.0, 5.0, 9.0], 1).unwrap();
        assert!(m.get(0, 0).is_nan());
        assert_eq!(m.get(0, 1), 1.0);
        assert!(m.get(0, 2).is_nan());
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let ens = ensemble(vec![0.0], vec![vec![1.0, 1.0]], 10.0, 5.0);
        let proxy = linear_proxy();
        let r = AgeDepthResampler::new(&ens, &proxy);
        assert!(r.resample(&[0], 1.0).is_err());
        assert!(r.resample(&[2], 1.0).is_err());
        assert!(r.resample(&[1], 1.0).is_ok());
    }

    #[test]
    fn empty_grid_keeps_sample_rows() {
        let ens = ensemble(vec![5.1, 5.2], vec![vec![0.01, 0.01], vec![0.01, 0.01]], 10.0, 5.0);
        let proxy = linear_proxy();
        let result = AgeDepthResampler::new(&ens, &proxy).resample(&[1], 1.0).unwrap();
        assert!(result.age_grid.is_empty());
        let m = result.get("value").unwrap();
        assert_eq!((m.rows(), m.cols()), (2, 0));
    }
}
