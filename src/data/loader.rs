use std::path::{Path, PathBuf};

use crate::error::{ProxyError, Result};

use super::model::{AgeDepthEnsemble, CoreSettings, DepthGrid, Matrix, ProxyTable};

const SETTINGS_SUFFIX: &str = "_settings.txt";
const PROXIES_SUFFIX: &str = "_proxies.csv";

// ---------------------------------------------------------------------------
// Core file layout
// ---------------------------------------------------------------------------

/// File names of one core, derived from a common prefix such as
/// `cores/HP1C/HP1C`:
///
/// * `<prefix>_settings.txt` – `d_min`, `d_max`, `d_by`, one per line
/// * `<prefix>_<n>.out`      – sampler output, `n` = number of depth points
/// * `<prefix>_proxies.csv`  – proxy table, depth in the first column
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CorePaths {
    prefix: PathBuf,
}

impl CorePaths {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        CorePaths {
            prefix: prefix.into(),
        }
    }

    /// Recover the prefix from a path to the core's settings file.
    pub fn from_settings_file(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let stem = name.strip_suffix(SETTINGS_SUFFIX)?;
        Some(CorePaths::new(path.with_file_name(stem)))
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Short label for the core: the last component of the prefix.
    pub fn tag(&self) -> String {
        self.prefix
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.prefix.display().to_string())
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name = self.prefix.clone().into_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    pub fn settings(&self) -> PathBuf {
        self.with_suffix(SETTINGS_SUFFIX)
    }

    pub fn sampler_output(&self, point_count: usize) -> PathBuf {
        self.with_suffix(&format!("_{point_count}.out"))
    }

    pub fn proxies(&self) -> PathBuf {
        self.with_suffix(PROXIES_SUFFIX)
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Everything read from disk for one core.
#[derive(Debug, Clone)]
pub struct CoreData {
    pub paths: CorePaths,
    pub ensemble: AgeDepthEnsemble,
    pub proxy: ProxyTable,
}

/// Load settings, sampler output and proxy table of a core.
///
/// The sampler output file name depends on the settings, so settings are
/// parsed first; a missing file is always reported as
/// [`ProxyError::MissingInput`] rather than an I/O error.
pub fn load_core(paths: &CorePaths) -> Result<CoreData> {
    let settings_path = paths.settings();
    require(&settings_path)?;
    let settings = load_settings(&settings_path)?;
    let depths = DepthGrid::new(settings)
        .map_err(|e| ProxyError::malformed(&settings_path, e.to_string()))?;

    let out_path = paths.sampler_output(depths.len());
    let proxy_path = paths.proxies();
    require(&out_path)?;
    require(&proxy_path)?;

    let table = load_sampler_output(&out_path)?;
    if table.cols() > depths.len() {
        log::debug!(
            "{}: ignoring {} trailing column(s)",
            out_path.display(),
            table.cols() - depths.len()
        );
    }
    let ensemble = AgeDepthEnsemble::from_sampler_table(depths, &table)
        .map_err(|e| ProxyError::malformed(&out_path, e.to_string()))?;

    let proxy = load_proxy_table(&proxy_path)?;

    log::info!(
        "Loaded core {} ({}): {} samples over {} depth points, proxies {:?}",
        paths.tag(),
        settings,
        ensemble.len(),
        ensemble.depths().len(),
        proxy.proxy_names()
    );

    Ok(CoreData {
        paths: paths.clone(),
        ensemble,
        proxy,
    })
}

fn require(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ProxyError::MissingInput {
            path: path.to_path_buf(),
        })
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Read `d_min`, `d_max`, `d_by` from the first three non-empty lines.
/// Anything after the third line is ignored.
pub fn load_settings(path: &Path) -> Result<CoreSettings> {
    require(path)?;
    let text = std::fs::read_to_string(path)?;
    let values: Vec<f64> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .take(3)
        .enumerate()
        .map(|(i, line)| {
            let tok = line.split_whitespace().next().unwrap_or(line);
            tok.parse::<f64>().map_err(|_| {
                ProxyError::malformed(path, format!("line {}: '{tok}' is not a number", i + 1))
            })
        })
        .collect::<Result<_>>()?;

    match values[..] {
        [d_min, d_max, d_by] => Ok(CoreSettings { d_min, d_max, d_by }),
        _ => Err(ProxyError::malformed(
            path,
            format!("expected d_min, d_max and d_by, found {} value(s)", values.len()),
        )),
    }
}

// ---------------------------------------------------------------------------
// Sampler output
// ---------------------------------------------------------------------------

/// Space separated numeric table, one MC sample per row, no header.
pub fn load_sampler_output(path: &Path) -> Result<Matrix> {
    require(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        let row = record
            .iter()
            .filter(|tok| !tok.is_empty())
            .enumerate()
            .map(|(j, tok)| {
                tok.parse::<f64>().map_err(|_| {
                    ProxyError::malformed(path, format!("row {row_no}, column {j}: '{tok}' is not a number"))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        if !row.is_empty() {
            rows.push(row);
        }
    }

    if rows.is_empty() {
        return Err(ProxyError::malformed(path, "no samples"));
    }
    let width = rows[0].len();
    if let Some(bad) = rows.iter().position(|r| r.len() != width) {
        return Err(ProxyError::malformed(
            path,
            format!("row {bad} has {} columns, expected {width}", rows[bad].len()),
        ));
    }
    Matrix::from_rows(rows).ok_or_else(|| ProxyError::malformed(path, "ragged rows"))
}

// ---------------------------------------------------------------------------
// Proxy table
// ---------------------------------------------------------------------------

/// CSV with a header row; column 0 is depth. Empty cells read as zero.
pub fn load_proxy_table(path: &Path) -> Result<ProxyTable> {
    require(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let header: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if header.len() < 2 {
        return Err(ProxyError::malformed(
            path,
            "need a depth column and at least one proxy column",
        ));
    }

    let mut depth = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); header.len() - 1];

    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        for (col, name) in header.iter().enumerate() {
            let v = parse_cell(record.get(col).unwrap_or("")).ok_or_else(|| {
                ProxyError::malformed(path, format!("row {row_no}, column '{name}': not a number"))
            })?;
            if col == 0 {
                depth.push(v);
            } else {
                values[col - 1].push(v);
            }
        }
    }

    ProxyTable::new(header, depth, values).map_err(|e| ProxyError::malformed(path, e.to_string()))
}

fn parse_cell(s: &str) -> Option<f64> {
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return Some(0.0);
    }
    s.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_the_sampler_naming() {
        let paths = CorePaths::new("cores/HP1C/HP1C");
        assert_eq!(paths.settings(), PathBuf::from("cores/HP1C/HP1C_settings.txt"));
        assert_eq!(paths.sampler_output(41), PathBuf::from("cores/HP1C/HP1C_41.out"));
        assert_eq!(paths.proxies(), PathBuf::from("cores/HP1C/HP1C_proxies.csv"));
        assert_eq!(paths.tag(), "HP1C");
    }

    #[test]
    fn prefix_is_recovered_from_settings_file() {
        let paths =
            CorePaths::from_settings_file(Path::new("/data/Auassat/Auassat_settings.txt")).unwrap();
        assert_eq!(paths.prefix(), Path::new("/data/Auassat/Auassat"));
        assert!(CorePaths::from_settings_file(Path::new("/data/Auassat.out")).is_none());
    }

    #[test]
    fn empty_and_nan_cells_read_as_zero() {
        assert_eq!(parse_cell(""), Some(0.0));
        assert_eq!(parse_cell("nan"), Some(0.0));
        assert_eq!(parse_cell("1.5e-2"), Some(0.015));
        assert_eq!(parse_cell("abc"), None);
    }
}
