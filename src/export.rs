//! Persisting results: the resampled ensembles as JSON and quantile bands
//! as CSV.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::data::model::ProxyResultSet;
use crate::error::{ProxyError, Result};
use crate::summary::QuantileBand;

/// Write `{ "ageGrid": [...], "proxy": { name: [[...], ...] } }`.
/// Missing cells are written as `null`.
pub fn write_result_json(path: &Path, result: &ProxyResultSet) -> Result<()> {
    let write = || -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut out, result)?;
        out.flush()?;
        Ok(())
    };
    write().map_err(|e| ProxyError::persistence(path, e))?;
    log::info!("Wrote {} proxies to {}", result.proxy.len(), path.display());
    Ok(())
}

pub fn read_result_json(path: &Path) -> Result<ProxyResultSet> {
    if !path.is_file() {
        return Err(ProxyError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// One row per grid point: the grid value, then one column per level
/// (`q0.100`, `q0.250`, ...). Undefined quantiles are left empty.
pub fn write_band_csv(path: &Path, band: &QuantileBand) -> Result<()> {
    let write = || -> std::result::Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        let header: Vec<String> = std::iter::once("grid".to_string())
            .chain(band.levels.iter().map(|q| format!("q{q:.3}")))
            .collect();
        writer.write_record(&header)?;

        for (j, x) in band.grid.iter().enumerate() {
            let record: Vec<String> = std::iter::once(x.to_string())
                .chain(band.values.column(j).map(|v| {
                    if v.is_nan() {
                        String::new()
                    } else {
                        v.to_string()
                    }
                }))
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    };
    write().map_err(|e| ProxyError::persistence(path, e))?;
    log::info!("Wrote quantile bands to {}", path.display());
    Ok(())
}

/// `<dir>/<tag>.json`
pub fn result_path(dir: &Path, tag: &str) -> PathBuf {
    dir.join(format!("{tag}.json"))
}

/// `<dir>/<tag>_<proxy>_bands.csv`
pub fn band_path(dir: &Path, tag: &str, proxy: &str) -> PathBuf {
    let proxy: String = proxy
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    dir.join(format!("{tag}_{proxy}_bands.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_file_names_are_sanitised() {
        let p = band_path(Path::new("out"), "HP2A", "Al/Si ratio");
        assert_eq!(p, PathBuf::from("out/HP2A_Al_Si_ratio_bands.csv"));
        assert_eq!(result_path(Path::new("out"), "HP2A"), PathBuf::from("out/HP2A.json"));
    }

    #[test]
    fn unwritable_target_is_a_persistence_error() {
        let result = ProxyResultSet {
            age_grid: vec![],
            proxy: Default::default(),
        };
        let err = write_result_json(Path::new("/nonexistent-dir/for/sure/out.json"), &result)
            .unwrap_err();
        assert!(matches!(err, ProxyError::Persistence { .. }));
    }
}
