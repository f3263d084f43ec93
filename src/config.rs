use serde::{Deserialize, Serialize};

use crate::error::{ProxyError, Result};

/// What to resample for a core and on which age step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampleConfig {
    /// Proxy table columns to process (1 = first proxy). `None` or empty
    /// runs a dry run that only reports the dataset metadata.
    #[serde(default)]
    pub proxies: Option<Vec<usize>>,
    /// Age grid step, in years.
    #[serde(default = "ResampleConfig::default_y_by")]
    pub y_by: f64,
}

impl ResampleConfig {
    fn default_y_by() -> f64 {
        10.0
    }

    pub fn with_proxies(proxies: Vec<usize>, y_by: f64) -> Self {
        Self {
            proxies: Some(proxies),
            y_by,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.proxies.as_ref().map_or(true, Vec::is_empty)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.y_by.is_finite() || self.y_by <= 0.0 {
            return Err(ProxyError::InvalidConfig(format!(
                "y_by must be a positive number, got {}",
                self.y_by
            )));
        }
        Ok(())
    }
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            proxies: None,
            y_by: Self::default_y_by(),
        }
    }
}

/// Quantile band settings shared by the age-depth and proxy plots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    /// Lower levels in (0, 0.5); each is mirrored to `1 - q` and the median
    /// is added.
    #[serde(default = "BandConfig::default_levels")]
    pub levels: Vec<f64>,
    /// Columns with this many finite samples or fewer get no quantiles.
    #[serde(default = "BandConfig::default_min_sample_count")]
    pub min_sample_count: usize,
}

impl BandConfig {
    fn default_levels() -> Vec<f64> {
        vec![0.10, 0.25]
    }

    fn default_min_sample_count() -> usize {
        100
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(q) = self.levels.iter().find(|q| !(**q > 0.0 && **q < 0.5)) {
            return Err(ProxyError::InvalidConfig(format!(
                "quantile level {q} is not in (0, 0.5)"
            )));
        }
        Ok(())
    }

    /// `levels ∪ {0.5} ∪ {1 - q}`, ascending.
    pub fn effective_levels(&self) -> Vec<f64> {
        let mut lower = self.levels.clone();
        lower.sort_by(f64::total_cmp);
        lower.dedup();
        let upper = lower.iter().rev().map(|q| 1.0 - q);
        lower.iter().copied().chain([0.5]).chain(upper).collect()
    }
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            levels: Self::default_levels(),
            min_sample_count: Self::default_min_sample_count(),
        }
    }
}
