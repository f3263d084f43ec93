use std::collections::BTreeMap;
use std::ops::Range;

use crate::color::CoreColors;
use crate::config::{BandConfig, ResampleConfig};
use crate::data::loader::{load_core, CoreData, CorePaths};
use crate::error::Result;
use crate::resample::{resample_core, CoreResult};
use crate::summary::{
    age_slice, column_window_totals, paired_differences, summarize, Histogram, QuantileBand,
};

// ---------------------------------------------------------------------------
// One opened core
// ---------------------------------------------------------------------------

/// A core opened in the viewer: its inputs, the resampled ensembles and the
/// bands drawn from them.
pub struct LoadedCore {
    pub data: CoreData,
    pub run: CoreResult,
    pub visible: bool,
    /// Bands of the age-depth models over depth.
    pub depth_band: std::result::Result<QuantileBand, String>,
    /// Bands of each resampled proxy over the age grid.
    pub proxy_bands: BTreeMap<String, std::result::Result<QuantileBand, String>>,
}

impl LoadedCore {
    fn build(data: CoreData, y_by: f64, bands: &BandConfig) -> Result<Self> {
        let columns: Vec<usize> = (1..=data.proxy.proxy_names().len()).collect();
        let run = resample_core(&data, &columns, y_by)?;
        let mut core = LoadedCore {
            data,
            run,
            visible: true,
            depth_band: Err(String::new()),
            proxy_bands: BTreeMap::new(),
        };
        core.rebuild_bands(bands);
        Ok(core)
    }

    fn rebuild_bands(&mut self, bands: &BandConfig) {
        self.depth_band =
            summarize(&self.run.depths, &self.run.solns, bands).map_err(|e| e.to_string());
        self.proxy_bands = self
            .run
            .result
            .proxy
            .iter()
            .map(|(name, samples)| {
                let band = summarize(&self.run.result.age_grid, samples, bands)
                    .map_err(|e| e.to_string());
                (name.clone(), band)
            })
            .collect();
    }
}

/// What the histogram view reduces each sample to.
#[derive(Debug, Clone, PartialEq)]
pub enum HistogramSource {
    /// Proxy value at one age grid index.
    AtAge(usize),
    /// Proxy summed over a range of age grid indices.
    Window(Range<usize>),
    /// Per-sample change of the proxy from one age grid index to another.
    Change { from: usize, to: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    AgeDepth,
    Proxy,
    Histogram,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Opened cores by tag. The viewer owns this mapping; each entry is
    /// self-contained.
    pub cores: BTreeMap<String, LoadedCore>,

    /// Colour per core tag.
    pub colors: CoreColors,

    /// Proxy shown in the proxy and histogram views.
    pub selected_proxy: Option<String>,

    pub resample: ResampleConfig,
    pub bands: BandConfig,

    /// Fill envelopes (true) or draw each quantile as a dashed line.
    pub fill: bool,

    pub view: View,
    pub histogram_source: HistogramSource,
    pub histogram_bins: usize,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            cores: BTreeMap::new(),
            colors: CoreColors::default(),
            selected_proxy: None,
            resample: ResampleConfig::default(),
            bands: BandConfig::default(),
            fill: true,
            view: View::Proxy,
            histogram_source: HistogramSource::AtAge(0),
            histogram_bins: 20,
            status_message: None,
        }
    }
}

impl AppState {
    /// Load a core from disk and add it.
    pub fn open_core(&mut self, paths: &CorePaths) -> Result<()> {
        let data = load_core(paths)?;
        self.add_core(data)
    }

    /// Resample every proxy of an already loaded core and add it, replacing
    /// a core with the same tag.
    pub fn add_core(&mut self, data: CoreData) -> Result<()> {
        let tag = data.paths.tag();
        let core = LoadedCore::build(data, self.resample.y_by, &self.bands)?;
        if self.selected_proxy.is_none() {
            self.selected_proxy = core.run.info.proxy_names.first().cloned();
        }
        self.cores.insert(tag, core);
        self.recolor();
        self.status_message = None;
        Ok(())
    }

    pub fn remove_core(&mut self, tag: &str) {
        if self.cores.remove(tag).is_some() {
            self.recolor();
        }
    }

    fn recolor(&mut self) {
        self.colors = CoreColors::new(self.cores.keys());
    }

    pub fn toggle_visible(&mut self, tag: &str) {
        if let Some(core) = self.cores.get_mut(tag) {
            core.visible = !core.visible;
        }
    }

    pub fn visible_cores(&self) -> impl Iterator<Item = (&String, &LoadedCore)> {
        self.cores.iter().filter(|(_, c)| c.visible)
    }

    /// Every proxy name across the opened cores, first seen first.
    pub fn proxy_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for core in self.cores.values() {
            for name in &core.run.info.proxy_names {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// Change the age step and resample every core.
    pub fn set_y_by(&mut self, y_by: f64) -> Result<()> {
        let config = ResampleConfig {
            y_by,
            ..self.resample.clone()
        };
        config.validate()?;
        let mut rebuilt = BTreeMap::new();
        for (tag, core) in &self.cores {
            let mut fresh = LoadedCore::build(core.data.clone(), y_by, &self.bands)?;
            fresh.visible = core.visible;
            rebuilt.insert(tag.clone(), fresh);
        }
        self.cores = rebuilt;
        self.resample = config;
        self.clamp_histogram_source();
        Ok(())
    }

    /// Change the quantile levels and recompute the bands.
    pub fn set_band_config(&mut self, bands: BandConfig) -> Result<()> {
        bands.validate()?;
        for core in self.cores.values_mut() {
            core.rebuild_bands(&bands);
        }
        self.bands = bands;
        Ok(())
    }

    /// Longest age grid among the visible cores.
    pub fn max_age_points(&self) -> usize {
        self.visible_cores()
            .map(|(_, c)| c.run.result.age_grid.len())
            .max()
            .unwrap_or(0)
    }

    fn clamp_histogram_source(&mut self) {
        let n = self.max_age_points();
        let last = n.saturating_sub(1);
        self.histogram_source = match &self.histogram_source {
            HistogramSource::AtAge(i) => HistogramSource::AtAge((*i).min(last)),
            HistogramSource::Window(r) => {
                HistogramSource::Window(r.start.min(last)..r.end.min(n).max(r.start.min(last)))
            }
            HistogramSource::Change { from, to } => HistogramSource::Change {
                from: (*from).min(last),
                to: (*to).min(last),
            },
        };
    }

    /// Histogram of the selected proxy for one core under the current
    /// histogram source.
    pub fn histogram(&self, tag: &str) -> Option<Histogram> {
        let core = self.cores.get(tag)?;
        let samples = core.run.result.get(self.selected_proxy.as_deref()?)?;
        let values = match &self.histogram_source {
            HistogramSource::AtAge(i) if *i < samples.cols() => age_slice(samples, *i),
            HistogramSource::AtAge(_) => return None,
            HistogramSource::Window(r) => column_window_totals(samples, r.clone()),
            HistogramSource::Change { from, to } if *from.max(to) < samples.cols() => {
                let later: Vec<f64> = samples.column(*to).collect();
                let earlier: Vec<f64> = samples.column(*from).collect();
                paired_differences(&later, &earlier)
                    .into_iter()
                    .filter(|v| v.is_finite())
                    .collect()
            }
            HistogramSource::Change { .. } => return None,
        };
        Histogram::from_values(&values, self.histogram_bins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{AgeDepthEnsemble, CoreSettings, DepthGrid, Matrix, ProxyTable};

    fn core(tag: &str, t: usize) -> CoreData {
        let grid = DepthGrid::new(CoreSettings {
            d_min: 0.0,
            d_max: 10.0,
            d_by: 1.0,
        })
        .unwrap();
        let rates = Matrix::from_rows(
            (0..t)
                .map(|i| vec![10.0 + (i % 7) as f64; 10])
                .collect(),
        )
        .unwrap();
        let ensemble = AgeDepthEnsemble::new(grid, vec![0.0; t], rates).unwrap();
        let proxy = ProxyTable::new(
            vec!["depth".into(), "Cdensity".into(), "AlSi".into()],
            vec![0.0, 10.0],
            vec![vec![0.1, 0.3], vec![1.0, 2.0]],
        )
        .unwrap();
        CoreData {
            paths: CorePaths::new(format!("cores/{tag}")),
            ensemble,
            proxy,
        }
    }

    #[test]
    fn adding_cores_assigns_colors_and_default_proxy() {
        let mut state = AppState::default();
        state.add_core(core("1B", 150)).unwrap();
        state.add_core(core("2A", 150)).unwrap();
        assert_eq!(state.cores.len(), 2);
        assert_eq!(state.colors.len(), 2);
        assert_eq!(state.selected_proxy.as_deref(), Some("Cdensity"));
        assert_eq!(state.proxy_names(), vec!["Cdensity", "AlSi"]);

        let band = state.cores["1B"].proxy_bands["Cdensity"].as_ref().unwrap();
        assert!(!band.defined_columns().is_empty());
    }

    #[test]
    fn hidden_cores_are_skipped() {
        let mut state = AppState::default();
        state.add_core(core("1B", 10)).unwrap();
        state.add_core(core("2A", 10)).unwrap();
        state.toggle_visible("1B");
        let visible: Vec<&String> = state.visible_cores().map(|(t, _)| t).collect();
        assert_eq!(visible, vec!["2A"]);
        state.remove_core("2A");
        assert_eq!(state.visible_cores().count(), 0);
        assert_eq!(state.colors.len(), 1);
    }

    #[test]
    fn changing_y_by_resamples_and_keeps_visibility() {
        let mut state = AppState::default();
        state.add_core(core("1B", 20)).unwrap();
        state.toggle_visible("1B");
        let before = state.cores["1B"].run.result.age_grid.len();
        state.set_y_by(5.0).unwrap();
        let after = state.cores["1B"].run.result.age_grid.len();
        assert!(after > before);
        assert!(!state.cores["1B"].visible);
        assert!(state.set_y_by(-1.0).is_err());
        assert_eq!(state.resample.y_by, 5.0);
    }

    #[test]
    fn few_samples_leave_bands_undefined() {
        let mut state = AppState::default();
        state.add_core(core("1B", 50)).unwrap();
        let band = state.cores["1B"].proxy_bands["AlSi"].as_ref().unwrap();
        assert!(band.defined_columns().is_empty());

        state
            .set_band_config(BandConfig {
                levels: vec![0.1],
                min_sample_count: 10,
            })
            .unwrap();
        let band = state.cores["1B"].proxy_bands["AlSi"].as_ref().unwrap();
        assert_eq!(band.levels.len(), 3);
        assert!(!band.defined_columns().is_empty());
    }

    #[test]
    fn histogram_at_age_and_over_window() {
        let mut state = AppState::default();
        state.add_core(core("1B", 30)).unwrap();
        state.histogram_source = HistogramSource::AtAge(3);
        let h = state.histogram("1B").unwrap();
        assert_eq!(h.total(), 30);

        state.histogram_source = HistogramSource::Window(0..4);
        assert!(state.histogram("1B").is_some());

        state.histogram_source = HistogramSource::Change { from: 1, to: 3 };
        assert_eq!(state.histogram("1B").unwrap().total(), 30);
        state.histogram_source = HistogramSource::Change { from: 1, to: 10_000 };
        assert!(state.histogram("1B").is_none());
        assert!(state.histogram("missing").is_none());
    }
}
