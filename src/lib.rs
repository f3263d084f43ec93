//! Turn an MC ensemble of age-depth models into MC ensembles of proxy
//! values on a calendar-age grid, and summarise them as quantile bands.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod resample;
pub mod state;
pub mod summary;
pub mod ui;

pub use config::{BandConfig, ResampleConfig};
pub use data::loader::{load_core, CorePaths};
pub use data::model::{AgeDepthEnsemble, CoreSettings, DepthGrid, Matrix, ProxyResultSet, ProxyTable};
pub use error::{ProxyError, Result};
pub use resample::{run_core, AgeDepthResampler, CoreInfo, CoreResult, CoreRun};
pub use summary::{summarize, QuantileBand};
