use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use proxy_uq::export;
use proxy_uq::{run_core, summarize, BandConfig, CorePaths, CoreRun, ResampleConfig};

/// Resample proxies of one or more cores onto a calendar-age grid.
///
/// Without `--proxy` only the dataset metadata of each core is printed.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Core prefixes, e.g. `cores/HP1C/HP1C` for `cores/HP1C/HP1C_settings.txt`
    #[arg(value_name = "CORE", required = true)]
    cores: Vec<PathBuf>,

    /// Proxy table column to resample (1 = first proxy); repeatable
    #[arg(long = "proxy", short = 'p')]
    proxies: Vec<usize>,

    /// Age grid step (y)
    #[arg(long, default_value_t = 10.0)]
    y_by: f64,

    /// Write `<tag>.json` results here
    #[arg(long)]
    out: Option<PathBuf>,

    /// Also write quantile band CSVs next to the results
    #[arg(long, default_value_t = false, requires = "out")]
    bands: bool,

    /// Lower quantile levels for the bands; mirrored around the median
    #[arg(long = "level", default_values_t = [0.10, 0.25])]
    levels: Vec<f64>,

    /// Columns with this many samples or fewer get no quantiles
    #[arg(long, default_value_t = 100)]
    min_samples: usize,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every core succeeded.
fn run(args: &Args) -> Result<bool> {
    let config = ResampleConfig {
        proxies: Some(args.proxies.clone()),
        y_by: args.y_by,
    };
    config.validate()?;
    let bands = BandConfig {
        levels: args.levels.clone(),
        min_sample_count: args.min_samples,
    };
    bands.validate()?;
    if let Some(dir) = &args.out {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    // Results accumulated across cores, keyed by core tag.
    let mut results = BTreeMap::new();
    let mut failed = 0usize;

    for prefix in &args.cores {
        let paths = CorePaths::new(prefix);
        let tag = paths.tag();
        match run_core(&paths, &config) {
            Ok(CoreRun::DryRun(info)) => println!("\n{info}\n"),
            Ok(CoreRun::Resampled(res)) => {
                println!(
                    "Core {tag}: {} ages x {} samples, proxies {:?}",
                    res.result.age_grid.len(),
                    res.info.samples,
                    res.result.names().collect::<Vec<_>>()
                );
                results.insert(tag, res);
            }
            Err(e) if e.is_missing_input() => {
                log::error!("Core {tag} skipped: {e}");
                failed += 1;
            }
            Err(e) => {
                log::error!("Core {tag} failed: {e}");
                failed += 1;
            }
        }
    }

    let Some(dir) = &args.out else {
        return Ok(failed == 0);
    };

    // Persistence failures are reported but never discard the other cores.
    for (tag, res) in &results {
        if let Err(e) = export::write_result_json(&export::result_path(dir, tag), &res.result) {
            log::error!("{e}");
            failed += 1;
        }
        if !args.bands {
            continue;
        }
        for (proxy, samples) in &res.result.proxy {
            let band = summarize(&res.result.age_grid, samples, &bands)?;
            if band.undefined_count() > 0 {
                log::warn!(
                    "{tag}/{proxy}: {} of {} ages have too few samples for quantiles",
                    band.undefined_count(),
                    band.grid.len()
                );
            }
            if let Err(e) = export::write_band_csv(&export::band_path(dir, tag, proxy), &band) {
                log::error!("{e}");
                failed += 1;
            }
        }
    }

    Ok(failed == 0)
}
