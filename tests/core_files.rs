//! Loading cores from disk, error reporting and persistence.

use std::fs;
use std::path::Path;

use proxy_uq::export::{read_result_json, write_band_csv, write_result_json};
use proxy_uq::{
    load_core, run_core, summarize, BandConfig, CorePaths, CoreRun, Matrix, ProxyError,
    ResampleConfig,
};

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

fn write_valid_core(dir: &Path, tag: &str) -> CorePaths {
    write(dir, &format!("{tag}_settings.txt"), "0\n4\n1\n# comment\n99\n");
    let rows: String = (0..5)
        .map(|t| format!("{} 10 10 {} 10 0.5 -100\n", -50 + t, 10 + t))
        .collect();
    write(dir, &format!("{tag}_5.out"), &rows);
    write(
        dir,
        &format!("{tag}_proxies.csv"),
        "depth,Cdensity,AlSi\n0,0.1,\n2,0.2,1.5\n4,0.3,2.5\n",
    );
    CorePaths::new(dir.join(tag))
}

#[test]
fn missing_files_are_named() {
    let dir = tempfile::tempdir().unwrap();
    let paths = CorePaths::new(dir.path().join("NOPE"));
    let err = load_core(&paths).unwrap_err();
    assert!(err.is_missing_input());
    assert!(err.to_string().contains("NOPE_settings.txt"));

    write(dir.path(), "NOPE_settings.txt", "0\n10\n1\n");
    let err = run_core(&paths, &ResampleConfig::default()).unwrap_err();
    match err {
        ProxyError::MissingInput { path } => assert!(path.ends_with("NOPE_11.out")),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn batch_continues_past_missing_cores() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_valid_core(dir.path(), "A");
    let missing = CorePaths::new(dir.path().join("B"));
    let config = ResampleConfig::with_proxies(vec![1, 2], 1.0);

    let outcomes: Vec<_> = [missing, good].iter().map(|p| run_core(p, &config)).collect();
    assert!(outcomes[0].as_ref().unwrap_err().is_missing_input());
    assert!(matches!(outcomes[1], Ok(CoreRun::Resampled(_))));
}

#[test]
fn settings_trailing_lines_and_empty_cells() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_valid_core(dir.path(), "A");
    let data = load_core(&paths).unwrap();
    assert_eq!(data.ensemble.depths().points(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
    assert_eq!(data.ensemble.len(), 5);
    assert_eq!(data.ensemble.rates().row(4), &[10.0, 10.0, 14.0, 10.0]);
    assert_eq!(data.proxy.column(2).unwrap(), &[0.0, 1.5, 2.5]);
}

#[test]
fn malformed_inputs_fail_fast() {
    let dir = tempfile::tempdir().unwrap();
    write_valid_core(dir.path(), "A");

    write(dir.path(), "A_settings.txt", "0\nten\n1\n");
    let err = load_core(&CorePaths::new(dir.path().join("A"))).unwrap_err();
    assert!(matches!(err, ProxyError::Malformed { .. }), "{err}");

    write(dir.path(), "A_settings.txt", "0\n4\n1\n");
    write(dir.path(), "A_5.out", "0 1 1\n");
    let err = load_core(&CorePaths::new(dir.path().join("A"))).unwrap_err();
    assert!(matches!(err, ProxyError::Malformed { .. }), "{err}");

    write(dir.path(), "A_5.out", "0 1 1 1 1\n0 1 1 1\n");
    assert!(load_core(&CorePaths::new(dir.path().join("A"))).is_err());

    write(dir.path(), "A_5.out", "0 1 1 1 1\n");
    write(dir.path(), "A_proxies.csv", "depth,C\n0,1\n3,1\n2,1\n");
    let err = load_core(&CorePaths::new(dir.path().join("A"))).unwrap_err();
    assert!(err.to_string().contains("A_proxies.csv"), "{err}");
}

#[test]
fn bad_proxy_index_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_valid_core(dir.path(), "A");
    let err = run_core(&paths, &ResampleConfig::with_proxies(vec![3], 1.0)).unwrap_err();
    assert!(matches!(err, ProxyError::InvalidConfig(_)), "{err}");
}

#[test]
fn results_round_trip_through_json_with_missing_cells() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_valid_core(dir.path(), "A");
    let CoreRun::Resampled(res) =
        run_core(&paths, &ResampleConfig::with_proxies(vec![1, 2], 1.0)).unwrap()
    else {
        panic!("expected a resampled core");
    };
    let samples = res.result.get("Cdensity").unwrap();
    assert!(samples.missing_count() > 0);

    let out = dir.path().join("A.json");
    write_result_json(&out, &res.result).unwrap();
    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("{\"ageGrid\":["));
    assert!(text.contains("null"));

    let back = read_result_json(&out).unwrap();
    assert_eq!(back.age_grid, res.result.age_grid);
    let m = back.get("Cdensity").unwrap();
    assert_eq!((m.rows(), m.cols()), (samples.rows(), samples.cols()));
    assert_eq!(m.missing_count(), samples.missing_count());
}

#[test]
fn band_csv_leaves_undefined_quantiles_empty() {
    let dir = tempfile::tempdir().unwrap();
    let samples = Matrix::from_rows((0..20).map(|t| vec![t as f64, f64::NAN]).collect()).unwrap();
    let band = summarize(
        &[100.0, 110.0],
        &samples,
        &BandConfig {
            levels: vec![0.25],
            min_sample_count: 5,
        },
    )
    .unwrap();
    let out = dir.path().join("bands.csv");
    write_band_csv(&out, &band).unwrap();
    let text = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "grid,q0.250,q0.500,q0.750");
    assert_eq!(lines[1], "100,4.75,9.5,14.25");
    assert_eq!(lines[2], "110,,,");
}
