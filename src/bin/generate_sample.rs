use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use proxy_uq::CorePaths;

/// Write a synthetic core (settings, sampler output, proxy table) to disk.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory the core folder is created in
    #[arg(long, default_value = "sample_cores")]
    out: PathBuf,

    /// Core tag, also used as file prefix
    #[arg(long, default_value = "SYN1")]
    tag: String,

    /// Number of MC samples
    #[arg(long, default_value_t = 1000)]
    samples: usize,

    /// Core length (cm)
    #[arg(long, default_value_t = 50.0)]
    length: f64,

    /// Section width (cm)
    #[arg(long, default_value_t = 1.0)]
    d_by: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Mean accumulation rate (y/cm) at depth `d`: slower towards the bottom.
fn mean_rate(d: f64) -> f64 {
    8.0 + 0.15 * d
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let dir = args.out.join(&args.tag);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let paths = CorePaths::new(dir.join(&args.tag));

    // ---- Settings ----
    let (d_min, d_max, d_by) = (0.0, args.length, args.d_by);
    std::fs::write(paths.settings(), format!("{d_min}\n{d_max}\n{d_by}\n"))
        .with_context(|| format!("writing {}", paths.settings().display()))?;
    let points = (((d_max - d_min) / d_by) + 1e-9).floor() as usize + 1;
    let sections = points - 1;

    // ---- Sampler output: start age, section rates, w, U ----
    let out_path = paths.sampler_output(points);
    let mut out = csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_path(&out_path)
        .with_context(|| format!("creating {}", out_path.display()))?;
    for _ in 0..args.samples {
        let mut row = Vec::with_capacity(sections + 3);
        row.push(rng.gauss(-60.0, 8.0));
        // Log-normal rates keep every sample monotonic.
        let shared = rng.gauss(0.0, 0.15);
        for j in 0..sections {
            let d = d_min + (j as f64 + 0.5) * d_by;
            row.push(mean_rate(d) * (shared + rng.gauss(0.0, 0.1)).exp());
        }
        row.push(rng.next_f64());
        row.push(-rng.gauss(1500.0, 20.0).abs());
        out.write_record(row.iter().map(|v| format!("{v:.6}")))?;
    }
    out.flush()?;

    // ---- Proxy table ----
    let proxy_path = paths.proxies();
    let mut proxies = csv::Writer::from_path(&proxy_path)
        .with_context(|| format!("creating {}", proxy_path.display()))?;
    proxies.write_record(["depth", "Cdensity", "AlSi", "LOI"])?;
    let mut d = d_min + 0.5;
    let mut row_no = 0usize;
    while d <= d_max {
        let cdensity = 0.20 + 0.05 * (d / 6.0).sin() + rng.gauss(0.0, 0.01);
        let al_si = 0.15 + 0.002 * d + rng.gauss(0.0, 0.005);
        // Every 17th LOI measurement is missing.
        let loi = if row_no % 17 == 16 {
            String::new()
        } else {
            format!("{:.4}", 30.0 - 0.2 * d + rng.gauss(0.0, 1.0))
        };
        proxies.write_record([
            format!("{d:.2}"),
            format!("{cdensity:.4}"),
            format!("{al_si:.4}"),
            loi,
        ])?;
        d += 0.5;
        row_no += 1;
    }
    proxies.flush()?;

    println!(
        "Wrote core {} ({} samples, {} depth points) under {}",
        args.tag,
        args.samples,
        points,
        dir.display()
    );
    Ok(())
}
