use clap::{Parser, Subcommand};
use cloud_alignment::config::{load_config_or_default, Config, ConfigFormat, ScorerKind};
use cloud_alignment::logging::{init_logging, new_correlation_id};
use cloud_alignment::*;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "align-score")]
#[command(about = "Likelihood-field scoring of candidate translations between point cloud frames")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a grid of candidates on a synthetic box moved by a known offset
    Demo {
        /// Number of points sampled on the box surface
        #[arg(short = 'n', long, default_value = "400")]
        points: usize,

        /// True motion of the object between frames, "x,y,z" in meters
        #[arg(short, long, default_value = "0.1,-0.05,0.0", value_parser = parse_vector)]
        motion: Vector3<f64>,

        /// Standard deviation of the sensor noise in meters
        #[arg(long, default_value = "0.005")]
        noise: f64,

        /// Candidate grid spacing in meters
        #[arg(long, default_value = "0.05")]
        step: f64,

        /// Candidate grid half-extent in meters
        #[arg(long, default_value = "0.2")]
        extent: f64,

        /// Correspondence strategy (nn or grid); overrides the config
        #[arg(short, long)]
        scorer: Option<ScorerKind>,

        /// Seed for the synthetic cloud
        #[arg(long, default_value = "7")]
        seed: u64,

        /// Write all scored candidates as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the default configuration
    Config {
        /// Destination file
        output: PathBuf,

        /// Output format (toml or json)
        #[arg(short, long, default_value = "toml")]
        format: ConfigFormat,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config_or_default(cli.config.as_deref());
    if cli.verbose > 0 {
        let level = match cli.verbose {
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        config.logging = config.logging.with_level(level);
    }
    let _guard = init_logging(&config.logging)?;

    match cli.command {
        Commands::Demo {
            points,
            motion,
            noise,
            step,
            extent,
            scorer,
            seed,
            output,
        } => {
            if let Some(kind) = scorer {
                config.evaluation.scorer = kind;
            }
            handle_demo(&config, points, motion, noise, step, extent, seed, output)?;
        }
        Commands::Config { output, format } => {
            Config::default().save_to_file(&output, format)?;
            println!("Default configuration written to {}", output.display());
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_demo(
    config: &Config,
    points: usize,
    motion: Vector3<f64>,
    noise: f64,
    step: f64,
    extent: f64,
    seed: u64,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    if !(step > 0.0 && extent >= 0.0) {
        return Err(anyhow::anyhow!("step must be positive and extent non-negative"));
    }
    let correlation_id = new_correlation_id();
    let mut rng = StdRng::seed_from_u64(seed);

    let prev = sample_box_surface(&mut rng, points, noise)?;
    let current = sample_box_surface(&mut rng, points, noise)?.translated(&motion);
    let centroid = current
        .centroid()
        .ok_or_else(|| anyhow::anyhow!("Synthetic cloud is empty"))?;

    // Displacing the current points by -motion puts them back on the previous frame.
    let candidates = candidate_grid(-motion, step, extent);
    let resolutions = Resolutions::new(step, step, noise.max(1e-3), noise.max(1e-3));
    let prior = GaussianMotionPrior::new(
        Vector3::zeros(),
        Vector3::new(2.0, 2.0, 0.5),
        0.01,
        0.1,
    );

    let mut evaluator = AlignmentEvaluator::from_config(config);
    evaluator.set_prev_points(Arc::new(prev));
    let scored = evaluator.score_3d_transforms(&current, &centroid, &resolutions, &candidates, &prior)?;

    let best = scored
        .best()
        .ok_or_else(|| anyhow::anyhow!("No candidates were scored"))?;
    let t = best.transform();

    println!("Correlation ID:   {}", correlation_id);
    println!("Scorer:           {}", evaluator.scorer_name());
    println!("Candidates:       {}", scored.len());
    println!(
        "Expected offset:  ({:.3}, {:.3}, {:.3})",
        -motion.x, -motion.y, -motion.z
    );
    println!("Best offset:      ({:.3}, {:.3}, {:.3})", t.x, t.y, t.z);
    println!("Log-probability:  {:.3}", best.log_probability());

    if let Some(path) = output {
        std::fs::write(&path, serde_json::to_string_pretty(&scored)?)?;
        println!("Scored candidates written to {}", path.display());
    }

    Ok(())
}

/// Noisy samples on the floor and two walls of a 1 m box, so all three axes
/// are constrained.
fn sample_box_surface(rng: &mut StdRng, count: usize, noise: f64) -> anyhow::Result<PointCloud> {
    let jitter = Normal::new(0.0, noise.max(0.0))?;
    let mut cloud = PointCloud::with_capacity(count);
    for i in 0..count {
        let u: f64 = rng.gen_range(0.0..1.0);
        let v: f64 = rng.gen_range(0.0..1.0);
        let (x, y, z) = match i % 3 {
            0 => (u, v, 0.0),
            1 => (0.0, u, v),
            _ => (u, 0.0, v),
        };
        cloud.push(Point::new(
            x + jitter.sample(rng),
            y + jitter.sample(rng),
            z + jitter.sample(rng),
        ));
    }
    Ok(cloud)
}

/// Regular grid of candidates centred on `center`; each carries its cell volume.
fn candidate_grid(center: Vector3<f64>, step: f64, extent: f64) -> Vec<TransformCandidate> {
    let half = (extent / step).round() as i64;
    let volume = step * step * step;
    let mut candidates = Vec::new();
    for i in -half..=half {
        for j in -half..=half {
            for k in -half..=half {
                candidates.push(TransformCandidate::new(
                    center.x + i as f64 * step,
                    center.y + j as f64 * step,
                    center.z + k as f64 * step,
                    volume,
                ));
            }
        }
    }
    candidates
}

fn parse_vector(s: &str) -> std::result::Result<Vector3<f64>, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("'{}': {}", p, e)))
        .collect::<std::result::Result<_, _>>()?;
    match parts.as_slice() {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => Err(format!("expected three comma-separated values, got {}", parts.len())),
    }
}
