//! tessera: stylize an image file into an edge-aware flat-color mosaic.
//!
//! Reads an image, runs the mosaic pipeline with the given edge threshold
//! and seed budget, writes the stylized result (and optionally the binary
//! edge map), and prints per-stage diagnostics.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin tessera -- [OPTIONS] <IMAGE_PATH> [THRESHOLD]
//! ```
//!
//! Set `RUST_LOG=debug` to see per-stage log lines from the pipeline.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use tessera_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use tessera_pipeline::{MosaicConfig, NearestSeedKind, StagedResult};

/// Edge-aware flat-color mosaic stylization.
///
/// Detects edges with a Sobel filter, seeds a quadtree densely along
/// them, and paints every pixel with the source color at its nearest
/// seed.
#[derive(Parser)]
#[command(name = "tessera", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Sobel gradient magnitude at or above which a pixel is an edge.
    #[arg(
        default_value_t = MosaicConfig::DEFAULT_EDGE_THRESHOLD,
        allow_negative_numbers = true
    )]
    threshold: i32,

    /// Maximum number of seeds to place.
    #[arg(long, default_value_t = MosaicConfig::DEFAULT_SEED_BUDGET, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    budget: usize,

    /// Nearest-seed search used while stylizing.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_SEARCH)]
    nearest_seed: Search,

    /// Where to write the stylized image. The format follows the file
    /// extension. Defaults to `<IMAGE_STEM>-mosaic.png` next to the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the binary edge map to this path.
    #[arg(long)]
    edges: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Full mosaic config as a JSON string.
    ///
    /// When provided, `THRESHOLD`, `--budget` and `--nearest-seed` are
    /// ignored. The JSON must be a valid `MosaicConfig` serialization;
    /// omitted fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Nearest-seed search selection.
#[derive(Clone, Copy, ValueEnum)]
enum Search {
    /// Compare every pixel against every seed.
    BruteForce,
    /// Query an R-tree of the seeds.
    RTree,
}

/// Maps a [`NearestSeedKind`] to the local CLI [`Search`] enum.
const fn search_from_pipeline(kind: NearestSeedKind) -> Search {
    match kind {
        NearestSeedKind::BruteForce => Search::BruteForce,
        NearestSeedKind::RTree => Search::RTree,
    }
}

/// The CLI default search, derived from [`MosaicConfig::DEFAULT_NEAREST_SEED`]
/// so the two cannot silently diverge.
const CLI_DEFAULT_SEARCH: Search = search_from_pipeline(MosaicConfig::DEFAULT_NEAREST_SEED);

/// Build a [`MosaicConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored. Either way the result is
/// validated before it is returned.
fn config_from_cli(cli: &Cli) -> Result<MosaicConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        MosaicConfig {
            edge_threshold: cli.threshold,
            seed_budget: cli.budget,
            nearest_seed: match cli.nearest_seed {
                Search::BruteForce => NearestSeedKind::BruteForce,
                Search::RTree => NearestSeedKind::RTree,
            },
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// `<dir>/<stem>-mosaic.png` for an input at `<dir>/<stem>.<ext>`.
fn default_output_path(image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("tessera");
    image_path.with_file_name(format!("{stem}-mosaic.png"))
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    log::debug!("config: {config:?}");

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (staged, diagnostics) =
            match tessera_pipeline::diagnostics::process_staged_with_diagnostics(
                &image_bytes,
                &config,
                &StdClock,
            ) {
                Ok(pair) => pair,
                Err(e) => {
                    eprintln!("Pipeline error: {e}");
                    return ExitCode::FAILURE;
                }
            };

        if run == 0 {
            eprintln!(
                "Source      : {} {} x {}",
                cli.image_path.display(),
                staged.dimensions.width,
                staged.dimensions.height,
            );
            eprintln!("Seeds found : {}", staged.seeds.len());

            if let Err(msg) = write_outputs(&cli, &staged) {
                eprintln!("{msg}");
                return ExitCode::FAILURE;
            }
        }

        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Write the stylized image and, if requested, the edge map.
fn write_outputs(cli: &Cli, staged: &StagedResult) -> Result<(), String> {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.image_path));
    staged
        .stylized
        .save(&output)
        .map_err(|e| format!("Error writing {}: {e}", output.display()))?;
    log::info!("mosaic written to {}", output.display());

    if let Some(ref edges_path) = cli.edges {
        staged
            .edges
            .to_gray_image()
            .save(edges_path)
            .map_err(|e| format!("Error writing {}: {e}", edges_path.display()))?;
        log::info!("edge map written to {}", edges_path.display());
    }

    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&PipelineDiagnostics) -> Duration;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Decode", |d| d.decode.duration),
        ("Edge Detection", |d| d.edge_detection.duration),
        ("Seed Placement", |d| d.seed_placement.duration),
        ("Stylize", |d| d.stylize.duration),
    ];

    for (name, extractor) in stage_extractors {
        let stage_mean = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum::<f64>()
            / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tessera").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_come_from_library() {
        let cli = parse(&["in.png"]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config, MosaicConfig::default());
    }

    #[test]
    fn positional_threshold_and_flags() {
        let cli = parse(&["in.png", "200", "--budget", "64", "--nearest-seed", "r-tree"]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.edge_threshold, 200);
        assert_eq!(config.seed_budget, 64);
        assert_eq!(config.nearest_seed, NearestSeedKind::RTree);
    }

    #[test]
    fn negative_threshold_is_accepted() {
        let cli = parse(&["in.png", "-3"]);
        assert_eq!(config_from_cli(&cli).unwrap().edge_threshold, -3);
    }

    #[test]
    fn zero_budget_flag_is_rejected() {
        let result =
            Cli::try_parse_from(["tessera", "in.png", "--budget", "0"].iter().copied());
        assert!(result.is_err());
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&[
            "in.png",
            "10",
            "--config-json",
            r#"{"edge_threshold": 300, "seed_budget": 5}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.edge_threshold, 300);
        assert_eq!(config.seed_budget, 5);
    }

    #[test]
    fn config_json_with_zero_budget_fails_validation() {
        let cli = parse(&["in.png", "--config-json", r#"{"seed_budget": 0}"#]);
        assert!(config_from_cli(&cli).is_err());
    }

    #[test]
    fn malformed_config_json_is_reported() {
        let cli = parse(&["in.png", "--config-json", "{not json"]);
        let err = config_from_cli(&cli).unwrap_err();
        assert!(err.starts_with("Error parsing --config-json"));
    }

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output_path(Path::new("photos/cat.jpg")),
            PathBuf::from("photos/cat-mosaic.png")
        );
    }
}
