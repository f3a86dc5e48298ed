//! Pipeline diagnostics: timing and counts for each stage.
//!
//! The pipeline crate performs no I/O and does not read the system clock
//! itself. Callers supply a [`Clock`] so the same instrumentation works
//! natively, under test, or anywhere else a monotonic time source exists.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::{Pipeline, PipelineStage};
use crate::types::{MosaicConfig, PipelineError, StagedResult};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// A monotonic time source.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 2: Sobel edge detection.
    pub edge_detection: StageDiagnostics,
    /// Stage 3: quadtree seed placement.
    pub seed_placement: StageDiagnostics,
    /// Stage 4: nearest-seed stylization.
    pub stylize: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Edge detection metrics.
    EdgeDetection {
        /// Gradient magnitude threshold.
        threshold: i32,
        /// Number of cells classified as edges.
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
    /// Seed placement metrics.
    SeedPlacement {
        /// Configured seed budget.
        budget: usize,
        /// Number of seeds placed.
        seed_count: usize,
        /// Whether placement stopped because the budget ran out.
        budget_exhausted: bool,
    },
    /// Stylization metrics.
    Stylize {
        /// Which nearest-seed search was used.
        strategy: String,
        /// Number of seeds searched per pixel (brute force) or indexed.
        seed_count: usize,
        /// Number of output pixels written.
        pixel_count: u64,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of edge pixels.
    pub edge_pixel_count: u64,
    /// Number of seeds placed.
    pub seed_count: usize,
}

/// Run the pipeline stage by stage, timing each transition with `clock`.
///
/// # Errors
///
/// Returns the same errors as [`crate::process_staged`].
pub fn process_staged_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &MosaicConfig,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let total_start = clock.now();
    let pending = Pipeline::new(image_bytes.to_vec(), config.clone());

    let (decoded, decode) = timed(clock, || pending.decode())?;
    let (edges, edge_detection) = timed(clock, || Ok(decoded.detect_edges()))?;
    let (seeds, seed_placement) = timed(clock, || Ok(edges.place_seeds()))?;
    let (stylized, stylize) = timed(clock, || seeds.stylize())?;

    let total_duration = clock.elapsed(&total_start);
    let result = stylized.into_result();

    let summary = PipelineSummary {
        image_width: result.dimensions.width,
        image_height: result.dimensions.height,
        pixel_count: result.dimensions.pixel_count(),
        edge_pixel_count: result.edges.edge_pixel_count(),
        seed_count: result.seeds.len(),
    };

    Ok((
        result,
        PipelineDiagnostics {
            decode,
            edge_detection,
            seed_placement,
            stylize,
            total_duration,
            summary,
        },
    ))
}

/// Run one stage transition and pair its output with timing and the
/// metrics the new stage reports.
fn timed<C: Clock, S: PipelineStage>(
    clock: &C,
    step: impl FnOnce() -> Result<S, PipelineError>,
) -> Result<(S, StageDiagnostics), PipelineError> {
    let start = clock.now();
    let stage = step()?;
    let duration = clock.elapsed(&start);
    log::trace!("stage `{}` took {duration:?}", S::NAME);
    let metrics = stage.metrics();
    Ok((stage, StageDiagnostics { duration, metrics }))
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Decode", &self.decode),
            ("Edge Detection", &self.edge_detection),
            ("Seed Placement", &self.seed_placement),
            ("Stylize", &self.stylize),
        ];

        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Edge pixels: {}  |  Seeds: {}",
            self.summary.edge_pixel_count, self.summary.seed_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::EdgeDetection {
            threshold,
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("threshold={threshold} edges={edge_pixel_count} ({density:.1}%)")
        }
        StageMetrics::SeedPlacement {
            budget,
            seed_count,
            budget_exhausted,
        } => {
            let note = if *budget_exhausted { " (exhausted)" } else { "" };
            format!("{seed_count}/{budget} seeds{note}")
        }
        StageMetrics::Stylize {
            strategy,
            seed_count,
            pixel_count,
        } => format!("{strategy} {pixel_count} px x {seed_count} seeds"),
    }
}
