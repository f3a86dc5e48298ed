//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process_staged`] which runs the entire pipeline in one
//! call, [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use tessera_pipeline::{MosaicConfig, Pipeline, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let config = MosaicConfig::default();
//! let pipeline = Pipeline::new(png, config)
//!     .decode()?
//!     .detect_edges()
//!     .place_seeds()
//!     .stylize()?;
//!
//! let staged = pipeline.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying all previously computed
//! intermediates.
//!
//! # Memory
//!
//! From [`Stylized`] onward two full RGB buffers (source and mosaic) are
//! held alongside the edge map until [`Stylized::into_result`] consumes
//! the final stage. Callers that only need the mosaic should prefer
//! [`crate::process`].

use crate::diagnostics::StageMetrics;
use crate::stylize::Stylizer;
use crate::types::{
    Dimensions, EdgeMap, MosaicConfig, PipelineError, RgbImage, SeedList, StagedResult,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    config: MosaicConfig,
    bytes: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode the source image and advance to the [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if the source bytes are
    /// empty. Returns [`PipelineError::ImageDecode`] if the image
    /// format is unrecognized or the data is corrupt.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        let input_bytes = self.bytes.len();
        let source = crate::decode::decode(&self.bytes)?;
        let dimensions = Dimensions::of(&source);
        Ok(Decoded {
            config: self.config,
            source,
            dimensions,
            input_bytes,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
#[must_use = "pipeline stages are consumed by advancing; call .detect_edges() to continue"]
pub struct Decoded {
    config: MosaicConfig,
    source: RgbImage,
    dimensions: Dimensions,
    input_bytes: usize,
}

impl Decoded {
    /// The decoded source image.
    #[must_use]
    pub const fn source(&self) -> &RgbImage {
        &self.source
    }

    /// Image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Classify every pixel and advance to the [`EdgesDetected`] stage.
    pub fn detect_edges(self) -> EdgesDetected {
        let edges = crate::edge::detect_edges(&self.source, self.config.edge_threshold);
        EdgesDetected {
            config: self.config,
            source: self.source,
            edges,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 2: EdgesDetected ────────────────────

/// Pipeline state after Sobel edge detection.
#[must_use = "pipeline stages are consumed by advancing; call .place_seeds() to continue"]
pub struct EdgesDetected {
    config: MosaicConfig,
    source: RgbImage,
    edges: EdgeMap,
    dimensions: Dimensions,
}

impl EdgesDetected {
    /// The binary edge map.
    #[must_use]
    pub const fn edges(&self) -> &EdgeMap {
        &self.edges
    }

    /// Subdivide the edge map and advance to the [`SeedsPlaced`] stage.
    pub fn place_seeds(self) -> SeedsPlaced {
        let placement =
            crate::seeds::place_seeds_detailed(&self.edges, self.config.seed_budget);
        SeedsPlaced {
            config: self.config,
            source: self.source,
            edges: self.edges,
            seeds: placement.seeds,
            budget_exhausted: placement.budget_exhausted,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 3: SeedsPlaced ──────────────────────

/// Pipeline state after quadtree seed placement.
#[must_use = "pipeline stages are consumed by advancing; call .stylize() to continue"]
pub struct SeedsPlaced {
    config: MosaicConfig,
    source: RgbImage,
    edges: EdgeMap,
    seeds: SeedList,
    budget_exhausted: bool,
    dimensions: Dimensions,
}

impl SeedsPlaced {
    /// Seeds in placement order.
    #[must_use]
    pub const fn seeds(&self) -> &SeedList {
        &self.seeds
    }

    /// Whether placement stopped with part of the image still unvisited.
    #[must_use]
    pub const fn budget_exhausted(&self) -> bool {
        self.budget_exhausted
    }

    /// Paint the mosaic and advance to the final [`Stylized`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoSeeds`] if placement produced no seeds
    /// (a seed budget of zero).
    pub fn stylize(self) -> Result<Stylized, PipelineError> {
        let stylized = self.config.nearest_seed.stylize(&self.source, &self.seeds)?;
        Ok(Stylized {
            config: self.config,
            source: self.source,
            edges: self.edges,
            seeds: self.seeds,
            stylized,
            dimensions: self.dimensions,
        })
    }
}

// ───────────────────────── Stage 4: Stylized ─────────────────────────

/// Pipeline state after stylization, the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`StagedResult`] containing all intermediates.
#[must_use = "call .into_result() to extract the StagedResult"]
#[allow(clippy::struct_field_names)]
pub struct Stylized {
    config: MosaicConfig,
    source: RgbImage,
    edges: EdgeMap,
    seeds: SeedList,
    stylized: RgbImage,
    dimensions: Dimensions,
}

impl Stylized {
    /// The flat-color mosaic.
    #[must_use]
    pub const fn stylized(&self) -> &RgbImage {
        &self.stylized
    }

    /// Image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Consume the pipeline and return the full [`StagedResult`].
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            source: self.source,
            edges: self.edges,
            seeds: self.seeds,
            stylized: self.stylized,
            dimensions: self.dimensions,
        }
    }
}

// ──────────────────────── Stage metrics ──────────────────────────────

/// Implemented by every stage that has performed some processing.
///
/// [`Pending`] has done nothing yet and so has no implementation; every
/// other stage always has metrics to report.
pub trait PipelineStage {
    /// Human-readable name of this stage (e.g. `"decode"`, `"seeds"`).
    const NAME: &str;

    /// Stage-specific metrics for diagnostics.
    fn metrics(&self) -> StageMetrics;
}

impl PipelineStage for Decoded {
    const NAME: &str = "decode";

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Decode {
            input_bytes: self.input_bytes,
            width: self.dimensions.width,
            height: self.dimensions.height,
            pixel_count: self.dimensions.pixel_count(),
        }
    }
}

impl PipelineStage for EdgesDetected {
    const NAME: &str = "edges";

    fn metrics(&self) -> StageMetrics {
        StageMetrics::EdgeDetection {
            threshold: self.config.edge_threshold,
            edge_pixel_count: self.edges.edge_pixel_count(),
            total_pixel_count: self.dimensions.pixel_count(),
        }
    }
}

impl PipelineStage for SeedsPlaced {
    const NAME: &str = "seeds";

    fn metrics(&self) -> StageMetrics {
        StageMetrics::SeedPlacement {
            budget: self.config.seed_budget,
            seed_count: self.seeds.len(),
            budget_exhausted: self.budget_exhausted,
        }
    }
}

impl PipelineStage for Stylized {
    const NAME: &str = "stylize";

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Stylize {
            strategy: self.config.nearest_seed.name().to_string(),
            seed_count: self.seeds.len(),
            pixel_count: self.dimensions.pixel_count(),
        }
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental mosaic pipeline.
///
/// Created via [`Pipeline::new`], which stores the source image and
/// config without doing any processing. Each stage method consumes the
/// current state and returns the next, making it a compile-time error
/// to skip stages or call them out of order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from source image bytes and config.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: MosaicConfig) -> Pending {
        Pending {
            config,
            bytes: image_bytes,
        }
    }
}
