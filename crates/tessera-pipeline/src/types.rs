//! Shared types for the tessera mosaic pipeline.

use serde::{Deserialize, Serialize};

use crate::stylize::NearestSeedKind;

/// Re-export `RgbImage` so downstream crates can hand source pixels to
/// the pipeline without depending on `image` directly.
pub use image::RgbImage;

/// Re-export `GrayImage` for edge map previews.
pub use image::GrayImage;

/// Pixel written for [`EdgeClass::Background`] when an edge map is
/// rendered to an image.
pub const BACKGROUND_PIXEL: image::Rgb<u8> = image::Rgb([0, 0, 0]);

/// Pixel written for [`EdgeClass::Edge`] when an edge map is rendered to
/// an image.
pub const EDGE_PIXEL: image::Rgb<u8> = image::Rgb([255, 255, 255]);

/// An integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Column (pixels from left edge).
    pub x: u32,
    /// Row (pixels from top edge).
    pub y: u32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point, in pixel-coordinate
    /// space.
    ///
    /// Exact for any two points on an image narrower and shorter than
    /// 2^31 pixels; saturates at `u64::MAX` beyond that.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> u64 {
        let dx = u64::from(self.x.abs_diff(other.x));
        let dy = u64::from(self.y.abs_diff(other.y));
        (dx * dx).saturating_add(dy * dy)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an RGB image.
    #[must_use]
    pub fn of(image: &RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Whether `point` lies in `[0, width) × [0, height)`.
    #[must_use]
    pub const fn contains(self, point: Point) -> bool {
        point.x < self.width && point.y < self.height
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Binary classification of a single edge map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EdgeClass {
    /// Gradient magnitude below the threshold, or a border pixel.
    #[default]
    Background,
    /// Gradient magnitude at or above the threshold.
    Edge,
}

impl EdgeClass {
    /// The fixed pixel color used when rendering this class.
    #[must_use]
    pub const fn pixel(self) -> image::Rgb<u8> {
        match self {
            Self::Background => BACKGROUND_PIXEL,
            Self::Edge => EDGE_PIXEL,
        }
    }
}

/// A binary edge map with the same dimensions as its source image.
///
/// Stored row-major. Every cell starts out as [`EdgeClass::Background`],
/// so cells the detector never visits (the one-pixel border ring) keep a
/// defined classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMap {
    width: u32,
    height: u32,
    cells: Vec<EdgeClass>,
}

impl EdgeMap {
    /// Create an all-background edge map.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let len = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(usize::MAX);
        Self {
            width,
            height,
            cells: vec![EdgeClass::Background; len],
        }
    }

    /// Build an edge map by classifying every `(x, y)` with `f`.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> EdgeClass) -> Self {
        let mut map = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                map.set(x, y, f(x, y));
            }
        }
        map
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width and height as [`Dimensions`].
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Classification at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<EdgeClass> {
        if x < self.width && y < self.height {
            Some(self.cells[self.offset(x, y)])
        } else {
            None
        }
    }

    /// All cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[EdgeClass] {
        &self.cells
    }

    /// Number of cells classified as [`EdgeClass::Edge`].
    #[must_use]
    pub fn edge_pixel_count(&self) -> u64 {
        self.cells
            .iter()
            .map(|&c| u64::from(c == EdgeClass::Edge))
            .sum()
    }

    /// Row `y` restricted to columns `[x0, x1)`.
    ///
    /// Callers must pass an in-bounds row and column range.
    pub(crate) fn row_span(&self, y: u32, x0: u32, x1: u32) -> &[EdgeClass] {
        let start = self.offset(x0, y);
        let end = self.offset(x1, y);
        &self.cells[start..end]
    }

    /// Classification at an in-bounds `(x, y)`.
    pub(crate) fn class_at(&self, x: u32, y: u32) -> EdgeClass {
        self.cells[self.offset(x, y)]
    }

    pub(crate) fn set(&mut self, x: u32, y: u32, class: EdgeClass) {
        let offset = self.offset(x, y);
        self.cells[offset] = class;
    }

    /// Render as an RGB image using [`EDGE_PIXEL`] and [`BACKGROUND_PIXEL`].
    #[must_use = "returns the rendered edge map"]
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| self.class_at(x, y).pixel())
    }

    /// Render as a grayscale image: 255 for edges, 0 for background.
    #[must_use = "returns the rendered edge map"]
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| match self.class_at(x, y) {
            EdgeClass::Background => image::Luma([0]),
            EdgeClass::Edge => image::Luma([255]),
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }
}

/// An ordered, append-only list of seed points.
///
/// Insertion order is significant: the stylizer resolves distance ties in
/// favor of the seed that was placed first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedList(Vec<Point>);

impl SeedList {
    /// Create a seed list from points in insertion order.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if no seed was placed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of seeds.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Seeds in insertion order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Iterate over the seeds in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.0.iter()
    }

    /// Consumes the list and returns the underlying points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    pub(crate) fn push(&mut self, point: Point) {
        self.0.push(point);
    }
}

impl<'a> IntoIterator for &'a SeedList {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Configuration for the mosaic pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicConfig {
    /// Sobel gradient magnitude at or above which a pixel is an edge.
    ///
    /// Any integer is accepted. Values at or below zero mark every
    /// interior pixel as an edge; values above
    /// [`GRADIENT_MAGNITUDE_BOUND`](crate::edge::GRADIENT_MAGNITUDE_BOUND)
    /// mark none.
    pub edge_threshold: i32,

    /// Maximum number of seeds the placer may emit.
    pub seed_budget: usize,

    /// Which nearest-seed search the stylizer uses.
    pub nearest_seed: NearestSeedKind,
}

impl MosaicConfig {
    /// Default edge threshold.
    pub const DEFAULT_EDGE_THRESHOLD: i32 = 128;

    /// Default seed budget.
    pub const DEFAULT_SEED_BUDGET: usize = 80_000;

    /// Default nearest-seed search.
    pub const DEFAULT_NEAREST_SEED: NearestSeedKind = NearestSeedKind::BruteForce;

    /// Check the configuration for values that can never produce an
    /// image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when `seed_budget` is zero.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.seed_budget == 0 {
            return Err(PipelineError::InvalidConfig(
                "seed_budget must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            edge_threshold: Self::DEFAULT_EDGE_THRESHOLD,
            seed_budget: Self::DEFAULT_SEED_BUDGET,
            nearest_seed: Self::DEFAULT_NEAREST_SEED,
        }
    }
}

/// Result of running the full pipeline.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// The flat-color mosaic.
    pub stylized: RgbImage,

    /// Number of seeds the placer emitted.
    pub seed_count: usize,

    /// Dimensions of the source (and stylized) image.
    pub dimensions: Dimensions,
}

/// Result of running the pipeline with every intermediate preserved.
///
/// Does not derive `PartialEq` because `RgbImage` comparisons walk the
/// full pixel buffer; compare fields explicitly where needed.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Stage 1: decoded source image.
    pub source: RgbImage,
    /// Stage 2: binary edge map.
    pub edges: EdgeMap,
    /// Stage 3: seeds in placement order.
    pub seeds: SeedList,
    /// Stage 4: the flat-color mosaic.
    pub stylized: RgbImage,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// The stylizer was given no seeds to sample colors from.
    #[error("seed list is empty; a seed budget of at least 1 is required")]
    NoSeeds,

    /// The output buffer does not match the source image.
    #[error("output image is {actual} but source image is {expected}")]
    DimensionMismatch {
        /// Source image dimensions.
        expected: Dimensions,
        /// Output buffer dimensions.
        actual: Dimensions,
    },

    /// A seed lies outside the source image.
    #[error("seed ({}, {}) lies outside the {dimensions} image", seed.x, seed.y)]
    SeedOutOfBounds {
        /// The offending seed.
        seed: Point,
        /// Source image dimensions.
        dimensions: Dimensions,
    },
}
