//! Nearest-seed color transfer.
//!
//! Every output pixel takes the source color found *at* its nearest seed
//! (squared Euclidean distance in pixel coordinates), producing flat
//! Voronoi-like cells. Distance ties go to the seed that appears first in
//! the [`SeedList`], i.e. the one placed first during subdivision.
//!
//! # Strategy pattern
//!
//! The nearest-seed search is pluggable through [`NearestSeedKind`]. Every
//! strategy must produce byte-identical output, including tie-breaks;
//! they only differ in cost.

use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PipelineError, Point, RgbImage, SeedList};

/// Selects how the stylizer finds the nearest seed for each pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NearestSeedKind {
    /// Compare every pixel against every seed.
    ///
    /// O(width · height · seeds). This is the reference behavior and the
    /// dominant cost of the whole pipeline for large budgets.
    #[default]
    BruteForce,

    /// Query an R-tree bulk-loaded with the seeds.
    ///
    /// Candidates come back in non-decreasing distance order; all
    /// candidates at the minimum distance are compared by insertion
    /// index so ties resolve exactly as with [`BruteForce`](Self::BruteForce).
    RTree,
}

impl NearestSeedKind {
    /// Short human-readable name, used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BruteForce => "brute-force",
            Self::RTree => "r-tree",
        }
    }
}

/// Trait for stylization strategies.
///
/// Input: the source image and the seeds in placement order.
/// Output: an image of the same size where every pixel holds the source
/// color sampled at its nearest seed.
pub trait Stylizer {
    /// Fill `output` with the stylized image.
    ///
    /// All preconditions are checked before any pixel is written.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoSeeds`] if `seeds` is empty,
    /// [`PipelineError::DimensionMismatch`] if `output` and `source`
    /// differ in size, and [`PipelineError::SeedOutOfBounds`] if a seed
    /// lies outside `source`.
    fn stylize_into(
        &self,
        source: &RgbImage,
        seeds: &SeedList,
        output: &mut RgbImage,
    ) -> Result<(), PipelineError>;

    /// Allocate and return the stylized image.
    ///
    /// # Errors
    ///
    /// Same as [`stylize_into`](Self::stylize_into), minus the dimension
    /// check which cannot fail here.
    fn stylize(&self, source: &RgbImage, seeds: &SeedList) -> Result<RgbImage, PipelineError> {
        let mut output = RgbImage::new(source.width(), source.height());
        self.stylize_into(source, seeds, &mut output)?;
        Ok(output)
    }
}

impl Stylizer for NearestSeedKind {
    fn stylize_into(
        &self,
        source: &RgbImage,
        seeds: &SeedList,
        output: &mut RgbImage,
    ) -> Result<(), PipelineError> {
        validate(source, seeds, output)?;
        match *self {
            Self::BruteForce => fill(source, seeds, output, &LinearSearch(seeds.points())),
            Self::RTree => fill(source, seeds, output, &TreeSearch::new(seeds)),
        }
        log::debug!(
            "stylized {} image from {} seeds ({})",
            Dimensions::of(source),
            seeds.len(),
            self.name(),
        );
        Ok(())
    }
}

/// Stylize `source` with the reference brute-force search.
///
/// This is the third processing stage, after seed placement.
///
/// # Errors
///
/// Returns [`PipelineError::NoSeeds`] if `seeds` is empty and
/// [`PipelineError::SeedOutOfBounds`] if a seed lies outside `source`.
pub fn stylize(source: &RgbImage, seeds: &SeedList) -> Result<RgbImage, PipelineError> {
    NearestSeedKind::BruteForce.stylize(source, seeds)
}

/// Stylize `source` into a caller-provided buffer with the reference
/// brute-force search.
///
/// # Errors
///
/// See [`Stylizer::stylize_into`].
pub fn stylize_into(
    source: &RgbImage,
    seeds: &SeedList,
    output: &mut RgbImage,
) -> Result<(), PipelineError> {
    NearestSeedKind::BruteForce.stylize_into(source, seeds, output)
}

fn validate(source: &RgbImage, seeds: &SeedList, output: &RgbImage) -> Result<(), PipelineError> {
    if seeds.is_empty() {
        return Err(PipelineError::NoSeeds);
    }
    let expected = Dimensions::of(source);
    let actual = Dimensions::of(output);
    if expected != actual {
        return Err(PipelineError::DimensionMismatch { expected, actual });
    }
    if let Some(&seed) = seeds.iter().find(|&&s| !expected.contains(s)) {
        return Err(PipelineError::SeedOutOfBounds {
            seed,
            dimensions: expected,
        });
    }
    Ok(())
}

/// Index of the nearest seed to a pixel, ties to the lowest index.
trait NearestSeed {
    fn nearest(&self, pixel: Point) -> usize;
}

/// Copy the source color at each pixel's nearest seed into `output`.
///
/// Callers must have run [`validate`] first.
fn fill(source: &RgbImage, seeds: &SeedList, output: &mut RgbImage, search: &impl NearestSeed) {
    let points = seeds.points();
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let seed = points[search.nearest(Point::new(x, y))];
        *pixel = *source.get_pixel(seed.x, seed.y);
    }
}

struct LinearSearch<'a>(&'a [Point]);

impl NearestSeed for LinearSearch<'_> {
    fn nearest(&self, pixel: Point) -> usize {
        let mut best = 0;
        let mut best_distance = u64::MAX;
        for (index, seed) in self.0.iter().enumerate() {
            let distance = pixel.distance_squared(*seed);
            // Strict comparison keeps the earliest seed on ties.
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }
        }
        best
    }
}

/// Seed coordinate tagged with its insertion index.
type IndexedSeed = GeomWithData<[i64; 2], usize>;

struct TreeSearch {
    tree: RTree<IndexedSeed>,
}

impl TreeSearch {
    fn new(seeds: &SeedList) -> Self {
        let entries = seeds
            .iter()
            .enumerate()
            .map(|(index, seed)| IndexedSeed::new(to_coord(*seed), index))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }
}

impl NearestSeed for TreeSearch {
    fn nearest(&self, pixel: Point) -> usize {
        let query = to_coord(pixel);
        let mut candidates = self.tree.nearest_neighbor_iter(&query);
        let Some(first) = candidates.next() else {
            return 0;
        };
        let best_distance = distance_2(*first.geom(), query);
        let mut best = first.data;
        // Candidates arrive in non-decreasing distance order.
        for candidate in candidates {
            if distance_2(*candidate.geom(), query) > best_distance {
                break;
            }
            best = best.min(candidate.data);
        }
        best
    }
}

fn to_coord(point: Point) -> [i64; 2] {
    [i64::from(point.x), i64::from(point.y)]
}

fn distance_2(a: [i64; 2], b: [i64; 2]) -> i64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// 8x6 image where every pixel has a unique color.
    #[allow(clippy::cast_possible_truncation)]
    fn gradient_image() -> RgbImage {
        RgbImage::from_fn(8, 6, |x, y| image::Rgb([(x * 30) as u8, (y * 40) as u8, 7]))
    }

    fn seeds(points: &[(u32, u32)]) -> SeedList {
        SeedList::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    /// Deterministic scattered seeds, including duplicates.
    fn scattered_seeds(width: u32, height: u32, count: u32) -> SeedList {
        SeedList::new(
            (0..count)
                .map(|i| Point::new((i * 7 + 3) % width, (i * 13 + 1) % height))
                .collect(),
        )
    }

    #[test]
    fn default_is_brute_force() {
        assert_eq!(NearestSeedKind::default(), NearestSeedKind::BruteForce);
    }

    #[test]
    fn single_seed_produces_flat_image() {
        let source = gradient_image();
        let out = stylize(&source, &seeds(&[(5, 2)])).unwrap();
        let expected = *source.get_pixel(5, 2);
        assert_eq!(out.dimensions(), source.dimensions());
        assert!(out.pixels().all(|p| *p == expected));
    }

    #[test]
    fn pixels_take_color_of_nearest_seed() {
        let source = gradient_image();
        let out = stylize(&source, &seeds(&[(0, 0), (7, 5)])).unwrap();
        assert_eq!(out.get_pixel(1, 1), source.get_pixel(0, 0));
        assert_eq!(out.get_pixel(6, 4), source.get_pixel(7, 5));
        assert_eq!(out.get_pixel(7, 0), source.get_pixel(7, 5));
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn ties_go_to_earliest_seed() {
        let source = RgbImage::from_fn(3, 1, |x, _| image::Rgb([x as u8 * 100, 0, 0]));
        // (1, 0) is equidistant from both seeds.
        let out = stylize(&source, &seeds(&[(0, 0), (2, 0)])).unwrap();
        assert_eq!(out.get_pixel(1, 0), source.get_pixel(0, 0));

        let out = stylize(&source, &seeds(&[(2, 0), (0, 0)])).unwrap();
        assert_eq!(out.get_pixel(1, 0), source.get_pixel(2, 0));
    }

    #[test]
    fn output_palette_is_sampled_at_seeds() {
        let source = gradient_image();
        let list = scattered_seeds(8, 6, 9);
        let out = stylize(&source, &list).unwrap();
        let palette: Vec<_> = list.iter().map(|s| *source.get_pixel(s.x, s.y)).collect();
        assert!(out.pixels().all(|p| palette.contains(p)));
    }

    #[test]
    fn empty_seed_list_is_rejected() {
        let result = stylize(&gradient_image(), &SeedList::default());
        assert!(matches!(result, Err(PipelineError::NoSeeds)));
    }

    #[test]
    fn mismatched_output_is_rejected_untouched() {
        let source = gradient_image();
        let mut output = RgbImage::from_pixel(7, 6, image::Rgb([1, 2, 3]));
        let source_dims = Dimensions {
            width: 8,
            height: 6,
        };
        let output_dims = Dimensions {
            width: 7,
            height: 6,
        };
        let result = stylize_into(&source, &seeds(&[(0, 0)]), &mut output);
        assert!(matches!(
            result,
            Err(PipelineError::DimensionMismatch { expected, actual })
                if expected == source_dims && actual == output_dims
        ));
        assert!(output.pixels().all(|p| *p == image::Rgb([1, 2, 3])));
    }

    #[test]
    fn out_of_bounds_seed_is_rejected() {
        let result = stylize(&gradient_image(), &seeds(&[(1, 1), (8, 0)]));
        assert!(matches!(
            result,
            Err(PipelineError::SeedOutOfBounds { seed, .. }) if seed == Point::new(8, 0)
        ));
    }

    #[test]
    fn stylize_into_fills_caller_buffer() {
        let source = gradient_image();
        let list = scattered_seeds(8, 6, 5);
        let mut output = RgbImage::new(8, 6);
        stylize_into(&source, &list, &mut output).unwrap();
        assert_eq!(output, stylize(&source, &list).unwrap());
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn r_tree_matches_brute_force() {
        let source = RgbImage::from_fn(40, 25, |x, y| {
            image::Rgb([(x * 6) as u8, (y * 10) as u8, ((x + y) * 3) as u8])
        });
        for count in [1, 2, 17, 120] {
            let list = scattered_seeds(40, 25, count);
            let brute = NearestSeedKind::BruteForce.stylize(&source, &list).unwrap();
            let tree = NearestSeedKind::RTree.stylize(&source, &list).unwrap();
            assert_eq!(brute, tree, "{count} seeds");
        }
    }

    #[test]
    fn r_tree_breaks_ties_by_insertion_order() {
        // A regular grid of seeds makes many pixels equidistant from
        // two or four seeds.
        let source = gradient_image();
        let list = seeds(&[(6, 4), (2, 4), (6, 0), (2, 0), (4, 2)]);
        let brute = NearestSeedKind::BruteForce.stylize(&source, &list).unwrap();
        let tree = NearestSeedKind::RTree.stylize(&source, &list).unwrap();
        assert_eq!(brute, tree);
    }

    #[test]
    fn r_tree_rejects_same_inputs() {
        let result = NearestSeedKind::RTree.stylize(&gradient_image(), &SeedList::default());
        assert!(matches!(result, Err(PipelineError::NoSeeds)));
    }

    #[test]
    fn kind_serde_round_trip() {
        let json = serde_json::to_string(&NearestSeedKind::RTree).unwrap();
        let kind: NearestSeedKind = serde_json::from_str(&json).unwrap();
        assert_eq!(kind, NearestSeedKind::RTree);
    }
}
