//! Budget-bounded seed placement by recursive quadrant subdivision.
//!
//! A region that is entirely edge or entirely background gets one seed
//! at its midpoint. Any other region is split into four quadrants that
//! are visited depth-first (top-left, top-right, bottom-left,
//! bottom-right). Detailed areas of the edge map therefore attract many
//! small regions and many seeds, while flat areas are covered by a few
//! large ones.
//!
//! # Seam convention
//!
//! An axis `[lo, hi)` of length 2 or more is split at
//! `mid = lo + (hi - lo) / 2` into `[lo, mid)` and `[mid + 1, hi)`. The
//! seam row and column at `mid` belong to no quadrant; those pixels get
//! no dedicated seed and are colored by their nearest seed during
//! stylization. Empty halves are skipped. An axis of length 1 is kept
//! whole, so a one-pixel strip is only split along its long axis and
//! every non-empty region eventually yields a seed.
//!
//! # Budget
//!
//! The remaining budget is shared by the whole traversal. Once it reaches
//! zero the traversal unwinds without placing anything else, leaving the
//! unvisited area to be served by whichever seed is nearest. Running out
//! is the normal way for a detailed image to finish.

use crate::types::{Dimensions, EdgeMap, Point, SeedList};

/// A half-open rectangle `[x0, x1) × [y0, y1)` of the edge map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// First column.
    pub x0: u32,
    /// First row.
    pub y0: u32,
    /// One past the last column.
    pub x1: u32,
    /// One past the last row.
    pub y1: u32,
}

impl Region {
    /// Create a region from its corners.
    #[must_use]
    pub const fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// The region covering a whole image.
    #[must_use]
    pub const fn full(dimensions: Dimensions) -> Self {
        Self::new(0, 0, dimensions.width, dimensions.height)
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// Returns `true` if the region contains no pixels.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Integer midpoint `((x0 + x1) / 2, (y0 + y1) / 2)`.
    ///
    /// Computed without overflow; lies inside any non-empty region.
    #[must_use]
    pub const fn midpoint(self) -> Point {
        Point::new(self.x0 + self.width() / 2, self.y0 + self.height() / 2)
    }

    /// The non-empty quadrants in visiting order: top-left, top-right,
    /// bottom-left, bottom-right.
    ///
    /// See the [module-level seam convention](self#seam-convention).
    pub fn quadrants(self) -> impl Iterator<Item = Self> {
        let columns = split_axis(self.x0, self.x1);
        let rows = split_axis(self.y0, self.y1);
        rows.into_iter()
            .flatten()
            .flat_map(move |(y0, y1)| {
                columns
                    .into_iter()
                    .flatten()
                    .map(move |(x0, x1)| Self::new(x0, y0, x1, y1))
            })
            .filter(|quadrant| !quadrant.is_empty())
    }
}

/// Split `[lo, hi)` into its low and high halves, leaving out the seam.
fn split_axis(lo: u32, hi: u32) -> [Option<(u32, u32)>; 2] {
    let len = hi.saturating_sub(lo);
    if len <= 1 {
        return [Some((lo, hi)), None];
    }
    let mid = lo + len / 2;
    [Some((lo, mid)), Some((mid + 1, hi))]
}

/// Outcome of a [`place_seeds_detailed`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPlacement {
    /// Seeds in placement order.
    pub seeds: SeedList,
    /// `true` when the budget ran out while some non-empty region was
    /// still waiting to be visited. A traversal that finishes with
    /// exactly `budget` seeds and nothing left over is not exhausted.
    pub budget_exhausted: bool,
}

/// Place up to `budget` seeds on `edges`.
///
/// The returned list is in placement order, holds at most `budget`
/// points, and every point lies inside the edge map. For `budget >= 1`
/// and a non-empty edge map at least one seed is placed. A `budget` of
/// zero yields an empty list, which the stylizer rejects.
///
/// This is the second processing stage, between edge detection and
/// stylization.
#[must_use = "returns the placed seeds"]
pub fn place_seeds(edges: &EdgeMap, budget: usize) -> SeedList {
    place_seeds_detailed(edges, budget).seeds
}

/// Like [`place_seeds`], but also reports whether the traversal was cut
/// short by the budget.
#[must_use = "returns the placed seeds"]
pub fn place_seeds_detailed(edges: &EdgeMap, budget: usize) -> SeedPlacement {
    let mut placer = SeedPlacer {
        edges,
        remaining: budget,
        seeds: SeedList::default(),
        exhausted: false,
    };
    placer.subdivide(Region::full(edges.dimensions()));

    if placer.exhausted {
        log::trace!("seed budget of {budget} exhausted");
    }
    log::debug!(
        "placed {} seeds (budget {budget}) on {} edge map",
        placer.seeds.len(),
        edges.dimensions(),
    );
    SeedPlacement {
        seeds: placer.seeds,
        budget_exhausted: placer.exhausted,
    }
}

/// Traversal state for a single [`place_seeds_detailed`] call.
struct SeedPlacer<'a> {
    edges: &'a EdgeMap,
    remaining: usize,
    seeds: SeedList,
    exhausted: bool,
}

impl SeedPlacer<'_> {
    fn subdivide(&mut self, region: Region) {
        if region.is_empty() {
            return;
        }
        if self.remaining == 0 {
            self.exhausted = true;
            return;
        }

        if is_homogeneous(self.edges, region) {
            self.seeds.push(region.midpoint());
            self.remaining -= 1;
            return;
        }

        for quadrant in region.quadrants() {
            if self.remaining == 0 {
                // `quadrants()` only yields non-empty regions, so this one
                // is left unseeded.
                self.exhausted = true;
                break;
            }
            self.subdivide(quadrant);
        }
    }
}

/// Whether every pixel of a non-empty, in-bounds `region` shares the
/// classification of its top-left pixel.
fn is_homogeneous(edges: &EdgeMap, region: Region) -> bool {
    let reference = edges.class_at(region.x0, region.y0);
    (region.y0..region.y1).all(|y| {
        edges
            .row_span(y, region.x0, region.x1)
            .iter()
            .all(|&class| class == reference)
    })
}
