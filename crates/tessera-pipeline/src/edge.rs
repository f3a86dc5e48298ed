//! Sobel edge detection with binary thresholding.
//!
//! Unlike a luminance-based Sobel filter, each kernel tap is applied to
//! the plain sum of the three raw channel values of that neighbor
//! (0..=765). The gradient magnitude is `floor(sqrt(Gx² + Gy²))`,
//! computed with an exact integer square root so that the comparison
//! against the integer threshold never depends on floating-point
//! rounding.
//!
//! Only interior pixels are convolved. The one-pixel border ring is never
//! visited and stays [`EdgeClass::Background`].

use crate::types::{EdgeClass, EdgeMap, RgbImage};

/// Horizontal Sobel kernel, row-major.
pub const SOBEL_X: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];

/// Vertical Sobel kernel, row-major.
pub const SOBEL_Y: [[i32; 3]; 3] = [[1, 2, 1], [0, 0, 0], [-1, -2, -1]];

/// Upper bound on the gradient magnitude for 8-bit channels.
///
/// Each kernel has an absolute weight sum of 4 and every tap sees at most
/// `3 * 255 = 765`, so `|Gx|, |Gy| <= 3060` and
/// `sqrt(2) * 3060 ≈ 4327`. Any threshold above this classifies every
/// pixel as background.
pub const GRADIENT_MAGNITUDE_BOUND: i32 = 4327;
const _: () = assert!(GRADIENT_MAGNITUDE_BOUND * GRADIENT_MAGNITUDE_BOUND <= 2 * 3060 * 3060);

/// Classify every pixel of `source` as edge or background.
///
/// Returns an [`EdgeMap`] with the same dimensions as `source`. A pixel
/// is [`EdgeClass::Background`] when its gradient magnitude is strictly
/// below `threshold` and [`EdgeClass::Edge`] otherwise. The border ring
/// is always background, so images narrower or shorter than 3 pixels
/// yield an all-background map.
///
/// This is the first processing stage, between decoding and seed
/// placement.
#[must_use = "returns the binary edge map"]
pub fn detect_edges(source: &RgbImage, threshold: i32) -> EdgeMap {
    let (width, height) = source.dimensions();
    let mut edges = EdgeMap::new(width, height);

    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let magnitude = interior_magnitude(source, x, y);
            let class = if i64::from(magnitude) < i64::from(threshold) {
                EdgeClass::Background
            } else {
                EdgeClass::Edge
            };
            edges.set(x, y, class);
        }
    }

    log::debug!(
        "threshold {threshold} marked {} of {} pixels as edges",
        edges.edge_pixel_count(),
        u64::from(width) * u64::from(height),
    );
    edges
}

/// Gradient magnitude `floor(sqrt(Gx² + Gy²))` at `(x, y)`.
///
/// Returns `None` for border pixels and for coordinates outside the
/// image, since the 3×3 neighborhood would not fit.
#[must_use]
pub fn gradient_magnitude(source: &RgbImage, x: u32, y: u32) -> Option<u32> {
    let (width, height) = source.dimensions();
    let interior = x >= 1 && y >= 1 && x + 1 < width && y + 1 < height;
    interior.then(|| interior_magnitude(source, x, y))
}

/// Gradient magnitude at an interior pixel.
fn interior_magnitude(source: &RgbImage, x: u32, y: u32) -> u32 {
    let mut gx: i32 = 0;
    let mut gy: i32 = 0;

    for (row, (kx_row, ky_row)) in SOBEL_X.iter().zip(&SOBEL_Y).enumerate() {
        for (col, (&kx, &ky)) in kx_row.iter().zip(ky_row).enumerate() {
            // row, col < 3 and (x, y) is interior, so this stays in bounds.
            #[allow(clippy::cast_possible_truncation)]
            let pixel = source.get_pixel(x + col as u32 - 1, y + row as u32 - 1);
            let sum = channel_sum(pixel);
            gx += kx * sum;
            gy += ky * sum;
        }
    }

    (gx * gx + gy * gy).unsigned_abs().isqrt()
}

/// Sum of the raw red, green and blue values.
fn channel_sum(pixel: &image::Rgb<u8>) -> i32 {
    pixel.0.iter().map(|&c| i32::from(c)).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// 10x10 image with a sharp vertical black/white boundary at x = 5.
    fn sharp_edge_image() -> RgbImage {
        RgbImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        })
    }

    fn border_cells(edges: &EdgeMap) -> Vec<EdgeClass> {
        let (w, h) = (edges.width(), edges.height());
        let mut cells = Vec::new();
        for y in 0..h {
            for x in 0..w {
                if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
                    cells.push(edges.get(x, y).unwrap());
                }
            }
        }
        cells
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = RgbImage::new(17, 31);
        let edges = detect_edges(&img, 100);
        assert_eq!(edges.width(), 17);
        assert_eq!(edges.height(), 31);
    }

    #[test]
    fn uniform_image_has_no_interior_edges() {
        let img = RgbImage::from_pixel(12, 9, image::Rgb([90, 140, 200]));
        for threshold in [1, 50, 4000] {
            let edges = detect_edges(&img, threshold);
            assert_eq!(edges.edge_pixel_count(), 0, "threshold {threshold}");
        }
    }

    #[test]
    fn sharp_boundary_is_detected_on_both_sides() {
        let edges = detect_edges(&sharp_edge_image(), 1000);
        for y in 1..9 {
            assert_eq!(edges.get(4, y), Some(EdgeClass::Edge));
            assert_eq!(edges.get(5, y), Some(EdgeClass::Edge));
            assert_eq!(edges.get(2, y), Some(EdgeClass::Background));
            assert_eq!(edges.get(7, y), Some(EdgeClass::Background));
        }
    }

    #[test]
    fn border_ring_stays_background() {
        // A zero threshold marks every visited pixel as an edge, so any
        // edge on the ring would mean the ring was visited.
        let edges = detect_edges(&sharp_edge_image(), 0);
        assert!(
            border_cells(&edges)
                .iter()
                .all(|&c| c == EdgeClass::Background)
        );
        assert_eq!(edges.edge_pixel_count(), 8 * 8);
    }

    #[test]
    fn non_positive_threshold_marks_interior_as_edges() {
        let img = RgbImage::from_pixel(5, 5, image::Rgb([10, 10, 10]));
        let edges = detect_edges(&img, -7);
        assert_eq!(edges.edge_pixel_count(), 3 * 3);
    }

    #[test]
    fn threshold_above_bound_yields_all_background() {
        let checker = RgbImage::from_fn(8, 8, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        let edges = detect_edges(&checker, GRADIENT_MAGNITUDE_BOUND + 1);
        assert_eq!(edges.edge_pixel_count(), 0);
    }

    #[test]
    fn tiny_images_have_no_interior() {
        for (w, h) in [(0, 0), (1, 1), (2, 5), (5, 2), (2, 2)] {
            let img = RgbImage::from_fn(w, h, |x, _| {
                if x % 2 == 0 {
                    image::Rgb([0, 0, 0])
                } else {
                    image::Rgb([0, 0, 255])
                }
            });
            let edges = detect_edges(&img, 0);
            assert_eq!(edges.dimensions().width, w);
            assert_eq!(edges.dimensions().height, h);
            assert_eq!(edges.edge_pixel_count(), 0, "{w}x{h}");
        }
    }

    #[test]
    fn three_by_three_has_exactly_one_interior_pixel() {
        let img = RgbImage::from_pixel(3, 3, image::Rgb([1, 2, 3]));
        let edges = detect_edges(&img, 0);
        assert_eq!(edges.edge_pixel_count(), 1);
        assert_eq!(edges.get(1, 1), Some(EdgeClass::Edge));
    }

    #[test]
    fn magnitude_of_vertical_step_uses_channel_sum() {
        // Left column black, middle and right columns white: only the
        // right kernel column contributes, Gx = (1 + 2 + 1) * 765.
        let img = RgbImage::from_fn(3, 3, |x, _| {
            if x == 0 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        assert_eq!(gradient_magnitude(&img, 1, 1), Some(4 * 765));
    }

    #[test]
    fn magnitude_is_floor_of_square_root() {
        // Single red pixel at the top-left corner of the neighborhood:
        // Gx = -1 * 255, Gy = +1 * 255, G = floor(255 * sqrt(2)) = 360.
        let mut img = RgbImage::new(3, 3);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        assert_eq!(gradient_magnitude(&img, 1, 1), Some(360));

        // Threshold 360 keeps it an edge; 361 drops it to background.
        assert_eq!(detect_edges(&img, 360).get(1, 1), Some(EdgeClass::Edge));
        assert_eq!(
            detect_edges(&img, 361).get(1, 1),
            Some(EdgeClass::Background)
        );
    }

    #[test]
    fn magnitude_is_none_on_border() {
        let img = RgbImage::new(4, 4);
        assert_eq!(gradient_magnitude(&img, 0, 1), None);
        assert_eq!(gradient_magnitude(&img, 3, 1), None);
        assert_eq!(gradient_magnitude(&img, 1, 3), None);
        assert_eq!(gradient_magnitude(&img, 9, 9), None);
        assert_eq!(gradient_magnitude(&img, 2, 2), Some(0));
    }

    #[test]
    fn detection_is_deterministic() {
        let img = sharp_edge_image();
        assert_eq!(detect_edges(&img, 500), detect_edges(&img, 500));
    }
}
