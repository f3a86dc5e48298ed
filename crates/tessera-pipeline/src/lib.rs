//! tessera-pipeline: edge-aware flat-color mosaic stylization (sans-IO).
//!
//! Converts a raster image into a mosaic of flat color cells through:
//! decode -> Sobel edge detection -> quadtree seed placement ->
//! nearest-seed color transfer.
//!
//! Seeds cluster densely along edges (where quadtree cells must shrink to
//! become homogeneous) and sparsely across flat regions, so the output
//! keeps object outlines while flattening texture.
//!
//! This crate has **no I/O dependencies**. It operates on in-memory byte
//! slices and images; the `tessera` binary owns all filesystem access.

pub mod decode;
pub mod diagnostics;
pub mod edge;
pub mod pipeline;
pub mod seeds;
pub mod stylize;
pub mod types;

pub use decode::decode;
pub use pipeline::Pipeline;
pub use stylize::{NearestSeedKind, Stylizer};
pub use types::{
    Dimensions, EdgeClass, EdgeMap, MosaicConfig, PipelineError, Point, ProcessResult, RgbImage,
    SeedList, StagedResult,
};

/// Run the full pipeline on encoded image bytes.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a configuration, and
/// produces the stylized mosaic together with the number of seeds used
/// and the source dimensions.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
/// Returns [`PipelineError::NoSeeds`] if `config.seed_budget` is zero.
pub fn process(image_bytes: &[u8], config: &MosaicConfig) -> Result<ProcessResult, PipelineError> {
    let source = decode::decode(image_bytes)?;
    process_image(&source, config)
}

/// Run the pipeline on an already decoded image.
///
/// # Pipeline steps
///
/// 1. Sobel edge detection against `config.edge_threshold`
/// 2. Quadtree seed placement, at most `config.seed_budget` seeds
/// 3. Nearest-seed stylization using `config.nearest_seed`
///
/// # Errors
///
/// Returns [`PipelineError::NoSeeds`] if `config.seed_budget` is zero.
pub fn process_image(
    source: &RgbImage,
    config: &MosaicConfig,
) -> Result<ProcessResult, PipelineError> {
    let dimensions = Dimensions::of(source);

    // 1. Edge detection.
    let edges = edge::detect_edges(source, config.edge_threshold);

    // 2. Seed placement.
    let seeds = seeds::place_seeds(&edges, config.seed_budget);

    // 3. Stylization.
    let stylized = config.nearest_seed.stylize(source, &seeds)?;

    Ok(ProcessResult {
        stylized,
        seed_count: seeds.len(),
        dimensions,
    })
}

/// Run the full pipeline, preserving every intermediate.
///
/// Equivalent to driving [`Pipeline`] through all of its stages.
///
/// # Errors
///
/// Returns the same errors as [`process`].
pub fn process_staged(
    image_bytes: &[u8],
    config: &MosaicConfig,
) -> Result<StagedResult, PipelineError> {
    Ok(Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .detect_edges()
        .place_seeds()
        .stylize()?
        .into_result())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// PNG with a sharp vertical black/white boundary at `width / 2`.
    fn sharp_edge_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, _y| {
            if x < width / 2 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &MosaicConfig::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(&[0xFF, 0x00], &MosaicConfig::default());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn process_zero_budget_returns_no_seeds() {
        let config = MosaicConfig {
            seed_budget: 0,
            ..MosaicConfig::default()
        };
        let result = process(&sharp_edge_png(20, 20), &config);
        assert!(matches!(result, Err(PipelineError::NoSeeds)));
    }

    #[test]
    fn process_sharp_edge_keeps_both_colors() {
        let result = process(&sharp_edge_png(40, 40), &MosaicConfig::default()).unwrap();
        assert_eq!(
            result.dimensions,
            Dimensions {
                width: 40,
                height: 40
            }
        );
        assert!(result.seed_count > 1);

        let black = image::Rgb([0, 0, 0]);
        let white = image::Rgb([255, 255, 255]);
        assert!(result.stylized.pixels().all(|p| *p == black || *p == white));
        assert_eq!(*result.stylized.get_pixel(2, 20), black);
        assert_eq!(*result.stylized.get_pixel(37, 20), white);
    }

    #[test]
    fn process_uniform_image_is_one_flat_color() {
        let img = RgbImage::from_pixel(16, 16, image::Rgb([12, 80, 200]));
        let result = process_image(&img, &MosaicConfig::default()).unwrap();
        assert_eq!(result.seed_count, 1);
        assert_eq!(result.stylized, img);
    }

    #[test]
    fn process_image_agrees_with_process() {
        let png = sharp_edge_png(30, 22);
        let config = MosaicConfig {
            edge_threshold: 300,
            seed_budget: 40,
            ..MosaicConfig::default()
        };
        let from_bytes = process(&png, &config).unwrap();
        let from_image = process_image(&decode(&png).unwrap(), &config).unwrap();
        assert_eq!(from_bytes.stylized, from_image.stylized);
        assert_eq!(from_bytes.seed_count, from_image.seed_count);
    }

    #[test]
    fn process_staged_keeps_intermediates() {
        let png = sharp_edge_png(30, 22);
        let config = MosaicConfig::default();
        let staged = process_staged(&png, &config).unwrap();
        let plain = process(&png, &config).unwrap();

        assert_eq!(staged.source.dimensions(), (30, 22));
        assert_eq!(staged.edges.dimensions(), staged.dimensions);
        assert_eq!(staged.seeds.len(), plain.seed_count);
        assert_eq!(staged.stylized, plain.stylized);
    }
}
