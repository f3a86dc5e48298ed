//! Image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the 8-bit
//! RGB source image the rest of the pipeline works on. Alpha is dropped;
//! no color-space conversion is applied.

use crate::types::{PipelineError, RgbImage};

/// Decode raw image bytes into an RGB image.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let image = image::load_from_memory(bytes)?;
    log::debug!(
        "decoded {} bytes as {}x{} {:?}",
        bytes.len(),
        image.width(),
        image.height(),
        image.color(),
    );
    Ok(image.to_rgb8())
}
