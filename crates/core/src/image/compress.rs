//! Lossy JPEG recompression of uploads.

use std::io::Cursor;

use ::image::codecs::jpeg::JpegEncoder;

use super::error::ImageError;

/// JPEG quality applied to every upload.
pub const JPEG_QUALITY: u8 = 60;

/// Decodes any supported raster format and re-encodes it as JPEG.
///
/// Alpha is dropped. CPU bound; call from a blocking task.
///
/// # Errors
///
/// Returns `ImageError::Compression` when decoding or encoding fails.
pub fn recompress_jpeg(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    let decoded = ::image::load_from_memory(data)
        .map_err(|e| ImageError::compression(format!("decode: {e}")))?;
    let rgb = decoded.to_rgb8();

    let mut out = Cursor::new(Vec::with_capacity(data.len() / 2));
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| ImageError::compression(format!("encode: {e}")))?;
    Ok(out.into_inner())
}
