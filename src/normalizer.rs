//! JPEG normalization of downloaded image payloads
//!
//! Every stored asset is JPEG. Payloads declared as JPEG are stored byte-for-byte;
//! anything else is decoded and re-encoded. A payload without a `Content-Type`
//! header is passed through unchanged, since there is nothing to decide on.

use crate::error::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

/// Whether a `Content-Type` value denotes JPEG (parameters and case are ignored)
pub fn is_jpeg(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "image/jpeg" || essence == "image/jpg"
}

/// Whether a payload with this declared type needs re-encoding
pub fn needs_conversion(content_type: Option<&str>) -> bool {
    matches!(content_type, Some(ct) if !is_jpeg(ct))
}

/// Re-encode an arbitrary image payload as JPEG
///
/// Uses the `image` crate's baseline encoder at `quality` (1-100, configured as
/// `sync.jpeg_quality`, default 80). This is not mozjpeg: output at the same
/// quality setting is typically larger than a mozjpeg encode and its bytes differ,
/// so sizes are not comparable across encoders.
///
/// CPU-bound; call from a blocking context.
pub fn encode_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes)?;

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut out = Vec::with_capacity(bytes.len());
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(out)
}

/// Normalize a payload to JPEG, offloading any conversion to the blocking pool
pub async fn normalize(content_type: Option<&str>, bytes: Vec<u8>, quality: u8) -> Result<Vec<u8>> {
    if !needs_conversion(content_type) {
        return Ok(bytes);
    }

    tracing::debug!(
        content_type = content_type.unwrap_or_default(),
        size = bytes.len(),
        "re-encoding image as JPEG"
    );

    tokio::task::spawn_blocking(move || encode_jpeg(&bytes, quality))
        .await
        .map_err(|e| Error::Other(format!("image conversion task panicked: {}", e)))?
}
