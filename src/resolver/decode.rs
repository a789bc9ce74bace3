//! Image validation by decoding with the `image` crate.

pub use image::ImageFormat;

/// Decode `bytes` and return their container format.
///
/// Only formats compiled into the `image` dependency decode; anything else,
/// including a bare signature with no image data behind it, is an error.
pub fn decode_image_format(bytes: &[u8]) -> Result<ImageFormat, image::ImageError> {
    let format = image::guess_format(bytes)?;
    image::load_from_memory_with_format(bytes, format)?;
    Ok(format)
}
