use image::DynamicImage;

use crate::error::RestageError;

/// Decode uploaded bytes into an owned raster.
///
/// Dimensions are final as soon as this returns; detection and extraction
/// both rely on them.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, RestageError> {
    let raster =
        image::load_from_memory(bytes).map_err(|e| RestageError::Decode(e.to_string()))?;
    if raster.width() == 0 || raster.height() == 0 {
        return Err(RestageError::Decode("image has zero dimensions".to_string()));
    }
    Ok(raster)
}
