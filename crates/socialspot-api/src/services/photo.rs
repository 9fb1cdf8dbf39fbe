// Profile photo normalization: sniff, validate, scale to fit, re-encode as JPEG

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use socialspot_core::profile::{validate_photo, PHOTO_JPEG_QUALITY, PHOTO_MAX_DIMENSION};

use crate::common::ApiError;

/// Turn an uploaded photo into the JPEG stored as the profile picture.
///
/// The type is sniffed from the bytes; the client's declared type is ignored.
pub fn prepare_profile_photo(bytes: &[u8]) -> Result<Vec<u8>, ApiError> {
    let mime = infer::get(bytes).map(|kind| kind.mime_type());
    validate_photo(mime, bytes.len())?;

    let image = image::load_from_memory(bytes)
        .map_err(|_| ApiError::bad_request("Please upload a valid image file"))?;
    let scaled = image
        .resize(PHOTO_MAX_DIMENSION, PHOTO_MAX_DIMENSION, FilterType::Triangle)
        .to_rgb8();

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, PHOTO_JPEG_QUALITY)
        .encode_image(&scaled)
        .map_err(|e| ApiError::internal("Failed to process image", e))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([200, 120, 40, 255]),
        ));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_large_photo_is_scaled_to_fit() {
        let jpeg = prepare_profile_photo(&png(1600, 1000)).unwrap();

        assert_eq!(infer::get(&jpeg).unwrap().mime_type(), "image/jpeg");
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 500));
    }

    #[test]
    fn test_small_photo_is_scaled_up() {
        let jpeg = prepare_profile_photo(&png(200, 400)).unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (400, 800));
    }

    #[test]
    fn test_non_image_is_rejected() {
        let err = prepare_profile_photo(b"%PDF-1.7 definitely not a photo").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
