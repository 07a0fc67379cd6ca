//! Raster decoding of extracted image bytes.

use image::DynamicImage;

use crate::error::Result;
use crate::models::Dimensions;

/// Decodes raw image bytes into pixels.
pub trait RasterDecoder {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage>;
}

/// [`RasterDecoder`] built on the `image` crate, format guessed from content.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageRasterDecoder;

impl RasterDecoder for ImageRasterDecoder {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage> {
        Ok(image::load_from_memory(data)?)
    }
}

pub fn dimensions(image: &DynamicImage) -> Dimensions {
    Dimensions::new(image.width(), image.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    #[test]
    fn test_decode_png() {
        let mut data = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(7, 3))
            .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();

        let decoded = ImageRasterDecoder.decode(&data).unwrap();
        assert_eq!(dimensions(&decoded), Dimensions::new(7, 3));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(ImageRasterDecoder.decode(b"\x00\x01garbage").is_err());
    }
}
