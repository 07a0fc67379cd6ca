//! Barcode detection on decoded rasters.

use image::DynamicImage;
#[cfg(feature = "qr")]
use tracing::debug;

/// Barcode symbology of a detected symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbology {
    Qr,
    Other,
}

/// A decoded barcode symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub symbology: Symbology,
    pub payload: Vec<u8>,
}

impl Symbol {
    pub fn qr(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            symbology: Symbology::Qr,
            payload: payload.into(),
        }
    }

    pub fn is_qr(&self) -> bool {
        self.symbology == Symbology::Qr
    }

    /// Payload as UTF-8; invalid sequences become U+FFFD.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Detects and decodes barcode symbols in an image.
pub trait BarcodeDecoder {
    /// All symbols found, in detection order.
    fn decode(&self, image: &DynamicImage) -> Vec<Symbol>;
}

/// QR decoder backed by `rqrr`.
#[cfg(feature = "qr")]
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

#[cfg(feature = "qr")]
impl BarcodeDecoder for QrDecoder {
    fn decode(&self, image: &DynamicImage) -> Vec<Symbol> {
        let luma = image.to_luma8();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            luma.width() as usize,
            luma.height() as usize,
            |x, y| luma.get_pixel(x as u32, y as u32).0[0],
        );

        prepared
            .detect_grids()
            .into_iter()
            .filter_map(|grid| match grid.decode() {
                Ok((_, content)) => Some(Symbol::qr(content)),
                Err(e) => {
                    debug!("QR grid found but not decodable: {:?}", e);
                    None
                }
            })
            .collect()
    }
}

/// Decoder that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBarcodes;

impl BarcodeDecoder for NoBarcodes {
    fn decode(&self, _image: &DynamicImage) -> Vec<Symbol> {
        Vec::new()
    }
}

/// The best decoder compiled into this build.
pub fn default_decoder() -> Box<dyn BarcodeDecoder> {
    #[cfg(feature = "qr")]
    {
        Box::new(QrDecoder)
    }
    #[cfg(not(feature = "qr"))]
    {
        Box::new(NoBarcodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    #[test]
    fn test_symbol_text_lossy() {
        let symbol = Symbol::qr(vec![b'o', b'k', 0xFF]);
        assert!(symbol.is_qr());
        assert_eq!(symbol.text(), "ok\u{FFFD}");
    }

    #[cfg(feature = "qr")]
    #[test]
    fn test_qr_decoder_reads_rendered_symbol() {
        let payload = "https://verify.example/acme/998877";
        let rendered = qrcode::QrCode::new(payload.as_bytes())
            .unwrap()
            .render::<image::Luma<u8>>()
            .build();

        let symbols = QrDecoder.decode(&DynamicImage::ImageLuma8(rendered));
        assert_eq!(symbols, vec![Symbol::qr(payload)]);
        assert_eq!(symbols[0].text(), payload);
    }

    #[test]
    fn test_blank_image_has_no_symbols() {
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, image::Luma([255])));
        assert!(default_decoder().decode(&blank).is_empty());
        assert!(NoBarcodes.decode(&blank).is_empty());
    }
}
