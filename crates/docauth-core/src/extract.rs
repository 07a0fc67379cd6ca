//! Document extraction: one structured record per PDF.
//!
//! Pages are processed in order and images within a page in enumeration
//! order, so `images` is always page-major. Per-image failures (undecodable
//! raster, missing placement) are recorded as values on the image and never
//! abort the run; only a PDF that cannot be opened at all is fatal.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::barcode::{default_decoder, BarcodeDecoder, Symbol};
use crate::error::{DocAuthError, Result};
use crate::hash::{sha256_hex, SHORT_HASH_LEN};
use crate::models::record::page_label;
use crate::models::{Dimensions, DocumentRecord, ExtractOptions, ImageRecord, Position};
use crate::pdf::{LopdfSource, PdfSource, RawImage};
use crate::raster::{dimensions, ImageRasterDecoder, RasterDecoder};

/// Builds a [`DocumentRecord`] from a PDF.
pub struct DocumentExtractor {
    raster: Box<dyn RasterDecoder>,
    barcodes: Box<dyn BarcodeDecoder>,
    options: ExtractOptions,
}

impl DocumentExtractor {
    /// Create an extractor with the default raster and barcode decoders.
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            raster: Box::new(ImageRasterDecoder),
            barcodes: default_decoder(),
            options,
        }
    }

    /// Replace the raster decoder.
    pub fn with_raster_decoder(mut self, decoder: impl RasterDecoder + 'static) -> Self {
        self.raster = Box::new(decoder);
        self
    }

    /// Replace the barcode decoder.
    pub fn with_barcode_decoder(mut self, decoder: impl BarcodeDecoder + 'static) -> Self {
        self.barcodes = Box::new(decoder);
        self
    }

    /// Extract a record from a PDF file.
    pub fn extract(&self, pdf_path: &Path) -> Result<DocumentRecord> {
        self.extract_with_progress(pdf_path, |_, _| {})
    }

    /// Like [`extract`](Self::extract), calling `on_page(page, total)` after each page.
    pub fn extract_with_progress(
        &self,
        pdf_path: &Path,
        on_page: impl FnMut(u32, u32),
    ) -> Result<DocumentRecord> {
        if !pdf_path.exists() {
            return Err(DocAuthError::InputNotFound(pdf_path.to_path_buf()));
        }

        let source = LopdfSource::open(pdf_path)?;
        let filename = pdf_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.extract_source(&source, filename, pdf_path.to_string_lossy(), on_page)
    }

    /// Extract a record from an already opened source.
    pub fn extract_source(
        &self,
        source: &dyn PdfSource,
        filename: impl Into<String>,
        full_path: impl Into<String>,
        mut on_page: impl FnMut(u32, u32),
    ) -> Result<DocumentRecord> {
        if let Some(dir) = &self.options.image_dir {
            fs::create_dir_all(dir)?;
        }

        let mut record = DocumentRecord::new(filename, full_path);
        record.metadata = source.metadata();

        let page_count = source.page_count();
        info!("Processing {} pages", page_count);

        for page in 1..=page_count {
            let text = source.page_text(page).unwrap_or_else(|e| {
                warn!("No text for page {}: {}", page, e);
                String::new()
            });
            record.set_page_text(page, text);

            let images = source.page_images(page).unwrap_or_else(|e| {
                warn!("No images for page {}: {}", page, e);
                Vec::new()
            });

            for (index, raw) in images.iter().enumerate() {
                let image = self.process_image(source, page, index as u32 + 1, raw)?;
                record.push_image(image);
            }

            on_page(page, page_count);
        }

        debug!(
            "Extracted {} pages, {} images from {}",
            record.text_by_page.len(),
            record.image_count,
            record.filename
        );
        Ok(record)
    }

    fn process_image(
        &self,
        source: &dyn PdfSource,
        page: u32,
        index: u32,
        raw: &RawImage,
    ) -> Result<ImageRecord> {
        let hash = sha256_hex(&raw.data);
        let (dimensions, qr_data) = self.inspect_raster(page, index, &raw.data);

        let name = image_file_name(page, index, &hash, &raw.ext);
        if let Some(dir) = &self.options.image_dir {
            fs::write(dir.join(&name), &raw.data)?;
        }

        let position = match source.image_bbox(page, raw) {
            Ok(bbox) => Position::Known(bbox),
            Err(e) => {
                debug!("Position unavailable for {}: {}", name, e);
                Position::Unavailable
            }
        };

        Ok(ImageRecord {
            name,
            page,
            hash_sha256: hash,
            is_qr: qr_data.is_some(),
            qr_data,
            position,
            size_bytes: raw.data.len(),
            dimensions,
            internal_metadata: raw.info.clone(),
        })
    }

    /// Decoded size and the payload of the first QR symbol, if any.
    fn inspect_raster(&self, page: u32, index: u32, data: &[u8]) -> (Dimensions, Option<String>) {
        let decoded = match self.raster.decode(data) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!("Image {} on page {} not decodable: {}", index, page, e);
                return (Dimensions::ZERO, None);
            }
        };

        let size = dimensions(&decoded);
        if !self.options.decode_barcodes {
            return (size, None);
        }

        let qr_data = self
            .barcodes
            .decode(&decoded)
            .into_iter()
            .find(Symbol::is_qr)
            .map(|symbol| symbol.text());
        if qr_data.is_some() {
            info!("QR code found on page {}", page);
        }
        (size, qr_data)
    }
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new(ExtractOptions::default())
    }
}

/// Side-file name for an image: `pagina_<page>_img_<index>_<hash8>.<ext>`.
pub fn image_file_name(page: u32, index: u32, hash: &str, ext: &str) -> String {
    let short = &hash[..hash.len().min(SHORT_HASH_LEN)];
    format!("{}_img_{}_{}.{}", page_label(page), index, short, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::{Symbol, Symbology};
    use crate::error::PdfError;
    use crate::models::{BoundingBox, Metadata};
    use crate::pdf;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    struct FakePage {
        text: Option<&'static str>,
        images: Vec<RawImage>,
    }

    struct FakeSource {
        pages: Vec<FakePage>,
    }

    impl PdfSource for FakeSource {
        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn page_text(&self, page: u32) -> pdf::Result<String> {
            self.pages[page as usize - 1]
                .text
                .map(str::to_string)
                .ok_or_else(|| PdfError::TextExtraction("no text layer".into()))
        }

        fn page_images(&self, page: u32) -> pdf::Result<Vec<RawImage>> {
            Ok(self.pages[page as usize - 1].images.clone())
        }

        fn image_bbox(&self, _page: u32, image: &RawImage) -> pdf::Result<BoundingBox> {
            if image.name == "Hidden" {
                Err(PdfError::Layout("not drawn".into()))
            } else {
                Ok(BoundingBox::default())
            }
        }

        fn metadata(&self) -> Metadata {
            let mut metadata = Metadata::new();
            metadata.insert("title".into(), "Fake".into());
            metadata
        }
    }

    struct FixedSymbols(Vec<Symbol>);

    impl BarcodeDecoder for FixedSymbols {
        fn decode(&self, _image: &DynamicImage) -> Vec<Symbol> {
            self.0.clone()
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut data = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();
        data
    }

    fn raw(name: &str, data: Vec<u8>, ext: &str) -> RawImage {
        RawImage {
            name: name.to_string(),
            xref: 0,
            data,
            ext: ext.to_string(),
            info: Metadata::new(),
        }
    }

    fn two_page_source() -> FakeSource {
        FakeSource {
            pages: vec![
                FakePage {
                    text: Some("Page one"),
                    images: vec![raw("Im0", png(4, 3), "png"), raw("Hidden", b"junk".to_vec(), "bin")],
                },
                FakePage {
                    text: None,
                    images: vec![raw("Im1", png(8, 8), "png")],
                },
            ],
        }
    }

    #[test]
    fn test_record_order_and_counts() {
        let extractor = DocumentExtractor::default().with_barcode_decoder(FixedSymbols(vec![]));
        let record = extractor
            .extract_source(&two_page_source(), "doc.pdf", "/in/doc.pdf", |_, _| {})
            .unwrap();

        assert_eq!(record.filename, "doc.pdf");
        assert_eq!(record.metadata["title"], "Fake");
        assert_eq!(record.page_text(1), Some("Page one"));
        // failed text extraction keeps the page label
        assert_eq!(record.page_text(2), Some(""));
        assert_eq!(record.image_count, 3);

        let pages: Vec<u32> = record.images.iter().map(|i| i.page).collect();
        assert_eq!(pages, vec![1, 1, 2]);
        assert_eq!(record.images[0].name, format!("pagina_1_img_1_{}.png", &record.images[0].hash_sha256[..8]));
        assert_eq!(record.images[2].name, format!("pagina_2_img_1_{}.png", &record.images[2].hash_sha256[..8]));
    }

    #[test]
    fn test_per_image_failures_become_values() {
        let extractor = DocumentExtractor::default().with_barcode_decoder(FixedSymbols(vec![]));
        let record = extractor
            .extract_source(&two_page_source(), "doc.pdf", "doc.pdf", |_, _| {})
            .unwrap();

        let good = &record.images[0];
        assert_eq!(good.dimensions, Dimensions::new(4, 3));
        assert_eq!(good.position, Position::Known(BoundingBox::default()));

        let junk = &record.images[1];
        assert_eq!(junk.dimensions, Dimensions::ZERO);
        assert_eq!(junk.position, Position::Unavailable);
        assert_eq!(junk.hash_sha256, sha256_hex(b"junk"));
        assert_eq!(junk.size_bytes, 4);
    }

    #[test]
    fn test_first_qr_symbol_wins() {
        let extractor = DocumentExtractor::default().with_barcode_decoder(FixedSymbols(vec![
            Symbol {
                symbology: Symbology::Other,
                payload: b"4006381333931".to_vec(),
            },
            Symbol::qr("https://verify.example/acme/998877"),
            Symbol::qr("https://verify.example/other/1"),
        ]));
        let record = extractor
            .extract_source(&two_page_source(), "doc.pdf", "doc.pdf", |_, _| {})
            .unwrap();

        let first = &record.images[0];
        assert!(first.is_qr);
        assert_eq!(first.qr_data.as_deref(), Some("https://verify.example/acme/998877"));

        // undecodable rasters never reach the barcode decoder
        assert!(!record.images[1].is_qr);
        assert_eq!(record.images[1].qr_data, None);
    }

    #[test]
    fn test_barcodes_can_be_disabled() {
        let extractor = DocumentExtractor::new(ExtractOptions::new().with_barcodes(false))
            .with_barcode_decoder(FixedSymbols(vec![Symbol::qr("a/b")]));
        let record = extractor
            .extract_source(&two_page_source(), "doc.pdf", "doc.pdf", |_, _| {})
            .unwrap();
        assert!(record.images.iter().all(|i| !i.is_qr));
    }

    #[test]
    fn test_side_files_written() {
        let dir = tempfile::tempdir().unwrap();
        let image_dir = dir.path().join("doc_imagenes");
        let extractor = DocumentExtractor::new(ExtractOptions::new().with_image_dir(&image_dir))
            .with_barcode_decoder(FixedSymbols(vec![]));

        let mut progress = Vec::new();
        let record = extractor
            .extract_source(&two_page_source(), "doc.pdf", "doc.pdf", |page, total| {
                progress.push((page, total))
            })
            .unwrap();

        assert_eq!(progress, vec![(1, 2), (2, 2)]);
        for image in &record.images {
            let written = fs::read(image_dir.join(&image.name)).unwrap();
            assert_eq!(sha256_hex(&written), image.hash_sha256);
        }
    }

    #[test]
    fn test_missing_pdf() {
        let result = DocumentExtractor::default().extract(Path::new("/nonexistent/doc.pdf"));
        assert!(matches!(result, Err(DocAuthError::InputNotFound(_))));
    }

    #[test]
    fn test_unparseable_pdf_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4 this is not really a pdf").unwrap();

        let result = DocumentExtractor::default().extract(&path);
        assert!(matches!(result, Err(DocAuthError::Pdf(_))));
    }

    #[test]
    fn test_image_file_name() {
        assert_eq!(
            image_file_name(3, 2, "abcdef0123456789", "jpeg"),
            "pagina_3_img_2_abcdef01.jpeg"
        );
        assert_eq!(image_file_name(1, 1, "abc", "png"), "pagina_1_img_1_abc.png");
    }
}
