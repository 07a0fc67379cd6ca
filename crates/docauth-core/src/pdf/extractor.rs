//! PDF text and image extraction using lopdf and pdf-extract.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde_json::{json, Value};
use tracing::{debug, trace, warn};

use super::layout::{find_placement, number, to_page_box, Matrix};
use super::samples::{encode_png, ColorSpace, SampleLayout};
use super::{PdfSource, RawImage, Result};
use crate::error::PdfError;
use crate::models::{BoundingBox, Metadata};

/// US Letter, used when a page tree carries no MediaBox at all.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Form XObjects nested deeper than this are not entered.
const MAX_FORM_DEPTH: usize = 8;

/// [`PdfSource`] backed by a lopdf document.
pub struct LopdfSource {
    document: Document,
    page_ids: Vec<ObjectId>,
    /// Per-page text from pdf-extract, when it could process the file.
    page_texts: Option<Vec<String>>,
    /// Security handler name, captured before decryption.
    encryption: Option<String>,
}

impl LopdfSource {
    /// Open and parse a PDF file.
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| PdfError::Open(e.to_string()))?;
        Self::load(&data)
    }

    /// Parse a PDF from bytes.
    pub fn load(data: &[u8]) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Open(e.to_string()))?;

        let encryption = encryption_filter(&document);

        // Handle PDFs with empty password encryption
        let raw_data = if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract needs the decrypted bytes
            let mut decrypted = Vec::new();
            document
                .save_to(&mut decrypted)
                .map_err(|e| PdfError::Open(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(PdfError::NoPages);
        }

        // pdf-extract panics on some malformed fonts instead of returning an error
        let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&raw_data)
        }));
        let page_texts = match extracted {
            Ok(Ok(texts)) if texts.len() == page_ids.len() => Some(texts),
            Ok(Ok(texts)) => {
                warn!(
                    "pdf-extract returned {} pages for a {} page document, using lopdf text",
                    texts.len(),
                    page_ids.len()
                );
                None
            }
            Ok(Err(e)) => {
                warn!("pdf-extract failed ({}), using lopdf text", e);
                None
            }
            Err(_) => {
                warn!("pdf-extract panicked, using lopdf text");
                None
            }
        };

        debug!("Loaded PDF with {} pages", page_ids.len());
        Ok(Self {
            document,
            page_ids,
            page_texts,
            encryption,
        })
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        page.checked_sub(1)
            .and_then(|index| self.page_ids.get(index as usize))
            .copied()
            .ok_or(PdfError::InvalidPage(page))
    }

    fn media_box(&self, page_id: ObjectId) -> [f64; 4] {
        let parsed = inherited(&self.document, page_id, b"MediaBox")
            .and_then(|obj| self.document.dereference(obj).ok())
            .and_then(|(_, obj)| obj.as_array().ok())
            .filter(|arr| arr.len() == 4)
            .and_then(|arr| {
                let mut values = [0.0; 4];
                for (slot, obj) in values.iter_mut().zip(arr) {
                    *slot = number(obj)?;
                }
                Some(values)
            });
        parsed.unwrap_or(DEFAULT_MEDIA_BOX)
    }

    /// Page resources, with inheritance support.
    fn page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        inherited(&self.document, page_id, b"Resources")
            .and_then(|obj| self.document.dereference(obj).ok())
            .and_then(|(_, obj)| obj.as_dict().ok())
    }

    /// The /XObject dictionary of a resource dictionary, if it has one.
    fn xobjects<'a>(&'a self, resources: &'a Dictionary) -> Result<Option<&'a Dictionary>> {
        let Ok(xobjects) = resources.get(b"XObject") else {
            return Ok(None);
        };
        self.document
            .dereference(xobjects)
            .and_then(|(_, obj)| obj.as_dict())
            .map(Some)
            .map_err(|e| PdfError::ImageExtraction(format!("bad XObject dictionary: {}", e)))
    }

    fn form_resources<'a>(&'a self, form: &'a Stream) -> Option<&'a Dictionary> {
        let resources = form.dict.get(b"Resources").ok()?;
        self.document.dereference(resources).ok()?.1.as_dict().ok()
    }

    /// Append the images reachable from `resources`, entering Form XObjects
    /// in place. Each object is listed once, at its first occurrence.
    fn collect_images(
        &self,
        resources: &Dictionary,
        depth: usize,
        seen: &mut HashSet<ObjectId>,
        images: &mut Vec<RawImage>,
    ) -> Result<()> {
        let Some(xobjects) = self.xobjects(resources)? else {
            return Ok(());
        };

        for (name, obj_ref) in xobjects.iter() {
            let Ok((id, Object::Stream(stream))) = self.document.dereference(obj_ref) else {
                continue;
            };
            if let Some(id) = id {
                if !seen.insert(id) {
                    trace!("Skipping repeated XObject {:?}", id);
                    continue;
                }
            }

            match subtype(stream) {
                Some(b"Image") => images.push(self.raw_image(name, id, stream)),
                Some(b"Form") if depth < MAX_FORM_DEPTH => {
                    // Forms without their own resources use the enclosing ones
                    let inner = self.form_resources(stream).unwrap_or(resources);
                    if let Err(e) = self.collect_images(inner, depth + 1, seen, images) {
                        warn!("Skipping form {}: {}", String::from_utf8_lossy(name), e);
                    }
                }
                Some(b"Form") => {
                    warn!("Form {} nested too deeply", String::from_utf8_lossy(name));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// CTM at the first drawing of `image`, following Form XObjects.
    fn locate(
        &self,
        content: &Content,
        resources: Option<&Dictionary>,
        base: Matrix,
        image: &RawImage,
        depth: usize,
    ) -> Option<Matrix> {
        find_placement(content, base, |name, ctm| {
            let xobject = resources
                .and_then(|res| self.xobjects(res).ok().flatten())
                .and_then(|xobjects| xobjects.get(name).ok())
                .and_then(|obj| self.document.dereference(obj).ok());

            let Some((id, Object::Stream(stream))) = xobject else {
                return (depth == 0 && name == image.name.as_bytes()).then_some(ctm);
            };

            match subtype(stream) {
                Some(b"Image") => {
                    let same = match id {
                        Some((num, _)) if image.xref != 0 => num == image.xref,
                        _ => name == image.name.as_bytes(),
                    };
                    same.then_some(ctm)
                }
                Some(b"Form") if depth < MAX_FORM_DEPTH => {
                    let form = form_content(stream)?;
                    let matrix = stream
                        .dict
                        .get(b"Matrix")
                        .and_then(|o| o.as_array())
                        .ok()
                        .and_then(|arr| Matrix::from_operands(arr))
                        .unwrap_or(Matrix::IDENTITY);
                    let inner = self.form_resources(stream).or(resources);
                    self.locate(&form, inner, ctm.concat(matrix), image, depth + 1)
                }
                _ => None,
            }
        })
    }

    fn raw_image(&self, name: &[u8], id: Option<ObjectId>, stream: &Stream) -> RawImage {
        let doc = &self.document;
        let dict = &stream.dict;

        let width = dict_u32(doc, dict, b"Width");
        let height = dict_u32(doc, dict, b"Height");
        let filter = filter_name(doc, dict);
        let image_mask = dict
            .get(b"ImageMask")
            .and_then(|o| o.as_bool())
            .unwrap_or(false);

        // Stencil masks are 1-bit gray whatever the dictionary says
        let (bpc, color_space) = if image_mask {
            (1, ColorSpace::Gray)
        } else {
            let color_space = dict
                .get(b"ColorSpace")
                .map(|cs| ColorSpace::parse(doc, cs))
                .unwrap_or_else(|_| ColorSpace::Other(String::new()));
            (dict_u32(doc, dict, b"BitsPerComponent"), color_space)
        };
        let inverted = color_space == ColorSpace::Gray && decode_inverted(dict);
        let smask = dict
            .get(b"SMask")
            .ok()
            .and_then(|o| o.as_reference().ok())
            .map(|(num, _)| num)
            .unwrap_or(0);
        let xref = id.map(|(num, _)| num).unwrap_or(0);

        trace!(
            "Image {}: {}x{}, filter={:?}, colorspace={:?}, bpc={}, mask={}",
            String::from_utf8_lossy(name),
            width,
            height,
            filter,
            color_space,
            bpc,
            image_mask
        );

        let (data, ext) = match filter.as_deref() {
            // JPEG data - the raw stream content is already a complete file
            Some("DCTDecode") => (stream.content.clone(), "jpeg"),
            Some("JPXDecode") => (stream.content.clone(), "jpx"),
            // Fax/JBIG2 - no decoder, keep the encoded bytes
            Some("CCITTFaxDecode") | Some("JBIG2Decode") => (stream.content.clone(), "bin"),
            _ => {
                let samples = match stream.decompressed_content() {
                    Ok(d) => d,
                    Err(_) => stream.content.clone(),
                };
                let layout = SampleLayout {
                    width,
                    height,
                    bits_per_component: bpc,
                    color_space: color_space.clone(),
                    inverted,
                };
                match encode_png(&samples, &layout) {
                    Some(png) => (png, "png"),
                    None => (samples, "bin"),
                }
            }
        };

        let mut info = Metadata::new();
        info.insert("ext".into(), json!(ext));
        info.insert("smask".into(), json!(smask));
        info.insert("width".into(), json!(width));
        info.insert("height".into(), json!(height));
        info.insert("colorspace".into(), json!(color_space.output_components()));
        info.insert("cs-name".into(), json!(color_space.name()));
        info.insert("bpc".into(), json!(bpc));
        info.insert("filter".into(), json!(filter));
        info.insert("xref".into(), json!(xref));
        info.insert("name".into(), json!(String::from_utf8_lossy(name)));

        RawImage {
            name: String::from_utf8_lossy(name).into_owned(),
            xref,
            data,
            ext: ext.to_string(),
            info,
        }
    }
}

impl PdfSource for LopdfSource {
    fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    fn page_text(&self, page: u32) -> Result<String> {
        let page_id = self.page_id(page)?;
        if let Some(text) = self
            .page_texts
            .as_ref()
            .and_then(|texts| texts.get(page as usize - 1))
        {
            return Ok(text.clone());
        }
        trace!("Falling back to lopdf text for page {} ({:?})", page, page_id);
        self.document
            .extract_text(&[page])
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    fn page_images(&self, page: u32) -> Result<Vec<RawImage>> {
        let page_id = self.page_id(page)?;

        let mut images = Vec::new();
        let Some(resources) = self.page_resources(page_id) else {
            debug!("Page {} has no resources", page);
            return Ok(images);
        };

        let mut seen = HashSet::new();
        self.collect_images(resources, 0, &mut seen, &mut images)?;

        debug!("Extracted {} images from page {}", images.len(), page);
        Ok(images)
    }

    fn image_bbox(&self, page: u32, image: &RawImage) -> Result<BoundingBox> {
        let page_id = self.page_id(page)?;
        let bytes = self
            .document
            .get_page_content(page_id)
            .map_err(|e| PdfError::Layout(e.to_string()))?;
        let content = Content::decode(&bytes).map_err(|e| PdfError::Layout(e.to_string()))?;

        let resources = self.page_resources(page_id);
        let ctm = self
            .locate(&content, resources, Matrix::IDENTITY, image, 0)
            .ok_or_else(|| {
                PdfError::Layout(format!("{} is not drawn on page {}", image.name, page))
            })?;

        Ok(to_page_box(ctm.unit_square_bounds(), self.media_box(page_id)))
    }

    fn metadata(&self) -> Metadata {
        let doc = &self.document;
        let info = doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|obj| doc.dereference(obj).ok())
            .and_then(|(_, obj)| obj.as_dict().ok());

        let field = |key: &[u8]| -> Value {
            info.and_then(|dict| dict.get(key).ok())
                .and_then(|obj| text_string(doc, obj))
                .map(Value::String)
                .unwrap_or_else(|| Value::String(String::new()))
        };

        let mut metadata = Metadata::new();
        metadata.insert("format".into(), json!(format!("PDF {}", doc.version)));
        metadata.insert("title".into(), field(b"Title"));
        metadata.insert("author".into(), field(b"Author"));
        metadata.insert("subject".into(), field(b"Subject"));
        metadata.insert("keywords".into(), field(b"Keywords"));
        metadata.insert("creator".into(), field(b"Creator"));
        metadata.insert("producer".into(), field(b"Producer"));
        metadata.insert("creationDate".into(), field(b"CreationDate"));
        metadata.insert("modDate".into(), field(b"ModDate"));
        metadata.insert("trapped".into(), field(b"Trapped"));
        metadata.insert("encryption".into(), json!(self.encryption));
        metadata
    }
}

/// Look up a page attribute, walking up the page tree via /Parent.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    loop {
        let dict = doc.get_object(current).and_then(|o| o.as_dict()).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(|o| o.as_reference()).ok()?;
    }
}

fn subtype(stream: &Stream) -> Option<&[u8]> {
    stream.dict.get(b"Subtype").and_then(|o| o.as_name()).ok()
}

fn form_content(form: &Stream) -> Option<Content> {
    let bytes = form
        .decompressed_content()
        .unwrap_or_else(|_| form.content.clone());
    Content::decode(&bytes).ok()
}

fn dict_u32(doc: &Document, dict: &Dictionary, key: &[u8]) -> u32 {
    dict.get(key)
        .ok()
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

/// `/Decode [1 0]`: sample 0 means white.
fn decode_inverted(dict: &Dictionary) -> bool {
    let Ok(decode) = dict.get(b"Decode").and_then(|o| o.as_array()) else {
        return false;
    };
    match (decode.first().and_then(number), decode.get(1).and_then(number)) {
        (Some(low), Some(high)) => low > high,
        _ => false,
    }
}

/// First filter applied to the stream.
fn filter_name(doc: &Document, dict: &Dictionary) -> Option<String> {
    let filter = doc.dereference(dict.get(b"Filter").ok()?).ok()?.1;
    let name = match filter {
        Object::Name(name) => name.as_slice(),
        Object::Array(arr) => arr.first()?.as_name().ok()?,
        _ => return None,
    };
    Some(String::from_utf8_lossy(name).into_owned())
}

/// Decode a PDF text string (UTF-16BE with BOM, else UTF-8, else Latin-1).
fn text_string(doc: &Document, obj: &Object) -> Option<String> {
    match doc.dereference(obj).ok()?.1 {
        Object::String(bytes, _) => {
            if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
                let units: Vec<u16> = bytes[2..]
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&units).ok()
            } else {
                match std::str::from_utf8(bytes) {
                    Ok(s) => Some(s.to_string()),
                    Err(_) => Some(bytes.iter().map(|&b| b as char).collect()),
                }
            }
        }
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn encryption_filter(doc: &Document) -> Option<String> {
    let encrypt = doc.trailer.get(b"Encrypt").ok()?;
    let dict = doc.dereference(encrypt).ok()?.1.as_dict().ok()?;
    text_string(doc, dict.get(b"Filter").ok()?)
}
