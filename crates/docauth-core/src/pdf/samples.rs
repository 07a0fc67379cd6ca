//! Conversion of raw image XObject samples into PNG files.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Document, Object};
use tracing::trace;

/// Colour space of an image XObject, as far as sample decoding cares.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Palette image; `palette` holds `base` components per entry.
    Indexed {
        base: Box<ColorSpace>,
        palette: Vec<u8>,
    },
    /// Anything we cannot turn into pixels (Lab, Separation, DeviceN...).
    Other(String),
}

impl ColorSpace {
    /// Parse a /ColorSpace value.
    pub(crate) fn parse(doc: &Document, obj: &Object) -> ColorSpace {
        let Ok((_, obj)) = doc.dereference(obj) else {
            return ColorSpace::Other(String::new());
        };
        match obj {
            Object::Name(name) => Self::from_name(name),
            Object::Array(arr) => {
                let family = arr.first().and_then(|o| o.as_name().ok()).unwrap_or_default();
                match family {
                    b"ICCBased" => {
                        // ICC profile stream declares the component count as /N
                        let components = arr
                            .get(1)
                            .and_then(|o| doc.dereference(o).ok())
                            .and_then(|(_, o)| o.as_stream().ok())
                            .and_then(|s| s.dict.get(b"N").ok())
                            .and_then(|n| n.as_i64().ok());
                        match components {
                            Some(1) => ColorSpace::Gray,
                            Some(3) => ColorSpace::Rgb,
                            Some(4) => ColorSpace::Cmyk,
                            _ => ColorSpace::Other("ICCBased".into()),
                        }
                    }
                    b"Indexed" | b"I" => Self::indexed(doc, arr),
                    b"CalGray" => ColorSpace::Gray,
                    b"CalRGB" => ColorSpace::Rgb,
                    other => ColorSpace::Other(String::from_utf8_lossy(other).into_owned()),
                }
            }
            _ => ColorSpace::Other(String::new()),
        }
    }

    fn from_name(name: &[u8]) -> ColorSpace {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => ColorSpace::Gray,
            b"DeviceRGB" | b"RGB" | b"CalRGB" => ColorSpace::Rgb,
            b"DeviceCMYK" | b"CMYK" => ColorSpace::Cmyk,
            other => ColorSpace::Other(String::from_utf8_lossy(other).into_owned()),
        }
    }

    /// `[/Indexed base hival lookup]`
    fn indexed(doc: &Document, arr: &[Object]) -> ColorSpace {
        let base = arr
            .get(1)
            .map(|o| ColorSpace::parse(doc, o))
            .unwrap_or_else(|| ColorSpace::Other(String::new()));
        if matches!(base, ColorSpace::Indexed { .. } | ColorSpace::Other(_)) {
            return ColorSpace::Other("Indexed".into());
        }

        let palette = match arr.get(3).and_then(|o| doc.dereference(o).ok()) {
            Some((_, Object::String(bytes, _))) => bytes.clone(),
            Some((_, Object::Stream(stream))) => stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone()),
            _ => Vec::new(),
        };

        ColorSpace::Indexed {
            base: Box::new(base),
            palette,
        }
    }

    /// Samples per pixel in the stream data.
    pub(crate) fn components(&self) -> u8 {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
            ColorSpace::Other(_) => 0,
        }
    }

    /// Components of the colours the pixels resolve to.
    pub(crate) fn output_components(&self) -> u8 {
        match self {
            ColorSpace::Indexed { base, .. } => base.components(),
            other => other.components(),
        }
    }

    pub(crate) fn name(&self) -> String {
        match self {
            ColorSpace::Gray => "DeviceGray".into(),
            ColorSpace::Rgb => "DeviceRGB".into(),
            ColorSpace::Cmyk => "DeviceCMYK".into(),
            ColorSpace::Indexed { .. } => "Indexed".into(),
            ColorSpace::Other(name) => name.clone(),
        }
    }
}

/// Layout of the samples in an image stream.
#[derive(Debug, Clone)]
pub(crate) struct SampleLayout {
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u32,
    pub color_space: ColorSpace,
    /// `/Decode [1 0]` on a single-component image.
    pub inverted: bool,
}

/// Decode raw samples into pixels and wrap them as a PNG file.
///
/// Rows are byte aligned. Sub-byte gray samples are scaled to 8 bits, 16-bit
/// samples keep their high byte, CMYK is converted to RGB and palette indices
/// are resolved through the lookup table.
pub(crate) fn encode_png(samples: &[u8], layout: &SampleLayout) -> Option<Vec<u8>> {
    let image = to_image(samples, layout)?;
    let mut data = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .ok()?;
    Some(data)
}

fn to_image(samples: &[u8], layout: &SampleLayout) -> Option<DynamicImage> {
    let SampleLayout {
        width,
        height,
        bits_per_component: bpc,
        ref color_space,
        inverted,
    } = *layout;

    if width == 0 || height == 0 || !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return None;
    }
    let components = color_space.components() as usize;
    if components == 0 {
        return None;
    }

    let row_samples = (width as usize).checked_mul(components)?;
    let row_bytes = row_samples.checked_mul(bpc as usize)?.div_ceil(8);
    let needed = row_bytes.checked_mul(height as usize)?;
    if samples.len() < needed {
        trace!("Short image data: {} < {}", samples.len(), needed);
        return None;
    }

    let rows = samples[..needed].chunks_exact(row_bytes);
    let max = ((1u32 << bpc) - 1) as u16;
    let scale = |v: u16| -> u8 {
        if bpc == 16 {
            (v >> 8) as u8
        } else {
            (u32::from(v) * 255 / u32::from(max)) as u8
        }
    };

    match color_space {
        ColorSpace::Gray => {
            let mut pixels = Vec::with_capacity(width as usize * height as usize);
            for row in rows {
                pixels.extend((0..row_samples).map(|i| {
                    let value = scale(sample(row, i, bpc));
                    if inverted { 255 - value } else { value }
                }));
            }
            GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        }
        ColorSpace::Rgb => {
            let mut pixels = Vec::with_capacity(row_samples * height as usize);
            for row in rows {
                pixels.extend((0..row_samples).map(|i| scale(sample(row, i, bpc))));
            }
            RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        }
        ColorSpace::Cmyk => {
            let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
            for row in rows {
                for px in 0..width as usize {
                    let cmyk: [u8; 4] = std::array::from_fn(|c| scale(sample(row, px * 4 + c, bpc)));
                    pixels.extend(cmyk_to_rgb(cmyk));
                }
            }
            RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        }
        ColorSpace::Indexed { base, palette } => {
            if bpc == 16 {
                return None;
            }
            let entry = base.components() as usize;
            let lookup = |index: usize, c: usize| palette.get(index * entry + c).copied().unwrap_or(0);

            match base.as_ref() {
                ColorSpace::Gray => {
                    let mut pixels = Vec::with_capacity(width as usize * height as usize);
                    for row in rows {
                        pixels.extend((0..row_samples).map(|i| lookup(sample(row, i, bpc) as usize, 0)));
                    }
                    GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
                }
                ColorSpace::Rgb | ColorSpace::Cmyk => {
                    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
                    for row in rows {
                        for i in 0..row_samples {
                            let index = sample(row, i, bpc) as usize;
                            if entry == 4 {
                                pixels.extend(cmyk_to_rgb(std::array::from_fn(|c| lookup(index, c))));
                            } else {
                                pixels.extend((0..3).map(|c| lookup(index, c)));
                            }
                        }
                    }
                    RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
                }
                _ => None,
            }
        }
        ColorSpace::Other(_) => None,
    }
}

/// The `index`-th sample of a byte-aligned row.
fn sample(row: &[u8], index: usize, bpc: u32) -> u16 {
    match bpc {
        16 => u16::from_be_bytes([row[index * 2], row[index * 2 + 1]]),
        8 => u16::from(row[index]),
        _ => {
            let bit = index * bpc as usize;
            let byte = row[bit / 8];
            let shift = 8 - bpc as usize - (bit % 8);
            u16::from((byte >> shift) & ((1u8 << bpc) - 1))
        }
    }
}

fn cmyk_to_rgb([c, m, y, k]: [u8; 4]) -> [u8; 3] {
    let channel = |v: u8| ((255 - u32::from(v)) * (255 - u32::from(k)) / 255) as u8;
    [channel(c), channel(m), channel(y)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::StringFormat;
    use pretty_assertions::assert_eq;

    fn layout(width: u32, height: u32, bpc: u32, color_space: ColorSpace) -> SampleLayout {
        SampleLayout {
            width,
            height,
            bits_per_component: bpc,
            color_space,
            inverted: false,
        }
    }

    fn decode_png(png: &[u8]) -> DynamicImage {
        image::load_from_memory(png).unwrap()
    }

    #[test]
    fn test_eight_bit_gray_and_rgb() {
        let gray = encode_png(&[0, 64, 128, 255], &layout(2, 2, 8, ColorSpace::Gray)).unwrap();
        assert_eq!(decode_png(&gray).to_luma8().into_raw(), vec![0, 64, 128, 255]);

        let rgb = encode_png(&[255, 0, 0, 0, 0, 255], &layout(2, 1, 8, ColorSpace::Rgb)).unwrap();
        assert_eq!(decode_png(&rgb).to_rgb8().into_raw(), vec![255, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn test_one_bit_gray_rows_are_byte_aligned() {
        // 10 pixels wide: each row takes two bytes, the last 6 bits are padding
        let samples = [0b1010_1010, 0b1100_0000, 0b0000_0000, 0b0100_0000];
        let png = encode_png(&samples, &layout(10, 2, 1, ColorSpace::Gray)).unwrap();
        let pixels = decode_png(&png).to_luma8().into_raw();

        assert_eq!(
            &pixels[..10],
            &[255, 0, 255, 0, 255, 0, 255, 0, 255, 255]
        );
        assert_eq!(&pixels[10..], &[0, 0, 0, 0, 0, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn test_two_and_four_bit_gray_scale_to_full_range() {
        let two = encode_png(&[0b00_01_10_11], &layout(4, 1, 2, ColorSpace::Gray)).unwrap();
        assert_eq!(decode_png(&two).to_luma8().into_raw(), vec![0, 85, 170, 255]);

        let four = encode_png(&[0x0F, 0x80], &layout(4, 1, 4, ColorSpace::Gray)).unwrap();
        assert_eq!(decode_png(&four).to_luma8().into_raw(), vec![0, 255, 136, 0]);
    }

    #[test]
    fn test_inverted_decode_flips_gray() {
        let mut inverted = layout(8, 1, 1, ColorSpace::Gray);
        inverted.inverted = true;
        let png = encode_png(&[0b1111_0000], &inverted).unwrap();
        assert_eq!(
            decode_png(&png).to_luma8().into_raw(),
            vec![0, 0, 0, 0, 255, 255, 255, 255]
        );
    }

    #[test]
    fn test_cmyk_converts_to_rgb() {
        let samples = [0, 0, 0, 0, 255, 0, 0, 0, 0, 0, 0, 255];
        let png = encode_png(&samples, &layout(3, 1, 8, ColorSpace::Cmyk)).unwrap();
        assert_eq!(
            decode_png(&png).to_rgb8().into_raw(),
            vec![255, 255, 255, 0, 255, 255, 0, 0, 0]
        );
    }

    #[test]
    fn test_indexed_resolves_palette() {
        let indexed = ColorSpace::Indexed {
            base: Box::new(ColorSpace::Rgb),
            palette: vec![255, 0, 0, 0, 255, 0],
        };
        // 1-bit indices 1, 0, 1
        let png = encode_png(&[0b1010_0000], &layout(3, 1, 1, indexed)).unwrap();
        assert_eq!(
            decode_png(&png).to_rgb8().into_raw(),
            vec![0, 255, 0, 255, 0, 0, 0, 255, 0]
        );
    }

    #[test]
    fn test_parse_indexed_color_space() {
        let doc = Document::with_version("1.5");
        let cs = Object::Array(vec![
            Object::Name(b"Indexed".to_vec()),
            Object::Name(b"DeviceGray".to_vec()),
            Object::Integer(1),
            Object::String(vec![0, 255], StringFormat::Hexadecimal),
        ]);

        let parsed = ColorSpace::parse(&doc, &cs);
        assert_eq!(
            parsed,
            ColorSpace::Indexed {
                base: Box::new(ColorSpace::Gray),
                palette: vec![0, 255],
            }
        );
        assert_eq!(parsed.components(), 1);
        assert_eq!(parsed.output_components(), 1);
        assert_eq!(parsed.name(), "Indexed");
    }

    #[test]
    fn test_rejects_short_or_unsupported_data() {
        assert!(encode_png(&[0u8; 5], &layout(2, 2, 8, ColorSpace::Rgb)).is_none());
        assert!(encode_png(&[0u8; 4], &layout(2, 2, 3, ColorSpace::Gray)).is_none());
        assert!(encode_png(&[0u8; 4], &layout(2, 2, 8, ColorSpace::Other("Lab".into()))).is_none());
        assert!(encode_png(&[0u8; 2], &layout(2, 2, 1, ColorSpace::Gray)).is_some());
    }
}
