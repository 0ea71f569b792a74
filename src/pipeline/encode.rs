//! Image encoding: rasterised pages → JPEG → single image-only PDF.
//!
//! Each page becomes one PDF page holding one `DCTDecode` image XObject that
//! fills the whole media box. The media box is the pixel size mapped back
//! through the render DPI (`px * 72 / dpi`), so a page rendered at 150 DPI
//! and written at 150 DPI keeps its physical dimensions.
//!
//! Output of this path is lossy: text becomes pixels and the file size is
//! dominated by the JPEG quality setting.

use crate::error::SplitError;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use tracing::debug;

/// Encode `img` as baseline RGB JPEG at `quality` (1–100).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(&rgb)?;
    debug!(
        "encoded {}x{} page → {} bytes JPEG (q={})",
        rgb.width(),
        rgb.height(),
        buf.len(),
        quality
    );
    Ok(buf)
}

/// Build a PDF with one full-page JPEG per image, in order.
pub fn images_to_pdf(images: &[DynamicImage], dpi: u32, quality: u8) -> Result<Vec<u8>, SplitError> {
    if images.is_empty() {
        return Err(SplitError::Internal("no pages to encode".into()));
    }
    let dpi = dpi.max(1) as f32;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(images.len());

    for (i, img) in images.iter().enumerate() {
        let jpeg = encode_jpeg(img, quality)
            .map_err(|e| SplitError::Internal(format!("JPEG encode of page {}: {e}", i + 1)))?;
        let (w_px, h_px) = (img.width(), img.height());
        let w_pt = w_px as f32 * 72.0 / dpi;
        let h_pt = h_px as f32 * 72.0 / dpi;

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w_px as i64,
                "Height" => h_px as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        ));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(w_pt),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(h_pt),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| SplitError::Internal(format!("content stream: {e}")))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(w_pt),
                Object::Real(h_pt),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| SplitError::Internal(format!("writing PDF: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::inspect::count_pages_mem;
    use image::{Rgb, RgbImage};

    fn page(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 10, 10])))
    }

    #[test]
    fn jpeg_has_soi_marker() {
        let data = encode_jpeg(&page(10, 10), 80).unwrap();
        assert_eq!(&data[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn one_pdf_page_per_image() {
        let pdf = images_to_pdf(&[page(30, 40), page(40, 30), page(10, 10)], 150, 80).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert_eq!(count_pages_mem(&pdf).unwrap(), 3);
    }

    #[test]
    fn media_box_follows_dpi() {
        let pdf = images_to_pdf(&[page(150, 300)], 150, 80).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        let mbox = page.get(b"MediaBox").unwrap().as_array().unwrap();
        let num = |o: &Object| match o {
            Object::Real(v) => *v,
            Object::Integer(v) => *v as f32,
            other => panic!("unexpected {other:?}"),
        };
        let (w, h) = (num(&mbox[2]), num(&mbox[3]));
        assert!((w - 72.0).abs() < 0.01, "width {w}");
        assert!((h - 144.0).abs() < 0.01, "height {h}");
    }

    #[test]
    fn no_images_is_an_error() {
        assert!(images_to_pdf(&[], 150, 80).is_err());
    }
}
