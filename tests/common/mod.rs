//! Fixtures shared by the integration tests: PDFs and MSG containers built
//! in memory, plus a rasteriser that needs no pdfium.

#![allow(dead_code)]

use edgequake_pdfsplit::{PageRasterizer, SplitError};
use image::{DynamicImage, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat};
use std::io::{Cursor, Write};
use std::path::Path;

/// A PDF of `pages` pages, each `width` points wide and 100 high.
///
/// The width tags which file a page came from once it is rasterised.
pub fn pdf(pages: u32, width: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for i in 0..pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Td", vec![Object::Integer(10), Object::Integer(50)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("page {}", i + 1).into_bytes(),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(100),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]);
        kids.push(Object::Reference(doc.add_object(page)));
    }
    let tree = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(pages as i64)),
        ("Kids", Object::Array(kids)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(tree));
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn utf16(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_le_bytes()).chain([0, 0]).collect()
}

/// An Outlook message carrying `attachments` as `(long filename, payload)`.
pub fn msg(attachments: &[(&str, &[u8])]) -> Vec<u8> {
    let mut comp = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    comp.create_stream("/__substg1.0_0037001F")
        .unwrap()
        .write_all(&utf16("Scans"))
        .unwrap();
    for (i, (name, data)) in attachments.iter().enumerate() {
        let storage = format!("/__attach_version1.0_#{:08X}", i);
        comp.create_storage(&storage).unwrap();
        comp.create_stream(format!("{storage}/__substg1.0_3707001F"))
            .unwrap()
            .write_all(&utf16(name))
            .unwrap();
        comp.create_stream(format!("{storage}/__substg1.0_37010102"))
            .unwrap()
            .write_all(data)
            .unwrap();
    }
    comp.flush().unwrap();
    comp.into_inner().into_inner()
}

fn number(obj: &Object) -> f64 {
    match obj {
        Object::Integer(i) => *i as f64,
        Object::Real(r) => *r as f64,
        other => panic!("not a number: {other:?}"),
    }
}

/// `(width, height)` of every page's MediaBox, rounded.
pub fn page_sizes(path: &Path) -> Vec<(u32, u32)> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_object(id).unwrap().as_dict().unwrap();
            let mb = page.get(b"MediaBox").unwrap().as_array().unwrap();
            (
                (number(&mb[2]) - number(&mb[0])).round() as u32,
                (number(&mb[3]) - number(&mb[1])).round() as u32,
            )
        })
        .collect()
}

pub fn page_count(path: &Path) -> usize {
    Document::load(path).unwrap().get_pages().len()
}

/// Renders page `n` of a `w`-point-wide PDF as a `(w + n) x 50` image.
///
/// At 72 dpi the output page is the same size in points, so tests can read
/// back where each page came from.
pub struct TaggingRasterizer;

impl PageRasterizer for TaggingRasterizer {
    fn rasterize(&self, pdf_path: &Path, pages: &[u32]) -> Result<Vec<DynamicImage>, SplitError> {
        let width = page_sizes(pdf_path)[0].0;
        Ok(pages
            .iter()
            .map(|&n| DynamicImage::ImageRgb8(RgbImage::from_pixel(width + n, 50, Rgb([255, 255, 255]))))
            .collect())
    }
}
