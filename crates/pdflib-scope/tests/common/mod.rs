//! Common test utilities and fixtures
#![allow(dead_code)]

use pdflib_engine::{Journal, MemoryEngine, PdfEngine};
use pdflib_scope::RootObject;
use std::io::Cursor;

/// A PDF with pages of the given sizes, generated with the engine itself.
pub fn pdf_bytes(compatibility: &str, sizes: &[(f64, f64)]) -> Vec<u8> {
    let mut engine = MemoryEngine::new();
    engine
        .begin_document("", &format!("compatibility={compatibility}"))
        .unwrap();
    for &(width, height) in sizes {
        engine.begin_page_ext(width, height, "").unwrap();
        engine.end_page_ext("").unwrap();
    }
    engine.end_document("").unwrap();
    engine.get_buffer().unwrap()
}

/// A small PNG image.
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image::RgbImage::from_pixel(4, 3, image::Rgb([200, 30, 30]))
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

/// A root object on a fresh in-memory engine, plus that engine's journal.
pub fn root_with_journal() -> (RootObject, Journal) {
    engine_root(MemoryEngine::new())
}

pub fn engine_root(engine: MemoryEngine) -> (RootObject, Journal) {
    let journal = engine.journal();
    let root = RootObject::new(Box::new(engine)).unwrap();
    journal.clear();
    (root, journal)
}

/// The calls recorded since the last `clear`, without option/error queries.
pub fn lifecycle_calls(journal: &Journal) -> Vec<String> {
    journal
        .entries()
        .into_iter()
        .filter(|entry| entry.call != "set_option")
        .map(|entry| {
            if entry.argument.is_empty() {
                entry.call.to_string()
            } else {
                format!("{}({})", entry.call, entry.argument)
            }
        })
        .collect()
}
