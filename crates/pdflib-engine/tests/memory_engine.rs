//! Behaviour tests for the in-process engine
//!
//! Tests cover:
//! - Scope transitions and wrong-scope errors
//! - Error policy (`return` vs `exception`)
//! - Virtual file table and locking
//! - PDF import and pCOS queries
//! - Image probing
//! - Output to memory and to disk

use pdflib_engine::{
    MemoryEngine, PdfEngine, Scope, ERR_CORRUPT_FILE, ERR_FILE_NOT_FOUND, ERR_HANDLE, ERR_IMAGE,
    ERR_NO_PAGES, ERR_PVF_EXISTS, ERR_PVF_LOCKED, ERR_WRONG_SCOPE, INVALID_HANDLE,
};
use std::io::Cursor;
use tempfile::tempdir;

/// Generate a PDF with pages of the given sizes using the engine itself.
fn generate_pdf(compatibility: &str, sizes: &[(f64, f64)]) -> Vec<u8> {
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

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image::RgbImage::new(width, height)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

fn returning_engine() -> MemoryEngine {
    let mut engine = MemoryEngine::new();
    engine.set_option("errorpolicy=return").unwrap();
    engine
}

// ============================================================================
// Scope Tests
// ============================================================================

#[test]
fn test_scope_follows_begin_and_end_calls() {
    let mut engine = MemoryEngine::new();
    assert_eq!(engine.scope(), Scope::Object);
    engine.begin_document("", "").unwrap();
    assert_eq!(engine.scope(), Scope::Document);
    engine.begin_page_ext(595.0, 842.0, "").unwrap();
    assert_eq!(engine.scope(), Scope::Page);
    assert_eq!(engine.get_option("scope").as_deref(), Some("page"));
    engine.end_page_ext("").unwrap();
    assert_eq!(engine.scope(), Scope::Document);
    engine.end_document("").unwrap();
    assert_eq!(engine.scope(), Scope::Object);
}

#[test]
fn test_drawing_outside_page_raises_even_with_return_policy() {
    let mut engine = returning_engine();
    let err = engine.rect(0.0, 0.0, 10.0, 10.0).unwrap_err();
    assert_eq!(err.errnum, ERR_WRONG_SCOPE);
    assert_eq!(err.apiname, "rect");
    assert!(engine.get_errmsg().contains("'object' scope"));
}

#[test]
fn test_nested_page_is_rejected() {
    let mut engine = MemoryEngine::new();
    engine.begin_document("", "").unwrap();
    engine.begin_page_ext(100.0, 100.0, "").unwrap();
    let err = engine.begin_page_ext(100.0, 100.0, "").unwrap_err();
    assert_eq!(err.errnum, ERR_WRONG_SCOPE);
}

#[test]
fn test_non_positive_page_size_is_rejected() {
    let mut engine = MemoryEngine::new();
    engine.begin_document("", "").unwrap();
    assert!(engine.begin_page_ext(0.0, 100.0, "").is_err());
    assert!(engine.begin_page_ext(100.0, f64::NAN, "").is_err());
    assert_eq!(engine.scope(), Scope::Document);
}

// ============================================================================
// Error Policy Tests
// ============================================================================

#[test]
fn test_begin_document_follows_error_policy() {
    let mut engine = MemoryEngine::new();
    let err = engine
        .begin_document("", "compatibility=1.2")
        .unwrap_err();
    assert!(err.message.contains("compatibility"));

    engine.set_option("errorpolicy=return").unwrap();
    assert_eq!(engine.begin_document("", "compatibility=1.2").unwrap(), -1);
    assert_eq!(engine.scope(), Scope::Object);
    assert!(engine.get_errmsg().contains("compatibility"));
}

#[test]
fn test_begin_document_into_missing_directory_fails() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("missing").join("out.pdf");
    let mut engine = returning_engine();
    assert_eq!(
        engine
            .begin_document(target.to_str().unwrap(), "")
            .unwrap(),
        -1
    );
    assert_eq!(engine.get_errnum(), ERR_FILE_NOT_FOUND);
}

#[test]
fn test_unknown_option_is_rejected() {
    let mut engine = MemoryEngine::new();
    assert!(engine.set_option("textformat=utf8").is_err());
    assert!(engine.set_option("errorpolicy=sometimes").is_err());
    assert_eq!(engine.get_option("errorpolicy").as_deref(), Some("exception"));
}

#[test]
fn test_license_keys_registered_with_builder() {
    let mut engine = MemoryEngine::builder().accept_license("L-123").build();
    assert_eq!(engine.get_option("licensed").as_deref(), Some("false"));
    assert!(engine.set_option("license=nope").is_err());
    engine.set_option("license=L-123").unwrap();
    assert_eq!(engine.get_option("licensed").as_deref(), Some("true"));
}

// ============================================================================
// Output Tests
// ============================================================================

#[test]
fn test_end_document_without_pages_raises_no_pages() {
    let mut engine = returning_engine();
    engine.begin_document("", "").unwrap();
    let err = engine.end_document("").unwrap_err();
    assert_eq!(err.errnum, ERR_NO_PAGES);
    assert!(err.is_no_pages());
    assert_eq!(engine.scope(), Scope::Object);
    assert!(engine.get_buffer().unwrap().is_empty());
}

#[test]
fn test_buffer_is_drained_once() {
    let bytes = generate_pdf("1.5", &[(300.0, 300.0)]);
    assert!(bytes.starts_with(b"%PDF-1.5"));

    let mut engine = MemoryEngine::new();
    engine.begin_document("", "").unwrap();
    engine.begin_page_ext(10.0, 10.0, "").unwrap();
    engine.end_page_ext("").unwrap();
    engine.end_document("").unwrap();
    assert!(!engine.get_buffer().unwrap().is_empty());
    assert!(engine.get_buffer().unwrap().is_empty());
}

#[test]
fn test_document_written_to_disk() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("out.pdf");
    let mut engine = MemoryEngine::new();
    engine.set_info("Title", "On disk").unwrap();
    engine
        .begin_document(target.to_str().unwrap(), "compatibility=2.0")
        .unwrap();
    engine.begin_page_ext(200.0, 100.0, "").unwrap();
    engine.end_page_ext("").unwrap();
    engine.end_document("").unwrap();

    let written = std::fs::read(&target).unwrap();
    assert!(written.starts_with(b"%PDF-2.0"));
    let parsed = lopdf::Document::load_mem(&written).unwrap();
    assert_eq!(parsed.get_pages().len(), 1);
}

// ============================================================================
// Virtual File Tests
// ============================================================================

#[test]
fn test_duplicate_virtual_file_always_raises() {
    let mut engine = returning_engine();
    engine.create_pvf("a", b"data", "").unwrap();
    let err = engine.create_pvf("a", b"other", "").unwrap_err();
    assert_eq!(err.errnum, ERR_PVF_EXISTS);
}

#[test]
fn test_delete_unknown_virtual_file_succeeds() {
    let mut engine = MemoryEngine::new();
    assert_eq!(engine.delete_pvf("never-created").unwrap(), 1);
}

#[test]
fn test_virtual_file_locked_while_document_open() {
    let mut engine = returning_engine();
    engine
        .create_pvf("in.pdf", &generate_pdf("1.7", &[(100.0, 100.0)]), "")
        .unwrap();
    let pdi = engine.open_pdi_document("in.pdf", "").unwrap();
    assert!(pdi > 0);

    assert_eq!(engine.delete_pvf("in.pdf").unwrap(), -1);
    assert_eq!(engine.get_errnum(), ERR_PVF_LOCKED);
    assert_eq!(engine.virtual_file_names(), vec!["in.pdf".to_string()]);

    engine.close_pdi_document(pdi).unwrap();
    assert_eq!(engine.delete_pvf("in.pdf").unwrap(), 1);
    assert!(engine.virtual_file_names().is_empty());
}

// ============================================================================
// Import Tests
// ============================================================================

#[test]
fn test_pcos_queries() {
    let mut engine = returning_engine();
    engine
        .create_pvf(
            "two-pages",
            &generate_pdf("1.6", &[(595.0, 842.0), (842.0, 595.0)]),
            "",
        )
        .unwrap();
    let pdi = engine.open_pdi_document("two-pages", "").unwrap();

    assert_eq!(engine.pcos_get_number(pdi, "length:pages").unwrap(), 2.0);
    assert_eq!(engine.pcos_get_number(pdi, "pdfversion").unwrap(), 16.0);
    assert_eq!(engine.pcos_get_number(pdi, "pages[1]/width").unwrap(), 842.0);
    assert_eq!(engine.pcos_get_number(pdi, "pages[1]/height").unwrap(), 595.0);
    assert_eq!(engine.pcos_get_number(pdi, "pages[2]/height").unwrap(), -1.0);
}

#[test]
fn test_open_missing_and_corrupt_documents() {
    let mut engine = returning_engine();
    assert_eq!(
        engine.open_pdi_document("/no/such/file.pdf", "").unwrap(),
        INVALID_HANDLE
    );
    assert_eq!(engine.get_errnum(), ERR_FILE_NOT_FOUND);

    engine.create_pvf("junk", b"not a pdf at all", "").unwrap();
    assert_eq!(engine.open_pdi_document("junk", "").unwrap(), INVALID_HANDLE);
    assert_eq!(engine.get_errnum(), ERR_CORRUPT_FILE);
    assert!(engine.get_errmsg().contains("Couldn't open PDF file 'junk'"));

    let mut raising = MemoryEngine::new();
    assert!(raising.open_pdi_document("/no/such/file.pdf", "").is_err());
}

#[test]
fn test_pdi_pages_need_document_scope_and_block_close() {
    let mut engine = returning_engine();
    engine
        .create_pvf("src", &generate_pdf("1.7", &[(100.0, 200.0)]), "")
        .unwrap();
    let pdi = engine.open_pdi_document("src", "").unwrap();
    assert_eq!(engine.open_pdi_page(pdi, 1, "").unwrap(), INVALID_HANDLE);
    assert_eq!(engine.get_errnum(), ERR_WRONG_SCOPE);

    engine.begin_document("", "").unwrap();
    assert_eq!(engine.open_pdi_page(pdi, 2, "").unwrap(), INVALID_HANDLE);
    let page = engine.open_pdi_page(pdi, 1, "").unwrap();
    assert!(page > 0);

    let err = engine.close_pdi_document(pdi).unwrap_err();
    assert_eq!(err.errnum, ERR_HANDLE);

    engine.close_pdi_page(page).unwrap();
    engine.close_pdi_document(pdi).unwrap();
    assert_eq!(engine.open_pdi_document_count(), 0);
}

#[test]
fn test_end_document_invalidates_document_resources() {
    let mut engine = returning_engine();
    engine.create_pvf("img", &png_bytes(2, 2), "").unwrap();
    engine.begin_document("", "").unwrap();
    let image = engine.load_image("auto", "img", "").unwrap();
    engine.begin_page_ext(50.0, 50.0, "").unwrap();
    engine.end_page_ext("").unwrap();
    engine.end_document("").unwrap();

    assert_eq!(engine.open_resource_count(), 0);
    assert_eq!(engine.close_image(image).unwrap_err().errnum, ERR_HANDLE);
    assert_eq!(engine.delete_pvf("img").unwrap(), 1);
}

// ============================================================================
// Image Tests
// ============================================================================

#[test]
fn test_load_image_checks_type() {
    let mut engine = returning_engine();
    engine.create_pvf("pixel.png", &png_bytes(1, 1), "").unwrap();
    engine.begin_document("", "").unwrap();

    let png = engine.load_image("png", "pixel.png", "").unwrap();
    assert!(png > 0);
    assert_eq!(engine.load_image("jpeg", "pixel.png", "").unwrap(), INVALID_HANDLE);
    assert_eq!(engine.get_errnum(), ERR_IMAGE);
    assert_eq!(engine.load_image("tiff2", "pixel.png", "").unwrap(), INVALID_HANDLE);
}

#[test]
fn test_load_image_from_disk_and_fit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pixel.png");
    std::fs::write(&path, png_bytes(3, 5)).unwrap();

    let mut engine = MemoryEngine::new();
    let journal = engine.journal();
    engine.begin_document("", "").unwrap();
    engine.begin_page_ext(100.0, 100.0, "").unwrap();
    let image = engine
        .load_image("auto", path.to_str().unwrap(), "")
        .unwrap();
    engine.fit_image(image, 10.0, 20.0, "adjustpage").unwrap();

    let fits = journal.calls_to("fit_image");
    assert_eq!(fits.len(), 1);
    assert_eq!(fits[0].argument, format!("{image}@10,20"));
    assert_eq!(fits[0].options, "adjustpage");
}

#[test]
fn test_load_garbage_image_fails() {
    let mut engine = returning_engine();
    engine.create_pvf("garbage", b"\x00\x01\x02", "").unwrap();
    engine.begin_document("", "").unwrap();
    assert_eq!(engine.load_image("auto", "garbage", "").unwrap(), INVALID_HANDLE);
    assert!(engine.get_errmsg().contains("Couldn't load image 'garbage'"));
}
