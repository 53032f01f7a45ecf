//! Virtual file naming and lifetime tests

mod common;

use common::{pdf_bytes, png_bytes, root_with_journal};
use pdflib_scope::{ScopeError, VirtualFile};
use proptest::prelude::*;
use std::collections::HashSet;

#[test]
fn test_naming_sequence_is_reproducible() {
    let (root, _journal) = root_with_journal();
    let requests = [
        ("f", "l"),
        ("f.1", "o"),
        ("f", "r"),
        ("f.2", "e"),
        ("f.3", "m"),
        ("f", "i"),
    ];

    let files: Vec<VirtualFile> = requests
        .iter()
        .map(|(prefix, data)| root.create_virtual_file(data.as_bytes(), Some(prefix)).unwrap())
        .collect();
    let names: Vec<&str> = files.iter().map(VirtualFile::name).collect();

    assert_eq!(names, vec!["f", "f.1", "f.2", "f.2.1", "f.3", "f.4"]);
}

#[test]
fn test_default_prefix() {
    let (root, _journal) = root_with_journal();
    let first = root.create_virtual_file(b"a", None).unwrap();
    let second = root.create_virtual_file(b"b", Some("")).unwrap();
    assert_eq!(first.name(), "pvf");
    assert_eq!(second.name(), "pvf.1");
}

#[test]
fn test_empty_data_is_rejected() {
    let (root, journal) = root_with_journal();
    let err = root.create_virtual_file(b"", Some("x")).unwrap_err();
    assert!(matches!(err, ScopeError::EmptyInput { .. }));
    assert_eq!(err.to_string(), "Cannot create empty virtual file!");
    assert_eq!(journal.count("create_pvf"), 0);
}

#[test]
fn test_delete_twice_succeeds() {
    let (root, journal) = root_with_journal();
    let mut file = root.create_virtual_file(b"data", Some("twice")).unwrap();

    assert!(file.delete().unwrap());
    assert!(file.delete().unwrap());
    assert!(file.is_deleted());
    assert!(!root.has_virtual_file("twice"));
    assert_eq!(journal.count("delete_pvf"), 1);
}

#[test]
fn test_deleted_name_is_reused() {
    let (root, _journal) = root_with_journal();
    let mut first = root.create_virtual_file(b"1", Some("n")).unwrap();
    let _second = root.create_virtual_file(b"2", Some("n")).unwrap();
    first.delete().unwrap();

    let third = root.create_virtual_file(b"3", Some("n")).unwrap();
    assert_eq!(third.name(), "n");
}

#[test]
fn test_drop_deletes_file() {
    let (root, journal) = root_with_journal();
    {
        let _file = root.create_virtual_file(b"scoped", Some("tmp")).unwrap();
        assert_eq!(root.virtual_file_names(), vec!["tmp".to_string()]);
    }
    assert!(root.virtual_file_names().is_empty());
    assert_eq!(journal.count("delete_pvf"), 1);
}

#[test]
fn test_locked_file_survives_delete_until_unlocked() {
    let (root, _journal) = root_with_journal();
    let mut file = root
        .create_virtual_file(&pdf_bytes("1.7", &[(100.0, 100.0)]), Some("in.pdf"))
        .unwrap();
    let mut pdi = root.open_pdi_document(&file, "").unwrap();

    assert!(!file.delete().unwrap());
    assert!(!file.is_deleted());
    assert!(root.has_virtual_file("in.pdf"));

    pdi.close().unwrap();
    assert!(file.delete().unwrap());
    assert!(!root.has_virtual_file("in.pdf"));
}

#[test]
fn test_file_dropped_while_image_holds_it_is_deleted_on_release() {
    let (root, journal) = root_with_journal();
    let document = root.create_document("", "").unwrap();
    let file = root.create_virtual_file(&png_bytes(), Some("logo.png")).unwrap();
    let image = document.load_image(&file, "png", "").unwrap();

    drop(file);
    assert!(root.has_virtual_file("logo.png"));

    image.close().unwrap();
    assert!(!root.has_virtual_file("logo.png"));
    assert_eq!(journal.count("delete_pvf"), 2);
}

#[test]
fn test_file_dropped_while_pdi_document_holds_it_is_deleted_on_close() {
    let (root, _journal) = root_with_journal();
    let file = root
        .create_virtual_file(&pdf_bytes("1.7", &[(10.0, 10.0)]), Some("in.pdf"))
        .unwrap();
    let mut pdi = root.open_pdi_document(&file, "").unwrap();

    drop(file);
    assert_eq!(root.virtual_file_names(), vec!["in.pdf".to_string()]);

    pdi.close().unwrap();
    assert!(root.virtual_file_names().is_empty());
}

#[test]
fn test_queued_file_deleted_when_document_finishes() {
    let (root, _journal) = root_with_journal();
    let document = root.create_document("", "").unwrap();
    let file = root.create_virtual_file(&png_bytes(), None).unwrap();
    document.load_image(&file, "auto", "").unwrap();
    drop(file);

    document.finish(false, "").unwrap();
    assert!(root.virtual_file_names().is_empty());
}

#[test]
fn test_duplicate_name_already_in_engine_poisons_root() {
    use pdflib_engine::{MemoryEngine, PdfEngine};

    let mut engine = MemoryEngine::new();
    engine.create_pvf("pvf", b"registered behind our back", "").unwrap();
    let (root, _journal) = common::engine_root(engine);

    let err = root.create_virtual_file(b"data", None).unwrap_err();
    assert!(err.is_fatal());
    assert!(root.is_poisoned());

    let again = root.create_virtual_file(b"data", Some("other")).unwrap_err();
    assert!(matches!(again, ScopeError::EngineUnexpected(_)));
    assert!(root.create_document("", "").is_err());
}

#[test]
fn test_names_unique_under_random_operations() {
    proptest!(|(ops in prop::collection::vec((0usize..4, any::<bool>(), 0usize..8), 1..40))| {
        let prefixes = ["p", "p.1", "p.2", "q"];
        let (root, _journal) = root_with_journal();
        let mut live: Vec<VirtualFile> = Vec::new();

        for (prefix, create, victim) in ops {
            if create || live.is_empty() {
                live.push(root.create_virtual_file(b"x", Some(prefixes[prefix])).unwrap());
            } else {
                let mut file = live.remove(victim % live.len());
                prop_assert!(file.delete().unwrap());
            }

            let names: HashSet<&str> = live.iter().map(VirtualFile::name).collect();
            prop_assert_eq!(names.len(), live.len());
            prop_assert_eq!(root.virtual_file_names().len(), live.len());
        }
    });
}
