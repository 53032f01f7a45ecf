//! Serialisation of generated documents

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::collections::BTreeMap;

/// A page produced between `begin_page_ext` and `end_page_ext`.
#[derive(Debug, Clone, Default)]
pub(crate) struct OutputPage {
    pub width: f64,
    pub height: f64,
    pub operations: Vec<Operation>,
}

/// Everything collected between `begin_document` and `end_document`.
#[derive(Debug, Clone, Default)]
pub(crate) struct OutputDocument {
    /// Target path, empty for in-memory generation.
    pub filename: String,
    /// PDF version written to the header, e.g. `1.7`.
    pub compatibility: String,
    pub info: BTreeMap<String, String>,
    pub pages: Vec<OutputPage>,
}

impl OutputDocument {
    /// Write the document as PDF.
    pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
        let mut document = Document::with_version(self.compatibility.as_str());
        let pages_id = document.new_object_id();

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let content = Content {
                operations: page.operations.clone(),
            }
            .encode()
            .map_err(|e| format!("failed to encode page content ({e})"))?;
            let content_id = document.add_object(Stream::new(Dictionary::new(), content));

            let page_id = document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page.width as f32),
                    Object::Real(page.height as f32),
                ],
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
            }),
        );

        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        if !self.info.is_empty() {
            let info = Dictionary::from_iter(
                self.info
                    .iter()
                    .map(|(key, value)| (key.as_str(), Object::string_literal(value.as_str()))),
            );
            let info_id = document.add_object(info);
            document.trailer.set("Info", info_id);
        }

        let mut bytes = Vec::new();
        document
            .save_to(&mut bytes)
            .map_err(|e| format!("failed to write PDF ({e})"))?;
        Ok(bytes)
    }
}
