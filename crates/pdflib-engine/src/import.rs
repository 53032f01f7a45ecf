//! Inspection of PDF documents opened for import

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Page-tree inheritance is never this deep in practice; bail out on cycles.
const MAX_TREE_DEPTH: usize = 64;

/// The properties of an imported PDF that the engine exposes through pCOS.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ImportedPdf {
    /// PDF version multiplied by ten (PDF 1.7 → 17).
    pub version: f64,
    /// Width and height in points of every page, in page order.
    pub pages: Vec<(f64, f64)>,
}

impl ImportedPdf {
    pub fn from_bytes(data: &[u8]) -> Result<Self, String> {
        let document =
            Document::load_mem(data).map_err(|e| format!("not a valid PDF document ({e})"))?;

        let version = parse_version(&document.version)
            .ok_or_else(|| format!("unsupported PDF version '{}'", document.version))?;

        let pages = document
            .get_pages()
            .values()
            .map(|&id| page_size(&document, id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { version, pages })
    }

    /// Size of the 1-based page `number`.
    pub fn page(&self, number: i32) -> Option<(f64, f64)> {
        usize::try_from(number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| self.pages.get(index).copied())
    }
}

fn parse_version(version: &str) -> Option<f64> {
    let (major, minor) = version.trim().split_once('.')?;
    let major: u32 = major.parse().ok()?;
    let minor: u32 = minor.parse().ok()?;
    (minor < 10).then(|| f64::from(major * 10 + minor))
}

fn page_size(document: &Document, page: ObjectId) -> Result<(f64, f64), String> {
    let bounds = inherited(document, page, b"CropBox")?
        .or(inherited(document, page, b"MediaBox")?)
        .ok_or_else(|| format!("page {} {} has no MediaBox", page.0, page.1))?;

    let values = resolve(document, bounds)?
        .as_array()
        .map_err(|e| format!("malformed page box ({e})"))?
        .iter()
        .map(|value| number(document, value))
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [x1, y1, x2, y2] => Ok(((x2 - x1).abs(), (y2 - y1).abs())),
        _ => Err(format!("page box has {} entries instead of 4", values.len())),
    }
}

/// Look up an inheritable page attribute, walking up the `Parent` chain.
fn inherited<'a>(
    document: &'a Document,
    page: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, String> {
    let mut node: &Dictionary = document
        .get_dictionary(page)
        .map_err(|e| format!("broken page object ({e})"))?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Ok(Some(value));
        }
        let Ok(parent) = node.get(b"Parent").and_then(Object::as_reference) else {
            return Ok(None);
        };
        node = document
            .get_dictionary(parent)
            .map_err(|e| format!("broken page tree ({e})"))?;
    }

    Err("page tree is nested too deeply".to_string())
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Result<&'a Object, String> {
    let mut current = object;
    for _ in 0..MAX_TREE_DEPTH {
        match current {
            Object::Reference(id) => {
                current = document
                    .get_object(*id)
                    .map_err(|e| format!("dangling reference {} {} ({e})", id.0, id.1))?;
            }
            _ => return Ok(current),
        }
    }
    Err("reference chain is too long".to_string())
}

fn number(document: &Document, object: &Object) -> Result<f64, String> {
    match resolve(document, object)? {
        Object::Integer(value) => Ok(*value as f64),
        Object::Real(value) => Ok(f64::from(*value)),
        other => Err(format!("expected a number, found {other:?}")),
    }
}
