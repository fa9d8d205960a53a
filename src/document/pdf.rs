//! Document container reading
//!
//! Pulls the two things the heuristics need out of an upload: the
//! Producer/Creator metadata strings and the text layer of the first page.
//! No OCR; a scanned image without a text layer yields empty text.

use lopdf::{Dictionary, Document, Object};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Unreadable PDF container: {0}")]
    Container(#[from] lopdf::Error),

    #[error("Document has no pages")]
    NoPages,
}

/// What the analyzer sees of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentContents {
    pub producer: Option<String>,
    pub creator: Option<String>,
    pub first_page_text: String,
}

impl DocumentContents {
    /// Metadata strings that are present
    pub fn metadata(&self) -> impl Iterator<Item = &str> {
        self.producer.iter().chain(self.creator.iter()).map(String::as_str)
    }
}

/// Parses raw upload bytes. Runs on a blocking thread.
pub trait DocumentReader: Send + Sync {
    fn read(&self, bytes: &[u8]) -> Result<DocumentContents, ReadError>;
}

/// `lopdf`-backed reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfReader;

impl DocumentReader for PdfReader {
    fn read(&self, bytes: &[u8]) -> Result<DocumentContents, ReadError> {
        let doc = Document::load_mem(bytes)?;

        let info = info_dictionary(&doc);
        let producer = info.and_then(|dict| text_entry(dict, b"Producer"));
        let creator = info.and_then(|dict| text_entry(dict, b"Creator"));

        let first_page = doc
            .get_pages()
            .keys()
            .next()
            .copied()
            .ok_or(ReadError::NoPages)?;

        let first_page_text = match doc.extract_text(&[first_page]) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "No readable text layer on first page");
                String::new()
            }
        };

        Ok(DocumentContents {
            producer,
            creator,
            first_page_text,
        })
    }
}

/// The trailer's Info dictionary, direct or referenced.
fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn text_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => {
            let text = decode_text_string(bytes);
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    }
}

/// PDF text strings: UTF-16BE when prefixed with a BOM, otherwise one byte
/// per character (PDFDocEncoding, close enough to Latin-1 for tool names).
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// One blank A4 page with the given Producer.
#[cfg(test)]
pub(crate) fn blank_pdf(producer: &str) -> Vec<u8> {
    use lopdf::{dictionary, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::string_literal(producer),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("in-memory save");
    bytes
}
