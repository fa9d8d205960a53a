//! Document ingestion: container reading, authenticity and content
//! heuristics, and field extraction.

pub mod analyzer;
pub mod fields;
pub mod pdf;
pub mod vocabulary;

pub use analyzer::{DocumentAnalyzer, DocumentUpload, RejectionReason};
pub use pdf::{DocumentContents, DocumentReader, PdfReader, ReadError};
