//! Document Analyzer
//!
//! Turns an uploaded student certificate into a [`VerificationClaim`], or a
//! [`RejectionReason`]. Checks run in a fixed order and stop at the first
//! failure:
//!
//! 1. Preconditions (type, size). Content is never opened on failure.
//! 2. Container parse on a blocking thread.
//! 3. Forgery heuristic on Producer/Creator. Runs before any text check.
//! 4. Content heuristic on the NFC-normalised first-page text.
//! 5. Field extraction.
//!
//! Missing metadata passes step 3. That is a known weakness of a metadata
//! denylist, not something this module tries to paper over.

use std::sync::Arc;

use campus_types::VerificationClaim;
use thiserror::Error;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

use super::fields;
use super::pdf::{DocumentReader, PdfReader};
use super::vocabulary::{
    EDITING_TOOL_DENYLIST, PORTAL_DOMAIN, REGISTRY_KEYWORD, REQUIRED_PHRASES,
};
use crate::config::DocumentConfig;

/// Why an upload was refused. Terminal for that upload; the user retries
/// with a different file.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("Invalid document format: {0}")]
    InvalidFormat(String),

    #[error("Suspected forgery: document metadata names editing tool '{tool}'")]
    SuspectedForgery { tool: String },

    #[error("Document content does not look like a student certificate")]
    ContentMismatch,
}

impl RejectionReason {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "Lütfen 5 MB'ı geçmeyen bir PDF dosyası yükleyin.",
            Self::SuspectedForgery { .. } => {
                "Belge bir düzenleme programıyla oluşturulmuş görünüyor. Lütfen e-Devlet'ten indirdiğiniz orijinal belgeyi yükleyin."
            }
            Self::ContentMismatch => {
                "Bu belge bir öğrenci belgesi gibi görünmüyor. Lütfen e-Devlet Öğrenci Belgesi yükleyin."
            }
        }
    }
}

/// One uploaded file
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl DocumentUpload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        let size_bytes = bytes.len() as u64;
        Self {
            bytes,
            mime_type: mime_type.into(),
            size_bytes,
        }
    }
}

pub struct DocumentAnalyzer {
    reader: Arc<dyn DocumentReader>,
    limits: DocumentConfig,
}

impl DocumentAnalyzer {
    pub fn new(limits: DocumentConfig) -> Self {
        Self::with_reader(Arc::new(PdfReader), limits)
    }

    pub fn with_reader(reader: Arc<dyn DocumentReader>, limits: DocumentConfig) -> Self {
        Self { reader, limits }
    }

    pub async fn analyze(&self, upload: DocumentUpload) -> Result<VerificationClaim, RejectionReason> {
        self.check_preconditions(&upload)?;

        let reader = Arc::clone(&self.reader);
        let bytes = upload.bytes;
        let contents = tokio::task::spawn_blocking(move || reader.read(&bytes))
            .await
            .map_err(|e| {
                warn!(error = %e, "Document read task failed");
                RejectionReason::InvalidFormat("document could not be read".to_string())
            })?
            .map_err(|e| {
                debug!(error = %e, "Document container rejected");
                RejectionReason::InvalidFormat(e.to_string())
            })?;

        if let Some(tool) = forgery_marker(contents.metadata()) {
            info!(tool = %tool, "Document rejected: editing tool in metadata");
            return Err(RejectionReason::SuspectedForgery { tool });
        }

        let text: String = contents.first_page_text.nfc().collect();
        if !content_matches(&text) {
            info!(text_len = text.len(), "Document rejected: content mismatch");
            return Err(RejectionReason::ContentMismatch);
        }

        let claim = fields::extract_claim(&text);
        info!(
            institution = claim.institution_display(),
            department = claim.department_display(),
            class_year = claim.class_year_display(),
            "Document accepted"
        );
        Ok(claim)
    }

    fn check_preconditions(&self, upload: &DocumentUpload) -> Result<(), RejectionReason> {
        if upload.mime_type != self.limits.accepted_mime {
            return Err(RejectionReason::InvalidFormat(format!(
                "unsupported type {}",
                upload.mime_type
            )));
        }
        // Declared size never undercuts the buffer actually held
        let size = upload.size_bytes.max(upload.bytes.len() as u64);
        if size > self.limits.max_bytes {
            return Err(RejectionReason::InvalidFormat(format!(
                "{} bytes exceeds limit of {}",
                size, self.limits.max_bytes
            )));
        }
        Ok(())
    }
}

/// First denylisted tool token found in any metadata string, case-insensitive.
pub fn forgery_marker<'a>(metadata: impl IntoIterator<Item = &'a str>) -> Option<String> {
    metadata.into_iter().find_map(|value| {
        let lowered = value.to_lowercase();
        EDITING_TOOL_DENYLIST
            .iter()
            .find(|tool| lowered.contains(*tool))
            .map(|tool| tool.to_string())
    })
}

/// All required phrases, or the registry keyword, or the portal domain.
pub fn content_matches(text: &str) -> bool {
    REQUIRED_PHRASES.iter().all(|phrase| text.contains(phrase))
        || text.contains(REGISTRY_KEYWORD)
        || text.contains(PORTAL_DOMAIN)
}
