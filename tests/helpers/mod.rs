//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use campus_client::memory::{MemoryIdentityProvider, MemoryRemoteFunctions, MemoryRosterStore};
use campus_types::{Institution, MembershipGroup};
use campus_verify::document::{DocumentContents, DocumentReader, DocumentUpload, ReadError};
use campus_verify::{VerificationFlow, VerifyContext};
use lopdf::{dictionary, Document, Object, Stream};

pub const EMAIL: &str = "ahmet@aybu.edu.tr";

pub const AYBU_CERTIFICATE: &str = "T.C.\n\
    ANKARA YILDIRIM BEYAZIT ÜNİVERSİTESİ\n\
    Öğrenci Belgesi\n\
    Adı Soyadı : Ahmet Yılmaz\n\
    Program : Bilgisayar Mühendisliği Sınıf : 3\n\
    Sorgulama Kodu : AB12CD34\n\
    Belgeyi turkiye.gov.tr adresinden doğrulayabilirsiniz.";

pub const UNKNOWN_CERTIFICATE: &str = "T.C.\n\
    ATLANTİS ÜNİVERSİTESİ\n\
    Öğrenci Belgesi\n\
    Program : Tarih Sınıf : 2\n\
    Sorgulama Kodu : ZZ99ZZ99";

/// Reader returning fixed text and metadata
pub struct FixedReader {
    pub producer: Option<String>,
    pub text: String,
}

impl FixedReader {
    pub fn text(text: &str) -> Arc<Self> {
        Arc::new(Self {
            producer: Some("e-Devlet Kapısı".to_string()),
            text: text.to_string(),
        })
    }
}

impl DocumentReader for FixedReader {
    fn read(&self, _bytes: &[u8]) -> Result<DocumentContents, ReadError> {
        Ok(DocumentContents {
            producer: self.producer.clone(),
            creator: None,
            first_page_text: self.text.clone(),
        })
    }
}

pub struct Harness {
    pub identity: Arc<MemoryIdentityProvider>,
    pub functions: Arc<MemoryRemoteFunctions>,
    pub roster: Arc<MemoryRosterStore>,
    pub institution: Institution,
    pub group: MembershipGroup,
}

impl Harness {
    /// Signed-in user, roster seeded with AYBU and one group
    pub fn new() -> Self {
        Self::with_functions(MemoryRemoteFunctions::new())
    }

    pub fn with_functions(functions: MemoryRemoteFunctions) -> Self {
        let roster = Arc::new(MemoryRosterStore::new());
        let institution = roster.add_institution("Ankara Yıldırım Beyazıt Üniversitesi");
        let group = roster.add_group(institution.id, "AYBU Kampüs");
        roster.add_institution("Gazi Üniversitesi");

        Self {
            identity: Arc::new(MemoryIdentityProvider::signed_in(EMAIL)),
            functions: Arc::new(functions),
            roster,
            institution,
            group,
        }
    }

    pub fn context(&self) -> VerifyContext {
        VerifyContext::in_memory(
            self.identity.clone(),
            self.functions.clone(),
            self.roster.clone(),
        )
    }

    pub fn flow(&self, document_text: &str) -> VerificationFlow {
        VerificationFlow::with_reader(self.context(), FixedReader::text(document_text))
    }

    pub fn user_id(&self) -> uuid::Uuid {
        self.identity.user_id().expect("harness user is signed in")
    }

    /// Code mailed to `email` by the last send
    pub fn mailed_code(&self, email: &str) -> String {
        self.functions
            .pending_code(email)
            .expect("a code was sent")
    }
}

pub fn pdf_upload() -> DocumentUpload {
    DocumentUpload::new(b"%PDF-1.5 fixture".to_vec(), "application/pdf")
}

/// A one-page PDF with `producer` in its Info dictionary
pub fn pdf_with_producer(producer: &str) -> Vec<u8> {
    pdf_with_metadata(producer, "Microsoft Word")
}

/// A one-page PDF with both Info dictionary tool entries set
pub fn pdf_with_metadata(producer: &str, creator: &str) -> Vec<u8> {
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
        "Creator" => Object::string_literal(creator),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("in-memory save");
    bytes
}
