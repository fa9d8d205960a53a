//! Fixed vocabulary of the document heuristics.
//!
//! Everything here is tied to the one supported locale (Turkish student
//! certificates issued through the national e-government portal).

/// The only accepted upload type.
pub const ACCEPTED_MIME: &str = "application/pdf";

/// Upload ceiling (5 MiB).
pub const MAX_DOCUMENT_BYTES: u64 = 5 * 1024 * 1024;

/// Producer/Creator tokens of image and design editors. Matched against the
/// lower-cased metadata strings.
pub const EDITING_TOOL_DENYLIST: &[&str] = &[
    "photoshop",
    "illustrator",
    "canva",
    "gimp",
    "paint",
    "corel",
    "inkscape",
    "affinity",
    "pixelmator",
    "photopea",
];

/// All of these must appear (exact substring) unless a registry or portal marker is present.
pub const REQUIRED_PHRASES: &[&str] = &["Öğrenci Belgesi", "Sorgulama Kodu"];

/// National higher-education registry keyword.
pub const REGISTRY_KEYWORD: &str = "YÖKSİS";

/// Government portal domain printed on verifiable documents.
pub const PORTAL_DOMAIN: &str = "turkiye.gov.tr";

/// Keyword every institution name on the document ends with.
pub const INSTITUTION_SUFFIX: &str = "ÜNİVERSİTESİ";

/// Section labels a greedy institution match may swallow as a prefix.
/// Longer forms first so the cut lands after the full label.
pub const SECTION_LABELS: &[&str] = &[
    "PROGRAMI",
    "PROGRAM",
    "SINIFI",
    "SINIF",
    "BÖLÜMÜ",
    "BÖLÜM",
    "FAKÜLTESİ",
    "FAKÜLTE",
    "BİRİMİ",
    "BELGESİ",
];

/// Words that end a department name (Engineering / Teaching / Faculty).
pub const DEPARTMENT_SUFFIXES: &[&str] = &["Mühendisliği", "Öğretmenliği", "Fakültesi"];
