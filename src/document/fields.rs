//! Field Extractor
//!
//! Pattern-based extraction of institution, department and class/year from
//! the unstructured text layer of a student certificate. Each extractor is a
//! pure function returning `None` when its pattern does not fire; nothing
//! here fails or panics on arbitrary input.
//!
//! The source documents are not standardised, so these are heuristics, not a
//! grammar. Known failure modes are listed on each function.

use campus_types::{collapse_whitespace, VerificationClaim};
use regex::Regex;
use std::sync::LazyLock;

use super::vocabulary::{DEPARTMENT_SUFFIXES, INSTITUTION_SUFFIX, SECTION_LABELS};

// =============================================================================
// PATTERNS
// =============================================================================

/// Upper-case run (3-60 chars, locale accents included) directly before the suffix
static INSTITUTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"([A-ZÇĞİÖŞÜÂÎÛ\s]{{3,60}}){}",
        regex::escape(INSTITUTION_SUFFIX)
    ))
    .expect("institution pattern compiles")
});

/// "Program : <value> Sınıf"
static DEPARTMENT_LABELED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Program\w*\s*:\s*(.{2,120}?)\s*(?:Sınıf|SINIF|Sinif)")
        .expect("labeled department pattern compiles")
});

/// Capitalised words ending in a department suffix
static DEPARTMENT_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    let suffixes: Vec<String> = DEPARTMENT_SUFFIXES.iter().map(|s| regex::escape(s)).collect();
    Regex::new(&format!(
        r"((?:[A-ZÇĞİÖŞÜ][a-zçğıöşüâîû]+[ \t]+){{1,4}}(?:{}))",
        suffixes.join("|")
    ))
    .expect("department suffix pattern compiles")
});

/// "Sınıf : <digits>"
static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Sınıf|SINIF|Sinif)\w*\s*:\s*(\d{1,2})").expect("class pattern compiles")
});

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Institution name, e.g. `ANKARA YILDIRIM BEYAZIT ÜNİVERSİTESİ`.
///
/// Takes the longest upper-case run before the suffix keyword and cuts it
/// after the last section label it swallowed. Failure modes: names printed
/// in title case are missed; two institution names on one page yield the
/// first; an upper-case heading with no label between it and the name is
/// kept as part of the name.
pub fn institution(text: &str) -> Option<String> {
    let caps = INSTITUTION_RE.captures(text)?;
    let run = caps.get(1)?.as_str();

    let cut = SECTION_LABELS
        .iter()
        .filter_map(|label| run.rfind(label).map(|at| at + label.len()))
        .max()
        .unwrap_or(0);

    let name = collapse_whitespace(run.get(cut..)?);
    if name.chars().count() < 2 {
        return None;
    }
    Some(format!("{} {}", name, INSTITUTION_SUFFIX))
}

/// Department / programme name.
///
/// Prefers the labelled `Program : … Sınıf` field; otherwise the first run
/// of capitalised words ending in a department suffix. Failure modes:
/// all-caps department names are missed by the fallback; a label spelled
/// differently than `Program…` falls through to the fallback.
pub fn department(text: &str) -> Option<String> {
    let labeled = DEPARTMENT_LABELED_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| collapse_whitespace(m.as_str()))
        .filter(|value| !value.is_empty());

    labeled.or_else(|| {
        DEPARTMENT_SUFFIX_RE
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| collapse_whitespace(m.as_str()))
    })
}

/// Class/year digits from the labelled `Sınıf : N` field.
///
/// Failure mode: "Hazırlık" (preparatory year) and other non-numeric
/// values yield `None`.
pub fn class_year(text: &str) -> Option<String> {
    CLASS_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Run all three extractors over one text layer.
pub fn extract_claim(text: &str) -> VerificationClaim {
    VerificationClaim::new(institution(text), department(text), class_year(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CERTIFICATE: &str = "T.C.\n\
        ANKARA YILDIRIM BEYAZIT ÜNİVERSİTESİ\n\
        Öğrenci Belgesi\n\
        Adı Soyadı : Ahmet Yılmaz\n\
        Program : Bilgisayar Mühendisliği Sınıf : 3\n\
        Sorgulama Kodu : AB12CD34";

    #[test]
    fn test_certificate_fields() {
        assert_eq!(
            institution(CERTIFICATE).as_deref(),
            Some("ANKARA YILDIRIM BEYAZIT ÜNİVERSİTESİ")
        );
        assert_eq!(department(CERTIFICATE).as_deref(), Some("Bilgisayar Mühendisliği"));
        assert_eq!(class_year(CERTIFICATE).as_deref(), Some("3"));
    }

    #[test]
    fn test_institution_strips_swallowed_label() {
        let text = "ÖĞRENCİ BELGESİ\nGAZİ ÜNİVERSİTESİ";
        assert_eq!(institution(text).as_deref(), Some("GAZİ ÜNİVERSİTESİ"));
    }

    #[test]
    fn test_institution_label_only_is_none() {
        assert_eq!(institution("PROGRAM ÜNİVERSİTESİ"), None);
    }

    #[test]
    fn test_institution_title_case_is_missed() {
        assert_eq!(institution("Ankara Yıldırım Beyazıt Üniversitesi"), None);
    }

    #[test]
    fn test_department_fallback_on_suffix() {
        let text = "Kaydı devam eden öğrenci Fen Bilgisi Öğretmenliği programındadır.";
        assert_eq!(department(text).as_deref(), Some("Fen Bilgisi Öğretmenliği"));
    }

    #[test]
    fn test_department_labeled_across_lines() {
        let text = "Programı : Elektrik-Elektronik\nMühendisliği\nSınıfı : 2";
        assert_eq!(
            department(text).as_deref(),
            Some("Elektrik-Elektronik Mühendisliği")
        );
        assert_eq!(class_year(text).as_deref(), Some("2"));
    }

    #[test]
    fn test_class_non_numeric() {
        assert_eq!(class_year("Sınıf : Hazırlık"), None);
    }

    #[test]
    fn test_empty_text() {
        let claim = extract_claim("");
        assert_eq!(claim.institution_name_raw(), None);
        assert_eq!(claim.department(), None);
        assert_eq!(claim.class_year(), None);
    }

    proptest! {
        #[test]
        fn prop_extractors_never_fail(text in "\\PC{0,400}") {
            for value in [institution(&text), department(&text), class_year(&text)].into_iter().flatten() {
                prop_assert!(!value.trim().is_empty());
            }
        }

        #[test]
        fn prop_class_is_digits(n in 1u8..=8, filler in "[a-z ]{0,40}") {
            let text = format!("{} Sınıf : {}", filler, n);
            prop_assert_eq!(class_year(&text), Some(n.to_string()));
        }
    }
}
