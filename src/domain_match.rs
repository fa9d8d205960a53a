//! Domain Matcher
//!
//! Gate between a claimed institution and the email address a user offers
//! for OTP. A heuristic allow-list, not a registry lookup: an institution
//! whose mail domain shares nothing with its name and is missing from
//! [`KNOWN_DOMAIN_PAIRS`] is rejected (false negative).

use campus_types::fold_locale;

/// National academic mail suffix
pub const ACADEMIC_SUFFIX: &str = ".edu.tr";

/// Student mailbox subdomain labels (`x@ogr.aybu.edu.tr`). Never taken as
/// the institution label.
pub const STUDENT_SUBDOMAINS: &[&str] = &["ogr", "ogrenci", "std", "student", "stu"];

/// (folded institution-name fragment, institution label) pairs for
/// institutions whose domain is an acronym or an English name. The label
/// must equal the one directly before the academic suffix.
pub const KNOWN_DOMAIN_PAIRS: &[(&str, &str)] = &[
    ("ankara yildirim beyazit", "aybu"),
    ("ankara yildirim beyazit", "ybu"),
    ("orta dogu teknik", "metu"),
    ("orta dogu teknik", "odtu"),
    ("bogazici", "boun"),
    ("istanbul teknik", "itu"),
    ("dokuz eylul", "deu"),
    ("karadeniz teknik", "ktu"),
    ("gebze teknik", "gtu"),
    ("izmir yuksek teknoloji", "iyte"),
    ("ihsan dogramaci bilkent", "bilkent"),
    ("sabanci", "sabanciuniv"),
    ("koc universitesi", "ku"),
    ("tobb ekonomi ve teknoloji", "etu"),
];

/// Shortest domain label accepted for the substring test
const MIN_LABEL_LEN: usize = 2;

/// Does `email`'s domain plausibly belong to `institution`?
pub fn matches(email: &str, institution: &str) -> bool {
    let Some(host) = institution_host(email) else {
        return false;
    };
    let Some(label) = institution_label(&host) else {
        return false;
    };

    let name = fold_locale(institution);
    let label = fold_locale(label);

    if label.chars().count() >= MIN_LABEL_LEN && name.contains(&label) {
        return true;
    }

    KNOWN_DOMAIN_PAIRS
        .iter()
        .any(|(name_fragment, pair_label)| name.contains(name_fragment) && label == *pair_label)
}

/// Domain of `email` without the academic suffix, lower-cased.
/// `None` when the address is malformed or not academic.
fn institution_host(email: &str) -> Option<String> {
    let (local, domain) = email.trim().rsplit_once('@')?;
    if local.is_empty() {
        return None;
    }
    let domain = domain.to_ascii_lowercase();
    let host = domain.strip_suffix(ACADEMIC_SUFFIX)?;
    (!host.is_empty()).then(|| host.to_string())
}

/// Label directly before the academic suffix. Department and student
/// subdomains in front of it are ignored.
fn institution_label(host: &str) -> Option<&str> {
    let label = host.rsplit('.').next().filter(|l| !l.is_empty())?;
    (!STUDENT_SUBDOMAINS.contains(&label)).then_some(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const AYBU: &str = "ANKARA YILDIRIM BEYAZIT ÜNİVERSİTESİ";

    #[test]
    fn test_acronym_domain_via_pair_table() {
        assert!(matches("ahmet@aybu.edu.tr", AYBU));
    }

    #[test]
    fn test_label_inside_name() {
        assert!(matches("ayse@hacettepe.edu.tr", "HACETTEPE ÜNİVERSİTESİ"));
        assert!(matches("ali@gazi.edu.tr", "Gazi Üniversitesi"));
    }

    #[test]
    fn test_accented_name_folds() {
        assert!(matches("x@ege.edu.tr", "EGE ÜNİVERSİTESİ"));
        assert!(matches("x@bogazici.edu.tr", "BOĞAZİÇİ ÜNİVERSİTESİ"));
        assert!(matches("x@boun.edu.tr", "BOĞAZİÇİ ÜNİVERSİTESİ"));
    }

    #[test]
    fn test_student_subdomain_skipped() {
        assert!(matches("ahmet@ogr.aybu.edu.tr", AYBU));
        assert!(matches("x@ogrenci.gazi.edu.tr", "GAZİ ÜNİVERSİTESİ"));
        assert!(!matches("x@ogr.edu.tr", AYBU));
    }

    #[test]
    fn test_non_academic_rejected() {
        assert!(!matches("ahmet@gmail.com", AYBU));
        assert!(!matches("ahmet@aybu.edu", AYBU));
        assert!(!matches("ahmet@edu.tr", AYBU));
    }

    #[test]
    fn test_other_institution_rejected() {
        assert!(!matches("x@metu.edu.tr", "HACETTEPE ÜNİVERSİTESİ"));
        assert!(!matches("x@ku.edu.tr", "KOCAELİ ÜNİVERSİTESİ"));
    }

    #[test]
    fn test_pair_label_must_match_exactly() {
        let koc = "KOÇ ÜNİVERSİTESİ";
        let tobb = "TOBB EKONOMİ VE TEKNOLOJİ ÜNİVERSİTESİ";
        assert!(matches("x@ku.edu.tr", koc));
        assert!(!matches("x@kku.edu.tr", koc));
        assert!(matches("x@etu.edu.tr", tobb));
        assert!(!matches("ali@metu.edu.tr", tobb));
        assert!(!matches("x@notybu.edu.tr", AYBU));
        assert!(matches("x@ybu.edu.tr", AYBU));
    }

    #[test]
    fn test_only_label_before_suffix_counts() {
        assert!(!matches("x@ybu.evil.edu.tr", AYBU));
        assert!(!matches("x@aybu.gazi.edu.tr", AYBU));
        assert!(matches("x@ceng.metu.edu.tr", "ORTA DOĞU TEKNİK ÜNİVERSİTESİ"));
    }

    #[test]
    fn test_malformed_email() {
        assert!(!matches("no-at-sign", AYBU));
        assert!(!matches("@aybu.edu.tr", AYBU));
        assert!(!matches("", AYBU));
    }

    #[test]
    fn test_case_insensitive_domain() {
        assert!(matches("Ahmet@AYBU.EDU.TR", AYBU));
    }

    proptest! {
        #[test]
        fn prop_non_academic_never_matches(
            local in "[a-z0-9.]{1,12}",
            domain in "[a-z0-9-]{1,20}\\.(com|org|net|edu|gov\\.tr|com\\.tr)",
            institution in "\\PC{0,60}",
        ) {
            let email = format!("{}@{}", local, domain);
            prop_assert!(!matches(&email, &institution));
        }
    }
}
