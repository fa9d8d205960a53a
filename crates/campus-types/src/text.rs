//! Locale text folding
//!
//! Institution names arrive in every casing the target locale allows:
//! "YILDIRIM" on the document, "Yıldırım" in the roster, "ybu" in the mail
//! domain. Plain `to_lowercase` maps `I` to `i` and `İ` to `i\u{307}`, so the
//! two spellings never meet. Folding removes case and the locale's accents
//! in one pass.

/// Lower-case `input` and fold the locale's accented letters to ASCII.
///
/// Characters outside the fixed table are lower-cased with the default
/// Unicode rules.
pub fn fold_locale(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            'İ' | 'I' | 'ı' | 'i' | 'Î' | 'î' => out.push('i'),
            'Ç' | 'ç' => out.push('c'),
            'Ğ' | 'ğ' => out.push('g'),
            'Ö' | 'ö' => out.push('o'),
            'Ş' | 'ş' => out.push('s'),
            'Ü' | 'ü' | 'Û' | 'û' => out.push('u'),
            'Â' | 'â' => out.push('a'),
            // combining dot above, left over from a decomposed `İ`
            '\u{0307}' => {}
            other => out.extend(other.to_lowercase()),
        }
    }
    out
}

/// Collapse every run of whitespace (including newlines) into one space and trim.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Email in loggable form: first character of the local part, then `***`.
/// Input without an `@` is masked entirely.
pub fn mask_email(email: &str) -> String {
    match email.trim().split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        None => "***".to_string(),
    }
}
