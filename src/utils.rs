//! Surface-form normalization helpers shared by the extraction stage.
//!
//! Case folding and ASCII folding are locale-independent so that dedup
//! decisions are identical on every machine that builds the indexes.

use crate::config::NormalizationOptions;
use crate::errors::InstallError;
use crate::types::SurfaceForm;

#[cfg(feature = "unicode")]
use unicode_normalization::UnicodeNormalization;
#[cfg(feature = "unicode")]
use unicode_normalization::char::is_combining_mark;

/// True when this build can transliterate surface forms to ASCII.
pub const fn ascii_folding_available() -> bool {
    cfg!(feature = "unicode")
}

/// Unicode lowercase mapping (no locale tailoring).
pub fn fold_case<T: AsRef<str>>(text: T) -> String {
    text.as_ref().to_lowercase()
}

/// Best-effort transliteration to the nearest ASCII representation.
///
/// Compatibility decomposition strips accents and expands ligatures, then
/// `deunicode` transliterates what is left (Greek, Cyrillic, CJK, typographic
/// punctuation). Characters without a transliteration are dropped. The output
/// is pure ASCII, so folding twice gives the same result as folding once.
#[cfg(feature = "unicode")]
pub fn ascii_fold<T: AsRef<str>>(text: T) -> String {
    let decomposed: String = text
        .as_ref()
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect();
    deunicode::deunicode_with_tofu(&decomposed, "")
}

/// Apply trim, optional case folding, and optional ASCII folding in that order.
///
/// Fails with `UnicodeNormalizationUnavailable` when ASCII folding is requested
/// in a build compiled without the `unicode` feature.
pub fn normalize_surface_form(
    raw: &str,
    options: NormalizationOptions,
) -> Result<SurfaceForm, InstallError> {
    let mut text = raw.trim().to_string();
    if options.lowercase {
        text = fold_case(&text);
    }
    if options.normalize_unicode {
        text = ascii_fold_checked(&text)?;
        // dropped characters may leave edge whitespace behind
        let trimmed = text.trim();
        if trimmed.len() != text.len() {
            text = trimmed.to_string();
        }
    }
    Ok(text)
}

#[cfg(feature = "unicode")]
fn ascii_fold_checked(text: &str) -> Result<String, InstallError> {
    Ok(ascii_fold(text))
}

#[cfg(not(feature = "unicode"))]
fn ascii_fold_checked(_text: &str) -> Result<String, InstallError> {
    Err(InstallError::UnicodeNormalizationUnavailable)
}
