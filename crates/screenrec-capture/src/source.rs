//! Source list filtering and display-name normalization.

use screenrec_ipc::{SourceInfo, SourceKind};

/// Localized spellings the platform uses for the primary full-screen
/// source, across the supported UI languages.
const FULL_SCREEN_SYNONYMS: &[&str] = &[
    "Tam Ekran",
    "Tam ekran",
    "Tüm Ekran",
    "Tüm ekran",
    "Entire Screen",
    "Full Screen",
];

/// Canonical full-screen display name for the active UI language.
pub fn canonical_full_screen_name(language: &str) -> &'static str {
    if language == "tr" {
        "Tam Ekran"
    } else {
        "Full Screen"
    }
}

/// Rewrite a recognized full-screen synonym to the canonical name for the
/// active UI language. Other names pass through unchanged.
pub fn normalize_source_name(name: &str, language: &str) -> String {
    if FULL_SCREEN_SYNONYMS.contains(&name) {
        canonical_full_screen_name(language).to_string()
    } else {
        name.to_string()
    }
}

/// Filter an enumeration by kind tag and normalize display names for the
/// active UI language.
pub fn localized_sources(
    sources: Vec<SourceInfo>,
    kind: SourceKind,
    language: &str,
) -> Vec<SourceInfo> {
    sources
        .into_iter()
        .filter(|source| kind.matches_id(&source.id))
        .map(|mut source| {
            source.name = normalize_source_name(&source.name, language);
            source
        })
        .collect()
}
