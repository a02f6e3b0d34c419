//! Language utilities for transcription language hints
//!
//! The engine accepts either `auto` (detect the spoken language) or one
//! code from a fixed list of ISO 639-1 codes. ISO 639-2 codes (both /T and
//! /B forms) are accepted on input and normalized to their 639-1 form.

use anyhow::{Result, anyhow};
use isolang::Language;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Keyword that asks the engine to detect the language itself
pub const AUTO_LANGUAGE: &str = "auto";

/// ISO 639-1 codes the transcription engine is known to handle well
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "nl", "ru", "zh", "ja", "ko", "ar", "hi", "pl", "tr",
    "sv", "da", "no", "fi", "uk", "cs", "el", "he", "id", "vi", "th", "ro", "hu",
];

/// Language hint handed to the transcription engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum LanguageHint {
    /// Let the engine detect the language
    #[default]
    Auto,
    /// Explicit ISO 639-1 code from `SUPPORTED_LANGUAGES`
    Code(String),
}

impl LanguageHint {
    /// The code to pass to the engine, `None` for auto-detection
    pub fn as_code(&self) -> Option<&str> {
        match self {
            Self::Auto => None,
            Self::Code(code) => Some(code.as_str()),
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    /// Whether the hint is `auto` or one of `SUPPORTED_LANGUAGES`
    pub fn is_supported(&self) -> bool {
        match self {
            Self::Auto => true,
            Self::Code(code) => SUPPORTED_LANGUAGES.contains(&code.as_str()),
        }
    }
}

impl fmt::Display for LanguageHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "{}", AUTO_LANGUAGE),
            Self::Code(code) => write!(f, "{}", code),
        }
    }
}

impl FromStr for LanguageHint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_language_hint(s)
    }
}

impl TryFrom<String> for LanguageHint {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        parse_language_hint(&value)
    }
}

impl From<LanguageHint> for String {
    fn from(hint: LanguageHint) -> Self {
        hint.to_string()
    }
}

/// Parse a user-supplied language hint
///
/// Empty input and `auto` (any case) mean auto-detection. Anything else must
/// normalize to one of `SUPPORTED_LANGUAGES`.
pub fn parse_language_hint(input: &str) -> Result<LanguageHint> {
    let trimmed = input.trim().to_lowercase();
    if trimmed.is_empty() || trimmed == AUTO_LANGUAGE {
        return Ok(LanguageHint::Auto);
    }

    let code = normalize_to_part1(&trimmed)?;
    if !SUPPORTED_LANGUAGES.contains(&code.as_str()) {
        return Err(anyhow!(
            "Unsupported language: {} (supported: auto, {})",
            input,
            SUPPORTED_LANGUAGES.join(", ")
        ));
    }

    Ok(LanguageHint::Code(code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format
pub fn normalize_to_part1(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if Language::from_639_1(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
    } else if normalized_code.len() == 3 {
        // ISO 639-2/B codes that differ from their /T form
        let part2t = match normalized_code.as_str() {
            "fre" => "fra",
            "ger" => "deu",
            "dut" => "nld",
            "gre" => "ell",
            "chi" => "zho",
            "cze" => "ces",
            "rum" => "ron",
            _ => &normalized_code,
        };

        if let Some(code_639_1) = Language::from_639_3(part2t).and_then(|lang| lang.to_639_1()) {
            return Ok(code_639_1.to_string());
        }
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Get the English language name for a hint
pub fn get_language_name(hint: &LanguageHint) -> String {
    match hint {
        LanguageHint::Auto => "Auto-detect".to_string(),
        LanguageHint::Code(code) => Language::from_639_1(code)
            .map(|lang| lang.to_name().to_string())
            .unwrap_or_else(|| code.clone()),
    }
}
