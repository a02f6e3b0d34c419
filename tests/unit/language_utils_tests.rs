/*!
 * Tests for language hint parsing
 */

use subtitle_forge::language_utils::{LanguageHint, get_language_name, normalize_to_part1, parse_language_hint};

/// Test the spellings that mean auto-detection
#[test]
fn test_parse_language_hint_withAutoSpellings_shouldReturnAuto() {
    for input in ["auto", "AUTO", " Auto ", ""] {
        assert_eq!(parse_language_hint(input).unwrap(), LanguageHint::Auto, "input={:?}", input);
    }
}

/// Test that 639-1 and 639-2 (both /T and /B) codes normalize to 639-1
#[test]
fn test_parse_language_hint_withIsoCodes_shouldNormalizeToPart1() {
    let expected = LanguageHint::Code("fr".to_string());
    assert_eq!(parse_language_hint("fr").unwrap(), expected);
    assert_eq!(parse_language_hint("FRA").unwrap(), expected);
    assert_eq!(parse_language_hint("fre").unwrap(), expected);
    assert_eq!(parse_language_hint("ger").unwrap(), LanguageHint::Code("de".to_string()));
}

/// Test that real but unsupported languages are rejected
#[test]
fn test_parse_language_hint_withUnsupportedLanguage_shouldFail() {
    // Zulu is a valid ISO code but not in the supported list
    assert!(parse_language_hint("zu").is_err());
    assert!(parse_language_hint("klingon").is_err());
}

/// Test normalization of malformed codes
#[test]
fn test_normalize_to_part1_withInvalidCodes_shouldFail() {
    assert!(normalize_to_part1("xx").is_err());
    assert!(normalize_to_part1("e").is_err());
    assert!(normalize_to_part1("english").is_err());
}

/// Test the engine-facing view of a hint
#[test]
fn test_languageHint_asCode_shouldBeNoneForAuto() {
    assert_eq!(LanguageHint::Auto.as_code(), None);
    assert_eq!(LanguageHint::Code("ja".to_string()).as_code(), Some("ja"));
    assert!(LanguageHint::Code("ja".to_string()).is_supported());
    assert!(!LanguageHint::Code("zu".to_string()).is_supported());
}

/// Test that hints survive a config file round trip as plain strings
#[test]
fn test_languageHint_serde_shouldUsePlainStrings() {
    assert_eq!(serde_json::to_string(&LanguageHint::Auto).unwrap(), "\"auto\"");
    let hint: LanguageHint = serde_json::from_str("\"eng\"").unwrap();
    assert_eq!(hint, LanguageHint::Code("en".to_string()));
}

/// Test human readable names
#[test]
fn test_get_language_name_withHints_shouldReturnEnglishNames() {
    assert_eq!(get_language_name(&LanguageHint::Auto), "Auto-detect");
    assert_eq!(get_language_name(&LanguageHint::Code("de".to_string())), "German");
}
