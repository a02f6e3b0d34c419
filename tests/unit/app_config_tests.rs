/*!
 * Tests for application configuration
 */

use anyhow::Result;
use subtitle_forge::app_config::{Config, LogLevel};
use subtitle_forge::language_utils::LanguageHint;
use subtitle_forge::segmentation::SegmentationPolicy;
use crate::common;

/// Test the defaults of a fresh config
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.conversion.words_per_cue, 8);
    assert_eq!(config.conversion.frame_rate, 25.0);
    assert!(!config.conversion.natural_segmentation);
    assert_eq!(config.conversion.input_language, LanguageHint::Auto);
    assert_eq!(config.engine.whisper_binary, "whisper");
    assert_eq!(config.engine.timeout(), None);
    assert_eq!(config.normalizer.ffmpeg_binary, "ffmpeg");
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

/// Test that the conversion section becomes job options
#[test]
fn test_conversion_toOptions_shouldCarryEveryField() {
    let mut config = Config::default();
    config.conversion.words_per_cue = 3;
    config.conversion.natural_segmentation = true;
    config.conversion.input_language = LanguageHint::Code("es".to_string());

    let options = config.conversion.to_options();

    assert_eq!(options.words_per_cue, 3);
    assert_eq!(options.policy(), SegmentationPolicy::Natural);
    assert_eq!(options.input_language.as_code(), Some("es"));
}

/// Test validation against out-of-range values
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    config.conversion.frame_rate = 0.0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.conversion.frame_rate = f64::NAN;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.engine.whisper_binary = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.normalizer.ffmpeg_binary = String::new();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.engine.timeout_secs = Some(30);
    assert!(config.validate().is_ok());
}

/// Test that a saved config loads back unchanged
#[test]
fn test_config_save_withCustomValues_shouldReloadSameValues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let mut config = Config::default();
    config.conversion.words_per_cue = 5;
    config.engine.model = "small".to_string();
    config.scratch.result_ttl_secs = 42;
    config.save(&path)?;

    let (reloaded, created) = Config::load_or_create(&path)?;
    assert!(!created);
    assert_eq!(reloaded.conversion.words_per_cue, 5);
    assert_eq!(reloaded.engine.model, "small");
    assert_eq!(reloaded.scratch.result_ttl().as_secs(), 42);
    Ok(())
}

/// Test that a corrupt config file is reported rather than replaced
#[test]
fn test_load_or_create_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(&temp_dir.path().to_path_buf(), "conf.json", "{ not json")?;

    assert!(Config::load_or_create(&path).is_err());
    assert_eq!(std::fs::read_to_string(&path)?, "{ not json");
    Ok(())
}
