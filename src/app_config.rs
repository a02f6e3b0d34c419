use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::language_utils::LanguageHint;
use crate::supervisor::ConversionOptions;

/// Application configuration module
///
/// Loading, validating and saving the converter settings. Every section is
/// optional in the JSON file; missing fields take their defaults.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Default job options
    #[serde(default)]
    pub conversion: ConversionConfig,

    /// Transcription engines
    #[serde(default)]
    pub engine: EngineConfig,

    /// Audio normalizer
    #[serde(default)]
    pub normalizer: NormalizerConfig,

    /// Scratch files and result retention
    #[serde(default)]
    pub scratch: ScratchConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Default options applied to every job
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConversionConfig {
    // @field: Words per cue (word-count policy)
    #[serde(default = "default_words_per_cue")]
    pub words_per_cue: usize,

    // @field: Frame rate carried to downstream consumers
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,

    // @field: Use the engine's utterance boundaries
    #[serde(default)]
    pub natural_segmentation: bool,

    // @field: Spoken language hint ("auto" or ISO 639-1)
    #[serde(default)]
    pub input_language: LanguageHint,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            words_per_cue: default_words_per_cue(),
            frame_rate: default_frame_rate(),
            natural_segmentation: false,
            input_language: LanguageHint::Auto,
        }
    }
}

impl ConversionConfig {
    /// Job options built from these defaults
    pub fn to_options(&self) -> ConversionOptions {
        ConversionOptions {
            words_per_cue: self.words_per_cue,
            frame_rate: self.frame_rate,
            natural_segmentation: self.natural_segmentation,
            input_language: self.input_language.clone(),
        }
    }
}

/// Transcription engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    // @field: whisper command line binary (primary path)
    #[serde(default = "default_whisper_binary")]
    pub whisper_binary: String,

    // @field: Model name passed to the CLI
    #[serde(default = "default_model")]
    pub model: String,

    // @field: ggml model file for the in-process fallback
    #[serde(default = "default_native_model_path")]
    pub native_model_path: PathBuf,

    // @field: Hard limit per external call; none by default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            whisper_binary: default_whisper_binary(),
            model: default_model(),
            native_model_path: default_native_model_path(),
            timeout_secs: None,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Audio normalizer configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NormalizerConfig {
    #[serde(default = "default_ffmpeg_binary")]
    pub ffmpeg_binary: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: default_ffmpeg_binary(),
        }
    }
}

/// Scratch space configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScratchConfig {
    /// Scratch directory; the system temp dir when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Seconds a completed result stays downloadable
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: u64,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            directory: None,
            result_ttl_secs: default_result_ttl_secs(),
        }
    }
}

impl ScratchConfig {
    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_words_per_cue() -> usize {
    8
}

fn default_frame_rate() -> f64 {
    25.0
}

fn default_whisper_binary() -> String {
    "whisper".to_string()
}

fn default_model() -> String {
    "base".to_string()
}

// @returns: ~/.local/share/subtitle-forge/models/ggml-base.bin, or a relative path
fn default_native_model_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("subtitle-forge").join("models"))
        .unwrap_or_else(|| PathBuf::from("models"))
        .join("ggml-base.bin")
}

fn default_ffmpeg_binary() -> String {
    "ffmpeg".to_string()
}

fn default_result_ttl_secs() -> u64 {
    600
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.conversion
            .to_options()
            .validate()
            .map_err(|e| anyhow!("Invalid conversion settings: {}", e))?;

        if self.engine.whisper_binary.trim().is_empty() {
            return Err(anyhow!("engine.whisper_binary must not be empty"));
        }
        if self.normalizer.ffmpeg_binary.trim().is_empty() {
            return Err(anyhow!("normalizer.ffmpeg_binary must not be empty"));
        }
        if self.engine.timeout_secs == Some(0) {
            return Err(anyhow!("engine.timeout_secs must be positive when set"));
        }
        if self.scratch.result_ttl_secs == 0 {
            return Err(anyhow!("scratch.result_ttl_secs must be positive"));
        }

        Ok(())
    }

    /// Load the config at `path`, writing a default one if it is missing
    ///
    /// Returns the config and whether it was freshly created.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok((config, false));
        }

        let config = Config::default();
        config.save(path)?;
        Ok((config, true))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }
}
