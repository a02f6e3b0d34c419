use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::errors::ConversionError;
use crate::language_utils::LanguageHint;
use crate::process::run_cancellable;
use crate::scratch::ScratchSpace;

use super::SpeechEngine;
use super::model::RawSegment;

// @module: Primary engine, the whisper command line tool

// @struct: JSON document written by `whisper --output_format json`
#[derive(Debug, Deserialize)]
struct WhisperJson {
    #[serde(default)]
    segments: Vec<RawSegment>,
}

/// Runs the `whisper` CLI with word timestamps and parses its JSON output
#[derive(Debug, Clone)]
pub struct WhisperCliEngine {
    binary: String,
    model: String,
    timeout: Option<Duration>,
}

impl WhisperCliEngine {
    pub fn new(binary: impl Into<String>, model: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
            timeout,
        }
    }

    pub(crate) fn build_args(&self, wav: &Path, language: &LanguageHint, output_dir: &Path) -> Vec<String> {
        let mut args = vec![
            wav.display().to_string(),
            "--model".to_string(),
            self.model.clone(),
            "--output_format".to_string(),
            "json".to_string(),
            "--word_timestamps".to_string(),
            "True".to_string(),
            "--output_dir".to_string(),
            output_dir.display().to_string(),
            "--verbose".to_string(),
            "False".to_string(),
        ];

        if let Some(code) = language.as_code() {
            args.push("--language".to_string());
            args.push(code.to_string());
        }

        args
    }

    /// Path of the JSON document whisper writes for `wav`
    pub(crate) fn output_json_path(wav: &Path, output_dir: &Path) -> PathBuf {
        let stem = wav
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        output_dir.join(format!("{}.json", stem))
    }

    pub(crate) fn parse_output(tool: &str, raw: &str) -> Result<Vec<RawSegment>, ConversionError> {
        let parsed: WhisperJson = serde_json::from_str(raw)
            .map_err(|e| ConversionError::tool_failed(tool, format!("malformed JSON output: {}", e)))?;
        Ok(parsed.segments)
    }
}

impl Default for WhisperCliEngine {
    fn default() -> Self {
        Self::new("whisper", "base", None)
    }
}

#[async_trait]
impl SpeechEngine for WhisperCliEngine {
    fn name(&self) -> &str {
        &self.binary
    }

    async fn transcribe(
        &self,
        wav: &Path,
        language: &LanguageHint,
        scratch: &ScratchSpace,
        token: &CancellationToken,
    ) -> Result<Vec<RawSegment>, ConversionError> {
        // Dropped on every return path, taking the JSON output with it
        let output_dir = scratch.create_dir()?;
        let args = self.build_args(wav, language, output_dir.path());

        info!("Transcribing with {} (model {}, language {})", self.binary, self.model, language);
        run_cancellable(&self.binary, &args, token, self.timeout).await?;

        let json_path = Self::output_json_path(wav, output_dir.path());
        let raw = tokio::fs::read_to_string(&json_path).await.map_err(|e| {
            ConversionError::tool_failed(&self.binary, format!("missing output {:?}: {}", json_path, e))
        })?;

        let segments = Self::parse_output(&self.binary, &raw)?;
        debug!("{} returned {} segments", self.binary, segments.len());
        output_dir.cleanup();
        Ok(segments)
    }
}
